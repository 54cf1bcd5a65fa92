//! The turn and board reconciler.
//!
//! Three kinds of signal arrive independently and only partially ordered:
//! explicit turn grants (`YOUR_TURN`), game-start metadata (`GAME_START`,
//! `BOTH_PLAYERS_READY`), and full board snapshots (`STATE`). The
//! [`Reconciler`] folds them into one answer to "whose turn is it" and
//! "what does each board look like".
//!
//! # Turn flag
//!
//! The flag changes in exactly three places, highest priority first:
//!
//! 1. `YOUR_TURN` sets it, cancels the fallback timer, clears the pending
//!    shot lock.
//! 2. The fallback timer, armed once per match by `BOTH_PLAYERS_READY`,
//!    sets it if this player moves first and (1) has not happened.
//! 3. [`Reconciler::fire_shot`] clears it and raises the pending lock
//!    before the server has answered.
//!
//! Snapshots never touch the flag. A `MY_SHOT` snapshot only releases the
//! pending lock; a hit is followed by another `YOUR_TURN` from the server.
//!
//! # Usage
//!
//! The reconciler sits inside the client's `select!` loop next to the
//! socket:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(text) = messages.recv() => {
//!             if let Inbound::Event(ev) = Inbound::from_text(&text) {
//!                 reconciler.handle_event(ev, &mut session);
//!             }
//!         }
//!         kind = reconciler.wait_for_timer() => reconciler.on_timer(kind, &mut session),
//!     }
//! }
//! ```

use broadside_protocol::{ClientCommand, Coordinate, GameStats, Role, ServerEvent, SnapshotMode};
use broadside_session::{Screen, SessionContext};
use tracing::{debug, info, trace, warn};

use crate::timer::MatchTimers;
use crate::{BoardView, IntentError, MatchConfig, MatchPhase, TimerKind};

/// Server texts that mean "you fired out of turn".
const TURN_VETO_MESSAGES: [&str; 2] = ["not your turn", "не ваш ход"];

fn is_turn_veto(message: &str) -> bool {
    let lower = message.to_lowercase();
    TURN_VETO_MESSAGES.iter().any(|veto| lower.contains(veto))
}

/// Coarse progress of the match. The battle stage is refined into
/// `MyTurn` / `OpponentTurn` by the turn flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Idle,
    AwaitingStart,
    Placing,
    AwaitingOpponentReady,
    Battle,
    Finished,
}

/// How this client entered the room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lobby {
    Creating,
    Joining,
}

/// The final result, kept for the end-of-game screen.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchOutcome {
    pub winner: Role,
    pub stats: GameStats,
    /// Whether the winner is this client. `false` if identity was unknown.
    pub won: bool,
}

/// Turn and board state machine for one match.
#[derive(Debug)]
pub struct Reconciler {
    config: MatchConfig,
    stage: Stage,
    lobby: Option<Lobby>,
    my_turn: bool,
    /// Latched by the first `YOUR_TURN` of the match.
    turn_granted: bool,
    /// Latched once the fallback timer has run.
    fallback_spent: bool,
    shot_pending: bool,
    own: BoardView,
    /// `false` until the first `ENEMY_SHOT` snapshot; until then the own
    /// board is drawn from the committed layout.
    own_reported: bool,
    opponent: BoardView,
    outcome: Option<MatchOutcome>,
    notice: Option<String>,
    timers: MatchTimers,
}

impl Reconciler {
    pub fn new(config: MatchConfig) -> Self {
        Self {
            config: config.validated(),
            stage: Stage::Idle,
            lobby: None,
            my_turn: false,
            turn_granted: false,
            fallback_spent: false,
            shot_pending: false,
            own: BoardView::default(),
            own_reported: false,
            opponent: BoardView::default(),
            outcome: None,
            notice: None,
            timers: MatchTimers::default(),
        }
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Starts a fresh match: wipes everything and waits for `GAME_START`.
    pub fn enter(&mut self) {
        self.reset();
        self.stage = Stage::AwaitingStart;
        debug!("match entered, awaiting start");
    }

    /// Wipes all match state and cancels every timer.
    pub fn reset(&mut self) {
        self.stage = Stage::Idle;
        self.lobby = None;
        self.my_turn = false;
        self.turn_granted = false;
        self.fallback_spent = false;
        self.shot_pending = false;
        self.own = BoardView::default();
        self.own_reported = false;
        self.opponent = BoardView::default();
        self.outcome = None;
        self.notice = None;
        self.timers.cancel_all();
    }

    // -----------------------------------------------------------------------
    // Intents
    // -----------------------------------------------------------------------

    /// Asks for a new room. Moves to the waiting screen.
    ///
    /// # Errors
    /// [`IntentError::Disconnected`] without a live connection.
    pub fn create_session(
        &mut self,
        session: &mut SessionContext,
    ) -> Result<ClientCommand, IntentError> {
        if !session.is_connected() {
            return Err(IntentError::Disconnected);
        }
        self.enter();
        self.lobby = Some(Lobby::Creating);
        session.set_screen(Screen::Create);
        Ok(ClientCommand::CreateSession)
    }

    /// Asks to join the room `code` (surrounding whitespace is ignored).
    ///
    /// # Errors
    /// [`IntentError::Disconnected`] without a live connection,
    /// [`IntentError::EmptyRoomCode`] for a blank code.
    pub fn join_session(
        &mut self,
        session: &mut SessionContext,
        code: &str,
    ) -> Result<ClientCommand, IntentError> {
        if !session.is_connected() {
            return Err(IntentError::Disconnected);
        }
        let code = code.trim();
        if code.is_empty() {
            return Err(IntentError::EmptyRoomCode);
        }
        self.enter();
        self.lobby = Some(Lobby::Joining);
        session.set_screen(Screen::Search);
        Ok(ClientCommand::JoinSession {
            room_code: code.to_owned(),
        })
    }

    /// Commits the local ship layout.
    ///
    /// # Errors
    /// [`IntentError::Disconnected`], [`IntentError::NotPlacing`] outside
    /// the placement phase, [`IntentError::EmptyLayout`].
    pub fn commit_placement(
        &mut self,
        session: &mut SessionContext,
        layout: Vec<Vec<Coordinate>>,
    ) -> Result<ClientCommand, IntentError> {
        if !session.is_connected() {
            return Err(IntentError::Disconnected);
        }
        if self.stage != Stage::Placing {
            return Err(IntentError::NotPlacing(self.phase()));
        }
        if layout.is_empty() {
            return Err(IntentError::EmptyLayout);
        }

        if !self.own_reported {
            self.own = BoardView::from_layout(&layout);
        }
        session.set_ship_layout(layout.clone());
        self.stage = Stage::AwaitingOpponentReady;
        info!(ships = layout.len(), "placement committed");
        Ok(ClientCommand::PlaceShips { ships: layout })
    }

    /// Validates a shot and, if allowed, returns the command to send.
    ///
    /// On success the turn flag drops to `false` and the pending lock is
    /// raised before anything reaches the server. On rejection nothing
    /// changes.
    ///
    /// # Errors
    /// One [`IntentError`] per reason the shot may not be fired.
    pub fn fire_shot(
        &mut self,
        session: &SessionContext,
        target: Coordinate,
    ) -> Result<ClientCommand, IntentError> {
        if !session.is_connected() {
            return Err(IntentError::Disconnected);
        }
        if self.stage == Stage::Finished {
            return Err(IntentError::GameFinished);
        }
        if self.shot_pending {
            return Err(IntentError::ShotPending);
        }
        if !self.my_turn {
            return Err(IntentError::NotYourTurn);
        }
        if self.opponent.has_shot(target) {
            return Err(IntentError::AlreadyFired(target));
        }

        self.my_turn = false;
        self.shot_pending = true;
        debug!(%target, "shot fired");
        Ok(ClientCommand::Shot {
            x: target.x,
            y: target.y,
        })
    }

    // -----------------------------------------------------------------------
    // Server events
    // -----------------------------------------------------------------------

    /// Applies one server event.
    pub fn handle_event(&mut self, event: ServerEvent, session: &mut SessionContext) {
        trace!(kind = event.kind(), phase = %self.phase(), "event");

        let idle_ok = matches!(event, ServerEvent::Error { .. } | ServerEvent::Pong);
        if self.stage == Stage::Idle && !idle_ok {
            debug!(kind = event.kind(), "no match in progress, ignoring event");
            return;
        }

        match event {
            ServerEvent::YourTurn => self.on_your_turn(),

            ServerEvent::SessionCreated { room_code } => {
                info!(%room_code, "session created");
                session.set_room_code(room_code);
                self.assign(session, Role::Player1);
                session.set_screen(Screen::Create);
            }

            ServerEvent::GameStart { first_turn } => {
                if !matches!(self.stage, Stage::AwaitingStart | Stage::Placing) {
                    debug!(first = %first_turn, phase = %self.phase(), "duplicate GAME_START, ignoring");
                    return;
                }
                info!(first = %first_turn, "game start");
                session.set_first_mover(first_turn);
                if session.player().is_none() && self.lobby == Some(Lobby::Joining) {
                    self.assign(session, Role::Player2);
                }
                self.stage = Stage::Placing;
                session.set_screen(Screen::Build);
            }

            ServerEvent::ShipsPlaced => {
                if session.screen() == Screen::Build {
                    session.set_screen(Screen::InGame);
                }
            }

            ServerEvent::BothPlayersReady { message } => {
                info!(%message, "both players ready");
                if self.stage == Stage::Finished {
                    return;
                }
                self.stage = Stage::Battle;
                if session.screen() == Screen::Build {
                    session.set_screen(Screen::InGame);
                }
                let armable = !self.turn_granted
                    && !self.fallback_spent
                    && !self.timers.is_armed(TimerKind::FallbackTurn);
                if armable {
                    self.timers.arm(
                        TimerKind::FallbackTurn,
                        self.config.fallback_turn_window,
                        session.token(),
                    );
                }
            }

            ServerEvent::State { mode, data } => {
                let next = BoardView::from_report(&data);
                match mode {
                    SnapshotMode::MyShot => {
                        Self::replace(&mut self.opponent, next, "opponent");
                        self.shot_pending = false;
                    }
                    SnapshotMode::EnemyShot => {
                        Self::replace(&mut self.own, next, "own");
                        self.own_reported = true;
                    }
                }
            }

            ServerEvent::GameOver { winner, stats } => {
                let won = session.player() == Some(winner);
                info!(%winner, won, shots = stats.shots, hits = stats.hits, "game over");
                self.my_turn = false;
                self.shot_pending = false;
                self.stage = Stage::Finished;
                self.outcome = Some(MatchOutcome { winner, stats, won });
                self.timers.cancel(TimerKind::FallbackTurn);
                self.timers.arm(
                    TimerKind::EndScreen,
                    self.config.end_screen_delay,
                    session.token(),
                );
            }

            ServerEvent::Error { message } => {
                self.shot_pending = false;
                if is_turn_veto(&message) {
                    debug!(%message, "server vetoed shot, turn flag kept");
                } else {
                    warn!(%message, "server error");
                    self.timers.arm(
                        TimerKind::NoticeExpiry,
                        self.config.notice_ttl,
                        session.token(),
                    );
                    self.notice = Some(message);
                }
            }

            ServerEvent::Pong => {}
        }
    }

    fn on_your_turn(&mut self) {
        if self.stage == Stage::Finished {
            debug!("YOUR_TURN after game over, ignoring");
            return;
        }
        self.my_turn = true;
        self.turn_granted = true;
        self.shot_pending = false;
        self.timers.cancel(TimerKind::FallbackTurn);
        self.stage = Stage::Battle;
    }

    fn assign(&self, session: &mut SessionContext, role: Role) {
        if let Err(e) = session.assign_player(role) {
            warn!(error = %e, "identity conflict, keeping the first assignment");
        }
    }

    /// Snapshots are authoritative even when they shrink; a shrink is only
    /// flagged.
    fn replace(board: &mut BoardView, next: BoardView, which: &'static str) {
        if next.shots.len() < board.shots.len() {
            warn!(
                board = which,
                previous = board.shots.len(),
                received = next.shots.len(),
                "shot history shrank, accepting snapshot anyway"
            );
        }
        *board = next;
    }

    // -----------------------------------------------------------------------
    // Timers
    // -----------------------------------------------------------------------

    /// Waits for the next armed timer. Pends forever when none is armed.
    pub async fn wait_for_timer(&self) -> TimerKind {
        self.timers.next().await
    }

    /// Runs a timer that [`wait_for_timer`](Self::wait_for_timer) reported.
    ///
    /// No-op if the timer was cancelled or re-armed in the meantime, or if
    /// it was armed under an epoch that has since been superseded.
    pub fn on_timer(&mut self, kind: TimerKind, session: &mut SessionContext) {
        let Some(deadline) = self.timers.take_due(kind) else {
            return;
        };
        if !deadline.token.is_current() {
            debug!(?kind, token = %deadline.token, "stale timer discarded");
            return;
        }

        match kind {
            TimerKind::FallbackTurn => self.on_fallback(session),
            TimerKind::EndScreen => {
                if self.stage == Stage::Finished && session.screen() == Screen::InGame {
                    session.set_screen(Screen::EndGame);
                }
            }
            TimerKind::NoticeExpiry => self.notice = None,
        }
    }

    fn on_fallback(&mut self, session: &SessionContext) {
        self.fallback_spent = true;
        if self.stage != Stage::Battle || self.turn_granted || self.my_turn || self.shot_pending {
            return;
        }
        let (Some(me), Some(first)) = (session.player(), session.first_mover()) else {
            return;
        };
        if me == first {
            info!(player = %me, "no YOUR_TURN within window, taking first turn");
            self.my_turn = true;
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn phase(&self) -> MatchPhase {
        match self.stage {
            Stage::Idle => MatchPhase::Idle,
            Stage::AwaitingStart => MatchPhase::AwaitingStart,
            Stage::Placing => MatchPhase::Placing,
            Stage::AwaitingOpponentReady => MatchPhase::AwaitingOpponentReady,
            Stage::Battle if self.my_turn => MatchPhase::MyTurn,
            Stage::Battle => MatchPhase::OpponentTurn,
            Stage::Finished => MatchPhase::Finished,
        }
    }

    pub fn is_my_turn(&self) -> bool {
        self.my_turn
    }

    pub fn is_shot_pending(&self) -> bool {
        self.shot_pending
    }

    pub fn is_timer_armed(&self, kind: TimerKind) -> bool {
        self.timers.is_armed(kind)
    }

    /// The local board.
    pub fn own_board(&self) -> &BoardView {
        &self.own
    }

    /// The opponent's board as revealed by this player's shots.
    pub fn opponent_board(&self) -> &BoardView {
        &self.opponent
    }

    pub fn outcome(&self) -> Option<&MatchOutcome> {
        self.outcome.as_ref()
    }

    /// The current transient error notice, if any.
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new(MatchConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_veto_matches_both_languages() {
        assert!(is_turn_veto("Not your turn"));
        assert!(is_turn_veto("error: NOT YOUR TURN!"));
        assert!(is_turn_veto("Не ваш ход"));
        assert!(!is_turn_veto("Session not found"));
    }

    #[test]
    fn test_reconciler_starts_idle() {
        let r = Reconciler::default();
        assert_eq!(r.phase(), MatchPhase::Idle);
        assert!(!r.is_my_turn());
        assert!(!r.is_shot_pending());
        assert!(r.outcome().is_none());
    }

    #[test]
    fn test_reconciler_ignores_game_events_when_idle() {
        let mut r = Reconciler::default();
        let mut session = SessionContext::new();

        r.handle_event(ServerEvent::YourTurn, &mut session);
        r.handle_event(
            ServerEvent::GameStart {
                first_turn: Role::Player1,
            },
            &mut session,
        );

        assert_eq!(r.phase(), MatchPhase::Idle);
        assert!(!r.is_my_turn());
        assert_eq!(session.first_mover(), None);
    }

    #[test]
    fn test_fire_shot_rejected_when_disconnected() {
        let mut r = Reconciler::default();
        let session = SessionContext::new();
        let err = r.fire_shot(&session, Coordinate::new(0, 0)).unwrap_err();
        assert_eq!(err, IntentError::Disconnected);
    }
}
