//! Integration tests for turn ownership and board reconciliation.
//!
//! Each test drives a `Reconciler` with the exact event sequences a match
//! server produces. Timer tests run with paused time so the fallback and
//! end-screen deadlines resolve deterministically.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use broadside_match::{IntentError, MatchConfig, MatchPhase, Reconciler, TimerKind};
use broadside_protocol::{
    BoardReport, ClientCommand, Coordinate, GameStats, Role, ServerEvent, ShipReport,
    SnapshotMode,
};
use broadside_session::{LiveConnection, Screen, SessionContext};
use tokio::time::{self, Instant};

// =========================================================================
// Helpers
// =========================================================================

#[derive(Default)]
struct StubConnection {
    down: AtomicBool,
}

impl LiveConnection for StubConnection {
    fn disconnect(&self) {
        self.down.store(true, Ordering::SeqCst);
    }

    fn is_connected(&self) -> bool {
        !self.down.load(Ordering::SeqCst)
    }
}

fn connected_session() -> SessionContext {
    let mut session = SessionContext::new();
    session.attach_connection(Arc::new(StubConnection::default()));
    session.set_screen(Screen::MainMenu);
    session
}

fn c(x: i32, y: i32) -> Coordinate {
    Coordinate::new(x, y)
}

fn layout() -> Vec<Vec<Coordinate>> {
    vec![vec![c(0, 0), c(0, 1), c(0, 2)], vec![c(5, 5)]]
}

fn my_shot(shots: &[Coordinate]) -> ServerEvent {
    ServerEvent::State {
        mode: SnapshotMode::MyShot,
        data: BoardReport {
            ships: Vec::new(),
            shooted_cords: shots.to_vec(),
        },
    }
}

fn enemy_shot(shots: &[Coordinate]) -> ServerEvent {
    ServerEvent::State {
        mode: SnapshotMode::EnemyShot,
        data: BoardReport {
            ships: vec![ShipReport {
                cords: Some(vec![c(0, 0), c(0, 1), c(0, 2)]),
                heated_cords: shots.iter().copied().filter(|s| s.x == 0).collect(),
                ..ShipReport::default()
            }],
            shooted_cords: shots.to_vec(),
        },
    }
}

fn error(message: &str) -> ServerEvent {
    ServerEvent::Error {
        message: message.into(),
    }
}

/// Creator who has gone through create → start → placement → ready.
fn creator_in_battle(first: Role) -> (Reconciler, SessionContext) {
    let mut r = Reconciler::default();
    let mut s = connected_session();
    r.create_session(&mut s).unwrap();
    r.handle_event(
        ServerEvent::SessionCreated {
            room_code: "AB12".into(),
        },
        &mut s,
    );
    r.handle_event(ServerEvent::GameStart { first_turn: first }, &mut s);
    r.commit_placement(&mut s, layout()).unwrap();
    r.handle_event(ServerEvent::ShipsPlaced, &mut s);
    r.handle_event(
        ServerEvent::BothPlayersReady {
            message: "go".into(),
        },
        &mut s,
    );
    (r, s)
}

/// Same, with the turn already granted explicitly.
fn creator_with_turn() -> (Reconciler, SessionContext) {
    let (mut r, mut s) = creator_in_battle(Role::Player1);
    r.handle_event(ServerEvent::YourTurn, &mut s);
    (r, s)
}

// =========================================================================
// Lobby scenarios
// =========================================================================

#[test]
fn test_creator_session_assigns_player1() {
    let mut r = Reconciler::default();
    let mut s = connected_session();

    let cmd = r.create_session(&mut s).unwrap();
    assert_eq!(cmd, ClientCommand::CreateSession);
    assert_eq!(s.screen(), Screen::Create);
    assert_eq!(r.phase(), MatchPhase::AwaitingStart);

    r.handle_event(
        ServerEvent::SessionCreated {
            room_code: "AB12".into(),
        },
        &mut s,
    );

    assert_eq!(s.player(), Some(Role::Player1));
    assert_eq!(s.room_code(), Some("AB12"));
    assert_eq!(s.screen(), Screen::Create);
}

#[test]
fn test_joiner_flow_assigns_player2_and_moves_to_placement() {
    let mut r = Reconciler::default();
    let mut s = connected_session();

    let cmd = r.join_session(&mut s, "  AB12 ").unwrap();
    assert_eq!(
        cmd,
        ClientCommand::JoinSession {
            room_code: "AB12".into()
        }
    );

    r.handle_event(
        ServerEvent::GameStart {
            first_turn: Role::Player1,
        },
        &mut s,
    );

    assert_eq!(s.player(), Some(Role::Player2));
    assert_eq!(s.first_mover(), Some(Role::Player1));
    assert_eq!(s.screen(), Screen::Build);
    assert_eq!(r.phase(), MatchPhase::Placing);
}

#[test]
fn test_join_with_blank_code_is_rejected() {
    let mut r = Reconciler::default();
    let mut s = connected_session();

    assert_eq!(r.join_session(&mut s, "   "), Err(IntentError::EmptyRoomCode));
    assert_eq!(r.phase(), MatchPhase::Idle);
    assert_eq!(s.screen(), Screen::MainMenu);
}

#[test]
fn test_creator_game_start_keeps_player1() {
    let (_, s) = creator_in_battle(Role::Player2);
    assert_eq!(s.player(), Some(Role::Player1));
    assert_eq!(s.first_mover(), Some(Role::Player2));
}

#[test]
fn test_ships_placed_moves_to_battle_screen() {
    let mut r = Reconciler::default();
    let mut s = connected_session();
    r.join_session(&mut s, "AB12").unwrap();
    r.handle_event(
        ServerEvent::GameStart {
            first_turn: Role::Player2,
        },
        &mut s,
    );

    let cmd = r.commit_placement(&mut s, layout()).unwrap();
    assert_eq!(cmd, ClientCommand::PlaceShips { ships: layout() });
    assert_eq!(r.phase(), MatchPhase::AwaitingOpponentReady);
    assert_eq!(s.ship_layout(), layout().as_slice());

    r.handle_event(ServerEvent::ShipsPlaced, &mut s);
    assert_eq!(s.screen(), Screen::InGame);
}

#[test]
fn test_commit_placement_outside_placing_is_rejected() {
    let mut r = Reconciler::default();
    let mut s = connected_session();
    r.create_session(&mut s).unwrap();

    let err = r.commit_placement(&mut s, layout()).unwrap_err();
    assert_eq!(err, IntentError::NotPlacing(MatchPhase::AwaitingStart));
    assert!(s.ship_layout().is_empty());
}

// =========================================================================
// Turn flag
// =========================================================================

#[test]
fn test_your_turn_sets_flag_and_cancels_fallback() {
    let (mut r, mut s) = creator_in_battle(Role::Player1);
    assert!(r.is_timer_armed(TimerKind::FallbackTurn));

    r.handle_event(ServerEvent::YourTurn, &mut s);

    assert!(r.is_my_turn());
    assert_eq!(r.phase(), MatchPhase::MyTurn);
    assert!(!r.is_timer_armed(TimerKind::FallbackTurn));
}

#[test]
fn test_fire_shot_clears_flag_and_raises_lock() {
    let (mut r, s) = creator_with_turn();

    let cmd = r.fire_shot(&s, c(3, 4)).unwrap();

    assert_eq!(cmd, ClientCommand::Shot { x: 3, y: 4 });
    assert!(!r.is_my_turn());
    assert!(r.is_shot_pending());
    assert_eq!(r.phase(), MatchPhase::OpponentTurn);
}

#[test]
fn test_click_burst_fires_only_once() {
    let (mut r, s) = creator_with_turn();

    assert!(r.fire_shot(&s, c(3, 4)).is_ok());
    assert_eq!(r.fire_shot(&s, c(3, 5)), Err(IntentError::ShotPending));
    assert_eq!(r.fire_shot(&s, c(3, 6)), Err(IntentError::ShotPending));
}

#[test]
fn test_shot_miss_keeps_flag_false() {
    let (mut r, mut s) = creator_with_turn();

    r.fire_shot(&s, c(3, 4)).unwrap();
    r.handle_event(my_shot(&[c(3, 4)]), &mut s);

    assert!(!r.is_shot_pending());
    assert!(!r.is_my_turn());
    assert!(r.opponent_board().has_shot(c(3, 4)));
}

#[test]
fn test_shot_hit_then_your_turn_grants_again() {
    let (mut r, mut s) = creator_with_turn();

    r.fire_shot(&s, c(3, 4)).unwrap();
    r.handle_event(my_shot(&[c(3, 4)]), &mut s);
    r.handle_event(ServerEvent::YourTurn, &mut s);

    assert!(r.is_my_turn());
    assert!(r.fire_shot(&s, c(3, 5)).is_ok());
}

#[test]
fn test_duplicate_shot_is_noop() {
    let (mut r, mut s) = creator_with_turn();
    r.fire_shot(&s, c(3, 4)).unwrap();
    r.handle_event(my_shot(&[c(3, 4)]), &mut s);
    r.handle_event(ServerEvent::YourTurn, &mut s);

    let err = r.fire_shot(&s, c(3, 4)).unwrap_err();

    assert_eq!(err, IntentError::AlreadyFired(c(3, 4)));
    assert!(r.is_my_turn());
    assert!(!r.is_shot_pending());
}

#[test]
fn test_fire_without_turn_is_rejected() {
    let (mut r, s) = creator_in_battle(Role::Player2);
    assert_eq!(r.fire_shot(&s, c(1, 1)), Err(IntentError::NotYourTurn));
    assert!(!r.is_shot_pending());
}

#[test]
fn test_fire_without_connection_is_rejected() {
    let (mut r, mut s) = creator_with_turn();
    s.reconnect();

    assert_eq!(r.fire_shot(&s, c(1, 1)), Err(IntentError::Disconnected));
    assert!(r.is_my_turn());
}

#[test]
fn test_enemy_shot_never_alters_turn_flag() {
    let (mut r, mut s) = creator_in_battle(Role::Player2);
    r.handle_event(enemy_shot(&[c(0, 1)]), &mut s);
    assert!(!r.is_my_turn());

    r.handle_event(ServerEvent::YourTurn, &mut s);
    r.handle_event(enemy_shot(&[c(0, 1), c(9, 9)]), &mut s);
    assert!(r.is_my_turn());
}

// =========================================================================
// Error events
// =========================================================================

#[test]
fn test_not_your_turn_error_clears_lock_only() {
    let (mut r, mut s) = creator_with_turn();
    r.fire_shot(&s, c(3, 4)).unwrap();

    r.handle_event(error("Not your turn"), &mut s);

    assert!(!r.is_shot_pending());
    assert!(!r.is_my_turn());
    assert!(r.notice().is_none());
}

#[test]
fn test_legacy_turn_veto_text_is_recognized() {
    let (mut r, mut s) = creator_with_turn();
    r.fire_shot(&s, c(3, 4)).unwrap();

    r.handle_event(error("Не ваш ход"), &mut s);

    assert!(!r.is_shot_pending());
    assert!(r.notice().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_other_error_raises_notice_that_expires() {
    let (mut r, mut s) = creator_with_turn();
    r.fire_shot(&s, c(3, 4)).unwrap();

    r.handle_event(error("Invalid coordinates"), &mut s);

    assert!(!r.is_shot_pending());
    assert_eq!(r.notice(), Some("Invalid coordinates"));
    assert!(s.is_connected());

    let kind = r.wait_for_timer().await;
    assert_eq!(kind, TimerKind::NoticeExpiry);
    r.on_timer(kind, &mut s);
    assert!(r.notice().is_none());
}

#[test]
fn test_error_in_lobby_raises_notice() {
    let mut r = Reconciler::default();
    let mut s = connected_session();
    r.join_session(&mut s, "ZZZZ").unwrap();

    r.handle_event(error("Session not found"), &mut s);

    assert_eq!(r.notice(), Some("Session not found"));
    assert_eq!(s.player(), None);
}

// =========================================================================
// Fallback timer
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_first_mover_fallback_sets_turn() {
    let (mut r, mut s) = creator_in_battle(Role::Player1);
    let start = Instant::now();

    let kind = r.wait_for_timer().await;
    assert_eq!(kind, TimerKind::FallbackTurn);
    assert!(start.elapsed() >= Duration::from_millis(500));

    r.on_timer(kind, &mut s);
    assert!(r.is_my_turn());
    assert_eq!(r.phase(), MatchPhase::MyTurn);

    // Single shot: nothing else is armed.
    let again = time::timeout(Duration::from_secs(30), r.wait_for_timer()).await;
    assert!(again.is_err());
}

#[tokio::test(start_paused = true)]
async fn test_fallback_never_fires_after_your_turn() {
    let (mut r, mut s) = creator_in_battle(Role::Player1);
    r.handle_event(ServerEvent::YourTurn, &mut s);
    r.fire_shot(&s, c(3, 4)).unwrap();

    let waited = time::timeout(Duration::from_secs(5), r.wait_for_timer()).await;

    assert!(waited.is_err(), "fallback should have been cancelled");
    assert!(!r.is_my_turn());
}

#[tokio::test(start_paused = true)]
async fn test_redelivered_ready_after_grant_never_restores_turn() {
    let (mut r, mut s) = creator_with_turn();
    r.fire_shot(&s, c(3, 4)).unwrap();

    r.handle_event(
        ServerEvent::BothPlayersReady {
            message: "go".into(),
        },
        &mut s,
    );
    r.handle_event(my_shot(&[c(3, 4)]), &mut s);

    assert!(!r.is_timer_armed(TimerKind::FallbackTurn));
    let waited = time::timeout(Duration::from_secs(5), r.wait_for_timer()).await;
    assert!(waited.is_err(), "no timer should be pending");
    assert!(!r.is_my_turn());
    assert_eq!(r.phase(), MatchPhase::OpponentTurn);
}

#[tokio::test(start_paused = true)]
async fn test_fallback_runs_at_most_once_per_match() {
    let (mut r, mut s) = creator_in_battle(Role::Player1);
    let kind = r.wait_for_timer().await;
    r.on_timer(kind, &mut s);
    assert!(r.is_my_turn());
    r.fire_shot(&s, c(3, 4)).unwrap();

    r.handle_event(
        ServerEvent::BothPlayersReady {
            message: "go".into(),
        },
        &mut s,
    );
    r.handle_event(my_shot(&[c(3, 4)]), &mut s);

    assert!(!r.is_timer_armed(TimerKind::FallbackTurn));
    assert!(!r.is_my_turn());
}

#[tokio::test(start_paused = true)]
async fn test_redelivered_ready_keeps_original_fallback_deadline() {
    let (mut r, mut s) = creator_in_battle(Role::Player1);
    let start = Instant::now();
    time::sleep(Duration::from_millis(300)).await;

    r.handle_event(
        ServerEvent::BothPlayersReady {
            message: "go".into(),
        },
        &mut s,
    );

    let kind = r.wait_for_timer().await;
    assert_eq!(kind, TimerKind::FallbackTurn);
    assert_eq!(start.elapsed(), Duration::from_millis(500));
}

#[tokio::test(start_paused = true)]
async fn test_fallback_ignored_for_second_mover() {
    let (mut r, mut s) = creator_in_battle(Role::Player2);

    let kind = r.wait_for_timer().await;
    r.on_timer(kind, &mut s);

    assert!(!r.is_my_turn());
    assert_eq!(r.phase(), MatchPhase::OpponentTurn);
}

#[tokio::test(start_paused = true)]
async fn test_fallback_window_is_configurable() {
    let config = MatchConfig::default().with_fallback_turn_window(Duration::from_secs(2));
    let mut r = Reconciler::new(config);
    let mut s = connected_session();
    r.create_session(&mut s).unwrap();
    r.handle_event(
        ServerEvent::SessionCreated {
            room_code: "AB12".into(),
        },
        &mut s,
    );
    r.handle_event(
        ServerEvent::GameStart {
            first_turn: Role::Player1,
        },
        &mut s,
    );
    r.commit_placement(&mut s, layout()).unwrap();
    r.handle_event(
        ServerEvent::BothPlayersReady {
            message: String::new(),
        },
        &mut s,
    );

    let start = Instant::now();
    let kind = r.wait_for_timer().await;
    assert_eq!(start.elapsed(), Duration::from_secs(2));
    r.on_timer(kind, &mut s);
    assert!(r.is_my_turn());
}

#[tokio::test(start_paused = true)]
async fn test_fallback_from_stale_epoch_is_inert() {
    let (mut r, mut s) = creator_in_battle(Role::Player1);
    s.epoch().advance();

    let kind = r.wait_for_timer().await;
    r.on_timer(kind, &mut s);

    assert!(!r.is_my_turn());
}

// =========================================================================
// Boards
// =========================================================================

#[test]
fn test_shot_history_grows_monotonically() {
    let (mut r, mut s) = creator_in_battle(Role::Player2);
    let history = [c(1, 1), c(2, 2), c(3, 3), c(4, 4)];

    let mut last = 0;
    for n in 1..=history.len() {
        r.handle_event(my_shot(&history[..n]), &mut s);
        let size = r.opponent_board().shots.len();
        assert!(size >= last);
        last = size;
    }
    assert_eq!(last, history.len());
}

#[test]
fn test_shrinking_snapshot_is_accepted() {
    let (mut r, mut s) = creator_in_battle(Role::Player2);
    r.handle_event(my_shot(&[c(1, 1), c(2, 2)]), &mut s);

    r.handle_event(my_shot(&[c(1, 1)]), &mut s);

    assert_eq!(r.opponent_board().shots.len(), 1);
    assert!(!r.opponent_board().has_shot(c(2, 2)));
}

#[test]
fn test_own_board_uses_layout_until_first_snapshot() {
    let (mut r, mut s) = creator_in_battle(Role::Player2);
    assert_eq!(r.own_board().ships.len(), 2);
    assert!(r.own_board().shots.is_empty());

    r.handle_event(enemy_shot(&[c(0, 1)]), &mut s);

    assert_eq!(r.own_board().ships.len(), 1);
    assert!(r.own_board().has_shot(c(0, 1)));
    assert!(r.opponent_board().shots.is_empty());
}

// =========================================================================
// Game over
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_game_over_freezes_turn_and_schedules_end_screen() {
    let (mut r, mut s) = creator_with_turn();
    let stats = GameStats {
        shots: 25,
        hits: 20,
        misses: 5,
        accuracy: 80.0,
        sunk_ships: 10,
    };

    r.handle_event(
        ServerEvent::GameOver {
            winner: Role::Player1,
            stats: stats.clone(),
        },
        &mut s,
    );

    assert!(!r.is_my_turn());
    assert_eq!(r.phase(), MatchPhase::Finished);
    let outcome = r.outcome().unwrap();
    assert!(outcome.won);
    assert_eq!(outcome.stats, stats);
    assert_eq!(r.fire_shot(&s, c(9, 9)), Err(IntentError::GameFinished));

    // A late grant does not revive the match.
    r.handle_event(ServerEvent::YourTurn, &mut s);
    assert!(!r.is_my_turn());

    assert_eq!(s.screen(), Screen::InGame);
    let start = Instant::now();
    let kind = r.wait_for_timer().await;
    assert_eq!(kind, TimerKind::EndScreen);
    assert_eq!(start.elapsed(), Duration::from_secs(3));
    r.on_timer(kind, &mut s);
    assert_eq!(s.screen(), Screen::EndGame);
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_game_start_in_battle_is_ignored() {
    let (mut r, mut s) = creator_with_turn();
    assert_eq!(s.screen(), Screen::InGame);

    r.handle_event(
        ServerEvent::GameStart {
            first_turn: Role::Player2,
        },
        &mut s,
    );

    assert_eq!(r.phase(), MatchPhase::MyTurn);
    assert_eq!(s.screen(), Screen::InGame);
    assert_eq!(s.first_mover(), Some(Role::Player1));

    // The end screen still follows a later GAME_OVER.
    r.handle_event(
        ServerEvent::GameOver {
            winner: Role::Player1,
            stats: GameStats::default(),
        },
        &mut s,
    );
    let kind = r.wait_for_timer().await;
    r.on_timer(kind, &mut s);
    assert_eq!(s.screen(), Screen::EndGame);
}

#[test]
fn test_duplicate_game_start_during_placement_is_harmless() {
    let mut r = Reconciler::default();
    let mut s = connected_session();
    r.join_session(&mut s, "AB12").unwrap();
    let start = ServerEvent::GameStart {
        first_turn: Role::Player1,
    };
    r.handle_event(start.clone(), &mut s);

    r.handle_event(start, &mut s);

    assert_eq!(r.phase(), MatchPhase::Placing);
    assert_eq!(s.screen(), Screen::Build);
    assert_eq!(s.player(), Some(Role::Player2));
}

#[test]
fn test_game_over_for_loser() {
    let (mut r, mut s) = creator_in_battle(Role::Player2);
    r.handle_event(
        ServerEvent::GameOver {
            winner: Role::Player2,
            stats: GameStats::default(),
        },
        &mut s,
    );
    assert!(!r.outcome().unwrap().won);
}

#[test]
fn test_reset_wipes_match() {
    let (mut r, mut s) = creator_with_turn();
    r.handle_event(my_shot(&[c(1, 1)]), &mut s);

    r.reset();

    assert_eq!(r.phase(), MatchPhase::Idle);
    assert!(!r.is_my_turn());
    assert!(r.opponent_board().shots.is_empty());
    assert!(r.own_board().ships.is_empty());
    assert!(!r.is_timer_armed(TimerKind::FallbackTurn));
}
