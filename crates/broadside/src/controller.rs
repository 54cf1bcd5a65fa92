//! The screen controller: connection lifecycle × active screen.
//!
//! The controller owns the [`SessionContext`], the [`Reconciler`] and the
//! current [`ConnectionManager`]. It turns manager lifecycle events into
//! screen changes and reconnect decisions; game-driven screen changes are
//! left to the reconciler.
//!
//! | event                         | effect                                       |
//! |-------------------------------|----------------------------------------------|
//! | start / retry                 | tear down, `Loading`, new epoch, connect     |
//! | open                          | `Loading` → `MainMenu`; `Create` re-creates  |
//! | error before open             | `Error`                                      |
//! | close 1000                    | nothing                                      |
//! | other close on `Search`/`Create` | silent reconnect, screen kept             |
//! | other close elsewhere         | `Error`                                      |

use std::sync::Arc;
use std::time::Duration;

use broadside_match::{Reconciler, TimerKind};
use broadside_protocol::{ClientCommand, Coordinate, Inbound};
use broadside_session::{Screen, SessionContext};
use broadside_transport::{CloseInfo, Connector, WebSocketConnector};
use rand::Rng;
use tracing::{debug, info, warn};

use crate::connection::{ClosePolicy, ConnectionManager, Subscription};
use crate::{ClientConfig, ClientError, ClientView};

/// Something the controller has to react to.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkEvent {
    Open,
    Message(String),
    Error(String),
    Close(CloseInfo),
    Timer(TimerKind),
}

/// A request from the front-end.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Intent {
    OpenCreate,
    OpenSearch,
    Join(String),
    CommitPlacement(Vec<Vec<Coordinate>>),
    Fire(Coordinate),
    Retry,
    BackToMenu,
    Shutdown,
}

async fn next<T>(sub: &mut Option<Subscription<T>>) -> Option<T> {
    match sub {
        Some(sub) => sub.recv().await,
        None => std::future::pending().await,
    }
}

/// Drives one client session across connections.
pub struct ScreenController<C: Connector + Clone = WebSocketConnector> {
    config: ClientConfig,
    connector: C,
    session: SessionContext,
    reconciler: Reconciler,
    manager: Option<Arc<ConnectionManager<C>>>,
    /// Whether the current manager has reported readiness.
    opened: bool,
    open_sub: Option<Subscription<()>>,
    error_sub: Option<Subscription<String>>,
    close_sub: Option<Subscription<CloseInfo>>,
    message_sub: Option<Subscription<String>>,
}

impl<C: Connector + Clone> ScreenController<C> {
    pub fn new(config: ClientConfig, connector: C) -> Self {
        let reconciler = Reconciler::new(config.match_config.clone());
        Self {
            config,
            connector,
            session: SessionContext::new(),
            reconciler,
            manager: None,
            opened: false,
            open_sub: None,
            error_sub: None,
            close_sub: None,
            message_sub: None,
        }
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    /// Snapshot of everything a front-end renders.
    pub fn view(&self) -> ClientView {
        ClientView {
            screen: self.session.screen(),
            epoch: self.session.epoch().current(),
            connected: self.session.is_connected(),
            player: self.session.player(),
            first_mover: self.session.first_mover(),
            room_code: self.session.room_code().map(str::to_owned),
            phase: self.reconciler.phase(),
            my_turn: self.reconciler.is_my_turn(),
            shot_pending: self.reconciler.is_shot_pending(),
            own_board: self.reconciler.own_board().clone(),
            opponent_board: self.reconciler.opponent_board().clone(),
            notice: self.reconciler.notice().map(str::to_owned),
            outcome: self.reconciler.outcome().cloned(),
        }
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Enters the client: tears down any prior connection, shows
    /// `Loading`, and opens a fresh connection under a new epoch.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&mut self) {
        self.reconciler.reset();
        self.session.reconnect();
        self.open_link();
    }

    /// Manual retry from the error screen.
    pub fn retry(&mut self) {
        info!(screen = %self.session.screen(), "retry requested");
        self.start();
    }

    fn open_link(&mut self) {
        self.drop_link();

        let token = self.session.token();
        let manager = Arc::new(
            ConnectionManager::new(self.connector.clone(), self.config.server_url.clone(), token)
                .with_connect_timeout(self.config.connect_timeout),
        );
        self.open_sub = Some(manager.on_open());
        self.error_sub = Some(manager.on_error());
        self.close_sub = Some(manager.on_close());
        self.message_sub = Some(manager.on_message());
        self.session.attach_connection(manager.clone());
        self.manager = Some(Arc::clone(&manager));
        self.opened = false;

        debug!(epoch = self.session.epoch().current(), url = %self.config.server_url, "opening connection");
        tokio::spawn(async move {
            if let Err(e) = manager.connect().await {
                debug!(error = %e, "connect did not complete");
            }
        });
    }

    fn drop_link(&mut self) {
        self.open_sub = None;
        self.error_sub = None;
        self.close_sub = None;
        self.message_sub = None;
        if let Some(manager) = self.manager.take() {
            manager.disconnect();
        }
    }

    fn reconnect_delay(&self) -> Duration {
        let max = self.config.reconnect_jitter.as_millis() as u64;
        if max == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::rng().random_range(0..=max))
    }

    // -----------------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------------

    /// Waits for the next lifecycle event, frame, or match timer.
    ///
    /// Priority is open, then frames, then error, then close, so every
    /// frame received before a close is handled before the close.
    pub async fn next_event(&mut self) -> LinkEvent {
        loop {
            tokio::select! {
                biased;
                v = next(&mut self.open_sub) => match v {
                    Some(()) => return LinkEvent::Open,
                    None => self.open_sub = None,
                },
                v = next(&mut self.message_sub) => match v {
                    Some(text) => return LinkEvent::Message(text),
                    None => self.message_sub = None,
                },
                v = next(&mut self.error_sub) => match v {
                    Some(e) => return LinkEvent::Error(e),
                    None => self.error_sub = None,
                },
                v = next(&mut self.close_sub) => match v {
                    Some(info) => return LinkEvent::Close(info),
                    None => self.close_sub = None,
                },
                kind = self.reconciler.wait_for_timer() => return LinkEvent::Timer(kind),
            }
        }
    }

    pub async fn handle(&mut self, event: LinkEvent) {
        match event {
            LinkEvent::Open => self.on_open().await,
            LinkEvent::Message(text) => self.on_message(&text),
            LinkEvent::Error(e) => self.on_error(&e),
            LinkEvent::Close(info) => self.on_close(info).await,
            LinkEvent::Timer(kind) => self.reconciler.on_timer(kind, &mut self.session),
        }
    }

    /// The connection is ready.
    pub async fn on_open(&mut self) {
        self.opened = true;
        match self.session.screen() {
            Screen::Loading => self.session.set_screen(Screen::MainMenu),
            Screen::Create => {
                // The server dropped the old room with the old connection.
                info!("re-creating session after reconnect");
                if let Err(e) = self.create().await {
                    warn!(error = %e, "could not re-create session");
                }
            }
            _ => {}
        }
    }

    pub fn on_message(&mut self, text: &str) {
        match Inbound::from_text(text) {
            Inbound::Event(event) => self.reconciler.handle_event(event, &mut self.session),
            Inbound::Unparseable(e) => warn!(error = %e, len = text.len(), "dropping unparseable frame"),
        }
    }

    /// A transport error. Before readiness it ends the attempt; after
    /// readiness a close follows and decides.
    pub fn on_error(&mut self, error: &str) {
        if self.opened {
            warn!(error, "transport error");
            return;
        }
        warn!(error, "could not connect");
        self.drop_link();
        self.reconciler.reset();
        self.session.set_screen(Screen::Error);
    }

    pub async fn on_close(&mut self, info: CloseInfo) {
        let screen = self.session.screen();
        match ClosePolicy::classify(info.code, screen) {
            ClosePolicy::Normal => {
                info!(close = %info, %screen, "connection closed normally");
                self.drop_link();
            }
            ClosePolicy::Recoverable => {
                let delay = self.reconnect_delay();
                warn!(close = %info, %screen, delay_ms = delay.as_millis() as u64, "connection lost in lobby, reconnecting");
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                self.reconciler.reset();
                self.session.reconnect();
                self.session.set_screen(screen);
                self.open_link();
            }
            ClosePolicy::Fatal => {
                warn!(close = %info, %screen, "connection lost");
                self.drop_link();
                self.reconciler.reset();
                self.session.set_screen(Screen::Error);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Intents
    // -----------------------------------------------------------------------

    pub(crate) async fn apply(&mut self, intent: Intent) -> Result<(), ClientError> {
        match intent {
            Intent::OpenCreate => self.create().await,
            Intent::OpenSearch => self.search(),
            Intent::Join(code) => {
                let cmd = self.reconciler.join_session(&mut self.session, &code)?;
                self.send(cmd).await
            }
            Intent::CommitPlacement(layout) => {
                let cmd = self.reconciler.commit_placement(&mut self.session, layout)?;
                self.send(cmd).await
            }
            Intent::Fire(target) => {
                let cmd = self.reconciler.fire_shot(&self.session, target)?;
                self.send(cmd).await
            }
            Intent::Retry => {
                self.retry();
                Ok(())
            }
            Intent::BackToMenu => {
                self.back_to_menu();
                Ok(())
            }
            Intent::Shutdown => {
                self.shutdown();
                Ok(())
            }
        }
    }

    async fn create(&mut self) -> Result<(), ClientError> {
        let cmd = self.reconciler.create_session(&mut self.session)?;
        self.send(cmd).await
    }

    fn search(&mut self) -> Result<(), ClientError> {
        if !self.session.is_connected() {
            return Err(ClientError::NotConnected);
        }
        self.reconciler.reset();
        self.session.reset_game();
        self.session.set_screen(Screen::Search);
        Ok(())
    }

    /// Leaves the current game and shows the main menu. The connection is
    /// kept if it is still up.
    pub fn back_to_menu(&mut self) {
        if !self.session.is_connected() {
            self.start();
            return;
        }
        self.reconciler.reset();
        self.session.reset_game();
        self.session.set_screen(Screen::MainMenu);
    }

    /// Sends a PING if connected.
    pub async fn heartbeat(&mut self) {
        if self.session.is_connected() {
            if let Err(e) = self.send(ClientCommand::Ping).await {
                debug!(error = %e, "heartbeat not sent");
            }
        }
    }

    /// Tears everything down for good.
    pub fn shutdown(&mut self) {
        info!("client shutting down");
        self.reconciler.reset();
        self.drop_link();
    }

    /// Sends through the current manager. A delivery failure is handled
    /// like an abnormal close.
    async fn send(&mut self, command: ClientCommand) -> Result<(), ClientError> {
        let manager = self.manager.clone().ok_or(ClientError::NotConnected)?;
        match manager.send(&command).await {
            Ok(()) => Ok(()),
            Err(e @ ClientError::Transport(_)) => {
                warn!(kind = command.kind(), error = %e, "send failed");
                self.on_close(CloseInfo::abnormal("send failed")).await;
                Err(e)
            }
            Err(e) => Err(e),
        }
    }
}
