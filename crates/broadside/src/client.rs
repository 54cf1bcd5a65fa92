//! The client actor and its handle.
//!
//! [`Client::start`] spawns one task that owns the [`ScreenController`]
//! and with it every piece of mutable state. Front-ends talk to it through
//! a cloneable [`ClientHandle`] (intents in) and a `watch` channel of
//! [`ClientView`] snapshots (state out), so no lock is ever shared with
//! rendering code.
//!
//! ```rust,no_run
//! use broadside::prelude::*;
//!
//! # async fn demo() -> Result<(), ClientError> {
//! let (client, mut view) = Client::start(ClientConfig::default());
//! view.changed().await.ok();
//! client.open_create().await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use broadside_match::{BoardView, MatchOutcome, MatchPhase};
use broadside_protocol::{Coordinate, Role};
use broadside_session::Screen;
use broadside_transport::{Connector, WebSocketConnector};
use tokio::sync::{mpsc, watch};
use tokio::time::{self, Instant, Interval, MissedTickBehavior};

use crate::controller::{Intent, LinkEvent, ScreenController};
use crate::{ClientConfig, ClientError};

/// Everything a front-end needs to draw the current state.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClientView {
    pub screen: Screen,
    pub epoch: u64,
    pub connected: bool,
    pub player: Option<Role>,
    pub first_mover: Option<Role>,
    pub room_code: Option<String>,
    pub phase: MatchPhase,
    pub my_turn: bool,
    pub shot_pending: bool,
    pub own_board: BoardView,
    pub opponent_board: BoardView,
    /// Transient error text, cleared after the notice lifetime.
    pub notice: Option<String>,
    pub outcome: Option<MatchOutcome>,
}

/// Sends intents to a running client.
///
/// Every method only enqueues; the outcome shows up in the next
/// [`ClientView`]. Rejected intents (not your turn, cell already fired
/// upon, ...) are dropped by the client and logged at `debug`.
#[derive(Debug, Clone)]
pub struct ClientHandle {
    tx: mpsc::Sender<Intent>,
}

impl ClientHandle {
    async fn submit(&self, intent: Intent) -> Result<(), ClientError> {
        self.tx.send(intent).await.map_err(|_| ClientError::Stopped)
    }

    /// Creates a room and waits for an opponent.
    pub async fn open_create(&self) -> Result<(), ClientError> {
        self.submit(Intent::OpenCreate).await
    }

    /// Shows the room-code entry screen.
    pub async fn open_search(&self) -> Result<(), ClientError> {
        self.submit(Intent::OpenSearch).await
    }

    /// Joins the room `code`.
    pub async fn join(&self, code: impl Into<String>) -> Result<(), ClientError> {
        self.submit(Intent::Join(code.into())).await
    }

    /// Commits the ship layout, one cell list per ship.
    pub async fn commit_placement(&self, layout: Vec<Vec<Coordinate>>) -> Result<(), ClientError> {
        self.submit(Intent::CommitPlacement(layout)).await
    }

    /// Fires at the opponent's board.
    pub async fn fire(&self, target: Coordinate) -> Result<(), ClientError> {
        self.submit(Intent::Fire(target)).await
    }

    /// Reconnects from scratch.
    pub async fn retry(&self) -> Result<(), ClientError> {
        self.submit(Intent::Retry).await
    }

    /// Leaves the current game for the main menu.
    pub async fn back_to_menu(&self) -> Result<(), ClientError> {
        self.submit(Intent::BackToMenu).await
    }

    /// Disconnects and stops the client task.
    pub async fn shutdown(&self) -> Result<(), ClientError> {
        self.submit(Intent::Shutdown).await
    }
}

/// Entry point.
pub struct Client;

impl Client {
    /// Starts a client over WebSocket.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(config: ClientConfig) -> (ClientHandle, watch::Receiver<ClientView>) {
        Self::start_with(config, WebSocketConnector)
    }

    /// Starts a client over a custom transport.
    pub fn start_with<C>(config: ClientConfig, connector: C) -> (ClientHandle, watch::Receiver<ClientView>)
    where
        C: Connector + Clone,
    {
        let config = config.validated();
        let (tx, rx) = mpsc::channel(config.intent_channel_capacity);
        let heartbeat = config.heartbeat_interval;

        let mut controller = ScreenController::new(config, connector);
        controller.start();
        let (view_tx, view_rx) = watch::channel(controller.view());

        tokio::spawn(run(controller, rx, view_tx, heartbeat));
        (ClientHandle { tx }, view_rx)
    }
}

enum Wake {
    Link(LinkEvent),
    Intent(Intent),
    Heartbeat,
}

fn heartbeat_interval(every: Duration) -> Option<Interval> {
    if every.is_zero() {
        return None;
    }
    let mut interval = time::interval_at(Instant::now() + every, every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    Some(interval)
}

async fn tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn run<C: Connector + Clone>(
    mut controller: ScreenController<C>,
    mut intents: mpsc::Receiver<Intent>,
    view_tx: watch::Sender<ClientView>,
    heartbeat_every: Duration,
) {
    let mut heartbeat = heartbeat_interval(heartbeat_every);
    tracing::debug!("client task running");

    loop {
        let wake = tokio::select! {
            biased;
            event = controller.next_event() => Wake::Link(event),
            // All handles dropped: same as an explicit shutdown.
            intent = intents.recv() => Wake::Intent(intent.unwrap_or(Intent::Shutdown)),
            () = tick(&mut heartbeat) => Wake::Heartbeat,
        };

        let stop = matches!(wake, Wake::Intent(Intent::Shutdown));
        match wake {
            Wake::Link(event) => controller.handle(event).await,
            Wake::Intent(intent) => {
                if let Err(e) = controller.apply(intent).await {
                    tracing::debug!(error = %e, "intent dropped");
                }
            }
            Wake::Heartbeat => controller.heartbeat().await,
        }

        let next = controller.view();
        view_tx.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });

        if stop {
            break;
        }
    }
    tracing::info!("client stopped");
}
