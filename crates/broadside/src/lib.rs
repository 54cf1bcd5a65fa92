//! # Broadside
//!
//! Client protocol state machine for two-player naval combat over
//! WebSocket.
//!
//! Broadside owns everything between a front-end and the match server:
//! the connection lifecycle, turn ownership, board reconciliation, and
//! reconnect/recovery. Front-ends send intents through a [`ClientHandle`]
//! and render [`ClientView`] snapshots.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use broadside::prelude::*;
//!
//! # async fn demo() -> Result<(), ClientError> {
//! let (client, mut view) = Client::start(ClientConfig::default());
//! while view.borrow().screen != Screen::MainMenu {
//!     view.changed().await.map_err(|_| ClientError::Stopped)?;
//! }
//! client.join("AB12").await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Layers
//!
//! ```text
//! broadside            ← client actor, screen controller, connection manager
//! broadside-match      ← turn flag, board views, match timers
//! broadside-session    ← screen, identity, reconnect epochs
//! broadside-protocol   ← wire types and codec
//! broadside-transport  ← Connector / Connection, WebSocket
//! ```

mod client;
mod config;
mod connection;
mod controller;
mod error;

pub use client::{Client, ClientHandle, ClientView};
pub use config::ClientConfig;
pub use connection::{ClosePolicy, ConnectionManager, Subscription};
pub use controller::{LinkEvent, ScreenController};
pub use error::ClientError;

pub mod prelude {
    pub use broadside_match::{BoardView, CellState, MatchConfig, MatchOutcome, MatchPhase};
    pub use broadside_protocol::{Coordinate, GameStats, Role};
    pub use broadside_session::Screen;

    pub use crate::{Client, ClientConfig, ClientError, ClientHandle, ClientView};
}
