//! Transport abstraction layer for Broadside.
//!
//! Provides the [`Connector`] and [`Connection`] traits that abstract over
//! how the client reaches the match server. The rest of the client only
//! depends on four things a connection can do: report readiness (a
//! successful [`Connector::connect`]), deliver text frames in order,
//! report a close with a code, and send text.
//!
//! # Feature Flags
//!
//! - `websocket` (default) — WebSocket client via `tokio-tungstenite`

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnection, WebSocketConnector};

use std::fmt;
use std::future::Future;

/// Opaque identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Why and how a connection ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseInfo {
    pub code: u16,
    pub reason: String,
}

impl CloseInfo {
    /// Intentional close by either side.
    pub const NORMAL: u16 = 1000;
    /// The peer sent a close frame without a status code.
    pub const NO_STATUS: u16 = 1005;
    /// The connection dropped without a close frame.
    pub const ABNORMAL: u16 = 1006;

    pub fn new(code: u16, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }

    pub fn normal() -> Self {
        Self::new(Self::NORMAL, "")
    }

    pub fn abnormal(reason: impl Into<String>) -> Self {
        Self::new(Self::ABNORMAL, reason)
    }

    pub fn is_normal(&self) -> bool {
        self.code == Self::NORMAL
    }
}

impl fmt::Display for CloseInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.reason.is_empty() {
            write!(f, "{}", self.code)
        } else {
            write!(f, "{} ({})", self.code, self.reason)
        }
    }
}

/// One unit of inbound traffic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A text frame, delivered in arrival order.
    Text(String),
    /// The connection is over. No further frames follow.
    Closed(CloseInfo),
}

/// Opens outbound connections.
///
/// The returned futures are `Send` so a generic client can drive them
/// from a spawned task.
pub trait Connector: Send + Sync + 'static {
    /// The connection type produced by this connector.
    type Connection: Connection;

    /// Opens a connection. Resolves once the transport is ready to carry
    /// frames, or fails if it errors before that.
    fn connect(
        &self,
        url: &str,
    ) -> impl Future<Output = Result<Self::Connection, TransportError>> + Send;
}

/// A single established connection that carries text frames.
pub trait Connection: Send + Sync + 'static {
    /// Sends one text frame.
    fn send_text(&self, text: &str) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Receives the next frame.
    ///
    /// Returns `Ok(Frame::Closed(_))` when the connection ends, with the
    /// close code the peer reported (or 1006 if the stream just stopped).
    /// `Err` means the stream failed mid-flight; callers treat it as an
    /// abnormal close.
    fn recv(&self) -> impl Future<Output = Result<Frame, TransportError>> + Send;

    /// Closes the connection with a normal close code.
    fn close(&self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;
}
