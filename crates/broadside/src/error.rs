//! Unified error type for the Broadside client.

use std::time::Duration;

use broadside_match::IntentError;
use broadside_protocol::ProtocolError;
use broadside_session::SessionError;
use broadside_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each wrapped variant generates a `From`
/// impl, so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// A transport-level error (connect, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (identity conflict).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A local intent that was dropped before reaching the network.
    #[error(transparent)]
    Intent(#[from] IntentError),

    /// `send` before readiness or after teardown.
    #[error("not connected")]
    NotConnected,

    /// `connect` on a manager that was already connected once.
    #[error("connection manager already started")]
    AlreadyStarted,

    /// The transport did not become ready in time.
    #[error("connect timed out after {0:?}")]
    ConnectTimeout(Duration),

    /// The client task has exited.
    #[error("client stopped")]
    Stopped,
}
