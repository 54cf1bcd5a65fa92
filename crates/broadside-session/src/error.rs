//! Error types for the session layer.

use broadside_protocol::Role;

/// Errors that can occur while mutating the session context.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The player's role is assigned once per session. A second,
    /// different assignment means the server and client disagree.
    #[error("identity already assigned as {current}, refusing {requested}")]
    IdentityAlreadyAssigned { current: Role, requested: Role },
}
