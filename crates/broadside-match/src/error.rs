//! Error types for the match layer.

use broadside_protocol::Coordinate;

use crate::MatchPhase;

/// Why a local intent was dropped without touching the network.
///
/// None of these are failures of the match: the caller logs at `debug`
/// and carries on. No state changes when one is returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntentError {
    /// No live connection to send on.
    #[error("not connected")]
    Disconnected,

    /// The turn flag is false.
    #[error("not your turn")]
    NotYourTurn,

    /// The match is over.
    #[error("game already finished")]
    GameFinished,

    /// A previous shot has not been answered yet.
    #[error("a shot is already pending")]
    ShotPending,

    /// The target is already in the opponent board's shot history.
    #[error("cell {0} was already fired upon")]
    AlreadyFired(Coordinate),

    /// `join_session` with a blank room code.
    #[error("room code is empty")]
    EmptyRoomCode,

    /// `commit_placement` outside the placement phase.
    #[error("cannot commit placement while {0}")]
    NotPlacing(MatchPhase),

    /// `commit_placement` with no ships.
    #[error("ship layout is empty")]
    EmptyLayout,
}
