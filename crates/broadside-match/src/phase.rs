use std::fmt;

/// Where a match stands, from this client's point of view.
///
/// ```text
/// Idle → AwaitingStart → Placing → AwaitingOpponentReady → (MyTurn ⇄ OpponentTurn) → Finished
/// ```
///
/// `MyTurn` / `OpponentTurn` are the battle stage split by the turn flag.
/// `OpponentTurn` also covers "my shot is in flight".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MatchPhase {
    #[default]
    Idle,
    AwaitingStart,
    Placing,
    AwaitingOpponentReady,
    MyTurn,
    OpponentTurn,
    Finished,
}

impl MatchPhase {
    /// `true` once both layouts are committed and shots may fly.
    pub fn is_battle(self) -> bool {
        matches!(self, Self::MyTurn | Self::OpponentTurn)
    }
}

impl fmt::Display for MatchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::AwaitingStart => write!(f, "AwaitingStart"),
            Self::Placing => write!(f, "Placing"),
            Self::AwaitingOpponentReady => write!(f, "AwaitingOpponentReady"),
            Self::MyTurn => write!(f, "MyTurn"),
            Self::OpponentTurn => write!(f, "OpponentTurn"),
            Self::Finished => write!(f, "Finished"),
        }
    }
}
