use std::fmt;

/// The view the client is currently showing.
///
/// ```text
/// Loading ─(open)→ MainMenu ─→ Create ─(GAME_START)→ Build ─(SHIPS_PLACED)→ InGame ─(GAME_OVER +3s)→ EndGame
///    ↑                 └────→ Search ─(GAME_START)──┘
///    └──(reconnect)── any;   any ─(fatal close)→ Error
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Screen {
    /// Connecting; nothing to interact with yet.
    #[default]
    Loading,
    /// Fatal transport failure; offers a manual retry.
    Error,
    MainMenu,
    /// Entering a room code to join.
    Search,
    /// Room created, waiting for an opponent to join.
    Create,
    /// Ship placement.
    Build,
    /// Battle.
    InGame,
    /// Final statistics.
    EndGame,
}

impl Screen {
    /// Lobby screens on which an abnormal close is recovered silently.
    pub fn is_lobby(self) -> bool {
        matches!(self, Self::Search | Self::Create)
    }
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Loading => "loading",
            Self::Error => "error",
            Self::MainMenu => "main-menu",
            Self::Search => "search",
            Self::Create => "create",
            Self::Build => "build",
            Self::InGame => "in-game",
            Self::EndGame => "end-game",
        };
        f.write_str(name)
    }
}
