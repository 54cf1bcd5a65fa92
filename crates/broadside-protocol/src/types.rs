//! Wire types for the naval-combat match protocol.
//!
//! Every frame on the wire is a UTF-8 JSON object carrying a `type`
//! discriminator. Server frames decode into the closed [`ServerEvent`]
//! sum type; client frames are built from [`ClientCommand`].
//!
//! The field names follow the match server exactly (including its
//! `shooted_cords` / `heated_cords` spelling), so the Rust names are
//! mapped with `#[serde(rename = ...)]` where they differ.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// One of the two fixed player identities in a session.
///
/// The creator of a session is always [`Role::Player1`]; whoever joins
/// with the room code is [`Role::Player2`]. On the wire a role is the
/// string `"player1"` / `"player2"`. Some server builds render it as the
/// bare number `1` / `2`, so deserialization accepts both forms.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase", try_from = "RoleRepr")]
pub enum Role {
    Player1,
    Player2,
}

impl Role {
    /// The other participant.
    pub fn opponent(self) -> Self {
        match self {
            Self::Player1 => Self::Player2,
            Self::Player2 => Self::Player1,
        }
    }

    /// The wire id (`"player1"` / `"player2"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Player1 => "player1",
            Self::Player2 => "player2",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepted spellings of a role on the wire.
#[derive(Deserialize)]
#[serde(untagged)]
enum RoleRepr {
    Name(String),
    Index(u64),
}

impl TryFrom<RoleRepr> for Role {
    type Error = String;

    fn try_from(repr: RoleRepr) -> Result<Self, Self::Error> {
        match repr {
            RoleRepr::Name(name) => match name.as_str() {
                "player1" => Ok(Self::Player1),
                "player2" => Ok(Self::Player2),
                other => Err(format!("unknown role id {other:?}")),
            },
            RoleRepr::Index(1) => Ok(Self::Player1),
            RoleRepr::Index(2) => Ok(Self::Player2),
            RoleRepr::Index(other) => Err(format!("unknown role index {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Coordinates and ships
// ---------------------------------------------------------------------------

/// A grid cell. Serialized as a two-element array `[x, y]`.
///
/// No bounds are checked on the client; the server owns the grid size.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(from = "(i32, i32)", into = "(i32, i32)")]
pub struct Coordinate {
    pub x: i32,
    pub y: i32,
}

impl Coordinate {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl From<(i32, i32)> for Coordinate {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

impl From<Coordinate> for (i32, i32) {
    fn from(c: Coordinate) -> Self {
        (c.x, c.y)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// One ship as reported inside a `STATE` snapshot.
///
/// Which fields are present depends on whose board the snapshot describes:
///
/// - `MY_SHOT` (opponent board): only `heated_cords` and `isKilled`.
///   Unhit cells of an enemy ship are never revealed.
/// - `ENEMY_SHOT` (own board): additionally the ship's extent, either as a
///   full `cords` list or as the two span endpoints `first_cord` and
///   `sec_cord` (older servers).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ShipReport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cords: Option<Vec<Coordinate>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_cord: Option<Coordinate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sec_cord: Option<Coordinate>,
    #[serde(default)]
    pub heated_cords: Vec<Coordinate>,
    #[serde(rename = "isKilled", default)]
    pub is_killed: bool,
}

impl ShipReport {
    /// Longest span accepted from `first_cord`/`sec_cord`: one board edge.
    pub const MAX_SPAN: u32 = 10;

    /// Reconstructs the cells this ship occupies, in order.
    ///
    /// Prefers the explicit `cords` list. Otherwise expands the span
    /// between `first_cord` and `sec_cord`, which must share a row or a
    /// column and cover at most [`MAX_SPAN`](Self::MAX_SPAN) cells.
    /// Returns an empty list when the extent is unknown or malformed.
    pub fn cells(&self) -> Vec<Coordinate> {
        if let Some(cords) = &self.cords {
            return cords.clone();
        }
        let (Some(a), Some(b)) = (self.first_cord, self.sec_cord) else {
            return Vec::new();
        };
        let within = |p: i32, q: i32| p.abs_diff(q) < Self::MAX_SPAN;
        if a.x == b.x && within(a.y, b.y) {
            (a.y.min(b.y)..=a.y.max(b.y))
                .map(|y| Coordinate::new(a.x, y))
                .collect()
        } else if a.y == b.y && within(a.x, b.x) {
            (a.x.min(b.x)..=a.x.max(b.x))
                .map(|x| Coordinate::new(x, a.y))
                .collect()
        } else {
            Vec::new()
        }
    }
}

/// Payload of a `STATE` frame: the full state of one board.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BoardReport {
    #[serde(default)]
    pub ships: Vec<ShipReport>,
    /// Every cell fired upon so far on this board.
    #[serde(default)]
    pub shooted_cords: Vec<Coordinate>,
}

/// Which board a `STATE` snapshot describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SnapshotMode {
    /// The opponent's board, after the local player's shot.
    MyShot,
    /// The local player's board, after the opponent's shot.
    EnemyShot,
}

/// Per-player statistics attached to `GAME_OVER`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GameStats {
    #[serde(default)]
    pub shots: u32,
    #[serde(default)]
    pub hits: u32,
    #[serde(default)]
    pub misses: u32,
    /// Hit percentage, 0.0–100.0.
    #[serde(default)]
    pub accuracy: f64,
    #[serde(rename = "sunkShips", default)]
    pub sunk_ships: u32,
}

// ---------------------------------------------------------------------------
// Server → client
// ---------------------------------------------------------------------------

/// Every event the match server can send.
///
/// `#[serde(tag = "type")]` gives the internally tagged shape the server
/// speaks: `{ "type": "GAME_START", "firstTurn": "player1" }`. The set is
/// closed: a frame whose `type` is not listed here fails to decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerEvent {
    /// The creator's room exists; share `roomCode` with the opponent.
    SessionCreated {
        #[serde(rename = "roomCode")]
        room_code: String,
    },

    /// Both players are in the room; announces who fires first.
    GameStart {
        #[serde(rename = "firstTurn")]
        first_turn: Role,
    },

    /// The local ship layout was accepted.
    ShipsPlaced,

    /// Both layouts are committed; the battle begins.
    BothPlayersReady {
        #[serde(default)]
        message: String,
    },

    /// Full replacement snapshot of one board.
    State {
        mode: SnapshotMode,
        data: BoardReport,
    },

    /// Terminal: the match is decided.
    GameOver { winner: Role, stats: GameStats },

    /// A rejected action or informational error.
    Error { message: String },

    /// Reply to `PING`.
    Pong,

    /// Authoritative turn grant.
    YourTurn,
}

impl ServerEvent {
    /// Wire discriminators of every variant, in declaration order.
    pub const KINDS: [&'static str; 9] = [
        "SESSION_CREATED",
        "GAME_START",
        "SHIPS_PLACED",
        "BOTH_PLAYERS_READY",
        "STATE",
        "GAME_OVER",
        "ERROR",
        "PONG",
        "YOUR_TURN",
    ];

    /// The wire discriminator of this event, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SessionCreated { .. } => "SESSION_CREATED",
            Self::GameStart { .. } => "GAME_START",
            Self::ShipsPlaced => "SHIPS_PLACED",
            Self::BothPlayersReady { .. } => "BOTH_PLAYERS_READY",
            Self::State { .. } => "STATE",
            Self::GameOver { .. } => "GAME_OVER",
            Self::Error { .. } => "ERROR",
            Self::Pong => "PONG",
            Self::YourTurn => "YOUR_TURN",
        }
    }
}

// ---------------------------------------------------------------------------
// Client → server
// ---------------------------------------------------------------------------

/// Every command the client sends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientCommand {
    /// Ask for a new room; expect `SESSION_CREATED`.
    CreateSession,

    /// Join an existing room; expect `GAME_START` or `ERROR`.
    JoinSession {
        #[serde(rename = "roomCode")]
        room_code: String,
    },

    /// Commit the local layout. Each ship is the list of its cells.
    PlaceShips { ships: Vec<Vec<Coordinate>> },

    /// Fire at the opponent's board.
    Shot { x: i32, y: i32 },

    /// Liveness probe; expect `PONG`.
    Ping,
}

impl ClientCommand {
    /// The wire discriminator of this command, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CreateSession => "CREATE_SESSION",
            Self::JoinSession { .. } => "JOIN_SESSION",
            Self::PlaceShips { .. } => "PLACE_SHIPS",
            Self::Shot { .. } => "SHOT",
            Self::Ping => "PING",
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
