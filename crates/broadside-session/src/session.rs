//! The session context: UI-lifetime state shared by every layer.
//!
//! Exactly one `SessionContext` exists per running client. It is owned by
//! the client task and handed out as `&mut` to the layers that mutate it,
//! so it needs no locks. Only the [`Epoch`] inside it is shared across
//! tasks.

use std::fmt;
use std::sync::Arc;

use broadside_protocol::{Coordinate, Role};

use crate::{Epoch, EpochToken, Screen, SessionError};

/// The part of a connection the session needs: tear it down, ask if up.
pub trait LiveConnection: Send + Sync {
    /// Releases the connection. Idempotent.
    fn disconnect(&self);

    /// `true` while the connection can carry frames.
    fn is_connected(&self) -> bool;
}

/// Process-wide state for one game session.
#[derive(Default)]
pub struct SessionContext {
    screen: Screen,
    player: Option<Role>,
    first_mover: Option<Role>,
    ship_layout: Vec<Vec<Coordinate>>,
    room_code: Option<String>,
    connection: Option<Arc<dyn LiveConnection>>,
    epoch: Epoch,
}

impl fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionContext")
            .field("screen", &self.screen)
            .field("player", &self.player)
            .field("first_mover", &self.first_mover)
            .field("ships", &self.ship_layout.len())
            .field("room_code", &self.room_code)
            .field("connected", &self.is_connected())
            .field("epoch", &self.epoch.current())
            .finish()
    }
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    // -- screen -----------------------------------------------------------

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn set_screen(&mut self, screen: Screen) {
        if self.screen != screen {
            tracing::info!(from = %self.screen, to = %screen, "screen change");
            self.screen = screen;
        }
    }

    // -- identity ---------------------------------------------------------

    /// This player's role, once assigned.
    pub fn player(&self) -> Option<Role> {
        self.player
    }

    /// Assigns this player's role.
    ///
    /// Re-assigning the same role is a no-op.
    ///
    /// # Errors
    /// Returns [`SessionError::IdentityAlreadyAssigned`] if a different
    /// role is already set; the existing role is kept.
    pub fn assign_player(&mut self, role: Role) -> Result<(), SessionError> {
        match self.player {
            None => {
                tracing::info!(player = %role, "identity assigned");
                self.player = Some(role);
                Ok(())
            }
            Some(current) if current == role => Ok(()),
            Some(current) => Err(SessionError::IdentityAlreadyAssigned {
                current,
                requested: role,
            }),
        }
    }

    pub fn first_mover(&self) -> Option<Role> {
        self.first_mover
    }

    pub fn set_first_mover(&mut self, role: Role) {
        self.first_mover = Some(role);
    }

    /// The locally committed layout: one cell list per ship.
    pub fn ship_layout(&self) -> &[Vec<Coordinate>] {
        &self.ship_layout
    }

    pub fn set_ship_layout(&mut self, layout: Vec<Vec<Coordinate>>) {
        self.ship_layout = layout;
    }

    pub fn room_code(&self) -> Option<&str> {
        self.room_code.as_deref()
    }

    pub fn set_room_code(&mut self, code: impl Into<String>) {
        self.room_code = Some(code.into());
    }

    // -- connection -------------------------------------------------------

    /// Makes `connection` the live connection.
    ///
    /// A previously attached connection is disconnected first, so at most
    /// one is ever live.
    pub fn attach_connection(&mut self, connection: Arc<dyn LiveConnection>) {
        if let Some(old) = self.connection.replace(connection) {
            old.disconnect();
        }
    }

    /// `true` if a connection is attached and reports itself up.
    pub fn is_connected(&self) -> bool {
        self.connection
            .as_ref()
            .is_some_and(|conn| conn.is_connected())
    }

    // -- epoch ------------------------------------------------------------

    pub fn epoch(&self) -> &Epoch {
        &self.epoch
    }

    /// Captures the current epoch.
    pub fn token(&self) -> EpochToken {
        self.epoch.token()
    }

    /// Tears everything down and starts a new epoch.
    ///
    /// Disconnects the live connection, resets the screen to
    /// [`Screen::Loading`], clears identity, first mover, layout and room
    /// code, then advances the epoch. Returns a token for the new epoch.
    pub fn reconnect(&mut self) -> EpochToken {
        if let Some(conn) = self.connection.take() {
            conn.disconnect();
        }
        self.set_screen(Screen::Loading);
        self.clear_game();
        let epoch = self.epoch.advance();
        tracing::info!(epoch, "session reset for reconnect");
        self.epoch.token()
    }

    /// Clears per-game state but keeps the connection and the epoch.
    pub fn reset_game(&mut self) {
        self.clear_game();
    }

    fn clear_game(&mut self) {
        self.player = None;
        self.first_mover = None;
        self.ship_layout.clear();
        self.room_code = None;
    }
}
