//! Client session state for Broadside.
//!
//! This crate holds the state that outlives any single connection:
//!
//! 1. **Screen** — which view is active ([`Screen`])
//! 2. **Identity** — this player's role, the first mover, the committed
//!    layout, the room code ([`SessionContext`])
//! 3. **Epochs** — a counter bumped on every reconnect; anything captured
//!    under an older epoch must stop acting ([`Epoch`], [`EpochToken`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Match Layer (above)  ← reads identity, arms timers under the current epoch
//!     ↕
//! Session Layer (this crate)  ← owns the live connection and the epoch
//!     ↕
//! Protocol Layer (below)  ← provides Role, Coordinate
//! ```

mod epoch;
mod error;
mod screen;
mod session;

pub use epoch::{Epoch, EpochToken};
pub use error::SessionError;
pub use screen::Screen;
pub use session::{LiveConnection, SessionContext};
