//! Turn and board reconciliation for Broadside.
//!
//! The [`Reconciler`] consumes typed server events together with the
//! [`SessionContext`](broadside_session::SessionContext) and produces the
//! two board views and the turn flag. It owns the one-shot timers a match
//! needs (first-turn fallback, end-screen delay, notice expiry), each
//! tagged with the epoch it was armed under.
//!
//! # How it fits in the stack
//!
//! ```text
//! Client (above)  ← drives events and intents through the reconciler
//!     ↕
//! Match Layer (this crate)  ← turn flag, pending-shot lock, board views
//!     ↕
//! Session Layer (below)  ← identity, screen, epoch
//! ```

mod board;
mod config;
mod error;
mod phase;
mod reconciler;
mod timer;

pub use board::{BoardView, CellState, ObservedShip};
pub use config::MatchConfig;
pub use error::IntentError;
pub use phase::MatchPhase;
pub use reconciler::{MatchOutcome, Reconciler};
pub use timer::TimerKind;
