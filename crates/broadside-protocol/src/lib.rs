//! Wire protocol for Broadside, a client for two-player naval combat.
//!
//! This crate defines the "language" spoken between the client and the
//! match server:
//!
//! - **Types** ([`ServerEvent`], [`ClientCommand`], [`Coordinate`],
//!   [`Role`], ...) — the structures that travel on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`], [`decode_event`],
//!   [`Inbound`]) — text frames to typed values and back.
//! - **Errors** ([`ProtocolError`]) — what can go wrong while doing so.
//!
//! The protocol layer knows nothing about sockets or game flow:
//!
//! ```text
//! Transport (text frames) → Protocol (ServerEvent) → Match (turns, boards)
//! ```

mod codec;
mod error;
mod types;

pub use codec::{Codec, Inbound};
#[cfg(feature = "json")]
pub use codec::{JsonCodec, decode_event, encode_command};
pub use error::ProtocolError;
pub use types::{
    BoardReport, ClientCommand, Coordinate, GameStats, Role, ServerEvent, ShipReport,
    SnapshotMode,
};
