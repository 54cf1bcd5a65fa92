//! Error types for the protocol layer.
//!
//! A `ProtocolError` always means the problem is in the *shape* of a
//! frame, never in the network or in game rules. Callers log it and drop
//! the frame; the connection stays up.

/// Errors that can occur while encoding commands or decoding frames.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization of an outbound command failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// The frame is not valid JSON, or is JSON that does not match the
    /// schema of its declared event kind (missing field, wrong type).
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// Well-formed JSON, but not an object with a string `type` field.
    #[error("frame has no string `type` discriminator")]
    MissingDiscriminator,

    /// Well-formed frame whose `type` is outside the known event set.
    #[error("unrecognized event kind {0:?}")]
    UnknownKind(String),

    /// The frame passed deserialization but violates a protocol rule.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
