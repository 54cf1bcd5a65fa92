//! Codec trait, the JSON codec, and the validating frame decoder.
//!
//! The [`Codec`] trait is the generic "bytes ⇄ type" strategy. On top of
//! it, [`Inbound::from_text`] is the one entry point the client uses for
//! every server frame: it never fails, it classifies. Either the frame is
//! a known [`ServerEvent`] or it is [`Inbound::Unparseable`] with the
//! reason attached, so a bad frame can be logged and dropped without
//! anything unwinding past the message loop.

use serde::{de::DeserializeOwned, Serialize};

use crate::{ClientCommand, ProtocolError, ServerEvent};

/// A codec that can encode Rust types to bytes and decode bytes back.
///
/// `Send + Sync + 'static` so one codec value can live inside a
/// long-running client task.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed or
    /// don't match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] backed by `serde_json`. The match server speaks JSON text
/// frames only, so this is the codec the client uses.
///
/// ```rust
/// use broadside_protocol::{ClientCommand, Codec, JsonCodec};
///
/// let bytes = JsonCodec.encode(&ClientCommand::Shot { x: 3, y: 4 }).unwrap();
/// let back: ClientCommand = JsonCodec.decode(&bytes).unwrap();
/// assert_eq!(back, ClientCommand::Shot { x: 3, y: 4 });
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

// ---------------------------------------------------------------------------
// Frame-level helpers
// ---------------------------------------------------------------------------

/// Serializes a command into the text frame the server expects.
///
/// # Errors
/// Returns `ProtocolError::Encode` if serialization fails.
#[cfg(feature = "json")]
pub fn encode_command(command: &ClientCommand) -> Result<String, ProtocolError> {
    serde_json::to_string(command).map_err(ProtocolError::Encode)
}

/// Validates and decodes one inbound text frame.
///
/// The discriminator is checked before the schema so the error tells
/// apart "not a frame at all", "a frame we don't know", and "a known
/// frame with a bad body".
///
/// # Errors
/// - [`ProtocolError::Decode`] — not JSON, or a known kind with a bad body
/// - [`ProtocolError::MissingDiscriminator`] — no string `type` field
/// - [`ProtocolError::UnknownKind`] — `type` outside the event set
#[cfg(feature = "json")]
pub fn decode_event(text: &str) -> Result<ServerEvent, ProtocolError> {
    let value: serde_json::Value =
        serde_json::from_str(text).map_err(ProtocolError::Decode)?;

    let kind = value
        .as_object()
        .and_then(|obj| obj.get("type"))
        .and_then(serde_json::Value::as_str)
        .ok_or(ProtocolError::MissingDiscriminator)?;

    if !ServerEvent::KINDS.contains(&kind) {
        return Err(ProtocolError::UnknownKind(kind.to_owned()));
    }

    serde_json::from_value(value).map_err(ProtocolError::Decode)
}

/// The result of classifying one inbound frame.
#[derive(Debug)]
pub enum Inbound {
    /// A recognized, schema-valid server event.
    Event(ServerEvent),
    /// Anything else. Log it and move on.
    Unparseable(ProtocolError),
}

#[cfg(feature = "json")]
impl Inbound {
    /// Classifies a raw text frame. Never panics, never fails.
    pub fn from_text(text: &str) -> Self {
        match decode_event(text) {
            Ok(event) => Self::Event(event),
            Err(e) => Self::Unparseable(e),
        }
    }
}
