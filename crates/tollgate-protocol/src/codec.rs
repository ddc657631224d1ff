//! Codec trait and implementations for turning values into bytes and back.
//!
//! The HTTP transport lets `reqwest` handle JSON bodies itself, so the codec
//! is what everything else uses: the persistence layer stores its snapshot
//! through it, and tests use it to build fixture bodies. Swapping the
//! storage format means swapping the codec, nothing else.

use serde::{de::DeserializeOwned, Serialize};

use crate::ProtocolError;

/// Encodes values to bytes and decodes them back.
///
/// ## Trait bounds
///
/// - `Send + Sync`: the codec is shared by the session context, which may be
///   touched from any Tokio worker thread.
/// - `'static`: it owns everything it needs, so it can live inside
///   long-lived tasks.
///
/// `DeserializeOwned` (rather than `Deserialize<'de>`) means decoded values
/// own their data and the input buffer can be dropped right away.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if the value can't be represented in
    /// this format.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed, truncated,
    /// or don't match the expected shape.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] backed by `serde_json`.
///
/// JSON keeps persisted snapshots human-readable, which helps when someone
/// opens the state directory to see why the app thinks they are logged in.
///
/// Behind the `json` feature flag (enabled by default).
///
/// ## Example
///
/// ```rust
/// use tollgate_protocol::{Codec, Identity, JsonCodec};
///
/// let codec = JsonCodec;
/// let identity = Identity::named("alice").with_email("alice@x.com");
///
/// let bytes = codec.encode(&identity).unwrap();
/// let decoded: Identity = codec.decode(&bytes).unwrap();
/// assert_eq!(identity, decoded);
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
