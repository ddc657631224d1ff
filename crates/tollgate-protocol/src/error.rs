//! Error types for the protocol layer.
//!
//! Each crate in Tollgate defines its own error enum, so a `ProtocolError`
//! always means "these bytes and this type didn't agree", never a network
//! or storage problem.

/// Errors that can occur while encoding or decoding.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust value into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, missing required fields, or
    /// wrong data types.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),
}
