//! Error types for the session layer.

use std::fmt;
use std::io;

use tollgate_protocol::ProtocolError;

/// Errors that can occur while persisting or restoring session state.
///
/// The in-memory store itself can't fail; everything here comes from the
/// storage backing the [`PersistenceAdapter`](crate::PersistenceAdapter).
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Reading or writing the backing storage failed.
    #[error("storage i/o failed for {target}: {source}")]
    Storage {
        target: String,
        #[source]
        source: io::Error,
    },

    /// The stored snapshot couldn't be encoded or decoded.
    #[error(transparent)]
    Codec(#[from] ProtocolError),
}

impl SessionError {
    pub(crate) fn storage(target: impl fmt::Display, source: io::Error) -> Self {
        Self::Storage {
            target: target.to_string(),
            source,
        }
    }
}
