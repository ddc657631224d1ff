//! Unified error type for the Tollgate framework.

use tollgate_protocol::ProtocolError;
use tollgate_session::SessionError;
use tollgate_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// Only *construction* returns this (building the HTTP client, opening the
/// state directory). The auth operations themselves never do: they report
/// an [`AuthFailure`](crate::AuthFailure) or a plain `bool`, because the UI
/// needs a category and a message, not an error chain.
#[derive(Debug, thiserror::Error)]
pub enum TollgateError {
    /// A transport-level error (bad base URL, client construction).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (storage I/O, snapshot codec).
    #[error(transparent)]
    Session(#[from] SessionError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::InvalidUrl("not a url".into());
        let tollgate_err: TollgateError = err.into();
        assert!(matches!(tollgate_err, TollgateError::Transport(_)));
        assert!(tollgate_err.to_string().contains("not a url"));
    }

    #[test]
    fn test_from_protocol_error() {
        let bad = serde_json::from_str::<u8>("x").unwrap_err();
        let tollgate_err: TollgateError = ProtocolError::Decode(bad).into();
        assert!(matches!(tollgate_err, TollgateError::Protocol(_)));
    }

    #[test]
    fn test_from_session_error() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let tollgate_err: TollgateError = SessionError::Storage {
            target: "state".into(),
            source: io,
        }
        .into();
        assert!(matches!(tollgate_err, TollgateError::Session(_)));
    }
}
