//! What the auth operations hand back to the UI.

use serde::Serialize;
use tollgate_protocol::{ApiResponse, FailureCode, Identity, ResponseCodes};
use tollgate_transport::TransportError;

/// A login or registration the server accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthSuccess {
    /// The server's own success code.
    pub code: i64,
    pub message: String,
    pub identity: Identity,
}

/// A failed operation, normalized to a category plus a message.
///
/// Serializes as `{"code": "...", "message": "..."}`; the raw server code,
/// when there was one, is kept for logging but not put on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{code}: {message}")]
pub struct AuthFailure {
    pub code: FailureCode,
    pub message: String,
    #[serde(skip)]
    pub server_code: Option<i64>,
}

impl AuthFailure {
    pub fn new(code: FailureCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            server_code: None,
        }
    }

    /// Input rejected before anything was sent.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(FailureCode::CredentialsInvalid, message)
    }

    /// A newer operation overtook this one; its response was dropped.
    pub fn superseded() -> Self {
        Self::new(FailureCode::Superseded, "superseded by a newer request")
    }

    /// A server answer that wasn't the expected success code.
    ///
    /// Falls back to a generic message when the server sent none, so the UI
    /// always has something to show.
    pub fn from_response(response: &ApiResponse, codes: &ResponseCodes) -> Self {
        let message = if response.message.trim().is_empty() {
            format!("request rejected (code {})", response.code)
        } else {
            response.message.clone()
        };
        Self {
            code: codes.classify(response.code),
            message,
            server_code: Some(response.code),
        }
    }
}

impl From<&TransportError> for AuthFailure {
    fn from(err: &TransportError) -> Self {
        let code = match err.status() {
            Some(401 | 403) => FailureCode::Unauthorized,
            _ => FailureCode::NetworkOrServerError,
        };
        Self::new(code, err.to_string())
    }
}

impl From<TransportError> for AuthFailure {
    fn from(err: TransportError) -> Self {
        Self::from(&err)
    }
}
