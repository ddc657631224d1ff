//! Credential transport layer for Tollgate.
//!
//! Provides the [`CredentialTransport`] trait: the contract of the external
//! credential server (login, register, verify, logout) plus the one piece of
//! client-held state that travels with it, the session cookie.
//!
//! # Feature Flags
//!
//! - `http` (default): [`HttpTransport`], backed by `reqwest` with a cookie jar

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "http")]
mod http;

pub use error::TransportError;
#[cfg(feature = "http")]
pub use http::{Endpoints, HttpConfig, HttpTransport};

use std::future::Future;
use std::sync::Arc;

use tollgate_protocol::{ApiResponse, LoginRequest, RegisterRequest};

/// Cookie names the credential server uses for the session token.
pub const DEFAULT_COOKIE_NAMES: [&str; 2] = ["token", "accessToken"];

/// Talks to the credential server.
///
/// Every method resolves to the server's [`ApiResponse`] whenever the server
/// produced one, even if it is a rejection. `Err` is reserved for "no usable
/// answer": the network failed, the deadline passed, or the body was garbage.
/// Deciding what a response code *means* is the caller's job.
///
/// Timeouts are the transport's responsibility; callers don't add their own.
///
/// # Trait bounds
///
/// - `Send + Sync + 'static`: the transport is shared between the caller and
///   the background verification task.
/// - The returned futures are `Send` so they can run inside `tokio::spawn`.
pub trait CredentialTransport: Send + Sync + 'static {
    /// `POST /login` with credentials; the server sets the session cookie.
    fn login(
        &self,
        request: &LoginRequest,
    ) -> impl Future<Output = Result<ApiResponse, TransportError>> + Send;

    /// `POST /auth/register`.
    fn register(
        &self,
        request: &RegisterRequest,
    ) -> impl Future<Output = Result<ApiResponse, TransportError>> + Send;

    /// `POST /verifyToken` carrying whatever session cookie the client holds.
    fn verify_token(
        &self,
    ) -> impl Future<Output = Result<ApiResponse, TransportError>> + Send;

    /// `POST /logout`.
    fn logout(&self) -> impl Future<Output = Result<ApiResponse, TransportError>> + Send;

    /// Drops the client-held session cookie, if any.
    ///
    /// The server clears the cookie on logout too; clearing it locally as
    /// well means a stale token is never replayed even if that response was
    /// lost.
    fn clear_session_cookie(&self);
}

/// Lets callers keep a handle to a transport they also hand to a context.
impl<T: CredentialTransport> CredentialTransport for Arc<T> {
    fn login(
        &self,
        request: &LoginRequest,
    ) -> impl Future<Output = Result<ApiResponse, TransportError>> + Send {
        (**self).login(request)
    }

    fn register(
        &self,
        request: &RegisterRequest,
    ) -> impl Future<Output = Result<ApiResponse, TransportError>> + Send {
        (**self).register(request)
    }

    fn verify_token(
        &self,
    ) -> impl Future<Output = Result<ApiResponse, TransportError>> + Send {
        (**self).verify_token()
    }

    fn logout(&self) -> impl Future<Output = Result<ApiResponse, TransportError>> + Send {
        (**self).logout()
    }

    fn clear_session_cookie(&self) {
        (**self).clear_session_cookie();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_status_only_for_http_answers() {
        let status = TransportError::Status {
            status: 503,
            body: "down".into(),
        };

        assert_eq!(status.status(), Some(503));
        assert_eq!(TransportError::Timeout.status(), None);
        assert_eq!(TransportError::Request("refused".into()).status(), None);
    }

    #[test]
    fn test_transport_error_display_includes_detail() {
        let err = TransportError::Status {
            status: 502,
            body: "bad gateway".into(),
        };

        assert_eq!(err.to_string(), "server returned HTTP 502: bad gateway");
    }
}
