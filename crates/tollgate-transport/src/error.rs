/// Errors that can occur in the transport layer.
///
/// A `TransportError` means the credential server never gave a usable answer.
/// A server that answered with its own failure code is NOT a transport error;
/// that arrives as an ordinary [`ApiResponse`](tollgate_protocol::ApiResponse).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The request could not be sent or the connection broke.
    #[error("request failed: {0}")]
    Request(String),

    /// The transport's own deadline elapsed.
    #[error("request timed out")]
    Timeout,

    /// Non-2xx answer whose body is not a protocol envelope.
    #[error("server returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// 2xx answer whose body is not a protocol envelope.
    #[error("malformed response: {0}")]
    Decode(String),

    /// The base URL or an endpoint path doesn't form a valid URL.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// The underlying HTTP client could not be constructed.
    #[error("failed to build http client: {0}")]
    Client(String),
}

impl TransportError {
    /// The HTTP status, when the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
