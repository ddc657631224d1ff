//! HTTP transport implementation using `reqwest`.
//!
//! The session token lives in an `HttpOnly` cookie that the server sets on
//! login. The client never reads it; it only needs to hand it back on every
//! request, which is exactly what reqwest's cookie jar does.

use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::{CookieStore, Jar};
use reqwest::{Client, StatusCode, Url};
use serde::Serialize;
use tollgate_protocol::{ApiResponse, LoginRequest, RegisterRequest};
use tracing::{debug, trace};

use crate::{CredentialTransport, TransportError, DEFAULT_COOKIE_NAMES};

const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Paths of the four endpoints, relative to the base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub login: String,
    pub register: String,
    pub verify: String,
    pub logout: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            login: "/login".into(),
            register: "/auth/register".into(),
            verify: "/verifyToken".into(),
            logout: "/logout".into(),
        }
    }
}

/// Settings for [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Origin (and optional path prefix) of the credential server,
    /// e.g. `https://auth.example.com/api`.
    pub base_url: String,
    pub endpoints: Endpoints,
    /// Whole-request deadline. The coordinator has no timeout of its own.
    pub timeout: Duration,
    pub user_agent: String,
    /// Cookies that carry the session token; all are cleared together.
    pub cookie_names: Vec<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3000".into(),
            endpoints: Endpoints::default(),
            timeout: Duration::from_secs(10),
            user_agent: APP_USER_AGENT.into(),
            cookie_names: DEFAULT_COOKIE_NAMES.iter().map(|n| n.to_string()).collect(),
        }
    }
}

impl HttpConfig {
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }
}

// ---------------------------------------------------------------------------
// HttpTransport
// ---------------------------------------------------------------------------

/// A [`CredentialTransport`] that speaks JSON over HTTP(S).
pub struct HttpTransport {
    client: Client,
    jar: Arc<Jar>,
    base: Url,
    endpoints: Endpoints,
    cookie_names: Vec<String>,
}

impl HttpTransport {
    /// Builds the HTTP client and its cookie jar.
    ///
    /// # Errors
    /// - [`TransportError::InvalidUrl`] if `base_url` does not parse.
    /// - [`TransportError::Client`] if reqwest refuses the configuration.
    pub fn new(config: HttpConfig) -> Result<Self, TransportError> {
        let mut base = Url::parse(&config.base_url)
            .map_err(|e| TransportError::InvalidUrl(format!("{}: {e}", config.base_url)))?;

        // `Url::join` replaces the last path segment unless the base ends
        // with a slash, which would silently drop an `/api` prefix.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let jar = Arc::new(Jar::default());
        let client = Client::builder()
            .cookie_provider(Arc::clone(&jar))
            .timeout(config.timeout)
            .user_agent(config.user_agent)
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;

        debug!(base = %base, "http transport ready");

        Ok(Self {
            client,
            jar,
            base,
            endpoints: config.endpoints,
            cookie_names: config.cookie_names,
        })
    }

    /// The normalized base URL (always ends with `/`).
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Whether the jar currently holds a cookie with this name for the
    /// server's origin.
    pub fn has_cookie(&self, name: &str) -> bool {
        let Some(header) = self.jar.cookies(&self.base) else {
            return false;
        };
        let Ok(header) = header.to_str() else {
            return false;
        };
        header
            .split(';')
            .filter_map(|pair| pair.trim().split_once('='))
            .any(|(key, _)| key == name)
    }

    fn endpoint(&self, path: &str) -> Result<Url, TransportError> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|e| TransportError::InvalidUrl(format!("{path}: {e}")))
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: Option<&B>,
    ) -> Result<ApiResponse, TransportError> {
        let url = self.endpoint(path)?;
        trace!(%url, "POST");

        let mut request = self.client.post(url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(map_reqwest_error)?;

        decode_envelope(status, &bytes)
    }
}

/// Turns a raw HTTP answer into the protocol envelope.
///
/// A parseable envelope wins regardless of status, because the server
/// reports rejections as `{code, message}` with a 4xx status.
fn decode_envelope(status: StatusCode, bytes: &[u8]) -> Result<ApiResponse, TransportError> {
    match serde_json::from_slice::<ApiResponse>(bytes) {
        Ok(envelope) => {
            if !status.is_success() {
                debug!(%status, code = envelope.code, "server answered with error status");
            }
            Ok(envelope)
        }
        Err(e) if status.is_success() => Err(TransportError::Decode(e.to_string())),
        Err(_) => Err(TransportError::Status {
            status: status.as_u16(),
            body: String::from_utf8_lossy(bytes).into_owned(),
        }),
    }
}

fn map_reqwest_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Request(e.to_string())
    }
}

/// An already-expired `Set-Cookie` value for `name`, scoped to the host.
///
/// Adding it to the jar evicts the stored cookie of the same name and path.
fn expired_cookie(name: &str, secure: bool) -> String {
    let mut cookie = format!(
        "{name}=; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT; Path=/; SameSite=Lax"
    );
    // The jar rejects `Secure` cookies for plain-http origins.
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

impl CredentialTransport for HttpTransport {
    async fn login(&self, request: &LoginRequest) -> Result<ApiResponse, TransportError> {
        self.post(&self.endpoints.login, Some(request)).await
    }

    async fn register(&self, request: &RegisterRequest) -> Result<ApiResponse, TransportError> {
        self.post(&self.endpoints.register, Some(request)).await
    }

    async fn verify_token(&self) -> Result<ApiResponse, TransportError> {
        self.post(&self.endpoints.verify, Some(&serde_json::json!({}))).await
    }

    async fn logout(&self) -> Result<ApiResponse, TransportError> {
        self.post::<()>(&self.endpoints.logout, None).await
    }

    fn clear_session_cookie(&self) {
        let secure = self.base.scheme() == "https";
        for name in &self.cookie_names {
            self.jar.add_cookie_str(&expired_cookie(name, secure), &self.base);
        }
        debug!(cookies = ?self.cookie_names, "session cookies cleared");
    }
}
