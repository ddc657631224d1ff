//! Wire types for the credential server's HTTP contract.
//!
//! Every request body sent to the server and every response body read back
//! is defined here. The server speaks JSON with camelCase field names, so
//! most types carry `#[serde(rename_all = "camelCase")]`.
//!
//! ```text
//! POST /login          {username, password}         → {code, message, result}
//! POST /auth/register  {username, email, password}  → {code, message, result}
//! POST /verifyToken    {}                           → {code, message, result}
//! POST /logout                                       → {code, message}
//! ```

use serde::{Deserialize, Deserializer, Serialize};

use std::fmt;

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Body of `POST /login`.
///
/// `Debug` is implemented by hand so the password never ends up in a log
/// line, even when someone writes `debug!(?request)`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl LoginRequest {
    /// Creates a login request from anything string-like.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Body of `POST /auth/register`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl RegisterRequest {
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// The user record the server returns in `result`.
///
/// The server sends `id` as either a number or a string depending on the
/// backing store, so it is kept as an opaque string here. Fields the client
/// does not know about are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    #[serde(
        default,
        deserialize_with = "opaque_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,

    pub username: String,

    #[serde(default)]
    pub email: Option<String>,

    /// Domain entitlement flag (paid subscription).
    #[serde(default)]
    pub subscribed: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
}

impl Identity {
    /// An identity with only a username. Mostly useful in tests and when the
    /// server accepts a registration without echoing the record back.
    pub fn named(username: impl Into<String>) -> Self {
        Self {
            id: None,
            username: username.into(),
            email: None,
            subscribed: false,
            role: None,
            profile_picture: None,
        }
    }

    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_subscribed(mut self, subscribed: bool) -> Self {
        self.subscribed = subscribed;
        self
    }

    #[must_use]
    pub fn with_profile_picture(mut self, url: impl Into<String>) -> Self {
        self.profile_picture = Some(url.into());
        self
    }
}

/// Accepts `"id": 7` and `"id": "7"` alike.
fn opaque_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Int(i64),
        Text(String),
    }

    Ok(Option::<RawId>::deserialize(deserializer)?.map(|raw| match raw {
        RawId::Int(n) => n.to_string(),
        RawId::Text(s) => s,
    }))
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// The envelope every endpoint answers with.
///
/// `code` is the server's own status code (see [`ResponseCodes`]), which is
/// what the client branches on. The HTTP status only matters when the body
/// can't be parsed at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub code: i64,

    #[serde(default)]
    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Identity>,
}

impl ApiResponse {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            result: None,
        }
    }

    #[must_use]
    pub fn with_result(mut self, identity: Identity) -> Self {
        self.result = Some(identity);
        self
    }
}

// ---------------------------------------------------------------------------
// Response codes
// ---------------------------------------------------------------------------

/// The server-defined codes the client recognizes.
///
/// These are configuration rather than constants because different
/// deployments of the credential server have numbered them differently.
/// The defaults match the reference server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponseCodes {
    pub login_ok: i64,
    pub register_ok: i64,
    pub user_exists: i64,
    pub invalid_credentials: i64,
    pub missing_fields: i64,
    pub logout_ok: i64,
    pub token_valid: i64,
    pub token_invalid: i64,
    pub token_expired: i64,
    pub token_reused: i64,
    pub unauthorized: i64,
}

impl Default for ResponseCodes {
    fn default() -> Self {
        Self {
            login_ok: 1001,
            register_ok: 1002,
            user_exists: 1003,
            invalid_credentials: 1004,
            missing_fields: 1005,
            logout_ok: 1010,
            token_valid: 1040,
            token_invalid: 1041,
            token_expired: 1042,
            token_reused: 1043,
            unauthorized: 1044,
        }
    }
}

impl ResponseCodes {
    /// Maps a server code that was NOT the expected success code onto the
    /// client-facing failure taxonomy.
    pub fn classify(&self, code: i64) -> FailureCode {
        if code == self.invalid_credentials
            || code == self.missing_fields
            || code == self.user_exists
        {
            FailureCode::CredentialsInvalid
        } else if code == self.token_expired || code == self.token_reused {
            FailureCode::TokenExpiredOrReused
        } else if code == self.token_invalid || code == self.unauthorized {
            FailureCode::Unauthorized
        } else {
            FailureCode::NetworkOrServerError
        }
    }
}

// ---------------------------------------------------------------------------
// FailureCode
// ---------------------------------------------------------------------------

/// The normalized failure categories the UI understands.
///
/// Whatever went wrong (a server code, an HTTP status, a socket error) ends
/// up as exactly one of these, paired with a human-readable message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FailureCode {
    /// Wrong username/password, or required fields missing.
    CredentialsInvalid,
    /// The server could not be reached, timed out, or answered with
    /// something the client does not recognize.
    NetworkOrServerError,
    /// The session token expired or a refresh token was replayed.
    TokenExpiredOrReused,
    /// No usable token was presented.
    Unauthorized,
    /// A newer operation of the same kind overtook this one; its response
    /// was discarded without touching the session.
    Superseded,
}

impl FailureCode {
    /// The camelCase name used on the wire and in the UI.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CredentialsInvalid => "credentialsInvalid",
            Self::NetworkOrServerError => "networkOrServerError",
            Self::TokenExpiredOrReused => "tokenExpiredOrReused",
            Self::Unauthorized => "unauthorized",
            Self::Superseded => "superseded",
        }
    }
}

impl fmt::Display for FailureCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =========================================================================
// Tests
// =========================================================================
