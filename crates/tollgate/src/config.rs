//! Configuration for an [`AuthContext`](crate::AuthContext).

use tollgate_poll::PollConfig;
use tollgate_protocol::ResponseCodes;
use tollgate_session::DEFAULT_STORAGE_KEY;
#[cfg(feature = "http")]
use tollgate_transport::HttpConfig;
use tracing::warn;

/// Everything an [`AuthContext`](crate::AuthContext) needs besides its
/// transport and storages.
///
/// `Default` gives a working setup against a local credential server:
/// 5 s verification interval, the reference server's response codes, and
/// the snapshot under [`DEFAULT_STORAGE_KEY`].
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Codes the server answers with.
    pub codes: ResponseCodes,
    /// Verification polling.
    pub poll: PollConfig,
    /// Durable-storage key for the persisted snapshot.
    pub storage_key: String,
    /// Base URL, endpoint paths, timeout, and cookie names for
    /// [`HttpTransport`](tollgate_transport::HttpTransport).
    #[cfg(feature = "http")]
    pub http: HttpConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            codes: ResponseCodes::default(),
            poll: PollConfig::default(),
            storage_key: DEFAULT_STORAGE_KEY.into(),
            #[cfg(feature = "http")]
            http: HttpConfig::default(),
        }
    }
}

impl AuthConfig {
    /// Defaults, talking to the credential server at `base_url`.
    #[cfg(feature = "http")]
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            http: HttpConfig::with_base_url(base_url),
            ..Default::default()
        }
    }

    /// Clamp or replace out-of-range values so the config is safe to use.
    ///
    /// Called automatically by the builder.
    pub fn validated(mut self) -> Self {
        self.poll = self.poll.validated();
        if self.storage_key.trim().is_empty() {
            warn!(
                fallback = DEFAULT_STORAGE_KEY,
                "empty storage key, using default"
            );
            self.storage_key = DEFAULT_STORAGE_KEY.into();
        }
        self
    }
}
