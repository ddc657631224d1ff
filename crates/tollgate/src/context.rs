//! The auth action coordinator.
//!
//! [`AuthContext`] is the one object the UI talks to. It ties the layers
//! together:
//!
//! ```text
//! UI ──login/register/verify/logout──→ AuthContext
//!                                        │  ├─→ CredentialTransport (network, cookie)
//!                                        │  ├─→ SessionStore        (state, subscribers)
//!                                        │  ├─→ PersistenceAdapter  (snapshot)
//!                                        │  └─→ VerificationScheduler (5 s polls)
//!                                        ↓
//!                              AuthSuccess / AuthFailure / bool
//! ```
//!
//! Every state change goes through one place (`Inner::commit`), which
//! compares "authenticated" before and after and arms or disarms the
//! scheduler on the edge, then mirrors the snapshot. No other code path
//! touches the scheduler on a transition, so polling can't be started twice
//! or left running after logout.

use std::path::PathBuf;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use tollgate_poll::{
    PollConfig, PollMetrics, PollOutcome, SchedulerState, VerificationScheduler, Verifier,
};
use tollgate_protocol::{
    ApiResponse, FailureCode, Identity, LoginRequest, RegisterRequest, ResponseCodes,
};
use tollgate_session::{
    AuthState, FileStorage, MemoryStorage, OpKind, PersistenceAdapter, Profile, SequenceFence,
    Session, SessionStore, Storage, Ticket, Transition,
};
use tollgate_transport::{CredentialTransport, TransportError};
#[cfg(feature = "http")]
use tollgate_transport::HttpTransport;

use crate::{AuthConfig, AuthFailure, AuthSuccess, TollgateError};

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for an [`AuthContext`].
///
/// # Example
///
/// ```rust,ignore
/// use tollgate::prelude::*;
///
/// let auth = AuthContextBuilder::new()
///     .config(AuthConfig::with_base_url("https://auth.example.com/api"))
///     .state_dir(dirs.data_dir().join("session"))
///     .build_http()?;
///
/// auth.restore().await;
/// ```
pub struct AuthContextBuilder {
    config: AuthConfig,
    durable: Option<Box<dyn Storage>>,
    scoped: Option<Box<dyn Storage>>,
    state_dir: Option<PathBuf>,
}

impl AuthContextBuilder {
    /// Default config, in-memory storages.
    pub fn new() -> Self {
        Self {
            config: AuthConfig::default(),
            durable: None,
            scoped: None,
            state_dir: None,
        }
    }

    pub fn config(mut self, config: AuthConfig) -> Self {
        self.config = config;
        self
    }

    pub fn poll(mut self, poll: PollConfig) -> Self {
        self.config.poll = poll;
        self
    }

    pub fn codes(mut self, codes: ResponseCodes) -> Self {
        self.config.codes = codes;
        self
    }

    /// Where the persisted snapshot lives. Overrides [`state_dir`](Self::state_dir).
    pub fn durable_storage(mut self, storage: impl Storage) -> Self {
        self.durable = Some(Box::new(storage));
        self
    }

    /// Process-lifetime storage that logout wipes.
    pub fn scoped_storage(mut self, storage: impl Storage) -> Self {
        self.scoped = Some(Box::new(storage));
        self
    }

    /// Keep the snapshot in files under `dir` (created on build).
    pub fn state_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.state_dir = Some(dir.into());
        self
    }

    /// Builds a context around `transport`.
    ///
    /// # Errors
    /// [`TollgateError::Session`] if the state directory can't be created.
    pub fn build<T: CredentialTransport>(
        self,
        transport: T,
    ) -> Result<AuthContext<T>, TollgateError> {
        let config = self.config.validated();

        let durable: Box<dyn Storage> = match (self.durable, self.state_dir) {
            (Some(storage), _) => storage,
            (None, Some(dir)) => Box::new(FileStorage::open(dir)?),
            (None, None) => Box::new(MemoryStorage::new()),
        };
        let scoped = self
            .scoped
            .unwrap_or_else(|| Box::new(MemoryStorage::new()));
        let persistence = PersistenceAdapter::new(durable, scoped, config.storage_key.clone());

        Ok(AuthContext::new(transport, persistence, config))
    }

    /// Builds a context with an [`HttpTransport`] from `config.http`.
    ///
    /// # Errors
    /// [`TollgateError::Transport`] for a bad base URL or client setup, and
    /// everything [`build`](Self::build) can return.
    #[cfg(feature = "http")]
    pub fn build_http(self) -> Result<AuthContext<HttpTransport>, TollgateError> {
        let transport = HttpTransport::new(self.config.http.clone())?;
        self.build(transport)
    }
}

impl Default for AuthContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// AuthContext
// ---------------------------------------------------------------------------

/// The client's authentication context.
///
/// Cheap to clone; all clones share one session. Dropping the last clone
/// stops background verification.
pub struct AuthContext<T: CredentialTransport> {
    inner: Arc<Inner<T>>,
}

impl<T: CredentialTransport> Clone for AuthContext<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: CredentialTransport> AuthContext<T> {
    /// Assembles a context from ready-made parts. Most callers want
    /// [`AuthContextBuilder`].
    pub fn new(transport: T, persistence: PersistenceAdapter, config: AuthConfig) -> Self {
        let config = config.validated();
        Self {
            inner: Arc::new(Inner {
                transport,
                store: SessionStore::new(),
                fence: SequenceFence::new(),
                persistence,
                scheduler: VerificationScheduler::new(config.poll),
                codes: config.codes,
                lifecycle: Mutex::new(()),
            }),
        }
    }

    /// Exchanges credentials for a session.
    ///
    /// Never panics and never returns anything but a normalized failure:
    /// empty fields are rejected before the network is touched, server
    /// rejections are classified from their code, and transport errors
    /// become [`FailureCode::NetworkOrServerError`].
    pub async fn login(&self, request: LoginRequest) -> Result<AuthSuccess, AuthFailure> {
        self.inner.login(request).await
    }

    /// Creates an account and logs straight into it.
    pub async fn register(&self, request: RegisterRequest) -> Result<AuthSuccess, AuthFailure> {
        self.inner.register(request).await
    }

    /// Asks the server whether the session cookie is still good.
    ///
    /// `true` means authenticated afterwards. On any failure the identity
    /// and cookie are dropped and polling stops; the persisted snapshot is
    /// kept so the next boot can still greet the user.
    pub async fn verify_token(&self) -> bool {
        self.inner.verify_token().await
    }

    /// Ends the session on the server, then locally.
    ///
    /// Local state is only torn down once the server confirms. If it
    /// doesn't, the session, snapshot, and cookie are left exactly as they
    /// were and the failure is returned.
    pub async fn logout(&self) -> Result<(), AuthFailure> {
        self.inner.logout().await
    }

    /// Boot sequence: show the persisted profile, then verify.
    pub async fn restore(&self) -> bool {
        self.inner.restore().await
    }

    /// Drops the session locally without asking the server.
    pub fn invalidate(&self, reason: impl Into<String>) {
        self.inner.invalidate(reason.into());
    }

    /// Current session (a clone).
    pub fn session(&self) -> Session {
        self.inner.store.get()
    }

    /// Receiver that wakes on every committed change.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.inner.store.subscribe()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.store.is_authenticated()
    }

    pub fn auth_state(&self) -> AuthState {
        self.inner.store.get().auth
    }

    pub fn scheduler_state(&self) -> SchedulerState {
        self.inner.scheduler.state()
    }

    pub fn poll_metrics(&self) -> PollMetrics {
        self.inner.scheduler.metrics()
    }

    pub fn transport(&self) -> &T {
        &self.inner.transport
    }

    pub fn persistence(&self) -> &PersistenceAdapter {
        &self.inner.persistence
    }

    pub fn codes(&self) -> &ResponseCodes {
        &self.inner.codes
    }

    /// Stops background verification now instead of waiting for the last
    /// handle to drop. The session itself is untouched.
    pub fn shutdown(&self) {
        if self.inner.scheduler.disarm() {
            info!("auth context shut down, verification stopped");
        }
    }
}

// ---------------------------------------------------------------------------
// Inner
// ---------------------------------------------------------------------------

struct Inner<T: CredentialTransport> {
    transport: T,
    store: SessionStore,
    fence: SequenceFence,
    persistence: PersistenceAdapter,
    scheduler: VerificationScheduler,
    codes: ResponseCodes,
    /// Serializes "patch the store, then arm/disarm and persist", so two
    /// racing transitions can't apply their side effects out of order.
    lifecycle: Mutex<()>,
}

impl<T: CredentialTransport> Inner<T> {
    // -- login / register ------------------------------------------------

    async fn login(self: &Arc<Self>, request: LoginRequest) -> Result<AuthSuccess, AuthFailure> {
        if request.username.trim().is_empty() || request.password.is_empty() {
            return Err(self.reject_input("username and password are required"));
        }

        let ticket = self.start_attempt(OpKind::Login);
        debug!(username = %request.username, "login requested");
        let result = self.transport.login(&request).await;

        self.finish_attempt(ticket, result, self.codes.login_ok, None)
    }

    async fn register(
        self: &Arc<Self>,
        request: RegisterRequest,
    ) -> Result<AuthSuccess, AuthFailure> {
        if request.username.trim().is_empty()
            || request.email.trim().is_empty()
            || request.password.is_empty()
        {
            return Err(self.reject_input("username, email and password are required"));
        }

        let ticket = self.start_attempt(OpKind::Register);
        debug!(username = %request.username, "registration requested");
        let result = self.transport.register(&request).await;

        // Some servers create the account without echoing it back.
        let fallback = Identity::named(request.username.clone()).with_email(request.email.clone());
        self.finish_attempt(ticket, result, self.codes.register_ok, Some(fallback))
    }

    fn reject_input(self: &Arc<Self>, message: &str) -> AuthFailure {
        let failure = AuthFailure::validation(message);
        self.commit(|s| {
            s.error = Some(failure.message.clone());
            s.success_message = None;
        });
        failure
    }

    fn start_attempt(self: &Arc<Self>, kind: OpKind) -> Ticket {
        let ticket = self.fence.begin(kind);
        // A verification started before this attempt must not land after it.
        self.fence.supersede(OpKind::Verify);
        self.commit(|s| {
            s.auth = AuthState::Checking;
            s.is_loading = true;
            s.error = None;
            s.success_message = None;
        });
        ticket
    }

    /// Shared tail of login and register. `fallback` is the identity to
    /// use when a success response carries none; `Some` also means the
    /// server's message is shown as a success message.
    fn finish_attempt(
        self: &Arc<Self>,
        ticket: Ticket,
        result: Result<ApiResponse, TransportError>,
        ok_code: i64,
        fallback: Option<Identity>,
    ) -> Result<AuthSuccess, AuthFailure> {
        if !self.fence.is_current(&ticket) {
            debug!(kind = ?ticket.kind(), seq = ticket.seq(), "stale response discarded");
            return Err(AuthFailure::superseded());
        }

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                warn!(kind = ?ticket.kind(), error = %e, "credential server unreachable");
                let failure = AuthFailure::from(&e);
                self.fail_attempt(&failure);
                return Err(failure);
            }
        };

        if response.code != ok_code {
            let failure = AuthFailure::from_response(&response, &self.codes);
            info!(kind = ?ticket.kind(), code = response.code, "credentials rejected");
            self.fail_attempt(&failure);
            return Err(failure);
        }

        let announce = fallback.is_some();
        let Some(identity) = response.result.clone().or(fallback) else {
            let failure = AuthFailure::new(
                FailureCode::NetworkOrServerError,
                "server accepted the request but sent no user",
            );
            self.fail_attempt(&failure);
            return Err(failure);
        };

        // Verifications and logouts started while this attempt was in
        // flight carry the old cookie state; none of them may land after it.
        self.fence.supersede(OpKind::Verify);
        self.fence.supersede(OpKind::Logout);

        let success_message = announce.then(|| response.message.clone());
        let accepted = identity.clone();
        self.commit(move |s| {
            s.profile = Profile::from_identity(&accepted);
            s.subscribed = accepted.subscribed;
            s.auth = AuthState::Valid(accepted);
            s.is_loading = false;
            s.error = None;
            s.success_message = success_message;
        });
        info!(kind = ?ticket.kind(), username = %identity.username, "authenticated");

        Ok(AuthSuccess {
            code: response.code,
            message: response.message,
            identity,
        })
    }

    fn fail_attempt(self: &Arc<Self>, failure: &AuthFailure) {
        self.commit(|s| {
            s.clear_identity(failure.message.clone());
            s.is_loading = false;
            s.error = Some(failure.message.clone());
            s.success_message = None;
        });
    }

    // -- verification ----------------------------------------------------

    async fn verify_token(self: &Arc<Self>) -> bool {
        let ticket = self.fence.begin(OpKind::Verify);
        if !self.store.is_authenticated() {
            // Boot check: show a spinner. Background polls of a valid
            // session stay silent.
            self.commit(|s| {
                s.auth = AuthState::Checking;
                s.is_loading = true;
            });
        }

        let result = self.transport.verify_token().await;
        if !self.fence.is_current(&ticket) {
            debug!(seq = ticket.seq(), "stale verification discarded");
            return self.store.is_authenticated();
        }

        let verdict = match result {
            Ok(response) if response.code == self.codes.token_valid => response
                .result
                .ok_or_else(|| "verification succeeded but sent no user".to_string()),
            Ok(response) => Err(AuthFailure::from_response(&response, &self.codes).message),
            Err(e) => Err(e.to_string()),
        };

        match verdict {
            Ok(identity) => {
                self.commit(move |s| {
                    s.subscribed = identity.subscribed;
                    s.profile.fill_missing_from(&identity);
                    match &mut s.auth {
                        AuthState::Valid(existing) => existing.subscribed = identity.subscribed,
                        other => {
                            *other = AuthState::Valid(identity);
                            s.error = None;
                        }
                    }
                    s.is_loading = false;
                });
                true
            }
            Err(reason) => {
                self.fail_verification(reason);
                false
            }
        }
    }

    /// Drops identity and cookie but keeps the snapshot: a network blip
    /// must not make the next boot forget who the user was.
    fn fail_verification(self: &Arc<Self>, reason: String) {
        self.transport.clear_session_cookie();
        self.commit(|s| {
            s.clear_identity(reason.clone());
            s.is_loading = false;
            s.error = Some(reason.clone());
        });
        self.scheduler.disarm();
        info!(%reason, "session verification failed");
    }

    async fn restore(self: &Arc<Self>) -> bool {
        match self.persistence.load() {
            Ok(Some(snapshot)) => {
                debug!(username = %snapshot.username, "restoring persisted profile");
                self.commit(|s| {
                    if s.profile.is_empty() {
                        s.profile = snapshot.to_profile();
                    }
                });
            }
            Ok(None) => debug!("no persisted profile"),
            Err(e) => warn!(error = %e, "ignoring unreadable session snapshot"),
        }
        self.verify_token().await
    }

    // -- logout / invalidate ----------------------------------------------

    async fn logout(self: &Arc<Self>) -> Result<(), AuthFailure> {
        let ticket = self.fence.begin(OpKind::Logout);
        let result = self.transport.logout().await;
        if !self.fence.is_current(&ticket) {
            debug!(seq = ticket.seq(), "stale logout discarded");
            return Err(AuthFailure::superseded());
        }

        match result {
            Ok(response) if response.code == self.codes.logout_ok => {
                self.end_session(None);
                info!("logged out");
                Ok(())
            }
            Ok(response) => {
                warn!(
                    code = response.code,
                    message = %response.message,
                    "logout rejected, session kept"
                );
                Err(AuthFailure::from_response(&response, &self.codes))
            }
            Err(e) => {
                warn!(error = %e, "logout failed, session kept");
                Err(AuthFailure::from(&e))
            }
        }
    }

    fn invalidate(self: &Arc<Self>, reason: String) {
        info!(%reason, "session invalidated locally");
        self.end_session(Some(reason));
    }

    /// Full local teardown. `None` resets to a fresh session (logout);
    /// `Some(reason)` leaves it `Invalid(reason)`.
    fn end_session(self: &Arc<Self>, reason: Option<String>) {
        self.fence.supersede_all();
        self.transport.clear_session_cookie();
        if let Err(e) = self.persistence.clear() {
            warn!(error = %e, "failed to clear session snapshot");
        }
        if let Err(e) = self.persistence.clear_session_scoped() {
            warn!(error = %e, "failed to clear session-scoped storage");
        }
        self.commit(|s| match reason {
            None => *s = Session::default(),
            Some(reason) => {
                *s = Session::default();
                s.auth = AuthState::Invalid(reason.clone());
                s.error = Some(reason);
            }
        });
        self.scheduler.disarm();
    }

    // -- transitions -----------------------------------------------------

    /// Applies `f` and runs the side effects of the resulting transition.
    ///
    /// Persisting happens inline under the lifecycle lock so snapshots are
    /// written in transition order; see [`Storage`] for what that asks of
    /// a backend.
    fn commit<F>(self: &Arc<Self>, f: F) -> Transition
    where
        F: FnOnce(&mut Session),
    {
        let _lifecycle = self.lifecycle.lock();
        let transition = self.store.patch(f);

        if transition.became_authenticated() {
            self.scheduler.arm(WeakVerifier {
                inner: Arc::downgrade(self),
            });
        } else if transition.lost_authentication() {
            self.scheduler.disarm();
        }

        if transition.changed() {
            if let Err(e) = self.persistence.save(&transition.after) {
                warn!(error = %e, "failed to persist session snapshot");
            }
        }
        transition
    }
}

// ---------------------------------------------------------------------------
// Background verifier
// ---------------------------------------------------------------------------

/// What the poll loop holds: a weak handle, so the loop never keeps a
/// dropped context alive.
struct WeakVerifier<T: CredentialTransport> {
    inner: Weak<Inner<T>>,
}

impl<T: CredentialTransport> Verifier for WeakVerifier<T> {
    async fn verify(&self) -> PollOutcome {
        let Some(inner) = self.inner.upgrade() else {
            return PollOutcome::Detached;
        };
        if inner.verify_token().await {
            PollOutcome::Valid
        } else {
            PollOutcome::Invalid
        }
    }
}
