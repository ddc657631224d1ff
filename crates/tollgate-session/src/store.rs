//! The session store: one `Session`, many readers, one writer at a time.
//!
//! Built on `tokio::sync::watch`, which is exactly this shape: a single
//! current value that any number of subscribers can read or wait on. A
//! `patch` runs its closure while holding the channel's write lock, so a
//! reader sees either the whole patch or none of it.
//!
//! The store does not validate anything. The [`AuthState`](crate::AuthState)
//! enum already rules out contradictory combinations; which transitions are
//! *allowed* is the coordinator's business.

use tokio::sync::watch;

use crate::Session;

/// A before/after pair returned by every mutation.
///
/// Callers use it to detect edges ("just became authenticated") without
/// re-reading the store and racing another writer.
#[derive(Debug, Clone)]
pub struct Transition {
    pub before: Session,
    pub after: Session,
}

impl Transition {
    /// Unauthenticated → authenticated.
    pub fn became_authenticated(&self) -> bool {
        !self.before.is_authenticated() && self.after.is_authenticated()
    }

    /// Authenticated → unauthenticated.
    pub fn lost_authentication(&self) -> bool {
        self.before.is_authenticated() && !self.after.is_authenticated()
    }

    pub fn changed(&self) -> bool {
        self.before != self.after
    }
}

/// Holds the current [`Session`].
pub struct SessionStore {
    tx: watch::Sender<Session>,
}

impl SessionStore {
    /// A store starting at `Session::default()` (`NotChecked`).
    pub fn new() -> Self {
        Self::with_session(Session::default())
    }

    pub fn with_session(session: Session) -> Self {
        // The initial receiver is dropped immediately; `watch` keeps the
        // value anyway and `subscribe()` hands out fresh receivers.
        let (tx, _rx) = watch::channel(session);
        Self { tx }
    }

    /// A snapshot of the current session. No side effects.
    pub fn get(&self) -> Session {
        self.tx.borrow().clone()
    }

    /// Applies `f` to the session atomically.
    ///
    /// Subscribers are only woken when the session actually changed.
    pub fn patch<F>(&self, f: F) -> Transition
    where
        F: FnOnce(&mut Session),
    {
        let mut transition = None;
        self.tx.send_if_modified(|session| {
            let before = session.clone();
            f(session);
            let changed = *session != before;
            transition = Some(Transition {
                before,
                after: session.clone(),
            });
            changed
        });
        // `send_if_modified` always runs the closure exactly once.
        transition.unwrap_or_else(|| {
            let current = self.get();
            Transition {
                before: current.clone(),
                after: current,
            }
        })
    }

    /// Back to the initial, empty session.
    pub fn reset(&self) -> Transition {
        self.patch(|session| *session = Session::default())
    }

    /// A receiver that yields every committed change.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.tx.subscribe()
    }

    pub fn is_authenticated(&self) -> bool {
        self.tx.borrow().is_authenticated()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use tollgate_protocol::Identity;

    use super::*;
    use crate::AuthState;

    fn valid(name: &str) -> AuthState {
        AuthState::Valid(Identity::named(name))
    }

    #[test]
    fn test_get_returns_initial_session() {
        let store = SessionStore::new();

        assert_eq!(store.get(), Session::default());
        assert!(!store.is_authenticated());
    }

    #[test]
    fn test_patch_applies_all_fields_together() {
        let store = SessionStore::new();

        let t = store.patch(|s| {
            s.auth = valid("alice");
            s.subscribed = true;
            s.is_loading = false;
        });

        assert!(t.became_authenticated());
        assert!(!t.lost_authentication());
        let now = store.get();
        assert!(now.is_authenticated());
        assert!(now.subscribed);
    }

    #[test]
    fn test_patch_reports_lost_authentication() {
        let store = SessionStore::new();
        store.patch(|s| s.auth = valid("alice"));

        let t = store.patch(|s| s.clear_identity("expired"));

        assert!(t.lost_authentication());
        assert!(!store.is_authenticated());
    }

    #[test]
    fn test_reset_returns_to_default() {
        let store = SessionStore::new();
        store.patch(|s| {
            s.auth = valid("alice");
            s.error = Some("old".into());
        });

        store.reset();

        assert_eq!(store.get(), Session::default());
    }

    #[tokio::test]
    async fn test_subscribe_sees_committed_change() {
        let store = SessionStore::new();
        let mut rx = store.subscribe();

        store.patch(|s| s.auth = AuthState::Checking);

        rx.changed().await.expect("sender alive");
        assert_eq!(rx.borrow().auth, AuthState::Checking);
    }

    #[test]
    fn test_noop_patch_does_not_notify_subscribers() {
        let store = SessionStore::new();
        let rx = store.subscribe();

        let t = store.patch(|_| {});

        assert!(!t.changed());
        assert!(!rx.has_changed().expect("sender alive"));
    }
}
