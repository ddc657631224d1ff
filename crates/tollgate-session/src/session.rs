//! Session types: the data structures that describe who is logged in.
//!
//! A "session" is the client's record of its authentication context. It
//! tracks:
//! - WHETHER the user is authenticated, and as WHOM ([`AuthState`])
//! - WHAT to show in the UI meanwhile ([`Profile`])
//! - WHICH round trip is in flight and how the last one ended
//!   (`is_loading`, `error`, `success_message`)

use tollgate_protocol::Identity;

// ---------------------------------------------------------------------------
// AuthState
// ---------------------------------------------------------------------------

/// Where the session stands with the credential server.
///
/// ```text
///                 login / register / boot verify
///   NotChecked ───────────────→ Checking ──(accepted)──→ Valid(identity)
///                                  │                         │
///                                  └──(rejected/error)──→ Invalid(reason)
///                                                            ↑
///                      failed verification ──────────────────┘
/// ```
///
/// This is a single enum rather than separate `is_authenticated` /
/// `user` / `state` fields, so the combinations that make no sense
/// ("valid but no user", "invalid but authenticated") can't be
/// represented at all. The identity travels *inside* `Valid`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthState {
    /// Nothing has been asked yet (fresh process).
    #[default]
    NotChecked,

    /// A login, register, or boot-time verification is outstanding.
    Checking,

    /// The server vouched for this identity.
    Valid(Identity),

    /// The server rejected the session, or we couldn't reach it.
    /// The string is the reason shown to the user.
    Invalid(String),
}

impl AuthState {
    /// `true` only for [`AuthState::Valid`].
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }

    /// The authenticated identity, if any.
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Self::Valid(identity) => Some(identity),
            _ => None,
        }
    }

    /// Short camelCase name, handy for logs and UI bindings.
    pub fn name(&self) -> &'static str {
        match self {
            Self::NotChecked => "notChecked",
            Self::Checking => "checking",
            Self::Valid(_) => "valid",
            Self::Invalid(_) => "invalid",
        }
    }
}

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

/// Display fields for the current user.
///
/// These live outside [`AuthState`] on purpose: on boot they are restored
/// from the persisted snapshot so the UI can greet the user by name before
/// the first verification round trip finishes. They are hints, not proof
/// of authentication.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Profile {
    pub username: Option<String>,
    pub email: Option<String>,
    pub profile_picture: Option<String>,
}

impl Profile {
    /// A profile taken entirely from a server identity.
    pub fn from_identity(identity: &Identity) -> Self {
        Self {
            username: Some(identity.username.clone()),
            email: identity.email.clone(),
            profile_picture: identity.profile_picture.clone(),
        }
    }

    /// Fills only the fields that are currently empty.
    ///
    /// Local values win: repeated verification polls must not make the UI
    /// flicker between what the user set locally and what the server last
    /// said.
    pub fn fill_missing_from(&mut self, identity: &Identity) {
        // `get_or_insert_with` leaves an existing value alone and only
        // runs the closure when the field is `None`.
        self.username.get_or_insert_with(|| identity.username.clone());
        if self.email.is_none() {
            self.email = identity.email.clone();
        }
        if self.profile_picture.is_none() {
            self.profile_picture = identity.profile_picture.clone();
        }
    }

    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.email.is_none() && self.profile_picture.is_none()
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// The authoritative in-memory record of the current auth context.
///
/// Owned by the [`SessionStore`](crate::SessionStore); everyone else reads
/// clones of it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Session {
    pub auth: AuthState,
    pub profile: Profile,

    /// Entitlement flag from the last accepted server response.
    pub subscribed: bool,

    /// `true` while a login, register, or boot verification is outstanding.
    pub is_loading: bool,

    pub error: Option<String>,
    pub success_message: Option<String>,
}

impl Session {
    /// Derived from [`AuthState`]: there is no separate flag to drift.
    pub fn is_authenticated(&self) -> bool {
        self.auth.is_valid()
    }

    /// The authenticated user record (`None` unless valid).
    pub fn user(&self) -> Option<&Identity> {
        self.auth.identity()
    }

    /// Drops everything that identifies the user and marks the session
    /// invalid. Flags and messages are left for the caller to set.
    pub fn clear_identity(&mut self, reason: impl Into<String>) {
        self.auth = AuthState::Invalid(reason.into());
        self.profile = Profile::default();
        self.subscribed = false;
    }
}

// =========================================================================
// Tests
// =========================================================================
