//! Session state for Tollgate.
//!
//! This crate holds everything the client knows about the current login:
//!
//! 1. **Model**: [`Session`], with the auth state machine as one enum
//!    ([`AuthState`]) and display fields kept apart ([`Profile`])
//! 2. **Store**: [`SessionStore`], the single owner of the live session
//! 3. **Fencing**: [`SequenceFence`], so a slow, stale response can't
//!    overwrite newer state
//! 4. **Persistence**: [`PersistenceAdapter`], a durable non-secret mirror
//!    of the session for the next boot
//!
//! # How it fits in the stack
//!
//! ```text
//! Coordinator (above)  ← decides transitions, calls the transport
//!     ↕
//! Session Layer (this crate)  ← holds state, fences responses, persists
//!     ↕
//! Protocol Layer (below)  ← provides Identity and the codec
//! ```

mod error;
mod fence;
mod persist;
mod session;
mod store;

pub use error::SessionError;
pub use fence::{OpKind, SequenceFence, Ticket};
pub use persist::{
    FileStorage, MemoryStorage, PersistedSnapshot, PersistenceAdapter, Storage,
    DEFAULT_STORAGE_KEY,
};
pub use session::{AuthState, Profile, Session};
pub use store::{SessionStore, Transition};
