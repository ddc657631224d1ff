//! Persistence: a durable, non-secret mirror of the session.
//!
//! Two kinds of storage are involved:
//!
//! - **durable** storage survives restarts and holds the
//!   [`PersistedSnapshot`] under one fixed key. Think browser
//!   `localStorage`.
//! - **session-scoped** storage lives as long as the process and is wiped
//!   on logout. Think browser `sessionStorage`.
//!
//! Neither ever sees a token or a cookie. The snapshot is a display hint
//! for the next boot; the live [`Session`] stays authoritative.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tollgate_protocol::{Codec, JsonCodec};
use tracing::{debug, trace};

use crate::{Profile, Session, SessionError};

/// Key the snapshot is stored under unless configured otherwise.
pub const DEFAULT_STORAGE_KEY: &str = "tollgate.session";

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

/// A byte-valued key/value store.
///
/// Object-safe so the adapter can hold `Box<dyn Storage>` and callers can
/// plug in whatever backing they have (a keyring, a database row, ...).
///
/// Methods are called synchronously from async code, with the session's
/// lifecycle lock held, so they must be fast. Snapshots are a few hundred
/// bytes and unchanged ones are never rewritten; a backend that can block
/// for long should buffer writes and flush them elsewhere.
pub trait Storage: Send + Sync + 'static {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, SessionError>;
    fn set(&self, key: &str, value: &[u8]) -> Result<(), SessionError>;
    /// Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), SessionError>;
    fn clear(&self) -> Result<(), SessionError>;
}

/// Lets a caller keep a handle to storage it also hands to the adapter.
impl<S: Storage + ?Sized> Storage for Arc<S> {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, SessionError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), SessionError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), SessionError> {
        (**self).remove(key)
    }

    fn clear(&self) -> Result<(), SessionError> {
        (**self).clear()
    }
}

impl<S: Storage + ?Sized> Storage for Box<S> {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, SessionError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), SessionError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), SessionError> {
        (**self).remove(key)
    }

    fn clear(&self) -> Result<(), SessionError> {
        (**self).clear()
    }
}

/// Process-lifetime storage.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, SessionError> {
        Ok(self.items.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), SessionError> {
        self.items.lock().insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), SessionError> {
        self.items.lock().remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        self.items.lock().clear();
        Ok(())
    }
}

/// One file per key inside a directory.
///
/// Writes go to a temporary sibling first and are then renamed over the
/// target, so a crash mid-write leaves the old value intact.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Opens (and creates, if needed) the storage directory.
    ///
    /// # Errors
    /// [`SessionError::Storage`] if the directory can't be created.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, SessionError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| SessionError::storage(dir.display(), e))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(file_name(key))
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, SessionError> {
        match fs::read(self.path(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SessionError::storage(key, e)),
        }
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), SessionError> {
        let target = self.path(key);
        let tmp = self.dir.join(format!(".{}.tmp", file_name(key)));
        fs::write(&tmp, value).map_err(|e| SessionError::storage(key, e))?;
        fs::rename(&tmp, &target).map_err(|e| SessionError::storage(key, e))?;
        trace!(key, bytes = value.len(), "storage write");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), SessionError> {
        match fs::remove_file(self.path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SessionError::storage(key, e)),
        }
    }

    fn clear(&self) -> Result<(), SessionError> {
        let entries =
            fs::read_dir(&self.dir).map_err(|e| SessionError::storage(self.dir.display(), e))?;
        for entry in entries {
            let entry = entry.map_err(|e| SessionError::storage(self.dir.display(), e))?;
            let path = entry.path();
            if path.is_file() {
                fs::remove_file(&path).map_err(|e| SessionError::storage(path.display(), e))?;
            }
        }
        Ok(())
    }
}

/// Keys become file names, so anything outside `[A-Za-z0-9._-]` is
/// replaced to keep a key from escaping the directory.
fn file_name(key: &str) -> String {
    key.chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '.' | '-' | '_' => c,
            _ => '_',
        })
        .collect()
}

// ---------------------------------------------------------------------------
// PersistedSnapshot
// ---------------------------------------------------------------------------

/// What survives a restart: display fields only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSnapshot {
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub profile_picture: Option<String>,
}

impl PersistedSnapshot {
    /// `None` when the session has no username to remember.
    pub fn from_session(session: &Session) -> Option<Self> {
        let username = session.profile.username.clone()?;
        Some(Self {
            username,
            email: session.profile.email.clone(),
            profile_picture: session.profile.profile_picture.clone(),
        })
    }

    /// The profile this snapshot restores.
    pub fn to_profile(&self) -> Profile {
        Profile {
            username: Some(self.username.clone()),
            email: self.email.clone(),
            profile_picture: self.profile_picture.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// PersistenceAdapter
// ---------------------------------------------------------------------------

/// Mirrors the session into durable storage and wipes storage on logout.
pub struct PersistenceAdapter {
    durable: Box<dyn Storage>,
    scoped: Box<dyn Storage>,
    key: String,
    codec: JsonCodec,
    /// Last bytes written, so an unchanged session every poll interval
    /// doesn't turn into a disk write every poll interval.
    last_written: Mutex<Option<Vec<u8>>>,
}

impl PersistenceAdapter {
    pub fn new(durable: impl Storage, scoped: impl Storage, key: impl Into<String>) -> Self {
        Self {
            durable: Box::new(durable),
            scoped: Box::new(scoped),
            key: key.into(),
            codec: JsonCodec,
            last_written: Mutex::new(None),
        }
    }

    /// Both storages in memory. Nothing survives the process.
    pub fn in_memory() -> Self {
        Self::new(MemoryStorage::new(), MemoryStorage::new(), DEFAULT_STORAGE_KEY)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// The session-scoped storage, for other per-login data the app keeps.
    pub fn scoped(&self) -> &dyn Storage {
        self.scoped.as_ref()
    }

    /// Writes the snapshot for `session`.
    ///
    /// Returns `Ok(false)` without touching storage when the session has no
    /// username (so a cleared session never overwrites the last good
    /// snapshot) or when the snapshot is unchanged.
    pub fn save(&self, session: &Session) -> Result<bool, SessionError> {
        let Some(snapshot) = PersistedSnapshot::from_session(session) else {
            return Ok(false);
        };
        let bytes = self.codec.encode(&snapshot)?;

        let mut last = self.last_written.lock();
        if last.as_deref() == Some(bytes.as_slice()) {
            return Ok(false);
        }
        self.durable.set(&self.key, &bytes)?;
        *last = Some(bytes);
        debug!(key = %self.key, username = %snapshot.username, "snapshot saved");
        Ok(true)
    }

    /// Reads the snapshot, if one was saved.
    ///
    /// # Errors
    /// [`SessionError::Codec`] if the stored bytes don't decode; callers
    /// usually treat that as "no snapshot".
    pub fn load(&self) -> Result<Option<PersistedSnapshot>, SessionError> {
        let Some(bytes) = self.durable.get(&self.key)? else {
            return Ok(None);
        };
        let snapshot: PersistedSnapshot = self.codec.decode(&bytes)?;
        *self.last_written.lock() = Some(bytes);
        Ok(Some(snapshot))
    }

    /// Removes the snapshot. Only for confirmed logout or explicit
    /// invalidation.
    pub fn clear(&self) -> Result<(), SessionError> {
        self.durable.remove(&self.key)?;
        *self.last_written.lock() = None;
        debug!(key = %self.key, "snapshot cleared");
        Ok(())
    }

    /// Wipes everything in session-scoped storage.
    pub fn clear_session_scoped(&self) -> Result<(), SessionError> {
        self.scoped.clear()
    }
}
