//! Identity Store: the local player's user id and display name.
//!
//! Identity survives reloads, disconnects and reconnects. It is written
//! eagerly on every `joinLobby` (before the server confirms) and only cleared
//! on explicit logout, which is the caller's business.
//!
//! Values are kept under the fixed keys [`USER_ID_KEY`] and [`USERNAME_KEY`].

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{MatchdayError, Result};

/// Storage key of the user id.
pub const USER_ID_KEY: &str = "userId";

/// Storage key of the display name.
pub const USERNAME_KEY: &str = "username";

/// The local player's identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    #[serde(rename = "userId", default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(rename = "username", default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl Identity {
    pub fn new(user_id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            username: Some(username.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.user_id.is_none() && self.username.is_none()
    }
}

/// Persistent storage for [`Identity`].
pub trait IdentityStore: Send + Sync + 'static {
    /// Read the stored identity; missing values come back as `None`.
    ///
    /// # Errors
    ///
    /// Returns [`MatchdayError::Identity`] if the backing storage is unreadable.
    fn load(&self) -> Result<Identity>;

    /// Overwrite the stored identity.
    ///
    /// # Errors
    ///
    /// Returns [`MatchdayError::Identity`] or [`MatchdayError::Io`] on write failure.
    fn save(&self, identity: &Identity) -> Result<()>;

    /// Forget the stored identity (logout).
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be cleared.
    fn clear(&self) -> Result<()>;
}

/// In-memory store; identity lasts as long as the process.
#[derive(Debug, Default)]
pub struct MemoryIdentityStore {
    inner: Mutex<Identity>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_identity(identity: Identity) -> Self {
        Self {
            inner: Mutex::new(identity),
        }
    }
}

fn poisoned<T>(_: T) -> MatchdayError {
    MatchdayError::Identity("identity lock poisoned".into())
}

impl IdentityStore for MemoryIdentityStore {
    fn load(&self) -> Result<Identity> {
        Ok(self.inner.lock().map_err(poisoned)?.clone())
    }

    fn save(&self, identity: &Identity) -> Result<()> {
        *self.inner.lock().map_err(poisoned)? = identity.clone();
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.inner.lock().map_err(poisoned)? = Identity::default();
        Ok(())
    }
}

/// JSON-file store: `{"userId": "...", "username": "..."}`.
#[derive(Debug, Clone)]
pub struct FileIdentityStore {
    path: PathBuf,
}

impl FileIdentityStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl IdentityStore for FileIdentityStore {
    fn load(&self) -> Result<Identity> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no stored identity");
                return Ok(Identity::default());
            }
            Err(e) => return Err(e.into()),
        };
        // A corrupt file is treated like an empty one so the player can re-enter a name.
        match serde_json::from_str(&raw) {
            Ok(identity) => Ok(identity),
            Err(e) => {
                warn!(path = %self.path.display(), "discarding unreadable identity file: {e}");
                Ok(Identity::default())
            }
        }
    }

    fn save(&self, identity: &Identity) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string(identity)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn scratch_path() -> PathBuf {
        std::env::temp_dir()
            .join(format!("matchday-identity-{}", uuid::Uuid::new_v4()))
            .join("identity.json")
    }

    #[test]
    fn memory_store_round_trips() {
        let store = MemoryIdentityStore::new();
        assert!(store.load().unwrap().is_empty());
        store.save(&Identity::new("u1", "Alice")).unwrap();
        assert_eq!(store.load().unwrap(), Identity::new("u1", "Alice"));
        store.clear().unwrap();
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn file_store_uses_fixed_keys() {
        let path = scratch_path();
        let store = FileIdentityStore::new(&path);
        store.save(&Identity::new("u9", "Carla")).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw[USER_ID_KEY], "u9");
        assert_eq!(raw[USERNAME_KEY], "Carla");

        let reopened = FileIdentityStore::new(&path);
        assert_eq!(reopened.load().unwrap(), Identity::new("u9", "Carla"));

        reopened.clear().unwrap();
        assert!(reopened.load().unwrap().is_empty());
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn missing_file_is_empty_identity() {
        let store = FileIdentityStore::new(scratch_path());
        assert_eq!(store.load().unwrap(), Identity::default());
        store.clear().unwrap();
    }

    #[test]
    fn corrupt_file_is_ignored() {
        let path = scratch_path();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{not json").unwrap();
        let store = FileIdentityStore::new(&path);
        assert!(store.load().unwrap().is_empty());
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
