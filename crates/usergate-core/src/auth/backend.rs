//! Persistence backends for the credential store.
//!
//! A backend only moves a [`SessionData`] in and out of durable storage. It
//! never decides whether a token is valid and is never read directly by
//! anything other than [`CredentialStore`](super::CredentialStore).

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use keyring::Entry;
use serde::{Deserialize, Serialize};

use super::{SessionData, StoreError};

/// Session file name in the cache directory
pub const SESSION_FILE: &str = "session.json";

/// Keychain service name
pub const KEYRING_SERVICE: &str = "usergate";

/// Keychain account under which the session is stored
pub const KEYRING_ACCOUNT: &str = "session";

pub trait TokenBackend: Send + Sync {
    /// Read the persisted session, `None` if nothing is stored.
    fn load(&self) -> Result<Option<SessionData>, StoreError>;

    /// Persist the session, replacing whatever was stored.
    fn save(&self, data: &SessionData) -> Result<(), StoreError>;

    /// Remove the persisted session. Removing nothing is not an error.
    fn remove(&self) -> Result<(), StoreError>;

    /// Short name for log output.
    fn name(&self) -> &'static str;
}

/// Which backend to persist the session with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    File,
    Keyring,
    Memory,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::File => "file",
            BackendKind::Keyring => "keyring",
            BackendKind::Memory => "memory",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(BackendKind::File),
            "keyring" | "keychain" => Ok(BackendKind::Keyring),
            "memory" => Ok(BackendKind::Memory),
            other => Err(format!("unknown credential backend: {}", other)),
        }
    }
}

// ============================================================================
// File
// ============================================================================

/// Stores the session as JSON in `<dir>/session.json`.
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(cache_dir: impl AsRef<Path>) -> Self {
        Self {
            path: cache_dir.as_ref().join(SESSION_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenBackend for FileBackend {
    fn load(&self) -> Result<Option<SessionData>, StoreError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&self.path)?;
        let data: SessionData = serde_json::from_str(&contents)?;
        Ok(Some(data))
    }

    fn save(&self, data: &SessionData) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(data)?;
        std::fs::write(&self.path, contents)?;
        Ok(())
    }

    fn remove(&self) -> Result<(), StoreError> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "file"
    }
}

// ============================================================================
// Keyring
// ============================================================================

/// Stores the session in the OS keychain.
pub struct KeyringBackend {
    service: String,
    account: String,
}

impl KeyringBackend {
    pub fn new() -> Self {
        Self::with_names(KEYRING_SERVICE, KEYRING_ACCOUNT)
    }

    pub fn with_names(service: &str, account: &str) -> Self {
        Self {
            service: service.to_string(),
            account: account.to_string(),
        }
    }

    fn entry(&self) -> Result<Entry, StoreError> {
        Ok(Entry::new(&self.service, &self.account)?)
    }
}

impl Default for KeyringBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenBackend for KeyringBackend {
    fn load(&self) -> Result<Option<SessionData>, StoreError> {
        match self.entry()?.get_password() {
            Ok(secret) => Ok(Some(serde_json::from_str(&secret)?)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, data: &SessionData) -> Result<(), StoreError> {
        let secret = serde_json::to_string(data)?;
        self.entry()?.set_password(&secret)?;
        Ok(())
    }

    fn remove(&self) -> Result<(), StoreError> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn name(&self) -> &'static str {
        "keyring"
    }
}

// ============================================================================
// Memory
// ============================================================================

/// Keeps nothing. The session lives only as long as the store holding it.
#[derive(Debug, Default)]
pub struct MemoryBackend;

impl TokenBackend for MemoryBackend {
    fn load(&self) -> Result<Option<SessionData>, StoreError> {
        Ok(None)
    }

    fn save(&self, _data: &SessionData) -> Result<(), StoreError> {
        Ok(())
    }

    fn remove(&self) -> Result<(), StoreError> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_kind_from_str() {
        assert_eq!("file".parse::<BackendKind>(), Ok(BackendKind::File));
        assert_eq!(" Keyring ".parse::<BackendKind>(), Ok(BackendKind::Keyring));
        assert_eq!("keychain".parse::<BackendKind>(), Ok(BackendKind::Keyring));
        assert_eq!("MEMORY".parse::<BackendKind>(), Ok(BackendKind::Memory));
        assert!("cookie".parse::<BackendKind>().is_err());
    }

    #[test]
    fn test_file_backend_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let backend = FileBackend::new(dir.path().join("nested"));

        assert_eq!(backend.load().expect("load empty"), None);

        let data = SessionData::new("abc123");
        backend.save(&data).expect("save");
        assert!(backend.path().exists());
        assert_eq!(backend.load().expect("load"), Some(data));

        backend.remove().expect("remove");
        assert!(!backend.path().exists());
        assert_eq!(backend.load().expect("load after remove"), None);

        // Removing twice is fine
        backend.remove().expect("second remove");
    }

    #[test]
    fn test_file_backend_rejects_corrupt_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let backend = FileBackend::new(dir.path());
        std::fs::write(backend.path(), "{not json").expect("write");

        assert!(matches!(backend.load(), Err(StoreError::Parse(_))));
    }
}
