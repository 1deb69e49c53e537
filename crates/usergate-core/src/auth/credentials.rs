use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, warn};

use super::backend::{MemoryBackend, TokenBackend};
use super::SessionData;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to access session file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse stored session: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Keychain error: {0}")]
    Keyring(#[from] keyring::Error),
}

#[derive(Default)]
struct Slot {
    current: Option<SessionData>,
    generation: u64,
}

/// The single owner of the session token.
///
/// Every component that needs the token asks the store for it; nothing else
/// keeps a copy. The in-memory slot is authoritative: `set` and `clear`
/// update it before persisting, so a backend failure never makes `get`
/// disagree with the last mutation.
///
/// Each mutation bumps a generation counter, which lets callers detect that
/// the token they started working with has since been replaced or removed.
pub struct CredentialStore {
    backend: Box<dyn TokenBackend>,
    slot: RwLock<Slot>,
}

impl CredentialStore {
    /// Open a store over `backend`, hydrating it from whatever is persisted.
    /// Unreadable persisted state is treated as no session.
    pub fn open(backend: impl TokenBackend + 'static) -> Self {
        let current = match backend.load() {
            Ok(data) => data,
            Err(e) => {
                warn!(backend = backend.name(), error = %e, "Ignoring unreadable stored session");
                None
            }
        };
        debug!(backend = backend.name(), has_token = current.is_some(), "Credential store opened");

        Self {
            backend: Box::new(backend),
            slot: RwLock::new(Slot {
                current,
                generation: 0,
            }),
        }
    }

    /// A store that persists nothing.
    pub fn in_memory() -> Self {
        Self::open(MemoryBackend)
    }

    /// The current token, if any.
    pub fn get(&self) -> Option<String> {
        self.read().current.as_ref().map(|d| d.token.clone())
    }

    /// The current token together with the generation it belongs to.
    pub fn snapshot(&self) -> (Option<String>, u64) {
        let slot = self.read();
        (slot.current.as_ref().map(|d| d.token.clone()), slot.generation)
    }

    pub fn generation(&self) -> u64 {
        self.read().generation
    }

    pub fn is_present(&self) -> bool {
        self.read().current.is_some()
    }

    /// The full session record, for display.
    pub fn session(&self) -> Option<SessionData> {
        self.read().current.clone()
    }

    pub fn stored_at(&self) -> Option<DateTime<Utc>> {
        self.read().current.as_ref().map(|d| d.stored_at)
    }

    /// Replace the token and persist it.
    pub fn set(&self, token: impl Into<String>) -> Result<(), StoreError> {
        let data = SessionData::new(token);
        {
            let mut slot = self.write();
            slot.current = Some(data.clone());
            slot.generation += 1;
            debug!(generation = slot.generation, "Session token stored");
        }
        self.backend.save(&data)
    }

    /// Remove the token from memory and from durable storage.
    pub fn clear(&self) -> Result<(), StoreError> {
        {
            let mut slot = self.write();
            slot.current = None;
            slot.generation += 1;
            debug!(generation = slot.generation, "Session token cleared");
        }
        self.backend.remove()
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    fn read(&self) -> RwLockReadGuard<'_, Slot> {
        self.slot.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Slot> {
        self.slot.write().unwrap_or_else(PoisonError::into_inner)
    }
}
