//! Session token ownership.
//!
//! This module provides:
//! - `CredentialStore`: the single source of truth for the bearer token
//! - `TokenBackend`: durable persistence behind the store (file, OS keychain,
//!   or nothing at all)
//! - `SessionData`: the persisted token record

pub mod backend;
pub mod credentials;
pub mod session;

pub use backend::{BackendKind, FileBackend, KeyringBackend, MemoryBackend, TokenBackend};
pub use credentials::{CredentialStore, StoreError};
pub use session::SessionData;
