//! REST API client module.
//!
//! This module provides the `ApiClient` for talking to the users backend:
//! credential exchange (`/login`, `/register`), the `/users` resource, and
//! raw status probes used by the session guard.
//!
//! The API uses bearer token authentication; the token lives in the
//! [`CredentialStore`](crate::auth::CredentialStore).

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::{ApiError, AuthError, NetworkError, NetworkErrorKind};
