//! Client-side session and authorization gate for a users REST backend.
//!
//! The pieces, leaf first:
//!
//! - [`auth::CredentialStore`]: the single owner of the bearer token
//! - [`api::ApiClient`]: attaches the token to every outgoing request
//! - [`guard::SessionGuard`]: decides whether a view may render, optionally
//!   checking an admin-only probe endpoint
//! - [`guard::map_verdict`]: turns a verdict into the one action a view takes
//!
//! [`directory::UserDirectory`] and [`forms`] hold the page logic for the
//! admin dashboard and the login/signup forms.

pub mod api;
pub mod auth;
pub mod config;
pub mod directory;
pub mod forms;
pub mod guard;
pub mod models;

pub use api::{ApiClient, ApiError, AuthError, NetworkError};
pub use auth::CredentialStore;
pub use config::Config;
pub use guard::{map_verdict, Action, AuthVerdict, Probe, Role, SessionGuard};
