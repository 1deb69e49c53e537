//! Data models exchanged with the backend.
//!
//! - `User`, `UserUpdate`, `UserList`: the users resource
//! - `LoginRequest`, `RegisterRequest`, `AuthResponse`: credential exchange

pub mod auth;
pub mod user;

pub use auth::{AuthResponse, LoginRequest, RegisterRequest};
pub use user::{User, UserList, UserUpdate};
