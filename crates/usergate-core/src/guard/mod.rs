//! Session guard for protected views.
//!
//! A view mounts on a [`SessionGuard`], awaits its verdict, and turns the
//! verdict into an [`Action`] with [`map_verdict`]. The guard is
//! parametrized by a [`Probe`]: plain pages only need a valid session, while
//! privileged areas probe a role-gated endpoint whose status code is itself
//! the authorization proof.

pub mod machine;
pub mod probe;
pub mod verdict;

pub use machine::{GuardState, Mount, SessionGuard, UnmountHandle};
pub use probe::Probe;
pub use verdict::{map_verdict, Action, AuthVerdict, FailureReason, Role};
