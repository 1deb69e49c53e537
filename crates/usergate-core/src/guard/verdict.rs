use std::fmt;

use crate::api::{AuthError, NetworkError};

/// A privilege level that a role probe checks for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Role(String);

impl Role {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn admin() -> Self {
        Self::new("admin")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Why a check could not reach a decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    Network(NetworkError),
    /// The probe answered with a status that says nothing about the session
    /// (404, 5xx, ...).
    UnexpectedStatus(u16),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Network(e) => write!(f, "{}", e),
            FailureReason::UnexpectedStatus(status) => {
                write!(f, "probe returned unexpected status {}", status)
            }
        }
    }
}

/// Outcome of one guard check. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthVerdict {
    /// No token, or the server rejected it.
    Unauthenticated,
    /// The token is valid.
    Authenticated,
    /// The token is valid and the role probe accepted it.
    Authorized(Role),
    /// The token is valid but lacks the role.
    Forbidden(Role),
    /// No decision could be made; retrying may succeed.
    Failed(FailureReason),
}

impl AuthVerdict {
    pub fn action(&self) -> Action {
        map_verdict(self)
    }

    /// Whether the view may show protected content.
    pub fn is_granted(&self) -> bool {
        matches!(self, AuthVerdict::Authenticated | AuthVerdict::Authorized(_))
    }

    /// The auth error a denied verdict corresponds to.
    pub fn auth_error(&self) -> Option<AuthError> {
        match self {
            AuthVerdict::Unauthenticated => Some(AuthError::Unauthenticated),
            AuthVerdict::Forbidden(_) => Some(AuthError::Forbidden),
            _ => None,
        }
    }
}

impl fmt::Display for AuthVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthVerdict::Unauthenticated => f.write_str("unauthenticated"),
            AuthVerdict::Authenticated => f.write_str("authenticated"),
            AuthVerdict::Authorized(role) => write!(f, "authorized ({})", role),
            AuthVerdict::Forbidden(role) => write!(f, "forbidden ({})", role),
            AuthVerdict::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// What a view should do with a verdict. Executing it is the caller's job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum Action {
    RenderProtectedContent,
    RedirectToLogin,
    ShowPermissionDenied,
    ShowRetryableError,
}

impl Action {
    /// User-facing text for the action.
    pub fn message(&self) -> &'static str {
        match self {
            Action::RenderProtectedContent => "Access granted.",
            Action::RedirectToLogin => "Your session has ended. Please log in to continue.",
            Action::ShowPermissionDenied => "You do not have permission to access this area.",
            Action::ShowRetryableError => {
                "Could not verify your session. Check your connection and try again."
            }
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Action::ShowRetryableError)
    }
}

/// Map a verdict to the one action a view takes for it.
pub fn map_verdict(verdict: &AuthVerdict) -> Action {
    match verdict {
        AuthVerdict::Authenticated | AuthVerdict::Authorized(_) => Action::RenderProtectedContent,
        AuthVerdict::Unauthenticated => Action::RedirectToLogin,
        AuthVerdict::Forbidden(_) => Action::ShowPermissionDenied,
        AuthVerdict::Failed(_) => Action::ShowRetryableError,
    }
}
