use std::fmt;

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

use crate::auth::StoreError;

/// What went wrong below HTTP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkErrorKind {
    Timeout,
    Connect,
    Request,
    Body,
}

impl fmt::Display for NetworkErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NetworkErrorKind::Timeout => "timeout",
            NetworkErrorKind::Connect => "connect",
            NetworkErrorKind::Request => "request",
            NetworkErrorKind::Body => "body",
        };
        f.write_str(name)
    }
}

/// A transport-level failure. Always worth retrying.
///
/// Cloneable so a single failed check can be handed to every caller waiting
/// on it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Network error ({kind}): {message}")]
pub struct NetworkError {
    pub kind: NetworkErrorKind,
    pub message: String,
}

impl NetworkError {
    pub fn new(kind: NetworkErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for NetworkError {
    fn from(e: reqwest::Error) -> Self {
        let kind = if e.is_timeout() {
            NetworkErrorKind::Timeout
        } else if e.is_connect() {
            NetworkErrorKind::Connect
        } else if e.is_body() || e.is_decode() {
            NetworkErrorKind::Body
        } else {
            NetworkErrorKind::Request
        };
        Self::new(kind, e.to_string())
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    #[error("Not signed in - session missing or expired")]
    Unauthenticated,

    #[error("Access denied - this account lacks the required permission")]
    Forbidden,
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("{message}")]
    Rejected { status: u16, message: String },

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid API base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("Failed to persist session: {0}")]
    Store(#[from] StoreError),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

#[derive(Deserialize)]
struct MessageBody {
    message: Option<String>,
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    pub(crate) fn truncate_body(body: &str) -> String {
        match body.char_indices().nth(MAX_ERROR_BODY_LENGTH) {
            None => body.to_string(),
            Some((cut, _)) => format!(
                "{}... (truncated, {} total bytes)",
                &body[..cut],
                body.len()
            ),
        }
    }

    /// The `message` field of a JSON error body, if there is one.
    pub fn server_message(body: &str) -> Option<String> {
        serde_json::from_str::<MessageBody>(body)
            .ok()
            .and_then(|b| b.message)
            .filter(|m| !m.trim().is_empty())
    }

    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let detail = Self::server_message(body).unwrap_or_else(|| Self::truncate_body(body));
        match status.as_u16() {
            401 => ApiError::Auth(AuthError::Unauthenticated),
            403 => ApiError::Auth(AuthError::Forbidden),
            404 => ApiError::NotFound(detail),
            500..=599 => ApiError::ServerError(detail),
            code => ApiError::Rejected {
                status: code,
                message: format!("Status {}: {}", status, detail),
            },
        }
    }

    /// Transport failures and server errors may succeed on a second attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ApiError::Network(_) | ApiError::ServerError(_))
    }

    pub fn auth_error(&self) -> Option<AuthError> {
        match self {
            ApiError::Auth(e) => Some(*e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_maps_auth_failures() {
        assert!(matches!(
            ApiError::from_status(StatusCode::UNAUTHORIZED, ""),
            ApiError::Auth(AuthError::Unauthenticated)
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::FORBIDDEN, r#"{"message":"admins only"}"#),
            ApiError::Auth(AuthError::Forbidden)
        ));
    }

    #[test]
    fn test_from_status_prefers_server_message() {
        match ApiError::from_status(StatusCode::NOT_FOUND, r#"{"message":"User not found"}"#) {
            ApiError::NotFound(msg) => assert_eq!(msg, "User not found"),
            other => panic!("unexpected: {other:?}"),
        }
        match ApiError::from_status(StatusCode::BAD_GATEWAY, "upstream down") {
            ApiError::ServerError(msg) => assert_eq!(msg, "upstream down"),
            other => panic!("unexpected: {other:?}"),
        }
        match ApiError::from_status(StatusCode::CONFLICT, r#"{"message":"Email taken"}"#) {
            ApiError::Rejected { status, message } => {
                assert_eq!(status, 409);
                assert!(message.contains("Email taken"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_truncate_body_respects_char_boundaries() {
        let short = "short body";
        assert_eq!(ApiError::truncate_body(short), short);

        let long = "é".repeat(MAX_ERROR_BODY_LENGTH + 10);
        let truncated = ApiError::truncate_body(&long);
        assert!(truncated.starts_with(&"é".repeat(MAX_ERROR_BODY_LENGTH)));
        assert!(truncated.contains("truncated"));
    }

    #[test]
    fn test_retryable_classification() {
        let network = ApiError::from(NetworkError::new(NetworkErrorKind::Timeout, "slow"));
        assert!(network.is_retryable());
        assert!(ApiError::ServerError("boom".into()).is_retryable());
        assert!(!ApiError::Auth(AuthError::Unauthenticated).is_retryable());
        assert!(!ApiError::NotFound("x".into()).is_retryable());
    }
}
