use reqwest::StatusCode;

use crate::api::ApiClient;

use super::{AuthVerdict, FailureReason, Role};

/// How a guard verifies a present token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe {
    /// Trust the token's presence. No request is made.
    Presence,
    /// Any 2xx from `path` proves the session.
    Session { path: String },
    /// A 2xx from `path` proves the session holds `role`.
    Role { path: String, role: Role },
}

impl Probe {
    pub fn presence() -> Self {
        Probe::Presence
    }

    pub fn session(path: impl Into<String>) -> Self {
        Probe::Session { path: path.into() }
    }

    pub fn role(path: impl Into<String>, role: Role) -> Self {
        Probe::Role {
            path: path.into(),
            role,
        }
    }

    pub fn path(&self) -> Option<&str> {
        match self {
            Probe::Presence => None,
            Probe::Session { path } | Probe::Role { path, .. } => Some(path),
        }
    }

    /// Verify the token currently in the client's store.
    pub async fn run(&self, client: &ApiClient) -> AuthVerdict {
        let Some(path) = self.path() else {
            return AuthVerdict::Authenticated;
        };
        match client.probe(path).await {
            Ok(status) => self.classify(status),
            Err(e) => AuthVerdict::Failed(FailureReason::Network(e)),
        }
    }

    /// Turn a probe status into a verdict.
    pub fn classify(&self, status: StatusCode) -> AuthVerdict {
        match self {
            Probe::Presence => AuthVerdict::Authenticated,
            Probe::Session { .. } => match status.as_u16() {
                200..=299 => AuthVerdict::Authenticated,
                401 | 403 => AuthVerdict::Unauthenticated,
                other => AuthVerdict::Failed(FailureReason::UnexpectedStatus(other)),
            },
            Probe::Role { role, .. } => match status.as_u16() {
                200..=299 => AuthVerdict::Authorized(role.clone()),
                401 => AuthVerdict::Unauthenticated,
                403 => AuthVerdict::Forbidden(role.clone()),
                other => AuthVerdict::Failed(FailureReason::UnexpectedStatus(other)),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_probe_classification() {
        let probe = Probe::session("/users");
        assert_eq!(probe.classify(StatusCode::OK), AuthVerdict::Authenticated);
        assert_eq!(probe.classify(StatusCode::NO_CONTENT), AuthVerdict::Authenticated);
        assert_eq!(probe.classify(StatusCode::UNAUTHORIZED), AuthVerdict::Unauthenticated);
        assert_eq!(probe.classify(StatusCode::FORBIDDEN), AuthVerdict::Unauthenticated);
        assert_eq!(
            probe.classify(StatusCode::NOT_FOUND),
            AuthVerdict::Failed(FailureReason::UnexpectedStatus(404))
        );
    }

    #[test]
    fn test_role_probe_separates_401_from_403() {
        let probe = Probe::role("/dashboard", Role::admin());
        assert_eq!(
            probe.classify(StatusCode::OK),
            AuthVerdict::Authorized(Role::admin())
        );
        assert_eq!(probe.classify(StatusCode::UNAUTHORIZED), AuthVerdict::Unauthenticated);
        assert_eq!(
            probe.classify(StatusCode::FORBIDDEN),
            AuthVerdict::Forbidden(Role::admin())
        );
        assert_eq!(
            probe.classify(StatusCode::INTERNAL_SERVER_ERROR),
            AuthVerdict::Failed(FailureReason::UnexpectedStatus(500))
        );
    }

    #[test]
    fn test_presence_probe_has_no_path() {
        assert_eq!(Probe::presence().path(), None);
        assert_eq!(Probe::session("/users").path(), Some("/users"));
    }
}
