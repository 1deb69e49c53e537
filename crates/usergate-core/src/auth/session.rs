use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// The persisted form of a session: the opaque bearer token and when it was
/// handed to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionData {
    pub token: String,
    pub stored_at: DateTime<Utc>,
}

impl SessionData {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            stored_at: Utc::now(),
        }
    }

    /// How long ago the token was stored.
    pub fn age(&self) -> Duration {
        Utc::now() - self.stored_at
    }

    /// Age for display, e.g. "just now", "12m ago", "3h ago".
    pub fn age_display(&self) -> String {
        let minutes = self.age().num_minutes();
        if minutes < 1 {
            // Also covers clock skew
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            format!("{}h ago", minutes / 60)
        } else {
            format!("{}d ago", minutes / 1440)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_data_serialization_shape() {
        let data = SessionData::new("abc123");
        let json = serde_json::to_value(&data).expect("serialize session");
        assert_eq!(json["token"], "abc123");
        assert!(json["stored_at"].is_string());
    }

    #[test]
    fn test_age_display() {
        let mut data = SessionData::new("t");
        assert_eq!(data.age_display(), "just now");

        data.stored_at = Utc::now() - Duration::minutes(12);
        assert_eq!(data.age_display(), "12m ago");

        data.stored_at = Utc::now() - Duration::minutes(185);
        assert_eq!(data.age_display(), "3h ago");

        data.stored_at = Utc::now() - Duration::days(2);
        assert_eq!(data.age_display(), "2d ago");

        data.stored_at = Utc::now() + Duration::minutes(5);
        assert_eq!(data.age_display(), "just now");
    }
}
