use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// A user record as returned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct User {
    /// Document stores name this `_id`; numeric ids are accepted too.
    #[serde(alias = "_id", deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(rename = "createdAt", default, skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "ts", ts(type = "string | null"))]
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    /// Trimmed, case-insensitive comparison against the user's name.
    pub fn name_matches(&self, query: &str) -> bool {
        let query = query.trim();
        !query.is_empty() && self.name.trim().to_lowercase() == query.to_lowercase()
    }

    pub fn created_display(&self) -> String {
        match self.created_at {
            Some(dt) => dt.format("%b %d, %Y").to_string(),
            None => "-".to_string(),
        }
    }

    /// Apply the fields present in `patch`.
    pub fn apply(&mut self, patch: &UserUpdate) {
        if let Some(ref name) = patch.name {
            self.name = name.clone();
        }
        if let Some(ref email) = patch.email {
            self.email = email.clone();
        }
    }
}

/// Partial update body for `PUT /users/:id`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl UserUpdate {
    pub fn name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            email: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none()
    }
}

/// `GET /users` responds either with `{ "users": [...] }` or a bare array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum UserList {
    Wrapped { users: Vec<User> },
    Bare(Vec<User>),
}

impl UserList {
    pub fn into_users(self) -> Vec<User> {
        match self {
            UserList::Wrapped { users } => users,
            UserList::Bare(users) => users,
        }
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(i64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_user_with_mongo_id() {
        let json = r#"{"_id":"665f1c2e9b1d","name":"Ana Souza","email":"ana@example.com","createdAt":"2024-01-15T10:30:00Z"}"#;
        let user: User = serde_json::from_str(json).expect("parse user");
        assert_eq!(user.id, "665f1c2e9b1d");
        assert_eq!(user.name, "Ana Souza");
        assert!(user.created_at.is_some());
        assert_eq!(user.created_display(), "Jan 15, 2024");
    }

    #[test]
    fn test_parse_user_with_numeric_id_and_missing_fields() {
        let user: User = serde_json::from_str(r#"{"id":42}"#).expect("parse user");
        assert_eq!(user.id, "42");
        assert_eq!(user.name, "");
        assert_eq!(user.created_at, None);
        assert_eq!(user.created_display(), "-");
    }

    #[test]
    fn test_user_list_accepts_both_shapes() {
        let wrapped: UserList =
            serde_json::from_str(r#"{"users":[{"id":"1","name":"A","email":"a@x.io"}]}"#)
                .expect("wrapped");
        assert_eq!(wrapped.into_users().len(), 1);

        let bare: UserList = serde_json::from_str(
            r#"[{"id":"1","name":"A","email":"a@x.io"},{"_id":"2","name":"B","email":"b@x.io"}]"#,
        )
        .expect("bare");
        let users = bare.into_users();
        assert_eq!(users.len(), 2);
        assert_eq!(users[1].id, "2");
    }

    #[test]
    fn test_name_matches_is_trimmed_and_case_insensitive() {
        let user = User {
            id: "1".into(),
            name: "Ana Souza".into(),
            email: "ana@example.com".into(),
            created_at: None,
        };
        assert!(user.name_matches("  ana souza "));
        assert!(!user.name_matches("ana"));
        assert!(!user.name_matches("   "));
    }

    #[test]
    fn test_update_serializes_only_present_fields() {
        let patch = UserUpdate::name("New Name");
        assert_eq!(
            serde_json::to_string(&patch).expect("serialize"),
            r#"{"name":"New Name"}"#
        );
        assert!(UserUpdate::default().is_empty());
    }
}
