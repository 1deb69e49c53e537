//! The admin view of the users resource.
//!
//! Every mutation is applied to the local list only after the server has
//! confirmed it, so the list never shows a change the backend refused.

use thiserror::Error;
use tracing::{debug, info};

use crate::api::{ApiClient, ApiError};
use crate::models::{User, UserUpdate};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("User not found: {0}")]
    NotFound(String),

    #[error("User record has no id")]
    MissingId,
}

#[derive(Debug, Clone, Default)]
pub struct UserDirectory {
    users: Vec<User>,
}

impl UserDirectory {
    pub fn new(users: Vec<User>) -> Self {
        Self { users }
    }

    /// Fetch the full user list.
    pub async fn load(client: &ApiClient) -> Result<Self, ApiError> {
        let users = client.list_users().await?;
        debug!(count = users.len(), "User directory loaded");
        Ok(Self::new(users))
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    /// Exact name match, ignoring case and surrounding whitespace.
    pub fn find_by_name(&self, name: &str) -> Result<&User, LookupError> {
        let user = self
            .users
            .iter()
            .find(|u| u.name_matches(name))
            .ok_or_else(|| LookupError::NotFound(name.trim().to_string()))?;
        if user.id.is_empty() {
            return Err(LookupError::MissingId);
        }
        Ok(user)
    }

    pub async fn rename(
        &mut self,
        client: &ApiClient,
        id: &str,
        name: &str,
    ) -> Result<(), ApiError> {
        self.update(client, id, &UserUpdate::name(name)).await
    }

    /// Send `patch` to the server, then apply it locally.
    pub async fn update(
        &mut self,
        client: &ApiClient,
        id: &str,
        patch: &UserUpdate,
    ) -> Result<(), ApiError> {
        client.update_user(id, patch).await?;
        if let Some(user) = self.users.iter_mut().find(|u| u.id == id) {
            user.apply(patch);
        }
        info!(user_id = id, "User updated");
        Ok(())
    }

    /// Delete on the server, then drop the row.
    pub async fn remove(&mut self, client: &ApiClient, id: &str) -> Result<(), ApiError> {
        client.delete_user(id).await?;
        self.users.retain(|u| u.id != id);
        info!(user_id = id, "User deleted");
        Ok(())
    }
}
