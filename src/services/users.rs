//! User service implementation
//!
//! Admin account management and the account check run when a bearer token is
//! resolved into an `Identity`.

use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use crate::database::store::UserStore;
use crate::models::User;
use crate::services::auth::Identity;
use crate::utils::errors::{ClubHubError, Result};
use crate::utils::logging::log_admin_action;

/// User service for account administration
#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserStore>,
}

impl UserService {
    /// Create a new UserService instance
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    /// Reject tokens whose account was removed or blocked after issuance
    pub async fn ensure_active(&self, identity: &Identity) -> Result<()> {
        let user = self
            .users
            .find_user(identity.user_id)
            .await?
            .ok_or_else(|| ClubHubError::Unauthenticated("unknown account".to_string()))?;

        if !user.is_active {
            debug!(user_id = %user.id, "Refused blocked account");
            return Err(ClubHubError::Authorization(
                "your account is blocked, contact an admin".to_string(),
            ));
        }

        Ok(())
    }

    /// Every non-admin account, newest first
    pub async fn list_users(&self, identity: &Identity) -> Result<Vec<User>> {
        identity.require_admin()?;
        self.users.list_users().await
    }

    /// Block an active account or unblock a blocked one
    pub async fn toggle_active(&self, identity: &Identity, user_id: Uuid) -> Result<User> {
        identity.require_admin()?;
        if identity.user_id == user_id {
            return Err(ClubHubError::Authorization(
                "cannot block your own account".to_string(),
            ));
        }

        let user = self
            .users
            .find_user(user_id)
            .await?
            .ok_or_else(|| ClubHubError::not_found("user", user_id))?;

        let user = self
            .users
            .set_active(user.id, !user.is_active)
            .await?
            .ok_or_else(|| ClubHubError::not_found("user", user_id))?;

        let action = if user.is_active { "unblock_user" } else { "block_user" };
        log_admin_action(identity.user_id, action, Some(&user.id.to_string()), None);
        info!(user_id = %user.id, is_active = user.is_active, "User active flag toggled");

        Ok(user)
    }
}
