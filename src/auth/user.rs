use serde::{Deserialize, Serialize};

use crate::error::AppError;

use super::{Permission, Role};

/// Identity carried by the session cookie and handed to every guarded route.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SessionUser {
    pub id: i64,
    pub username: String,
    pub is_admin: bool,
}

/// A row of the credential store.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[sqlx(rename = "password")]
    pub password_hash: String,
    pub is_admin: bool,
}

impl From<&User> for SessionUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            is_admin: user.is_admin,
        }
    }
}

impl SessionUser {
    pub fn role(&self) -> Role {
        Role::from_admin_flag(self.is_admin)
    }

    pub fn has_permission(&self, permission: Permission) -> bool {
        self.role().has_permission(permission)
    }

    pub fn require_permission(&self, permission: Permission) -> Result<(), AppError> {
        if self.has_permission(permission) {
            Ok(())
        } else {
            tracing::warn!(
                username = %self.username,
                role = %self.role(),
                permission = ?permission,
                "Permission denied"
            );
            Err(AppError::Unauthorized)
        }
    }
}
