//! Authenticated caller identity
//!
//! Produced by the identity layer (JWT middleware in the HTTP surface) and
//! trusted as-is by the engine.

use crate::domain::DomainResult;
use crate::shared::errors::DomainError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: String,
    pub is_admin: bool,
}

impl Principal {
    pub fn user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            is_admin: false,
        }
    }

    pub fn admin(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            is_admin: true,
        }
    }

    pub fn require_admin(&self, action: &str) -> DomainResult<()> {
        if self.is_admin {
            Ok(())
        } else {
            Err(DomainError::Unauthorized(format!(
                "admin access required to {}",
                action
            )))
        }
    }

    /// Owners and admins may see a reservation.
    pub fn can_access(&self, owner_id: &str) -> bool {
        self.is_admin || self.user_id == owner_id
    }
}
