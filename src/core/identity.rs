//! Caller identity as seen by the core.
//!
//! Authentication happens outside this crate; by the time a request reaches a
//! manager the caller has been reduced to an [`Actor`].

use crate::{
    entities::Role,
    errors::{Error, Result},
};

/// An authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    /// Verified user id
    pub user_id: String,
    /// Role the caller acts in
    pub role: Role,
    /// Whether the caller holds a premium membership
    pub is_premium: bool,
}

impl Actor {
    /// A standard-tier client.
    pub fn client(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            role: Role::Client,
            is_premium: false,
        }
    }

    /// A standard-tier student (worker).
    pub fn student(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            role: Role::Student,
            is_premium: false,
        }
    }

    /// Marks the actor as premium.
    #[must_use]
    pub fn premium(mut self) -> Self {
        self.is_premium = true;
        self
    }

    /// Fails with [`Error::Forbidden`] unless the actor has `role`.
    pub fn require_role(&self, role: Role) -> Result<()> {
        if self.role == role {
            Ok(())
        } else {
            Err(Error::forbidden(format!(
                "Only a {role} may perform this action"
            )))
        }
    }
}
