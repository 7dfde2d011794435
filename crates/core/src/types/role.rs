//! Viewer roles.

use serde::{Deserialize, Serialize};

use crate::Email;

/// Role of the identity behind a session.
///
/// There is exactly one admin identity per process (the reserved email);
/// everyone else who is signed in is a regular user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    /// Derive the role of `email` given the reserved admin identity.
    #[must_use]
    pub fn of(email: &Email, admin_email: &Email) -> Self {
        if email == admin_email {
            Self::Admin
        } else {
            Self::User
        }
    }

    /// Whether this is the admin role.
    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }
}
