//! User domain types.

use serde::Serialize;

use switchboard_core::{AvatarRef, Email};

/// A registered identity.
///
/// Created on registration and never mutated afterwards. `Debug` redacts the
/// password hash.
#[derive(Clone, PartialEq, Eq)]
pub struct UserRecord {
    /// Normalized email, the primary key.
    pub email: Email,
    /// Argon2id PHC string.
    pub password_hash: String,
    pub display_name: String,
    pub avatar: AvatarRef,
}

impl std::fmt::Debug for UserRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserRecord")
            .field("email", &self.email)
            .field("password_hash", &"[REDACTED]")
            .field("display_name", &self.display_name)
            .field("avatar", &self.avatar)
            .finish()
    }
}

/// Public view of a user, safe to send to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProfile {
    pub email: Email,
    pub display_name: String,
    /// URL path of the avatar image.
    pub avatar: String,
}

impl From<&UserRecord> for UserProfile {
    fn from(record: &UserRecord) -> Self {
        Self {
            email: record.email.clone(),
            display_name: record.display_name.clone(),
            avatar: record.avatar.src(),
        }
    }
}
