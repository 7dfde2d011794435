//! Session-related types.
//!
//! Types stored in the session for authentication and conversation state.

use serde::{Deserialize, Serialize};

use switchboard_core::{AvatarRef, Email, Role};

/// Per-client state kept in the `tower-sessions` session.
///
/// Created empty when a client connects. `active_email` is set by a
/// successful sign-in or sign-up and everything is cleared on sign-out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSession {
    /// Identity of the signed-in user, if any.
    pub active_email: Option<Email>,
    /// Conversation the admin currently has open. Unused for regular users.
    pub selected_counterpart: Option<Email>,
    /// Photo uploaded on the sign-up surface, consumed by the next sign-up.
    pub pending_avatar: Option<AvatarRef>,
}

impl ClientSession {
    /// Session of a signed-in user with nothing selected.
    #[must_use]
    pub const fn authenticated(email: Email) -> Self {
        Self {
            active_email: Some(email),
            selected_counterpart: None,
            pending_avatar: None,
        }
    }

    /// Whether someone is signed in.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.active_email.is_some()
    }

    /// Role of the signed-in identity, `None` when anonymous.
    #[must_use]
    pub fn role(&self, admin_email: &Email) -> Option<Role> {
        self.active_email
            .as_ref()
            .map(|email| Role::of(email, admin_email))
    }

    /// Whether the signed-in identity is the admin.
    #[must_use]
    pub fn is_admin(&self, admin_email: &Email) -> bool {
        self.role(admin_email).is_some_and(Role::is_admin)
    }

    /// Drop identity and selection, keeping nothing.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Session keys.
pub mod session_keys {
    /// Key for the serialized [`super::ClientSession`].
    pub const CLIENT_SESSION: &str = "client_session";
}
