//! Transient notifications and navigation targets.
//!
//! Every state-changing action produces a [`Notification`] for the
//! presentation layer, and some also ask it to navigate via [`Redirect`].

use serde::{Deserialize, Serialize};

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

/// A user-facing notification (toast).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// How the notification should be presented.
    pub severity: Severity,
    /// Message text shown to the user.
    pub message: String,
}

impl Notification {
    /// Create an info notification.
    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            message: message.into(),
        }
    }

    /// Create a success notification.
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Success,
            message: message.into(),
        }
    }

    /// Create a warning notification.
    #[must_use]
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
        }
    }

    /// Create an error notification.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
        }
    }
}

/// Navigation target requested by an action or guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Redirect {
    /// The login surface.
    Login,
    /// The chat surface.
    Chat,
}

impl Redirect {
    /// URL path of the target surface.
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Login => "/login",
            Self::Chat => "/chat",
        }
    }
}
