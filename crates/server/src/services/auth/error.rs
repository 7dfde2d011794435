//! Authentication error types.

use thiserror::Error;

use switchboard_core::{EmailError, Notification};

use crate::error::ErrorKind;

/// Errors that can occur during sign-in, sign-up, and avatar upload.
#[derive(Debug, Error)]
pub enum AuthError {
    /// A required form field was empty. Holds the list of fields the form
    /// requires, as shown to the user.
    #[error("missing required field(s): {0}")]
    MissingField(&'static str),

    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// Registration tried to claim the admin identity.
    #[error("email is reserved")]
    EmailReserved,

    /// Registration tried to claim an email that already has a record.
    #[error("email already registered")]
    EmailTaken,

    /// Invalid credentials (wrong password or user not found).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,

    /// Uploaded profile photo was rejected.
    #[error("invalid avatar: {0}")]
    InvalidAvatar(String),
}

impl AuthError {
    /// Taxonomy class of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingField(_) | Self::InvalidEmail(_) | Self::InvalidAvatar(_) => {
                ErrorKind::Validation
            }
            Self::EmailReserved | Self::EmailTaken => ErrorKind::Conflict,
            Self::InvalidCredentials => ErrorKind::Auth,
            Self::PasswordHash => ErrorKind::Internal,
        }
    }

    /// Message shown to the user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::MissingField(fields) => format!("{fields} are required."),
            Self::InvalidEmail(_) => "Please enter a valid email address.".to_owned(),
            Self::EmailReserved => "This email is reserved.".to_owned(),
            Self::EmailTaken => {
                "Email already in use. Please log in or use a different email.".to_owned()
            }
            Self::InvalidCredentials => "Invalid email or password.".to_owned(),
            Self::PasswordHash => "Something went wrong. Please try again.".to_owned(),
            Self::InvalidAvatar(reason) => format!("Could not use that picture: {reason}."),
        }
    }

    /// The error as a user-facing notification.
    #[must_use]
    pub fn notification(&self) -> Notification {
        Notification::error(self.user_message())
    }
}
