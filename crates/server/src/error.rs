//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//! Error bodies are [`ActionResponse`] JSON so the client can show the
//! notification the same way as for successful actions.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use switchboard_core::{Email, Notification};

use crate::models::ActionResponse;
use crate::services::auth::AuthError;
use crate::services::chat::ChatError;

/// Classes of failure, each with a fixed HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed or missing input.
    Validation,
    /// The request collides with existing state (reserved or taken email).
    Conflict,
    /// Identity could not be established.
    Auth,
    /// The identity may not perform the action.
    Authorization,
    /// The action is not possible in the current session state.
    State,
    /// Something broke on our side.
    Internal,
}

impl ErrorKind {
    /// HTTP status used when this kind reaches the client.
    #[must_use]
    pub const fn status(self) -> StatusCode {
        match self {
            Self::Validation => StatusCode::BAD_REQUEST,
            Self::Conflict | Self::State => StatusCode::CONFLICT,
            Self::Auth => StatusCode::UNAUTHORIZED,
            Self::Authorization => StatusCode::FORBIDDEN,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Application-level error type for the server.
#[derive(Debug, Error)]
pub enum AppError {
    /// Sign-in, sign-up, or upload failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// A chat action failed.
    #[error("Chat error: {0}")]
    Chat(#[from] ChatError),

    /// The session store failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Taxonomy class of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Auth(err) => err.kind(),
            Self::Chat(err) => err.kind(),
            Self::BadRequest(_) => ErrorKind::Validation,
            Self::Session(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Notification shown to the user. Internal details are never exposed.
    #[must_use]
    pub fn notification(&self) -> Notification {
        match self {
            Self::Auth(err) => err.notification(),
            Self::Chat(err) => err.notification(),
            Self::BadRequest(msg) => Notification::error(msg.clone()),
            Self::Session(_) | Self::Internal(_) => {
                Notification::error("Something went wrong. Please try again.")
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let kind = self.kind();

        // Capture server errors to Sentry
        if kind == ErrorKind::Internal {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, ?kind, "Request rejected");
        }

        let body = ActionResponse::notify(self.notification());
        (kind.status(), Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context after successful authentication.
pub fn set_sentry_user(email: &Email) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(email.to_string()),
            email: Some(email.to_string()),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: &[(&str, &str)]) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_owned()),
        message: Some(message.to_owned()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    for (key, value) in data {
        breadcrumb.data.insert(
            (*key).to_owned(),
            serde_json::Value::String((*value).to_owned()),
        );
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::BadRequest("invalid input".to_owned());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_kind_status_codes() {
        assert_eq!(ErrorKind::Validation.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorKind::Conflict.status(), StatusCode::CONFLICT);
        assert_eq!(ErrorKind::Auth.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorKind::Authorization.status(), StatusCode::FORBIDDEN);
        assert_eq!(ErrorKind::State.status(), StatusCode::CONFLICT);
        assert_eq!(
            ErrorKind::Internal.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::Auth(AuthError::EmailTaken)),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AppError::Chat(ChatError::AdminOnly)),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AppError::Chat(ChatError::NoRecipientSelected)),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AppError::BadRequest("test".to_owned())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_owned())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let err = AppError::Internal("connection refused on 10.0.0.3".to_owned());
        assert!(!err.notification().message.contains("10.0.0.3"));
    }
}
