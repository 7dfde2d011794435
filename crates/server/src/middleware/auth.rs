//! Session extractors.
//!
//! [`ChatSession`] loads the [`ClientSession`] stored in the request's
//! `tower-sessions` session and writes it back on demand. [`RequireAuth`]
//! additionally rejects anonymous requests.

use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Response},
};
use tower_sessions::{Session, session::Id};

use switchboard_core::Email;

use crate::error::AppError;
use crate::models::{ClientSession, session_keys};
use crate::services::ChatError;

/// Extractor for the per-client session state.
///
/// Missing or unreadable state is treated as a fresh anonymous session.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(mut chat: ChatSession) -> Result<Json<ActionResponse>> {
///     chat.client_mut().selected_counterpart = None;
///     chat.save().await?;
///     // ...
/// }
/// ```
pub struct ChatSession {
    session: Session,
    client: ClientSession,
}

impl ChatSession {
    /// Current state.
    #[must_use]
    pub const fn client(&self) -> &ClientSession {
        &self.client
    }

    /// Mutable state. Call [`Self::save`] to keep changes.
    pub const fn client_mut(&mut self) -> &mut ClientSession {
        &mut self.client
    }

    /// The session's id in the store. `None` until the session is first
    /// saved.
    #[must_use]
    pub fn id(&self) -> Option<Id> {
        self.session.id()
    }

    /// Persist the state to the session store.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be modified.
    pub async fn save(&self) -> Result<(), tower_sessions::session::Error> {
        self.session
            .insert(session_keys::CLIENT_SESSION, &self.client)
            .await
    }

    /// Persist the state under a fresh session id. Used when the identity
    /// changes so a pre-login cookie cannot be reused.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be modified.
    pub async fn save_with_new_id(&self) -> Result<(), tower_sessions::session::Error> {
        self.session.cycle_id().await?;
        self.save().await
    }

    /// Delete the session and its cookie entirely.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    pub async fn destroy(&mut self) -> Result<(), tower_sessions::session::Error> {
        self.client.clear();
        self.session.flush().await
    }
}

/// Error returned when the session layer is missing from the stack.
pub struct SessionMissing;

impl IntoResponse for SessionMissing {
    fn into_response(self) -> Response {
        AppError::Internal("session layer not installed".to_owned()).into_response()
    }
}

impl<S> FromRequestParts<S> for ChatSession
where
    S: Send + Sync,
{
    type Rejection = SessionMissing;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Get the session from extensions (set by SessionManagerLayer)
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or(SessionMissing)?;

        let client = session
            .get::<ClientSession>(session_keys::CLIENT_SESSION)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Unreadable session state, starting fresh");
                None
            })
            .unwrap_or_default();

        Ok(Self { session, client })
    }
}

/// Extractor that requires a signed-in identity.
///
/// Anonymous requests are rejected with 401 and a notification.
pub struct RequireAuth {
    /// The signed-in identity.
    pub email: Email,
    /// The full session state.
    pub session: ChatSession,
}

/// Error returned when authentication is required but nobody is signed in.
pub enum AuthRejection {
    SessionMissing,
    Unauthorized,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::SessionMissing => SessionMissing.into_response(),
            Self::Unauthorized => AppError::Chat(ChatError::NotAuthenticated).into_response(),
        }
    }
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = ChatSession::from_request_parts(parts, state)
            .await
            .map_err(|SessionMissing| AuthRejection::SessionMissing)?;

        let email = session
            .client()
            .active_email
            .clone()
            .ok_or(AuthRejection::Unauthorized)?;

        Ok(Self { email, session })
    }
}
