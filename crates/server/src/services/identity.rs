//! Identity and session management.
//!
//! A [`ClientSession`] is either anonymous or authenticated as one email.
//!
//! ```text
//! Anonymous --sign_in/sign_up ok--> Authenticated(email)
//! Anonymous --sign_in failed------> Anonymous (identity and selection cleared)
//! Authenticated --sign_out--------> Anonymous (session cleared)
//! ```
//!
//! Every transition yields an [`ActionResponse`] carrying the notification
//! and, where the flow moves on, the surface to navigate to.

use serde::Serialize;
use tracing::instrument;

use switchboard_core::{AvatarRef, Email, Notification, Redirect};

use crate::db::persistence::WriteBehind;
use crate::models::{ActionResponse, ClientSession, UserRecord};
use crate::services::auth::AuthError;
use crate::services::credentials::{AvatarChoice, CredentialStore};

/// Display name for anonymous viewers and unresolvable records.
const GUEST_NAME: &str = "Guest";

/// Fields the sign-in form requires, as shown to the user.
const SIGN_IN_FIELDS: &str = "Email and password";

/// What the client shows about its own identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewerProfile {
    pub email: Option<Email>,
    pub display_name: String,
    pub avatar: String,
    pub is_authenticated: bool,
    pub is_admin: bool,
}

/// Identity service.
///
/// Borrows the shared stores; construct one per request.
pub struct IdentityService<'a> {
    credentials: &'a CredentialStore,
    writer: &'a WriteBehind,
}

impl<'a> IdentityService<'a> {
    /// Create a new identity service.
    #[must_use]
    pub const fn new(credentials: &'a CredentialStore, writer: &'a WriteBehind) -> Self {
        Self {
            credentials,
            writer,
        }
    }

    /// Sign in with email and password.
    ///
    /// Any failure leaves the session anonymous with no selection.
    ///
    /// # Errors
    ///
    /// - `AuthError::MissingField` if email or password is blank
    /// - `AuthError::InvalidCredentials` if the pair does not verify
    /// - `AuthError::PasswordHash` if verification could not run
    #[instrument(skip(self, session, password))]
    pub async fn sign_in(
        &self,
        session: &mut ClientSession,
        email: &str,
        password: &str,
    ) -> Result<ActionResponse, AuthError> {
        match self.try_sign_in(email, password).await {
            Ok(record) => {
                tracing::info!(email = %record.email, "User signed in");
                session.active_email = Some(record.email);
                session.selected_counterpart = None;
                Ok(ActionResponse::redirect(
                    Notification::success(format!("Welcome back, {}!", record.display_name)),
                    Redirect::Chat,
                ))
            }
            Err(err) => {
                tracing::info!(error = %err, "Sign-in rejected");
                session.active_email = None;
                session.selected_counterpart = None;
                Err(err)
            }
        }
    }

    async fn try_sign_in(&self, email: &str, password: &str) -> Result<UserRecord, AuthError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(AuthError::MissingField(SIGN_IN_FIELDS));
        }

        let store = self.credentials.clone();
        let (email, password) = (email.to_owned(), password.to_owned());
        let verified = tokio::task::spawn_blocking(move || {
            store
                .verify(&email, &password)
                .then(|| Email::parse(&email).ok().and_then(|e| store.lookup(&e)))
                .flatten()
        })
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Password verification task failed");
            AuthError::PasswordHash
        })?;

        verified.ok_or(AuthError::InvalidCredentials)
    }

    /// Register and sign in.
    ///
    /// Uses the session's pending avatar if one was uploaded, otherwise a
    /// random default. The session is untouched on failure.
    ///
    /// # Errors
    ///
    /// See [`CredentialStore::register`].
    #[instrument(skip(self, session, password, name))]
    pub async fn sign_up(
        &self,
        session: &mut ClientSession,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<ActionResponse, AuthError> {
        let store = self.credentials.clone();
        let avatar = AvatarChoice::from(session.pending_avatar.clone());
        let (email, password, name) = (email.to_owned(), password.to_owned(), name.to_owned());

        let record = tokio::task::spawn_blocking(move || {
            store.register(&email, &password, &name, avatar)
        })
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Registration task failed");
            AuthError::PasswordHash
        })??;

        self.writer.user(&record);
        tracing::info!(email = %record.email, "User registered");

        let message = format!(
            "Welcome, {}! Your account has been created.",
            record.display_name
        );
        *session = ClientSession::authenticated(record.email);
        Ok(ActionResponse::redirect(
            Notification::success(message),
            Redirect::Chat,
        ))
    }

    /// Sign out, clearing the whole session.
    #[must_use]
    pub fn sign_out(&self, session: &mut ClientSession) -> ActionResponse {
        let name = display_name(self.credentials, session);
        if let Some(email) = &session.active_email {
            tracing::info!(email = %email, "User signed out");
        }
        session.clear();
        ActionResponse::redirect(
            Notification::info(format!("You have been logged out, {name}.")),
            Redirect::Login,
        )
    }
}

/// Remember an uploaded photo for the next sign-up from this session.
pub fn attach_avatar(
    session: &mut ClientSession,
    avatar: AvatarRef,
    original_name: &str,
) -> Notification {
    session.pending_avatar = Some(avatar);
    Notification::info(format!("Selected {original_name} for profile picture."))
}

/// Guard for the chat surface: anonymous sessions go to the login surface.
#[must_use]
pub const fn require_authenticated(session: &ClientSession) -> Option<Redirect> {
    if session.is_authenticated() {
        None
    } else {
        Some(Redirect::Login)
    }
}

/// Guard for the login and sign-up surfaces: signed-in sessions go to chat.
#[must_use]
pub const fn redirect_if_authenticated(session: &ClientSession) -> Option<Redirect> {
    if session.is_authenticated() {
        Some(Redirect::Chat)
    } else {
        None
    }
}

/// Display name of the signed-in identity, or "Guest".
#[must_use]
pub fn display_name(credentials: &CredentialStore, session: &ClientSession) -> String {
    session
        .active_email
        .as_ref()
        .and_then(|email| credentials.lookup(email))
        .map_or_else(|| GUEST_NAME.to_owned(), |record| record.display_name)
}

/// Avatar of the signed-in identity, or the fallback avatar.
#[must_use]
pub fn avatar(credentials: &CredentialStore, session: &ClientSession) -> AvatarRef {
    session
        .active_email
        .as_ref()
        .and_then(|email| credentials.lookup(email))
        .map_or_else(AvatarRef::fallback, |record| record.avatar)
}

/// Everything the client shows about its own identity.
#[must_use]
pub fn viewer(credentials: &CredentialStore, session: &ClientSession) -> ViewerProfile {
    ViewerProfile {
        email: session.active_email.clone(),
        display_name: display_name(credentials, session),
        avatar: avatar(credentials, session).src(),
        is_authenticated: session.is_authenticated(),
        is_admin: session.is_admin(credentials.admin_email()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use switchboard_core::Severity;

    use super::*;

    fn store() -> CredentialStore {
        CredentialStore::with_admin(Email::parse("admin@x.com").unwrap(), "Admin", "adminpw")
            .unwrap()
    }

    #[tokio::test]
    async fn test_sign_up_then_sign_out_then_sign_in() {
        let store = store();
        let writer = WriteBehind::disabled();
        let identity = IdentityService::new(&store, &writer);
        let mut session = ClientSession::default();

        let response = identity
            .sign_up(&mut session, "Alice@X.com", "pw1234", "Alice")
            .await
            .unwrap();
        assert_eq!(
            response.notification.message,
            "Welcome, Alice! Your account has been created."
        );
        assert_eq!(response.redirect, Some(Redirect::Chat));
        assert_eq!(session.active_email.as_ref().unwrap().as_str(), "alice@x.com");
        assert!(!session.is_admin(store.admin_email()));

        let response = identity.sign_out(&mut session);
        assert_eq!(response.notification.message, "You have been logged out, Alice.");
        assert_eq!(response.notification.severity, Severity::Info);
        assert_eq!(response.redirect, Some(Redirect::Login));
        assert_eq!(session, ClientSession::default());

        let response = identity
            .sign_in(&mut session, "alice@x.com", "pw1234")
            .await
            .unwrap();
        assert_eq!(response.notification.message, "Welcome back, Alice!");
        assert_eq!(response.notification.severity, Severity::Success);
        assert!(session.is_authenticated());
    }

    #[tokio::test]
    async fn test_admin_sign_in_sets_admin_role() {
        let store = store();
        let writer = WriteBehind::disabled();
        let identity = IdentityService::new(&store, &writer);
        let mut session = ClientSession::default();

        identity
            .sign_in(&mut session, " ADMIN@x.com", "adminpw")
            .await
            .unwrap();
        assert!(session.is_admin(store.admin_email()));
        assert!(viewer(&store, &session).is_admin);
    }

    #[tokio::test]
    async fn test_failed_sign_in_clears_identity_and_selection() {
        let store = store();
        let writer = WriteBehind::disabled();
        let identity = IdentityService::new(&store, &writer);
        let mut session = ClientSession {
            active_email: Some(store.admin_email().clone()),
            selected_counterpart: Some(Email::parse("bob@x.com").unwrap()),
            pending_avatar: None,
        };

        let err = identity
            .sign_in(&mut session, "admin@x.com", "wrong")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
        assert_eq!(err.user_message(), "Invalid email or password.");
        assert_eq!(session.active_email, None);
        assert_eq!(session.selected_counterpart, None);
    }

    #[tokio::test]
    async fn test_sign_in_missing_fields() {
        let store = store();
        let writer = WriteBehind::disabled();
        let identity = IdentityService::new(&store, &writer);
        let mut session = ClientSession::default();

        let err = identity.sign_in(&mut session, "", "pw").await.unwrap_err();
        assert_eq!(err.user_message(), "Email and password are required.");

        let err = identity
            .sign_in(&mut session, "alice@x.com", "")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::MissingField(_)));
    }

    #[tokio::test]
    async fn test_failed_sign_up_leaves_session_untouched() {
        let store = store();
        let writer = WriteBehind::disabled();
        let identity = IdentityService::new(&store, &writer);
        let mut session = ClientSession::default();

        let err = identity
            .sign_up(&mut session, "admin@x.com", "pw", "Mallory")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::EmailReserved));
        assert_eq!(session, ClientSession::default());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_sign_up_consumes_pending_avatar() {
        let store = store();
        let writer = WriteBehind::disabled();
        let identity = IdentityService::new(&store, &writer);
        let mut session = ClientSession::default();

        let avatar = AvatarRef::uploaded("abc_me.png").unwrap();
        let notification = attach_avatar(&mut session, avatar.clone(), "me.png");
        assert_eq!(notification.message, "Selected me.png for profile picture.");

        identity
            .sign_up(&mut session, "carol@x.com", "pw", "Carol")
            .await
            .unwrap();
        assert_eq!(session.pending_avatar, None);
        assert_eq!(
            store
                .lookup(&Email::parse("carol@x.com").unwrap())
                .unwrap()
                .avatar,
            avatar
        );
    }

    #[test]
    fn test_guards() {
        let anonymous = ClientSession::default();
        assert_eq!(require_authenticated(&anonymous), Some(Redirect::Login));
        assert_eq!(redirect_if_authenticated(&anonymous), None);

        let signed_in = ClientSession::authenticated(Email::parse("alice@x.com").unwrap());
        assert_eq!(require_authenticated(&signed_in), None);
        assert_eq!(redirect_if_authenticated(&signed_in), Some(Redirect::Chat));
    }

    #[test]
    fn test_projections_fall_back_for_guests() {
        let store = store();
        let anonymous = ClientSession::default();
        assert_eq!(display_name(&store, &anonymous), "Guest");
        assert_eq!(avatar(&store, &anonymous), AvatarRef::fallback());

        // Session pointing at an identity with no record.
        let dangling = ClientSession::authenticated(Email::parse("ghost@x.com").unwrap());
        assert_eq!(display_name(&store, &dangling), "Guest");

        let profile = viewer(&store, &anonymous);
        assert!(!profile.is_authenticated);
        assert!(!profile.is_admin);
        assert_eq!(profile.email, None);
    }
}
