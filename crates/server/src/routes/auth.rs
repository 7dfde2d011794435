//! Authentication route handlers.

use axum::{
    Form, Json,
    extract::{Multipart, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::middleware::ChatSession;
use crate::models::ActionResponse;
use crate::services::identity::{self, ViewerProfile, attach_avatar, redirect_if_authenticated};
use crate::services::uploads::{StoreAvatarError, store_avatar, validate_upload};
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Sign-up form data.
#[derive(Debug, Deserialize)]
pub struct SignupForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub name: String,
}

/// Descriptor for the login and sign-up surfaces.
#[derive(Debug, Serialize)]
pub struct SurfaceView {
    pub surface: &'static str,
    pub viewer: ViewerProfile,
}

// =============================================================================
// Surfaces
// =============================================================================

/// Login surface. Signed-in clients are sent to chat.
pub async fn login_page(State(state): State<AppState>, chat: ChatSession) -> Response {
    surface(&state, &chat, "login")
}

/// Sign-up surface. Signed-in clients are sent to chat.
pub async fn signup_page(State(state): State<AppState>, chat: ChatSession) -> Response {
    surface(&state, &chat, "signup")
}

fn surface(state: &AppState, chat: &ChatSession, name: &'static str) -> Response {
    if let Some(target) = redirect_if_authenticated(chat.client()) {
        return Redirect::to(target.path()).into_response();
    }

    Json(SurfaceView {
        surface: name,
        viewer: identity::viewer(state.credentials(), chat.client()),
    })
    .into_response()
}

// =============================================================================
// Actions
// =============================================================================

/// Handle login form submission.
pub async fn login(
    State(state): State<AppState>,
    mut chat: ChatSession,
    Form(form): Form<LoginForm>,
) -> Result<Json<ActionResponse>> {
    let result = state
        .identity()
        .sign_in(chat.client_mut(), &form.email, &form.password)
        .await;

    match result {
        Ok(response) => {
            chat.save_with_new_id().await?;
            if let Some(email) = &chat.client().active_email {
                set_sentry_user(email);
            }
            Ok(Json(response))
        }
        Err(err) => {
            // A failed attempt signs the client out.
            chat.save().await?;
            Err(err.into())
        }
    }
}

/// Handle sign-up form submission.
pub async fn signup(
    State(state): State<AppState>,
    mut chat: ChatSession,
    Form(form): Form<SignupForm>,
) -> Result<Json<ActionResponse>> {
    let response = state
        .identity()
        .sign_up(chat.client_mut(), &form.email, &form.password, &form.name)
        .await?;

    chat.save_with_new_id().await?;
    if let Some(email) = &chat.client().active_email {
        set_sentry_user(email);
    }
    Ok(Json(response))
}

/// Handle logout.
pub async fn logout(
    State(state): State<AppState>,
    mut chat: ChatSession,
) -> Result<Json<ActionResponse>> {
    let response = state.identity().sign_out(chat.client_mut());
    chat.destroy().await?;
    clear_sentry_user();
    Ok(Json(response))
}

/// Handle a profile photo upload from the sign-up surface.
///
/// Expects a multipart field named `file`.
pub async fn upload_avatar(
    State(state): State<AppState>,
    mut chat: ChatSession,
    mut multipart: Multipart,
) -> Result<Json<ActionResponse>> {
    let config = state.config();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Malformed upload: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let original_name = field.file_name().unwrap_or("upload").to_owned();
        let content_type = field.content_type().map(str::to_owned);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Malformed upload: {e}")))?;

        validate_upload(
            &original_name,
            content_type.as_deref(),
            bytes.len(),
            config.max_upload_bytes,
        )?;

        let avatar = store_avatar(&config.upload_dir, &original_name, &bytes)
            .await
            .map_err(|e| match e {
                StoreAvatarError::Rejected(err) => AppError::Auth(err),
                StoreAvatarError::Io(err) => AppError::Internal(err.to_string()),
            })?;

        let notification = attach_avatar(chat.client_mut(), avatar, &original_name);
        chat.save().await?;
        return Ok(Json(ActionResponse::notify(notification)));
    }

    Err(AppError::BadRequest("No file was uploaded.".to_owned()))
}
