//! Chat route handlers.

use axum::{
    Form, Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};

use switchboard_core::Notification;

use crate::error::{Result, add_breadcrumb};
use crate::middleware::ChatSession;
use crate::models::{ActionResponse, Message};
use crate::services::RosterEntry;
use crate::services::identity::require_authenticated;
use crate::state::AppState;

/// Send form data.
#[derive(Debug, Deserialize)]
pub struct SendForm {
    #[serde(default)]
    pub content: String,
}

/// Select form data.
#[derive(Debug, Deserialize)]
pub struct SelectForm {
    #[serde(default)]
    pub email: String,
}

/// Response for a sent message.
#[derive(Debug, Serialize)]
pub struct SendResponse {
    #[serde(flatten)]
    pub action: ActionResponse,
    pub message: Message,
}

/// Conversation view. Anonymous clients are sent to the login surface.
pub async fn show(State(state): State<AppState>, chat: ChatSession) -> Response {
    if let Some(target) = require_authenticated(chat.client()) {
        return Redirect::to(target.path()).into_response();
    }

    Json(state.chat().conversation(chat.client())).into_response()
}

/// Messages visible to the client, in log order.
pub async fn messages(State(state): State<AppState>, chat: ChatSession) -> Json<Vec<Message>> {
    Json(state.chat().visible_messages(chat.client()))
}

/// Send a message.
pub async fn send(
    State(state): State<AppState>,
    chat: ChatSession,
    Form(form): Form<SendForm>,
) -> Result<(StatusCode, Json<SendResponse>)> {
    let message = state.chat().send_message(chat.client(), &form.content)?;
    add_breadcrumb("chat", "Message sent", &[("receiver", message.receiver.as_str())]);

    Ok((
        StatusCode::CREATED,
        Json(SendResponse {
            action: ActionResponse::notify(Notification::success("Message sent.")),
            message,
        }),
    ))
}

/// Admin: open the conversation with a user.
pub async fn select(
    State(state): State<AppState>,
    mut chat: ChatSession,
    Form(form): Form<SelectForm>,
) -> Result<Json<ActionResponse>> {
    let notification = state
        .chat()
        .select_counterpart(chat.client_mut(), &form.email)?;
    chat.save().await?;
    Ok(Json(ActionResponse::notify(notification)))
}

/// Admin: every registered user. Empty for everyone else.
pub async fn roster(State(state): State<AppState>, chat: ChatSession) -> Json<Vec<RosterEntry>> {
    Json(state.chat().roster(chat.client()))
}
