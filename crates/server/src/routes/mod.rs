//! HTTP route handlers.
//!
//! All responses are JSON. State-changing calls answer with an
//! [`ActionResponse`](crate::models::ActionResponse).
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Liveness check
//!
//! # Auth
//! GET  /login                  - Login surface (303 to /chat when signed in)
//! GET  /signup                 - Sign-up surface (303 to /chat when signed in)
//! POST /auth/login             - Sign in (form: email, password)
//! POST /auth/signup            - Register and sign in (form: email, password, name)
//! POST /auth/logout            - Sign out
//! POST /auth/avatar            - Upload a profile photo for the next sign-up (multipart: file)
//!
//! # Chat
//! GET  /chat                   - Conversation view (303 to /login when anonymous)
//! GET  /chat/messages          - Visible messages
//! POST /chat/messages          - Send a message (form: content)
//! POST /chat/select            - Admin: open a conversation (form: email)
//! GET  /chat/roster            - Admin: registered users
//! GET  /chat/events            - SSE stream of new messages for the viewer
//!
//! # Static
//! GET  /avatars/*              - Built-in avatar images
//! GET  /uploads/*              - Uploaded profile photos
//! ```

pub mod auth;
pub mod chat;
pub mod events;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

use crate::state::AppState;

/// Multipart framing allowance on top of the upload size limit.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Create the auth routes router.
pub fn auth_routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/login", post(auth::login))
        .route("/signup", post(auth::signup))
        .route("/logout", post(auth::logout))
        .route(
            "/avatar",
            post(auth::upload_avatar).layer(DefaultBodyLimit::max(
                max_upload_bytes.saturating_add(MULTIPART_OVERHEAD_BYTES),
            )),
        )
}

/// Create the chat routes router.
pub fn chat_routes() -> Router<AppState> {
    Router::new()
        .route("/chat", get(chat::show))
        .route("/chat/messages", get(chat::messages).post(chat::send))
        .route("/chat/select", post(chat::select))
        .route("/chat/roster", get(chat::roster))
        .route("/chat/events", get(events::stream))
}

/// Create all routes.
pub fn routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/login", get(auth::login_page))
        .route("/signup", get(auth::signup_page))
        .nest("/auth", auth_routes(max_upload_bytes))
        .merge(chat_routes())
}

/// Liveness health check endpoint.
async fn health() -> &'static str {
    "ok"
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
    };
    use secrecy::SecretString;
    use tower::ServiceExt;

    use switchboard_core::Email;

    use crate::config::{AdminConfig, ServerConfig};
    use crate::state::AppState;

    async fn test_app() -> axum::Router {
        let admin = AdminConfig {
            email: Email::parse("admin@x.com").unwrap(),
            name: "Admin".to_owned(),
            password: SecretString::from("correct horse battery staple"),
        };
        let upload_dir = std::env::temp_dir().join(format!("sb-routes-{}", uuid::Uuid::new_v4()));
        let config = ServerConfig::local(admin, upload_dir);
        let (state, _) = AppState::initialize(config, None).await.unwrap();
        crate::app(state)
    }

    fn form(uri: &str, body: &str) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_owned()))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = test_app()
            .await
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_anonymous_chat_redirects_to_login() {
        let response = test_app()
            .await
            .oneshot(Request::get("/chat").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/login");
    }

    #[tokio::test]
    async fn test_login_surface_for_anonymous() {
        let response = test_app()
            .await
            .oneshot(Request::get("/login").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["surface"], "login");
        assert_eq!(body["viewer"]["display_name"], "Guest");
        assert_eq!(body["viewer"]["is_authenticated"], false);
    }

    #[tokio::test]
    async fn test_anonymous_send_is_unauthorized() {
        let response = test_app()
            .await
            .oneshot(form("/chat/messages", "content=hello"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = json_body(response).await;
        assert_eq!(body["notification"]["severity"], "error");
    }

    #[tokio::test]
    async fn test_login_with_wrong_password() {
        let response = test_app()
            .await
            .oneshot(form("/auth/login", "email=admin%40x.com&password=nope"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = json_body(response).await;
        assert_eq!(body["notification"]["message"], "Invalid email or password.");
    }

    #[tokio::test]
    async fn test_signup_with_reserved_email_conflicts() {
        let response = test_app()
            .await
            .oneshot(form(
                "/auth/signup",
                "email=ADMIN%40x.com&password=pw&name=Mallory",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_admin_login_redirects_to_chat() {
        let response = test_app()
            .await
            .oneshot(form(
                "/auth/login",
                "email=admin%40x.com&password=correct+horse+battery+staple",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(header::SET_COOKIE));

        let body = json_body(response).await;
        assert_eq!(body["redirect"], "/chat");
        assert_eq!(body["notification"]["severity"], "success");
    }
}
