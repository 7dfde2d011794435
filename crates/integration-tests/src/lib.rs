//! Integration tests for Switchboard.
//!
//! Each test spawns its own server on an ephemeral port with in-memory
//! stores, so tests are isolated and need nothing running.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p switchboard-integration-tests
//!
//! # Include the database tests (needs DATABASE_URL)
//! cargo test -p switchboard-integration-tests -- --ignored
//! ```

use std::path::PathBuf;
use std::time::Duration;

use reqwest::{Client, Response, redirect::Policy};
use secrecy::SecretString;
use sqlx::PgPool;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use switchboard_core::Email;
use switchboard_server::config::{AdminConfig, ServerConfig};
use switchboard_server::state::AppState;

/// Admin identity every test server is seeded with.
pub const ADMIN_EMAIL: &str = "admin@switchboard.test";
pub const ADMIN_NAME: &str = "Operator";
pub const ADMIN_PASSWORD: &str = "correct horse battery staple";

/// A running server and the state behind it.
pub struct TestServer {
    pub base_url: String,
    pub state: AppState,
    pub upload_dir: PathBuf,
    server: Option<JoinHandle<()>>,
    stop: Option<oneshot::Sender<()>>,
}

impl TestServer {
    /// Absolute URL for `path`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// A fresh client with its own cookie jar. Redirects are not followed.
    #[must_use]
    pub fn client(&self) -> Client {
        Client::builder()
            .cookie_store(true)
            .redirect(Policy::none())
            .build()
            .expect("Failed to create HTTP client")
    }

    /// Submit the sign-up form.
    pub async fn sign_up(&self, client: &Client, email: &str, password: &str, name: &str) -> Response {
        client
            .post(self.url("/auth/signup"))
            .form(&[("email", email), ("password", password), ("name", name)])
            .send()
            .await
            .expect("Failed to submit sign-up")
    }

    /// Submit the login form.
    pub async fn sign_in(&self, client: &Client, email: &str, password: &str) -> Response {
        client
            .post(self.url("/auth/login"))
            .form(&[("email", email), ("password", password)])
            .send()
            .await
            .expect("Failed to submit login")
    }

    /// A client signed in as the admin.
    pub async fn admin_client(&self) -> Client {
        let client = self.client();
        let resp = self.sign_in(&client, ADMIN_EMAIL, ADMIN_PASSWORD).await;
        assert!(resp.status().is_success(), "admin sign-in failed: {}", resp.status());
        client
    }

    /// A client signed up and signed in as a new user.
    pub async fn user_client(&self, email: &str, password: &str, name: &str) -> Client {
        let client = self.client();
        let resp = self.sign_up(&client, email, password, name).await;
        assert!(resp.status().is_success(), "sign-up failed: {}", resp.status());
        client
    }

    /// Send a message as whoever `client` is signed in as.
    pub async fn send(&self, client: &Client, content: &str) -> Response {
        client
            .post(self.url("/chat/messages"))
            .form(&[("content", content)])
            .send()
            .await
            .expect("Failed to send message")
    }

    /// Admin: open a conversation.
    pub async fn select(&self, client: &Client, email: &str) -> Response {
        client
            .post(self.url("/chat/select"))
            .form(&[("email", email)])
            .send()
            .await
            .expect("Failed to select counterpart")
    }

    /// Contents of the messages visible to `client`, in order.
    pub async fn visible_contents(&self, client: &Client) -> Vec<String> {
        let messages: Vec<serde_json::Value> = client
            .get(self.url("/chat/messages"))
            .send()
            .await
            .expect("Failed to fetch messages")
            .json()
            .await
            .expect("Messages were not JSON");

        messages
            .iter()
            .filter_map(|m| m["content"].as_str().map(str::to_owned))
            .collect()
    }
}

impl TestServer {
    /// Begin graceful shutdown and wait up to `timeout` for the server to
    /// finish. Returns whether it finished in time.
    pub async fn shut_down(&mut self, timeout: Duration) -> bool {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        match self.server.as_mut() {
            Some(server) => tokio::time::timeout(timeout, server).await.is_ok(),
            None => true,
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(server) = self.server.take() {
            server.abort();
        }
        let _ = std::fs::remove_dir_all(&self.upload_dir);
    }
}

/// Spawn a server with persistence off.
pub async fn spawn_server() -> TestServer {
    spawn_server_with_pool(None).await
}

/// Spawn a server, hydrating from and persisting to `pool` if given.
pub async fn spawn_server_with_pool(pool: Option<PgPool>) -> TestServer {
    let admin = AdminConfig {
        email: Email::parse(ADMIN_EMAIL).expect("Invalid admin email"),
        name: ADMIN_NAME.to_owned(),
        password: SecretString::from(ADMIN_PASSWORD),
    };
    let upload_dir = std::env::temp_dir().join(format!("switchboard-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&upload_dir).expect("Failed to create upload dir");

    let config = ServerConfig::local(admin, upload_dir.clone());

    let (state, _writer) = AppState::initialize(config, pool)
        .await
        .expect("Failed to initialize state");

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("No local address");

    let router = switchboard_server::app(state.clone());
    let (stop, stopped) = oneshot::channel::<()>();
    let shutdown_state = state.clone();
    let server = tokio::spawn(async move {
        let _ = axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                let _ = stopped.await;
                shutdown_state.begin_shutdown();
            })
            .await;
    });

    TestServer {
        base_url: format!("http://{addr}"),
        state,
        upload_dir,
        server: Some(server),
        stop: Some(stop),
    }
}
