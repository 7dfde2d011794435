//! Application state shared across handlers.

use std::sync::Arc;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tower_sessions::MemoryStore;

use switchboard_core::Email;

use crate::config::ServerConfig;
use crate::db::{self, RepositoryError, WriteBehind};
use crate::services::{AuthError, ChatService, CredentialStore, IdentityService, MessageLog};

/// Errors that can occur while building the application state.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("failed to seed admin: {0}")]
    Auth(#[from] AuthError),
    #[error("failed to hydrate stores: {0}")]
    Repository(#[from] RepositoryError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and owns the credential store,
/// the message log, the session store, and the persistence handle. Nothing
/// lives in globals.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    credentials: CredentialStore,
    messages: MessageLog,
    writer: WriteBehind,
    sessions: MemoryStore,
    shutdown: watch::Sender<bool>,
}

impl AppState {
    /// Build the state: seed the admin, hydrate from `pool` if given, and
    /// start the write-behind task.
    ///
    /// Returns the writer task handle when persistence is on; it finishes
    /// after every clone of the state is dropped.
    ///
    /// # Errors
    ///
    /// Returns `StartupError` if the admin cannot be seeded or hydration fails.
    pub async fn initialize(
        config: ServerConfig,
        pool: Option<PgPool>,
    ) -> Result<(Self, Option<JoinHandle<()>>), StartupError> {
        let admin = config.admin.clone();
        let credentials = tokio::task::spawn_blocking(move || {
            CredentialStore::with_admin(admin.email, &admin.name, admin.password.expose_secret())
        })
        .await
        .map_err(|_| AuthError::PasswordHash)??;
        let messages = MessageLog::new();

        let (writer, handle) = match pool {
            Some(pool) => {
                let stats = db::hydrate(&pool, &credentials, &messages).await?;
                tracing::info!(
                    users = stats.users,
                    messages = stats.messages,
                    "Hydrated stores from database"
                );
                let (writer, handle) = WriteBehind::spawn(pool);
                (writer, Some(handle))
            }
            None => (WriteBehind::disabled(), None),
        };
        let (shutdown, _) = watch::channel(false);

        tracing::info!(
            admin = %credentials.admin_email(),
            persistence = writer.is_enabled(),
            "Application state initialized"
        );

        Ok((
            Self {
                inner: Arc::new(AppStateInner {
                    config,
                    credentials,
                    messages,
                    writer,
                    sessions: MemoryStore::default(),
                    shutdown,
                }),
            },
            handle,
        ))
    }

    /// Get a reference to the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Get a reference to the credential store.
    #[must_use]
    pub fn credentials(&self) -> &CredentialStore {
        &self.inner.credentials
    }

    /// Get a reference to the message log.
    #[must_use]
    pub fn messages(&self) -> &MessageLog {
        &self.inner.messages
    }

    /// The store behind every client session.
    #[must_use]
    pub fn session_store(&self) -> &MemoryStore {
        &self.inner.sessions
    }

    /// Tell long-lived responses to finish. Called when graceful shutdown
    /// starts.
    pub fn begin_shutdown(&self) {
        self.inner.shutdown.send_replace(true);
    }

    /// Watch for [`Self::begin_shutdown`]. The value is `true` once shutdown
    /// has begun.
    #[must_use]
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.inner.shutdown.subscribe()
    }

    /// The reserved admin identity.
    #[must_use]
    pub fn admin_email(&self) -> &Email {
        self.inner.credentials.admin_email()
    }

    /// Identity service over this state's stores.
    #[must_use]
    pub fn identity(&self) -> IdentityService<'_> {
        IdentityService::new(&self.inner.credentials, &self.inner.writer)
    }

    /// Chat service over this state's stores.
    #[must_use]
    pub fn chat(&self) -> ChatService<'_> {
        ChatService::new(
            &self.inner.credentials,
            &self.inner.messages,
            &self.inner.writer,
        )
    }
}
