//! Optional `PostgreSQL` persistence.
//!
//! The in-memory stores are authoritative while the process runs. When a
//! database is configured, they are hydrated from it at startup and every
//! registration and message is written behind by a single writer task.
//!
//! ## Tables
//!
//! - `users` - Registered identities (the admin is never stored)
//! - `messages` - The global message log, ordered by `id`
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p switchboard-cli -- migrate
//! ```

pub mod messages;
pub mod persistence;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use crate::services::{CredentialStore, MessageLog};

pub use messages::MessageRepository;
pub use persistence::WriteBehind;
pub use users::UserRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database query failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in database is invalid or corrupted.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Record already exists (unique constraint violation).
    #[error("conflict: {0}")]
    Conflict(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(5)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Counts of records loaded by [`hydrate`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HydrationStats {
    pub users: usize,
    pub messages: usize,
}

/// Load persisted users and messages into the in-memory stores.
///
/// Users already present (the seeded admin) are kept as they are.
///
/// # Errors
///
/// Returns `RepositoryError` if a query fails or a row does not validate.
pub async fn hydrate(
    pool: &PgPool,
    credentials: &CredentialStore,
    log: &MessageLog,
) -> Result<HydrationStats, RepositoryError> {
    let mut stats = HydrationStats::default();

    for record in UserRepository::new(pool).list_all().await? {
        if credentials.restore(record) {
            stats.users += 1;
        }
    }

    for message in MessageRepository::new(pool).list_all().await? {
        log.restore(message);
        stats.messages += 1;
    }

    Ok(stats)
}
