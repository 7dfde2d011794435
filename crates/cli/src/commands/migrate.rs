//! Database migration command.
//!
//! Migrations live in `crates/server/migrations/` and are embedded at
//! compile time.
//!
//! # Environment Variables
//!
//! - `SWITCHBOARD_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string

use super::DatabaseError;

/// Errors that can occur while migrating.
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error(transparent)]
    Connect(#[from] DatabaseError),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Apply every pending migration.
pub async fn run() -> Result<(), MigrationError> {
    let pool = super::connect().await?;

    tracing::info!("Running migrations...");
    sqlx::migrate!("../server/migrations").run(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
