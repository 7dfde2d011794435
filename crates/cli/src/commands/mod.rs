//! CLI subcommands.

pub mod migrate;
pub mod user;

use secrecy::SecretString;
use sqlx::PgPool;

/// Errors shared by commands that need the database.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Connect using `SWITCHBOARD_DATABASE_URL`, falling back to `DATABASE_URL`.
pub async fn connect() -> Result<PgPool, DatabaseError> {
    dotenvy::dotenv().ok();

    let url = std::env::var("SWITCHBOARD_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map_err(|_| DatabaseError::MissingEnvVar("SWITCHBOARD_DATABASE_URL"))?;

    tracing::info!("Connecting to database...");
    Ok(switchboard_server::db::create_pool(&SecretString::from(url)).await?)
}
