//! User management commands.
//!
//! Users created here are picked up by the server on its next start.
//!
//! # Environment Variables
//!
//! - `SWITCHBOARD_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string
//! - `SWITCHBOARD_NEW_USER_PASSWORD` - Password for `user create`
//! - `SWITCHBOARD_ADMIN_EMAIL` - Reserved admin email (default: admin@switchboard.local)

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use switchboard_core::{Email, EmailError};
use switchboard_server::db::{RepositoryError, UserRepository};
use switchboard_server::models::UserRecord;
use switchboard_server::services::auth::hash_password;
use switchboard_server::services::credentials::random_default_avatar;

use super::DatabaseError;

const PASSWORD_VAR: &str = "SWITCHBOARD_NEW_USER_PASSWORD";

/// Errors that can occur during user operations.
#[derive(Debug, Error)]
pub enum UserError {
    #[error(transparent)]
    Connect(#[from] DatabaseError),

    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("{0} is reserved for the admin")]
    Reserved(Email),

    #[error("Missing environment variable: {0}")]
    MissingPassword(&'static str),

    #[error("Display name must not be empty")]
    EmptyName,

    #[error("User already exists with email: {0}")]
    UserExists(Email),

    #[error("Failed to hash password")]
    Hash,

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Create a user with a random built-in avatar.
pub async fn create(email: &str, name: &str) -> Result<(), UserError> {
    dotenvy::dotenv().ok();

    let email = Email::parse(email)?;
    let admin = Email::parse(
        &std::env::var("SWITCHBOARD_ADMIN_EMAIL")
            .unwrap_or_else(|_| "admin@switchboard.local".to_owned()),
    )?;
    if email == admin {
        return Err(UserError::Reserved(email));
    }

    let name = name.trim();
    if name.is_empty() {
        return Err(UserError::EmptyName);
    }

    let password = std::env::var(PASSWORD_VAR)
        .ok()
        .filter(|v| !v.is_empty())
        .map(SecretString::from)
        .ok_or(UserError::MissingPassword(PASSWORD_VAR))?;

    let pool = super::connect().await?;
    let users = UserRepository::new(&pool);

    if users.get_by_email(&email).await?.is_some() {
        return Err(UserError::UserExists(email));
    }

    let password_hash = hash_password(password.expose_secret()).map_err(|_| UserError::Hash)?;
    let record = UserRecord {
        email: email.clone(),
        password_hash,
        display_name: name.to_owned(),
        avatar: random_default_avatar(),
    };

    users.insert(&record).await.map_err(|e| match e {
        RepositoryError::Conflict(_) => UserError::UserExists(email.clone()),
        other => UserError::Repository(other),
    })?;

    tracing::info!(
        "User created successfully! Email: {}, Name: {}, Avatar: {}",
        record.email,
        record.display_name,
        record.avatar
    );
    Ok(())
}

/// Log every stored user.
pub async fn list() -> Result<(), UserError> {
    let pool = super::connect().await?;
    let users = UserRepository::new(&pool).list_all().await?;

    tracing::info!("{} stored user(s)", users.len());
    for user in &users {
        tracing::info!("{} ({})", user.email, user.display_name);
    }
    Ok(())
}
