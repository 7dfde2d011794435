//! User repository for database operations.

use sqlx::PgPool;

use switchboard_core::{AvatarRef, Email};

use super::RepositoryError;
use crate::models::UserRecord;

// =============================================================================
// Internal Row Types
// =============================================================================

/// Internal row type for `PostgreSQL` user queries.
#[derive(sqlx::FromRow)]
struct UserRow {
    email: String,
    password_hash: String,
    display_name: String,
    avatar_ref: String,
}

impl TryFrom<UserRow> for UserRecord {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        let avatar = row.avatar_ref.parse::<AvatarRef>().map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid avatar in database: {e}"))
        })?;

        Ok(Self {
            email,
            password_hash: row.password_hash,
            display_name: row.display_name,
            avatar,
        })
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn insert(&self, record: &UserRecord) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO users (email, password_hash, display_name, avatar_ref)
            VALUES ($1, $2, $3, $4)
            ",
        )
        .bind(&record.email)
        .bind(&record.password_hash)
        .bind(&record.display_name)
        .bind(record.avatar.to_string())
        .execute(self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return RepositoryError::Conflict("email already exists".to_owned());
            }
            RepositoryError::Database(e)
        })?;

        Ok(())
    }

    /// Get a user by email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the row is invalid.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<UserRecord>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            SELECT email, password_hash, display_name, avatar_ref
            FROM users
            WHERE email = $1
            ",
        )
        .bind(email)
        .fetch_optional(self.pool)
        .await?;

        row.map(UserRecord::try_from).transpose()
    }

    /// Every stored user, ordered by email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if any row is invalid.
    pub async fn list_all(&self) -> Result<Vec<UserRecord>, RepositoryError> {
        let rows = sqlx::query_as::<_, UserRow>(
            r"
            SELECT email, password_hash, display_name, avatar_ref
            FROM users
            ORDER BY email
            ",
        )
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(UserRecord::try_from).collect()
    }
}
