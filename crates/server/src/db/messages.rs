//! Message repository for database operations.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use switchboard_core::{Email, MessageId};

use super::RepositoryError;
use crate::models::Message;

/// Internal row type for `PostgreSQL` message queries.
#[derive(sqlx::FromRow)]
struct MessageRow {
    id: i64,
    sender_email: String,
    receiver_email: String,
    content: String,
    sent_at: DateTime<Utc>,
    read: bool,
    attachment_ref: Option<String>,
}

impl TryFrom<MessageRow> for Message {
    type Error = RepositoryError;

    fn try_from(row: MessageRow) -> Result<Self, Self::Error> {
        let parse = |s: &str| {
            Email::parse(s).map_err(|e| {
                RepositoryError::DataCorruption(format!(
                    "invalid email in message {}: {e}",
                    row.id
                ))
            })
        };

        Ok(Self {
            id: MessageId::new(row.id),
            sender: parse(&row.sender_email)?,
            receiver: parse(&row.receiver_email)?,
            content: row.content,
            sent_at: row.sent_at,
            read: row.read,
            attachment: row.attachment_ref,
        })
    }
}

/// Repository for message database operations.
pub struct MessageRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> MessageRepository<'a> {
    /// Create a new message repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a message. The database assigns its own id; log order is kept
    /// because inserts arrive from a single writer in append order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn insert(&self, message: &Message) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO messages (sender_email, receiver_email, content, sent_at, read, attachment_ref)
            VALUES ($1, $2, $3, $4, $5, $6)
            ",
        )
        .bind(&message.sender)
        .bind(&message.receiver)
        .bind(&message.content)
        .bind(message.sent_at)
        .bind(message.read)
        .bind(message.attachment.as_deref())
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Every stored message in log order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if any row is invalid.
    pub async fn list_all(&self) -> Result<Vec<Message>, RepositoryError> {
        let rows = sqlx::query_as::<_, MessageRow>(
            r"
            SELECT id, sender_email, receiver_email, content, sent_at, read, attachment_ref
            FROM messages
            ORDER BY id
            ",
        )
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Message::try_from).collect()
    }
}
