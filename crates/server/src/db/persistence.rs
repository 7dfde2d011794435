//! Write-behind persistence.
//!
//! Request handlers never wait on the database. They enqueue writes on an
//! unbounded channel drained by one task, which keeps inserts in the order
//! they were enqueued. Failures are logged and dropped.

use sqlx::PgPool;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::models::{Message, UserRecord};

use super::{MessageRepository, UserRepository};

/// A pending database write.
#[derive(Debug)]
enum PersistCommand {
    InsertUser(UserRecord),
    InsertMessage(Message),
}

/// Handle for enqueueing writes. Disabled handles drop everything.
#[derive(Debug, Clone, Default)]
pub struct WriteBehind {
    sender: Option<mpsc::UnboundedSender<PersistCommand>>,
}

impl WriteBehind {
    /// A handle that persists nothing.
    #[must_use]
    pub const fn disabled() -> Self {
        Self { sender: None }
    }

    /// Start the writer task.
    ///
    /// The task finishes once every handle has been dropped and the queue
    /// is drained.
    #[must_use]
    pub fn spawn(pool: PgPool) -> (Self, JoinHandle<()>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run(pool, receiver));
        (
            Self {
                sender: Some(sender),
            },
            handle,
        )
    }

    /// Whether writes go anywhere.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.sender.is_some()
    }

    /// Persist a newly registered user.
    pub fn user(&self, record: &UserRecord) {
        self.enqueue(PersistCommand::InsertUser(record.clone()));
    }

    /// Persist a newly appended message.
    pub fn message(&self, message: &Message) {
        self.enqueue(PersistCommand::InsertMessage(message.clone()));
    }

    fn enqueue(&self, command: PersistCommand) {
        if let Some(sender) = &self.sender
            && sender.send(command).is_err()
        {
            tracing::warn!("Persistence writer has stopped; dropping write");
        }
    }
}

async fn run(pool: PgPool, mut receiver: mpsc::UnboundedReceiver<PersistCommand>) {
    tracing::info!("Persistence writer started");

    while let Some(command) = receiver.recv().await {
        let result = match &command {
            PersistCommand::InsertUser(record) => UserRepository::new(&pool).insert(record).await,
            PersistCommand::InsertMessage(message) => {
                MessageRepository::new(&pool).insert(message).await
            }
        };

        if let Err(e) = result {
            tracing::error!(error = %e, ?command, "Failed to persist write");
        }
    }

    tracing::info!("Persistence writer stopped");
}
