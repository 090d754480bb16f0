use common::MessageId;
use thiserror::Error;

/// Errors that can occur when interacting with the outbox.
#[derive(Debug, Error)]
pub enum OutboxError {
    /// A message was constructed with missing or blank fields.
    #[error("Invalid outbox message: {0}")]
    InvalidMessage(&'static str),

    /// No message with the given id exists in the store.
    #[error("Outbox message not found: {0}")]
    MessageNotFound(MessageId),

    /// A message with the given id is already stored.
    #[error("Duplicate outbox message: {0}")]
    DuplicateMessage(MessageId),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type for outbox operations.
pub type Result<T> = std::result::Result<T, OutboxError>;
