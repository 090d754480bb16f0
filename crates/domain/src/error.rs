//! Domain error types.

use common::AggregateId;
use outbox::OutboxError;
use thiserror::Error;

use crate::order::{ErrorKind, OrderError};

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A business rule of the order aggregate was violated.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// An error occurred in the outbox store.
    #[error("Outbox error: {0}")]
    Outbox(#[from] OutboxError),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// No order with the given id exists.
    #[error("Order not found: {0}")]
    OrderNotFound(AggregateId),

    /// An order with the given id already exists.
    #[error("Order already exists: {0}")]
    OrderAlreadyExists(AggregateId),

    /// A stored order could not be rebuilt into a valid aggregate.
    #[error("Stored order {order_id} is corrupted: {reason}")]
    CorruptedOrder { order_id: AggregateId, reason: String },

    /// An event lacks the metadata required to store it in the outbox.
    #[error("Event {event_type} is missing outbox metadata")]
    MissingEventMetadata { event_type: &'static str },
}

impl DomainError {
    /// Returns the category of the underlying rule violation.
    ///
    /// Infrastructure failures have no category and return `None`.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            DomainError::Order(err) => Some(err.kind()),
            DomainError::MissingEventMetadata { .. } | DomainError::OrderAlreadyExists(_) => {
                Some(ErrorKind::InvalidOperation)
            }
            DomainError::OrderNotFound(_)
            | DomainError::Outbox(_)
            | DomainError::Database(_)
            | DomainError::Serialization(_)
            | DomainError::CorruptedOrder { .. } => None,
        }
    }

    /// Returns the order error, if this is one.
    pub fn as_order_error(&self) -> Option<&OrderError> {
        match self {
            DomainError::Order(err) => Some(err),
            _ => None,
        }
    }
}
