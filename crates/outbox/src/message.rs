use chrono::{DateTime, Utc};
use common::MessageId;

use crate::{OutboxError, Result};

/// A serialized domain event staged for delivery.
///
/// Messages are appended to an [`OutboxStore`](crate::OutboxStore) in the same
/// logical transaction as the aggregate state that raised them. After that the
/// only mutations are [`mark_processed`](Self::mark_processed) and
/// [`mark_failed`](Self::mark_failed), recorded by the delivery side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboxMessage {
    id: MessageId,
    occurred_at: DateTime<Utc>,
    message_type: String,
    payload: String,
    processed_at: Option<DateTime<Utc>>,
    attempts: u32,
    last_error: Option<String>,
}

impl OutboxMessage {
    /// Creates a new, unprocessed message.
    ///
    /// Fails with [`OutboxError::InvalidMessage`] if the id is nil or the type
    /// or payload is blank.
    pub fn new(
        id: MessageId,
        occurred_at: DateTime<Utc>,
        message_type: impl Into<String>,
        payload: impl Into<String>,
    ) -> Result<Self> {
        let message_type = message_type.into();
        let payload = payload.into();

        if id.is_nil() {
            return Err(OutboxError::InvalidMessage("id is required"));
        }
        if message_type.trim().is_empty() {
            return Err(OutboxError::InvalidMessage("type is required"));
        }
        if payload.trim().is_empty() {
            return Err(OutboxError::InvalidMessage("payload is required"));
        }

        Ok(Self {
            id,
            occurred_at,
            message_type,
            payload,
            processed_at: None,
            attempts: 0,
            last_error: None,
        })
    }

    /// Rebuilds a message from its persisted columns, delivery bookkeeping
    /// included.
    pub(crate) fn restore(
        id: MessageId,
        occurred_at: DateTime<Utc>,
        message_type: String,
        payload: String,
        processed_at: Option<DateTime<Utc>>,
        attempts: u32,
        last_error: Option<String>,
    ) -> Self {
        Self {
            id,
            occurred_at,
            message_type,
            payload,
            processed_at,
            attempts,
            last_error,
        }
    }

    pub fn id(&self) -> MessageId {
        self.id
    }

    /// When the source event occurred.
    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    /// Fully-qualified type name of the source event.
    pub fn message_type(&self) -> &str {
        &self.message_type
    }

    /// The serialized event (JSON).
    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn processed_at(&self) -> Option<DateTime<Utc>> {
        self.processed_at
    }

    /// Number of failed delivery attempts so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn is_processed(&self) -> bool {
        self.processed_at.is_some()
    }

    /// Records a successful delivery.
    pub fn mark_processed(&mut self, processed_at: DateTime<Utc>) {
        self.processed_at = Some(processed_at);
    }

    /// Records a failed delivery attempt.
    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.attempts = self.attempts.saturating_add(1);
        self.last_error = Some(error.into());
    }
}
