use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::MessageId;

use crate::{OutboxMessage, Result};

/// Core trait for outbox storage.
///
/// A store exclusively owns the messages added to it and keys them by id:
/// adding a second message with an id already present fails with
/// `DuplicateMessage`, while messages with equal content but distinct ids are
/// all kept. Implementations backed by durable storage must make `add` and
/// `add_all` atomic and let `get_unprocessed` run concurrently with appends.
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait OutboxStore: Send + Sync {
    /// Appends a message.
    async fn add(&self, message: OutboxMessage) -> Result<()>;

    /// Appends several messages in order, returning how many were added.
    ///
    /// The default implementation adds them one at a time. Stores that can
    /// write the whole batch atomically should override it so that either
    /// every message lands or none does.
    async fn add_all(&self, messages: Vec<OutboxMessage>) -> Result<usize> {
        let count = messages.len();
        for message in messages {
            self.add(message).await?;
        }
        Ok(count)
    }

    /// Returns up to `limit` messages that have not been processed yet, in
    /// store order.
    async fn get_unprocessed(&self, limit: usize) -> Result<Vec<OutboxMessage>>;

    /// Returns up to `limit` unprocessed messages with fewer than
    /// `max_attempts` failed deliveries, in store order.
    ///
    /// Exhausted messages are filtered before the limit is applied, so they
    /// never crowd healthy messages out of a batch.
    async fn get_deliverable(
        &self,
        limit: usize,
        max_attempts: u32,
    ) -> Result<Vec<OutboxMessage>>;

    /// Returns the message with the given id, if any.
    async fn find(&self, id: MessageId) -> Result<Option<OutboxMessage>>;

    /// Records a successful delivery of the message.
    ///
    /// Fails with `MessageNotFound` if no such message exists.
    async fn mark_processed(&self, id: MessageId, processed_at: DateTime<Utc>) -> Result<()>;

    /// Records a failed delivery attempt, incrementing the attempt count.
    ///
    /// Fails with `MessageNotFound` if no such message exists.
    async fn mark_failed(&self, id: MessageId, error: &str) -> Result<()>;
}

/// Extension trait providing convenience methods for outbox stores.
#[async_trait]
pub trait OutboxStoreExt: OutboxStore {
    /// Returns true if at least one message is waiting for delivery.
    async fn has_pending(&self) -> Result<bool> {
        Ok(!self.get_unprocessed(1).await?.is_empty())
    }

    /// Marks the message processed as of now.
    async fn mark_processed_now(&self, id: MessageId) -> Result<()> {
        self.mark_processed(id, Utc::now()).await
    }
}

// Blanket implementation for all OutboxStore implementations
impl<T: OutboxStore + ?Sized> OutboxStoreExt for T {}
