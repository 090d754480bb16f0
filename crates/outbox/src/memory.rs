use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::MessageId;
use tokio::sync::RwLock;

use crate::{OutboxError, OutboxMessage, Result, store::OutboxStore};

/// In-memory outbox store.
///
/// Messages are kept in insertion order, so `get_unprocessed` returns the
/// oldest messages first. Clones share the same underlying storage.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOutboxStore {
    messages: Arc<RwLock<Vec<OutboxMessage>>>,
}

impl InMemoryOutboxStore {
    /// Creates a new empty in-memory outbox store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of messages stored, processed or not.
    pub async fn message_count(&self) -> usize {
        self.messages.read().await.len()
    }

    /// Returns a copy of every stored message in insertion order.
    pub async fn all(&self) -> Vec<OutboxMessage> {
        self.messages.read().await.clone()
    }

    async fn update<F>(&self, id: MessageId, f: F) -> Result<()>
    where
        F: FnOnce(&mut OutboxMessage) + Send,
    {
        let mut messages = self.messages.write().await;
        let message = messages
            .iter_mut()
            .find(|m| m.id() == id)
            .ok_or(OutboxError::MessageNotFound(id))?;
        f(message);
        Ok(())
    }
}

#[async_trait]
impl OutboxStore for InMemoryOutboxStore {
    async fn add(&self, message: OutboxMessage) -> Result<()> {
        let mut messages = self.messages.write().await;
        if messages.iter().any(|m| m.id() == message.id()) {
            return Err(OutboxError::DuplicateMessage(message.id()));
        }
        messages.push(message);
        Ok(())
    }

    async fn add_all(&self, batch: Vec<OutboxMessage>) -> Result<usize> {
        let mut messages = self.messages.write().await;

        // Check the whole batch before appending anything.
        let mut seen = HashSet::with_capacity(batch.len());
        for message in &batch {
            let id = message.id();
            if !seen.insert(id) || messages.iter().any(|m| m.id() == id) {
                return Err(OutboxError::DuplicateMessage(id));
            }
        }

        let count = batch.len();
        messages.extend(batch);
        Ok(count)
    }

    async fn get_unprocessed(&self, limit: usize) -> Result<Vec<OutboxMessage>> {
        let messages = self.messages.read().await;
        Ok(messages
            .iter()
            .filter(|m| !m.is_processed())
            .take(limit)
            .cloned()
            .collect())
    }

    async fn get_deliverable(
        &self,
        limit: usize,
        max_attempts: u32,
    ) -> Result<Vec<OutboxMessage>> {
        let messages = self.messages.read().await;
        Ok(messages
            .iter()
            .filter(|m| !m.is_processed() && m.attempts() < max_attempts)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn find(&self, id: MessageId) -> Result<Option<OutboxMessage>> {
        let messages = self.messages.read().await;
        Ok(messages.iter().find(|m| m.id() == id).cloned())
    }

    async fn mark_processed(&self, id: MessageId, processed_at: DateTime<Utc>) -> Result<()> {
        self.update(id, |m| m.mark_processed(processed_at)).await
    }

    async fn mark_failed(&self, id: MessageId, error: &str) -> Result<()> {
        let error = error.to_string();
        self.update(id, move |m| m.mark_failed(error)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::OutboxStoreExt;

    fn create_test_message(message_type: &str) -> OutboxMessage {
        OutboxMessage::new(
            MessageId::new(),
            Utc::now(),
            message_type,
            r#"{"test":true}"#,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn add_and_find_message() {
        let store = InMemoryOutboxStore::new();
        let message = create_test_message("TestEvent");
        let id = message.id();

        store.add(message.clone()).await.unwrap();

        let found = store.find(id).await.unwrap();
        assert_eq!(found, Some(message));
        assert_eq!(store.message_count().await, 1);
    }

    #[tokio::test]
    async fn find_unknown_returns_none() {
        let store = InMemoryOutboxStore::new();
        assert!(store.find(MessageId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn equal_content_with_distinct_ids_is_kept() {
        let store = InMemoryOutboxStore::new();
        let occurred_at = Utc::now();
        let first = OutboxMessage::new(MessageId::new(), occurred_at, "TestEvent", "{}").unwrap();
        let second = OutboxMessage::new(MessageId::new(), occurred_at, "TestEvent", "{}").unwrap();

        store.add(first).await.unwrap();
        store.add(second).await.unwrap();

        assert_eq!(store.message_count().await, 2);
    }

    #[tokio::test]
    async fn same_id_is_rejected() {
        let store = InMemoryOutboxStore::new();
        let message = create_test_message("TestEvent");
        let id = message.id();

        store.add(message.clone()).await.unwrap();
        let result = store.add(message).await;

        assert!(matches!(result, Err(OutboxError::DuplicateMessage(dup)) if dup == id));
        assert_eq!(store.message_count().await, 1);
    }

    #[tokio::test]
    async fn add_all_is_all_or_nothing() {
        let store = InMemoryOutboxStore::new();
        let existing = create_test_message("Existing");
        store.add(existing.clone()).await.unwrap();

        let batch = vec![create_test_message("Fresh"), existing];
        let result = store.add_all(batch).await;

        assert!(matches!(result, Err(OutboxError::DuplicateMessage(_))));
        assert_eq!(store.message_count().await, 1);
    }

    #[tokio::test]
    async fn add_all_rejects_repeated_ids_within_a_batch() {
        let store = InMemoryOutboxStore::new();
        let message = create_test_message("TestEvent");

        let result = store.add_all(vec![message.clone(), message]).await;

        assert!(matches!(result, Err(OutboxError::DuplicateMessage(_))));
        assert_eq!(store.message_count().await, 0);
    }

    #[tokio::test]
    async fn get_deliverable_filters_exhausted_before_limit() {
        let store = InMemoryOutboxStore::new();
        let exhausted = create_test_message("Exhausted");
        let healthy = create_test_message("Healthy");
        store
            .add_all(vec![exhausted.clone(), healthy.clone()])
            .await
            .unwrap();
        store.mark_failed(exhausted.id(), "boom").await.unwrap();

        let batch = store.get_deliverable(1, 1).await.unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].id(), healthy.id());

        // Still unprocessed, just not deliverable.
        assert_eq!(store.get_unprocessed(10).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn get_unprocessed_respects_insertion_order_and_limit() {
        let store = InMemoryOutboxStore::new();
        let messages: Vec<_> = (1..=5)
            .map(|i| create_test_message(&format!("Event{i}")))
            .collect();
        store.add_all(messages.clone()).await.unwrap();

        let batch = store.get_unprocessed(3).await.unwrap();
        let types: Vec<_> = batch.iter().map(|m| m.message_type()).collect();
        assert_eq!(types, vec!["Event1", "Event2", "Event3"]);
    }

    #[tokio::test]
    async fn processed_messages_are_not_returned() {
        let store = InMemoryOutboxStore::new();
        let first = create_test_message("Event1");
        let second = create_test_message("Event2");
        store.add(first.clone()).await.unwrap();
        store.add(second.clone()).await.unwrap();

        store.mark_processed_now(first.id()).await.unwrap();

        let pending = store.get_unprocessed(100).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id(), second.id());

        // The processed message is still stored.
        let stored = store.find(first.id()).await.unwrap().unwrap();
        assert!(stored.is_processed());
    }

    #[tokio::test]
    async fn mark_failed_records_attempts() {
        let store = InMemoryOutboxStore::new();
        let message = create_test_message("Event1");
        store.add(message.clone()).await.unwrap();

        store.mark_failed(message.id(), "first").await.unwrap();
        store.mark_failed(message.id(), "second").await.unwrap();

        let stored = store.find(message.id()).await.unwrap().unwrap();
        assert_eq!(stored.attempts(), 2);
        assert_eq!(stored.last_error(), Some("second"));
        assert!(store.has_pending().await.unwrap());
    }

    #[tokio::test]
    async fn marking_unknown_message_fails() {
        let store = InMemoryOutboxStore::new();
        let id = MessageId::new();

        let result = store.mark_processed(id, Utc::now()).await;
        assert!(matches!(result, Err(OutboxError::MessageNotFound(missing)) if missing == id));

        let result = store.mark_failed(id, "boom").await;
        assert!(matches!(result, Err(OutboxError::MessageNotFound(_))));
    }

    #[tokio::test]
    async fn clones_share_storage() {
        let store = InMemoryOutboxStore::new();
        let clone = store.clone();
        clone.add(create_test_message("Event1")).await.unwrap();
        assert_eq!(store.message_count().await, 1);
    }
}
