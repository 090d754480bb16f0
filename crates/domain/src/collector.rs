//! Conversion of domain events into outbox messages.

use common::MessageId;
use outbox::{OutboxMessage, OutboxStore};

use crate::aggregate::DomainEvent;
use crate::error::DomainError;

/// Serializes domain events into [`OutboxMessage`]s and appends them to a store.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutboxCollector;

impl OutboxCollector {
    /// Creates a new collector.
    pub fn new() -> Self {
        Self
    }

    /// Builds the outbox message for a single event.
    ///
    /// The message gets a fresh id and keeps the event's `occurred_at`. The
    /// payload is the event's JSON form, tagged with its fully-qualified type.
    pub fn to_message<E: DomainEvent>(&self, event: &E) -> Result<OutboxMessage, DomainError> {
        let event_type = event.event_type();
        if event.event_id().is_nil() {
            return Err(DomainError::MissingEventMetadata { event_type });
        }

        let payload = serde_json::to_string(event)?;
        let message = OutboxMessage::new(MessageId::new(), event.occurred_at(), event_type, payload)?;
        Ok(message)
    }

    /// Builds one message per event, in the order given.
    ///
    /// Fails on the first event that cannot be converted.
    pub fn to_messages<E: DomainEvent>(
        &self,
        events: &[E],
    ) -> Result<Vec<OutboxMessage>, DomainError> {
        events.iter().map(|event| self.to_message(event)).collect()
    }

    /// Appends one message per event to `store`, in the order given.
    ///
    /// Every event is converted before anything is appended, so a bad event
    /// leaves the store untouched. Returns the ids of the appended messages.
    #[tracing::instrument(skip(self, events, store), fields(count = events.len()))]
    pub async fn collect<E, S>(&self, events: &[E], store: &S) -> Result<Vec<MessageId>, DomainError>
    where
        E: DomainEvent,
        S: OutboxStore + ?Sized,
    {
        let messages = self.to_messages(events)?;
        let ids: Vec<MessageId> = messages.iter().map(OutboxMessage::id).collect();

        let appended = store.add_all(messages).await?;
        metrics::counter!("outbox_messages_appended").increment(appended as u64);

        tracing::debug!(appended, "Collected domain events into outbox");
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::{Currency, Money, OrderEvent};
    use chrono::{DateTime, Utc};
    use common::{AggregateId, CustomerId, EventId};
    use outbox::{InMemoryOutboxStore, OutboxStoreExt};
    use rust_decimal_macros::dec;
    use serde::{Deserialize, Serialize};
    use uuid::Uuid;

    fn total() -> Money {
        Money::new(dec!(20.00), Currency::USD).unwrap()
    }

    fn confirmed() -> OrderEvent {
        OrderEvent::order_confirmed(AggregateId::new(), CustomerId::new(), total())
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct AnonymousEvent;

    impl DomainEvent for AnonymousEvent {
        fn event_type(&self) -> &'static str {
            "AnonymousEvent"
        }

        fn event_id(&self) -> EventId {
            EventId::from_uuid(Uuid::nil())
        }

        fn occurred_at(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }

    #[test]
    fn test_to_message_copies_metadata() {
        let event = confirmed();
        let message = OutboxCollector::new().to_message(&event).unwrap();

        assert_eq!(message.occurred_at(), event.occurred_at());
        assert_eq!(message.message_type(), event.event_type());
        assert_eq!(message.attempts(), 0);
        assert!(!message.is_processed());

        let decoded: OrderEvent = serde_json::from_str(message.payload()).unwrap();
        assert_eq!(decoded, event);
    }

    #[test]
    fn test_to_message_rejects_missing_metadata() {
        let err = OutboxCollector::new().to_message(&AnonymousEvent).unwrap_err();
        assert!(matches!(
            err,
            DomainError::MissingEventMetadata {
                event_type: "AnonymousEvent"
            }
        ));
    }

    #[test]
    fn test_to_messages_gives_each_event_its_own_id() {
        let order_id = AggregateId::new();
        let customer_id = CustomerId::new();
        let events = vec![
            OrderEvent::order_confirmed(order_id, customer_id, total()),
            OrderEvent::order_paid(order_id, customer_id, total()),
        ];

        let messages = OutboxCollector::new().to_messages(&events).unwrap();

        assert_eq!(messages.len(), 2);
        assert_ne!(messages[0].id(), messages[1].id());
        assert_eq!(messages[0].message_type(), events[0].event_type());
        assert_eq!(messages[1].message_type(), events[1].event_type());
    }

    #[tokio::test]
    async fn test_collect_preserves_order() {
        let store = InMemoryOutboxStore::new();
        let order_id = AggregateId::new();
        let customer_id = CustomerId::new();
        let events = vec![
            OrderEvent::order_confirmed(order_id, customer_id, total()),
            OrderEvent::order_paid(order_id, customer_id, total()),
        ];

        let ids = OutboxCollector::new()
            .collect(&events, &store)
            .await
            .unwrap();

        let pending = store.get_unprocessed(10).await.unwrap();
        assert_eq!(pending.iter().map(|m| m.id()).collect::<Vec<_>>(), ids);
        for (message, event) in pending.iter().zip(&events) {
            let decoded: OrderEvent = serde_json::from_str(message.payload()).unwrap();
            assert_eq!(&decoded, event);
        }
    }

    #[tokio::test]
    async fn test_collect_nothing() {
        let store = InMemoryOutboxStore::new();
        let ids = OutboxCollector::new()
            .collect::<OrderEvent, _>(&[], &store)
            .await
            .unwrap();

        assert!(ids.is_empty());
        assert!(!store.has_pending().await.unwrap());
    }

    #[tokio::test]
    async fn test_collect_failure_appends_nothing() {
        let store = InMemoryOutboxStore::new();
        let events = vec![AnonymousEvent, AnonymousEvent];

        let result = OutboxCollector::new().collect(&events, &store).await;

        assert!(result.is_err());
        assert!(!store.has_pending().await.unwrap());
    }
}
