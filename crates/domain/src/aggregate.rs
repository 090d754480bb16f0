//! Core aggregate and domain event traits.

use chrono::{DateTime, Utc};
use common::{AggregateId, EventId};
use serde::{Serialize, de::DeserializeOwned};

/// Trait for domain events.
///
/// Domain events represent facts that have happened in the domain.
/// They are immutable and should be named in past tense. Every event carries
/// the metadata the outbox needs to store it.
pub trait DomainEvent: Serialize + DeserializeOwned + Send + Sync + Clone {
    /// Returns the fully-qualified event type name.
    ///
    /// Stored alongside the serialized payload so consumers can route it.
    fn event_type(&self) -> &'static str;

    /// Returns the unique identifier of this event occurrence.
    fn event_id(&self) -> EventId;

    /// Returns when the event happened.
    fn occurred_at(&self) -> DateTime<Utc>;
}

/// Trait for aggregate roots that buffer domain events.
///
/// State transitions append events to an owned buffer instead of publishing
/// them. The transaction boundary drains the buffer after persisting the
/// aggregate and hands the events to the outbox.
pub trait AggregateRoot: Send + Sync {
    /// The type of events this aggregate raises.
    type Event: DomainEvent;

    /// Returns the aggregate type name.
    fn aggregate_type() -> &'static str;

    /// Returns the aggregate's unique identifier.
    fn id(&self) -> AggregateId;

    /// Returns the events raised since the buffer was last drained.
    fn domain_events(&self) -> &[Self::Event];

    /// Discards all buffered events.
    fn clear_domain_events(&mut self);

    /// Removes and returns all buffered events, oldest first.
    fn take_domain_events(&mut self) -> Vec<Self::Event>;

    /// Returns true if there are events waiting to be drained.
    fn has_domain_events(&self) -> bool {
        !self.domain_events().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    enum TestEvent {
        Happened {
            event_id: EventId,
            occurred_at: DateTime<Utc>,
        },
    }

    impl DomainEvent for TestEvent {
        fn event_type(&self) -> &'static str {
            "TestHappened"
        }

        fn event_id(&self) -> EventId {
            match self {
                TestEvent::Happened { event_id, .. } => *event_id,
            }
        }

        fn occurred_at(&self) -> DateTime<Utc> {
            match self {
                TestEvent::Happened { occurred_at, .. } => *occurred_at,
            }
        }
    }

    #[derive(Debug, Default)]
    struct TestAggregate {
        id: AggregateId,
        events: Vec<TestEvent>,
    }

    impl TestAggregate {
        fn touch(&mut self) {
            self.events.push(TestEvent::Happened {
                event_id: EventId::new(),
                occurred_at: Utc::now(),
            });
        }
    }

    impl AggregateRoot for TestAggregate {
        type Event = TestEvent;

        fn aggregate_type() -> &'static str {
            "Test"
        }

        fn id(&self) -> AggregateId {
            self.id
        }

        fn domain_events(&self) -> &[TestEvent] {
            &self.events
        }

        fn clear_domain_events(&mut self) {
            self.events.clear();
        }

        fn take_domain_events(&mut self) -> Vec<TestEvent> {
            std::mem::take(&mut self.events)
        }
    }

    #[test]
    fn test_take_drains_in_order() {
        let mut aggregate = TestAggregate::default();
        assert!(!aggregate.has_domain_events());

        aggregate.touch();
        aggregate.touch();
        let first = aggregate.domain_events()[0].event_id();

        let drained = aggregate.take_domain_events();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].event_id(), first);
        assert!(!aggregate.has_domain_events());
    }

    #[test]
    fn test_clear_discards_events() {
        let mut aggregate = TestAggregate::default();
        aggregate.touch();
        aggregate.clear_domain_events();
        assert!(aggregate.domain_events().is_empty());
        assert_eq!(TestAggregate::aggregate_type(), "Test");
    }
}
