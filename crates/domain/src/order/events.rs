//! Order domain events.

use chrono::{DateTime, Utc};
use common::{AggregateId, CustomerId, EventId};
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;

use super::Money;

/// Events raised by the customer order aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OrderEvent {
    /// Order was confirmed and its contents fixed.
    OrderConfirmed(OrderConfirmedData),

    /// Order was paid.
    OrderPaid(OrderPaidData),
}

impl DomainEvent for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderConfirmed(_) => concat!(module_path!(), "::OrderConfirmed"),
            OrderEvent::OrderPaid(_) => concat!(module_path!(), "::OrderPaid"),
        }
    }

    fn event_id(&self) -> EventId {
        match self {
            OrderEvent::OrderConfirmed(data) => data.event_id,
            OrderEvent::OrderPaid(data) => data.event_id,
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            OrderEvent::OrderConfirmed(data) => data.occurred_at,
            OrderEvent::OrderPaid(data) => data.occurred_at,
        }
    }
}

/// Data for OrderConfirmed event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderConfirmedData {
    pub event_id: EventId,

    /// When the order was confirmed.
    pub occurred_at: DateTime<Utc>,

    pub order_id: AggregateId,

    pub customer_id: CustomerId,

    /// Order total at confirmation time.
    pub total: Money,
}

/// Data for OrderPaid event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPaidData {
    pub event_id: EventId,

    /// When the payment was recorded.
    pub occurred_at: DateTime<Utc>,

    pub order_id: AggregateId,

    pub customer_id: CustomerId,

    /// Amount paid.
    pub total: Money,
}

// Convenience constructors for events
impl OrderEvent {
    /// Creates an OrderConfirmed event.
    pub fn order_confirmed(order_id: AggregateId, customer_id: CustomerId, total: Money) -> Self {
        OrderEvent::OrderConfirmed(OrderConfirmedData {
            event_id: EventId::new(),
            occurred_at: Utc::now(),
            order_id,
            customer_id,
            total,
        })
    }

    /// Creates an OrderPaid event.
    pub fn order_paid(order_id: AggregateId, customer_id: CustomerId, total: Money) -> Self {
        OrderEvent::OrderPaid(OrderPaidData {
            event_id: EventId::new(),
            occurred_at: Utc::now(),
            order_id,
            customer_id,
            total,
        })
    }

    pub fn order_id(&self) -> AggregateId {
        match self {
            OrderEvent::OrderConfirmed(data) => data.order_id,
            OrderEvent::OrderPaid(data) => data.order_id,
        }
    }

    pub fn customer_id(&self) -> CustomerId {
        match self {
            OrderEvent::OrderConfirmed(data) => data.customer_id,
            OrderEvent::OrderPaid(data) => data.customer_id,
        }
    }

    pub fn total(&self) -> Money {
        match self {
            OrderEvent::OrderConfirmed(data) => data.total,
            OrderEvent::OrderPaid(data) => data.total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::Currency;
    use rust_decimal_macros::dec;

    fn total() -> Money {
        Money::new(dec!(20.00), Currency::USD).unwrap()
    }

    #[test]
    fn test_event_type_is_fully_qualified() {
        let event = OrderEvent::order_confirmed(AggregateId::new(), CustomerId::new(), total());
        assert_eq!(event.event_type(), "domain::order::events::OrderConfirmed");

        let event = OrderEvent::order_paid(AggregateId::new(), CustomerId::new(), total());
        assert_eq!(event.event_type(), "domain::order::events::OrderPaid");
    }

    #[test]
    fn test_each_event_gets_fresh_metadata() {
        let order_id = AggregateId::new();
        let customer_id = CustomerId::new();
        let a = OrderEvent::order_confirmed(order_id, customer_id, total());
        let b = OrderEvent::order_confirmed(order_id, customer_id, total());

        assert_ne!(a.event_id(), b.event_id());
        assert!(!a.event_id().is_nil());
    }

    #[test]
    fn test_accessors() {
        let order_id = AggregateId::new();
        let customer_id = CustomerId::new();
        let event = OrderEvent::order_paid(order_id, customer_id, total());

        assert_eq!(event.order_id(), order_id);
        assert_eq!(event.customer_id(), customer_id);
        assert_eq!(event.total(), total());
    }

    #[test]
    fn test_event_serialization() {
        let event = OrderEvent::order_confirmed(AggregateId::new(), CustomerId::new(), total());

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"OrderConfirmed\""));
        assert!(json.contains("\"amount\":\"20.00\""));

        let deserialized: OrderEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, event);
    }
}
