//! Customer order aggregate implementation.

use chrono::{DateTime, Utc};
use common::{AggregateId, CustomerId, ProductId};
use serde::{Deserialize, Serialize};

use crate::aggregate::AggregateRoot;

use super::{Currency, Money, OrderError, OrderEvent, OrderItem, OrderStatus};

/// Customer order aggregate root.
///
/// Owns its line items and a buffer of pending domain events. The total always
/// equals the sum of the line totals in the order's currency, which is locked
/// by the first item added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "CustomerOrderRecord")]
pub struct CustomerOrder {
    /// Unique order identifier.
    id: AggregateId,

    /// Customer who placed the order.
    customer_id: CustomerId,

    /// Store the order was placed in.
    store_id: u32,

    /// Items in insertion order, unique by product ID.
    items: Vec<OrderItem>,

    /// Locked by the first item added.
    currency: Option<Currency>,

    /// Total amount of the order, set once a currency is locked.
    total: Option<Money>,

    /// Current status of the order.
    status: OrderStatus,

    created_at: DateTime<Utc>,
    confirmed_at: Option<DateTime<Utc>>,
    paid_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,

    /// Events raised since the last drain. Never persisted with the order.
    #[serde(skip)]
    domain_events: Vec<OrderEvent>,
}

/// Persisted shape of an order. The total is recomputed on load.
#[derive(Deserialize)]
pub(crate) struct CustomerOrderRecord {
    pub(crate) id: AggregateId,
    pub(crate) customer_id: CustomerId,
    pub(crate) store_id: u32,
    pub(crate) items: Vec<OrderItem>,
    pub(crate) currency: Option<Currency>,
    pub(crate) status: OrderStatus,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) confirmed_at: Option<DateTime<Utc>>,
    pub(crate) paid_at: Option<DateTime<Utc>>,
    pub(crate) cancelled_at: Option<DateTime<Utc>>,
}

impl TryFrom<CustomerOrderRecord> for CustomerOrder {
    type Error = OrderError;

    fn try_from(record: CustomerOrderRecord) -> Result<Self, Self::Error> {
        let mut order = CustomerOrder::new(record.id, record.customer_id, record.store_id)?;

        let currency = match (record.currency, record.items.first()) {
            (Some(currency), _) => Some(currency),
            (None, Some(_)) => return Err(OrderError::CurrencyNotSet),
            (None, None) => None,
        };

        order.items = record.items;
        order.currency = currency;
        order.status = record.status;
        order.created_at = record.created_at;
        order.confirmed_at = record.confirmed_at;
        order.paid_at = record.paid_at;
        order.cancelled_at = record.cancelled_at;

        if order.currency.is_some() {
            order.recalculate_total()?;
        }

        Ok(order)
    }
}

impl CustomerOrder {
    /// Creates a new, empty draft order.
    pub fn new(
        id: AggregateId,
        customer_id: CustomerId,
        store_id: u32,
    ) -> Result<Self, OrderError> {
        if id.is_nil() {
            return Err(OrderError::OrderIdRequired);
        }
        if customer_id.is_nil() {
            return Err(OrderError::CustomerIdRequired);
        }
        if store_id == 0 {
            return Err(OrderError::InvalidStoreId { store_id });
        }

        Ok(Self {
            id,
            customer_id,
            store_id,
            items: Vec::new(),
            currency: None,
            total: None,
            status: OrderStatus::Draft,
            created_at: Utc::now(),
            confirmed_at: None,
            paid_at: None,
            cancelled_at: None,
            domain_events: Vec::new(),
        })
    }
}

// Query methods
impl CustomerOrder {
    pub fn id(&self) -> AggregateId {
        self.id
    }

    pub fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    pub fn store_id(&self) -> u32 {
        self.store_id
    }

    /// Returns the current status.
    pub fn status(&self) -> OrderStatus {
        self.status
    }

    /// Returns all items in insertion order.
    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    /// Returns an item by product ID.
    pub fn get_item(&self, product_id: ProductId) -> Option<&OrderItem> {
        self.items
            .iter()
            .find(|item| item.product_id() == product_id)
    }

    /// Returns the number of items.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the order has items.
    pub fn has_items(&self) -> bool {
        !self.items.is_empty()
    }

    /// Returns the total quantity of all items.
    pub fn total_quantity(&self) -> u32 {
        self.items.iter().map(OrderItem::quantity).sum()
    }

    /// Returns the order currency.
    ///
    /// Fails with `CurrencyNotSet` until the first item has been added.
    pub fn currency(&self) -> Result<Currency, OrderError> {
        self.currency.ok_or(OrderError::CurrencyNotSet)
    }

    /// Returns the order total.
    ///
    /// Fails with `CurrencyNotSet` until the first item has been added.
    pub fn total(&self) -> Result<Money, OrderError> {
        self.total.ok_or(OrderError::CurrencyNotSet)
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn confirmed_at(&self) -> Option<DateTime<Utc>> {
        self.confirmed_at
    }

    pub fn paid_at(&self) -> Option<DateTime<Utc>> {
        self.paid_at
    }

    pub fn cancelled_at(&self) -> Option<DateTime<Utc>> {
        self.cancelled_at
    }

    /// Returns true if the order is in a terminal status.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Returns the events raised since the buffer was last drained.
    pub fn domain_events(&self) -> &[OrderEvent] {
        &self.domain_events
    }

    /// Discards all buffered events.
    pub fn clear_domain_events(&mut self) {
        self.domain_events.clear();
    }

    /// Removes and returns all buffered events, oldest first.
    pub fn take_domain_events(&mut self) -> Vec<OrderEvent> {
        std::mem::take(&mut self.domain_events)
    }
}

// Command methods
impl CustomerOrder {
    /// Adds an item to the order.
    ///
    /// The first item locks the order currency. Later items must use the same
    /// currency and a product not already in the order.
    pub fn add_item(&mut self, item: OrderItem) -> Result<(), OrderError> {
        self.ensure_can_modify_items("add item")?;

        let currency = match self.currency {
            Some(locked) if self.has_items() => {
                if item.currency() != locked {
                    return Err(OrderError::CurrencyMismatch {
                        expected: locked.code(),
                        actual: item.currency().code(),
                    });
                }
                locked
            }
            _ => item.currency(),
        };

        if self.get_item(item.product_id()).is_some() {
            return Err(OrderError::DuplicateItem {
                product_id: item.product_id(),
            });
        }

        let total = Self::total_of(currency, self.items.iter().chain(Some(&item)))?;

        tracing::debug!(
            order_id = %self.id,
            product_id = %item.product_id(),
            quantity = item.quantity(),
            "Item added"
        );

        self.currency = Some(currency);
        self.items.push(item);
        self.total = Some(total);
        Ok(())
    }

    /// Removes an item from the order.
    pub fn remove_item(&mut self, product_id: ProductId) -> Result<(), OrderError> {
        self.ensure_can_modify_items("remove item")?;

        if product_id.is_nil() {
            return Err(OrderError::ProductIdRequired);
        }

        let position = self.position_of(product_id)?;
        let currency = self.currency()?;
        let total = Self::total_of(
            currency,
            self.items
                .iter()
                .enumerate()
                .filter(|(index, _)| *index != position)
                .map(|(_, item)| item),
        )?;

        tracing::debug!(order_id = %self.id, %product_id, "Item removed");

        self.items.remove(position);
        self.total = Some(total);
        Ok(())
    }

    /// Replaces an item with a copy at a new quantity.
    pub fn change_quantity(
        &mut self,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<(), OrderError> {
        self.ensure_can_modify_items("change quantity")?;

        if product_id.is_nil() {
            return Err(OrderError::ProductIdRequired);
        }
        if quantity == 0 {
            return Err(OrderError::InvalidQuantity { quantity });
        }

        let position = self.position_of(product_id)?;
        let replacement = self.items[position].with_quantity(quantity)?;
        let currency = self.currency()?;
        let total = Self::total_of(
            currency,
            self.items
                .iter()
                .enumerate()
                .map(|(index, item)| if index == position { &replacement } else { item }),
        )?;

        tracing::debug!(order_id = %self.id, %product_id, quantity, "Item quantity changed");

        self.items[position] = replacement;
        self.total = Some(total);
        Ok(())
    }

    /// Confirms the order, fixing its contents and raising `OrderConfirmed`.
    pub fn confirm(&mut self) -> Result<(), OrderError> {
        if !self.status.can_confirm() {
            return Err(OrderError::InvalidStateTransition {
                current_status: self.status,
                action: "confirm",
            });
        }

        if !self.has_items() {
            return Err(OrderError::NoItems);
        }

        let total = self.total()?;

        self.status = OrderStatus::Confirmed;
        self.confirmed_at = Some(Utc::now());
        self.domain_events
            .push(OrderEvent::order_confirmed(self.id, self.customer_id, total));

        tracing::debug!(order_id = %self.id, %total, "Order confirmed");
        Ok(())
    }

    /// Records payment for a confirmed order, raising `OrderPaid`.
    pub fn pay(&mut self) -> Result<(), OrderError> {
        if !self.status.can_pay() {
            return Err(OrderError::InvalidStateTransition {
                current_status: self.status,
                action: "pay",
            });
        }

        let total = self.total()?;

        self.status = OrderStatus::Paid;
        self.paid_at = Some(Utc::now());
        self.domain_events
            .push(OrderEvent::order_paid(self.id, self.customer_id, total));

        tracing::debug!(order_id = %self.id, %total, "Order paid");
        Ok(())
    }

    /// Cancels the order.
    ///
    /// Cancelling an already cancelled order does nothing. Paid orders cannot
    /// be cancelled.
    pub fn cancel(&mut self) -> Result<(), OrderError> {
        if !self.status.can_cancel() {
            return Err(OrderError::InvalidStateTransition {
                current_status: self.status,
                action: "cancel",
            });
        }

        if self.status == OrderStatus::Cancelled {
            return Ok(());
        }

        self.status = OrderStatus::Cancelled;
        self.cancelled_at = Some(Utc::now());

        tracing::debug!(order_id = %self.id, "Order cancelled");
        Ok(())
    }
}

// Internal helpers
impl CustomerOrder {
    fn ensure_can_modify_items(&self, action: &'static str) -> Result<(), OrderError> {
        if self.status.can_modify_items() {
            Ok(())
        } else {
            Err(OrderError::InvalidStateTransition {
                current_status: self.status,
                action,
            })
        }
    }

    fn position_of(&self, product_id: ProductId) -> Result<usize, OrderError> {
        self.items
            .iter()
            .position(|item| item.product_id() == product_id)
            .ok_or(OrderError::ItemNotFound { product_id })
    }

    /// Sums line totals starting from zero in `currency`.
    ///
    /// `Money::add` re-checks every line against the order currency.
    fn total_of<'a>(
        currency: Currency,
        items: impl IntoIterator<Item = &'a OrderItem>,
    ) -> Result<Money, OrderError> {
        items
            .into_iter()
            .try_fold(Money::zero(currency), |sum, item| sum.add(item.line_total()))
    }

    /// Recomputes the total from the current items in the locked currency.
    fn recalculate_total(&mut self) -> Result<(), OrderError> {
        let currency = self.currency()?;
        self.total = Some(Self::total_of(currency, &self.items)?);
        Ok(())
    }
}

impl AggregateRoot for CustomerOrder {
    type Event = OrderEvent;

    fn aggregate_type() -> &'static str {
        "CustomerOrder"
    }

    fn id(&self) -> AggregateId {
        self.id
    }

    fn domain_events(&self) -> &[OrderEvent] {
        CustomerOrder::domain_events(self)
    }

    fn clear_domain_events(&mut self) {
        CustomerOrder::clear_domain_events(self);
    }

    fn take_domain_events(&mut self) -> Vec<OrderEvent> {
        CustomerOrder::take_domain_events(self)
    }
}
