use common::ProductId;
use serde::{Deserialize, Serialize};

use super::{Currency, Money, OrderError};

/// An immutable line in an order: a product snapshot at a fixed price.
///
/// Changing the quantity produces a new item via [`OrderItem::with_quantity`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "OrderItemRecord")]
pub struct OrderItem {
    product_id: ProductId,
    name_snapshot: String,
    unit_price: Money,
    quantity: u32,

    /// Derived from `unit_price * quantity` on construction.
    #[serde(skip_serializing)]
    line_total: Money,
}

#[derive(Deserialize)]
struct OrderItemRecord {
    product_id: ProductId,
    name_snapshot: String,
    unit_price: Money,
    quantity: u32,
}

impl TryFrom<OrderItemRecord> for OrderItem {
    type Error = OrderError;

    fn try_from(record: OrderItemRecord) -> Result<Self, Self::Error> {
        OrderItem::new(
            record.product_id,
            record.name_snapshot,
            record.unit_price,
            record.quantity,
        )
    }
}

impl OrderItem {
    /// Creates a new order item.
    pub fn new(
        product_id: ProductId,
        name_snapshot: impl Into<String>,
        unit_price: Money,
        quantity: u32,
    ) -> Result<Self, OrderError> {
        let name_snapshot = name_snapshot.into();

        if product_id.is_nil() {
            return Err(OrderError::ProductIdRequired);
        }
        if name_snapshot.trim().is_empty() {
            return Err(OrderError::ProductNameRequired);
        }
        if quantity == 0 {
            return Err(OrderError::InvalidQuantity { quantity });
        }

        let line_total = unit_price.multiply(i64::from(quantity))?;

        Ok(Self {
            product_id,
            name_snapshot,
            unit_price,
            quantity,
            line_total,
        })
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    /// Product name at the time the item was added.
    pub fn name_snapshot(&self) -> &str {
        &self.name_snapshot
    }

    /// Unit price at the time the item was added.
    pub fn unit_price(&self) -> Money {
        self.unit_price
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn currency(&self) -> Currency {
        self.unit_price.currency()
    }

    /// Returns `unit_price * quantity`.
    pub fn line_total(&self) -> Money {
        self.line_total
    }

    /// Returns a copy of this item with a different quantity.
    pub fn with_quantity(&self, quantity: u32) -> Result<Self, OrderError> {
        OrderItem::new(
            self.product_id,
            self.name_snapshot.clone(),
            self.unit_price,
            quantity,
        )
    }
}
