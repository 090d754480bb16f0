//! Order commands.

use common::{AggregateId, CustomerId, ProductId};

use super::{Money, OrderError, OrderItem};

/// Command to create a new order.
#[derive(Debug, Clone)]
pub struct CreateOrder {
    /// The order ID to create.
    pub order_id: AggregateId,

    /// The customer placing the order.
    pub customer_id: CustomerId,

    /// The store the order is placed in.
    pub store_id: u32,
}

impl CreateOrder {
    /// Creates a new CreateOrder command.
    pub fn new(order_id: AggregateId, customer_id: CustomerId, store_id: u32) -> Self {
        Self {
            order_id,
            customer_id,
            store_id,
        }
    }

    /// Creates a new CreateOrder command with a generated order ID.
    pub fn for_customer(customer_id: CustomerId, store_id: u32) -> Self {
        Self::new(AggregateId::new(), customer_id, store_id)
    }
}

/// Command to add an item to an order.
#[derive(Debug, Clone)]
pub struct AddItem {
    /// The order to add the item to.
    pub order_id: AggregateId,

    /// The item to add.
    pub item: OrderItem,
}

impl AddItem {
    /// Creates a new AddItem command.
    pub fn new(order_id: AggregateId, item: OrderItem) -> Self {
        Self { order_id, item }
    }

    /// Creates a new AddItem command from individual fields.
    pub fn with_details(
        order_id: AggregateId,
        product_id: ProductId,
        product_name: impl Into<String>,
        unit_price: Money,
        quantity: u32,
    ) -> Result<Self, OrderError> {
        Ok(Self {
            order_id,
            item: OrderItem::new(product_id, product_name, unit_price, quantity)?,
        })
    }
}

/// Command to remove an item from an order.
#[derive(Debug, Clone)]
pub struct RemoveItem {
    /// The order to remove the item from.
    pub order_id: AggregateId,

    /// The product to remove.
    pub product_id: ProductId,
}

impl RemoveItem {
    /// Creates a new RemoveItem command.
    pub fn new(order_id: AggregateId, product_id: ProductId) -> Self {
        Self {
            order_id,
            product_id,
        }
    }
}

/// Command to change the quantity of an item.
#[derive(Debug, Clone)]
pub struct ChangeQuantity {
    /// The order containing the item.
    pub order_id: AggregateId,

    /// The product to update.
    pub product_id: ProductId,

    /// The new quantity.
    pub quantity: u32,
}

impl ChangeQuantity {
    /// Creates a new ChangeQuantity command.
    pub fn new(order_id: AggregateId, product_id: ProductId, quantity: u32) -> Self {
        Self {
            order_id,
            product_id,
            quantity,
        }
    }
}

/// Command to confirm an order.
#[derive(Debug, Clone)]
pub struct ConfirmOrder {
    pub order_id: AggregateId,
}

impl ConfirmOrder {
    pub fn new(order_id: AggregateId) -> Self {
        Self { order_id }
    }
}

/// Command to record payment for an order.
#[derive(Debug, Clone)]
pub struct PayOrder {
    pub order_id: AggregateId,
}

impl PayOrder {
    pub fn new(order_id: AggregateId) -> Self {
        Self { order_id }
    }
}

/// Command to cancel an order.
#[derive(Debug, Clone)]
pub struct CancelOrder {
    pub order_id: AggregateId,
}

impl CancelOrder {
    pub fn new(order_id: AggregateId) -> Self {
        Self { order_id }
    }
}
