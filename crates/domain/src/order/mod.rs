//! Customer order aggregate and related types.

mod aggregate;
mod commands;
mod events;
mod item;
mod service;
mod status;
mod value_objects;

pub use aggregate::CustomerOrder;
pub(crate) use aggregate::CustomerOrderRecord;
pub use commands::*;
pub use events::{OrderConfirmedData, OrderEvent, OrderPaidData};
pub use item::OrderItem;
pub use service::{CommandResult, OrderService};
pub use status::OrderStatus;
pub use value_objects::{Currency, Money};

use rust_decimal::Decimal;
use thiserror::Error;

/// Broad category of an [`OrderError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed input to a constructor or validated parameter.
    InvalidArgument,

    /// Numeric input outside its allowed domain.
    OutOfRange,

    /// Valid input that is illegal in the aggregate's current state.
    InvalidOperation,
}

/// Errors that can occur during order operations.
///
/// Each variant names the exact rule that was violated; [`OrderError::kind`]
/// groups them into the three broad categories.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    /// Order ID is required.
    #[error("Order ID is required")]
    OrderIdRequired,

    /// Customer ID is required.
    #[error("Customer ID is required")]
    CustomerIdRequired,

    /// Product ID is required.
    #[error("Product ID is required")]
    ProductIdRequired,

    /// Product name snapshot is required.
    #[error("Product name is required")]
    ProductNameRequired,

    /// Currency code is blank.
    #[error("Currency code is required")]
    CurrencyCodeRequired,

    /// Currency code is not in the registry.
    #[error("Unknown currency: {code}")]
    UnknownCurrency { code: String },

    /// Store ID must be positive.
    #[error("Invalid store ID: {store_id} (must be greater than 0)")]
    InvalidStoreId { store_id: u32 },

    /// Invalid quantity.
    #[error("Invalid quantity: {quantity} (must be greater than 0)")]
    InvalidQuantity { quantity: u32 },

    /// Money amounts cannot be negative.
    #[error("Amount cannot be negative: {amount}")]
    NegativeAmount { amount: Decimal },

    /// Money cannot be multiplied by a negative factor.
    #[error("Multiplier cannot be negative: {multiplier}")]
    NegativeMultiplier { multiplier: i64 },

    /// The result of an arithmetic operation does not fit a decimal.
    #[error("Amount overflow")]
    AmountOverflow,

    /// Two amounts in different currencies were combined.
    #[error("Currency mismatch: {expected} vs {actual}")]
    CurrencyMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    /// Order is not in the expected status.
    #[error("Invalid state transition: cannot {action} from {current_status} status")]
    InvalidStateTransition {
        current_status: OrderStatus,
        action: &'static str,
    },

    /// Item not found in order.
    #[error("Item not found: {product_id}")]
    ItemNotFound { product_id: common::ProductId },

    /// An item for this product is already in the order.
    #[error("Item already in order: {product_id}")]
    DuplicateItem { product_id: common::ProductId },

    /// Order has no items.
    #[error("Order has no items")]
    NoItems,

    /// Currency or total was read before any item was ever added.
    #[error("Order currency is not set")]
    CurrencyNotSet,
}

impl OrderError {
    /// Returns the broad category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            OrderError::OrderIdRequired
            | OrderError::CustomerIdRequired
            | OrderError::ProductIdRequired
            | OrderError::ProductNameRequired
            | OrderError::CurrencyCodeRequired
            | OrderError::UnknownCurrency { .. } => ErrorKind::InvalidArgument,

            OrderError::InvalidStoreId { .. }
            | OrderError::InvalidQuantity { .. }
            | OrderError::NegativeAmount { .. }
            | OrderError::NegativeMultiplier { .. }
            | OrderError::AmountOverflow => ErrorKind::OutOfRange,

            OrderError::CurrencyMismatch { .. }
            | OrderError::InvalidStateTransition { .. }
            | OrderError::ItemNotFound { .. }
            | OrderError::DuplicateItem { .. }
            | OrderError::NoItems
            | OrderError::CurrencyNotSet => ErrorKind::InvalidOperation,
        }
    }
}
