//! Order status state machine.

use serde::{Deserialize, Serialize};

/// The status of an order in its lifecycle.
///
/// Status transitions:
/// ```text
/// Draft ──► Confirmed ──► Paid
///   │           │
///   └───────────┴──► Cancelled
/// ```
///
/// `Paid` and `Cancelled` are terminal. Cancelling a cancelled order is a
/// no-op; cancelling a paid order is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    /// Order is being assembled, items can be added/removed.
    #[default]
    Draft,

    /// Order contents are fixed, awaiting payment.
    Confirmed,

    /// Payment received (terminal state).
    Paid,

    /// Order was cancelled (terminal state).
    Cancelled,
}

impl OrderStatus {
    /// Returns true if items can be modified in this status.
    pub fn can_modify_items(&self) -> bool {
        matches!(self, OrderStatus::Draft)
    }

    /// Returns true if the order can be confirmed in this status.
    pub fn can_confirm(&self) -> bool {
        matches!(self, OrderStatus::Draft)
    }

    /// Returns true if the order can be paid in this status.
    pub fn can_pay(&self) -> bool {
        matches!(self, OrderStatus::Confirmed)
    }

    /// Returns true if `cancel` is accepted in this status (possibly as a no-op).
    pub fn can_cancel(&self) -> bool {
        !matches!(self, OrderStatus::Paid)
    }

    /// Returns true if this is a terminal status (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Paid | OrderStatus::Cancelled)
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Draft => "Draft",
            OrderStatus::Confirmed => "Confirmed",
            OrderStatus::Paid => "Paid",
            OrderStatus::Cancelled => "Cancelled",
        }
    }

    /// Parses a status from the name returned by [`OrderStatus::as_str`].
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Draft" => Some(OrderStatus::Draft),
            "Confirmed" => Some(OrderStatus::Confirmed),
            "Paid" => Some(OrderStatus::Paid),
            "Cancelled" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
