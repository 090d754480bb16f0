//! Domain layer for retail orders.
//!
//! This crate provides:
//! - Currency-safe money arithmetic
//! - The customer order aggregate and its status state machine
//! - Domain events buffered on the aggregate
//! - Outbox collection of those events and the order transaction boundary
//! - In-memory and PostgreSQL order repositories that save orders and outbox
//!   messages as one unit of work

pub mod aggregate;
pub mod collector;
pub mod error;
pub mod order;
pub mod postgres;
pub mod repository;

pub use aggregate::{AggregateRoot, DomainEvent};
pub use collector::OutboxCollector;
pub use common::{AggregateId, CustomerId, EventId, MessageId, ProductId};
pub use error::DomainError;
pub use order::{
    AddItem, CancelOrder, ChangeQuantity, CommandResult, ConfirmOrder, CreateOrder, Currency,
    CustomerOrder, ErrorKind, Money, OrderConfirmedData, OrderError, OrderEvent, OrderItem,
    OrderPaidData, OrderService, OrderStatus, PayOrder, RemoveItem,
};
pub use postgres::PostgresOrderRepository;
pub use repository::{InMemoryOrderRepository, OrderRepository};
