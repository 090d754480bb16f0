//! Transactional outbox: message storage and delivery relay.
//!
//! Domain events are serialized into [`OutboxMessage`]s and appended to an
//! [`OutboxStore`] alongside the aggregate state that raised them. An
//! [`OutboxRelay`] later reads deliverable messages and hands them to a
//! [`MessagePublisher`], recording each outcome on the message.

pub mod config;
pub mod error;
pub mod memory;
pub mod message;
pub mod postgres;
pub mod relay;
pub mod store;

pub use common::MessageId;
pub use config::RelayConfig;
pub use error::{OutboxError, Result};
pub use memory::InMemoryOutboxStore;
pub use message::OutboxMessage;
pub use postgres::{PostgresOutboxStore, insert_message};
pub use relay::{
    LoggingPublisher, MessagePublisher, OutboxRelay, PublishError, RelayOptions, RelayReport,
};
pub use store::{OutboxStore, OutboxStoreExt};
