//! Order persistence contract and an in-memory implementation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::AggregateId;
use outbox::{InMemoryOutboxStore, OutboxMessage, OutboxStore};
use tokio::sync::{Mutex, RwLock};

use crate::error::DomainError;
use crate::order::CustomerOrder;

/// Storage for customer orders and the unit of work around them.
///
/// Order changes and outbox messages are staged with `add_order`,
/// `update_order` and `add_outbox_messages`. They become visible only after
/// `save_changes`, which writes all of them or none of them.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Loads an order by ID, or `None` if it was never saved.
    async fn get_order(&self, id: AggregateId) -> Result<Option<CustomerOrder>, DomainError>;

    /// Stages a new order.
    ///
    /// Fails with `OrderAlreadyExists` if an order with the same id is saved
    /// or staged.
    async fn add_order(&self, order: CustomerOrder) -> Result<(), DomainError>;

    /// Stages the new state of an existing order.
    async fn update_order(&self, order: CustomerOrder) -> Result<(), DomainError>;

    /// Stages outbox messages to be written with the staged orders.
    async fn add_outbox_messages(&self, messages: Vec<OutboxMessage>) -> Result<(), DomainError>;

    /// Commits all staged changes atomically, returning how many orders were
    /// written.
    ///
    /// Staging is cleared whether or not the commit succeeds.
    async fn save_changes(&self) -> Result<usize, DomainError>;

    /// Drops all staged changes without writing them.
    async fn discard_changes(&self) -> Result<(), DomainError>;
}

/// A staged order change.
#[derive(Debug)]
pub(crate) enum Staged {
    Added(CustomerOrder),
    Updated(CustomerOrder),
}

impl Staged {
    fn into_order(self) -> CustomerOrder {
        match self {
            Staged::Added(order) | Staged::Updated(order) => order,
        }
    }
}

/// In-memory order repository.
///
/// Suitable for testing and development. Saved outbox messages land in the
/// wrapped outbox store. Clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOrderRepository<O = InMemoryOutboxStore> {
    orders: Arc<RwLock<HashMap<AggregateId, CustomerOrder>>>,
    staged: Arc<Mutex<Vec<Staged>>>,
    staged_messages: Arc<Mutex<Vec<OutboxMessage>>>,
    outbox: O,
}

impl InMemoryOrderRepository {
    /// Creates a new empty repository with its own in-memory outbox.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<O: OutboxStore> InMemoryOrderRepository<O> {
    /// Creates a new empty repository that saves messages into `outbox`.
    pub fn with_outbox(outbox: O) -> Self {
        Self {
            orders: Arc::default(),
            staged: Arc::default(),
            staged_messages: Arc::default(),
            outbox,
        }
    }

    /// Returns the outbox store saved messages are written to.
    pub fn outbox(&self) -> &O {
        &self.outbox
    }

    /// Returns the number of saved orders.
    pub async fn order_count(&self) -> usize {
        self.orders.read().await.len()
    }

    /// Returns the number of staged order changes and outbox messages.
    pub async fn pending_changes(&self) -> usize {
        self.staged.lock().await.len() + self.staged_messages.lock().await.len()
    }
}

#[async_trait]
impl<O: OutboxStore> OrderRepository for InMemoryOrderRepository<O> {
    async fn get_order(&self, id: AggregateId) -> Result<Option<CustomerOrder>, DomainError> {
        Ok(self.orders.read().await.get(&id).cloned())
    }

    async fn add_order(&self, order: CustomerOrder) -> Result<(), DomainError> {
        let id = order.id();
        let mut staged = self.staged.lock().await;

        let already_staged = staged
            .iter()
            .any(|change| matches!(change, Staged::Added(o) if o.id() == id));
        if already_staged || self.orders.read().await.contains_key(&id) {
            return Err(DomainError::OrderAlreadyExists(id));
        }

        staged.push(Staged::Added(order));
        Ok(())
    }

    async fn update_order(&self, order: CustomerOrder) -> Result<(), DomainError> {
        self.staged.lock().await.push(Staged::Updated(order));
        Ok(())
    }

    async fn add_outbox_messages(&self, messages: Vec<OutboxMessage>) -> Result<(), DomainError> {
        self.staged_messages.lock().await.extend(messages);
        Ok(())
    }

    async fn save_changes(&self) -> Result<usize, DomainError> {
        let staged = std::mem::take(&mut *self.staged.lock().await);
        let messages = std::mem::take(&mut *self.staged_messages.lock().await);
        let mut orders = self.orders.write().await;

        for change in &staged {
            if let Staged::Updated(order) = change {
                let known = orders.contains_key(&order.id())
                    || staged
                        .iter()
                        .any(|c| matches!(c, Staged::Added(o) if o.id() == order.id()));
                if !known {
                    return Err(DomainError::OrderNotFound(order.id()));
                }
            }
        }

        // Orders are published only once every message is in the outbox.
        let appended = self.outbox.add_all(messages).await?;

        let count = staged.len();
        for order in staged.into_iter().map(Staged::into_order) {
            orders.insert(order.id(), order);
        }

        tracing::debug!(count, appended, "Saved order changes");
        Ok(count)
    }

    async fn discard_changes(&self) -> Result<(), DomainError> {
        self.staged.lock().await.clear();
        self.staged_messages.lock().await.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use common::{CustomerId, MessageId};
    use outbox::{OutboxError, OutboxStoreExt};

    fn new_order() -> CustomerOrder {
        CustomerOrder::new(AggregateId::new(), CustomerId::new(), 1).unwrap()
    }

    fn new_message() -> OutboxMessage {
        OutboxMessage::new(MessageId::new(), Utc::now(), "OrderConfirmed", "{}").unwrap()
    }

    #[tokio::test]
    async fn test_add_is_invisible_until_saved() {
        let repo = InMemoryOrderRepository::new();
        let order = new_order();
        let id = order.id();

        repo.add_order(order).await.unwrap();
        assert!(repo.get_order(id).await.unwrap().is_none());
        assert_eq!(repo.pending_changes().await, 1);

        assert_eq!(repo.save_changes().await.unwrap(), 1);
        assert_eq!(repo.get_order(id).await.unwrap().unwrap().id(), id);
        assert_eq!(repo.pending_changes().await, 0);
        assert_eq!(repo.order_count().await, 1);
    }

    #[tokio::test]
    async fn test_add_rejects_existing_id() {
        let repo = InMemoryOrderRepository::new();
        let order = new_order();
        let id = order.id();

        repo.add_order(order.clone()).await.unwrap();
        assert!(matches!(
            repo.add_order(order.clone()).await,
            Err(DomainError::OrderAlreadyExists(existing)) if existing == id
        ));

        repo.save_changes().await.unwrap();
        assert!(matches!(
            repo.add_order(order).await,
            Err(DomainError::OrderAlreadyExists(_))
        ));
    }

    #[tokio::test]
    async fn test_update_replaces_saved_state() {
        let repo = InMemoryOrderRepository::new();
        let mut order = new_order();
        let id = order.id();
        repo.add_order(order.clone()).await.unwrap();
        repo.save_changes().await.unwrap();

        order.cancel().unwrap();
        repo.update_order(order).await.unwrap();
        repo.save_changes().await.unwrap();

        let loaded = repo.get_order(id).await.unwrap().unwrap();
        assert!(loaded.is_terminal());
    }

    #[tokio::test]
    async fn test_update_unknown_order_fails_on_save() {
        let repo = InMemoryOrderRepository::new();
        let order = new_order();
        let id = order.id();

        repo.update_order(order).await.unwrap();
        assert!(matches!(
            repo.save_changes().await,
            Err(DomainError::OrderNotFound(missing)) if missing == id
        ));
        assert_eq!(repo.order_count().await, 0);
        assert_eq!(repo.pending_changes().await, 0);
    }

    #[tokio::test]
    async fn test_messages_are_written_with_orders() {
        let repo = InMemoryOrderRepository::new();
        let order = new_order();
        let message = new_message();

        repo.add_order(order).await.unwrap();
        repo.add_outbox_messages(vec![message.clone()]).await.unwrap();
        assert!(!repo.outbox().has_pending().await.unwrap());
        assert_eq!(repo.pending_changes().await, 2);

        repo.save_changes().await.unwrap();

        assert_eq!(repo.outbox().find(message.id()).await.unwrap(), Some(message));
        assert_eq!(repo.pending_changes().await, 0);
    }

    #[tokio::test]
    async fn test_failed_save_writes_no_messages() {
        let repo = InMemoryOrderRepository::new();
        repo.update_order(new_order()).await.unwrap();
        repo.add_outbox_messages(vec![new_message()]).await.unwrap();

        assert!(repo.save_changes().await.is_err());

        assert_eq!(repo.outbox().message_count().await, 0);
        assert_eq!(repo.order_count().await, 0);
    }

    #[tokio::test]
    async fn test_outbox_failure_writes_no_orders() {
        let outbox = InMemoryOutboxStore::new();
        let existing = new_message();
        outbox.add(existing.clone()).await.unwrap();

        let repo = InMemoryOrderRepository::with_outbox(outbox);
        let order = new_order();
        let id = order.id();
        repo.add_order(order).await.unwrap();
        repo.add_outbox_messages(vec![existing]).await.unwrap();

        let result = repo.save_changes().await;

        assert!(matches!(
            result,
            Err(DomainError::Outbox(OutboxError::DuplicateMessage(_)))
        ));
        assert!(repo.get_order(id).await.unwrap().is_none());
        assert_eq!(repo.outbox().message_count().await, 1);
    }

    #[tokio::test]
    async fn test_discard_changes() {
        let repo = InMemoryOrderRepository::new();
        repo.add_order(new_order()).await.unwrap();
        repo.add_outbox_messages(vec![new_message()]).await.unwrap();
        repo.discard_changes().await.unwrap();

        assert_eq!(repo.save_changes().await.unwrap(), 0);
        assert_eq!(repo.order_count().await, 0);
        assert_eq!(repo.outbox().message_count().await, 0);
    }
}
