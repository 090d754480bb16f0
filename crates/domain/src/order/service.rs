//! Order service: the transaction boundary around the order aggregate.

use common::{AggregateId, MessageId};
use outbox::OutboxMessage;

use crate::collector::OutboxCollector;
use crate::error::DomainError;
use crate::repository::OrderRepository;

use super::{
    AddItem, CancelOrder, ChangeQuantity, ConfirmOrder, CreateOrder, CustomerOrder, OrderError,
    OrderEvent, PayOrder, RemoveItem,
};

/// Result of executing a command.
#[derive(Debug, Clone)]
pub struct CommandResult {
    /// The order state after the command.
    pub order: CustomerOrder,

    /// The events raised by the command.
    pub events: Vec<OrderEvent>,

    /// Outbox messages written for those events, in the same order.
    pub message_ids: Vec<MessageId>,
}

/// Service for managing orders.
///
/// Each operation loads the order, runs one aggregate method and drains the
/// raised events. The drained order and one outbox message per event are then
/// staged on the repository and saved as a single unit of work. A failed rule
/// check or a failed save leaves both orders and outbox untouched.
pub struct OrderService<R: OrderRepository> {
    repository: R,
    collector: OutboxCollector,
}

impl<R: OrderRepository> OrderService<R> {
    /// Creates a new order service.
    pub fn new(repository: R) -> Self {
        Self {
            repository,
            collector: OutboxCollector::new(),
        }
    }

    /// Returns a reference to the order repository.
    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Creates a new draft order.
    #[tracing::instrument(skip(self))]
    pub async fn create_order(&self, cmd: CreateOrder) -> Result<CommandResult, DomainError> {
        let mut order = CustomerOrder::new(cmd.order_id, cmd.customer_id, cmd.store_id)?;
        let events = order.take_domain_events();

        self.repository.add_order(order.clone()).await?;
        self.commit(order, events).await
    }
    /// Adds an item to an order.
    #[tracing::instrument(skip(self))]
    pub async fn add_item(&self, cmd: AddItem) -> Result<CommandResult, DomainError> {
        let AddItem { order_id, item } = cmd;
        self.execute(order_id, |order| order.add_item(item)).await
    }

    /// Removes an item from an order.
    #[tracing::instrument(skip(self))]
    pub async fn remove_item(&self, cmd: RemoveItem) -> Result<CommandResult, DomainError> {
        self.execute(cmd.order_id, |order| order.remove_item(cmd.product_id))
            .await
    }

    /// Changes the quantity of an item in an order.
    #[tracing::instrument(skip(self))]
    pub async fn change_quantity(
        &self,
        cmd: ChangeQuantity,
    ) -> Result<CommandResult, DomainError> {
        self.execute(cmd.order_id, |order| {
            order.change_quantity(cmd.product_id, cmd.quantity)
        })
        .await
    }

    /// Confirms an order.
    #[tracing::instrument(skip(self))]
    pub async fn confirm_order(&self, cmd: ConfirmOrder) -> Result<CommandResult, DomainError> {
        let result = self
            .execute(cmd.order_id, |order| order.confirm())
            .await?;
        metrics::counter!("orders_confirmed").increment(1);
        Ok(result)
    }

    /// Records payment for an order.
    #[tracing::instrument(skip(self))]
    pub async fn pay_order(&self, cmd: PayOrder) -> Result<CommandResult, DomainError> {
        let result = self.execute(cmd.order_id, |order| order.pay()).await?;
        metrics::counter!("orders_paid").increment(1);
        Ok(result)
    }

    /// Cancels an order.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_order(&self, cmd: CancelOrder) -> Result<CommandResult, DomainError> {
        self.execute(cmd.order_id, |order| order.cancel()).await
    }

    /// Loads an order by ID.
    ///
    /// Returns None if the order doesn't exist.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(
        &self,
        order_id: AggregateId,
    ) -> Result<Option<CustomerOrder>, DomainError> {
        self.repository.get_order(order_id).await
    }

    async fn execute<F>(&self, order_id: AggregateId, f: F) -> Result<CommandResult, DomainError>
    where
        F: FnOnce(&mut CustomerOrder) -> Result<(), OrderError>,
    {
        let mut order = self
            .repository
            .get_order(order_id)
            .await?
            .ok_or(DomainError::OrderNotFound(order_id))?;

        f(&mut order)?;
        let events = order.take_domain_events();

        self.repository.update_order(order.clone()).await?;
        self.commit(order, events).await
    }

    /// Stages one outbox message per event and saves everything together.
    ///
    /// Any failure discards what was staged.
    async fn commit(
        &self,
        order: CustomerOrder,
        events: Vec<OrderEvent>,
    ) -> Result<CommandResult, DomainError> {
        let message_ids = match self.save(&events).await {
            Ok(ids) => ids,
            Err(err) => {
                self.repository.discard_changes().await?;
                return Err(err);
            }
        };

        metrics::counter!("outbox_messages_appended").increment(message_ids.len() as u64);
        tracing::info!(
            order_id = %order.id(),
            status = %order.status(),
            events = events.len(),
            "Order saved"
        );

        Ok(CommandResult {
            order,
            events,
            message_ids,
        })
    }

    async fn save(&self, events: &[OrderEvent]) -> Result<Vec<MessageId>, DomainError> {
        let messages = self.collector.to_messages(events)?;
        let ids = messages.iter().map(OutboxMessage::id).collect();

        self.repository.add_outbox_messages(messages).await?;
        self.repository.save_changes().await?;
        Ok(ids)
    }
}
