//! PostgreSQL order repository.

use std::sync::Arc;

use async_trait::async_trait;
use common::{AggregateId, CustomerId, ProductId};
use outbox::{OutboxMessage, PostgresOutboxStore};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool, Row, postgres::PgRow};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::DomainError;
use crate::order::{Currency, CustomerOrder, CustomerOrderRecord, Money, OrderItem, OrderStatus};
use crate::repository::{OrderRepository, Staged};

/// PostgreSQL-backed order repository.
///
/// Orders live in `customer_orders` with their lines in
/// `customer_order_items`. `save_changes` writes staged orders and staged
/// outbox messages in one transaction, so the relay never sees a message
/// whose order state was rolled back.
#[derive(Clone)]
pub struct PostgresOrderRepository {
    pool: PgPool,
    outbox: PostgresOutboxStore,
    staged: Arc<Mutex<Vec<Staged>>>,
    staged_messages: Arc<Mutex<Vec<OutboxMessage>>>,
}

impl PostgresOrderRepository {
    /// Creates a new PostgreSQL order repository.
    pub fn new(pool: PgPool) -> Self {
        Self {
            outbox: PostgresOutboxStore::new(pool.clone()),
            pool,
            staged: Arc::default(),
            staged_messages: Arc::default(),
        }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Returns the outbox store over the same database.
    pub fn outbox(&self) -> &PostgresOutboxStore {
        &self.outbox
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<(), DomainError> {
        self.outbox.run_migrations().await?;
        Ok(())
    }

    async fn insert_order(conn: &mut PgConnection, order: &CustomerOrder) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO customer_orders
                (id, customer_id, store_id, status, currency, total_amount,
                 created_at, confirmed_at, paid_at, cancelled_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(order.id().as_uuid())
        .bind(order.customer_id().as_uuid())
        .bind(i64::from(order.store_id()))
        .bind(order.status().as_str())
        .bind(order.currency().ok().map(|c| c.code()))
        .bind(order.total().ok().map(|t| t.amount()))
        .bind(order.created_at())
        .bind(order.confirmed_at())
        .bind(order.paid_at())
        .bind(order.cancelled_at())
        .execute(&mut *conn)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                DomainError::OrderAlreadyExists(order.id())
            }
            other => DomainError::Database(other),
        })?;

        Self::insert_items(conn, order).await
    }

    async fn update_order_row(
        conn: &mut PgConnection,
        order: &CustomerOrder,
    ) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE customer_orders
            SET status = $2, currency = $3, total_amount = $4,
                confirmed_at = $5, paid_at = $6, cancelled_at = $7, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(order.id().as_uuid())
        .bind(order.status().as_str())
        .bind(order.currency().ok().map(|c| c.code()))
        .bind(order.total().ok().map(|t| t.amount()))
        .bind(order.confirmed_at())
        .bind(order.paid_at())
        .bind(order.cancelled_at())
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::OrderNotFound(order.id()));
        }

        sqlx::query("DELETE FROM customer_order_items WHERE order_id = $1")
            .bind(order.id().as_uuid())
            .execute(&mut *conn)
            .await?;

        Self::insert_items(conn, order).await
    }

    async fn insert_items(conn: &mut PgConnection, order: &CustomerOrder) -> Result<(), DomainError> {
        for (position, item) in order.items().iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO customer_order_items
                    (order_id, position, product_id, name_snapshot,
                     unit_price_amount, unit_price_currency, quantity)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(order.id().as_uuid())
            .bind(i32::try_from(position).unwrap_or(i32::MAX))
            .bind(item.product_id().as_uuid())
            .bind(item.name_snapshot())
            .bind(item.unit_price().amount())
            .bind(item.currency().code())
            .bind(i64::from(item.quantity()))
            .execute(&mut *conn)
            .await?;
        }
        Ok(())
    }

    fn row_to_item(order_id: AggregateId, row: PgRow) -> Result<OrderItem, DomainError> {
        let amount: Decimal = row.try_get("unit_price_amount")?;
        let code: String = row.try_get("unit_price_currency")?;
        let quantity: i64 = row.try_get("quantity")?;

        let currency = Currency::from_code(&code).map_err(|e| corrupted(order_id, e))?;
        let price = Money::new(amount, currency).map_err(|e| corrupted(order_id, e))?;
        let quantity = u32::try_from(quantity).map_err(|e| corrupted(order_id, e))?;

        OrderItem::new(
            ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
            row.try_get::<String, _>("name_snapshot")?,
            price,
            quantity,
        )
        .map_err(|e| corrupted(order_id, e))
    }

    fn row_to_record(
        order_id: AggregateId,
        row: PgRow,
        items: Vec<OrderItem>,
    ) -> Result<CustomerOrderRecord, DomainError> {
        let store_id: i64 = row.try_get("store_id")?;
        let status: String = row.try_get("status")?;
        let currency: Option<String> = row.try_get("currency")?;

        let status = OrderStatus::from_name(&status)
            .ok_or_else(|| corrupted(order_id, format!("unknown status {status:?}")))?;
        let currency = currency
            .map(|code| Currency::from_code(&code))
            .transpose()
            .map_err(|e| corrupted(order_id, e))?;

        Ok(CustomerOrderRecord {
            id: order_id,
            customer_id: CustomerId::from_uuid(row.try_get::<Uuid, _>("customer_id")?),
            store_id: u32::try_from(store_id).map_err(|e| corrupted(order_id, e))?,
            items,
            currency,
            status,
            created_at: row.try_get("created_at")?,
            confirmed_at: row.try_get("confirmed_at")?,
            paid_at: row.try_get("paid_at")?,
            cancelled_at: row.try_get("cancelled_at")?,
        })
    }
}

fn corrupted(order_id: AggregateId, reason: impl ToString) -> DomainError {
    DomainError::CorruptedOrder {
        order_id,
        reason: reason.to_string(),
    }
}

#[async_trait]
impl OrderRepository for PostgresOrderRepository {
    #[tracing::instrument(skip(self))]
    async fn get_order(&self, id: AggregateId) -> Result<Option<CustomerOrder>, DomainError> {
        let Some(row) = sqlx::query(
            r#"
            SELECT customer_id, store_id, status, currency,
                   created_at, confirmed_at, paid_at, cancelled_at
            FROM customer_orders
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };

        let item_rows = sqlx::query(
            r#"
            SELECT product_id, name_snapshot, unit_price_amount, unit_price_currency, quantity
            FROM customer_order_items
            WHERE order_id = $1
            ORDER BY position ASC
            "#,
        )
        .bind(id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        let items = item_rows
            .into_iter()
            .map(|row| Self::row_to_item(id, row))
            .collect::<Result<Vec<_>, _>>()?;

        let record = Self::row_to_record(id, row, items)?;
        let order = CustomerOrder::try_from(record).map_err(|e| corrupted(id, e))?;
        Ok(Some(order))
    }

    async fn add_order(&self, order: CustomerOrder) -> Result<(), DomainError> {
        let id = order.id();
        let mut staged = self.staged.lock().await;

        let already_staged = staged
            .iter()
            .any(|change| matches!(change, Staged::Added(o) if o.id() == id));
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM customer_orders WHERE id = $1)")
                .bind(id.as_uuid())
                .fetch_one(&self.pool)
                .await?;
        if already_staged || exists {
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

    #[tracing::instrument(skip(self))]
    async fn save_changes(&self) -> Result<usize, DomainError> {
        let staged = std::mem::take(&mut *self.staged.lock().await);
        let messages = std::mem::take(&mut *self.staged_messages.lock().await);
        if staged.is_empty() && messages.is_empty() {
            return Ok(0);
        }

        // Dropping the transaction on an early return rolls everything back.
        let mut tx = self.pool.begin().await?;

        for change in &staged {
            match change {
                Staged::Added(order) => Self::insert_order(&mut tx, order).await?,
                Staged::Updated(order) => Self::update_order_row(&mut tx, order).await?,
            }
        }

        for message in &messages {
            outbox::insert_message(&mut *tx, message).await?;
        }

        tx.commit().await?;

        tracing::debug!(
            count = staged.len(),
            appended = messages.len(),
            "Saved order changes"
        );
        Ok(staged.len())
    }

    async fn discard_changes(&self) -> Result<(), DomainError> {
        self.staged.lock().await.clear();
        self.staged_messages.lock().await.clear();
        Ok(())
    }
}
