use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::order::{Order, OrderItem, OrderStatus};

// ============================================================================
// Order Store - Transactional Repository for Orders and Line Items
// ============================================================================
//
// Responsibilities:
// 1. Persist an order and ALL of its items in one transaction
// 2. Count and list orders by optional status filter, in stable order
// 3. Load a single order together with its items
// 4. Write status transitions
//
// The trait is the seam between the workflow and PostgreSQL; tests run
// against an in-memory implementation.
//
// ============================================================================

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Insert the order header and every line item atomically. A partially
    /// written order (header without items, or vice versa) must never be
    /// observable.
    async fn create_order(
        &self,
        total_amount: f64,
        total_items: i32,
        items: &[OrderItem],
    ) -> Result<Order, sqlx::Error>;

    async fn count_orders(&self, status: Option<OrderStatus>) -> Result<u64, sqlx::Error>;

    /// Fetch one window of orders matching the filter, ordered by creation
    /// time (id as tie-breaker) so pages never overlap.
    async fn list_orders(
        &self,
        status: Option<OrderStatus>,
        offset: u64,
        limit: u32,
    ) -> Result<Vec<Order>, sqlx::Error>;

    /// Load the order and its items in insertion order, or `None` if the id
    /// is unknown.
    async fn find_order(&self, id: Uuid) -> Result<Option<(Order, Vec<OrderItem>)>, sqlx::Error>;

    /// Persist exactly the new status (and the update timestamp), returning
    /// the updated row, or `None` if the id is unknown.
    async fn update_status(
        &self,
        id: Uuid,
        status: OrderStatus,
    ) -> Result<Option<Order>, sqlx::Error>;
}

// ============================================================================
// PostgreSQL Implementation
// ============================================================================

const ORDER_COLUMNS: &str = "id, total_amount, total_items, status, created_at, updated_at";

pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn create_order(
        &self,
        total_amount: f64,
        total_items: i32,
        items: &[OrderItem],
    ) -> Result<Order, sqlx::Error> {
        let id = Uuid::new_v4();
        let mut tx = self.pool.begin().await?;

        let order: Order = sqlx::query_as(&format!(
            "INSERT INTO orders (id, total_amount, total_items) \
             VALUES ($1, $2, $3) RETURNING {ORDER_COLUMNS}"
        ))
        .bind(id)
        .bind(total_amount)
        .bind(total_items)
        .fetch_one(&mut *tx)
        .await?;

        for item in items {
            sqlx::query(
                "INSERT INTO order_items (order_id, product_id, price, quantity) \
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(id)
            .bind(&item.product_id)
            .bind(item.price)
            .bind(item.quantity)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::info!(
            order_id = %order.id,
            item_count = items.len(),
            "Persisted order with items"
        );

        Ok(order)
    }

    async fn count_orders(&self, status: Option<OrderStatus>) -> Result<u64, sqlx::Error> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM orders WHERE $1::order_status IS NULL OR status = $1",
        )
        .bind(status)
        .fetch_one(&self.pool)
        .await?;

        Ok(total as u64)
    }

    async fn list_orders(
        &self,
        status: Option<OrderStatus>,
        offset: u64,
        limit: u32,
    ) -> Result<Vec<Order>, sqlx::Error> {
        sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders \
             WHERE $1::order_status IS NULL OR status = $1 \
             ORDER BY created_at ASC, id ASC \
             LIMIT $2 OFFSET $3"
        ))
        .bind(status)
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await
    }

    async fn find_order(&self, id: Uuid) -> Result<Option<(Order, Vec<OrderItem>)>, sqlx::Error> {
        let order: Option<Order> =
            sqlx::query_as(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        let Some(order) = order else {
            return Ok(None);
        };

        let items: Vec<OrderItem> = sqlx::query_as(
            "SELECT product_id, price, quantity FROM order_items \
             WHERE order_id = $1 ORDER BY id ASC",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some((order, items)))
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: OrderStatus,
    ) -> Result<Option<Order>, sqlx::Error> {
        let updated: Option<Order> = sqlx::query_as(&format!(
            "UPDATE orders SET status = $2, updated_at = now() \
             WHERE id = $1 RETURNING {ORDER_COLUMNS}"
        ))
        .bind(id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(order) = &updated {
            tracing::info!(order_id = %order.id, status = ?order.status, "Order status updated");
        }

        Ok(updated)
    }
}
