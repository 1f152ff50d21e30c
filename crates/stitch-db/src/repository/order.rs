//! # Order Repository
//!
//! Database operations for bulk orders.
//!
//! ## Order Placement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Handler                                                               │
//! │    1. load product + tier rows                                         │
//! │    2. stitch_core::orders::quote_order()  → PriceQuote                 │
//! │    3. db.orders().create(buyer, product, &quote, notes)                │
//! │                                                                         │
//! │  create():                                                             │
//! │    BEGIN IMMEDIATE                                                     │
//! │      ORD-YYYYMMDD-NNNN  ← next number for today                        │
//! │      INSERT orders (name + unit price frozen, total in cents)          │
//! │    COMMIT   (retried if another order took the same number)           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::repository::{
    begin_write, generate_id, next_document_number, parse_decimal, NUMBER_RETRIES,
};
use stitch_core::orders::ORDER_NUMBER_PREFIX;
use stitch_core::{Order, OrderStatus, PriceQuote, Product};

const ORDER_COLUMNS: &str = "id, order_number, buyer_id, factory_id, product_id, \
                             product_name_snapshot, quantity, unit_price, total_cents, \
                             status, notes, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: String,
    order_number: String,
    buyer_id: String,
    factory_id: String,
    product_id: String,
    product_name_snapshot: String,
    quantity: i64,
    unit_price: String,
    total_cents: i64,
    status: OrderStatus,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = DbError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let unit_price = parse_decimal("Order", &row.id, "unit_price", &row.unit_price)?;

        Ok(Order {
            id: row.id,
            order_number: row.order_number,
            buyer_id: row.buyer_id,
            factory_id: row.factory_id,
            product_id: row.product_id,
            product_name_snapshot: row.product_name_snapshot,
            quantity: row.quantity,
            unit_price,
            total_cents: row.total_cents,
            status: row.status,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Repository for order database operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Places an order priced by `quote`.
    ///
    /// ## Snapshot Pattern
    /// The product name and the resolved unit price are copied onto the
    /// order, so later product or tier edits never change it.
    pub async fn create(
        &self,
        buyer_id: &str,
        product: &Product,
        quote: &PriceQuote,
        notes: Option<String>,
    ) -> DbResult<Order> {
        let total_cents = quote.total_money()?.cents();

        let mut attempt = 0;
        loop {
            attempt += 1;
            let now = Utc::now();

            let mut tx = begin_write(&self.pool).await?;
            let order_number =
                next_document_number(&mut tx, "orders", "order_number", ORDER_NUMBER_PREFIX, now.date_naive())
                    .await?;

            let order = Order {
                id: generate_id(),
                order_number,
                buyer_id: buyer_id.to_string(),
                factory_id: product.factory_id.clone(),
                product_id: product.id.clone(),
                product_name_snapshot: product.name.clone(),
                quantity: quote.quantity,
                unit_price: quote.unit_price,
                total_cents,
                status: OrderStatus::Pending,
                notes: notes.clone(),
                created_at: now,
                updated_at: now,
            };

            debug!(order_number = %order.order_number, attempt, "Inserting order");

            let inserted = sqlx::query(
                r#"
                INSERT INTO orders (
                    id, order_number, buyer_id, factory_id, product_id,
                    product_name_snapshot, quantity, unit_price, total_cents,
                    status, notes, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
                "#,
            )
            .bind(&order.id)
            .bind(&order.order_number)
            .bind(&order.buyer_id)
            .bind(&order.factory_id)
            .bind(&order.product_id)
            .bind(&order.product_name_snapshot)
            .bind(order.quantity)
            .bind(order.unit_price.to_string())
            .bind(order.total_cents)
            .bind(order.status)
            .bind(&order.notes)
            .bind(order.created_at)
            .bind(order.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(DbError::from);

            match inserted {
                Ok(_) => {
                    tx.commit().await?;
                    info!(
                        order_number = %order.order_number,
                        quantity = order.quantity,
                        total_cents = order.total_cents,
                        "Order placed"
                    );
                    return Ok(order);
                }
                Err(DbError::UniqueViolation { field, .. })
                    if field.contains("order_number") && attempt < NUMBER_RETRIES =>
                {
                    warn!(order_number = %order.order_number, "Order number taken, retrying");
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Gets an order by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1");

        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Order::try_from).transpose()
    }

    /// Lists a buyer's orders, newest first.
    pub async fn list_for_buyer(&self, buyer_id: &str, limit: u32) -> DbResult<Vec<Order>> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE buyer_id = ?1 ORDER BY created_at DESC LIMIT ?2"
        );

        let rows = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(buyer_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Order::try_from).collect()
    }

    /// Lists orders received by a factory, newest first.
    pub async fn list_for_factory(&self, factory_id: &str, limit: u32) -> DbResult<Vec<Order>> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE factory_id = ?1 ORDER BY created_at DESC LIMIT ?2"
        );

        let rows = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(factory_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Order::try_from).collect()
    }

    /// Moves an order from `from` to `to`.
    ///
    /// The caller has already checked the move with
    /// [`OrderStatus::transition`]; the `WHERE status = from` guard makes
    /// the update fail with `DbError::Conflict` if the order changed since
    /// it was loaded.
    pub async fn update_status(&self, id: &str, from: OrderStatus, to: OrderStatus) -> DbResult<()> {
        debug!(id = %id, from = %from, to = %to, "Updating order status");

        let result = sqlx::query(
            r#"
            UPDATE orders SET status = ?3, updated_at = ?4
            WHERE id = ?1 AND status = ?2
            "#,
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return match self.get_by_id(id).await? {
                Some(_) => Err(DbError::conflict("Order", id)),
                None => Err(DbError::not_found("Order", id)),
            };
        }

        info!(id = %id, status = %to, "Order status changed");
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
