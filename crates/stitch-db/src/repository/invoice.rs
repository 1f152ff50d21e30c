//! # Invoice Repository
//!
//! Database operations for invoices.
//!
//! One invoice per order, enforced by `UNIQUE(order_id)`. The amount paid
//! and the status change only through [`crate::repository::payment`].

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::repository::{begin_write, next_document_number, NUMBER_RETRIES};
use stitch_core::invoicing::cancel_invoice;
use stitch_core::orders::INVOICE_NUMBER_PREFIX;
use stitch_core::{Invoice, InvoiceStatus, Order};

pub(crate) const INVOICE_COLUMNS: &str = "id, invoice_number, order_id, buyer_id, factory_id, \
                                          subtotal_cents, total_cents, amount_paid_cents, status, \
                                          issued_at, due_at, updated_at";

/// Loads an invoice on an open connection or transaction.
pub(crate) async fn fetch_invoice(conn: &mut SqliteConnection, id: &str) -> DbResult<Invoice> {
    let sql = format!("SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = ?1");

    sqlx::query_as::<_, Invoice>(&sql)
        .bind(id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| DbError::not_found("Invoice", id))
}

/// Number of payments on an invoice still awaiting review, and their sum.
pub(crate) async fn pending_payments(conn: &mut SqliteConnection, invoice_id: &str) -> DbResult<(usize, i64)> {
    let (count, total): (i64, i64) = sqlx::query_as(
        r#"
        SELECT COUNT(*), COALESCE(SUM(amount_cents), 0)
        FROM payments
        WHERE invoice_id = ?1 AND status = 'pending'
        "#,
    )
    .bind(invoice_id)
    .fetch_one(conn)
    .await?;

    Ok((count as usize, total))
}

/// Repository for invoice database operations.
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: SqlitePool,
}

impl InvoiceRepository {
    /// Creates a new InvoiceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InvoiceRepository { pool }
    }

    /// Issues the invoice for an order.
    ///
    /// ## Errors
    /// - `DbError::Rule(OrderNotInvoiceable)` if the order is pending or cancelled
    /// - `DbError::UniqueViolation` if the order already has an invoice
    pub async fn create_for_order(&self, order: &Order, payment_terms_days: i64) -> DbResult<Invoice> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let now = Utc::now();

            let mut tx = begin_write(&self.pool).await?;
            let number = next_document_number(
                &mut tx,
                "invoices",
                "invoice_number",
                INVOICE_NUMBER_PREFIX,
                now.date_naive(),
            )
            .await?;

            let invoice = Invoice::from_order(order, number, now, payment_terms_days)?;

            debug!(invoice_number = %invoice.invoice_number, order_id = %order.id, "Inserting invoice");

            let inserted = sqlx::query(
                r#"
                INSERT INTO invoices (
                    id, invoice_number, order_id, buyer_id, factory_id,
                    subtotal_cents, total_cents, amount_paid_cents, status,
                    issued_at, due_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                "#,
            )
            .bind(&invoice.id)
            .bind(&invoice.invoice_number)
            .bind(&invoice.order_id)
            .bind(&invoice.buyer_id)
            .bind(&invoice.factory_id)
            .bind(invoice.subtotal_cents)
            .bind(invoice.total_cents)
            .bind(invoice.amount_paid_cents)
            .bind(invoice.status)
            .bind(invoice.issued_at)
            .bind(invoice.due_at)
            .bind(invoice.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(DbError::from);

            match inserted {
                Ok(_) => {
                    tx.commit().await?;
                    info!(
                        invoice_number = %invoice.invoice_number,
                        order_number = %order.order_number,
                        total_cents = invoice.total_cents,
                        "Invoice issued"
                    );
                    return Ok(invoice);
                }
                Err(DbError::UniqueViolation { field, .. })
                    if field.contains("invoice_number") && attempt < NUMBER_RETRIES =>
                {
                    warn!(invoice_number = %invoice.invoice_number, "Invoice number taken, retrying");
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Gets an invoice by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Invoice>> {
        let sql = format!("SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = ?1");

        let invoice = sqlx::query_as::<_, Invoice>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(invoice)
    }

    /// Gets the invoice issued for an order, if any.
    pub async fn get_by_order(&self, order_id: &str) -> DbResult<Option<Invoice>> {
        let sql = format!("SELECT {INVOICE_COLUMNS} FROM invoices WHERE order_id = ?1");

        let invoice = sqlx::query_as::<_, Invoice>(&sql)
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(invoice)
    }

    /// Cancels an invoice that has no verified or pending payments.
    pub async fn cancel(&self, id: &str) -> DbResult<Invoice> {
        let mut tx = begin_write(&self.pool).await?;

        let mut invoice = fetch_invoice(&mut tx, id).await?;
        let (pending_count, _) = pending_payments(&mut tx, id).await?;
        let status = cancel_invoice(&invoice, pending_count)?;
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE invoices SET status = ?3, updated_at = ?4
            WHERE id = ?1 AND status = ?2 AND amount_paid_cents = 0
            "#,
        )
        .bind(id)
        .bind(invoice.status)
        .bind(status)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::conflict("Invoice", id));
        }

        tx.commit().await?;

        info!(invoice_number = %invoice.invoice_number, "Invoice cancelled");
        invoice.status = InvoiceStatus::Cancelled;
        invoice.updated_at = now;
        Ok(invoice)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{confirmed_order, placed_order, test_db};
    use stitch_core::invoicing::DEFAULT_PAYMENT_TERMS_DAYS;
    use stitch_core::CoreError;

    #[tokio::test]
    async fn test_create_for_confirmed_order() {
        let db = test_db().await;
        let order = confirmed_order(&db, 50).await;

        let invoice = db.invoices().create_for_order(&order, DEFAULT_PAYMENT_TERMS_DAYS).await.unwrap();
        assert_eq!(invoice.total_cents, 450_000);
        assert_eq!(invoice.status, InvoiceStatus::Unpaid);
        assert!(invoice.invoice_number.starts_with("INV-"));

        let by_order = db.invoices().get_by_order(&order.id).await.unwrap().unwrap();
        assert_eq!(by_order.id, invoice.id);
    }

    #[tokio::test]
    async fn test_one_invoice_per_order() {
        let db = test_db().await;
        let order = confirmed_order(&db, 50).await;

        db.invoices().create_for_order(&order, 14).await.unwrap();
        let err = db.invoices().create_for_order(&order, 14).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_pending_order_is_refused() {
        let db = test_db().await;
        let order = placed_order(&db, 50).await;

        let err = db.invoices().create_for_order(&order, 14).await.unwrap_err();
        assert!(matches!(err, DbError::Rule(CoreError::OrderNotInvoiceable { .. })));
    }

    #[tokio::test]
    async fn test_cancel_unpaid_invoice() {
        let db = test_db().await;
        let order = confirmed_order(&db, 50).await;
        let invoice = db.invoices().create_for_order(&order, 14).await.unwrap();

        let cancelled = db.invoices().cancel(&invoice.id).await.unwrap();
        assert_eq!(cancelled.status, InvoiceStatus::Cancelled);

        let err = db.invoices().cancel(&invoice.id).await.unwrap_err();
        assert!(matches!(err, DbError::Rule(CoreError::InvalidTransition { .. })));
    }
}
