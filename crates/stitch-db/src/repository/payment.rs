//! # Payment Repository
//!
//! Manual payments (bank transfer / cash-transfer service) and their review.
//!
//! ## Concurrency
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Reviewer A: verify P-1              Reviewer B: verify P-1            │
//! │       │                                   │                             │
//! │  BEGIN IMMEDIATE                     BEGIN IMMEDIATE                    │
//! │  load P-1 (pending)                    ... waits on busy_timeout        │
//! │  UPDATE payments ... WHERE                                              │
//! │    id = P-1 AND status = 'pending'                                      │
//! │  UPDATE invoices amount_paid += x                                       │
//! │  COMMIT ───────────────────────────► load P-1 (verified)               │
//! │                                      ROLLBACK → InvalidTransition       │
//! │                                                                         │
//! │  Both updates stay guarded on the values they were computed from, so   │
//! │  a payment is counted exactly once even without the write lock.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::{begin_write, generate_id};
use crate::repository::invoice::{fetch_invoice, pending_payments};
use stitch_core::invoicing::{accept_payment, review_note, review_payment, PaymentSubmission, ReviewDecision};
use stitch_core::{Invoice, Money, Payment, PaymentStatus};

const PAYMENT_COLUMNS: &str = "id, invoice_id, method, amount_cents, reference, sender_name, \
                               status, reviewed_by, review_note, created_at, reviewed_at";

/// A payment review together with the invoice it changed.
#[derive(Debug, Clone)]
pub struct ReviewedPayment {
    pub payment: Payment,
    pub invoice: Invoice,
}

/// Repository for payment database operations.
#[derive(Debug, Clone)]
pub struct PaymentRepository {
    pool: SqlitePool,
}

impl PaymentRepository {
    /// Creates a new PaymentRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PaymentRepository { pool }
    }

    /// Records a buyer's payment against an invoice.
    ///
    /// ## What This Does
    /// 1. Loads the invoice and the sum of payments already awaiting review
    /// 2. Validates the submission (amount, reference / sender name)
    /// 3. Inserts the payment as `pending`
    /// 4. Moves the invoice to `pending_verification`
    pub async fn submit(&self, invoice_id: &str, submission: PaymentSubmission) -> DbResult<Payment> {
        let mut tx = begin_write(&self.pool).await?;

        let invoice = fetch_invoice(&mut tx, invoice_id).await?;
        let (_, pending_total) = pending_payments(&mut tx, invoice_id).await?;
        let accepted = accept_payment(&invoice, Money::from_cents(pending_total), submission)?;

        let payment = Payment {
            id: generate_id(),
            invoice_id: invoice.id.clone(),
            method: accepted.method,
            amount_cents: accepted.amount.cents(),
            reference: accepted.reference,
            sender_name: accepted.sender_name,
            status: PaymentStatus::Pending,
            reviewed_by: None,
            review_note: None,
            created_at: Utc::now(),
            reviewed_at: None,
        };

        debug!(
            invoice_number = %invoice.invoice_number,
            method = %payment.method,
            amount_cents = payment.amount_cents,
            "Recording payment"
        );

        sqlx::query(
            r#"
            INSERT INTO payments (
                id, invoice_id, method, amount_cents, reference, sender_name,
                status, reviewed_by, review_note, created_at, reviewed_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&payment.id)
        .bind(&payment.invoice_id)
        .bind(payment.method)
        .bind(payment.amount_cents)
        .bind(&payment.reference)
        .bind(&payment.sender_name)
        .bind(payment.status)
        .bind(&payment.reviewed_by)
        .bind(&payment.review_note)
        .bind(payment.created_at)
        .bind(payment.reviewed_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE invoices SET status = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(&invoice.id)
            .bind(accepted.invoice_status)
            .bind(payment.created_at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(
            payment_id = %payment.id,
            invoice_number = %invoice.invoice_number,
            amount_cents = payment.amount_cents,
            "Payment submitted for verification"
        );
        Ok(payment)
    }

    /// Verifies or rejects a pending payment.
    ///
    /// ## Errors
    /// - `DbError::Rule(Validation)` for a rejection without a note
    /// - `DbError::NotFound` for an unknown payment
    /// - `DbError::Rule(InvalidTransition)` if it was already reviewed
    /// - `DbError::Conflict` if another reviewer got there first
    pub async fn review(
        &self,
        payment_id: &str,
        decision: ReviewDecision,
        reviewer_id: &str,
        note: Option<String>,
    ) -> DbResult<ReviewedPayment> {
        let note = review_note(decision, note.as_deref())?;
        let mut tx = begin_write(&self.pool).await?;

        let sql = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = ?1");
        let mut payment = sqlx::query_as::<_, Payment>(&sql)
            .bind(payment_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| DbError::not_found("Payment", payment_id))?;

        let mut invoice = fetch_invoice(&mut tx, &payment.invoice_id).await?;
        let (pending_count, _) = pending_payments(&mut tx, &invoice.id).await?;
        let other_pending = pending_count.saturating_sub(usize::from(payment.status == PaymentStatus::Pending));

        let outcome = review_payment(&invoice, &payment, decision, other_pending)?;
        let now = Utc::now();

        let updated = sqlx::query(
            r#"
            UPDATE payments
            SET status = ?2, reviewed_by = ?3, review_note = ?4, reviewed_at = ?5
            WHERE id = ?1 AND status = 'pending'
            "#,
        )
        .bind(payment_id)
        .bind(outcome.payment_status)
        .bind(reviewer_id)
        .bind(&note)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(DbError::conflict("Payment", payment_id));
        }

        let updated = sqlx::query(
            r#"
            UPDATE invoices
            SET amount_paid_cents = ?3, status = ?4, updated_at = ?5
            WHERE id = ?1 AND amount_paid_cents = ?2
            "#,
        )
        .bind(&invoice.id)
        .bind(invoice.amount_paid_cents)
        .bind(outcome.amount_paid.cents())
        .bind(outcome.invoice_status)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(DbError::conflict("Invoice", &invoice.id));
        }

        tx.commit().await?;

        info!(
            payment_id = %payment_id,
            invoice_number = %invoice.invoice_number,
            decision = ?decision,
            invoice_status = %outcome.invoice_status,
            "Payment reviewed"
        );

        payment.status = outcome.payment_status;
        payment.reviewed_by = Some(reviewer_id.to_string());
        payment.review_note = note;
        payment.reviewed_at = Some(now);

        invoice.amount_paid_cents = outcome.amount_paid.cents();
        invoice.status = outcome.invoice_status;
        invoice.updated_at = now;

        Ok(ReviewedPayment { payment, invoice })
    }

    /// Gets a payment by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Payment>> {
        let sql = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = ?1");

        let payment = sqlx::query_as::<_, Payment>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(payment)
    }

    /// Lists the payments recorded against an invoice, oldest first.
    pub async fn list_for_invoice(&self, invoice_id: &str) -> DbResult<Vec<Payment>> {
        let sql = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE invoice_id = ?1 ORDER BY created_at");

        let payments = sqlx::query_as::<_, Payment>(&sql)
            .bind(invoice_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(payments)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{file_db, issued_invoice, test_db};
    use stitch_core::{CoreError, InvoiceStatus, PaymentMethod};

    fn bank(cents: i64, reference: &str) -> PaymentSubmission {
        PaymentSubmission {
            method: PaymentMethod::BankTransfer,
            amount: Money::from_cents(cents),
            reference: Some(reference.to_string()),
            sender_name: None,
        }
    }

    #[tokio::test]
    async fn test_submit_moves_invoice_to_pending_verification() {
        let db = test_db().await;
        let invoice = issued_invoice(&db).await;

        let payment = db.payments().submit(&invoice.id, bank(100_000, "TRX-1")).await.unwrap();
        assert_eq!(payment.status, PaymentStatus::Pending);

        let invoice = db.invoices().get_by_id(&invoice.id).await.unwrap().unwrap();
        assert_eq!(invoice.status, InvoiceStatus::PendingVerification);
        assert_eq!(invoice.amount_paid_cents, 0);
    }

    #[tokio::test]
    async fn test_submit_cannot_exceed_balance_with_pending() {
        let db = test_db().await;
        let invoice = issued_invoice(&db).await; // 4,500.00

        db.payments().submit(&invoice.id, bank(400_000, "TRX-1")).await.unwrap();
        let err = db.payments().submit(&invoice.id, bank(60_000, "TRX-2")).await.unwrap_err();
        assert!(matches!(err, DbError::Rule(CoreError::InvalidPaymentAmount { .. })));
    }

    #[tokio::test]
    async fn test_cash_transfer_needs_sender() {
        let db = test_db().await;
        let invoice = issued_invoice(&db).await;

        let submission = PaymentSubmission {
            method: PaymentMethod::CashTransfer,
            amount: Money::from_cents(1000),
            reference: Some("RCPT-77".to_string()),
            sender_name: None,
        };
        let err = db.payments().submit(&invoice.id, submission).await.unwrap_err();
        assert!(matches!(err, DbError::Rule(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_partial_then_full_payment() {
        let db = test_db().await;
        let invoice = issued_invoice(&db).await;

        let first = db.payments().submit(&invoice.id, bank(150_000, "TRX-1")).await.unwrap();
        let reviewed = db
            .payments()
            .review(&first.id, ReviewDecision::Verify, "owner-1", None)
            .await
            .unwrap();
        assert_eq!(reviewed.invoice.status, InvoiceStatus::PartiallyPaid);
        assert_eq!(reviewed.invoice.amount_paid_cents, 150_000);

        let second = db.payments().submit(&invoice.id, bank(300_000, "TRX-2")).await.unwrap();
        let reviewed = db
            .payments()
            .review(&second.id, ReviewDecision::Verify, "owner-1", None)
            .await
            .unwrap();
        assert_eq!(reviewed.invoice.status, InvoiceStatus::Paid);
        assert_eq!(reviewed.invoice.outstanding(), Money::zero());

        let err = db.payments().submit(&invoice.id, bank(1, "TRX-3")).await.unwrap_err();
        assert!(matches!(err, DbError::Rule(CoreError::InvoiceNotPayable { .. })));
    }

    #[tokio::test]
    async fn test_verify_with_other_pending() {
        let db = test_db().await;
        let invoice = issued_invoice(&db).await;

        let a = db.payments().submit(&invoice.id, bank(100_000, "A")).await.unwrap();
        db.payments().submit(&invoice.id, bank(100_000, "B")).await.unwrap();

        let reviewed = db.payments().review(&a.id, ReviewDecision::Verify, "owner-1", None).await.unwrap();
        assert_eq!(reviewed.invoice.status, InvoiceStatus::PendingVerification);
        assert_eq!(reviewed.invoice.amount_paid_cents, 100_000);
    }

    #[tokio::test]
    async fn test_reject_restores_unpaid() {
        let db = test_db().await;
        let invoice = issued_invoice(&db).await;

        let p = db.payments().submit(&invoice.id, bank(100_000, "TRX-1")).await.unwrap();

        let err = db
            .payments()
            .review(&p.id, ReviewDecision::Reject, "owner-1", None)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Rule(CoreError::Validation(_))));
        let untouched = db.payments().get_by_id(&p.id).await.unwrap().unwrap();
        assert_eq!(untouched.status, PaymentStatus::Pending);

        let reviewed = db
            .payments()
            .review(&p.id, ReviewDecision::Reject, "owner-1", Some("No such transfer".to_string()))
            .await
            .unwrap();

        assert_eq!(reviewed.payment.status, PaymentStatus::Rejected);
        assert_eq!(reviewed.payment.review_note.as_deref(), Some("No such transfer"));
        assert_eq!(reviewed.invoice.status, InvoiceStatus::Unpaid);

        let stored = db.payments().get_by_id(&p.id).await.unwrap().unwrap();
        assert_eq!(stored.reviewed_by.as_deref(), Some("owner-1"));
        assert_eq!(db.payments().list_for_invoice(&invoice.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_double_review_is_refused() {
        let db = test_db().await;
        let invoice = issued_invoice(&db).await;
        let p = db.payments().submit(&invoice.id, bank(100_000, "TRX-1")).await.unwrap();

        db.payments().review(&p.id, ReviewDecision::Verify, "owner-1", None).await.unwrap();
        let err = db
            .payments()
            .review(&p.id, ReviewDecision::Verify, "owner-1", None)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Rule(CoreError::InvalidTransition { .. })));

        // counted once
        let stored = db.invoices().get_by_id(&invoice.id).await.unwrap().unwrap();
        assert_eq!(stored.amount_paid_cents, 100_000);
    }

    #[tokio::test]
    async fn test_unknown_payment() {
        let db = test_db().await;
        let err = db
            .payments()
            .review("missing", ReviewDecision::Verify, "owner-1", None)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_reviews_count_once() {
        let (_dir, db) = file_db().await;
        let invoice = issued_invoice(&db).await;
        let payment = db.payments().submit(&invoice.id, bank(100_000, "TRX-1")).await.unwrap();

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let db = db.clone();
                let payment_id = payment.id.clone();
                tokio::spawn(async move {
                    db.payments()
                        .review(&payment_id, ReviewDecision::Verify, &format!("reviewer-{}", i), None)
                        .await
                })
            })
            .collect();

        let mut verified = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => verified += 1,
                Err(DbError::Rule(CoreError::InvalidTransition { .. })) | Err(DbError::Conflict { .. }) => {}
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }
        assert_eq!(verified, 1);

        let invoice = db.invoices().get_by_id(&invoice.id).await.unwrap().unwrap();
        assert_eq!(invoice.amount_paid_cents, 100_000);
        assert_eq!(invoice.status, InvoiceStatus::PartiallyPaid);
    }
}
