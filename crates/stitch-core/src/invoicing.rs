//! # Invoicing & Manual Payments
//!
//! Invoice issuance and the review flow for bank / cash-transfer payments.
//!
//! ## Payment Review Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Buyer submits payment ──► Payment(pending)                            │
//! │         │                  Invoice → pending_verification              │
//! │         ▼                                                               │
//! │  Factory owner reviews                                                  │
//! │    ├── verify ──► amount_paid += amount                                │
//! │    │              Invoice → paid | pending_verification | partially_paid│
//! │    └── reject ──► amount_paid unchanged                                │
//! │                   Invoice → pending_verification | partially_paid |    │
//! │                             unpaid                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every function here is pure: the database layer loads the rows, asks
//! this module what the new state is, and writes it back in one transaction.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{Invoice, InvoiceStatus, Order, Payment, PaymentMethod, PaymentStatus};
use crate::validation::{validate_name, validate_optional_text, validate_reference, MAX_NOTES_LEN, MAX_REFERENCE_LEN};

/// Default number of days between issue and due date.
pub const DEFAULT_PAYMENT_TERMS_DAYS: i64 = 14;

/// Longest sender name accepted for cash transfers.
pub const MAX_SENDER_NAME_LEN: usize = 100;

// =============================================================================
// Issuance
// =============================================================================

impl Invoice {
    /// Builds the invoice for an order.
    ///
    /// The invoice total is the order's stored total; nothing is re-priced.
    ///
    /// ## Errors
    /// [`CoreError::OrderNotInvoiceable`] unless the order is confirmed or later.
    pub fn from_order(
        order: &Order,
        invoice_number: String,
        issued_at: DateTime<Utc>,
        payment_terms_days: i64,
    ) -> CoreResult<Invoice> {
        if !order.status.is_invoiceable() {
            return Err(CoreError::OrderNotInvoiceable {
                order_number: order.order_number.clone(),
                status: order.status.to_string(),
            });
        }

        Ok(Invoice {
            id: Uuid::new_v4().to_string(),
            invoice_number,
            order_id: order.id.clone(),
            buyer_id: order.buyer_id.clone(),
            factory_id: order.factory_id.clone(),
            subtotal_cents: order.total_cents,
            total_cents: order.total_cents,
            amount_paid_cents: 0,
            status: InvoiceStatus::Unpaid,
            issued_at,
            due_at: issued_at + Duration::days(payment_terms_days.max(0)),
            updated_at: issued_at,
        })
    }
}

// =============================================================================
// Status Derivation
// =============================================================================

/// Derives an open invoice's status from its verified total and how many
/// payments still await review.
///
/// Precedence: paid, then pending_verification, then partially_paid, then unpaid.
pub fn derive_invoice_status(total: Money, amount_paid: Money, pending_count: usize) -> InvoiceStatus {
    if amount_paid >= total {
        InvoiceStatus::Paid
    } else if pending_count > 0 {
        InvoiceStatus::PendingVerification
    } else if amount_paid.is_positive() {
        InvoiceStatus::PartiallyPaid
    } else {
        InvoiceStatus::Unpaid
    }
}

// =============================================================================
// Submission
// =============================================================================

/// A buyer's payment form, before validation.
#[derive(Debug, Clone)]
pub struct PaymentSubmission {
    pub method: PaymentMethod,
    pub amount: Money,
    pub reference: Option<String>,
    pub sender_name: Option<String>,
}

/// A submission that passed every check, with normalized text fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedPayment {
    pub method: PaymentMethod,
    pub amount: Money,
    pub reference: Option<String>,
    pub sender_name: Option<String>,
    /// Invoice status once this payment is recorded.
    pub invoice_status: InvoiceStatus,
}

/// Validates a payment against the invoice it pays.
///
/// `pending_total` is the sum of payments on this invoice still awaiting
/// review; the new amount may not exceed what remains after them.
///
/// ## Rules
/// - Invoice must not be paid or cancelled
/// - Amount must be positive and within the remaining balance
/// - Bank transfer: reference required
/// - Cash transfer: sender name required, reference (receipt number) optional
pub fn accept_payment(
    invoice: &Invoice,
    pending_total: Money,
    submission: PaymentSubmission,
) -> CoreResult<AcceptedPayment> {
    if matches!(invoice.status, InvoiceStatus::Paid | InvoiceStatus::Cancelled) {
        return Err(CoreError::InvoiceNotPayable {
            invoice_number: invoice.invoice_number.clone(),
            status: invoice.status.to_string(),
        });
    }

    if !submission.amount.is_positive() {
        return Err(CoreError::InvalidPaymentAmount {
            reason: "amount must be greater than zero".to_string(),
        });
    }

    let remaining = invoice.outstanding().saturating_sub_floor_zero(pending_total);
    if submission.amount > remaining {
        return Err(CoreError::InvalidPaymentAmount {
            reason: format!(
                "amount {} exceeds the remaining balance {}",
                submission.amount, remaining
            ),
        });
    }

    let (reference, sender_name) = match submission.method {
        PaymentMethod::BankTransfer => {
            let reference = submission.reference.as_deref().unwrap_or_default();
            (Some(validate_reference(reference)?), None)
        }
        PaymentMethod::CashTransfer => {
            let sender = submission.sender_name.as_deref().unwrap_or_default();
            let sender = validate_name("sender_name", sender, MAX_SENDER_NAME_LEN)?;
            let receipt = validate_optional_text(
                "reference",
                submission.reference.as_deref(),
                MAX_REFERENCE_LEN,
            )?;
            (receipt, Some(sender))
        }
    };

    Ok(AcceptedPayment {
        method: submission.method,
        amount: submission.amount,
        reference,
        sender_name,
        invoice_status: InvoiceStatus::PendingVerification,
    })
}

// =============================================================================
// Review
// =============================================================================

/// What the reviewer decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewDecision {
    Verify,
    Reject,
}

/// New state of a payment and its invoice after review.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReviewOutcome {
    pub payment_status: PaymentStatus,
    pub amount_paid: Money,
    pub invoice_status: InvoiceStatus,
}

/// Applies a review decision.
///
/// `other_pending` counts pending payments on the invoice besides this one.
///
/// ## Errors
/// - [`CoreError::InvalidTransition`] if the payment was already reviewed
/// - [`CoreError::InvoiceNotPayable`] when verifying against a cancelled invoice
pub fn review_payment(
    invoice: &Invoice,
    payment: &Payment,
    decision: ReviewDecision,
    other_pending: usize,
) -> CoreResult<ReviewOutcome> {
    if payment.invoice_id != invoice.id {
        return Err(ValidationError::InvalidFormat {
            field: "payment".to_string(),
            reason: "does not belong to this invoice".to_string(),
        }
        .into());
    }

    let payment_status = match decision {
        ReviewDecision::Verify => PaymentStatus::Verified,
        ReviewDecision::Reject => PaymentStatus::Rejected,
    };

    if payment.status != PaymentStatus::Pending {
        return Err(CoreError::InvalidTransition {
            entity: "payment",
            from: payment.status.to_string(),
            to: payment_status.to_string(),
        });
    }

    if invoice.status == InvoiceStatus::Cancelled {
        if decision == ReviewDecision::Verify {
            return Err(CoreError::InvoiceNotPayable {
                invoice_number: invoice.invoice_number.clone(),
                status: invoice.status.to_string(),
            });
        }
        return Ok(ReviewOutcome {
            payment_status,
            amount_paid: invoice.amount_paid(),
            invoice_status: InvoiceStatus::Cancelled,
        });
    }

    let amount_paid = match decision {
        ReviewDecision::Verify => invoice.amount_paid() + payment.amount(),
        ReviewDecision::Reject => invoice.amount_paid(),
    };

    Ok(ReviewOutcome {
        payment_status,
        amount_paid,
        invoice_status: derive_invoice_status(invoice.total(), amount_paid, other_pending),
    })
}

/// The reviewer's note, trimmed. A rejection must say why; a verification
/// may stay silent.
pub fn review_note(decision: ReviewDecision, note: Option<&str>) -> CoreResult<Option<String>> {
    let note = validate_optional_text("note", note, MAX_NOTES_LEN)?;
    if decision == ReviewDecision::Reject && note.is_none() {
        return Err(ValidationError::Required {
            field: "note".to_string(),
        }
        .into());
    }
    Ok(note)
}

/// Checks that an invoice may be cancelled: nothing verified, nothing pending.
pub fn cancel_invoice(invoice: &Invoice, pending_count: usize) -> CoreResult<InvoiceStatus> {
    let blocked = invoice.status == InvoiceStatus::Cancelled
        || invoice.amount_paid().is_positive()
        || pending_count > 0;

    if blocked {
        return Err(CoreError::InvalidTransition {
            entity: "invoice",
            from: invoice.status.to_string(),
            to: InvoiceStatus::Cancelled.to_string(),
        });
    }

    Ok(InvoiceStatus::Cancelled)
}

// =============================================================================
// Unit Tests
// =============================================================================
