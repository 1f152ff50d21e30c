//! # Invoices and Manual Payments
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  unpaid ──submit──► pending_verification ──verify──► partially_paid    │
//! │    ▲                      │                              │   │          │
//! │    └──────reject──────────┘                              │   ▼          │
//! │                                                          │  paid        │
//! │  cancel: only while nothing is verified or pending       └──(more)      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The buyer records a bank or cash transfer made outside the platform; the
//! factory checks its statement and verifies or rejects it
//! (see [`crate::routes::payments`]).

use axum::extract::{Path, State};
use axum::response::Response;
use axum::{Form, Json};
use axum_extra::extract::WithRejection;
use serde::{Deserialize, Serialize};
use stitch_core::invoicing::PaymentSubmission;
use stitch_core::validation::validate_price;
use stitch_core::{Invoice, Messages, Money, Payment, PaymentMethod};
use tracing::info;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::locale::RequestLocale;
use crate::routes::{created, non_blank, party_for, updated, Accepts, FormBody, Party};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PaymentForm {
    pub method: PaymentMethod,
    pub amount: String,
    pub reference: Option<String>,
    pub sender_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct InvoiceView {
    pub invoice: Invoice,
    pub total_display: String,
    pub paid_display: String,
    pub outstanding_display: String,
    pub payments: Vec<Payment>,
}

impl InvoiceView {
    pub fn new(invoice: Invoice, payments: Vec<Payment>, messages: &Messages, currency: &str) -> Self {
        InvoiceView {
            total_display: messages.money(invoice.total(), currency),
            paid_display: messages.money(invoice.amount_paid(), currency),
            outstanding_display: messages.money(invoice.outstanding(), currency),
            payments,
            invoice,
        }
    }
}

/// Loads an invoice the caller is a party to; strangers get `NotFound`.
pub async fn visible_invoice(state: &AppState, user: &AuthUser, id: &str) -> ApiResult<(Invoice, Party)> {
    let invoice = state
        .db
        .invoices()
        .get_by_id(id)
        .await?
        .ok_or(ApiError::NotFound("Invoice"))?;

    let party = party_for(state, user, &invoice.buyer_id, &invoice.factory_id)
        .await?
        .ok_or(ApiError::NotFound("Invoice"))?;
    Ok((invoice, party))
}

pub async fn invoice_view(state: &AppState, invoice: Invoice, messages: &Messages) -> ApiResult<InvoiceView> {
    let payments = state.db.payments().list_for_invoice(&invoice.id).await?;
    Ok(InvoiceView::new(invoice, payments, messages, &state.config.billing.currency))
}

/// `GET /invoices/{id}`
pub async fn detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
    user: AuthUser,
    locale: RequestLocale,
) -> ApiResult<Json<InvoiceView>> {
    let (invoice, _) = visible_invoice(&state, &user, &id).await?;
    Ok(Json(invoice_view(&state, invoice, &locale.messages()).await?))
}

/// `POST /invoices/{id}/payments` (form): the buyer records a transfer.
pub async fn submit_payment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    user: AuthUser,
    accepts: Accepts,
    locale: RequestLocale,
    WithRejection(Form(form), _): FormBody<PaymentForm>,
) -> ApiResult<Response> {
    let (invoice, party) = visible_invoice(&state, &user, &id).await?;
    if party != Party::Buyer {
        return Err(ApiError::Forbidden);
    }

    let amount = Money::from_decimal(validate_price("amount", &form.amount)?)?;
    let submission = PaymentSubmission {
        method: form.method,
        amount,
        reference: non_blank(form.reference),
        sender_name: non_blank(form.sender_name),
    };

    let payment = state.db.payments().submit(&invoice.id, submission).await?;
    info!(payment_id = %payment.id, invoice_number = %invoice.invoice_number, buyer = %user.id, "Payment recorded");

    let invoice = state
        .db
        .invoices()
        .get_by_id(&id)
        .await?
        .ok_or(ApiError::NotFound("Invoice"))?;
    let location = format!("/invoices/{}", invoice.id);
    let view = invoice_view(&state, invoice, &locale.messages()).await?;
    Ok(created(accepts, location, view))
}

/// `POST /invoices/{id}/cancel`
pub async fn cancel(
    State(state): State<AppState>,
    Path(id): Path<String>,
    user: AuthUser,
    accepts: Accepts,
    locale: RequestLocale,
) -> ApiResult<Response> {
    let (invoice, party) = visible_invoice(&state, &user, &id).await?;
    party.require_seller()?;

    let invoice = state.db.invoices().cancel(&invoice.id).await?;
    let location = format!("/invoices/{}", invoice.id);
    let view = invoice_view(&state, invoice, &locale.messages()).await?;
    Ok(updated(accepts, location, view))
}
