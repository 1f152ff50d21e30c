//! Payment review by the factory.

use axum::extract::{Path, State};
use axum::response::Response;
use axum::Form;
use axum_extra::extract::WithRejection;
use serde::{Deserialize, Serialize};
use stitch_core::invoicing::ReviewDecision;
use stitch_core::{Invoice, Messages, Payment};
use stitch_db::ReviewedPayment;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::locale::RequestLocale;
use crate::routes::invoices::visible_invoice;
use crate::routes::{updated, Accepts, FormBody};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ReviewForm {
    pub note: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReviewView {
    pub payment: Payment,
    pub invoice: Invoice,
    pub outstanding_display: String,
}

impl ReviewView {
    fn new(reviewed: ReviewedPayment, messages: &Messages, currency: &str) -> Self {
        ReviewView {
            outstanding_display: messages.money(reviewed.invoice.outstanding(), currency),
            payment: reviewed.payment,
            invoice: reviewed.invoice,
        }
    }
}

/// `POST /payments/{id}/verify` (form: optional `note`)
pub async fn verify(
    state: State<AppState>,
    id: Path<String>,
    user: AuthUser,
    accepts: Accepts,
    locale: RequestLocale,
    form: FormBody<ReviewForm>,
) -> ApiResult<Response> {
    review(state, id, user, accepts, locale, form, ReviewDecision::Verify).await
}

/// `POST /payments/{id}/reject` (form: `note`, required)
pub async fn reject(
    state: State<AppState>,
    id: Path<String>,
    user: AuthUser,
    accepts: Accepts,
    locale: RequestLocale,
    form: FormBody<ReviewForm>,
) -> ApiResult<Response> {
    review(state, id, user, accepts, locale, form, ReviewDecision::Reject).await
}

async fn review(
    State(state): State<AppState>,
    Path(id): Path<String>,
    user: AuthUser,
    accepts: Accepts,
    locale: RequestLocale,
    WithRejection(Form(form), _): FormBody<ReviewForm>,
    decision: ReviewDecision,
) -> ApiResult<Response> {
    let payment = state
        .db
        .payments()
        .get_by_id(&id)
        .await?
        .ok_or(ApiError::NotFound("Payment"))?;

    let (_, party) = visible_invoice(&state, &user, &payment.invoice_id)
        .await
        .map_err(|err| match err {
            ApiError::NotFound(_) => ApiError::NotFound("Payment"),
            other => other,
        })?;
    party.require_seller()?;

    let reviewed = state
        .db
        .payments()
        .review(&payment.id, decision, &user.id, form.note)
        .await?;

    let location = format!("/invoices/{}", reviewed.invoice.id);
    let view = ReviewView::new(reviewed, &locale.messages(), &state.config.billing.currency);
    Ok(updated(accepts, location, view))
}

#[cfg(test)]
mod tests {
    use crate::test_support::{buyer_token, call, get, invoiced_order, owner_token, post_form, sign, test_state};
    use crate::AppState;
    use axum::http::StatusCode;
    use stitch_core::UserRole;

    async fn submit(state: &AppState, invoice_id: &str, amount: &str) -> String {
        let uri = format!("/invoices/{}/payments", invoice_id);
        let form = format!("method=bank_transfer&amount={}&reference=TRX-{}", amount, amount);
        let (status, body) = call(state, post_form(&uri, &buyer_token(), &form)).await;
        assert_eq!(status, StatusCode::CREATED);

        let payments = body["payments"].as_array().unwrap();
        payments.last().unwrap()["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_partial_then_full_payment() {
        let state = test_state().await;
        let invoice_id = invoiced_order(&state, 50).await;

        let first = submit(&state, &invoice_id, "1500").await;
        let (status, body) = call(&state, post_form(&format!("/payments/{}/verify", first), &owner_token(), "")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["payment"]["status"], "verified");
        assert_eq!(body["payment"]["reviewed_by"], "factory-owner");
        assert_eq!(body["invoice"]["status"], "partially_paid");
        assert_eq!(body["outstanding_display"], "USD 3,000.00");

        let second = submit(&state, &invoice_id, "3000").await;
        let (_, body) = call(&state, post_form(&format!("/payments/{}/verify", second), &owner_token(), "")).await;
        assert_eq!(body["invoice"]["status"], "paid");
        assert_eq!(body["invoice"]["amount_paid_cents"], 450_000);

        let (status, body) = call(&state, post_form(&format!("/payments/{}/verify", second), &owner_token(), "")).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "INVALID_TRANSITION");
    }

    #[tokio::test]
    async fn test_reject_with_note() {
        let state = test_state().await;
        let invoice_id = invoiced_order(&state, 50).await;
        let payment_id = submit(&state, &invoice_id, "500").await;

        let uri = format!("/payments/{}/reject", payment_id);
        let (status, body) = call(&state, post_form(&uri, &owner_token(), "note=Not+on+statement")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["payment"]["status"], "rejected");
        assert_eq!(body["payment"]["review_note"], "Not on statement");
        assert_eq!(body["invoice"]["status"], "unpaid");

        let (_, invoice) = call(&state, get(&format!("/invoices/{}", invoice_id), Some(&buyer_token()))).await;
        assert_eq!(invoice["invoice"]["amount_paid_cents"], 0);
    }

    #[tokio::test]
    async fn test_reject_requires_note() {
        let state = test_state().await;
        let invoice_id = invoiced_order(&state, 50).await;
        let payment_id = submit(&state, &invoice_id, "500").await;

        let uri = format!("/payments/{}/reject", payment_id);
        for form in ["", "note=+++"] {
            let (status, body) = call(&state, post_form(&uri, &owner_token(), form)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["code"], "VALIDATION_ERROR");
            assert_eq!(body["message"], "note is required");
        }

        let (_, invoice) = call(&state, get(&format!("/invoices/{}", invoice_id), Some(&buyer_token()))).await;
        assert_eq!(invoice["payments"][0]["status"], "pending");
        assert_eq!(invoice["invoice"]["status"], "pending_verification");
    }

    #[tokio::test]
    async fn test_reviewer_must_be_seller() {
        let state = test_state().await;
        let invoice_id = invoiced_order(&state, 50).await;
        let payment_id = submit(&state, &invoice_id, "500").await;
        let uri = format!("/payments/{}/verify", payment_id);

        let (status, _) = call(&state, post_form(&uri, &buyer_token(), "")).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let rival = sign("rival-owner", UserRole::Factory);
        let (status, body) = call(&state, post_form(&uri, &rival, "")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Payment not found");

        let (status, _) = call(&state, post_form("/payments/missing/verify", &owner_token(), "")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
