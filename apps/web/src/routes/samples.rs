//! Sample requests.
//!
//! A buyer may ask for a handful of pieces before committing to a bulk
//! order. The charge is `sample_price × quantity`, or free when the product
//! has no sample price.

use axum::extract::{Path, State};
use axum::response::Response;
use axum::{Form, Json};
use axum_extra::extract::WithRejection;
use serde::{Deserialize, Serialize};
use stitch_core::validation::{validate_optional_text, MAX_NOTES_LEN};
use stitch_core::{CoreError, Messages, Money, SampleRequest, SampleStatus, UserRole};
use tracing::info;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::locale::RequestLocale;
use crate::routes::{created, parse_quantity, party_for, updated, Accepts, FormBody, Party};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SampleForm {
    pub product_id: String,
    pub quantity: String,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SampleStatusForm {
    pub status: SampleStatus,
}

#[derive(Debug, Serialize)]
pub struct SampleView {
    pub sample: SampleRequest,
    pub charge_display: String,
    pub next_statuses: Vec<SampleStatus>,
}

impl SampleView {
    fn new(sample: SampleRequest, party: Party, messages: &Messages, currency: &str) -> Self {
        let role = party.acting_role();
        let next_statuses = sample
            .status
            .next_statuses()
            .iter()
            .copied()
            .filter(|next| sample.status.transition(*next, role).is_ok())
            .collect();

        SampleView {
            charge_display: messages.money(Money::from_cents(sample.charge_cents), currency),
            next_statuses,
            sample,
        }
    }
}

async fn visible_sample(state: &AppState, user: &AuthUser, id: &str) -> ApiResult<(SampleRequest, Party)> {
    let sample = state
        .db
        .samples()
        .get_by_id(id)
        .await?
        .ok_or(ApiError::NotFound("Sample request"))?;

    let party = party_for(state, user, &sample.buyer_id, &sample.factory_id)
        .await?
        .ok_or(ApiError::NotFound("Sample request"))?;
    Ok((sample, party))
}

/// `POST /samples` (form)
pub async fn request(
    State(state): State<AppState>,
    user: AuthUser,
    accepts: Accepts,
    locale: RequestLocale,
    WithRejection(Form(form), _): FormBody<SampleForm>,
) -> ApiResult<Response> {
    user.require_role(&[UserRole::Buyer])?;

    let quantity = parse_quantity(&form.quantity)?;
    let notes = validate_optional_text("notes", form.notes.as_deref(), MAX_NOTES_LEN)?;

    let product = state
        .db
        .products()
        .get_by_id(&form.product_id)
        .await?
        .ok_or_else(|| CoreError::ProductNotFound(form.product_id.clone()))?;

    let sample = state.db.samples().create(&user.id, &product, quantity, notes).await?;
    info!(sample_id = %sample.id, buyer = %user.id, "Sample request received");

    let location = format!("/samples/{}", sample.id);
    let view = SampleView::new(sample, Party::Buyer, &locale.messages(), &state.config.billing.currency);
    Ok(created(accepts, location, view))
}

/// `GET /samples/{id}`
pub async fn detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
    user: AuthUser,
    locale: RequestLocale,
) -> ApiResult<Json<SampleView>> {
    let (sample, party) = visible_sample(&state, &user, &id).await?;
    Ok(Json(SampleView::new(
        sample,
        party,
        &locale.messages(),
        &state.config.billing.currency,
    )))
}

/// `POST /samples/{id}/status` (form: `status`)
pub async fn change_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    user: AuthUser,
    accepts: Accepts,
    locale: RequestLocale,
    WithRejection(Form(form), _): FormBody<SampleStatusForm>,
) -> ApiResult<Response> {
    let (mut sample, party) = visible_sample(&state, &user, &id).await?;

    let next = sample.status.transition(form.status, party.acting_role())?;
    state.db.samples().update_status(&sample.id, sample.status, next).await?;

    sample.status = next;
    let location = format!("/samples/{}", sample.id);
    let view = SampleView::new(sample, party, &locale.messages(), &state.config.billing.currency);
    Ok(updated(accepts, location, view))
}

#[cfg(test)]
mod tests {
    use crate::test_support::{buyer_token, call, get, owner_token, post_form, seed_catalog, sign, test_state};
    use axum::http::StatusCode;
    use stitch_core::UserRole;

    #[tokio::test]
    async fn test_request_sample_charge() {
        let state = test_state().await;
        let (_, product) = seed_catalog(&state).await;

        let form = format!("product_id={}&quantity=2", product.id);
        let (status, body) = call(&state, post_form("/samples", &buyer_token(), &form)).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["sample"]["charge_cents"], 3100);
        assert_eq!(body["sample"]["status"], "requested");
        assert_eq!(body["charge_display"], "USD 31.00");
    }

    #[tokio::test]
    async fn test_sample_quantity_limits() {
        let state = test_state().await;
        let (_, product) = seed_catalog(&state).await;

        let form = format!("product_id={}&quantity=11", product.id);
        let (status, body) = call(&state, post_form("/samples", &buyer_token(), &form)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");

        let (status, body) = call(&state, post_form("/samples", &buyer_token(), "product_id=nope&quantity=1")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_inactive_product_refused() {
        let state = test_state().await;
        let (_, product) = seed_catalog(&state).await;
        state.db.products().set_active(&product.id, false).await.unwrap();

        let form = format!("product_id={}&quantity=1", product.id);
        let (status, body) = call(&state, post_form("/samples", &buyer_token(), &form)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "PRODUCT_UNAVAILABLE");
    }

    #[tokio::test]
    async fn test_sample_lifecycle() {
        let state = test_state().await;
        let (_, product) = seed_catalog(&state).await;

        let form = format!("product_id={}&quantity=1", product.id);
        let (_, body) = call(&state, post_form("/samples", &buyer_token(), &form)).await;
        let id = body["sample"]["id"].as_str().unwrap().to_string();
        let uri = format!("/samples/{}/status", id);

        // only the factory approves
        let (status, _) = call(&state, post_form(&uri, &buyer_token(), "status=approved")).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = call(&state, post_form(&uri, &owner_token(), "status=approved")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["next_statuses"], serde_json::json!(["shipped"]));

        let (_, _) = call(&state, post_form(&uri, &owner_token(), "status=shipped")).await;
        let (status, body) = call(&state, post_form(&uri, &buyer_token(), "status=delivered")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["sample"]["status"], "delivered");

        let (status, body) = call(&state, post_form(&uri, &owner_token(), "status=declined")).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "INVALID_TRANSITION");

        let stranger = sign("buyer-2", UserRole::Buyer);
        let (status, _) = call(&state, get(&format!("/samples/{}", id), Some(&stranger))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
