//! # HTTP Routes
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  GET  /health                        liveness + database               │
//! │  GET  /factories  /factories/{id}    browse                            │
//! │  GET  /products   /products/{id}     browse                            │
//! │  GET  /products/{id}/quote           live price calculator             │
//! │  POST /products  PUT /products/{id}/tiers          factory owner       │
//! │  GET  /orders  POST /orders  GET /orders/{id}                          │
//! │  POST /orders/{id}/status  /orders/{id}/invoice                        │
//! │  POST /samples  GET /samples/{id}  POST /samples/{id}/status           │
//! │  GET  /invoices/{id}  POST /invoices/{id}/payments  /invoices/{id}/cancel
//! │  POST /payments/{id}/verify  /payments/{id}/reject                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Form posts answer `303 See Other` pointing at the affected record, or the
//! record itself as JSON when the client sends `Accept: application/json`.
//!
//! Records are visible only to their parties (the buyer, the owner of the
//! factory, admins); anyone else gets `404` rather than `403`.

pub mod factories;
pub mod health;
pub mod invoices;
pub mod orders;
pub mod payments;
pub mod products;
pub mod samples;

use axum::extract::FromRequestParts;
use axum::http::header::{ACCEPT, LOCATION};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post, put};
use axum::{Form, Json, Router};
use axum_extra::extract::WithRejection;
use serde::Serialize;
use std::convert::Infallible;
use stitch_core::{UserRole, ValidationError};

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Page size for list endpoints.
pub const PAGE_SIZE: u32 = 50;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/factories", get(factories::list))
        .route("/factories/{id}", get(factories::detail))
        .route("/products", get(products::list).post(products::create))
        .route("/products/{id}", get(products::detail))
        .route("/products/{id}/quote", get(products::quote))
        .route("/products/{id}/tiers", put(products::replace_tiers))
        .route("/orders", get(orders::list).post(orders::place))
        .route("/orders/{id}", get(orders::detail))
        .route("/orders/{id}/status", post(orders::change_status))
        .route("/orders/{id}/invoice", post(orders::issue_invoice))
        .route("/samples", post(samples::request))
        .route("/samples/{id}", get(samples::detail))
        .route("/samples/{id}/status", post(samples::change_status))
        .route("/invoices/{id}", get(invoices::detail))
        .route("/invoices/{id}/payments", post(invoices::submit_payment))
        .route("/invoices/{id}/cancel", post(invoices::cancel))
        .route("/payments/{id}/verify", post(payments::verify))
        .route("/payments/{id}/reject", post(payments::reject))
}

// =============================================================================
// Parties
// =============================================================================

/// How the signed-in user relates to an order, sample, invoice or payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Party {
    Buyer,
    FactoryOwner,
    Admin,
}

impl Party {
    /// Role used for lifecycle permission checks.
    pub fn acting_role(self) -> UserRole {
        match self {
            Party::Buyer => UserRole::Buyer,
            Party::FactoryOwner => UserRole::Factory,
            Party::Admin => UserRole::Admin,
        }
    }

    /// Fails with `Forbidden` for the buyer side.
    pub fn require_seller(self) -> ApiResult<()> {
        match self {
            Party::FactoryOwner | Party::Admin => Ok(()),
            Party::Buyer => Err(ApiError::Forbidden),
        }
    }
}

/// Works out the caller's party for a record, `None` if they are a stranger.
pub async fn party_for(
    state: &AppState,
    user: &AuthUser,
    buyer_id: &str,
    factory_id: &str,
) -> ApiResult<Option<Party>> {
    let party = match user.role {
        UserRole::Admin => Some(Party::Admin),
        UserRole::Buyer => (user.id == buyer_id).then_some(Party::Buyer),
        UserRole::Factory => owns_factory(state, user, factory_id)
            .await?
            .then_some(Party::FactoryOwner),
    };

    Ok(party)
}

/// True when `user` owns the factory.
pub async fn owns_factory(state: &AppState, user: &AuthUser, factory_id: &str) -> ApiResult<bool> {
    let factory = state.db.factories().get_by_id(factory_id).await?;
    Ok(factory.is_some_and(|f| f.owner_id == user.id))
}

/// Fails unless `user` owns the factory or is an admin.
pub async fn require_factory_owner(state: &AppState, user: &AuthUser, factory_id: &str) -> ApiResult<()> {
    let factory = state
        .db
        .factories()
        .get_by_id(factory_id)
        .await?
        .ok_or(ApiError::NotFound("Factory"))?;

    if user.is_admin() || (user.role == UserRole::Factory && factory.owner_id == user.id) {
        Ok(())
    } else {
        Err(ApiError::Forbidden)
    }
}

// =============================================================================
// Form Helpers
// =============================================================================

/// A urlencoded form; a body that does not fit `T` answers `VALIDATION_ERROR`.
pub type FormBody<T> = WithRejection<Form<T>, ApiError>;

/// A JSON document; a body that does not fit `T` answers `VALIDATION_ERROR`.
pub type JsonBody<T> = WithRejection<Json<T>, ApiError>;

/// Parses a whole-number quantity from form text.
///
/// Only the format is checked here; `<= 0` is reported by pricing as
/// `InvalidQuantity`.
pub fn parse_quantity(raw: &str) -> ApiResult<i64> {
    raw.trim().parse::<i64>().map_err(|_| {
        ApiError::Validation(ValidationError::InvalidFormat {
            field: "quantity".to_string(),
            reason: "must be a whole number".to_string(),
        })
    })
}

/// Trims optional form text; blank becomes `None`.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// =============================================================================
// Responses
// =============================================================================

/// Whether the client asked for JSON rather than a redirect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Accepts {
    pub json: bool,
}

impl<S: Send + Sync> FromRequestParts<S> for Accepts {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let json = parts
            .headers
            .get(ACCEPT)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.contains("application/json"));

        Ok(Accepts { json })
    }
}

/// `201` + JSON, or `303` to `location`.
pub fn created<T: Serialize>(accepts: Accepts, location: String, body: T) -> Response {
    if accepts.json {
        (StatusCode::CREATED, [(LOCATION, location)], Json(body)).into_response()
    } else {
        Redirect::to(&location).into_response()
    }
}

/// `200` + JSON, or `303` to `location`.
pub fn updated<T: Serialize>(accepts: Accepts, location: String, body: T) -> Response {
    if accepts.json {
        Json(body).into_response()
    } else {
        Redirect::to(&location).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity(" 50 ").unwrap(), 50);
        assert_eq!(parse_quantity("0").unwrap(), 0);
        assert!(matches!(parse_quantity("fifty"), Err(ApiError::Validation(_))));
        assert!(matches!(parse_quantity("1.5"), Err(ApiError::Validation(_))));
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some("  TRX-1 ".to_string())), Some("TRX-1".to_string()));
        assert_eq!(non_blank(Some("   ".to_string())), None);
        assert_eq!(non_blank(None), None);
    }

    #[test]
    fn test_acting_role() {
        assert_eq!(Party::FactoryOwner.acting_role(), UserRole::Factory);
        assert!(Party::Buyer.require_seller().is_err());
        assert!(Party::Admin.require_seller().is_ok());
    }
}
