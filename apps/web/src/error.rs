//! # API Errors
//!
//! Every handler returns `Result<_, ApiError>`. An error becomes a JSON body
//! `{ "code": "...", "message": "..." }` with a matching status.
//!
//! ## Localization
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  handler ──Err(ApiError)──► IntoResponse                               │
//! │                              │  status + code + English message         │
//! │                              │  Arc<ApiError> stored in extensions      │
//! │                              ▼                                          │
//! │                   locale::localize_errors (middleware)                  │
//! │                              │  resolves the request Locale            │
//! │                              │  re-renders message via Messages        │
//! │                              ▼                                          │
//! │                           client                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Failures the user cannot fix (database, corrupt rows) are logged with
//! `error!` and rendered as a generic message.

use axum::extract::rejection::{FormRejection, JsonRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use std::sync::Arc;
use stitch_core::{CoreError, Locale, Messages, PricingError, ValidationError};
use stitch_db::DbError;
use tracing::{debug, error};

/// Error body sent to clients.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

/// API error types.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Pricing(#[from] PricingError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Db(#[from] DbError),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    /// HTTP status and machine-readable code.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            ApiError::Forbidden => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            ApiError::Pricing(err) => pricing_status(err),
            ApiError::Core(err) => core_status(err),
            ApiError::Db(err) => match err {
                DbError::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                DbError::UniqueViolation { .. } => (StatusCode::CONFLICT, "ALREADY_EXISTS"),
                DbError::Conflict { .. } => (StatusCode::CONFLICT, "CONFLICT"),
                DbError::Rule(core) => core_status(core),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            },
        }
    }

    /// User-facing message in the caller's language.
    pub fn message(&self, messages: &Messages) -> String {
        match self {
            ApiError::Unauthorized => messages.unauthorized(),
            ApiError::Forbidden => messages.forbidden(),
            ApiError::NotFound(what) => messages.not_found(what),
            ApiError::Validation(err) => messages.validation_error(err),
            ApiError::Pricing(err) => messages.pricing_error(err),
            ApiError::Core(err) => messages.core_error(err),
            ApiError::Db(err) => match err {
                DbError::NotFound { entity, .. } => messages.not_found(entity),
                DbError::UniqueViolation { .. } | DbError::Conflict { .. } => messages.conflict(),
                DbError::Rule(core) => messages.core_error(core),
                _ => messages.internal_error(),
            },
        }
    }

    /// Renders the error for `locale`.
    pub fn to_response(&self, locale: Locale) -> Response {
        let (status, code) = self.status_and_code();
        let body = ErrorBody {
            code,
            message: self.message(&Messages::new(locale)),
        };
        (status, Json(body)).into_response()
    }
}

fn pricing_status(err: &PricingError) -> (StatusCode, &'static str) {
    match err {
        PricingError::InvalidQuantity { .. } => (StatusCode::BAD_REQUEST, "INVALID_QUANTITY"),
        PricingError::TotalOverflow { .. } => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
        PricingError::InvalidTierData { .. }
        | PricingError::OverlappingTiers { .. }
        | PricingError::UnboundedTierNotLast { .. } => (StatusCode::BAD_REQUEST, "INVALID_TIERS"),
    }
}

fn core_status(err: &CoreError) -> (StatusCode, &'static str) {
    match err {
        CoreError::Pricing(inner) => pricing_status(inner),
        CoreError::Validation(_)
        | CoreError::BelowMinimumOrder { .. }
        | CoreError::QuantityTooLarge { .. }
        | CoreError::InvalidPaymentAmount { .. }
        | CoreError::AmountOutOfRange(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
        CoreError::ProductNotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        CoreError::NotPermitted { .. } => (StatusCode::FORBIDDEN, "FORBIDDEN"),
        CoreError::ProductUnavailable(_) => (StatusCode::CONFLICT, "PRODUCT_UNAVAILABLE"),
        CoreError::InvalidTransition { .. } => (StatusCode::CONFLICT, "INVALID_TRANSITION"),
        CoreError::OrderNotInvoiceable { .. } => (StatusCode::CONFLICT, "ORDER_NOT_INVOICEABLE"),
        CoreError::InvoiceNotPayable { .. } => (StatusCode::CONFLICT, "INVOICE_NOT_PAYABLE"),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, _) = self.status_and_code();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }

        let mut response = self.to_response(Locale::default());
        response.extensions_mut().insert(Arc::new(self));
        response
    }
}

// Extractor rejections (unknown enum value, missing field, bad JSON) get the
// same body as every other error.

impl From<FormRejection> for ApiError {
    fn from(rejection: FormRejection) -> Self {
        malformed_body(rejection.body_text())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        malformed_body(rejection.body_text())
    }
}

fn malformed_body(reason: String) -> ApiError {
    debug!(%reason, "Rejected request body");
    ApiError::Validation(ValidationError::MalformedBody { reason })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_quantity_is_bad_request() {
        let err = ApiError::Pricing(PricingError::InvalidQuantity { quantity: 0 });
        assert_eq!(err.status_and_code(), (StatusCode::BAD_REQUEST, "INVALID_QUANTITY"));

        let ar = err.message(&Messages::new(Locale::Ar));
        assert!(!ar.is_empty());
        assert_ne!(ar, err.message(&Messages::new(Locale::En)));
    }

    #[test]
    fn test_rule_inside_db_error() {
        let err = ApiError::Db(DbError::Rule(CoreError::InvalidTransition {
            entity: "order",
            from: "delivered".to_string(),
            to: "pending".to_string(),
        }));
        assert_eq!(err.status_and_code(), (StatusCode::CONFLICT, "INVALID_TRANSITION"));
    }

    #[test]
    fn test_internal_errors_are_generic() {
        let err = ApiError::Db(DbError::Sqlx("disk I/O error at page 7".to_string()));
        let messages = Messages::new(Locale::En);

        assert_eq!(err.status_and_code().0, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message(&messages), messages.internal_error());
    }

    #[test]
    fn test_not_found_names_entity() {
        let err = ApiError::Db(DbError::not_found("Invoice", "inv-1"));
        assert_eq!(err.message(&Messages::new(Locale::En)), "Invoice not found");
    }

    #[test]
    fn test_malformed_body_is_validation_error() {
        let err = malformed_body("missing field `product_id`".to_string());
        assert_eq!(err.status_and_code(), (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"));
        assert_eq!(
            err.message(&Messages::new(Locale::En)),
            "Request body is invalid: missing field `product_id`"
        );
        assert_eq!(err.message(&Messages::new(Locale::Ar)), "بيانات الطلب غير صالحة");
    }
}
