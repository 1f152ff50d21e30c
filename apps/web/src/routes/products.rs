//! # Products & Price Calculator
//!
//! Browsing, the live quote used by the order form, and product / tier
//! authoring by factory owners.
//!
//! ## Tier Data Policy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Write (POST /products, PUT /products/{id}/tiers)                      │
//! │    validate_tier_set(records)  → any bad record rejects the request    │
//! │                                                                         │
//! │  Read (GET /products/{id}, quote, POST /orders)                        │
//! │    parse_tier_records(stored)  → bad rows skipped + warn! logged       │
//! │                                  pricing uses the valid remainder      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use axum_extra::extract::WithRejection;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use stitch_core::pricing::resolve_from_records;
use stitch_core::tiers::{parse_tier_records, validate_tier_set};
use stitch_core::validation::{validate_moq, validate_name, validate_optional_text, validate_price};
use stitch_core::{Money, PriceQuote, PriceTier, PricingError, Product, TierRecord, UserRole, ValidationError};
use stitch_db::repository::generate_id;
use tracing::{info, warn};
use ts_rs::TS;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::locale::RequestLocale;
use crate::routes::{non_blank, parse_quantity, require_factory_owner, JsonBody, PAGE_SIZE};
use crate::state::AppState;

const MAX_NAME_LEN: usize = 200;
const MAX_DESCRIPTION_LEN: usize = 2000;
const MAX_CATEGORY_LEN: usize = 50;

// =============================================================================
// DTOs
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    #[serde(default)]
    pub q: String,
    pub category: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProductDetail {
    pub product: Product,
    /// Sorted by `min_quantity`.
    pub tiers: Vec<PriceTier>,
}

#[derive(Debug, Deserialize)]
pub struct QuoteParams {
    pub quantity: Option<String>,
}

/// Answer of the live price calculator.
#[derive(Debug, Serialize, TS)]
#[ts(export)]
pub struct QuoteView {
    pub quote: PriceQuote,
    pub unit_price_display: String,
    pub total_display: String,
    pub moq: i64,
    pub meets_moq: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub factory_id: String,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub base_price: String,
    pub moq: i64,
    pub sample_price: Option<String>,
    #[serde(default)]
    pub tiers: Vec<TierRecord>,
}

#[derive(Debug, Deserialize)]
pub struct ReplaceTiersRequest {
    pub tiers: Vec<TierRecord>,
}

// =============================================================================
// Helpers
// =============================================================================

/// Stored tiers usable for pricing; malformed rows are logged and dropped.
pub fn usable_tiers(product_id: &str, records: &[TierRecord]) -> Vec<PriceTier> {
    let (mut tiers, rejected) = parse_tier_records(records);
    log_rejected(product_id, &rejected);
    tiers.sort_by_key(PriceTier::min_quantity);
    tiers
}

fn log_rejected(product_id: &str, rejected: &[PricingError]) {
    for err in rejected {
        warn!(product_id = %product_id, error = %err, "Skipping malformed price tier");
    }
}

pub async fn load_product(state: &AppState, id: &str) -> ApiResult<Product> {
    state
        .db
        .products()
        .get_by_id(id)
        .await?
        .ok_or(ApiError::NotFound("Product"))
}

async fn product_detail(state: &AppState, product: Product) -> ApiResult<ProductDetail> {
    let records = state.db.products().tier_records(&product.id).await?;
    let tiers = usable_tiers(&product.id, &records);
    Ok(ProductDetail { product, tiers })
}

// =============================================================================
// Handlers
// =============================================================================

/// `GET /products?q=&category=`
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> ApiResult<Json<Vec<Product>>> {
    let products = state
        .db
        .products()
        .search(&query.q, query.category.as_deref(), PAGE_SIZE)
        .await?;
    Ok(Json(products))
}

/// `GET /products/{id}`
pub async fn detail(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<ProductDetail>> {
    let product = load_product(&state, &id).await?;
    Ok(Json(product_detail(&state, product).await?))
}

/// `GET /products/{id}/quote?quantity=`
///
/// Prices any positive quantity; `meets_moq` tells the form whether the
/// order could be placed.
pub async fn quote(
    State(state): State<AppState>,
    Path(id): Path<String>,
    locale: RequestLocale,
    Query(params): Query<QuoteParams>,
) -> ApiResult<Json<QuoteView>> {
    let raw = params.quantity.ok_or_else(|| ValidationError::Required {
        field: "quantity".to_string(),
    })?;
    let quantity = parse_quantity(&raw)?;

    let product = load_product(&state, &id).await?;
    let records = state.db.products().tier_records(&product.id).await?;

    let result = resolve_from_records(product.base_price, &records, quantity)?;
    log_rejected(&product.id, &result.rejected);
    if result.quote.overlap {
        warn!(product_id = %product.id, quantity, "Overlapping price tiers matched");
    }

    let messages = locale.messages();
    let currency = &state.config.billing.currency;
    let unit_price = Money::from_decimal(result.quote.unit_price)?;
    let total = result.quote.total_money()?;

    Ok(Json(QuoteView {
        unit_price_display: messages.money(unit_price, currency),
        total_display: messages.money(total, currency),
        moq: product.moq,
        meets_moq: quantity >= product.moq,
        quote: result.quote,
    }))
}

/// `POST /products` (JSON): creates a product with its tiers.
pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    WithRejection(Json(req), _): JsonBody<CreateProductRequest>,
) -> ApiResult<(StatusCode, Json<ProductDetail>)> {
    user.require_role(&[UserRole::Factory, UserRole::Admin])?;
    require_factory_owner(&state, &user, &req.factory_id).await?;

    let name = validate_name("name", &req.name, MAX_NAME_LEN)?;
    let description = validate_optional_text("description", req.description.as_deref(), MAX_DESCRIPTION_LEN)?;
    let category = validate_optional_text("category", req.category.as_deref(), MAX_CATEGORY_LEN)?
        .map(|c| c.to_lowercase());
    let base_price = validate_price("base_price", &req.base_price)?;
    let sample_price = non_blank(req.sample_price)
        .map(|p| validate_price("sample_price", &p))
        .transpose()?;
    validate_moq(req.moq)?;
    let tiers = validate_tier_set(&req.tiers)?;

    let now = Utc::now();
    let product = Product {
        id: generate_id(),
        factory_id: req.factory_id,
        name,
        description,
        category,
        base_price,
        moq: req.moq,
        sample_price,
        is_active: true,
        created_at: now,
        updated_at: now,
    };

    state.db.products().insert(&product, &tiers).await?;
    info!(product_id = %product.id, tiers = tiers.len(), user = %user.id, "Product created");

    Ok((StatusCode::CREATED, Json(ProductDetail { product, tiers })))
}

/// `PUT /products/{id}/tiers` (JSON): replaces the whole tier set.
pub async fn replace_tiers(
    State(state): State<AppState>,
    Path(id): Path<String>,
    user: AuthUser,
    WithRejection(Json(req), _): JsonBody<ReplaceTiersRequest>,
) -> ApiResult<Json<ProductDetail>> {
    let product = load_product(&state, &id).await?;
    require_factory_owner(&state, &user, &product.factory_id).await?;

    let tiers = validate_tier_set(&req.tiers)?;
    state.db.products().replace_tiers(&product.id, &tiers).await?;
    info!(product_id = %product.id, tiers = tiers.len(), user = %user.id, "Price tiers replaced");

    Ok(Json(ProductDetail { product, tiers }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{buyer_token, call, get, owner_token, seed_catalog, send_json, sign, test_state};
    use axum::body::Body;
    use axum::http::header::ACCEPT_LANGUAGE;
    use axum::http::Request;
    use serde_json::json;

    #[tokio::test]
    async fn test_quote_worked_example() {
        let state = test_state().await;
        let (_, product) = seed_catalog(&state).await;

        for (quantity, unit, total) in [(10, "100", "1000"), (50, "90", "4500"), (200, "75", "15000"), (5000, "75", "375000")] {
            let uri = format!("/products/{}/quote?quantity={}", product.id, quantity);
            let (status, body) = call(&state, get(&uri, None)).await;

            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["quote"]["unit_price"], unit);
            assert_eq!(body["quote"]["total"], total);
            assert_eq!(body["meets_moq"], true);
        }
    }

    #[tokio::test]
    async fn test_quote_below_moq_and_display() {
        let state = test_state().await;
        let (_, product) = seed_catalog(&state).await;

        let uri = format!("/products/{}/quote?quantity=5", product.id);
        let (status, body) = call(&state, get(&uri, None)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["meets_moq"], false);
        assert_eq!(body["total_display"], "USD 500.00");
    }

    #[tokio::test]
    async fn test_quote_zero_is_invalid_quantity() {
        let state = test_state().await;
        let (_, product) = seed_catalog(&state).await;

        let uri = format!("/products/{}/quote?quantity=0", product.id);
        let (status, body) = call(&state, get(&uri, None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_QUANTITY");
        assert_eq!(body["message"], "Quantity must be at least 1");
    }

    #[tokio::test]
    async fn test_quote_error_is_localized() {
        let state = test_state().await;
        let (_, product) = seed_catalog(&state).await;

        let request = Request::get(format!("/products/{}/quote?quantity=0", product.id))
            .header(ACCEPT_LANGUAGE, "ar")
            .body(Body::empty())
            .unwrap();
        let (status, body) = call(&state, request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "الكمية يجب أن تكون 1 على الأقل");
    }

    #[tokio::test]
    async fn test_quote_skips_malformed_stored_tier() {
        let state = test_state().await;
        let (_, product) = seed_catalog(&state).await;

        sqlx_insert_bad_tier(&state, &product.id).await;

        let uri = format!("/products/{}/quote?quantity=260", product.id);
        let (status, body) = call(&state, get(&uri, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["quote"]["unit_price"], "75");

        let (_, body) = call(&state, get(&format!("/products/{}", product.id), None)).await;
        assert_eq!(body["tiers"].as_array().unwrap().len(), 3);
    }

    /// A backwards range written outside the validated path.
    async fn sqlx_insert_bad_tier(state: &AppState, product_id: &str) {
        sqlx::query(
            "INSERT INTO price_tiers (id, product_id, min_quantity, max_quantity, price)
             VALUES ('legacy', ?1, 300, 250, '10')",
        )
        .bind(product_id)
        .execute(state.db.pool())
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_create_product() {
        let state = test_state().await;
        let (factory, _) = seed_catalog(&state).await;

        let body = json!({
            "factory_id": factory.id,
            "name": "Denim Jacket",
            "category": "Outerwear",
            "base_price": "200",
            "moq": 20,
            "sample_price": "",
            "tiers": [
                { "min_quantity": 100, "max_quantity": null, "price": "150" },
                { "min_quantity": 20, "max_quantity": 99, "price": "180" }
            ]
        });
        let (status, created) = call(&state, send_json("POST", "/products", &owner_token(), &body)).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["product"]["category"], "outerwear");
        assert!(created["product"]["sample_price"].is_null());
        assert_eq!(created["tiers"][0]["min_quantity"], 20);
    }

    #[tokio::test]
    async fn test_create_rejects_overlapping_tiers() {
        let state = test_state().await;
        let (factory, _) = seed_catalog(&state).await;

        let body = json!({
            "factory_id": factory.id,
            "name": "Denim Jacket",
            "base_price": "200",
            "moq": 1,
            "tiers": [
                { "min_quantity": 1, "max_quantity": 100, "price": "180" },
                { "min_quantity": 50, "max_quantity": null, "price": "150" }
            ]
        });
        let (status, err) = call(&state, send_json("POST", "/products", &owner_token(), &body)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(err["code"], "INVALID_TIERS");
    }

    #[tokio::test]
    async fn test_only_owner_edits_tiers() {
        let state = test_state().await;
        let (_, product) = seed_catalog(&state).await;
        let uri = format!("/products/{}/tiers", product.id);
        let body = json!({ "tiers": [{ "min_quantity": 1, "max_quantity": null, "price": "99" }] });

        let (status, _) = call(&state, send_json("PUT", &uri, &buyer_token(), &body)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let intruder = sign("other-owner", UserRole::Factory);
        let (status, _) = call(&state, send_json("PUT", &uri, &intruder, &body)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, updated) = call(&state, send_json("PUT", &uri, &owner_token(), &body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["tiers"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_requires_token() {
        let state = test_state().await;
        let request = Request::post("/products")
            .header("content-type", "application/json")
            .body(Body::from("{}"))
            .unwrap();
        let (status, body) = call(&state, request).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn test_malformed_json_gets_error_body() {
        let state = test_state().await;
        let (factory, product) = seed_catalog(&state).await;

        let body = json!({ "factory_id": factory.id, "name": "Tee", "base_price": "5", "moq": "many", "tiers": [] });
        let (status, err) = call(&state, send_json("POST", "/products", &owner_token(), &body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(err["code"], "VALIDATION_ERROR");
        assert!(err["message"].as_str().unwrap().starts_with("Request body is invalid"));

        let uri = format!("/products/{}/tiers", product.id);
        let request = Request::put(uri)
            .header("authorization", format!("Bearer {}", owner_token()))
            .header("content-type", "application/json")
            .header(ACCEPT_LANGUAGE, "ar")
            .body(Body::from("{\"tiers\": [}"))
            .unwrap();
        let (status, err) = call(&state, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(err["code"], "VALIDATION_ERROR");
        assert_eq!(err["message"], "بيانات الطلب غير صالحة");
    }
}
