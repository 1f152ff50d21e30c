//! # Stitch Market Web
//!
//! HTTP server for the marketplace.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Request Pipeline                               │
//! │                                                                         │
//! │  request ──► TraceLayer ──► localize_errors ──► Router ──► handler     │
//! │                (span)        (Locale per req)      │         │          │
//! │                                                    │         ▼          │
//! │                                        AuthUser / RequestLocale         │
//! │                                        extractors  │   stitch-core      │
//! │                                                    │   (pricing, rules) │
//! │                                                    ▼         │          │
//! │                                               stitch-db ◄────┘          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! See [`config`]: `stitch.toml` (or `STITCH_CONFIG`) plus `STITCH__*`
//! environment variables. `STITCH__AUTH__JWT_SECRET` is required.

pub mod auth;
pub mod config;
pub mod error;
pub mod locale;
pub mod routes;
pub mod state;

use axum::middleware;
use axum::Router;
use tower_http::trace::TraceLayer;

pub use config::WebConfig;
pub use error::{ApiError, ApiResult};
pub use state::AppState;

/// Builds the application router.
pub fn app(state: AppState) -> Router {
    routes::router()
        .layer(middleware::from_fn_with_state(state.clone(), locale::localize_errors))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// Test Fixtures
// =============================================================================

#[cfg(test)]
pub(crate) mod test_support {
    use axum::body::{to_bytes, Body};
    use axum::http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
    use axum::http::{Request, StatusCode};
    use chrono::Utc;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use rust_decimal::Decimal;
    use serde_json::Value;
    use stitch_core::{Factory, PriceTier, Product, UserRole};
    use stitch_db::repository::generate_id;
    use stitch_db::{Database, DbConfig};
    use tower::ServiceExt;

    use crate::auth::Claims;
    use crate::{app, AppState, WebConfig};

    pub const TEST_SECRET: &str = "test-secret";
    pub const TEST_AUDIENCE: &str = "authenticated";

    pub const BUYER: &str = "buyer-1";
    pub const OWNER: &str = "factory-owner";

    pub fn test_config() -> WebConfig {
        let builder = ::config::Config::builder()
            .set_override("auth.jwt_secret", TEST_SECRET)
            .unwrap();
        WebConfig::from_builder(builder).unwrap()
    }

    pub async fn test_state() -> AppState {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        AppState::new(db, test_config())
    }

    pub fn sign_with(sub: &str, role: UserRole, audience: &str, ttl_secs: i64) -> String {
        let claims = Claims {
            sub: sub.to_string(),
            email: format!("{}@example.com", sub),
            role,
            aud: audience.to_string(),
            exp: (Utc::now().timestamp() + ttl_secs) as usize,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
        )
        .unwrap()
    }

    pub fn sign(sub: &str, role: UserRole) -> String {
        sign_with(sub, role, TEST_AUDIENCE, 3600)
    }

    pub fn buyer_token() -> String {
        sign(BUYER, UserRole::Buyer)
    }

    pub fn owner_token() -> String {
        sign(OWNER, UserRole::Factory)
    }

    /// A factory owned by [`OWNER`] with one hoodie product:
    /// base 120, MOQ 10, tiers 1-49 @ 100, 50-199 @ 90, 200+ @ 75.
    pub async fn seed_catalog(state: &AppState) -> (Factory, Product) {
        let now = Utc::now();
        let factory = Factory {
            id: generate_id(),
            owner_id: OWNER.to_string(),
            name: "Nile Fleece Works".to_string(),
            location: "Mahalla".to_string(),
            description: None,
            specialties: Some("fleece".to_string()),
            is_verified: true,
            created_at: now,
            updated_at: now,
        };
        state.db.factories().insert(&factory).await.unwrap();

        let product = Product {
            id: generate_id(),
            factory_id: factory.id.clone(),
            name: "Heavyweight Hoodie".to_string(),
            description: None,
            category: Some("outerwear".to_string()),
            base_price: Decimal::from(120),
            moq: 10,
            sample_price: Some(Decimal::new(1550, 2)),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        let tiers = vec![
            PriceTier::new(1, Some(49), Decimal::from(100)).unwrap(),
            PriceTier::new(50, Some(199), Decimal::from(90)).unwrap(),
            PriceTier::new(200, None, Decimal::from(75)).unwrap(),
        ];
        state.db.products().insert(&product, &tiers).await.unwrap();

        (factory, product)
    }

    /// Seeds the catalog, places a buyer order for `quantity`, confirms it
    /// and issues its invoice. Returns the invoice id.
    pub async fn invoiced_order(state: &AppState, quantity: i64) -> String {
        let (_, product) = seed_catalog(state).await;

        let form = format!("product_id={}&quantity={}", product.id, quantity);
        let (_, placed) = call(state, post_form("/orders", &buyer_token(), &form)).await;
        let order_id = placed["order"]["id"].as_str().unwrap().to_string();

        let uri = format!("/orders/{}/status", order_id);
        let (status, _) = call(state, post_form(&uri, &owner_token(), "status=confirmed")).await;
        assert_eq!(status, StatusCode::OK);

        let uri = format!("/orders/{}/invoice", order_id);
        let (_, issued) = call(state, post_form(&uri, &owner_token(), "")).await;
        issued["invoice"]["id"].as_str().unwrap().to_string()
    }

    pub fn get(uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::get(uri).header(ACCEPT, "application/json");
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        builder.body(Body::empty()).unwrap()
    }

    /// Form post asking for a JSON answer.
    pub fn post_form(uri: &str, token: &str, form: &str) -> Request<Body> {
        Request::post(uri)
            .header(ACCEPT, "application/json")
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(form.to_string()))
            .unwrap()
    }

    pub fn send_json(method: &str, uri: &str, token: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(ACCEPT, "application/json")
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    /// Runs one request through a fresh router; the body is parsed as JSON
    /// (`Value::Null` when empty).
    pub async fn call(state: &AppState, request: Request<Body>) -> (StatusCode, Value) {
        let response = app(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();

        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }
}
