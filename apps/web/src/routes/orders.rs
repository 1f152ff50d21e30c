//! # Orders
//!
//! ## Placement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  POST /orders  (product_id, quantity, notes)                           │
//! │       │                                                                 │
//! │       ├─► parse quantity ("abc" → 400 VALIDATION_ERROR)                │
//! │       ├─► load product + stored tiers (bad rows: warn!, skipped)       │
//! │       ├─► quote_order: active? qty ≥ 1? ≤ max? ≥ MOQ? → PriceQuote     │
//! │       └─► db.orders().create  (unit price + name frozen on the order)  │
//! │                                                                         │
//! │  The total shown by the calculator is advisory; this one is stored.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use axum::extract::{Path, State};
use axum::response::Response;
use axum::{Form, Json};
use axum_extra::extract::WithRejection;
use serde::{Deserialize, Serialize};
use stitch_core::orders::quote_order;
use stitch_core::validation::{validate_optional_text, MAX_NOTES_LEN};
use stitch_core::{CoreError, Invoice, Messages, Money, Order, OrderStatus, UserRole};
use tracing::{info, warn};

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::locale::RequestLocale;
use crate::routes::invoices::InvoiceView;
use crate::routes::products::usable_tiers;
use crate::routes::{created, parse_quantity, party_for, updated, Accepts, FormBody, Party, PAGE_SIZE};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PlaceOrderForm {
    pub product_id: String,
    pub quantity: String,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OrderStatusForm {
    pub status: OrderStatus,
}

#[derive(Debug, Serialize)]
pub struct OrderView {
    pub order: Order,
    pub total_display: String,
    /// Moves the caller may make from here.
    pub next_statuses: Vec<OrderStatus>,
    pub invoice: Option<Invoice>,
}

impl OrderView {
    fn new(order: Order, invoice: Option<Invoice>, party: Party, messages: &Messages, currency: &str) -> Self {
        let role = party.acting_role();
        let next_statuses = order
            .status
            .next_statuses()
            .iter()
            .copied()
            .filter(|next| order.status.transition(*next, role).is_ok())
            .collect();

        OrderView {
            total_display: messages.money(Money::from_cents(order.total_cents), currency),
            next_statuses,
            invoice,
            order,
        }
    }
}

async fn load_order(state: &AppState, id: &str) -> ApiResult<Order> {
    state
        .db
        .orders()
        .get_by_id(id)
        .await?
        .ok_or(ApiError::NotFound("Order"))
}

/// Loads an order the caller is a party to; strangers get `NotFound`.
async fn visible_order(state: &AppState, user: &AuthUser, id: &str) -> ApiResult<(Order, Party)> {
    let order = load_order(state, id).await?;
    let party = party_for(state, user, &order.buyer_id, &order.factory_id)
        .await?
        .ok_or(ApiError::NotFound("Order"))?;
    Ok((order, party))
}

/// `GET /orders`: the buyer's orders, or those received by the caller's
/// factories.
pub async fn list(State(state): State<AppState>, user: AuthUser) -> ApiResult<Json<Vec<Order>>> {
    let orders = match user.role {
        UserRole::Buyer => state.db.orders().list_for_buyer(&user.id, PAGE_SIZE).await?,
        UserRole::Factory => {
            let mut orders = Vec::new();
            for factory in state.db.factories().list_by_owner(&user.id).await? {
                orders.extend(state.db.orders().list_for_factory(&factory.id, PAGE_SIZE).await?);
            }
            orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            orders.truncate(PAGE_SIZE as usize);
            orders
        }
        UserRole::Admin => return Err(ApiError::Forbidden),
    };

    Ok(Json(orders))
}

/// `POST /orders` (form)
pub async fn place(
    State(state): State<AppState>,
    user: AuthUser,
    accepts: Accepts,
    locale: RequestLocale,
    WithRejection(Form(form), _): FormBody<PlaceOrderForm>,
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

    let records = state.db.products().tier_records(&product.id).await?;
    let tiers = usable_tiers(&product.id, &records);
    let quote = quote_order(&product, &tiers, quantity)?;
    if quote.overlap {
        warn!(product_id = %product.id, quantity, "Overlapping price tiers matched");
    }

    let order = state.db.orders().create(&user.id, &product, &quote, notes).await?;
    info!(order_number = %order.order_number, buyer = %user.id, "Order received");

    let location = format!("/orders/{}", order.id);
    let view = OrderView::new(
        order,
        None,
        Party::Buyer,
        &locale.messages(),
        &state.config.billing.currency,
    );
    Ok(created(accepts, location, view))
}

/// `GET /orders/{id}`
pub async fn detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
    user: AuthUser,
    locale: RequestLocale,
) -> ApiResult<Json<OrderView>> {
    let (order, party) = visible_order(&state, &user, &id).await?;
    let invoice = state.db.invoices().get_by_order(&order.id).await?;

    Ok(Json(OrderView::new(
        order,
        invoice,
        party,
        &locale.messages(),
        &state.config.billing.currency,
    )))
}

/// `POST /orders/{id}/status` (form: `status`)
pub async fn change_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    user: AuthUser,
    accepts: Accepts,
    locale: RequestLocale,
    WithRejection(Form(form), _): FormBody<OrderStatusForm>,
) -> ApiResult<Response> {
    let (order, party) = visible_order(&state, &user, &id).await?;

    let next = order.status.transition(form.status, party.acting_role())?;
    state.db.orders().update_status(&order.id, order.status, next).await?;
    info!(order_number = %order.order_number, from = %order.status, to = %next, user = %user.id, "Order status updated");

    let order = load_order(&state, &id).await?;
    let invoice = state.db.invoices().get_by_order(&order.id).await?;
    let location = format!("/orders/{}", order.id);
    let view = OrderView::new(
        order,
        invoice,
        party,
        &locale.messages(),
        &state.config.billing.currency,
    );
    Ok(updated(accepts, location, view))
}

/// `POST /orders/{id}/invoice`: issues the order's invoice.
pub async fn issue_invoice(
    State(state): State<AppState>,
    Path(id): Path<String>,
    user: AuthUser,
    accepts: Accepts,
    locale: RequestLocale,
) -> ApiResult<Response> {
    let (order, party) = visible_order(&state, &user, &id).await?;
    party.require_seller()?;

    let invoice = state
        .db
        .invoices()
        .create_for_order(&order, state.config.billing.payment_terms_days)
        .await?;

    let location = format!("/invoices/{}", invoice.id);
    let view = InvoiceView::new(invoice, Vec::new(), &locale.messages(), &state.config.billing.currency);
    Ok(created(accepts, location, view))
}
