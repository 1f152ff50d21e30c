//! Factory directory.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use stitch_core::{Factory, Product};
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::routes::PAGE_SIZE;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct FactoryQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Serialize)]
pub struct FactoryDetail {
    pub factory: Factory,
    /// Active products only.
    pub products: Vec<Product>,
}

/// `GET /factories?q=`: verified factories first.
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<FactoryQuery>,
) -> ApiResult<Json<Vec<Factory>>> {
    debug!(q = %query.q, "Searching factories");
    let factories = state.db.factories().search(query.q.trim(), PAGE_SIZE).await?;
    Ok(Json(factories))
}

/// `GET /factories/{id}`
pub async fn detail(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<FactoryDetail>> {
    let factory = state
        .db
        .factories()
        .get_by_id(&id)
        .await?
        .ok_or(ApiError::NotFound("Factory"))?;

    let products = state.db.products().list_by_factory(&factory.id).await?;

    Ok(Json(FactoryDetail { factory, products }))
}
