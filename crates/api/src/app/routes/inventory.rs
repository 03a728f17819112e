use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    routing::{get, post, put},
};

use maintops_core::{MaterialId, SiteId};
use maintops_infra::services::{InventoryLine, SiteInventory};
use maintops_inventory::Withdrawal;

use crate::app::dto::{Results, StockLevelsRequest, StockMoveRequest};
use crate::app::errors::ApiResult;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/inventory", get(list_inventory))
        .route("/inventory/reserve", post(reserve))
        .route("/inventory/consume", post(consume))
        .route("/inventory/add", post(add))
        .route("/sites/:id/inventory", get(site_inventory))
        .route("/sites/:id/inventory/:material_id", put(set_levels))
}

pub async fn list_inventory(
    Extension(services): Extension<Arc<AppServices>>,
) -> ApiResult<Json<Results<InventoryLine>>> {
    Ok(Json(services.inventory.list().await?.into()))
}

/// POST /inventory/reserve
///
/// Answers with the withdrawal so callers can see a clamped shortfall.
pub async fn reserve(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<StockMoveRequest>, JsonRejection>,
) -> ApiResult<Json<Withdrawal>> {
    let Json(body) = body?;
    let withdrawal = services
        .inventory
        .reserve(body.site_id, body.material_id, body.qty)
        .await?;
    Ok(Json(withdrawal))
}

pub async fn consume(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<StockMoveRequest>, JsonRejection>,
) -> ApiResult<Json<Withdrawal>> {
    let Json(body) = body?;
    let withdrawal = services
        .inventory
        .consume(body.site_id, body.material_id, body.qty)
        .await?;
    Ok(Json(withdrawal))
}

pub async fn add(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<StockMoveRequest>, JsonRejection>,
) -> ApiResult<StatusCode> {
    let Json(body) = body?;
    services
        .inventory
        .add(body.site_id, body.material_id, body.qty)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn site_inventory(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> ApiResult<Json<SiteInventory>> {
    let site_id: SiteId = id.parse()?;
    Ok(Json(services.inventory.site_inventory(site_id).await?))
}

pub async fn set_levels(
    Extension(services): Extension<Arc<AppServices>>,
    Path((site_id, material_id)): Path<(String, String)>,
    body: Result<Json<StockLevelsRequest>, JsonRejection>,
) -> ApiResult<StatusCode> {
    let site_id: SiteId = site_id.parse()?;
    let material_id: MaterialId = material_id.parse()?;
    let Json(body) = body?;
    services
        .inventory
        .set_levels(site_id, material_id, body.qty_on_hand, body.reorder_point)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
