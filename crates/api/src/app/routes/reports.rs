use std::sync::Arc;

use axum::{Json, Router, extract::Extension, routing::get};

use maintops_infra::services::{Dashboard, InventoryBreakdown, StatusCount};

use crate::app::dto::{KpiResponse, Results};
use crate::app::errors::ApiResult;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/reports/work_orders_by_status", get(work_orders_by_status))
        .route("/reports/inventory_breakdown", get(inventory_breakdown))
        .route("/analytics/dashboard", get(dashboard))
        .route("/analytics/kpi", get(kpi))
}

pub async fn work_orders_by_status(
    Extension(services): Extension<Arc<AppServices>>,
) -> ApiResult<Json<Results<StatusCount>>> {
    Ok(Json(services.reporting.work_orders_by_status().await?.into()))
}

pub async fn inventory_breakdown(
    Extension(services): Extension<Arc<AppServices>>,
) -> ApiResult<Json<InventoryBreakdown>> {
    Ok(Json(services.reporting.inventory_breakdown().await?))
}

pub async fn dashboard(
    Extension(services): Extension<Arc<AppServices>>,
) -> ApiResult<Json<Dashboard>> {
    Ok(Json(services.reporting.dashboard().await?))
}

pub async fn kpi(Extension(services): Extension<Arc<AppServices>>) -> ApiResult<Json<KpiResponse>> {
    Ok(Json(KpiResponse {
        sites: services.reporting.kpi().await?,
    }))
}
