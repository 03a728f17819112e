use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Extension, Path, Query,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use maintops_core::WorkOrderId;
use maintops_workorders::{NewWorkOrder, WorkOrder, WorkOrderDetail, WorkOrderPatch, WorkOrderStatus};

use crate::app::dto::{
    AssignRequest, CommentRequest, CreatedResponse, MaterialsRequest, Results, StatusRequest,
    WorkOrderQuery,
};
use crate::app::errors::{ApiError, ApiResult};
use crate::app::services::AppServices;
use crate::context::SessionContext;

pub fn router() -> Router {
    Router::new()
        .route("/workorders", get(list_work_orders).post(create_work_order))
        .route(
            "/workorders/:id",
            get(get_work_order).put(update_work_order).delete(delete_work_order),
        )
        .route("/workorders/:id/status", post(set_status))
        .route("/workorders/:id/assign", post(assign))
        .route("/workorders/:id/materials", post(replace_materials))
        .route("/workorders/:id/comment", post(add_comment))
}

fn parse_id(raw: &str) -> Result<WorkOrderId, ApiError> {
    Ok(raw.parse::<WorkOrderId>()?)
}

pub async fn list_work_orders(
    Extension(services): Extension<Arc<AppServices>>,
    query: Result<Query<WorkOrderQuery>, QueryRejection>,
) -> ApiResult<Json<Results<WorkOrder>>> {
    let Query(query) = query?;
    let filter = query.into_filter()?;
    Ok(Json(services.work_orders.list(&filter).await?.into()))
}

pub async fn create_work_order(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<NewWorkOrder>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(body) = body?;
    let id = services.work_orders.create(body).await?;
    Ok((StatusCode::CREATED, Json(CreatedResponse::new(id))))
}

pub async fn get_work_order(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> ApiResult<Json<WorkOrderDetail>> {
    let id = parse_id(&id)?;
    Ok(Json(services.work_orders.get(id).await?))
}

pub async fn update_work_order(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<WorkOrderPatch>, JsonRejection>,
) -> ApiResult<StatusCode> {
    let id = parse_id(&id)?;
    let Json(patch) = body?;
    services.work_orders.update(id, patch).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_work_order(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = parse_id(&id)?;
    services.work_orders.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn set_status(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<StatusRequest>, JsonRejection>,
) -> ApiResult<StatusCode> {
    let id = parse_id(&id)?;
    let Json(body) = body?;
    services
        .work_orders
        .set_status(id, WorkOrderStatus::new(body.status))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn assign(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<AssignRequest>, JsonRejection>,
) -> ApiResult<StatusCode> {
    let id = parse_id(&id)?;
    let Json(body) = body?;
    services.work_orders.assign(id, body.assigned_team).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /workorders/:id/materials
///
/// Replaces the whole material set; an empty `items` list clears it.
pub async fn replace_materials(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<MaterialsRequest>, JsonRejection>,
) -> ApiResult<StatusCode> {
    let id = parse_id(&id)?;
    let Json(body) = body?;
    services.work_orders.replace_materials(id, body.items).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_comment(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
    body: Result<Json<CommentRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_id(&id)?;
    let Json(body) = body?;
    let comment_id = services
        .work_orders
        .add_comment(id, session.user_id(), body.text)
        .await?;
    Ok((StatusCode::CREATED, Json(CreatedResponse::new(comment_id))))
}
