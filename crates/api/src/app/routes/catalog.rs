use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Extension, Path, Query,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use maintops_catalog::{Material, MaterialDraft, Site, SiteDraft};
use maintops_core::{MaterialId, SiteId};
use maintops_infra::services::{Page, PageRequest};

use crate::app::dto::CreatedResponse;
use crate::app::errors::ApiResult;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/sites", get(list_sites).post(create_site))
        .route("/sites/:id", get(get_site).put(update_site).delete(delete_site))
        .route("/materials", get(list_materials).post(create_material))
        .route(
            "/materials/:id",
            get(get_material).put(update_material).delete(delete_material),
        )
}

pub async fn list_sites(
    Extension(services): Extension<Arc<AppServices>>,
    page: Result<Query<PageRequest>, QueryRejection>,
) -> ApiResult<Json<Page<Site>>> {
    let Query(page) = page?;
    Ok(Json(services.catalog.list_sites(page).await?))
}

pub async fn get_site(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Site>> {
    let id: SiteId = id.parse()?;
    Ok(Json(services.catalog.get_site(id).await?))
}

pub async fn create_site(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<SiteDraft>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(draft) = body?;
    let id = services.catalog.create_site(draft).await?;
    Ok((StatusCode::CREATED, Json(CreatedResponse::new(id))))
}

pub async fn update_site(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<SiteDraft>, JsonRejection>,
) -> ApiResult<StatusCode> {
    let id: SiteId = id.parse()?;
    let Json(draft) = body?;
    services.catalog.update_site(id, draft).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_site(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id: SiteId = id.parse()?;
    services.catalog.delete_site(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_materials(
    Extension(services): Extension<Arc<AppServices>>,
    page: Result<Query<PageRequest>, QueryRejection>,
) -> ApiResult<Json<Page<Material>>> {
    let Query(page) = page?;
    Ok(Json(services.catalog.list_materials(page).await?))
}

pub async fn get_material(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Material>> {
    let id: MaterialId = id.parse()?;
    Ok(Json(services.catalog.get_material(id).await?))
}

pub async fn create_material(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<MaterialDraft>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(draft) = body?;
    let id = services.catalog.create_material(draft).await?;
    Ok((StatusCode::CREATED, Json(CreatedResponse::new(id))))
}

pub async fn update_material(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<MaterialDraft>, JsonRejection>,
) -> ApiResult<StatusCode> {
    let id: MaterialId = id.parse()?;
    let Json(draft) = body?;
    services.catalog.update_material(id, draft).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_material(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id: MaterialId = id.parse()?;
    services.catalog.delete_material(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
