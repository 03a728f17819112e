//! User and role administration. Every handler requires the `admin` role; the check
//! itself lives in the administration service.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
};

use maintops_auth::{NewUser, RoleRecord, UserPatch};
use maintops_core::{RoleId, UserId};
use maintops_infra::services::UserView;

use crate::app::dto::{CreatedResponse, Results, RoleRequest};
use crate::app::errors::ApiResult;
use crate::app::services::AppServices;
use crate::context::SessionContext;

pub fn router() -> Router {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/:id", put(update_user).delete(delete_user))
        .route("/roles", get(list_roles).post(create_role))
        .route("/roles/:id", put(rename_role).delete(delete_role))
}

pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
) -> ApiResult<Json<Results<UserView>>> {
    Ok(Json(services.admin.list_users(session.actor()).await?.into()))
}

pub async fn create_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    body: Result<Json<NewUser>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(input) = body?;
    let id = services.admin.create_user(session.actor(), input).await?;
    Ok((StatusCode::CREATED, Json(CreatedResponse::new(id))))
}

pub async fn update_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
    body: Result<Json<UserPatch>, JsonRejection>,
) -> ApiResult<StatusCode> {
    let id: UserId = id.parse()?;
    let Json(patch) = body?;
    services.admin.update_user(session.actor(), id, patch).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id: UserId = id.parse()?;
    services.admin.delete_user(session.actor(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_roles(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
) -> ApiResult<Json<Results<RoleRecord>>> {
    Ok(Json(services.admin.list_roles(session.actor()).await?.into()))
}

pub async fn create_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    body: Result<Json<RoleRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(body) = body?;
    let id = services.admin.create_role(session.actor(), &body.name).await?;
    Ok((StatusCode::CREATED, Json(CreatedResponse::new(id))))
}

pub async fn rename_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
    body: Result<Json<RoleRequest>, JsonRejection>,
) -> ApiResult<StatusCode> {
    let id: RoleId = id.parse()?;
    let Json(body) = body?;
    services.admin.rename_role(session.actor(), id, &body.name).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id: RoleId = id.parse()?;
    services.admin.delete_role(session.actor(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
