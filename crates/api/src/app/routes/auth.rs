use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, rejection::JsonRejection},
    http::{HeaderMap, header},
    response::{IntoResponse, Response},
};
use serde_json::json;

use maintops_auth::Actor;

use crate::app::dto::{LoginRequest, LoginResponse};
use crate::app::errors::ApiResult;
use crate::app::services::AppServices;
use crate::context::SessionContext;
use crate::middleware::{clear_session_cookie_header, session_cookie_header, session_token};

/// POST /auth/login
///
/// Sets the `session` cookie and also returns the token for header-based clients.
pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(body) = body?;
    let token = services.access.login(&body.login, &body.password).await?;

    Ok((
        [(header::SET_COOKIE, session_cookie_header(token.as_str()))],
        Json(LoginResponse {
            ok: true,
            token: token.to_string(),
        }),
    )
        .into_response())
}

/// POST /auth/logout
///
/// Always succeeds; an unknown or missing token is ignored.
pub async fn logout(
    Extension(services): Extension<Arc<AppServices>>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    if let Some(token) = session_token(&headers) {
        services.access.logout(&token)?;
    }
    Ok((
        [(header::SET_COOKIE, clear_session_cookie_header())],
        Json(json!({ "ok": true })),
    )
        .into_response())
}

/// GET /auth/me
pub async fn me(Extension(session): Extension<SessionContext>) -> Json<Actor> {
    Json(session.actor().clone())
}
