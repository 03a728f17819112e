use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::info;

use crate::app::errors::{ApiError, json_error};
use crate::app::services::AppServices;
use crate::context::SessionContext;

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "session";

/// Resolve the session token (cookie first, then `Authorization: Bearer`) to an actor.
pub async fn session_middleware(
    State(services): State<Arc<AppServices>>,
    mut req: Request,
    next: Next,
) -> Response {
    let Some(token) = session_token(req.headers()) else {
        return json_error(StatusCode::UNAUTHORIZED, "unauthorized", "not authenticated");
    };

    let actor = match services.access.resolve(&token).await {
        Ok(actor) => actor,
        Err(err) => return ApiError::from(err).into_response(),
    };

    req.extensions_mut().insert(SessionContext::new(actor));
    next.run(req).await
}

/// One log line per request.
pub async fn request_log(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(req).await;

    info!(
        %method,
        path = %path,
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "request"
    );
    response
}

pub fn session_token(headers: &HeaderMap) -> Option<String> {
    session_cookie(headers).or_else(|| bearer_token(headers))
}

fn session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let header = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        return None;
    }
    Some(token.to_string())
}

/// `Set-Cookie` value binding the session token.
pub fn session_cookie_header(token: &str) -> String {
    format!("{SESSION_COOKIE}={token}; HttpOnly; SameSite=Lax; Path=/")
}

/// `Set-Cookie` value clearing the session cookie.
pub fn clear_session_cookie_header() -> String {
    format!("{SESSION_COOKIE}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0")
}
