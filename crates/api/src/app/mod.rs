//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: stores, audit trail, event bus and the SSE bridge
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response DTOs
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use crate::config::AppConfig;
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::AppServices;

/// Build the full HTTP router from configuration (public entrypoint used by `main.rs`).
pub async fn build_app(config: &AppConfig) -> anyhow::Result<Router> {
    let services = services::build_services(config).await?;
    Ok(router(services))
}

/// Router over already-wired services.
pub fn router(services: AppServices) -> Router {
    let services = Arc::new(services);

    // Protected routes: require a live session.
    let protected = routes::protected()
        .layer(Extension(services.clone()))
        .layer(axum::middleware::from_fn_with_state(
            services.clone(),
            middleware::session_middleware,
        ));

    let public = routes::public().layer(Extension(services));

    Router::new()
        .route("/health", get(routes::system::health))
        .nest("/api/v1", public.merge(protected))
        .layer(ServiceBuilder::new().layer(axum::middleware::from_fn(middleware::request_log)))
}
