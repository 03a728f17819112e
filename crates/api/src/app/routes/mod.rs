use axum::{
    Router,
    routing::{get, post},
};

pub mod admin;
pub mod auth;
pub mod catalog;
pub mod events;
pub mod inventory;
pub mod reports;
pub mod system;
pub mod work_orders;

/// Endpoints reachable without a session.
pub fn public() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
}

/// Endpoints behind the session middleware.
pub fn protected() -> Router {
    Router::new()
        .route("/auth/me", get(auth::me))
        .merge(work_orders::router())
        .merge(inventory::router())
        .merge(catalog::router())
        .merge(admin::router())
        .merge(events::router())
        .merge(reports::router())
}
