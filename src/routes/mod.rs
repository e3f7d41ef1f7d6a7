//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! Exposes the storage contract over HTTP so `ServerStorage` clients can
//! persist progress remotely. Routes carry no auth; deployments put the
//! service behind their own gateway.

pub mod progress;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::{delete, get, post, put};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the service router.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/form-progress", delete(progress::clear_progress))
        .route("/api/form-progress/purge", post(progress::purge_expired))
        .route(
            "/api/form-progress/{key}",
            put(progress::put_progress)
                .get(progress::get_progress)
                .delete(progress::delete_progress),
        )
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
