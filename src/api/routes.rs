//! API Routes
//!
//! Configures the Axum router with all cache endpoints.

use axum::{
    routing::{delete, get, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    delete_handler, get_handler, health_handler, set_handler, stats_handler, AppState,
};

/// Builds the HTTP front-end for a `CacheStore<String, String>`.
///
/// Key operations live under `/set`, `/get/:key` and `/del/:key`; `/stats`
/// and `/health` are read-only. Every request gets a tracing span, and
/// cross-origin callers are accepted.
pub fn create_router(state: AppState) -> Router {
    let keys = Router::new()
        .route("/set", put(set_handler))
        .route("/get/:key", get(get_handler))
        .route("/del/:key", delete(delete_handler));

    let service = Router::new()
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler));

    keys.merge(service)
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Browser clients may call from any origin with any method or header.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}
