//! WatchTime Server
//!
//! Axum wiring over the WatchTime core: provider lifecycle endpoints, the
//! search fan-out, episode listing, and the router glue between them. The
//! boot sequence lives in `main.rs`; everything here is reusable from
//! integration tests.

use std::sync::Arc;

use axum::{
    http::{HeaderValue, Method},
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{cors, cors::CorsLayer, trace::TraceLayer};

use watchtime_db::AppState;

pub mod api;
pub mod library;
pub mod scrape;

/// Assemble the full API router over a prepared application state.
pub fn build_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        .route("/health", get(api::health))
        .route("/providers", get(api::providers::list_providers))
        .route("/providers/import", post(api::providers::import_providers))
        .route(
            "/providers/update-check",
            post(api::providers::run_update_check),
        )
        .route("/providers/{id}", delete(api::providers::remove_provider))
        .route(
            "/providers/{id}/enable",
            post(api::providers::enable_provider),
        )
        .route(
            "/providers/{id}/disable",
            post(api::providers::disable_provider),
        )
        .route(
            "/providers/{id}/options",
            put(api::providers::update_options),
        )
        .route("/providers/{id}/logs", get(api::providers::get_logs))
        .route("/search", post(api::search::search))
        .route("/search/nzb", post(api::search::search_nzb))
        .route("/episodes", post(api::episodes::list_episodes));

    Router::new()
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
        .with_state(state)
}

/// CORS from `CORS_ORIGINS` (comma separated). Unset allows any origin,
/// which fits a service bound to localhost for a local frontend.
fn cors_layer() -> CorsLayer {
    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::DELETE,
        Method::OPTIONS,
    ];
    let configured = std::env::var("CORS_ORIGINS").unwrap_or_default();
    if configured.is_empty() {
        return CorsLayer::new()
            .allow_origin(cors::Any)
            .allow_methods(methods)
            .allow_headers(cors::Any);
    }
    let origins: Vec<HeaderValue> = configured
        .split(',')
        .filter_map(|origin| HeaderValue::from_str(origin.trim()).ok())
        .collect();
    tracing::info!("CORS allowed origins: {:?}", origins);
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(methods)
        .allow_headers(cors::Any)
}
