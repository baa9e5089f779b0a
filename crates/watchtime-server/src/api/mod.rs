//! REST API handlers.

pub mod episodes;
pub mod providers;
pub mod search;

use std::sync::Arc;

use axum::Json;
use serde::Serialize;

use watchtime_db::AppState;

#[derive(Serialize)]
pub struct ApiStatus {
    pub status: &'static str,
    pub version: &'static str,
}

/// GET /api/health
pub async fn health() -> Json<ApiStatus> {
    Json(ApiStatus {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Extract the provider registry from type-erased application state.
///
/// Returns `None` when the state was built without one.
pub fn get_provider_registry(
    state: &AppState,
) -> Option<Arc<watchtime_provider::ProviderRegistry>> {
    state.providers.as_ref().and_then(|any| {
        any.clone()
            .downcast::<watchtime_provider::ProviderRegistry>()
            .ok()
    })
}

/// Extract the metadata service from type-erased application state.
pub fn get_metadata_service(state: &AppState) -> Option<Arc<watchtime_metadata::MetadataService>> {
    state.metadata.as_ref().and_then(|any| {
        any.clone()
            .downcast::<watchtime_metadata::MetadataService>()
            .ok()
    })
}

/// Extract the search pipeline from type-erased application state.
pub fn get_search_pipeline(state: &AppState) -> Option<Arc<watchtime_search::SearchPipeline>> {
    state.search.as_ref().and_then(|any| {
        any.clone()
            .downcast::<watchtime_search::SearchPipeline>()
            .ok()
    })
}
