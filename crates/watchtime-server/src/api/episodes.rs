//! Episode list API endpoint.

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use std::sync::Arc;

use watchtime_db::AppState;
use watchtime_metadata::{EpisodeRecord, Media};

#[derive(Debug, Deserialize)]
pub struct EpisodeListRequest {
    pub media: Media,
}

fn metadata_unavailable() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(serde_json::json!({ "error": "metadata service is not running" })),
    )
}

/// POST /api/episodes — the reconciled episode list for a media.
///
/// Never fails on index trouble: the service degrades to schedule-derived
/// records, so the body is always a full array.
pub async fn list_episodes(
    State(state): State<Arc<AppState>>,
    Json(body): Json<EpisodeListRequest>,
) -> Result<Json<Vec<EpisodeRecord>>, (StatusCode, Json<serde_json::Value>)> {
    let metadata = super::get_metadata_service(&state).ok_or_else(metadata_unavailable)?;

    let episodes = metadata.episode_list(&body.media).await;

    tracing::info!(
        media = body.media.id,
        episodes = episodes.len(),
        "episode list served via API"
    );
    Ok(Json(episodes))
}
