//! Release search API endpoints.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use watchtime_db::AppState;
use watchtime_metadata::Media;
use watchtime_search::{
    build_exclusions, MergedResult, NzbResult, PlaybackCapabilities, ProviderFailure, SearchError,
    SearchOptions,
};

// ─── Request / Response types ───────────────────────────────────────────

/// Playback capabilities and quality preference of the requesting client.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchPreferences {
    pub resolution: String,
    pub hevc: bool,
    pub ac3: bool,
    pub multi_audio: bool,
    pub external_player: bool,
}

impl Default for SearchPreferences {
    fn default() -> Self {
        Self {
            resolution: "1080".to_string(),
            hevc: true,
            ac3: true,
            multi_audio: true,
            external_player: false,
        }
    }
}

fn default_online() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub media: Media,
    pub episode: i32,
    #[serde(default)]
    pub preferences: SearchPreferences,
    #[serde(default = "default_online")]
    pub online: bool,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<MergedResult>,
    pub errors: Vec<ProviderFailure>,
}

#[derive(Debug, Deserialize)]
pub struct NzbRequest {
    pub hash: String,
}

#[derive(Debug, Serialize)]
pub struct NzbResponse {
    pub results: Vec<NzbResult>,
    pub errors: Vec<ProviderFailure>,
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn exclusions_for(prefs: &SearchPreferences) -> Vec<String> {
    let caps = PlaybackCapabilities {
        hevc: prefs.hevc,
        ac3: prefs.ac3,
        audio_tracks: prefs.multi_audio,
    };
    build_exclusions(caps, prefs.external_player)
}

fn pipeline_unavailable() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(serde_json::json!({ "error": "search pipeline is not running" })),
    )
}

// ─── Handlers ───────────────────────────────────────────────────────────

/// POST /api/search — fan a query out to every live provider.
///
/// Offline requests skip providers and trackers and answer from the local
/// library, so the handler also skips the AniDB id lookup for them.
pub async fn search(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, (StatusCode, Json<serde_json::Value>)> {
    let pipeline = super::get_search_pipeline(&state).ok_or_else(pipeline_unavailable)?;
    let metadata = super::get_metadata_service(&state);

    let (anidb_aid, anidb_eid) = match (&metadata, body.online) {
        (Some(service), true) => service.anidb_ids(&body.media, body.episode).await,
        _ => (None, None),
    };

    let options = SearchOptions::build(
        &body.media,
        body.episode,
        body.preferences.resolution.clone(),
        exclusions_for(&body.preferences),
        anidb_aid,
        anidb_eid,
    );

    let outcome = pipeline
        .search(&body.media, &options, body.online)
        .await
        .map_err(|e| {
            tracing::error!(media = body.media.id, episode = body.episode, "search failed: {e}");
            let status = match e {
                SearchError::NoProvidersConfigured => StatusCode::BAD_GATEWAY,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (status, Json(serde_json::json!({ "error": format!("{e}") })))
        })?;

    tracing::info!(
        media = body.media.id,
        episode = body.episode,
        results = outcome.results.len(),
        failures = outcome.failures.len(),
        "search served via API"
    );
    Ok(Json(SearchResponse {
        results: outcome.results,
        errors: outcome.failures,
    }))
}

/// POST /api/search/nzb — resolve a release hash against NZB providers.
///
/// Always 200; per-provider failures ride in the body next to the results.
pub async fn search_nzb(
    State(state): State<Arc<AppState>>,
    Json(body): Json<NzbRequest>,
) -> Result<Json<NzbResponse>, (StatusCode, Json<serde_json::Value>)> {
    let pipeline = super::get_search_pipeline(&state).ok_or_else(pipeline_unavailable)?;

    let (results, errors) = pipeline.nzb_results(&body.hash).await;

    tracing::info!(
        hash = %body.hash,
        results = results.len(),
        failures = errors.len(),
        "nzb lookup served via API"
    );
    Ok(Json(NzbResponse { results, errors }))
}
