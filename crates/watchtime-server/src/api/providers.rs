//! Provider management API endpoints.
//!
//! Thin translations from HTTP to `ProviderRegistry` calls. Every mutation
//! is persisted, audited and broadcast by the registry itself; handlers only
//! map outcomes onto status codes.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use watchtime_db::entities::{provider, provider_log, provider_option};
use watchtime_db::AppState;
use watchtime_provider::ProviderError;

// ─── Helpers ────────────────────────────────────────────────────────────

/// Return a standard error when the state carries no provider registry.
fn registry_unavailable() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(serde_json::json!({ "error": "provider registry is not running" })),
    )
}

/// Map a registry error onto an HTTP status with a JSON error body.
fn provider_error(err: ProviderError) -> (StatusCode, Json<serde_json::Value>) {
    let status = match &err {
        ProviderError::NotFound(_) => StatusCode::NOT_FOUND,
        ProviderError::InvalidManifest(_)
        | ProviderError::Manifest(_)
        | ProviderError::Import(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(serde_json::json!({ "error": err.to_string() })))
}

// ─── Request / Response types ───────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub imported: Vec<String>,
}

/// One installed provider: config row plus user options and live status.
#[derive(Debug, Serialize)]
pub struct ProviderSummary {
    #[serde(flatten)]
    pub config: provider::Model,
    pub enabled: bool,
    pub options: serde_json::Value,
    pub loaded: bool,
}

#[derive(Debug, Serialize)]
pub struct ProviderListResponse {
    pub providers: Vec<ProviderSummary>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateOptionsRequest {
    pub options: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct UpdateCheckResponse {
    pub checked: u64,
    pub updated: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct LogsResponse {
    pub logs: Vec<provider_log::Model>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

// ─── Handlers ───────────────────────────────────────────────────────────

/// GET /api/providers — every installed provider with options and live state.
pub async fn list_providers(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ProviderListResponse>, (StatusCode, Json<serde_json::Value>)> {
    let configs = provider::Entity::find()
        .order_by_asc(provider::Column::Id)
        .all(&state.db)
        .await
        .map_err(|e| {
            tracing::error!("failed to list providers: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": format!("DB error: {e}") })),
            )
        })?;

    let mut option_rows: HashMap<String, provider_option::Model> = provider_option::Entity::find()
        .all(&state.db)
        .await
        .map_err(|e| {
            tracing::error!("failed to list provider options: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": format!("DB error: {e}") })),
            )
        })?
        .into_iter()
        .map(|row| (row.provider_id.clone(), row))
        .collect();

    let registry = super::get_provider_registry(&state);
    let mut providers = Vec::with_capacity(configs.len());
    for config in configs {
        let loaded = match &registry {
            Some(registry) => registry.is_loaded(&config.id).await,
            None => false,
        };
        let option = option_rows.remove(&config.id);
        providers.push(ProviderSummary {
            enabled: option.as_ref().map(|row| row.enabled).unwrap_or(false),
            options: option
                .map(|row| row.options)
                .unwrap_or_else(|| serde_json::json!({})),
            loaded,
            config,
        });
    }

    Ok(Json(ProviderListResponse { providers }))
}

/// POST /api/providers/import — install every provider a manifest names.
pub async fn import_providers(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ImportRequest>,
) -> Result<(StatusCode, Json<ImportResponse>), (StatusCode, Json<serde_json::Value>)> {
    let registry = super::get_provider_registry(&state).ok_or_else(registry_unavailable)?;

    let imported = registry.import(&body.url).await.map_err(|e| {
        tracing::error!(url = %body.url, "provider import failed: {e}");
        provider_error(e)
    })?;

    tracing::info!(count = imported.len(), "providers imported via API");
    Ok((StatusCode::CREATED, Json(ImportResponse { imported })))
}

/// DELETE /api/providers/:id — uninstall a provider.
pub async fn remove_provider(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, (StatusCode, Json<serde_json::Value>)> {
    let registry = super::get_provider_registry(&state).ok_or_else(registry_unavailable)?;

    registry.remove(&id).await.map_err(|e| {
        tracing::error!(provider = %id, "failed to remove provider: {e}");
        provider_error(e)
    })?;

    tracing::info!(provider = %id, "provider removed via API");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/providers/:id/enable — enable a provider and load its sandbox.
///
/// The enabled flag sticks even when the load fails; the provider row keeps
/// the failure and the next import or update retries the load.
pub async fn enable_provider(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    let registry = super::get_provider_registry(&state).ok_or_else(registry_unavailable)?;

    registry.enable(&id).await.map_err(|e| {
        tracing::error!(provider = %id, "failed to enable provider: {e}");
        provider_error(e)
    })?;

    tracing::info!(provider = %id, "provider enabled via API");
    Ok(Json(serde_json::json!({ "status": "enabled" })))
}

/// POST /api/providers/:id/disable — disable a provider and drop its sandbox.
pub async fn disable_provider(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    let registry = super::get_provider_registry(&state).ok_or_else(registry_unavailable)?;

    registry.disable(&id).await.map_err(|e| {
        tracing::error!(provider = %id, "failed to disable provider: {e}");
        provider_error(e)
    })?;

    tracing::info!(provider = %id, "provider disabled via API");
    Ok(Json(serde_json::json!({ "status": "disabled" })))
}

/// PUT /api/providers/:id/options — replace a provider's user options.
pub async fn update_options(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<UpdateOptionsRequest>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    let registry = super::get_provider_registry(&state).ok_or_else(registry_unavailable)?;

    registry.set_options(&id, body.options).await.map_err(|e| {
        tracing::error!(provider = %id, "failed to update provider options: {e}");
        provider_error(e)
    })?;

    tracing::info!(provider = %id, "provider options updated via API");
    Ok(Json(serde_json::json!({ "status": "updated" })))
}

/// POST /api/providers/update-check — run one update check now.
pub async fn run_update_check(
    State(state): State<Arc<AppState>>,
) -> Result<Json<UpdateCheckResponse>, (StatusCode, Json<serde_json::Value>)> {
    let registry = super::get_provider_registry(&state).ok_or_else(registry_unavailable)?;

    let checked = provider::Entity::find()
        .count(&state.db)
        .await
        .map_err(|e| {
            tracing::error!("failed to count providers: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": format!("DB error: {e}") })),
            )
        })?;

    let updated = registry.check_updates().await.map_err(|e| {
        tracing::error!("update check failed: {e}");
        provider_error(e)
    })?;

    tracing::info!(checked, updated = updated.len(), "update check ran via API");
    Ok(Json(UpdateCheckResponse { checked, updated }))
}

/// GET /api/providers/:id/logs — lifecycle audit trail, newest first.
pub async fn get_logs(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(params): Query<LogsQuery>,
) -> Result<Json<LogsResponse>, (StatusCode, Json<serde_json::Value>)> {
    // Audit rows outlive their provider, so the 404 is keyed on whether any
    // trace of the id exists at all.
    let installed = provider::Entity::find_by_id(&id)
        .one(&state.db)
        .await
        .map_err(|e| {
            tracing::error!(provider = %id, "failed to query provider: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": format!("DB error: {e}") })),
            )
        })?;

    let total = provider_log::Entity::find()
        .filter(provider_log::Column::ProviderId.eq(&id))
        .count(&state.db)
        .await
        .map_err(|e| {
            tracing::error!(provider = %id, "failed to count provider logs: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": format!("DB error: {e}") })),
            )
        })?;

    if installed.is_none() && total == 0 {
        return Err((
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "provider not found" })),
        ));
    }

    let page = params.page.unwrap_or(1).max(1);
    let per_page = params.per_page.unwrap_or(50).min(100);

    let logs = provider_log::Entity::find()
        .filter(provider_log::Column::ProviderId.eq(&id))
        .order_by_desc(provider_log::Column::CreatedAt)
        .offset((page - 1) * per_page)
        .limit(per_page)
        .all(&state.db)
        .await
        .map_err(|e| {
            tracing::error!(provider = %id, "failed to query provider logs: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": format!("DB error: {e}") })),
            )
        })?;

    Ok(Json(LogsResponse {
        logs,
        total,
        page,
        per_page,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Verify `registry_unavailable` returns 503 with the expected message.
    #[test]
    fn test_registry_unavailable() {
        let (status, json) = registry_unavailable();
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json.0["error"], "provider registry is not running");
    }

    // ─── Error mapping ───────────────────────────────────────────────────

    #[test]
    fn test_provider_error_not_found_is_404() {
        let (status, json) = provider_error(ProviderError::NotFound("nyaa".into()));
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json.0["error"], "provider not found: nyaa");
    }

    #[test]
    fn test_provider_error_manifest_failures_are_400() {
        let (status, _) = provider_error(ProviderError::InvalidManifest("bad version".into()));
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = provider_error(ProviderError::Manifest("not json".into()));
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = provider_error(ProviderError::Import("empty body".into()));
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_provider_error_rest_is_500() {
        let (status, _) = provider_error(ProviderError::Sandbox("trap".into()));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

        let (status, _) = provider_error(ProviderError::Http("timeout".into()));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    // ─── DTO shapes ──────────────────────────────────────────────────────

    #[test]
    fn test_deserialize_import_request() {
        let req: ImportRequest =
            serde_json::from_str(r#"{"url":"https://example.com/manifest.json"}"#).unwrap();
        assert_eq!(req.url, "https://example.com/manifest.json");
    }

    #[test]
    fn test_serialize_import_response() {
        let resp = ImportResponse {
            imported: vec!["alpha".into(), "beta".into()],
        };
        let val = serde_json::to_value(&resp).unwrap();
        assert_eq!(val, serde_json::json!({ "imported": ["alpha", "beta"] }));
    }

    #[test]
    fn test_deserialize_update_options_request() {
        let req: UpdateOptionsRequest =
            serde_json::from_str(r#"{"options":{"apiKey":"secret"}}"#).unwrap();
        assert_eq!(req.options["apiKey"], "secret");
    }

    #[test]
    fn test_serialize_update_check_response() {
        let resp = UpdateCheckResponse {
            checked: 3,
            updated: vec!["alpha".into()],
        };
        let val = serde_json::to_value(&resp).unwrap();
        assert_eq!(val, serde_json::json!({ "checked": 3, "updated": ["alpha"] }));
    }

    #[test]
    fn test_deserialize_logs_query_empty() {
        let q: LogsQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(q.page, None);
        assert_eq!(q.per_page, None);
    }

    // ─── Pagination defaults ─────────────────────────────────────────────

    /// Verify the pagination default/clamping logic from `get_logs`.
    #[test]
    fn test_logs_pagination_defaults() {
        let q = LogsQuery {
            page: None,
            per_page: None,
        };
        assert_eq!(q.page.unwrap_or(1).max(1), 1);
        assert_eq!(q.per_page.unwrap_or(50).min(100), 50);

        let q = LogsQuery {
            page: Some(0),
            per_page: Some(500),
        };
        assert_eq!(q.page.unwrap_or(1).max(1), 1);
        assert_eq!(q.per_page.unwrap_or(50).min(100), 100);
    }
}
