//! Provider update checking — fail open, never destructive.
//!
//! Every installed provider names the config URL its updates are published
//! at. The checker fetches each distinct URL, compares versions and swaps
//! only the providers whose published version differs. An unreachable or
//! malformed manifest means "no update" for the providers it covers; user
//! option rows are never touched.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use sea_orm::{ActiveModelTrait, EntityTrait};
use tokio::sync::broadcast;

use crate::error::ProviderError;
use crate::events::RegistryEvent;
use crate::import::apply_manifest;
use crate::manifest::ProviderManifest;
use crate::registry::ProviderRegistry;
use watchtime_db::entities::provider;

impl ProviderRegistry {
    /// Check every installed provider for a published update and apply the
    /// stale ones. Returns the updated provider ids.
    ///
    /// Fetch and parse failures are logged and skipped; only database
    /// errors propagate.
    pub async fn check_updates(&self) -> Result<Vec<String>, ProviderError> {
        let installed = provider::Entity::find().all(self.db()).await?;
        if installed.is_empty() {
            return Ok(Vec::new());
        }

        tracing::info!(installed = installed.len(), "checking for provider updates");

        let mut seen_urls = HashSet::new();
        let mut fresh = Vec::new();
        for model in &installed {
            if !seen_urls.insert(model.update_url.clone()) {
                continue;
            }
            let body = match self.fetch_config_body(&model.update_url).await {
                Ok(body) => body,
                Err(e) => {
                    tracing::warn!(
                        url = %model.update_url,
                        "update manifest unreachable, treating as no update: {e}"
                    );
                    continue;
                }
            };
            match ProviderManifest::parse_and_validate_list(&body) {
                Ok(entries) => fresh.extend(entries),
                Err(e) => {
                    tracing::warn!(
                        url = %model.update_url,
                        "update manifest invalid, treating as no update: {e}"
                    );
                }
            }
        }

        self.apply_updates(fresh).await
    }

    /// Swap every installed provider whose fresh entry carries a different
    /// version: replace the config row, drop the cached blob, release the
    /// sandbox, then reload the affected ids.
    ///
    /// Fresh entries for providers that are not installed are ignored, as
    /// are entries with an unchanged version.
    async fn apply_updates(
        &self,
        fresh: Vec<ProviderManifest>,
    ) -> Result<Vec<String>, ProviderError> {
        let mut fresh_by_id: HashMap<&str, &ProviderManifest> = HashMap::new();
        for entry in &fresh {
            // First manifest naming an id wins.
            fresh_by_id.entry(entry.id.as_str()).or_insert(entry);
        }

        let installed = provider::Entity::find().all(self.db()).await?;
        let now = chrono::Utc::now().fixed_offset();
        let mut updated = Vec::new();

        for model in installed {
            let Some(entry) = fresh_by_id.get(model.id.as_str()) else {
                continue;
            };
            if entry.version == model.version {
                continue;
            }

            let id = model.id.clone();
            let old_version = model.version.clone();
            let source_path = self.store().blob_path(&id).to_string_lossy().to_string();

            apply_manifest(model, entry, source_path, now)
                .update(self.db())
                .await?;
            self.log_action(
                &id,
                "updated",
                Some(&format!("{old_version} -> {}", entry.version)),
            )
            .await;

            if let Err(e) = self.store().remove(&id).await {
                tracing::warn!(provider = %id, "failed to drop stale source blob: {e}");
            }
            let _ = self.release(&id).await;

            tracing::info!(
                provider = %id,
                from = %old_version,
                to = %entry.version,
                "provider updated"
            );
            updated.push(id);
        }

        if !updated.is_empty() {
            self.emit(RegistryEvent::Updated {
                ids: updated.clone(),
            });
            // Reload only the affected ids; disabled providers stay down.
            for id in &updated {
                let _ = self.ensure_loaded(id).await;
            }
        }

        Ok(updated)
    }
}

/// Spawn the update worker: one check at startup, then a re-check whenever
/// the installed config set changes (`Imported`/`Removed`). The checker's
/// own `Updated` events never feed back into it.
pub fn spawn_update_worker(registry: Arc<ProviderRegistry>) -> tokio::task::JoinHandle<()> {
    let mut events = registry.subscribe();
    tokio::spawn(async move {
        if let Err(e) = registry.check_updates().await {
            tracing::error!("provider update check failed: {e}");
        }

        loop {
            match events.recv().await {
                Ok(event) if event.triggers_update_check() => {
                    if let Err(e) = registry.check_updates().await {
                        tracing::error!("provider update check failed: {e}");
                    }
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    // Missed events might include config changes.
                    tracing::warn!(skipped, "update worker lagged behind registry events");
                    if let Err(e) = registry.check_updates().await {
                        tracing::error!("provider update check failed: {e}");
                    }
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

// ─── Tests ──────────────────────────────────────────────────────────────
