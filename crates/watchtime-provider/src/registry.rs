//! Provider registry — owns the live sandboxes, persists lifecycle state.
//!
//! The `ProviderRegistry` is the central orchestrator of the provider system.
//! It loads providers from the database, keeps one sandbox worker per loaded
//! provider, and announces every lifecycle mutation on a broadcast channel.
//! Durable state changes always land in this order: database write, handle
//! map mutation, event broadcast.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

use crate::error::ProviderError;
use crate::events::RegistryEvent;
use crate::host::SandboxHandle;
use crate::sandbox::SandboxConfig;
use crate::store::SourceStore;
use watchtime_db::entities::{provider, provider_log, provider_option};
use watchtime_search::{ProviderKind, ProviderPool, ProviderSnapshot};

/// Broadcast backlog per subscriber before lagging.
const EVENT_CHANNEL_CAPACITY: usize = 64;

// ─── Active provider entry ──────────────────────────────────────────────

/// A loaded provider with its sandbox worker and call metadata.
struct ActiveProvider {
    kind: ProviderKind,
    /// User options forwarded verbatim on every call.
    options: serde_json::Value,
    handle: Arc<SandboxHandle>,
}

fn kind_from_str(kind: &str) -> ProviderKind {
    match kind {
        "nzb" => ProviderKind::Nzb,
        _ => ProviderKind::Torrent,
    }
}

// ─── Registry ───────────────────────────────────────────────────────────

/// Central provider registry.
///
/// Manages the lifecycle of all providers: importing configs, maintaining
/// WASM sandboxes, flipping user switches, and recording an audit trail.
/// Thread-safe via `RwLock` for interior mutability.
pub struct ProviderRegistry {
    /// Loaded providers indexed by provider id.
    providers: RwLock<HashMap<String, ActiveProvider>>,
    /// Database connection for config, options and audit rows.
    db: DatabaseConnection,
    /// Cached WASM source blobs.
    store: SourceStore,
    /// Sandbox configuration (memory limit, fuel, call timeout).
    sandbox_config: SandboxConfig,
    /// Whether to write lifecycle audit rows to the database.
    log_events: bool,
    /// Lifecycle announcements; see [`RegistryEvent`].
    events: broadcast::Sender<RegistryEvent>,
}

impl ProviderRegistry {
    /// Create a registry. Does NOT load providers — call `load_enabled()`
    /// after creation.
    pub fn new(db: &DatabaseConnection, store: SourceStore, sandbox_config: SandboxConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            providers: RwLock::new(HashMap::new()),
            db: db.clone(),
            store,
            sandbox_config,
            log_events: true,
            events,
        }
    }

    /// Create a registry with store, sandbox and audit configuration from
    /// environment variables.
    pub fn from_env(db: &DatabaseConnection) -> Result<Self, ProviderError> {
        let mut registry = Self::new(db, SourceStore::from_env()?, SandboxConfig::from_env());
        registry.log_events =
            std::env::var("PROVIDER_LOG_EVENTS").unwrap_or_else(|_| "true".to_string()) == "true";
        Ok(registry)
    }

    /// Subscribe to lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.events.subscribe()
    }

    /// Broadcast an event. A send error just means nobody is listening.
    pub(crate) fn emit(&self, event: RegistryEvent) {
        let _ = self.events.send(event);
    }

    // ── Loading ──────────────────────────────────────────────────────

    /// Load every provider whose option row says enabled.
    ///
    /// Per-provider failures are recorded and broadcast inside
    /// `ensure_loaded`; one bad provider never blocks the rest.
    pub async fn load_enabled(&self) {
        let enabled = match provider_option::Entity::find()
            .filter(provider_option::Column::Enabled.eq(true))
            .all(&self.db)
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                tracing::error!("failed to query enabled providers: {e}");
                return;
            }
        };

        for row in enabled {
            let _ = self.ensure_loaded(&row.provider_id).await;
        }
    }

    /// Return the live handle for a provider, spawning its sandbox first if
    /// necessary.
    ///
    /// A failed spawn or self-test marks the provider `status = "error"`,
    /// writes a `load_error` audit row and broadcasts `LoadFailed`; the
    /// provider stays out of fan-out until the registry changes again.
    pub async fn ensure_loaded(&self, id: &str) -> Result<Arc<SandboxHandle>, ProviderError> {
        if let Some(active) = self.providers.read().await.get(id) {
            return Ok(active.handle.clone());
        }

        let model = provider::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await?
            .ok_or_else(|| ProviderError::NotFound(id.to_string()))?;

        let options = match provider_option::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await?
        {
            Some(row) if row.enabled => row.options,
            _ => return Err(ProviderError::Disabled(id.to_string())),
        };

        match self.spawn_sandbox(&model).await {
            Ok(handle) => {
                self.set_status(&model.id, "ok", None).await?;
                self.log_action(&model.id, "loaded", None).await;
                {
                    let mut providers = self.providers.write().await;
                    providers.insert(
                        model.id.clone(),
                        ActiveProvider {
                            kind: kind_from_str(&model.kind),
                            options,
                            handle: handle.clone(),
                        },
                    );
                }
                self.emit(RegistryEvent::Loaded {
                    id: model.id.clone(),
                });
                tracing::info!(provider = %model.id, version = %model.version, "provider loaded");
                Ok(handle)
            }
            Err(e) => {
                let message = e.to_string();
                tracing::error!(provider = %model.id, "failed to load provider: {message}");
                if let Err(db_err) = self.set_status(&model.id, "error", Some(&message)).await {
                    tracing::error!(provider = %model.id, "failed to record load error: {db_err}");
                }
                self.log_action(&model.id, "load_error", Some(&message)).await;
                self.emit(RegistryEvent::LoadFailed {
                    id: model.id.clone(),
                });
                Err(e)
            }
        }
    }

    /// Fetch the source blob, spawn the worker and run the provider's
    /// self-test.
    async fn spawn_sandbox(
        &self,
        model: &provider::Model,
    ) -> Result<Arc<SandboxHandle>, ProviderError> {
        let hosts: Vec<String> = serde_json::from_value(model.hosts.clone()).unwrap_or_default();
        let wasm = self.store.load(&model.id, &model.source_url).await?;
        let handle = SandboxHandle::spawn(
            model.id.clone(),
            wasm,
            hosts,
            self.sandbox_config.clone(),
        )
        .await?;

        if let Err(e) = handle.self_test().await {
            handle.shutdown();
            return Err(e);
        }

        Ok(Arc::new(handle))
    }

    /// Shut down a provider's worker and forget the handle.
    pub async fn release(&self, id: &str) -> Result<(), ProviderError> {
        let removed = {
            let mut providers = self.providers.write().await;
            providers
                .remove(id)
                .ok_or_else(|| ProviderError::NotFound(id.to_string()))?
        };
        removed.handle.shutdown();
        tracing::info!(provider = %id, "provider released");
        Ok(())
    }

    /// Tear down every handle and reload from the current enabled set.
    /// Used after bulk config replacement.
    pub async fn reload(&self) {
        {
            let mut providers = self.providers.write().await;
            for active in providers.values() {
                active.handle.shutdown();
            }
            providers.clear();
        }
        self.load_enabled().await;
    }

    // ── User switches ────────────────────────────────────────────────

    /// Enable a provider and load it.
    ///
    /// The switch is durable even when the load fails; the load error is
    /// recorded against the provider and returned.
    pub async fn enable(&self, id: &str) -> Result<(), ProviderError> {
        self.set_enabled(id, true).await?;
        self.log_action(id, "enabled", None).await;
        self.emit(RegistryEvent::Enabled { id: id.to_string() });
        self.ensure_loaded(id).await?;
        Ok(())
    }

    /// Disable a provider and release its sandbox.
    pub async fn disable(&self, id: &str) -> Result<(), ProviderError> {
        self.set_enabled(id, false).await?;
        // Release if currently loaded.
        let _ = self.release(id).await;
        self.log_action(id, "disabled", None).await;
        self.emit(RegistryEvent::Disabled { id: id.to_string() });
        Ok(())
    }

    /// Replace a provider's user options blob.
    pub async fn set_options(
        &self,
        id: &str,
        options: serde_json::Value,
    ) -> Result<(), ProviderError> {
        let row = provider_option::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await?
            .ok_or_else(|| ProviderError::NotFound(id.to_string()))?;

        let mut active: provider_option::ActiveModel = row.into();
        active.options = Set(options.clone());
        active.updated_at = Set(chrono::Utc::now().fixed_offset());
        active.update(&self.db).await?;

        let mut providers = self.providers.write().await;
        if let Some(loaded) = providers.get_mut(id) {
            loaded.options = options;
        }
        Ok(())
    }

    /// Delete a provider: config row, options row, cached blob, live
    /// sandbox. The audit trail keeps its history.
    pub async fn remove(&self, id: &str) -> Result<(), ProviderError> {
        provider::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await?
            .ok_or_else(|| ProviderError::NotFound(id.to_string()))?;

        provider_option::Entity::delete_by_id(id.to_string())
            .exec(&self.db)
            .await?;
        provider::Entity::delete_by_id(id.to_string())
            .exec(&self.db)
            .await?;
        self.log_action(id, "removed", None).await;

        self.store.remove(id).await?;
        let _ = self.release(id).await;

        self.emit(RegistryEvent::Removed { id: id.to_string() });
        tracing::info!(provider = %id, "provider removed");
        Ok(())
    }

    // ── Persistence helpers ──────────────────────────────────────────

    /// Update a provider's health column.
    pub(crate) async fn set_status(
        &self,
        id: &str,
        status: &str,
        error_message: Option<&str>,
    ) -> Result<(), ProviderError> {
        let model = provider::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await?
            .ok_or_else(|| ProviderError::NotFound(id.to_string()))?;

        let mut active: provider::ActiveModel = model.into();
        active.status = Set(status.to_string());
        active.error_message = Set(error_message.map(|s| s.to_string()));
        active.updated_at = Set(chrono::Utc::now().fixed_offset());
        active.update(&self.db).await?;
        Ok(())
    }

    async fn set_enabled(&self, id: &str, enabled: bool) -> Result<(), ProviderError> {
        let row = provider_option::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await?
            .ok_or_else(|| ProviderError::NotFound(id.to_string()))?;

        let mut active: provider_option::ActiveModel = row.into();
        active.enabled = Set(enabled);
        active.updated_at = Set(chrono::Utc::now().fixed_offset());
        active.update(&self.db).await?;
        Ok(())
    }

    /// Append an audit row. Best-effort: a failed write is logged, never
    /// propagated.
    pub(crate) async fn log_action(&self, id: &str, action: &str, detail: Option<&str>) {
        if !self.log_events {
            return;
        }
        let entry = provider_log::ActiveModel {
            id: Set(Uuid::new_v4()),
            provider_id: Set(id.to_string()),
            action: Set(action.to_string()),
            detail: Set(detail.map(|s| s.to_string())),
            created_at: Set(chrono::Utc::now().fixed_offset()),
        };
        if let Err(e) = entry.insert(&self.db).await {
            tracing::warn!(provider = %id, action = %action, "failed to write audit row: {e}");
        }
    }

    // ── Query methods ────────────────────────────────────────────────

    /// Returns the number of currently loaded providers.
    pub async fn loaded_count(&self) -> usize {
        self.providers.read().await.len()
    }

    /// Check if a provider is currently loaded.
    pub async fn is_loaded(&self, id: &str) -> bool {
        self.providers.read().await.contains_key(id)
    }

    /// Get the database connection.
    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Get the source blob store.
    pub fn store(&self) -> &SourceStore {
        &self.store
    }

    /// Get the sandbox configuration.
    pub fn sandbox_config(&self) -> &SandboxConfig {
        &self.sandbox_config
    }
}

#[async_trait]
impl ProviderPool for ProviderRegistry {
    async fn snapshot(&self) -> Vec<ProviderSnapshot> {
        let providers = self.providers.read().await;
        let mut entries: Vec<ProviderSnapshot> = providers
            .iter()
            .map(|(id, active)| ProviderSnapshot {
                id: id.clone(),
                kind: active.kind,
                options: active.options.clone(),
                caller: active.handle.clone(),
            })
            .collect();
        // HashMap iteration order is arbitrary; fan-out order must be stable.
        entries.sort_by(|a, b| a.id.cmp(&b.id));
        entries
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────
