//! Provider config import — fetch, validate, persist atomically.
//!
//! A config is a JSON array of provider manifests published at an HTTPS
//! URL. Imports are all-or-nothing: every entry is validated before the
//! database transaction opens, and the transaction lands every row or none.

use sea_orm::{ActiveModelTrait, EntityTrait, Set, TransactionTrait};
use uuid::Uuid;

use crate::error::ProviderError;
use crate::events::RegistryEvent;
use crate::manifest::{accuracy_column, kind_column, validate_https_url, ProviderManifest};
use crate::registry::ProviderRegistry;
use watchtime_db::entities::{provider, provider_log, provider_option};

/// Overwrite a config row with a fresh manifest entry, clearing any
/// recorded load failure. The id never changes.
pub(crate) fn apply_manifest(
    existing: provider::Model,
    entry: &ProviderManifest,
    source_path: String,
    now: chrono::DateTime<chrono::FixedOffset>,
) -> provider::ActiveModel {
    let mut active: provider::ActiveModel = existing.into();
    active.name = Set(entry.name.clone());
    active.version = Set(entry.version.clone());
    active.kind = Set(kind_column(entry.kind).to_string());
    active.accuracy = Set(accuracy_column(entry.accuracy).to_string());
    active.icon = Set(entry.icon.clone());
    active.hosts = Set(serde_json::json!(entry.hosts));
    active.source_url = Set(entry.source_url.clone());
    active.update_url = Set(entry.update_url.clone());
    active.source_path = Set(source_path);
    active.status = Set("ok".to_string());
    active.error_message = Set(None);
    active.updated_at = Set(now);
    active
}

impl ProviderRegistry {
    /// Fetch a config body from an HTTPS URL, screening the address first.
    pub(crate) async fn fetch_config_body(&self, config_url: &str) -> Result<String, ProviderError> {
        validate_https_url(config_url, "config URL")?;

        self.store()
            .client()
            .get(config_url)
            .send()
            .await
            .map_err(|e| {
                ProviderError::Import(format!("failed to fetch config from '{config_url}': {e}"))
            })?
            .error_for_status()
            .map_err(|e| {
                ProviderError::Import(format!("config fetch from '{config_url}' failed: {e}"))
            })?
            .text()
            .await
            .map_err(|e| ProviderError::Import(format!("failed to read config body: {e}")))
    }

    /// Import a provider config from an HTTPS URL.
    ///
    /// The full flow:
    /// 1. Screen the config URL (https only, never a private address)
    /// 2. Fetch the JSON array
    /// 3. Validate every entry; any failure aborts the whole import
    /// 4. Upsert config rows in one transaction; option rows are created
    ///    for new providers and preserved for existing ones
    /// 5. Broadcast `Imported`, then bring enabled providers up
    ///
    /// Returns the imported provider ids in config order.
    pub async fn import(&self, config_url: &str) -> Result<Vec<String>, ProviderError> {
        tracing::info!(url = %config_url, "importing provider config");
        let body = self.fetch_config_body(config_url).await?;
        self.import_config(&body).await
    }

    /// Validate a raw config body and persist it.
    async fn import_config(&self, body: &str) -> Result<Vec<String>, ProviderError> {
        let manifests = ProviderManifest::parse_and_validate_list(body)?;
        if manifests.is_empty() {
            tracing::warn!("config contains no providers, nothing to import");
            return Ok(Vec::new());
        }

        let now = chrono::Utc::now().fixed_offset();
        let txn = self.db().begin().await?;
        let mut ids = Vec::with_capacity(manifests.len());
        let mut stale_blobs = Vec::new();

        for entry in &manifests {
            let source_path = self
                .store()
                .blob_path(&entry.id)
                .to_string_lossy()
                .to_string();

            match provider::Entity::find_by_id(entry.id.clone()).one(&txn).await? {
                Some(existing) => {
                    if existing.version != entry.version {
                        stale_blobs.push(entry.id.clone());
                    }
                    apply_manifest(existing, entry, source_path, now)
                        .update(&txn)
                        .await?;
                }
                None => {
                    provider::ActiveModel {
                        id: Set(entry.id.clone()),
                        name: Set(entry.name.clone()),
                        version: Set(entry.version.clone()),
                        kind: Set(kind_column(entry.kind).to_string()),
                        accuracy: Set(accuracy_column(entry.accuracy).to_string()),
                        icon: Set(entry.icon.clone()),
                        hosts: Set(serde_json::json!(entry.hosts)),
                        source_url: Set(entry.source_url.clone()),
                        update_url: Set(entry.update_url.clone()),
                        source_path: Set(source_path),
                        status: Set("ok".to_string()),
                        error_message: Set(None),
                        installed_at: Set(now),
                        updated_at: Set(now),
                    }
                    .insert(&txn)
                    .await?;
                }
            }

            // Option rows belong to the user: created once, never replaced.
            if provider_option::Entity::find_by_id(entry.id.clone())
                .one(&txn)
                .await?
                .is_none()
            {
                provider_option::ActiveModel {
                    provider_id: Set(entry.id.clone()),
                    enabled: Set(true),
                    options: Set(serde_json::json!({})),
                    updated_at: Set(now),
                }
                .insert(&txn)
                .await?;
            }

            provider_log::ActiveModel {
                id: Set(Uuid::new_v4()),
                provider_id: Set(entry.id.clone()),
                action: Set("imported".to_string()),
                detail: Set(Some(format!("version {}", entry.version))),
                created_at: Set(now),
            }
            .insert(&txn)
            .await?;

            ids.push(entry.id.clone());
        }

        txn.commit().await?;

        // A version change invalidates the cached source; the next load
        // fetches the new blob.
        for id in &stale_blobs {
            if let Err(e) = self.store().remove(id).await {
                tracing::warn!(provider = %id, "failed to drop stale source blob: {e}");
            }
            let _ = self.release(id).await;
        }

        self.emit(RegistryEvent::Imported { ids: ids.clone() });
        tracing::info!(count = ids.len(), "provider config imported");

        // Bring enabled providers up. Per-provider failures are recorded and
        // broadcast inside ensure_loaded; disabled providers stay down.
        for id in &ids {
            let _ = self.ensure_loaded(id).await;
        }

        Ok(ids)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use watchtime_migration::{Migrator, MigratorTrait};

    use crate::sandbox::SandboxConfig;
    use crate::store::SourceStore;
    use sea_orm::DatabaseConnection;

    const EMPTY_MODULE: &[u8] = &[0x00, 0x61, 0x73, 0x6D, 0x01, 0x00, 0x00, 0x00];

    const CONFIG_TWO: &str = r#"[
      {
        "id": "alpha",
        "name": "Alpha",
        "version": "1.0.0",
        "type": "torrent",
        "accuracy": "high",
        "icon": "https://example.com/alpha.png",
        "hosts": ["releases.example.com"],
        "update": "https://example.com/config.json",
        "code": "https://example.com/alpha.wasm"
      },
      {
        "id": "beta",
        "name": "Beta",
        "version": "0.3.1",
        "type": "nzb",
        "accuracy": "medium",
        "icon": "https://example.com/beta.png",
        "update": "https://example.com/config.json",
        "code": "https://example.com/beta.wasm"
      }
    ]"#;

    const CONFIG_ALPHA_V2: &str = r#"[
      {
        "id": "alpha",
        "name": "Alpha",
        "version": "2.0.0",
        "type": "torrent",
        "accuracy": "high",
        "icon": "https://example.com/alpha.png",
        "hosts": ["releases.example.com"],
        "update": "https://example.com/config.json",
        "code": "https://example.com/alpha-2.wasm"
      }
    ]"#;

    async fn setup_db() -> DatabaseConnection {
        let db = sea_orm::Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        db
    }

    fn registry_with_dir(db: &DatabaseConnection, dir: &std::path::Path) -> ProviderRegistry {
        let store = SourceStore::new(dir, 1, Duration::from_secs(2)).unwrap();
        ProviderRegistry::new(db, store, SandboxConfig::default())
    }

    async fn audit_actions(db: &DatabaseConnection, id: &str) -> Vec<String> {
        use sea_orm::{ColumnTrait, QueryFilter};
        provider_log::Entity::find()
            .filter(provider_log::Column::ProviderId.eq(id))
            .all(db)
            .await
            .unwrap()
            .into_iter()
            .map(|row| row.action)
            .collect()
    }

    // ── Happy path ───────────────────────────────────────────────────

    #[tokio::test]
    async fn test_import_config_creates_rows_and_defaults() {
        let db = setup_db().await;
        let dir = tempfile::tempdir().unwrap();
        // Pre-cached blobs keep the load attempt off the network. The empty
        // module builds but fails its self-test.
        std::fs::write(dir.path().join("alpha.wasm"), EMPTY_MODULE).unwrap();
        std::fs::write(dir.path().join("beta.wasm"), EMPTY_MODULE).unwrap();
        let registry = registry_with_dir(&db, dir.path());
        let mut events = registry.subscribe();

        let ids = registry.import_config(CONFIG_TWO).await.unwrap();
        assert_eq!(ids, vec!["alpha".to_string(), "beta".to_string()]);

        let alpha = provider::Entity::find_by_id("alpha".to_string())
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(alpha.kind, "torrent");
        assert_eq!(alpha.accuracy, "high");
        assert_eq!(alpha.version, "1.0.0");
        assert_eq!(alpha.hosts, serde_json::json!(["releases.example.com"]));

        let beta = provider::Entity::find_by_id("beta".to_string())
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(beta.kind, "nzb");
        assert_eq!(beta.accuracy, "medium");
        assert_eq!(beta.hosts, serde_json::json!([]));

        for id in ["alpha", "beta"] {
            let option = provider_option::Entity::find_by_id(id.to_string())
                .one(&db)
                .await
                .unwrap()
                .unwrap();
            assert!(option.enabled);
            assert_eq!(option.options, serde_json::json!({}));
            assert!(audit_actions(&db, id).await.contains(&"imported".to_string()));
        }

        assert_eq!(
            events.try_recv().unwrap(),
            RegistryEvent::Imported {
                ids: vec!["alpha".into(), "beta".into()]
            }
        );
        // Both load attempts ran and failed the self-test, in config order.
        assert_eq!(
            events.try_recv().unwrap(),
            RegistryEvent::LoadFailed { id: "alpha".into() }
        );
        assert_eq!(
            events.try_recv().unwrap(),
            RegistryEvent::LoadFailed { id: "beta".into() }
        );
        assert_eq!(registry.loaded_count().await, 0);
    }

    #[tokio::test]
    async fn test_import_config_empty_array() {
        let db = setup_db().await;
        let dir = tempfile::tempdir().unwrap();
        let registry = registry_with_dir(&db, dir.path());
        let mut events = registry.subscribe();

        let ids = registry.import_config("[]").await.unwrap();
        assert!(ids.is_empty());
        assert!(provider::Entity::find().all(&db).await.unwrap().is_empty());
        assert!(events.try_recv().is_err());
    }

    // ── All-or-nothing ───────────────────────────────────────────────

    #[tokio::test]
    async fn test_import_config_bad_entry_imports_nothing() {
        let db = setup_db().await;
        let dir = tempfile::tempdir().unwrap();
        let registry = registry_with_dir(&db, dir.path());
        let mut events = registry.subscribe();

        let body = r#"[
          {
            "id": "alpha",
            "name": "Alpha",
            "version": "1.0.0",
            "type": "torrent",
            "accuracy": "high",
            "icon": "https://example.com/alpha.png",
            "update": "https://example.com/config.json",
            "code": "https://example.com/alpha.wasm"
          },
          {
            "id": "beta",
            "name": "Beta",
            "version": "not-a-version",
            "type": "nzb",
            "accuracy": "medium",
            "icon": "https://example.com/beta.png",
            "update": "https://example.com/config.json",
            "code": "https://example.com/beta.wasm"
          }
        ]"#;

        let err = registry.import_config(body).await.unwrap_err();
        assert!(matches!(err, ProviderError::InvalidManifest(_)));
        assert!(provider::Entity::find().all(&db).await.unwrap().is_empty());
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_import_config_duplicate_id_imports_nothing() {
        let db = setup_db().await;
        let dir = tempfile::tempdir().unwrap();
        let registry = registry_with_dir(&db, dir.path());

        let body = format!(
            "[{entry},{entry}]",
            entry = r#"{
              "id": "alpha",
              "name": "Alpha",
              "version": "1.0.0",
              "type": "torrent",
              "accuracy": "high",
              "icon": "https://example.com/alpha.png",
              "update": "https://example.com/config.json",
              "code": "https://example.com/alpha.wasm"
            }"#
        );

        let err = registry.import_config(&body).await.unwrap_err();
        assert!(matches!(err, ProviderError::InvalidManifest(_)));
        assert!(provider::Entity::find().all(&db).await.unwrap().is_empty());
    }

    // ── Re-import ────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_reimport_preserves_user_options() {
        let db = setup_db().await;
        let dir = tempfile::tempdir().unwrap();
        let blob = dir.path().join("alpha.wasm");
        std::fs::write(&blob, EMPTY_MODULE).unwrap();
        let registry = registry_with_dir(&db, dir.path());

        let alpha_v1 = r#"[
          {
            "id": "alpha",
            "name": "Alpha",
            "version": "1.0.0",
            "type": "torrent",
            "accuracy": "high",
            "icon": "https://example.com/alpha.png",
            "hosts": ["releases.example.com"],
            "update": "https://example.com/config.json",
            "code": "https://example.com/alpha.wasm"
          }
        ]"#;
        registry.import_config(alpha_v1).await.unwrap();

        registry
            .set_options("alpha", serde_json::json!({"apiKey": "k1"}))
            .await
            .unwrap();
        registry.disable("alpha").await.unwrap();

        registry.import_config(CONFIG_ALPHA_V2).await.unwrap();

        let model = provider::Entity::find_by_id("alpha".to_string())
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(model.version, "2.0.0");
        assert_eq!(model.source_url, "https://example.com/alpha-2.wasm");
        // Re-import clears any recorded load failure.
        assert_eq!(model.status, "ok");
        assert!(model.error_message.is_none());

        let option = provider_option::Entity::find_by_id("alpha".to_string())
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert!(!option.enabled);
        assert_eq!(option.options["apiKey"], "k1");

        // The version change dropped the stale blob; the disabled provider
        // was not loaded.
        assert!(!blob.exists());
        assert!(!registry.is_loaded("alpha").await);
    }

    // ── Config URL screening ─────────────────────────────────────────

    #[tokio::test]
    async fn test_import_screens_config_url() {
        let db = setup_db().await;
        let dir = tempfile::tempdir().unwrap();
        let registry = registry_with_dir(&db, dir.path());

        for url in [
            "http://example.com/config.json",
            "https://127.0.0.1/config.json",
            "https://169.254.169.254/config.json",
            "https://10.0.0.8/config.json",
            "not a url",
        ] {
            let err = registry.import(url).await.unwrap_err();
            assert!(
                matches!(err, ProviderError::InvalidManifest(_)),
                "expected rejection for {url}"
            );
        }
        assert!(provider::Entity::find().all(&db).await.unwrap().is_empty());
    }
}
