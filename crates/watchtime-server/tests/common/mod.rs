// Shared test utilities for integration tests
use std::sync::Arc;
use std::time::Duration;

use sea_orm::{ActiveModelTrait, ActiveValue::Set, DatabaseConnection};
use sea_orm_migration::MigratorTrait;

use watchtime_db::entities::{provider, provider_option};
use watchtime_db::AppState;
use watchtime_metadata::{
    EpisodeIndex, FillerTable, IndexEpisodes, IndexMappings, MappingKey, MetadataService,
};
use watchtime_migration::Migrator;
use watchtime_provider::{ProviderRegistry, SandboxConfig, SourceStore};
use watchtime_search::{BasicTitleParser, SearchPipeline};
use watchtime_server::{library::DbLibrary, scrape::UdpScraper};

/// Smallest valid WASM module: magic plus version, no sections. Builds fine,
/// exports nothing, so a provider self-test against it fails.
pub const EMPTY_MODULE: &[u8] = &[0x00, 0x61, 0x73, 0x6D, 0x01, 0x00, 0x00, 0x00];

pub async fn test_db() -> DatabaseConnection {
    let db = sea_orm::Database::connect("sqlite::memory:").await.unwrap();
    Migrator::up(&db, None).await.unwrap();
    db
}

pub fn test_registry(db: &DatabaseConnection, dir: &std::path::Path) -> Arc<ProviderRegistry> {
    let store = SourceStore::new(dir, 1, Duration::from_secs(2)).unwrap();
    Arc::new(ProviderRegistry::new(db, store, SandboxConfig::default()))
}

/// Index stub that always misses; episode lists degrade to schedule data.
pub struct EmptyIndex;

#[async_trait::async_trait]
impl EpisodeIndex for EmptyIndex {
    async fn episodes(&self, _anilist_id: i64) -> Option<IndexEpisodes> {
        None
    }

    async fn mappings(&self, _key: MappingKey) -> Option<IndexMappings> {
        None
    }
}

/// Full application state over the given database and registry. The tracker
/// points at a dead local port with a short timeout, so scrapes fail fast.
pub fn test_state(
    db: DatabaseConnection,
    registry: Arc<ProviderRegistry>,
    index: Arc<dyn EpisodeIndex>,
) -> Arc<AppState> {
    let metadata = Arc::new(MetadataService::new(index, FillerTable::default()));
    let pipeline = Arc::new(SearchPipeline::new(
        registry.clone(),
        Arc::new(UdpScraper::new(
            "127.0.0.1:9".to_string(),
            Duration::from_millis(100),
        )),
        Arc::new(DbLibrary::new(db.clone())),
        Arc::new(BasicTitleParser::new()),
    ));
    Arc::new(AppState {
        db,
        providers: Some(registry as Arc<dyn std::any::Any + Send + Sync>),
        metadata: Some(metadata as Arc<dyn std::any::Any + Send + Sync>),
        search: Some(pipeline as Arc<dyn std::any::Any + Send + Sync>),
    })
}

/// Insert a provider config row without an options row.
pub async fn seed_config(db: &DatabaseConnection, id: &str) {
    let now = chrono::Utc::now().fixed_offset();
    provider::ActiveModel {
        id: Set(id.to_string()),
        name: Set(format!("{id} provider")),
        version: Set("1.0.0".to_string()),
        kind: Set("torrent".to_string()),
        accuracy: Set("high".to_string()),
        icon: Set("https://example.com/icon.png".to_string()),
        hosts: Set(serde_json::json!([])),
        source_url: Set(format!("https://example.com/{id}.wasm")),
        update_url: Set("https://example.com/config.json".to_string()),
        source_path: Set(String::new()),
        status: Set("ok".to_string()),
        error_message: Set(None),
        installed_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .unwrap();
}

/// Insert a provider config row plus its options row.
pub async fn seed_provider(db: &DatabaseConnection, id: &str, enabled: bool) {
    seed_config(db, id).await;
    provider_option::ActiveModel {
        provider_id: Set(id.to_string()),
        enabled: Set(enabled),
        options: Set(serde_json::json!({})),
        updated_at: Set(chrono::Utc::now().fixed_offset()),
    }
    .insert(db)
    .await
    .unwrap();
}
