use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use sea_orm_migration::MigratorTrait;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use watchtime_db::AppState;
use watchtime_server::{build_router, library::DbLibrary, scrape::UdpScraper};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Database connection
    let db_config = watchtime_db::DatabaseConfig::from_env();
    tracing::info!("connecting to database...");
    let db = watchtime_db::connect(&db_config)
        .await
        .expect("failed to connect to database");

    // Run migrations
    tracing::info!("running database migrations...");
    watchtime_migration::Migrator::up(&db, None)
        .await
        .expect("failed to run migrations");
    tracing::info!("migrations complete");

    // Provider registry: bring up every enabled provider, then keep the
    // installed set fresh from its update manifests in the background.
    let registry = Arc::new(
        watchtime_provider::ProviderRegistry::from_env(&db)
            .expect("failed to initialize provider registry"),
    );
    registry.load_enabled().await;
    tracing::info!(loaded = registry.loaded_count().await, "provider registry ready");
    watchtime_provider::spawn_update_worker(registry.clone());

    // Metadata: episode index client plus the community filler table.
    let index = watchtime_metadata::HttpEpisodeIndex::from_env()
        .expect("failed to build episode index client");
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .expect("failed to build http client");
    let filler = watchtime_metadata::FillerTable::fetch(
        &http,
        &watchtime_metadata::FillerTable::url_from_env(),
    )
    .await;
    tracing::info!(entries = filler.len(), "filler table loaded");
    let metadata = Arc::new(watchtime_metadata::MetadataService::new(
        Arc::new(index),
        filler,
    ));

    // Search pipeline over the live registry.
    let pipeline = Arc::new(watchtime_search::SearchPipeline::new(
        registry.clone(),
        Arc::new(UdpScraper::from_env()),
        Arc::new(DbLibrary::new(db.clone())),
        Arc::new(watchtime_search::BasicTitleParser::new()),
    ));

    let state = Arc::new(AppState {
        db,
        providers: Some(registry as Arc<dyn std::any::Any + Send + Sync>),
        metadata: Some(metadata as Arc<dyn std::any::Any + Send + Sync>),
        search: Some(pipeline as Arc<dyn std::any::Any + Send + Sync>),
    });

    let app = build_router(state);

    let addr: SocketAddr = std::env::var("BIND_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:3000".to_string())
        .parse()
        .expect("invalid BIND_ADDR");
    tracing::info!(%addr, "server started");

    axum::serve(
        tokio::net::TcpListener::bind(addr)
            .await
            .expect("failed to bind listener"),
        app,
    )
    .await
    .expect("server error");
}
