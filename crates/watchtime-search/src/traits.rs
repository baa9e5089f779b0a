//! Collaborator seams for the search pipeline.
//!
//! The pipeline itself is transport-agnostic: providers, the tracker
//! scraper, the local library and the title parser all sit behind traits so
//! the fan-out can be exercised without sandboxes or a database.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SearchError;
use crate::options::SearchOptions;
use crate::types::{LibraryHit, ParsedTitle, RawResult, ScrapeEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Torrent,
    Nzb,
}

/// One live provider as seen by the fan-out, frozen at snapshot time.
#[derive(Clone)]
pub struct ProviderSnapshot {
    pub id: String,
    pub kind: ProviderKind,
    /// User-configured options for this provider, forwarded verbatim.
    pub options: serde_json::Value,
    pub caller: Arc<dyn ProviderCaller>,
}

/// The callable surface of one provider.
#[async_trait]
pub trait ProviderCaller: Send + Sync {
    /// Releases for a single episode.
    async fn single(
        &self,
        query: &SearchOptions,
        config: &serde_json::Value,
    ) -> Result<Vec<RawResult>, SearchError>;

    /// Movie releases.
    async fn movie(
        &self,
        query: &SearchOptions,
        config: &serde_json::Value,
    ) -> Result<Vec<RawResult>, SearchError>;

    /// Season and batch releases.
    async fn batch(
        &self,
        query: &SearchOptions,
        config: &serde_json::Value,
    ) -> Result<Vec<RawResult>, SearchError>;

    /// NZB lookup by infohash. `None` means the provider has nothing.
    async fn nzb_query(
        &self,
        hash: &str,
        config: &serde_json::Value,
    ) -> Result<Option<String>, SearchError>;
}

/// Source of live providers. The returned snapshot is stable for the
/// lifetime of one search; registry changes land in the next snapshot.
#[async_trait]
pub trait ProviderPool: Send + Sync {
    async fn snapshot(&self) -> Vec<ProviderSnapshot>;
}

/// Tracker scrape for fresh swarm counts.
#[async_trait]
pub trait Scraper: Send + Sync {
    async fn scrape(&self, hashes: &[String]) -> Result<Vec<ScrapeEntry>, SearchError>;
}

/// Completed downloads available on disk.
#[async_trait]
pub trait LocalLibrary: Send + Sync {
    async fn find_entry(&self, media_id: i64, episode: i32) -> Option<LibraryHit>;
}

/// Release title parsing.
pub trait TitleParser: Send + Sync {
    fn parse(&self, title: &str) -> ParsedTitle;
}
