//! Episode index client.
//!
//! Talks to an ani.zip compatible index for per-episode metadata and
//! cross-database id mappings. Lookups are best effort: network or decode
//! failures degrade to `None` so episode listing can proceed on schedule
//! data alone.

use std::collections::HashMap;
use std::sync::Arc;

use reqwest::Client;
use serde::Deserialize;
use tokio::sync::RwLock;

const DEFAULT_INDEX_BASE_URL: &str = "https://hayase.ani.zip/v1";

/// Per-language episode titles, keyed by language code ("en", "ja", "x-jat").
pub type Titles = HashMap<String, String>;

// ─── Index response types ──────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IndexEpisodes {
    /// Keyed by episode label: "1", "2", ... for regular episodes, "S1" and
    /// friends for specials.
    #[serde(default)]
    pub episodes: HashMap<String, IndexEpisode>,
    #[serde(rename = "episodeCount")]
    pub episode_count: Option<i32>,
    #[serde(rename = "specialCount")]
    pub special_count: Option<i32>,
    #[serde(default)]
    pub mappings: Option<IndexMappings>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IndexEpisode {
    pub episode: Option<String>,
    #[serde(rename = "anidbEid")]
    pub anidb_eid: Option<i64>,
    pub airdate: Option<String>,
    pub length: Option<i32>,
    pub overview: Option<String>,
    pub summary: Option<String>,
    pub rating: Option<String>,
    pub image: Option<String>,
    pub title: Option<Titles>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IndexMappings {
    pub anidb_id: Option<i64>,
    pub anilist_id: Option<i64>,
    pub mal_id: Option<i64>,
    pub kitsu_id: Option<i64>,
    pub thetvdb_id: Option<i64>,
    pub imdb_id: Option<String>,
}

/// Which external id a mappings lookup is keyed on. The index only exposes
/// these three as query parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingKey {
    Anilist(i64),
    Mal(i64),
    Kitsu(i64),
}

// ─── Index trait + HTTP implementation ─────────────────────────────

#[async_trait::async_trait]
pub trait EpisodeIndex: Send + Sync {
    async fn episodes(&self, anilist_id: i64) -> Option<IndexEpisodes>;
    async fn mappings(&self, key: MappingKey) -> Option<IndexMappings>;
}

pub struct HttpEpisodeIndex {
    client: Client,
    base_url: String,
}

impl HttpEpisodeIndex {
    pub fn new(base_url: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// Reads `EPISODE_INDEX_URL`, falling back to the public index.
    pub fn from_env() -> Result<Self, reqwest::Error> {
        let base_url = std::env::var("EPISODE_INDEX_URL")
            .unwrap_or_else(|_| DEFAULT_INDEX_BASE_URL.to_string());
        Self::new(base_url)
    }

    async fn fetch_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Option<T> {
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(url = %url, "episode index request failed: {}", e);
                return None;
            }
        };
        if !response.status().is_success() {
            tracing::warn!(url = %url, status = %response.status(), "episode index returned an error");
            return None;
        }
        match response.json::<T>().await {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                tracing::warn!(url = %url, "failed to decode episode index response: {}", e);
                None
            }
        }
    }
}

#[async_trait::async_trait]
impl EpisodeIndex for HttpEpisodeIndex {
    async fn episodes(&self, anilist_id: i64) -> Option<IndexEpisodes> {
        let url = format!("{}/episodes?anilist_id={}", self.base_url, anilist_id);
        self.fetch_json(&url).await
    }

    async fn mappings(&self, key: MappingKey) -> Option<IndexMappings> {
        let url = match key {
            MappingKey::Anilist(id) => format!("{}/mappings?anilist_id={}", self.base_url, id),
            MappingKey::Mal(id) => format!("{}/mappings?mal_id={}", self.base_url, id),
            MappingKey::Kitsu(id) => format!("{}/mappings?kitsu_id={}", self.base_url, id),
        };
        self.fetch_json(&url).await
    }
}

// ─── Caching layer ─────────────────────────────────────────────────

/// Memoizes index responses and keeps an AniList <-> AniDB id map in both
/// directions. The index has no AniDB query parameter, so the reverse
/// direction is only learned from responses seen so far.
pub struct IndexCache {
    index: Arc<dyn EpisodeIndex>,
    episodes: RwLock<HashMap<i64, Arc<IndexEpisodes>>>,
    anilist_to_anidb: RwLock<HashMap<i64, i64>>,
    anidb_to_anilist: RwLock<HashMap<i64, i64>>,
}

impl IndexCache {
    pub fn new(index: Arc<dyn EpisodeIndex>) -> Self {
        Self {
            index,
            episodes: RwLock::new(HashMap::new()),
            anilist_to_anidb: RwLock::new(HashMap::new()),
            anidb_to_anilist: RwLock::new(HashMap::new()),
        }
    }

    /// Episode data for an AniList id. Successful responses are cached,
    /// failures are retried on the next call.
    pub async fn episodes(&self, anilist_id: i64) -> Option<Arc<IndexEpisodes>> {
        if let Some(found) = self.episodes.read().await.get(&anilist_id) {
            return Some(found.clone());
        }
        let fetched = Arc::new(self.index.episodes(anilist_id).await?);
        if let Some(mappings) = &fetched.mappings {
            self.learn(anilist_id, mappings).await;
        }
        self.episodes
            .write()
            .await
            .insert(anilist_id, fetched.clone());
        Some(fetched)
    }

    pub async fn mappings(&self, key: MappingKey) -> Option<IndexMappings> {
        let mappings = self.index.mappings(key).await?;
        let anilist_id = match key {
            MappingKey::Anilist(id) => Some(id),
            MappingKey::Mal(_) | MappingKey::Kitsu(_) => mappings.anilist_id,
        };
        if let Some(anilist_id) = anilist_id {
            self.learn(anilist_id, &mappings).await;
        }
        Some(mappings)
    }

    /// AniDB anime id for an AniList id, consulting the index on a cache miss.
    pub async fn anidb_for(&self, anilist_id: i64) -> Option<i64> {
        if let Some(found) = self.anilist_to_anidb.read().await.get(&anilist_id) {
            return Some(*found);
        }
        self.mappings(MappingKey::Anilist(anilist_id))
            .await?
            .anidb_id
    }

    /// Reverse lookup, served from learned mappings only.
    pub async fn anilist_for_anidb(&self, anidb_id: i64) -> Option<i64> {
        self.anidb_to_anilist.read().await.get(&anidb_id).copied()
    }

    async fn learn(&self, anilist_id: i64, mappings: &IndexMappings) {
        let Some(anidb_id) = mappings.anidb_id else {
            return;
        };
        self.anilist_to_anidb
            .write()
            .await
            .insert(anilist_id, anidb_id);
        self.anidb_to_anilist
            .write()
            .await
            .insert(anidb_id, anilist_id);
    }
}
