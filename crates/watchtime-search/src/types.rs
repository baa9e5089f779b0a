//! Result types shared between providers and the merge pipeline.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Peer counts at or above this value are tracker glitches and read as zero.
pub const PEER_COUNT_CEILING: u32 = 30_000;

pub fn clamp_peer_count(count: u32) -> u32 {
    if count >= PEER_COUNT_CEILING {
        0
    } else {
        count
    }
}

/// Confidence a provider assigns to a result matching the query. Ordered
/// best first so `min` picks the better of two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Accuracy {
    High,
    Medium,
    Low,
}

/// How a release relates to the requested episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultKind {
    Batch,
    Best,
    Alt,
}

/// A single result as returned by a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawResult {
    pub title: String,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub seeders: u32,
    #[serde(default)]
    pub leechers: u32,
    #[serde(default)]
    pub downloads: u32,
    pub hash: String,
    #[serde(default)]
    pub size: u64,
    pub accuracy: Accuracy,
    #[serde(default, rename = "type")]
    pub kind: Option<ResultKind>,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
}

/// A result after provider attribution and hash-level merging.
#[derive(Debug, Clone, Serialize)]
pub struct MergedResult {
    pub title: String,
    pub link: Option<String>,
    pub id: Option<i64>,
    pub seeders: u32,
    pub leechers: u32,
    pub downloads: u32,
    pub hash: String,
    pub size: u64,
    pub accuracy: Accuracy,
    #[serde(rename = "type")]
    pub kind: Option<ResultKind>,
    pub date: Option<DateTime<Utc>>,
    /// Every provider that returned this hash.
    pub providers: BTreeSet<String>,
    pub parsed: Option<ParsedTitle>,
}

impl MergedResult {
    /// Attributes a raw result to a provider. Absurd peer counts are zeroed
    /// here so merge order never resurrects them.
    pub fn from_raw(raw: RawResult, provider: &str) -> Self {
        Self {
            title: raw.title,
            link: raw.link,
            id: raw.id,
            seeders: clamp_peer_count(raw.seeders),
            leechers: clamp_peer_count(raw.leechers),
            downloads: raw.downloads,
            hash: raw.hash,
            size: raw.size,
            accuracy: raw.accuracy,
            kind: raw.kind,
            date: raw.date,
            providers: BTreeSet::from([provider.to_string()]),
            parsed: None,
        }
    }

    /// A completed local download presented as a search result.
    pub fn from_library(hit: LibraryHit) -> Self {
        Self {
            title: hit.name.unwrap_or_else(|| hit.hash.clone()),
            link: Some(hit.hash.clone()),
            id: None,
            seeders: 0,
            leechers: 0,
            downloads: 0,
            hash: hit.hash,
            size: hit.size,
            accuracy: Accuracy::Medium,
            kind: (hit.files > 1).then_some(ResultKind::Batch),
            date: Some(hit.date),
            providers: BTreeSet::from(["local".to_string()]),
            parsed: None,
        }
    }
}

/// A completed download known to the local library.
#[derive(Debug, Clone)]
pub struct LibraryHit {
    pub hash: String,
    pub name: Option<String>,
    pub size: u64,
    pub files: i32,
    pub date: DateTime<Utc>,
}

/// One provider's failure, reported alongside partial results.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderFailure {
    pub provider: String,
    pub error: String,
}

/// Swarm counts for one hash as reported by a tracker scrape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeEntry {
    pub hash: String,
    pub complete: u32,
    pub downloaded: u32,
    pub incomplete: u32,
}

/// An NZB located by a provider, paired with the options it was found under
/// so the caller can hand both to the download client.
#[derive(Debug, Clone, Serialize)]
pub struct NzbResult {
    pub nzb: String,
    pub options: serde_json::Value,
}

/// Structured fields recovered from a release title.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedTitle {
    pub anime_title: Option<String>,
    pub episode_number: Option<String>,
    pub season: Option<String>,
    pub video_resolution: Option<String>,
    pub release_group: Option<String>,
    pub video_term: Option<String>,
    pub audio_term: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(hash: &str) -> RawResult {
        RawResult {
            title: "test release".to_string(),
            link: None,
            id: None,
            seeders: 10,
            leechers: 5,
            downloads: 100,
            hash: hash.to_string(),
            size: 700,
            accuracy: Accuracy::High,
            kind: None,
            date: None,
        }
    }

    #[test]
    fn test_accuracy_orders_best_first() {
        assert!(Accuracy::High < Accuracy::Medium);
        assert!(Accuracy::Medium < Accuracy::Low);
        assert_eq!(Accuracy::High.min(Accuracy::Low), Accuracy::High);
    }

    #[test]
    fn test_clamp_peer_count_ceiling() {
        assert_eq!(clamp_peer_count(29_999), 29_999);
        assert_eq!(clamp_peer_count(30_000), 0);
        assert_eq!(clamp_peer_count(100_000), 0);
    }

    #[test]
    fn test_from_raw_zeroes_absurd_peers() {
        let mut entry = raw("abc");
        entry.seeders = 50_000;
        entry.leechers = 31_000;
        let merged = MergedResult::from_raw(entry, "nyaa");
        assert_eq!(merged.seeders, 0);
        assert_eq!(merged.leechers, 0);
        assert!(merged.providers.contains("nyaa"));
    }

    #[test]
    fn test_from_library_batch_detection() {
        let hit = LibraryHit {
            hash: "deadbeef".to_string(),
            name: None,
            size: 1000,
            files: 3,
            date: Utc::now(),
        };
        let merged = MergedResult::from_library(hit);
        assert_eq!(merged.kind, Some(ResultKind::Batch));
        assert_eq!(merged.title, "deadbeef");
        assert_eq!(merged.accuracy, Accuracy::Medium);
        assert!(merged.providers.contains("local"));
    }

    #[test]
    fn test_from_library_single_file_has_no_kind() {
        let hit = LibraryHit {
            hash: "deadbeef".to_string(),
            name: Some("My Show E01.mkv".to_string()),
            size: 1000,
            files: 1,
            date: Utc::now(),
        };
        let merged = MergedResult::from_library(hit);
        assert_eq!(merged.kind, None);
        assert_eq!(merged.title, "My Show E01.mkv");
    }

    #[test]
    fn test_raw_result_wire_shape() {
        let json = serde_json::json!({
            "title": "Show - 01",
            "hash": "abc123",
            "seeders": 12,
            "leechers": 2,
            "downloads": 300,
            "size": 1_470_000_000u64,
            "accuracy": "high",
            "type": "best",
            "date": "2024-02-01T12:00:00Z"
        });
        let decoded: RawResult = serde_json::from_value(json).unwrap();
        assert_eq!(decoded.accuracy, Accuracy::High);
        assert_eq!(decoded.kind, Some(ResultKind::Best));
        assert!(decoded.link.is_none());
    }
}
