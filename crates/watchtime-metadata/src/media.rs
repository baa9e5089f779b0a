//! AniList-shaped media model and schedule helpers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Subset of the AniList media object consumed by search and episode listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Media {
    pub id: i64,
    #[serde(default)]
    pub id_mal: Option<i64>,
    #[serde(default)]
    pub title: MediaTitle,
    #[serde(default)]
    pub synonyms: Vec<String>,
    #[serde(default)]
    pub format: Option<MediaFormat>,
    #[serde(default)]
    pub episodes: Option<i32>,
    #[serde(default)]
    pub start_date: Option<FuzzyDate>,
    #[serde(default)]
    pub airing_schedule: Vec<AiringEvent>,
    #[serde(default)]
    pub next_airing_episode: Option<AiringEvent>,
    #[serde(default)]
    pub relations: Vec<MediaEdge>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaTitle {
    #[serde(default)]
    pub romaji: Option<String>,
    #[serde(default)]
    pub english: Option<String>,
    #[serde(default)]
    pub native: Option<String>,
    #[serde(default)]
    pub user_preferred: Option<String>,
}

impl MediaTitle {
    /// Title values in a stable order for alias generation.
    pub fn values(&self) -> impl Iterator<Item = &str> + '_ {
        [
            self.romaji.as_deref(),
            self.english.as_deref(),
            self.native.as_deref(),
            self.user_preferred.as_deref(),
        ]
        .into_iter()
        .flatten()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MediaFormat {
    Tv,
    TvShort,
    Movie,
    Special,
    Ova,
    Ona,
    Music,
    Manga,
    Novel,
    OneShot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationKind {
    Adaptation,
    Prequel,
    Sequel,
    Parent,
    SideStory,
    Character,
    Summary,
    Alternative,
    SpinOff,
    Source,
    Compilation,
    Contains,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaEdge {
    pub relation_type: RelationKind,
    pub node: RelatedMedia,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedMedia {
    pub id: i64,
    #[serde(default)]
    pub format: Option<MediaFormat>,
}

/// A scheduled or past broadcast of one episode. `airing_at` is unix seconds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiringEvent {
    pub episode: i32,
    pub airing_at: i64,
}

/// AniList fuzzy date, any component may be absent.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FuzzyDate {
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub month: Option<u32>,
    #[serde(default)]
    pub day: Option<u32>,
}

impl FuzzyDate {
    /// Unix millis at UTC midnight. Missing month/day default to the first.
    pub fn to_unix_ms(&self) -> Option<i64> {
        let date = chrono::NaiveDate::from_ymd_opt(
            self.year.unwrap_or(0),
            self.month.unwrap_or(1),
            self.day.unwrap_or(1),
        )?;
        Some(date.and_hms_opt(0, 0, 0)?.and_utc().timestamp_millis())
    }
}

impl Media {
    /// Declared episode count, falling back to the last episode that aired.
    pub fn episode_count(&self) -> Option<i32> {
        self.episodes
            .or_else(|| self.next_airing_episode.as_ref().map(|next| next.episode - 1))
    }

    pub fn is_movie(&self) -> bool {
        self.format == Some(MediaFormat::Movie)
    }

    /// Media that airs as exactly one episode.
    pub fn is_single_episode(&self) -> bool {
        self.episode_count() == Some(1)
    }

    /// Airing schedule with duplicate episode entries collapsed. AniList can
    /// report several broadcasts for one episode (pre-releases); the last
    /// entry wins. Values are unix seconds.
    pub fn dedupe_airing(&self) -> BTreeMap<i32, i64> {
        let mut dedup = BTreeMap::new();
        for event in &self.airing_schedule {
            dedup.insert(event.episode, event.airing_at);
        }
        dedup
    }

    /// For specials, the series they belong to. Prefers the parent story over
    /// prequels and sequels, and only follows edges that point at a series.
    pub fn parent_for_special(&self) -> Option<i64> {
        if !matches!(
            self.format,
            Some(MediaFormat::Special | MediaFormat::Ova | MediaFormat::Ona)
        ) {
            return None;
        }
        for kind in [RelationKind::Parent, RelationKind::Prequel, RelationKind::Sequel] {
            let found = self.relations.iter().find(|edge| {
                edge.relation_type == kind
                    && matches!(
                        edge.node.format,
                        Some(MediaFormat::Tv | MediaFormat::TvShort | MediaFormat::Movie)
                    )
            });
            if let Some(edge) = found {
                return Some(edge.node.id);
            }
        }
        None
    }
}
