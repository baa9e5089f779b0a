//! Episode list reconciliation.
//!
//! Builds a contiguous episode list for a media by joining the AniList airing
//! schedule against episode index data. Some shows have specials numbered
//! into the regular sequence on the index side, so when counts disagree the
//! walk matches episodes by air date instead of by number, consuming index
//! entries as it moves forward in time.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;

use crate::filler::FillerTable;
use crate::index::{IndexEpisode, IndexEpisodes, Titles};
use crate::media::{FuzzyDate, Media};

/// One entry of the reconciled episode list.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeRecord {
    pub episode: i32,
    pub image: Option<String>,
    pub summary: Option<String>,
    pub rating: Option<String>,
    pub title: Option<Titles>,
    pub length: Option<i32>,
    pub airdate: Option<String>,
    pub airing_at: Option<DateTime<Utc>>,
    pub filler: bool,
    pub anidb_eid: Option<i64>,
}

// ─── Air schedule ──────────────────────────────────────────────────

/// Broadcast times per episode in unix millis, derived from the AniList
/// schedule. Single-episode media without an airing entry get episode 1
/// synthesized from the start date.
#[derive(Debug, Default)]
pub struct AirSchedule {
    slots: BTreeMap<i32, i64>,
}

impl AirSchedule {
    pub fn for_media(media: &Media) -> Self {
        let mut slots = BTreeMap::new();
        for (episode, airing_at) in media.dedupe_airing() {
            slots.insert(episode, airing_at * 1000);
        }
        if slots.get(&1).copied().unwrap_or(0) == 0 && media.is_single_episode() {
            if let Some(ms) = media.start_date.as_ref().and_then(FuzzyDate::to_unix_ms) {
                slots.insert(1, ms);
            }
        }
        Self { slots }
    }

    pub fn get(&self, episode: i32) -> Option<i64> {
        self.slots.get(&episode).copied()
    }
}

// ─── Episode pool ──────────────────────────────────────────────────

/// An index entry annotated with its parsed air date.
#[derive(Debug, Clone)]
pub struct PoolEpisode {
    pub entry: IndexEpisode,
    pub airdate_ms: Option<i64>,
}

/// Index entries in label order, consumed as the reconciliation walk
/// resolves them.
#[derive(Debug, Default)]
pub struct EpisodePool {
    entries: Vec<(String, PoolEpisode)>,
}

impl EpisodePool {
    pub fn from_index(index: &IndexEpisodes) -> Self {
        let mut entries: Vec<(String, PoolEpisode)> = index
            .episodes
            .iter()
            .map(|(label, entry)| {
                let airdate_ms = entry.airdate.as_deref().and_then(parse_airdate_ms);
                (
                    label.clone(),
                    PoolEpisode {
                        entry: entry.clone(),
                        airdate_ms,
                    },
                )
            })
            .collect();
        entries.sort_by(|(a, _), (b, _)| label_order(a, b));
        Self { entries }
    }

    pub fn get(&self, label: &str) -> Option<&PoolEpisode> {
        self.entries
            .iter()
            .find(|(key, _)| key == label)
            .map(|(_, episode)| episode)
    }

    /// Removes the resolved entry and everything that aired before it.
    fn consume(&mut self, resolved: &PoolEpisode, now_ms: i64) {
        let resolved_eid = resolved.entry.anidb_eid;
        let threshold = resolved.airdate_ms.unwrap_or(now_ms);
        self.entries.retain(|(_, candidate)| {
            let same_episode = resolved_eid.is_some() && candidate.entry.anidb_eid == resolved_eid;
            let aired_before = candidate.airdate_ms.is_some_and(|ms| ms < threshold);
            !(same_episode || aired_before)
        });
    }
}

/// Numeric labels ascending first, then specials ("S1", ...) lexicographically.
fn label_order(a: &str, b: &str) -> Ordering {
    match (a.parse::<i64>().ok(), b.parse::<i64>().ok()) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

fn parse_airdate_ms(airdate: &str) -> Option<i64> {
    if let Ok(date) = chrono::NaiveDate::parse_from_str(airdate, "%Y-%m-%d") {
        return Some(date.and_hms_opt(0, 0, 0)?.and_utc().timestamp_millis());
    }
    DateTime::parse_from_rfc3339(airdate)
        .ok()
        .map(|parsed| parsed.timestamp_millis())
}

// ─── Air-date matching ─────────────────────────────────────────────

/// Finds the pool entry closest to a broadcast time. Without a usable
/// broadcast time this is a plain label lookup. Several entries can share an
/// air date, in which case the label numerically closest to the requested
/// episode wins.
pub fn episode_by_air_date<'a>(
    al_date_ms: Option<i64>,
    pool: &'a EpisodePool,
    episode: i32,
) -> Option<&'a PoolEpisode> {
    let Some(target) = al_date_ms.filter(|ms| *ms != 0) else {
        return pool.get(&episode.to_string());
    };

    let mut best_distance: Option<i64> = None;
    let mut closest: Vec<&PoolEpisode> = Vec::new();
    for (_, candidate) in &pool.entries {
        // a missing air date compares as the epoch
        let distance = (candidate.airdate_ms.unwrap_or(0) - target).abs();
        match best_distance {
            Some(best) if distance > best => {}
            Some(best) if distance == best => closest.push(candidate),
            _ => {
                best_distance = Some(distance);
                closest.clear();
                closest.push(candidate);
            }
        }
    }

    if closest.is_empty() {
        return pool.get(&episode.to_string());
    }

    closest.into_iter().reduce(|prev, curr| {
        match (label_distance(curr, episode), label_distance(prev, episode)) {
            (Some(c), Some(p)) if c < p => curr,
            _ => prev,
        }
    })
}

fn label_distance(candidate: &PoolEpisode, episode: i32) -> Option<f64> {
    let label = candidate.entry.episode.as_deref()?;
    let number: f64 = label.trim().parse().ok()?;
    Some((number - f64::from(episode)).abs())
}

// ─── Episode list assembly ─────────────────────────────────────────

pub fn make_episode_list(
    media: &Media,
    index: Option<&IndexEpisodes>,
    filler: &FillerTable,
) -> Vec<EpisodeRecord> {
    let declared = media.episode_count();
    let index_count = index.and_then(|found| found.episode_count);
    let count = declared.or(index_count).unwrap_or(0);

    let schedule = AirSchedule::for_media(media);
    let mut pool = index.map(EpisodePool::from_index).unwrap_or_default();
    let now_ms = Utc::now().timestamp_millis();

    let has_special = index.and_then(|found| found.special_count).unwrap_or(0) != 0;
    let has_count_match = declared.unwrap_or(0) == index_count.unwrap_or(0);

    let mut list = Vec::new();
    for episode in 1..=count {
        let airing_at_ms = schedule.get(episode);
        let has_episode =
            index.is_some_and(|found| found.episodes.contains_key(&episode.to_string()));

        // Air-date matching is only needed when specials exist and the
        // numbering cannot be trusted.
        let needs_validation = !(!has_special || (has_episode && has_count_match));
        let resolved = if needs_validation {
            episode_by_air_date(airing_at_ms, &pool, episode).cloned()
        } else {
            pool.get(&episode.to_string()).cloned()
        };
        if needs_validation {
            if let Some(found) = &resolved {
                pool.consume(found, now_ms);
            }
        }

        let entry = resolved.as_ref().map(|found| &found.entry);
        list.push(EpisodeRecord {
            episode,
            image: entry.and_then(|e| e.image.clone()),
            summary: entry.and_then(|e| e.summary.clone().or_else(|| e.overview.clone())),
            rating: entry.and_then(|e| e.rating.clone()),
            title: entry.and_then(|e| e.title.clone()),
            length: entry.and_then(|e| e.length),
            airdate: entry.and_then(|e| e.airdate.clone()),
            airing_at: airing_at_ms.and_then(ms_to_datetime),
            filler: filler.is_filler(media.id, episode),
            anidb_eid: entry.and_then(|e| e.anidb_eid),
        });
    }
    list
}

fn ms_to_datetime(ms: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms).single()
}
