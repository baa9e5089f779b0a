//! Search query assembly: title aliases, exclusion lists and the query
//! object forwarded to every provider.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use watchtime_metadata::Media;

// "2nd Season" / "3rd Season" / "4th Season"
static ORDINAL_SEASON_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d)(?:nd|rd|th) Season").unwrap());
// "Season 2"
static SEASON_NUMBER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Season (\d)").unwrap());

/// Codecs excluded for every client; browser engines cannot play these.
pub const BASE_EXCLUSIONS: [&str; 2] = ["DTS", "TrueHD"];

/// The query forwarded to every provider, serialized camelCase on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchOptions {
    pub anilist_id: i64,
    pub episode_count: Option<i32>,
    pub episode: i32,
    pub anidb_aid: Option<i64>,
    pub anidb_eid: Option<i64>,
    pub titles: Vec<String>,
    pub resolution: String,
    pub exclusions: Vec<String>,
}

impl SearchOptions {
    pub fn build(
        media: &Media,
        episode: i32,
        resolution: String,
        exclusions: Vec<String>,
        anidb_aid: Option<i64>,
        anidb_eid: Option<i64>,
    ) -> Self {
        Self {
            anilist_id: media.id,
            episode_count: media.episode_count(),
            episode,
            anidb_aid,
            anidb_eid,
            titles: create_titles(media),
            resolution,
            exclusions,
        }
    }
}

/// What the requesting client can play back. Anything it cannot decode gets
/// filtered out of provider queries up front.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackCapabilities {
    pub hevc: bool,
    pub ac3: bool,
    pub audio_tracks: bool,
}

impl Default for PlaybackCapabilities {
    fn default() -> Self {
        Self {
            hevc: true,
            ac3: true,
            audio_tracks: true,
        }
    }
}

/// Exclusion keywords for a client. An external player handles everything,
/// so it gets an empty list.
pub fn build_exclusions(caps: PlaybackCapabilities, external_player: bool) -> Vec<String> {
    if external_player {
        return Vec::new();
    }
    let mut exclusions: Vec<String> = BASE_EXCLUSIONS.iter().map(|s| s.to_string()).collect();
    if !caps.hevc {
        exclusions.extend(["HEVC", "x265", "H.265"].map(String::from));
    }
    if !caps.ac3 {
        exclusions.extend(["AC3", "AC-3"].map(String::from));
    }
    if !caps.audio_tracks {
        exclusions.extend(
            ["DUAL AUDIO", "Dual Audio", "MULTI AUDIO", "Multi Audio"].map(String::from),
        );
    }
    exclusions
}

/// Alias list for a media: every distinct title and synonym longer than
/// three characters, plus seasoned variants ("Season 2" and "2nd Season"
/// both gain an "S2" form) and hyphen-stripped copies.
pub fn create_titles(media: &Media) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut grouped: Vec<String> = Vec::new();
    let candidates = media
        .title
        .values()
        .map(str::to_owned)
        .chain(media.synonyms.iter().cloned());
    for candidate in candidates {
        if candidate.chars().count() > 3 && seen.insert(candidate.clone()) {
            grouped.push(candidate);
        }
    }

    let mut titles = Vec::new();
    for title in &grouped {
        append_title(title, &mut titles);
        if title.contains('-') {
            append_title(&title.replace('-', ""), &mut titles);
        }
    }
    titles
}

fn append_title(title: &str, titles: &mut Vec<String>) {
    titles.push(title.to_string());

    if let Some(caps) = SEASON_NUMBER_PATTERN.captures(title) {
        let short = format!("S{}", &caps[1]);
        titles.push(SEASON_NUMBER_PATTERN.replace(title, short.as_str()).into_owned());
    } else if let Some(caps) = ORDINAL_SEASON_PATTERN.captures(title) {
        let short = format!("S{}", &caps[1]);
        titles.push(ORDINAL_SEASON_PATTERN.replace(title, short.as_str()).into_owned());
    }
}
