//! Release title parsing.
//!
//! A compact tokenizer for release names: enough structure for grouping and
//! filtering, not a full anitomy port. Bracketed segments are treated as
//! technical noise except the leading release group.

use std::sync::LazyLock;

use regex::Regex;

use crate::traits::TitleParser;
use crate::types::ParsedTitle;

static GROUP_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\[([^\]]+)\]").unwrap());

static BRACKET_SEGMENT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[^\]]*\]|\([^)]*\)").unwrap());

static RESOLUTION_2160_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"2160|3840x2160|4096x2160|4K|4k").unwrap());
static RESOLUTION_1080_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"1080|1920x1080").unwrap());
static RESOLUTION_720_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"720|1280x720").unwrap());
static RESOLUTION_480_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"480|854x480|640x480").unwrap());

static SEASON_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bS(\d{1,2})(?:\b|E)|Season\s*(\d{1,2})").unwrap());

static EPISODE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)s\d{1,2}\s?e(\d{1,4})|\be(?:p(?:isode)?)?\s*(\d{1,4})\b|\s-\s(\d{1,4})(?:v\d)?\b|第(\d{1,4})[話话集]?",
    )
    .unwrap()
});

static VIDEO_TERM_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(HEVC|x265|H\.?265|x264|H\.?264|AV1|AVC)\b").unwrap());
static AUDIO_TERM_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(FLAC|AAC|OPUS|DTS(?:-HD)?|TrueHD|E?AC-?3)\b").unwrap());

static MULTIPLE_SPACES_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s{2,}").unwrap());

#[derive(Debug, Clone, Default)]
pub struct BasicTitleParser;

impl BasicTitleParser {
    pub fn new() -> Self {
        Self {}
    }
}

fn detect_resolution(name: &str) -> Option<String> {
    if RESOLUTION_2160_PATTERN.is_match(name) {
        return Some("2160".to_string());
    }
    if RESOLUTION_1080_PATTERN.is_match(name) {
        return Some("1080".to_string());
    }
    if RESOLUTION_720_PATTERN.is_match(name) {
        return Some("720".to_string());
    }
    if RESOLUTION_480_PATTERN.is_match(name) {
        return Some("480".to_string());
    }
    None
}

impl TitleParser for BasicTitleParser {
    fn parse(&self, title: &str) -> ParsedTitle {
        let release_group = GROUP_PATTERN
            .captures(title)
            .map(|caps| caps[1].to_string());

        let cleaned = title.replace('_', " ");
        let resolution = detect_resolution(&cleaned);
        let video_term = VIDEO_TERM_PATTERN
            .find(&cleaned)
            .map(|found| found.as_str().to_string());
        let audio_term = AUDIO_TERM_PATTERN
            .find(&cleaned)
            .map(|found| found.as_str().to_string());
        let season = SEASON_PATTERN.captures(&cleaned).and_then(|caps| {
            caps.get(1)
                .or_else(|| caps.get(2))
                .map(|group| group.as_str().to_string())
        });

        // episode markers are searched with brackets stripped so checksums
        // and years inside them cannot match
        let stripped = BRACKET_SEGMENT_PATTERN.replace_all(&cleaned, " ");
        let episode_caps = EPISODE_PATTERN.captures(&stripped);
        let episode_number = episode_caps.as_ref().and_then(|caps| {
            caps.get(1)
                .or_else(|| caps.get(2))
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map(|group| group.as_str().to_string())
        });

        let title_region = match episode_caps.as_ref().and_then(|caps| caps.get(0)) {
            Some(found) => &stripped[..found.start()],
            None => stripped.as_ref(),
        };
        let mut working = title_region.to_string();
        if let Some(found) = SEASON_PATTERN.find(&working) {
            working.replace_range(found.range(), " ");
        }
        let collapsed = MULTIPLE_SPACES_PATTERN.replace_all(&working, " ");
        let anime_title = collapsed
            .trim()
            .trim_matches(|c| c == '-' || c == '.' || c == ' ')
            .to_string();

        ParsedTitle {
            anime_title: (!anime_title.is_empty()).then_some(anime_title),
            episode_number,
            season,
            video_resolution: resolution,
            release_group,
            video_term,
            audio_term,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(title: &str) -> ParsedTitle {
        BasicTitleParser::new().parse(title)
    }

    #[test]
    fn test_standard_fansub_release() {
        let parsed = parse("[SubsPlease] Sousou no Frieren - 28 (1080p) [F02B9CEE].mkv");
        assert_eq!(parsed.release_group.as_deref(), Some("SubsPlease"));
        assert_eq!(parsed.episode_number.as_deref(), Some("28"));
        assert_eq!(parsed.video_resolution.as_deref(), Some("1080"));
        assert_eq!(parsed.anime_title.as_deref(), Some("Sousou no Frieren"));
    }

    #[test]
    fn test_seasoned_release_with_terms() {
        let parsed = parse("[Erai-raws] Spy x Family S2 - 05 [720p][HEVC][Multiple Subtitle]");
        assert_eq!(parsed.season.as_deref(), Some("2"));
        assert_eq!(parsed.episode_number.as_deref(), Some("05"));
        assert_eq!(parsed.video_resolution.as_deref(), Some("720"));
        assert_eq!(parsed.video_term.as_deref(), Some("HEVC"));
        assert_eq!(parsed.anime_title.as_deref(), Some("Spy x Family"));
    }

    #[test]
    fn test_scene_style_numbering() {
        let parsed = parse("Title.S01E07.1080p.x264.AAC");
        assert_eq!(parsed.season.as_deref(), Some("01"));
        assert_eq!(parsed.episode_number.as_deref(), Some("07"));
        assert_eq!(parsed.video_resolution.as_deref(), Some("1080"));
        assert_eq!(parsed.video_term.as_deref(), Some("x264"));
        assert_eq!(parsed.audio_term.as_deref(), Some("AAC"));
        assert_eq!(parsed.anime_title.as_deref(), Some("Title"));
    }

    #[test]
    fn test_checksum_bracket_not_taken_as_episode() {
        let parsed = parse("[Group] Plain Title [12F4AB78]");
        assert_eq!(parsed.episode_number, None);
        assert_eq!(parsed.anime_title.as_deref(), Some("Plain Title"));
    }

    #[test]
    fn test_cjk_episode_marker() {
        let parsed = parse("某アニメ 第3話");
        assert_eq!(parsed.episode_number.as_deref(), Some("3"));
    }

    #[test]
    fn test_bare_title_parses_to_title_only() {
        let parsed = parse("Some Movie Name");
        assert_eq!(parsed.anime_title.as_deref(), Some("Some Movie Name"));
        assert_eq!(parsed.episode_number, None);
        assert_eq!(parsed.season, None);
        assert_eq!(parsed.video_resolution, None);
    }

    #[test]
    fn test_resolution_from_dimensions() {
        let parsed = parse("Show - 02 [1920x1080]");
        assert_eq!(parsed.video_resolution.as_deref(), Some("1080"));
    }
}
