//! Filler episode table.
//!
//! Fetched once at startup from a community-maintained JSON file mapping
//! AniList media ids to filler episode numbers. A failed fetch yields an
//! empty table, which marks every episode as canon.

use std::collections::HashMap;

use reqwest::Client;

const DEFAULT_FILLER_URL: &str =
    "https://raw.githubusercontent.com/ThaUnknown/filler-scrape/master/filler.json";

#[derive(Debug, Default)]
pub struct FillerTable {
    entries: HashMap<i64, Vec<i32>>,
}

impl FillerTable {
    pub fn new(entries: HashMap<i64, Vec<i32>>) -> Self {
        Self { entries }
    }

    /// Reads `FILLER_URL`, falling back to the public table.
    pub fn url_from_env() -> String {
        std::env::var("FILLER_URL").unwrap_or_else(|_| DEFAULT_FILLER_URL.to_string())
    }

    pub async fn fetch(client: &Client, url: &str) -> Self {
        let response = match client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("filler table request failed: {}", e);
                return Self::default();
            }
        };
        if !response.status().is_success() {
            tracing::warn!(status = %response.status(), "filler table returned an error");
            return Self::default();
        }
        // keys arrive as strings, values may be null
        let raw: HashMap<String, Option<Vec<i32>>> = match response.json().await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!("failed to decode filler table: {}", e);
                return Self::default();
            }
        };
        let entries = raw
            .into_iter()
            .filter_map(|(id, episodes)| Some((id.parse().ok()?, episodes?)))
            .collect();
        Self { entries }
    }

    pub fn is_filler(&self, media_id: i64, episode: i32) -> bool {
        self.entries
            .get(&media_id)
            .is_some_and(|episodes| episodes.contains(&episode))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
