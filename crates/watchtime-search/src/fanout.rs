//! Provider fan-out.
//!
//! Dispatches one query to every live torrent provider concurrently,
//! collects per-provider failures without aborting the search, then merges,
//! parses and refreshes the combined results. Output order is deterministic:
//! providers in snapshot order, and within one provider single, then movie
//! or batch results.

use std::sync::Arc;

use futures::future::join_all;

use watchtime_metadata::Media;

use crate::dedupe::dedupe;
use crate::error::SearchError;
use crate::options::SearchOptions;
use crate::traits::{LocalLibrary, ProviderKind, ProviderPool, ProviderSnapshot, Scraper, TitleParser};
use crate::types::{MergedResult, NzbResult, ProviderFailure, RawResult};

pub struct SearchPipeline {
    pool: Arc<dyn ProviderPool>,
    scraper: Arc<dyn Scraper>,
    library: Arc<dyn LocalLibrary>,
    parser: Arc<dyn TitleParser>,
}

/// Merged results plus every provider failure encountered on the way.
#[derive(Debug)]
pub struct SearchOutcome {
    pub results: Vec<MergedResult>,
    pub failures: Vec<ProviderFailure>,
}

impl SearchPipeline {
    pub fn new(
        pool: Arc<dyn ProviderPool>,
        scraper: Arc<dyn Scraper>,
        library: Arc<dyn LocalLibrary>,
        parser: Arc<dyn TitleParser>,
    ) -> Self {
        Self {
            pool,
            scraper,
            library,
            parser,
        }
    }

    /// Torrent search across all live providers.
    ///
    /// Offline, providers and the tracker are unreachable, so the query is
    /// answered from the local library alone. Online, the library is ignored
    /// and swarm counts are refreshed from a tracker scrape.
    pub async fn search(
        &self,
        media: &Media,
        query: &SearchOptions,
        online: bool,
    ) -> Result<SearchOutcome, SearchError> {
        let snapshot = self.pool.snapshot().await;
        if snapshot.is_empty() {
            return Err(SearchError::NoProvidersConfigured);
        }

        if !online {
            let mut results = Vec::new();
            if let Some(hit) = self.library.find_entry(media.id, query.episode).await {
                let mut entry = MergedResult::from_library(hit);
                entry.parsed = Some(self.parser.parse(&entry.title));
                results.push(entry);
            }
            tracing::debug!(results = results.len(), "offline search served from library");
            return Ok(SearchOutcome {
                results,
                failures: Vec::new(),
            });
        }

        let movie = media.is_movie();
        let single = media.is_single_episode();
        let check_movie = !single && movie;
        let check_batch = !single && !movie;

        let torrent_providers: Vec<&ProviderSnapshot> = snapshot
            .iter()
            .filter(|provider| provider.kind == ProviderKind::Torrent)
            .collect();

        tracing::debug!(
            media = media.id,
            episode = query.episode,
            providers = torrent_providers.len(),
            movie = check_movie,
            batch = check_batch,
            "dispatching search"
        );

        let outcomes = join_all(
            torrent_providers
                .iter()
                .map(|provider| call_provider(provider, query, check_movie, check_batch)),
        )
        .await;

        let mut results: Vec<MergedResult> = Vec::new();
        let mut failures: Vec<ProviderFailure> = Vec::new();
        for (provider, modes) in torrent_providers.iter().zip(outcomes) {
            for outcome in modes {
                match outcome {
                    Ok(found) => results.extend(
                        found
                            .into_iter()
                            .map(|raw| MergedResult::from_raw(raw, &provider.id)),
                    ),
                    Err(e) => {
                        tracing::error!(provider = %provider.id, "provider search failed: {}", e);
                        failures.push(ProviderFailure {
                            provider: provider.id.clone(),
                            error: e.to_string(),
                        });
                    }
                }
            }
        }

        tracing::debug!(results = results.len(), "search fan-out complete");

        let mut deduped = dedupe(results);
        if deduped.is_empty() {
            return Ok(SearchOutcome {
                results: Vec::new(),
                failures,
            });
        }

        for result in &mut deduped {
            result.parsed = Some(self.parser.parse(&result.title));
        }

        self.update_peer_counts(&mut deduped).await;

        Ok(SearchOutcome {
            results: deduped,
            failures,
        })
    }

    /// NZB lookup by infohash across all live NZB providers. Providers with
    /// nothing to offer are skipped silently.
    pub async fn nzb_results(&self, hash: &str) -> (Vec<NzbResult>, Vec<ProviderFailure>) {
        let snapshot = self.pool.snapshot().await;
        let nzb_providers: Vec<&ProviderSnapshot> = snapshot
            .iter()
            .filter(|provider| provider.kind == ProviderKind::Nzb)
            .collect();

        let outcomes = join_all(
            nzb_providers
                .iter()
                .map(|provider| provider.caller.nzb_query(hash, &provider.options)),
        )
        .await;

        let mut results = Vec::new();
        let mut failures = Vec::new();
        for (provider, outcome) in nzb_providers.iter().zip(outcomes) {
            match outcome {
                Ok(Some(nzb)) => results.push(NzbResult {
                    nzb,
                    options: provider.options.clone(),
                }),
                Ok(None) => {}
                Err(e) => {
                    tracing::error!(provider = %provider.id, "nzb query failed: {}", e);
                    failures.push(ProviderFailure {
                        provider: provider.id.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }
        (results, failures)
    }

    /// Overwrites swarm counts with fresh scrape data. Scrape failures are
    /// logged and ignored; stale counts beat no results.
    pub async fn update_peer_counts(&self, entries: &mut [MergedResult]) {
        let hashes: Vec<String> = entries.iter().map(|entry| entry.hash.clone()).collect();
        match self.scraper.scrape(&hashes).await {
            Ok(scraped) => {
                for entry in scraped {
                    let Some(found) = entries
                        .iter_mut()
                        .find(|candidate| candidate.hash == entry.hash)
                    else {
                        continue;
                    };
                    found.downloads = entry.downloaded;
                    found.leechers = entry.incomplete;
                    found.seeders = entry.complete;
                }
            }
            Err(e) => tracing::debug!("peer count scrape failed: {}", e),
        }
    }
}

/// Runs every applicable mode against one provider concurrently, returning
/// outcomes in a fixed order: single, then movie or batch.
async fn call_provider(
    provider: &ProviderSnapshot,
    query: &SearchOptions,
    check_movie: bool,
    check_batch: bool,
) -> Vec<Result<Vec<RawResult>, SearchError>> {
    let single = provider.caller.single(query, &provider.options);
    if check_movie {
        let (first, second) =
            futures::future::join(single, provider.caller.movie(query, &provider.options)).await;
        return vec![first, second];
    }
    if check_batch {
        let (first, second) =
            futures::future::join(single, provider.caller.batch(query, &provider.options)).await;
        return vec![first, second];
    }
    vec![single.await]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::BasicTitleParser;
    use crate::traits::ProviderCaller;
    use crate::types::{Accuracy, LibraryHit, ScrapeEntry};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use watchtime_metadata::{MediaFormat, MediaTitle};

    fn test_media(format: MediaFormat, episodes: Option<i32>) -> Media {
        Media {
            id: 404,
            id_mal: None,
            title: MediaTitle {
                romaji: Some("Test Show".to_string()),
                english: None,
                native: None,
                user_preferred: None,
            },
            synonyms: Vec::new(),
            format: Some(format),
            episodes,
            start_date: None,
            airing_schedule: Vec::new(),
            next_airing_episode: None,
            relations: Vec::new(),
        }
    }

    fn test_query(episode: i32) -> SearchOptions {
        SearchOptions {
            anilist_id: 404,
            episode_count: Some(12),
            episode,
            anidb_aid: None,
            anidb_eid: None,
            titles: vec!["Test Show".to_string()],
            resolution: "1080".to_string(),
            exclusions: Vec::new(),
        }
    }

    fn raw(hash: &str, seeders: u32) -> RawResult {
        RawResult {
            title: format!("Test Show - 05 [{hash}]"),
            link: None,
            id: None,
            seeders,
            leechers: 1,
            downloads: 10,
            hash: hash.to_string(),
            size: 700,
            accuracy: Accuracy::High,
            kind: None,
            date: None,
        }
    }

    /// Scripted provider: fixed results per mode, optional failure, call
    /// counting for concurrency assertions.
    struct ScriptedCaller {
        single: Result<Vec<RawResult>, String>,
        movie: Result<Vec<RawResult>, String>,
        batch: Result<Vec<RawResult>, String>,
        delay: Duration,
        calls: AtomicUsize,
    }

    impl ScriptedCaller {
        fn ok(single: Vec<RawResult>, movie: Vec<RawResult>, batch: Vec<RawResult>) -> Self {
            Self {
                single: Ok(single),
                movie: Ok(movie),
                batch: Ok(batch),
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
            }
        }

        fn failing(message: &str) -> Self {
            Self {
                single: Err(message.to_string()),
                movie: Err(message.to_string()),
                batch: Err(message.to_string()),
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
            }
        }

        async fn run(
            &self,
            outcome: &Result<Vec<RawResult>, String>,
        ) -> Result<Vec<RawResult>, SearchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            outcome.clone().map_err(SearchError::Provider)
        }
    }

    #[async_trait]
    impl ProviderCaller for ScriptedCaller {
        async fn single(
            &self,
            _query: &SearchOptions,
            _config: &serde_json::Value,
        ) -> Result<Vec<RawResult>, SearchError> {
            self.run(&self.single).await
        }

        async fn movie(
            &self,
            _query: &SearchOptions,
            _config: &serde_json::Value,
        ) -> Result<Vec<RawResult>, SearchError> {
            self.run(&self.movie).await
        }

        async fn batch(
            &self,
            _query: &SearchOptions,
            _config: &serde_json::Value,
        ) -> Result<Vec<RawResult>, SearchError> {
            self.run(&self.batch).await
        }

        async fn nzb_query(
            &self,
            _hash: &str,
            _config: &serde_json::Value,
        ) -> Result<Option<String>, SearchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.single {
                Ok(results) if results.is_empty() => Ok(None),
                Ok(_) => Ok(Some("https://indexer.example/release.nzb".to_string())),
                Err(message) => Err(SearchError::Provider(message.clone())),
            }
        }
    }

    struct StaticPool {
        providers: Vec<ProviderSnapshot>,
    }

    #[async_trait]
    impl ProviderPool for StaticPool {
        async fn snapshot(&self) -> Vec<ProviderSnapshot> {
            self.providers.clone()
        }
    }

    struct NoScraper;

    #[async_trait]
    impl Scraper for NoScraper {
        async fn scrape(&self, _hashes: &[String]) -> Result<Vec<ScrapeEntry>, SearchError> {
            Ok(Vec::new())
        }
    }

    struct CountingScraper {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Scraper for CountingScraper {
        async fn scrape(&self, _hashes: &[String]) -> Result<Vec<ScrapeEntry>, SearchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        }
    }

    struct StaticScraper(Vec<ScrapeEntry>);

    #[async_trait]
    impl Scraper for StaticScraper {
        async fn scrape(&self, _hashes: &[String]) -> Result<Vec<ScrapeEntry>, SearchError> {
            Ok(self.0.clone())
        }
    }

    struct EmptyLibrary;

    #[async_trait]
    impl LocalLibrary for EmptyLibrary {
        async fn find_entry(&self, _media_id: i64, _episode: i32) -> Option<LibraryHit> {
            None
        }
    }

    struct OneEntryLibrary;

    #[async_trait]
    impl LocalLibrary for OneEntryLibrary {
        async fn find_entry(&self, media_id: i64, episode: i32) -> Option<LibraryHit> {
            (media_id == 404 && episode == 5).then(|| LibraryHit {
                hash: "local-hash".to_string(),
                name: Some("Test Show E05.mkv".to_string()),
                size: 1000,
                files: 1,
                date: Utc::now(),
            })
        }
    }

    fn snapshot(id: &str, kind: ProviderKind, caller: Arc<ScriptedCaller>) -> ProviderSnapshot {
        ProviderSnapshot {
            id: id.to_string(),
            kind,
            options: serde_json::json!({}),
            caller,
        }
    }

    fn pipeline(
        providers: Vec<ProviderSnapshot>,
        scraper: Arc<dyn Scraper>,
        library: Arc<dyn LocalLibrary>,
    ) -> SearchPipeline {
        SearchPipeline::new(
            Arc::new(StaticPool { providers }),
            scraper,
            library,
            Arc::new(BasicTitleParser::new()),
        )
    }

    // ── Fan-out ───────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_empty_pool_is_an_error() {
        let pipeline = pipeline(Vec::new(), Arc::new(NoScraper), Arc::new(EmptyLibrary));
        let err = pipeline
            .search(&test_media(MediaFormat::Tv, Some(12)), &test_query(5), true)
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::NoProvidersConfigured));
    }

    #[tokio::test]
    async fn test_series_calls_single_and_batch() {
        let caller = Arc::new(ScriptedCaller::ok(
            vec![raw("aaa", 5)],
            vec![raw("mmm", 5)],
            vec![raw("bbb", 5)],
        ));
        let pipeline = pipeline(
            vec![snapshot("nyaa", ProviderKind::Torrent, caller.clone())],
            Arc::new(NoScraper),
            Arc::new(EmptyLibrary),
        );

        let outcome = pipeline
            .search(&test_media(MediaFormat::Tv, Some(12)), &test_query(5), true)
            .await
            .unwrap();

        let hashes: Vec<&str> = outcome
            .results
            .iter()
            .map(|result| result.hash.as_str())
            .collect();
        assert_eq!(hashes, vec!["aaa", "bbb"]);
        assert_eq!(caller.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_movie_calls_single_and_movie() {
        let caller = Arc::new(ScriptedCaller::ok(
            vec![raw("aaa", 5)],
            vec![raw("mmm", 5)],
            vec![raw("bbb", 5)],
        ));
        let pipeline = pipeline(
            vec![snapshot("nyaa", ProviderKind::Torrent, caller.clone())],
            Arc::new(NoScraper),
            Arc::new(EmptyLibrary),
        );

        let outcome = pipeline
            .search(&test_media(MediaFormat::Movie, None), &test_query(1), true)
            .await
            .unwrap();

        let hashes: Vec<&str> = outcome
            .results
            .iter()
            .map(|result| result.hash.as_str())
            .collect();
        assert_eq!(hashes, vec!["aaa", "mmm"]);
    }

    #[tokio::test]
    async fn test_single_episode_media_only_calls_single() {
        let caller = Arc::new(ScriptedCaller::ok(
            vec![raw("aaa", 5)],
            vec![raw("mmm", 5)],
            vec![raw("bbb", 5)],
        ));
        let pipeline = pipeline(
            vec![snapshot("nyaa", ProviderKind::Torrent, caller.clone())],
            Arc::new(NoScraper),
            Arc::new(EmptyLibrary),
        );

        let outcome = pipeline
            .search(&test_media(MediaFormat::Ova, Some(1)), &test_query(1), true)
            .await
            .unwrap();

        assert_eq!(outcome.results.len(), 1);
        assert_eq!(caller.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_one_failing_provider_does_not_abort() {
        let good = Arc::new(ScriptedCaller::ok(vec![raw("aaa", 5)], vec![], vec![]));
        let bad = Arc::new(ScriptedCaller::failing("sandbox trap"));
        let pipeline = pipeline(
            vec![
                snapshot("good", ProviderKind::Torrent, good),
                snapshot("bad", ProviderKind::Torrent, bad),
            ],
            Arc::new(NoScraper),
            Arc::new(EmptyLibrary),
        );

        let outcome = pipeline
            .search(&test_media(MediaFormat::Tv, Some(12)), &test_query(5), true)
            .await
            .unwrap();

        assert_eq!(outcome.results.len(), 1);
        // single and batch both failed
        assert_eq!(outcome.failures.len(), 2);
        assert_eq!(outcome.failures[0].provider, "bad");
        assert!(outcome.failures[0].error.contains("sandbox trap"));
    }

    #[tokio::test]
    async fn test_results_keep_provider_snapshot_order() {
        let first = Arc::new(ScriptedCaller::ok(vec![raw("aaa", 5)], vec![], vec![]));
        let second = Arc::new(ScriptedCaller::ok(vec![raw("zzz", 5)], vec![], vec![]));
        let pipeline = pipeline(
            vec![
                snapshot("first", ProviderKind::Torrent, first),
                snapshot("second", ProviderKind::Torrent, second),
            ],
            Arc::new(NoScraper),
            Arc::new(EmptyLibrary),
        );

        let outcome = pipeline
            .search(&test_media(MediaFormat::Tv, Some(12)), &test_query(5), true)
            .await
            .unwrap();

        let hashes: Vec<&str> = outcome
            .results
            .iter()
            .map(|result| result.hash.as_str())
            .collect();
        assert_eq!(hashes, vec!["aaa", "zzz"]);
    }

    #[tokio::test]
    async fn test_duplicate_hash_across_providers_merges() {
        let first = Arc::new(ScriptedCaller::ok(vec![raw("aaa", 5)], vec![], vec![]));
        let second = Arc::new(ScriptedCaller::ok(vec![raw("aaa", 9)], vec![], vec![]));
        let pipeline = pipeline(
            vec![
                snapshot("first", ProviderKind::Torrent, first),
                snapshot("second", ProviderKind::Torrent, second),
            ],
            Arc::new(NoScraper),
            Arc::new(EmptyLibrary),
        );

        let outcome = pipeline
            .search(&test_media(MediaFormat::Tv, Some(12)), &test_query(5), true)
            .await
            .unwrap();

        assert_eq!(outcome.results.len(), 1);
        assert!(outcome.results[0].providers.contains("first"));
        assert!(outcome.results[0].providers.contains("second"));
    }

    #[tokio::test]
    async fn test_offline_serves_library_without_calling_providers() {
        let caller = Arc::new(ScriptedCaller::ok(vec![raw("aaa", 5)], vec![], vec![]));
        let pipeline = pipeline(
            vec![snapshot("nyaa", ProviderKind::Torrent, caller.clone())],
            Arc::new(NoScraper),
            Arc::new(OneEntryLibrary),
        );

        let outcome = pipeline
            .search(
                &test_media(MediaFormat::Tv, Some(12)),
                &test_query(5),
                false,
            )
            .await
            .unwrap();

        assert_eq!(outcome.results.len(), 1);
        assert_eq!(outcome.results[0].hash, "local-hash");
        assert_eq!(outcome.results[0].accuracy, Accuracy::Medium);
        assert!(outcome.results[0].providers.contains("local"));
        assert!(outcome.results[0].parsed.is_some());
        assert_eq!(caller.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_offline_without_library_entry_is_empty() {
        let caller = Arc::new(ScriptedCaller::ok(vec![raw("aaa", 5)], vec![], vec![]));
        let pipeline = pipeline(
            vec![snapshot("nyaa", ProviderKind::Torrent, caller)],
            Arc::new(NoScraper),
            Arc::new(EmptyLibrary),
        );

        let outcome = pipeline
            .search(
                &test_media(MediaFormat::Tv, Some(12)),
                &test_query(5),
                false,
            )
            .await
            .unwrap();

        assert!(outcome.results.is_empty());
        assert!(outcome.failures.is_empty());
    }

    #[tokio::test]
    async fn test_online_ignores_library() {
        let caller = Arc::new(ScriptedCaller::ok(vec![], vec![], vec![]));
        let pipeline = pipeline(
            vec![snapshot("nyaa", ProviderKind::Torrent, caller)],
            Arc::new(NoScraper),
            Arc::new(OneEntryLibrary),
        );

        let outcome = pipeline
            .search(&test_media(MediaFormat::Tv, Some(12)), &test_query(5), true)
            .await
            .unwrap();

        assert!(outcome.results.is_empty());
    }

    #[tokio::test]
    async fn test_empty_results_skip_parse_and_scrape() {
        let bad = Arc::new(ScriptedCaller::failing("timeout"));
        let pipeline = pipeline(
            vec![snapshot("bad", ProviderKind::Torrent, bad)],
            Arc::new(NoScraper),
            Arc::new(EmptyLibrary),
        );

        let outcome = pipeline
            .search(&test_media(MediaFormat::Tv, Some(12)), &test_query(5), true)
            .await
            .unwrap();

        assert!(outcome.results.is_empty());
        assert_eq!(outcome.failures.len(), 2);
    }

    #[tokio::test]
    async fn test_results_carry_parsed_titles() {
        let caller = Arc::new(ScriptedCaller::ok(vec![raw("aaa", 5)], vec![], vec![]));
        let pipeline = pipeline(
            vec![snapshot("nyaa", ProviderKind::Torrent, caller)],
            Arc::new(NoScraper),
            Arc::new(EmptyLibrary),
        );

        let outcome = pipeline
            .search(&test_media(MediaFormat::Tv, Some(12)), &test_query(5), true)
            .await
            .unwrap();

        let parsed = outcome.results[0].parsed.as_ref().unwrap();
        assert_eq!(parsed.episode_number.as_deref(), Some("05"));
    }

    #[tokio::test]
    async fn test_scrape_overwrites_peer_counts_online() {
        let caller = Arc::new(ScriptedCaller::ok(vec![raw("aaa", 5)], vec![], vec![]));
        let scraper = Arc::new(StaticScraper(vec![ScrapeEntry {
            hash: "aaa".to_string(),
            complete: 42,
            downloaded: 300,
            incomplete: 7,
        }]));
        let pipeline = pipeline(
            vec![snapshot("nyaa", ProviderKind::Torrent, caller)],
            scraper,
            Arc::new(EmptyLibrary),
        );

        let outcome = pipeline
            .search(&test_media(MediaFormat::Tv, Some(12)), &test_query(5), true)
            .await
            .unwrap();

        assert_eq!(outcome.results[0].seeders, 42);
        assert_eq!(outcome.results[0].downloads, 300);
        assert_eq!(outcome.results[0].leechers, 7);
    }

    #[tokio::test]
    async fn test_offline_skips_scrape() {
        let caller = Arc::new(ScriptedCaller::ok(vec![raw("aaa", 5)], vec![], vec![]));
        let scraper = Arc::new(CountingScraper {
            calls: AtomicUsize::new(0),
        });
        let pipeline = pipeline(
            vec![snapshot("nyaa", ProviderKind::Torrent, caller)],
            scraper.clone(),
            Arc::new(OneEntryLibrary),
        );

        let outcome = pipeline
            .search(
                &test_media(MediaFormat::Tv, Some(12)),
                &test_query(5),
                false,
            )
            .await
            .unwrap();

        assert_eq!(outcome.results[0].seeders, 0);
        assert_eq!(scraper.calls.load(Ordering::SeqCst), 0);
    }

    // ── NZB lookups ───────────────────────────────────────────────────

    #[tokio::test]
    async fn test_nzb_results_only_query_nzb_providers() {
        let torrent = Arc::new(ScriptedCaller::ok(vec![raw("aaa", 5)], vec![], vec![]));
        let nzb = Arc::new(ScriptedCaller::ok(vec![raw("bbb", 5)], vec![], vec![]));
        let pipeline = pipeline(
            vec![
                snapshot("torrent", ProviderKind::Torrent, torrent.clone()),
                snapshot("indexer", ProviderKind::Nzb, nzb),
            ],
            Arc::new(NoScraper),
            Arc::new(EmptyLibrary),
        );

        let (results, failures) = pipeline.nzb_results("aaa").await;

        assert_eq!(results.len(), 1);
        assert!(failures.is_empty());
        assert_eq!(torrent.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_nzb_empty_answers_are_skipped() {
        let nzb = Arc::new(ScriptedCaller::ok(vec![], vec![], vec![]));
        let pipeline = pipeline(
            vec![snapshot("indexer", ProviderKind::Nzb, nzb)],
            Arc::new(NoScraper),
            Arc::new(EmptyLibrary),
        );

        let (results, failures) = pipeline.nzb_results("aaa").await;
        assert!(results.is_empty());
        assert!(failures.is_empty());
    }

    #[tokio::test]
    async fn test_nzb_failures_reported_per_provider() {
        let nzb = Arc::new(ScriptedCaller::failing("indexer down"));
        let pipeline = pipeline(
            vec![snapshot("indexer", ProviderKind::Nzb, nzb)],
            Arc::new(NoScraper),
            Arc::new(EmptyLibrary),
        );

        let (results, failures) = pipeline.nzb_results("aaa").await;
        assert!(results.is_empty());
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].provider, "indexer");
    }
}
