// src/engine/mod.rs

//! The content access engine.
//!
//! Orchestrates the index, the two-tier cache and the outbound request
//! discipline behind a small API: `search`, `get_content`, `refresh_index`,
//! `cache_stats` and `health_check`. Concurrent `get_content` calls for the
//! same page share one in-flight fetch. `refresh_index` builds a complete
//! replacement index and swaps it in atomically, or aborts leaving the
//! previous index untouched.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use serde::Serialize;
use tokio::fs;

use crate::cache::{CacheStats, ContentCache};
use crate::error::{AppError, Result};
use crate::fetch::{ContentExtractor, ContentFetcher, DefaultExtractor, HttpFetcher};
use crate::index::PublicationIndex;
use crate::models::{EngineConfig, PageContent, PublicationRecord};
use crate::pipeline::{
    CircuitBreaker, CircuitState, DeltaRecord, RetryPolicy, TokenBucket, compute_delta,
};
use crate::search::{SearchFilters, SearchHit, rank};
use crate::utils::url::normalize_key;

/// A coalesced in-flight fetch. Arc-wrapped ends because `Shared` hands a
/// clone of the output to every waiter.
type SharedFetch = Shared<BoxFuture<'static, std::result::Result<Arc<PageContent>, Arc<AppError>>>>;

/// Outcome of a successful index refresh.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshReport {
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
    pub unchanged: usize,
    pub index_size: usize,
}

/// Snapshot reported by `health_check`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub circuit_state: CircuitState,
    pub index_size: usize,
    pub last_refresh_at: Option<DateTime<Utc>>,
    pub cache_hit_ratio: f64,
}

pub struct ContentAccessEngine {
    config: EngineConfig,
    index: RwLock<Arc<PublicationIndex>>,
    cache: Arc<ContentCache>,
    limiter: Arc<TokenBucket>,
    breaker: Arc<CircuitBreaker>,
    retry: RetryPolicy,
    fetcher: Arc<dyn ContentFetcher>,
    extractor: Arc<dyn ContentExtractor>,
    inflight: Arc<Mutex<HashMap<String, SharedFetch>>>,
    refresh_guard: tokio::sync::Mutex<()>,
    last_refresh_at: Mutex<Option<DateTime<Utc>>>,
}

impl ContentAccessEngine {
    /// Build an engine with the production fetcher and extractor.
    pub fn new(config: EngineConfig) -> Result<Self> {
        let fetcher = Arc::new(HttpFetcher::new(&config.http, &config.listing)?);
        Self::with_parts(config, fetcher, Arc::new(DefaultExtractor))
    }

    /// Build an engine around caller-supplied fetch and extraction
    /// implementations.
    pub fn with_parts(
        config: EngineConfig,
        fetcher: Arc<dyn ContentFetcher>,
        extractor: Arc<dyn ContentExtractor>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            cache: Arc::new(ContentCache::new(&config.cache)),
            limiter: Arc::new(TokenBucket::new(&config.rate_limit)),
            breaker: Arc::new(CircuitBreaker::new(&config.circuit)),
            retry: RetryPolicy::new(&config.retry),
            index: RwLock::new(Arc::new(PublicationIndex::new())),
            inflight: Arc::new(Mutex::new(HashMap::new())),
            refresh_guard: tokio::sync::Mutex::new(()),
            last_refresh_at: Mutex::new(None),
            fetcher,
            extractor,
            config,
        })
    }

    fn index_path(&self) -> PathBuf {
        self.config.data_dir.join("index.json")
    }

    fn delta_path(&self) -> PathBuf {
        self.config.data_dir.join("latest_updated.json")
    }

    /// Load the persisted index snapshot and refresh record, if present.
    /// A missing snapshot leaves the index empty; a corrupt one is an error.
    pub async fn load_state(&self) -> Result<()> {
        match fs::read(self.index_path()).await {
            Ok(bytes) => {
                let records: Vec<PublicationRecord> = serde_json::from_slice(&bytes)?;
                let index = PublicationIndex::from_records(records);
                log::info!("Loaded index snapshot with {} publications", index.len());
                *write_lock(&self.index) = Arc::new(index);
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No index snapshot at {:?}, starting empty", self.index_path());
            }
            Err(e) => return Err(e.into()),
        }

        if let Some(record) = DeltaRecord::load(self.delta_path()).await {
            *lock(&self.last_refresh_at) = Some(record.last_refresh_at);
        }
        Ok(())
    }

    /// Rank indexed publications for a query. Purely in-memory; never fails
    /// and never touches the network.
    pub fn search(&self, query: &str, filters: &SearchFilters) -> Vec<SearchHit> {
        let index = self.snapshot();
        rank(&index, query, filters, &self.config.search)
    }

    /// Look up an indexed publication by id.
    pub fn publication(&self, id: &str) -> Option<PublicationRecord> {
        self.snapshot().get(id).cloned()
    }

    /// Fetch a publication page as Markdown, serving from cache when
    /// possible. Concurrent calls for the same URL share one fetch. All
    /// terminal failures surface as `ContentUnavailable`, except an
    /// operation timeout which surfaces as `Timeout`.
    pub async fn get_content(&self, url: &str) -> Result<PageContent> {
        let fetch = self.fetch_coalesced(url);
        let result = match self.config.http.operation_timeout_secs {
            Some(secs) => {
                let bound = Duration::from_secs(secs);
                match tokio::time::timeout(bound, fetch).await {
                    Ok(result) => result,
                    Err(_) => return Err(AppError::Timeout(bound)),
                }
            }
            None => fetch.await,
        };

        match result {
            Ok(content) => Ok((*content).clone()),
            Err(e) => {
                log::warn!("Content fetch failed for {}: {}", url, e);
                match &*e {
                    AppError::ContentUnavailable { url, reason } => {
                        Err(AppError::unavailable(url.as_str(), reason))
                    }
                    other => Err(AppError::unavailable(url, other)),
                }
            }
        }
    }

    /// Scrape the listing, apply the delta against the current index, fetch
    /// content for new and changed publications, then atomically swap in the
    /// rebuilt index. Any failure aborts the whole refresh with
    /// `RefreshPartial` and the previous index stays live. The configured
    /// operation timeout bounds the whole refresh and surfaces as `Timeout`.
    pub async fn refresh_index(&self) -> Result<RefreshReport> {
        let refresh = self.refresh_inner();
        match self.config.http.operation_timeout_secs {
            Some(secs) => {
                let bound = Duration::from_secs(secs);
                match tokio::time::timeout(bound, refresh).await {
                    Ok(result) => result,
                    Err(_) => Err(AppError::Timeout(bound)),
                }
            }
            None => refresh.await,
        }
    }

    async fn refresh_inner(&self) -> Result<RefreshReport> {
        let _serial = self.refresh_guard.lock().await;

        let summaries = self
            .guarded_listing_fetch()
            .await
            .map_err(|e| AppError::RefreshPartial(format!("listing fetch failed: {e}")))?;

        let current = self.snapshot();
        let delta = compute_delta(&current, &summaries);
        log::info!(
            "Refresh delta: {} added, {} updated, {} removed, {} unchanged",
            delta.added.len(),
            delta.updated.len(),
            delta.removed.len(),
            delta.unchanged
        );

        // Warm the cache for everything new or changed before committing.
        for summary in delta.added.iter().chain(&delta.updated) {
            if let Err(e) = self.get_content(&summary.url).await {
                return Err(AppError::RefreshPartial(format!(
                    "content fetch failed for {}: {e}",
                    summary.url
                )));
            }
        }

        let mut next = PublicationIndex::from_records(current.to_records());
        for id in &delta.removed {
            next.remove(id);
        }
        for summary in delta.added.iter().chain(&delta.updated) {
            next.insert(summary.to_record());
        }

        let report = RefreshReport {
            added: delta.added.len(),
            updated: delta.updated.len(),
            removed: delta.removed.len(),
            unchanged: delta.unchanged,
            index_size: next.len(),
        };

        let next = Arc::new(next);
        *write_lock(&self.index) = Arc::clone(&next);
        *lock(&self.last_refresh_at) = Some(Utc::now());

        self.persist_state(&next).await;
        Ok(report)
    }

    /// Current cache counters and tier sizes.
    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    /// Remove expired cache entries from both tiers.
    pub async fn sweep_cache(&self) -> usize {
        self.cache.sweep().await
    }

    pub async fn health_check(&self) -> HealthReport {
        HealthReport {
            circuit_state: self.breaker.state(),
            index_size: self.snapshot().len(),
            last_refresh_at: *lock(&self.last_refresh_at),
            cache_hit_ratio: self.cache.stats().await.hit_ratio(),
        }
    }

    fn snapshot(&self) -> Arc<PublicationIndex> {
        Arc::clone(&self.index.read().unwrap_or_else(|e| e.into_inner()))
    }

    /// Join or start the in-flight fetch for a URL.
    ///
    /// A started fetch is driven to completion by a spawned task even if
    /// every caller gives up (e.g. operation timeout), so the circuit
    /// breaker always gets its outcome and the in-flight entry is always
    /// cleaned up.
    async fn fetch_coalesced(
        &self,
        url: &str,
    ) -> std::result::Result<Arc<PageContent>, Arc<AppError>> {
        let key = normalize_key(&self.config.http.base_url, url);

        let fetch = {
            let mut inflight = lock(&self.inflight);
            match inflight.get(&key) {
                Some(existing) => existing.clone(),
                None => {
                    let fetch = fetch_pipeline(
                        Arc::clone(&self.cache),
                        Arc::clone(&self.limiter),
                        Arc::clone(&self.breaker),
                        self.retry.clone(),
                        Arc::clone(&self.fetcher),
                        Arc::clone(&self.extractor),
                        Arc::clone(&self.inflight),
                        self.config.circuit.count_client_errors,
                        key.clone(),
                        url.to_string(),
                    )
                    .boxed()
                    .shared();
                    inflight.insert(key.clone(), fetch.clone());

                    let driver = fetch.clone();
                    tokio::spawn(async move {
                        let _ = driver.await;
                    });
                    fetch
                }
            }
        };

        fetch.await
    }

    /// Listing fetch through the full request discipline. Runs as its own
    /// task so an abandoned refresh (operation timeout) still delivers the
    /// breaker its outcome.
    async fn guarded_listing_fetch(&self) -> Result<Vec<crate::models::RemoteSummary>> {
        let limiter = Arc::clone(&self.limiter);
        let breaker = Arc::clone(&self.breaker);
        let retry = self.retry.clone();
        let fetcher = Arc::clone(&self.fetcher);
        let count_client_errors = self.config.circuit.count_client_errors;

        let listing = tokio::spawn(async move {
            limiter.acquire().await;
            breaker.try_acquire()?;

            match retry.run(|| fetcher.fetch_publication_summaries()).await {
                Ok(summaries) => {
                    breaker.record_success();
                    Ok(summaries)
                }
                Err(e) => {
                    if counts_as_breaker_failure(&e, count_client_errors) {
                        breaker.record_failure();
                    } else {
                        breaker.record_success();
                    }
                    Err(e)
                }
            }
        });
        listing
            .await
            .map_err(|e| AppError::transient("/listing", format!("listing task failed: {e}")))?
    }

    /// Best-effort persistence of the index snapshot and refresh record.
    async fn persist_state(&self, index: &PublicationIndex) {
        if let Err(e) = write_index_snapshot(&self.index_path(), index).await {
            log::warn!("Index snapshot write failed: {}", e);
        }
        if let Err(e) = DeltaRecord::from_index(index).save(self.delta_path()).await {
            log::warn!("Refresh record write failed: {}", e);
        }
    }
}

/// One end-to-end content fetch: cache, rate limiter, circuit breaker,
/// retried request, extraction, cache fill. Owns clones of everything it
/// needs so the future can be shared between callers. Drops its own
/// in-flight entry before the shared future resolves, so a caller arriving
/// after completion always goes back through the cache.
#[allow(clippy::too_many_arguments)]
async fn fetch_pipeline(
    cache: Arc<ContentCache>,
    limiter: Arc<TokenBucket>,
    breaker: Arc<CircuitBreaker>,
    retry: RetryPolicy,
    fetcher: Arc<dyn ContentFetcher>,
    extractor: Arc<dyn ContentExtractor>,
    inflight: Arc<Mutex<HashMap<String, SharedFetch>>>,
    count_client_errors: bool,
    key: String,
    url: String,
) -> std::result::Result<Arc<PageContent>, Arc<AppError>> {
    let result = async {
        if let Some(content) = cache.get(&key).await {
            log::debug!("Cache hit for {}", key);
            return Ok(Arc::new(content));
        }

        limiter.acquire().await;
        breaker.try_acquire().map_err(Arc::new)?;

        let html = match retry.run(|| fetcher.fetch_raw_content(&url)).await {
            Ok(html) => {
                breaker.record_success();
                html
            }
            Err(e) => {
                if counts_as_breaker_failure(&e, count_client_errors) {
                    breaker.record_failure();
                } else {
                    // The origin answered; a rejection is not origin failure.
                    breaker.record_success();
                }
                return Err(Arc::new(e));
            }
        };

        // Extraction failures are not cached and not breaker failures.
        let content = extractor.extract(&url, &html).map_err(Arc::new)?;
        cache.put(&key, content.clone()).await;
        Ok(Arc::new(content))
    }
    .await;

    lock(&inflight).remove(&key);
    result
}

fn counts_as_breaker_failure(e: &AppError, count_client_errors: bool) -> bool {
    e.is_transient() || (count_client_errors && matches!(e, AppError::Client { .. }))
}

async fn write_index_snapshot(path: &std::path::Path, index: &PublicationIndex) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_vec_pretty(&index.to_records())?;
    fs::write(&tmp, &json).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

fn write_lock<T>(rwlock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    rwlock.write().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PublicationType, RemoteSummary};
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    const PAGE_HTML: &str = concat!(
        "<html><head><title>Rapport</title></head><body><main>",
        "<h1>Rapport</h1><p>Granskningens resultat i korthet.</p>",
        "</main></body></html>"
    );

    struct MockFetcher {
        content_calls: AtomicUsize,
        listing_calls: AtomicUsize,
        /// Fail the first N content fetches with a transient error.
        fail_first: usize,
        fail_all_transient: bool,
        listing_fails: bool,
        delay: Duration,
        summaries: Vec<RemoteSummary>,
        html: String,
    }

    impl MockFetcher {
        fn serving(summaries: Vec<RemoteSummary>) -> Self {
            Self {
                content_calls: AtomicUsize::new(0),
                listing_calls: AtomicUsize::new(0),
                fail_first: 0,
                fail_all_transient: false,
                listing_fails: false,
                delay: Duration::ZERO,
                summaries,
                html: PAGE_HTML.to_string(),
            }
        }
    }

    #[async_trait]
    impl ContentFetcher for MockFetcher {
        async fn fetch_raw_content(&self, url: &str) -> Result<String> {
            let call = self.content_calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.fail_all_transient || call < self.fail_first {
                return Err(AppError::transient(url, "connection reset"));
            }
            Ok(self.html.clone())
        }

        async fn fetch_publication_summaries(&self) -> Result<Vec<RemoteSummary>> {
            self.listing_calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.listing_fails {
                return Err(AppError::transient("/listing", "status 503"));
            }
            Ok(self.summaries.clone())
        }
    }

    fn summary(id: &str, title: &str) -> RemoteSummary {
        RemoteSummary::from_listing(
            &format!("/pub/{id}/"),
            title,
            NaiveDate::from_ymd_opt(2025, 3, 14),
            PublicationType::QualityReview,
        )
    }

    fn test_config(dir: &TempDir) -> EngineConfig {
        let mut config = EngineConfig::default();
        config.data_dir = dir.path().join("data");
        config.cache.dir = dir.path().join("cache");
        config.rate_limit.per_second = 10_000.0;
        config.rate_limit.burst = 1_000;
        config.retry.initial_delay_ms = 1;
        config.retry.jitter = false;
        config
    }

    fn engine(dir: &TempDir, fetcher: MockFetcher) -> ContentAccessEngine {
        engine_with_config(test_config(dir), fetcher)
    }

    fn engine_with_config(config: EngineConfig, fetcher: MockFetcher) -> ContentAccessEngine {
        ContentAccessEngine::with_parts(config, Arc::new(fetcher), Arc::new(DefaultExtractor))
            .unwrap()
    }

    #[tokio::test]
    async fn test_get_content_fetches_once_then_caches() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir, MockFetcher::serving(vec![]));

        let first = engine.get_content("/pub/a/").await.unwrap();
        let second = engine.get_content("/pub/a/").await.unwrap();
        assert_eq!(first.markdown, second.markdown);

        let stats = engine.cache_stats().await;
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_same_url_coalesces_to_one_fetch() {
        let dir = TempDir::new().unwrap();
        let mut mock = MockFetcher::serving(vec![]);
        mock.delay = Duration::from_millis(50);
        let engine = Arc::new(engine(&dir, mock));

        let mut handles = Vec::new();
        for _ in 0..10 {
            let engine = Arc::clone(&engine);
            handles.push(tokio::spawn(async move {
                engine.get_content("/pub/a/").await
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }

        // Downcast not needed: verify via cache stats that only one miss
        // (one real fetch) occurred across ten callers.
        let stats = engine.cache_stats().await;
        assert_eq!(stats.misses, 1);
    }

    #[tokio::test]
    async fn test_transient_failure_retried_then_succeeds() {
        let dir = TempDir::new().unwrap();
        let mut mock = MockFetcher::serving(vec![]);
        mock.fail_first = 2; // two failures, third attempt succeeds
        let engine = engine(&dir, mock);

        let content = engine.get_content("/pub/a/").await.unwrap();
        assert!(content.markdown.contains("# Rapport"));
        assert_eq!(engine.health_check().await.circuit_state, CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_circuit_opens_and_fails_fast() {
        let dir = TempDir::new().unwrap();
        let mut mock = MockFetcher::serving(vec![]);
        mock.fail_all_transient = true;
        let mut config = test_config(&dir);
        config.retry.max_attempts = 1;
        config.circuit.failure_threshold = 5;
        let engine = engine_with_config(config, mock);

        for i in 0..5 {
            let err = engine.get_content(&format!("/pub/{i}/")).await.unwrap_err();
            assert!(matches!(err, AppError::ContentUnavailable { .. }));
        }
        assert_eq!(engine.health_check().await.circuit_state, CircuitState::Open);

        // Sixth call fails fast without reaching the fetcher.
        let err = engine.get_content("/pub/next/").await.unwrap_err();
        assert!(matches!(err, AppError::ContentUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_refresh_populates_index() {
        let dir = TempDir::new().unwrap();
        let engine = engine(
            &dir,
            MockFetcher::serving(vec![
                summary("a", "Matematikundervisning i grundskolan"),
                summary("b", "Trygghet och studiero"),
            ]),
        );

        let report = engine.refresh_index().await.unwrap();
        assert_eq!(report.added, 2);
        assert_eq!(report.index_size, 2);

        let hits = engine.search("studiero", &SearchFilters::default());
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].record.title, "Trygghet och studiero");
    }

    #[tokio::test]
    async fn test_failed_refresh_preserves_index() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir);

        let engine = engine_with_config(
            config.clone(),
            MockFetcher::serving(vec![summary("a", "Trygghet och studiero")]),
        );
        engine.refresh_index().await.unwrap();
        assert_eq!(engine.search("studiero", &SearchFilters::default()).len(), 1);

        // Rebuild the engine with a failing listing; load the saved state.
        let mut mock = MockFetcher::serving(vec![]);
        mock.listing_fails = true;
        let engine = engine_with_config(config, mock);
        engine.load_state().await.unwrap();

        let err = engine.refresh_index().await.unwrap_err();
        assert!(matches!(err, AppError::RefreshPartial(_)));
        assert_eq!(engine.search("studiero", &SearchFilters::default()).len(), 1);
    }

    #[tokio::test]
    async fn test_refresh_aborts_when_content_fetch_fails() {
        let dir = TempDir::new().unwrap();
        let mut mock = MockFetcher::serving(vec![summary("a", "Ny granskning")]);
        mock.fail_all_transient = true; // listing works, content does not
        let mut config = test_config(&dir);
        config.retry.max_attempts = 1;
        let engine = engine_with_config(config, mock);

        let err = engine.refresh_index().await.unwrap_err();
        assert!(matches!(err, AppError::RefreshPartial(_)));
        assert!(engine.search("granskning", &SearchFilters::default()).is_empty());
    }

    #[tokio::test]
    async fn test_refresh_applies_removals_and_updates() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir);

        let engine = engine_with_config(
            config.clone(),
            MockFetcher::serving(vec![
                summary("a", "Gammal titel"),
                summary("b", "Försvinner"),
            ]),
        );
        engine.refresh_index().await.unwrap();

        let engine = engine_with_config(
            config,
            MockFetcher::serving(vec![summary("a", "Ny titel")]),
        );
        engine.load_state().await.unwrap();

        let report = engine.refresh_index().await.unwrap();
        assert_eq!(report.updated, 1);
        assert_eq!(report.removed, 1);
        assert_eq!(report.index_size, 1);
        assert!(engine.publication(&record_id("b")).is_none());
        assert_eq!(
            engine.publication(&record_id("a")).unwrap().title,
            "Ny titel"
        );
    }

    fn record_id(id: &str) -> String {
        crate::utils::url::record_id(&format!("/pub/{id}/"))
    }

    #[tokio::test]
    async fn test_state_roundtrip() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir);

        let engine = engine_with_config(
            config.clone(),
            MockFetcher::serving(vec![summary("a", "Trygghet och studiero")]),
        );
        engine.refresh_index().await.unwrap();

        let engine = engine_with_config(config, MockFetcher::serving(vec![]));
        engine.load_state().await.unwrap();

        let health = engine.health_check().await;
        assert_eq!(health.index_size, 1);
        assert!(health.last_refresh_at.is_some());
    }

    #[tokio::test]
    async fn test_parse_failure_not_cached() {
        let dir = TempDir::new().unwrap();
        let mut mock = MockFetcher::serving(vec![]);
        mock.html = "<html><body></body></html>".to_string();
        let engine = engine(&dir, mock);

        let err = engine.get_content("/pub/tom/").await.unwrap_err();
        assert!(matches!(err, AppError::ContentUnavailable { .. }));
        // An empty page is the origin's fault, not an outage.
        assert_eq!(engine.health_check().await.circuit_state, CircuitState::Closed);
        assert_eq!(engine.cache_stats().await.disk_entries, 0);
    }

    #[tokio::test]
    async fn test_operation_timeout() {
        let dir = TempDir::new().unwrap();
        let mut mock = MockFetcher::serving(vec![]);
        mock.delay = Duration::from_secs(5);
        let mut config = test_config(&dir);
        config.http.operation_timeout_secs = Some(0);
        let engine = engine_with_config(config, mock);

        let err = engine.get_content("/pub/a/").await.unwrap_err();
        assert!(matches!(err, AppError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_refresh_respects_operation_timeout() {
        let dir = TempDir::new().unwrap();
        let mut mock = MockFetcher::serving(vec![summary("a", "Ny granskning")]);
        mock.delay = Duration::from_secs(5);
        let mut config = test_config(&dir);
        config.http.operation_timeout_secs = Some(0);
        let engine = engine_with_config(config, mock);

        let err = engine.refresh_index().await.unwrap_err();
        assert!(matches!(err, AppError::Timeout(_)));
        // The previous (empty) index stays live.
        assert!(engine.search("granskning", &SearchFilters::default()).is_empty());
    }

    #[tokio::test]
    async fn test_search_never_touches_network() {
        let dir = TempDir::new().unwrap();
        let mut mock = MockFetcher::serving(vec![]);
        mock.fail_all_transient = true;
        mock.listing_fails = true;
        let engine = engine(&dir, mock);

        assert!(engine.search("studiero", &SearchFilters::default()).is_empty());
        assert_eq!(engine.health_check().await.circuit_state, CircuitState::Closed);
    }
}
