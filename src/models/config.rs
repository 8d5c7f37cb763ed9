//! Engine configuration structures.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EngineConfig {
    /// HTTP client behavior
    #[serde(default)]
    pub http: HttpConfig,

    /// Content cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Outbound request rate limiting
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Circuit breaker settings
    #[serde(default)]
    pub circuit: CircuitConfig,

    /// Retry behavior for transient failures
    #[serde(default)]
    pub retry: RetryConfig,

    /// Search ranking parameters
    #[serde(default)]
    pub search: SearchConfig,

    /// Publication listing location and selectors
    #[serde(default)]
    pub listing: ListingConfig,

    /// Directory for persisted state (index snapshot, delta record)
    #[serde(default = "defaults::data_dir")]
    pub data_dir: PathBuf,
}

impl EngineConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.http.user_agent.trim().is_empty() {
            return Err(AppError::config("http.user_agent is empty"));
        }
        if self.http.timeout_secs == 0 {
            return Err(AppError::config("http.timeout_secs must be > 0"));
        }
        if self.rate_limit.per_second <= 0.0 {
            return Err(AppError::config("rate_limit.per_second must be > 0"));
        }
        if self.rate_limit.burst == 0 {
            return Err(AppError::config("rate_limit.burst must be > 0"));
        }
        if self.circuit.failure_threshold == 0 {
            return Err(AppError::config("circuit.failure_threshold must be > 0"));
        }
        if self.retry.max_attempts == 0 {
            return Err(AppError::config("retry.max_attempts must be > 0"));
        }
        if self.cache.memory_capacity == 0 {
            return Err(AppError::config("cache.memory_capacity must be > 0"));
        }
        if self.search.bm25_k1 <= 0.0 || !(0.0..=1.0).contains(&self.search.bm25_b) {
            return Err(AppError::config("invalid BM25 parameters"));
        }
        Ok(())
    }
}

/// HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Origin base URL
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Per-request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Whole-operation bound for `get_content`/`refresh_index`, including
    /// time spent waiting on the rate limiter. None disables the bound.
    #[serde(default)]
    pub operation_timeout_secs: Option<u64>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            operation_timeout_secs: None,
        }
    }
}

/// Two-tier content cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Entry time-to-live in hours
    #[serde(default = "defaults::cache_ttl_hours")]
    pub ttl_hours: u64,

    /// Memory tier capacity in entries
    #[serde(default = "defaults::memory_capacity")]
    pub memory_capacity: usize,

    /// Optional memory tier capacity in bytes
    #[serde(default)]
    pub max_memory_bytes: Option<u64>,

    /// Disk tier directory
    #[serde(default = "defaults::cache_dir")]
    pub dir: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_hours: defaults::cache_ttl_hours(),
            memory_capacity: defaults::memory_capacity(),
            max_memory_bytes: None,
            dir: defaults::cache_dir(),
        }
    }
}

/// Token bucket rate limiter settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Tokens added per second (requests/second)
    #[serde(default = "defaults::rate_per_second")]
    pub per_second: f64,

    /// Maximum bucket capacity (burst size)
    #[serde(default = "defaults::rate_burst")]
    pub burst: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            per_second: defaults::rate_per_second(),
            burst: defaults::rate_burst(),
        }
    }
}

/// Circuit breaker settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitConfig {
    /// Consecutive failures before the circuit opens
    #[serde(default = "defaults::failure_threshold")]
    pub failure_threshold: u32,

    /// Seconds the circuit stays open before a half-open trial
    #[serde(default = "defaults::cooldown_seconds")]
    pub cooldown_seconds: u64,

    /// Count 4xx client errors as breaker failures. Off by default; enable
    /// when the origin is known to signal broad failure with client codes.
    #[serde(default)]
    pub count_client_errors: bool,
}

impl Default for CircuitConfig {
    fn default() -> Self {
        Self {
            failure_threshold: defaults::failure_threshold(),
            cooldown_seconds: defaults::cooldown_seconds(),
            count_client_errors: false,
        }
    }
}

/// Retry with exponential backoff settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum attempts including the first
    #[serde(default = "defaults::max_attempts")]
    pub max_attempts: u32,

    /// Base delay before the first retry, in milliseconds
    #[serde(default = "defaults::initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Cap on any single backoff delay, in milliseconds
    #[serde(default = "defaults::max_delay_ms")]
    pub max_delay_ms: u64,

    /// Randomize delays to avoid synchronized retries
    #[serde(default = "defaults::jitter")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: defaults::max_attempts(),
            initial_delay_ms: defaults::initial_delay_ms(),
            max_delay_ms: defaults::max_delay_ms(),
            jitter: defaults::jitter(),
        }
    }
}

/// Search ranking parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// BM25 term-frequency saturation parameter
    #[serde(default = "defaults::bm25_k1")]
    pub bm25_k1: f64,

    /// BM25 length normalization parameter
    #[serde(default = "defaults::bm25_b")]
    pub bm25_b: f64,

    /// Maximum edit distance for fuzzy token matching
    #[serde(default = "defaults::fuzzy_max_edit_distance")]
    pub fuzzy_max_edit_distance: u32,

    /// Weight of a fuzzy match relative to an exact match
    #[serde(default = "defaults::fuzzy_weight")]
    pub fuzzy_weight: f64,

    /// Maximum number of results returned per query
    #[serde(default = "defaults::max_results")]
    pub max_results: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            bm25_k1: defaults::bm25_k1(),
            bm25_b: defaults::bm25_b(),
            fuzzy_max_edit_distance: defaults::fuzzy_max_edit_distance(),
            fuzzy_weight: defaults::fuzzy_weight(),
            max_results: defaults::max_results(),
        }
    }
}

/// Publication listing location and CSS selectors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingConfig {
    /// Site-relative path of the publication listing
    #[serde(default = "defaults::listing_path")]
    pub path: String,

    /// CSS selector for listing rows
    #[serde(default = "defaults::row_selector")]
    pub row_selector: String,

    /// CSS selector for the title/link element within a row
    #[serde(default = "defaults::title_selector")]
    pub title_selector: String,

    /// CSS selector for the date element within a row
    #[serde(default = "defaults::date_selector")]
    pub date_selector: String,

    /// Optional CSS selector for the publication type element
    #[serde(default = "defaults::type_selector")]
    pub type_selector: Option<String>,

    /// HTML attribute carrying the link
    #[serde(default = "defaults::link_attr")]
    pub link_attr: String,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            path: defaults::listing_path(),
            row_selector: defaults::row_selector(),
            title_selector: defaults::title_selector(),
            date_selector: defaults::date_selector(),
            type_selector: defaults::type_selector(),
            link_attr: defaults::link_attr(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    // HTTP defaults
    pub fn base_url() -> String {
        "https://www.skolinspektionen.se".into()
    }
    pub fn user_agent() -> String {
        "skolinspektionen-engine/0.1 (+https://github.com/civictechsweden)".into()
    }
    pub fn timeout() -> u64 {
        30
    }

    // Cache defaults
    pub fn cache_ttl_hours() -> u64 {
        24
    }
    pub fn memory_capacity() -> usize {
        50
    }
    pub fn cache_dir() -> PathBuf {
        PathBuf::from("data/.cache")
    }

    // Rate limit defaults
    pub fn rate_per_second() -> f64 {
        2.0
    }
    pub fn rate_burst() -> u32 {
        5
    }

    // Circuit breaker defaults
    pub fn failure_threshold() -> u32 {
        5
    }
    pub fn cooldown_seconds() -> u64 {
        30
    }

    // Retry defaults
    pub fn max_attempts() -> u32 {
        3
    }
    pub fn initial_delay_ms() -> u64 {
        1000
    }
    pub fn max_delay_ms() -> u64 {
        60_000
    }
    pub fn jitter() -> bool {
        true
    }

    // Search defaults
    pub fn bm25_k1() -> f64 {
        1.2
    }
    pub fn bm25_b() -> f64 {
        0.75
    }
    pub fn fuzzy_max_edit_distance() -> u32 {
        2
    }
    pub fn fuzzy_weight() -> f64 {
        0.5
    }
    pub fn max_results() -> usize {
        50
    }

    // Listing defaults
    pub fn listing_path() -> String {
        "/beslut-rapporter/publikationssok/".into()
    }
    pub fn row_selector() -> String {
        "li.search-result__item".into()
    }
    pub fn title_selector() -> String {
        "a.search-result__link".into()
    }
    pub fn date_selector() -> String {
        "time".into()
    }
    pub fn type_selector() -> Option<String> {
        Some(".search-result__category".into())
    }
    pub fn link_attr() -> String {
        "href".into()
    }

    // State defaults
    pub fn data_dir() -> PathBuf {
        PathBuf::from("data")
    }
}
