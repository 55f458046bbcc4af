use crate::Backoff;

/// Configures base URL, timeout, retry and cache behavior.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClientOptions {
    /// Prefix prepended to every endpoint path.
    pub base_url: String,
    /// Per-attempt timeout in milliseconds.
    pub timeout_ms: u64,
    /// Total attempts, including the first one.
    pub max_attempts: usize,
    /// Backoff unit in milliseconds.
    pub retry_backoff_ms: u64,
    /// How the backoff unit grows with the attempt number.
    pub backoff: Backoff,
    /// Validity window of cached GET responses. `0` disables caching.
    pub cache_ttl_ms: u64,
    /// Upper bound on cached entries.
    pub max_cache_entries: usize,
    /// HTTP statuses that abort the retry loop immediately.
    pub terminal_statuses: Vec<u16>,
    /// Case-insensitive fragments that make an application error terminal.
    pub terminal_error_patterns: Vec<String>,
}

impl ClientOptions {
    /// Returns options pointed at `base_url`, everything else default.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub(crate) fn caching_enabled(&self) -> bool {
        self.cache_ttl_ms > 0 && self.max_cache_entries > 0
    }
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_owned(),
            timeout_ms: 30_000,
            max_attempts: 3,
            retry_backoff_ms: 1_000,
            backoff: Backoff::Exponential,
            cache_ttl_ms: 300_000,
            max_cache_entries: 100,
            terminal_statuses: vec![401, 404],
            terminal_error_patterns: vec!["unauthorized".to_owned(), "not found".to_owned()],
        }
    }
}
