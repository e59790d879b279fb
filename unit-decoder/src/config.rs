//! Tunables for the store and search engine.

use std::time::Duration;

/// Hard cap on results from any search call.
pub const MAX_RESULTS: usize = 20;

/// Default lifetime of a cached search result.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Default number of distinct cached queries.
pub const DEFAULT_CACHE_CAPACITY: usize = 1000;

/// Default r2d2 pool size for file-backed databases.
pub const DEFAULT_POOL_SIZE: u32 = 8;

/// Minimum query length for autocomplete suggestions.
pub const MIN_SUGGESTION_QUERY_LEN: usize = 2;

#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    pub max_results: usize,
    /// Zero disables caching.
    pub cache_ttl: Duration,
    pub cache_capacity: usize,
    pub pool_size: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_results: MAX_RESULTS,
            cache_ttl: DEFAULT_CACHE_TTL,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            pool_size: DEFAULT_POOL_SIZE,
        }
    }
}

impl SearchConfig {
    pub fn without_cache() -> Self {
        Self {
            cache_ttl: Duration::ZERO,
            ..Self::default()
        }
    }

    /// Result limit actually applied: never above `MAX_RESULTS`, never zero.
    pub fn effective_max_results(&self) -> usize {
        self.max_results.clamp(1, MAX_RESULTS)
    }
}
