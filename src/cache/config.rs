//! Cache configuration.
//!
//! Controls freshness, idle eviction and capacity of the cache-and-revalidate
//! store via the `[cache]` section of `campus.toml`.

use std::num::NonZeroUsize;
use std::time::Duration;

use crate::config::{
    CacheSettings, DEFAULT_DEDUPING_INTERVAL_MS, DEFAULT_IDLE_TTL_SECS,
    DEFAULT_JANITOR_INTERVAL_SECS, DEFAULT_MAX_ENTRIES,
};

/// Store tuning, built from the validated `[cache]` settings.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Window (ms) during which a settled entry is served without refetching.
    pub deduping_interval_ms: u64,
    /// Seconds an unobserved entry may stay idle before it is pruned.
    pub idle_ttl_secs: u64,
    /// Soft cap on the number of entries; only unobserved entries are evicted.
    pub max_entries: usize,
    /// Seconds between janitor sweeps.
    pub janitor_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            deduping_interval_ms: DEFAULT_DEDUPING_INTERVAL_MS,
            idle_ttl_secs: DEFAULT_IDLE_TTL_SECS,
            max_entries: DEFAULT_MAX_ENTRIES,
            janitor_interval_secs: DEFAULT_JANITOR_INTERVAL_SECS,
        }
    }
}

impl From<&CacheSettings> for CacheConfig {
    fn from(settings: &CacheSettings) -> Self {
        Self {
            deduping_interval_ms: settings.deduping_interval_ms,
            idle_ttl_secs: settings.idle_ttl_seconds,
            max_entries: settings.max_entries,
            janitor_interval_secs: settings.janitor_interval_seconds,
        }
    }
}

impl CacheConfig {
    pub fn deduping_interval(&self) -> Duration {
        Duration::from_millis(self.deduping_interval_ms)
    }

    pub fn idle_ttl(&self) -> Duration {
        Duration::from_secs(self.idle_ttl_secs)
    }

    /// Janitor period, clamped to at least one second.
    pub fn janitor_interval(&self) -> Duration {
        Duration::from_secs(self.janitor_interval_secs.max(1))
    }

    /// Returns the entry cap as NonZeroUsize, clamping to 1 if zero.
    pub fn max_entries_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.max_entries).unwrap_or(NonZeroUsize::MIN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = CacheConfig::default();
        assert_eq!(config.deduping_interval(), Duration::from_secs(2));
        assert_eq!(config.idle_ttl(), Duration::from_secs(300));
        assert_eq!(config.max_entries, 256);
        assert_eq!(config.janitor_interval(), Duration::from_secs(60));
    }

    #[test]
    fn non_zero_clamps_to_min() {
        let config = CacheConfig {
            max_entries: 0,
            janitor_interval_secs: 0,
            ..Default::default()
        };
        assert_eq!(config.max_entries_non_zero().get(), 1);
        assert_eq!(config.janitor_interval(), Duration::from_secs(1));
    }
}
