//! Query cache configuration.
//!
//! Controls entry capacity, previous-data retention, and retry behavior via
//! `bacheca.toml`.

use std::num::NonZeroUsize;
use std::time::Duration;

use serde::Deserialize;

use crate::query::retry::RetryPolicy;

// Default values for query cache configuration
const DEFAULT_KEEP_PREVIOUS_DATA: bool = true;
const DEFAULT_ENTRY_SLOTS: usize = 128;
const DEFAULT_RETRY_MAX_ATTEMPTS: u32 = 0;
const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 200;

/// Query cache configuration from `bacheca.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Keep showing the old key's data while a new key loads.
    pub keep_previous_data: bool,
    /// Maximum cached entries before LRU eviction.
    pub entry_slots: usize,
    /// Extra attempts after a failed fetch. Zero disables retries.
    pub retry_max_attempts: u32,
    /// Base delay before the first retry; doubles per attempt.
    pub retry_base_delay_ms: u64,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            keep_previous_data: DEFAULT_KEEP_PREVIOUS_DATA,
            entry_slots: DEFAULT_ENTRY_SLOTS,
            retry_max_attempts: DEFAULT_RETRY_MAX_ATTEMPTS,
            retry_base_delay_ms: DEFAULT_RETRY_BASE_DELAY_MS,
        }
    }
}

impl From<&crate::config::QuerySettings> for QueryConfig {
    fn from(settings: &crate::config::QuerySettings) -> Self {
        Self {
            keep_previous_data: settings.keep_previous_data,
            entry_slots: settings.entry_slots,
            retry_max_attempts: settings.retry_max_attempts,
            retry_base_delay_ms: settings.retry_base_delay_ms,
        }
    }
}

impl QueryConfig {
    /// Returns the entry capacity as NonZeroUsize, clamping to 1 if zero.
    pub fn entry_slots_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.entry_slots).unwrap_or(NonZeroUsize::MIN)
    }

    /// Retry schedule derived from the configured attempt count and delay.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry_max_attempts,
            Duration::from_millis(self.retry_base_delay_ms),
        )
    }
}
