use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Request and retry tuning for a catalog session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestConfig {
    /// Transport timeout in seconds (default: 30)
    pub timeout_secs: u64,
    /// Total establish attempts including the first one (default: 3)
    pub max_attempts: u32,
    /// Backoff base in seconds; attempt `n` waits `base * 2^n` (default: 1)
    pub backoff_base_secs: u64,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_attempts: 3,
            backoff_base_secs: 1,
        }
    }
}

impl RequestConfig {
    /// Always at least one attempt
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Delay inserted after the zero-based `attempt` failed
    #[must_use]
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 1_u64.checked_shl(attempt).unwrap_or(u64::MAX);
        Duration::from_secs(self.backoff_base_secs.saturating_mul(factor))
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Connection settings persisted by the surrounding application.
/// The password is never part of this struct.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub base_url: String,
    pub username: String,
    pub request: RequestConfig,
}
