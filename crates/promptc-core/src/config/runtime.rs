//! Metrics persistence and router configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for metrics persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Save after every N recorded requests.
    #[serde(default = "default_flush_every")]
    pub flush_every: u64,

    /// Periodic save interval in seconds (only when the total changed).
    #[serde(default = "default_flush_interval_secs")]
    pub flush_interval_secs: u64,

    /// File name of the snapshot inside the data directory.
    #[serde(default = "default_metrics_file")]
    pub file_name: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            flush_every: default_flush_every(),
            flush_interval_secs: default_flush_interval_secs(),
            file_name: default_metrics_file(),
        }
    }
}

impl MetricsConfig {
    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.flush_interval_secs.max(1))
    }
}

/// Configuration for the processing router.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Overall deadline for one request across all attempts, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Upper bound for a single provider attempt, in seconds.
    #[serde(default = "default_attempt_timeout_secs")]
    pub attempt_timeout_secs: u64,

    /// Largest accepted prompt, in bytes.
    #[serde(default = "default_max_prompt_bytes")]
    pub max_prompt_bytes: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout_secs(),
            attempt_timeout_secs: default_attempt_timeout_secs(),
            max_prompt_bytes: default_max_prompt_bytes(),
        }
    }
}

impl RouterConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.attempt_timeout_secs)
    }
}

fn default_flush_every() -> u64 {
    10
}

fn default_flush_interval_secs() -> u64 {
    60
}

fn default_metrics_file() -> String {
    "metrics.json".to_string()
}

fn default_request_timeout_secs() -> u64 {
    180
}

fn default_attempt_timeout_secs() -> u64 {
    60
}

fn default_max_prompt_bytes() -> usize {
    100 * 1024
}
