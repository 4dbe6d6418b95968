//! Local node health probing configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the background health monitor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthConfig {
    /// Whether the monitor runs at all (it never runs in community mode).
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Seconds between probes.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Per-probe timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Liveness path on the local node.
    #[serde(default = "default_liveness_path")]
    pub liveness_path: String,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            interval_secs: default_interval_secs(),
            timeout_secs: default_timeout_secs(),
            liveness_path: default_liveness_path(),
        }
    }
}

impl HealthConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

fn default_enabled() -> bool {
    true
}

fn default_interval_secs() -> u64 {
    10
}

fn default_timeout_secs() -> u64 {
    3
}

fn default_liveness_path() -> String {
    "/api/tags".to_string()
}
