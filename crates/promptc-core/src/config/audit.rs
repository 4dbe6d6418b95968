//! Audit trail configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the audit trail and live log hub.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Whether events are written to the durable trail.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Number of recent lines kept in memory for dashboard replay.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// File name of the trail inside the data directory.
    #[serde(default = "default_file_name")]
    pub file_name: String,

    /// Capacity of each live subscriber's queue.
    #[serde(default = "default_subscriber_buffer")]
    pub subscriber_buffer: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            history_limit: default_history_limit(),
            file_name: default_file_name(),
            subscriber_buffer: default_subscriber_buffer(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_history_limit() -> usize {
    10_000
}

fn default_file_name() -> String {
    "audit.log".to_string()
}

fn default_subscriber_buffer() -> usize {
    256
}
