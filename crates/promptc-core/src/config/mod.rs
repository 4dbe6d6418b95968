//! Configuration types for the promptc agent.
//!
//! Configuration is layered: defaults, then an optional `promptc.yaml`
//! (from `--config` or the data directory), then environment variables for
//! credentials and the local node address, then command-line flags applied
//! by the binary.
//!
//! # Data directory
//!
//! All durable files live in one directory, `~/.promptc` unless
//! `data_dir` or `PROMPTC_HOME` say otherwise:
//!
//! - **audit.log**: append-only audit trail (JSON Lines)
//! - **metrics.json**: persisted metrics snapshot
//! - **templates.json**: template table

pub mod audit;
pub mod dashboard;
pub mod health;
pub mod providers;
pub mod runtime;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub use audit::AuditConfig;
pub use dashboard::DashboardConfig;
pub use health::HealthConfig;
pub use providers::{GeminiConfig, OllamaConfig, OpenRouterConfig, ProvidersConfig};
pub use runtime::{MetricsConfig, RouterConfig};

/// Environment variable overriding the data directory.
pub const HOME_ENV: &str = "PROMPTC_HOME";

/// Name of the optional configuration file inside the data directory.
pub const CONFIG_FILE_NAME: &str = "promptc.yaml";

/// Deployment mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Local node first, cloud providers as fallback.
    #[default]
    Enterprise,
    /// Cloud providers only; the local node is never probed.
    Community,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Enterprise => write!(f, "enterprise"),
            Self::Community => write!(f, "community"),
        }
    }
}

impl FromStr for Mode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "enterprise" => Ok(Self::Enterprise),
            "community" => Ok(Self::Community),
            other => Err(ConfigError::Config(format!(
                "unknown mode '{}', expected 'enterprise' or 'community'",
                other
            ))),
        }
    }
}

/// Complete agent configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Deployment mode.
    #[serde(default)]
    pub mode: Mode,

    /// Directory holding the audit log, metrics and templates.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// Audit trail settings.
    #[serde(default)]
    pub audit: AuditConfig,

    /// Metrics persistence settings.
    #[serde(default)]
    pub metrics: MetricsConfig,

    /// Local node health probing.
    #[serde(default)]
    pub health: HealthConfig,

    /// Failover router timeouts and guards.
    #[serde(default)]
    pub router: RouterConfig,

    /// Live dashboard.
    #[serde(default)]
    pub dashboard: DashboardConfig,

    /// Backend providers.
    #[serde(default)]
    pub providers: ProvidersConfig,
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AgentConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(ConfigError::from)
    }

    /// The directory holding all durable files.
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(default_data_dir)
    }

    /// Path of the append-only audit trail.
    pub fn audit_path(&self) -> PathBuf {
        self.data_dir().join(&self.audit.file_name)
    }

    /// Path of the persisted metrics snapshot.
    pub fn metrics_path(&self) -> PathBuf {
        self.data_dir().join(&self.metrics.file_name)
    }

    /// Path of the template table.
    pub fn templates_path(&self) -> PathBuf {
        self.data_dir().join("templates.json")
    }

    /// Whether the local node should be probed and used.
    pub fn local_node_enabled(&self) -> bool {
        self.mode == Mode::Enterprise && self.providers.ollama.resolve_host().is_some()
    }
}

/// Resolve the default data directory: `$PROMPTC_HOME`, then `~/.promptc`,
/// then `./.promptc` when no home directory is known.
pub fn default_data_dir() -> PathBuf {
    if let Ok(home) = std::env::var(HOME_ENV)
        && !home.is_empty()
    {
        return PathBuf::from(home);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".promptc")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AgentConfig::default();
        assert_eq!(config.mode, Mode::Enterprise);
        assert_eq!(config.metrics.flush_every, 10);
        assert_eq!(config.metrics.flush_interval_secs, 60);
        assert_eq!(config.health.interval_secs, 10);
        assert_eq!(config.health.timeout_secs, 3);
        assert_eq!(config.router.attempt_timeout_secs, 60);
        assert_eq!(config.audit.history_limit, 10_000);
        assert_eq!(config.dashboard.port, 8080);
    }

    #[test]
    fn test_parse_yaml_config() {
        let yaml = r#"
mode: community
data_dir: /tmp/promptc-test
dashboard:
  port: 9090
metrics:
  flush_every: 5
providers:
  ollama:
    host: 10.0.0.7
    model: mistral
"#;
        let config = AgentConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.mode, Mode::Community);
        assert_eq!(config.dashboard.port, 9090);
        assert_eq!(config.metrics.flush_every, 5);
        assert_eq!(config.metrics.flush_interval_secs, 60);
        assert_eq!(config.providers.ollama.host.as_deref(), Some("10.0.0.7"));
        assert_eq!(config.providers.ollama.model, "mistral");
        assert_eq!(
            config.metrics_path(),
            PathBuf::from("/tmp/promptc-test/metrics.json")
        );
        assert_eq!(
            config.audit_path(),
            PathBuf::from("/tmp/promptc-test/audit.log")
        );
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!("Community".parse::<Mode>().unwrap(), Mode::Community);
        assert_eq!("enterprise".parse::<Mode>().unwrap(), Mode::Enterprise);
        assert!("hybrid".parse::<Mode>().is_err());
    }

    #[test]
    fn test_community_mode_disables_local_node() {
        let mut config = AgentConfig::default();
        config.providers.ollama.host = Some("127.0.0.1".into());
        config.providers.ollama.host_env = None;
        assert!(config.local_node_enabled());

        config.mode = Mode::Community;
        assert!(!config.local_node_enabled());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "router:\n  request_timeout_secs: 30\n").unwrap();

        let config = AgentConfig::from_file(&path).unwrap();
        assert_eq!(config.router.request_timeout_secs, 30);
    }
}
