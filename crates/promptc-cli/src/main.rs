use anyhow::{Context, Result};
use clap::Parser;
use promptc_core::config::{CONFIG_FILE_NAME, default_data_dir};
use promptc_core::{AgentConfig, Mode};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

mod agent;

#[derive(Parser, Debug)]
#[command(
    name = "promptc",
    version,
    about = "Prompt compilation agent: MCP over stdio, live dashboard, provider failover"
)]
struct Cli {
    /// Execution mode: `enterprise` (local node + cloud fallback) or `community` (cloud only).
    #[arg(long, env = "PROMPTC_MODE")]
    mode: Option<Mode>,

    /// Path to a promptc.yaml configuration file.
    #[arg(long, short = 'c', env = "PROMPTC_CONFIG")]
    config: Option<PathBuf>,

    /// Data directory for audit.log, metrics.json and templates.json.
    #[arg(long, env = "PROMPTC_HOME")]
    home: Option<PathBuf>,

    /// Override the dashboard port.
    #[arg(long, env = "PROMPTC_DASHBOARD_PORT")]
    dashboard_port: Option<u16>,

    /// Run without the web dashboard.
    #[arg(long, default_value_t = false)]
    no_dashboard: bool,
}

impl Cli {
    /// File config, then flags on top.
    fn resolve_config(&self) -> Result<AgentConfig> {
        let path = match &self.config {
            Some(path) => Some(path.clone()),
            None => {
                let dir = self.home.clone().unwrap_or_else(default_data_dir);
                let candidate = dir.join(CONFIG_FILE_NAME);
                candidate.exists().then_some(candidate)
            }
        };

        let mut config = match path {
            Some(path) => AgentConfig::from_file(&path)
                .with_context(|| format!("failed to load config from {}", path.display()))?,
            None => AgentConfig::default(),
        };

        if let Some(home) = &self.home {
            config.data_dir = Some(home.clone());
        }
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(port) = self.dashboard_port {
            config.dashboard.port = port;
        }
        if self.no_dashboard {
            config.dashboard.enabled = false;
        }

        Ok(config)
    }
}

/// How long exit waits for blocking work. The stdin reader parks a
/// blocking thread that only returns when the host writes or closes the
/// pipe, so it is abandoned rather than joined.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

fn main() -> Result<()> {
    // stdout carries the protocol; logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.resolve_config()?;

    tracing::info!(
        mode = %config.mode,
        data_dir = %config.data_dir().display(),
        dashboard = config.dashboard.enabled,
        "Starting promptc agent"
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    let result = runtime.block_on(agent::run(config));
    runtime.shutdown_timeout(SHUTDOWN_GRACE);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "mode: community\ndashboard:\n  port: 9000\n",
        )
        .unwrap();

        let cli = Cli::parse_from([
            "promptc",
            "--home",
            dir.path().to_str().unwrap(),
            "--dashboard-port",
            "9100",
        ]);
        let config = cli.resolve_config().unwrap();
        assert_eq!(config.mode, Mode::Community);
        assert_eq!(config.dashboard.port, 9100);
        assert_eq!(config.data_dir(), dir.path());

        let cli = Cli::parse_from([
            "promptc",
            "--home",
            dir.path().to_str().unwrap(),
            "--mode",
            "enterprise",
            "--no-dashboard",
        ]);
        let config = cli.resolve_config().unwrap();
        assert_eq!(config.mode, Mode::Enterprise);
        assert_eq!(config.dashboard.port, 9000);
        assert!(!config.dashboard.enabled);
    }

    #[test]
    fn test_explicit_config_must_exist() {
        let cli = Cli::parse_from(["promptc", "--config", "/nonexistent/promptc.yaml"]);
        assert!(cli.resolve_config().is_err());
    }

    #[test]
    fn test_rejects_unknown_mode() {
        assert!(Cli::try_parse_from(["promptc", "--mode", "turbo"]).is_err());
    }
}
