//! Wires the shared handles together and runs the agent until stdin closes
//! or a termination signal arrives.
//!
//! However the protocol loop ends, the metrics are flushed and KERNEL
//! `SHUTDOWN` is recorded before [`run`] returns.

use anyhow::{Context, Result};
use promptc_audit::{AuditCategory, AuditEvent, AuditHub, AuditResult};
use promptc_core::AgentConfig;
use promptc_dashboard::{AppState, DashboardServer};
use promptc_mcp::McpServer;
use promptc_runtime::{HealthMonitor, MetricsStore, NodeHealth, Router, TemplateStore};
use std::future::Future;
use tokio::io::{AsyncBufRead, AsyncWrite, BufReader};
use tokio::task::JoinHandle;

const ENGINE_ACTOR: &str = "promptc-engine";

/// Serve the protocol over the process stdin/stdout.
pub async fn run(config: AgentConfig) -> Result<()> {
    // registered before boot so an early SIGTERM is not lost
    let shutdown = shutdown_signal();
    tracing::info!("Starting MCP server with stdio transport");
    serve(
        config,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
        shutdown,
    )
    .await
}

/// Run the agent over any reader/writer until input ends, the writer
/// fails, or `shutdown` resolves.
pub async fn serve<R, W, S>(config: AgentConfig, reader: R, writer: W, shutdown: S) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    S: Future<Output = ()>,
{
    let hub = AuditHub::new(&config).context("failed to open audit trail")?;
    let metrics = MetricsStore::open(config.metrics_path(), &config.metrics);
    let templates = TemplateStore::open(config.templates_path());

    let chain = promptc_providers::build_chain(&config).context("failed to build provider chain")?;
    let probe = promptc_providers::build_probe(&config).context("failed to build node probe")?;

    let mut tasks: Vec<JoinHandle<()>> = Vec::new();

    let monitor = match probe {
        Some(probe) if config.health.enabled => Some(HealthMonitor::new(
            probe,
            hub.clone(),
            config.providers.ollama.node_name.clone(),
            config.health.timeout(),
        )),
        _ => {
            tracing::info!("Health monitor disabled; local node stays OFFLINE");
            None
        }
    };
    let health = monitor
        .as_ref()
        .map(HealthMonitor::health)
        .unwrap_or_else(NodeHealth::offline);

    hub.publish(
        AuditEvent::builder(AuditCategory::Kernel, "BOOT", ENGINE_ACTOR)
            .detail(format!(
                "promptc v{} [{}] started with {} providers",
                env!("CARGO_PKG_VERSION"),
                config.mode,
                chain.len()
            ))
            .build(),
    )
    .await;

    if let Some(monitor) = monitor {
        tasks.push(monitor.spawn(config.health.interval()));
    }

    if config.dashboard.enabled {
        let state = AppState::new(
            config.mode,
            metrics.clone(),
            health.clone(),
            templates.clone(),
            hub.clone(),
        );
        let dashboard = DashboardServer::new(config.dashboard.clone(), state);
        match dashboard.bind().await {
            Ok(listener) => {
                tasks.push(tokio::spawn(async move {
                    if let Err(e) = dashboard.serve(listener).await {
                        tracing::error!(error = %e, "Dashboard stopped");
                    }
                }));
            }
            Err(e) => {
                tracing::warn!(error = %e, "Dashboard unavailable, protocol-only mode");
                hub.publish_internal(format!("{}; protocol-only mode", e));
            }
        }
    }

    tasks.push(metrics.spawn_persistence(config.metrics.flush_interval()));

    let router = Router::new(config.router.clone(), metrics.clone(), health, hub.clone())
        .with_providers(chain)
        .with_node_name(config.providers.ollama.node_name.clone());
    let server = McpServer::new(router, templates, metrics.clone(), hub.clone());

    let outcome = tokio::select! {
        result = server.run(reader, writer) => result.context("protocol loop failed"),
        _ = shutdown => {
            tracing::info!("Termination signal received");
            Ok(())
        }
    };

    for task in &tasks {
        task.abort();
    }

    if let Err(e) = metrics.save() {
        tracing::warn!(error = %e, "Final metrics save failed");
    }

    let served = metrics.snapshot().inference_count;
    let event = match &outcome {
        Ok(()) => AuditEvent::builder(AuditCategory::Kernel, "SHUTDOWN", ENGINE_ACTOR)
            .result(AuditResult::Ok)
            .detail(format!("{} requests served", served)),
        Err(e) => AuditEvent::builder(AuditCategory::Kernel, "SHUTDOWN", ENGINE_ACTOR)
            .result(AuditResult::Fail)
            .detail(format!("{} requests served; {:#}", served, e)),
    };
    hub.publish(event.build()).await;

    outcome
}

/// Resolves on Ctrl+C or SIGTERM. SIGTERM is registered when this is
/// called, not when first polled.
fn shutdown_signal() -> impl Future<Output = ()> {
    #[cfg(unix)]
    let terminate = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate());

    async move {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "Failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match terminate {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to listen for SIGTERM");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {}
            _ = terminate => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use promptc_core::Mode;
    use std::path::Path;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    /// Community mode, no dashboard, no credentials from the environment.
    fn offline_config(dir: &Path) -> AgentConfig {
        let mut config = AgentConfig {
            mode: Mode::Community,
            data_dir: Some(dir.to_path_buf()),
            ..Default::default()
        };
        config.dashboard.enabled = false;
        config.providers.ollama.host_env = None;
        config.providers.gemini.api_key_env = None;
        config.providers.openrouter.api_key_env = None;
        config
    }

    const OPTIMIZE: &str = concat!(
        r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","#,
        r#""params":{"name":"optimize_prompt","arguments":{"task":"short"}}}"#,
        "\n"
    );

    fn persisted_count(config: &AgentConfig) -> u64 {
        let raw = std::fs::read_to_string(config.metrics_path()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        json["inference_count"].as_u64().unwrap()
    }

    fn trail(config: &AgentConfig) -> String {
        std::fs::read_to_string(config.audit_path()).unwrap()
    }

    #[tokio::test]
    async fn test_shutdown_while_input_is_open_flushes_metrics() {
        let dir = tempfile::tempdir().unwrap();
        let config = offline_config(dir.path());

        // the host keeps its end open and never closes it
        let (mut host, agent_side) = tokio::io::duplex(4096);
        let (agent_read, agent_write) = tokio::io::split(agent_side);
        host.write_all(OPTIMIZE.as_bytes()).await.unwrap();

        let (stop, stopped) = tokio::sync::oneshot::channel::<()>();
        let agent = serve(
            config.clone(),
            BufReader::new(agent_read),
            agent_write,
            async move {
                let _ = stopped.await;
            },
        );
        let host_side = async {
            // wait for the answer so the request is recorded before stopping
            let mut buf = vec![0u8; 4096];
            let n = host.read(&mut buf).await.unwrap();
            assert!(String::from_utf8_lossy(&buf[..n]).contains("\"id\":1"));
            stop.send(()).unwrap();
        };

        let (result, ()) = tokio::time::timeout(Duration::from_secs(5), async {
            tokio::join!(agent, host_side)
        })
        .await
        .expect("agent did not stop");
        result.unwrap();

        assert_eq!(persisted_count(&config), 1);
        let trail = trail(&config);
        assert!(trail.contains("\"BOOT\""));
        assert!(trail.contains("\"SHUTDOWN\""));
        drop(host);
    }

    #[tokio::test]
    async fn test_broken_output_still_flushes_and_records_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = offline_config(dir.path());
        // no periodic save can hide a missing final flush
        config.metrics.flush_every = 100;

        let (reader_end, writer_end) = tokio::io::duplex(64);
        drop(reader_end);

        let err = serve(
            config.clone(),
            OPTIMIZE.as_bytes(),
            writer_end,
            std::future::pending(),
        )
        .await
        .unwrap_err();
        assert!(format!("{:#}", err).contains("protocol loop failed"));

        assert_eq!(persisted_count(&config), 1);
        let shutdown = trail(&config)
            .lines()
            .find(|l| l.contains("\"SHUTDOWN\""))
            .map(str::to_string)
            .expect("SHUTDOWN recorded");
        assert!(shutdown.contains("FAIL"));
    }
}
