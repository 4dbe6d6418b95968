//! Dashboard application state.

use promptc_audit::AuditHub;
use promptc_core::Mode;
use promptc_runtime::{MetricsStore, NodeHealth, TemplateStore};
use std::sync::Arc;
use std::time::Duration;

/// Shared application state for the dashboard.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
    ping_interval: Duration,
}

struct AppStateInner {
    mode: Mode,
    metrics: MetricsStore,
    health: NodeHealth,
    templates: TemplateStore,
    hub: AuditHub,
}

impl AppState {
    pub fn new(
        mode: Mode,
        metrics: MetricsStore,
        health: NodeHealth,
        templates: TemplateStore,
        hub: AuditHub,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                mode,
                metrics,
                health,
                templates,
                hub,
            }),
            ping_interval: Duration::from_secs(30),
        }
    }

    /// Set the WebSocket keep-alive interval.
    pub fn with_ping_interval(mut self, interval: Duration) -> Self {
        self.ping_interval = interval;
        self
    }

    pub fn mode(&self) -> Mode {
        self.inner.mode
    }

    pub fn metrics(&self) -> &MetricsStore {
        &self.inner.metrics
    }

    pub fn health(&self) -> &NodeHealth {
        &self.inner.health
    }

    pub fn templates(&self) -> &TemplateStore {
        &self.inner.templates
    }

    pub fn hub(&self) -> &AuditHub {
        &self.inner.hub
    }

    pub fn ping_interval(&self) -> Duration {
        self.ping_interval
    }
}
