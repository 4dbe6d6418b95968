//! Reachability tracking for the local node.
//!
//! The monitor is the only writer of [`NodeHealth`]. It starts OFFLINE and
//! flips state only when a probe disagrees with the current state; an
//! audit event is emitted on each flip and never otherwise.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use promptc_audit::{AuditCategory, AuditEvent, AuditHub, AuditResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

/// A single bounded reachability check.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// Human-readable target, e.g. `10.0.0.7:11434`.
    fn target(&self) -> String;

    /// Succeeds when the node answered with a success status.
    async fn probe(&self) -> anyhow::Result<()>;
}

/// Read handle on the node state, shared by the router and dashboard.
#[derive(Clone, Default)]
pub struct NodeHealth {
    inner: Arc<NodeHealthInner>,
}

#[derive(Default)]
struct NodeHealthInner {
    online: AtomicBool,
    last_success: Mutex<Option<DateTime<Utc>>>,
}

impl NodeHealth {
    /// A node that is OFFLINE and has never been seen.
    pub fn offline() -> Self {
        Self::default()
    }

    pub fn is_online(&self) -> bool {
        self.inner.online.load(Ordering::Acquire)
    }

    pub fn last_successful_check(&self) -> Option<DateTime<Utc>> {
        *self
            .inner
            .last_success
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn mark_success(&self) -> bool {
        *self
            .inner
            .last_success
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(Utc::now());
        !self.inner.online.swap(true, Ordering::AcqRel)
    }

    fn mark_failure(&self) -> bool {
        self.inner.online.swap(false, Ordering::AcqRel)
    }
}

/// Background poller owning the node state.
pub struct HealthMonitor {
    probe: Arc<dyn HealthProbe>,
    health: NodeHealth,
    hub: AuditHub,
    node_name: String,
    timeout: Duration,
}

impl HealthMonitor {
    pub fn new(
        probe: Arc<dyn HealthProbe>,
        hub: AuditHub,
        node_name: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            probe,
            health: NodeHealth::offline(),
            hub,
            node_name: node_name.into(),
            timeout,
        }
    }

    /// Reader handle on the state this monitor writes.
    pub fn health(&self) -> NodeHealth {
        self.health.clone()
    }

    /// Run one probe and apply its result. Returns the new online state.
    pub async fn check_once(&self) -> bool {
        let result = match tokio::time::timeout(self.timeout, self.probe.probe()).await {
            Ok(result) => result,
            Err(_) => Err(anyhow::anyhow!("no answer within {:?}", self.timeout)),
        };

        match result {
            Ok(()) => {
                if self.health.mark_success() {
                    let target = self.probe.target();
                    tracing::info!(node = %self.node_name, target = %target, "Node online");
                    let event =
                        AuditEvent::builder(AuditCategory::Kernel, "NODE_ONLINE", &self.node_name)
                            .resource(target)
                            .detail("node answered liveness probe")
                            .build();
                    self.hub.publish(event).await;
                }
                true
            }
            Err(e) => {
                if self.health.mark_failure() {
                    tracing::warn!(node = %self.node_name, error = %e, "Node offline");
                    let event =
                        AuditEvent::builder(AuditCategory::Kernel, "NODE_OFFLINE", &self.node_name)
                            .resource(self.probe.target())
                            .result(AuditResult::Warn)
                            .detail(format!("{}; routing to cloud fallback", e))
                            .build();
                    self.hub.publish(event).await;
                } else {
                    tracing::debug!(node = %self.node_name, error = %e, "Node still offline");
                }
                false
            }
        }
    }

    /// Probe every `period` for the rest of the process.
    pub fn spawn(self, period: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                self.check_once().await;
            }
        })
    }
}
