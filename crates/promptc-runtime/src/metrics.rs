//! Process-wide request metrics.
//!
//! Counters are lock-free atomics; only the per-template ranking table sits
//! behind a mutex. `total` is always incremented before `success` or
//! `failed`, and [`MetricsStore::snapshot`] reads the outcome counters
//! before `total`, so `success + failed <= total` holds for every snapshot
//! even under concurrent recording.
//!
//! Persistence is best effort: every `flush_every`-th request schedules a
//! save on the blocking pool, [`MetricsStore::spawn_persistence`] saves
//! periodically when the total moved, and the binary saves once more on
//! shutdown.

use crate::error::RuntimeError;
use crate::health::NodeHealth;
use crate::persist::write_atomic;
use chrono::{DateTime, Local, Utc};
use promptc_core::{MetricsConfig, Mode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Counter values at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    #[serde(default)]
    pub inference_count: u64,
    #[serde(default)]
    pub inference_success: u64,
    #[serde(default)]
    pub inference_fail: u64,
    #[serde(default)]
    pub total_latency_ms: u64,
    #[serde(default)]
    pub total_tokens: u64,
    #[serde(default)]
    pub cloud_calls: u64,
    #[serde(default)]
    pub template_calls: BTreeMap<String, u64>,
}

impl MetricsSnapshot {
    pub fn average_latency_ms(&self) -> f64 {
        if self.inference_count == 0 {
            return 0.0;
        }
        self.total_latency_ms as f64 / self.inference_count as f64
    }

    /// Successful requests as a percentage of all requests.
    pub fn success_ratio(&self) -> f64 {
        if self.inference_count == 0 {
            return 0.0;
        }
        self.inference_success as f64 / self.inference_count as f64 * 100.0
    }

    /// Estimated output tokens per second of processing time.
    pub fn token_throughput(&self) -> f64 {
        if self.total_latency_ms == 0 {
            return 0.0;
        }
        self.total_tokens as f64 / (self.total_latency_ms as f64 / 1000.0)
    }

    /// Templates ordered by calls (descending), then name.
    pub fn template_ranking(&self) -> Vec<TemplateRank> {
        let mut ranking: Vec<TemplateRank> = self
            .template_calls
            .iter()
            .map(|(name, calls)| TemplateRank {
                name: name.clone(),
                calls: *calls,
            })
            .collect();
        ranking.sort_by(|a, b| b.calls.cmp(&a.calls).then_with(|| a.name.cmp(&b.name)));
        ranking
    }
}

/// On-disk form of the metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedMetrics {
    #[serde(flatten)]
    pub snapshot: MetricsSnapshot,
    #[serde(default)]
    pub saved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateRank {
    pub name: String,
    pub calls: u64,
}

/// What the dashboard shows: counters, derived values and node state.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsView {
    pub mode: Mode,
    pub node_online: bool,
    pub last_heartbeat: Option<String>,
    pub inference_count: u64,
    pub success_count: u64,
    pub fail_count: u64,
    pub success_ratio: f64,
    pub avg_latency_ms: f64,
    pub token_throughput: f64,
    pub total_tokens: u64,
    pub cloud_calls: u64,
    pub template_ranking: Vec<TemplateRank>,
    pub uptime_since: String,
}

/// Cheap cloneable handle to the shared metrics.
#[derive(Clone)]
pub struct MetricsStore {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    total: AtomicU64,
    success: AtomicU64,
    failed: AtomicU64,
    latency_ms: AtomicU64,
    tokens: AtomicU64,
    cloud_calls: AtomicU64,
    templates: Mutex<BTreeMap<String, u64>>,

    path: Option<PathBuf>,
    flush_every: u64,
    last_saved_total: AtomicU64,
    // serialises writers of the shared temp file
    save_lock: Mutex<()>,
    started_at: DateTime<Utc>,
}

impl MetricsStore {
    /// A store that never touches disk.
    pub fn in_memory() -> Self {
        Self::from_snapshot(MetricsSnapshot::default(), None, 0)
    }

    /// Open the store at `path`, resuming from its last saved state.
    ///
    /// A missing or malformed file means starting from zero.
    pub fn open(path: impl Into<PathBuf>, config: &MetricsConfig) -> Self {
        let path = path.into();
        let snapshot = match load(&path) {
            Ok(Some(persisted)) => {
                tracing::info!(
                    path = %path.display(),
                    inference_count = persisted.snapshot.inference_count,
                    "Restored metrics"
                );
                persisted.snapshot
            }
            Ok(None) => {
                tracing::info!(path = %path.display(), "No saved metrics, starting clean");
                MetricsSnapshot::default()
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Unreadable metrics, starting clean"
                );
                MetricsSnapshot::default()
            }
        };
        Self::from_snapshot(snapshot, Some(path), config.flush_every)
    }

    fn from_snapshot(snapshot: MetricsSnapshot, path: Option<PathBuf>, flush_every: u64) -> Self {
        Self {
            inner: Arc::new(MetricsInner {
                total: AtomicU64::new(snapshot.inference_count),
                success: AtomicU64::new(snapshot.inference_success),
                failed: AtomicU64::new(snapshot.inference_fail),
                latency_ms: AtomicU64::new(snapshot.total_latency_ms),
                tokens: AtomicU64::new(snapshot.total_tokens),
                cloud_calls: AtomicU64::new(snapshot.cloud_calls),
                templates: Mutex::new(snapshot.template_calls),
                path,
                flush_every,
                last_saved_total: AtomicU64::new(snapshot.inference_count),
                save_lock: Mutex::new(()),
                started_at: Utc::now(),
            }),
        }
    }

    /// Record the outcome of one processed request.
    pub fn record(&self, success: bool, latency_ms: u64, output_tokens: u64, used_cloud: bool) {
        let inner = &self.inner;
        let total = inner.total.fetch_add(1, Ordering::SeqCst) + 1;
        inner.latency_ms.fetch_add(latency_ms, Ordering::Relaxed);
        inner.tokens.fetch_add(output_tokens, Ordering::Relaxed);
        if success {
            inner.success.fetch_add(1, Ordering::SeqCst);
        } else {
            inner.failed.fetch_add(1, Ordering::SeqCst);
        }
        if used_cloud {
            inner.cloud_calls.fetch_add(1, Ordering::Relaxed);
        }

        if inner.flush_every > 0 && total % inner.flush_every == 0 {
            self.schedule_save();
        }
    }

    /// Count one use of a named template.
    pub fn record_template_use(&self, name: &str) {
        *self.lock_templates().entry(name.to_string()).or_insert(0) += 1;
    }

    /// Consistent copy of every counter.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let inner = &self.inner;
        let inference_success = inner.success.load(Ordering::SeqCst);
        let inference_fail = inner.failed.load(Ordering::SeqCst);
        let inference_count = inner.total.load(Ordering::SeqCst);
        MetricsSnapshot {
            inference_count,
            inference_success,
            inference_fail,
            total_latency_ms: inner.latency_ms.load(Ordering::Relaxed),
            total_tokens: inner.tokens.load(Ordering::Relaxed),
            cloud_calls: inner.cloud_calls.load(Ordering::Relaxed),
            template_calls: self.lock_templates().clone(),
        }
    }

    /// Dashboard view with derived values computed now.
    pub fn view(&self, mode: Mode, health: &NodeHealth) -> MetricsView {
        let snapshot = self.snapshot();
        MetricsView {
            mode,
            node_online: health.is_online(),
            last_heartbeat: health
                .last_successful_check()
                .map(|t| t.with_timezone(&Local).format("%H:%M:%S").to_string()),
            inference_count: snapshot.inference_count,
            success_count: snapshot.inference_success,
            fail_count: snapshot.inference_fail,
            success_ratio: snapshot.success_ratio(),
            avg_latency_ms: snapshot.average_latency_ms(),
            token_throughput: snapshot.token_throughput(),
            total_tokens: snapshot.total_tokens,
            cloud_calls: snapshot.cloud_calls,
            template_ranking: snapshot.template_ranking(),
            uptime_since: self.started_at().to_rfc3339(),
        }
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.inner.started_at
    }

    /// Write the current snapshot to disk, replacing the previous file.
    pub fn save(&self) -> Result<(), RuntimeError> {
        let path = self.inner.path.as_ref().ok_or(RuntimeError::NoPath)?;
        let _guard = self
            .inner
            .save_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let persisted = PersistedMetrics {
            snapshot: self.snapshot(),
            saved_at: Some(Utc::now()),
        };
        let json = serde_json::to_vec_pretty(&persisted)?;
        write_atomic(path, &json)?;

        self.inner
            .last_saved_total
            .store(persisted.snapshot.inference_count, Ordering::SeqCst);
        tracing::debug!(
            path = %path.display(),
            inference_count = persisted.snapshot.inference_count,
            "Saved metrics"
        );
        Ok(())
    }

    /// Save only if the request total moved since the last save.
    pub fn save_if_changed(&self) -> Result<bool, RuntimeError> {
        let total = self.inner.total.load(Ordering::SeqCst);
        if total == self.inner.last_saved_total.load(Ordering::SeqCst) {
            return Ok(false);
        }
        self.save()?;
        Ok(true)
    }

    /// Periodically save when the total changed, for the process lifetime.
    pub fn spawn_persistence(&self, period: Duration) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // first tick fires immediately; nothing to save yet
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let store = store.clone();
                match tokio::task::spawn_blocking(move || store.save_if_changed()).await {
                    Ok(Ok(_)) => {}
                    Ok(Err(e)) => tracing::warn!(error = %e, "Periodic metrics save failed"),
                    Err(e) => tracing::warn!(error = %e, "Periodic metrics save task failed"),
                }
            }
        })
    }

    fn schedule_save(&self) {
        if self.inner.path.is_none() {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            if let Err(e) = self.save() {
                tracing::warn!(error = %e, "Metrics save failed");
            }
            return;
        };
        let store = self.clone();
        handle.spawn_blocking(move || {
            if let Err(e) = store.save() {
                tracing::warn!(error = %e, "Metrics save failed");
            }
        });
    }

    fn lock_templates(&self) -> MutexGuard<'_, BTreeMap<String, u64>> {
        self.inner
            .templates
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Read a persisted snapshot. `Ok(None)` when the file does not exist.
pub fn load(path: &Path) -> Result<Option<PersistedMetrics>, RuntimeError> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(RuntimeError::io(path, e)),
    };
    Ok(Some(serde_json::from_slice(&bytes)?))
}
