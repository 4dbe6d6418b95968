//! The audit hub: durable trail, bounded history and live fan-out.
//!
//! History and the subscriber set share one lock. A line is appended to
//! history and delivered to every subscriber inside the same critical
//! section, and [`AuditHub::subscribe`] snapshots history and registers the
//! new subscriber under that lock too, so a subscriber sees each line
//! exactly once: either in its replay or on its channel.
//!
//! Delivery never blocks. A subscriber whose queue is full or closed is
//! dropped on the spot.

use crate::error::AuditError;
use crate::event::{AuditEvent, internal_line};
use crate::storage::{AuditStorage, FileStorage, NullStorage};
use promptc_core::AgentConfig;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;

const DEFAULT_HISTORY_LIMIT: usize = 10_000;
const DEFAULT_SUBSCRIBER_BUFFER: usize = 256;

/// Cheap cloneable handle to the shared hub.
#[derive(Clone)]
pub struct AuditHub {
    inner: Arc<HubInner>,
}

struct HubInner {
    state: Mutex<HubState>,
    storage: Arc<dyn AuditStorage>,
    history_limit: usize,
    subscriber_buffer: usize,
    next_subscriber: AtomicU64,
}

#[derive(Default)]
struct HubState {
    history: VecDeque<String>,
    subscribers: HashMap<u64, mpsc::Sender<String>>,
}

impl AuditHub {
    /// Create a hub writing to the configured trail, or discarding events
    /// when auditing is disabled.
    pub fn new(config: &AgentConfig) -> Result<Self, AuditError> {
        let storage: Arc<dyn AuditStorage> = if config.audit.enabled {
            Arc::new(FileStorage::new(config.audit_path())?)
        } else {
            Arc::new(NullStorage::new())
        };
        Ok(Self::with_storage(
            storage,
            config.audit.history_limit,
            config.audit.subscriber_buffer,
        ))
    }

    /// Create a hub with a custom storage backend.
    pub fn with_storage(
        storage: Arc<dyn AuditStorage>,
        history_limit: usize,
        subscriber_buffer: usize,
    ) -> Self {
        Self {
            inner: Arc::new(HubInner {
                state: Mutex::new(HubState::default()),
                storage,
                history_limit: history_limit.max(1),
                subscriber_buffer: subscriber_buffer.max(1),
                next_subscriber: AtomicU64::new(1),
            }),
        }
    }

    /// A hub that keeps history and fans out but writes nothing to disk.
    pub fn in_memory() -> Self {
        Self::with_storage(
            Arc::new(NullStorage::new()),
            DEFAULT_HISTORY_LIMIT,
            DEFAULT_SUBSCRIBER_BUFFER,
        )
    }

    /// Record an event: broadcast its line, then append it to the trail.
    ///
    /// Storage failures are logged and swallowed.
    pub async fn publish(&self, event: AuditEvent) {
        let line = event.to_log_line();

        tracing::info!(target: "audit", "{}", line);
        tracing::debug!(
            event_id = %event.event_id,
            category = %event.category,
            action = %event.action,
            correlation_id = event.correlation_id.as_deref().unwrap_or("-"),
            "Audit event"
        );

        self.broadcast(line);

        if let Err(e) = self.inner.storage.store(&event).await {
            tracing::warn!(error = %e, action = %event.action, "Failed to append audit event");
        }
    }

    /// Broadcast an internal message. It reaches history and subscribers
    /// but never the durable trail.
    pub fn publish_internal(&self, message: impl AsRef<str>) {
        let line = internal_line(message.as_ref());
        tracing::debug!(target: "audit", "{}", line);
        self.broadcast(line);
    }

    /// Register a live subscriber.
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::channel(self.inner.subscriber_buffer);
        let id = self.inner.next_subscriber.fetch_add(1, Ordering::Relaxed);

        let replay = {
            let mut state = self.lock_state();
            state.subscribers.insert(id, tx);
            state.history.iter().cloned().collect()
        };

        Subscription {
            id,
            replay,
            rx,
            hub: self.clone(),
        }
    }

    /// Copy of the current history, oldest first.
    pub fn history(&self) -> Vec<String> {
        self.lock_state().history.iter().cloned().collect()
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock_state().subscribers.len()
    }

    fn broadcast(&self, line: String) {
        let mut state = self.lock_state();

        let mut dropped = Vec::new();
        for (id, tx) in state.subscribers.iter() {
            if tx.try_send(line.clone()).is_err() {
                dropped.push(*id);
            }
        }
        for id in dropped {
            state.subscribers.remove(&id);
            tracing::debug!(subscriber = id, "Dropped audit subscriber after failed delivery");
        }

        state.history.push_back(line);
        while state.history.len() > self.inner.history_limit {
            state.history.pop_front();
        }
    }

    fn unsubscribe(&self, id: u64) {
        self.lock_state().subscribers.remove(&id);
    }

    fn lock_state(&self) -> MutexGuard<'_, HubState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// A live view of the hub: the history at subscription time plus every
/// line published afterwards. Dropping it deregisters the subscriber.
pub struct Subscription {
    id: u64,
    replay: Vec<String>,
    rx: mpsc::Receiver<String>,
    hub: AuditHub,
}

impl Subscription {
    /// Take the replayed history, leaving it empty.
    pub fn take_replay(&mut self) -> Vec<String> {
        std::mem::take(&mut self.replay)
    }

    /// Next live line. `None` once the hub dropped this subscriber.
    pub async fn recv(&mut self) -> Option<String> {
        self.rx.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.hub.unsubscribe(self.id);
    }
}
