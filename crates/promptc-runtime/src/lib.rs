//! # promptc-runtime
//!
//! The operational core of the promptc agent:
//!
//! - [`MetricsStore`]: atomic request counters, template ranking and
//!   replace-on-write persistence
//! - [`HealthMonitor`] / [`NodeHealth`]: reachability of the local node
//! - [`TemplateStore`]: hot-reloadable template table
//! - [`Router`]: quality bypass and ordered provider failover
//!
//! Every shared component is a cheap `Clone` handle; wiring happens once in
//! the binary.

pub mod error;
pub mod health;
pub mod metrics;
mod persist;
pub mod provider;
pub mod router;
pub mod templates;

pub use error::{ProviderError, RouterError, RuntimeError};
pub use health::{HealthMonitor, HealthProbe, NodeHealth};
pub use metrics::{MetricsSnapshot, MetricsStore, MetricsView, PersistedMetrics, TemplateRank};
pub use provider::{Provider, ProviderTier};
pub use router::{Attempt, ProcessOutcome, RoutePath, Router, estimate_tokens};
pub use templates::TemplateStore;
