//! Audit event types.
//!
//! An event is an immutable record of one meaningful occurrence. The
//! structured form goes to the durable trail; [`AuditEvent::to_log_line`]
//! renders the fixed-width line shown on the dashboard.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Subsystem an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AuditCategory {
    Kernel,
    Protocol,
    Template,
    Inference,
    Security,
    System,
}

impl fmt::Display for AuditCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Kernel => "KERNEL",
            Self::Protocol => "PROTOCOL",
            Self::Template => "TEMPLATE",
            Self::Inference => "INFERENCE",
            Self::Security => "SECURITY",
            Self::System => "SYSTEM",
        };
        // pad() so width specifiers in the log line apply
        f.pad(s)
    }
}

/// Outcome of the audited occurrence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AuditResult {
    #[default]
    Ok,
    Fail,
    Warn,
}

impl fmt::Display for AuditResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Ok => "OK",
            Self::Fail => "FAIL",
            Self::Warn => "WARN",
        };
        f.pad(s)
    }
}

/// An audit event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique event ID.
    pub event_id: Uuid,

    /// When the event occurred.
    pub occurred_at: DateTime<Utc>,

    pub category: AuditCategory,

    /// Short upper-case verb, e.g. `PIPELINE_OK`.
    pub action: String,

    /// Who performed the action (node name, provider, operator).
    pub actor: String,

    /// What the action touched (tool, template, provider).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,

    pub result: AuditResult,

    /// Duration in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,

    /// Free-text detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,

    /// Groups all events emitted while serving one protocol request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

impl AuditEvent {
    /// Create a new successful event with the required fields.
    pub fn new(
        category: AuditCategory,
        action: impl Into<String>,
        actor: impl Into<String>,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            category,
            action: action.into(),
            actor: actor.into(),
            resource: None,
            result: AuditResult::Ok,
            latency_ms: None,
            detail: None,
            correlation_id: None,
        }
    }

    /// Create a builder for an audit event.
    pub fn builder(
        category: AuditCategory,
        action: impl Into<String>,
        actor: impl Into<String>,
    ) -> AuditEventBuilder {
        AuditEventBuilder::new(category, action, actor)
    }

    /// Format the event as a fixed-width human-readable log line.
    ///
    /// Format: `[HH:MM:SS.mmm] CATEGORY ACTION actor=.. [resource=..] result=.. [latency=Nms] [| detail]`
    pub fn to_log_line(&self) -> String {
        let mut line = format!(
            "[{}] {:<10} {:<18} actor={:<16}",
            self.occurred_at.with_timezone(&Local).format("%H:%M:%S%.3f"),
            self.category,
            self.action,
            self.actor,
        );

        if let Some(ref resource) = self.resource {
            line.push_str(&format!(" resource={:<28}", resource));
        }

        line.push_str(&format!(" result={}", self.result));

        if let Some(latency) = self.latency_ms.filter(|ms| *ms > 0) {
            line.push_str(&format!(" latency={}ms", latency));
        }

        if let Some(ref detail) = self.detail
            && !detail.is_empty()
        {
            line.push_str(&format!(" | {}", detail));
        }

        line
    }
}

/// Render the line used for internal chatter that never reaches the trail.
pub(crate) fn internal_line(message: &str) -> String {
    format!(
        "[{}] {:<10} {:<18} actor={:<16} result=INFO | {}",
        Local::now().format("%H:%M:%S%.3f"),
        AuditCategory::System,
        "INTERNAL",
        "promptc-engine",
        message,
    )
}

/// Builder for creating audit events.
#[derive(Debug)]
pub struct AuditEventBuilder {
    event: AuditEvent,
}

impl AuditEventBuilder {
    /// Create a new builder with required fields.
    pub fn new(
        category: AuditCategory,
        action: impl Into<String>,
        actor: impl Into<String>,
    ) -> Self {
        Self {
            event: AuditEvent::new(category, action, actor),
        }
    }

    /// Set the resource.
    pub fn resource(mut self, resource: impl Into<String>) -> Self {
        self.event.resource = Some(resource.into());
        self
    }

    /// Set the result.
    pub fn result(mut self, result: AuditResult) -> Self {
        self.event.result = result;
        self
    }

    /// Set the latency in milliseconds.
    pub fn latency_ms(mut self, latency: u64) -> Self {
        self.event.latency_ms = Some(latency);
        self
    }

    /// Set the detail text.
    pub fn detail(mut self, detail: impl Into<String>) -> Self {
        self.event.detail = Some(detail.into());
        self
    }

    /// Set the correlation ID, if any.
    pub fn correlation_id(mut self, correlation_id: Option<String>) -> Self {
        self.event.correlation_id = correlation_id;
        self
    }

    /// Build the audit event.
    pub fn build(self) -> AuditEvent {
        self.event
    }
}
