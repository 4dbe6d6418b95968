//! Shared types for the promptc agent.
//!
//! Everything that more than one promptc crate needs lives here: the agent
//! configuration, the prompt request that flows through the pipeline, the
//! template table, and the local collaborators the router consults before
//! touching any backend (quality analysis, sensitive data masking and
//! deterministic formatting).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// Configuration types shared across all promptc crates
pub mod config;

pub mod error;
pub mod formatter;
pub mod masking;
pub mod quality;

pub use error::CoreError;
pub use config::{
    AgentConfig, AuditConfig, ConfigError, DashboardConfig, HealthConfig, MetricsConfig, Mode,
    ProvidersConfig, RouterConfig,
};
pub use formatter::{Formatter, MarkdownFormatter};
pub use masking::{Masked, Masker, RegexMasker, mask_request};
pub use quality::{Analysis, HeuristicAnalyzer, QualityAnalyzer};

/// A prompt to be compiled and, if needed, optimised by a backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptRequest {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub context: String,
    #[serde(default)]
    pub task: String,
    #[serde(default)]
    pub constraints: Vec<String>,
    /// Values substituted into `{{name}}` placeholders of the task.
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
    /// Template whose content replaces the task, when it exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_name: Option<String>,
}

impl PromptRequest {
    /// Create a request with only a task.
    pub fn with_task(task: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            ..Default::default()
        }
    }

    /// Total size in bytes of every user-supplied text field.
    pub fn byte_len(&self) -> usize {
        self.role.len()
            + self.context.len()
            + self.task.len()
            + self.constraints.iter().map(String::len).sum::<usize>()
            + self
                .variables
                .iter()
                .map(|(k, v)| k.len() + v.len())
                .sum::<usize>()
    }
}

/// A named, reusable request body.
///
/// The name is the key of the [`TemplateTable`]; it is not repeated here so
/// the on-disk and dashboard JSON stay `{"name": {"description", "content"}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    #[serde(default)]
    pub description: String,
    pub content: String,
}

/// The whole template table, ordered by name.
pub type TemplateTable = BTreeMap<String, Template>;

/// Parse a template table from JSON, rejecting entries with no content.
pub fn parse_template_table(bytes: &[u8]) -> Result<TemplateTable, CoreError> {
    let table: TemplateTable = serde_json::from_slice(bytes)?;
    if let Some((name, _)) = table.iter().find(|(_, t)| t.content.trim().is_empty()) {
        return Err(CoreError::EmptyTemplate(name.clone()));
    }
    Ok(table)
}
