//! Error types for core operations.

use crate::ConfigError;

/// Errors raised while reading or validating shared domain data.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid template table: {0}")]
    InvalidTemplates(#[from] serde_json::Error),

    #[error("template '{0}' has empty content")]
    EmptyTemplate(String),
}
