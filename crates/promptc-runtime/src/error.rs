//! Error types for the runtime crate.

use std::time::Duration;
use thiserror::Error;

/// Errors from persistence of runtime state.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("no persistence path configured")]
    NoPath,
}

impl RuntimeError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

/// A single failed attempt by a backend provider.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    /// The request never produced an HTTP response.
    #[error("transport error: {0}")]
    Transport(String),

    /// The backend answered with a non-success status.
    #[error("backend returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body could not be decoded.
    #[error("invalid response: {0}")]
    Decode(String),

    /// The backend answered but produced no text.
    #[error("empty response")]
    EmptyResponse,

    /// The attempt ran past its deadline.
    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

/// Caller-visible failures of the processing router.
#[derive(Debug, Error)]
pub enum RouterError {
    /// Every provider in the chain failed.
    #[error("all {} providers failed: {}", .attempts.len(), summarize(.attempts))]
    Exhausted { attempts: Vec<crate::router::Attempt> },

    /// The prompt exceeded the size guard and was never routed.
    #[error("prompt of {size} bytes exceeds the {limit} byte limit")]
    PromptTooLarge { size: usize, limit: usize },
}

fn summarize(attempts: &[crate::router::Attempt]) -> String {
    attempts
        .iter()
        .map(|a| match &a.error {
            Some(e) => format!("{}: {}", a.provider, e),
            None => a.provider.clone(),
        })
        .collect::<Vec<_>>()
        .join("; ")
}
