//! Error types for the MCP crate.

use promptc_runtime::RouterError;
use thiserror::Error;

/// Errors that can occur in the MCP server.
///
/// Tool-level variants are returned to the host as `isError` results, not
/// as JSON-RPC errors.
#[derive(Debug, Error)]
pub enum McpError {
    /// Tool not found.
    #[error("tool not found: {name}")]
    ToolNotFound { name: String },

    /// Invalid arguments for tool.
    #[error("invalid arguments for tool {tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },

    /// Named template does not exist.
    #[error("template not found: {name}")]
    TemplateNotFound { name: String },

    /// The router could not produce an answer.
    #[error(transparent)]
    Routing(#[from] RouterError),

    /// Serialization error.
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// IO error on the transport.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
