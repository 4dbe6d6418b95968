//! # promptc-mcp
//!
//! MCP (Model Context Protocol) front door for the promptc agent.
//!
//! The server speaks newline-delimited JSON-RPC 2.0 over any async
//! reader/writer pair (stdin/stdout in production) and exposes two tools:
//!
//! - `get_template`: fetch a stored template by name
//! - `optimize_prompt`: compile a prompt, routing weak ones through the
//!   provider failover chain
//!
//! Requests are handled one at a time. Responses go to the writer only;
//! audit records go to the [`AuditHub`](promptc_audit::AuditHub).

pub mod error;
pub mod protocol;
pub mod server;
pub mod tools;

pub use error::McpError;
pub use protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
pub use server::McpServer;
