//! # promptc-audit
//!
//! Audit trail and live log hub for the promptc agent.
//!
//! This crate provides functionality for:
//! - Recording every state transition and request boundary as an [`AuditEvent`]
//! - Appending events to a durable trail (JSON Lines, opened per write)
//! - Keeping a bounded history of recent human-readable lines
//! - Fanning lines out to live subscribers (the dashboard WebSocket)
//!
//! ## Line format
//!
//! ```text
//! [14:03:27.512] INFERENCE  PIPELINE_OK        actor=mac-mini         resource=optimize_prompt              result=OK latency=812ms | 203 tokens
//! ```
//!
//! ## Categories
//!
//! | Category | Emitted by |
//! |----------|------------|
//! | `KERNEL` | boot, shutdown, node health transitions |
//! | `PROTOCOL` | tool invocations and parse failures |
//! | `TEMPLATE` | template lookups |
//! | `INFERENCE` | the processing pipeline |
//! | `SECURITY` | rejected prompts |
//! | `SYSTEM` | hot-reload and internal chatter |

pub mod error;
pub mod event;
pub mod hub;
pub mod storage;

pub use error::AuditError;
pub use event::{AuditCategory, AuditEvent, AuditEventBuilder, AuditResult};
pub use hub::{AuditHub, Subscription};
pub use storage::{AuditStorage, FileStorage, NullStorage};
