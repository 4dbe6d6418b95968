use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuditError {
    /// The trail location could not be prepared.
    #[error("failed to initialize audit trail: {0}")]
    InitializationFailed(String),

    #[error("failed to encode audit event: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("audit trail I/O: {0}")]
    Io(#[from] std::io::Error),
}
