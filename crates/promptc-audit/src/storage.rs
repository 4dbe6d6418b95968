//! Audit storage backends.

use crate::error::AuditError;
use crate::event::AuditEvent;
use async_trait::async_trait;
use std::io::Write;
use std::path::PathBuf;

/// Trait for durable audit storage.
#[async_trait]
pub trait AuditStorage: Send + Sync {
    /// Store an audit event.
    async fn store(&self, event: &AuditEvent) -> Result<(), AuditError>;
}

/// File storage (appends JSON Lines to the trail).
///
/// The file is opened in append mode on every write; no handle is held
/// between events, so external rotation or deletion is always safe.
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    /// Create a new file storage, creating the parent directory if needed.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, AuditError> {
        let path = path.into();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                AuditError::InitializationFailed(format!(
                    "cannot create {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
        Ok(Self { path })
    }
}

#[async_trait]
impl AuditStorage for FileStorage {
    async fn store(&self, event: &AuditEvent) -> Result<(), AuditError> {
        let json = serde_json::to_string(event)?;

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", json)?;

        Ok(())
    }
}

/// Null storage (discards all events).
#[derive(Debug, Default)]
pub struct NullStorage;

impl NullStorage {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AuditStorage for NullStorage {
    async fn store(&self, _event: &AuditEvent) -> Result<(), AuditError> {
        Ok(())
    }
}
