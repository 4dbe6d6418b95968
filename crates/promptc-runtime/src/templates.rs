//! The hot-reloadable template table.
//!
//! Readers clone an `Arc` to the current table; a reload builds the new
//! table up front and swaps the pointer under the write lock, so a lookup
//! sees either the whole old table or the whole new one.

use crate::error::RuntimeError;
use crate::persist::write_atomic;
use promptc_core::{Template, TemplateTable, parse_template_table};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

#[derive(Clone)]
pub struct TemplateStore {
    inner: Arc<TemplateInner>,
}

struct TemplateInner {
    table: RwLock<Arc<TemplateTable>>,
    path: Option<PathBuf>,
}

impl TemplateStore {
    /// Load the table from `path`. Missing or malformed files yield an empty
    /// table; the path is still used for later writes.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let table = match std::fs::read(&path) {
            Ok(bytes) => match parse_template_table(&bytes) {
                Ok(table) => {
                    tracing::info!(path = %path.display(), count = table.len(), "Loaded templates");
                    table
                }
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Ignoring unreadable template table"
                    );
                    TemplateTable::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "No template table yet");
                TemplateTable::new()
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Cannot read template table");
                TemplateTable::new()
            }
        };
        Self::build(table, Some(path))
    }

    /// A store that never touches disk.
    pub fn in_memory(table: TemplateTable) -> Self {
        Self::build(table, None)
    }

    fn build(table: TemplateTable, path: Option<PathBuf>) -> Self {
        Self {
            inner: Arc::new(TemplateInner {
                table: RwLock::new(Arc::new(table)),
                path,
            }),
        }
    }

    pub fn get(&self, name: &str) -> Option<Template> {
        self.snapshot().get(name).cloned()
    }

    /// The current table.
    pub fn snapshot(&self) -> Arc<TemplateTable> {
        self.inner
            .table
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    /// Swap in a whole new table and persist it.
    ///
    /// The swap always takes effect; a failed write is returned so the
    /// caller can report it, but the in-memory table stays replaced.
    pub fn replace(&self, table: TemplateTable) -> Result<usize, RuntimeError> {
        let count = table.len();
        let table = Arc::new(table);
        *self
            .inner
            .table
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = table.clone();

        if let Some(path) = &self.inner.path {
            persist(path, &table)?;
        }
        Ok(count)
    }
}

fn persist(path: &Path, table: &TemplateTable) -> Result<(), RuntimeError> {
    let json = serde_json::to_vec_pretty(table)?;
    write_atomic(path, &json)
}
