//! Replace-on-write file persistence.

use crate::error::RuntimeError;
use std::path::{Path, PathBuf};

/// Write `bytes` to `<path>.tmp`, then rename over `path`.
///
/// Readers see either the previous file or the new one, never a partial
/// write.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), RuntimeError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| RuntimeError::io(parent, e))?;
    }

    let tmp = tmp_path(path);
    std::fs::write(&tmp, bytes).map_err(|e| RuntimeError::io(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| RuntimeError::io(path, e))?;
    Ok(())
}

pub(crate) fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}
