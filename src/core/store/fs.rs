//! Filesystem helpers for the store.

use std::fs;
use std::io::Write;
use std::path::Path;

use crate::error::{Result, StoreError};

/// Read a whole file as text.
pub(super) fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| {
        StoreError::ReadFailed {
            path: path.display().to_string(),
            source,
        }
        .into()
    })
}

/// Replace `path` with `contents` via a temp file in the same directory.
///
/// Creates the parent directory when missing. Readers see either the old
/// or the new contents, never a partial write.
pub(super) fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let write_err = |source: std::io::Error| StoreError::WriteFailed {
        path: path.display().to_string(),
        source,
    };

    let dir = path.parent().ok_or_else(|| {
        write_err(std::io::Error::new(
            std::io::ErrorKind::Other,
            "path has no parent directory",
        ))
    })?;
    fs::create_dir_all(dir).map_err(write_err)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(contents).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}

/// Remove a file; absence is not an error.
pub(super) fn remove_file(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(StoreError::WriteFailed {
            path: path.display().to_string(),
            source,
        }
        .into()),
    }
}

/// Remove a directory tree; absence is not an error.
pub(super) fn remove_dir_all(path: &Path) -> Result<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(StoreError::WriteFailed {
            path: path.display().to_string(),
            source,
        }
        .into()),
    }
}
