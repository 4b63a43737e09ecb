//! Home-relative path handling.
//!
//! Targets are stored as written by the user (`~/.npmrc`, `/etc/foo`) and
//! expanded only when materialized.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// The current user's home directory.
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().ok_or_else(|| Error::Other("unable to determine home directory".to_string()))
}

/// Expand a leading `~` against `home`.
pub fn expand_with(path: &str, home: &Path) -> PathBuf {
    if path == "~" {
        return home.to_path_buf();
    }
    match path.strip_prefix("~/") {
        Some(rest) => home.join(rest),
        None => PathBuf::from(path),
    }
}

/// Expand a leading `~` against the user's home directory.
///
/// # Errors
///
/// Returns an error if the path is home-relative and HOME is unknown.
pub fn expand_home(path: &str) -> Result<PathBuf> {
    if path == "~" || path.starts_with("~/") {
        Ok(expand_with(path, &home_dir()?))
    } else {
        Ok(PathBuf::from(path))
    }
}

/// Replace a leading `home` prefix with `~`.
pub fn contract_with(path: &Path, home: &Path) -> String {
    match path.strip_prefix(home) {
        Ok(rest) if rest.as_os_str().is_empty() => "~".to_string(),
        Ok(rest) => format!("~/{}", rest.display()),
        Err(_) => path.display().to_string(),
    }
}

/// Target path relative to an export base directory.
///
/// `~/` is stripped and absolute paths lose their leading `/`, so every
/// target lands inside the base directory.
pub fn relative_target(target: &str) -> &str {
    let rest = target.strip_prefix("~/").unwrap_or(target);
    rest.trim_start_matches('/')
}

/// Whether `target` is acceptable for a file output.
pub fn is_valid_target(target: &str) -> bool {
    target.starts_with('/') || target.starts_with("~/")
}
