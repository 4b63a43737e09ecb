//! Input validation for profile operations.

use crate::core::paths;
use crate::error::{ProfileError, Result};

/// Validate a profile name.
///
/// Profile names must:
/// - Start with an ASCII letter or digit
/// - Contain only ASCII letters, digits, `.`, `_` and `-`
///
/// # Errors
///
/// Returns `ProfileError::InvalidName` if the name is invalid.
pub fn validate_profile_name(name: &str) -> Result<()> {
    let mut chars = name.chars();

    let valid_start = chars.next().map_or(false, |c| c.is_ascii_alphanumeric());
    let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));

    if valid_start && valid_rest {
        Ok(())
    } else {
        Err(ProfileError::InvalidName(name.to_string()).into())
    }
}

/// Validate a file output target.
///
/// Targets must be absolute (`/...`) or home-relative (`~/...`).
///
/// # Errors
///
/// Returns `ProfileError::InvalidTarget` otherwise.
pub fn validate_target(target: &str) -> Result<()> {
    if paths::is_valid_target(target) {
        Ok(())
    } else {
        Err(ProfileError::InvalidTarget(target.to_string()).into())
    }
}
