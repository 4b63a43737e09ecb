//! Key rotation command.

use crate::cli::{open, output};
use crate::core::rotate::rotate;
use crate::error::Result;

/// Move everything stored under `old` to `new`.
pub fn execute(old: &str, new: &str) -> Result<()> {
    let (_, mut profiles) = open()?;
    let rotation = rotate(&mut profiles, old, new)?;

    output::success(&format!(
        "rotated {} -> {}",
        rotation.old_suffix, rotation.new_suffix
    ));
    output::kv("profiles", rotation.profiles);
    output::kv("templates", rotation.templates);
    output::hint(&format!(
        "key {} can now be removed from the agent",
        rotation.old_suffix
    ));
    Ok(())
}
