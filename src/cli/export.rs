//! Export commands.
//!
//! Print resolved template content instead of running a command.

use std::path::Path;

use crate::cli::profile::print_bytes;
use crate::cli::{open, output, select};
use crate::core::resolve;
use crate::core::runner::Runner;
use crate::error::{Result, StoreError};

/// Print `export KEY='value'` lines for the profile's env template.
pub fn env(name: &str) -> Result<()> {
    let (settings, mut profiles) = open()?;
    let profile = select::profile(&mut profiles, name)?;
    let resolver = resolve::from_settings(&settings);

    let exports = Runner::new(&mut profiles, resolver.as_ref())?.export_env(&profile)?;
    if !exports.is_empty() {
        output::data(&exports);
    }
    Ok(())
}

/// Print one resolved file, or write every file output under `base_dir`.
pub fn file(name: &str, target: Option<&str>, base_dir: Option<&str>) -> Result<()> {
    let (settings, mut profiles) = open()?;
    let profile = select::profile(&mut profiles, name)?;
    let resolver = resolve::from_settings(&settings);

    if let Some(base_dir) = base_dir {
        let written = Runner::new(&mut profiles, resolver.as_ref())?
            .export_all_files(&profile, Path::new(base_dir))?;
        for path in &written {
            output::data(&path.display().to_string());
        }
        output::success(&format!("exported {}", output::count(written.len(), "file")));
        return Ok(());
    }

    let target = match target {
        Some(t) => t.to_string(),
        None => select::target(&profile.file_targets(), None)?
            .ok_or_else(|| StoreError::TemplateNotFound("no file templates".to_string()))?,
    };

    let content = Runner::new(&mut profiles, resolver.as_ref())?.export_file(&profile, &target)?;
    print_bytes(&content)
}
