//! Run command.
//!
//! Materializes a profile for one command and exits with the child's status.

use tracing::debug;

use crate::cli::{open, select};
use crate::core::resolve;
use crate::core::runner::Runner;
use crate::error::Result;

/// Run `command` with the profile's files written and env resolved.
pub fn execute(name: &str, command: &[String]) -> Result<()> {
    let (settings, mut profiles) = open()?;
    let profile = select::profile(&mut profiles, name)?;
    let resolver = resolve::from_settings(&settings);

    debug!(profile = %profile.name, resolver = resolver.name(), "running command");
    let code = Runner::new(&mut profiles, resolver.as_ref())?.run_command(&profile, command)?;
    std::process::exit(code);
}
