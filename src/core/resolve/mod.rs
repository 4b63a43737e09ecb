//! Secret reference resolution.
//!
//! Template bodies hold references such as `op://vault/item/field`. A
//! [`Resolver`] turns them into real values at use time and launches commands
//! with a resolved environment. Resolved output is treated as an opaque
//! string.
//!
//! ## Backends
//!
//! - **op**: 1Password CLI (`op inject`, `op read`, `op run`). Default.
//! - **none**: [`Passthrough`], content is used verbatim.
//!
//! The backend is chosen once, from [`Settings`], when the runner is built.

use std::path::Path;
use std::process::Command;

use crate::core::config::{ResolverKind, Settings};
use crate::error::Result;

mod op;
mod passthrough;

pub use op::OnePassword;
pub use passthrough::Passthrough;

/// Capability to resolve secret references.
pub trait Resolver {
    /// Replace every reference inside `content`.
    ///
    /// # Errors
    ///
    /// Returns `RunError::Resolve` if the external tool fails.
    fn inject(&self, content: &str, account: Option<&str>) -> Result<String>;

    /// Resolve a single reference to its value.
    ///
    /// # Errors
    ///
    /// Returns `RunError::Resolve` if the external tool fails.
    fn read(&self, reference: &str, account: Option<&str>) -> Result<String>;

    /// Whether `value` is a reference this backend understands.
    fn is_reference(&self, value: &str) -> bool;

    /// Build a command that runs `argv` with the variables of the dotenv file
    /// at `env_file` resolved into its environment.
    ///
    /// # Errors
    ///
    /// Returns `RunError` if the launcher is unavailable or `argv` is empty.
    fn launcher(&self, env_file: &Path, account: Option<&str>, argv: &[String])
        -> Result<Command>;

    /// Backend name for display.
    fn name(&self) -> &'static str;
}

/// Build the resolver selected by `settings`.
pub fn from_settings(settings: &Settings) -> Box<dyn Resolver> {
    match settings.resolver {
        ResolverKind::Op => Box::new(OnePassword::new(&settings.op_binary)),
        ResolverKind::None => Box::new(Passthrough),
    }
}
