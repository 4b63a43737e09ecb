//! Settings file management.
//!
//! Handles reading and validating `~/.config/cfg/config.toml`. Every field is
//! optional; environment variables override the file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::core::constants;
use crate::core::paths;
use crate::error::{ConfigError, Result};

/// Environment override for the store root.
pub const STORE_DIR_ENV: &str = "CFG_STORE_DIR";

/// Environment override for the resolver backend.
pub const RESOLVER_ENV: &str = "CFG_RESOLVER";

/// Which secret resolver backs template materialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResolverKind {
    /// 1Password CLI (`op inject`, `op read`, `op run`).
    #[default]
    Op,
    /// No resolution; content is used verbatim.
    None,
}

impl std::str::FromStr for ResolverKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "op" => Ok(Self::Op),
            "none" => Ok(Self::None),
            other => Err(ConfigError::InvalidValue {
                field: "resolver",
                reason: format!("unknown resolver '{}' (expected 'op' or 'none')", other),
            }),
        }
    }
}

/// User settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Store root; `~/` is expanded.
    pub store_dir: String,
    /// Secret resolver backend.
    pub resolver: ResolverKind,
    /// Path or name of the 1Password CLI.
    pub op_binary: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            store_dir: format!("~/{}", constants::DEFAULT_STORE_DIR),
            resolver: ResolverKind::Op,
            op_binary: "op".to_string(),
        }
    }
}

impl Settings {
    /// Default settings file path, if a config dir exists.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(constants::SETTINGS_FILE))
    }

    /// Load settings from the default location, then apply environment
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file exists but is malformed, or an
    /// override has an invalid value.
    pub fn load() -> Result<Self> {
        let mut settings = match Self::default_path() {
            Some(path) => Self::load_from(&path)?,
            None => Self::default(),
        };
        settings.apply_overrides(
            std::env::var(STORE_DIR_ENV).ok(),
            std::env::var(RESOLVER_ENV).ok(),
        )?;
        Ok(settings)
    }

    /// Load settings from `path`; a missing file yields defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ReadFile` or `ConfigError::Parse`.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "no settings file, using defaults");
            return Ok(Self::default());
        }

        debug!(path = %path.display(), "loading settings");
        let contents = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        let settings: Self = toml::from_str(&contents).map_err(ConfigError::Parse)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Apply environment overrides (empty values are ignored).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for an unknown resolver name.
    pub fn apply_overrides(
        &mut self,
        store_dir: Option<String>,
        resolver: Option<String>,
    ) -> Result<()> {
        if let Some(dir) = store_dir.filter(|d| !d.trim().is_empty()) {
            self.store_dir = dir;
        }
        if let Some(kind) = resolver.filter(|r| !r.trim().is_empty()) {
            self.resolver = kind.parse()?;
        }
        self.validate()
    }

    /// Check field values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` on empty fields.
    pub fn validate(&self) -> Result<()> {
        if self.store_dir.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "store_dir",
                reason: "must not be empty".to_string(),
            }
            .into());
        }
        if self.op_binary.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "op_binary",
                reason: "must not be empty".to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Expanded store root.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is home-relative and HOME is unknown.
    pub fn store_root(&self) -> Result<PathBuf> {
        paths::expand_home(&self.store_dir)
    }
}
