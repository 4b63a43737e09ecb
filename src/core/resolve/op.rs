//! 1Password CLI resolver.
//!
//! ## Requirements
//!
//! - `op` CLI installed (or `op_binary` set in settings)
//! - a signed-in account, or one selectable with `--account`

use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

use tracing::{debug, trace};

use super::Resolver;
use crate::error::{Result, RunError};

const REFERENCE_SCHEME: &str = "op://";

/// Resolver backed by the `op` CLI.
#[derive(Debug, Clone)]
pub struct OnePassword {
    binary: String,
}

impl OnePassword {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Check that the CLI is reachable.
    fn check_op(&self) -> Result<()> {
        which::which(&self.binary).map_err(|_| RunError::Launch {
            program: self.binary.clone(),
            reason: "not found on PATH. Install the 1Password CLI or set resolver = \"none\""
                .to_string(),
        })?;
        Ok(())
    }

    fn command(&self, account: Option<&str>) -> Command {
        let mut cmd = Command::new(&self.binary);
        if let Some(account) = account {
            cmd.args(["--account", account]);
        }
        cmd
    }

    /// Sign in before `inject`.
    ///
    /// With several accounts signed in and the app locked, `op inject` can
    /// fail even when `--account` is given. A prior `op signin` for that
    /// account avoids it. Failures here are ignored.
    fn warm_up(&self, account: &str) {
        let status = Command::new(&self.binary)
            .args(["signin", "--account", account])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        debug!(account, ok = status.map(|s| s.success()).unwrap_or(false), "op signin");
    }
}

impl Resolver for OnePassword {
    fn name(&self) -> &'static str {
        "op"
    }

    fn inject(&self, content: &str, account: Option<&str>) -> Result<String> {
        trace!(content_len = content.len(), "op inject");
        self.check_op()?;

        let mut input = tempfile::Builder::new()
            .prefix("cfg-inject-in")
            .suffix(".txt")
            .tempfile()?;
        input.write_all(content.as_bytes())?;
        input.flush()?;

        if let Some(account) = account {
            self.warm_up(account);
        }

        let output = self
            .command(account)
            .arg("inject")
            .arg("-i")
            .arg(input.path())
            .stdin(Stdio::null())
            .output()
            .map_err(|e| RunError::Resolve(format!("failed to spawn op: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RunError::Resolve(format!("op inject failed: {}", stderr.trim())).into());
        }

        String::from_utf8(output.stdout)
            .map_err(|e| RunError::Resolve(format!("op inject returned invalid UTF-8: {}", e)).into())
    }

    fn read(&self, reference: &str, account: Option<&str>) -> Result<String> {
        self.check_op()?;

        let output = self
            .command(account)
            .args(["read", reference])
            .stdin(Stdio::null())
            .output()
            .map_err(|e| RunError::Resolve(format!("failed to spawn op: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RunError::Resolve(format!("op read failed: {}", stderr.trim())).into());
        }

        let value = String::from_utf8(output.stdout)
            .map_err(|e| RunError::Resolve(format!("op read returned invalid UTF-8: {}", e)))?;
        Ok(chomp(&value).to_string())
    }

    fn is_reference(&self, value: &str) -> bool {
        value.starts_with(REFERENCE_SCHEME)
    }

    fn launcher(
        &self,
        env_file: &Path,
        account: Option<&str>,
        argv: &[String],
    ) -> Result<Command> {
        if argv.is_empty() {
            return Err(RunError::EmptyCommand.into());
        }
        self.check_op()?;

        let mut cmd = self.command(account);
        cmd.args(["run", "--no-masking", "--env-file"])
            .arg(env_file)
            .arg("--")
            .args(argv);
        Ok(cmd)
    }
}

/// Strip one trailing line ending.
fn chomp(value: &str) -> &str {
    value
        .strip_suffix("\r\n")
        .or_else(|| value.strip_suffix('\n'))
        .unwrap_or(value)
}
