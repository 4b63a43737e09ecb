//! Resolver that leaves content untouched.
//!
//! Useful for templates without secret references and for machines without
//! a secret manager. The launcher sets the dotenv file's values directly.

use std::path::Path;
use std::process::Command;

use super::Resolver;
use crate::core::domain::Env;
use crate::error::{Result, RunError};

/// No-op resolver.
#[derive(Debug, Default, Clone, Copy)]
pub struct Passthrough;

impl Resolver for Passthrough {
    fn name(&self) -> &'static str {
        "none"
    }

    fn inject(&self, content: &str, _account: Option<&str>) -> Result<String> {
        Ok(content.to_string())
    }

    fn read(&self, reference: &str, _account: Option<&str>) -> Result<String> {
        Ok(reference.to_string())
    }

    fn is_reference(&self, _value: &str) -> bool {
        false
    }

    fn launcher(
        &self,
        env_file: &Path,
        _account: Option<&str>,
        argv: &[String],
    ) -> Result<Command> {
        let (program, args) = argv.split_first().ok_or(RunError::EmptyCommand)?;
        let env = Env::load(env_file)?;

        let mut cmd = Command::new(program);
        cmd.args(args)
            .envs(env.entries().iter().map(|(k, v)| (k.as_str(), v.as_str())));
        Ok(cmd)
    }
}
