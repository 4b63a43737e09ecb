//! cfg - encrypted config files and env templates, unlocked by your SSH agent.

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cfg_vault::cli::output;
use cfg_vault::cli::{execute, Cli};
use cfg_vault::error::{AgentError, Error, ProfileError, RunError};

fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_env("CFG_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("cfg_vault=debug")
        } else {
            EnvFilter::new("cfg_vault=warn")
        }
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false).without_time())
        .init();

    if let Err(e) = cli.into_command().and_then(execute) {
        let suggestion = match &e {
            Error::Agent(AgentError::NoUsableKeys) => {
                Some("add an ed25519 key: ssh-add ~/.ssh/id_ed25519")
            }
            Error::Agent(AgentError::KeyNotFound(_)) => Some("run: cfg keys"),
            Error::Profile(ProfileError::NotFound(_)) => Some("run: cfg list"),
            Error::Run(RunError::FileExists(_)) => {
                Some("move the existing file away and retry")
            }
            Error::Run(RunError::Launch { .. }) => {
                Some("install the 1Password CLI or set CFG_RESOLVER=none")
            }
            _ => None,
        };

        output::error(&e.to_string());
        if let Some(hint) = suggestion {
            output::hint(hint);
        }
        std::process::exit(1);
    }
}
