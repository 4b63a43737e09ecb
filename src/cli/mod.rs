//! Command-line interface.

pub mod check;
pub mod completions;
pub mod export;
pub mod output;
pub mod profile;
pub mod rotate;
pub mod run;
pub mod select;

use clap::{Parser, Subcommand, ValueEnum};

use crate::core::config::Settings;
use crate::core::profiles::Profiles;
use crate::error::{Error, Result};

/// cfg - encrypted config files and env templates, unlocked by your SSH agent.
#[derive(Parser)]
#[command(
    name = "cfg",
    about = "Encrypted config files and env templates, unlocked by your SSH agent",
    after_help = "Shorthand: cfg <profile> <cmd...> | --export-env | --export-file [<target>] [--base-dir <dir>]",
    version,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Enable debug logging (CFG_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Same as `cfg select`
    #[arg(long, value_name = "PREFIX", num_args = 0..=1, hide = true)]
    pub select: Option<Option<String>>,

    /// Same as `cfg has-profiles`
    #[arg(long, value_name = "PREFIX", hide = true, conflicts_with = "select")]
    pub has_profiles: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// The command to execute, with the flag forms mapped onto subcommands.
    ///
    /// # Errors
    ///
    /// Returns an error when no command was given.
    pub fn into_command(self) -> Result<Command> {
        if let Some(prefix) = self.has_profiles {
            return Ok(Command::HasProfiles { prefix });
        }
        if let Some(prefix) = self.select {
            return Ok(Command::Select { prefix });
        }
        self.command
            .ok_or_else(|| Error::Other("no command given; run: cfg --help".to_string()))
    }
}

/// Top-level commands.
#[derive(Subcommand)]
pub enum Command {
    /// List available profiles
    #[command(alias = "ls")]
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List usable SSH agent keys
    Keys,

    /// Create a new profile
    Add {
        /// Profile name
        name: String,
        /// Profile description
        #[arg(short, long)]
        description: Option<String>,
        /// 1Password account used to resolve references
        #[arg(short, long)]
        account: Option<String>,
        /// Key suffix to store the profile under
        #[arg(short, long)]
        key: Option<String>,
    },

    /// Import a local file as a file template
    Import {
        /// Profile name or prefix
        profile: String,
        /// File to import
        file: String,
        /// Target path (default: the source path, home as ~)
        #[arg(short, long)]
        target: Option<String>,
    },

    /// Show a profile or one of its templates
    Show {
        /// Profile name or prefix
        profile: String,
        /// Template kind
        #[arg(value_enum)]
        kind: Option<Kind>,
        /// File target (skips the picker)
        #[arg(long)]
        target: Option<String>,
    },

    /// Edit a profile's metadata or one of its templates
    Edit {
        /// Profile name or prefix
        profile: String,
        /// Template kind
        #[arg(value_enum)]
        kind: Option<Kind>,
        /// File target (skips the picker; creates a template if new)
        #[arg(long)]
        target: Option<String>,
    },

    /// Delete a profile or one of its templates
    #[command(alias = "rm")]
    Delete {
        /// Profile name or prefix
        profile: String,
        /// Template kind
        #[arg(value_enum)]
        kind: Option<Kind>,
        /// File target (skips the picker)
        #[arg(long)]
        target: Option<String>,
    },

    /// Re-encrypt everything stored under one key with another
    RotateKey {
        /// Suffix of the current key
        old: String,
        /// Suffix of the new key
        new: String,
    },

    /// Run a command with a profile applied
    Run {
        /// Profile name or prefix
        profile: String,
        /// Command and arguments to run
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
        command: Vec<String>,
    },

    /// Print resolved env exports
    ExportEnv {
        /// Profile name or prefix
        profile: String,
    },

    /// Print one resolved file, or write all of them under a directory
    ExportFile {
        /// Profile name or prefix
        profile: String,
        /// File target to print
        target: Option<String>,
        /// Write every file output under this directory
        #[arg(long, conflicts_with = "target")]
        base_dir: Option<String>,
    },

    /// Pick a profile and print its name
    Select {
        /// Name prefix
        prefix: Option<String>,
    },

    /// Exit 0 if any profile name starts with the prefix, 1 otherwise
    HasProfiles {
        /// Name prefix
        prefix: String,
    },

    /// Check the store for orphaned and missing templates
    Check {
        /// Delete orphaned templates
        #[arg(long)]
        prune: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },

    /// `cfg <profile> ...`
    #[command(external_subcommand)]
    Shorthand(Vec<String>),
}

const SHORTHAND_USAGE: &str =
    "usage: cfg <profile> [--export-env | --export-file [<target>] [--base-dir <dir>] | <cmd...>]";

/// Map `cfg <profile> ...` onto `run`, `export-env` or `export-file`.
///
/// Options are only recognized directly after the profile, so the child
/// command keeps its own arguments.
fn shorthand(mut args: Vec<String>) -> Result<Command> {
    let usage = || Error::Other(SHORTHAND_USAGE.to_string());
    if args.is_empty() {
        return Err(usage());
    }
    let profile = args.remove(0);
    let option = args.first().cloned();

    match option.as_deref() {
        None => Err(usage()),
        Some("--export-env") if args.len() == 1 => Ok(Command::ExportEnv { profile }),
        Some("--export-env") => Err(usage()),
        Some("--export-file") => {
            let mut target = None;
            let mut base_dir = None;
            let mut rest = args.into_iter().skip(1);
            while let Some(arg) = rest.next() {
                if arg == "--base-dir" {
                    base_dir = Some(rest.next().ok_or_else(usage)?);
                } else if target.is_none() {
                    target = Some(arg);
                } else {
                    return Err(usage());
                }
            }
            if target.is_some() && base_dir.is_some() {
                return Err(usage());
            }
            Ok(Command::ExportFile {
                profile,
                target,
                base_dir,
            })
        }
        Some(_) => Ok(Command::Run {
            profile,
            command: args,
        }),
    }
}

/// Template kind argument.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Kind {
    File,
    Env,
}

/// Supported shells for completions.
#[derive(ValueEnum, Clone, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

/// Load settings and open the configured store.
pub(crate) fn open() -> Result<(Settings, Profiles)> {
    let settings = Settings::load()?;
    let profiles = Profiles::open(&settings)?;
    Ok((settings, profiles))
}

/// Execute a command.
pub fn execute(command: Command) -> Result<()> {
    use Command::*;

    match command {
        List { json } => profile::list(json),
        Keys => profile::keys(),
        Add {
            name,
            description,
            account,
            key,
        } => profile::add(&name, description.as_deref(), account.as_deref(), key.as_deref()),
        Import {
            profile: name,
            file,
            target,
        } => profile::import(&name, &file, target.as_deref()),
        Show {
            profile: name,
            kind,
            target,
        } => profile::show(&name, kind, target.as_deref()),
        Edit {
            profile: name,
            kind,
            target,
        } => profile::edit(&name, kind, target.as_deref()),
        Delete {
            profile: name,
            kind,
            target,
        } => profile::delete(&name, kind, target.as_deref()),
        RotateKey { old, new } => rotate::execute(&old, &new),
        Run { profile, command } => run::execute(&profile, &command),
        ExportEnv { profile } => export::env(&profile),
        ExportFile {
            profile,
            target,
            base_dir,
        } => export::file(&profile, target.as_deref(), base_dir.as_deref()),
        Select { prefix } => profile::select(prefix.as_deref()),
        HasProfiles { prefix } => profile::has_profiles(&prefix),
        Check { prune } => check::execute(prune),
        Completions { shell } => completions::execute(shell),
        Shorthand(args) => execute(shorthand(args)?),
    }
}
