//! Materializes profiles and runs commands with them.
//!
//! `run_command` moves through: writing outputs, running the child, cleaning
//! up. File outputs are written through a [`WrittenFiles`] guard, so every
//! path it recorded is removed on normal return, on error, and when SIGINT or
//! SIGTERM arrives while the child runs. Signals are observed with
//! `tokio::signal`; nothing runs inside an OS signal handler. Off unix only
//! Ctrl-C is observed.
//!
//! Template bodies are bytes. Text bodies go through the resolver; other
//! bodies are written as stored.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};

use tracing::{debug, info, warn};

use crate::core::domain::{Env, Output, Profile};
use crate::core::paths;
use crate::core::profiles::Profiles;
use crate::core::resolve::Resolver;
use crate::error::{Result, RunError, StoreError};

/// Exit status reported after SIGINT.
pub const EXIT_INTERRUPTED: i32 = 128 + 2;

/// Exit status reported after SIGTERM.
pub const EXIT_TERMINATED: i32 = 128 + 15;

/// Paths written for one run, removed exactly once.
#[derive(Debug, Default)]
pub struct WrittenFiles {
    paths: Vec<PathBuf>,
}

impl WrittenFiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create `path` with `content`, recording it for cleanup.
    ///
    /// Parent directories are created. An existing entry at `path` is never
    /// replaced.
    ///
    /// # Errors
    ///
    /// Returns `RunError::FileExists` if something already exists at `path`.
    pub fn write(&mut self, path: &Path, content: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::WriteFailed {
                path: parent.display().to_string(),
                source,
            })?;
        }

        match write_private(path, content, false) {
            Ok(()) => {
                debug!(path = %path.display(), len = content.len(), "wrote output");
                self.paths.push(path.to_path_buf());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(RunError::FileExists(path.display().to_string()).into())
            }
            Err(source) => Err(StoreError::WriteFailed {
                path: path.display().to_string(),
                source,
            }
            .into()),
        }
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Remove every recorded path. Later calls do nothing.
    pub fn cleanup(&mut self) {
        for path in self.paths.drain(..) {
            match std::fs::remove_file(&path) {
                Ok(()) => debug!(path = %path.display(), "removed output"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %path.display(), error = %e, "failed to remove output"),
            }
        }
    }
}

impl Drop for WrittenFiles {
    fn drop(&mut self) {
        self.cleanup();
    }
}

/// Termination signals observed during a run.
#[cfg(unix)]
struct Signals {
    interrupt: tokio::signal::unix::Signal,
    terminate: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl Signals {
    fn listen() -> std::io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};
        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    /// Exit status for the next signal received.
    async fn recv(&mut self) -> i32 {
        tokio::select! {
            _ = self.interrupt.recv() => EXIT_INTERRUPTED,
            _ = self.terminate.recv() => EXIT_TERMINATED,
        }
    }
}

#[cfg(not(unix))]
struct Signals;

#[cfg(not(unix))]
impl Signals {
    fn listen() -> std::io::Result<Self> {
        Ok(Self)
    }

    async fn recv(&mut self) -> i32 {
        match tokio::signal::ctrl_c().await {
            Ok(()) => EXIT_INTERRUPTED,
            Err(_) => std::future::pending().await,
        }
    }
}

/// Runs commands and exports content for profiles.
pub struct Runner<'a> {
    profiles: &'a mut Profiles,
    resolver: &'a dyn Resolver,
    home: PathBuf,
}

impl<'a> Runner<'a> {
    /// Runner expanding `~/` against the user's home directory.
    ///
    /// # Errors
    ///
    /// Returns error if the home directory cannot be determined.
    pub fn new(profiles: &'a mut Profiles, resolver: &'a dyn Resolver) -> Result<Self> {
        let home = paths::home_dir()?;
        Ok(Self::with_home(profiles, resolver, home))
    }

    pub fn with_home(
        profiles: &'a mut Profiles,
        resolver: &'a dyn Resolver,
        home: impl Into<PathBuf>,
    ) -> Self {
        Self {
            profiles,
            resolver,
            home: home.into(),
        }
    }

    /// Write the profile's files, run `argv`, clean up, and return the
    /// child's exit status.
    ///
    /// With an env output the command goes through the resolver's launcher;
    /// otherwise it is spawned directly. Standard streams are inherited.
    ///
    /// # Errors
    ///
    /// Returns `RunError::FileExists` before writing anything if a target
    /// already exists, `RunError::EmptyCommand` for an empty `argv`, and
    /// resolver or launch failures.
    pub fn run_command(&mut self, profile: &Profile, argv: &[String]) -> Result<i32> {
        if argv.is_empty() {
            return Err(RunError::EmptyCommand.into());
        }

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        runtime.block_on(self.run_with_signals(profile, argv))
    }

    async fn run_with_signals(&mut self, profile: &Profile, argv: &[String]) -> Result<i32> {
        let mut signals = Signals::listen()?;
        let mut written = WrittenFiles::new();

        let targets = self.file_targets(profile);
        if let Some((path, _)) = targets.iter().find(|(path, _)| path.symlink_metadata().is_ok()) {
            return Err(RunError::FileExists(path.display().to_string()).into());
        }

        for (path, output) in &targets {
            let content = self.resolve_template(profile, output)?;
            written.write(path, &content)?;
        }

        let (command, _env_file) = self.build_command(profile, argv)?;

        // A signal delivered while outputs were written is handled now.
        tokio::select! {
            biased;
            code = signals.recv() => return Ok(code),
            _ = std::future::ready(()) => {}
        }

        let mut child = tokio::process::Command::from(command)
            .spawn()
            .map_err(|e| RunError::Launch {
                program: argv[0].clone(),
                reason: e.to_string(),
            })?;
        info!(profile = %profile.name, program = %argv[0], files = written.paths().len(), "child started");

        let code = tokio::select! {
            status = child.wait() => exit_code(status?),
            code = signals.recv() => {
                info!(code, "signal received, cleaning up");
                code
            }
        };

        written.cleanup();
        debug!(code, "run finished");
        Ok(code)
    }

    /// The command to spawn, plus the env file it reads (kept alive until
    /// the child exits).
    fn build_command(
        &mut self,
        profile: &Profile,
        argv: &[String],
    ) -> Result<(std::process::Command, Option<tempfile::NamedTempFile>)> {
        let (mut command, env_file) = match profile.env_output() {
            Some(output) => {
                let content = self.profiles.get_output_text(profile, output)?;
                let env_file = write_env_file(&content)?;
                let command =
                    self.resolver
                        .launcher(env_file.path(), profile.account.as_deref(), argv)?;
                debug!(resolver = self.resolver.name(), "running through launcher");
                (command, Some(env_file))
            }
            None => {
                let mut command = std::process::Command::new(&argv[0]);
                command.args(&argv[1..]);
                (command, None)
            }
        };

        command
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        Ok((command, env_file))
    }

    /// Resolved `export KEY='value'` lines for the profile's env output.
    ///
    /// Only values the resolver recognizes as references are resolved, one
    /// call each. Empty when the profile has no env output.
    pub fn export_env(&mut self, profile: &Profile) -> Result<String> {
        let Some(output) = profile.env_output() else {
            return Ok(String::new());
        };

        let content = self.profiles.get_output_text(profile, output)?;
        let account = profile.account.as_deref();

        let env = Env::parse(&content);
        if env.is_empty() {
            return Ok(String::new());
        }

        let mut resolved = Vec::with_capacity(env.len());
        for (key, value) in env.entries() {
            let value = if self.resolver.is_reference(value) {
                self.resolver.read(value, account)?
            } else {
                value.clone()
            };
            resolved.push((key.clone(), value));
        }

        debug!(profile = %profile.name, vars = resolved.len(), "exported env");
        Ok(Env::from_pairs(resolved).to_exports())
    }

    /// Resolved content of the file output for `target`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::TemplateNotFound` if no file output has that
    /// target.
    pub fn export_file(&mut self, profile: &Profile, target: &str) -> Result<Vec<u8>> {
        let output = profile
            .file_output(target)
            .ok_or_else(|| StoreError::TemplateNotFound(format!("no file output for {}", target)))?
            .clone();
        self.resolve_template(profile, &output)
    }

    /// Write every file output under `base_dir` and return the written paths
    /// in output order.
    ///
    /// `~/` targets land at `base_dir/<rest>`; absolute targets lose their
    /// leading `/`. Existing files are overwritten.
    pub fn export_all_files(&mut self, profile: &Profile, base_dir: &Path) -> Result<Vec<PathBuf>> {
        let outputs: Vec<Output> = profile.file_outputs().cloned().collect();
        let mut written = Vec::with_capacity(outputs.len());

        for output in &outputs {
            let Some(target) = output.target.as_deref() else {
                continue;
            };
            let dest = base_dir.join(paths::relative_target(target));
            let content = self.resolve_template(profile, output)?;

            if let Some(parent) = dest.parent() {
                std::fs::create_dir_all(parent)?;
            }
            write_private(&dest, &content, true).map_err(|source| {
                StoreError::WriteFailed {
                    path: dest.display().to_string(),
                    source,
                }
            })?;
            debug!(target, dest = %dest.display(), "exported file");
            written.push(dest);
        }

        Ok(written)
    }

    fn resolve_template(&mut self, profile: &Profile, output: &Output) -> Result<Vec<u8>> {
        let content = self.profiles.get_output_content(profile, output)?;
        match String::from_utf8(content) {
            Ok(text) => Ok(self
                .resolver
                .inject(&text, profile.account.as_deref())?
                .into_bytes()),
            Err(binary) => {
                debug!(template = %output.template, "binary template, not resolved");
                Ok(binary.into_bytes())
            }
        }
    }

    /// Expanded target paths of the file outputs, in order.
    fn file_targets(&self, profile: &Profile) -> Vec<(PathBuf, Output)> {
        profile
            .file_outputs()
            .filter_map(|o| {
                o.target
                    .as_deref()
                    .map(|t| (paths::expand_with(t, &self.home), o.clone()))
            })
            .collect()
    }
}

fn write_env_file(content: &str) -> Result<tempfile::NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .prefix("cfg-env")
        .suffix(".env")
        .tempfile()?;
    file.write_all(content.as_bytes())?;
    file.flush()?;
    Ok(file)
}

/// Write `content` with owner-only permissions.
fn write_private(path: &Path, content: &[u8], overwrite: bool) -> std::io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true);
    if overwrite {
        options.create(true).truncate(true);
    } else {
        options.create_new(true);
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;
    file.write_all(content)?;
    file.flush()
}

/// Child exit code, or 128 + signal number if it was killed.
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::agent::testing::{key, KEY_A};
    use crate::core::profiles::tests::setup;
    use crate::core::resolve::Passthrough;
    use crate::error::Error;
    use tempfile::TempDir;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_written_files_cleanup_once() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested/dir/out.conf");

        let mut written = WrittenFiles::new();
        written.write(&path, b"data").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "data");
        assert_eq!(written.paths(), &[path.clone()]);

        written.cleanup();
        assert!(!path.exists());
        assert!(written.paths().is_empty());

        // Recreated by someone else: a second cleanup must not touch it.
        std::fs::write(&path, "user").unwrap();
        written.cleanup();
        drop(written);
        assert!(path.exists());
    }

    #[test]
    fn test_written_files_cleanup_on_drop() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("out");
        {
            let mut written = WrittenFiles::new();
            written.write(&path, b"x").unwrap();
        }
        assert!(!path.exists());
    }

    #[test]
    fn test_written_files_refuses_existing() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("existing");
        std::fs::write(&path, "mine").unwrap();

        let mut written = WrittenFiles::new();
        let err = written.write(&path, b"theirs").unwrap_err();
        assert!(matches!(err, Error::Run(RunError::FileExists(_))));
        drop(written);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "mine");
    }

    #[cfg(unix)]
    #[test]
    fn test_written_files_are_private() {
        use std::os::unix::fs::PermissionsExt;
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("secret");
        let mut written = WrittenFiles::new();
        written.write(&path, b"x").unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_run_writes_files_and_cleans_up() {
        let (tmp, mut profiles) = setup(&[KEY_A]);
        let home = tmp.path().join("home");
        let p = profiles.create_profile("alpha", None, None, &key(KEY_A)).unwrap();
        let p = profiles.add_file_template(&p, "~/.config/app.conf", "hello").unwrap();

        let target = home.join(".config/app.conf");
        let script = format!(
            "test \"$(cat '{}')\" = hello && exit 3",
            target.display()
        );

        let mut runner = Runner::with_home(&mut profiles, &Passthrough, &home);
        let code = runner.run_command(&p, &argv(&["sh", "-c", &script])).unwrap();

        assert_eq!(code, 3);
        assert!(!target.exists());
    }

    #[test]
    fn test_run_refuses_existing_target_without_writing() {
        let (tmp, mut profiles) = setup(&[KEY_A]);
        let home = tmp.path().join("home");
        let p = profiles.create_profile("alpha", None, None, &key(KEY_A)).unwrap();
        let p = profiles.add_file_template(&p, "~/.first", "1").unwrap();
        let p = profiles.add_file_template(&p, "~/.second", "2").unwrap();

        std::fs::create_dir_all(&home).unwrap();
        std::fs::write(home.join(".second"), "user data").unwrap();

        let mut runner = Runner::with_home(&mut profiles, &Passthrough, &home);
        let err = runner.run_command(&p, &argv(&["true"])).unwrap_err();

        assert!(matches!(err, Error::Run(RunError::FileExists(_))));
        assert!(!home.join(".first").exists());
        assert_eq!(
            std::fs::read_to_string(home.join(".second")).unwrap(),
            "user data"
        );
    }

    #[test]
    fn test_run_with_env_output() {
        let (tmp, mut profiles) = setup(&[KEY_A]);
        let p = profiles.create_profile("alpha", None, None, &key(KEY_A)).unwrap();
        let p = profiles
            .add_env_template(&p, "# comment\nGREETING=\"hello world\"\n")
            .unwrap();

        let mut runner = Runner::with_home(&mut profiles, &Passthrough, tmp.path());
        let ok = runner
            .run_command(&p, &argv(&["sh", "-c", "test \"$GREETING\" = 'hello world'"]))
            .unwrap();
        assert_eq!(ok, 0);
    }

    #[test]
    fn test_run_empty_command() {
        let (tmp, mut profiles) = setup(&[KEY_A]);
        let p = profiles.create_profile("alpha", None, None, &key(KEY_A)).unwrap();
        let mut runner = Runner::with_home(&mut profiles, &Passthrough, tmp.path());
        let err = runner.run_command(&p, &[]).unwrap_err();
        assert!(matches!(err, Error::Run(RunError::EmptyCommand)));
    }

    #[test]
    fn test_run_missing_program_cleans_up() {
        let (tmp, mut profiles) = setup(&[KEY_A]);
        let home = tmp.path().join("home");
        let p = profiles.create_profile("alpha", None, None, &key(KEY_A)).unwrap();
        let p = profiles.add_file_template(&p, "~/.rc", "x").unwrap();

        let mut runner = Runner::with_home(&mut profiles, &Passthrough, &home);
        let err = runner
            .run_command(&p, &argv(&["cfg-test-no-such-program"]))
            .unwrap_err();
        assert!(matches!(err, Error::Run(RunError::Launch { .. })));
        assert!(!home.join(".rc").exists());
    }

    #[test]
    fn test_export_env() {
        let (tmp, mut profiles) = setup(&[KEY_A]);
        let p = profiles.create_profile("alpha", None, None, &key(KEY_A)).unwrap();

        let mut runner = Runner::with_home(&mut profiles, &Passthrough, tmp.path());
        assert_eq!(runner.export_env(&p).unwrap(), "");

        let p = profiles
            .add_env_template(&p, "\n# tokens\nB=2\nA='single quoted'\nQ=it's\nREF=op://v/i/f\n")
            .unwrap();
        let mut runner = Runner::with_home(&mut profiles, &Passthrough, tmp.path());
        assert_eq!(
            runner.export_env(&p).unwrap(),
            "export B='2'\nexport A='single quoted'\nexport Q='it'\\''s'\nexport REF='op://v/i/f'"
        );
    }

    #[test]
    fn test_export_file() {
        let (tmp, mut profiles) = setup(&[KEY_A]);
        let p = profiles.create_profile("alpha", None, None, &key(KEY_A)).unwrap();
        let p = profiles.add_file_template(&p, "~/.npmrc", "npm").unwrap();

        let mut runner = Runner::with_home(&mut profiles, &Passthrough, tmp.path());
        assert_eq!(runner.export_file(&p, "~/.npmrc").unwrap(), b"npm");

        let err = runner.export_file(&p, "~/.other").unwrap_err();
        assert!(matches!(err, Error::Store(StoreError::TemplateNotFound(_))));
    }

    #[test]
    fn test_export_all_files() {
        let (tmp, mut profiles) = setup(&[KEY_A]);
        let base = tmp.path().join("export");
        let p = profiles.create_profile("alpha", None, None, &key(KEY_A)).unwrap();
        let p = profiles.add_file_template(&p, "~/.aws/config", "aws").unwrap();
        let p = profiles.add_file_template(&p, "/etc/app.conf", "app").unwrap();
        let p = profiles.add_env_template(&p, "E=1").unwrap();

        let mut runner = Runner::with_home(&mut profiles, &Passthrough, tmp.path());
        let written = runner.export_all_files(&p, &base).unwrap();

        assert_eq!(written, vec![base.join(".aws/config"), base.join("etc/app.conf")]);
        assert_eq!(std::fs::read_to_string(&written[0]).unwrap(), "aws");
        assert_eq!(std::fs::read_to_string(&written[1]).unwrap(), "app");

        // Overwrites on a second export
        let again = runner.export_all_files(&p, &base).unwrap();
        assert_eq!(again, written);
    }

    #[test]
    fn test_exit_code() {
        let status = std::process::Command::new("sh")
            .args(["-c", "exit 7"])
            .status()
            .unwrap();
        assert_eq!(exit_code(status), 7);
    }

    #[test]
    fn test_binary_template_written_verbatim() {
        let (tmp, mut profiles) = setup(&[KEY_A]);
        let body = [0x30u8, 0x82, 0xff, 0xfe, 0x00, 0x01];
        let p = profiles.create_profile("alpha", None, None, &key(KEY_A)).unwrap();
        let p = profiles.add_file_template(&p, "~/.keystore.p12", body).unwrap();

        let base = tmp.path().join("export");
        let mut runner = Runner::with_home(&mut profiles, &Passthrough, tmp.path());
        assert_eq!(runner.export_file(&p, "~/.keystore.p12").unwrap(), body);

        let written = runner.export_all_files(&p, &base).unwrap();
        assert_eq!(std::fs::read(&written[0]).unwrap(), body);
    }
}
