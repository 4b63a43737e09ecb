//! Command helper methods for Test.

use super::Test;
use assert_cmd::Command;
use std::process::Output;

impl Test {
    /// Create a `cfg` command isolated from the user's environment.
    ///
    /// - HOME and XDG_CONFIG_HOME point into the temp home
    /// - CFG_STORE_DIR points at the temp store
    /// - SSH_AUTH_SOCK is removed, so no agent keys are visible
    pub fn cmd(&self) -> Command {
        #[allow(deprecated)]
        let mut cmd = Command::cargo_bin("cfg").expect("failed to find cfg binary");
        cmd.env("HOME", self.home.path())
            .env("XDG_CONFIG_HOME", self.home.path().join(".config"))
            .env("CFG_STORE_DIR", self.store_dir())
            .env("CFG_RESOLVER", "none")
            .env("NO_COLOR", "1")
            .env_remove("CFG_LOG")
            .env_remove("SSH_AUTH_SOCK")
            .current_dir(self.home.path());
        cmd
    }

    /// Run `cfg` with `args`.
    pub fn run(&self, args: &[&str]) -> Output {
        self.cmd()
            .args(args)
            .output()
            .expect("failed to run cfg")
    }

    /// Write a settings file into the temp config dir.
    pub fn write_settings(&self, toml: &str) {
        let dir = self.home.path().join(".config").join("cfg");
        std::fs::create_dir_all(&dir).expect("failed to create config dir");
        std::fs::write(dir.join("config.toml"), toml).expect("failed to write settings");
    }
}
