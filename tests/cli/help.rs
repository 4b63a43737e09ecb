//! Help, version and completions.

use predicates::prelude::*;

use crate::support::*;

#[test]
fn test_help_lists_commands() {
    let t = Test::new();
    let output = t.run(&["--help"]);
    assert_success(&output);

    let out = stdout(&output);
    for command in [
        "list",
        "add",
        "import",
        "show",
        "edit",
        "delete",
        "rotate-key",
        "run",
        "export-env",
        "export-file",
        "select",
        "has-profiles",
        "check",
        "completions",
    ] {
        assert!(out.contains(command), "help missing '{}':\n{}", command, out);
    }
}

#[test]
fn test_version() {
    let t = Test::new();
    t.cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("cfg "));
}

#[test]
fn test_completions_for_each_shell() {
    let t = Test::new();
    for shell in ["bash", "zsh", "fish", "power-shell"] {
        t.cmd()
            .args(["completions", shell])
            .assert()
            .success()
            .stdout(predicate::str::contains("cfg"));
    }
}

#[test]
fn test_completions_rejects_unknown_shell() {
    let t = Test::new();
    t.cmd().args(["completions", "tcsh"]).assert().code(2);
}
