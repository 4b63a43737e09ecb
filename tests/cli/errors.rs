//! Failure paths of `cfg` without a usable agent.

use predicates::prelude::*;

use crate::support::*;

#[test]
fn test_list_without_agent_explains_and_hints() {
    let t = Test::new();
    t.cmd()
        .arg("list")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("no ed25519 keys found in ssh agent"))
        .stderr(predicate::str::contains("ssh-add"));
}

#[test]
fn test_keys_without_agent_fails() {
    let t = Test::new();
    let output = t.run(&["keys"]);
    assert_exit_code(&output, 1);
    assert_stderr_contains(&output, "no ed25519 keys");
}

#[test]
fn test_add_without_agent_writes_nothing() {
    let t = Test::new();
    let output = t.run(&["add", "work", "--description", "Work laptop"]);
    assert_exit_code(&output, 1);
    assert!(!t.store_dir().join("index.yaml").exists());
}

#[test]
fn test_has_profiles_is_quiet_without_agent() {
    let t = Test::new();
    let output = t.run(&["has-profiles", "wo"]);
    assert_exit_code(&output, 1);
    assert!(stdout(&output).is_empty());
    assert!(stderr(&output).is_empty());
}

#[test]
fn test_run_requires_command() {
    let t = Test::new();
    t.cmd().args(["run", "work"]).assert().code(2);
}

#[test]
fn test_export_file_target_conflicts_with_base_dir() {
    let t = Test::new();
    t.cmd()
        .args(["export-file", "work", "~/.npmrc", "--base-dir", "out"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn test_unknown_kind_is_rejected() {
    let t = Test::new();
    t.cmd()
        .args(["show", "work", "secret"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn test_profile_shorthand_reaches_the_store() {
    let t = Test::new();
    for args in [
        &["work", "npm", "publish"][..],
        &["work", "--export-env"],
        &["work", "--export-file", "--base-dir", "out"],
    ] {
        let output = t.run(args);
        assert_exit_code(&output, 1);
        assert_stderr_contains(&output, "no ed25519 keys");
    }
}

#[test]
fn test_profile_shorthand_without_command_prints_usage() {
    let t = Test::new();
    let output = t.run(&["work"]);
    assert_exit_code(&output, 1);
    assert_stderr_contains(&output, "usage: cfg <profile>");
}

#[test]
fn test_has_profiles_flag_form() {
    let t = Test::new();
    let output = t.run(&["--has-profiles", "wo"]);
    assert_exit_code(&output, 1);
    assert!(stdout(&output).is_empty());
}
