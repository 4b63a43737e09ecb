//! Settings file and environment overrides.

use predicates::prelude::*;

use crate::support::*;

#[test]
fn test_unknown_resolver_override() {
    let t = Test::new();
    t.cmd()
        .env("CFG_RESOLVER", "vault")
        .arg("list")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("unknown resolver 'vault'"));
}

#[test]
fn test_malformed_settings_file() {
    let t = Test::new();
    t.write_settings("store_dir = [\n");
    t.cmd()
        .arg("list")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("failed to parse config file"));
}

#[test]
fn test_valid_settings_file_is_accepted() {
    let t = Test::new();
    t.write_settings("resolver = \"none\"\nop_binary = \"/opt/op/bin/op\"\n");

    // Settings load; the failure comes from the missing agent.
    t.cmd()
        .arg("list")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("no ed25519 keys"));
}
