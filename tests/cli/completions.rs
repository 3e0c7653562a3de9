//! Tests for `vaultcache completions`.

use crate::support::*;

#[test]
fn test_completions_bash() {
    let t = Test::new();
    let output = t.cmd().args(["completions", "bash"]).output().unwrap();
    assert_success(&output);
    assert_stdout_contains(&output, "vaultcache");
    assert_stdout_contains(&output, "refresh");
}

#[test]
fn test_completions_need_no_config() {
    let t = Test::new();
    for shell in ["zsh", "fish", "power-shell"] {
        let output = t.cmd().args(["completions", shell]).output().unwrap();
        assert_success(&output);
    }
}

#[test]
fn test_version_flag() {
    use predicates::prelude::*;

    Test::new()
        .cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("vaultcache "));
}
