//! Error reporting and exit codes.

use crate::support::*;

#[test]
fn test_get_missing_key() {
    let t = Test::with_secrets(&[("K", "v")]);

    let output = t.get("NOPE");
    assert_failure(&output);
    assert_stderr_contains(&output, "secret not found: NOPE");
    assert_stderr_contains(&output, "vaultcache list");
}

#[test]
fn test_refresh_without_document_fails() {
    let t = Test::init();

    let output = t.refresh();
    assert_failure(&output);
    assert_stderr_contains(&output, "no secrets document");
    assert!(!t.cache_path().exists());
}

#[test]
fn test_malformed_document_fails() {
    let t = Test::init();
    std::fs::write(t.secrets_path(), "list = [1, 2]\n").unwrap();

    let output = t.refresh();
    assert_failure(&output);
    assert_stderr_contains(&output, "malformed response");
}

#[test]
fn test_missing_config_file() {
    let t = Test::new();

    let output = t.cmd().args(["--config", "absent.toml", "status"]).output().unwrap();
    assert_failure(&output);
    assert_stderr_contains(&output, "config file not found");
    assert_stderr_contains(&output, "--config");
}

#[test]
fn test_invalid_config_value() {
    let t = Test::new();
    t.write_config("[cache]\nttl_secs = 0\nmirror_enabled = false\n");

    let output = t.status();
    assert_failure(&output);
    assert_stderr_contains(&output, "cache.ttl_secs");
}

#[test]
fn test_unparseable_config() {
    let t = Test::new();
    t.write_config("[cache\n");

    let output = t.status();
    assert_failure(&output);
    assert_stderr_contains(&output, "failed to parse config");
}

#[test]
fn test_refresh_interval_env_must_be_numeric() {
    let t = Test::init();

    let output = t
        .cmd()
        .env("VAULTCACHE_REFRESH_INTERVAL", "soon")
        .arg("status")
        .output()
        .unwrap();
    assert_failure(&output);
    assert_stderr_contains(&output, "VAULTCACHE_REFRESH_INTERVAL");
}
