//! Tests for `vaultcache status` and `vaultcache clear`.

use crate::support::*;

#[test]
fn test_status_empty() {
    let t = Test::init();

    let output = t.status();
    assert_success(&output);
    assert_stdout_contains(&output, "empty");
    assert_stdout_contains(&output, "no snapshot cached");
}

#[test]
fn test_status_does_not_contact_source() {
    // No secrets document: any fetch would fail.
    let t = Test::init();

    assert_success(&t.status());
    assert_success(&t.status_json());
}

#[test]
fn test_status_after_refresh() {
    let t = Test::with_secrets(STANDARD_SECRETS);
    assert_success(&t.refresh());

    let output = t.status();
    assert_success(&output);
    assert_stdout_contains(&output, "valid");
    assert_stdout_contains(&output, "5 keys");
}

#[test]
fn test_status_json() {
    let t = Test::with_secrets(STANDARD_SECRETS);
    assert_success(&t.refresh());

    let output = t.status_json();
    assert_success(&output);
    let json = stdout_json(&output);
    assert_eq!(json["status"], "valid");
    assert_eq!(json["version"], 1);
    assert_eq!(json["key_count"], 5);
    assert_eq!(json["data_hash"].as_str().unwrap().len(), 64);
}

#[test]
fn test_status_reports_tampered_cache_as_empty() {
    let t = Test::with_secrets(&[("K", "v")]);
    assert_success(&t.refresh());

    let contents = std::fs::read_to_string(t.cache_path()).unwrap();
    std::fs::write(t.cache_path(), contents.replace("\"v\"", "\"x\"")).unwrap();

    let output = t.status_json();
    assert_success(&output);
    assert_eq!(stdout_json(&output)["status"], "empty");
}

#[test]
fn test_clear_removes_cache_file() {
    let t = Test::with_secrets(&[("K", "v")]);
    assert_success(&t.refresh());
    assert!(t.cache_path().exists());

    let output = t.clear();
    assert_success(&output);
    assert_stdout_contains(&output, "cleared");
    assert!(!t.cache_path().exists());

    assert_stdout_contains(&t.status(), "empty");
}

#[test]
fn test_clear_without_cache_succeeds() {
    let t = Test::init();
    assert_success(&t.clear());
}
