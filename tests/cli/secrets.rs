//! Tests for `vaultcache refresh/get/list`.

use crate::support::*;

#[test]
fn test_refresh_then_get() {
    let t = Test::with_secrets(STANDARD_SECRETS);

    let output = t.refresh();
    assert_success(&output);
    assert_stdout_contains(&output, "version 1");
    assert_stdout_contains(&output, "5 keys");
    assert!(t.cache_path().exists());

    let output = t.get("DATABASE_URL");
    assert_success(&output);
    assert_eq!(stdout(&output).trim(), "postgres://localhost/mydb");
}

#[test]
fn test_get_without_refresh_fetches() {
    let t = Test::with_secrets(&[("API_KEY", "sk-1")]);

    let output = t.get("API_KEY");
    assert_success(&output);
    assert_eq!(stdout(&output).trim(), "sk-1");
    assert!(t.cache_path().exists(), "first read should populate the cache");
}

#[test]
fn test_get_serves_cached_value_until_refresh() {
    let t = Test::with_secrets(&[("API_KEY", "old")]);
    assert_success(&t.refresh());

    t.write_secrets(&[("API_KEY", "new")]);
    let output = t.get("API_KEY");
    assert_success(&output);
    assert_eq!(stdout(&output).trim(), "old");

    let output = t.refresh();
    assert_success(&output);
    assert_stdout_contains(&output, "version 2");

    let output = t.get("API_KEY");
    assert_eq!(stdout(&output).trim(), "new");
}

#[test]
fn test_get_nested_key() {
    let t = Test::init();
    std::fs::write(t.secrets_path(), NESTED_SECRETS).unwrap();

    let output = t.get("database/password");
    assert_success(&output);
    assert_eq!(stdout(&output).trim(), "hunter2");

    let output = t.get("database/port");
    assert_eq!(stdout(&output).trim(), "5432");
}

#[test]
fn test_list_keys() {
    let t = Test::with_secrets(STANDARD_SECRETS);

    let output = t.list();
    assert_success(&output);
    assert_stdout_contains(&output, "5 secrets");
    for (key, value) in STANDARD_SECRETS {
        assert_stdout_contains(&output, key);
        assert!(!stdout(&output).contains(value), "list must not print values");
    }
}

#[test]
fn test_list_json() {
    let t = Test::with_secrets(&[("B", "2"), ("A", "1")]);

    let output = t.list_json();
    assert_success(&output);
    let json = stdout_json(&output);
    assert_eq!(json["count"], 2);
    assert_eq!(json["keys"], serde_json::json!(["A", "B"]));
}

#[test]
fn test_list_empty_document() {
    let t = Test::with_secrets(&[]);

    let output = t.list();
    assert_success(&output);
    assert_stdout_contains(&output, "no secrets cached");
}

#[test]
fn test_cache_file_override_from_env() {
    let t = Test::with_secrets(&[("K", "v")]);
    let elsewhere = t.dir.path().join("elsewhere.json");

    let output = t
        .cmd()
        .env("VAULTCACHE_CACHE_FILE", &elsewhere)
        .arg("refresh")
        .output()
        .unwrap();
    assert_success(&output);
    assert!(elsewhere.exists());
    assert!(!t.cache_path().exists());
}

#[test]
fn test_explicit_config_path() {
    let t = Test::with_secrets(&[("K", "v")]);
    let config = t.dir.path().join("custom.toml");
    std::fs::rename(t.dir.path().join(".vaultcache.toml"), &config).unwrap();

    let output = t
        .cmd()
        .args(["--config", config.to_str().unwrap(), "get", "K"])
        .output()
        .unwrap();
    assert_success(&output);
    assert_eq!(stdout(&output).trim(), "v");
}

#[test]
fn test_env_source() {
    let t = Test::new();
    t.write_config(
        "[source]\nkind = \"env\"\naddress = \"local\"\nnamespace = \"VCTEST_\"\n\n[cache]\nfile = \"cache/cache.json\"\nmirror_enabled = false\n",
    );

    let output = t
        .cmd()
        .env("VCTEST_TOKEN", "from-env")
        .args(["get", "TOKEN"])
        .output()
        .unwrap();
    assert_success(&output);
    assert_eq!(stdout(&output).trim(), "from-env");
}
