//! Test fixtures and constants.

/// Config used by CLI tests. Paths are relative to the project directory.
pub const BASE_CONFIG: &str = r#"
[source]
kind = "file"
address = "."

[cache]
file = "cache/cache.json"
mirror_enabled = false
"#;

/// Standard test secrets used across multiple tests.
pub const STANDARD_SECRETS: &[(&str, &str)] = &[
    ("DATABASE_URL", "postgres://localhost/mydb"),
    ("API_KEY", "sk-test-12345"),
    ("JWT_SECRET", "super-secret-jwt-token"),
    ("REDIS_URL", "redis://localhost:6379"),
    ("S3_BUCKET", "my-app-bucket"),
];

/// Nested secrets document for the file source.
pub const NESTED_SECRETS: &str = r#"
token = "abc"

[database]
user = "app"
password = "hunter2"
port = 5432
"#;
