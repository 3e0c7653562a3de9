//! Type aliases for domain concepts.
//!
//! Provides semantic type aliases to make function signatures more descriptive.

use std::collections::BTreeMap;

/// A secret key name (e.g., DATABASE_URL, api/token).
pub type SecretKey = String;

/// A plaintext secret value as returned by the secret source.
pub type SecretValue = String;

/// The full secret set.
///
/// Ordered so that serialization is deterministic, which the
/// snapshot digest relies on.
pub type SecretMap = BTreeMap<SecretKey, SecretValue>;

/// Monotonic snapshot version. `0` means "no snapshot".
pub type Version = u64;
