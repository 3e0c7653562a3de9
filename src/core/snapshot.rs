//! Cache snapshot type.
//!
//! A snapshot is the full secret set as fetched at one point in time,
//! plus the metadata needed to decide whether it can still be served.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::core::clock;
use crate::core::types::{SecretMap, Version};
use crate::error::IntegrityError;

/// One aggregate of cached secrets plus metadata.
///
/// This is also the on-disk format of the cache file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSnapshot {
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub version: Version,
    /// Label of the secret source the data came from
    pub source: String,
    pub data: SecretMap,
    /// SHA-256 (hex) over the canonical serialization of `data`
    pub data_hash: String,
    #[serde(default)]
    pub access_count: u64,
    pub last_accessed_at: DateTime<Utc>,
}

impl CacheSnapshot {
    /// Build a fresh snapshot with a newly computed digest.
    ///
    /// # Errors
    ///
    /// Returns the serializer error if `data` cannot be serialized.
    pub fn new(
        data: SecretMap,
        version: Version,
        source: impl Into<String>,
        now: DateTime<Utc>,
        ttl: std::time::Duration,
    ) -> Result<Self, serde_json::Error> {
        let data_hash = digest(&data)?;
        Ok(Self {
            created_at: now,
            expires_at: clock::add(now, ttl),
            version,
            source: source.into(),
            data,
            data_hash,
            access_count: 0,
            last_accessed_at: now,
        })
    }

    /// Whether the snapshot is still within its TTL.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    /// Recompute the digest and compare it with the stored one.
    ///
    /// # Errors
    ///
    /// Returns `IntegrityError::HashMismatch` if the data was altered.
    pub fn verify(&self) -> Result<(), IntegrityError> {
        let actual = digest(&self.data).map_err(IntegrityError::Parse)?;
        if actual != self.data_hash {
            return Err(IntegrityError::HashMismatch {
                expected: self.data_hash.clone(),
                actual,
            });
        }
        Ok(())
    }

    /// Record a read.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.access_count = self.access_count.saturating_add(1);
        self.last_accessed_at = now;
    }
}

/// Compute the content digest of a secret set.
///
/// `SecretMap` iterates in key order, so the JSON encoding is canonical.
pub fn digest(data: &SecretMap) -> Result<String, serde_json::Error> {
    let canonical = serde_json::to_vec(data)?;
    Ok(hex::encode(Sha256::digest(&canonical)))
}
