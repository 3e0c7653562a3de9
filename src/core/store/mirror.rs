//! Shared-memory mirror of the latest snapshot.
//!
//! The mirror lives in a named file on a memory-backed filesystem
//! (`/dev/shm` on Linux, the temp dir elsewhere) so other processes on the
//! host can read the current snapshot without going through the store.
//! It is advisory only: the cache file is authoritative, and every failure
//! here is reported to the caller as non-fatal.
//!
//! Layout: an 8-byte little-endian payload length, the JSON payload, then
//! zero padding up to the segment size.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::trace;

use super::file::write_atomic;
use crate::core::constants::{MIRROR_HEADER_LEN, MIRROR_MIN_SIZE};
use crate::core::snapshot::CacheSnapshot;
use crate::error::PersistenceError;

type MirrorResult<T> = std::result::Result<T, PersistenceError>;

#[derive(Debug, Clone)]
pub struct SharedMirror {
    path: PathBuf,
}

impl SharedMirror {
    /// Mirror segment named `name` in the default shared-memory location.
    pub fn named(name: &str) -> Self {
        let shm = Path::new("/dev/shm");
        let path = if shm.is_dir() {
            shm.join(name)
        } else {
            std::env::temp_dir().join(format!("{}.shm", name))
        };
        Self { path }
    }

    /// Mirror segment at an explicit path.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Publish a snapshot into the segment.
    pub fn publish(&self, snapshot: &CacheSnapshot) -> MirrorResult<()> {
        let payload = serde_json::to_vec(snapshot).map_err(PersistenceError::Serialize)?;
        self.write(&payload)
    }

    /// Write a raw payload, replacing the previous segment contents.
    pub fn write(&self, payload: &[u8]) -> MirrorResult<()> {
        let size = segment_size(payload.len());
        let mut segment = vec![0u8; size];
        segment[..MIRROR_HEADER_LEN].copy_from_slice(&(payload.len() as u64).to_le_bytes());
        segment[MIRROR_HEADER_LEN..MIRROR_HEADER_LEN + payload.len()].copy_from_slice(payload);

        // Plaintext secrets: 0600, same as the cache file.
        write_atomic(&self.path, &segment)
            .map_err(|e| PersistenceError::Mirror(format!("{}: {}", self.path.display(), e)))?;

        trace!(path = %self.path.display(), payload = payload.len(), size, "mirror updated");
        Ok(())
    }

    /// Read the current payload, if any.
    ///
    /// A missing or zero-filled segment yields `None`.
    pub fn read(&self) -> MirrorResult<Option<Vec<u8>>> {
        let segment = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(PersistenceError::Mirror(format!(
                    "{}: {}",
                    self.path.display(),
                    e
                )))
            }
        };
        if segment.len() < MIRROR_HEADER_LEN {
            return Ok(None);
        }

        let mut header = [0u8; MIRROR_HEADER_LEN];
        header.copy_from_slice(&segment[..MIRROR_HEADER_LEN]);
        let len = u64::from_le_bytes(header) as usize;
        if len == 0 {
            return Ok(None);
        }

        segment
            .get(MIRROR_HEADER_LEN..MIRROR_HEADER_LEN + len)
            .map(|payload| Some(payload.to_vec()))
            .ok_or_else(|| {
                PersistenceError::Mirror(format!(
                    "{}: declared length {} exceeds segment",
                    self.path.display(),
                    len
                ))
            })
    }

    /// Read and verify the mirrored snapshot.
    ///
    /// Anything that does not parse or verify is reported as absent.
    pub fn read_snapshot(&self) -> Option<CacheSnapshot> {
        let payload = self.read().ok()??;
        let snapshot: CacheSnapshot = serde_json::from_slice(&payload).ok()?;
        snapshot.verify().ok()?;
        Some(snapshot)
    }

    /// Overwrite the whole segment with zeros, keeping its size.
    pub fn zero(&self) -> MirrorResult<()> {
        let len = match fs::metadata(&self.path) {
            Ok(meta) => meta.len() as usize,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => {
                return Err(PersistenceError::Mirror(format!(
                    "{}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        fs::OpenOptions::new()
            .write(true)
            .open(&self.path)
            .and_then(|mut file| {
                file.write_all(&vec![0u8; len])?;
                file.sync_all()
            })
            .map_err(|e| PersistenceError::Mirror(format!("{}: {}", self.path.display(), e)))?;

        trace!(path = %self.path.display(), size = len, "mirror zeroed");
        Ok(())
    }
}

/// Segment size for a payload: header plus payload, never below the floor.
pub fn segment_size(payload_len: usize) -> usize {
    (MIRROR_HEADER_LEN + payload_len).max(MIRROR_MIN_SIZE)
}
