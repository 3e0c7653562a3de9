//! Filesystem persistence for cache snapshots.
//!
//! Snapshots are written as pretty JSON to a uniquely named, private
//! sibling and renamed into place, so a concurrent reader sees either the
//! old file or the new one and never a torn write. Two processes sharing
//! a cache file never share a temporary file.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::core::snapshot::CacheSnapshot;
use crate::error::{Error, IntegrityError, PersistenceError, Result};

/// Restrict permissions on a file (Unix only).
#[cfg(unix)]
fn restrict_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

/// The backing file of a [`CacheStore`](super::CacheStore).
#[derive(Debug, Clone)]
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load and verify the persisted snapshot.
    ///
    /// Returns `Ok(None)` when there is no file. A file that exists but
    /// cannot be parsed, or whose hash does not match its data, is an
    /// `IntegrityError`; the caller decides to treat that as a miss.
    ///
    /// # Errors
    ///
    /// Returns `Error::Integrity` for corrupt files and `Error::Io` for
    /// read failures other than "not found".
    pub fn load(&self) -> Result<Option<CacheSnapshot>> {
        let contents = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                trace!(path = %self.path.display(), "no cache file");
                return Ok(None);
            }
            Err(e) => return Err(Error::Io(e)),
        };

        let snapshot: CacheSnapshot =
            serde_json::from_slice(&contents).map_err(IntegrityError::Parse)?;
        snapshot.verify()?;

        debug!(
            path = %self.path.display(),
            version = snapshot.version,
            keys = snapshot.data.len(),
            "loaded cache file"
        );
        Ok(Some(snapshot))
    }

    /// Atomically replace the file with `snapshot`.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError` if serialization, the write, or the
    /// rename fails. The temporary file is removed on failure.
    pub fn save(&self, snapshot: &CacheSnapshot) -> std::result::Result<(), PersistenceError> {
        let contents = serde_json::to_vec_pretty(snapshot).map_err(PersistenceError::Serialize)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| PersistenceError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        write_atomic(&self.path, &contents).map_err(|source| PersistenceError::Write {
            path: self.path.clone(),
            source,
        })?;

        trace!(path = %self.path.display(), bytes = contents.len(), "cache file written");
        Ok(())
    }

    /// Delete the file. A missing file is not an error.
    pub fn remove(&self) -> std::result::Result<(), PersistenceError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(PersistenceError::Remove {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

/// Write `contents` to a fresh 0600 sibling of `path`, sync it, and
/// rename it over `path`.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut tmp = tempfile::Builder::new()
        .prefix(&format!(".{}.", name))
        .suffix(".tmp")
        .tempfile_in(dir)?;
    restrict_permissions(tmp.path())?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
