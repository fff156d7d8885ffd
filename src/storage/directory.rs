//! Storage Directory
//!
//! Flat, unversioned set of named drawings on the server's filesystem.
//!
//! ## Responsibilities
//! - Validate names before they touch the filesystem
//! - List `.xml` entries that pass name validation
//! - Save via temp file + fsync + atomic rename
//! - Load under the name's read lock

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{Result, VaultError};

use super::NameLocks;

/// Longest accepted filename (bytes)
pub const MAX_NAME_LEN: usize = 255;

/// Suffix (ASCII case-insensitive) of entries reported by `list`
pub const LISTED_SUFFIX: &str = ".xml";

const TEMP_PREFIX: &str = ".upload-";
const TEMP_SUFFIX: &str = ".tmp";

/// Manages the storage directory
///
/// ## Concurrency:
/// - Saves to one name are serialized by that name's write lock; the last
///   writer wins
/// - Loads take the read lock, and the rename is atomic, so a reader always
///   sees one complete version
/// - All methods use `&self`
pub struct StorageDir {
    /// Directory holding the entries
    root: PathBuf,

    /// Per-name reader/writer locks
    locks: NameLocks,

    /// Sequence for temp file names (atomic, lock-free)
    next_temp_id: AtomicU64,
}

impl StorageDir {
    /// Open or create the storage directory
    ///
    /// Temp files left behind by an interrupted save are removed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let root = path.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;

        let mut stale = 0usize;
        for entry in fs::read_dir(&root)? {
            let entry = entry?;
            let name = entry.file_name();
            if name.to_str().is_some_and(is_temp_name) {
                fs::remove_file(entry.path())?;
                stale += 1;
            }
        }
        if stale > 0 {
            tracing::info!(dir = %root.display(), count = stale, "Removed stale upload files");
        }

        Ok(Self {
            root,
            locks: NameLocks::new(),
            next_temp_id: AtomicU64::new(1),
        })
    }

    /// Names of all listed entries, sorted
    ///
    /// Entries whose names fail `validate_name` (such as files written by
    /// older servers) are skipped, since they could never be loaded.
    pub fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();

        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(names),
            Err(e) => return Err(e.into()),
        };

        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            // Non UTF-8 names cannot be sent as string frames
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            // Only names `load` will serve
            if !is_listed(&name) || validate_name(&name).is_err() {
                continue;
            }
            names.push(name);
        }

        names.sort();
        Ok(names)
    }

    /// Store `data` under `name`, replacing any existing entry
    pub fn save(&self, name: &str, data: &[u8]) -> Result<()> {
        validate_name(name)?;

        // Recreated if it was removed while the server was running
        fs::create_dir_all(&self.root)?;

        let target = self.root.join(name);
        let temp = self.temp_path();

        self.locks.with_write(name, || {
            let result = write_synced(&temp, data).and_then(|()| fs::rename(&temp, &target));
            if result.is_err() {
                let _ = fs::remove_file(&temp);
            }
            result
        })?;

        sync_dir(&self.root);
        Ok(())
    }

    /// Read the entry stored under `name`
    pub fn load(&self, name: &str) -> Result<Vec<u8>> {
        validate_name(name)?;

        let path = self.root.join(name);
        self.locks
            .with_read(name, || fs::read(&path))
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => VaultError::NotFound(name.to_string()),
                _ => VaultError::Io(e),
            })
    }

    /// Check whether an entry exists under `name`
    pub fn contains(&self, name: &str) -> bool {
        validate_name(name).is_ok() && self.root.join(name).is_file()
    }

    /// Get the storage directory path
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of names with an operation in flight (for testing/debugging)
    pub fn active_locks(&self) -> usize {
        self.locks.len()
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn temp_path(&self) -> PathBuf {
        let id = self.next_temp_id.fetch_add(1, Ordering::Relaxed);
        self.root
            .join(format!("{}{}-{}{}", TEMP_PREFIX, std::process::id(), id, TEMP_SUFFIX))
    }
}

/// Check that `name` is a safe flat filename
///
/// Accepted: 1..=255 bytes of alphanumerics, `.`, `_`, `-` and space, not
/// starting with `.` and not ending with `.` or space. Anything that could
/// address another directory is rejected.
pub fn validate_name(name: &str) -> Result<()> {
    let reject = |reason: &str| -> Result<()> {
        Err(VaultError::ProtocolViolation(format!(
            "Invalid filename {:?}: {}",
            name, reason
        )))
    };

    if name.is_empty() {
        return reject("empty");
    }
    if name.len() > MAX_NAME_LEN {
        return reject("too long");
    }
    if name.starts_with('.') {
        return reject("must not start with '.'");
    }
    if name.ends_with('.') || name.ends_with(' ') || name.starts_with(' ') {
        return reject("leading or trailing space or dot");
    }
    if let Some(c) = name.chars().find(|c| !is_name_char(*c)) {
        return reject(&format!("character {:?} not allowed", c));
    }
    Ok(())
}

/// True if `name` is reported by `list`
pub fn is_listed(name: &str) -> bool {
    let bytes = name.as_bytes();
    let suffix = LISTED_SUFFIX.as_bytes();
    bytes.len() >= suffix.len() && bytes[bytes.len() - suffix.len()..].eq_ignore_ascii_case(suffix)
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '.' | '_' | '-' | ' ')
}

fn is_temp_name(name: &str) -> bool {
    name.starts_with(TEMP_PREFIX) && name.ends_with(TEMP_SUFFIX)
}

fn write_synced(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(data)?;
    file.sync_all()
}

/// Persist the rename itself (best effort)
#[cfg(unix)]
fn sync_dir(dir: &Path) {
    if let Err(e) = File::open(dir).and_then(|d| d.sync_all()) {
        tracing::debug!(dir = %dir.display(), error = %e, "Directory fsync failed");
    }
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) {}
