//! Run directories and their `.created_at` sentinel files.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::error::ManifestError;
use crate::key::{is_run_number, RunKey};

pub const SENTINEL_FILE_NAME: &str = ".created_at";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunDirectory {
    key: RunKey,
    path: PathBuf,
}

impl RunDirectory {
    pub fn new(key: RunKey, path: impl Into<PathBuf>) -> Self {
        Self {
            key,
            path: path.into(),
        }
    }

    #[must_use]
    pub const fn key(&self) -> &RunKey {
        &self.key
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn sentinel_path(&self) -> PathBuf {
        self.path.join(SENTINEL_FILE_NAME)
    }

    /// Reads the sentinel, trimmed. `Ok(None)` means no sentinel exists.
    pub fn read_sentinel(&self) -> io::Result<Option<String>> {
        match fs::read_to_string(self.sentinel_path()) {
            Ok(raw) => Ok(Some(raw.trim().to_string())),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Creates the sentinel holding `timestamp` unless one already exists.
    ///
    /// Returns `Ok(false)` when a sentinel was already present.
    pub fn write_sentinel_if_absent(&self, timestamp: &str) -> io::Result<bool> {
        let mut file = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(self.sentinel_path())
        {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => return Ok(false),
            Err(err) => return Err(err),
        };
        file.write_all(timestamp.as_bytes())?;
        file.write_all(b"\n")?;
        Ok(true)
    }
}

/// Lists the run directories directly under `root`, in canonical key order.
///
/// Only directories (symlinks are followed) whose name is made of ASCII digits
/// qualify; everything else under the root is ignored.
pub fn scan_run_directories(root: &Path) -> Result<Vec<RunDirectory>, ManifestError> {
    let scan_err = |source| ManifestError::Scan {
        path: root.to_path_buf(),
        source,
    };
    let mut runs = Vec::new();
    for entry in fs::read_dir(root).map_err(scan_err)? {
        let entry = entry.map_err(scan_err)?;
        let path = entry.path();
        let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
            continue;
        };
        if is_run_number(&name) && path.is_dir() {
            runs.push(RunDirectory::new(RunKey::new(name), path));
        }
    }
    runs.sort_by(|a, b| a.key.cmp(&b.key));
    Ok(runs)
}
