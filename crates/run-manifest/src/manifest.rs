use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ManifestError;
use crate::fs::atomic_write_bytes;
use crate::key::RunKey;

/// Mapping of run identifier to creation timestamp, kept in canonical order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunManifest {
    entries: BTreeMap<RunKey, String>,
}

impl RunManifest {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the manifest at `path`.
    ///
    /// A missing file yields an empty manifest. Anything that is not a JSON object
    /// with string values is rejected rather than repaired, so a corrupt file is
    /// never overwritten with partial data. Entries with an empty timestamp are
    /// dropped so later backfill can supply a value.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no existing manifest, starting empty");
                return Ok(Self::new());
            }
            Err(source) => {
                return Err(ManifestError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        let mut manifest: Self =
            serde_json::from_str(&raw).map_err(|source| ManifestError::Malformed {
                path: path.to_path_buf(),
                source,
            })?;
        manifest.entries.retain(|key, value| {
            let keep = !value.trim().is_empty();
            if !keep {
                warn!(run = %key, "dropping manifest entry with empty timestamp");
            }
            keep
        });
        Ok(manifest)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(&RunKey::from(key)).map(String::as_str)
    }

    #[must_use]
    pub fn contains(&self, key: &RunKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Records `timestamp` for `key` unless the key already has a value.
    ///
    /// Returns `true` when the entry was inserted. Empty timestamps are refused.
    pub fn insert_if_absent(&mut self, key: RunKey, timestamp: impl Into<String>) -> bool {
        let timestamp = timestamp.into();
        if timestamp.is_empty() {
            return false;
        }
        match self.entries.entry(key) {
            btree_map::Entry::Vacant(slot) => {
                slot.insert(timestamp);
                true
            }
            btree_map::Entry::Occupied(_) => false,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (&RunKey, &str)> {
        self.entries.iter().map(|(key, value)| (key, value.as_str()))
    }

    /// Canonical file body: two-space indented JSON followed by a newline.
    pub fn to_pretty_json(&self) -> Result<String, ManifestError> {
        let mut body = serde_json::to_string_pretty(self).map_err(ManifestError::Encode)?;
        body.push('\n');
        Ok(body)
    }

    /// Writes the canonical body to `path`, replacing any existing file atomically.
    pub fn persist(&self, path: &Path) -> Result<(), ManifestError> {
        let body = self.to_pretty_json()?;
        atomic_write_bytes(path, body.as_bytes()).map_err(|source| ManifestError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl FromIterator<(RunKey, String)> for RunManifest {
    fn from_iter<I: IntoIterator<Item = (RunKey, String)>>(iter: I) -> Self {
        let mut manifest = Self::new();
        for (key, value) in iter {
            manifest.insert_if_absent(key, value);
        }
        manifest
    }
}
