//! Run-timestamp manifest model for GitHub Pages run archives.
//!
//! The manifest lives at `<output_root>/run-timestamps.json` and maps run numbers
//! (plus a few legacy keys) to their creation timestamps. Iteration and the
//! persisted file both follow the canonical order defined by [`RunKey`].

mod error;
pub mod fs;
mod key;
mod manifest;
pub mod sentinel;

use std::path::{Path, PathBuf};

pub use error::ManifestError;
pub use key::{is_run_number, RunKey};
pub use manifest::RunManifest;
pub use sentinel::{scan_run_directories, RunDirectory, SENTINEL_FILE_NAME};

pub const MANIFEST_FILE_NAME: &str = "run-timestamps.json";

#[must_use]
pub fn manifest_path(output_root: &Path) -> PathBuf {
    output_root.join(MANIFEST_FILE_NAME)
}
