//! Remote lookup of workflow-run creation times.

mod coordinate;
mod gh;
mod listing;

use std::io;
use std::time::Duration;

use thiserror::Error;

pub use coordinate::{CoordinateError, RepoCoordinate};
pub use gh::{GhCliLookup, DEFAULT_PROGRAM, DEFAULT_TIMEOUT};
pub use listing::{parse_run_listing, RemoteRun};

/// Source of (run number, created-at) pairs for every known run of a repository.
pub trait RunLookup {
    fn list_runs(&self, repository: &RepoCoordinate) -> Result<Vec<RemoteRun>, LookupError>;
}

impl<T: RunLookup + ?Sized> RunLookup for Box<T> {
    fn list_runs(&self, repository: &RepoCoordinate) -> Result<Vec<RemoteRun>, LookupError> {
        (**self).list_runs(repository)
    }
}

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("failed to start {program}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("run listing timed out after {0:?}")]
    Timeout(Duration),
    #[error("run listing exited with status {code:?}: {stderr}")]
    Status { code: Option<i32>, stderr: String },
    #[error("run listing output is not valid UTF-8")]
    Encoding,
    #[error("run listing I/O error")]
    Io(#[source] io::Error),
}
