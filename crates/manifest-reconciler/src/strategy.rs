//! Fill strategies for run directories that have no manifest entry yet.
//!
//! Strategies run in order and each one is only asked about the keys the earlier
//! ones left missing. A strategy returns the pairs it found; the reconciler
//! decides what gets applied.

use std::collections::{BTreeSet, HashSet};

use run_lookup::{LookupError, RepoCoordinate, RunLookup};
use run_manifest::{RunDirectory, RunKey};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum FillError {
    #[error("remote lookup failed")]
    Lookup(#[from] LookupError),
}

pub struct FillContext<'a> {
    pub runs: &'a [RunDirectory],
}

impl<'a> FillContext<'a> {
    #[must_use]
    pub const fn new(runs: &'a [RunDirectory]) -> Self {
        Self { runs }
    }

    pub fn run(&self, key: &RunKey) -> Option<&'a RunDirectory> {
        self.runs.iter().find(|run| run.key() == key)
    }
}

pub trait FillStrategy {
    fn name(&self) -> &'static str;

    fn fill(
        &self,
        missing: &BTreeSet<RunKey>,
        ctx: &FillContext<'_>,
    ) -> Result<Vec<(RunKey, String)>, FillError>;

    /// Whether applied values should also be written back as sentinel files.
    fn persists_sentinels(&self) -> bool {
        false
    }
}

/// Reads `.created_at` sentinels from the run directories themselves.
#[derive(Debug, Clone, Copy, Default)]
pub struct SentinelBackfill;

impl FillStrategy for SentinelBackfill {
    fn name(&self) -> &'static str {
        "sentinel"
    }

    fn fill(
        &self,
        missing: &BTreeSet<RunKey>,
        ctx: &FillContext<'_>,
    ) -> Result<Vec<(RunKey, String)>, FillError> {
        let mut found = Vec::new();
        for run in ctx.runs.iter().filter(|run| missing.contains(run.key())) {
            match run.read_sentinel() {
                Ok(Some(timestamp)) if !timestamp.is_empty() => {
                    found.push((run.key().clone(), timestamp));
                }
                Ok(Some(_)) => debug!(run = %run.key(), "ignoring empty sentinel"),
                Ok(None) => {}
                Err(err) => warn!(
                    run = %run.key(),
                    path = %run.sentinel_path().display(),
                    error = %err,
                    "skipping unreadable sentinel"
                ),
            }
        }
        Ok(found)
    }
}

/// Asks a [`RunLookup`] for every run of the repository in a single query.
#[derive(Debug)]
pub struct RemoteBackfill<L> {
    lookup: L,
    repository: RepoCoordinate,
}

impl<L: RunLookup> RemoteBackfill<L> {
    pub const fn new(lookup: L, repository: RepoCoordinate) -> Self {
        Self { lookup, repository }
    }
}

impl<L: RunLookup> FillStrategy for RemoteBackfill<L> {
    fn name(&self) -> &'static str {
        "remote"
    }

    /// Queries the lookup once and keeps the pairs whose run is still missing.
    ///
    /// When the listing repeats a run number, the first pair wins and later
    /// ones are dropped, so the manifest value and the sentinel written for it
    /// always agree. Taking the last pair instead would let a stale page
    /// override the newest one the API returns first. Pairs with an empty
    /// timestamp never count as the first.
    fn fill(
        &self,
        missing: &BTreeSet<RunKey>,
        _ctx: &FillContext<'_>,
    ) -> Result<Vec<(RunKey, String)>, FillError> {
        let runs = self.lookup.list_runs(&self.repository)?;
        let mut seen = HashSet::new();
        let mut found = Vec::new();
        for run in runs {
            if run.created_at.is_empty() {
                continue;
            }
            let key = RunKey::new(run.run_number);
            if missing.contains(&key) && seen.insert(key.clone()) {
                found.push((key, run.created_at));
            }
        }
        Ok(found)
    }

    fn persists_sentinels(&self) -> bool {
        true
    }
}
