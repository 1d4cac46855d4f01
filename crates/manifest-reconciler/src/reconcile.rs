use std::collections::BTreeSet;

use run_lookup::RunLookup;
use run_manifest::{scan_run_directories, ManifestError, RunDirectory, RunKey, RunManifest};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::ReconcileConfig;
use crate::strategy::{FillContext, FillStrategy, RemoteBackfill, SentinelBackfill};

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Manifest(#[from] ManifestError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyOutcome {
    pub strategy: &'static str,
    /// `false` when the strategy was skipped because nothing was missing.
    pub invoked: bool,
    pub failed: bool,
    pub filled: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub loaded: usize,
    pub run_directories: usize,
    pub strategies: Vec<StrategyOutcome>,
    pub sentinels_written: usize,
    pub current_run_recorded: bool,
    pub still_missing: Vec<RunKey>,
    pub written: usize,
}

impl ReconcileReport {
    #[must_use]
    pub fn filled_by(&self, strategy: &str) -> usize {
        self.strategies
            .iter()
            .filter(|outcome| outcome.strategy == strategy)
            .map(|outcome| outcome.filled)
            .sum()
    }
}

/// Backfills the run-timestamp manifest and records the current run.
///
/// The manifest is loaded once, filled in memory by each strategy in turn, then
/// the current run is added if absent and the result is written once in canonical
/// order. Only manifest I/O and parse failures abort; strategy failures are logged
/// and contribute nothing.
pub struct Reconciler {
    config: ReconcileConfig,
    strategies: Vec<Box<dyn FillStrategy>>,
}

impl Reconciler {
    /// A reconciler with local sentinel backfill only.
    #[must_use]
    pub fn new(config: ReconcileConfig) -> Self {
        Self {
            config,
            strategies: vec![Box::new(SentinelBackfill)],
        }
    }

    /// Adds remote backfill through `lookup`.
    ///
    /// Has no effect unless the configuration names a repository.
    #[must_use]
    pub fn with_remote<L>(self, lookup: L) -> Self
    where
        L: RunLookup + 'static,
    {
        match self.config.repository().cloned() {
            Some(repository) => self.with_strategy(RemoteBackfill::new(lookup, repository)),
            None => {
                debug!("no repository configured, remote backfill disabled");
                self
            }
        }
    }

    #[must_use]
    pub fn with_strategy<S>(mut self, strategy: S) -> Self
    where
        S: FillStrategy + 'static,
    {
        self.strategies.push(Box::new(strategy));
        self
    }

    #[must_use]
    pub const fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    pub fn reconcile(&self) -> Result<ReconcileReport, ReconcileError> {
        let manifest_path = self.config.manifest_path();
        let mut manifest = RunManifest::load(&manifest_path)?;
        let runs = scan_run_directories(self.config.output_root())?;
        let mut report = ReconcileReport {
            loaded: manifest.len(),
            run_directories: runs.len(),
            ..ReconcileReport::default()
        };
        let ctx = FillContext::new(&runs);

        for strategy in &self.strategies {
            let outcome = self.apply(strategy.as_ref(), &mut manifest, &ctx, &mut report);
            report.strategies.push(outcome);
        }

        let current = self.config.current_run();
        report.current_run_recorded =
            manifest.insert_if_absent(current.id().clone(), current.created_at());
        if !report.current_run_recorded {
            debug!(run = %current.id(), "current run already recorded, keeping existing value");
        }

        report.still_missing = missing_keys(&manifest, &runs).into_iter().collect();
        manifest.persist(&manifest_path)?;
        report.written = manifest.len();
        info!(
            path = %manifest_path.display(),
            entries = report.written,
            still_missing = report.still_missing.len(),
            "run manifest written"
        );
        Ok(report)
    }

    fn apply(
        &self,
        strategy: &dyn FillStrategy,
        manifest: &mut RunManifest,
        ctx: &FillContext<'_>,
        report: &mut ReconcileReport,
    ) -> StrategyOutcome {
        let mut outcome = StrategyOutcome {
            strategy: strategy.name(),
            invoked: false,
            failed: false,
            filled: 0,
        };
        let missing = missing_keys(manifest, ctx.runs);
        if missing.is_empty() {
            debug!(strategy = outcome.strategy, "nothing missing, skipping");
            return outcome;
        }
        outcome.invoked = true;

        let found = match strategy.fill(&missing, ctx) {
            Ok(found) => found,
            Err(err) => {
                warn!(strategy = outcome.strategy, error = %err, "fill strategy failed, continuing without it");
                outcome.failed = true;
                return outcome;
            }
        };

        for (key, timestamp) in found {
            if !missing.contains(&key) {
                continue;
            }
            if !manifest.insert_if_absent(key.clone(), timestamp.as_str()) {
                continue;
            }
            outcome.filled += 1;
            debug!(strategy = outcome.strategy, run = %key, timestamp = %timestamp, "filled");
            if strategy.persists_sentinels() {
                if let Some(run) = ctx.run(&key) {
                    report.sentinels_written += usize::from(write_sentinel(run, &timestamp));
                }
            }
        }
        info!(
            strategy = outcome.strategy,
            missing = missing.len(),
            filled = outcome.filled,
            "fill strategy applied"
        );
        outcome
    }
}

fn missing_keys(manifest: &RunManifest, runs: &[RunDirectory]) -> BTreeSet<RunKey> {
    runs.iter()
        .map(RunDirectory::key)
        .filter(|key| !manifest.contains(key))
        .cloned()
        .collect()
}

fn write_sentinel(run: &RunDirectory, timestamp: &str) -> bool {
    match run.write_sentinel_if_absent(timestamp) {
        Ok(written) => written,
        Err(err) => {
            warn!(
                run = %run.key(),
                path = %run.sentinel_path().display(),
                error = %err,
                "could not write sentinel"
            );
            false
        }
    }
}
