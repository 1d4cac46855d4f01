//! Run-timestamp manifest reconciliation.
//!
//! Fills in creation timestamps for run directories under the Pages output root,
//! first from local `.created_at` sentinels, then optionally from the GitHub API,
//! and finally records the current run.

pub mod config;
mod reconcile;
pub mod strategy;

pub use config::{parse_repository, ConfigError, CurrentRun, ReconcileConfig, RemoteSettings, Settings};
pub use reconcile::{ReconcileError, ReconcileReport, Reconciler, StrategyOutcome};
pub use strategy::{FillContext, FillError, FillStrategy, RemoteBackfill, SentinelBackfill};
