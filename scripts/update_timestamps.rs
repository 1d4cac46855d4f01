//! Run-timestamp manifest updater for the GitHub Pages publishing workflow.
//!
//! Every input can come from the workflow environment (`GH_PAGES`,
//! `GITHUB_RUN_NUM`, `_RUN_TS`, `GITHUB_REPOSITORY`) or from the matching flag.
//! Remote lookup settings are read from an optional TOML file and may be
//! overridden on the command line.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use manifest_reconciler::{
    parse_repository, ConfigError, CurrentRun, ReconcileConfig, Reconciler, RemoteSettings,
    Settings,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(author, version, about = "Backfill and record run timestamps in run-timestamps.json")]
struct Args {
    /// GitHub Pages output directory holding the run folders.
    #[arg(long, env = "GH_PAGES", value_name = "DIR")]
    output_root: Option<PathBuf>,

    /// Number of the workflow run being published.
    #[arg(long, env = "GITHUB_RUN_NUM")]
    run_number: Option<String>,

    /// ISO-8601 creation time of the workflow run being published.
    #[arg(long, env = "_RUN_TS")]
    run_timestamp: Option<String>,

    /// Repository (`owner/name`) queried for runs with no local timestamp.
    #[arg(long, env = "GITHUB_REPOSITORY")]
    repository: Option<String>,

    /// TOML settings file.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// GitHub CLI executable used for the remote lookup.
    #[arg(long, value_name = "PATH")]
    gh_program: Option<String>,

    /// Upper bound on the remote lookup, e.g. `60s` or `2m`.
    #[arg(long, value_parser = humantime::parse_duration)]
    remote_timeout: Option<Duration>,

    /// Skip the remote lookup entirely.
    #[arg(long)]
    no_remote: bool,

    /// Only log warnings and errors unless RUST_LOG says otherwise.
    #[arg(short, long)]
    quiet: bool,
}

impl Args {
    fn remote_settings(&self) -> Result<RemoteSettings> {
        let mut settings = match &self.config {
            Some(path) => Settings::load(path)?,
            None => Settings::default(),
        }
        .remote;
        if let Some(program) = &self.gh_program {
            settings.program.clone_from(program);
        }
        if let Some(timeout) = self.remote_timeout {
            settings.timeout = timeout;
        }
        if self.no_remote {
            settings.enabled = false;
        }
        Ok(settings)
    }

    fn reconcile_config(&self) -> Result<ReconcileConfig> {
        let output_root = self
            .output_root
            .clone()
            .ok_or(ConfigError::Missing("output root directory"))
            .context("set GH_PAGES or pass --output-root")?;
        let current_run = CurrentRun::new(
            self.run_number.as_deref().unwrap_or_default(),
            self.run_timestamp.as_deref().unwrap_or_default(),
        )
        .context("set GITHUB_RUN_NUM and _RUN_TS or pass --run-number and --run-timestamp")?;
        let repository = parse_repository(self.repository.as_deref());
        Ok(ReconcileConfig::new(output_root, current_run)?.with_repository(repository))
    }
}

fn init_tracing(quiet: bool) {
    let default_level = if quiet { "warn" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run(args: Args) -> Result<()> {
    let config = args.reconcile_config()?;
    let remote = args.remote_settings()?;
    let manifest_path = config.manifest_path();

    let mut reconciler = Reconciler::new(config);
    if remote.enabled {
        reconciler = reconciler.with_remote(remote.lookup());
    }
    let report = reconciler
        .reconcile()
        .with_context(|| format!("updating {}", manifest_path.display()))?;

    info!(
        loaded = report.loaded,
        run_directories = report.run_directories,
        from_sentinels = report.filled_by("sentinel"),
        from_remote = report.filled_by("remote"),
        sentinels_written = report.sentinels_written,
        current_run_recorded = report.current_run_recorded,
        entries = report.written,
        "run timestamps updated"
    );
    Ok(())
}

fn main() {
    let args = Args::parse();
    init_tracing(args.quiet);
    if let Err(err) = run(args) {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
