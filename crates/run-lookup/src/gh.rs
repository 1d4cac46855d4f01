use std::ffi::OsString;
use std::io::{self, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::listing::{parse_run_listing, RemoteRun};
use crate::{LookupError, RepoCoordinate, RunLookup};

pub const DEFAULT_PROGRAM: &str = "gh";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

const POLL_INTERVAL: Duration = Duration::from_millis(25);
const RUN_LISTING_FILTER: &str =
    ".workflow_runs[] | [(.run_number | tostring), .created_at] | @tsv";

/// Lists workflow runs by shelling out to `gh api --paginate`.
///
/// Pagination and authentication are left to the GitHub CLI. The whole call is
/// bounded by `timeout`; a process still running at the deadline is killed.
#[derive(Debug, Clone)]
pub struct GhCliLookup {
    program: OsString,
    timeout: Duration,
}

impl Default for GhCliLookup {
    fn default() -> Self {
        Self::new()
    }
}

impl GhCliLookup {
    #[must_use]
    pub fn new() -> Self {
        Self {
            program: OsString::from(DEFAULT_PROGRAM),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_program(mut self, program: impl Into<OsString>) -> Self {
        self.program = program.into();
        self
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    #[must_use]
    pub fn command_args(&self, repository: &RepoCoordinate) -> Vec<String> {
        vec![
            "api".into(),
            repository.workflow_runs_path(),
            "--paginate".into(),
            "--jq".into(),
            RUN_LISTING_FILTER.into(),
        ]
    }

    fn spawn(&self, repository: &RepoCoordinate) -> Result<Child, LookupError> {
        Command::new(&self.program)
            .args(self.command_args(repository))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| LookupError::Spawn {
                program: self.program.to_string_lossy().into_owned(),
                source,
            })
    }
}

impl RunLookup for GhCliLookup {
    fn list_runs(&self, repository: &RepoCoordinate) -> Result<Vec<RemoteRun>, LookupError> {
        let started_at = Instant::now();
        let deadline = started_at
            .checked_add(self.timeout)
            .unwrap_or_else(|| started_at + Duration::from_secs(u64::from(u32::MAX)));
        let mut child = self.spawn(repository)?;
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        // The pipes can outlive the child when it leaves a background process
        // behind, so reading them is bounded by the same deadline. Readers still
        // blocked at that point are left detached.
        let status = wait_until(&mut child, deadline, self.timeout)?;
        let stdout = collect(&stdout, deadline, self.timeout)?;
        let stderr = collect(&stderr, deadline, self.timeout)?;

        if !status.success() {
            return Err(LookupError::Status {
                code: status.code(),
                stderr: String::from_utf8_lossy(&stderr).trim().to_string(),
            });
        }
        let stdout = String::from_utf8(stdout).map_err(|_| LookupError::Encoding)?;
        let runs = parse_run_listing(&stdout);
        debug!(
            repository = %repository,
            runs = runs.len(),
            elapsed_ms = u64::try_from(started_at.elapsed().as_millis()).unwrap_or(u64::MAX),
            "remote run listing complete"
        );
        Ok(runs)
    }
}

fn drain<R>(pipe: Option<R>) -> Receiver<io::Result<Vec<u8>>>
where
    R: Read + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        let result = match pipe {
            Some(mut pipe) => pipe.read_to_end(&mut buf).map(|_| buf),
            None => Ok(buf),
        };
        let _ = tx.send(result);
    });
    rx
}

fn collect(
    reader: &Receiver<io::Result<Vec<u8>>>,
    deadline: Instant,
    timeout: Duration,
) -> Result<Vec<u8>, LookupError> {
    match reader.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
        Ok(result) => result.map_err(LookupError::Io),
        Err(RecvTimeoutError::Timeout) => Err(LookupError::Timeout(timeout)),
        Err(RecvTimeoutError::Disconnected) => {
            Err(LookupError::Io(io::Error::other("pipe reader panicked")))
        }
    }
}

fn wait_until(
    child: &mut Child,
    deadline: Instant,
    timeout: Duration,
) -> Result<ExitStatus, LookupError> {
    loop {
        if let Some(status) = child.try_wait().map_err(LookupError::Io)? {
            return Ok(status);
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Err(LookupError::Timeout(timeout));
        }
        thread::sleep(POLL_INTERVAL);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_targets_paginated_run_listing() {
        let repo = RepoCoordinate::parse("octo/site").unwrap();
        let lookup = GhCliLookup::new();
        assert_eq!(
            lookup.command_args(&repo),
            vec![
                "api",
                "/repos/octo/site/actions/runs",
                "--paginate",
                "--jq",
                ".workflow_runs[] | [(.run_number | tostring), .created_at] | @tsv",
            ]
        );
        assert_eq!(lookup.timeout(), Duration::from_secs(60));
    }

    #[test]
    fn missing_program_is_a_spawn_error() {
        let repo = RepoCoordinate::parse("octo/site").unwrap();
        let lookup = GhCliLookup::new().with_program("/nonexistent/gh-binary-for-tests");
        let err = lookup.list_runs(&repo).expect_err("spawn must fail");
        assert!(matches!(err, LookupError::Spawn { .. }), "{err}");
    }
}
