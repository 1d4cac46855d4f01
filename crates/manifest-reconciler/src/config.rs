//! Reconciliation inputs and the optional TOML settings file.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use run_lookup::{GhCliLookup, RepoCoordinate, DEFAULT_PROGRAM, DEFAULT_TIMEOUT};
use run_manifest::{manifest_path, RunKey};
use serde::{Deserialize, Deserializer};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required configuration: {0}")]
    Missing(&'static str),
    #[error("failed to read settings file {}", path.display())]
    ReadSettings {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid settings file {}", path.display())]
    ParseSettings {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// The run performing the reconciliation. Its timestamp is authoritative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentRun {
    id: RunKey,
    created_at: String,
}

impl CurrentRun {
    pub fn new(id: impl AsRef<str>, created_at: impl AsRef<str>) -> Result<Self, ConfigError> {
        let id = id.as_ref().trim();
        if id.is_empty() {
            return Err(ConfigError::Missing("current run identifier"));
        }
        let created_at = created_at.as_ref().trim();
        if created_at.is_empty() {
            return Err(ConfigError::Missing("current run timestamp"));
        }
        Ok(Self {
            id: RunKey::new(id),
            created_at: created_at.to_string(),
        })
    }

    #[must_use]
    pub const fn id(&self) -> &RunKey {
        &self.id
    }

    #[must_use]
    pub fn created_at(&self) -> &str {
        &self.created_at
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileConfig {
    output_root: PathBuf,
    current_run: CurrentRun,
    repository: Option<RepoCoordinate>,
}

impl ReconcileConfig {
    pub fn new(output_root: impl Into<PathBuf>, current_run: CurrentRun) -> Result<Self, ConfigError> {
        let output_root = output_root.into();
        if output_root.as_os_str().is_empty() {
            return Err(ConfigError::Missing("output root directory"));
        }
        Ok(Self {
            output_root,
            current_run,
            repository: None,
        })
    }

    #[must_use]
    pub fn with_repository(mut self, repository: Option<RepoCoordinate>) -> Self {
        self.repository = repository;
        self
    }

    #[must_use]
    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    #[must_use]
    pub fn manifest_path(&self) -> PathBuf {
        manifest_path(&self.output_root)
    }

    #[must_use]
    pub const fn current_run(&self) -> &CurrentRun {
        &self.current_run
    }

    #[must_use]
    pub const fn repository(&self) -> Option<&RepoCoordinate> {
        self.repository.as_ref()
    }
}

/// Parses an optional `owner/name` value.
///
/// Blank input means "not configured". A malformed value only disables the
/// remote lookup; it never aborts the run.
#[must_use]
pub fn parse_repository(raw: Option<&str>) -> Option<RepoCoordinate> {
    match raw.map(str::trim) {
        None | Some("") => None,
        Some(raw) => match RepoCoordinate::parse(raw) {
            Ok(repository) => Some(repository),
            Err(err) => {
                warn!(error = %err, "ignoring repository, remote backfill disabled");
                None
            }
        },
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub remote: RemoteSettings,
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::ReadSettings {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::ParseSettings {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RemoteSettings {
    pub enabled: bool,
    pub program: String,
    #[serde(deserialize_with = "deserialize_duration")]
    pub timeout: Duration,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            program: DEFAULT_PROGRAM.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl RemoteSettings {
    #[must_use]
    pub fn lookup(&self) -> GhCliLookup {
        GhCliLookup::new()
            .with_program(self.program.as_str())
            .with_timeout(self.timeout)
    }
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_run_requires_id_and_timestamp() {
        assert!(matches!(
            CurrentRun::new(" ", "2024-01-01T00:00:00Z"),
            Err(ConfigError::Missing("current run identifier"))
        ));
        assert!(matches!(
            CurrentRun::new("42", ""),
            Err(ConfigError::Missing("current run timestamp"))
        ));
        let run = CurrentRun::new("42\n", " 2024-01-01T00:00:00Z").unwrap();
        assert_eq!(run.id().as_str(), "42");
        assert_eq!(run.created_at(), "2024-01-01T00:00:00Z");
    }

    #[test]
    fn output_root_is_required() {
        let run = CurrentRun::new("1", "T").unwrap();
        assert!(matches!(
            ReconcileConfig::new("", run),
            Err(ConfigError::Missing("output root directory"))
        ));
    }

    #[test]
    fn blank_or_malformed_repository_is_not_configured() {
        assert_eq!(parse_repository(None), None);
        assert_eq!(parse_repository(Some("  ")), None);
        assert_eq!(parse_repository(Some("not a repository")), None);
        assert_eq!(parse_repository(Some("owner/name/extra")), None);
        assert_eq!(
            parse_repository(Some("octo/site")),
            Some(RepoCoordinate::parse("octo/site").unwrap())
        );
    }

    #[test]
    fn settings_default_when_sections_are_omitted() {
        let settings: Settings = toml::from_str("").unwrap();
        assert_eq!(settings, Settings::default());
        assert!(settings.remote.enabled);
        assert_eq!(settings.remote.program, "gh");
        assert_eq!(settings.remote.timeout, Duration::from_secs(60));
    }

    #[test]
    fn settings_parse_humantime_timeouts() {
        let settings: Settings = toml::from_str(
            r#"
            [remote]
            enabled = false
            program = "/usr/local/bin/gh"
            timeout = "1m 30s"
            "#,
        )
        .unwrap();
        assert!(!settings.remote.enabled);
        assert_eq!(settings.remote.program, "/usr/local/bin/gh");
        assert_eq!(settings.remote.timeout, Duration::from_secs(90));
    }

    #[test]
    fn settings_reject_unknown_keys() {
        assert!(toml::from_str::<Settings>("[remote]\nretries = 3\n").is_err());
        assert!(toml::from_str::<Settings>("[remote]\ntimeout = \"soon\"\n").is_err());
    }
}
