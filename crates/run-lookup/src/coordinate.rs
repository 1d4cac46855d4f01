use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

fn coordinate_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^([A-Za-z0-9_.-]+)/([A-Za-z0-9_.-]+)$").expect("coordinate pattern compiles")
    })
}

#[derive(Debug, Error)]
#[error("repository coordinate '{0}' is not of the form owner/name")]
pub struct CoordinateError(pub String);

/// A GitHub repository coordinate, `owner/name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoCoordinate {
    owner: String,
    name: String,
}

impl RepoCoordinate {
    pub fn parse(raw: &str) -> Result<Self, CoordinateError> {
        let raw = raw.trim();
        let captures = coordinate_pattern()
            .captures(raw)
            .ok_or_else(|| CoordinateError(raw.to_string()))?;
        Ok(Self {
            owner: captures[1].to_string(),
            name: captures[2].to_string(),
        })
    }

    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// REST path listing the repository's workflow runs.
    #[must_use]
    pub fn workflow_runs_path(&self) -> String {
        format!("/repos/{}/{}/actions/runs", self.owner, self.name)
    }
}

impl FromStr for RepoCoordinate {
    type Err = CoordinateError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::parse(raw)
    }
}

impl fmt::Display for RepoCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}
