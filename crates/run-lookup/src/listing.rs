/// One workflow run as reported by the remote API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRun {
    pub run_number: String,
    pub created_at: String,
}

impl RemoteRun {
    pub fn new(run_number: impl Into<String>, created_at: impl Into<String>) -> Self {
        Self {
            run_number: run_number.into(),
            created_at: created_at.into(),
        }
    }
}

/// Parses `<run_number>\t<created_at>` lines.
///
/// Lines that do not split into exactly two fields are skipped. Fields are
/// trimmed; an empty `created_at` is kept and left for the caller to reject.
#[must_use]
pub fn parse_run_listing(output: &str) -> Vec<RemoteRun> {
    output
        .trim()
        .lines()
        .filter_map(|line| {
            let mut fields = line.split('\t');
            match (fields.next(), fields.next(), fields.next()) {
                (Some(run_number), Some(created_at), None) => {
                    Some(RemoteRun::new(run_number.trim(), created_at.trim()))
                }
                _ => None,
            }
        })
        .collect()
}
