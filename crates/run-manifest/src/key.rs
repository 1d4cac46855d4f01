use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Returns `true` when `raw` is a non-empty string of ASCII digits.
#[must_use]
pub fn is_run_number(raw: &str) -> bool {
    !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit())
}

/// A manifest key.
///
/// Ordering is the canonical manifest order: run numbers first, ascending by
/// integer value, then every other key ascending by code point. Run numbers are
/// compared digit-wise so values wider than any machine integer still sort
/// correctly. Keys with the same integer value (`"7"`, `"007"`) fall back to
/// comparing the raw text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunKey(String);

impl RunKey {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_run_number(&self) -> bool {
        is_run_number(&self.0)
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

fn cmp_run_numbers(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

impl Ord for RunKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.is_run_number(), other.is_run_number()) {
            (true, true) => cmp_run_numbers(&self.0, &other.0).then_with(|| self.0.cmp(&other.0)),
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for RunKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for RunKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RunKey {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for RunKey {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted(raw: &[&str]) -> Vec<String> {
        let mut keys: Vec<RunKey> = raw.iter().copied().map(RunKey::from).collect();
        keys.sort();
        keys.into_iter().map(RunKey::into_string).collect()
    }

    #[test]
    fn run_numbers_sort_by_value_before_legacy_keys() {
        assert_eq!(
            sorted(&["latest", "10", "2", "legacy-a", "1", "Zeta"]),
            vec!["1", "2", "10", "Zeta", "latest", "legacy-a"]
        );
    }

    #[test]
    fn run_numbers_wider_than_u64_still_order_numerically() {
        assert_eq!(
            sorted(&["99999999999999999999999", "18446744073709551616", "5"]),
            vec!["5", "18446744073709551616", "99999999999999999999999"]
        );
    }

    #[test]
    fn equal_values_with_leading_zeros_tie_break_on_text() {
        assert_eq!(sorted(&["7", "007", "07", "8"]), vec!["007", "07", "7", "8"]);
    }

    #[test]
    fn only_ascii_digits_count_as_run_numbers() {
        assert!(is_run_number("0042"));
        assert!(!is_run_number(""));
        assert!(!is_run_number("-1"));
        assert!(!is_run_number("1.5"));
        assert!(!is_run_number("٣"));
    }
}
