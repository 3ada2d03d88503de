use serde::{Deserialize, Serialize};

/// What the normalizer does with a record whose date cannot be parsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatePolicy {
    /// Fail the whole normalization step on the first bad date.
    #[default]
    Abort,
    /// Drop the offending record and keep going.
    Skip,
}

/// What the normalizer does with a nav string that is not a decimal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavPolicy {
    /// Treat the value as a parse error.
    #[default]
    Strict,
    /// Store the value as zero. Kept for compatibility with older loads.
    ZeroOnError,
}

impl DatePolicy {
    pub fn skips_bad_records(&self) -> bool {
        matches!(self, DatePolicy::Skip)
    }
}
