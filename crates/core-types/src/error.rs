use thiserror::Error;

/// A single raw record could not be turned into a typed value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Invalid date {value:?}: expected DD-MM-YYYY ({reason})")]
    Date { value: String, reason: String },

    #[error("Invalid nav {value:?}: {reason}")]
    Nav { value: String, reason: String },
}

impl ParseError {
    /// Name of the offending field in the external document.
    pub fn field(&self) -> &'static str {
        match self {
            ParseError::Date { .. } => "date",
            ParseError::Nav { .. } => "nav",
        }
    }

    pub fn value(&self) -> &str {
        match self {
            ParseError::Date { value, .. } | ParseError::Nav { value, .. } => value,
        }
    }
}
