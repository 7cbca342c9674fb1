//! Common error types

use thiserror::Error;

/// Error parsing a string into one of the domain enums
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {kind}: {value}")]
pub struct ParseEnumError {
    /// Which enum failed to parse
    pub kind: &'static str,
    /// The rejected input
    pub value: String,
}

impl ParseEnumError {
    pub fn new(kind: &'static str, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}

/// Error validating a goal's active-day set
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActiveDaysError {
    #[error("active_days must not be empty")]
    Empty,

    #[error("active_days values must be between 0 and 6, got {0}")]
    OutOfRange(i64),

    #[error("active_days contains duplicate value {0}")]
    Duplicate(u8),

    #[error("active_days is only allowed for daily goals")]
    NotDaily,
}
