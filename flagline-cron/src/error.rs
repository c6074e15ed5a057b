//! Error types for cron operations.

use thiserror::Error;

/// Result type for cron operations.
pub type CronResult<T> = Result<T, CronError>;

/// Cron-specific errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CronError {
    /// Invalid cron expression
    #[error("Invalid cron expression: {0}")]
    InvalidExpression(String),

    /// A field uses syntax that cannot be translated to the underlying engine
    #[error("Unsupported {field} field: {value}")]
    UnsupportedField {
        /// Field name (e.g. "day-of-week")
        field: &'static str,
        /// Offending field text
        value: String,
    },

    /// Unknown IANA timezone name
    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),
}

impl CronError {
    /// Create a new invalid expression error
    pub fn invalid<S: Into<String>>(msg: S) -> Self {
        Self::InvalidExpression(msg.into())
    }

    /// Create a new unsupported day-of-week error
    pub(crate) fn unsupported_day_of_week<S: Into<String>>(value: S) -> Self {
        Self::UnsupportedField {
            field: "day-of-week",
            value: value.into(),
        }
    }
}
