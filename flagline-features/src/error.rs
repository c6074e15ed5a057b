//! Error types for the evaluation engine

use chrono::{DateTime, Utc};
use flagline_cron::CronError;
use thiserror::Error;

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Engine errors
///
/// Evaluation itself never fails; these cover malformed requests and configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// Timeline window ends before it starts
    #[error("Invalid timeline window: {to} is before {from}")]
    InvalidWindow {
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    },

    /// Configuration error
    #[error("Engine configuration error: {0}")]
    Config(String),

    /// Cron error
    #[error(transparent)]
    Cron(#[from] CronError),
}

impl EngineError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }
}
