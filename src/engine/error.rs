//! Harness error types

use crate::plan::config::ConfigError;
use crate::plan::stage::PlanDefect;
use crate::plan::template::ExpressionError;

/// Errors raised while invoking the target CLI
///
/// A non-zero exit status is not an error; it is reported through
/// [`CommandOutput`](super::runner::CommandOutput).
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("Failed to spawn {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that stop a run before or after the stage sequence
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("{0} is required")]
    MissingCredential(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Template error in {step}: {source}")]
    Template {
        step: String,
        #[source]
        source: ExpressionError,
    },

    #[error("Failed to write report to {path}: {source}")]
    ReportWrite {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<PlanDefect> for HarnessError {
    fn from(defect: PlanDefect) -> Self {
        HarnessError::Template {
            step: defect.step,
            source: defect.error,
        }
    }
}

impl HarnessError {
    /// Process exit status for a run that stopped on this error
    pub fn exit_code(&self) -> u8 {
        match self {
            HarnessError::MissingCredential(_) => super::report::EXIT_MISSING_CREDENTIAL,
            _ => super::report::EXIT_FATAL,
        }
    }
}
