//! CLI-level errors (wraps application errors)

use thiserror::Error;

use crate::application::ApplicationError;
use crate::domain::ErrorRecord;
use crate::infrastructure::InfraError;

/// CLI errors are the top-level error type.
/// These are what get displayed to the user.
#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Application(#[from] ApplicationError),

    #[error("{0}")]
    Usage(String),
}

impl From<InfraError> for CliError {
    fn from(e: InfraError) -> Self {
        CliError::Application(e.into())
    }
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    /// The classified record, if this failure is one.
    pub fn record(&self) -> Option<&ErrorRecord> {
        match self {
            CliError::Application(e) => e.record(),
            CliError::Usage(_) => None,
        }
    }

    /// 1 for usage errors and classified records, 2 for anything else.
    pub fn exit_code(&self) -> i32 {
        if self.record().is_some() || matches!(self, CliError::Usage(_)) {
            crate::exitcode::FAILURE
        } else {
            crate::exitcode::UNEXPECTED
        }
    }
}
