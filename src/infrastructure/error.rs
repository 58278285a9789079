//! Infrastructure-level errors (wraps application errors)

use thiserror::Error;

use crate::application::ApplicationError;
use crate::domain::ErrorRecord;

/// Infrastructure errors wrap application errors and add I/O-level concerns.
#[derive(Error, Debug)]
pub enum InfraError {
    #[error("{0}")]
    Application(#[from] ApplicationError),

    #[error("I/O error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot run {program}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

impl InfraError {
    /// Create an I/O error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a spawn error for an external program.
    pub fn spawn(program: impl Into<String>, source: std::io::Error) -> Self {
        Self::Spawn {
            program: program.into(),
            source,
        }
    }

    /// The classified record, if this failure is one.
    pub fn record(&self) -> Option<&ErrorRecord> {
        match self {
            InfraError::Application(e) => e.record(),
            _ => None,
        }
    }
}

impl From<ErrorRecord> for InfraError {
    fn from(record: ErrorRecord) -> Self {
        InfraError::Application(ApplicationError::Record(record))
    }
}

// Services return `ApplicationResult`; records survive the trip back up.
impl From<InfraError> for ApplicationError {
    fn from(e: InfraError) -> Self {
        match e {
            InfraError::Application(inner) => inner,
            other => ApplicationError::OperationFailed {
                context: "infrastructure".to_string(),
                source: Box::new(other),
            },
        }
    }
}

/// Result type for infrastructure layer operations.
pub type InfraResult<T> = Result<T, InfraError>;
