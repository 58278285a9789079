//! Application-level errors (wraps domain failure records)

use thiserror::Error;

use crate::domain::ErrorRecord;

/// Application errors carry either a classified [`ErrorRecord`] or an
/// unexpected failure with context.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Record(#[from] ErrorRecord),

    #[error("config error: {message}")]
    Config { message: String },

    #[error("operation failed: {context}")]
    OperationFailed {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl ApplicationError {
    /// The classified record, if this failure is one.
    pub fn record(&self) -> Option<&ErrorRecord> {
        match self {
            ApplicationError::Record(record) => Some(record),
            _ => None,
        }
    }
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
