//! I/O error conversion for local paths named on the command line
//!
//! Paths given by the user are validated before any transfer starts. A path
//! that vanishes in between is still a classified failure, every other I/O
//! error is unexpected.

use std::io;
use std::path::Path;

use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::ErrorRecord;

/// Extension trait for converting `io::Result` to `ApplicationResult`.
pub trait IoResultExt<T> {
    /// Wrap any I/O error as an unexpected failure naming the action and path.
    ///
    /// # Example
    /// ```ignore
    /// fs.read(&debug_config)
    ///     .with_path_context("read debug config", &debug_config)?;
    /// ```
    fn with_path_context(self, action: &str, path: &Path) -> ApplicationResult<T>;

    /// Like [`with_path_context`](Self::with_path_context), but a missing path
    /// becomes a `DOES_NOT_EXIST` record for `path`.
    fn or_does_not_exist(self, action: &str, path: &Path) -> ApplicationResult<T>;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn with_path_context(self, action: &str, path: &Path) -> ApplicationResult<T> {
        self.map_err(|e| unexpected(action, path, e))
    }

    fn or_does_not_exist(self, action: &str, path: &Path) -> ApplicationResult<T> {
        self.map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ErrorRecord::does_not_exist(path).into(),
            _ => unexpected(action, path, e),
        })
    }
}

fn unexpected(action: &str, path: &Path, e: io::Error) -> ApplicationError {
    ApplicationError::OperationFailed {
        context: format!("{}: {}", action, path.display()),
        source: Box::new(e),
    }
}
