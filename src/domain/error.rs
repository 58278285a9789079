//! Structured failure records (no external dependencies)

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Closed set of failure codes raised by validation, execution and secrets
/// collaborators.
///
/// `Other` carries any code outside the set (for example one reported by a
/// newer collaborator); it is rendered with the generic fallback.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    DoesNotExist,
    NotAFolder,
    NotAFile,
    NotWriteable,
    PathNotAbsolute,
    BadExitCode,
    AccessDenied,
    MissingOption,
    Other(String),
}

impl ErrorCode {
    pub fn as_str(&self) -> &str {
        match self {
            ErrorCode::DoesNotExist => "DOES_NOT_EXIST",
            ErrorCode::NotAFolder => "NOT_A_FOLDER",
            ErrorCode::NotAFile => "NOT_A_FILE",
            ErrorCode::NotWriteable => "NOT_WRITEABLE",
            ErrorCode::PathNotAbsolute => "PATH_NOT_ABSOLUTE",
            ErrorCode::BadExitCode => "BAD_EXIT_CODE",
            ErrorCode::AccessDenied => "ACCESS_DENIED",
            ErrorCode::MissingOption => "MISSING_OPTION",
            ErrorCode::Other(code) => code,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified failure: an error code plus the context fields it needs.
///
/// `Display` renders the raw record; user-facing text comes from
/// [`translate`](crate::domain::translate).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct ErrorRecord {
    pub error_code: ErrorCode,
    pub path: Option<PathBuf>,
    pub option: Option<String>,
    pub exit_code: Option<i32>,
}

impl ErrorRecord {
    pub fn new(error_code: ErrorCode) -> Self {
        Self {
            error_code,
            path: None,
            option: None,
            exit_code: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_option(mut self, option: impl Into<String>) -> Self {
        self.option = Some(option.into());
        self
    }

    pub fn with_exit_code(mut self, exit_code: i32) -> Self {
        self.exit_code = Some(exit_code);
        self
    }

    pub fn does_not_exist(path: impl Into<PathBuf>) -> Self {
        Self::new(ErrorCode::DoesNotExist).with_path(path)
    }

    pub fn not_a_folder(path: impl Into<PathBuf>) -> Self {
        Self::new(ErrorCode::NotAFolder).with_path(path)
    }

    pub fn not_a_file(path: impl Into<PathBuf>) -> Self {
        Self::new(ErrorCode::NotAFile).with_path(path)
    }

    pub fn not_writeable(path: impl Into<PathBuf>) -> Self {
        Self::new(ErrorCode::NotWriteable).with_path(path)
    }

    pub fn path_not_absolute(path: impl Into<PathBuf>) -> Self {
        Self::new(ErrorCode::PathNotAbsolute).with_path(path)
    }

    pub fn bad_exit_code(exit_code: i32) -> Self {
        Self::new(ErrorCode::BadExitCode).with_exit_code(exit_code)
    }

    pub fn access_denied() -> Self {
        Self::new(ErrorCode::AccessDenied)
    }

    pub fn missing_option(option: impl Into<String>) -> Self {
        Self::new(ErrorCode::MissingOption).with_option(option)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{error_code: {}", self.error_code)?;
        if let Some(path) = &self.path {
            write!(f, ", path: {}", path.display())?;
        }
        if let Some(option) = &self.option {
            write!(f, ", option: {}", option)?;
        }
        if let Some(exit_code) = self.exit_code {
            write!(f, ", exit-code: {}", exit_code)?;
        }
        f.write_str("}")
    }
}
