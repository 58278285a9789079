//! User-facing messages for error records

use crate::domain::error::{ErrorCode, ErrorRecord};

/// Render an error record as the message shown to the user.
///
/// Total: codes outside the known set, and known codes missing the context
/// field their template needs, fall back to `Error: <record>`.
pub fn translate(record: &ErrorRecord) -> String {
    let path = record.path().map(|p| p.display().to_string());

    let message = match (&record.error_code, path, &record.option, record.exit_code) {
        (ErrorCode::DoesNotExist, Some(path), _, _) => Some(format!("Path does not exist: {path}")),
        (ErrorCode::NotAFolder, Some(path), _, _) => Some(format!("Path is not a folder: {path}")),
        (ErrorCode::NotAFile, Some(path), _, _) => Some(format!("Path is not a file: {path}")),
        (ErrorCode::NotWriteable, Some(path), _, _) => {
            Some(format!("Client needs write permission on: {path}"))
        }
        (ErrorCode::PathNotAbsolute, Some(path), _, _) => {
            Some(format!("Path is not absolute: {path}"))
        }
        (ErrorCode::BadExitCode, _, _, Some(status)) => {
            Some(format!("Command exited with status: {status}"))
        }
        (ErrorCode::AccessDenied, _, _, _) => Some("You can't run this.".to_string()),
        (ErrorCode::MissingOption, _, Some(option), _) => {
            Some(format!("Missing required option: {option}"))
        }
        _ => None,
    };

    message.unwrap_or_else(|| format!("Error: {record}"))
}
