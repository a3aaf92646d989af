//! Result reporting and exit-code mapping

use folio_core::port::{InvokeError, InvokeErrorKind};
use serde::Serialize;

/// Exit code for a missing target directory
pub const EXIT_INVALID_ARGUMENT: i32 = 2;
/// Exit code when the converter cannot be started
pub const EXIT_SPAWN_FAILURE: i32 = 126;
/// Exit code when the deadline elapsed
pub const EXIT_TIMEOUT: i32 = 124;
/// Exit code after Ctrl-C
pub const EXIT_CANCELLED: i32 = 130;
/// Anything else
pub const EXIT_GENERIC: i32 = 1;

/// JSON shape of a failed run
#[derive(Debug, Serialize)]
pub struct ErrorReport {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
}

impl From<&InvokeError> for ErrorReport {
    fn from(err: &InvokeError) -> Self {
        Self {
            message: err.to_string(),
            exit_code: err.exit_code(),
            stderr: err.stderr().map(str::to_string),
        }
    }
}

/// Process exit status for a failed run
pub fn exit_status(err: &InvokeError) -> i32 {
    match err.kind() {
        InvokeErrorKind::InvalidArgument => EXIT_INVALID_ARGUMENT,
        InvokeErrorKind::SpawnFailure => EXIT_SPAWN_FAILURE,
        InvokeErrorKind::ChildProcessFailure => err.exit_code().unwrap_or(EXIT_GENERIC),
        InvokeErrorKind::Timeout => EXIT_TIMEOUT,
        InvokeErrorKind::Cancelled => EXIT_CANCELLED,
        InvokeErrorKind::Io => EXIT_GENERIC,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_exit_code_is_propagated() {
        let err = InvokeError::ChildProcessFailure {
            exit_code: Some(3),
            stderr: "bad".to_string(),
        };
        assert_eq!(exit_status(&err), 3);

        let err = InvokeError::ChildProcessFailure {
            exit_code: None,
            stderr: String::new(),
        };
        assert_eq!(exit_status(&err), EXIT_GENERIC);
    }

    #[test]
    fn test_error_kinds_map_to_fixed_codes() {
        assert_eq!(
            exit_status(&InvokeError::InvalidArgument("x".to_string())),
            EXIT_INVALID_ARGUMENT
        );
        assert_eq!(
            exit_status(&InvokeError::SpawnFailure("x".to_string())),
            EXIT_SPAWN_FAILURE
        );
        assert_eq!(exit_status(&InvokeError::Timeout(10)), EXIT_TIMEOUT);
        assert_eq!(exit_status(&InvokeError::Cancelled), EXIT_CANCELLED);
    }

    #[test]
    fn test_error_report_json_shape() {
        let err = InvokeError::ChildProcessFailure {
            exit_code: Some(2),
            stderr: "bad".to_string(),
        };
        let json = serde_json::to_value(ErrorReport::from(&err)).unwrap();
        assert_eq!(json["exit_code"], 2);
        assert_eq!(json["stderr"], "bad");
        assert_eq!(json["message"], "Converter exited with code: 2\nError: bad");

        let json = serde_json::to_value(ErrorReport::from(&InvokeError::Cancelled)).unwrap();
        assert!(json.get("exit_code").is_none());
        assert!(json.get("stderr").is_none());
    }
}
