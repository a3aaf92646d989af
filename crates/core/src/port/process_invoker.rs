// Process Invoker Port
// Abstraction for running the external HTML to PDF converter

use async_trait::async_trait;
use thiserror::Error;

use super::cancel::CancelToken;
use crate::domain::{DomainError, InvocationOutcome, InvocationRequest};

/// Invocation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvokeError {
    #[error("{0}")]
    InvalidArgument(String),

    #[error("Failed to start converter process: {0}")]
    SpawnFailure(String),

    #[error("Converter exited with code: {}\nError: {stderr}", display_code(.exit_code))]
    ChildProcessFailure {
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("IO error: {0}")]
    Io(String),

    #[error("Converter timed out after {0}ms")]
    Timeout(u64),

    #[error("Converter run was cancelled")]
    Cancelled,
}

fn display_code(code: &Option<i32>) -> String {
    code.map(|c| c.to_string())
        .unwrap_or_else(|| "none (terminated by signal)".to_string())
}

/// Flat error kind, handy for matching and exit-code mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvokeErrorKind {
    InvalidArgument,
    SpawnFailure,
    ChildProcessFailure,
    Io,
    Timeout,
    Cancelled,
}

impl InvokeError {
    pub fn kind(&self) -> InvokeErrorKind {
        match self {
            InvokeError::InvalidArgument(_) => InvokeErrorKind::InvalidArgument,
            InvokeError::SpawnFailure(_) => InvokeErrorKind::SpawnFailure,
            InvokeError::ChildProcessFailure { .. } => InvokeErrorKind::ChildProcessFailure,
            InvokeError::Io(_) => InvokeErrorKind::Io,
            InvokeError::Timeout(_) => InvokeErrorKind::Timeout,
            InvokeError::Cancelled => InvokeErrorKind::Cancelled,
        }
    }

    /// Exit code reported by the converter, if it ran to completion
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            InvokeError::ChildProcessFailure { exit_code, .. } => *exit_code,
            _ => None,
        }
    }

    /// Accumulated stderr of the converter, if it ran to completion
    pub fn stderr(&self) -> Option<&str> {
        match self {
            InvokeError::ChildProcessFailure { stderr, .. } => Some(stderr),
            _ => None,
        }
    }
}

impl From<DomainError> for InvokeError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::ValidationError(msg) => InvokeError::InvalidArgument(msg),
            other => InvokeError::Io(other.to_string()),
        }
    }
}

/// Process Invoker trait
///
/// Implementations:
/// - SubprocessInvoker: spawns the external converter (infra-system)
/// - MockProcessInvoker: canned results for tests
#[async_trait]
pub trait ProcessInvoker: Send + Sync {
    /// Run the converter against `request.target_dir` and wait for it
    ///
    /// # Errors
    /// - InvokeError::InvalidArgument if the target directory is empty
    /// - InvokeError::SpawnFailure if the process cannot be started
    /// - InvokeError::ChildProcessFailure if the converter exits non-zero
    /// - InvokeError::Timeout / InvokeError::Cancelled if stopped early
    async fn invoke(
        &self,
        request: &InvocationRequest,
        cancel: CancelToken,
    ) -> Result<InvocationOutcome, InvokeError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Mock invoker behavior
    #[derive(Debug, Clone)]
    pub enum MockBehavior {
        /// Succeed with the given stdout
        Success(String),
        /// Exit with a non-zero code and stderr
        ExitWith(i32, String),
        /// Fail to spawn with message
        SpawnFail(String),
    }

    /// Mock Process Invoker for testing
    pub struct MockProcessInvoker {
        behavior: Arc<Mutex<MockBehavior>>,
        calls: Arc<Mutex<Vec<InvocationRequest>>>,
    }

    impl MockProcessInvoker {
        pub fn new(behavior: MockBehavior) -> Self {
            Self {
                behavior: Arc::new(Mutex::new(behavior)),
                calls: Arc::new(Mutex::new(Vec::new())),
            }
        }

        pub fn new_success(stdout: impl Into<String>) -> Self {
            Self::new(MockBehavior::Success(stdout.into()))
        }

        pub fn new_exit(code: i32, stderr: impl Into<String>) -> Self {
            Self::new(MockBehavior::ExitWith(code, stderr.into()))
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        pub fn calls(&self) -> Vec<InvocationRequest> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ProcessInvoker for MockProcessInvoker {
        async fn invoke(
            &self,
            request: &InvocationRequest,
            _cancel: CancelToken,
        ) -> Result<InvocationOutcome, InvokeError> {
            self.calls.lock().unwrap().push(request.clone());

            let behavior = self.behavior.lock().unwrap().clone();

            match behavior {
                MockBehavior::Success(stdout) => Ok(InvocationOutcome {
                    stdout,
                    stderr: String::new(),
                    exit_code: 0,
                    duration_ms: 10,
                }),
                MockBehavior::ExitWith(code, stderr) => Err(InvokeError::ChildProcessFailure {
                    exit_code: Some(code),
                    stderr,
                }),
                MockBehavior::SpawnFail(msg) => Err(InvokeError::SpawnFailure(msg)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_failure_message_embeds_code_and_stderr() {
        let err = InvokeError::ChildProcessFailure {
            exit_code: Some(2),
            stderr: "bad".to_string(),
        };
        assert_eq!(err.to_string(), "Converter exited with code: 2\nError: bad");
        assert_eq!(err.exit_code(), Some(2));
        assert_eq!(err.stderr(), Some("bad"));
        assert_eq!(err.kind(), InvokeErrorKind::ChildProcessFailure);
    }

    #[test]
    fn test_signal_termination_has_no_code() {
        let err = InvokeError::ChildProcessFailure {
            exit_code: None,
            stderr: String::new(),
        };
        assert!(err.to_string().contains("terminated by signal"));
        assert_eq!(err.exit_code(), None);
    }

    #[test]
    fn test_spawn_failure_carries_no_code() {
        let err = InvokeError::SpawnFailure("No such file or directory (os error 2)".to_string());
        assert_eq!(
            err.to_string(),
            "Failed to start converter process: No such file or directory (os error 2)"
        );
        assert_eq!(err.exit_code(), None);
        assert_eq!(err.stderr(), None);
    }

    #[test]
    fn test_validation_error_maps_to_invalid_argument() {
        let err: InvokeError =
            DomainError::ValidationError("HTML directory path is required".to_string()).into();
        assert_eq!(err.kind(), InvokeErrorKind::InvalidArgument);
        assert_eq!(err.to_string(), "HTML directory path is required");
    }
}
