// Invocation Domain Model
// One request, one tracker, one outcome per converter run

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::error::{DomainError, Result};

/// Message used when the target directory is missing
pub const MISSING_TARGET_MESSAGE: &str = "HTML directory path is required";

/// Invocation State
///
/// `Spawning -> Running -> Succeeded | Failed`, or `Spawning -> Failed`
/// when the process never starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvocationState {
    Spawning,
    Running,
    Succeeded,
    Failed,
}

impl InvocationState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, InvocationState::Succeeded | InvocationState::Failed)
    }

    fn can_transition_to(&self, next: InvocationState) -> bool {
        matches!(
            (self, next),
            (InvocationState::Spawning, InvocationState::Running)
                | (InvocationState::Spawning, InvocationState::Failed)
                | (InvocationState::Running, InvocationState::Succeeded)
                | (InvocationState::Running, InvocationState::Failed)
        )
    }
}

impl std::fmt::Display for InvocationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvocationState::Spawning => write!(f, "SPAWNING"),
            InvocationState::Running => write!(f, "RUNNING"),
            InvocationState::Succeeded => write!(f, "SUCCEEDED"),
            InvocationState::Failed => write!(f, "FAILED"),
        }
    }
}

/// Tracks the lifecycle of a single invocation.
///
/// Only the first terminal event resolves the tracker; anything after
/// that is rejected with [`DomainError::AlreadyResolved`].
#[derive(Debug)]
pub struct InvocationTracker {
    state: InvocationState,
}

impl InvocationTracker {
    pub fn new() -> Self {
        Self {
            state: InvocationState::Spawning,
        }
    }

    pub fn state(&self) -> InvocationState {
        self.state
    }

    pub fn is_resolved(&self) -> bool {
        self.state.is_terminal()
    }

    /// Move to `next`, enforcing the allowed edges
    pub fn advance(&mut self, next: InvocationState) -> Result<()> {
        if self.state.is_terminal() {
            return Err(DomainError::AlreadyResolved(self.state.to_string()));
        }
        if !self.state.can_transition_to(next) {
            return Err(DomainError::InvalidStateTransition {
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }
        self.state = next;
        Ok(())
    }

    /// Transition to Running once the child process exists
    pub fn start(&mut self) -> Result<()> {
        self.advance(InvocationState::Running)
    }

    /// Resolve as Succeeded (clean exit)
    pub fn succeed(&mut self) -> Result<()> {
        self.advance(InvocationState::Succeeded)
    }

    /// Resolve as Failed (spawn failure, non-zero exit, timeout, cancel)
    pub fn fail(&mut self) -> Result<()> {
        self.advance(InvocationState::Failed)
    }
}

impl Default for InvocationTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Invocation Request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvocationRequest {
    /// Directory handed to the converter as its only argument
    pub target_dir: String,

    /// Converter override; falls back to the configured executable
    #[serde(default)]
    pub executable: Option<PathBuf>,

    /// Deadline override; falls back to the configured timeout
    #[serde(default)]
    pub timeout: Option<Duration>,
}

impl InvocationRequest {
    pub fn new(target_dir: impl Into<String>) -> Self {
        Self {
            target_dir: target_dir.into(),
            executable: None,
            timeout: None,
        }
    }

    pub fn with_executable(mut self, executable: impl Into<PathBuf>) -> Self {
        self.executable = Some(executable.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Check the target directory is present before anything touches the OS
    pub fn validate(&self) -> Result<()> {
        if self.target_dir.is_empty() {
            return Err(DomainError::ValidationError(
                MISSING_TARGET_MESSAGE.to_string(),
            ));
        }
        Ok(())
    }

    /// Executable to launch, given the configured default
    pub fn resolve_executable<'a>(&'a self, default: &'a Path) -> &'a Path {
        self.executable.as_deref().unwrap_or(default)
    }
}

/// Invocation Outcome (successful run)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationOutcome {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub duration_ms: i64,
}

impl InvocationOutcome {
    /// Finalize accumulated stream bytes into an outcome
    pub fn from_streams(stdout: &[u8], stderr: &[u8], exit_code: i32, duration_ms: i64) -> Self {
        Self {
            stdout: String::from_utf8_lossy(stdout).into_owned(),
            stderr: String::from_utf8_lossy(stderr).into_owned(),
            exit_code,
            duration_ms,
        }
    }
}
