// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid invocation state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Invocation already resolved as {0}")]
    AlreadyResolved(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
