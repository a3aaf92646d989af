// Domain Layer - Pure business logic and entities

pub mod error;
pub mod invocation;

// Re-exports
pub use error::DomainError;
pub use invocation::{InvocationOutcome, InvocationRequest, InvocationState, InvocationTracker};
