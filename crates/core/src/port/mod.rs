// Port Layer - Interfaces for external dependencies

pub mod cancel;
pub mod process_invoker;
pub mod time_provider;

// Re-exports
pub use cancel::{cancel_channel, CancelHandle, CancelToken};
pub use process_invoker::{InvokeError, InvokeErrorKind, ProcessInvoker};
pub use time_provider::TimeProvider;
