// Application Layer - Use Cases

pub mod constants;
pub mod conversion;

// Re-exports
pub use conversion::ConversionService;
