// Central Error Type for the Application
// Invocation failures stay typed as `InvokeError`; this covers setup only

use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = AppError::Config("FOLIO_TIMEOUT_MS must be milliseconds".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: FOLIO_TIMEOUT_MS must be milliseconds"
        );
    }
}
