// Conversion Service - HTML directory to PDF use case

use std::sync::Arc;
use tracing::{error, info};

use crate::domain::{InvocationOutcome, InvocationRequest};
use crate::port::{CancelToken, InvokeError, ProcessInvoker, TimeProvider};

/// Conversion Service
///
/// Validates the request, hands it to the invoker and reports the result.
/// Errors are logged and returned unchanged; nothing is retried.
pub struct ConversionService {
    invoker: Arc<dyn ProcessInvoker>,
    time_provider: Arc<dyn TimeProvider>,
}

impl ConversionService {
    pub fn new(invoker: Arc<dyn ProcessInvoker>, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            invoker,
            time_provider,
        }
    }

    /// Convert every HTML file under `request.target_dir`
    pub async fn convert(
        &self,
        request: InvocationRequest,
        cancel: CancelToken,
    ) -> Result<InvocationOutcome, InvokeError> {
        request.validate()?;

        let start = self.time_provider.now_millis();
        info!(
            target_dir = %request.target_dir,
            executable = ?request.executable,
            "Starting HTML to PDF conversion"
        );

        match self.invoker.invoke(&request, cancel).await {
            Ok(outcome) => {
                info!(
                    target_dir = %request.target_dir,
                    elapsed_ms = self.time_provider.elapsed_since(start),
                    stdout_bytes = outcome.stdout.len(),
                    "HTML to PDF conversion finished successfully"
                );
                Ok(outcome)
            }
            Err(e) => {
                error!(
                    target_dir = %request.target_dir,
                    elapsed_ms = self.time_provider.elapsed_since(start),
                    exit_code = ?e.exit_code(),
                    error = %e,
                    "HTML to PDF conversion failed"
                );
                Err(e)
            }
        }
    }
}
