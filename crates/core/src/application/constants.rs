// Invoker constants (No magic values)
use std::time::Duration;

/// Converter location relative to the directory of the running binary
pub const DEFAULT_CONVERTER_RELATIVE_PATH: &str = "bin/html_to_pdf_all";

/// Graceful process shutdown timeout (5 seconds)
/// SIGTERM first, SIGKILL once this elapses
pub const GRACEFUL_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Read buffer size for each converter output stream (8 KiB)
pub const STREAM_CHUNK_SIZE: usize = 8 * 1024;

/// Environment variable overriding the converter executable
pub const ENV_CONVERTER_BIN: &str = "FOLIO_CONVERTER_BIN";

/// Environment variable setting the default timeout in milliseconds
pub const ENV_TIMEOUT_MS: &str = "FOLIO_TIMEOUT_MS";

/// Environment variable toggling live echo of converter output
pub const ENV_ECHO: &str = "FOLIO_ECHO";

/// Environment variable overriding the graceful shutdown timeout
pub const ENV_KILL_GRACE_MS: &str = "FOLIO_KILL_GRACE_MS";
