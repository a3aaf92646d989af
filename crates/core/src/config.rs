// Invoker Configuration
// Injected at construction time; nothing is resolved inside an invocation

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::application::constants::{
    DEFAULT_CONVERTER_RELATIVE_PATH, ENV_CONVERTER_BIN, ENV_ECHO, ENV_KILL_GRACE_MS,
    ENV_TIMEOUT_MS, GRACEFUL_SHUTDOWN_TIMEOUT,
};
use crate::error::{AppError, Result};

/// Where live converter output is forwarded while it runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EchoMode {
    /// Buffer only
    Off,
    /// Converter stdout to our stdout, converter stderr to our stderr
    Inherit,
    /// Both converter streams to our stderr (keeps our stdout clean)
    Stderr,
}

/// Configuration for running the external converter
#[derive(Debug, Clone)]
pub struct InvokerConfig {
    /// Converter used when a request does not name one
    pub executable: PathBuf,

    /// Forward converter stdout/stderr to our own streams while it runs
    pub echo: EchoMode,

    /// Deadline applied when a request does not carry one
    pub timeout: Option<Duration>,

    /// Time between SIGTERM and SIGKILL when stopping the converter
    pub kill_grace: Duration,
}

impl Default for InvokerConfig {
    fn default() -> Self {
        Self {
            executable: default_executable_path(),
            echo: EchoMode::Inherit,
            timeout: None,
            kill_grace: GRACEFUL_SHUTDOWN_TIMEOUT,
        }
    }
}

impl InvokerConfig {
    pub fn with_executable(mut self, executable: impl Into<PathBuf>) -> Self {
        self.executable = executable.into();
        self
    }

    /// `true` echoes each stream to its own counterpart, `false` disables echo
    pub fn with_echo(self, echo: bool) -> Self {
        self.with_echo_mode(if echo { EchoMode::Inherit } else { EchoMode::Off })
    }

    pub fn with_echo_mode(mut self, echo: EchoMode) -> Self {
        self.echo = echo;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_kill_grace(mut self, kill_grace: Duration) -> Self {
        self.kill_grace = kill_grace;
        self
    }

    /// Load configuration from process environment
    ///
    /// # Environment Variables
    ///
    /// - `FOLIO_CONVERTER_BIN`: converter path (`~` is expanded)
    /// - `FOLIO_TIMEOUT_MS`: default deadline in milliseconds
    /// - `FOLIO_ECHO`: `0`, `false` or `off` disables live output, `stderr`
    ///   sends both converter streams to stderr
    /// - `FOLIO_KILL_GRACE_MS`: SIGTERM to SIGKILL delay
    pub fn from_env() -> Result<Self> {
        let vars: HashMap<String, String> = std::env::vars().collect();
        Self::from_vars(&vars)
    }

    /// Same as [`InvokerConfig::from_env`], from an explicit variable map
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(bin) = non_empty(vars, ENV_CONVERTER_BIN) {
            config.executable = PathBuf::from(shellexpand::tilde(bin).into_owned());
        }

        if let Some(ms) = non_empty(vars, ENV_TIMEOUT_MS) {
            config.timeout = Some(Duration::from_millis(parse_millis(ENV_TIMEOUT_MS, ms)?));
        }

        if let Some(echo) = non_empty(vars, ENV_ECHO) {
            config.echo = match echo.to_ascii_lowercase().as_str() {
                "0" | "false" | "off" | "no" => EchoMode::Off,
                "stderr" => EchoMode::Stderr,
                _ => EchoMode::Inherit,
            };
        }

        if let Some(ms) = non_empty(vars, ENV_KILL_GRACE_MS) {
            config.kill_grace = Duration::from_millis(parse_millis(ENV_KILL_GRACE_MS, ms)?);
        }

        Ok(config)
    }
}

/// `<dir of current executable>/bin/html_to_pdf_all`
///
/// Falls back to a path relative to the working directory when the
/// running binary cannot be located.
pub fn default_executable_path() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(DEFAULT_CONVERTER_RELATIVE_PATH)))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONVERTER_RELATIVE_PATH))
}

fn non_empty<'a>(vars: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    vars.get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

fn parse_millis(key: &str, value: &str) -> Result<u64> {
    value
        .parse()
        .map_err(|_| AppError::Config(format!("{} must be milliseconds, got '{}'", key, value)))
}
