// Subprocess invoker implementation
// reason: async-trait, tokio for async process management
use async_trait::async_trait;
use std::io;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::process::{Child, Command};
use tracing::{debug, info, trace, warn};

use folio_core::application::constants::STREAM_CHUNK_SIZE;
use folio_core::domain::error::Result as DomainResult;
use folio_core::domain::{InvocationOutcome, InvocationRequest, InvocationTracker};
use folio_core::port::{CancelToken, InvokeError, ProcessInvoker, TimeProvider};
use folio_core::{EchoMode, InvokerConfig};

// Accumulated stdout, stderr and the exit status of a finished child
type RunResult = Result<(Vec<u8>, Vec<u8>, ExitStatus), InvokeError>;

// Destination for live converter output
type Echo = Box<dyn AsyncWrite + Send + Unpin>;

/// Why a run stopped before the converter exited on its own
enum Interrupt {
    Timeout(Duration),
    Cancelled,
}

/// Subprocess invoker
/// Launches `<executable> <target_dir>` and streams its output back
pub struct SubprocessInvoker {
    config: InvokerConfig,
    time_provider: Arc<dyn TimeProvider>,
}

impl SubprocessInvoker {
    /// Create a new subprocess invoker
    ///
    /// # Arguments
    /// * `config` - Default executable, echo and timeout settings
    /// * `time_provider` - Time provider for duration tracking
    ///
    /// # Example
    /// ```ignore
    /// let invoker = SubprocessInvoker::new(
    ///     InvokerConfig::default().with_executable("/opt/folio/bin/html_to_pdf_all"),
    ///     Arc::new(SystemTimeProvider),
    /// );
    /// ```
    pub fn new(config: InvokerConfig, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            config,
            time_provider,
        }
    }

    fn spawn(&self, program: &Path, target_dir: &str) -> Result<Child, InvokeError> {
        Command::new(program)
            .arg(target_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| InvokeError::SpawnFailure(e.to_string()))
    }

    /// Pump both output streams until EOF, then collect the exit status
    async fn run_to_exit(child: &mut Child, echo: EchoMode) -> RunResult {
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let (stdout_echo, stderr_echo) = echo_targets(echo);

        // Don't `try_join!` so both buffers are drained to completion
        let (stdout_res, stderr_res) = tokio::join!(
            pump(stdout, stdout_echo, "stdout"),
            pump(stderr, stderr_echo, "stderr"),
        );

        let status = child
            .wait()
            .await
            .map_err(|e| InvokeError::Io(e.to_string()))?;

        let stdout = stdout_res.map_err(|e| InvokeError::Io(e.to_string()))?;
        let stderr = stderr_res.map_err(|e| InvokeError::Io(e.to_string()))?;

        Ok((stdout, stderr, status))
    }

    /// Stop the converter: SIGTERM first, then SIGKILL if needed
    async fn terminate(&self, child: &mut Child) {
        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            if let Some(pid) = child.id() {
                info!(pid = %pid, "Sending SIGTERM to converter");
                match kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
                    Ok(()) => {
                        if let Ok(Ok(status)) =
                            tokio::time::timeout(self.config.kill_grace, child.wait()).await
                        {
                            info!(pid = %pid, status = %status, "Converter exited after SIGTERM");
                            return;
                        }
                        warn!(pid = %pid, "Converter did not exit after SIGTERM, sending SIGKILL");
                    }
                    Err(e) => warn!(pid = %pid, error = %e, "SIGTERM failed"),
                }
            }
        }

        if let Err(e) = child.kill().await {
            warn!(error = %e, "Failed to kill converter process");
        }
    }

    /// Record a state change; a second terminal event is ignored
    fn settle(event: DomainResult<()>) {
        if let Err(e) = event {
            warn!(error = %e, "Ignoring invocation event");
        }
    }
}

#[async_trait]
impl ProcessInvoker for SubprocessInvoker {
    async fn invoke(
        &self,
        request: &InvocationRequest,
        mut cancel: CancelToken,
    ) -> Result<InvocationOutcome, InvokeError> {
        request.validate()?;
        if cancel.is_cancelled() {
            return Err(InvokeError::Cancelled);
        }

        let program = request.resolve_executable(&self.config.executable);
        let timeout = request.timeout.or(self.config.timeout);
        let mut tracker = InvocationTracker::new();
        let start_time = self.time_provider.now_millis();

        info!(
            executable = %program.display(),
            target_dir = %request.target_dir,
            timeout_ms = ?timeout.map(|t| t.as_millis()),
            "Starting converter process"
        );

        let mut child = match self.spawn(program, &request.target_dir) {
            Ok(child) => child,
            Err(e) => {
                Self::settle(tracker.fail());
                warn!(executable = %program.display(), error = %e, "Converter failed to start");
                return Err(e);
            }
        };
        Self::settle(tracker.start());
        debug!(pid = ?child.id(), "Converter running");

        let finished = {
            let run = Self::run_to_exit(&mut child, self.config.echo);
            tokio::pin!(run);

            tokio::select! {
                res = &mut run => Ok(res),
                _ = cancel.cancelled() => Err(Interrupt::Cancelled),
                _ = deadline(timeout) => Err(Interrupt::Timeout(timeout.unwrap_or_default())),
            }
        };

        let result = match finished {
            Ok(res) => res,
            Err(interrupt) => {
                self.terminate(&mut child).await;
                Err(match interrupt {
                    Interrupt::Timeout(after) => InvokeError::Timeout(after.as_millis() as u64),
                    Interrupt::Cancelled => InvokeError::Cancelled,
                })
            }
        };

        let duration_ms = self.time_provider.elapsed_since(start_time);

        match result {
            Ok((stdout, stderr, status)) if status.success() => {
                Self::settle(tracker.succeed());
                info!(
                    duration_ms = %duration_ms,
                    "Converter finished successfully"
                );
                Ok(InvocationOutcome::from_streams(
                    &stdout,
                    &stderr,
                    status.code().unwrap_or(0),
                    duration_ms,
                ))
            }
            Ok((_, stderr, status)) => {
                Self::settle(tracker.fail());
                warn!(
                    duration_ms = %duration_ms,
                    exit_code = ?status.code(),
                    "Converter exited with failure"
                );
                Err(InvokeError::ChildProcessFailure {
                    exit_code: status.code(),
                    stderr: String::from_utf8_lossy(&stderr).into_owned(),
                })
            }
            Err(e) => {
                Self::settle(tracker.fail());
                warn!(duration_ms = %duration_ms, error = %e, "Converter run aborted");
                Err(e)
            }
        }
    }
}

/// Writers for converter stdout and stderr under `mode`
fn echo_targets(mode: EchoMode) -> (Option<Echo>, Option<Echo>) {
    match mode {
        EchoMode::Off => (None, None),
        EchoMode::Inherit => (
            Some(Box::new(tokio::io::stdout())),
            Some(Box::new(tokio::io::stderr())),
        ),
        EchoMode::Stderr => (
            Some(Box::new(tokio::io::stderr())),
            Some(Box::new(tokio::io::stderr())),
        ),
    }
}

async fn deadline(timeout: Option<Duration>) {
    match timeout {
        Some(after) => tokio::time::sleep(after).await,
        None => std::future::pending::<()>().await,
    }
}

/// Read `reader` to EOF, keeping every chunk and echoing it to `echo`
async fn pump<R, W>(reader: Option<R>, mut echo: Option<W>, stream: &'static str) -> io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut collected = Vec::new();
    let Some(mut reader) = reader else {
        return Ok(collected);
    };

    let mut buf = vec![0u8; STREAM_CHUNK_SIZE];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        let chunk = &buf[..n];
        collected.extend_from_slice(chunk);
        trace!(stream = stream, bytes = n, "Converter output chunk");

        if let Some(writer) = echo.as_mut() {
            if let Err(e) = forward(writer, chunk).await {
                // Buffering continues even if our own stream went away
                warn!(stream = stream, error = %e, "Stopped echoing converter output");
                echo = None;
            }
        }
    }

    Ok(collected)
}

async fn forward<W: AsyncWrite + Unpin>(writer: &mut W, chunk: &[u8]) -> io::Result<()> {
    writer.write_all(chunk).await?;
    writer.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::port::time_provider::SystemTimeProvider;
    use folio_core::port::{cancel_channel, InvokeErrorKind};

    fn invoker(executable: &str) -> SubprocessInvoker {
        SubprocessInvoker::new(
            InvokerConfig::default()
                .with_executable(executable)
                .with_echo(false)
                .with_kill_grace(Duration::from_secs(1)),
            Arc::new(SystemTimeProvider),
        )
    }

    #[tokio::test]
    async fn test_invoke_success() {
        let outcome = invoker("echo")
            .invoke(&InvocationRequest::new("hello"), CancelToken::never())
            .await
            .unwrap();

        assert_eq!(outcome.exit_code, 0);
        assert_eq!(outcome.stdout, "hello\n");
        assert!(outcome.stderr.is_empty());
    }

    #[tokio::test]
    async fn test_invoke_non_zero_exit() {
        // `sh <script>` only reads the file, so it can be run right after writing
        let dir = std::env::temp_dir().join(format!("folio-infra-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let script = dir.join("bad.sh");
        std::fs::write(&script, "printf bad >&2\nexit 2\n").unwrap();

        let err = invoker("sh")
            .invoke(
                &InvocationRequest::new(script.to_string_lossy()),
                CancelToken::never(),
            )
            .await
            .unwrap_err();

        assert_eq!(err.kind(), InvokeErrorKind::ChildProcessFailure);
        assert_eq!(err.exit_code(), Some(2));
        assert_eq!(err.stderr(), Some("bad"));
        assert_eq!(err.to_string(), "Converter exited with code: 2\nError: bad");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_invoke_spawn_failure() {
        let err = invoker("commandthatdoesntexist")
            .invoke(&InvocationRequest::new("html_files"), CancelToken::never())
            .await
            .unwrap_err();

        assert_eq!(
            err,
            InvokeError::SpawnFailure("No such file or directory (os error 2)".to_string())
        );
        assert_eq!(err.exit_code(), None);
    }

    #[tokio::test]
    async fn test_request_executable_overrides_config() {
        let outcome = invoker("commandthatdoesntexist")
            .invoke(
                &InvocationRequest::new("override").with_executable("echo"),
                CancelToken::never(),
            )
            .await
            .unwrap();

        assert_eq!(outcome.stdout, "override\n");
    }

    #[tokio::test]
    async fn test_whitespace_target_is_passed_through() {
        let outcome = invoker("echo")
            .invoke(&InvocationRequest::new(" "), CancelToken::never())
            .await
            .unwrap();

        assert_eq!(outcome.stdout, " \n");
    }

    #[tokio::test]
    async fn test_empty_target_is_invalid() {
        let err = invoker("echo")
            .invoke(&InvocationRequest::new(""), CancelToken::never())
            .await
            .unwrap_err();

        assert_eq!(
            err,
            InvokeError::InvalidArgument("HTML directory path is required".to_string())
        );
    }

    #[tokio::test]
    async fn test_timeout_terminates_child() {
        let started = std::time::Instant::now();
        let err = invoker("sleep")
            .invoke(
                &InvocationRequest::new("10").with_timeout(Duration::from_millis(200)),
                CancelToken::never(),
            )
            .await
            .unwrap_err();

        assert_eq!(err, InvokeError::Timeout(200));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_cancel_terminates_child() {
        let (handle, token) = cancel_channel();
        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            handle.cancel();
        });

        let started = std::time::Instant::now();
        let err = invoker("sleep")
            .invoke(&InvocationRequest::new("10"), token)
            .await
            .unwrap_err();

        canceller.await.unwrap();
        assert_eq!(err, InvokeError::Cancelled);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_already_cancelled_never_spawns() {
        let (handle, token) = cancel_channel();
        handle.cancel();

        // A missing executable would surface as SpawnFailure if we got that far
        let err = invoker("commandthatdoesntexist")
            .invoke(&InvocationRequest::new("html_files"), token)
            .await
            .unwrap_err();

        assert_eq!(err, InvokeError::Cancelled);
    }

    #[tokio::test]
    async fn test_pump_keeps_and_echoes_chunks() {
        let input: &[u8] = b"abc";
        let mut echoed = Vec::new();

        let collected = pump(Some(input), Some(&mut echoed), "stdout").await.unwrap();

        assert_eq!(collected, b"abc");
        assert_eq!(echoed, b"abc");
    }

    #[tokio::test]
    async fn test_echo_targets_by_mode() {
        let (out, err) = echo_targets(EchoMode::Off);
        assert!(out.is_none() && err.is_none());

        let (out, err) = echo_targets(EchoMode::Stderr);
        assert!(out.is_some() && err.is_some());
    }

    #[tokio::test]
    async fn test_stderr_echo_still_buffers_stdout() {
        let invoker = SubprocessInvoker::new(
            InvokerConfig::default()
                .with_executable("echo")
                .with_echo_mode(EchoMode::Stderr),
            Arc::new(SystemTimeProvider),
        );

        let outcome = invoker
            .invoke(&InvocationRequest::new("hello"), CancelToken::never())
            .await
            .unwrap();

        assert_eq!(outcome.stdout, "hello\n");
    }

    #[tokio::test]
    async fn test_pump_without_reader() {
        let collected = pump(None::<&[u8]>, None::<Vec<u8>>, "stderr").await.unwrap();
        assert!(collected.is_empty());
    }
}
