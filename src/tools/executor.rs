//! Command Guard
//!
//! Validates a raw command line against the allowlist, runs it under a hard
//! wall-clock limit and captures its output.

use super::error::CommandError;
use super::launcher::{ProcessLauncher, SystemLauncher};
use super::timeout::WallClockLimit;
use super::validator::{Allowlist, CommandValidator};
use crate::metrics;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::process::ExitStatus;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Maximum bytes kept per stream (1MB)
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 1024 * 1024;

/// How long to keep reading pipes after the process is gone
///
/// Grandchildren can hold a pipe open after their parent was killed; past
/// this point the readers are abandoned and the buffered output is kept.
const READER_GRACE: Duration = Duration::from_secs(1);

const READ_CHUNK: usize = 8 * 1024;

/// Captured result of one command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    /// Standard output (lossy UTF-8, capped)
    pub stdout: String,

    /// Standard error (lossy UTF-8, capped)
    pub stderr: String,

    /// Exit code; a process killed by signal N reports -N
    pub exit_code: i32,

    /// Whether the wall-clock limit expired
    pub timed_out: bool,

    /// Whether stdout exceeded the capture limit
    pub stdout_truncated: bool,

    /// Whether stderr exceeded the capture limit
    pub stderr_truncated: bool,

    /// Execution duration in milliseconds
    pub duration_ms: f64,
}

impl ExecutionOutcome {
    /// Completed in time with exit code zero
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == 0
    }

    /// Get a human-readable summary
    pub fn summary(&self) -> String {
        if self.timed_out {
            format!("Timeout after {:.0}ms", self.duration_ms)
        } else {
            format!(
                "{} (exit code: {}, {:.0}ms, {} bytes output)",
                if self.success() { "Success" } else { "Failed" },
                self.exit_code,
                self.duration_ms,
                self.stdout.len() + self.stderr.len()
            )
        }
    }
}

/// Configuration for guarded execution
#[derive(Debug, Clone)]
pub struct GuardConfig {
    /// Wall-clock budget per command (default: 10 seconds)
    pub timeout: WallClockLimit,

    /// Bytes kept per stream before truncating (default: 1MB)
    pub max_output_bytes: usize,

    /// Working directory for commands (default: inherited)
    pub working_dir: Option<PathBuf>,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            timeout: WallClockLimit::default(),
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            working_dir: None,
        }
    }
}

impl GuardConfig {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: WallClockLimit::new(timeout),
            ..Default::default()
        }
    }

    pub fn max_output_bytes(mut self, bytes: usize) -> Self {
        self.max_output_bytes = bytes;
        self
    }

    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

/// Allowlisted command runner
///
/// # Security
///
/// 1. The base command must be an allowlist key, compared literally
/// 2. Arguments go to the spawn primitive as a vector, never through a shell
/// 3. Every run has a wall-clock limit followed by a forced kill
/// 4. Captured output is capped per stream
#[derive(Debug)]
pub struct CommandGuard<L = SystemLauncher> {
    validator: CommandValidator,
    config: GuardConfig,
    launcher: Arc<L>,
}

impl<L> Clone for CommandGuard<L> {
    fn clone(&self) -> Self {
        Self {
            validator: self.validator.clone(),
            config: self.config.clone(),
            launcher: Arc::clone(&self.launcher),
        }
    }
}

impl Default for CommandGuard<SystemLauncher> {
    fn default() -> Self {
        Self::new(Allowlist::default(), GuardConfig::default())
    }
}

impl CommandGuard<SystemLauncher> {
    pub fn new(allowlist: Allowlist, config: GuardConfig) -> Self {
        Self::with_launcher(allowlist, config, Arc::new(SystemLauncher))
    }
}

impl<L: ProcessLauncher> CommandGuard<L> {
    /// Guard with a custom launcher
    pub fn with_launcher(allowlist: Allowlist, config: GuardConfig, launcher: Arc<L>) -> Self {
        Self {
            validator: CommandValidator::new(allowlist),
            config,
            launcher,
        }
    }

    pub fn allowlist(&self) -> &Allowlist {
        self.validator.allowlist()
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    /// Validate and run `raw_command`
    ///
    /// # Errors
    ///
    /// - `CommandError::Rejected` if tokenization or the allowlist check fails;
    ///   nothing is spawned in that case
    /// - `CommandError::Failure` if the process cannot be spawned
    /// - `CommandError::Timeout` if the limit expires, with partial output
    ///
    /// A non-zero exit code is not an error; it is reported in the outcome.
    pub async fn execute(&self, raw_command: &str) -> Result<ExecutionOutcome, CommandError> {
        let spec = match self.validator.validate(raw_command) {
            Ok(spec) => spec,
            Err(e) => {
                warn!(error = %e, "command rejected");
                metrics::COMMANDS_TOTAL.with_label_values(&[e.kind()]).inc();
                return Err(e);
            }
        };

        let run_id = Uuid::new_v4();
        info!(
            %run_id,
            command = spec.program(),
            args = spec.args().len(),
            timeout_ms = self.config.timeout.duration().as_millis() as u64,
            "executing command"
        );

        let start = Instant::now();
        let mut child = self
            .launcher
            .launch(&spec, self.config.working_dir.as_deref())
            .map_err(|e| {
                warn!(%run_id, command = spec.program(), error = %e, "spawn failed");
                metrics::COMMANDS_TOTAL.with_label_values(&["failure"]).inc();
                CommandError::Failure {
                    command: spec.program().to_string(),
                    message: e.to_string(),
                }
            })?;

        let limit = self.config.max_output_bytes;
        let (stdout_buf, stdout_reader) = spawn_capture(child.stdout.take(), limit);
        let (stderr_buf, stderr_reader) = spawn_capture(child.stderr.take(), limit);

        let (status, timed_out) = match self.config.timeout.run(child.wait()).await {
            Some(Ok(status)) => (Some(status), false),
            Some(Err(e)) => {
                let _ = child.start_kill();
                metrics::COMMANDS_TOTAL.with_label_values(&["failure"]).inc();
                return Err(CommandError::Failure {
                    command: spec.program().to_string(),
                    message: e.to_string(),
                });
            }
            None => {
                warn!(%run_id, command = spec.program(), "command timed out, killing");
                if let Err(e) = child.start_kill() {
                    warn!(%run_id, error = %e, "failed to kill timed out process");
                }
                (child.wait().await.ok(), true)
            }
        };

        finish_capture(stdout_reader).await;
        finish_capture(stderr_reader).await;
        let stdout = take_capture(&stdout_buf);
        let stderr = take_capture(&stderr_buf);

        let duration = start.elapsed();
        let outcome = ExecutionOutcome {
            stdout: String::from_utf8_lossy(&stdout.bytes).into_owned(),
            stderr: String::from_utf8_lossy(&stderr.bytes).into_owned(),
            exit_code: status.map(exit_code_of).unwrap_or(-1),
            timed_out,
            stdout_truncated: stdout.truncated,
            stderr_truncated: stderr.truncated,
            duration_ms: duration.as_secs_f64() * 1000.0,
        };

        metrics::COMMAND_DURATION_SECONDS.observe(duration.as_secs_f64());

        if timed_out {
            metrics::COMMANDS_TOTAL.with_label_values(&["timeout"]).inc();
            return Err(CommandError::Timeout(Box::new(outcome)));
        }

        let label = if outcome.success() { "success" } else { "nonzero_exit" };
        metrics::COMMANDS_TOTAL.with_label_values(&[label]).inc();
        info!(%run_id, command = spec.program(), summary = %outcome.summary(), "command finished");

        Ok(outcome)
    }
}

#[derive(Debug, Default)]
struct CapturedStream {
    bytes: Vec<u8>,
    truncated: bool,
}

type SharedCapture = Arc<Mutex<CapturedStream>>;

/// Start draining `reader` into a shared buffer capped at `limit` bytes
fn spawn_capture<R>(reader: Option<R>, limit: usize) -> (SharedCapture, Option<JoinHandle<()>>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let sink = SharedCapture::default();
    let handle = reader.map(|reader| tokio::spawn(drain(reader, Arc::clone(&sink), limit)));
    (sink, handle)
}

async fn drain<R>(mut reader: R, sink: SharedCapture, limit: usize)
where
    R: AsyncRead + Unpin,
{
    let mut chunk = [0u8; READ_CHUNK];
    loop {
        let n = match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                debug!(error = %e, "output pipe read failed");
                break;
            }
        };

        // Keep reading past the cap so the child never blocks on a full pipe.
        let mut captured = sink.lock().unwrap_or_else(PoisonError::into_inner);
        if captured.truncated {
            continue;
        }
        let room = limit.saturating_sub(captured.bytes.len());
        if n > room {
            captured.bytes.extend_from_slice(&chunk[..room]);
            let keep = utf8_boundary(&captured.bytes);
            captured.bytes.truncate(keep);
            captured.truncated = true;
        } else {
            captured.bytes.extend_from_slice(&chunk[..n]);
        }
    }
}

/// Length of `bytes` without a trailing, incomplete UTF-8 sequence
fn utf8_boundary(bytes: &[u8]) -> usize {
    let len = bytes.len();
    for back in 1..=len.min(4) {
        let byte = bytes[len - back];
        // Skip continuation bytes (10xxxxxx) until the lead byte.
        if byte & 0xC0 == 0x80 {
            continue;
        }
        let width = match byte {
            0xF0..=0xFF => 4,
            0xE0..=0xEF => 3,
            0xC0..=0xDF => 2,
            _ => 1,
        };
        return if width > back { len - back } else { len };
    }
    len
}

async fn finish_capture(handle: Option<JoinHandle<()>>) {
    if let Some(mut handle) = handle {
        if tokio::time::timeout(READER_GRACE, &mut handle).await.is_err() {
            debug!("output pipe still open after exit, abandoning reader");
            handle.abort();
        }
    }
}

fn take_capture(sink: &SharedCapture) -> CapturedStream {
    let mut captured = sink.lock().unwrap_or_else(PoisonError::into_inner);
    std::mem::take(&mut *captured)
}

#[cfg(unix)]
fn exit_code_of(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status
        .code()
        .or_else(|| status.signal().map(|signal| -signal))
        .unwrap_or(-1)
}

#[cfg(not(unix))]
fn exit_code_of(status: ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}
