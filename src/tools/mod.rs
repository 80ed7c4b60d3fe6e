//! Guarded Command Execution
//!
//! This module runs a small allowlist of local diagnostic commands on behalf
//! of remote callers. It enforces strict measures against shell injection.
//!
//! # Security Features
//!
//! - **Command Allowlisting**: only base commands that are allowlist keys run
//! - **List Invocation**: commands are executed as argument vectors, never through a shell
//! - **Timeout Enforcement**: every run has a hard wall-clock limit and a forced kill
//! - **Output Limits**: captured stdout/stderr are capped and truncation is reported
//!
//! # Architecture
//!
//! - `validator.rs`: tokenization, the allowlist and `CommandSpec`
//! - `launcher.rs`: the process spawning seam
//! - `executor.rs`: `CommandGuard`, timeout handling and output capture
//! - `timeout.rs`: wall-clock limits
//! - `error.rs`: rejection, timeout and failure errors
//!
//! # Example
//!
//! ```no_run
//! use netprobe::tools::{Allowlist, CommandGuard, GuardConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let guard = CommandGuard::new(Allowlist::default(), GuardConfig::default());
//!
//!     let outcome = guard.execute("dig +short example.com").await?;
//!     println!("Exit code: {}", outcome.exit_code);
//!     println!("Stdout: {}", outcome.stdout);
//!
//!     Ok(())
//! }
//! ```

mod error;
mod executor;
mod launcher;
mod timeout;
mod validator;

pub use error::{CommandError, RejectionReason};
pub use executor::{CommandGuard, ExecutionOutcome, GuardConfig, DEFAULT_MAX_OUTPUT_BYTES};
pub use launcher::{ProcessLauncher, SystemLauncher};
pub use timeout::WallClockLimit;
pub use validator::{tokenize, Allowlist, CommandSpec, CommandValidator};
