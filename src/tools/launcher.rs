//! Process Launchers
//!
//! The guard hands a validated `CommandSpec` to a `ProcessLauncher`, which is
//! the only place a process is ever created. Arguments are passed one by
//! one to the spawn primitive; no shell sits in between.

use super::validator::CommandSpec;
use std::io;
use std::path::Path;
use std::process::Stdio;
use tokio::process::{Child, Command};

/// Spawns a child process for a validated command
pub trait ProcessLauncher: Send + Sync + 'static {
    /// Start the process with stdout and stderr piped
    fn launch(&self, spec: &CommandSpec, working_dir: Option<&Path>) -> io::Result<Child>;
}

/// Launcher backed by `tokio::process::Command`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLauncher;

impl ProcessLauncher for SystemLauncher {
    fn launch(&self, spec: &CommandSpec, working_dir: Option<&Path>) -> io::Result<Child> {
        let mut command = Command::new(spec.program());
        command
            .args(spec.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(dir) = working_dir {
            command.current_dir(dir);
        }

        command.spawn()
    }
}
