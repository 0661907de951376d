//! Agent process spawning and termination.
//!
//! Framework-agnostic process handling for the agent CLI:
//! - Spawning with piped stdout/stderr and no stdin
//! - Handing the output pipes to the caller for concurrent draining
//! - Graceful-then-forced termination
//!
//! The agent-specific argument list is built by
//! [`crate::agents::claude::ClaudeConfig`].

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use serde::Serialize;
use tokio::process::{Child, ChildStderr, ChildStdout, Command};

use crate::error::InvokeError;

/// Exit status of an agent process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentExit {
    pub code: Option<i32>,
    pub signal: Option<i32>,
}

impl AgentExit {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

impl From<ExitStatus> for AgentExit {
    fn from(status: ExitStatus) -> Self {
        #[cfg(unix)]
        let signal = {
            use std::os::unix::process::ExitStatusExt;
            status.signal()
        };
        #[cfg(not(unix))]
        let signal = None;

        Self {
            code: status.code(),
            signal,
        }
    }
}

/// Configuration for spawning an agent process.
#[derive(Debug, Clone)]
pub struct SpawnConfig {
    /// Path to the agent binary
    pub binary_path: PathBuf,
    /// Arguments to pass to the binary
    pub args: Vec<String>,
    /// Working directory for the process
    pub working_dir: Option<PathBuf>,
}

impl SpawnConfig {
    /// Create a new spawn config with required fields.
    pub fn new(binary_path: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            binary_path: binary_path.into(),
            args,
            working_dir: None,
        }
    }

    /// Set the working directory.
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Argument list as one string, for logs. Long arguments are shortened.
    pub fn display_args(&self) -> String {
        self.args
            .iter()
            .map(|arg| {
                if arg.chars().count() > 80 {
                    format!("{}...", arg.chars().take(80).collect::<String>())
                } else {
                    arg.clone()
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.binary_path);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(ref dir) = self.working_dir {
            cmd.current_dir(dir);
        }

        cmd
    }
}

/// A running agent process.
pub struct AgentProcess {
    child: Child,
    stdout: Option<ChildStdout>,
    stderr: Option<ChildStderr>,
}

impl AgentProcess {
    /// Spawn the process. A missing executable maps to
    /// [`InvokeError::NotFound`], anything else to
    /// [`InvokeError::SpawnFailure`].
    pub fn spawn(config: &SpawnConfig) -> Result<Self, InvokeError> {
        let mut child = config.command().spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                InvokeError::NotFound
            } else {
                InvokeError::SpawnFailure(e)
            }
        })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        log::debug!(
            "Spawned {} (pid={:?})",
            config.binary_path.display(),
            child.id()
        );

        Ok(Self {
            child,
            stdout,
            stderr,
        })
    }

    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Take the stdout pipe. Returns `None` on the second call.
    pub fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.stdout.take()
    }

    /// Take the stderr pipe. Returns `None` on the second call.
    pub fn take_stderr(&mut self) -> Option<ChildStderr> {
        self.stderr.take()
    }

    /// Wait for the process to exit.
    pub async fn wait(&mut self) -> std::io::Result<AgentExit> {
        self.child.wait().await.map(AgentExit::from)
    }

    /// Stop the process: SIGTERM, up to `grace` to exit, then SIGKILL.
    ///
    /// Always waits for the process to be reaped before returning.
    pub async fn stop(&mut self, grace: Duration) -> Option<AgentExit> {
        if let Ok(Some(status)) = self.child.try_wait() {
            return Some(status.into());
        }

        self.terminate();

        match tokio::time::timeout(grace, self.child.wait()).await {
            Ok(Ok(status)) => return Some(status.into()),
            Ok(Err(err)) => log::warn!("Waiting for agent after SIGTERM failed: {err}"),
            Err(_) => log::warn!(
                "Agent did not exit within {:?} of SIGTERM, killing",
                grace
            ),
        }

        self.kill().await
    }

    /// Force kill the process and wait for it.
    pub async fn kill(&mut self) -> Option<AgentExit> {
        if let Err(err) = self.child.kill().await {
            log::warn!("Failed to kill agent process: {err}");
        }
        self.child.try_wait().ok().flatten().map(AgentExit::from)
    }

    #[cfg(unix)]
    fn terminate(&mut self) {
        if let Some(pid) = self.child.id() {
            // SAFETY: plain signal delivery to our own child, which has not
            // been reaped yet (id() returns None after that).
            unsafe {
                libc::kill(pid as libc::pid_t, libc::SIGTERM);
            }
        }
    }

    #[cfg(not(unix))]
    fn terminate(&mut self) {
        let _ = self.child.start_kill();
    }
}

// ============================================================================
// TESTS
// ============================================================================
