//! Error types.
//!
//! [`InvokeError`] covers everything that can go wrong during one agent
//! invocation. None of it escapes [`crate::runner::AgentRunner::invoke`]:
//! fatal variants become the `error` text of a failed
//! [`crate::AgentResponse`], the rest are only logged.
//!
//! [`RelayError`] is for setup code (config loading, working directory
//! preparation), which returns `Result` normally.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Failure modes of a single invocation.
#[derive(Error, Debug)]
pub enum InvokeError {
    /// The executable could not be found.
    #[error("agent CLI not found, please make sure it is installed")]
    NotFound,
    /// Any other failure to start the process.
    #[error("failed to start agent CLI: {0}")]
    SpawnFailure(#[source] std::io::Error),
    #[error("agent CLI timed out after {} seconds", seconds(.timeout))]
    Timeout { timeout: Duration },
    /// Exit with a non-zero code. Carries stderr verbatim when there was any.
    #[error("{}", nonzero_exit_message(.code, .stderr))]
    NonZeroExit { code: Option<i32>, stderr: String },
    /// A stdout line that is not a valid event. Skipped.
    #[error("skipping malformed event line: {0}")]
    MalformedEvent(String),
    /// A progress callback returned an error. Logged and ignored.
    #[error("{callback} callback failed: {source}")]
    CallbackFailure {
        callback: &'static str,
        #[source]
        source: CallbackError,
    },
}

fn nonzero_exit_message(code: &Option<i32>, stderr: &str) -> String {
    if !stderr.is_empty() {
        return stderr.to_string();
    }
    match code {
        Some(code) => format!("agent CLI exited with code {code}"),
        None => "agent CLI was terminated by a signal".to_string(),
    }
}

fn seconds(timeout: &Duration) -> String {
    if timeout.subsec_millis() == 0 {
        timeout.as_secs().to_string()
    } else {
        format!("{:.1}", timeout.as_secs_f64())
    }
}

/// Error type returned by [`crate::runner::ToolObserver`] callbacks.
pub type CallbackError = Box<dyn std::error::Error + Send + Sync>;

/// Failures while loading configuration or preparing the working directory.
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl RelayError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RelayError::Io {
            path: path.into(),
            source,
        }
    }
}
