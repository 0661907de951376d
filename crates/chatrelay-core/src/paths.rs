use std::path::{Path, PathBuf};

/// Executable name looked up on PATH when no explicit path is configured.
pub const AGENT_BINARY_NAME: &str = "claude";

/// Resolve the agent executable.
///
/// An explicit path wins. Otherwise the first `claude` found on PATH is
/// used, and if there is none the bare name is returned so the spawn fails
/// with a not-found error the runner can report.
pub fn resolve_agent_binary(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    find_on_path(AGENT_BINARY_NAME).unwrap_or_else(|| PathBuf::from(AGENT_BINARY_NAME))
}

/// Look up `name` on PATH. Only executable files match.
pub fn find_on_path(name: &str) -> Option<PathBuf> {
    match which::which(name) {
        Ok(path) => Some(path),
        Err(err) => {
            log::debug!("{name} not found on PATH: {err}");
            None
        }
    }
}
