//! Relay configuration.
//!
//! Everything the runner needs to know about its environment: which agent
//! binary to run, where, with which default model, tools and timeout.
//! Loaded from TOML; every field has a default so an empty file is valid.
//!
//! ```toml
//! model = "opus"
//! allowed_tools = ["WebSearch", "Read"]
//! timeout_secs = 300
//! working_dir = "/var/lib/chatrelay/agent"
//! mcp_config = "/etc/chatrelay/mcp.json"
//! log_dir = "/var/log/chatrelay"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::RelayError;

/// Default overall budget for one invocation.
pub const DEFAULT_TIMEOUT_SECS: u64 = 180;

/// How long a timed-out agent gets between SIGTERM and SIGKILL.
pub const DEFAULT_KILL_GRACE_SECS: u64 = 5;

pub const DEFAULT_MODEL: &str = "sonnet";

/// Built-in tools the agent may use when the caller doesn't say otherwise.
pub const DEFAULT_ALLOWED_TOOLS: &[&str] = &["WebSearch", "WebFetch", "Read"];

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Explicit agent executable. When unset, `claude` is looked up on PATH.
    pub agent_path: Option<PathBuf>,
    pub model: String,
    pub allowed_tools: Vec<String>,
    pub timeout_secs: u64,
    pub kill_grace_secs: u64,
    /// Working directory the agent runs in.
    pub working_dir: PathBuf,
    /// MCP server config copied into the working directory as `.mcp.json`.
    pub mcp_config: Option<PathBuf>,
    /// Directory for per-invocation transcripts. Disabled when unset.
    pub log_dir: Option<PathBuf>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            agent_path: None,
            model: DEFAULT_MODEL.to_string(),
            allowed_tools: DEFAULT_ALLOWED_TOOLS.iter().map(|t| t.to_string()).collect(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            kill_grace_secs: DEFAULT_KILL_GRACE_SECS,
            working_dir: std::env::temp_dir().join("chatrelay-agent"),
            mcp_config: None,
            log_dir: None,
        }
    }
}

impl RelayConfig {
    /// Load from a TOML file.
    pub fn load(path: &Path) -> Result<Self, RelayError> {
        let raw = std::fs::read_to_string(path).map_err(|e| RelayError::io(path, e))?;
        Self::from_toml(&raw).map_err(|source| RelayError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn kill_grace(&self) -> Duration {
        Duration::from_secs(self.kill_grace_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults() {
        let config = RelayConfig::default();
        assert_eq!(config.model, "sonnet");
        assert_eq!(config.allowed_tools, vec!["WebSearch", "WebFetch", "Read"]);
        assert_eq!(config.timeout(), Duration::from_secs(180));
        assert_eq!(config.kill_grace(), Duration::from_secs(5));
        assert!(config.agent_path.is_none());
        assert!(config.working_dir.ends_with("chatrelay-agent"));
    }

    #[test]
    fn empty_toml_uses_defaults() {
        let config = RelayConfig::from_toml("").unwrap();
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn toml_overrides() {
        let config = RelayConfig::from_toml(
            r#"
            agent_path = "/opt/claude/bin/claude"
            model = "opus"
            allowed_tools = []
            timeout_secs = 30
            log_dir = "/tmp/logs"
            "#,
        )
        .unwrap();

        assert_eq!(config.agent_path, Some(PathBuf::from("/opt/claude/bin/claude")));
        assert_eq!(config.model, "opus");
        assert!(config.allowed_tools.is_empty());
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.log_dir, Some(PathBuf::from("/tmp/logs")));
        assert_eq!(config.kill_grace_secs, DEFAULT_KILL_GRACE_SECS);
    }

    #[test]
    fn load_reports_parse_errors() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("relay.toml");
        std::fs::write(&path, "timeout_secs = \"soon\"").unwrap();

        let err = RelayConfig::load(&path).unwrap_err();
        assert!(matches!(err, RelayError::ConfigParse { .. }));
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempdir().unwrap();
        let err = RelayConfig::load(&dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, RelayError::Io { .. }));
    }
}
