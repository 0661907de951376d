//! Agent working directory setup.
//!
//! Run once by the caller before the first invocation. Nothing here happens
//! implicitly; a runner assumes the directory already exists.

use std::path::{Path, PathBuf};

use crate::config::RelayConfig;
use crate::error::RelayError;

/// File name the agent CLI reads MCP server definitions from.
pub const MCP_CONFIG_FILE: &str = ".mcp.json";

/// Create the working directory and sync its `.mcp.json`.
///
/// With `mcp_config` set, the file is copied in (replacing any older copy).
/// Without it, a leftover `.mcp.json` is removed so the agent doesn't pick
/// up servers that are no longer configured.
pub fn prepare(config: &RelayConfig) -> Result<PathBuf, RelayError> {
    let dir = &config.working_dir;
    std::fs::create_dir_all(dir).map_err(|e| RelayError::io(dir, e))?;

    sync_mcp_config(dir, config.mcp_config.as_deref())?;

    log::info!("Agent working directory ready: {}", dir.display());
    Ok(dir.clone())
}

fn sync_mcp_config(dir: &Path, source: Option<&Path>) -> Result<(), RelayError> {
    let target = dir.join(MCP_CONFIG_FILE);

    match source {
        Some(source) if source.exists() => {
            std::fs::copy(source, &target).map_err(|e| RelayError::io(source, e))?;
            log::debug!("Copied {} to {}", source.display(), target.display());
        }
        Some(source) => {
            log::warn!("MCP config {} does not exist, skipping", source.display());
            remove_stale(&target)?;
        }
        None => remove_stale(&target)?,
    }

    Ok(())
}

fn remove_stale(target: &Path) -> Result<(), RelayError> {
    if target.exists() {
        std::fs::remove_file(target).map_err(|e| RelayError::io(target, e))?;
        log::debug!("Removed stale {}", target.display());
    }
    Ok(())
}
