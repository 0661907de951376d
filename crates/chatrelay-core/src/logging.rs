//! Per-invocation transcript files.
//!
//! Every line the agent prints can be mirrored into
//! `{log_dir}/{log_id}.log` with a timestamp and a direction tag
//! (`ARGS`, `STDOUT`, `STDERR`). Regular diagnostics go through the `log`
//! facade; transcripts are for replaying exactly what the CLI said.

use std::{
    fs::{File, OpenOptions},
    io::Write,
    path::Path,
    sync::{Arc, Mutex},
};

use chrono::{SecondsFormat, Utc};

/// Thread-safe handle to an append-only log file.
pub type LogHandle = Arc<Mutex<Option<File>>>;

/// Current UTC time as ISO 8601 with milliseconds (e.g. 2026-02-04T10:15:30.123Z).
fn utc_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Write a timestamped line to the log file (if present).
pub fn log_line(handle: &LogHandle, direction: &str, data: &str) {
    if let Ok(mut guard) = handle.lock() {
        if let Some(ref mut file) = *guard {
            let ts = utc_timestamp();
            let _ = writeln!(file, "[{}] {}: {}", ts, direction, data.trim_end());
            let _ = file.flush();
        }
    }
}

/// Open (or create) a log file at `{log_dir}/{log_id}.log` and return a shared handle.
///
/// With no `log_dir`, or if the file can't be opened, the handle is empty
/// and [`log_line`] becomes a no-op.
pub fn open_log_file(log_dir: Option<&Path>, log_id: &str) -> LogHandle {
    let file = log_dir.and_then(|dir| {
        let path = dir.join(format!("{}.log", log_id));
        if let Err(err) = std::fs::create_dir_all(dir) {
            log::warn!("Cannot create transcript dir {}: {}", dir.display(), err);
            return None;
        }
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .ok()
    });
    Arc::new(Mutex::new(file))
}

/// Log id for one invocation: UTC time plus process-local sequence.
pub fn invocation_log_id(seq: u64) -> String {
    format!("agent-{}-{:04}", Utc::now().format("%Y%m%dT%H%M%S"), seq)
}
