//! One-line progress messages for tool activity.

use chatrelay_core::ToolEndSummary;
use serde_json::{Map, Value};

const DETAIL_CHARS: usize = 60;

/// Input fields worth showing, most specific first.
const DETAIL_KEYS: &[&str] = &["query", "url", "file_path", "path", "pattern", "command"];

pub fn tool_started(name: &str, input: &Map<String, Value>) -> String {
    match detail(input) {
        Some(detail) => format!("-> {name}: {detail}"),
        None => format!("-> {name}"),
    }
}

pub fn tool_finished(name: &str, summary: &ToolEndSummary) -> String {
    let elapsed = if summary.duration_ms >= 1000 {
        format!("{:.1}s", summary.duration_ms as f64 / 1000.0)
    } else {
        format!("{}ms", summary.duration_ms)
    };
    match summary.output_preview.as_deref().map(first_line) {
        Some(preview) if !preview.is_empty() => format!("<- {name} ({elapsed}): {preview}"),
        _ => format!("<- {name} ({elapsed})"),
    }
}

fn detail(input: &Map<String, Value>) -> Option<String> {
    DETAIL_KEYS
        .iter()
        .find_map(|key| input.get(*key).and_then(Value::as_str))
        .map(first_line)
}

fn first_line(text: &str) -> String {
    let line = text.lines().next().unwrap_or("").trim();
    if line.chars().count() > DETAIL_CHARS {
        format!("{}...", line.chars().take(DETAIL_CHARS).collect::<String>())
    } else {
        line.to_string()
    }
}
