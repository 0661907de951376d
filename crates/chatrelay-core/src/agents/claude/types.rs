//! Claude-specific JSON types for stream parsing.
//!
//! These structs mirror the JSON lines that `claude -p --output-format
//! stream-json --verbose` prints. Every field the parser does not strictly
//! need is optional so that schema additions on the CLI side never break
//! decoding.
//!
//! # Example
//!
//! ```json
//! {"type":"assistant","message":{"role":"assistant","content":[{"type":"text","text":"Hi"}]}}
//! {"type":"user","message":{"role":"user","content":[{"type":"tool_result","tool_use_id":"t1","content":"ok"}]}}
//! {"type":"result","result":"Hi","usage":{"input_tokens":10,"output_tokens":5}}
//! ```

use serde::Deserialize;

use crate::agents::event::Usage;

/// A Claude stream event (one line of output).
///
/// Different event types populate different optional fields.
#[derive(Debug, Clone, Deserialize)]
pub struct ClaudeStreamEvent {
    /// The event type ("assistant", "user", "result", "system", ...).
    ///
    /// `type` is a Rust keyword, hence the rename.
    #[serde(rename = "type")]
    pub event_type: String,

    /// Message body for "assistant" and "user" events.
    #[serde(default)]
    pub message: Option<MessageBody>,

    /// Final answer text for "result" events.
    #[serde(default)]
    pub result: Option<String>,

    /// Token usage for "result" events.
    #[serde(default)]
    pub usage: Option<Usage>,
}

/// The `message` object of an "assistant" or "user" event.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageBody {
    #[serde(default)]
    pub content: MessageContent,
}

/// Message content is usually a block array, but echoed user prompts may
/// arrive as a bare string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Blocks(Vec<RawContentBlock>),
    Text(String),
}

impl Default for MessageContent {
    fn default() -> Self {
        MessageContent::Blocks(Vec::new())
    }
}

/// A content block as it appears on the wire.
///
/// Type-specific fields are all optional; `block_type` says which ones to
/// read:
/// - `text`: `text`
/// - `tool_use`: `id`, `name`, `input`
/// - `tool_result`: `tool_use_id`, `content`
#[derive(Debug, Clone, Deserialize)]
pub struct RawContentBlock {
    #[serde(rename = "type", default)]
    pub block_type: String,

    #[serde(default)]
    pub text: Option<String>,

    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub name: Option<String>,

    /// Tool input. Shape depends on the tool, e.g. `{"query": "..."}` for
    /// WebSearch or `{"file_path": "..."}` for Read.
    #[serde(default)]
    pub input: Option<serde_json::Value>,

    #[serde(default)]
    pub tool_use_id: Option<String>,

    /// Tool result payload: a string or a structured value (e.g. a list of
    /// text/image blocks). Passed through untouched.
    #[serde(default)]
    pub content: Option<serde_json::Value>,
}

// ============================================================================
// TESTS
// ============================================================================
