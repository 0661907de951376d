//! Event model shared by the stream parser, tool correlator and runner.
//!
//! An [`AgentEvent`] is one decoded line of agent output. It only lives for
//! the duration of stream processing. [`ToolCall`] and [`AgentResponse`] are
//! what survives an invocation and gets handed back to the caller.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One decoded line of agent output.
#[derive(Debug, Clone)]
pub struct AgentEvent {
    /// What kind of event this is, with its payload.
    pub kind: EventKind,
    /// When the reader captured the line. Assigned locally, never taken
    /// from the payload.
    pub timestamp: Instant,
}

impl AgentEvent {
    pub fn new(kind: EventKind, timestamp: Instant) -> Self {
        Self { kind, timestamp }
    }

    /// Content blocks carried by message events. Empty for everything else.
    pub fn blocks(&self) -> &[ContentBlock] {
        match &self.kind {
            EventKind::AssistantMessage { content } | EventKind::UserMessage { content } => {
                content
            }
            EventKind::Result { .. } | EventKind::Other { .. } => &[],
        }
    }
}

/// Tagged variant for [`AgentEvent::kind`].
#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    /// `"type": "assistant"` - text fragments and tool invocations.
    AssistantMessage { content: Vec<ContentBlock> },
    /// `"type": "user"` - tool results fed back to the agent.
    UserMessage { content: Vec<ContentBlock> },
    /// `"type": "result"` - the terminal event of a run.
    Result {
        result: Option<String>,
        usage: Option<Usage>,
    },
    /// Anything else (`system`, `stream_event`, ...). Ignored downstream.
    Other { event_type: String },
}

/// A single block inside a message event.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Map<String, Value>,
    },
    /// `content` is opaque: a string or any structured value.
    ToolResult {
        tool_use_id: String,
        content: Value,
    },
    /// Plain content or a block type we don't interpret.
    Other {
        block_type: String,
    },
}

/// Raw token counts reported by a `result` event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub input_tokens: Option<u64>,
    #[serde(default)]
    pub cache_creation_input_tokens: Option<u64>,
    #[serde(default)]
    pub cache_read_input_tokens: Option<u64>,
    #[serde(default)]
    pub output_tokens: Option<u64>,
}

impl Usage {
    /// Base input plus both cache counters, missing values counted as zero.
    /// Saturates at `u64::MAX`.
    pub fn total_input_tokens(&self) -> u64 {
        self.input_tokens
            .unwrap_or(0)
            .saturating_add(self.cache_creation_input_tokens.unwrap_or(0))
            .saturating_add(self.cache_read_input_tokens.unwrap_or(0))
    }
}

/// One invocation of a named tool by the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub input: Map<String, Value>,
    /// `None` until the matching `tool_result` arrives.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    /// `None` until the matching `tool_result` arrives.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl ToolCall {
    pub fn started(id: impl Into<String>, name: impl Into<String>, input: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            input,
            output: None,
            duration_ms: None,
        }
    }
}

/// Maximum number of characters kept in [`ToolEndSummary::output_preview`].
pub const OUTPUT_PREVIEW_CHARS: usize = 200;

/// What `on_tool_end` receives once a tool call completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolEndSummary {
    pub output_preview: Option<String>,
    pub duration_ms: u64,
}

impl ToolEndSummary {
    pub fn for_call(call: &ToolCall) -> Self {
        Self {
            output_preview: call.output.as_ref().and_then(output_preview),
            duration_ms: call.duration_ms.unwrap_or(0),
        }
    }
}

/// First [`OUTPUT_PREVIEW_CHARS`] characters of a tool output.
///
/// Strings are used as-is, structured values are rendered as compact JSON.
/// Empty and null outputs have no preview.
pub fn output_preview(output: &Value) -> Option<String> {
    let rendered = match output {
        Value::Null => return None,
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    if rendered.is_empty() {
        return None;
    }
    Some(rendered.chars().take(OUTPUT_PREVIEW_CHARS).collect())
}

/// Final result of one agent invocation.
///
/// `success == true` implies `error.is_none()`. A failed response may still
/// carry partial `message` text (timeouts keep what was streamed so far).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub tool_calls: Vec<ToolCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_tokens: Option<u64>,
}

impl AgentResponse {
    /// A successful run.
    pub fn completed(
        message: String,
        tool_calls: Vec<ToolCall>,
        input_tokens: Option<u64>,
        output_tokens: Option<u64>,
    ) -> Self {
        Self {
            success: true,
            message,
            error: None,
            tool_calls,
            input_tokens,
            output_tokens,
        }
    }

    /// A failed run with no usable output.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: String::new(),
            error: Some(error.into()),
            tool_calls: Vec::new(),
            input_tokens: None,
            output_tokens: None,
        }
    }

    /// A failed run that still salvaged some output.
    pub fn partial(error: impl Into<String>, message: String, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            message,
            tool_calls,
            ..Self::failed(error)
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
