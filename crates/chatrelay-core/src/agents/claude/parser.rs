//! Claude stream parser.
//!
//! Decodes line-by-line JSON output from the Claude CLI into [`AgentEvent`]s.
//!
//! Each line is decoded on its own: deserialized into a
//! [`ClaudeStreamEvent`], then classified into an [`EventKind`] with typed
//! content blocks. Line splitting is the reader's job.
//!
//! Lines that are not JSON are dropped. The CLI may interleave diagnostic
//! text with its event stream, so a bad line is noise, not an error.

use std::time::Instant;

use serde_json::{Map, Value};

use crate::agents::event::{AgentEvent, ContentBlock, EventKind};
use crate::error::InvokeError;

use super::types::{ClaudeStreamEvent, MessageContent, RawContentBlock};

/// Stateless decoder for Claude stream-json lines.
///
/// A run with 200 lines and a run with 5000 lines go through exactly the
/// same path, one line at a time.
#[derive(Debug, Default, Clone, Copy)]
pub struct StreamParser;

impl StreamParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse a single complete line.
    ///
    /// Returns `None` for blank lines and anything that is not a JSON object
    /// with a `type` field.
    pub fn parse_line(&self, line: &str, timestamp: Instant) -> Option<AgentEvent> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }

        match serde_json::from_str::<ClaudeStreamEvent>(trimmed) {
            Ok(event) => Some(AgentEvent::new(classify(event), timestamp)),
            Err(err) => {
                log::trace!("{}", InvokeError::MalformedEvent(err.to_string()));
                None
            }
        }
    }
}

/// Turn a wire event into an [`EventKind`].
fn classify(event: ClaudeStreamEvent) -> EventKind {
    match event.event_type.as_str() {
        "assistant" => EventKind::AssistantMessage {
            content: message_blocks(event.message.map(|m| m.content)),
        },
        "user" => EventKind::UserMessage {
            content: message_blocks(event.message.map(|m| m.content)),
        },
        "result" => EventKind::Result {
            result: event.result,
            usage: event.usage,
        },
        _ => EventKind::Other {
            event_type: event.event_type,
        },
    }
}

fn message_blocks(content: Option<MessageContent>) -> Vec<ContentBlock> {
    match content {
        Some(MessageContent::Blocks(blocks)) => blocks.into_iter().map(convert_block).collect(),
        // A bare string is plain content: nothing for the correlator or the
        // answer text to pick up.
        Some(MessageContent::Text(_)) | None => Vec::new(),
    }
}

fn convert_block(block: RawContentBlock) -> ContentBlock {
    match block.block_type.as_str() {
        "text" => ContentBlock::Text {
            text: block.text.unwrap_or_default(),
        },
        "tool_use" => ContentBlock::ToolUse {
            id: block.id.unwrap_or_default(),
            name: block.name.unwrap_or_default(),
            input: match block.input {
                Some(Value::Object(map)) => map,
                _ => Map::new(),
            },
        },
        "tool_result" => ContentBlock::ToolResult {
            tool_use_id: block.tool_use_id.unwrap_or_default(),
            content: block.content.unwrap_or(Value::String(String::new())),
        },
        _ => ContentBlock::Other {
            block_type: block.block_type,
        },
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(line: &str) -> Option<AgentEvent> {
        StreamParser::new().parse_line(line, Instant::now())
    }

    #[test]
    fn parse_empty_line() {
        assert!(parse("").is_none());
        assert!(parse("   ").is_none());
    }

    #[test]
    fn parse_invalid_json() {
        assert!(parse("not json").is_none());
        assert!(parse(r#"{"type":"assistant","#).is_none());
        assert!(parse("[1,2,3]").is_none());
    }

    #[test]
    fn parse_text_message() {
        let event = parse(
            r#"{"type":"assistant","message":{"role":"assistant","content":[{"type":"text","text":"Hello, world!"}]}}"#,
        )
        .unwrap();

        assert_eq!(
            event.kind,
            EventKind::AssistantMessage {
                content: vec![ContentBlock::Text {
                    text: "Hello, world!".to_string()
                }]
            }
        );
    }

    #[test]
    fn parse_tool_use_block() {
        let event = parse(
            r#"{"type":"assistant","message":{"content":[{"type":"tool_use","id":"t1","name":"search","input":{"query":"weather"}}]}}"#,
        )
        .unwrap();

        match event.blocks() {
            [ContentBlock::ToolUse { id, name, input }] => {
                assert_eq!(id, "t1");
                assert_eq!(name, "search");
                assert_eq!(input.get("query"), Some(&json!("weather")));
            }
            other => panic!("unexpected blocks: {other:?}"),
        }
    }

    #[test]
    fn non_object_tool_input_becomes_empty_map() {
        let event = parse(
            r#"{"type":"assistant","message":{"content":[{"type":"tool_use","id":"t1","name":"x","input":"raw"}]}}"#,
        )
        .unwrap();

        assert!(matches!(
            event.blocks(),
            [ContentBlock::ToolUse { input, .. }] if input.is_empty()
        ));
    }

    #[test]
    fn parse_tool_result_keeps_structured_content() {
        let event = parse(
            r#"{"type":"user","message":{"content":[{"type":"tool_result","tool_use_id":"t1","content":[{"type":"image","source":{"url":"https://x"}}]}]}}"#,
        )
        .unwrap();

        match event.blocks() {
            [ContentBlock::ToolResult {
                tool_use_id,
                content,
            }] => {
                assert_eq!(tool_use_id, "t1");
                assert_eq!(content[0]["source"]["url"], json!("https://x"));
            }
            other => panic!("unexpected blocks: {other:?}"),
        }
    }

    #[test]
    fn parse_result_event() {
        let event =
            parse(r#"{"type":"result","result":"done","usage":{"input_tokens":1,"output_tokens":2}}"#)
                .unwrap();

        match event.kind {
            EventKind::Result { result, usage } => {
                assert_eq!(result.as_deref(), Some("done"));
                assert_eq!(usage.unwrap().output_tokens, Some(2));
            }
            other => panic!("unexpected kind: {other:?}"),
        }
    }

    #[test]
    fn unknown_types_are_tagged_other() {
        let event = parse(r#"{"type":"system","subtype":"init","model":"sonnet"}"#).unwrap();
        assert_eq!(
            event.kind,
            EventKind::Other {
                event_type: "system".to_string()
            }
        );

        let event = parse(
            r#"{"type":"assistant","message":{"content":[{"type":"thinking","thinking":"hmm"}]}}"#,
        )
        .unwrap();
        assert!(matches!(
            event.blocks(),
            [ContentBlock::Other { block_type }] if block_type == "thinking"
        ));
    }

    #[test]
    fn string_content_yields_no_blocks() {
        let event = parse(r#"{"type":"user","message":{"content":"hello"}}"#).unwrap();
        assert!(event.blocks().is_empty());
    }

    #[test]
    fn malformed_line_does_not_affect_following_lines() {
        let parser = StreamParser::new();
        let now = Instant::now();
        let lines = [
            "warning: something on stdout",
            r#"{"type":"assistant","message":{"content":[{"type":"text","text":"after"}]}}"#,
        ];

        let events: Vec<_> = lines
            .iter()
            .filter_map(|line| parser.parse_line(line, now))
            .collect();
        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0].blocks(),
            [ContentBlock::Text { text }] if text == "after"
        ));
    }

    #[test]
    fn trailing_carriage_return_is_ignored() {
        let event = parse("{\"type\":\"result\",\"result\":\"ok\"}\r").unwrap();
        assert!(matches!(event.kind, EventKind::Result { .. }));
    }

    #[test]
    fn long_streams_parse_every_line() {
        let parser = StreamParser::new();
        let now = Instant::now();
        let lines: Vec<String> = (0..5000)
            .map(|i| {
                format!(
                    r#"{{"type":"assistant","message":{{"content":[{{"type":"text","text":"{i}"}}]}}}}"#
                )
            })
            .collect();

        let events: Vec<_> = lines
            .iter()
            .filter_map(|line| parser.parse_line(line, now))
            .collect();
        assert_eq!(events.len(), 5000);
        assert!(matches!(
            events[4999].blocks(),
            [ContentBlock::Text { text }] if text == "4999"
        ));
    }
}
