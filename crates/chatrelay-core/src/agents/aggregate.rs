//! Final answer and token extraction from buffered output.
//!
//! Works on the raw lines collected during a run, re-decoding each one. It
//! does not look at the correlator or at anything the live stream handling
//! accumulated, which makes it safe to call on a timed-out run and safe to
//! call more than once.

use std::time::Instant;

use crate::agents::claude::StreamParser;
use crate::agents::event::{ContentBlock, EventKind};

/// One line of agent stdout, as captured by the runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLine {
    pub timestamp: Instant,
    pub text: String,
}

impl RawLine {
    pub fn new(timestamp: Instant, text: impl Into<String>) -> Self {
        Self {
            timestamp,
            text: text.into(),
        }
    }
}

/// What [`aggregate`] extracts from a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Aggregate {
    pub message: String,
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
}

/// Extract the answer text and token counts.
pub fn aggregate(lines: &[RawLine]) -> Aggregate {
    let (input_tokens, output_tokens) = token_counts(lines);
    Aggregate {
        message: extract_text(lines),
        input_tokens,
        output_tokens,
    }
}

/// Join every assistant `text` block with newlines, in arrival order.
///
/// A `result` event's final answer is used when no text has been assembled
/// by the time it is seen.
pub fn extract_text(lines: &[RawLine]) -> String {
    let parser = StreamParser::new();
    let mut text = String::new();

    for event in lines
        .iter()
        .filter_map(|line| parser.parse_line(&line.text, line.timestamp))
    {
        match event.kind {
            EventKind::AssistantMessage { content } => {
                for block in content {
                    if let ContentBlock::Text { text: fragment } = block {
                        if fragment.is_empty() {
                            continue;
                        }
                        if !text.is_empty() {
                            text.push('\n');
                        }
                        text.push_str(&fragment);
                    }
                }
            }
            EventKind::Result {
                result: Some(result),
                ..
            } if text.is_empty() => text = result,
            _ => {}
        }
    }

    text
}

/// Token counts from the first `result` event.
///
/// Input is the sum of base, cache-creation and cache-read tokens. Both are
/// `None` when no result event reported usage.
fn token_counts(lines: &[RawLine]) -> (Option<u64>, Option<u64>) {
    let parser = StreamParser::new();
    let first_result = lines
        .iter()
        .filter_map(|line| parser.parse_line(&line.text, line.timestamp))
        .find_map(|event| match event.kind {
            EventKind::Result { usage, .. } => Some(usage),
            _ => None,
        });

    match first_result {
        Some(Some(usage)) => (Some(usage.total_input_tokens()), usage.output_tokens),
        Some(None) | None => (None, None),
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(texts: &[&str]) -> Vec<RawLine> {
        let now = Instant::now();
        texts.iter().map(|t| RawLine::new(now, *t)).collect()
    }

    #[test]
    fn joins_text_blocks_and_reads_usage() {
        let lines = lines(&[
            r#"{"type":"assistant","message":{"content":[{"type":"text","text":"Hi"}]}}"#,
            r#"{"type":"assistant","message":{"content":[{"type":"text","text":"there"}]}}"#,
            r#"{"type":"result","usage":{"input_tokens":10,"output_tokens":5}}"#,
        ]);

        assert_eq!(
            aggregate(&lines),
            Aggregate {
                message: "Hi\nthere".to_string(),
                input_tokens: Some(10),
                output_tokens: Some(5),
            }
        );
    }

    #[test]
    fn falls_back_to_result_text() {
        let lines = lines(&[
            r#"{"type":"assistant","message":{"content":[{"type":"tool_use","id":"t1","name":"Read","input":{}}]}}"#,
            r#"{"type":"result","result":"Final answer"}"#,
        ]);

        assert_eq!(extract_text(&lines), "Final answer");
    }

    #[test]
    fn result_text_ignored_when_assistant_text_exists() {
        let lines = lines(&[
            r#"{"type":"assistant","message":{"content":[{"type":"text","text":"streamed"}]}}"#,
            r#"{"type":"result","result":"streamed"}"#,
        ]);

        assert_eq!(extract_text(&lines), "streamed");
    }

    #[test]
    fn input_tokens_include_cache_counters() {
        let lines = lines(&[
            r#"{"type":"result","usage":{"input_tokens":3,"cache_creation_input_tokens":100,"cache_read_input_tokens":2000,"output_tokens":7}}"#,
        ]);

        let agg = aggregate(&lines);
        assert_eq!(agg.input_tokens, Some(2103));
        assert_eq!(agg.output_tokens, Some(7));
    }

    #[test]
    fn huge_token_counts_saturate() {
        let lines = lines(&[
            r#"{"type":"result","usage":{"input_tokens":18446744073709551615,"cache_read_input_tokens":1,"output_tokens":3}}"#,
        ]);

        let agg = aggregate(&lines);
        assert_eq!(agg.input_tokens, Some(u64::MAX));
        assert_eq!(agg.output_tokens, Some(3));
    }

    #[test]
    fn only_first_result_counts() {
        let lines = lines(&[
            r#"{"type":"result","usage":{"input_tokens":1,"output_tokens":1}}"#,
            r#"{"type":"result","usage":{"input_tokens":99,"output_tokens":99}}"#,
        ]);

        let agg = aggregate(&lines);
        assert_eq!(agg.input_tokens, Some(1));
        assert_eq!(agg.output_tokens, Some(1));
    }

    #[test]
    fn no_result_means_no_tokens() {
        let lines = lines(&[
            r#"{"type":"assistant","message":{"content":[{"type":"text","text":"partial"}]}}"#,
        ]);

        let agg = aggregate(&lines);
        assert_eq!(agg.message, "partial");
        assert!(agg.input_tokens.is_none());
        assert!(agg.output_tokens.is_none());
    }

    #[test]
    fn result_without_usage_has_no_tokens() {
        let agg = aggregate(&lines(&[r#"{"type":"result","result":"ok"}"#]));
        assert_eq!(agg.message, "ok");
        assert_eq!(agg.input_tokens, None);
    }

    #[test]
    fn skips_malformed_and_empty_text() {
        let lines = lines(&[
            "garbage",
            r#"{"type":"assistant","message":{"content":[{"type":"text","text":""}]}}"#,
            r#"{"type":"assistant","message":{"content":[{"type":"text","text":"kept"}]}}"#,
            r#"{"type":"assistant","#,
        ]);

        assert_eq!(extract_text(&lines), "kept");
    }

    #[test]
    fn aggregation_is_idempotent() {
        let lines = lines(&[
            r#"{"type":"assistant","message":{"content":[{"type":"text","text":"a"}]}}"#,
            r#"{"type":"result","result":"a","usage":{"input_tokens":2,"output_tokens":1}}"#,
        ]);

        let first = aggregate(&lines);
        let second = aggregate(&lines);
        assert_eq!(first, second);
    }

    #[test]
    fn empty_input() {
        assert_eq!(aggregate(&[]), Aggregate::default());
    }
}
