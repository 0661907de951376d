//! Tool call correlation.
//!
//! The agent reports a tool invocation twice: a `tool_use` block in an
//! assistant message when it starts, and a `tool_result` block in a later
//! user message when it finishes. [`ToolCorrelator`] pairs the two by id and
//! keeps the ordered list of completed calls.
//!
//! The correlator never calls out to anything. It returns [`ToolNotice`]s
//! and leaves delivery to the caller, so a failing progress callback cannot
//! corrupt correlation state.

use std::collections::HashMap;
use std::time::Instant;

use serde_json::{Map, Value};

use crate::agents::event::{AgentEvent, ContentBlock, ToolCall, ToolEndSummary};

/// Something the caller should be told about.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolNotice {
    /// First sighting of a tool id.
    Started {
        name: String,
        input: Map<String, Value>,
    },
    /// A pending tool got its result.
    Finished {
        name: String,
        summary: ToolEndSummary,
    },
}

#[derive(Debug)]
struct PendingTool {
    started_at: Instant,
    call: ToolCall,
}

/// Matches tool starts to tool results for one invocation.
#[derive(Debug, Default)]
pub struct ToolCorrelator {
    pending: HashMap<String, PendingTool>,
    completed: Vec<ToolCall>,
}

impl ToolCorrelator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process every content block of `event`, in order.
    pub fn observe(&mut self, event: &AgentEvent) -> Vec<ToolNotice> {
        event
            .blocks()
            .iter()
            .filter_map(|block| self.observe_block(block, event.timestamp))
            .collect()
    }

    /// Process one content block received at `at`. Only tool blocks can
    /// produce a notice.
    pub fn observe_block(&mut self, block: &ContentBlock, at: Instant) -> Option<ToolNotice> {
        match block {
            ContentBlock::ToolUse { id, name, input } => self.start(id, name, input, at),
            ContentBlock::ToolResult {
                tool_use_id,
                content,
            } => self.finish(tool_use_id, content, at),
            ContentBlock::Text { .. } | ContentBlock::Other { .. } => None,
        }
    }

    fn start(
        &mut self,
        id: &str,
        name: &str,
        input: &Map<String, Value>,
        at: Instant,
    ) -> Option<ToolNotice> {
        if self.pending.contains_key(id) {
            log::debug!("Ignoring duplicate tool_use for pending id {id}");
            return None;
        }

        self.pending.insert(
            id.to_string(),
            PendingTool {
                started_at: at,
                call: ToolCall::started(id, name, input.clone()),
            },
        );

        Some(ToolNotice::Started {
            name: name.to_string(),
            input: input.clone(),
        })
    }

    fn finish(&mut self, id: &str, content: &Value, at: Instant) -> Option<ToolNotice> {
        let Some(PendingTool {
            started_at,
            mut call,
        }) = self.pending.remove(id)
        else {
            // Never started, or already completed.
            log::debug!("Ignoring tool_result for unknown id {id}");
            return None;
        };

        let elapsed = at.saturating_duration_since(started_at);
        call.output = Some(content.clone());
        call.duration_ms = Some(u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX));

        let summary = ToolEndSummary::for_call(&call);
        let name = call.name.clone();
        self.completed.push(call);

        Some(ToolNotice::Finished { name, summary })
    }

    /// Completed calls, in completion order.
    pub fn completed(&self) -> &[ToolCall] {
        &self.completed
    }

    /// Calls started but not yet finished.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Consume the correlator. Pending calls are dropped.
    pub fn into_completed(self) -> Vec<ToolCall> {
        if !self.pending.is_empty() {
            log::debug!(
                "Dropping {} unfinished tool call(s): {:?}",
                self.pending.len(),
                self.pending.keys().collect::<Vec<_>>()
            );
        }
        self.completed
    }
}

// ============================================================================
// TESTS
// ============================================================================
