//! # chatrelay-core
//!
//! Runs the Claude CLI on behalf of a chat bot and turns its streamed
//! output into a single reply.
//!
//! The bot layer owns the chat side (authorization, message editing,
//! history). This crate only knows how to:
//!
//! - Spawn the agent CLI for one prompt, with a deadline
//! - Parse its stream-json output as it arrives
//! - Pair tool starts with tool results and report progress
//! - Aggregate the final text and token usage
//!
//! ## Key Concepts
//!
//! - **AgentRunner**: Entry point, one `invoke` per prompt
//! - **ToolObserver**: Progress callbacks during a run
//! - **AgentResponse**: The outcome of a run, successful or not

pub mod agents;
pub mod config;
pub mod error;
pub mod logging;
pub mod paths;
pub mod runner;
pub mod spawn;
pub mod workspace;

// Re-export commonly used types
pub use agents::event::{AgentEvent, AgentResponse, ToolCall, ToolEndSummary};
pub use config::RelayConfig;
pub use error::{CallbackError, InvokeError, RelayError};
pub use runner::{AgentRunner, InvokeRequest, RunState, ToolObserver};
