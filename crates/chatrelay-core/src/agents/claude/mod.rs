//! Claude protocol parser and spawn configuration.
//!
//! Parses the CLI's stream-json output into [`crate::AgentEvent`]s and
//! builds its print-mode command line.

mod parser;
pub mod spawn;
mod types;

pub use parser::StreamParser;
pub use spawn::{cli_model, ClaudeConfig};
pub use types::*;
