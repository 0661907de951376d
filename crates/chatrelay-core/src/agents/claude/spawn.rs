//! Claude agent spawn configuration.

use std::path::PathBuf;

use crate::spawn::SpawnConfig;

/// Map friendly model names onto the aliases the CLI accepts.
///
/// Unknown names pass through unchanged so full model ids keep working.
pub fn cli_model(model: &str) -> &str {
    match model {
        "claude-opus" | "opus" => "opus",
        "claude-sonnet" | "sonnet" => "sonnet",
        "claude-haiku" | "haiku" => "haiku",
        other => other,
    }
}

/// Configuration options for spawning a Claude agent in print mode.
#[derive(Debug, Clone, Default)]
pub struct ClaudeConfig {
    pub binary_path: PathBuf,
    pub working_dir: Option<PathBuf>,
    pub prompt: String,
    pub model: String,
    pub system_prompt: Option<String>,
    /// Tools the agent may use. Empty means none, never "all".
    pub allowed_tools: Vec<String>,
}

impl ClaudeConfig {
    /// Build a SpawnConfig for Claude CLI.
    ///
    /// `claude -p --model <m> --output-format stream-json --verbose
    /// [--tools <csv> --allowedTools <csv> --permission-mode bypassPermissions]
    /// [--system-prompt <text>] <prompt>`
    pub fn build(self) -> SpawnConfig {
        let mut args = vec![
            "-p".to_string(),
            "--model".to_string(),
            cli_model(&self.model).to_string(),
            "--output-format".to_string(),
            "stream-json".to_string(),
            "--verbose".to_string(),
        ];

        // Non-interactive runs can't answer permission prompts, so the
        // allowed tools are pre-approved.
        if !self.allowed_tools.is_empty() {
            let tools = self.allowed_tools.join(",");
            args.push("--tools".to_string());
            args.push(tools.clone());
            args.push("--allowedTools".to_string());
            args.push(tools);
            args.push("--permission-mode".to_string());
            args.push("bypassPermissions".to_string());
        }

        if let Some(ref system_prompt) = self.system_prompt {
            if !system_prompt.is_empty() {
                args.push("--system-prompt".to_string());
                args.push(system_prompt.clone());
            }
        }

        args.push(self.prompt);

        let config = SpawnConfig::new(self.binary_path, args);
        match self.working_dir {
            Some(dir) => config.working_dir(dir),
            None => config,
        }
    }
}
