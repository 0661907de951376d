//! chatrelay-daemon: run one prompt through the agent CLI from a shell.
//!
//! Tool progress goes to stderr, the reply to stdout.

mod status;

use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use async_trait::async_trait;
use chatrelay_core::{
    workspace, AgentResponse, AgentRunner, CallbackError, InvokeRequest, RelayConfig,
    ToolEndSummary, ToolObserver,
};
use clap::Parser;
use serde_json::{Map, Value};

#[derive(Parser)]
#[command(name = "chatrelay-daemon", version, about = "Run a prompt through the Claude CLI")]
struct Cli {
    /// Prompt text. Read from stdin when omitted.
    prompt: Option<String>,

    /// TOML config file.
    #[arg(short, long, env = "CHATRELAY_CONFIG")]
    config: Option<PathBuf>,

    /// Path to the agent executable.
    #[arg(long, env = "CHATRELAY_AGENT_PATH")]
    agent_path: Option<PathBuf>,

    #[arg(short, long, env = "CHATRELAY_MODEL")]
    model: Option<String>,

    #[arg(long)]
    system_prompt: Option<String>,

    /// Timeout in seconds.
    #[arg(short, long, env = "CHATRELAY_TIMEOUT_SECS")]
    timeout: Option<u64>,

    /// Comma-separated tool allowlist. An empty string disables tools.
    #[arg(long)]
    tools: Option<String>,

    /// Print the whole response as JSON.
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn relay_config(&self) -> Result<RelayConfig, chatrelay_core::RelayError> {
        let mut config = match &self.config {
            Some(path) => RelayConfig::load(path)?,
            None => RelayConfig::default(),
        };

        if let Some(ref path) = self.agent_path {
            config.agent_path = Some(path.clone());
        }
        if let Some(ref model) = self.model {
            config.model = model.clone();
        }
        if let Some(secs) = self.timeout {
            config.timeout_secs = secs;
        }
        if let Some(ref tools) = self.tools {
            config.allowed_tools = parse_tools(tools);
        }

        Ok(config)
    }
}

fn parse_tools(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|tool| !tool.is_empty())
        .map(String::from)
        .collect()
}

/// Prints tool progress to stderr.
struct ConsoleObserver;

#[async_trait]
impl ToolObserver for ConsoleObserver {
    async fn on_tool_start(&self, name: &str, input: &Map<String, Value>) -> Result<(), CallbackError> {
        eprintln!("{}", status::tool_started(name, input));
        Ok(())
    }

    async fn on_tool_end(&self, name: &str, summary: &ToolEndSummary) -> Result<(), CallbackError> {
        eprintln!("{}", status::tool_finished(name, summary));
        Ok(())
    }

    async fn on_text(&self, text: &str) -> Result<(), CallbackError> {
        log::debug!("Agent text: {} chars", text.chars().count());
        Ok(())
    }
}

fn print_response(response: &AgentResponse, json: bool) -> Result<(), serde_json::Error> {
    if json {
        println!("{}", serde_json::to_string_pretty(response)?);
        return Ok(());
    }

    if !response.message.is_empty() {
        println!("{}", response.message);
    }
    if let Some(ref error) = response.error {
        eprintln!("error: {error}");
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let config = cli.relay_config()?;

    let prompt = match cli.prompt {
        Some(prompt) => prompt,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    if prompt.trim().is_empty() {
        return Err("empty prompt".into());
    }

    let working_dir = workspace::prepare(&config)?;
    log::info!("Working directory: {}", working_dir.display());

    let runner = AgentRunner::new(config);
    let mut request = InvokeRequest::new(prompt.trim());
    if let Some(system_prompt) = cli.system_prompt {
        request = request.system_prompt(system_prompt);
    }

    let observer = ConsoleObserver;
    // Dropping the invocation kills the child.
    let response = tokio::select! {
        response = runner.invoke(request, Some(&observer)) => response,
        _ = tokio::signal::ctrl_c() => {
            log::warn!("Interrupted");
            return Ok(ExitCode::from(130));
        }
    };

    print_response(&response, cli.json)?;
    Ok(if response.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            log::error!("{err}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tool_lists() {
        assert_eq!(parse_tools("WebSearch, Read"), vec!["WebSearch", "Read"]);
        assert!(parse_tools("").is_empty());
        assert!(parse_tools(" , ").is_empty());
    }

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::parse_from([
            "chatrelay-daemon",
            "--model",
            "opus",
            "--timeout",
            "30",
            "--tools",
            "",
            "hello",
        ]);
        let config = cli.relay_config().unwrap();

        assert_eq!(cli.prompt.as_deref(), Some("hello"));
        assert_eq!(config.model, "opus");
        assert_eq!(config.timeout_secs, 30);
        assert!(config.allowed_tools.is_empty());
    }

    #[test]
    fn defaults_without_flags() {
        let cli = Cli::parse_from(["chatrelay-daemon", "--agent-path", "/opt/claude", "hi"]);
        let config = cli.relay_config().unwrap();

        assert_eq!(config.agent_path, Some(PathBuf::from("/opt/claude")));
        assert_eq!(config.allowed_tools, vec!["WebSearch", "WebFetch", "Read"]);
    }
}
