//! Agent invocation.
//!
//! [`AgentRunner::invoke`] runs the agent CLI once for one prompt:
//!
//! 1. Builds the command line and spawns the process
//! 2. Drains stdout and stderr concurrently; every stdout line is buffered,
//!    parsed, correlated, and turned into observer callbacks as it arrives
//! 3. Races all of that plus process exit against a single deadline
//! 4. On timeout, SIGTERM, a grace period, then SIGKILL
//! 5. Assembles an [`AgentResponse`] from whatever state the run ended in
//!
//! Nothing is shared between invocations and nothing needs a lock: the
//! stream state is only touched by the stdout drain while the run is in
//! flight, and by the runner once the race has been decided.

use std::future::Future;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{ChildStderr, ChildStdout};

use crate::agents::aggregate::{aggregate, extract_text, RawLine};
use crate::agents::claude::{ClaudeConfig, StreamParser};
use crate::agents::correlator::{ToolCorrelator, ToolNotice};
use crate::agents::event::{AgentResponse, ContentBlock, EventKind, ToolCall, ToolEndSummary};
use crate::config::RelayConfig;
use crate::error::{CallbackError, InvokeError};
use crate::logging::{invocation_log_id, log_line, open_log_file, LogHandle};
use crate::paths::resolve_agent_binary;
use crate::spawn::{AgentExit, AgentProcess};

/// Progress callbacks, invoked from the stdout drain in event order.
///
/// Errors are logged and otherwise ignored: a failed chat edit must not
/// lose agent output. A slow callback slows down stdout draining (stderr
/// keeps draining independently).
#[async_trait]
pub trait ToolObserver: Send + Sync {
    /// A tool id was seen for the first time.
    async fn on_tool_start(
        &self,
        _name: &str,
        _input: &Map<String, Value>,
    ) -> Result<(), CallbackError> {
        Ok(())
    }

    /// A started tool got its result.
    async fn on_tool_end(&self, _name: &str, _summary: &ToolEndSummary) -> Result<(), CallbackError> {
        Ok(())
    }

    /// A non-empty assistant text block arrived.
    async fn on_text(&self, _text: &str) -> Result<(), CallbackError> {
        Ok(())
    }
}

/// Lifecycle of one invocation. The last four states are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    NotStarted,
    Running,
    Completed,
    TimedOut,
    SpawnFailed,
    Crashed,
}

/// One prompt to run. Unset fields fall back to the runner's config.
#[derive(Debug, Clone, Default)]
pub struct InvokeRequest {
    pub prompt: String,
    pub model: Option<String>,
    pub system_prompt: Option<String>,
    pub timeout: Option<Duration>,
    /// `None` uses the configured defaults; `Some(vec![])` disables tools.
    pub allowed_tools: Option<Vec<String>>,
}

impl InvokeRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn allowed_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_tools = Some(tools.into_iter().map(Into::into).collect());
        self
    }
}

/// Runs the agent CLI. Cheap to share; every call is independent.
pub struct AgentRunner {
    config: RelayConfig,
    binary: PathBuf,
    invocations: AtomicU64,
}

impl AgentRunner {
    /// The working directory is expected to exist already, see
    /// [`crate::workspace::prepare`].
    pub fn new(config: RelayConfig) -> Self {
        let binary = resolve_agent_binary(config.agent_path.as_deref());
        log::debug!("Using agent binary {}", binary.display());
        Self {
            config,
            binary,
            invocations: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    pub fn binary(&self) -> &std::path::Path {
        &self.binary
    }

    /// Run one prompt. Never fails: every outcome is an [`AgentResponse`].
    pub async fn invoke(
        &self,
        request: InvokeRequest,
        observer: Option<&dyn ToolObserver>,
    ) -> AgentResponse {
        self.run(request, observer).await.1
    }

    /// [`invoke`](Self::invoke), also reporting the terminal [`RunState`].
    pub async fn run(
        &self,
        request: InvokeRequest,
        observer: Option<&dyn ToolObserver>,
    ) -> (RunState, AgentResponse) {
        let seq = self.invocations.fetch_add(1, Ordering::Relaxed) + 1;
        let timeout = request.timeout.unwrap_or_else(|| self.config.timeout());
        let spawn_config = ClaudeConfig {
            binary_path: self.binary.clone(),
            working_dir: Some(self.config.working_dir.clone()),
            prompt: request.prompt,
            model: request.model.unwrap_or_else(|| self.config.model.clone()),
            system_prompt: request.system_prompt,
            allowed_tools: request
                .allowed_tools
                .unwrap_or_else(|| self.config.allowed_tools.clone()),
        }
        .build();

        let log = open_log_file(self.config.log_dir.as_deref(), &invocation_log_id(seq));
        log_line(&log, "ARGS", &spawn_config.display_args());
        log::debug!("Agent #{seq} command: {}", spawn_config.display_args());

        let mut state = RunState::NotStarted;

        let mut process = match AgentProcess::spawn(&spawn_config) {
            Ok(process) => process,
            Err(err) => {
                transition(seq, &mut state, RunState::SpawnFailed);
                log::error!("Agent #{seq}: {err}");
                return (state, AgentResponse::failed(err.to_string()));
            }
        };
        transition(seq, &mut state, RunState::Running);

        let started = Instant::now();
        let stdout = process.take_stdout();
        let stderr = process.take_stderr();
        let mut stream = StreamState::new(observer, log.clone());

        let run = async {
            let ((), stderr_text) =
                tokio::join!(drain_stdout(stdout, &mut stream), drain_stderr(stderr, &log));
            (process.wait().await, stderr_text)
        };
        let outcome = tokio::time::timeout(timeout, run).await;

        let response = match outcome {
            Err(_) => {
                transition(seq, &mut state, RunState::TimedOut);
                log::warn!(
                    "Agent #{seq} timed out after {:.1}s, stopping it",
                    started.elapsed().as_secs_f64()
                );
                let exit = process.stop(self.config.kill_grace()).await;
                log::debug!("Agent #{seq} stopped: {exit:?}");

                AgentResponse::partial(
                    InvokeError::Timeout { timeout }.to_string(),
                    extract_text(&stream.lines),
                    stream.into_completed(),
                )
            }
            Ok((Err(err), _)) => {
                transition(seq, &mut state, RunState::Crashed);
                log::error!("Agent #{seq}: failed to wait for process: {err}");
                AgentResponse::failed(format!("failed to wait for agent CLI: {err}"))
            }
            Ok((Ok(exit), stderr_text)) if !exit.success() => {
                transition(seq, &mut state, RunState::Crashed);
                let AgentExit { code, signal } = exit;
                log::warn!("Agent #{seq} exited with code {code:?} (signal {signal:?})");
                AgentResponse::failed(
                    InvokeError::NonZeroExit {
                        code,
                        stderr: stderr_text,
                    }
                    .to_string(),
                )
            }
            Ok((Ok(_), _)) => {
                transition(seq, &mut state, RunState::Completed);
                let agg = aggregate(&stream.lines);
                let tool_calls = stream.into_completed();
                log::info!(
                    "Agent #{seq} finished in {:.1}s: {} tool call(s), tokens in={:?} out={:?}",
                    started.elapsed().as_secs_f64(),
                    tool_calls.len(),
                    agg.input_tokens,
                    agg.output_tokens
                );
                AgentResponse::completed(agg.message, tool_calls, agg.input_tokens, agg.output_tokens)
            }
        };

        (state, response)
    }
}

fn transition(seq: u64, state: &mut RunState, next: RunState) {
    log::debug!("Agent #{seq}: {:?} -> {:?}", state, next);
    *state = next;
}

/// Everything the stdout drain mutates.
struct StreamState<'a> {
    parser: StreamParser,
    correlator: ToolCorrelator,
    lines: Vec<RawLine>,
    observer: Option<&'a dyn ToolObserver>,
    log: LogHandle,
}

impl<'a> StreamState<'a> {
    fn new(observer: Option<&'a dyn ToolObserver>, log: LogHandle) -> Self {
        Self {
            parser: StreamParser::new(),
            correlator: ToolCorrelator::new(),
            lines: Vec::new(),
            observer,
            log,
        }
    }

    async fn handle_line(&mut self, text: String, timestamp: Instant) {
        log_line(&self.log, "STDOUT", &text);
        let event = self.parser.parse_line(&text, timestamp);
        self.lines.push(RawLine::new(timestamp, text));

        let Some(event) = event else {
            return;
        };
        let is_assistant = matches!(event.kind, EventKind::AssistantMessage { .. });

        // Blocks are correlated and reported one at a time, so callbacks
        // follow block order within the event.
        for block in event.blocks() {
            let notice = self.correlator.observe_block(block, event.timestamp);
            let Some(observer) = self.observer else {
                continue;
            };

            match (block, notice) {
                (ContentBlock::Text { text }, _) if is_assistant && !text.is_empty() => {
                    deliver("on_text", observer.on_text(text)).await
                }
                (_, Some(ToolNotice::Started { name, input })) => {
                    deliver("on_tool_start", observer.on_tool_start(&name, &input)).await
                }
                (_, Some(ToolNotice::Finished { name, summary })) => {
                    deliver("on_tool_end", observer.on_tool_end(&name, &summary)).await
                }
                _ => {}
            }
        }
    }

    fn into_completed(self) -> Vec<ToolCall> {
        self.correlator.into_completed()
    }
}

async fn deliver(callback: &'static str, call: impl Future<Output = Result<(), CallbackError>>) {
    if let Err(source) = call.await {
        log::warn!("{}", InvokeError::CallbackFailure { callback, source });
    }
}

/// Read stdout line by line until EOF. Invalid UTF-8 is replaced rather
/// than rejected.
async fn drain_stdout(stdout: Option<ChildStdout>, state: &mut StreamState<'_>) {
    let Some(stdout) = stdout else {
        return;
    };
    let mut reader = BufReader::new(stdout);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let timestamp = Instant::now();
                let text = String::from_utf8_lossy(&buf)
                    .trim_end_matches(|c| c == '\n' || c == '\r')
                    .to_string();
                state.handle_line(text, timestamp).await;
            }
            Err(err) => {
                log::warn!("Error reading agent stdout: {err}");
                break;
            }
        }
    }
}

/// Read all of stderr. Only used as the error message on a failed exit.
async fn drain_stderr(stderr: Option<ChildStderr>, log: &LogHandle) -> String {
    let Some(stderr) = stderr else {
        return String::new();
    };
    let mut buf = Vec::new();
    if let Err(err) = BufReader::new(stderr).read_to_end(&mut buf).await {
        log::warn!("Error reading agent stderr: {err}");
    }

    let text = String::from_utf8_lossy(&buf).trim().to_string();
    for line in text.lines() {
        log_line(log, "STDERR", line);
    }
    text
}

// ============================================================================
// TESTS
// ============================================================================
//
// The subprocess tests run small /bin/sh scripts in place of the agent.
// They only use shell builtins so they don't depend on PATH.
