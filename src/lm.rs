//! Model providers and the stage-scoped model client.
//!
//! A `CompletionProvider` turns one prompt into one completion or an error.
//! Two providers ship:
//!
//! - `AnthropicProvider` calls the Messages API over HTTPS.
//! - `CommandProvider` pipes the prompt to a local command's stdin and reads
//!   the completion from stdout (`llm`, `ollama run`, wrapper scripts).
//!
//! `ModelClient` wraps a provider and never returns an error: a failed call
//! becomes `StageOutcome::Failed`, which renders as
//! `Error occurred during {label}: {message}` wherever its text is consumed.
use crate::config::{require_api_key, AnalyzerConfig};
use crate::lm_log::{LmLog, LmLogBuilder};
use crate::stage::StageId;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::cell::Cell;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Label used for the report synthesis call.
pub const REPORT_LABEL: &str = "Report Generation";

/// Single-turn text completion capability.
pub trait CompletionProvider {
    fn complete(&self, prompt: &str) -> Result<String>;
}

impl<F> CompletionProvider for F
where
    F: Fn(&str) -> Result<String>,
{
    fn complete(&self, prompt: &str) -> Result<String> {
        self(prompt)
    }
}

/// Build the provider selected by config.
///
/// A configured LM command wins; otherwise the HTTP provider is used and a
/// missing API key is a fatal configuration error.
pub fn build_provider(config: &AnalyzerConfig) -> Result<Box<dyn CompletionProvider>> {
    if let Some(command) = config.lm_command.as_deref() {
        return Ok(Box::new(CommandProvider::new(command)?));
    }
    let api_key = require_api_key(config)?;
    Ok(Box::new(AnthropicProvider::new(api_key, config)))
}

// ============================================================================
// Anthropic Messages API
// ============================================================================

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: [UserMessage<'a>; 1],
}

#[derive(Serialize)]
struct UserMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    #[serde(rename = "type")]
    kind: String,
    message: String,
}

pub struct AnthropicProvider {
    agent: ureq::Agent,
    endpoint: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl AnthropicProvider {
    pub fn new(api_key: &str, config: &AnalyzerConfig) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(REQUEST_TIMEOUT))
            .http_status_as_error(false)
            .build()
            .into();
        Self {
            agent,
            endpoint: format!("{}/v1/messages", config.base_url.trim_end_matches('/')),
            api_key: api_key.to_string(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }

    fn request_body<'a>(&'a self, prompt: &'a str) -> MessagesRequest<'a> {
        MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            messages: [UserMessage {
                role: "user",
                content: prompt,
            }],
        }
    }
}

impl CompletionProvider for AnthropicProvider {
    fn complete(&self, prompt: &str) -> Result<String> {
        let body = self.request_body(prompt);
        let mut response = self
            .agent
            .post(self.endpoint.as_str())
            .header("x-api-key", self.api_key.as_str())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .send_json(&body)
            .context("send request to Anthropic API")?;
        let status = response.status();
        let text = response
            .body_mut()
            .read_to_string()
            .context("read Anthropic API response")?;
        if !status.is_success() {
            return Err(anyhow!(
                "Anthropic API returned {}: {}",
                status.as_u16(),
                api_error_message(&text)
            ));
        }
        parse_messages_response(&text)
    }
}

/// Extract the first text block of a Messages API response.
fn parse_messages_response(raw: &str) -> Result<String> {
    let response: MessagesResponse =
        serde_json::from_str(raw).context("parse Anthropic API response JSON")?;
    response
        .content
        .into_iter()
        .find(|block| block.kind == "text")
        .and_then(|block| block.text)
        .ok_or_else(|| anyhow!("Anthropic API response has no text content"))
}

fn api_error_message(raw: &str) -> String {
    match serde_json::from_str::<ApiErrorEnvelope>(raw) {
        Ok(envelope) => format!("{} ({})", envelope.error.message, envelope.error.kind),
        Err(_) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                "empty response body".to_string()
            } else {
                crate::util::truncate_chars(trimmed, 500)
            }
        }
    }
}

// ============================================================================
// Local LM command
// ============================================================================

pub struct CommandProvider {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandProvider {
    /// Parse the command with shell-words and resolve its program on PATH.
    pub fn new(command: &str) -> Result<Self> {
        let mut argv =
            shell_words::split(command).with_context(|| format!("parse LM command: {command}"))?;
        if argv.is_empty() {
            return Err(anyhow!("LM command is empty"));
        }
        let name = argv.remove(0);
        let program =
            which::which(&name).with_context(|| format!("LM command not found: {name}"))?;
        Ok(Self {
            program,
            args: argv,
        })
    }
}

impl CompletionProvider for CommandProvider {
    fn complete(&self, prompt: &str) -> Result<String> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("spawn LM command: {}", self.program.display()))?;

        // The child may fill stdout before draining stdin.
        let writer = child.stdin.take().map(|mut stdin| {
            let bytes = prompt.as_bytes().to_vec();
            std::thread::spawn(move || stdin.write_all(&bytes))
        });

        let output = child.wait_with_output().context("wait for LM command")?;
        let write_result = match writer {
            Some(handle) => handle
                .join()
                .map_err(|_| anyhow!("LM stdin writer panicked"))?,
            None => Ok(()),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!(
                "LM command failed with {}: {}",
                output.status,
                stderr.trim()
            ));
        }
        write_result.context("write prompt to LM stdin")?;

        String::from_utf8(output.stdout).context("decode LM stdout as UTF-8")
    }
}

// ============================================================================
// Stage-scoped client
// ============================================================================

/// Result of one model invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    Completed(String),
    Failed { label: String, message: String },
}

impl StageOutcome {
    /// Text seen by report synthesis and risk scoring; failures render as the
    /// sentinel error string.
    pub fn text(&self) -> Cow<'_, str> {
        match self {
            StageOutcome::Completed(text) => Cow::Borrowed(text),
            StageOutcome::Failed { label, message } => Cow::Owned(sentinel(label, message)),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, StageOutcome::Failed { .. })
    }

    pub fn into_text(self) -> String {
        match self {
            StageOutcome::Completed(text) => text,
            StageOutcome::Failed { label, message } => sentinel(&label, &message),
        }
    }
}

pub fn sentinel(label: &str, message: &str) -> String {
    format!("Error occurred during {label}: {message}")
}

/// Wraps a provider with error containment, progress output and logging.
pub struct ModelClient {
    provider: Box<dyn CompletionProvider>,
    verbose: bool,
    log: Option<LmLog>,
    seq: Cell<u32>,
}

impl ModelClient {
    pub fn new(provider: Box<dyn CompletionProvider>, verbose: bool) -> Self {
        Self {
            provider,
            verbose,
            log: None,
            seq: Cell::new(0),
        }
    }

    pub fn with_log(mut self, log: LmLog) -> Self {
        self.log = Some(log);
        self
    }

    /// Send one prompt; never fails.
    pub fn invoke(&self, prompt: &str, label: &str) -> StageOutcome {
        self.invoke_for(None, prompt, label)
    }

    pub(crate) fn invoke_for(
        &self,
        stage: Option<StageId>,
        prompt: &str,
        label: &str,
    ) -> StageOutcome {
        if self.verbose {
            eprintln!("Running {label}...");
        }
        let seq = self.seq.get() + 1;
        self.seq.set(seq);
        let entry = LmLogBuilder::new(seq, stage, label).with_prompt(prompt);
        let start = Instant::now();

        let (outcome, entry) = match self.provider.complete(prompt) {
            Ok(text) => {
                tracing::info!(
                    label,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    prompt_bytes = prompt.len(),
                    response_bytes = text.len(),
                    "lm invoke complete"
                );
                let entry = entry.success(&text);
                (StageOutcome::Completed(text), entry)
            }
            Err(err) => {
                let message = format!("{err:#}");
                tracing::warn!(
                    label,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    error = %message,
                    "lm invoke failed"
                );
                eprintln!("Error in {label}: {message}");
                let entry = entry.failed(message.clone());
                (
                    StageOutcome::Failed {
                        label: label.to_string(),
                        message,
                    },
                    entry,
                )
            }
        };

        if let Some(log) = &self.log {
            if let Err(err) = log.append(&entry) {
                let error = format!("{err:#}");
                tracing::warn!(path = %log.path().display(), error = %error, "lm_log append failed");
            }
        }
        outcome
    }
}
