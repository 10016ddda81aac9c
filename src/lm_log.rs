//! Model invocation logging.
//!
//! Every provider call can be appended to a newline-delimited JSON file so a
//! run can be audited after the fact:
//!
//! ```jsonl
//! {"schema_version":1,"ts":1707900000000,"seq":1,"stage":"main_analysis",...}
//! {"schema_version":1,"ts":1707900031000,"seq":2,"stage":"risk_assessment",...}
//! ```
//!
//! Entries for the report call carry `stage: null`.
use crate::stage::StageId;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Current schema version for invocation log entries.
pub const LM_LOG_SCHEMA_VERSION: u32 = 1;

const PROMPT_PREVIEW_BYTES: usize = 500;

/// Outcome of a single model invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LmOutcome {
    Success,
    Failed,
}

/// One model invocation log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LmLogEntry {
    pub schema_version: u32,

    /// Unix timestamp in milliseconds when the entry was finished.
    pub ts: u64,

    /// Invocation number within this run (1-indexed).
    pub seq: u32,

    /// Stage the call belongs to; `None` for report synthesis.
    pub stage: Option<StageId>,

    /// Label passed to the model client.
    pub label: String,

    pub duration_ms: u64,

    pub outcome: LmOutcome,

    pub prompt_bytes: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_bytes: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// First ~500 bytes of the prompt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_preview: Option<String>,
}

/// Builder that times an invocation and produces its log entry.
pub struct LmLogBuilder {
    start: Instant,
    seq: u32,
    stage: Option<StageId>,
    label: String,
    prompt_bytes: usize,
    prompt_preview: Option<String>,
}

impl LmLogBuilder {
    pub fn new(seq: u32, stage: Option<StageId>, label: &str) -> Self {
        Self {
            start: Instant::now(),
            seq,
            stage,
            label: label.to_string(),
            prompt_bytes: 0,
            prompt_preview: None,
        }
    }

    /// Record prompt size and a preview cut on a char boundary.
    pub fn with_prompt(mut self, prompt: &str) -> Self {
        self.prompt_bytes = prompt.len();
        let preview = if prompt.len() > PROMPT_PREVIEW_BYTES {
            let mut cut = PROMPT_PREVIEW_BYTES;
            while !prompt.is_char_boundary(cut) {
                cut -= 1;
            }
            format!("{}...", &prompt[..cut])
        } else {
            prompt.to_string()
        };
        self.prompt_preview = Some(preview);
        self
    }

    pub fn success(self, response: &str) -> LmLogEntry {
        let response_bytes = response.len();
        self.build(LmOutcome::Success, Some(response_bytes), None)
    }

    pub fn failed(self, error: impl Into<String>) -> LmLogEntry {
        self.build(LmOutcome::Failed, None, Some(error.into()))
    }

    fn build(
        self,
        outcome: LmOutcome,
        response_bytes: Option<usize>,
        error: Option<String>,
    ) -> LmLogEntry {
        LmLogEntry {
            schema_version: LM_LOG_SCHEMA_VERSION,
            ts: now_epoch_ms(),
            seq: self.seq,
            stage: self.stage,
            label: self.label,
            duration_ms: self.start.elapsed().as_millis() as u64,
            outcome,
            prompt_bytes: self.prompt_bytes,
            response_bytes,
            error,
            prompt_preview: self.prompt_preview,
        }
    }
}

/// Append-only JSONL sink bound to one file.
#[derive(Debug, Clone)]
pub struct LmLog {
    path: PathBuf,
}

impl LmLog {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, entry: &LmLogEntry) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("create lm_log directory {}", parent.display()))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("open lm_log for append: {}", self.path.display()))?;

        let line = serde_json::to_string(entry).context("serialize lm_log entry")?;
        writeln!(file, "{}", line).context("write lm_log entry")?;
        Ok(())
    }

    /// Load all entries, skipping corrupt lines.
    pub fn load(&self) -> Result<Vec<LmLogEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path)
            .with_context(|| format!("open lm_log: {}", self.path.display()))?;
        let reader = BufReader::new(file);
        let mut entries = Vec::new();

        for (line_num, line) in reader.lines().enumerate() {
            let line = line.with_context(|| format!("read line {} of lm_log", line_num + 1))?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<LmLogEntry>(&line) {
                Ok(entry) => entries.push(entry),
                Err(err) => {
                    tracing::warn!(line = line_num + 1, error = %err, "skip corrupt lm_log entry");
                }
            }
        }

        Ok(entries)
    }
}

fn now_epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as u64
}
