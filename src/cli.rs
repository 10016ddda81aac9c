//! CLI argument parsing for scope analysis.
//!
//! The CLI only gathers inputs and overrides; stage selection and provider
//! choice are resolved against the layered config before the analyzer runs.
use crate::stage::StageId;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "scope-analyzer",
    version,
    about = "Project scope analysis and risk detection driven by a language model",
    after_help = "Examples:\n  scope-analyzer analyze docs/brief.md --name Atlas --industry healthcare\n  scope-analyzer analyze docs/brief.md --quick --output report.md\n  scope-analyzer analyze docs/brief.md --stages main_analysis,risk_assessment --json\n  scope-analyzer analyze docs/brief.md --lm \"ollama run llama3\"\n  scope-analyzer info",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Analyze(AnalyzeArgs),
    Info(InfoArgs),
}

/// Analyze command inputs.
#[derive(Parser, Debug)]
#[command(about = "Analyze a project document and write a markdown report")]
pub struct AnalyzeArgs {
    /// Path to the project document to analyze
    #[arg(value_name = "DOCUMENT")]
    pub document: PathBuf,

    /// Project name
    #[arg(short = 'n', long = "name", default_value = "Unknown Project")]
    pub project_name: String,

    /// Project type
    #[arg(short = 't', long = "type", default_value = "software development")]
    pub project_type: String,

    /// Industry
    #[arg(short = 'i', long, default_value = "technology")]
    pub industry: String,

    /// Team size
    #[arg(short = 's', long, default_value = "not specified")]
    pub team_size: String,

    /// Project timeline
    #[arg(short = 'd', long, default_value = "not specified")]
    pub timeline: String,

    /// Report output path (default: reports/scope_analysis_<timestamp>.md)
    #[arg(short = 'o', long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Print stage progress and the full report
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Quick analysis (main analysis only)
    #[arg(short = 'q', long, conflicts_with = "stages")]
    pub quick: bool,

    /// Comma-separated stage keys to run (overrides config toggles)
    #[arg(long, value_name = "STAGES", value_delimiter = ',')]
    pub stages: Vec<StageId>,

    /// Config file (default: <config dir>/scope-analyzer/config.json if present)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Model identifier for the HTTP provider
    #[arg(long, value_name = "MODEL")]
    pub model: Option<String>,

    /// Maximum output tokens per call
    #[arg(long, value_name = "N")]
    pub max_tokens: Option<u32>,

    /// Sampling temperature (0.0-1.0)
    #[arg(long, value_name = "T")]
    pub temperature: Option<f32>,

    /// Local LM command receiving prompts on stdin (replaces the HTTP provider)
    #[arg(long = "lm", value_name = "CMD")]
    pub lm_command: Option<String>,

    /// Append one JSONL entry per model call to this file
    #[arg(long, value_name = "PATH")]
    pub lm_log: Option<PathBuf>,

    /// Emit a machine-readable JSON summary on stdout
    #[arg(long)]
    pub json: bool,
}

/// Info command inputs.
#[derive(Parser, Debug)]
#[command(about = "Display information about the analyzer")]
pub struct InfoArgs {
    /// Summarize a JSONL invocation log written by `analyze --lm-log`
    #[arg(long, value_name = "PATH")]
    pub lm_log: Option<PathBuf>,
}
