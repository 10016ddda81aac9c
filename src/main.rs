mod analysis;
mod cli;
mod config;
mod lm;
mod lm_log;
mod metrics;
mod prompts;
mod report;
mod stage;
mod util;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing_subscriber::EnvFilter;

use crate::analysis::{AnalysisOutcome, AnalysisRequest, ScopeAnalyzer, StageResults};
use crate::config::{AnalyzerConfig, ProjectMetadata, StageToggles};
use crate::lm_log::{LmLog, LmOutcome};
use crate::metrics::RiskLevel;
use crate::stage::{StageId, StageSet};

const LOG_ENV: &str = "SCOPE_ANALYZER_LOG";
const PREVIEW_CHARS: usize = 1000;

fn main() -> Result<()> {
    init_tracing();
    let args = cli::RootArgs::parse();
    match args.command {
        cli::Command::Analyze(args) => cmd_analyze(args),
        cli::Command::Info(args) => cmd_info(args),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .ok();
}

/// JSON summary emitted by `analyze --json`.
#[derive(Serialize)]
struct AnalyzeSummary<'a> {
    project: &'a str,
    stages_completed: usize,
    stages: Vec<StageId>,
    failed_stages: Vec<StageId>,
    score: Option<u64>,
    risk_level: RiskLevel,
    report_path: String,
    report: &'a str,
    results: &'a StageResults,
}

fn cmd_analyze(args: cli::AnalyzeArgs) -> Result<()> {
    let mut config = config::load_config(args.config.as_deref())?;
    apply_cli_overrides(&mut config, &args);

    let document = read_document(&args.document)?;
    let metadata = ProjectMetadata {
        project_name: args.project_name.clone(),
        project_type: args.project_type.clone(),
        industry: args.industry.clone(),
        team_size: args.team_size.clone(),
        timeline: args.timeline.clone(),
    };
    let request = AnalysisRequest {
        document,
        metadata,
        stages: config.stages.enabled(),
    };

    // Provider construction fails fast on a missing credential or LM command.
    let analyzer = ScopeAnalyzer::new(&config)?;
    tracing::info!(
        project = %request.metadata.project_name,
        stages = request.stages.len(),
        "analysis start"
    );
    eprintln!("Analyzing: {}", request.metadata.project_name);
    let outcome = analyzer.run(&request);

    let analyzed_at = chrono::Local::now();
    let cwd = std::env::current_dir().context("resolve current directory")?;
    let report_path = match &args.output {
        Some(path) => path.clone(),
        None => report::default_report_path(&cwd, &analyzed_at),
    };
    let document = report::render_report_document(
        &request.metadata,
        outcome.score,
        outcome.risk_level,
        &outcome.report,
        &analyzed_at,
    );
    write_report(&report_path, &document)?;
    let shown_path = util::display_path(&report_path, Some(&cwd));

    if args.json {
        let summary = AnalyzeSummary {
            project: &request.metadata.project_name,
            stages_completed: outcome.results.len(),
            stages: outcome.results.stages(),
            failed_stages: outcome.results.failed_stages(),
            score: outcome.score,
            risk_level: outcome.risk_level,
            report_path: shown_path,
            report: &outcome.report,
            results: &outcome.results,
        };
        let text = serde_json::to_string_pretty(&summary).context("serialize summary")?;
        println!("{text}");
        return Ok(());
    }

    print_summary(&outcome, &shown_path, config.verbose);
    Ok(())
}

fn apply_cli_overrides(config: &mut AnalyzerConfig, args: &cli::AnalyzeArgs) {
    if let Some(model) = &args.model {
        config.model = model.clone();
    }
    if let Some(max_tokens) = args.max_tokens {
        config.max_tokens = max_tokens;
    }
    if let Some(temperature) = args.temperature {
        config.temperature = temperature;
    }
    if let Some(command) = &args.lm_command {
        config.lm_command = Some(command.clone());
    }
    if let Some(path) = &args.lm_log {
        config.lm_log = Some(path.clone());
    }
    if args.verbose {
        config.verbose = true;
    }
    if args.quick {
        config.stages = StageToggles::quick();
    } else if !args.stages.is_empty() {
        let stages: StageSet = args.stages.iter().copied().collect();
        config.stages = StageToggles::from_stages(&stages);
    }
}

fn read_document(path: &Path) -> Result<String> {
    if !path.is_file() {
        return Err(anyhow!("document not found: {}", path.display()));
    }
    let document =
        fs::read_to_string(path).with_context(|| format!("read document {}", path.display()))?;
    if document.trim().is_empty() {
        return Err(anyhow!("document is empty: {}", path.display()));
    }
    Ok(document)
}

fn write_report(path: &Path, document: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    fs::write(path, document).with_context(|| format!("write report {}", path.display()))?;
    Ok(())
}

fn print_summary(outcome: &AnalysisOutcome, report_path: &str, verbose: bool) {
    // A score of 0 prints as 0/100; only a missing score prints N/A.
    let score = outcome
        .score
        .map(|score| score.to_string())
        .unwrap_or_else(|| "N/A".to_string());
    println!();
    println!("Analysis complete");
    println!("  Scope clarity score: {score}/100");
    println!("  Overall risk level: {}", outcome.risk_level);
    println!("  Stages completed: {}", outcome.results.len());
    if outcome.results.is_empty() {
        println!("  No stages were enabled");
    }
    let failed = outcome.results.failed_stages();
    if !failed.is_empty() {
        let keys: Vec<&str> = failed.iter().map(|stage| stage.key()).collect();
        println!("  Failed stages: {}", keys.join(", "));
    }
    println!("  Report saved to: {report_path}");
    println!();
    if verbose {
        println!("{}", outcome.report);
    } else {
        println!("Report preview:");
        println!("{}", util::preview(&outcome.report, PREVIEW_CHARS));
    }
}

fn cmd_info(args: cli::InfoArgs) -> Result<()> {
    let defaults = AnalyzerConfig::default();
    println!("scope-analyzer {}", env!("CARGO_PKG_VERSION"));
    println!("{}", env!("CARGO_PKG_DESCRIPTION"));
    println!();
    println!("Capabilities (run in this order):");
    for stage in StageId::ALL {
        println!("  {:<22} {}", stage.key(), stage.label());
    }
    println!();
    println!("Requirements:");
    println!(
        "  {} (or api_key in the config file), or an LM command via --lm / {}",
        config::API_KEY_ENV,
        config::LM_COMMAND_ENV
    );
    println!();
    println!("Defaults:");
    println!("  model: {} (override with {})", defaults.model, config::MODEL_ENV);
    println!("  max tokens: {}", defaults.max_tokens);
    println!("  temperature: {}", defaults.temperature);
    match config::default_config_path() {
        Some(path) => {
            let state = if path.is_file() { "found" } else { "not found" };
            println!("  config file: {} ({state})", path.display());
        }
        None => println!("  config file: unavailable (no user config directory)"),
    }
    println!("  log filter: {LOG_ENV} (default warn)");
    println!();
    println!("Usage:");
    println!("  scope-analyzer analyze <DOCUMENT> [--name NAME] [--quick] [--output PATH]");

    if let Some(path) = args.lm_log {
        println!();
        print_lm_log_summary(&LmLog::new(path))?;
    }
    Ok(())
}

fn print_lm_log_summary(log: &LmLog) -> Result<()> {
    let entries = log.load()?;
    let failed = entries
        .iter()
        .filter(|entry| entry.outcome == LmOutcome::Failed)
        .count();
    let total_ms: u64 = entries.iter().map(|entry| entry.duration_ms).sum();
    println!("Invocation log: {}", log.path().display());
    println!(
        "  calls: {}, failed: {failed}, total time: {total_ms} ms",
        entries.len()
    );
    for entry in &entries {
        let outcome = match entry.outcome {
            LmOutcome::Success => "ok",
            LmOutcome::Failed => "failed",
        };
        println!(
            "  #{:<3} {:<30} {:>8} ms  {outcome}",
            entry.seq, entry.label, entry.duration_ms
        );
        if let Some(error) = &entry.error {
            println!("       {}", util::preview(error, 120));
        }
    }
    Ok(())
}
