//! Report synthesis and the saved report document.
use crate::analysis::StageResults;
use crate::config::ProjectMetadata;
use crate::lm::{ModelClient, REPORT_LABEL};
use crate::metrics::RiskLevel;
use crate::prompts;
use crate::stage::StageId;
use chrono::{DateTime, TimeZone};
use std::fmt::Display;
use std::path::{Path, PathBuf};

const SECTION_SEPARATOR: &str = "\n\n---\n\n";

/// Join every present stage as `# Heading\n\ntext`, in fixed stage order.
pub fn combine_results(results: &StageResults) -> String {
    results
        .iter()
        .map(|(stage, outcome)| format!("# {}\n\n{}", stage.heading(), outcome.text()))
        .collect::<Vec<_>>()
        .join(SECTION_SEPARATOR)
}

/// Build the report prompt and make the synthesis call.
///
/// On provider failure the sentinel text is returned as the report.
pub fn generate_report(client: &ModelClient, results: &StageResults) -> String {
    eprintln!("\nGenerating final report...");
    let combined = combine_results(results);
    let questions = results
        .text(StageId::StakeholderQuestions)
        .unwrap_or_default();
    let prompt = prompts::format_report(&combined, &questions);
    let report = client.invoke(&prompt, REPORT_LABEL).into_text();
    eprintln!("✓ Report generation complete");
    report
}

/// The markdown document written to disk: a metadata header, then the report.
pub fn render_report_document<Tz>(
    metadata: &ProjectMetadata,
    score: Option<u64>,
    risk_level: RiskLevel,
    report: &str,
    analyzed_at: &DateTime<Tz>,
) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    // A score of 0 renders as 0/100; only a missing score renders N/A.
    let score = score
        .map(|score| score.to_string())
        .unwrap_or_else(|| "N/A".to_string());
    let mut doc = String::new();
    doc.push_str("# Project Scope Analysis Report\n\n");
    doc.push_str(&format!("**Project:** {}\n", metadata.project_name));
    doc.push_str(&format!(
        "**Analysis Date:** {}\n",
        analyzed_at.format("%Y-%m-%d %H:%M:%S")
    ));
    doc.push_str(&format!("**Scope Clarity Score:** {score}/100\n"));
    doc.push_str(&format!("**Overall Risk Level:** {risk_level}\n\n"));
    doc.push_str("---\n\n");
    doc.push_str(report);
    doc
}

/// `reports/scope_analysis_YYYYmmdd_HHMMSS.md` under `base`.
pub fn default_report_path<Tz>(base: &Path, analyzed_at: &DateTime<Tz>) -> PathBuf
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    base.join("reports").join(format!(
        "scope_analysis_{}.md",
        analyzed_at.format("%Y%m%d_%H%M%S")
    ))
}
