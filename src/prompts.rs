//! Prompt assembly for analysis stages and report synthesis.
//!
//! Templates live in `prompts/` and are compiled into the binary. Builders are
//! pure: the same inputs always yield the same prompt text.
use crate::config::ProjectMetadata;
use crate::stage::StageId;

const MAIN_ANALYSIS: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/prompts/main_analysis.md"
));
const REQUIREMENTS_QUALITY: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/prompts/requirements_quality.md"
));
const RISK_ASSESSMENT: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/prompts/risk_assessment.md"
));
const TECHNICAL_COMPLEXITY: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/prompts/technical_complexity.md"
));
const SCOPE_CREEP: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/prompts/scope_creep.md"
));
const STAKEHOLDER_QUESTIONS: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/prompts/stakeholder_questions.md"
));
const ASSUMPTION_EXTRACTION: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/prompts/assumption_extraction.md"
));
const FORMAT_REPORT: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/prompts/format_report.md"
));

/// Build the prompt for one analysis stage.
pub fn build_stage_prompt(stage: StageId, document: &str, metadata: &ProjectMetadata) -> String {
    match stage {
        StageId::MainAnalysis => main_analysis(metadata, document),
        StageId::RequirementsQuality => requirements_quality(document),
        StageId::RiskAssessment => risk_assessment(document),
        StageId::TechnicalComplexity => technical_complexity(document),
        StageId::ScopeCreepDetection => scope_creep_detector(document),
        StageId::StakeholderQuestions => stakeholder_questions(document),
        StageId::AssumptionExtraction => assumption_extractor(document),
    }
}

pub fn main_analysis(metadata: &ProjectMetadata, document: &str) -> String {
    render_template(
        MAIN_ANALYSIS,
        &[
            ("project_name", metadata.project_name.as_str()),
            ("project_type", metadata.project_type.as_str()),
            ("industry", metadata.industry.as_str()),
            ("team_size", metadata.team_size.as_str()),
            ("timeline", metadata.timeline.as_str()),
            ("document", document),
        ],
    )
}

pub fn requirements_quality(document: &str) -> String {
    render_template(REQUIREMENTS_QUALITY, &[("document", document)])
}

pub fn risk_assessment(document: &str) -> String {
    render_template(RISK_ASSESSMENT, &[("document", document)])
}

pub fn technical_complexity(document: &str) -> String {
    render_template(TECHNICAL_COMPLEXITY, &[("document", document)])
}

pub fn scope_creep_detector(document: &str) -> String {
    render_template(SCOPE_CREEP, &[("document", document)])
}

pub fn stakeholder_questions(document: &str) -> String {
    render_template(STAKEHOLDER_QUESTIONS, &[("document", document)])
}

pub fn assumption_extractor(document: &str) -> String {
    render_template(ASSUMPTION_EXTRACTION, &[("document", document)])
}

/// Prompt asking the model to turn the combined analysis into the final report.
pub fn format_report(combined_analysis: &str, stakeholder_questions: &str) -> String {
    render_template(
        FORMAT_REPORT,
        &[
            ("combined_analysis", combined_analysis),
            ("stakeholder_questions", stakeholder_questions),
        ],
    )
}

/// Single-pass `{name}` substitution.
///
/// Substituted values are never rescanned, so braces inside a document or a
/// model response pass through untouched. Unknown placeholders stay literal.
fn render_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let replaced = after.find('}').and_then(|close| {
            let name = &after[..close];
            values
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value, close))
        });
        match replaced {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}
