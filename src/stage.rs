//! Analysis stage catalogue.
//!
//! Stages are a closed, ordered set. The order drives progress output and the
//! iteration order of results; it never affects what a stage computes.
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// One independent unit of the analysis pipeline.
///
/// Variant declaration order is the fixed stage order; `Ord` follows it so
/// ordered collections iterate stages the way the pipeline runs them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StageId {
    #[serde(rename = "main_analysis")]
    MainAnalysis,
    #[serde(rename = "requirements_quality")]
    RequirementsQuality,
    #[serde(rename = "risk_assessment")]
    RiskAssessment,
    #[serde(rename = "technical_complexity")]
    TechnicalComplexity,
    #[serde(rename = "scope_creep")]
    ScopeCreepDetection,
    #[serde(rename = "stakeholder_questions")]
    StakeholderQuestions,
    #[serde(rename = "assumptions")]
    AssumptionExtraction,
}

impl StageId {
    pub const ALL: [StageId; 7] = [
        StageId::MainAnalysis,
        StageId::RequirementsQuality,
        StageId::RiskAssessment,
        StageId::TechnicalComplexity,
        StageId::ScopeCreepDetection,
        StageId::StakeholderQuestions,
        StageId::AssumptionExtraction,
    ];

    /// Result key used in result mappings, JSON output and `--stages`.
    pub fn key(self) -> &'static str {
        match self {
            StageId::MainAnalysis => "main_analysis",
            StageId::RequirementsQuality => "requirements_quality",
            StageId::RiskAssessment => "risk_assessment",
            StageId::TechnicalComplexity => "technical_complexity",
            StageId::ScopeCreepDetection => "scope_creep",
            StageId::StakeholderQuestions => "stakeholder_questions",
            StageId::AssumptionExtraction => "assumptions",
        }
    }

    /// Label passed to the model client; appears in sentinel error text.
    pub fn label(self) -> &'static str {
        match self {
            StageId::MainAnalysis => "Main Analysis",
            StageId::RequirementsQuality => "Requirements Quality Check",
            StageId::RiskAssessment => "Risk Assessment",
            StageId::TechnicalComplexity => "Technical Complexity Analysis",
            StageId::ScopeCreepDetection => "Scope Creep Detection",
            StageId::StakeholderQuestions => "Stakeholder Questions",
            StageId::AssumptionExtraction => "Assumption Extraction",
        }
    }

    /// Report heading derived from the result key.
    pub fn heading(self) -> String {
        title_case_key(self.key())
    }

    pub(crate) fn completion_message(self) -> &'static str {
        match self {
            StageId::MainAnalysis => "Main analysis complete",
            StageId::RequirementsQuality => "Requirements quality check complete",
            StageId::RiskAssessment => "Risk assessment complete",
            StageId::TechnicalComplexity => "Technical complexity analysis complete",
            StageId::ScopeCreepDetection => "Scope creep detection complete",
            StageId::StakeholderQuestions => "Stakeholder questions generated",
            StageId::AssumptionExtraction => "Assumption extraction complete",
        }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for StageId {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        let wanted = raw.trim();
        StageId::ALL
            .into_iter()
            .find(|stage| stage.key() == wanted)
            .ok_or_else(|| {
                let known = StageId::ALL
                    .iter()
                    .map(|stage| stage.key())
                    .collect::<Vec<_>>()
                    .join(", ");
                anyhow!("unknown stage {wanted:?} (expected one of: {known})")
            })
    }
}

/// Set of enabled stages; iterates in fixed stage order.
pub type StageSet = BTreeSet<StageId>;

pub fn all_stages() -> StageSet {
    StageId::ALL.into_iter().collect()
}

/// Underscores become spaces; each word gets an upper-case first letter and
/// lower-case remainder.
pub fn title_case_key(key: &str) -> String {
    key.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_is_in_declaration_order() {
        let mut sorted = StageId::ALL;
        sorted.sort();
        assert_eq!(sorted, StageId::ALL);
        let collected: Vec<StageId> = all_stages().into_iter().collect();
        assert_eq!(collected, StageId::ALL.to_vec());
    }

    #[test]
    fn headings_are_title_cased_keys() {
        assert_eq!(StageId::StakeholderQuestions.heading(), "Stakeholder Questions");
        assert_eq!(StageId::ScopeCreepDetection.heading(), "Scope Creep");
        assert_eq!(StageId::AssumptionExtraction.heading(), "Assumptions");
        assert_eq!(title_case_key("MAIN_analysis"), "Main Analysis");
    }

    #[test]
    fn parses_result_keys() {
        for stage in StageId::ALL {
            assert_eq!(stage.key().parse::<StageId>().unwrap(), stage);
        }
        let err = "scope_creep_detection".parse::<StageId>().unwrap_err();
        assert!(err.to_string().contains("unknown stage"));
    }

    #[test]
    fn serializes_as_result_key() {
        let json = serde_json::to_string(&StageId::AssumptionExtraction).unwrap();
        assert_eq!(json, "\"assumptions\"");
    }
}
