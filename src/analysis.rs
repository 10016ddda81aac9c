//! Stage runner and analyzer entry points.
//!
//! Stages are independent: no prompt depends on another stage's output, and a
//! failed stage is stored like any other result so later stages still run.
use crate::config::{validate_config, AnalyzerConfig, ProjectMetadata};
use crate::lm::{build_provider, ModelClient, StageOutcome};
use crate::lm_log::LmLog;
use crate::metrics::{calculate_risk_level, extract_score, RiskLevel};
use crate::prompts::build_stage_prompt;
use crate::report;
use crate::stage::{StageId, StageSet};
use anyhow::Result;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::borrow::Cow;
use std::collections::BTreeMap;

/// Immutable input to one run.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub document: String,
    pub metadata: ProjectMetadata,
    pub stages: StageSet,
}

/// Ordered stage results; only enabled stages appear, in fixed stage order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageResults {
    entries: BTreeMap<StageId, StageOutcome>,
}

impl StageResults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, stage: StageId, outcome: StageOutcome) {
        self.entries.insert(stage, outcome);
    }

    pub fn get(&self, stage: StageId) -> Option<&StageOutcome> {
        self.entries.get(&stage)
    }

    /// Text for a stage, sentinel included; `None` when the stage did not run.
    pub fn text(&self, stage: StageId) -> Option<Cow<'_, str>> {
        self.get(stage).map(StageOutcome::text)
    }

    pub fn iter(&self) -> impl Iterator<Item = (StageId, &StageOutcome)> {
        self.entries.iter().map(|(stage, outcome)| (*stage, outcome))
    }

    pub fn stages(&self) -> Vec<StageId> {
        self.entries.keys().copied().collect()
    }

    pub fn failed_stages(&self) -> Vec<StageId> {
        self.iter()
            .filter(|(_, outcome)| outcome.is_failed())
            .map(|(stage, _)| stage)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Score from the main analysis text (empty when the stage did not run).
    pub fn score(&self) -> Option<u64> {
        let main = self.text(StageId::MainAnalysis).unwrap_or_default();
        extract_score(&main)
    }

    /// Risk tier over every result, failed stages' sentinel text included.
    pub fn risk_level(&self) -> RiskLevel {
        let texts: Vec<Cow<'_, str>> = self.entries.values().map(StageOutcome::text).collect();
        calculate_risk_level(texts.iter().map(|text| text.as_ref()))
    }
}

impl Serialize for StageResults {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (stage, outcome) in &self.entries {
            map.serialize_entry(stage.key(), outcome.text().as_ref())?;
        }
        map.end()
    }
}

/// Everything one run produces.
#[derive(Debug, Clone, serde::Serialize)]
pub struct AnalysisOutcome {
    pub results: StageResults,
    pub report: String,
    pub score: Option<u64>,
    pub risk_level: RiskLevel,
}

/// Orchestrates stage prompts, the model client and report synthesis.
pub struct ScopeAnalyzer {
    client: ModelClient,
}

impl ScopeAnalyzer {
    /// Validate config and build the provider; fails before any stage runs.
    pub fn new(config: &AnalyzerConfig) -> Result<Self> {
        validate_config(config)?;
        let provider = build_provider(config)?;
        let mut client = ModelClient::new(provider, config.verbose);
        if let Some(path) = &config.lm_log {
            client = client.with_log(LmLog::new(path.clone()));
        }
        Ok(Self::from_client(client))
    }

    pub fn from_client(client: ModelClient) -> Self {
        Self { client }
    }

    /// Run every enabled stage in fixed order, one at a time.
    pub fn analyze(&self, request: &AnalysisRequest) -> StageResults {
        let mut results = StageResults::new();
        for stage in StageId::ALL {
            if !request.stages.contains(&stage) {
                continue;
            }
            tracing::debug!(stage = stage.key(), "stage start");
            let prompt = build_stage_prompt(stage, &request.document, &request.metadata);
            let outcome = self.client.invoke_for(Some(stage), &prompt, stage.label());
            tracing::debug!(
                stage = stage.key(),
                failed = outcome.is_failed(),
                "stage finished"
            );
            results.insert(stage, outcome);
            eprintln!("✓ {}", stage.completion_message());
        }
        results
    }

    /// Synthesize the final report with one more model call.
    pub fn generate_report(&self, results: &StageResults) -> String {
        report::generate_report(&self.client, results)
    }

    /// Analyze, synthesize the report and extract metrics.
    pub fn run(&self, request: &AnalysisRequest) -> AnalysisOutcome {
        let results = self.analyze(request);
        let report = self.generate_report(&results);
        let score = results.score();
        let risk_level = results.risk_level();
        AnalysisOutcome {
            results,
            report,
            score,
            risk_level,
        }
    }
}

#[cfg(test)]
#[path = "analysis_tests.rs"]
mod tests;
