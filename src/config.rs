//! Analyzer configuration and project metadata.
//!
//! Config is layered: built-in defaults, an optional JSON file, environment
//! variables, then CLI overrides applied by the caller.
use crate::stage::{all_stages, StageId, StageSet};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5";
pub const DEFAULT_MAX_TOKENS: u32 = 4096;
pub const DEFAULT_TEMPERATURE: f32 = 0.3;
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

pub const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";
pub const LM_COMMAND_ENV: &str = "SCOPE_ANALYZER_LM_COMMAND";
pub const MODEL_ENV: &str = "SCOPE_ANALYZER_MODEL";

const CONFIG_DIR_NAME: &str = "scope-analyzer";
const CONFIG_FILE_NAME: &str = "config.json";

/// Descriptive fields interpolated into the main analysis prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectMetadata {
    pub project_name: String,
    pub project_type: String,
    pub industry: String,
    pub team_size: String,
    pub timeline: String,
}

impl Default for ProjectMetadata {
    fn default() -> Self {
        Self {
            project_name: "Unknown Project".to_string(),
            project_type: "software development".to_string(),
            industry: "technology".to_string(),
            team_size: "not specified".to_string(),
            timeline: "not specified".to_string(),
        }
    }
}

/// Per-stage enable flags as they appear in the config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StageToggles {
    pub run_main_analysis: bool,
    pub run_requirements_quality: bool,
    pub run_risk_assessment: bool,
    pub run_technical_complexity: bool,
    pub run_scope_creep_detection: bool,
    pub run_stakeholder_questions: bool,
    pub run_assumption_extraction: bool,
}

impl Default for StageToggles {
    fn default() -> Self {
        Self::from_stages(&all_stages())
    }
}

impl StageToggles {
    /// Quick mode: main analysis only.
    pub fn quick() -> Self {
        Self {
            run_main_analysis: true,
            run_requirements_quality: false,
            run_risk_assessment: false,
            run_technical_complexity: false,
            run_scope_creep_detection: false,
            run_stakeholder_questions: false,
            run_assumption_extraction: false,
        }
    }

    pub fn from_stages(stages: &StageSet) -> Self {
        Self {
            run_main_analysis: stages.contains(&StageId::MainAnalysis),
            run_requirements_quality: stages.contains(&StageId::RequirementsQuality),
            run_risk_assessment: stages.contains(&StageId::RiskAssessment),
            run_technical_complexity: stages.contains(&StageId::TechnicalComplexity),
            run_scope_creep_detection: stages.contains(&StageId::ScopeCreepDetection),
            run_stakeholder_questions: stages.contains(&StageId::StakeholderQuestions),
            run_assumption_extraction: stages.contains(&StageId::AssumptionExtraction),
        }
    }

    pub fn is_enabled(&self, stage: StageId) -> bool {
        match stage {
            StageId::MainAnalysis => self.run_main_analysis,
            StageId::RequirementsQuality => self.run_requirements_quality,
            StageId::RiskAssessment => self.run_risk_assessment,
            StageId::TechnicalComplexity => self.run_technical_complexity,
            StageId::ScopeCreepDetection => self.run_scope_creep_detection,
            StageId::StakeholderQuestions => self.run_stakeholder_questions,
            StageId::AssumptionExtraction => self.run_assumption_extraction,
        }
    }

    pub fn enabled(&self) -> StageSet {
        StageId::ALL
            .into_iter()
            .filter(|stage| self.is_enabled(*stage))
            .collect()
    }
}

/// Settings consumed by the analyzer core and its providers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalyzerConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub base_url: String,
    /// Local LM command; when set it replaces the HTTP provider.
    pub lm_command: Option<String>,
    /// JSONL file receiving one entry per model invocation.
    pub lm_log: Option<PathBuf>,
    pub verbose: bool,
    pub stages: StageToggles,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            base_url: DEFAULT_BASE_URL.to_string(),
            lm_command: None,
            lm_log: None,
            verbose: false,
            stages: StageToggles::default(),
        }
    }
}

/// Default config location under the user config dir, if one exists.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Load a config file; unknown keys are rejected.
pub fn load_config_file(path: &Path) -> Result<AnalyzerConfig> {
    let bytes = fs::read(path).with_context(|| format!("read config {}", path.display()))?;
    let config: AnalyzerConfig = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse config JSON {}", path.display()))?;
    Ok(config)
}

/// Resolve defaults, file and environment layers.
///
/// An explicit path must exist; the default location is used only if present.
pub fn load_config(explicit: Option<&Path>) -> Result<AnalyzerConfig> {
    let mut config = match explicit {
        Some(path) => load_config_file(path)?,
        None => match default_config_path().filter(|path| path.is_file()) {
            Some(path) => load_config_file(&path)?,
            None => AnalyzerConfig::default(),
        },
    };
    apply_env(&mut config, |name| env::var(name).ok());
    Ok(config)
}

/// Overlay environment values; `lookup` abstracts `std::env::var` for tests.
pub fn apply_env<F>(config: &mut AnalyzerConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
    let has_key = config
        .api_key
        .as_deref()
        .is_some_and(|key| !key.trim().is_empty());
    if !has_key {
        config.api_key = non_empty(API_KEY_ENV);
    }
    if let Some(command) = non_empty(LM_COMMAND_ENV) {
        config.lm_command = Some(command);
    }
    if let Some(model) = non_empty(MODEL_ENV) {
        config.model = model;
    }
}

/// Validate user-tunable numeric and string settings.
pub fn validate_config(config: &AnalyzerConfig) -> Result<()> {
    if config.model.trim().is_empty() {
        return Err(anyhow!("model must be non-empty"));
    }
    if config.max_tokens == 0 {
        return Err(anyhow!("max_tokens must be greater than zero"));
    }
    if !(0.0..=1.0).contains(&config.temperature) {
        return Err(anyhow!(
            "temperature must be between 0.0 and 1.0 (got {})",
            config.temperature
        ));
    }
    if let Some(command) = config.lm_command.as_deref() {
        if command.trim().is_empty() {
            return Err(anyhow!("lm_command must be non-empty when set"));
        }
    }
    Ok(())
}

/// Return the API credential or the fatal configuration error.
pub fn require_api_key(config: &AnalyzerConfig) -> Result<&str> {
    config
        .api_key
        .as_deref()
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .ok_or_else(|| {
            anyhow!(
                "API key not found. Set {API_KEY_ENV} environment variable or provide it in the config."
            )
        })
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
