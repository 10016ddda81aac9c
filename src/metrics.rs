//! Score and risk extraction from free-text stage results.
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Score patterns in priority order. An earlier pattern wins even when a later
/// one would match text that appears earlier in the document.
const SCORE_PATTERNS: [&str; 4] = [
    r"(?i)Score:\s*(\d+)/100",
    r"(?i)Score:\s*(\d+)",
    r"(?i)(\d+)/100",
    r"(?i)SCOPE CLARITY SCORE.*?(\d+)",
];

const RISK_KEYWORDS: [(&str, u64); 4] = [("critical", 10), ("high", 5), ("medium", 2), ("low", 1)];

const CRITICAL_THRESHOLD: u64 = 50;
const HIGH_THRESHOLD: u64 = 30;
const MEDIUM_THRESHOLD: u64 = 15;

fn score_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        SCORE_PATTERNS
            .iter()
            .map(|pattern| Regex::new(pattern).expect("score pattern compiles"))
            .collect()
    })
}

fn decimal_digit() -> &'static Regex {
    static DIGIT: OnceLock<Regex> = OnceLock::new();
    DIGIT.get_or_init(|| Regex::new(r"^\d$").expect("decimal digit regex"))
}

fn is_decimal_digit(c: char) -> bool {
    let mut buf = [0u8; 4];
    c.is_ascii_digit() || (!c.is_ascii() && decimal_digit().is_match(c.encode_utf8(&mut buf)))
}

/// Value of any Unicode decimal digit (`\d` in the score patterns).
///
/// Decimal digits are assigned in contiguous runs that each start at a zero,
/// so the value is the offset from the start of the surrounding run, mod 10.
fn decimal_digit_value(c: char) -> Option<u64> {
    if let Some(value) = c.to_digit(10) {
        return Some(u64::from(value));
    }
    if !is_decimal_digit(c) {
        return None;
    }
    let mut start = u32::from(c);
    while let Some(prev) = start.checked_sub(1).and_then(char::from_u32) {
        if !is_decimal_digit(prev) {
            break;
        }
        start -= 1;
    }
    Some(u64::from((u32::from(c) - start) % 10))
}

/// Extract the scope clarity score from main analysis text.
///
/// Returns the first capture of the first pattern that matches; later
/// patterns are never consulted once one matches. Values past `u64::MAX`
/// saturate.
pub fn extract_score(main_analysis: &str) -> Option<u64> {
    let caps = score_patterns()
        .iter()
        .find_map(|pattern| pattern.captures(main_analysis))?;
    caps.get(1)?.as_str().chars().try_fold(0u64, |total, c| {
        decimal_digit_value(c).map(|digit| total.saturating_mul(10).saturating_add(digit))
    })
}

/// Overall risk tier derived from weighted keyword counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn from_total(total: u64) -> Self {
        if total >= CRITICAL_THRESHOLD {
            RiskLevel::Critical
        } else if total >= HIGH_THRESHOLD {
            RiskLevel::High
        } else if total >= MEDIUM_THRESHOLD {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Weighted keyword total for one text; substring based, case-insensitive.
pub fn risk_score(text: &str) -> u64 {
    let lowered = text.to_lowercase();
    RISK_KEYWORDS
        .iter()
        .map(|(keyword, weight)| lowered.matches(keyword).count() as u64 * weight)
        .sum()
}

/// Risk tier over every result text, failures included.
pub fn calculate_risk_level<'a, I>(texts: I) -> RiskLevel
where
    I: IntoIterator<Item = &'a str>,
{
    let total = texts.into_iter().map(risk_score).sum();
    RiskLevel::from_total(total)
}
