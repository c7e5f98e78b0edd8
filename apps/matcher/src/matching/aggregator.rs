//! Aggregator — folds verdicts into the weighted match report.
//!
//! Algorithm, per category:
//! 1. Partition verdicts into matched / missing, keeping skill order
//! 2. numerator += matched × weight, denominator += total × weight
//! 3. match_percent = 100 × matched / total, one decimal (0.0 when empty)
//!
//! overall.match_score_percent = 100 × Σnumerator / Σdenominator, one decimal.

use std::path::Path;

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use tracing::info;

use crate::errors::MatchError;
use crate::matching::models::{category_weight, SkillCategory, VerdictMap};

/// Per-category slice of the report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySummary {
    pub matched_skills: Vec<String>,
    pub missing_skills: Vec<String>,
    pub match_percent: f64,
}

/// The `"overall"` entry of the report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverallSummary {
    pub match_score_percent: f64,
    pub missing_required_skills: Vec<String>,
}

/// Final report. Serializes as one JSON object: each category name, then `"overall"`.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchReport {
    pub categories: Vec<(String, CategorySummary)>,
    pub overall: OverallSummary,
}

impl MatchReport {
    #[cfg(test)]
    pub fn category(&self, name: &str) -> Option<&CategorySummary> {
        self.categories
            .iter()
            .find(|(category, _)| category == name)
            .map(|(_, summary)| summary)
    }
}

impl Serialize for MatchReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.categories.len() + 1))?;
        for (category, summary) in &self.categories {
            map.serialize_entry(category, summary)?;
        }
        map.serialize_entry("overall", &self.overall)?;
        map.end()
    }
}

/// Builds the report from verdicts. Pure; no I/O.
pub fn summarize(verdicts: &VerdictMap) -> MatchReport {
    let mut total_score = 0.0_f64;
    let mut total_possible = 0.0_f64;
    let mut categories = Vec::with_capacity(verdicts.len());

    for group in verdicts {
        let (matched, missing): (Vec<_>, Vec<_>) =
            group.verdicts.iter().partition(|v| v.matched);
        let weight = category_weight(&group.category);

        total_score += matched.len() as f64 * weight;
        total_possible += group.verdicts.len() as f64 * weight;

        let match_percent = if group.verdicts.is_empty() {
            0.0
        } else {
            round1(100.0 * matched.len() as f64 / group.verdicts.len() as f64)
        };

        categories.push((
            group.category.clone(),
            CategorySummary {
                matched_skills: matched.iter().map(|v| v.skill.clone()).collect(),
                missing_skills: missing.iter().map(|v| v.skill.clone()).collect(),
                match_percent,
            },
        ));
    }

    let match_score_percent = if total_possible > 0.0 {
        round1(100.0 * total_score / total_possible)
    } else {
        0.0
    };

    // A verdict map without the required bucket has no required gaps
    let missing_required_skills = categories
        .iter()
        .find(|(name, _)| name == SkillCategory::TechStackRequired.as_str())
        .map(|(_, summary)| summary.missing_skills.clone())
        .unwrap_or_default();

    MatchReport {
        categories,
        overall: OverallSummary {
            match_score_percent,
            missing_required_skills,
        },
    }
}

/// Renders the report as UTF-8 JSON with a 4-space indent.
pub fn to_pretty_json(report: &MatchReport) -> Result<String, MatchError> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    report.serialize(&mut serializer)?;
    String::from_utf8(buf).map_err(|e| MatchError::SchemaParse(e.to_string()))
}

/// Writes the report to `path`, replacing any existing file.
pub fn write_report(report: &MatchReport, path: &Path) -> Result<(), MatchError> {
    let json = to_pretty_json(report)?;
    std::fs::write(path, json).map_err(|e| MatchError::io(path, e))?;
    info!(
        path = %path.display(),
        match_score_percent = report.overall.match_score_percent,
        "Match report written"
    );
    Ok(())
}

/// One decimal place, ties to even on the exact binary value (56.25 -> 56.2).
fn round1(value: f64) -> f64 {
    format!("{value:.1}").parse().unwrap_or(value)
}
