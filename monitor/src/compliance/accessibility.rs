//! Accessibility issue counts against per-severity ceilings

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::AccessibilityConfig;
use crate::observation::AccessibilityIssue;

/// Issue severity, ordered from worst to mildest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    Critical,
    Serious,
    Moderate,
    Minor,
}

impl Impact {
    pub const ALL: [Impact; 4] = [Impact::Critical, Impact::Serious, Impact::Moderate, Impact::Minor];

    /// Case-insensitive parse; anything unrecognized counts as minor
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "critical" => Impact::Critical,
            "serious" => Impact::Serious,
            "moderate" => Impact::Moderate,
            _ => Impact::Minor,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Impact::Critical => "critical",
            Impact::Serious => "serious",
            Impact::Moderate => "moderate",
            Impact::Minor => "minor",
        }
    }
}

impl std::fmt::Display for Impact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCheck {
    pub count: usize,
    pub threshold: usize,
    pub passes: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessibilityResult {
    pub standard: String,
    pub level: String,
    pub total_issues: usize,
    /// Affected DOM nodes across all issues
    pub affected_nodes: u64,
    pub severities: BTreeMap<Impact, SeverityCheck>,
    pub compliant: bool,
}

impl AccessibilityResult {
    pub fn count(&self, impact: Impact) -> usize {
        self.severities.get(&impact).map(|check| check.count).unwrap_or(0)
    }
}

pub fn check_accessibility<'a, I>(issues: I, config: &AccessibilityConfig) -> AccessibilityResult
where
    I: IntoIterator<Item = &'a AccessibilityIssue>,
{
    let mut counts: BTreeMap<Impact, usize> = Impact::ALL.iter().map(|impact| (*impact, 0)).collect();
    let mut total_issues = 0;
    let mut affected_nodes = 0u64;

    for issue in issues {
        *counts.entry(Impact::parse_lenient(&issue.impact)).or_insert(0) += 1;
        total_issues += 1;
        affected_nodes += u64::from(issue.node_count);
    }

    let thresholds = &config.thresholds;
    let severities: BTreeMap<Impact, SeverityCheck> = counts
        .into_iter()
        .map(|(impact, count)| {
            let threshold = match impact {
                Impact::Critical => thresholds.critical,
                Impact::Serious => thresholds.serious,
                Impact::Moderate => thresholds.moderate,
                Impact::Minor => thresholds.minor,
            };
            let check = SeverityCheck {
                count,
                threshold,
                passes: count <= threshold,
            };
            (impact, check)
        })
        .collect();

    AccessibilityResult {
        standard: config.standard.clone(),
        level: config.level.clone(),
        total_issues,
        affected_nodes,
        compliant: severities.values().all(|check| check.passes),
        severities,
    }
}
