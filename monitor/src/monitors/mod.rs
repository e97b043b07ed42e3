//! The four monitors and the trait the runner drives them through
//!
//! Each monitor owns its configuration and its own [`EventStore`](crate::store::EventStore);
//! nothing is shared between them, so one monitor failing never affects another.

pub mod compliance;
pub mod errors;
pub mod performance;
pub mod usage;

pub use compliance::ComplianceMonitor;
pub use errors::ErrorMonitor;
pub use performance::PerformanceMonitor;
pub use usage::UsageAnalytics;

use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{MonitorError, Result};
use crate::observation::Observation;
use crate::report::Report;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorKind {
    Performance,
    Errors,
    Usage,
    Compliance,
}

impl MonitorKind {
    pub const ALL: [MonitorKind; 4] = [
        MonitorKind::Performance,
        MonitorKind::Errors,
        MonitorKind::Usage,
        MonitorKind::Compliance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MonitorKind::Performance => "performance",
            MonitorKind::Errors => "errors",
            MonitorKind::Usage => "usage",
            MonitorKind::Compliance => "compliance",
        }
    }
}

impl std::fmt::Display for MonitorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MonitorKind {
    type Err = MonitorError;

    fn from_str(s: &str) -> Result<Self> {
        MonitorKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| MonitorError::invalid_config("monitor", format!("unknown monitor '{}'", s)))
    }
}

/// Headline state of a monitor report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MonitorStatus {
    HasViolations,
    Compliant,
    HasData,
    NoData,
}

impl MonitorStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MonitorStatus::HasViolations => "has-violations",
            MonitorStatus::Compliant => "compliant",
            MonitorStatus::HasData => "has-data",
            MonitorStatus::NoData => "no-data",
        }
    }

    pub fn is_violation(&self) -> bool {
        matches!(self, MonitorStatus::HasViolations)
    }
}

impl std::fmt::Display for MonitorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct MonitorReport {
    pub report: Report,
    pub status: MonitorStatus,
}

pub trait Monitor: Send {
    fn kind(&self) -> MonitorKind;

    fn accepts(&self, observation: &Observation) -> bool;

    /// Returns `false` when the observation was filtered or sampled out
    fn ingest(&mut self, observation: Observation) -> Result<bool>;

    fn build_report(&mut self, detailed: bool) -> Result<MonitorReport>;

    /// Directory overriding the run directory for this monitor's report
    fn reports_dir(&self) -> Option<&Path> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parsing() {
        assert_eq!("Usage".parse::<MonitorKind>().unwrap(), MonitorKind::Usage);
        assert!("network".parse::<MonitorKind>().is_err());
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&MonitorStatus::HasViolations).unwrap();
        assert_eq!(json, "\"has-violations\"");
        assert_eq!(MonitorStatus::NoData.to_string(), "no-data");
    }
}
