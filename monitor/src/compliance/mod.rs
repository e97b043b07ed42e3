//! Compliance evaluation: accessibility, performance budgets and bundle size
//!
//! The three checks are independent. Missing input for one of them never
//! raises an error; it simply evaluates as compliant.

pub mod accessibility;
pub mod budgets;
pub mod bundle;

pub use accessibility::{check_accessibility, AccessibilityResult, Impact, SeverityCheck};
pub use budgets::{check_budgets, BudgetResult, BudgetVerdict, PerformanceMeasurements};
pub use bundle::{BundleAnalysis, BundleTracker, ChunkParser, HistoryEntry, Regression, CHUNK_PATTERN};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::ComplianceConfig;
use crate::error::Result;
use crate::observation::{AccessibilityIssue, BundleFile};

/// Combined outcome of all compliance checks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceVerdict {
    pub accessibility: AccessibilityResult,
    pub budgets: BudgetResult,
    pub bundle: BundleAnalysis,
    pub accessibility_compliant: bool,
    pub size_compliant: bool,
    pub time_compliant: bool,
    pub bundle_compliant: bool,
    pub compliant: bool,
}

pub struct ComplianceEvaluator {
    config: ComplianceConfig,
    bundle: BundleTracker,
}

impl ComplianceEvaluator {
    pub fn new(config: ComplianceConfig) -> Result<Self> {
        Ok(Self {
            bundle: BundleTracker::new(config.bundle_size.clone())?,
            config,
        })
    }

    pub fn config(&self) -> &ComplianceConfig {
        &self.config
    }

    pub fn bundle_tracker(&self) -> &BundleTracker {
        &self.bundle
    }

    pub fn check_accessibility<'a, I>(&self, issues: I) -> AccessibilityResult
    where
        I: IntoIterator<Item = &'a AccessibilityIssue>,
    {
        check_accessibility(issues, &self.config.accessibility)
    }

    pub fn check_budgets(&self, measurements: &PerformanceMeasurements) -> BudgetResult {
        check_budgets(measurements, &self.config.performance)
    }

    pub fn check_bundle<'a, I>(&mut self, files: I) -> Result<BundleAnalysis>
    where
        I: IntoIterator<Item = &'a BundleFile>,
    {
        self.bundle.check(files)
    }

    /// Run every check. Bundle sizes fill any size measurement not supplied explicitly.
    pub fn evaluate<'a, I, F>(
        &mut self,
        issues: I,
        files: F,
        measurements: &PerformanceMeasurements,
    ) -> Result<ComplianceVerdict>
    where
        I: IntoIterator<Item = &'a AccessibilityIssue>,
        F: IntoIterator<Item = &'a BundleFile>,
    {
        let accessibility = self.check_accessibility(issues);
        let bundle = self.check_bundle(files)?;

        let mut measured = measurements.clone();
        measured.merge_missing(PerformanceMeasurements {
            sizes_kb: bundle.size_measurements(),
            ..PerformanceMeasurements::default()
        });
        let budgets = self.check_budgets(&measured);

        let bundle_compliant = !bundle.has_regressions();
        let compliant = accessibility.compliant && budgets.compliant && bundle_compliant;

        if self.config.verbose {
            info!(
                "Compliance: accessibility={} size={} time={} bundle={}",
                accessibility.compliant, budgets.size_compliant, budgets.time_compliant, bundle_compliant
            );
        }

        Ok(ComplianceVerdict {
            accessibility_compliant: accessibility.compliant,
            size_compliant: budgets.size_compliant,
            time_compliant: budgets.time_compliant,
            bundle_compliant,
            compliant,
            accessibility,
            budgets,
            bundle,
        })
    }
}
