//! Size and time budget checks

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::BudgetConfig;
use crate::utils::stats;

/// Measured values to hold against the configured budgets
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMeasurements {
    /// Sizes in KB, keyed like the size budgets
    pub sizes_kb: BTreeMap<String, f64>,
    /// Durations in milliseconds, keyed like the time budgets
    pub times_ms: BTreeMap<String, f64>,
}

impl PerformanceMeasurements {
    pub fn is_empty(&self) -> bool {
        self.sizes_kb.is_empty() && self.times_ms.is_empty()
    }

    /// Fill in entries missing here from `other`
    pub fn merge_missing(&mut self, other: PerformanceMeasurements) {
        for (key, value) in other.sizes_kb {
            self.sizes_kb.entry(key).or_insert(value);
        }
        for (key, value) in other.times_ms {
            self.times_ms.entry(key).or_insert(value);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetVerdict {
    pub metric: String,
    pub actual: f64,
    pub threshold: f64,
    pub passes: bool,
    pub percent_of_budget: f64,
}

impl BudgetVerdict {
    pub fn evaluate(metric: impl Into<String>, actual: f64, threshold: f64) -> Self {
        Self {
            metric: metric.into(),
            actual,
            threshold,
            passes: actual <= threshold,
            percent_of_budget: stats::percent_of(actual, threshold),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetResult {
    pub size: Vec<BudgetVerdict>,
    pub time: Vec<BudgetVerdict>,
    pub size_compliant: bool,
    pub time_compliant: bool,
    pub compliant: bool,
}

impl BudgetResult {
    pub fn verdicts(&self) -> impl Iterator<Item = &BudgetVerdict> {
        self.size.iter().chain(self.time.iter())
    }

    pub fn failures(&self) -> impl Iterator<Item = &BudgetVerdict> {
        self.verdicts().filter(|verdict| !verdict.passes)
    }
}

fn check_family(budgets: &BTreeMap<String, f64>, actuals: &BTreeMap<String, f64>) -> Vec<BudgetVerdict> {
    budgets
        .iter()
        .filter_map(|(metric, budget)| {
            actuals
                .get(metric)
                .map(|actual| BudgetVerdict::evaluate(metric.clone(), *actual, *budget))
        })
        .collect()
}

/// Check every budget that has a matching measurement; unmeasured budgets are skipped
pub fn check_budgets(measurements: &PerformanceMeasurements, config: &BudgetConfig) -> BudgetResult {
    let size = check_family(&config.budgets, &measurements.sizes_kb);
    let time = check_family(&config.time_budgets, &measurements.times_ms);

    let size_compliant = size.iter().all(|v| v.passes);
    let time_compliant = time.iter().all(|v| v.passes);

    BudgetResult {
        size,
        time,
        size_compliant,
        time_compliant,
        compliant: size_compliant && time_compliant,
    }
}
