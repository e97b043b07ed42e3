//! Accessibility, budget and bundle-size compliance as a monitor

use std::collections::BTreeMap;
use std::path::Path;

use tracing::{info, warn};

use super::{Monitor, MonitorKind, MonitorReport, MonitorStatus};
use crate::aggregate;
use crate::compliance::{BudgetVerdict, ComplianceEvaluator, ComplianceVerdict, Impact, PerformanceMeasurements};
use crate::config::ComplianceConfig;
use crate::error::Result;
use crate::observation::Observation;
use crate::report::{Report, Row, Section};
use crate::store::EventStore;
use crate::utils::format;

pub struct ComplianceMonitor {
    evaluator: ComplianceEvaluator,
    store: EventStore,
    measurements: PerformanceMeasurements,
}

impl ComplianceMonitor {
    pub fn new(config: ComplianceConfig) -> Result<Self> {
        let store = EventStore::with_max_events(config.max_events);
        Ok(Self {
            evaluator: ComplianceEvaluator::new(config)?,
            store,
            measurements: PerformanceMeasurements::default(),
        })
    }

    /// Measurements that take precedence over anything derived from observations
    pub fn with_measurements(mut self, measurements: PerformanceMeasurements) -> Self {
        self.measurements = measurements;
        self
    }

    pub fn config(&self) -> &ComplianceConfig {
        self.evaluator.config()
    }

    pub fn store(&self) -> &EventStore {
        &self.store
    }

    /// Explicit measurements, with time budgets filled from average web vitals
    pub fn measurements(&self) -> PerformanceMeasurements {
        let mut measured = self.measurements.clone();
        let time_budgets = &self.config().performance.time_budgets;
        let derived: BTreeMap<String, f64> = aggregate::summarize_vitals(self.store.web_vitals())
            .into_iter()
            .map(|(name, summary)| (name.to_ascii_lowercase(), summary.avg))
            .filter(|(name, _)| time_budgets.contains_key(name))
            .collect();
        measured.merge_missing(PerformanceMeasurements {
            times_ms: derived,
            ..PerformanceMeasurements::default()
        });
        measured
    }

    pub fn evaluate(&mut self) -> Result<ComplianceVerdict> {
        let measurements = self.measurements();
        self.evaluator.evaluate(
            self.store.accessibility_issues(),
            self.store.bundle_files(),
            &measurements,
        )
    }

    fn budget_rows<'a>(verdicts: impl Iterator<Item = &'a BudgetVerdict>) -> Vec<Row> {
        verdicts
            .map(|v| {
                Row::new([
                    v.metric.clone(),
                    format::number(v.actual),
                    format::number(v.threshold),
                    format::percent(v.percent_of_budget),
                ])
                .with_status(v.passes)
            })
            .collect()
    }

    fn sections(&self, verdict: &ComplianceVerdict) -> Vec<Section> {
        let mut sections = Vec::new();

        let a11y = &verdict.accessibility;
        let rows = Impact::ALL
            .iter()
            .filter_map(|impact| a11y.severities.get(impact).map(|check| (impact, check)))
            .map(|(impact, check)| {
                Row::new([impact.to_string(), check.count.to_string(), check.threshold.to_string()])
                    .with_status(check.passes)
            })
            .collect();
        sections.push(
            Section::new("Accessibility")
                .with_status(verdict.accessibility_compliant)
                .key_values([
                    ("standard", format!("{} {}", a11y.standard, a11y.level)),
                    ("total issues", a11y.total_issues.to_string()),
                    ("affected nodes", a11y.affected_nodes.to_string()),
                ])
                .table(["severity", "count", "threshold"], rows),
        );

        let headers = ["metric", "actual", "budget", "of budget"];
        let size = Section::new("Size Budgets (KB)").with_status(verdict.size_compliant);
        sections.push(if verdict.budgets.size.is_empty() {
            size.list(["No size measurements"])
        } else {
            size.table(headers, Self::budget_rows(verdict.budgets.size.iter()))
        });
        let time = Section::new("Time Budgets (ms)").with_status(verdict.time_compliant);
        sections.push(if verdict.budgets.time.is_empty() {
            time.list(["No time measurements"])
        } else {
            time.table(headers, Self::budget_rows(verdict.budgets.time.iter()))
        });

        let bundle = &verdict.bundle;
        let mut section = Section::new("Bundle Size").with_status(verdict.bundle_compliant).key_values([
            ("total size", format::bytes_human(bundle.total_size)),
            ("files", bundle.files_count.to_string()),
            ("history entries", bundle.history_len.to_string()),
            ("regression threshold", format::percent(bundle.regression_threshold)),
        ]);
        if !bundle.chunks.is_empty() {
            let rows = bundle
                .chunks
                .iter()
                .map(|(name, stats)| {
                    let regressed = bundle.regressions.iter().any(|r| &r.chunk == name);
                    Row::new([name.clone(), format::bytes_human(stats.size), stats.files.to_string()])
                        .with_status(!regressed)
                })
                .collect();
            section = section.table(["chunk", "size", "files"], rows);
        }
        if !bundle.regressions.is_empty() {
            section = section.list(bundle.regressions.iter().map(|r| {
                format!(
                    "{} grew {} ({} -> {})",
                    r.chunk,
                    format::percent(r.percent_change),
                    format::bytes_human(r.previous_size),
                    format::bytes_human(r.current_size)
                )
            }));
        }
        if !bundle.unattributed.is_empty() {
            section = section.list(
                bundle
                    .unattributed
                    .iter()
                    .map(|name| format!("unattributed: {}", name)),
            );
        }
        sections.push(section);

        sections
    }
}

impl Monitor for ComplianceMonitor {
    fn kind(&self) -> MonitorKind {
        MonitorKind::Compliance
    }

    fn accepts(&self, observation: &Observation) -> bool {
        matches!(
            observation,
            Observation::AccessibilityIssue(_) | Observation::BundleFile(_) | Observation::WebVital(_)
        )
    }

    fn ingest(&mut self, observation: Observation) -> Result<bool> {
        if !self.accepts(&observation) {
            return Ok(false);
        }
        self.store.record(observation)?;
        Ok(true)
    }

    fn build_report(&mut self, detailed: bool) -> Result<MonitorReport> {
        let verdict = self.evaluate()?;
        let status = if verdict.compliant {
            MonitorStatus::Compliant
        } else {
            MonitorStatus::HasViolations
        };
        if !verdict.compliant {
            warn!(
                "Compliance failures: accessibility={} size={} time={} bundle={}",
                !verdict.accessibility_compliant,
                !verdict.size_compliant,
                !verdict.time_compliant,
                !verdict.bundle_compliant
            );
        }
        info!("Compliance verdict: {}", status);

        let sections = self.sections(&verdict);
        let mut report = Report::new(self.kind().as_str(), "Compliance Report", &verdict, self.config())?
            .with_sections(sections);
        if detailed {
            let history: Vec<_> = self.evaluator.bundle_tracker().history().iter().collect();
            report = report.with_detailed(&serde_json::json!({
                "measurements": self.measurements(),
                "bundle_history": history,
            }))?;
        }

        Ok(MonitorReport { report, status })
    }

    fn reports_dir(&self) -> Option<&Path> {
        self.config().reports_dir.as_deref()
    }
}
