//! Web vitals, render times and supporting counters

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{Monitor, MonitorKind, MonitorReport, MonitorStatus};
use crate::aggregate::{self, RenderSummary, VitalSummary};
use crate::config::PerformanceConfig;
use crate::error::Result;
use crate::observation::Observation;
use crate::report::{Report, Row, Section};
use crate::store::EventStore;
use crate::utils::format;
use crate::utils::sampling::Sampler;

/// A web vital whose average exceeds its threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub metric: String,
    pub average: f64,
    pub threshold: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlowComponent {
    pub component: String,
    pub p95: f64,
    pub budget: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerformanceCounts {
    pub vitals: usize,
    pub renders: usize,
    pub resources: usize,
    pub interactions: usize,
    pub errors: usize,
    pub sampled_out: u64,
    pub evicted: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub web_vitals: BTreeMap<String, VitalSummary>,
    pub component_renders: BTreeMap<String, RenderSummary>,
    pub counts: PerformanceCounts,
    pub violations: Vec<Violation>,
    pub slow_components: Vec<SlowComponent>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceStats {
    pub count: usize,
    pub total_transfer_size: u64,
    pub avg_duration: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionStats {
    pub count: usize,
    pub avg_response_time: f64,
    pub max_response_time: f64,
}

/// Extra breakdowns included in detailed reports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceDetails {
    pub resources_by_type: BTreeMap<String, ResourceStats>,
    pub interactions: BTreeMap<String, InteractionStats>,
    pub errors_by_category: BTreeMap<String, usize>,
}

pub struct PerformanceMonitor {
    config: PerformanceConfig,
    store: EventStore,
    sampler: Sampler,
    sampled_out: u64,
}

impl PerformanceMonitor {
    pub fn new(config: PerformanceConfig) -> Self {
        let sampler = Sampler::new(config.sampling_rate);
        Self::with_sampler(config, sampler)
    }

    pub fn with_sampler(config: PerformanceConfig, sampler: Sampler) -> Self {
        Self {
            store: EventStore::with_max_events(config.max_events_per_session),
            config,
            sampler,
            sampled_out: 0,
        }
    }

    pub fn config(&self) -> &PerformanceConfig {
        &self.config
    }

    pub fn store(&self) -> &EventStore {
        &self.store
    }

    fn tracks_component(&self, name: &str) -> bool {
        self.config.components.is_empty() || self.config.components.iter().any(|c| c == name)
    }

    pub fn summary(&self) -> PerformanceSummary {
        let web_vitals = aggregate::summarize_vitals(self.store.web_vitals());
        let component_renders = aggregate::summarize_renders(self.store.renders());

        let violations = web_vitals
            .iter()
            .filter_map(|(metric, summary)| {
                let threshold = self.config.thresholds.get(metric)?;
                (summary.avg > threshold).then(|| Violation {
                    metric: metric.clone(),
                    average: summary.avg,
                    threshold,
                })
            })
            .collect();

        let slow_components = component_renders
            .iter()
            .filter(|(_, summary)| summary.p95 > self.config.render_budget_ms)
            .map(|(component, summary)| SlowComponent {
                component: component.clone(),
                p95: summary.p95,
                budget: self.config.render_budget_ms,
            })
            .collect();

        let counts = PerformanceCounts {
            vitals: self.store.web_vitals().len(),
            renders: self.store.renders().len(),
            resources: self.store.resources().len(),
            interactions: self.store.interactions().len(),
            errors: self.store.errors().len(),
            sampled_out: self.sampled_out,
            evicted: self.store.counts().evicted,
        };

        PerformanceSummary {
            web_vitals,
            component_renders,
            counts,
            violations,
            slow_components,
        }
    }

    pub fn details(&self) -> PerformanceDetails {
        let mut resources: BTreeMap<String, (usize, u64, Vec<f64>)> = BTreeMap::new();
        for resource in self.store.resources() {
            let entry = resources.entry(resource.initiator_type.clone()).or_default();
            entry.0 += 1;
            entry.1 += resource.transfer_size;
            entry.2.push(resource.duration);
        }

        let mut interactions: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        for interaction in self.store.interactions() {
            interactions
                .entry(interaction.action.clone())
                .or_default()
                .push(interaction.response_time);
        }

        PerformanceDetails {
            resources_by_type: resources
                .into_iter()
                .map(|(kind, (count, total_transfer_size, durations))| {
                    let stats = ResourceStats {
                        count,
                        total_transfer_size,
                        avg_duration: crate::utils::stats::mean(&durations),
                    };
                    (kind, stats)
                })
                .collect(),
            interactions: interactions
                .into_iter()
                .map(|(action, times)| {
                    let stats = InteractionStats {
                        count: times.len(),
                        avg_response_time: crate::utils::stats::mean(&times),
                        max_response_time: crate::utils::stats::max(&times),
                    };
                    (action, stats)
                })
                .collect(),
            errors_by_category: aggregate::count_by(self.store.errors(), |e| e.category.clone()),
        }
    }

    fn sections(&self, summary: &PerformanceSummary) -> Vec<Section> {
        let mut sections = Vec::new();

        let vitals = Section::new("Web Vitals").with_status(summary.violations.is_empty());
        let vitals = if summary.web_vitals.is_empty() {
            vitals.list(["No web vitals recorded"])
        } else {
            let rows = summary
                .web_vitals
                .iter()
                .map(|(metric, s)| {
                    let threshold = self.config.thresholds.get(metric);
                    let row = Row::new([
                        metric.clone(),
                        s.count.to_string(),
                        format::number(s.min),
                        format::number(s.max),
                        format::number(s.avg),
                        threshold.map(format::number).unwrap_or_else(|| "-".to_string()),
                        s.ratings.good.to_string(),
                        s.ratings.needs_improvement.to_string(),
                        s.ratings.poor.to_string(),
                    ]);
                    match threshold {
                        Some(threshold) => row.with_status(s.avg <= threshold),
                        None => row,
                    }
                })
                .collect();
            vitals.table(
                ["metric", "count", "min", "max", "avg", "threshold", "good", "needs-improvement", "poor"],
                rows,
            )
        };
        sections.push(vitals);

        let renders = Section::new("Component Renders").with_status(summary.slow_components.is_empty());
        let renders = if summary.component_renders.is_empty() {
            renders.list(["No component renders recorded"])
        } else {
            let rows = summary
                .component_renders
                .iter()
                .map(|(component, s)| {
                    Row::new([
                        component.clone(),
                        s.count.to_string(),
                        format::number(s.min),
                        format::number(s.max),
                        format::number(s.avg),
                        format::number(s.p95),
                    ])
                    .with_status(s.p95 <= self.config.render_budget_ms)
                })
                .collect();
            renders.table(["component", "count", "min", "max", "avg", "p95"], rows)
        };
        sections.push(renders);

        let counts = &summary.counts;
        sections.push(Section::new("Counts").key_values([
            ("vitals", counts.vitals.to_string()),
            ("renders", counts.renders.to_string()),
            ("resources", counts.resources.to_string()),
            ("interactions", counts.interactions.to_string()),
            ("errors", counts.errors.to_string()),
            ("sampled out", counts.sampled_out.to_string()),
            ("evicted", counts.evicted.to_string()),
        ]));

        if !summary.violations.is_empty() {
            sections.push(Section::new("Violations").with_status(false).list(summary.violations.iter().map(
                |v| {
                    format!(
                        "{} average {} exceeds threshold {}",
                        v.metric,
                        format::number(v.average),
                        format::number(v.threshold)
                    )
                },
            )));
        }

        sections
    }
}

impl Monitor for PerformanceMonitor {
    fn kind(&self) -> MonitorKind {
        MonitorKind::Performance
    }

    fn accepts(&self, observation: &Observation) -> bool {
        matches!(
            observation,
            Observation::WebVital(_)
                | Observation::ResourceTiming(_)
                | Observation::ComponentRender(_)
                | Observation::UserInteraction(_)
                | Observation::Error(_)
        )
    }

    fn ingest(&mut self, observation: Observation) -> Result<bool> {
        if !self.accepts(&observation) {
            return Ok(false);
        }
        if let Observation::ComponentRender(render) = &observation {
            if !self.tracks_component(&render.component_name) {
                return Ok(false);
            }
        }
        if !self.sampler.should_sample() {
            self.sampled_out += 1;
            return Ok(false);
        }

        if self.config.verbose {
            debug!("Performance monitor recording {}", observation.kind());
        }
        self.store.record(observation)?;
        Ok(true)
    }

    fn build_report(&mut self, detailed: bool) -> Result<MonitorReport> {
        let summary = self.summary();
        let status = if summary.violations.is_empty() {
            MonitorStatus::Compliant
        } else {
            MonitorStatus::HasViolations
        };
        info!(
            "Performance summary: {} vitals, {} violations",
            summary.web_vitals.len(),
            summary.violations.len()
        );

        let mut report = Report::new(self.kind().as_str(), "Performance Report", &summary, &self.config)?
            .with_sections(self.sections(&summary));
        if detailed {
            report = report.with_detailed(&self.details())?;
        }

        Ok(MonitorReport { report, status })
    }

    fn reports_dir(&self) -> Option<&Path> {
        self.config.reports_dir.as_deref()
    }
}
