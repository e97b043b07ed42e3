//! Error tracking: categories, frequent messages and alerting

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{Monitor, MonitorKind, MonitorReport, MonitorStatus};
use crate::aggregate::{self, RankedCount, TimeDistribution};
use crate::anonymize;
use crate::config::ErrorConfig;
use crate::error::Result;
use crate::observation::{ErrorEvent, Observation};
use crate::report::{Report, Row, Section};
use crate::store::EventStore;

/// How many distinct messages the summary ranks
pub const TOP_MESSAGES: usize = 10;

/// A category whose error count went over the alert threshold
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorAlert {
    pub category: String,
    pub count: usize,
    pub threshold: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorSummary {
    pub total: usize,
    pub by_category: BTreeMap<String, usize>,
    pub top_messages: Vec<RankedCount>,
    pub distribution: TimeDistribution,
    pub alerts: Vec<ErrorAlert>,
    pub evicted: u64,
}

pub struct ErrorMonitor {
    config: ErrorConfig,
    store: EventStore,
}

impl ErrorMonitor {
    pub fn new(config: ErrorConfig) -> Self {
        Self {
            store: EventStore::with_max_events(config.max_errors),
            config,
        }
    }

    pub fn config(&self) -> &ErrorConfig {
        &self.config
    }

    pub fn store(&self) -> &EventStore {
        &self.store
    }

    pub fn summary(&self) -> ErrorSummary {
        self.summary_at(Utc::now())
    }

    pub fn summary_at(&self, now: DateTime<Utc>) -> ErrorSummary {
        let by_category = aggregate::count_by(self.store.errors(), |e| e.category.clone());
        let by_message = aggregate::count_by(self.store.errors(), |e| e.message.clone());

        let alerts = by_category
            .iter()
            .filter(|(_, count)| **count > self.config.alert_threshold)
            .map(|(category, count)| ErrorAlert {
                category: category.clone(),
                count: *count,
                threshold: self.config.alert_threshold,
            })
            .collect();

        ErrorSummary {
            total: self.store.errors().len(),
            top_messages: aggregate::top_n(&by_message, TOP_MESSAGES),
            distribution: aggregate::time_distribution(self.store.errors().map(|e| e.timestamp), now),
            by_category,
            alerts,
            evicted: self.store.counts().evicted,
        }
    }

    fn sections(&self, summary: &ErrorSummary) -> Vec<Section> {
        let mut sections = Vec::new();

        let categories = Section::new("Errors by Category").with_status(summary.alerts.is_empty());
        let categories = if summary.by_category.is_empty() {
            categories.list(["No errors recorded"])
        } else {
            let rows = summary
                .by_category
                .iter()
                .map(|(category, count)| {
                    Row::new([category.clone(), count.to_string()])
                        .with_status(*count <= self.config.alert_threshold)
                })
                .collect();
            categories.table(["category", "count"], rows)
        };
        sections.push(categories);

        if !summary.top_messages.is_empty() {
            let rows = summary
                .top_messages
                .iter()
                .map(|ranked| Row::new([ranked.name.clone(), ranked.count.to_string()]))
                .collect();
            sections.push(Section::new("Top Messages").table(["message", "count"], rows));
        }

        let recency = &summary.distribution.recency;
        sections.push(Section::new("Timeline").key_values([
            ("total", summary.total.to_string()),
            ("last 24h", recency.last_24h.to_string()),
            ("last 7d", recency.last_7d.to_string()),
            ("last 30d", recency.last_30d.to_string()),
            ("older", recency.older.to_string()),
            (
                "peak hour (UTC)",
                summary
                    .distribution
                    .peak_hour()
                    .map(|hour| format!("{:02}:00", hour))
                    .unwrap_or_else(|| "-".to_string()),
            ),
        ]));

        if !summary.alerts.is_empty() {
            sections.push(Section::new("Alerts").with_status(false).list(summary.alerts.iter().map(
                |alert| {
                    format!(
                        "{}: {} errors (threshold {})",
                        alert.category, alert.count, alert.threshold
                    )
                },
            )));
        }

        sections
    }
}

impl Monitor for ErrorMonitor {
    fn kind(&self) -> MonitorKind {
        MonitorKind::Errors
    }

    fn accepts(&self, observation: &Observation) -> bool {
        self.config.enabled && matches!(observation, Observation::Error(_))
    }

    fn ingest(&mut self, observation: Observation) -> Result<bool> {
        if !self.accepts(&observation) {
            return Ok(false);
        }
        let observation = match observation {
            Observation::Error(error) if self.config.anonymize => Observation::Error(ErrorEvent {
                context: anonymize::anonymize(&error.context),
                ..error
            }),
            other => other,
        };
        self.store.record(observation)?;
        Ok(true)
    }

    fn build_report(&mut self, detailed: bool) -> Result<MonitorReport> {
        let summary = self.summary();
        for alert in &summary.alerts {
            warn!(
                "Error alert: {} {} errors exceeds threshold {}",
                alert.count, alert.category, alert.threshold
            );
        }

        let status = if !summary.alerts.is_empty() {
            MonitorStatus::HasViolations
        } else if summary.total > 0 {
            MonitorStatus::HasData
        } else {
            MonitorStatus::Compliant
        };
        info!("Error summary: {} errors in {} categories", summary.total, summary.by_category.len());

        let mut report = Report::new(self.kind().as_str(), "Error Report", &summary, &self.config)?
            .with_sections(self.sections(&summary));
        if detailed {
            let recent: Vec<&ErrorEvent> = self.store.errors().collect();
            report = report.with_detailed(&serde_json::json!({ "errors": recent }))?;
        }

        Ok(MonitorReport { report, status })
    }

    fn reports_dir(&self) -> Option<&Path> {
        self.config.reports_dir.as_deref()
    }
}
