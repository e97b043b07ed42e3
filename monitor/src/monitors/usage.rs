//! Usage analytics: feature, component and page usage plus user flows
//!
//! User interactions are folded in as `custom` usage events named after
//! their action. Flows are driven through the `*_flow` methods and kept in a
//! FIFO bounded by `max_flows`.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};
use uuid::Uuid;

use super::{Monitor, MonitorKind, MonitorReport, MonitorStatus};
use crate::aggregate::{self, RankedCount, TimeDistribution};
use crate::anonymize;
use crate::config::UsageConfig;
use crate::error::Result;
use crate::observation::{Observation, UsageCategory, UsageEvent};
use crate::report::{Report, Row, Section};
use crate::store::EventStore;
use crate::utils::sampling::Sampler;
use crate::utils::{format, stats};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FlowState {
    InProgress,
    Completed,
    Abandoned,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowStep {
    pub name: String,
    pub timestamp: DateTime<Utc>,
    pub properties: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserFlow {
    pub id: String,
    pub name: String,
    pub session_id: Option<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub state: FlowState,
    pub steps: Vec<FlowStep>,
    pub abandon_reason: Option<String>,
}

impl UserFlow {
    pub fn duration_ms(&self) -> Option<i64> {
        self.ended_at.map(|end| (end - self.started_at).num_milliseconds())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowStats {
    pub total: usize,
    pub completed: usize,
    pub abandoned: usize,
    pub in_progress: usize,
    /// Completed flows as a percentage of all tracked flows
    pub completion_rate: f64,
    pub avg_completed_duration_ms: f64,
    pub by_name: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageSummary {
    pub total_events: usize,
    pub unique_sessions: usize,
    pub feature_usage: Vec<RankedCount>,
    pub component_usage: Vec<RankedCount>,
    pub page_views: Vec<RankedCount>,
    pub custom_events: Vec<RankedCount>,
    pub flows: FlowStats,
    pub distribution: TimeDistribution,
    pub sampled_out: u64,
    pub expired: u64,
}

pub struct UsageAnalytics {
    config: UsageConfig,
    store: EventStore,
    sampler: Sampler,
    flows: VecDeque<UserFlow>,
    sampled_out: u64,
    expired: u64,
}

impl UsageAnalytics {
    pub fn new(config: UsageConfig) -> Self {
        let sampler = Sampler::new(config.sampling_rate);
        Self::with_sampler(config, sampler)
    }

    pub fn with_sampler(config: UsageConfig, sampler: Sampler) -> Self {
        Self {
            store: EventStore::with_max_events(config.max_events),
            flows: VecDeque::new(),
            config,
            sampler,
            sampled_out: 0,
            expired: 0,
        }
    }

    pub fn config(&self) -> &UsageConfig {
        &self.config
    }

    pub fn store(&self) -> &EventStore {
        &self.store
    }

    pub fn flows(&self) -> impl Iterator<Item = &UserFlow> {
        self.flows.iter()
    }

    pub fn flow(&self, id: &str) -> Option<&UserFlow> {
        self.flows.iter().find(|flow| flow.id == id)
    }

    /// Start a flow and return its id, or `None` when flow tracking is off
    pub fn start_flow(&mut self, name: impl Into<String>, session_id: Option<String>) -> Option<String> {
        self.start_flow_at(name, session_id, Utc::now())
    }

    pub fn start_flow_at(
        &mut self,
        name: impl Into<String>,
        session_id: Option<String>,
        at: DateTime<Utc>,
    ) -> Option<String> {
        if !self.config.enabled || !self.config.track_flows {
            return None;
        }

        let id = Uuid::new_v4().to_string();
        self.flows.push_back(UserFlow {
            id: id.clone(),
            name: name.into(),
            session_id,
            started_at: at,
            ended_at: None,
            state: FlowState::InProgress,
            steps: Vec::new(),
            abandon_reason: None,
        });
        while self.flows.len() > self.config.max_flows {
            if let Some(dropped) = self.flows.pop_front() {
                debug!("Dropped oldest flow {} ({})", dropped.name, dropped.id);
            }
        }
        Some(id)
    }

    /// Record a step; `false` when the flow is unknown or already finished
    pub fn flow_step(&mut self, id: &str, step: impl Into<String>, properties: Map<String, Value>) -> bool {
        self.flow_step_at(id, step, properties, Utc::now())
    }

    pub fn flow_step_at(
        &mut self,
        id: &str,
        step: impl Into<String>,
        properties: Map<String, Value>,
        at: DateTime<Utc>,
    ) -> bool {
        let anonymize_properties = self.config.anonymize;
        match self.active_flow_mut(id) {
            Some(flow) => {
                flow.steps.push(FlowStep {
                    name: step.into(),
                    timestamp: at,
                    properties: if anonymize_properties {
                        anonymize::anonymize(&properties)
                    } else {
                        properties
                    },
                });
                true
            }
            None => false,
        }
    }

    pub fn complete_flow(&mut self, id: &str) -> bool {
        self.complete_flow_at(id, Utc::now())
    }

    pub fn complete_flow_at(&mut self, id: &str, at: DateTime<Utc>) -> bool {
        self.finish_flow(id, FlowState::Completed, None, at)
    }

    pub fn abandon_flow(&mut self, id: &str, reason: Option<String>) -> bool {
        self.abandon_flow_at(id, reason, Utc::now())
    }

    pub fn abandon_flow_at(&mut self, id: &str, reason: Option<String>, at: DateTime<Utc>) -> bool {
        self.finish_flow(id, FlowState::Abandoned, reason, at)
    }

    fn finish_flow(&mut self, id: &str, state: FlowState, reason: Option<String>, at: DateTime<Utc>) -> bool {
        match self.active_flow_mut(id) {
            Some(flow) => {
                flow.state = state;
                flow.ended_at = Some(at);
                flow.abandon_reason = reason;
                true
            }
            None => false,
        }
    }

    fn active_flow_mut(&mut self, id: &str) -> Option<&mut UserFlow> {
        self.flows
            .iter_mut()
            .find(|flow| flow.id == id && flow.state == FlowState::InProgress)
    }

    /// Drop events and flows older than the retention period
    pub fn apply_retention(&mut self, now: DateTime<Utc>) -> usize {
        let cutoff = now - Duration::days(i64::from(self.config.retention_period_days));
        let dropped = self.store.retain_since(cutoff);
        self.flows.retain(|flow| flow.started_at >= cutoff);
        self.expired += dropped as u64;
        dropped
    }

    fn tracks(&self, category: UsageCategory) -> bool {
        match category {
            UsageCategory::Component => self.config.components,
            UsageCategory::Feature => self.config.features,
            UsageCategory::PageView | UsageCategory::Custom => true,
        }
    }

    fn flow_stats(&self) -> FlowStats {
        let mut stats_out = FlowStats {
            total: self.flows.len(),
            ..FlowStats::default()
        };
        let mut durations = Vec::new();

        for flow in &self.flows {
            *stats_out.by_name.entry(flow.name.clone()).or_insert(0) += 1;
            match flow.state {
                FlowState::InProgress => stats_out.in_progress += 1,
                FlowState::Abandoned => stats_out.abandoned += 1,
                FlowState::Completed => {
                    stats_out.completed += 1;
                    if let Some(duration) = flow.duration_ms() {
                        durations.push(duration as f64);
                    }
                }
            }
        }

        stats_out.completion_rate = stats::percent_of(stats_out.completed as f64, stats_out.total as f64);
        stats_out.avg_completed_duration_ms = stats::mean(&durations);
        stats_out
    }

    pub fn summary_at(&self, now: DateTime<Utc>) -> UsageSummary {
        let ranked = |category: UsageCategory| {
            let counts = aggregate::count_by(
                self.store.usage_events().filter(|event| event.category == category),
                |event| event.name.clone(),
            );
            aggregate::top_n(&counts, counts.len())
        };

        let sessions: BTreeSet<&str> = self
            .store
            .usage_events()
            .filter_map(|event| event.session_id.as_deref())
            .collect();

        UsageSummary {
            total_events: self.store.usage_events().len(),
            unique_sessions: sessions.len(),
            feature_usage: ranked(UsageCategory::Feature),
            component_usage: ranked(UsageCategory::Component),
            page_views: ranked(UsageCategory::PageView),
            custom_events: ranked(UsageCategory::Custom),
            flows: self.flow_stats(),
            distribution: aggregate::time_distribution(self.store.usage_events().map(|e| e.timestamp), now),
            sampled_out: self.sampled_out,
            expired: self.expired,
        }
    }

    fn sections(&self, summary: &UsageSummary) -> Vec<Section> {
        let mut sections = vec![Section::new("Overview").key_values([
            ("total events", summary.total_events.to_string()),
            ("unique sessions", summary.unique_sessions.to_string()),
            ("sampled out", summary.sampled_out.to_string()),
            ("expired", summary.expired.to_string()),
        ])];

        let ranked_section = |title: &str, header: &str, counts: &[RankedCount]| {
            let section = Section::new(title);
            if counts.is_empty() {
                return section.list(["No events recorded"]);
            }
            let rows = counts
                .iter()
                .map(|ranked| Row::new([ranked.name.clone(), ranked.count.to_string()]))
                .collect();
            section.table([header, "count"], rows)
        };
        sections.push(ranked_section("Feature Usage", "feature", &summary.feature_usage));
        sections.push(ranked_section("Component Usage", "component", &summary.component_usage));
        sections.push(ranked_section("Page Views", "page", &summary.page_views));
        sections.push(ranked_section("Custom Events", "event", &summary.custom_events));

        if self.config.track_flows {
            let flows = &summary.flows;
            let mut section = Section::new("User Flows").key_values([
                ("total", flows.total.to_string()),
                ("completed", flows.completed.to_string()),
                ("abandoned", flows.abandoned.to_string()),
                ("in progress", flows.in_progress.to_string()),
                ("completion rate", format::percent(flows.completion_rate)),
                ("avg completed duration (ms)", format::number(flows.avg_completed_duration_ms)),
            ]);
            if !flows.by_name.is_empty() {
                let rows = flows
                    .by_name
                    .iter()
                    .map(|(name, count)| Row::new([name.clone(), count.to_string()]))
                    .collect();
                section = section.table(["flow", "count"], rows);
            }
            sections.push(section);
        }

        let recency = &summary.distribution.recency;
        sections.push(Section::new("Activity").key_values([
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

        sections
    }
}

impl Monitor for UsageAnalytics {
    fn kind(&self) -> MonitorKind {
        MonitorKind::Usage
    }

    fn accepts(&self, observation: &Observation) -> bool {
        self.config.enabled
            && matches!(observation, Observation::Usage(_) | Observation::UserInteraction(_))
    }

    fn ingest(&mut self, observation: Observation) -> Result<bool> {
        if !self.accepts(&observation) {
            return Ok(false);
        }
        observation.validate()?;

        let mut event = match observation {
            Observation::Usage(event) => event,
            Observation::UserInteraction(interaction) => {
                let mut properties = interaction.details;
                properties.insert("response_time".to_string(), Value::from(interaction.response_time));
                UsageEvent::new(UsageCategory::Custom, interaction.action)
                    .with_properties(properties)
                    .at(interaction.timestamp)
            }
            _ => return Ok(false),
        };

        if !self.tracks(event.category) {
            return Ok(false);
        }
        if !self.sampler.should_sample() {
            self.sampled_out += 1;
            return Ok(false);
        }
        if self.config.anonymize {
            event.properties = anonymize::anonymize(&event.properties);
        }

        if self.config.verbose {
            debug!("Usage event {} ({})", event.name, event.category);
        }
        self.store.record(Observation::Usage(event))?;
        Ok(true)
    }

    fn build_report(&mut self, detailed: bool) -> Result<MonitorReport> {
        let now = Utc::now();
        let expired = self.apply_retention(now);
        if expired > 0 {
            info!("Dropped {} usage events past the retention period", expired);
        }

        let summary = self.summary_at(now);
        let status = if summary.total_events > 0 {
            MonitorStatus::HasData
        } else {
            MonitorStatus::NoData
        };
        info!(
            "Usage summary: {} events across {} sessions",
            summary.total_events, summary.unique_sessions
        );

        let mut report = Report::new(self.kind().as_str(), "Usage Analytics Report", &summary, &self.config)?
            .with_sections(self.sections(&summary));
        if detailed {
            let flows: Vec<&UserFlow> = self.flows.iter().collect();
            report = report.with_detailed(&serde_json::json!({ "flows": flows }))?;
        }

        Ok(MonitorReport { report, status })
    }

    fn reports_dir(&self) -> Option<&Path> {
        self.config.reports_dir.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::UserInteraction;
    use serde_json::json;

    fn analytics() -> UsageAnalytics {
        UsageAnalytics::new(UsageConfig::default())
    }

    fn event(category: UsageCategory, name: &str, session: &str) -> Observation {
        UsageEvent::new(category, name).in_session(session).into()
    }

    #[test]
    fn test_usage_counts_and_sessions() {
        let mut usage = analytics();
        usage.ingest(event(UsageCategory::Feature, "export", "s1")).unwrap();
        usage.ingest(event(UsageCategory::Feature, "export", "s2")).unwrap();
        usage.ingest(event(UsageCategory::Feature, "search", "s1")).unwrap();
        usage.ingest(event(UsageCategory::PageView, "/home", "s1")).unwrap();
        usage.ingest(UserInteraction::new("click", 40.0).into()).unwrap();

        let summary = usage.summary_at(Utc::now());
        assert_eq!(summary.total_events, 5);
        assert_eq!(summary.unique_sessions, 2);
        assert_eq!(summary.feature_usage[0], RankedCount { name: "export".to_string(), count: 2 });
        assert_eq!(summary.page_views.len(), 1);
        assert_eq!(summary.custom_events[0].name, "click");
    }

    #[test]
    fn test_interactions_validated_before_conversion() {
        let mut usage = analytics();
        let err = usage
            .ingest(UserInteraction::new("click", f64::NAN).into())
            .unwrap_err();
        assert!(err.to_string().contains("response_time"));

        let err = usage.ingest(UserInteraction::new(" ", 12.0).into()).unwrap_err();
        assert!(err.to_string().contains("action"));
        assert!(!err.to_string().contains("usage.name"));
        assert_eq!(usage.summary_at(Utc::now()).total_events, 0);
    }

    #[test]
    fn test_category_switches() {
        let config = UsageConfig {
            components: false,
            ..UsageConfig::default()
        };
        let mut usage = UsageAnalytics::new(config);
        assert!(!usage.ingest(event(UsageCategory::Component, "Modal", "s1")).unwrap());
        assert!(usage.ingest(event(UsageCategory::Feature, "export", "s1")).unwrap());
    }

    #[test]
    fn test_properties_are_anonymized() {
        let mut usage = analytics();
        let properties = match json!({"userName": "ada", "plan": "pro"}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        usage
            .ingest(UsageEvent::new(UsageCategory::Feature, "upgrade").with_properties(properties).into())
            .unwrap();
        let stored = usage.store().usage_events().next().unwrap();
        assert_eq!(stored.properties["userName"], json!(anonymize::REDACTED));
        assert_eq!(stored.properties["plan"], json!("pro"));
    }

    #[test]
    fn test_flow_lifecycle() {
        let mut usage = analytics();
        let start = Utc::now();

        let checkout = usage.start_flow_at("checkout", Some("s1".to_string()), start).unwrap();
        assert!(usage.flow_step_at(&checkout, "cart", Map::new(), start));
        assert!(usage.complete_flow_at(&checkout, start + Duration::milliseconds(1500)));
        assert!(!usage.flow_step(&checkout, "late", Map::new()));

        let signup = usage.start_flow_at("signup", None, start).unwrap();
        assert!(usage.abandon_flow_at(&signup, Some("closed tab".to_string()), start));
        let _pending = usage.start_flow_at("signup", None, start).unwrap();

        assert!(!usage.complete_flow("missing"));

        let stats = usage.summary_at(Utc::now()).flows;
        assert_eq!(stats.total, 3);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.abandoned, 1);
        assert_eq!(stats.in_progress, 1);
        assert_eq!(stats.avg_completed_duration_ms, 1500.0);
        assert_eq!(stats.by_name["signup"], 2);
        assert!((stats.completion_rate - 100.0 / 3.0).abs() < 1e-9);
        assert_eq!(usage.flow(&checkout).unwrap().steps.len(), 1);
    }

    #[test]
    fn test_flows_bounded_and_optional() {
        let config = UsageConfig {
            max_flows: 2,
            ..UsageConfig::default()
        };
        let mut usage = UsageAnalytics::new(config);
        let first = usage.start_flow("a", None).unwrap();
        usage.start_flow("b", None);
        usage.start_flow("c", None);
        assert_eq!(usage.flows().count(), 2);
        assert!(usage.flow(&first).is_none());

        let mut untracked = UsageAnalytics::new(UsageConfig {
            track_flows: false,
            ..UsageConfig::default()
        });
        assert!(untracked.start_flow("a", None).is_none());
    }

    #[test]
    fn test_retention_and_status() {
        let mut usage = analytics();
        assert_eq!(usage.build_report(false).unwrap().status, MonitorStatus::NoData);

        let old = Utc::now() - Duration::days(45);
        usage
            .ingest(UsageEvent::new(UsageCategory::PageView, "/old").at(old).into())
            .unwrap();
        usage.ingest(event(UsageCategory::PageView, "/new", "s9")).unwrap();

        let report = usage.build_report(false).unwrap();
        assert_eq!(report.status, MonitorStatus::HasData);
        assert_eq!(usage.store().usage_events().len(), 1);
        assert_eq!(report.report.summary["expired"], json!(1));
    }
}
