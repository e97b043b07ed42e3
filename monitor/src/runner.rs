//! Runs every monitor over one observation set and writes a summary report
//!
//! Monitors are isolated from one another: a monitor that fails to ingest,
//! build, render or write its report is recorded as failed while the rest
//! carry on. Only failing to create the run directory or to write the
//! summary aborts the run.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use tracing::{error, info, warn};

use crate::config::{MonitorConfig, ReportSettings};
use crate::error::{MonitorError, Result};
use crate::monitors::{
    ComplianceMonitor, ErrorMonitor, Monitor, MonitorKind, MonitorStatus, PerformanceMonitor, UsageAnalytics,
};
use crate::observation::Observation;
use crate::report::{file_timestamp, formatter_for, Report, ReportFormat, ReportFormatter, ReportWriter, Row, Section};

/// Report kind used for the summary file
pub const SUMMARY_KIND: &str = "summary";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunOptions {
    /// Root under which each run gets its own timestamped directory
    pub output_dir: PathBuf,
    pub format: ReportFormat,
    pub detailed: bool,
}

impl RunOptions {
    pub fn from_settings(settings: &ReportSettings) -> Self {
        Self {
            output_dir: settings.root_dir.clone(),
            format: settings.format,
            detailed: settings.detailed,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonitorRun {
    pub status: MonitorStatus,
    pub report_path: PathBuf,
}

#[derive(Debug)]
pub struct MonitorOutcome {
    pub kind: MonitorKind,
    /// Observations the monitor kept
    pub ingested: usize,
    pub result: Result<MonitorRun>,
}

impl MonitorOutcome {
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }
}

#[derive(Debug)]
pub struct RunOutcome {
    pub run_dir: PathBuf,
    pub outcomes: Vec<MonitorOutcome>,
    pub summary_path: PathBuf,
}

impl RunOutcome {
    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(MonitorOutcome::succeeded)
    }

    pub fn failures(&self) -> impl Iterator<Item = &MonitorOutcome> {
        self.outcomes.iter().filter(|outcome| !outcome.succeeded())
    }

    pub fn outcome(&self, kind: MonitorKind) -> Option<&MonitorOutcome> {
        self.outcomes.iter().find(|outcome| outcome.kind == kind)
    }
}

pub struct Runner {
    options: RunOptions,
    monitors: Vec<Box<dyn Monitor>>,
}

/// Build the default monitor for a kind
pub fn monitor_for(kind: MonitorKind, config: &MonitorConfig) -> Result<Box<dyn Monitor>> {
    Ok(match kind {
        MonitorKind::Performance => Box::new(PerformanceMonitor::new(config.performance.clone())),
        MonitorKind::Errors => Box::new(ErrorMonitor::new(config.errors.clone())),
        MonitorKind::Usage => Box::new(UsageAnalytics::new(config.usage.clone())),
        MonitorKind::Compliance => Box::new(ComplianceMonitor::new(config.compliance.clone())?),
    })
}

impl Runner {
    /// All four monitors, configured from `config`
    pub fn new(config: &MonitorConfig, options: RunOptions) -> Result<Self> {
        Self::only(config, options, &MonitorKind::ALL)
    }

    pub fn only(config: &MonitorConfig, options: RunOptions, kinds: &[MonitorKind]) -> Result<Self> {
        let monitors = kinds
            .iter()
            .map(|kind| monitor_for(*kind, config))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::with_monitors(options, monitors))
    }

    pub fn with_monitors(options: RunOptions, monitors: Vec<Box<dyn Monitor>>) -> Self {
        Self { options, monitors }
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    pub fn kinds(&self) -> Vec<MonitorKind> {
        self.monitors.iter().map(|monitor| monitor.kind()).collect()
    }

    pub fn run(&mut self, observations: Vec<Observation>) -> Result<RunOutcome> {
        self.run_at(observations, Utc::now())
    }

    pub fn run_at(&mut self, observations: Vec<Observation>, now: DateTime<Utc>) -> Result<RunOutcome> {
        let run_dir = self.options.output_dir.join(file_timestamp(now));
        fs::create_dir_all(&run_dir)?;
        info!("Running {} monitors into {}", self.monitors.len(), run_dir.display());

        let formatter = formatter_for(self.options.format)?;

        let mut ingested = vec![0usize; self.monitors.len()];
        let mut ingest_errors: Vec<Option<MonitorError>> = self.monitors.iter().map(|_| None).collect();
        for observation in observations {
            for (index, monitor) in self.monitors.iter_mut().enumerate() {
                if ingest_errors[index].is_some() || !monitor.accepts(&observation) {
                    continue;
                }
                match monitor.ingest(observation.clone()) {
                    Ok(true) => ingested[index] += 1,
                    Ok(false) => {}
                    Err(e) => {
                        warn!("{} monitor rejected an observation: {}", monitor.kind(), e);
                        ingest_errors[index] = Some(e);
                    }
                }
            }
        }

        let mut outcomes = Vec::with_capacity(self.monitors.len());
        for (index, monitor) in self.monitors.iter_mut().enumerate() {
            let kind = monitor.kind();
            let result = match ingest_errors[index].take() {
                Some(e) => Err(e),
                None => produce_report(monitor.as_mut(), &self.options, formatter.as_ref(), &run_dir, now),
            };
            match &result {
                Ok(run) => info!("{} monitor: {} ({})", kind, run.status, run.report_path.display()),
                Err(e) => error!("{} monitor failed: {}", kind, e),
            }
            outcomes.push(MonitorOutcome {
                kind,
                ingested: ingested[index],
                result,
            });
        }

        let summary = summary_report(&outcomes, &self.options, &run_dir, now)?;
        let content = formatter.render(&summary)?;
        let summary_path = ReportWriter::new(&run_dir).write_at(SUMMARY_KIND, self.options.format, &content, now)?;

        Ok(RunOutcome {
            run_dir,
            outcomes,
            summary_path,
        })
    }
}

fn produce_report(
    monitor: &mut dyn Monitor,
    options: &RunOptions,
    formatter: &dyn ReportFormatter,
    run_dir: &Path,
    now: DateTime<Utc>,
) -> Result<MonitorRun> {
    let built = monitor.build_report(options.detailed)?;
    let report = built.report.at(now);
    let content = formatter.render(&report)?;

    let dir = monitor.reports_dir().unwrap_or(run_dir).to_path_buf();
    let report_path = ReportWriter::new(dir).write_at(monitor.kind().as_str(), options.format, &content, now)?;

    Ok(MonitorRun {
        status: built.status,
        report_path,
    })
}

/// Report path as seen from the run directory
fn link(path: &Path, run_dir: &Path) -> String {
    path.strip_prefix(run_dir).unwrap_or(path).display().to_string()
}

fn summary_report(outcomes: &[MonitorOutcome], options: &RunOptions, run_dir: &Path, now: DateTime<Utc>) -> Result<Report> {
    let entries: Vec<_> = outcomes
        .iter()
        .map(|outcome| match &outcome.result {
            Ok(run) => json!({
                "monitor": outcome.kind,
                "status": run.status,
                "report": link(&run.report_path, run_dir),
                "ingested": outcome.ingested,
            }),
            Err(e) => json!({
                "monitor": outcome.kind,
                "error": e.to_string(),
                "ingested": outcome.ingested,
            }),
        })
        .collect();
    let failed = outcomes.iter().filter(|outcome| !outcome.succeeded()).count();
    let summary = json!({
        "run_dir": run_dir.display().to_string(),
        "monitors": entries,
        "succeeded": outcomes.len() - failed,
        "failed": failed,
    });

    let rows = outcomes
        .iter()
        .map(|outcome| match &outcome.result {
            Ok(run) => Row::new([
                outcome.kind.to_string(),
                run.status.to_string(),
                link(&run.report_path, run_dir),
            ])
            .with_status(true),
            Err(e) => Row::new([outcome.kind.to_string(), "failed".to_string(), e.to_string()]).with_status(false),
        })
        .collect();

    Ok(Report::new(SUMMARY_KIND, "Monitoring Summary", &summary, options)?
        .at(now)
        .with_section(
            Section::new("Monitors")
                .with_status(failed == 0)
                .table(["monitor", "status", "report"], rows),
        ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::SampleGenerator;
    use tempfile::TempDir;

    #[test]
    fn test_run_writes_every_report_and_summary() {
        let dir = TempDir::new().unwrap();
        let options = RunOptions {
            output_dir: dir.path().to_path_buf(),
            format: ReportFormat::Json,
            detailed: false,
        };
        let mut runner = Runner::new(&MonitorConfig::default(), options).unwrap();
        let outcome = runner.run(SampleGenerator::new(1).generate()).unwrap();

        assert!(outcome.all_succeeded());
        assert_eq!(outcome.outcomes.len(), 4);
        assert!(outcome.summary_path.exists());
        let files = fs::read_dir(&outcome.run_dir).unwrap().count();
        assert_eq!(files, 5);

        let summary: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&outcome.summary_path).unwrap()).unwrap();
        assert_eq!(summary["summary"]["failed"], json!(0));
        assert_eq!(summary["summary"]["monitors"].as_array().unwrap().len(), 4);
    }

    #[test]
    fn test_only_selected_monitors() {
        let dir = TempDir::new().unwrap();
        let options = RunOptions {
            output_dir: dir.path().to_path_buf(),
            format: ReportFormat::Console,
            detailed: true,
        };
        let mut runner = Runner::only(&MonitorConfig::default(), options, &[MonitorKind::Errors]).unwrap();
        assert_eq!(runner.kinds(), vec![MonitorKind::Errors]);

        let outcome = runner.run(Vec::new()).unwrap();
        let errors = outcome.outcome(MonitorKind::Errors).unwrap();
        assert_eq!(errors.result.as_ref().unwrap().status, MonitorStatus::Compliant);
        assert_eq!(errors.ingested, 0);
    }
}
