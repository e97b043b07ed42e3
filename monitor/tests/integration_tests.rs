//! Integration tests for the Finishline monitors

use std::fs;
use std::path::Path;

use serde_json::{json, Value};
use tempfile::TempDir;

use finishline_monitor::{
    compliance::PerformanceMeasurements,
    config::{BundleSizeConfig, ComplianceConfig, MonitorConfig},
    monitors::{
        ComplianceMonitor, ErrorMonitor, Monitor, MonitorKind, MonitorReport, MonitorStatus, PerformanceMonitor,
        UsageAnalytics,
    },
    observation::{
        AccessibilityIssue, BundleFile, ComponentRender, ErrorEvent, Observation, Rating, UsageCategory,
        UsageEvent, UserInteraction, WebVital,
    },
    report::{ConsoleFormatter, HtmlFormatter, JsonFormatter, ReportFormat, ReportFormatter},
    EventRecorder, EventStore, MonitorError, Report, RunOptions, Runner, SampleGenerator,
};

const KB: u64 = 1024;

fn options(dir: &Path, format: ReportFormat) -> RunOptions {
    RunOptions {
        output_dir: dir.to_path_buf(),
        format,
        detailed: false,
    }
}

fn scenario_vitals() -> Vec<Observation> {
    vec![
        WebVital::new("LCP", 2200.0, Rating::Good).into(),
        WebVital::new("LCP", 3100.0, Rating::NeedsImprovement).into(),
        WebVital::new("FID", 95.0, Rating::Good).into(),
    ]
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

/// Fails every report build
struct BrokenMonitor;

impl Monitor for BrokenMonitor {
    fn kind(&self) -> MonitorKind {
        MonitorKind::Usage
    }

    fn accepts(&self, _observation: &Observation) -> bool {
        true
    }

    fn ingest(&mut self, _observation: Observation) -> finishline_monitor::Result<bool> {
        Ok(true)
    }

    fn build_report(&mut self, _detailed: bool) -> finishline_monitor::Result<MonitorReport> {
        Err(MonitorError::Template("template exploded".to_string()))
    }
}

#[test]
fn test_end_to_end_vital_scenario() {
    let dir = TempDir::new().unwrap();
    let mut runner = Runner::only(
        &MonitorConfig::default(),
        options(dir.path(), ReportFormat::Json),
        &[MonitorKind::Performance],
    )
    .unwrap();

    let outcome = runner.run(scenario_vitals()).unwrap();
    assert!(outcome.all_succeeded());

    let performance = outcome.outcome(MonitorKind::Performance).unwrap();
    assert_eq!(performance.ingested, 3);
    let run = performance.result.as_ref().unwrap();
    assert_eq!(run.status, MonitorStatus::HasViolations);

    let report = read_json(&run.report_path);
    let vitals = &report["summary"]["web_vitals"];
    assert_eq!(vitals["LCP"]["count"], json!(2));
    assert_eq!(vitals["LCP"]["avg"], json!(2650.0));
    assert_eq!(
        vitals["LCP"]["ratings"],
        json!({"good": 1, "needs-improvement": 1, "poor": 0})
    );
    assert_eq!(vitals["FID"]["count"], json!(1));
    assert_eq!(vitals["FID"]["avg"], json!(95.0));
    assert_eq!(vitals["FID"]["ratings"]["good"], json!(1));
}

/// Every object key and string value in a JSON tree
fn labels(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                out.push(key.clone());
                labels(child, out);
            }
        }
        Value::Array(items) => items.iter().for_each(|item| labels(item, out)),
        Value::String(text) => out.push(text.clone()),
        _ => {}
    }
}

fn unescape_html(html: &str) -> String {
    html.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&#x60;", "`")
        .replace("&#x3D;", "=")
        .replace("&amp;", "&")
}

fn assert_same_summary_data(kind: &str, json: &str, html: &str, console: &str) {
    let data: Value = serde_json::from_str(json).unwrap();
    let mut names = Vec::new();
    labels(&data["summary"], &mut names);
    assert!(!names.is_empty(), "{} summary is empty", kind);

    let html = unescape_html(html);
    for name in &names {
        assert!(html.contains(name.as_str()), "{} html is missing {}", kind, name);
        assert!(console.contains(name.as_str()), "{} console is missing {}", kind, name);
    }
}

fn render_all(kind: &str, report: &Report) {
    let json = JsonFormatter.render(report).unwrap();
    let html = HtmlFormatter::new().unwrap().render(report).unwrap();
    let console = ConsoleFormatter::default().render(report).unwrap();
    assert_same_summary_data(kind, &json, &html, &console);
}

#[test]
fn test_format_equivalence() {
    let mut performance = PerformanceMonitor::new(Default::default());
    for observation in scenario_vitals() {
        performance.ingest(observation).unwrap();
    }
    for (component, time) in [("ProductList", 12.0), ("Checkout", 30.0), ("Checkout", 9.0)] {
        performance.ingest(ComponentRender::new(component, time).into()).unwrap();
    }
    render_all("performance", &performance.build_report(true).unwrap().report);

    let mut errors = ErrorMonitor::new(Default::default());
    for (message, category) in [
        ("Failed to fetch /api/products", "network"),
        ("Failed to fetch /api/products", "network"),
        ("Cannot read properties of undefined", "runtime"),
    ] {
        errors.ingest(ErrorEvent::new(message, category).into()).unwrap();
    }
    render_all("errors", &errors.build_report(false).unwrap().report);

    let mut usage = UsageAnalytics::new(Default::default());
    usage
        .ingest(UsageEvent::new(UsageCategory::Feature, "export").in_session("s1").into())
        .unwrap();
    usage
        .ingest(UsageEvent::new(UsageCategory::PageView, "/checkout").in_session("s2").into())
        .unwrap();
    usage.ingest(UserInteraction::new("click", 40.0).into()).unwrap();
    if let Some(flow) = usage.start_flow("checkout", Some("s1".to_string())) {
        usage.complete_flow(&flow);
    }
    render_all("usage", &usage.build_report(false).unwrap().report);

    let mut compliance = ComplianceMonitor::new(ComplianceConfig::default()).unwrap();
    for observation in [
        Observation::from(BundleFile::new("main.abc123.js", 120 * KB)),
        BundleFile::new("main.abc123.css", 12 * KB).into(),
        BundleFile::new("favicon.ico", 4 * KB).into(),
        AccessibilityIssue::new("image-alt", "critical", "Images must have alternate text", 2).into(),
        WebVital::new("LCP", 2200.0, Rating::Good).into(),
    ] {
        compliance.ingest(observation).unwrap();
    }
    render_all("compliance", &compliance.build_report(false).unwrap().report);
}

#[test]
fn test_summary_report_carries_data_in_every_format() {
    let mut rendered = Vec::new();
    for format in [ReportFormat::Json, ReportFormat::Html, ReportFormat::Console] {
        let dir = TempDir::new().unwrap();
        let mut runner = Runner::new(&MonitorConfig::default(), options(dir.path(), format)).unwrap();
        let outcome = runner.run(scenario_vitals()).unwrap();
        rendered.push(fs::read_to_string(&outcome.summary_path).unwrap());
    }

    let data: Value = serde_json::from_str(&rendered[0]).unwrap();
    let html = unescape_html(&rendered[1]);
    for key in ["succeeded", "failed", "ingested", "monitors", "run_dir"] {
        assert!(data["summary"].to_string().contains(key));
        assert!(html.contains(key), "summary html is missing {}", key);
        assert!(rendered[2].contains(key), "summary console is missing {}", key);
    }
    assert!(rendered[2]
        .lines()
        .any(|line| line.trim_start().starts_with("succeeded ") && line.trim_end().ends_with(": 4")));
}

#[test]
fn test_runner_isolates_failing_monitor() {
    let dir = TempDir::new().unwrap();
    let monitors: Vec<Box<dyn Monitor>> = vec![
        Box::new(PerformanceMonitor::new(Default::default())),
        Box::new(BrokenMonitor),
    ];
    let mut runner = Runner::with_monitors(options(dir.path(), ReportFormat::Json), monitors);

    let outcome = runner.run(scenario_vitals()).unwrap();
    assert!(!outcome.all_succeeded());
    assert_eq!(outcome.failures().count(), 1);

    let performance = outcome.outcome(MonitorKind::Performance).unwrap();
    assert!(performance.result.as_ref().unwrap().report_path.exists());

    let summary = read_json(&outcome.summary_path);
    assert_eq!(summary["summary"]["failed"], json!(1));
    assert_eq!(summary["summary"]["succeeded"], json!(1));
    let entries = summary["summary"]["monitors"].as_array().unwrap();
    assert!(entries[1]["error"].as_str().unwrap().contains("template exploded"));
    assert!(entries[0]["report"].as_str().unwrap().starts_with("performance-report-"));
}

#[test]
fn test_every_format_writes_its_extension() {
    for (format, extension) in [
        (ReportFormat::Json, "json"),
        (ReportFormat::Html, "html"),
        (ReportFormat::Console, "txt"),
    ] {
        let dir = TempDir::new().unwrap();
        let mut runner = Runner::new(&MonitorConfig::default(), options(dir.path(), format)).unwrap();
        let outcome = runner.run(SampleGenerator::new(11).generate()).unwrap();
        assert!(outcome.all_succeeded());

        for entry in fs::read_dir(&outcome.run_dir).unwrap() {
            let path = entry.unwrap().path();
            assert_eq!(path.extension().unwrap(), extension);
            let stem = path.file_stem().unwrap().to_string_lossy().to_string();
            assert!(!stem.contains(':') && !stem.contains('.'), "bad file name {}", stem);
        }
    }
}

#[test]
fn test_bundle_regression_across_runs() {
    let dir = TempDir::new().unwrap();
    let config = ComplianceConfig {
        bundle_size: BundleSizeConfig {
            history_file: Some(dir.path().join("bundle-history.json")),
            ..BundleSizeConfig::default()
        },
        ..ComplianceConfig::default()
    };

    let mut first = ComplianceMonitor::new(config.clone()).unwrap();
    first.ingest(BundleFile::new("main.a1b2c3.js", 100 * KB).into()).unwrap();
    assert_eq!(first.build_report(false).unwrap().status, MonitorStatus::Compliant);

    let mut second = ComplianceMonitor::new(config).unwrap();
    second.ingest(BundleFile::new("main.d4e5f6.js", 115 * KB).into()).unwrap();
    let verdict = second.evaluate().unwrap();

    assert_eq!(verdict.bundle.regressions.len(), 1);
    let regression = &verdict.bundle.regressions[0];
    assert_eq!(regression.chunk, "main");
    assert!((regression.percent_change - 15.0).abs() < 1e-6);
    assert!(!verdict.compliant);
}

#[test]
fn test_compliance_budgets_and_accessibility() {
    let mut measurements = PerformanceMeasurements::default();
    measurements.sizes_kb.insert("javascript".to_string(), 100.0);
    let mut monitor = ComplianceMonitor::new(ComplianceConfig::default())
        .unwrap()
        .with_measurements(measurements);

    for _ in 0..5 {
        monitor
            .ingest(AccessibilityIssue::new("label", "moderate", "Missing label", 1).into())
            .unwrap();
    }
    let verdict = monitor.evaluate().unwrap();
    assert!(verdict.accessibility_compliant);
    assert!(verdict.size_compliant);

    monitor
        .ingest(AccessibilityIssue::new("label", "Moderate", "Missing label", 1).into())
        .unwrap();
    assert!(!monitor.evaluate().unwrap().accessibility_compliant);
}

#[tokio::test]
async fn test_recorder_feeds_runner() {
    let recorder = EventRecorder::spawn(EventStore::new(), 64);
    let observations = SampleGenerator::new(5).generate();
    let expected = observations.len();

    let mut producers = Vec::new();
    for chunk in observations.chunks(25).map(|chunk| chunk.to_vec()) {
        let recorder = recorder.clone();
        producers.push(tokio::spawn(async move {
            for observation in chunk {
                recorder.record(observation).await.unwrap();
            }
        }));
    }
    for producer in producers {
        producer.await.unwrap();
    }

    let store = recorder.shutdown().await.unwrap();
    assert_eq!(store.len(), expected);

    let dir = TempDir::new().unwrap();
    let mut runner = Runner::new(&MonitorConfig::default(), options(dir.path(), ReportFormat::Console)).unwrap();
    let outcome = runner.run(store.observations()).unwrap();
    assert!(outcome.all_succeeded());
}

#[test]
fn test_invalid_observation_is_rejected_with_field() {
    let mut store = EventStore::new();
    let err = store
        .record(ErrorEvent::new("   ", "runtime").into())
        .unwrap_err();
    assert!(err.to_string().contains("error.message"));

    let err = store
        .record(UsageEvent::new(UsageCategory::Feature, "").into())
        .unwrap_err();
    assert!(err.to_string().contains("usage.name"));
    assert!(store.is_empty());
}
