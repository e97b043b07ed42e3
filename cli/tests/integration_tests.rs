use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn finishline() -> Command {
    let mut cmd = Command::cargo_bin("finishline").unwrap();
    cmd.env("NO_COLOR", "1").arg("--no-color");
    cmd
}

/// The single timestamped run directory under a reports root
fn run_dir(root: &Path) -> PathBuf {
    let dirs: Vec<PathBuf> = fs::read_dir(root)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|path| path.is_dir())
        .collect();
    assert_eq!(dirs.len(), 1, "expected one run directory, found {:?}", dirs);
    dirs.into_iter().next().unwrap()
}

fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}

#[test]
fn test_cli_help() {
    finishline()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Finishline CLI"));
}

#[test]
fn test_cli_version() {
    finishline()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("finishline"));
}

#[test]
fn test_run_writes_all_reports_as_json() {
    let temp_dir = TempDir::new().unwrap();
    finishline()
        .args(["--format", "json", "--output"])
        .arg(temp_dir.path())
        .args(["run", "--seed", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Summary written to"));

    let dir = run_dir(temp_dir.path());
    let names = file_names(&dir);
    assert_eq!(names.len(), 5, "unexpected files {:?}", names);
    for kind in ["compliance", "errors", "performance", "summary", "usage"] {
        assert!(
            names.iter().any(|name| name.starts_with(&format!("{}-report-", kind)) && name.ends_with(".json")),
            "missing {} report in {:?}",
            kind,
            names
        );
    }

    let summary = names.iter().find(|name| name.starts_with("summary-report-")).unwrap();
    let summary: serde_json::Value = serde_json::from_str(&fs::read_to_string(dir.join(summary)).unwrap()).unwrap();
    assert_eq!(summary["summary"]["failed"], 0);
    assert_eq!(summary["summary"]["succeeded"], 4);
}

#[test]
fn test_monitor_errors_from_input_file() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("events.jsonl");
    fs::write(
        &input,
        concat!(
            "{\"type\": \"error\", \"message\": \"Failed to fetch\", \"category\": \"network\"}\n",
            "{\"type\": \"error\", \"message\": \"Failed to fetch\", \"category\": \"network\"}\n",
            "{\"type\": \"web-vital\", \"name\": \"LCP\", \"value\": 2200, \"rating\": \"good\"}\n",
        ),
    )
    .unwrap();
    let reports = temp_dir.path().join("reports");

    finishline()
        .args(["--format", "console", "--output"])
        .arg(&reports)
        .args(["monitor", "errors", "--input"])
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("errors"));

    let names = file_names(&run_dir(&reports));
    assert_eq!(names.len(), 2);
    let errors = names.iter().find(|name| name.starts_with("errors-report-")).unwrap();
    assert!(errors.ends_with(".txt"));
    let content = fs::read_to_string(run_dir(&reports).join(errors)).unwrap();
    assert!(content.contains("network"));
}

#[test]
fn test_malformed_input_exits_with_input_error() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("events.json");
    fs::write(&input, "[{\"type\": \"web-vital\", \"name\": \"LCP\"").unwrap();

    finishline()
        .arg("--output")
        .arg(temp_dir.path().join("reports"))
        .args(["run", "--input"])
        .arg(&input)
        .assert()
        .code(4)
        .stderr(predicate::str::contains("Invalid Input"));
}

#[test]
fn test_invalid_observation_exits_with_input_error() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("events.json");
    fs::write(&input, r#"[{"type": "usage", "category": "feature", "name": "  "}]"#).unwrap();

    finishline()
        .arg("--output")
        .arg(temp_dir.path().join("reports"))
        .args(["run", "--input"])
        .arg(&input)
        .assert()
        .code(4)
        .stderr(predicate::str::contains("usage.name"));
}

#[test]
fn test_missing_config_file_exits_with_config_error() {
    let temp_dir = TempDir::new().unwrap();
    finishline()
        .arg("--config")
        .arg(temp_dir.path().join("absent.toml"))
        .arg("run")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Configuration Error"));
}

#[test]
fn test_config_init_then_validate() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("finishline.toml");

    finishline()
        .args(["config", "init", "--path"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration written"));

    let content = fs::read_to_string(&path).unwrap();
    assert!(content.contains("[performance"));
    assert!(content.contains("sampling_rate"));

    finishline()
        .arg("--config")
        .arg(&path)
        .args(["config", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"));

    // A second init without --force leaves the file alone
    finishline()
        .args(["config", "init", "--path"])
        .arg(&path)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--force"));
}

#[test]
fn test_config_validate_rejects_out_of_range_rate() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("finishline.toml");
    fs::write(&path, "[performance]\nsampling_rate = 2.0\n").unwrap();

    finishline()
        .arg("--config")
        .arg(&path)
        .args(["config", "validate"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("performance.sampling_rate"));
}

#[test]
fn test_config_show_json() {
    finishline()
        .args(["--format", "json", "config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"thresholds\""))
        .stdout(predicate::str::contains("\"reports\""));
}

#[test]
fn test_unknown_monitor_is_rejected() {
    finishline().args(["monitor", "latency"]).assert().failure();
}
