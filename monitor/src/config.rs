//! Configuration management for the Finishline monitors
//!
//! Configuration is layered with the `config` crate: built-in defaults, then an
//! optional TOML/JSON file, then `FINISHLINE_<SECTION>__<KEY>` environment
//! variables. Every section is `#[serde(default)]`, so missing keys fall back
//! to the documented defaults and unknown keys are ignored. The resulting
//! [`MonitorConfig`] is immutable once a monitor is constructed from it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{MonitorError, Result};
use crate::report::ReportFormat;

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "FINISHLINE";

/// Root configuration, one section per monitor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub performance: PerformanceConfig,
    pub errors: ErrorConfig,
    pub usage: UsageConfig,
    pub compliance: ComplianceConfig,
    pub reports: ReportSettings,
}

/// Web vital thresholds in milliseconds (CLS is unitless)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VitalThresholds {
    pub fcp: f64,
    pub lcp: f64,
    pub fid: f64,
    pub cls: f64,
    pub ttfb: f64,
    pub tbt: f64,
}

impl Default for VitalThresholds {
    fn default() -> Self {
        Self {
            fcp: 1800.0,
            lcp: 2500.0,
            fid: 100.0,
            cls: 0.1,
            ttfb: 600.0,
            tbt: 300.0,
        }
    }
}

impl VitalThresholds {
    /// Threshold for a vital name, matched case-insensitively
    pub fn get(&self, name: &str) -> Option<f64> {
        match name.to_ascii_lowercase().as_str() {
            "fcp" => Some(self.fcp),
            "lcp" => Some(self.lcp),
            "fid" => Some(self.fid),
            "cls" => Some(self.cls),
            "ttfb" => Some(self.ttfb),
            "tbt" => Some(self.tbt),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> {
        [
            ("fcp", self.fcp),
            ("lcp", self.lcp),
            ("fid", self.fid),
            ("cls", self.cls),
            ("ttfb", self.ttfb),
            ("tbt", self.tbt),
        ]
        .into_iter()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    pub thresholds: VitalThresholds,
    /// Components whose renders are tracked; empty tracks every component
    pub components: Vec<String>,
    pub sampling_rate: f64,
    pub max_events_per_session: usize,
    /// p95 render time above which a component is reported as slow
    pub render_budget_ms: f64,
    pub reports_dir: Option<PathBuf>,
    pub verbose: bool,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            thresholds: VitalThresholds::default(),
            components: Vec::new(),
            sampling_rate: 1.0,
            max_events_per_session: 1000,
            render_budget_ms: 16.0,
            reports_dir: None,
            verbose: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorConfig {
    pub enabled: bool,
    pub max_errors: usize,
    /// Per-category count above which an alert is raised
    pub alert_threshold: usize,
    pub anonymize: bool,
    pub reports_dir: Option<PathBuf>,
    pub verbose: bool,
}

impl Default for ErrorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_errors: 1000,
            alert_threshold: 10,
            anonymize: true,
            reports_dir: None,
            verbose: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UsageConfig {
    pub enabled: bool,
    /// Track component usage events
    pub components: bool,
    /// Track feature usage events
    pub features: bool,
    pub track_flows: bool,
    pub max_events: usize,
    pub max_flows: usize,
    pub reports_dir: Option<PathBuf>,
    pub verbose: bool,
    pub sampling_rate: f64,
    pub anonymize: bool,
    pub retention_period_days: u32,
}

impl Default for UsageConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            components: true,
            features: true,
            track_flows: true,
            max_events: 1000,
            max_flows: 100,
            reports_dir: None,
            verbose: false,
            sampling_rate: 1.0,
            anonymize: true,
            retention_period_days: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComplianceConfig {
    pub accessibility: AccessibilityConfig,
    pub performance: BudgetConfig,
    pub bundle_size: BundleSizeConfig,
    /// Per-kind bound on buffered accessibility issues, bundle files and vitals
    pub max_events: usize,
    pub reports_dir: Option<PathBuf>,
    pub verbose: bool,
}

impl Default for ComplianceConfig {
    fn default() -> Self {
        Self {
            accessibility: AccessibilityConfig::default(),
            performance: BudgetConfig::default(),
            bundle_size: BundleSizeConfig::default(),
            max_events: 1000,
            reports_dir: None,
            verbose: false,
        }
    }
}

/// Maximum tolerated issue count per severity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeverityThresholds {
    pub critical: usize,
    pub serious: usize,
    pub moderate: usize,
    pub minor: usize,
}

impl Default for SeverityThresholds {
    fn default() -> Self {
        Self {
            critical: 0,
            serious: 0,
            moderate: 5,
            minor: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessibilityConfig {
    pub standard: String,
    pub level: String,
    pub thresholds: SeverityThresholds,
}

impl Default for AccessibilityConfig {
    fn default() -> Self {
        Self {
            standard: "WCAG 2.1".to_string(),
            level: "AA".to_string(),
            thresholds: SeverityThresholds::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetConfig {
    /// Size budgets in KB
    pub budgets: BTreeMap<String, f64>,
    /// Time budgets in milliseconds
    pub time_budgets: BTreeMap<String, f64>,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            budgets: [("javascript", 250.0), ("css", 50.0), ("total", 500.0)]
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            time_budgets: [("fcp", 1800.0), ("lcp", 2500.0), ("ttfb", 600.0), ("tbt", 300.0)]
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BundleSizeConfig {
    pub track_history: bool,
    /// Percent growth of a main chunk that counts as a regression
    pub regression_threshold: f64,
    pub main_chunks: Vec<String>,
    pub history_capacity: usize,
    /// Optional JSON snapshot of the history ring buffer
    pub history_file: Option<PathBuf>,
}

impl Default for BundleSizeConfig {
    fn default() -> Self {
        Self {
            track_history: true,
            regression_threshold: 10.0,
            main_chunks: vec!["main".to_string(), "vendor".to_string()],
            history_capacity: 10,
            history_file: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSettings {
    pub root_dir: PathBuf,
    pub format: ReportFormat,
    pub detailed: bool,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("./reports"),
            format: ReportFormat::Console,
            detailed: false,
        }
    }
}

impl MonitorConfig {
    /// Load layered configuration: defaults, optional file, environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            if !path.exists() {
                return Err(MonitorError::Config(config::ConfigError::NotFound(
                    path.display().to_string(),
                )));
            }
            builder = builder.add_source(config::File::from(path));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: MonitorConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file without environment overrides
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: MonitorConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        check_rate("performance.sampling_rate", self.performance.sampling_rate)?;
        check_rate("usage.sampling_rate", self.usage.sampling_rate)?;

        check_positive_count("performance.max_events_per_session", self.performance.max_events_per_session)?;
        check_positive_count("errors.max_errors", self.errors.max_errors)?;
        check_positive_count("usage.max_events", self.usage.max_events)?;
        check_positive_count("usage.max_flows", self.usage.max_flows)?;
        check_positive_count("compliance.max_events", self.compliance.max_events)?;
        check_positive_count("compliance.bundle_size.history_capacity", self.compliance.bundle_size.history_capacity)?;

        for (name, value) in self.performance.thresholds.iter() {
            check_non_negative(&format!("performance.thresholds.{}", name), value)?;
        }
        check_non_negative("performance.render_budget_ms", self.performance.render_budget_ms)?;
        check_non_negative(
            "compliance.bundle_size.regression_threshold",
            self.compliance.bundle_size.regression_threshold,
        )?;

        for (name, value) in &self.compliance.performance.budgets {
            check_positive(&format!("compliance.performance.budgets.{}", name), *value)?;
        }
        for (name, value) in &self.compliance.performance.time_budgets {
            check_positive(&format!("compliance.performance.time_budgets.{}", name), *value)?;
        }

        Ok(())
    }
}

fn check_rate(field: &str, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(MonitorError::invalid_config(field, format!("{} is outside [0, 1]", value)));
    }
    Ok(())
}

fn check_positive_count(field: &str, value: usize) -> Result<()> {
    if value == 0 {
        return Err(MonitorError::invalid_config(field, "must be greater than 0"));
    }
    Ok(())
}

fn check_non_negative(field: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(MonitorError::invalid_config(field, format!("{} must be a non-negative number", value)));
    }
    Ok(())
}

fn check_positive(field: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(MonitorError::invalid_config(field, format!("{} must be greater than 0", value)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_are_valid() {
        let config = MonitorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.performance.thresholds.lcp, 2500.0);
        assert_eq!(config.compliance.bundle_size.history_capacity, 10);
        assert_eq!(config.compliance.bundle_size.regression_threshold, 10.0);
        assert_eq!(config.usage.max_flows, 100);
    }

    #[test]
    fn test_threshold_lookup_is_case_insensitive() {
        let thresholds = VitalThresholds::default();
        assert_eq!(thresholds.get("LCP"), Some(2500.0));
        assert_eq!(thresholds.get("cls"), Some(0.1));
        assert_eq!(thresholds.get("INP"), None);
    }

    #[test]
    fn test_partial_file_falls_back_to_defaults() {
        let toml = r#"
            [performance]
            sampling_rate = 0.5
            unknown_option = "ignored"

            [compliance.bundle_size]
            regression_threshold = 5.0
        "#;
        let config: MonitorConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.performance.sampling_rate, 0.5);
        assert_eq!(config.performance.thresholds, VitalThresholds::default());
        assert_eq!(config.compliance.bundle_size.regression_threshold, 5.0);
        assert_eq!(config.compliance.bundle_size.main_chunks, vec!["main", "vendor"]);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = MonitorConfig::default();
        config.usage.sampling_rate = 1.5;
        assert!(matches!(
            config.validate(),
            Err(MonitorError::InvalidConfig { ref field, .. }) if field == "usage.sampling_rate"
        ));

        let mut config = MonitorConfig::default();
        config.compliance.performance.budgets.insert("images".to_string(), 0.0);
        assert!(config.validate().is_err());

        let mut config = MonitorConfig::default();
        config.compliance.bundle_size.history_capacity = 0;
        assert!(config.validate().is_err());

        let mut config = MonitorConfig::default();
        config.compliance.max_events = 0;
        assert!(matches!(
            config.validate(),
            Err(MonitorError::InvalidConfig { ref field, .. }) if field == "compliance.max_events"
        ));
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("finishline.toml");

        let mut config = MonitorConfig::default();
        config.performance.components = vec!["DatasetTable".to_string()];
        config.save_to_file(&path).unwrap();

        let loaded = MonitorConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_layered_load_reads_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("finishline.toml");
        std::fs::write(&path, "[errors]\nalert_threshold = 3\n").unwrap();

        let config = MonitorConfig::load(Some(&path)).unwrap();
        assert_eq!(config.errors.alert_threshold, 3);
        assert_eq!(config.errors.max_errors, 1000);
    }

    #[test]
    fn test_layered_load_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let result = MonitorConfig::load(Some(&dir.path().join("absent.toml")));
        assert!(matches!(result, Err(MonitorError::Config(_))));
    }
}
