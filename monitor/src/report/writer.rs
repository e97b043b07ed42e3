//! Timestamped report files

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::info;

use super::ReportFormat;
use crate::error::Result;

/// RFC 3339 with milliseconds, made filename-safe
pub fn file_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true).replace([':', '.'], "-")
}

#[derive(Debug, Clone)]
pub struct ReportWriter {
    dir: PathBuf,
}

impl ReportWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn write(&self, kind: &str, format: ReportFormat, content: &str) -> Result<PathBuf> {
        self.write_at(kind, format, content, Utc::now())
    }

    /// Write `<dir>/<kind>-report-<timestamp>.<ext>`, creating `dir` if needed
    pub fn write_at(&self, kind: &str, format: ReportFormat, content: &str, at: DateTime<Utc>) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;

        let file_name = format!("{}-report-{}.{}", kind, file_timestamp(at), format.extension());
        let path = self.dir.join(file_name);
        fs::write(&path, content)?;

        info!("Wrote {} report to {}", kind, path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[test]
    fn test_file_name_shape() {
        let dir = TempDir::new().unwrap();
        let writer = ReportWriter::new(dir.path().join("nested"));
        let at = Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap() + chrono::Duration::milliseconds(42);

        let path = writer.write_at("performance", ReportFormat::Json, "{}", at).unwrap();
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert_eq!(name, "performance-report-2024-03-05T14-07-09-042Z.json");

        let stem = name.strip_suffix(".json").unwrap();
        assert!(!stem.contains(':'));
        assert!(!stem.contains('.'));
        assert_eq!(fs::read_to_string(&path).unwrap(), "{}");
    }

    #[test]
    fn test_directory_creation_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let writer = ReportWriter::new(dir.path());
        writer.write("errors", ReportFormat::Console, "a").unwrap();
        let path = writer.write("usage", ReportFormat::Html, "b").unwrap();
        assert_eq!(path.extension().unwrap(), "html");
    }
}
