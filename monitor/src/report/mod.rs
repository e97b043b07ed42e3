//! Report model, encodings and file output

pub mod document;
pub mod render;
pub mod writer;

pub use document::{flatten_value, Block, ReportDocument, Row, Section, Status};
pub use render::{formatter_for, ConsoleFormatter, HtmlFormatter, JsonFormatter, ReportFormatter};
pub use writer::{file_timestamp, ReportWriter};

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{MonitorError, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Json,
    Html,
    #[default]
    Console,
}

impl ReportFormat {
    pub const ALL: [ReportFormat; 3] = [ReportFormat::Json, ReportFormat::Html, ReportFormat::Console];

    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Json => "json",
            ReportFormat::Html => "html",
            ReportFormat::Console => "txt",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportFormat::Json => "json",
            ReportFormat::Html => "html",
            ReportFormat::Console => "console",
        }
    }
}

impl std::fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportFormat {
    type Err = MonitorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(ReportFormat::Json),
            "html" => Ok(ReportFormat::Html),
            "console" | "text" | "txt" => Ok(ReportFormat::Console),
            other => Err(MonitorError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// A fully built report: machine-readable data plus its presentation
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub kind: String,
    pub title: String,
    pub timestamp: DateTime<Utc>,
    pub summary: Value,
    pub detailed_metrics: Option<Value>,
    pub config: Value,
    sections: Vec<Section>,
}

impl Report {
    pub fn new<S, C>(kind: impl Into<String>, title: impl Into<String>, summary: &S, config: &C) -> Result<Self>
    where
        S: Serialize + ?Sized,
        C: Serialize + ?Sized,
    {
        Ok(Self {
            kind: kind.into(),
            title: title.into(),
            timestamp: Utc::now(),
            summary: serde_json::to_value(summary)?,
            detailed_metrics: None,
            config: serde_json::to_value(config)?,
            sections: Vec::new(),
        })
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_detailed<D: Serialize + ?Sized>(mut self, detailed: &D) -> Result<Self> {
        self.detailed_metrics = Some(serde_json::to_value(detailed)?);
        Ok(self)
    }

    pub fn with_section(mut self, section: Section) -> Self {
        self.sections.push(section);
        self
    }

    pub fn with_sections(mut self, sections: impl IntoIterator<Item = Section>) -> Self {
        self.sections.extend(sections);
        self
    }

    /// The presentation document: monitor sections, then the flattened
    /// summary data and configuration, then detailed metrics when present.
    /// Every summary field reaches HTML and console through the data section.
    pub fn document(&self) -> ReportDocument {
        let mut sections = self.sections.clone();
        sections.push(Section::new("Summary Data").key_values(flatten_value(&self.summary)));
        sections.push(Section::new("Configuration").key_values(flatten_value(&self.config)));
        if let Some(detailed) = &self.detailed_metrics {
            sections.push(Section::new("Detailed Metrics").key_values(flatten_value(detailed)));
        }

        ReportDocument {
            title: self.title.clone(),
            timestamp: self.timestamp,
            sections,
        }
    }
}
