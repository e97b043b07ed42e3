//! Report encodings
//!
//! JSON carries the report data verbatim. HTML and console text render the
//! same [`ReportDocument`], so every name that shows up in the data shows up
//! in the other two encodings as well.

use std::fmt::Write as _;

use chrono::{DateTime, SecondsFormat, Utc};
use handlebars::Handlebars;
use serde::Serialize;
use serde_json::Value;

use super::document::{Block, ReportDocument, Row, Section};
use super::{Report, ReportFormat};
use crate::error::{MonitorError, Result};

pub trait ReportFormatter: Send + Sync {
    fn format(&self) -> ReportFormat;

    fn render(&self, report: &Report) -> Result<String>;
}

pub fn formatter_for(format: ReportFormat) -> Result<Box<dyn ReportFormatter>> {
    Ok(match format {
        ReportFormat::Json => Box::new(JsonFormatter),
        ReportFormat::Html => Box::new(HtmlFormatter::new()?),
        ReportFormat::Console => Box::new(ConsoleFormatter::default()),
    })
}

#[derive(Serialize)]
struct JsonReport<'a> {
    summary: &'a Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    detailed_metrics: Option<&'a Value>,
    config: &'a Value,
    timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormatter;

impl ReportFormatter for JsonFormatter {
    fn format(&self) -> ReportFormat {
        ReportFormat::Json
    }

    fn render(&self, report: &Report) -> Result<String> {
        let data = JsonReport {
            summary: &report.summary,
            detailed_metrics: report.detailed_metrics.as_ref(),
            config: &report.config,
            timestamp: report.timestamp,
        };
        Ok(serde_json::to_string_pretty(&data)?)
    }
}

const HTML_TEMPLATE_NAME: &str = "report";

const HTML_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{{title}}</title>
<style>
body { font-family: -apple-system, "Segoe UI", sans-serif; margin: 2rem; color: #222; }
h1 { margin-bottom: 0.2rem; }
.timestamp { color: #666; margin-top: 0; }
section { margin: 1.5rem 0; }
table { border-collapse: collapse; margin: 0.5rem 0; }
th, td { border: 1px solid #ccc; padding: 0.3rem 0.6rem; text-align: left; }
th { background: #f4f4f4; }
tr.pass td, span.pass { color: #1a7f37; }
tr.fail td, span.fail { color: #cf222e; font-weight: bold; }
dl { display: grid; grid-template-columns: max-content auto; gap: 0.2rem 1rem; }
dt { font-weight: bold; }
dd { margin: 0; }
</style>
</head>
<body>
<h1>{{title}}</h1>
<p class="timestamp">Generated {{timestamp}}</p>
{{#each sections}}
<section>
<h2>{{title}}{{#if status}} <span class="{{status}}">{{status_label}}</span>{{/if}}</h2>
{{#each blocks}}
{{#if table}}
<table>
<thead><tr>{{#each table.headers}}<th>{{this}}</th>{{/each}}{{#if table.has_status}}<th>status</th>{{/if}}</tr></thead>
<tbody>
{{#each table.rows}}
<tr{{#if status}} class="{{status}}"{{/if}}>{{#each cells}}<td>{{this}}</td>{{/each}}{{#if status}}<td>{{status_label}}</td>{{/if}}</tr>
{{/each}}
</tbody>
</table>
{{/if}}
{{#if key_values}}
<dl>
{{#each key_values}}<dt>{{key}}</dt><dd>{{value}}</dd>
{{/each}}
</dl>
{{/if}}
{{#if list}}
<ul>
{{#each list}}<li>{{this}}</li>
{{/each}}
</ul>
{{/if}}
{{/each}}
</section>
{{/each}}
</body>
</html>
"#;

#[derive(Serialize)]
struct HtmlDocument {
    title: String,
    timestamp: String,
    sections: Vec<HtmlSection>,
}

#[derive(Serialize)]
struct HtmlSection {
    title: String,
    status: Option<&'static str>,
    status_label: Option<&'static str>,
    blocks: Vec<HtmlBlock>,
}

#[derive(Serialize, Default)]
struct HtmlBlock {
    table: Option<HtmlTable>,
    key_values: Option<Vec<HtmlPair>>,
    list: Option<Vec<String>>,
}

#[derive(Serialize)]
struct HtmlTable {
    headers: Vec<String>,
    has_status: bool,
    rows: Vec<HtmlRow>,
}

#[derive(Serialize)]
struct HtmlRow {
    cells: Vec<String>,
    status: Option<&'static str>,
    status_label: Option<&'static str>,
}

#[derive(Serialize)]
struct HtmlPair {
    key: String,
    value: String,
}

impl HtmlDocument {
    fn from_document(document: &ReportDocument) -> Self {
        Self {
            title: document.title.clone(),
            timestamp: document.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            sections: document.sections.iter().map(HtmlSection::from_section).collect(),
        }
    }
}

impl HtmlSection {
    fn from_section(section: &Section) -> Self {
        Self {
            title: section.title.clone(),
            status: section.status.map(|s| s.as_str()),
            status_label: section.status.map(|s| s.label()),
            blocks: section.blocks.iter().map(HtmlBlock::from_block).collect(),
        }
    }
}

impl HtmlBlock {
    fn from_block(block: &Block) -> Self {
        match block {
            Block::Table { headers, rows } => HtmlBlock {
                table: Some(HtmlTable {
                    headers: headers.clone(),
                    has_status: rows.iter().any(|row| row.status.is_some()),
                    rows: rows
                        .iter()
                        .map(|row| HtmlRow {
                            cells: row.cells.clone(),
                            status: row.status.map(|s| s.as_str()),
                            status_label: row.status.map(|s| s.label()),
                        })
                        .collect(),
                }),
                ..HtmlBlock::default()
            },
            Block::KeyValues(pairs) => HtmlBlock {
                key_values: Some(
                    pairs
                        .iter()
                        .map(|(key, value)| HtmlPair {
                            key: key.clone(),
                            value: value.clone(),
                        })
                        .collect(),
                ),
                ..HtmlBlock::default()
            },
            Block::List(items) => HtmlBlock {
                list: Some(items.clone()),
                ..HtmlBlock::default()
            },
        }
    }
}

/// Handlebars-backed HTML encoding; all interpolated text is escaped
pub struct HtmlFormatter {
    registry: Handlebars<'static>,
}

impl HtmlFormatter {
    pub fn new() -> Result<Self> {
        let mut registry = Handlebars::new();
        registry
            .register_template_string(HTML_TEMPLATE_NAME, HTML_TEMPLATE)
            .map_err(|e| MonitorError::Template(e.to_string()))?;
        Ok(Self { registry })
    }
}

impl ReportFormatter for HtmlFormatter {
    fn format(&self) -> ReportFormat {
        ReportFormat::Html
    }

    fn render(&self, report: &Report) -> Result<String> {
        let view = HtmlDocument::from_document(&report.document());
        self.registry
            .render(HTML_TEMPLATE_NAME, &view)
            .map_err(|e| MonitorError::Template(e.to_string()))
    }
}

/// Plain ASCII encoding for terminals and `.txt` files
#[derive(Debug, Clone, Copy)]
pub struct ConsoleFormatter {
    pub width: usize,
}

impl Default for ConsoleFormatter {
    fn default() -> Self {
        Self { width: 72 }
    }
}

impl ConsoleFormatter {
    fn render_table(&self, out: &mut String, headers: &[String], rows: &[Row]) {
        let has_status = rows.iter().any(|row| row.status.is_some());
        let columns = headers.len().max(rows.iter().map(|r| r.cells.len()).max().unwrap_or(0));

        let mut widths = vec![0usize; columns];
        for (i, header) in headers.iter().enumerate() {
            widths[i] = widths[i].max(header.chars().count());
        }
        for row in rows {
            for (i, cell) in row.cells.iter().enumerate() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }

        let line = |cells: &[String], status: &str| -> String {
            let mut text = String::from("  ");
            for (i, width) in widths.iter().enumerate() {
                let cell = cells.get(i).map(String::as_str).unwrap_or("");
                let _ = write!(text, "{:<width$}  ", cell, width = width);
            }
            text.push_str(status);
            text.trim_end().to_string()
        };

        let _ = writeln!(out, "{}", line(headers, if has_status { "STATUS" } else { "" }));
        let rule_width = widths.iter().map(|w| w + 2).sum::<usize>() + if has_status { 6 } else { 0 };
        let _ = writeln!(out, "  {}", "-".repeat(rule_width.saturating_sub(2)));
        for row in rows {
            let marker = row.status.map(|s| s.label()).unwrap_or("");
            let _ = writeln!(out, "{}", line(&row.cells, marker));
        }
    }
}

impl ReportFormatter for ConsoleFormatter {
    fn format(&self) -> ReportFormat {
        ReportFormat::Console
    }

    fn render(&self, report: &Report) -> Result<String> {
        let document = report.document();
        let mut out = String::new();
        let rule = "=".repeat(self.width);

        let _ = writeln!(out, "{}", rule);
        let _ = writeln!(out, " {}", document.title);
        let _ = writeln!(
            out,
            " Generated: {}",
            document.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
        );
        let _ = writeln!(out, "{}", rule);

        for section in &document.sections {
            out.push('\n');
            match section.status {
                Some(status) => {
                    let _ = writeln!(out, "== {} [{}] ==", section.title, status.label());
                }
                None => {
                    let _ = writeln!(out, "== {} ==", section.title);
                }
            }

            for block in &section.blocks {
                match block {
                    Block::Table { headers, rows } => self.render_table(&mut out, headers, rows),
                    Block::KeyValues(pairs) => {
                        let key_width = pairs.iter().map(|(k, _)| k.chars().count()).max().unwrap_or(0);
                        for (key, value) in pairs {
                            let _ = writeln!(out, "  {:<width$} : {}", key, value, width = key_width);
                        }
                    }
                    Block::List(items) => {
                        for item in items {
                            let _ = writeln!(out, "  - {}", item);
                        }
                    }
                }
            }
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_report() -> Report {
        Report::new(
            "performance",
            "Performance Report",
            &json!({"web_vitals": {"LCP": {"avg": 2650.0}}}),
            &json!({"thresholds": {"lcp": 2500.0}}),
        )
        .unwrap()
        .with_section(
            Section::new("Web Vitals")
                .with_status(false)
                .table(["metric", "avg"], vec![Row::new(["LCP", "2650"]).with_status(false)]),
        )
        .with_section(Section::new("Notes").list(["<script>alert(1)</script>"]))
    }

    #[test]
    fn test_json_is_report_data() {
        let rendered = JsonFormatter.render(&sample_report()).unwrap();
        let value: Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(value["summary"]["web_vitals"]["LCP"]["avg"], json!(2650.0));
        assert_eq!(value["config"]["thresholds"]["lcp"], json!(2500.0));
        assert!(value.get("timestamp").is_some());
        assert!(value.get("detailed_metrics").is_none());
    }

    #[test]
    fn test_html_marks_rows_and_escapes() {
        let rendered = HtmlFormatter::new().unwrap().render(&sample_report()).unwrap();
        assert!(rendered.contains("<tr class=\"fail\">"));
        assert!(rendered.contains("<td>LCP</td>"));
        assert!(rendered.contains("Configuration"));
        assert!(!rendered.contains("<script>"));
        assert!(rendered.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_console_has_markers_and_sections() {
        let rendered = ConsoleFormatter::default().render(&sample_report()).unwrap();
        assert!(rendered.contains("== Web Vitals [FAIL] =="));
        assert!(rendered.contains("LCP"));
        assert!(rendered.contains("FAIL"));
        assert!(rendered.contains("== Configuration =="));
        assert!(rendered.contains("thresholds.lcp : 2500.0"));
        assert!(rendered.contains("== Summary Data =="));
        assert!(rendered.contains("web_vitals.LCP.avg : 2650.0"));
        assert!(rendered.is_ascii());
    }

    #[test]
    fn test_formatter_for_matches_format() {
        for format in ReportFormat::ALL {
            assert_eq!(formatter_for(format).unwrap().format(), format);
        }
    }
}
