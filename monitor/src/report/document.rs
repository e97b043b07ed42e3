//! Presentation model shared by every report encoding
//!
//! Monitors describe what a report shows as a [`ReportDocument`]; the
//! formatters only decide how it looks.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

/// Outcome marker on a section or table row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Pass,
    Fail,
}

impl Status {
    pub fn from_passes(passes: bool) -> Self {
        if passes {
            Status::Pass
        } else {
            Status::Fail
        }
    }

    /// CSS class name
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pass => "pass",
            Status::Fail => "fail",
        }
    }

    /// Console marker
    pub fn label(&self) -> &'static str {
        match self {
            Status::Pass => "PASS",
            Status::Fail => "FAIL",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Row {
    pub cells: Vec<String>,
    pub status: Option<Status>,
}

impl Row {
    pub fn new<I, S>(cells: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            cells: cells.into_iter().map(Into::into).collect(),
            status: None,
        }
    }

    pub fn with_status(mut self, passes: bool) -> Self {
        self.status = Some(Status::from_passes(passes));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Block {
    Table { headers: Vec<String>, rows: Vec<Row> },
    KeyValues(Vec<(String, String)>),
    List(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Section {
    pub title: String,
    pub status: Option<Status>,
    pub blocks: Vec<Block>,
}

impl Section {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            status: None,
            blocks: Vec::new(),
        }
    }

    pub fn with_status(mut self, passes: bool) -> Self {
        self.status = Some(Status::from_passes(passes));
        self
    }

    pub fn table<S: Into<String>>(mut self, headers: impl IntoIterator<Item = S>, rows: Vec<Row>) -> Self {
        self.blocks.push(Block::Table {
            headers: headers.into_iter().map(Into::into).collect(),
            rows,
        });
        self
    }

    pub fn key_values<K, V>(mut self, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.blocks.push(Block::KeyValues(
            pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        ));
        self
    }

    pub fn list<S: Into<String>>(mut self, items: impl IntoIterator<Item = S>) -> Self {
        self.blocks.push(Block::List(items.into_iter().map(Into::into).collect()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportDocument {
    pub title: String,
    pub timestamp: DateTime<Utc>,
    pub sections: Vec<Section>,
}

impl ReportDocument {
    pub fn section(&self, title: &str) -> Option<&Section> {
        self.sections.iter().find(|section| section.title == title)
    }
}

/// Flatten nested JSON into dotted key/value pairs, in key order
pub fn flatten_value(value: &Value) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    flatten_into("", value, &mut pairs);
    pairs
}

fn flatten_into(prefix: &str, value: &Value, pairs: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) if map.is_empty() && !prefix.is_empty() => {
            pairs.push((prefix.to_string(), "-".to_string()));
        }
        Value::Object(map) => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                flatten_into(&path, child, pairs);
            }
        }
        Value::Array(items) if items.iter().all(|item| !item.is_object() && !item.is_array()) => {
            let joined: Vec<String> = items.iter().map(scalar_text).collect();
            pairs.push((prefix.to_string(), joined.join(", ")));
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                flatten_into(&format!("{}[{}]", prefix, index), child, pairs);
            }
        }
        scalar => pairs.push((prefix.to_string(), scalar_text(scalar))),
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => "-".to_string(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
