//! Observation input files: a JSON array or one JSON object per line

use crate::error::{CliError, Result};
use finishline_monitor::recorder::DEFAULT_CAPACITY;
use finishline_monitor::{EventRecorder, EventStore, MonitorError, Observation};
use std::path::Path;
use tracing::{debug, info};

pub fn parse_observations(content: &str, source: &str) -> Result<Vec<Observation>> {
    let trimmed = content.trim_start();
    if trimmed.starts_with('[') {
        return serde_json::from_str(trimmed).map_err(|e| CliError::invalid_input(source, e.to_string()));
    }

    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str(line)
                .map_err(|e| CliError::invalid_input(source, format!("line {}: {}", index + 1, e)))
        })
        .collect()
}

/// Read, parse and validate an input file by streaming it through an [`EventRecorder`]
pub async fn load_observations(path: &Path) -> Result<Vec<Observation>> {
    let source = path.display().to_string();
    let content = tokio::fs::read_to_string(path).await?;
    let observations = parse_observations(&content, &source)?;
    debug!("Parsed {} observations from {}", observations.len(), source);

    let recorder = EventRecorder::spawn(EventStore::new(), DEFAULT_CAPACITY);
    for (index, observation) in observations.into_iter().enumerate() {
        recorder.record(observation).await.map_err(|e| match e {
            MonitorError::Validation(v) => CliError::invalid_input(&source, format!("observation {}: {}", index + 1, v)),
            other => other.into(),
        })?;
    }
    let store = recorder.shutdown().await?;
    info!("Loaded {} observations from {}", store.len(), source);
    Ok(store.observations())
}
