//! Bundle size analysis and regression detection
//!
//! Build output files are attributed to chunks by the filename contract
//! `<chunk>.<hex hash>.<js|css>` ([`CHUNK_PATTERN`]). Files that do not match
//! still count toward the totals but belong to no chunk; they are listed as
//! unattributed and logged.

use std::collections::{BTreeMap, VecDeque};
use std::path::Path;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::BundleSizeConfig;
use crate::error::Result;
use crate::observation::BundleFile;
use crate::utils::format;

/// Chunk filename contract: name, hex content hash, extension
pub const CHUNK_PATTERN: &str = r"([a-zA-Z0-9_-]+)\.([a-f0-9]+)\.(js|css)$";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedChunk {
    pub name: String,
    pub hash: String,
    pub extension: String,
}

#[derive(Debug, Clone)]
pub struct ChunkParser {
    pattern: Regex,
}

impl ChunkParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            pattern: Regex::new(CHUNK_PATTERN)?,
        })
    }

    pub fn parse(&self, file_name: &str) -> Option<ParsedChunk> {
        let captures = self.pattern.captures(file_name)?;
        Some(ParsedChunk {
            name: captures[1].to_string(),
            hash: captures[2].to_string(),
            extension: captures[3].to_string(),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkStats {
    pub size: u64,
    pub files: usize,
}

/// Snapshot of one bundle check, kept for regression detection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub total_size: u64,
    pub chunks: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Regression {
    pub chunk: String,
    pub previous_size: u64,
    pub current_size: u64,
    pub percent_change: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleAnalysis {
    pub total_size: u64,
    pub files_count: usize,
    pub chunks: BTreeMap<String, ChunkStats>,
    /// Bytes per file extension (`js`, `css`, anything else as found)
    pub by_extension: BTreeMap<String, u64>,
    pub unattributed: Vec<String>,
    pub regressions: Vec<Regression>,
    pub regression_threshold: f64,
    pub history_len: usize,
}

impl BundleAnalysis {
    pub fn has_regressions(&self) -> bool {
        !self.regressions.is_empty()
    }

    /// Sizes in KB keyed like the default size budgets
    pub fn size_measurements(&self) -> BTreeMap<String, f64> {
        let mut sizes = BTreeMap::new();
        if self.files_count == 0 {
            return sizes;
        }
        sizes.insert("total".to_string(), format::kilobytes(self.total_size));
        if let Some(js) = self.by_extension.get("js") {
            sizes.insert("javascript".to_string(), format::kilobytes(*js));
        }
        if let Some(css) = self.by_extension.get("css") {
            sizes.insert("css".to_string(), format::kilobytes(*css));
        }
        sizes
    }
}

fn extension_of(name: &str) -> String {
    Path::new(name)
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_else(|| "other".to_string())
}

/// Tracks bundle sizes across checks in a bounded FIFO history
#[derive(Debug)]
pub struct BundleTracker {
    config: BundleSizeConfig,
    parser: ChunkParser,
    history: VecDeque<HistoryEntry>,
}

impl BundleTracker {
    /// Build a tracker, loading the history snapshot when one is configured and present
    pub fn new(config: BundleSizeConfig) -> Result<Self> {
        let mut tracker = Self {
            parser: ChunkParser::new()?,
            history: VecDeque::with_capacity(config.history_capacity),
            config,
        };

        if let Some(path) = tracker.config.history_file.clone() {
            if path.exists() {
                let content = std::fs::read_to_string(&path)?;
                let entries: Vec<HistoryEntry> = serde_json::from_str(&content)?;
                info!("Loaded {} bundle history entries from {}", entries.len(), path.display());
                tracker.history.extend(entries);
                tracker.trim_history();
            }
        }

        Ok(tracker)
    }

    pub fn history(&self) -> &VecDeque<HistoryEntry> {
        &self.history
    }

    pub fn config(&self) -> &BundleSizeConfig {
        &self.config
    }

    pub fn check<'a, I>(&mut self, files: I) -> Result<BundleAnalysis>
    where
        I: IntoIterator<Item = &'a BundleFile>,
    {
        self.check_at(files, Utc::now())
    }

    /// Analyze the files, compare main chunks with the latest history entry,
    /// then append this check to the history. A check without any files leaves
    /// the history untouched so the previous build stays the baseline.
    pub fn check_at<'a, I>(&mut self, files: I, now: DateTime<Utc>) -> Result<BundleAnalysis>
    where
        I: IntoIterator<Item = &'a BundleFile>,
    {
        let mut total_size = 0u64;
        let mut files_count = 0usize;
        let mut chunks: BTreeMap<String, ChunkStats> = BTreeMap::new();
        let mut by_extension: BTreeMap<String, u64> = BTreeMap::new();
        let mut unattributed = Vec::new();

        for file in files {
            total_size += file.size;
            files_count += 1;
            *by_extension.entry(extension_of(&file.name)).or_insert(0) += file.size;

            match self.parser.parse(&file.name) {
                Some(parsed) => {
                    let stats = chunks.entry(parsed.name).or_default();
                    stats.size += file.size;
                    stats.files += 1;
                }
                None => {
                    warn!("Bundle file {} does not match the chunk pattern; counted in totals only", file.name);
                    unattributed.push(file.name.clone());
                }
            }
        }

        let regressions = self.detect_regressions(&chunks);
        for regression in &regressions {
            warn!(
                "Bundle regression in chunk {}: {} -> {} ({:.1}%)",
                regression.chunk,
                format::bytes_human(regression.previous_size),
                format::bytes_human(regression.current_size),
                regression.percent_change
            );
        }

        if self.config.track_history && files_count > 0 {
            self.history.push_back(HistoryEntry {
                timestamp: now,
                total_size,
                chunks: chunks.iter().map(|(name, stats)| (name.clone(), stats.size)).collect(),
            });
            self.trim_history();
            self.save_history()?;
        }

        debug!("Bundle check: {} files, {} chunks, {} bytes", files_count, chunks.len(), total_size);

        Ok(BundleAnalysis {
            total_size,
            files_count,
            chunks,
            by_extension,
            unattributed,
            regressions,
            regression_threshold: self.config.regression_threshold,
            history_len: self.history.len(),
        })
    }

    fn detect_regressions(&self, chunks: &BTreeMap<String, ChunkStats>) -> Vec<Regression> {
        let Some(previous) = self.history.back() else {
            return Vec::new();
        };

        self.config
            .main_chunks
            .iter()
            .filter_map(|name| {
                let current = chunks.get(name)?.size;
                let previous_size = *previous.chunks.get(name)?;
                if previous_size == 0 {
                    return None;
                }
                let percent_change =
                    (current as f64 - previous_size as f64) / previous_size as f64 * 100.0;
                (percent_change > self.config.regression_threshold).then(|| Regression {
                    chunk: name.clone(),
                    previous_size,
                    current_size: current,
                    percent_change,
                })
            })
            .collect()
    }

    fn trim_history(&mut self) {
        while self.history.len() > self.config.history_capacity {
            self.history.pop_front();
        }
    }

    fn save_history(&self) -> Result<()> {
        let Some(path) = &self.config.history_file else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let entries: Vec<&HistoryEntry> = self.history.iter().collect();
        std::fs::write(path, serde_json::to_string_pretty(&entries)?)?;
        Ok(())
    }
}
