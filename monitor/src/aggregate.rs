//! Pure reductions from observations to summary statistics
//!
//! Nothing here keeps state; every summary is rebuilt from the observations
//! it is handed. Grouping uses `BTreeMap` so the same input always serializes
//! to the same bytes regardless of insertion order.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Duration, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::observation::{ComponentRender, Rating, WebVital};
use crate::utils::stats;

/// Percentile reported for render times
pub const RENDER_PERCENTILE: f64 = 95.0;

/// Per-rating histogram for a web vital
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingCounts {
    pub good: usize,
    #[serde(rename = "needs-improvement")]
    pub needs_improvement: usize,
    pub poor: usize,
}

impl RatingCounts {
    pub fn increment(&mut self, rating: Rating) {
        match rating {
            Rating::Good => self.good += 1,
            Rating::NeedsImprovement => self.needs_improvement += 1,
            Rating::Poor => self.poor += 1,
        }
    }

    pub fn get(&self, rating: Rating) -> usize {
        match rating {
            Rating::Good => self.good,
            Rating::NeedsImprovement => self.needs_improvement,
            Rating::Poor => self.poor,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VitalSummary {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    pub ratings: RatingCounts,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderSummary {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    pub p95: f64,
}

/// Group web vitals by name; ratings are trusted as supplied by the caller
pub fn summarize_vitals<'a, I>(vitals: I) -> BTreeMap<String, VitalSummary>
where
    I: IntoIterator<Item = &'a WebVital>,
{
    let mut grouped: BTreeMap<String, (Vec<f64>, RatingCounts)> = BTreeMap::new();
    for vital in vitals {
        let entry = grouped.entry(vital.name.clone()).or_default();
        entry.0.push(vital.value);
        entry.1.increment(vital.rating);
    }

    grouped
        .into_iter()
        .map(|(name, (values, ratings))| {
            let summary = VitalSummary {
                count: values.len(),
                min: stats::min(&values),
                max: stats::max(&values),
                avg: stats::mean(&values),
                ratings,
            };
            (name, summary)
        })
        .collect()
}

/// Group render times by component, including the 95th percentile
pub fn summarize_renders<'a, I>(renders: I) -> BTreeMap<String, RenderSummary>
where
    I: IntoIterator<Item = &'a ComponentRender>,
{
    let mut grouped: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for render in renders {
        grouped
            .entry(render.component_name.clone())
            .or_default()
            .push(render.render_time);
    }

    grouped
        .into_iter()
        .map(|(name, values)| {
            let summary = RenderSummary {
                count: values.len(),
                min: stats::min(&values),
                max: stats::max(&values),
                avg: stats::mean(&values),
                p95: stats::percentile(&values, RENDER_PERCENTILE),
            };
            (name, summary)
        })
        .collect()
}

/// Count items per key
pub fn count_by<T, I, F>(items: I, key: F) -> BTreeMap<String, usize>
where
    I: IntoIterator<Item = T>,
    F: Fn(&T) -> String,
{
    let mut counts = BTreeMap::new();
    for item in items {
        *counts.entry(key(&item)).or_insert(0) += 1;
    }
    counts
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedCount {
    pub name: String,
    pub count: usize,
}

/// The `n` largest counts, ties broken by name
pub fn top_n(counts: &BTreeMap<String, usize>, n: usize) -> Vec<RankedCount> {
    let mut ranked: Vec<RankedCount> = counts
        .iter()
        .map(|(name, count)| RankedCount {
            name: name.clone(),
            count: *count,
        })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    ranked.truncate(n);
    ranked
}

/// Exclusive recency windows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecencyBuckets {
    pub last_24h: usize,
    pub last_7d: usize,
    pub last_30d: usize,
    pub older: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeDistribution {
    /// Hour of day (0-23, UTC) to count
    pub by_hour: BTreeMap<u32, usize>,
    /// Day of week (0 = Sunday) to count
    pub by_weekday: BTreeMap<u32, usize>,
    pub recency: RecencyBuckets,
}

impl TimeDistribution {
    pub fn is_empty(&self) -> bool {
        self.by_hour.is_empty()
    }

    pub fn total(&self) -> usize {
        self.by_hour.values().sum()
    }

    /// Hour with the most observations, earliest hour on ties
    pub fn peak_hour(&self) -> Option<u32> {
        self.by_hour
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
            .map(|(hour, _)| *hour)
    }
}

/// Bucket timestamps by hour, weekday and age relative to `now`
pub fn time_distribution<I>(timestamps: I, now: DateTime<Utc>) -> TimeDistribution
where
    I: IntoIterator<Item = DateTime<Utc>>,
{
    let day = Duration::milliseconds(24 * 60 * 60 * 1000);
    let mut distribution = TimeDistribution::default();

    for timestamp in timestamps {
        *distribution.by_hour.entry(timestamp.hour()).or_insert(0) += 1;
        *distribution
            .by_weekday
            .entry(timestamp.weekday().num_days_from_sunday())
            .or_insert(0) += 1;

        let age = now - timestamp;
        if age < day {
            distribution.recency.last_24h += 1;
        } else if age < day * 7 {
            distribution.recency.last_7d += 1;
        } else if age < day * 30 {
            distribution.recency.last_30d += 1;
        } else {
            distribution.recency.older += 1;
        }
    }

    distribution
}
