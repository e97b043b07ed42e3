//! In-memory observation buffers
//!
//! The store keeps one append-only buffer per observation kind. Nothing bounds
//! the buffers unless a limit is configured with [`EventStore::with_max_events`];
//! without one, memory grows with every recorded observation.

use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::observation::{
    AccessibilityIssue, BundleFile, ComponentRender, ErrorEvent, Observation, ObservationKind,
    ResourceTiming, UsageEvent, UserInteraction, WebVital,
};

#[derive(Debug, Clone, Default)]
pub struct EventStore {
    web_vitals: VecDeque<WebVital>,
    resources: VecDeque<ResourceTiming>,
    renders: VecDeque<ComponentRender>,
    interactions: VecDeque<UserInteraction>,
    errors: VecDeque<ErrorEvent>,
    accessibility: VecDeque<AccessibilityIssue>,
    bundle_files: VecDeque<BundleFile>,
    usage: VecDeque<UsageEvent>,
    max_events: Option<usize>,
    evicted: u64,
}

/// Per-kind buffer sizes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreCounts {
    pub by_kind: BTreeMap<ObservationKind, usize>,
    pub total: usize,
    pub evicted: u64,
}

impl StoreCounts {
    pub fn get(&self, kind: ObservationKind) -> usize {
        self.by_kind.get(&kind).copied().unwrap_or(0)
    }
}

fn push_bounded<T>(buffer: &mut VecDeque<T>, item: T, max: Option<usize>) -> bool {
    buffer.push_back(item);
    match max {
        Some(max) if buffer.len() > max => {
            buffer.pop_front();
            true
        }
        _ => false,
    }
}

impl EventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound every per-kind buffer; the oldest entry is evicted first
    pub fn with_max_events(max_events: usize) -> Self {
        Self {
            max_events: Some(max_events),
            ..Self::default()
        }
    }

    pub fn max_events(&self) -> Option<usize> {
        self.max_events
    }

    /// Validate and append an observation
    pub fn record(&mut self, observation: Observation) -> Result<()> {
        observation.validate()?;

        let max = self.max_events;
        let kind = observation.kind();
        let evicted = match observation {
            Observation::WebVital(o) => push_bounded(&mut self.web_vitals, o, max),
            Observation::ResourceTiming(o) => push_bounded(&mut self.resources, o, max),
            Observation::ComponentRender(o) => push_bounded(&mut self.renders, o, max),
            Observation::UserInteraction(o) => push_bounded(&mut self.interactions, o, max),
            Observation::Error(o) => push_bounded(&mut self.errors, o, max),
            Observation::AccessibilityIssue(o) => push_bounded(&mut self.accessibility, o, max),
            Observation::BundleFile(o) => push_bounded(&mut self.bundle_files, o, max),
            Observation::Usage(o) => push_bounded(&mut self.usage, o, max),
        };

        if evicted {
            self.evicted += 1;
            debug!("Evicted oldest {} observation (limit {:?})", kind, max);
        }

        Ok(())
    }

    pub fn clear(&mut self) {
        self.web_vitals.clear();
        self.resources.clear();
        self.renders.clear();
        self.interactions.clear();
        self.errors.clear();
        self.accessibility.clear();
        self.bundle_files.clear();
        self.usage.clear();
        self.evicted = 0;
    }

    pub fn web_vitals(&self) -> impl ExactSizeIterator<Item = &WebVital> {
        self.web_vitals.iter()
    }

    pub fn resources(&self) -> impl ExactSizeIterator<Item = &ResourceTiming> {
        self.resources.iter()
    }

    pub fn renders(&self) -> impl ExactSizeIterator<Item = &ComponentRender> {
        self.renders.iter()
    }

    pub fn interactions(&self) -> impl ExactSizeIterator<Item = &UserInteraction> {
        self.interactions.iter()
    }

    pub fn errors(&self) -> impl ExactSizeIterator<Item = &ErrorEvent> {
        self.errors.iter()
    }

    pub fn accessibility_issues(&self) -> impl ExactSizeIterator<Item = &AccessibilityIssue> {
        self.accessibility.iter()
    }

    pub fn bundle_files(&self) -> impl ExactSizeIterator<Item = &BundleFile> {
        self.bundle_files.iter()
    }

    pub fn usage_events(&self) -> impl ExactSizeIterator<Item = &UsageEvent> {
        self.usage.iter()
    }

    pub fn len_of(&self, kind: ObservationKind) -> usize {
        match kind {
            ObservationKind::WebVital => self.web_vitals.len(),
            ObservationKind::ResourceTiming => self.resources.len(),
            ObservationKind::ComponentRender => self.renders.len(),
            ObservationKind::UserInteraction => self.interactions.len(),
            ObservationKind::Error => self.errors.len(),
            ObservationKind::AccessibilityIssue => self.accessibility.len(),
            ObservationKind::BundleFile => self.bundle_files.len(),
            ObservationKind::Usage => self.usage.len(),
        }
    }

    pub fn len(&self) -> usize {
        ObservationKind::ALL.iter().map(|kind| self.len_of(*kind)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn counts(&self) -> StoreCounts {
        let by_kind: BTreeMap<ObservationKind, usize> = ObservationKind::ALL
            .iter()
            .map(|kind| (*kind, self.len_of(*kind)))
            .collect();
        StoreCounts {
            total: by_kind.values().sum(),
            by_kind,
            evicted: self.evicted,
        }
    }

    /// Every stored observation, grouped by kind, oldest first within a kind
    pub fn observations(&self) -> Vec<Observation> {
        let mut all = Vec::with_capacity(self.len());
        all.extend(self.web_vitals.iter().cloned().map(Observation::WebVital));
        all.extend(self.resources.iter().cloned().map(Observation::ResourceTiming));
        all.extend(self.renders.iter().cloned().map(Observation::ComponentRender));
        all.extend(self.interactions.iter().cloned().map(Observation::UserInteraction));
        all.extend(self.errors.iter().cloned().map(Observation::Error));
        all.extend(self.accessibility.iter().cloned().map(Observation::AccessibilityIssue));
        all.extend(self.bundle_files.iter().cloned().map(Observation::BundleFile));
        all.extend(self.usage.iter().cloned().map(Observation::Usage));
        all
    }

    /// Drop everything recorded before `cutoff`, returning how many entries went away
    pub fn retain_since(&mut self, cutoff: DateTime<Utc>) -> usize {
        let before = self.len();
        self.web_vitals.retain(|o| o.timestamp >= cutoff);
        self.resources.retain(|o| o.timestamp >= cutoff);
        self.renders.retain(|o| o.timestamp >= cutoff);
        self.interactions.retain(|o| o.timestamp >= cutoff);
        self.errors.retain(|o| o.timestamp >= cutoff);
        self.accessibility.retain(|o| o.timestamp >= cutoff);
        self.bundle_files.retain(|o| o.timestamp >= cutoff);
        self.usage.retain(|o| o.timestamp >= cutoff);
        before - self.len()
    }
}
