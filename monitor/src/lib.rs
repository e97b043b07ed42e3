//! Finishline frontend monitoring
//!
//! This crate turns raw frontend observations into reports:
//!
//! - Validated per-kind event buffers ([`store`]) and a concurrent recorder ([`recorder`])
//! - Summary statistics over vitals, renders, errors and usage ([`aggregate`])
//! - Accessibility, budget and bundle-size compliance checks ([`compliance`])
//! - JSON, HTML and console reports written to timestamped files ([`report`])
//! - Four independent monitors and a runner that ties them together
//!
//! Event buffers grow without limit unless a `max_events` bound is configured;
//! every monitor sets one from its configuration.

pub mod aggregate;
pub mod anonymize;
pub mod compliance;
pub mod config;
pub mod error;
pub mod monitors;
pub mod observation;
pub mod recorder;
pub mod report;
pub mod runner;
pub mod sample;
pub mod store;
pub mod utils;

pub use config::MonitorConfig;
pub use error::{MonitorError, Result, ValidationError};
pub use monitors::{Monitor, MonitorKind, MonitorReport, MonitorStatus};
pub use observation::{Observation, ObservationKind};
pub use recorder::EventRecorder;
pub use report::{Report, ReportFormat};
pub use runner::{RunOptions, RunOutcome, Runner};
pub use sample::SampleGenerator;
pub use store::EventStore;
