//! Raw observations fed into the monitors
//!
//! Each observation kind is its own struct; [`Observation`] is the tagged
//! union the store, the recorder and the monitors pattern-match on. The serde
//! representation is internally tagged so fixture files look like
//! `{"type": "web-vital", "name": "LCP", "value": 2200, "rating": "good"}`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ValidationError;

/// Qualitative rating attached to a web vital by the instrumentation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Rating {
    Good,
    NeedsImprovement,
    Poor,
}

impl std::fmt::Display for Rating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rating::Good => write!(f, "good"),
            Rating::NeedsImprovement => write!(f, "needs-improvement"),
            Rating::Poor => write!(f, "poor"),
        }
    }
}

/// Category of a usage-analytics event
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UsageCategory {
    Feature,
    Component,
    PageView,
    Custom,
}

impl std::fmt::Display for UsageCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UsageCategory::Feature => write!(f, "feature"),
            UsageCategory::Component => write!(f, "component"),
            UsageCategory::PageView => write!(f, "page-view"),
            UsageCategory::Custom => write!(f, "custom"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebVital {
    pub name: String,
    pub value: f64,
    pub rating: Rating,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceTiming {
    pub name: String,
    pub initiator_type: String,
    pub duration: f64,
    /// Bytes over the wire, zero for cached resources
    #[serde(default)]
    pub transfer_size: u64,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentRender {
    pub component_name: String,
    /// Render duration in milliseconds
    pub render_time: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub props_snapshot: Option<Value>,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserInteraction {
    pub action: String,
    /// Time until the UI responded, in milliseconds
    pub response_time: f64,
    #[serde(default)]
    pub details: Map<String, Value>,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEvent {
    pub message: String,
    #[serde(default = "default_error_category")]
    pub category: String,
    #[serde(default)]
    pub context: Map<String, Value>,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

fn default_error_category() -> String {
    "uncategorized".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessibilityIssue {
    pub id: String,
    /// Raw impact string as reported by the audit tool
    pub impact: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub node_count: u32,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleFile {
    pub name: String,
    /// Size in bytes
    pub size: u64,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageEvent {
    pub category: UsageCategory,
    pub name: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub properties: Map<String, Value>,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

/// Shared timestamp plumbing for every observation struct
macro_rules! timestamped {
    ($($ty:ty),* $(,)?) => {
        $(
            impl $ty {
                /// Replace the recording time, mainly for fixtures and replays
                pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
                    self.timestamp = timestamp;
                    self
                }
            }
        )*
    };
}

timestamped!(
    WebVital,
    ResourceTiming,
    ComponentRender,
    UserInteraction,
    ErrorEvent,
    AccessibilityIssue,
    BundleFile,
    UsageEvent,
);

impl WebVital {
    pub fn new(name: impl Into<String>, value: f64, rating: Rating) -> Self {
        Self {
            name: name.into(),
            value,
            rating,
            timestamp: Utc::now(),
        }
    }
}

impl ResourceTiming {
    pub fn new(name: impl Into<String>, initiator_type: impl Into<String>, duration: f64, transfer_size: u64) -> Self {
        Self {
            name: name.into(),
            initiator_type: initiator_type.into(),
            duration,
            transfer_size,
            timestamp: Utc::now(),
        }
    }
}

impl ComponentRender {
    pub fn new(component_name: impl Into<String>, render_time: f64) -> Self {
        Self {
            component_name: component_name.into(),
            render_time,
            props_snapshot: None,
            timestamp: Utc::now(),
        }
    }
}

impl UserInteraction {
    pub fn new(action: impl Into<String>, response_time: f64) -> Self {
        Self {
            action: action.into(),
            response_time,
            details: Map::new(),
            timestamp: Utc::now(),
        }
    }
}

impl ErrorEvent {
    pub fn new(message: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            category: category.into(),
            context: Map::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_context(mut self, context: Map<String, Value>) -> Self {
        self.context = context;
        self
    }
}

impl AccessibilityIssue {
    pub fn new(id: impl Into<String>, impact: impl Into<String>, description: impl Into<String>, node_count: u32) -> Self {
        Self {
            id: id.into(),
            impact: impact.into(),
            description: description.into(),
            node_count,
            timestamp: Utc::now(),
        }
    }
}

impl BundleFile {
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
            timestamp: Utc::now(),
        }
    }
}

impl UsageEvent {
    pub fn new(category: UsageCategory, name: impl Into<String>) -> Self {
        Self {
            category,
            name: name.into(),
            session_id: None,
            properties: Map::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn in_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_properties(mut self, properties: Map<String, Value>) -> Self {
        self.properties = properties;
        self
    }
}

/// Observation kind, used for store bookkeeping and monitor routing
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ObservationKind {
    WebVital,
    ResourceTiming,
    ComponentRender,
    UserInteraction,
    Error,
    AccessibilityIssue,
    BundleFile,
    Usage,
}

impl ObservationKind {
    pub const ALL: [ObservationKind; 8] = [
        ObservationKind::WebVital,
        ObservationKind::ResourceTiming,
        ObservationKind::ComponentRender,
        ObservationKind::UserInteraction,
        ObservationKind::Error,
        ObservationKind::AccessibilityIssue,
        ObservationKind::BundleFile,
        ObservationKind::Usage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ObservationKind::WebVital => "web-vital",
            ObservationKind::ResourceTiming => "resource-timing",
            ObservationKind::ComponentRender => "component-render",
            ObservationKind::UserInteraction => "user-interaction",
            ObservationKind::Error => "error",
            ObservationKind::AccessibilityIssue => "accessibility-issue",
            ObservationKind::BundleFile => "bundle-file",
            ObservationKind::Usage => "usage",
        }
    }
}

impl std::fmt::Display for ObservationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single timestamped fact recorded by application instrumentation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Observation {
    WebVital(WebVital),
    ResourceTiming(ResourceTiming),
    ComponentRender(ComponentRender),
    UserInteraction(UserInteraction),
    Error(ErrorEvent),
    AccessibilityIssue(AccessibilityIssue),
    BundleFile(BundleFile),
    Usage(UsageEvent),
}

impl Observation {
    pub fn kind(&self) -> ObservationKind {
        match self {
            Observation::WebVital(_) => ObservationKind::WebVital,
            Observation::ResourceTiming(_) => ObservationKind::ResourceTiming,
            Observation::ComponentRender(_) => ObservationKind::ComponentRender,
            Observation::UserInteraction(_) => ObservationKind::UserInteraction,
            Observation::Error(_) => ObservationKind::Error,
            Observation::AccessibilityIssue(_) => ObservationKind::AccessibilityIssue,
            Observation::BundleFile(_) => ObservationKind::BundleFile,
            Observation::Usage(_) => ObservationKind::Usage,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Observation::WebVital(o) => o.timestamp,
            Observation::ResourceTiming(o) => o.timestamp,
            Observation::ComponentRender(o) => o.timestamp,
            Observation::UserInteraction(o) => o.timestamp,
            Observation::Error(o) => o.timestamp,
            Observation::AccessibilityIssue(o) => o.timestamp,
            Observation::BundleFile(o) => o.timestamp,
            Observation::Usage(o) => o.timestamp,
        }
    }

    /// Reject observations whose fields would poison aggregation
    pub fn validate(&self) -> Result<(), ValidationError> {
        let kind = self.kind().as_str();
        match self {
            Observation::WebVital(o) => {
                require_text(kind, "name", &o.name)?;
                require_measure(kind, "value", o.value)
            }
            Observation::ResourceTiming(o) => {
                require_text(kind, "name", &o.name)?;
                require_text(kind, "initiator_type", &o.initiator_type)?;
                require_measure(kind, "duration", o.duration)
            }
            Observation::ComponentRender(o) => {
                require_text(kind, "component_name", &o.component_name)?;
                require_measure(kind, "render_time", o.render_time)
            }
            Observation::UserInteraction(o) => {
                require_text(kind, "action", &o.action)?;
                require_measure(kind, "response_time", o.response_time)
            }
            Observation::Error(o) => {
                require_text(kind, "message", &o.message)?;
                require_text(kind, "category", &o.category)
            }
            Observation::AccessibilityIssue(o) => {
                require_text(kind, "id", &o.id)?;
                require_text(kind, "impact", &o.impact)
            }
            Observation::BundleFile(o) => require_text(kind, "name", &o.name),
            Observation::Usage(o) => require_text(kind, "name", &o.name),
        }
    }
}

fn require_text(kind: &'static str, field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::missing(kind, field));
    }
    Ok(())
}

fn require_measure(kind: &'static str, field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::invalid(kind, field, "must be a finite number"));
    }
    if value < 0.0 {
        return Err(ValidationError::invalid(kind, field, format!("must not be negative, got {}", value)));
    }
    Ok(())
}

macro_rules! observation_from {
    ($($ty:ident => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Observation {
                fn from(value: $ty) -> Self {
                    Observation::$variant(value)
                }
            }
        )*
    };
}

observation_from!(
    WebVital => WebVital,
    ResourceTiming => ResourceTiming,
    ComponentRender => ComponentRender,
    UserInteraction => UserInteraction,
    ErrorEvent => Error,
    AccessibilityIssue => AccessibilityIssue,
    BundleFile => BundleFile,
    UsageEvent => Usage,
);
