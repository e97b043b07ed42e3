//! Error handling for the Finishline monitors
//!
//! Every fallible operation in the crate returns [`MonitorError`]. Observation
//! validation failures carry a dedicated [`ValidationError`] so callers can see
//! exactly which field was rejected.

use std::io;

use thiserror::Error;

/// The main error type for monitor operations
#[derive(Error, Debug)]
pub enum MonitorError {
    /// An observation was rejected at the store boundary
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// I/O errors (report directories, report files, history snapshots)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Layered configuration loading errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// A configuration value failed validation
    #[error("Invalid configuration value for {field}: {reason}")]
    InvalidConfig { field: String, reason: String },

    /// A filename pattern failed to compile
    #[error("Pattern error: {0}")]
    Pattern(#[from] regex::Error),

    /// HTML template registration or rendering failed
    #[error("Template error: {0}")]
    Template(String),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("TOML parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    /// The event recorder task has stopped
    #[error("Event recorder is closed")]
    RecorderClosed,

    #[error("Unsupported report format: {0}")]
    UnsupportedFormat(String),
}

/// A malformed observation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}.{field}: {reason}")]
pub struct ValidationError {
    /// Observation kind, e.g. `web-vital`
    pub kind: &'static str,
    /// Offending field
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    pub fn missing(kind: &'static str, field: &'static str) -> Self {
        Self {
            kind,
            field,
            reason: "missing or empty".to_string(),
        }
    }

    pub fn invalid(kind: &'static str, field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            kind,
            field,
            reason: reason.into(),
        }
    }
}

impl MonitorError {
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        MonitorError::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Whether the error was caused by caller-supplied data rather than the environment
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            MonitorError::Validation(_)
                | MonitorError::Serialization(_)
                | MonitorError::UnsupportedFormat(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, MonitorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_names_field() {
        let err = ValidationError::missing("web-vital", "name");
        assert_eq!(err.to_string(), "web-vital.name: missing or empty");

        let err: MonitorError = err.into();
        assert!(err.to_string().contains("web-vital.name"));
        assert!(err.is_input_error());
    }

    #[test]
    fn test_io_error_is_not_input_error() {
        let err: MonitorError = io::Error::new(io::ErrorKind::PermissionDenied, "denied").into();
        assert!(!err.is_input_error());
    }
}
