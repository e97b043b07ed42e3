use finishline_monitor::MonitorError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::ser::Error),

    #[error("{0}")]
    Monitor(#[from] MonitorError),

    #[error("Invalid input in {path}: {reason}")]
    InvalidInput { path: String, reason: String },

    #[error("File already exists: {path}")]
    FileExists { path: String },

    #[error("{failed} of {total} monitors failed")]
    MonitorsFailed { failed: usize, total: usize },

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl CliError {
    pub fn invalid_input(path: impl Into<String>, reason: impl Into<String>) -> Self {
        CliError::InvalidInput {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) => 1,
            CliError::Io(_) | CliError::FileExists { .. } => 2,
            CliError::MonitorsFailed { .. } => 3,
            CliError::InvalidInput { .. } | CliError::Json(_) => 4,
            CliError::Monitor(e) => monitor_exit_code(e),
            _ => 1, // Generic error
        }
    }
}

fn monitor_exit_code(error: &MonitorError) -> i32 {
    if error.is_input_error() {
        return 4;
    }
    match error {
        MonitorError::Io(_) => 2,
        _ => 1,
    }
}

pub type Result<T> = std::result::Result<T, CliError>;

/// Format error for user-friendly display
pub fn format_error(error: &CliError) -> String {
    match error {
        CliError::Config(e) | CliError::Monitor(MonitorError::Config(e)) => {
            format!("Configuration Error: {}\n\nTry running 'finishline config validate' to check your configuration.", e)
        }
        CliError::Monitor(MonitorError::InvalidConfig { field, reason }) => {
            format!("Configuration Error: {} {}\n\nRun 'finishline config init' to write a file with every default.", field, reason)
        }
        CliError::Monitor(MonitorError::Validation(e)) => {
            format!("Invalid Observation: {}\n\nEvery observation needs a \"type\" tag and its required fields.", e)
        }
        CliError::InvalidInput { path, reason } => {
            format!("Invalid Input: {}: {}\n\nInput must be a JSON array of observations or one observation per line.", path, reason)
        }
        CliError::FileExists { path } => {
            format!("File Exists: {}\n\nPass --force to overwrite it.", path)
        }
        CliError::MonitorsFailed { failed, total } => {
            format!("Partial Success: {} of {} monitors failed.\n\nThe summary report lists each failure.", failed, total)
        }
        _ => error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use finishline_monitor::ValidationError;

    #[test]
    fn test_exit_codes() {
        let config: CliError = config::ConfigError::NotFound("finishline.toml".to_string()).into();
        assert_eq!(config.exit_code(), 1);

        let io: CliError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert_eq!(io.exit_code(), 2);

        let failed = CliError::MonitorsFailed { failed: 1, total: 4 };
        assert_eq!(failed.exit_code(), 3);

        assert_eq!(CliError::invalid_input("events.json", "line 3").exit_code(), 4);
    }

    #[test]
    fn test_monitor_errors_map_by_cause() {
        let validation: CliError = MonitorError::from(ValidationError::missing("web-vital", "name")).into();
        assert_eq!(validation.exit_code(), 4);

        let invalid: CliError = MonitorError::invalid_config("usage.sampling_rate", "must be within [0, 1]").into();
        assert_eq!(invalid.exit_code(), 1);
        assert!(format_error(&invalid).contains("usage.sampling_rate"));

        let io: CliError = MonitorError::from(std::io::Error::new(std::io::ErrorKind::Other, "disk")).into();
        assert_eq!(io.exit_code(), 2);
    }
}
