use crate::error::{CliError, Result};
use crate::output::OutputManager;
use clap::Args;
use finishline_monitor::MonitorConfig;
use std::path::{Path, PathBuf};
use tracing::info;

/// Default location for `config init`
pub const DEFAULT_CONFIG_FILE: &str = "finishline.toml";

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Configuration action
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(clap::Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration (defaults, file, environment)
    Show,

    /// Write a configuration file with every default
    Init {
        /// Destination file
        #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Validate configuration
    Validate,
}

pub async fn run(args: ConfigArgs, config_path: Option<&Path>, output: OutputManager) -> Result<()> {
    match args.action {
        ConfigAction::Show => show_config(config_path, &output),
        ConfigAction::Init { path, force } => init_config(&path, force, &output),
        ConfigAction::Validate => validate_config(config_path, &output),
    }
}

fn show_config(config_path: Option<&Path>, output: &OutputManager) -> Result<()> {
    let config = MonitorConfig::load(config_path)?;
    output.print_config(&config)
}

fn init_config(path: &Path, force: bool, output: &OutputManager) -> Result<()> {
    if path.exists() && !force {
        return Err(CliError::FileExists {
            path: path.display().to_string(),
        });
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    MonitorConfig::default().save_to_file(path)?;
    info!("Wrote default configuration to {}", path.display());
    output.print_success(&format!("Configuration written to {}", path.display()))
}

fn validate_config(config_path: Option<&Path>, output: &OutputManager) -> Result<()> {
    MonitorConfig::load(config_path)?;
    let source = config_path
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "defaults and environment".to_string());
    output.print_success(&format!("Configuration is valid ({})", source))
}

#[cfg(test)]
mod tests {
    use super::*;
    use finishline_monitor::ReportFormat;
    use tempfile::TempDir;

    fn quiet() -> OutputManager {
        OutputManager::new(ReportFormat::Console, false, true)
    }

    #[test]
    fn test_init_writes_loadable_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("finishline.toml");
        init_config(&path, false, &quiet()).unwrap();

        let loaded = MonitorConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded, MonitorConfig::default());
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("finishline.toml");
        std::fs::write(&path, "# mine\n").unwrap();

        let err = init_config(&path, false, &quiet()).unwrap_err();
        assert!(matches!(err, CliError::FileExists { .. }));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# mine\n");

        init_config(&path, true, &quiet()).unwrap();
        assert!(MonitorConfig::load_from_file(&path).is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_rate() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[usage]\nsampling_rate = 1.5\n").unwrap();

        let err = validate_config(Some(&path), &quiet()).unwrap_err();
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().contains("usage.sampling_rate"));
    }
}
