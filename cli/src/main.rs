use clap::{Parser, Subcommand};
use finishline_monitor::{MonitorConfig, ReportFormat, RunOptions};
use std::path::{Path, PathBuf};
use std::process;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod error;
mod input;
mod output;

use commands::*;
use error::Result;
use output::OutputManager;

#[derive(Parser)]
#[command(name = "finishline")]
#[command(about = "Finishline CLI - Run frontend monitors and write performance, error, usage and compliance reports")]
#[command(version)]
#[command(long_about = "
Finishline CLI runs the performance, error, usage and compliance monitors over a
set of frontend observations and writes one report per monitor plus a summary.

Examples:
  finishline run                                  # Run every monitor over sample data
  finishline run --input events.jsonl             # Run every monitor over recorded observations
  finishline --format html monitor compliance     # Run one monitor, HTML report
  finishline config init --path finishline.toml   # Write a default configuration file
")]
struct Cli {
    /// Report format (defaults to the configured format, console)
    #[arg(long, global = true, value_enum)]
    format: Option<FormatArg>,

    /// Reports root directory (overrides config file)
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Include the detailed metrics section in every report
    #[arg(long, global = true)]
    detailed: bool,

    /// Configuration file path (TOML or JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Json,
    Html,
    Console,
}

impl From<FormatArg> for ReportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Json => ReportFormat::Json,
            FormatArg::Html => ReportFormat::Html,
            FormatArg::Console => ReportFormat::Console,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run every monitor and write a summary report
    Run(RunArgs),

    /// Run a single monitor
    Monitor(MonitorArgs),

    /// Manage Finishline configuration
    Config(ConfigArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.quiet);

    if let Err(e) = run_command(cli).await {
        error!("{}", e);
        eprintln!("{}", error::format_error(&e));
        process::exit(e.exit_code());
    }
}

async fn run_command(cli: Cli) -> Result<()> {
    let Cli {
        format,
        output,
        detailed,
        config,
        quiet,
        no_color,
        command,
        ..
    } = cli;

    let colored = !no_color && !quiet && console::Term::stdout().features().colors_supported();

    match command {
        Commands::Config(args) => {
            let output = OutputManager::new(format.map(Into::into).unwrap_or_default(), colored, quiet);
            commands::config::run(args, config.as_deref(), output).await
        }
        Commands::Run(args) => {
            let ctx = run_context(config.as_deref(), format, output, detailed, colored, quiet)?;
            commands::run::run(args, ctx).await
        }
        Commands::Monitor(args) => {
            let ctx = run_context(config.as_deref(), format, output, detailed, colored, quiet)?;
            commands::run::run_monitor(args, ctx).await
        }
    }
}

/// Resolve configuration and let command-line flags override the report settings
fn run_context(
    config_path: Option<&Path>,
    format: Option<FormatArg>,
    output_dir: Option<PathBuf>,
    detailed: bool,
    colored: bool,
    quiet: bool,
) -> Result<RunContext> {
    let config = MonitorConfig::load(config_path)?;
    if let Some(path) = config_path {
        info!("Loaded configuration from: {}", path.display());
    }

    let mut options = RunOptions::from_settings(&config.reports);
    if let Some(format) = format {
        options.format = format.into();
    }
    if let Some(dir) = output_dir {
        options.output_dir = dir;
    }
    options.detailed |= detailed;

    let output = OutputManager::new(options.format, colored, quiet);
    Ok(RunContext { config, options, output })
}

fn init_logging(verbose: bool, quiet: bool) {
    let log_level = if verbose {
        tracing::Level::DEBUG
    } else if quiet {
        tracing::Level::ERROR
    } else {
        tracing::Level::WARN
    };

    // Logs go to stderr so reports printed to stdout stay clean
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("finishline={0},finishline_monitor={0}", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert()
    }

    #[test]
    fn test_format_conversion() {
        assert_eq!(ReportFormat::from(FormatArg::Json), ReportFormat::Json);
        assert_eq!(ReportFormat::from(FormatArg::Html), ReportFormat::Html);
        assert_eq!(ReportFormat::from(FormatArg::Console), ReportFormat::Console);
    }

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from(["finishline", "run"]).unwrap();
        assert!(matches!(cli.command, Commands::Run(_)));
        assert!(cli.format.is_none());

        let cli = Cli::try_parse_from(["finishline", "monitor", "errors", "--format", "json", "--seed", "7"]).unwrap();
        assert!(matches!(cli.format, Some(FormatArg::Json)));
        match cli.command {
            Commands::Monitor(args) => {
                assert!(matches!(args.kind, MonitorKindArg::Errors));
                assert_eq!(args.source.seed, 7);
            }
            _ => panic!("expected monitor command"),
        }

        assert!(Cli::try_parse_from(["finishline", "monitor", "latency"]).is_err());
        assert!(Cli::try_parse_from(["finishline", "--verbose", "--quiet", "run"]).is_err());
    }

    #[test]
    fn test_flags_override_config() {
        let dir = tempfile::TempDir::new().unwrap();
        let ctx = run_context(None, Some(FormatArg::Html), Some(dir.path().to_path_buf()), true, false, true).unwrap();
        assert_eq!(ctx.options.format, ReportFormat::Html);
        assert_eq!(ctx.options.output_dir, dir.path());
        assert!(ctx.options.detailed);
    }
}
