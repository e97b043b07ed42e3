use crate::error::{CliError, Result};
use crate::input::load_observations;
use crate::output::OutputManager;
use clap::Args;
use finishline_monitor::{MonitorConfig, MonitorKind, Observation, RunOptions, Runner, SampleGenerator};
use std::path::PathBuf;
use tracing::info;

/// Seed used for sample data when none is given
pub const DEFAULT_SEED: u64 = 42;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Observations file (JSON array or JSON lines); sample data when omitted
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Seed for generated sample data
    #[arg(long, default_value_t = DEFAULT_SEED)]
    pub seed: u64,
}

#[derive(Args, Debug)]
pub struct MonitorArgs {
    /// Monitor to run
    #[arg(value_enum)]
    pub kind: MonitorKindArg,

    #[command(flatten)]
    pub source: RunArgs,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
pub enum MonitorKindArg {
    Performance,
    Errors,
    Usage,
    Compliance,
}

impl From<MonitorKindArg> for MonitorKind {
    fn from(arg: MonitorKindArg) -> Self {
        match arg {
            MonitorKindArg::Performance => MonitorKind::Performance,
            MonitorKindArg::Errors => MonitorKind::Errors,
            MonitorKindArg::Usage => MonitorKind::Usage,
            MonitorKindArg::Compliance => MonitorKind::Compliance,
        }
    }
}

/// Everything a run needs once flags and configuration are resolved
pub struct RunContext {
    pub config: MonitorConfig,
    pub options: RunOptions,
    pub output: OutputManager,
}

pub async fn run(args: RunArgs, ctx: RunContext) -> Result<()> {
    execute(&MonitorKind::ALL, args, ctx).await
}

pub async fn run_monitor(args: MonitorArgs, ctx: RunContext) -> Result<()> {
    execute(&[args.kind.into()], args.source, ctx).await
}

async fn execute(kinds: &[MonitorKind], args: RunArgs, ctx: RunContext) -> Result<()> {
    let RunContext { config, options, output } = ctx;

    let observations = collect_observations(&args, &output).await?;
    let mut runner = Runner::only(&config, options, kinds)?;

    let spinner = output.create_spinner(&format!(
        "Running {} monitor{} over {} observations...",
        kinds.len(),
        if kinds.len() == 1 { "" } else { "s" },
        observations.len()
    ));
    let result = tokio::task::spawn_blocking(move || runner.run(observations)).await;
    spinner.finish_and_clear();
    let outcome = result??;

    output.print_run_outcome(&outcome)?;

    let failed = outcome.failures().count();
    if failed > 0 {
        return Err(CliError::MonitorsFailed {
            failed,
            total: outcome.outcomes.len(),
        });
    }
    info!("Run complete: {}", outcome.run_dir.display());
    Ok(())
}

async fn collect_observations(args: &RunArgs, output: &OutputManager) -> Result<Vec<Observation>> {
    match &args.input {
        Some(path) => load_observations(path).await,
        None => {
            output.print_info(&format!("No input given, generating sample data (seed {})", args.seed))?;
            Ok(SampleGenerator::new(args.seed).generate())
        }
    }
}
