use crate::error::Result;
use console::{style, Style, Term};
use finishline_monitor::runner::RunOutcome;
use finishline_monitor::{MonitorConfig, MonitorStatus, ReportFormat};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;

pub struct OutputManager {
    format: ReportFormat,
    colored: bool,
    quiet: bool,
    term: Term,
}

impl OutputManager {
    pub fn new(format: ReportFormat, colored: bool, quiet: bool) -> Self {
        Self {
            format,
            colored,
            quiet,
            term: Term::stdout(),
        }
    }

    pub fn format(&self) -> ReportFormat {
        self.format
    }

    pub fn print_success(&self, message: &str) -> Result<()> {
        if self.quiet {
            return Ok(());
        }
        if self.colored {
            self.term.write_line(&format!("{} {}", style("✓").green().bold(), message))?;
        } else {
            self.term.write_line(&format!("✓ {}", message))?;
        }
        Ok(())
    }

    pub fn print_warning(&self, message: &str) -> Result<()> {
        if self.quiet {
            return Ok(());
        }
        if self.colored {
            self.term.write_line(&format!("{} {}", style("⚠").yellow().bold(), message))?;
        } else {
            self.term.write_line(&format!("⚠ {}", message))?;
        }
        Ok(())
    }

    pub fn print_error(&self, message: &str) -> Result<()> {
        if self.colored {
            eprintln!("{} {}", style("✗").red().bold(), message);
        } else {
            eprintln!("✗ {}", message);
        }
        Ok(())
    }

    pub fn print_info(&self, message: &str) -> Result<()> {
        if self.quiet {
            return Ok(());
        }
        if self.colored {
            self.term.write_line(&format!("{} {}", style("ℹ").blue().bold(), message))?;
        } else {
            self.term.write_line(&format!("ℹ {}", message))?;
        }
        Ok(())
    }

    /// Spinner shown while monitors run; hidden in quiet mode
    pub fn create_spinner(&self, message: &str) -> ProgressBar {
        if self.quiet {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new_spinner();
        let spinner_style = ProgressStyle::default_spinner()
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        pb.set_style(spinner_style);
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(80));
        pb
    }

    /// One line per monitor, then the summary report location
    pub fn print_run_outcome(&self, outcome: &RunOutcome) -> Result<()> {
        if self.quiet {
            return Ok(());
        }

        let width = outcome
            .outcomes
            .iter()
            .map(|o| o.kind.as_str().len())
            .max()
            .unwrap_or(0);

        for monitor in &outcome.outcomes {
            let name = format!("{:<width$}", monitor.kind.as_str(), width = width);
            match &monitor.result {
                Ok(run) => {
                    let status = self.paint_status(run.status);
                    let line = format!(
                        "{}  {} {} ({} observations)",
                        name,
                        status,
                        relative(&run.report_path, &outcome.run_dir),
                        monitor.ingested
                    );
                    if run.status.is_violation() {
                        self.print_warning(&line)?;
                    } else {
                        self.print_success(&line)?;
                    }
                }
                Err(e) => self.print_error(&format!("{}  failed: {}", name, e))?,
            }
        }

        self.print_info(&format!("Summary written to {}", outcome.summary_path.display()))
    }

    pub fn print_config(&self, config: &MonitorConfig) -> Result<()> {
        let rendered = match self.format {
            ReportFormat::Json => serde_json::to_string_pretty(config)?,
            _ => toml::to_string_pretty(config)?,
        };
        self.term.write_line(rendered.trim_end())?;
        Ok(())
    }

    fn paint_status(&self, status: MonitorStatus) -> String {
        let label = format!("{:<16}", status.as_str());
        if !self.colored {
            return label;
        }
        let paint = match status {
            MonitorStatus::HasViolations => Style::new().yellow().bold(),
            MonitorStatus::Compliant => Style::new().green(),
            MonitorStatus::HasData => Style::new().cyan(),
            MonitorStatus::NoData => Style::new().dim(),
        };
        paint.apply_to(label).to_string()
    }
}

fn relative(path: &Path, base: &Path) -> String {
    path.strip_prefix(base).unwrap_or(path).display().to_string()
}
