//! Terminal output for filewarm
//!
//! Per-file lines follow `[<count>/<total>] <message>`. Failures always go to
//! stderr. With `--format json` the progress lines move to stderr too, so
//! stdout carries only the JSON summary.

use crate::config::{BlockSize, Configuration, OutputFormat};
use crate::engine::{ProgressSink, failure_line, reading_line};
use crate::error::PerFileError;
use crate::input::FileTask;
use crate::report::{RunStatus, Summary};
use anyhow::Result;
use console::style;

/// Output handler for consistent CLI formatting
pub struct Output {
    verbose: bool,
    quiet: bool,
    format: OutputFormat,
}

impl Output {
    pub fn new(verbose: bool, quiet: bool, format: OutputFormat) -> Self {
        Self { verbose, quiet, format }
    }

    /// Print an error message
    pub fn error(&self, message: &str) {
        // Errors are always shown, even in quiet mode
        eprintln!("{} {}", style("✖").red(), message);
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        eprintln!("{} {}", style("⚠").yellow(), message);
    }

    /// Describe the run before it starts (verbose only)
    pub fn header(&self, config: &Configuration, total: usize) {
        if !self.verbose || self.quiet {
            return;
        }
        eprintln!(
            "{} {}",
            style("filewarm").cyan().bold(),
            env!("CARGO_PKG_VERSION")
        );
        eprintln!("{}", style("─".repeat(50)).dim());
        eprintln!("  {} {}", style("Files:").bold(), total);
        eprintln!("  {} {}", style("Jobs:").bold(), config.jobs);
        eprintln!("  {} {}", style("Block size:").bold(), config.block_size);
        eprintln!("  {} {:?}", style("Reader:").bold(), config.reader);
        eprintln!("  {} {}", style("Skip errors:").bold(), config.skip_errors);
        eprintln!();
    }

    /// Print the final summary in the configured format
    pub fn summary(&self, summary: &Summary) -> Result<()> {
        match summary.status {
            RunStatus::Interrupted => self.warning("Interrupted: run stopped before all files were read"),
            RunStatus::Aborted => self.error("Aborted at first failure (use --skip-errors to continue past failures)"),
            RunStatus::Completed => {}
        }

        match self.format {
            OutputFormat::Json => println!("{}", summary.to_json()?),
            OutputFormat::Text => {
                for line in summary.text_lines() {
                    println!("{}", line);
                }
                if self.verbose {
                    let secs = summary.elapsed_ms as f64 / 1000.0;
                    println!(
                        "{} {} bytes in {:.2}s",
                        style("Read").dim(),
                        summary.bytes_read,
                        secs
                    );
                }
            }
        }
        Ok(())
    }
}

impl ProgressSink for Output {
    fn reading(&self, count: u64, total: usize, task: &FileTask, block_size: &BlockSize) {
        if self.quiet {
            return;
        }
        let line = reading_line(count, total, task, block_size);
        match self.format {
            OutputFormat::Text => println!("{}", line),
            OutputFormat::Json => eprintln!("{}", line),
        }
    }

    fn failed(&self, count: u64, total: usize, error: &PerFileError) {
        eprintln!("{}", style(failure_line(count, total, error)).red());
    }
}
