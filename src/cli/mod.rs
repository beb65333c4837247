//! Command-line interface for filewarm
//!
//! This module provides the CLI structure and wires configuration, the file
//! list, the engine and the reporter together for a single run.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

mod output;

pub use output::Output;

use crate::config::{CliOverrides, Configuration, OutputFormat, ReaderKind};
use crate::engine::{Cancellation, Scheduler};
use crate::input;
use crate::reader::reader_for;
use crate::report::{RunStatus, Summary};

/// filewarm - read every file in a list to warm network-attached storage
#[derive(Parser, Debug)]
#[command(
    name = "filewarm",
    version,
    about = "Read every file in a list at bounded concurrency, discarding the data",
    long_about = "Reads each path listed in FILE_LIST (one absolute path per line) in full and \
                  discards the content. Useful for warming caches on network-attached storage.\n\n\
                  Blank lines and lines starting with '#' are ignored.",
    after_help = "EXIT STATUS:\n    \
                  0    all files were dispatched and the run drained\n    \
                  1    bad arguments, unreadable file list, or a file failed without --skip-errors\n    \
                  130  interrupted"
)]
pub struct Cli {
    /// File containing one path per line ('-' reads the list from stdin)
    #[arg(value_name = "FILE_LIST")]
    pub file_list: PathBuf,

    /// Block size per read, e.g. 64K, 1M, 4M [default: 1M]
    #[arg(short, long, value_name = "SIZE")]
    pub block_size: Option<String>,

    /// Number of files to read concurrently [default: 1]
    #[arg(short, long, value_name = "N")]
    pub jobs: Option<usize>,

    /// Count failed files and keep going instead of stopping at the first failure
    #[arg(short, long)]
    pub skip_errors: bool,

    /// Block-read primitive [default: native]
    #[arg(long, value_enum)]
    pub reader: Option<ReaderKind>,

    /// Summary format [default: text]
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Use custom configuration file (TOML or JSON)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (can be repeated)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress per-file reading lines and diagnostics
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    /// Execute one run and report how it ended
    pub async fn run(self) -> Result<RunStatus> {
        setup_logging(self.verbose, self.quiet);

        let overrides = CliOverrides {
            block_size: self.block_size,
            jobs: self.jobs,
            skip_errors: self.skip_errors.then_some(true),
            reader: self.reader,
            format: self.format,
        };
        let config = Configuration::load(self.config.as_deref(), &overrides).context("Invalid configuration")?;

        let tasks = input::load_tasks(&self.file_list).context("Failed to load file list")?;

        let output = Arc::new(Output::new(self.verbose > 0, self.quiet, config.format));
        output.header(&config, tasks.len());

        let cancellation = Cancellation::new();
        let interrupt_listener = cancellation.watch_interrupt();

        let scheduler = Scheduler::new(config.clone(), reader_for(config.reader), output.clone());
        let result = scheduler.run(tasks, &cancellation).await;
        interrupt_listener.abort();

        let summary = Summary::from(&result);
        info!(status = ?summary.status, peak_workers = result.peak_workers, "Reporting");
        output.summary(&summary)?;

        Ok(summary.status)
    }
}

fn setup_logging(verbose: u8, quiet: bool) {
    if quiet {
        return;
    }

    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbose {
        0 => tracing_subscriber::EnvFilter::new("warn"),
        1 => tracing_subscriber::EnvFilter::new("info"),
        2 => tracing_subscriber::EnvFilter::new("debug"),
        _ => tracing_subscriber::EnvFilter::new("trace"),
    });

    // Diagnostics on stderr keep the per-file lines on stdout clean
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
