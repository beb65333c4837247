//! # filewarm - read every file in a list, at bounded concurrency
//!
//! Reads each listed file in full and discards the content, typically to
//! warm or exercise a network-attached storage path.
//!
//! ## Pieces
//!
//! - [`input`]: parses the file list into ordered [`input::FileTask`]s
//! - [`engine`]: the scheduler, per-file processor, shared counters and cancellation
//! - [`reader`]: the block-read primitives behind [`reader::BlockReader`]
//! - [`report`]: summary lines, JSON summary and exit status
//!
//! ## Quick Start
//!
//! ```bash
//! find /mnt/share -type f > files.txt
//! filewarm --jobs 8 --block-size 4M --skip-errors files.txt
//! ```

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod input;
pub mod reader;
pub mod report;

pub use cli::{Cli, Output};
pub use config::Configuration;

/// Result type alias for filewarm operations
pub type Result<T> = anyhow::Result<T>;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
