//! Configuration management for filewarm
//!
//! Settings are layered with figment, lowest priority first:
//! built-in defaults, `~/.config/filewarm/config.toml`, `./filewarm.toml`
//! (or only the file passed with `--config`), `FILEWARM_*` environment
//! variables, and finally options given explicitly on the command line.
//! The merged settings are validated into an immutable [`Configuration`].

mod block_size;
mod core;

pub use block_size::{BlockSize, MAX_BLOCK_SIZE};
pub use self::core::{CliOverrides, Configuration, OutputFormat, ReaderKind, Settings};
