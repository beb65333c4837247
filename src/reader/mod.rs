//! Block-read primitives
//!
//! A reader consumes a whole file in block-sized chunks and throws the data
//! away. Readers run on blocking threads and must notice cancellation between
//! blocks so a cancelled run can tear down promptly.

mod dd;
mod native;

pub use dd::DdReader;
pub use native::NativeReader;

use crate::config::{BlockSize, ReaderKind};
use std::io;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Error, Debug)]
pub enum ReadError {
    /// The run was cancelled while this read was in flight
    #[error("read cancelled")]
    Cancelled,

    #[error(transparent)]
    Io(#[from] io::Error),

    /// The external reader exited unsuccessfully
    #[error("{0}")]
    Failed(String),
}

pub trait BlockReader: Send + Sync {
    /// Read all of `path` in `block_size` chunks, returning the number of bytes read
    fn read_file(&self, path: &Path, block_size: &BlockSize, cancel: &CancellationToken) -> Result<u64, ReadError>;
}

/// Build the reader selected in configuration
pub fn reader_for(kind: ReaderKind) -> Arc<dyn BlockReader> {
    match kind {
        ReaderKind::Native => Arc::new(NativeReader),
        ReaderKind::Dd => Arc::new(DdReader::default()),
    }
}
