use super::ProgressSink;
use super::counters::{CounterKind, CounterStore};
use crate::config::BlockSize;
use crate::error::PerFileError;
use crate::input::FileTask;
use crate::reader::{BlockReader, ReadError};
use std::fs::{self, File};
use std::io;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// What happened to one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    /// Read to the end
    Read { bytes: u64 },
    /// Counted into `failed`
    Failed(PerFileError),
    /// Stopped by cancellation; counted nowhere
    Terminated,
}

/// Validates and reads one file, updating the shared counters
pub struct Processor {
    counters: Arc<CounterStore>,
    reader: Arc<dyn BlockReader>,
    sink: Arc<dyn ProgressSink>,
    block_size: BlockSize,
    total: usize,
}

impl Processor {
    pub fn new(
        counters: Arc<CounterStore>,
        reader: Arc<dyn BlockReader>,
        sink: Arc<dyn ProgressSink>,
        block_size: BlockSize,
        total: usize,
    ) -> Self {
        Self {
            counters,
            reader,
            sink,
            block_size,
            total,
        }
    }

    /// Runs on a blocking thread. Never retries.
    pub fn process(&self, task: &FileTask, cancel: &CancellationToken) -> FileOutcome {
        if cancel.is_cancelled() {
            return FileOutcome::Terminated;
        }

        if let Err(e) = probe(&task.path) {
            return self.record_failure(PerFileError::from_probe(task.path.clone(), &e));
        }

        let count = self.counters.increment(CounterKind::Started);
        self.sink.reading(count, self.total, task, &self.block_size);

        match self.reader.read_file(&task.path, &self.block_size, cancel) {
            Ok(bytes) => {
                self.counters.add_bytes(bytes);
                self.counters.increment(CounterKind::Processed);
                debug!(ordinal = task.ordinal, bytes, "Read complete");
                FileOutcome::Read { bytes }
            }
            Err(ReadError::Cancelled) => {
                debug!(ordinal = task.ordinal, path = %task.path.display(), "Read terminated");
                FileOutcome::Terminated
            }
            Err(e) => self.record_failure(PerFileError::ReadFailed {
                path: task.path.clone(),
                reason: e.to_string(),
            }),
        }
    }

    /// Count a failure and report it with its running number
    pub fn record_failure(&self, error: PerFileError) -> FileOutcome {
        let count = self.counters.increment(CounterKind::Failed);
        debug!(%error, "File failed");
        self.sink.failed(count, self.total, &error);
        FileOutcome::Failed(error)
    }
}

/// Existence first, then readability
fn probe(path: &Path) -> io::Result<()> {
    fs::metadata(path)?;
    File::open(path)?;
    Ok(())
}
