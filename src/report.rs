//! Final summary and exit status

use crate::engine::RunResult;
use crate::error::CancelledError;
use serde::Serialize;

/// Exit code used when a run is interrupted by a signal (128 + SIGINT)
pub const EXIT_INTERRUPTED: u8 = 130;

/// How the run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Drained normally, whether or not skipped files failed
    Completed,
    /// Stopped by a failure while errors were not skipped
    Aborted,
    /// Stopped by an external interrupt
    Interrupted,
}

impl RunStatus {
    pub fn exit_code(self) -> u8 {
        match self {
            Self::Completed => 0,
            Self::Aborted => 1,
            Self::Interrupted => EXIT_INTERRUPTED,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub run_id: String,
    pub processed: u64,
    pub failed: u64,
    pub total: usize,
    pub bytes_read: u64,
    pub elapsed_ms: u64,
    pub status: RunStatus,
}

impl From<&RunResult> for Summary {
    fn from(result: &RunResult) -> Self {
        let status = match result.cancelled {
            None => RunStatus::Completed,
            Some(CancelledError::FailurePolicy { .. }) => RunStatus::Aborted,
            Some(CancelledError::Interrupted) => RunStatus::Interrupted,
        };

        Self {
            run_id: result.run_id.to_string(),
            processed: result.counts.processed,
            failed: result.counts.failed,
            total: result.total,
            bytes_read: result.counts.bytes,
            elapsed_ms: result.elapsed.as_millis() as u64,
            status,
        }
    }
}

impl Summary {
    /// The two summary lines
    pub fn text_lines(&self) -> [String; 2] {
        [
            format!("Files processed: {} / {}", self.processed, self.total),
            format!("Failed files: {}", self.failed),
        ]
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
