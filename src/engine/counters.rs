use std::sync::{Mutex, MutexGuard};

/// Which counter an increment targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterKind {
    /// Reservation sequence that numbers "reading" lines
    Started,
    /// Reads that completed successfully
    Processed,
    /// Files that failed for any reason
    Failed,
}

/// Point-in-time copy of every counter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    pub started: u64,
    pub processed: u64,
    pub failed: u64,
    pub bytes: u64,
}

/// Shared processed/failed totals for one run
///
/// Every operation takes the same lock, so increments are never lost and each
/// caller gets a distinct sequence number per kind. All values only grow.
#[derive(Debug, Default)]
pub struct CounterStore {
    inner: Mutex<CounterSnapshot>,
}

impl CounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one to `kind` and return the new value
    pub fn increment(&self, kind: CounterKind) -> u64 {
        let mut counts = self.lock();
        let slot = match kind {
            CounterKind::Started => &mut counts.started,
            CounterKind::Processed => &mut counts.processed,
            CounterKind::Failed => &mut counts.failed,
        };
        *slot += 1;
        *slot
    }

    pub fn read(&self, kind: CounterKind) -> u64 {
        let counts = self.lock();
        match kind {
            CounterKind::Started => counts.started,
            CounterKind::Processed => counts.processed,
            CounterKind::Failed => counts.failed,
        }
    }

    /// Account bytes consumed by a read
    pub fn add_bytes(&self, bytes: u64) {
        self.lock().bytes += bytes;
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        *self.lock()
    }

    fn lock(&self) -> MutexGuard<'_, CounterSnapshot> {
        // The guarded data is plain integers, so a poisoned lock is still consistent
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
