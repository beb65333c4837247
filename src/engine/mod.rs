//! Bounded-concurrency read engine
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   acquire slot   ┌──────────────┐  spawn_blocking  ┌──────────────┐
//! │  Scheduler   │─────────────────▶│   Worker     │─────────────────▶│  Processor   │
//! │  (dispatch)  │◀─────────────────│  (one file)  │                  │  + Reader    │
//! └──────────────┘  release slot    └──────────────┘                  └──────┬───────┘
//!        │                                  │                                │
//!        │ cancel / teardown                │ failure policy                 │ increments
//!        ▼                                  ▼                                ▼
//! ┌──────────────┐                  ┌──────────────┐                  ┌──────────────┐
//! │ Cancellation │◀─────────────────│   JoinSet    │                  │ CounterStore │
//! └──────────────┘                  └──────────────┘                  └──────────────┘
//! ```
//!
//! The scheduler admits tasks in list order, one per free slot of a
//! semaphore sized to the job count. Waiting for a slot is the only place
//! the scheduler suspends. Workers run the [`Processor`] on the blocking
//! pool and apply the failure policy before giving their slot back, so no
//! task is admitted after a failure that is not being skipped.
//!
//! Run states: `Idle → Dispatching → Draining → Done`, or
//! `Dispatching/Draining → Cancelling → Done` on failure or interrupt.

mod cancel;
mod counters;
mod processor;

pub use cancel::Cancellation;
pub use counters::{CounterKind, CounterSnapshot, CounterStore};
pub use processor::{FileOutcome, Processor};

use crate::config::{BlockSize, Configuration};
use crate::error::{CancelledError, PerFileError};
use crate::input::FileTask;
use crate::reader::BlockReader;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::{JoinError, JoinSet};
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

/// Receives per-file lines while a run executes
///
/// Called from worker threads, possibly concurrently.
pub trait ProgressSink: Send + Sync {
    fn reading(&self, count: u64, total: usize, task: &FileTask, block_size: &BlockSize);
    fn failed(&self, count: u64, total: usize, error: &PerFileError);
}

/// `[3/10] reading /mnt/a.bin with block size 1M`
pub fn reading_line(count: u64, total: usize, task: &FileTask, block_size: &BlockSize) -> String {
    format!("[{}/{}] reading {} with block size {}", count, total, task.path.display(), block_size)
}

/// `[1/10] ERROR: File not found: /mnt/b.bin`
pub fn failure_line(count: u64, total: usize, error: &PerFileError) -> String {
    format!("[{}/{}] ERROR: {}", count, total, error)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Dispatching,
    Draining,
    Cancelling,
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerState {
    Running,
    Completed(FileOutcome),
}

/// One admitted task and where it got to; owned by the scheduler
#[derive(Debug, Clone)]
pub struct WorkerHandle {
    pub task: FileTask,
    pub state: WorkerState,
}

/// Final state of a run, handed to the reporter
#[derive(Debug, Clone)]
pub struct RunResult {
    pub run_id: Uuid,
    pub counts: CounterSnapshot,
    /// Eligible tasks in the list
    pub total: usize,
    /// Tasks admitted to a worker
    pub dispatched: usize,
    /// `None` when the run drained normally
    pub cancelled: Option<CancelledError>,
    /// Most workers observed running at once
    pub peak_workers: usize,
    pub elapsed: Duration,
}

/// Running/peak worker gauges
#[derive(Debug, Default)]
struct WorkerGauge {
    running: AtomicUsize,
    peak: AtomicUsize,
}

impl WorkerGauge {
    fn enter(self: &Arc<Self>) -> RunningGuard {
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        RunningGuard(self.clone())
    }
}

struct RunningGuard(Arc<WorkerGauge>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.running.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Dispatches file tasks to at most `jobs` concurrent workers
pub struct Scheduler {
    config: Configuration,
    reader: Arc<dyn BlockReader>,
    sink: Arc<dyn ProgressSink>,
}

impl Scheduler {
    pub fn new(config: Configuration, reader: Arc<dyn BlockReader>, sink: Arc<dyn ProgressSink>) -> Self {
        Self { config, reader, sink }
    }

    /// Execute one run over `tasks`. Consumes the tasks; a run cannot be resumed.
    pub async fn run(&self, tasks: Vec<FileTask>, cancel: &Cancellation) -> RunResult {
        let run_id = Uuid::new_v4();
        let span = info_span!("run", %run_id);
        self.run_inner(run_id, tasks, cancel).instrument(span).await
    }

    async fn run_inner(&self, run_id: Uuid, tasks: Vec<FileTask>, cancel: &Cancellation) -> RunResult {
        let start = Instant::now();
        let total = tasks.len();
        let jobs = self.config.jobs.get();

        let counters = Arc::new(CounterStore::new());
        let processor = Arc::new(Processor::new(
            counters.clone(),
            self.reader.clone(),
            self.sink.clone(),
            self.config.block_size.clone(),
            total,
        ));
        let slots = Arc::new(Semaphore::new(jobs));
        let gauge = Arc::new(WorkerGauge::default());
        let mut workers: JoinSet<WorkerHandle> = JoinSet::new();
        let mut dispatched = 0usize;

        let mut state = SchedulerState::Idle;
        info!(total, jobs, block_size = %self.config.block_size, skip_errors = self.config.skip_errors, "Starting run");

        state = transition(state, SchedulerState::Dispatching);
        for task in tasks {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                permit = slots.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };
            // A failing worker cancels before releasing its slot
            if cancel.is_cancelled() {
                break;
            }

            debug!(ordinal = task.ordinal, path = %task.path.display(), "Dispatching");
            dispatched += 1;
            workers.spawn(run_worker(
                task,
                permit,
                processor.clone(),
                cancel.clone(),
                gauge.clone(),
                self.config.skip_errors,
            ));

            while let Some(joined) = workers.try_join_next() {
                on_joined(joined);
            }
        }

        if cancel.is_cancelled() {
            state = transition(state, SchedulerState::Cancelling);
        } else {
            state = transition(state, SchedulerState::Draining);
            loop {
                tokio::select! {
                    joined = workers.join_next() => match joined {
                        Some(joined) => on_joined(joined),
                        None => break,
                    },
                    _ = cancel.cancelled() => {
                        state = transition(state, SchedulerState::Cancelling);
                        break;
                    }
                }
            }
        }

        if state == SchedulerState::Cancelling {
            teardown(&mut workers, self.config.teardown_grace).await;
        }
        transition(state, SchedulerState::Done);

        let result = RunResult {
            run_id,
            counts: counters.snapshot(),
            total,
            dispatched,
            cancelled: cancel.reason().cloned(),
            peak_workers: gauge.peak.load(Ordering::SeqCst),
            elapsed: start.elapsed(),
        };
        info!(
            processed = result.counts.processed,
            failed = result.counts.failed,
            dispatched,
            elapsed_ms = result.elapsed.as_millis() as u64,
            "Run finished"
        );
        result
    }
}

fn transition(from: SchedulerState, to: SchedulerState) -> SchedulerState {
    debug!(?from, ?to, "Scheduler state");
    to
}

/// Worker body: one file, then the failure policy, then release the slot
async fn run_worker(
    task: FileTask,
    permit: OwnedSemaphorePermit,
    processor: Arc<Processor>,
    cancel: Cancellation,
    gauge: Arc<WorkerGauge>,
    skip_errors: bool,
) -> WorkerHandle {
    let running = gauge.enter();
    let mut handle = WorkerHandle {
        task,
        state: WorkerState::Running,
    };

    let blocking_task = handle.task.clone();
    let blocking_processor = processor.clone();
    let token = cancel.token().clone();
    let outcome = match tokio::task::spawn_blocking(move || blocking_processor.process(&blocking_task, &token)).await {
        Ok(outcome) => outcome,
        Err(e) => processor.record_failure(PerFileError::ReadFailed {
            path: handle.task.path.clone(),
            reason: format!("worker panicked: {e}"),
        }),
    };

    if let FileOutcome::Failed(error) = &outcome {
        if !skip_errors
            && cancel.cancel(CancelledError::FailurePolicy {
                path: error.path().clone(),
            })
        {
            info!(ordinal = handle.task.ordinal, "Stopping run after failure");
        }
    }

    handle.state = WorkerState::Completed(outcome);
    // Leave the gauge before the slot frees so it never exceeds the job count
    drop(running);
    drop(permit);
    handle
}

fn on_joined(joined: Result<WorkerHandle, JoinError>) {
    match joined {
        Ok(handle) => debug!(ordinal = handle.task.ordinal, state = ?handle.state, "Worker finished"),
        Err(e) if e.is_cancelled() => debug!("Worker aborted"),
        Err(e) => warn!(error = %e, "Worker task failed"),
    }
}

/// Wait up to `grace` for running workers to notice cancellation, then abandon them
async fn teardown(workers: &mut JoinSet<WorkerHandle>, grace: Duration) {
    if workers.is_empty() {
        return;
    }
    info!(running = workers.len(), "Cancelling running workers");

    let drained = tokio::time::timeout(grace, async {
        while let Some(joined) = workers.join_next().await {
            on_joined(joined);
        }
    })
    .await;

    if drained.is_err() {
        warn!(
            remaining = workers.len(),
            grace_ms = grace.as_millis() as u64,
            "Workers did not stop in time, abandoning them"
        );
        workers.abort_all();
    }
}
