//! Bounded fan-out of one task per work item.
//!
//! Every item is spawned onto the tokio runtime as soon as the run starts.
//! A job only executes its task after taking one of `capacity` semaphore
//! permits, so at most `capacity` tasks run at once while the rest wait.
//! Which waiting job starts next depends on when the scheduler first polls
//! it, not on submission order. The calling side never runs task code; it
//! awaits completions, aggregates outcomes and reports progress.

use std::any::Any;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use audit_logging::{audit_debug, audit_error, audit_trace, audit_warn};
use futures_util::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use vmaudit_core::{
    truncate_label, JobFailure, JobId, JobState, RunProgress, TaskError, TaskOutcome,
    LABEL_MAX_CHARS,
};

use crate::ProgressSink;

pub const DEFAULT_CAPACITY: usize = 32;

/// One unit of fan-out work.
pub trait WorkItem: Send + 'static {
    /// Human-readable name shown in progress reports.
    fn label(&self) -> String;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// A failed task is recorded and every other job keeps going.
    #[default]
    Continue,
    /// The first failure cancels every job that has not finished yet.
    CancelOnFirstFailure,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerSettings {
    pub capacity: usize,
    pub failure_policy: FailurePolicy,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            failure_policy: FailurePolicy::Continue,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RunnerError {
    #[error("pool capacity must be at least 1")]
    ZeroCapacity,
}

/// Aggregate of a drained run. `results` holds only `Found` values, in
/// completion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary<R> {
    pub total: usize,
    pub results: Vec<R>,
    pub failures: Vec<JobFailure>,
    /// Jobs stopped by the cancel-on-first-failure policy.
    pub cancelled: usize,
}

impl<R> RunSummary<R> {
    fn new(total: usize) -> Self {
        Self {
            total,
            results: Vec::new(),
            failures: Vec::new(),
            cancelled: 0,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.cancelled == 0
    }
}

struct JobRecord {
    label: String,
    started: Arc<AtomicBool>,
}

impl JobRecord {
    fn state(&self) -> JobState {
        if self.started.load(Ordering::Acquire) {
            JobState::Running
        } else {
            JobState::Submitted
        }
    }
}

enum JobEnd<R> {
    Finished(TaskOutcome<R>),
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct TaskRunner {
    settings: RunnerSettings,
}

impl TaskRunner {
    pub fn new(settings: RunnerSettings) -> Result<Self, RunnerError> {
        if settings.capacity == 0 {
            return Err(RunnerError::ZeroCapacity);
        }
        Ok(Self { settings })
    }

    pub fn capacity(&self) -> usize {
        self.settings.capacity
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.settings.failure_policy
    }

    /// Runs `task` once per item with at most `capacity` tasks in flight and
    /// returns once every job has completed.
    ///
    /// Must be called from within a tokio runtime. Progress is emitted once
    /// after submission and once per completed job, so the pending count
    /// strictly decreases to zero. An empty `items` returns immediately
    /// without emitting anything.
    pub async fn run<W, C, R, F, Fut>(
        &self,
        items: Vec<W>,
        context: Arc<C>,
        task: F,
        sink: &dyn ProgressSink,
    ) -> RunSummary<R>
    where
        W: WorkItem,
        C: Send + Sync + 'static,
        R: Send + 'static,
        F: Fn(W, Arc<C>) -> Fut,
        Fut: Future<Output = TaskOutcome<R>> + Send + 'static,
    {
        let total = items.len();
        let mut summary = RunSummary::new(total);
        if total == 0 {
            return summary;
        }

        let capacity = self.settings.capacity;
        let pool = Arc::new(Semaphore::new(capacity));
        let cancel = CancellationToken::new();
        let mut active: BTreeMap<JobId, JobRecord> = BTreeMap::new();
        let mut pending = FuturesUnordered::new();

        for (index, item) in items.into_iter().enumerate() {
            let job_id = index as JobId + 1;
            let label = item.label();
            let started = Arc::new(AtomicBool::new(false));
            let job = task(item, Arc::clone(&context));
            let handle = tokio::spawn(run_job(
                job,
                Arc::clone(&pool),
                cancel.clone(),
                Arc::clone(&started),
            ));
            active.insert(job_id, JobRecord { label, started });
            pending.push(async move { (job_id, handle.await) });
        }
        audit_debug!("Submitted {} jobs to a pool of {}", total, capacity);

        let mut completed = 0;
        sink.emit(snapshot(total, completed, capacity, &pool, &active));

        while let Some((job_id, joined)) = pending.next().await {
            let Some(record) = active.remove(&job_id) else {
                audit_error!("Job {} completed but was not in the active set", job_id);
                continue;
            };
            completed += 1;
            audit_trace!("Job {} ({}) -> {:?}", job_id, record.label, JobState::Completed);

            let end = joined.unwrap_or_else(|err| {
                let message = if err.is_panic() {
                    panic_message(err.into_panic())
                } else {
                    err.to_string()
                };
                JobEnd::Finished(TaskOutcome::Failed(TaskError::Panicked(message)))
            });

            match end {
                JobEnd::Finished(TaskOutcome::Found(result)) => summary.results.push(result),
                JobEnd::Finished(TaskOutcome::Empty) => {}
                JobEnd::Finished(TaskOutcome::Failed(error)) => {
                    audit_warn!("Job {} ({}) failed: {}", job_id, record.label, error);
                    if self.settings.failure_policy == FailurePolicy::CancelOnFirstFailure
                        && !cancel.is_cancelled()
                    {
                        audit_warn!("Cancelling {} unfinished jobs", active.len());
                        cancel.cancel();
                    }
                    summary.failures.push(JobFailure {
                        job_id,
                        label: record.label,
                        error,
                    });
                }
                JobEnd::Cancelled => summary.cancelled += 1,
            }

            sink.emit(snapshot(total, completed, capacity, &pool, &active));
        }

        pool.close();
        audit_debug!(
            "Run drained: {} results, {} failures, {} cancelled",
            summary.results.len(),
            summary.failures.len(),
            summary.cancelled
        );
        summary
    }
}

async fn run_job<R, Fut>(
    job: Fut,
    pool: Arc<Semaphore>,
    cancel: CancellationToken,
    started: Arc<AtomicBool>,
) -> JobEnd<R>
where
    Fut: Future<Output = TaskOutcome<R>>,
{
    let _permit = tokio::select! {
        biased;
        _ = cancel.cancelled() => return JobEnd::Cancelled,
        permit = pool.acquire_owned() => match permit {
            Ok(permit) => permit,
            Err(_) => return JobEnd::Cancelled,
        },
    };
    started.store(true, Ordering::Release);

    tokio::select! {
        biased;
        _ = cancel.cancelled() => JobEnd::Cancelled,
        outcome = job => JobEnd::Finished(outcome),
    }
}

fn snapshot(
    total: usize,
    completed: usize,
    capacity: usize,
    pool: &Semaphore,
    active: &BTreeMap<JobId, JobRecord>,
) -> RunProgress {
    let pending_label = active
        .values()
        .find(|record| record.state() == JobState::Running)
        .or_else(|| active.values().next())
        .map(|record| truncate_label(&record.label, LABEL_MAX_CHARS));

    RunProgress {
        total,
        completed,
        active: capacity.saturating_sub(pool.available_permits()),
        capacity,
        pending_label,
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
