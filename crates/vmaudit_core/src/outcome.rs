use std::fmt;

pub type JobId = u64;

/// Lifecycle of one submitted job. There is no distinct failed state: a
/// failed task still completes, and the failure travels in its outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Submitted,
    Running,
    Completed,
}

/// What a single task produced for its work item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome<R> {
    /// The item matched and produced a result.
    Found(R),
    /// The item was inspected and nothing matched.
    Empty,
    Failed(TaskError),
}

impl<R> TaskOutcome<R> {
    /// Lifts an optional value into an outcome, treating `None` as no match.
    pub fn from_option(value: Option<R>) -> Self {
        match value {
            Some(value) => TaskOutcome::Found(value),
            None => TaskOutcome::Empty,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, TaskOutcome::Failed(_))
    }
}

impl<T> From<Result<Option<T>, TaskError>> for TaskOutcome<T> {
    fn from(result: Result<Option<T>, TaskError>) -> Self {
        match result {
            Ok(value) => TaskOutcome::from_option(value),
            Err(err) => TaskOutcome::Failed(err),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskError {
    /// The upstream lookup behind the task failed.
    #[error("inventory query failed: {0}")]
    Query(String),
    #[error("task panicked: {0}")]
    Panicked(String),
}

/// A failed job as reported back to the caller after the run drained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobFailure {
    pub job_id: JobId,
    pub label: String,
    pub error: TaskError,
}

impl fmt::Display for JobFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job {} ({}): {}", self.job_id, self.label, self.error)
    }
}
