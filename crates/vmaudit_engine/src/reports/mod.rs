//! Drivers for the three reports: resolve setup state, fan out where the
//! report needs per-object queries, and return sorted rows.
mod affinity;
mod duplicates;
mod orphans;

pub use affinity::{affinity_report, VmItem};
pub use duplicates::duplicate_report;
pub use orphans::{orphan_report, FolderItem};

use vmaudit_core::JobFailure;

use crate::RunSummary;

/// Rows of a fanned-out report together with what went wrong on the way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportOutcome<T> {
    pub rows: Vec<T>,
    /// Number of work items submitted to the runner.
    pub scanned: usize,
    pub failures: Vec<JobFailure>,
    pub cancelled: usize,
}

impl<T> ReportOutcome<T> {
    pub(crate) fn from_summary(summary: RunSummary<Vec<T>>) -> Self {
        Self {
            rows: summary.results.into_iter().flatten().collect(),
            scanned: summary.total,
            failures: summary.failures,
            cancelled: summary.cancelled,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.cancelled == 0
    }
}
