use std::sync::Mutex;

use audit_logging::audit_debug;
use vmaudit_core::RunProgress;

/// Receives a progress snapshot after submission and after every reaped job.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, progress: RunProgress);
}

/// Writes each snapshot to the debug log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgressSink;

impl ProgressSink for LogProgressSink {
    fn emit(&self, progress: RunProgress) {
        audit_debug!("{}", progress);
    }
}

/// Keeps every snapshot in memory, in emission order.
#[derive(Debug, Default)]
pub struct RecordingProgressSink {
    events: Mutex<Vec<RunProgress>>,
}

impl RecordingProgressSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) -> Vec<RunProgress> {
        match self.events.lock() {
            Ok(mut events) => events.drain(..).collect(),
            Err(poisoned) => poisoned.into_inner().drain(..).collect(),
        }
    }
}

impl ProgressSink for RecordingProgressSink {
    fn emit(&self, progress: RunProgress) {
        match self.events.lock() {
            Ok(mut events) => events.push(progress),
            Err(poisoned) => poisoned.into_inner().push(progress),
        }
    }
}
