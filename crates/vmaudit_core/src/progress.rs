use std::fmt;

/// Longest pending-item label shown in a progress line, in characters.
pub const LABEL_MAX_CHARS: usize = 60;

const ELLIPSIS: &str = "...";

/// Snapshot of a task run, emitted after submission and after each reaped job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunProgress {
    pub total: usize,
    pub completed: usize,
    /// Jobs currently holding a pool slot.
    pub active: usize,
    pub capacity: usize,
    /// Truncated label of one job that has not completed yet.
    pub pending_label: Option<String>,
}

impl RunProgress {
    pub fn pending(&self) -> usize {
        self.total.saturating_sub(self.completed)
    }

    /// Whole-number percentage of completed jobs; an empty run counts as done.
    pub fn percent_complete(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        ((self.completed.min(self.total) * 100) / self.total) as u8
    }

    pub fn is_done(&self) -> bool {
        self.pending() == 0
    }
}

impl fmt::Display for RunProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} threads | {}% complete | {} pending",
            self.active,
            self.capacity,
            self.percent_complete(),
            self.pending()
        )?;
        if let Some(label) = &self.pending_label {
            write!(f, " | {label}")?;
        }
        Ok(())
    }
}

/// Shortens `label` to at most `max_chars` characters followed by `...`.
///
/// Labels that already fit are returned unchanged.
pub fn truncate_label(label: &str, max_chars: usize) -> String {
    match label.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}{ELLIPSIS}", &label[..cut]),
        None => label.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_labels_are_verbatim() {
        let label = "a".repeat(LABEL_MAX_CHARS);
        assert_eq!(truncate_label(&label, LABEL_MAX_CHARS), label);
        assert_eq!(truncate_label("", LABEL_MAX_CHARS), "");
    }

    #[test]
    fn long_labels_keep_sixty_chars_and_ellipsis() {
        let label = "b".repeat(LABEL_MAX_CHARS + 1);
        let truncated = truncate_label(&label, LABEL_MAX_CHARS);
        assert_eq!(truncated, format!("{}...", "b".repeat(LABEL_MAX_CHARS)));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let label = "é".repeat(70);
        let truncated = truncate_label(&label, LABEL_MAX_CHARS);
        assert_eq!(truncated.chars().count(), LABEL_MAX_CHARS + ELLIPSIS.len());
        assert!(truncated.starts_with("éé"));
    }

    #[test]
    fn percent_and_pending() {
        let progress = RunProgress {
            total: 4,
            completed: 1,
            active: 2,
            capacity: 2,
            pending_label: Some("vm-2".into()),
        };
        assert_eq!(progress.pending(), 3);
        assert_eq!(progress.percent_complete(), 25);
        assert_eq!(
            progress.to_string(),
            "2/2 threads | 25% complete | 3 pending | vm-2"
        );
    }

    #[test]
    fn empty_run_is_complete() {
        let progress = RunProgress {
            total: 0,
            completed: 0,
            active: 0,
            capacity: 32,
            pending_label: None,
        };
        assert!(progress.is_done());
        assert_eq!(progress.percent_complete(), 100);
    }
}
