use std::io::{self, IsTerminal, Write};

use vmaudit_core::RunProgress;
use vmaudit_engine::ProgressSink;

/// Rewrites a single status line on stderr; ends it once nothing is pending.
/// When stderr is not a terminal every snapshot becomes its own plain line.
pub struct TerminalProgress {
    interactive: bool,
}

impl TerminalProgress {
    pub fn new() -> Self {
        Self::with_interactive(io::stderr().is_terminal())
    }

    fn with_interactive(interactive: bool) -> Self {
        Self { interactive }
    }

    fn write_to(&self, out: &mut impl Write, progress: &RunProgress) -> io::Result<()> {
        if self.interactive {
            // Clear the rest of the line so a shorter label leaves no residue.
            write!(out, "\r\x1b[2K{progress}")?;
            if progress.is_done() {
                writeln!(out)?;
            }
        } else {
            writeln!(out, "{progress}")?;
        }
        out.flush()
    }
}

impl Default for TerminalProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for TerminalProgress {
    fn emit(&self, progress: RunProgress) {
        let _ = self.write_to(&mut io::stderr().lock(), &progress);
    }
}
