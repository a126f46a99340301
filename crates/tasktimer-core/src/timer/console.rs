use std::io::Write;

use tracing::debug;

/// The terminal side of a run: whole lines plus one status line that is
/// redrawn in place.
pub struct Console {
    out: Box<dyn Write + Send>,
}

impl Console {
    pub fn new(out: impl Write + Send + 'static) -> Self {
        Self { out: Box::new(out) }
    }

    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }

    /// Discard all output.
    pub fn sink() -> Self {
        Self::new(std::io::sink())
    }

    pub fn line(&mut self, text: &str) {
        let written = writeln!(self.out, "{text}").and_then(|_| self.out.flush());
        if let Err(e) = written {
            debug!(error = %e, "console write failed");
        }
    }

    /// Redraw the status line (carriage return, no newline).
    pub fn status(&mut self, text: &str) {
        let written = write!(self.out, "\r{text}").and_then(|_| self.out.flush());
        if let Err(e) = written {
            debug!(error = %e, "console write failed");
        }
    }
}
