//! Terminal output for command results.

use console::{Style, Term};

/// How a status line is styled.
#[derive(Clone, Copy)]
enum Tone {
    Plain,
    Success,
    Error,
    Banner,
}

impl Tone {
    fn style(self) -> Style {
        match self {
            Self::Plain => Style::new(),
            Self::Success => Style::new().green(),
            Self::Error => Style::new().red(),
            Self::Banner => Style::new().cyan().bold(),
        }
    }
}

/// Writes status lines to stderr and command data to stdout.
///
/// Styling is dropped automatically when the stream is not a terminal.
pub(crate) struct Output {
    status: Term,
    data: Term,
}

impl Output {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            status: Term::stderr(),
            data: Term::stdout(),
        }
    }

    fn status(&self, tone: Tone, msg: &str) {
        let _ = self
            .status
            .write_line(&tone.style().apply_to(msg).to_string());
    }

    pub(crate) fn info(&self, msg: &str) {
        self.status(Tone::Plain, msg);
    }

    pub(crate) fn success(&self, msg: &str) {
        self.status(Tone::Success, msg);
    }

    pub(crate) fn error(&self, msg: &str) {
        self.status(Tone::Error, msg);
    }

    /// Startup banner (cyan bold).
    pub(crate) fn highlight(&self, msg: &str) {
        self.status(Tone::Banner, msg);
    }

    /// A line of command output, for piping.
    pub(crate) fn data(&self, line: &str) {
        let _ = self.data.write_line(line);
    }
}
