//! Line-oriented output destinations

use std::io::{self, Write};

/// Where report lines go
pub trait OutputSink {
    fn write_line(&mut self, line: &str) -> io::Result<()>;

    /// Whether diagnostic rows (such as up-to-date packages) are wanted
    fn is_verbose(&self) -> bool;

    /// Whether lines may carry ANSI colours
    fn use_colors(&self) -> bool {
        false
    }
}

/// Sink writing to any `io::Write`, usually stdout
pub struct ConsoleSink<W: Write> {
    writer: W,
    verbose: bool,
    colors: bool,
}

impl ConsoleSink<io::Stdout> {
    /// Stdout sink, coloured when stdout is a terminal
    pub fn stdout(verbose: bool) -> Self {
        Self::new(io::stdout(), verbose).with_colors(should_use_colors())
    }
}

impl<W: Write> ConsoleSink<W> {
    pub fn new(writer: W, verbose: bool) -> Self {
        Self {
            writer,
            verbose,
            colors: false,
        }
    }

    pub fn with_colors(mut self, colors: bool) -> Self {
        self.colors = colors;
        self
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> OutputSink for ConsoleSink<W> {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        writeln!(self.writer, "{}", line)
    }

    fn is_verbose(&self) -> bool {
        self.verbose
    }

    fn use_colors(&self) -> bool {
        self.colors
    }
}

/// Check if colors should be enabled.
pub fn should_use_colors() -> bool {
    // https://no-color.org/
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    console::Term::stdout().is_term()
}
