//! Plain (non-interactive) output: command lines streamed to stdout with
//! search matches highlighted

use std::io::{self, Write};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::error::{CommandFailure, Result};
use crate::search::{validate_pattern, SearchIndex};

/// Streams output lines, highlighting matches of an optional pattern.
///
/// Each line is searched on its own as it arrives, so a match never spans
/// a line break: `^`/`$` anchor at the line ends and `\n` matches nothing.
/// The interactive UI searches the whole buffer instead.
pub struct LinePrinter<W: WriteColor> {
    out: W,
    pattern: Option<String>,
    index: SearchIndex,
    match_count: usize,
}

impl LinePrinter<StandardStream> {
    /// Printer on stdout. Fails if `pattern` is not a valid expression.
    pub fn stdout(color: bool, pattern: Option<String>) -> Result<Self> {
        let choice = if color {
            ColorChoice::Auto
        } else {
            ColorChoice::Never
        };
        Self::new(StandardStream::stdout(choice), pattern)
    }
}

impl<W: WriteColor> LinePrinter<W> {
    pub fn new(out: W, pattern: Option<String>) -> Result<Self> {
        let pattern = pattern.filter(|p| !p.is_empty());
        if let Some(ref p) = pattern {
            validate_pattern(p)?;
        }
        Ok(Self {
            out,
            pattern,
            index: SearchIndex::new(),
            match_count: 0,
        })
    }

    /// Total matches printed so far
    pub fn match_count(&self) -> usize {
        self.match_count
    }

    /// Print one output line with its matches highlighted
    pub fn print_line(&mut self, line: &str) -> io::Result<()> {
        let Some(ref pattern) = self.pattern else {
            return writeln!(self.out, "{}", line);
        };

        // Already validated in `new`
        let matches = self.index.search(line, pattern).unwrap_or(&[]);
        self.match_count += matches.len();

        let mut last = 0;
        for m in matches {
            // Text before match
            if m.start > last {
                write!(self.out, "{}", &line[last..m.start])?;
            }

            // The match itself (highlighted)
            self.out
                .set_color(ColorSpec::new().set_fg(Some(Color::Black)).set_bg(Some(Color::Yellow)))?;
            write!(self.out, "{}", &line[m.start..m.end])?;
            self.out.reset()?;
            last = m.end;
        }

        // Text after the last match
        if last < line.len() {
            write!(self.out, "{}", &line[last..])?;
        }
        writeln!(self.out)
    }

    /// Print the failure line the way the interactive pane shows it
    pub fn print_failure(&mut self, failure: &CommandFailure) -> io::Result<()> {
        self.out
            .set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true))?;
        write!(self.out, "{}", failure)?;
        self.out.reset()?;
        writeln!(self.out)
    }

    /// Print the `x/y matches` style summary line
    pub fn print_summary(&mut self) -> io::Result<()> {
        if self.pattern.is_none() {
            return Ok(());
        }
        self.out.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)))?;
        write!(self.out, "{} matches", self.match_count)?;
        self.out.reset()?;
        writeln!(self.out)
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
