use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use crossterm::queue;
use crossterm::style::{self, Print, ResetColor, SetBackgroundColor, SetForegroundColor};
use tracing::debug;

use crate::lexicon::{Color, DEFAULT_BACKGROUND, DEFAULT_FOREGROUND};

/// One colored run of a logical console line.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ParsedSegment {
    pub text: String,
    pub foreground: Color,
    pub background: Color,
    pub stream_start: bool,
    pub stream_end: bool,
}

impl ParsedSegment {
    pub fn new(text: impl Into<String>, foreground: Color, background: Color) -> Self {
        Self {
            text: text.into(),
            foreground,
            background,
            stream_start: false,
            stream_end: false,
        }
    }

    /// Empty write that opens a logical line.
    pub fn start_sentinel() -> Self {
        Self {
            stream_start: true,
            ..Self::new(String::new(), DEFAULT_FOREGROUND, DEFAULT_BACKGROUND)
        }
    }

    /// Empty write that terminates a logical line.
    pub fn end_sentinel() -> Self {
        Self {
            stream_end: true,
            ..Self::new(String::new(), DEFAULT_FOREGROUND, DEFAULT_BACKGROUND)
        }
    }

    pub fn ending(mut self) -> Self {
        self.stream_end = true;
        self
    }
}

/// Operator-facing console capability.
pub trait ConsoleSink: Send {
    fn write_part(
        &mut self,
        text: &str,
        background: Color,
        foreground: Color,
        line_start: bool,
        line_end: bool,
    );

    fn write_line(&mut self, text: &str, color: Color);
}

pub fn render_segments(sink: &mut dyn ConsoleSink, segments: &[ParsedSegment]) {
    for segment in segments {
        sink.write_part(
            &segment.text,
            segment.background,
            segment.foreground,
            segment.stream_start,
            segment.stream_end,
        );
    }
}

/// ANSI terminal sink. Writes are best-effort: a broken console never stops ingestion.
pub struct AnsiConsole<W: Write + Send> {
    out: W,
}

impl AnsiConsole<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> AnsiConsole<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, text: &str, background: Color, foreground: Color) -> io::Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        queue!(
            self.out,
            SetForegroundColor(terminal_color(foreground)),
            SetBackgroundColor(terminal_color(background)),
            Print(text)
        )
    }

    fn finish_line(&mut self) -> io::Result<()> {
        queue!(self.out, ResetColor, Print('\n'))?;
        self.out.flush()
    }
}

fn terminal_color(color: Color) -> style::Color {
    match color {
        Color::Black => style::Color::Black,
        Color::DarkBlue => style::Color::DarkBlue,
        Color::DarkGreen => style::Color::DarkGreen,
        Color::DarkCyan => style::Color::DarkCyan,
        Color::DarkRed => style::Color::DarkRed,
        Color::DarkMagenta => style::Color::DarkMagenta,
        Color::DarkYellow => style::Color::DarkYellow,
        Color::Gray => style::Color::Grey,
        Color::DarkGray => style::Color::DarkGrey,
        Color::Blue => style::Color::Blue,
        Color::Green => style::Color::Green,
        Color::Cyan => style::Color::Cyan,
        Color::Red => style::Color::Red,
        Color::Magenta => style::Color::Magenta,
        Color::Yellow => style::Color::Yellow,
        Color::White => style::Color::White,
    }
}

impl<W: Write + Send> ConsoleSink for AnsiConsole<W> {
    fn write_part(
        &mut self,
        text: &str,
        background: Color,
        foreground: Color,
        _line_start: bool,
        line_end: bool,
    ) {
        let mut result = self.emit(text, background, foreground);
        if result.is_ok() && line_end {
            result = self.finish_line();
        }
        if let Err(err) = result {
            debug!("console write failed: {err}");
        }
    }

    fn write_line(&mut self, text: &str, color: Color) {
        let result = self
            .emit(text, DEFAULT_BACKGROUND, color)
            .and_then(|()| self.finish_line());
        if let Err(err) = result {
            debug!("console write failed: {err}");
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ConsoleWrite {
    Part(ParsedSegment),
    Line { text: String, color: Color },
}

/// Console that keeps every write in memory. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemoryConsole {
    writes: Arc<Mutex<Vec<ConsoleWrite>>>,
}

impl MemoryConsole {
    pub fn new() -> Self {
        Self::default()
    }

    fn buffer(&self) -> std::sync::MutexGuard<'_, Vec<ConsoleWrite>> {
        self.writes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn writes(&self) -> Vec<ConsoleWrite> {
        self.buffer().clone()
    }

    /// Writes folded into the logical lines an operator would see.
    pub fn lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        let mut pending: Option<String> = None;
        for write in self.buffer().iter() {
            match write {
                ConsoleWrite::Part(segment) => {
                    let line = pending.get_or_insert_with(String::new);
                    line.push_str(&segment.text);
                    if segment.stream_end {
                        lines.extend(pending.take());
                    }
                }
                ConsoleWrite::Line { text, .. } => lines.push(text.clone()),
            }
        }
        lines.extend(pending);
        lines
    }

    pub fn clear(&self) {
        self.buffer().clear();
    }
}

impl ConsoleSink for MemoryConsole {
    fn write_part(
        &mut self,
        text: &str,
        background: Color,
        foreground: Color,
        line_start: bool,
        line_end: bool,
    ) {
        self.buffer().push(ConsoleWrite::Part(ParsedSegment {
            text: text.to_string(),
            foreground,
            background,
            stream_start: line_start,
            stream_end: line_end,
        }));
    }

    fn write_line(&mut self, text: &str, color: Color) {
        self.buffer().push(ConsoleWrite::Line {
            text: text.to_string(),
            color,
        });
    }
}
