//! Content classification for decoded artifact text.
//!
//! An artifact body is recognized, in order, as:
//! - carrying a trailing `LOGTYPE<code>` tag that picks the fallback line color,
//! - a rich-color line (`@#`-delimited pieces with optional `fg=<name>;` / `bg=<name>;` tags),
//! - a structured leveled log line (`[LEVEL] [tag] message`).
//!
//! Anything else is a plain line shown in the fallback color.

use std::sync::OnceLock;

use regex::Regex;

use crate::lexicon::{self, Color, DEFAULT_BACKGROUND, DEFAULT_FOREGROUND};
use crate::segment::ParsedSegment;

pub const TYPE_TAG_MARKER: &str = "LOGTYPE";
pub const COLOR_DELIMITER: &str = "@#";

const FOREGROUND_PREFIX: &str = "fg=";
const BACKGROUND_PREFIX: &str = "bg=";

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub enum TypeTag {
    #[default]
    Default,
    Success,
    Fatal,
    Special,
}

impl TypeTag {
    pub fn from_code(code: &str) -> Self {
        match code {
            "LOGTYPE02" => TypeTag::Success,
            "LOGTYPE-8" => TypeTag::Fatal,
            "LOGTYPE14" => TypeTag::Special,
            _ => TypeTag::Default,
        }
    }

    pub fn color(self) -> Color {
        match self {
            TypeTag::Success => Color::Green,
            TypeTag::Fatal => Color::DarkRed,
            TypeTag::Special => Color::Magenta,
            TypeTag::Default => DEFAULT_FOREGROUND,
        }
    }
}

/// Splits a trailing `LOGTYPE` tag off the text.
///
/// Text without the marker (or blank text) comes back untouched with [`TypeTag::Default`].
pub fn split_type_tag(text: &str) -> (&str, TypeTag) {
    if text.trim().is_empty() {
        return (text, TypeTag::Default);
    }
    match text.find(TYPE_TAG_MARKER) {
        Some(idx) => {
            let code = text[idx..].trim();
            (text[..idx].trim(), TypeTag::from_code(code))
        }
        None => (text, TypeTag::Default),
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum Channel {
    Foreground,
    Background,
}

/// Peels one leading `fg=<name>;` or `bg=<name>;` tag.
fn split_color_tag(piece: &str) -> Option<(Channel, &str, &str)> {
    let (channel, rest) = if let Some(rest) = piece.strip_prefix(FOREGROUND_PREFIX) {
        (Channel::Foreground, rest)
    } else if let Some(rest) = piece.strip_prefix(BACKGROUND_PREFIX) {
        (Channel::Background, rest)
    } else {
        return None;
    };
    let end = rest.find(';')?;
    Some((channel, &rest[..end], &rest[end + 1..]))
}

/// Parses the rich-color encoding into a bracketed run of segments.
///
/// Returns `None` when the body has no `@#` delimiter. Colors carry across pieces; each
/// piece is emitted with the colors in effect after its own tags.
pub fn parse_color_tags(body: &str) -> Option<Vec<ParsedSegment>> {
    let pieces: Vec<&str> = body.split(COLOR_DELIMITER).collect();
    if pieces.len() < 2 {
        return None;
    }

    let mut foreground = DEFAULT_FOREGROUND;
    let mut background = DEFAULT_BACKGROUND;
    let mut segments = Vec::with_capacity(pieces.len() + 2);
    segments.push(ParsedSegment::start_sentinel());

    for piece in pieces {
        let mut visible = piece;
        while let Some((channel, name, rest)) = split_color_tag(visible) {
            match channel {
                Channel::Foreground => foreground = lexicon::resolve(name, DEFAULT_FOREGROUND),
                Channel::Background => background = lexicon::resolve(name, DEFAULT_BACKGROUND),
            }
            visible = rest;
        }
        segments.push(ParsedSegment::new(visible, foreground, background));
    }

    segments.push(ParsedSegment::end_sentinel());
    Some(segments)
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "DEBUG" => Some(LogLevel::Debug),
            "INFO" => Some(LogLevel::Info),
            "WARN" => Some(LogLevel::Warn),
            "ERROR" => Some(LogLevel::Error),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }

    pub fn color(self) -> Color {
        match self {
            LogLevel::Debug => Color::Gray,
            LogLevel::Info => Color::Green,
            LogLevel::Warn => Color::DarkYellow,
            LogLevel::Error => Color::Red,
        }
    }

    pub fn message_color(self) -> Color {
        match self {
            LogLevel::Error => Color::Red,
            _ => Color::White,
        }
    }
}

pub const TAG_COLOR: Color = Color::Yellow;

/// A `[LEVEL] [tag] message` line.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct StructuredLine {
    pub level: LogLevel,
    pub tag: String,
    pub message: String,
}

impl StructuredLine {
    pub fn segments(&self) -> Vec<ParsedSegment> {
        vec![
            ParsedSegment::start_sentinel(),
            ParsedSegment::new(
                format!("[{}] ", self.level.as_str()),
                self.level.color(),
                DEFAULT_BACKGROUND,
            ),
            ParsedSegment::new(format!("{} ", self.tag), TAG_COLOR, DEFAULT_BACKGROUND),
            ParsedSegment::new(
                self.message.clone(),
                self.level.message_color(),
                DEFAULT_BACKGROUND,
            )
            .ending(),
        ]
    }
}

fn structured_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\[(DEBUG|INFO|WARN|ERROR)\] (\[.*?\]) (.*)").expect("static pattern")
    })
}

/// Matches the structured leveled-log grammar.
///
/// The message is whatever follows the body's second `]`, not the regex capture, so
/// embedded line breaks survive. A bracketed prefix shifts the cut accordingly.
pub fn match_structured(body: &str) -> Option<StructuredLine> {
    let captures = structured_pattern().captures(body)?;
    let level = LogLevel::parse(captures.get(1)?.as_str())?;
    let tag = captures.get(2)?.as_str().to_string();

    let mut parts = body.splitn(3, ']');
    let message = match (parts.next(), parts.next(), parts.next()) {
        (Some(_), Some(_), Some(rest)) => rest.strip_prefix(' ').unwrap_or(rest).to_string(),
        _ => captures.get(3).map(|m| m.as_str()).unwrap_or_default().to_string(),
    };

    Some(StructuredLine {
        level,
        tag,
        message,
    })
}

/// Everything the classifier learned about one artifact.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Classification {
    /// Text with any trailing type tag removed.
    pub body: String,
    pub type_tag: TypeTag,
    pub rich: Option<Vec<ParsedSegment>>,
    pub structured: Option<StructuredLine>,
}

impl Classification {
    /// Color for plain display when no richer encoding applies.
    pub fn fallback_color(&self) -> Color {
        self.type_tag.color()
    }

    pub fn is_plain(&self) -> bool {
        self.rich.is_none() && self.structured.is_none()
    }

    pub fn plain_text(&self) -> Option<&str> {
        let trimmed = self.body.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }
}

pub fn classify(text: &str) -> Classification {
    let (body, type_tag) = split_type_tag(text);
    Classification {
        body: body.to_string(),
        type_tag,
        rich: parse_color_tags(body),
        structured: match_structured(body),
    }
}
