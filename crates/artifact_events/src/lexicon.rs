use std::fmt;
use std::str::FromStr;

/// Sixteen-color console palette used by the supervised server's color tags.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Color {
    Black,
    DarkBlue,
    DarkGreen,
    DarkCyan,
    DarkRed,
    DarkMagenta,
    DarkYellow,
    Gray,
    DarkGray,
    Blue,
    Green,
    Cyan,
    Red,
    Magenta,
    Yellow,
    White,
}

pub const DEFAULT_FOREGROUND: Color = Color::Cyan;
pub const DEFAULT_BACKGROUND: Color = Color::Black;

const PALETTE: [(Color, &str); 16] = [
    (Color::Black, "Black"),
    (Color::DarkBlue, "DarkBlue"),
    (Color::DarkGreen, "DarkGreen"),
    (Color::DarkCyan, "DarkCyan"),
    (Color::DarkRed, "DarkRed"),
    (Color::DarkMagenta, "DarkMagenta"),
    (Color::DarkYellow, "DarkYellow"),
    (Color::Gray, "Gray"),
    (Color::DarkGray, "DarkGray"),
    (Color::Blue, "Blue"),
    (Color::Green, "Green"),
    (Color::Cyan, "Cyan"),
    (Color::Red, "Red"),
    (Color::Magenta, "Magenta"),
    (Color::Yellow, "Yellow"),
    (Color::White, "White"),
];

#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
#[error("unknown color `{0}`")]
pub struct UnknownColor(pub String);

impl Color {
    pub fn name(self) -> &'static str {
        PALETTE[self.index()].1
    }

    /// Palette position, matching the console color numbering.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        PALETTE.get(index).map(|(color, _)| *color)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Color {
    type Err = UnknownColor;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let name = raw.trim();
        if let Some((color, _)) = PALETTE.iter().find(|(_, known)| *known == name) {
            return Ok(*color);
        }
        if !name.is_empty() && name.chars().all(|ch| ch.is_ascii_digit()) {
            if let Some(color) = name.parse::<usize>().ok().and_then(Color::from_index) {
                return Ok(color);
            }
        }
        Err(UnknownColor(raw.to_string()))
    }
}

/// Resolves a color tag name, falling back to `default` for anything unrecognized.
pub fn resolve(name: &str, default: Color) -> Color {
    name.parse().unwrap_or(default)
}
