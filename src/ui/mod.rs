//! Terminal output for rarc
//!
//! Every renderer is a pure function producing the lines to print; commands
//! write them to stdout. Styling goes through [`Painter`] so that colors can be
//! switched off for pipes and `--no-color`.

pub mod revision;
pub mod user;

pub use revision::{
    full_lines, latest_comments, summary_line, CommentView, RepositoryLabel, RevisionView,
};
pub use user::{object_lines, whoami_lines};

use chrono::Duration;
use crossterm::style::{Color, Stylize};

/// Width assumed when the terminal size is unknown
const DEFAULT_WIDTH: usize = 80;

/// Applies terminal styles, or nothing when color is disabled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Painter {
    color: bool,
}

impl Painter {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    /// A painter that never emits escape codes
    pub fn plain() -> Self {
        Self::new(false)
    }

    pub fn paint(&self, text: &str, color: Option<Color>, bold: bool) -> String {
        if !self.color {
            return text.to_string();
        }

        let mut styled = text.to_string().stylize();
        if let Some(color) = color {
            styled = styled.with(color);
        }
        if bold {
            styled = styled.bold();
        }
        styled.to_string()
    }

    /// Style for field labels such as "Author:"
    pub fn label(&self, text: &str) -> String {
        self.paint(text, Some(Color::DarkYellow), false)
    }

    pub fn bold(&self, text: &str) -> String {
        self.paint(text, None, true)
    }
}

/// Maps Phabricator's `color.ansi` names to terminal colors
pub fn ansi_color(name: &str) -> Option<Color> {
    match name {
        "black" => Some(Color::Black),
        "red" => Some(Color::DarkRed),
        "green" => Some(Color::DarkGreen),
        "yellow" | "orange" => Some(Color::DarkYellow),
        "blue" | "sky" => Some(Color::DarkBlue),
        "magenta" | "violet" | "pink" => Some(Color::DarkMagenta),
        "cyan" => Some(Color::DarkCyan),
        "white" => Some(Color::White),
        "grey" | "gray" => Some(Color::Grey),
        _ => None,
    }
}

/// Current terminal width in columns
pub fn terminal_width() -> usize {
    match crossterm::terminal::size() {
        Ok((cols, _)) if cols > 0 => cols as usize,
        _ => DEFAULT_WIDTH,
    }
}

/// Cuts `msg` to `width` characters, marking the cut with an ellipsis
pub fn truncate(msg: &str, width: usize) -> String {
    if msg.chars().count() <= width {
        return msg.to_string();
    }
    if width == 0 {
        return String::new();
    }

    let mut out: String = msg.chars().take(width - 1).collect();
    out.push('\u{2026}');
    out
}

/// Describes a duration in words, e.g. "3 hours" or "a month"
pub fn natural_delta(delta: Duration) -> String {
    let secs = delta.num_seconds().unsigned_abs();
    let days = secs / 86_400;

    fn unit(n: u64, one: &str, name: &str) -> String {
        if n == 1 {
            one.to_string()
        } else {
            format!("{n} {name}")
        }
    }

    match secs {
        0 => "a moment".to_string(),
        1..=59 => unit(secs, "a second", "seconds"),
        60..=3_599 => unit(secs / 60, "a minute", "minutes"),
        3_600..=86_399 => unit(secs / 3_600, "an hour", "hours"),
        _ if days < 30 => unit(days, "a day", "days"),
        _ if days < 365 => unit((days / 30).max(1), "a month", "months"),
        _ => unit(days / 365, "a year", "years"),
    }
}
