//! Line terminator helpers.
//!
//! Outputs are compared in a form where every `\r\n` and `\r` is spelled out, so a diff between
//! two outputs that only disagree on line endings is still legible.

use std::sync::LazyLock;

use regex::{NoExpand, Regex};

pub const BOM: char = '\u{feff}';

static NON_LF_TERMINATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\r\n?").expect("valid line terminator pattern"));
static ANY_TERMINATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\r\n?|\n").expect("valid line terminator pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEnding {
    Lf,
    Crlf,
    Cr,
}

impl LineEnding {
    /// The terminators a fixture's `\n`s are swapped for when probing line ending handling
    pub const PROBES: [LineEnding; 2] = [LineEnding::Crlf, LineEnding::Cr];

    pub fn as_str(self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::Crlf => "\r\n",
            LineEnding::Cr => "\r",
        }
    }

    /// Option value naming this terminator (`endOfLine`)
    pub fn option_name(self) -> &'static str {
        match self {
            LineEnding::Lf => "lf",
            LineEnding::Crlf => "crlf",
            LineEnding::Cr => "cr",
        }
    }

    /// The first terminator used in `text`, `\n` if there is none
    pub fn guess(text: &str) -> Self {
        match ANY_TERMINATOR.find(text).map(|m| m.as_str()) {
            Some("\r\n") => LineEnding::Crlf,
            Some("\r") => LineEnding::Cr,
            _ => LineEnding::Lf,
        }
    }
}

/// Spell out `\r\n` as `<CRLF>` and `\r` as `<CR>`, keeping a real newline after each
pub fn visualize_end_of_line(text: &str) -> String {
    NON_LF_TERMINATOR
        .replace_all(text, |caps: &regex::Captures| {
            if &caps[0] == "\r" {
                "<CR>\n"
            } else {
                "<CRLF>\n"
            }
        })
        .into_owned()
}

/// Rewrite every terminator in `text` to the first one it uses
pub fn consistent_end_of_line(text: &str) -> String {
    match ANY_TERMINATOR.find(text) {
        Some(first) => ANY_TERMINATOR
            .replace_all(text, NoExpand(first.as_str()))
            .into_owned(),
        None => text.to_owned(),
    }
}
