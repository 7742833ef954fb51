#![allow(dead_code)]

use std::path::{Path, PathBuf};

use fmtspec::eol::{LineEnding, BOM};
use fmtspec::variant::Language;
use fmtspec::{EngineError, Formatted, Formatter, GrammarVariant, OptionSet};
use serde_json::Value;

/// A tiny statement formatter standing in for a real engine.
///
/// Statements end at `;`. Each one is printed on its own line as its whitespace separated tokens
/// joined by single spaces, followed by `;` unless `semi` is `false`. Any token containing `!!`
/// is a syntax error, and tokens starting with `@` are only understood by some parsers.
pub struct ToyEngine;

const UNDECORATED: &[GrammarVariant] = &[
    GrammarVariant::Flow,
    GrammarVariant::Espree,
    GrammarVariant::Meriyah,
    GrammarVariant::Acorn,
];

fn parser(options: &OptionSet) -> Result<GrammarVariant, EngineError> {
    if let Some(parser) = options.parser {
        return Ok(parser);
    }
    options
        .filepath
        .as_deref()
        .and_then(Path::extension)
        .and_then(|ext| ext.to_str())
        .and_then(Language::from_extension)
        .map(GrammarVariant::infer)
        .ok_or_else(|| EngineError::new("No parser and no file path specified, couldn't infer a parser."))
}

fn statements(text: &str, parser: GrammarVariant) -> Result<Vec<Vec<&str>>, EngineError> {
    let mut statements = Vec::new();
    for statement in text.strip_prefix(BOM).unwrap_or(text).split(';') {
        let tokens: Vec<&str> = statement.split_whitespace().collect();
        if tokens.is_empty() {
            continue;
        }
        for token in &tokens {
            if token.contains("!!") {
                return Err(EngineError::new("SyntaxError: Unexpected token `!!`"));
            }
            if token.starts_with('@') && UNDECORATED.contains(&parser) {
                return Err(EngineError::new(format!(
                    "SyntaxError: Decorators are not supported by {parser}"
                )));
            }
        }
        statements.push(tokens);
    }
    Ok(statements)
}

fn line_ending(text: &str, options: &OptionSet) -> &'static str {
    match options.end_of_line() {
        Some("auto") => LineEnding::guess(text).as_str(),
        Some("crlf") => "\r\n",
        Some("cr") => "\r",
        _ => "\n",
    }
}

/// Characters the formatter never adds, drops or reorders
fn is_content(c: char) -> bool {
    !c.is_whitespace() && c != ';'
}

/// Where the cursor lands in `output` when it sat at character `offset` in `input`
fn map_cursor(input: &str, offset: usize, output: &str) -> usize {
    let before = input
        .chars()
        .take(offset)
        .filter(|&c| is_content(c))
        .count();
    if before == 0 {
        return 0;
    }
    output
        .chars()
        .enumerate()
        .filter(|&(_, c)| is_content(c))
        .nth(before - 1)
        .map_or(output.chars().count(), |(at, _)| at + 1)
}

impl Formatter for ToyEngine {
    fn format_with_cursor(
        &self,
        text: &str,
        options: &OptionSet,
    ) -> Result<Formatted, EngineError> {
        let parser = parser(options)?;
        let semi = options.get("semi") != Some(&Value::Bool(false));
        let eol = line_ending(text, options);

        let mut formatted = String::new();
        if text.starts_with(BOM) {
            formatted.push(BOM);
        }
        for tokens in statements(text, parser)? {
            formatted.push_str(&tokens.join(" "));
            if semi {
                formatted.push(';');
            }
            formatted.push_str(eol);
        }

        let cursor_offset = options
            .cursor_offset
            .map(|offset| map_cursor(text, offset, &formatted));
        Ok(Formatted {
            formatted,
            cursor_offset,
        })
    }

    fn parse(&self, text: &str, options: &OptionSet) -> Result<Value, EngineError> {
        let parser = parser(options)?;
        Ok(statements(text, parser)?
            .into_iter()
            .map(|tokens| tokens.into_iter().map(Value::from).collect::<Value>())
            .collect())
    }
}

/// Write a fixture directory below `root`: its spec file and fixture files
pub fn fixture_dir(root: &Path, relative: &str, spec: &str, files: &[(&str, &str)]) -> PathBuf {
    let dir = root.join(relative);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("format.spec.json"), spec).unwrap();
    for (name, code) in files {
        std::fs::write(dir.join(name), code).unwrap();
    }
    dir
}
