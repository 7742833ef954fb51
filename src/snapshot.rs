//! Canonical records of formatting results, and the stores that keep baselines of them.

use std::any::Any;
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use fs_err as fs;
use miette::Diagnostic;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::eol::{visualize_end_of_line, LineEnding};
use crate::invoke::FormatResult;
use crate::options::OptionSet;
use crate::variant::GrammarVariant;
use crate::verify::diff;

const RECORD_WIDTH: usize = 80;

/// Widths past this get no ruler line; "unlimited" widths are spelled as huge numbers
const MAX_RULER_WIDTH: u64 = 1000;

/// Option keys that never appear in a record's option block
const UNRECORDED_OPTIONS: &[&str] = &[
    "parser",
    "filepath",
    "cursorOffset",
    "rangeStart",
    "rangeEnd",
];

#[derive(Debug, Error, Diagnostic)]
#[error("snapshot `{key}` does not match its baseline:\n{diff}")]
#[diagnostic(
    code(fmtspec::snapshot_mismatch),
    help("if the new output is intended, update the stored baseline")
)]
pub struct SnapshotMismatch {
    pub key: String,
    pub diff: String,
}

/// Keeps one baseline per key: the first value stored under a key becomes its baseline, later
/// values must match it.
pub trait SnapshotStore {
    fn assert_matches(&self, key: &str, record: &str) -> Result<(), SnapshotMismatch>;

    /// Baseline for the message of an expected formatting failure
    fn assert_error_matches(&self, key: &str, message: &str) -> Result<(), SnapshotMismatch> {
        self.assert_matches(key, message)
    }
}

/// Baselines held in memory for the lifetime of the store
#[derive(Debug, Default)]
pub struct MemoryStore {
    baselines: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn with_baselines<K, V>(baselines: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        MemoryStore {
            baselines: Mutex::new(
                baselines
                    .into_iter()
                    .map(|(key, value)| (key.into(), value.into()))
                    .collect(),
            ),
        }
    }

    /// Every baseline recorded so far
    pub fn baselines(&self) -> BTreeMap<String, String> {
        self.baselines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.baselines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }
}

impl SnapshotStore for MemoryStore {
    fn assert_matches(&self, key: &str, record: &str) -> Result<(), SnapshotMismatch> {
        let mut baselines = self.baselines.lock().unwrap_or_else(PoisonError::into_inner);
        match baselines.get(key) {
            Some(baseline) => match diff(baseline, record) {
                Some(diff) => Err(SnapshotMismatch {
                    key: key.to_owned(),
                    diff,
                }),
                None => Ok(()),
            },
            None => {
                baselines.insert(key.to_owned(), record.to_owned());
                Ok(())
            }
        }
    }
}

/// Baselines kept as insta snapshot files in one directory.
///
/// Accepting new baselines follows insta's usual `INSTA_UPDATE` handling. A rejected snapshot is
/// reported as a [`SnapshotMismatch`] against the stored file rather than as insta's panic.
#[derive(Debug, Clone)]
pub struct InstaStore {
    snapshot_dir: PathBuf,
}

impl InstaStore {
    pub fn new(snapshot_dir: impl Into<PathBuf>) -> Self {
        InstaStore {
            snapshot_dir: snapshot_dir.into(),
        }
    }

    /// The body of the stored snapshot file for `name`, without its metadata header
    fn baseline(&self, name: &str) -> Option<String> {
        let stored = fs::read_to_string(self.snapshot_dir.join(format!("{name}.snap"))).ok()?;
        let (_, body) = stored.strip_prefix("---\n")?.split_once("\n---\n")?;
        Some(body.trim_end().to_owned())
    }
}

impl SnapshotStore for InstaStore {
    fn assert_matches(&self, key: &str, record: &str) -> Result<(), SnapshotMismatch> {
        let name = snapshot_name(key);
        let mut settings = insta::Settings::clone_current();
        settings.set_snapshot_path(&self.snapshot_dir);
        settings.set_prepend_module_to_snapshot(false);
        settings.set_omit_expression(true);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            settings.bind(|| insta::assert_snapshot!(name.as_str(), record))
        }));

        outcome.map_err(|payload| {
            let diff = match self.baseline(&name) {
                Some(baseline) => diff(&baseline, record.trim_end()),
                None => None,
            };
            SnapshotMismatch {
                key: key.to_owned(),
                diff: diff.unwrap_or_else(|| panic_message(payload.as_ref())),
            }
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else {
        "snapshot assertion failed".to_owned()
    }
}

/// A key reduced to characters that are safe in a file name
fn snapshot_name(key: &str) -> String {
    let mut name = String::with_capacity(key.len());
    for c in key.chars() {
        if c.is_ascii_alphanumeric() || c == '-' || c == '.' {
            name.push(c);
        } else if !name.ends_with('_') {
            name.push('_');
        }
    }
    name.trim_matches('_').to_owned()
}

/// Centre `title` in a line of `=`
fn separator(title: &str) -> String {
    let left = RECORD_WIDTH.saturating_sub(title.len()) / 2;
    let right = RECORD_WIDTH.saturating_sub(title.len() + left);
    format!("{}{title}{}", "=".repeat(left), "=".repeat(right))
}

/// The canonical record of a formatting result.
///
/// `parsers` are the parsers the run requested and `format_options` the options the fixture was
/// formatted with, before placeholders were decoded.
pub fn create_snapshot(
    result: &FormatResult,
    parsers: &[Option<GrammarVariant>],
    format_options: &OptionSet,
) -> String {
    let mut options = match serde_json::to_value(format_options) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    };
    options.retain(|key, _| !UNRECORDED_OPTIONS.contains(&key.as_str()));
    if format_options.detects_end_of_line() {
        let guessed = LineEnding::guess(&result.input).option_name();
        options.insert("endOfLine".to_owned(), guessed.into());
    }

    let mut lines = vec![separator("options")];
    lines.push(format!(
        "parsers: [{}]",
        parsers
            .iter()
            .flatten()
            .map(|parser| format!("\"{parser}\""))
            .collect::<Vec<_>>()
            .join(", ")
    ));
    // `Map` iterates in key order
    for (key, value) in &options {
        lines.push(format!("{key}: {value}"));
    }
    if let Some(width) = format_options.print_width().filter(|&width| width <= MAX_RULER_WIDTH) {
        lines.push(format!("{}| printWidth", " ".repeat(width as usize)));
    }

    let input = result.options.placeholders().encode(&result.input);
    lines.push(separator("input"));
    lines.push(visualize_end_of_line(&input));
    lines.push(separator("output"));
    lines.push(result.eol_visualized_output.clone());
    lines.push(separator(""));
    lines.join("\n")
}
