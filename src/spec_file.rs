//! The `format.spec.json` file declaring how a fixture directory runs.
//!
//! ```json
//! [
//!   { "parsers": ["babel", "flow", "typescript"] },
//!   { "parsers": ["babel"], "options": { "semi": false }, "snippets": ["a;"] }
//! ]
//! ```
//!
//! A single run may be written without the surrounding array.

use std::path::Path;

use fs_err as fs;
use serde::Deserialize;
use serde_json::Value;

use crate::fixture::{Snippet, SPEC_FILE_NAME};
use crate::options::OptionSet;
use crate::runner::SetupError;
use crate::variant::GrammarVariant;

/// One declared run: every fixture in the directory, under one option set, for these parsers
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunSpec {
    #[serde(default)]
    pub parsers: Vec<GrammarVariant>,
    #[serde(default)]
    pub options: OptionSet,
    #[serde(default)]
    pub snippets: Vec<Snippet>,
}

impl RunSpec {
    pub fn new(parsers: impl IntoIterator<Item = GrammarVariant>) -> Self {
        RunSpec {
            parsers: parsers.into_iter().collect(),
            ..RunSpec::default()
        }
    }

    pub fn options(mut self, options: OptionSet) -> Self {
        self.options = options;
        self
    }

    pub fn snippet(mut self, snippet: Snippet) -> Self {
        self.snippets.push(snippet);
        self
    }
}

/// Parse the contents of a spec file: one run, or an array of runs
pub fn parse_spec(source: &str) -> Result<Vec<RunSpec>, serde_json::Error> {
    match serde_json::from_str(source)? {
        Value::Array(runs) => runs.into_iter().map(serde_json::from_value).collect(),
        run => Ok(vec![serde_json::from_value(run)?]),
    }
}

/// Read the spec file of a fixture directory
pub fn read_spec_file(dir: &Path) -> Result<Vec<RunSpec>, SetupError> {
    let path = dir.join(SPEC_FILE_NAME);
    let source = fs::read_to_string(&path)?;
    parse_spec(&source).map_err(|source| SetupError::SpecFile { path, source })
}
