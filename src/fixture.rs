//! Fixture discovery.

use std::io;
use std::path::{Path, PathBuf};

use fs_err as fs;
use serde::Deserialize;
use tracing::debug;

/// Name of the per-directory file declaring how its fixtures run
pub const SPEC_FILE_NAME: &str = "format.spec.json";

const SNAPSHOT_EXTENSION: &str = "snap";

/// Files editors and tools leave behind in fixture directories
const EDITOR_ARTIFACTS: &[&str] = &["debug.log"];

/// One unit of input text, read from disk or declared inline as a snippet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fixture {
    pub name: String,
    /// `None` for snippets
    pub path: Option<PathBuf>,
    pub code: String,
    /// Literal expected output, only ever declared by snippets
    pub output: Option<String>,
}

/// An inline fixture declared in a spec file
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Snippet {
    Code(String),
    Declared {
        #[serde(default)]
        name: Option<String>,
        code: String,
        #[serde(default)]
        output: Option<String>,
    },
}

impl Snippet {
    pub fn into_fixture(self, index: usize) -> Fixture {
        let (name, code, output) = match self {
            Snippet::Code(code) => (None, code, None),
            Snippet::Declared { name, code, output } => (name, code, output),
        };
        Fixture {
            name: format!("snippet: {}", name.unwrap_or_else(|| format!("#{index}"))),
            path: None,
            code,
            output,
        }
    }
}

/// Whether a directory entry with this file name holds a fixture
pub fn is_fixture_name(name: &str) -> bool {
    !(name.starts_with('.')
        || name == SPEC_FILE_NAME
        || EDITOR_ARTIFACTS.contains(&name)
        || Path::new(name).extension().is_some_and(|ext| ext == SNAPSHOT_EXTENSION))
}

/// Read every fixture file directly inside `dir`, ordered by file name
pub fn read_fixture_files(dir: &Path) -> io::Result<Vec<Fixture>> {
    let mut fixtures = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if !is_fixture_name(&name) {
            debug!(%name, "Skipping non-fixture file");
            continue;
        }
        let path = entry.path();
        let code = fs::read_to_string(&path)?;
        fixtures.push(Fixture {
            name,
            path: Some(path),
            code,
            output: None,
        });
    }
    fixtures.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(fixtures)
}

/// File fixtures from `dir` followed by `snippets` in declaration order.
///
/// File fixtures are ordered by file name rather than by directory listing order, so every
/// platform runs (and numbers the snapshots of) a directory the same way.
pub fn load_fixtures(dir: &Path, snippets: Vec<Snippet>) -> io::Result<Vec<Fixture>> {
    let mut fixtures = read_fixture_files(dir)?;
    fixtures.extend(
        snippets
            .into_iter()
            .enumerate()
            .map(|(index, snippet)| snippet.into_fixture(index)),
    );
    Ok(fixtures)
}
