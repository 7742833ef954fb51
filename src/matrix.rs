//! Test matrix construction.
//!
//! A fixture directory declares the parsers it wants; the matrix adds the companion variants that
//! must agree with them, and expands every fixture into one entry per variant.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use crate::fixture::Fixture;
use crate::options::{ErrorExpectation, OptionSet, DEFAULT_PRINT_WIDTH};
use crate::registry::Registry;
use crate::runner::SetupError;
use crate::variant::{label, GrammarVariant, Language};

/// Fixtures that exercise formatting failures
pub const ERRORS_DIR: &str = "misc/errors";
/// Fixtures run without a parser, so the engine has to pick one from the file name
pub const PARSER_INFERENCE_DIR: &str = "misc/parser-inference";
/// Fixtures only the typed front-end can read
pub const TYPESCRIPT_ONLY_DIR: &str = "misc/typescript-only";
const GENERAL_PURPOSE_DIR: &str = "js";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirCategory {
    Errors,
    ParserInference,
    TypescriptOnly,
    GeneralPurpose,
    Other,
}

impl DirCategory {
    /// Classify a directory by its path relative to the fixture root
    pub fn classify(relative_dir: &Path) -> Self {
        if relative_dir.starts_with(ERRORS_DIR) {
            DirCategory::Errors
        } else if relative_dir.starts_with(PARSER_INFERENCE_DIR) {
            DirCategory::ParserInference
        } else if relative_dir.starts_with(TYPESCRIPT_ONLY_DIR) {
            DirCategory::TypescriptOnly
        } else if relative_dir.starts_with(GENERAL_PURPOSE_DIR) {
            DirCategory::GeneralPurpose
        } else {
            DirCategory::Other
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryRole {
    /// Checked against the primary result computed once per fixture
    Primary,
    /// Formats again under its own variant and compares against the primary result
    CrossCheck,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestEntry {
    pub title: String,
    pub variant: Option<GrammarVariant>,
    pub role: EntryRole,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TestMatrix {
    pub category: DirCategory,
    /// The requested parsers; a single `None` when the engine infers one
    pub parsers: Vec<Option<GrammarVariant>>,
    /// Requested parsers followed by the companions appended for them
    pub variants: Vec<Option<GrammarVariant>>,
    pub options: OptionSet,
    relative_dir: PathBuf,
}

impl TestMatrix {
    pub fn build(
        relative_dir: &Path,
        requested: &[GrammarVariant],
        mut options: OptionSet,
        registry: &Registry,
    ) -> Self {
        let category = DirCategory::classify(relative_dir);

        if category == DirCategory::Errors && options.errors.is_none() {
            options.errors = Some(ErrorExpectation::All(true));
        }

        let parsers: Vec<Option<GrammarVariant>> = if category == DirCategory::ParserInference {
            vec![None]
        } else {
            requested.iter().copied().map(Some).collect()
        };
        let explicit: Vec<GrammarVariant> = parsers.iter().flatten().copied().collect();

        let mut variants = parsers.clone();
        if category != DirCategory::Errors {
            if category != DirCategory::TypescriptOnly {
                for counterpart in explicit.iter().filter_map(|v| v.untyped_counterpart()) {
                    append(&mut variants, counterpart);
                }
            }
            if category == DirCategory::GeneralPurpose {
                for &alternate in explicit.iter().flat_map(|v| v.alternate_front_ends()) {
                    if !registry.is_disabled(alternate, relative_dir) {
                        append(&mut variants, alternate);
                    }
                }
            }
            for counterpart in explicit.iter().filter_map(|v| v.tree_shape_counterpart()) {
                append(&mut variants, counterpart);
            }
        }

        TestMatrix {
            category,
            parsers,
            variants,
            options,
            relative_dir: relative_dir.to_owned(),
        }
    }

    /// The variant whose result every other entry is compared against
    pub fn primary(&self) -> Option<GrammarVariant> {
        self.parsers.first().copied().flatten()
    }

    pub fn relative_dir(&self) -> &Path {
        &self.relative_dir
    }

    /// Path of a file fixture relative to the fixture root; snippets have none
    pub fn relative_fixture(&self, fixture: &Fixture) -> Option<PathBuf> {
        fixture
            .path
            .as_ref()
            .map(|_| self.relative_dir.join(&fixture.name))
    }

    /// The options the primary variant formats `fixture` with
    pub fn options_for(&self, fixture: &Fixture) -> OptionSet {
        let mut options = self.options.clone();
        options
            .rest
            .entry("printWidth".to_owned())
            .or_insert_with(|| DEFAULT_PRINT_WIDTH.into());
        options.filepath = fixture.path.clone();
        options.parser = self.primary();
        options
    }

    /// Expand one fixture into its entries. When the primary variant is expected to fail, every
    /// entry, the primary one included, checks its own variant.
    pub fn entries(
        &self,
        relative_fixture: Option<&Path>,
        main_throws: bool,
        registry: &Registry,
    ) -> Vec<TestEntry> {
        let primary = self.primary();
        self.variants
            .iter()
            .copied()
            .filter(|&variant| match (variant, relative_fixture) {
                (Some(variant), Some(path)) => !registry.is_disabled(variant, path),
                _ => true,
            })
            .map(|variant| {
                if main_throws || variant != primary {
                    TestEntry {
                        title: format!("[{}] format", label(variant)),
                        variant,
                        role: EntryRole::CrossCheck,
                    }
                } else {
                    TestEntry {
                        title: "format".to_owned(),
                        variant,
                        role: EntryRole::Primary,
                    }
                }
            })
            .collect()
    }
}

fn append(variants: &mut Vec<Option<GrammarVariant>>, variant: GrammarVariant) {
    if !variants.contains(&Some(variant)) {
        variants.push(Some(variant));
    }
}

/// Make sure a directory declares its parsers and that they can read every fixture in it
pub fn check_parsers(
    dir: &Path,
    category: DirCategory,
    fixtures: &[Fixture],
    requested: &[GrammarVariant],
) -> Result<(), SetupError> {
    if category == DirCategory::ParserInference {
        return Ok(());
    }
    if requested.is_empty() {
        return Err(SetupError::NoParsers {
            dir: dir.to_owned(),
        });
    }
    for fixture in fixtures {
        let Some(language) = fixture
            .path
            .as_deref()
            .and_then(Path::extension)
            .and_then(OsStr::to_str)
            .and_then(Language::from_extension)
        else {
            continue;
        };
        if !requested.iter().any(|variant| variant.accepts(language)) {
            return Err(SetupError::UnsupportedFixture {
                fixture: fixture.name.clone(),
                dir: dir.to_owned(),
                parsers: requested
                    .iter()
                    .map(|variant| variant.name())
                    .collect::<Vec<_>>()
                    .join(", "),
            });
        }
    }
    Ok(())
}
