//! Running fixture directories through every check.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::io;
use std::path::{Path, PathBuf};

use miette::{Diagnostic, GraphicalReportHandler, GraphicalTheme};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::engine::{EngineBuild, EngineError, Formatter};
use crate::fixture::{load_fixtures, Fixture};
use crate::invoke::{format, FormatResult};
use crate::matrix::{check_parsers, EntryRole, TestEntry, TestMatrix};
use crate::options::OptionSet;
use crate::registry::Registry;
use crate::snapshot::{create_snapshot, SnapshotStore};
use crate::spec_file::{read_spec_file, RunSpec};
use crate::variant::{label, GrammarVariant};
use crate::verify::{check_end_of_line_consistency, check_expected_output, DeepChecks, Failure};

/// Problems that stop a whole fixture directory before any of its fixtures run
#[derive(Debug, Error, Diagnostic)]
pub enum SetupError {
    #[error(transparent)]
    #[diagnostic(code(fmtspec::io))]
    Io(#[from] io::Error),

    #[error("invalid spec file {}", path.display())]
    #[diagnostic(code(fmtspec::spec_file))]
    SpecFile {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("No parsers were specified for {}", dir.display())]
    #[diagnostic(code(fmtspec::no_parsers))]
    NoParsers { dir: PathBuf },

    #[error("fixture `{fixture}` in {} cannot be parsed by any of [{parsers}]", dir.display())]
    #[diagnostic(
        code(fmtspec::unsupported_fixture),
        help("move the fixture to a directory for its language, or add a parser that reads it")
    )]
    UnsupportedFixture {
        fixture: String,
        dir: PathBuf,
        parsers: String,
    },
}

/// Switches that apply to a whole run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// The directory fixture paths are made relative to
    pub format_root: PathBuf,
    /// Run idempotence, structure and line ending checks, and record snapshots
    pub full_test: bool,
    /// Require every directory to declare the parsers its fixtures need
    pub check_parsers: bool,
    pub engine_build: EngineBuild,
}

impl Settings {
    pub fn new(format_root: impl Into<PathBuf>) -> Self {
        Settings {
            format_root: format_root.into(),
            full_test: false,
            check_parsers: false,
            engine_build: EngineBuild::Local,
        }
    }

    /// Settings from `FULL_TEST`, `CHECK_TEST_PARSERS` and `TEST_STANDALONE`
    pub fn from_env(format_root: impl Into<PathBuf>) -> Self {
        Settings::from_vars(format_root, |key| std::env::var(key).ok())
    }

    pub fn from_vars(
        format_root: impl Into<PathBuf>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let enabled = |key: &str| lookup(key).is_some_and(|value| is_truthy(&value));
        Settings {
            format_root: format_root.into(),
            full_test: enabled("FULL_TEST"),
            check_parsers: enabled("CHECK_TEST_PARSERS"),
            engine_build: if enabled("TEST_STANDALONE") {
                EngineBuild::Standalone
            } else {
                EngineBuild::Local
            },
        }
    }
}

fn is_truthy(value: &str) -> bool {
    let value = value.trim();
    !(value.is_empty()
        || value == "0"
        || ["false", "no", "off"]
            .iter()
            .any(|falsey| value.eq_ignore_ascii_case(falsey)))
}

#[derive(Debug)]
pub struct EntryOutcome {
    /// Fixture name, plus the run's options when it has any
    pub fixture: String,
    pub title: String,
    pub variant: Option<GrammarVariant>,
    pub result: Result<(), Failure>,
}

#[derive(Debug, Default)]
pub struct Report {
    pub outcomes: Vec<EntryOutcome>,
}

impl Report {
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn failures(&self) -> impl Iterator<Item = (&EntryOutcome, &Failure)> {
        self.outcomes
            .iter()
            .filter_map(|outcome| outcome.result.as_ref().err().map(|err| (outcome, err)))
    }

    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }

    /// Find the outcome of one entry by its titles
    pub fn outcome(&self, fixture: &str, title: &str) -> Option<&EntryOutcome> {
        self.outcomes
            .iter()
            .find(|outcome| outcome.fixture == fixture && outcome.title == title)
    }

    pub fn extend(&mut self, other: Report) {
        self.outcomes.extend(other.outcomes);
    }

    /// Every failure, rendered for a terminal
    pub fn render_failures(&self) -> String {
        let handler = GraphicalReportHandler::new_themed(GraphicalTheme::unicode_nocolor());
        let mut rendered = String::new();
        for (outcome, failure) in self.failures() {
            let _ = writeln!(rendered, "── {} › {}", outcome.fixture, outcome.title);
            if handler.render_report(&mut rendered, failure).is_err() {
                let _ = writeln!(rendered, "{failure}");
            }
        }
        rendered
    }

    /// Panic with every failure when any entry failed
    #[track_caller]
    pub fn assert_success(&self) {
        if !self.is_success() {
            panic!(
                "{} of {} entries failed\n{}",
                self.failures().count(),
                self.len(),
                self.render_failures()
            );
        }
    }
}

/// The primary variant's result for one fixture, shared by all of its entries
enum MainResult {
    Formatted(FormatResult),
    ExpectedFailure,
    Failed(EngineError),
}

/// Hands out snapshot keys, numbering repeats of the same key
#[derive(Default)]
struct SnapshotKeys {
    seen: HashMap<String, usize>,
}

impl SnapshotKeys {
    fn next(&mut self, fixture: &str, title: &str) -> String {
        let key = format!("{fixture} › {title}");
        let count = self.seen.entry(key.clone()).or_default();
        *count += 1;
        if *count == 1 {
            key
        } else {
            format!("{key} #{count}")
        }
    }
}

/// A declared run whose setup succeeded
struct PreparedRun {
    relative_dir: PathBuf,
    matrix: TestMatrix,
    fixtures: Vec<Fixture>,
}

/// Everything one fixture's entries need to run
struct FixtureRun<'r> {
    matrix: &'r TestMatrix,
    fixture: &'r Fixture,
    relative_fixture: Option<PathBuf>,
    describe: String,
    format_options: OptionSet,
    main: MainResult,
}

pub struct Harness<'a> {
    engine: &'a dyn Formatter,
    snapshots: &'a dyn SnapshotStore,
    registry: &'a Registry,
    settings: Settings,
}

impl<'a> Harness<'a> {
    pub fn new(
        engine: &'a dyn Formatter,
        snapshots: &'a dyn SnapshotStore,
        registry: &'a Registry,
        settings: Settings,
    ) -> Self {
        Harness {
            engine,
            snapshots,
            registry,
            settings,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Run every run declared in the directory's spec file.
    ///
    /// Setup for all runs (fixture loading, parser declaration checks) completes before any
    /// fixture is formatted, so a setup error leaves no snapshots behind.
    pub fn run_dir(&self, dir: &Path) -> Result<Report, SetupError> {
        let prepared = read_spec_file(dir)?
            .into_iter()
            .map(|run| self.prepare(dir, run))
            .collect::<Result<Vec<_>, _>>()?;
        let mut keys = SnapshotKeys::default();
        let mut report = Report::default();
        for run in &prepared {
            report.extend(self.execute(run, &mut keys));
        }
        Ok(report)
    }

    /// Run a single declared run over a directory
    pub fn run_spec(&self, dir: &Path, run: RunSpec) -> Result<Report, SetupError> {
        let prepared = self.prepare(dir, run)?;
        Ok(self.execute(&prepared, &mut SnapshotKeys::default()))
    }

    fn relative_dir(&self, dir: &Path) -> PathBuf {
        dir.strip_prefix(&self.settings.format_root)
            .unwrap_or(dir)
            .to_owned()
    }

    fn prepare(&self, dir: &Path, run: RunSpec) -> Result<PreparedRun, SetupError> {
        let RunSpec {
            parsers,
            options,
            snippets,
        } = run;
        let relative_dir = self.relative_dir(dir);
        let matrix = TestMatrix::build(&relative_dir, &parsers, options, self.registry);
        let fixtures = load_fixtures(dir, snippets)?;
        if self.settings.check_parsers {
            check_parsers(dir, matrix.category, &fixtures, &parsers)?;
        }
        Ok(PreparedRun {
            relative_dir,
            matrix,
            fixtures,
        })
    }

    fn execute(&self, run: &PreparedRun, keys: &mut SnapshotKeys) -> Report {
        let PreparedRun {
            relative_dir,
            matrix,
            fixtures,
        } = run;
        info!(
            dir = %relative_dir.display(),
            category = ?matrix.category,
            variants = ?matrix.variants,
            fixtures = fixtures.len(),
            "Running format spec"
        );

        let title_options = matrix.options.title_fragment();
        let mut report = Report::default();
        for fixture in fixtures {
            let describe = if title_options.is_empty() {
                fixture.name.clone()
            } else {
                format!("{} - {title_options}", fixture.name)
            };
            let format_options = matrix.options_for(fixture);
            let main_throws = format_options.should_throw_on_format(&fixture.name);
            let main = if main_throws {
                MainResult::ExpectedFailure
            } else {
                match format(self.engine, &fixture.code, &format_options) {
                    Ok(result) => MainResult::Formatted(result),
                    Err(err) => {
                        warn!(fixture = %describe, %err, "Primary formatting failed");
                        MainResult::Failed(err)
                    }
                }
            };
            let fixture_run = FixtureRun {
                matrix,
                fixture,
                relative_fixture: matrix.relative_fixture(fixture),
                describe,
                format_options,
                main,
            };

            let entries =
                matrix.entries(fixture_run.relative_fixture.as_deref(), main_throws, self.registry);
            for entry in entries {
                let result = self.run_entry(&fixture_run, &entry, keys);
                debug!(
                    fixture = %fixture_run.describe,
                    entry = %entry.title,
                    passed = result.is_ok(),
                    "Entry finished"
                );
                report.outcomes.push(EntryOutcome {
                    fixture: fixture_run.describe.clone(),
                    title: entry.title,
                    variant: entry.variant,
                    result,
                });
            }
        }
        report
    }

    fn run_entry(
        &self,
        run: &FixtureRun,
        entry: &TestEntry,
        keys: &mut SnapshotKeys,
    ) -> Result<(), Failure> {
        if entry.role == EntryRole::CrossCheck {
            return self.cross_check(run, entry, keys);
        }
        match &run.main {
            MainResult::Formatted(result) => self.verify(
                run,
                entry,
                result,
                run.fixture.output.as_deref(),
                &run.format_options,
                keys,
            ),
            MainResult::Failed(err) => Err(Failure::UnexpectedError {
                variant: label(entry.variant).to_owned(),
                source: err.clone(),
            }),
            MainResult::ExpectedFailure => self.cross_check(run, entry, keys),
        }
    }

    /// Format again under the entry's own variant and compare with the primary result
    fn cross_check(
        &self,
        run: &FixtureRun,
        entry: &TestEntry,
        keys: &mut SnapshotKeys,
    ) -> Result<(), Failure> {
        let variant = label(entry.variant);
        let options = run.format_options.with_parser(entry.variant);

        if options.should_throw_on_format(&run.fixture.name) {
            return match format(self.engine, &run.fixture.code, &options) {
                Ok(_) => Err(Failure::UnexpectedSuccess {
                    variant: variant.to_owned(),
                }),
                Err(err) => self
                    .snapshots
                    .assert_error_matches(&keys.next(&run.describe, &entry.title), &err.message)
                    .map_err(Failure::from),
            };
        }

        let expected = match &run.main {
            MainResult::Formatted(main) => Some(main.output_with_cursor.as_str()),
            MainResult::ExpectedFailure => None,
            MainResult::Failed(err) => {
                return Err(Failure::PrimaryUnavailable {
                    source: err.clone(),
                })
            }
        };
        let result =
            format(self.engine, &run.fixture.code, &options).map_err(|source| {
                Failure::UnexpectedError {
                    variant: variant.to_owned(),
                    source,
                }
            })?;
        self.verify(run, entry, &result, expected, &options, keys)
    }

    fn verify(
        &self,
        run: &FixtureRun,
        entry: &TestEntry,
        result: &FormatResult,
        expected: Option<&str>,
        options: &OptionSet,
        keys: &mut SnapshotKeys,
    ) -> Result<(), Failure> {
        check_end_of_line_consistency(result)?;

        if let Some(expected) = expected {
            return check_expected_output(result, expected, label(entry.variant));
        }

        if !self.settings.full_test {
            return Ok(());
        }

        let deep = DeepChecks {
            engine: self.engine,
            code: &run.fixture.code,
            options,
            result,
        };
        let (unstable, ast_unstable) = match &run.relative_fixture {
            Some(path) => (
                self.registry.is_unstable(path, options),
                self.registry.is_ast_unstable(path, options),
            ),
            None => (false, false),
        };
        deep.idempotence(unstable)?;
        deep.structure(ast_unstable)?;
        deep.end_of_line_probe()?;
        deep.bom_probe()?;

        let record = create_snapshot(result, &run.matrix.parsers, options);
        self.snapshots
            .assert_matches(&keys.next(&run.describe, &entry.title), &record)?;
        Ok(())
    }
}
