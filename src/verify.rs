//! Checks run against a formatting result.
//!
//! Every check either passes or produces a [`Failure`]; nothing is retried or downgraded.

use miette::Diagnostic;
use serde_json::Value;
use thiserror::Error;

use crate::engine::{EngineError, Formatter};
use crate::eol::{consistent_end_of_line, visualize_end_of_line, LineEnding, BOM};
use crate::invoke::{format, FormatResult};
use crate::options::OptionSet;
use crate::snapshot::SnapshotMismatch;

#[derive(Debug, Error, Diagnostic)]
pub enum Failure {
    #[error("output mixes line terminators:\n{diff}")]
    #[diagnostic(code(fmtspec::mixed_end_of_line))]
    MixedEndOfLine { diff: String },

    #[error("[{variant}] formatting was expected to fail but succeeded")]
    #[diagnostic(code(fmtspec::unexpected_success))]
    UnexpectedSuccess { variant: String },

    #[error("[{variant}] formatting failed: {source}")]
    #[diagnostic(code(fmtspec::unexpected_error))]
    UnexpectedError {
        variant: String,
        #[source]
        source: EngineError,
    },

    #[error("the primary result could not be computed: {source}")]
    #[diagnostic(code(fmtspec::primary_unavailable))]
    PrimaryUnavailable { source: EngineError },

    #[error("[{variant}] output differs from the expected output:\n{diff}")]
    #[diagnostic(code(fmtspec::output_mismatch))]
    OutputMismatch { variant: String, diff: String },

    #[error("formatting the output again changed it:\n{diff}")]
    #[diagnostic(code(fmtspec::not_idempotent))]
    NotIdempotent { diff: String },

    #[error("fixture is listed as unstable but now reaches a fixed point")]
    #[diagnostic(
        code(fmtspec::unstable_converged),
        help("remove the fixture from the unstable list")
    )]
    UnstableConverged,

    #[error("formatting changed the structural tree:\n{diff}")]
    #[diagnostic(code(fmtspec::ast_changed))]
    AstChanged { diff: String },

    #[error("fixture is listed as structurally unstable but its tree is now preserved")]
    #[diagnostic(
        code(fmtspec::ast_unstable_converged),
        help("remove the fixture from the structurally unstable list")
    )]
    AstUnstableConverged,

    #[error("input with {eol} line endings formatted differently:\n{diff}")]
    #[diagnostic(code(fmtspec::end_of_line_probe))]
    EndOfLineProbe { eol: &'static str, diff: String },

    #[error("input with a byte order mark formatted differently:\n{diff}")]
    #[diagnostic(code(fmtspec::bom_probe))]
    BomProbe { diff: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Snapshot(#[from] SnapshotMismatch),
}

/// Unified diff of two texts, `None` when they are equal
pub fn diff(expected: &str, actual: &str) -> Option<String> {
    (expected != actual).then(|| {
        similar::udiff::unified_diff(
            similar::Algorithm::Patience,
            expected,
            actual,
            3,
            Some(("expected", "actual")),
        )
    })
}

/// The output must use a single kind of line terminator throughout
pub fn check_end_of_line_consistency(result: &FormatResult) -> Result<(), Failure> {
    let expected = visualize_end_of_line(&consistent_end_of_line(&result.output_with_cursor));
    match diff(&expected, &result.eol_visualized_output) {
        Some(diff) => Err(Failure::MixedEndOfLine { diff }),
        None => Ok(()),
    }
}

/// Compare against a literal output or against the primary variant's output
pub fn check_expected_output(
    result: &FormatResult,
    expected: &str,
    variant: &str,
) -> Result<(), Failure> {
    match diff(&visualize_end_of_line(expected), &result.eol_visualized_output) {
        Some(diff) => Err(Failure::OutputMismatch {
            variant: variant.to_owned(),
            diff,
        }),
        None => Ok(()),
    }
}

/// Whether substituting line terminators says anything for this fixture
pub fn should_skip_end_of_line_probe(code: &str, options: &OptionSet) -> bool {
    code.contains('\r') || options.requires_pragma() || options.has_reversed_range()
}

/// Checks that format the fixture again, only run under deep verification
pub struct DeepChecks<'a> {
    pub engine: &'a dyn Formatter,
    /// The fixture text, placeholders included
    pub code: &'a str,
    /// The options the fixture was formatted with, before placeholders were decoded
    pub options: &'a OptionSet,
    pub result: &'a FormatResult,
}

impl DeepChecks<'_> {
    fn format(&self, text: &str) -> Result<FormatResult, Failure> {
        format(self.engine, text, self.options).map_err(|source| Failure::UnexpectedError {
            variant: crate::variant::label(self.options.parser).to_owned(),
            source,
        })
    }

    fn parse(&self, text: &str) -> Result<Value, Failure> {
        self.engine
            .parse(text, self.options)
            .map_err(|source| Failure::UnexpectedError {
                variant: crate::variant::label(self.options.parser).to_owned(),
                source,
            })
    }

    /// Formatting the output again must not change it, unless the fixture is known not to
    /// converge, in which case it must still fail to.
    ///
    /// Only whole-file runs are checked: a fixture with a cursor or a range formats text that is
    /// not the fixture itself.
    pub fn idempotence(&self, unstable: bool) -> Result<(), Failure> {
        if !(self.result.changed || unstable) || self.result.input != self.code {
            return Ok(());
        }
        let second = self.format(&self.result.output)?;
        let difference = diff(
            &self.result.eol_visualized_output,
            &second.eol_visualized_output,
        );
        match (difference, unstable) {
            (Some(diff), false) => Err(Failure::NotIdempotent { diff }),
            (None, true) => Err(Failure::UnstableConverged),
            _ => Ok(()),
        }
    }

    /// The tree parsed from the output must equal the tree parsed from the input
    pub fn structure(&self, ast_unstable: bool) -> Result<(), Failure> {
        // Some parsers skip empty files altogether
        let blank = self
            .code
            .trim_matches(|c: char| c.is_whitespace() || c == BOM)
            .is_empty();
        if !self.result.changed || blank {
            return Ok(());
        }
        let original = self.parse(&self.result.input)?;
        let formatted = self.parse(&self.result.output)?;
        match (original == formatted, ast_unstable) {
            (false, false) => Err(Failure::AstChanged {
                diff: diff(&pretty_tree(&original), &pretty_tree(&formatted))
                    .unwrap_or_default(),
            }),
            (true, true) => Err(Failure::AstUnstableConverged),
            _ => Ok(()),
        }
    }

    /// The fixture with its `\n`s swapped for `\r\n` or `\r` must format the same way, up to the
    /// terminators themselves when the engine is told to keep them.
    pub fn end_of_line_probe(&self) -> Result<(), Failure> {
        if should_skip_end_of_line_probe(self.code, &self.result.options) {
            return Ok(());
        }
        for eol in LineEnding::PROBES {
            let probed = self.format(&self.code.replace('\n', eol.as_str()))?;
            let expected = if self.options.detects_end_of_line() {
                visualize_end_of_line(&self.result.output_with_cursor.replace('\n', eol.as_str()))
            } else {
                self.result.eol_visualized_output.clone()
            };
            if let Some(diff) = diff(&expected, &probed.eol_visualized_output) {
                return Err(Failure::EndOfLineProbe {
                    eol: eol.option_name(),
                    diff,
                });
            }
        }
        Ok(())
    }

    /// A leading byte order mark must survive formatting untouched
    pub fn bom_probe(&self) -> Result<(), Failure> {
        if self.code.starts_with(BOM) {
            return Ok(());
        }
        let probed = self.format(&format!("{BOM}{}", self.code))?;
        let expected = format!("{BOM}{}", self.result.eol_visualized_output);
        match diff(&expected, &probed.eol_visualized_output) {
            Some(diff) => Err(Failure::BomProbe { diff }),
            None => Ok(()),
        }
    }
}

fn pretty_tree(tree: &Value) -> String {
    serde_json::to_string_pretty(tree).unwrap_or_else(|_| tree.to_string())
}
