//! Option sets handed to the formatting engine.
//!
//! Most keys are opaque to the harness and pass straight through to the engine. The few it does
//! read are typed fields: the parser, the error expectation, and the offsets produced from
//! placeholders.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::placeholder::Placeholders;
use crate::variant::GrammarVariant;

/// Print width applied when a run does not choose one
pub const DEFAULT_PRINT_WIDTH: u64 = 80;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parser: Option<GrammarVariant>,
    /// Which fixtures are expected to make the engine fail. Never sent to the engine.
    #[serde(default, skip_serializing)]
    pub errors: Option<ErrorExpectation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor_offset: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range_start: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range_end: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filepath: Option<PathBuf>,
    #[serde(flatten)]
    pub rest: BTreeMap<String, Value>,
}

impl OptionSet {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.rest.get(key)
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.rest.insert(key.into(), value.into());
        self
    }

    pub fn with_parser(&self, parser: Option<GrammarVariant>) -> Self {
        OptionSet {
            parser,
            ..self.clone()
        }
    }

    pub fn with_errors(mut self, errors: ErrorExpectation) -> Self {
        self.errors = Some(errors);
        self
    }

    /// Copy in the offsets of every marker that was present; absent markers keep their value
    pub fn with_placeholders(&self, placeholders: Placeholders) -> Self {
        let mut options = self.clone();
        if placeholders.cursor_offset.is_some() {
            options.cursor_offset = placeholders.cursor_offset;
        }
        if placeholders.range_start.is_some() {
            options.range_start = placeholders.range_start;
        }
        if placeholders.range_end.is_some() {
            options.range_end = placeholders.range_end;
        }
        options
    }

    pub fn placeholders(&self) -> Placeholders {
        Placeholders {
            cursor_offset: self.cursor_offset,
            range_start: self.range_start,
            range_end: self.range_end,
        }
    }

    pub fn end_of_line(&self) -> Option<&str> {
        self.get("endOfLine").and_then(Value::as_str)
    }

    /// `endOfLine: "auto"`, where the engine keeps whatever terminator the input uses
    pub fn detects_end_of_line(&self) -> bool {
        self.end_of_line() == Some("auto")
    }

    pub fn requires_pragma(&self) -> bool {
        self.get("requirePragma") == Some(&Value::Bool(true))
    }

    pub fn print_width(&self) -> Option<u64> {
        self.get("printWidth").and_then(Value::as_u64)
    }

    /// A selection that ends before it starts (or is empty)
    pub fn has_reversed_range(&self) -> bool {
        matches!((self.range_start, self.range_end), (Some(start), Some(end)) if start >= end)
    }

    /// Whether formatting `fixture` with these options is declared to fail
    pub fn should_throw_on_format(&self, fixture: &str) -> bool {
        self.errors
            .as_ref()
            .is_some_and(|errors| errors.expects_failure(fixture, self.parser))
    }

    /// Options as they appear in a test title: compact JSON without `errors`, empty when unset
    pub fn title_fragment(&self) -> String {
        match serde_json::to_string(self) {
            Ok(json) if json != "{}" => json,
            _ => String::new(),
        }
    }
}

/// Which formatting attempts are declared to fail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorExpectation {
    /// `errors: true` fails everything, `errors: false` nothing
    All(bool),
    PerVariant(BTreeMap<GrammarVariant, VariantErrors>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VariantErrors {
    All(bool),
    Fixtures(Vec<String>),
}

impl ErrorExpectation {
    pub fn expects_failure(&self, fixture: &str, parser: Option<GrammarVariant>) -> bool {
        match self {
            ErrorExpectation::All(all) => *all,
            ErrorExpectation::PerVariant(variants) => {
                match parser.and_then(|parser| variants.get(&parser)) {
                    Some(VariantErrors::All(all)) => *all,
                    Some(VariantErrors::Fixtures(names)) => names.iter().any(|name| name == fixture),
                    None => false,
                }
            }
        }
    }
}
