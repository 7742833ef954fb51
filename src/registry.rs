//! Known exceptions to the default verification rules.
//!
//! A [`Registry`] is assembled once, before any fixture runs, and only read afterwards. Paths are
//! relative to the fixture root and always use `/` separators, e.g. `js/comments/jsx.js`.

use std::collections::{HashMap, HashSet};
use std::path::{Component, Path};

use serde_json::Value;

use crate::options::OptionSet;
use crate::variant::GrammarVariant;

/// Answers whether a known exception applies under a given option set
pub type OptionPredicate = fn(&OptionSet) -> bool;

fn always(_: &OptionSet) -> bool {
    true
}

fn no_semi(options: &OptionSet) -> bool {
    options.get("semi") == Some(&Value::Bool(false))
}

fn prose_wrap_always(options: &OptionSet) -> bool {
    options.get("proseWrap").and_then(Value::as_str) == Some("always")
}

/// Fixtures whose second formatting pass still changes the output
const UNSTABLE_FIXTURES: &[(&str, OptionPredicate)] = &[
    ("js/class-comment/misc.js", always),
    ("js/comments/dangling_array.js", no_semi),
    ("js/comments/jsx.js", no_semi),
    ("js/comments/return-statement.js", always),
    ("js/comments/tagged-template-literal.js", always),
    ("markdown/spec/example-234.md", always),
    ("markdown/spec/example-235.md", always),
    ("html/multiparser/js/script-tag-escaping.html", always),
    ("js/multiparser-markdown/codeblock.js", prose_wrap_always),
    ("js/no-semi/comments.js", no_semi),
    ("flow/no-semi/comments.js", no_semi),
    ("typescript/prettier-ignore/mapped-types.ts", always),
    ("js/comments/html-like/comment.js", always),
    ("js/for/continue-and-break-comment-without-blocks.js", always),
    ("typescript/satisfies-operators/comments-unstable.ts", always),
];

/// Directories and fixtures only the main general-purpose front-end can handle
const BABEL_ONLY: &[&str] = &["js/comments-closure-typecast"];

/// Decorator auto accessors parse as ordinary class properties under meriyah
const MERIYAH_MISPARSES: &[&str] = &[
    "js/decorator-auto-accessors/basic.js",
    "js/decorator-auto-accessors/computed.js",
    "js/decorator-auto-accessors/private.js",
    "js/decorator-auto-accessors/static-computed.js",
    "js/decorator-auto-accessors/static-private.js",
    "js/decorator-auto-accessors/static.js",
    "js/decorator-auto-accessors/with-semicolon-1.js",
    "js/decorator-auto-accessors/with-semicolon-2.js",
    "js/babel-plugins/decorator-auto-accessors.js",
];

#[derive(Debug, Clone, Default)]
pub struct Registry {
    unstable: HashMap<String, OptionPredicate>,
    unstable_ast: HashMap<String, OptionPredicate>,
    disabled: HashMap<GrammarVariant, HashSet<String>>,
}

impl Registry {
    /// A registry with no exceptions at all
    pub fn empty() -> Self {
        Registry::default()
    }

    /// The exceptions known for the upstream fixture tree
    pub fn builtin() -> Self {
        let mut registry = Registry::empty();
        for &(path, predicate) in UNSTABLE_FIXTURES {
            registry = registry.unstable(path, predicate);
        }
        for &path in BABEL_ONLY {
            registry = registry
                .disable(GrammarVariant::Espree, path)
                .disable(GrammarVariant::Meriyah, path)
                .disable(GrammarVariant::Acorn, path);
        }
        for &path in MERIYAH_MISPARSES {
            registry = registry.disable(GrammarVariant::Meriyah, path);
        }
        registry
    }

    /// Mark a fixture as not reaching a fixed point when `predicate` holds
    pub fn unstable(mut self, path: &str, predicate: OptionPredicate) -> Self {
        self.unstable.insert(normalize(Path::new(path)), predicate);
        self
    }

    /// Mark a fixture whose structural tree legitimately changes when `predicate` holds
    pub fn unstable_ast(mut self, path: &str, predicate: OptionPredicate) -> Self {
        self.unstable_ast.insert(normalize(Path::new(path)), predicate);
        self
    }

    /// Skip `variant` for a directory or a single fixture
    pub fn disable(mut self, variant: GrammarVariant, path: &str) -> Self {
        self.disabled
            .entry(variant)
            .or_default()
            .insert(normalize(Path::new(path)));
        self
    }

    pub fn is_unstable(&self, fixture: &Path, options: &OptionSet) -> bool {
        lookup(&self.unstable, fixture, options)
    }

    pub fn is_ast_unstable(&self, fixture: &Path, options: &OptionSet) -> bool {
        lookup(&self.unstable_ast, fixture, options)
    }

    pub fn is_disabled(&self, variant: GrammarVariant, path: &Path) -> bool {
        self.disabled
            .get(&variant)
            .is_some_and(|paths| paths.contains(&normalize(path)))
    }
}

fn lookup(table: &HashMap<String, OptionPredicate>, fixture: &Path, options: &OptionSet) -> bool {
    table
        .get(&normalize(fixture))
        .is_some_and(|predicate| predicate(options))
}

/// `./a/b` and `a/./b` both become `a/b`
fn normalize(path: &Path) -> String {
    path.components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
