//! Grammar variants: the front-ends a formatting engine can parse a fixture with.
//!
//! Variants are a closed set. Everything the harness needs to know about one (which languages it
//! reads, which companions it drags into a test matrix) lives in the capability methods below, so
//! adding a variant is a compile error everywhere a decision has to be made about it.

use std::fmt;
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Source language of a fixture, judged by its file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    JavaScript,
    TypeScript,
    Css,
    Json,
    GraphQl,
    Markdown,
    Yaml,
    Html,
    Vue,
    Handlebars,
}

impl Language {
    pub fn from_extension(extension: &str) -> Option<Self> {
        use Language::*;
        let language = match extension {
            "js" | "jsx" | "mjs" | "cjs" => JavaScript,
            "ts" | "tsx" | "mts" | "cts" => TypeScript,
            "css" | "less" | "scss" | "pcss" => Css,
            "json" | "json5" => Json,
            "graphql" | "gql" => GraphQl,
            "md" | "markdown" | "mdx" => Markdown,
            "yaml" | "yml" => Yaml,
            "html" | "htm" => Html,
            "vue" => Vue,
            "hbs" | "handlebars" => Handlebars,
            _ => return None,
        };
        Some(language)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown parser `{0}`")]
pub struct UnknownVariant(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GrammarVariant {
    Babel,
    BabelFlow,
    BabelTs,
    /// Babel with its tree reshaped to ESTree
    BabelEstree,
    Flow,
    Typescript,
    Espree,
    Meriyah,
    Acorn,
    Css,
    Less,
    Scss,
    Json,
    Json5,
    JsonStringify,
    Graphql,
    Markdown,
    Mdx,
    Yaml,
    Html,
    Vue,
    Angular,
    Lwc,
    Glimmer,
}

impl GrammarVariant {
    pub const ALL: &'static [GrammarVariant] = &[
        GrammarVariant::Babel,
        GrammarVariant::BabelFlow,
        GrammarVariant::BabelTs,
        GrammarVariant::BabelEstree,
        GrammarVariant::Flow,
        GrammarVariant::Typescript,
        GrammarVariant::Espree,
        GrammarVariant::Meriyah,
        GrammarVariant::Acorn,
        GrammarVariant::Css,
        GrammarVariant::Less,
        GrammarVariant::Scss,
        GrammarVariant::Json,
        GrammarVariant::Json5,
        GrammarVariant::JsonStringify,
        GrammarVariant::Graphql,
        GrammarVariant::Markdown,
        GrammarVariant::Mdx,
        GrammarVariant::Yaml,
        GrammarVariant::Html,
        GrammarVariant::Vue,
        GrammarVariant::Angular,
        GrammarVariant::Lwc,
        GrammarVariant::Glimmer,
    ];

    /// The name used in option sets, spec files and test titles
    pub fn name(self) -> &'static str {
        use GrammarVariant::*;
        match self {
            Babel => "babel",
            BabelFlow => "babel-flow",
            BabelTs => "babel-ts",
            BabelEstree => "__babel_estree",
            Flow => "flow",
            Typescript => "typescript",
            Espree => "espree",
            Meriyah => "meriyah",
            Acorn => "acorn",
            Css => "css",
            Less => "less",
            Scss => "scss",
            Json => "json",
            Json5 => "json5",
            JsonStringify => "json-stringify",
            Graphql => "graphql",
            Markdown => "markdown",
            Mdx => "mdx",
            Yaml => "yaml",
            Html => "html",
            Vue => "vue",
            Angular => "angular",
            Lwc => "lwc",
            Glimmer => "glimmer",
        }
    }

    /// Whether this front-end can read source written in `language`
    pub fn accepts(self, language: Language) -> bool {
        use GrammarVariant::*;
        match self {
            Typescript | BabelTs => {
                matches!(language, Language::TypeScript | Language::JavaScript)
            }
            Babel | BabelFlow | BabelEstree | Flow | Espree | Meriyah | Acorn => {
                language == Language::JavaScript
            }
            Css | Less | Scss => language == Language::Css,
            Json | Json5 | JsonStringify => language == Language::Json,
            Graphql => language == Language::GraphQl,
            Markdown | Mdx => language == Language::Markdown,
            Yaml => language == Language::Yaml,
            Html | Angular | Lwc => language == Language::Html,
            Vue => language == Language::Vue,
            Glimmer => language == Language::Handlebars,
        }
    }

    /// The untyped front-end that must print typed sources identically
    pub fn untyped_counterpart(self) -> Option<Self> {
        match self {
            GrammarVariant::Typescript => Some(GrammarVariant::BabelTs),
            _ => None,
        }
    }

    /// Alternate general-purpose front-ends, in the order they join a matrix
    pub fn alternate_front_ends(self) -> &'static [Self] {
        match self {
            GrammarVariant::Babel => &[
                GrammarVariant::Espree,
                GrammarVariant::Meriyah,
                GrammarVariant::Acorn,
            ],
            _ => &[],
        }
    }

    /// The variant producing the same tree in a different shape
    pub fn tree_shape_counterpart(self) -> Option<Self> {
        match self {
            GrammarVariant::Babel => Some(GrammarVariant::BabelEstree),
            _ => None,
        }
    }

    /// Inverse of [`GrammarVariant::accepts`] for engines that infer a parser from a file name
    pub fn infer(language: Language) -> Self {
        use GrammarVariant::*;
        match language {
            Language::JavaScript => Babel,
            Language::TypeScript => Typescript,
            Language::Css => Css,
            Language::Json => Json,
            Language::GraphQl => Graphql,
            Language::Markdown => Markdown,
            Language::Yaml => Yaml,
            Language::Html => Html,
            Language::Vue => Vue,
            Language::Handlebars => Glimmer,
        }
    }
}

/// Title label for an optional variant; `None` means the engine infers one
pub fn label(variant: Option<GrammarVariant>) -> &'static str {
    variant.map_or("inferred", GrammarVariant::name)
}

impl fmt::Display for GrammarVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for GrammarVariant {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GrammarVariant::ALL
            .iter()
            .copied()
            .find(|variant| variant.name() == s)
            .ok_or_else(|| UnknownVariant(s.to_owned()))
    }
}

impl Serialize for GrammarVariant {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for GrammarVariant {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(D::Error::custom)
    }
}
