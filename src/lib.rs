//! A differential test harness for source code formatters.
//!
//! Point it at a directory of fixtures and a list of parsers, and every fixture is formatted under
//! each parser (plus the companion parsers that must agree with it), then checked for agreement
//! between parsers, idempotence, preservation of the structural tree, and line ending and byte
//! order mark handling. Passing results are recorded as canonical snapshots so later releases can
//! be compared against them.
//!
//! The formatting engine itself sits behind [`Formatter`]; snapshot baselines sit behind
//! [`SnapshotStore`].

pub mod engine;
pub mod eol;
pub mod fixture;
pub mod invoke;
pub mod matrix;
pub mod options;
pub mod placeholder;
pub mod registry;
pub mod runner;
pub mod snapshot;
pub mod spec_file;
pub mod variant;
pub mod verify;

pub use engine::{CommandEngine, EngineBuild, EngineError, Formatted, Formatter};
pub use fixture::{Fixture, Snippet};
pub use invoke::{format, FormatResult};
pub use matrix::{DirCategory, TestMatrix};
pub use options::{ErrorExpectation, OptionSet};
pub use registry::Registry;
pub use runner::{Harness, Report, SetupError, Settings};
pub use snapshot::{InstaStore, MemoryStore, SnapshotStore};
pub use spec_file::RunSpec;
pub use variant::GrammarVariant;
pub use verify::Failure;
