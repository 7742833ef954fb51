mod common;

use std::path::Path;

use common::ToyEngine;
use fixture_glob::fixture_dirs;
use fmtspec::{GrammarVariant, Harness, MemoryStore, OptionSet, Registry, Settings};
use serde_json::Value;

fn no_semi(options: &OptionSet) -> bool {
    options.get("semi") == Some(&Value::Bool(false))
}

fn registry() -> Registry {
    Registry::empty()
        .disable(GrammarVariant::Espree, "js/decorators")
        .disable(GrammarVariant::Meriyah, "js/decorators")
        .disable(GrammarVariant::Acorn, "js/decorators")
        .unstable("js/no-semi/multi.js", no_semi)
        .unstable_ast("js/no-semi/multi.js", no_semi)
}

// Every directory under tests/format, run the way the command line runs it with `--full
// --check-parsers`
#[fixture_dirs("tests/format/**/format.spec.json")]
#[test]
fn format_dir(dir: &Path) {
    let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("format");
    let settings = Settings {
        full_test: true,
        check_parsers: true,
        ..Settings::new(root)
    };
    let store = MemoryStore::default();
    let registry = registry();
    let report = Harness::new(&ToyEngine, &store, &registry, settings)
        .run_dir(dir)
        .unwrap();
    assert!(!report.is_empty(), "{} ran no entries", dir.display());
    report.assert_success();
}
