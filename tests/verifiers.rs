mod common;

use common::ToyEngine;
use fmtspec::eol::{consistent_end_of_line, visualize_end_of_line, LineEnding};
use fmtspec::snapshot::create_snapshot;
use fmtspec::verify::{
    check_end_of_line_consistency, check_expected_output, diff, should_skip_end_of_line_probe,
    DeepChecks,
};
use fmtspec::{
    format, EngineError, Failure, Formatted, Formatter, GrammarVariant, OptionSet,
};
use insta::assert_snapshot;
use serde_json::Value;

// Tests of the individual checks run against a formatting result

fn babel() -> OptionSet {
    OptionSet::default().with_parser(Some(GrammarVariant::Babel))
}

#[test]
fn line_ending_helpers() {
    assert_eq!(visualize_end_of_line("a\r\nb\rc\n"), "a<CRLF>\nb<CR>\nc\n");
    assert_eq!(consistent_end_of_line("a\r\nb\nc\rd"), "a\r\nb\r\nc\r\nd");
    assert_eq!(consistent_end_of_line("no terminators"), "no terminators");
    assert_eq!(LineEnding::guess("a\rb\r\n"), LineEnding::Cr);
    assert_eq!(LineEnding::guess("a"), LineEnding::Lf);
}

#[test]
fn format_moves_cursor() {
    let result = format(&ToyEngine, "a  =  1<|>;", &babel()).unwrap();
    assert_eq!(result.input, "a  =  1;");
    assert_eq!(result.options.cursor_offset, Some(7));
    assert_eq!(result.input_with_cursor, "a  =  1<|>;");
    assert_eq!(result.output, "a = 1;\n");
    assert_eq!(result.output_with_cursor, "a = 1<|>;\n");
    assert!(result.changed);
}

#[test]
fn format_moves_cursor_past_multibyte_text() {
    let result = format(&ToyEngine, "é  =  \"ü\"<|>;", &babel()).unwrap();
    assert_eq!(result.options.cursor_offset, Some(9));
    assert_eq!(result.output_with_cursor, "é = \"ü\"<|>;\n");
}

#[test]
fn format_unchanged() {
    let result = format(&ToyEngine, "a;\n", &babel()).unwrap();
    assert!(!result.changed);
    assert_eq!(result.eol_visualized_output, "a;\n");
}

#[test]
fn format_visualizes_line_endings() {
    let options = babel().with("endOfLine", "crlf");
    let result = format(&ToyEngine, "a;b;", &options).unwrap();
    assert_eq!(result.output, "a;\r\nb;\r\n");
    assert_eq!(result.eol_visualized_output, "a;<CRLF>\nb;<CRLF>\n");
}

#[test]
fn format_propagates_engine_errors() {
    let err = format(&ToyEngine, "a = !!;", &babel()).unwrap_err();
    assert_eq!(err, EngineError::new("SyntaxError: Unexpected token `!!`"));
}

/// Ends lines inconsistently, whatever it is given
struct MixedLineEndings;

impl Formatter for MixedLineEndings {
    fn format_with_cursor(&self, _: &str, _: &OptionSet) -> Result<Formatted, EngineError> {
        Ok(Formatted {
            formatted: "a;\r\nb;\n".to_owned(),
            cursor_offset: None,
        })
    }

    fn parse(&self, _: &str, _: &OptionSet) -> Result<Value, EngineError> {
        Ok(Value::Null)
    }
}

#[test]
fn mixed_line_endings() {
    let result = format(&MixedLineEndings, "a;b;", &babel()).unwrap();
    let failure = check_end_of_line_consistency(&result).unwrap_err();
    let Failure::MixedEndOfLine { diff } = failure else {
        panic!("unexpected failure {failure:?}");
    };
    assert!(diff.contains("+b;\n"), "{diff}");

    let consistent = format(&ToyEngine, "a;b;", &babel()).unwrap();
    assert!(check_end_of_line_consistency(&consistent).is_ok());
}

#[test]
fn expected_output() {
    let result = format(&ToyEngine, "a  ;", &babel()).unwrap();
    assert!(check_expected_output(&result, "a;\n", "babel").is_ok());

    match check_expected_output(&result, "b;\n", "flow") {
        Err(Failure::OutputMismatch { variant, diff }) => {
            assert_eq!(variant, "flow");
            assert_snapshot!(diff, @r###"
            --- expected
            +++ actual
            @@ -1 +1 @@
            -b;
            +a;
            "###);
        }
        other => panic!("unexpected result {other:?}"),
    }
}

#[test]
fn diff_of_equal_texts() {
    assert_eq!(diff("a\n", "a\n"), None);
    assert!(diff("a\n", "b\n").is_some());
}

#[test]
fn end_of_line_probe_skips() {
    assert!(should_skip_end_of_line_probe("a;\r\n", &babel()));
    assert!(should_skip_end_of_line_probe("a;\n", &babel().with("requirePragma", true)));
    let mut reversed = babel();
    reversed.range_start = Some(4);
    reversed.range_end = Some(2);
    assert!(should_skip_end_of_line_probe("a;\n", &reversed));
    assert!(!should_skip_end_of_line_probe("a;\n", &babel()));
}

fn deep<'a>(
    engine: &'a dyn Formatter,
    code: &'a str,
    options: &'a OptionSet,
    result: &'a fmtspec::FormatResult,
) -> DeepChecks<'a> {
    DeepChecks {
        engine,
        code,
        options,
        result,
    }
}

#[test]
fn idempotence() {
    let options = babel();
    let code = "a  =  1;b=2;";
    let result = format(&ToyEngine, code, &options).unwrap();
    let checks = deep(&ToyEngine, code, &options, &result);
    assert!(checks.idempotence(false).is_ok());
    assert!(matches!(checks.idempotence(true), Err(Failure::UnstableConverged)));
}

#[test]
fn idempotence_without_semicolons() {
    let options = babel().with("semi", false);
    let code = "a = 1;\nb = 2;\n";
    let result = format(&ToyEngine, code, &options).unwrap();
    assert_eq!(result.output, "a = 1\nb = 2\n");
    let checks = deep(&ToyEngine, code, &options, &result);
    match checks.idempotence(false) {
        Err(Failure::NotIdempotent { diff }) => assert!(diff.contains("+a = 1 b = 2"), "{diff}"),
        other => panic!("unexpected result {other:?}"),
    }
    assert!(checks.idempotence(true).is_ok());
}

#[test]
fn idempotence_skipped_with_cursor() {
    let options = babel().with("semi", false);
    let code = "a = 1;<|>\nb = 2;\n";
    let result = format(&ToyEngine, code, &options).unwrap();
    assert!(deep(&ToyEngine, code, &options, &result).idempotence(false).is_ok());
}

#[test]
fn structure() {
    let options = babel();
    let code = "a  =  1;";
    let result = format(&ToyEngine, code, &options).unwrap();
    let checks = deep(&ToyEngine, code, &options, &result);
    assert!(checks.structure(false).is_ok());
    assert!(matches!(checks.structure(true), Err(Failure::AstUnstableConverged)));

    let options = babel().with("semi", false);
    let code = "a = 1;\nb = 2;\n";
    let result = format(&ToyEngine, code, &options).unwrap();
    let checks = deep(&ToyEngine, code, &options, &result);
    assert!(matches!(checks.structure(false), Err(Failure::AstChanged { .. })));
    assert!(checks.structure(true).is_ok());
}

#[test]
fn structure_skips_blank_fixtures() {
    let options = babel();
    let code = "  \n\n";
    let result = format(&ToyEngine, code, &options).unwrap();
    assert!(deep(&ToyEngine, code, &options, &result).structure(false).is_ok());
}

/// Drops a leading byte order mark and cannot parse anything
struct Unparseable;

impl Formatter for Unparseable {
    fn format_with_cursor(&self, text: &str, _: &OptionSet) -> Result<Formatted, EngineError> {
        Ok(Formatted {
            formatted: text.trim_start_matches('\u{feff}').to_owned(),
            cursor_offset: None,
        })
    }

    fn parse(&self, _: &str, _: &OptionSet) -> Result<Value, EngineError> {
        Err(EngineError::new("SyntaxError: Unexpected token"))
    }
}

#[test]
fn structure_skips_fixtures_holding_only_a_bom() {
    let options = babel();
    for code in ["\u{feff}", "\u{feff}\n  \n"] {
        let result = format(&Unparseable, code, &options).unwrap();
        assert!(result.changed);
        assert!(deep(&Unparseable, code, &options, &result).structure(false).is_ok());
    }

    let code = "\u{feff}a;\n";
    let result = format(&Unparseable, code, &options).unwrap();
    assert!(deep(&Unparseable, code, &options, &result).structure(false).is_err());
}

#[test]
fn record_skips_ruler_for_unlimited_width() {
    let options = babel().with("printWidth", u64::MAX);
    let result = format(&ToyEngine, "a;", &options).unwrap();
    let record = create_snapshot(&result, &[Some(GrammarVariant::Babel)], &options);
    assert!(record.contains("printWidth: 18446744073709551615\n"), "{record}");
    assert!(!record.contains("| printWidth"), "{record}");
}

#[test]
fn line_ending_and_bom_probes() {
    for options in [babel(), babel().with("endOfLine", "auto")] {
        let code = "a  =  1<|>;\nb;\n";
        let result = format(&ToyEngine, code, &options).unwrap();
        let checks = deep(&ToyEngine, code, &options, &result);
        assert!(checks.end_of_line_probe().is_ok());
        assert!(checks.bom_probe().is_ok());
    }
}

/// Drops a leading byte order mark and always ends lines with `\n`
struct Careless;

impl Formatter for Careless {
    fn format_with_cursor(&self, text: &str, options: &OptionSet) -> Result<Formatted, EngineError> {
        let options = options.clone().with("endOfLine", "lf");
        let Formatted { formatted, .. } =
            ToyEngine.format_with_cursor(text.trim_start_matches('\u{feff}'), &options)?;
        Ok(Formatted {
            formatted,
            cursor_offset: None,
        })
    }

    fn parse(&self, text: &str, options: &OptionSet) -> Result<Value, EngineError> {
        ToyEngine.parse(text, options)
    }
}

#[test]
fn careless_engine_fails_probes() {
    let options = babel().with("endOfLine", "auto");
    let code = "a;\nb;\n";
    let result = format(&Careless, code, &options).unwrap();
    let checks = deep(&Careless, code, &options, &result);
    match checks.end_of_line_probe() {
        Err(Failure::EndOfLineProbe { eol, .. }) => assert_eq!(eol, "crlf"),
        other => panic!("unexpected result {other:?}"),
    }
    assert!(matches!(checks.bom_probe(), Err(Failure::BomProbe { .. })));
}

#[test]
fn record_layout() {
    let options = babel().with("printWidth", 10).with("semi", false);
    let result = format(&ToyEngine, "a  =  1<|>;\r\nb;", &options).unwrap();
    let record = create_snapshot(
        &result,
        &[Some(GrammarVariant::Babel), Some(GrammarVariant::Flow)],
        &options,
    );
    assert_snapshot!(record, @r###"
    ====================================options=====================================
    parsers: ["babel", "flow"]
    printWidth: 10
    semi: false
              | printWidth
    =====================================input======================================
    a  =  1<|>;<CRLF>
    b;
    =====================================output=====================================
    a = 1<|>
    b

    ================================================================================
    "###);
}

#[test]
fn record_replaces_automatic_line_endings() {
    let options = babel().with("endOfLine", "auto").with("printWidth", 4);
    let result = format(&ToyEngine, "a;\r\n", &options).unwrap();
    let record = create_snapshot(&result, &[Some(GrammarVariant::Babel)], &options);
    assert_snapshot!(record, @r###"
    ====================================options=====================================
    parsers: ["babel"]
    endOfLine: "crlf"
    printWidth: 4
        | printWidth
    =====================================input======================================
    a;<CRLF>

    =====================================output=====================================
    a;<CRLF>

    ================================================================================
    "###);
}
