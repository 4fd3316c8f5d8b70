#![expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

use depyler_ir::Span;
use pretty_assertions::assert_eq;

use super::*;
use crate::DiagnosticKind;

const SOURCE: &str = "def f():\n    data = {\"a\": \"x\", \"b\": 1}\n    return 0\n";

fn sample_file() -> SourceFile {
    SourceFile::new("mixed.py", SOURCE)
}

fn sample_diagnostic() -> Diagnostic {
    let start = u32::try_from(SOURCE.find('{').unwrap()).unwrap();
    let end = u32::try_from(SOURCE.find('}').unwrap() + 1).unwrap();
    Diagnostic::new(DiagnosticKind::TypeUnificationError, Span::new(start, end))
        .with_message("dict values have conflicting types `str` and `int`")
        .with_label("values must share one type")
        .with_note("containers lower to a single Rust element type")
}

#[test]
fn test_terminal_emitter_snippet() {
    let mut emitter = TerminalEmitter::with_color_mode(Vec::new(), ColorMode::Never, false);
    emitter.emit(&sample_diagnostic(), &sample_file());
    emitter.flush();
    let text = String::from_utf8(emitter.into_inner()).unwrap();

    let expected = "\
error[E3001]: dict values have conflicting types `str` and `int`
  --> mixed.py:2:12
   |
 2 |     data = {\"a\": \"x\", \"b\": 1}
   |            ^^^^^^^^^^^^^^^^^^ values must share one type
   |
   = note: containers lower to a single Rust element type

";
    assert_eq!(text, expected);
}

#[test]
fn test_terminal_emitter_with_color() {
    let mut emitter = TerminalEmitter::with_color_mode(Vec::new(), ColorMode::Always, false);
    emitter.emit(&sample_diagnostic(), &sample_file());
    let text = String::from_utf8(emitter.into_inner()).unwrap();
    assert!(text.contains("\x1b["));
    assert!(text.contains("E3001"));
}

#[test]
fn test_summary_wording() {
    let mut emitter = TerminalEmitter::with_color_mode(Vec::new(), ColorMode::Never, false);
    emitter.emit_summary(2, 1);
    emitter.emit_summary(0, 3);
    emitter.emit_summary(0, 0);
    let text = String::from_utf8(emitter.into_inner()).unwrap();
    assert_eq!(
        text,
        "error: 2 errors; 1 warning emitted\nwarning: 3 warnings emitted\n"
    );
}

#[test]
fn test_json_emitter_resolves_positions() {
    let mut emitter = JsonEmitter::new(Vec::new());
    emitter.emit(&sample_diagnostic(), &sample_file());
    emitter.flush();
    let text = String::from_utf8(emitter.into_inner()).unwrap();

    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    let first = &value[0];
    assert_eq!(first["code"], "E3001");
    assert_eq!(first["kind"], "TypeUnificationError");
    assert_eq!(first["severity"], "error");
    assert_eq!(first["line"], 2);
    assert_eq!(first["column"], 12);
    assert_eq!(first["labels"][0]["primary"], true);
}

#[test]
fn test_color_mode_resolution() {
    assert!(ColorMode::Auto.should_use_colors(true));
    assert!(!ColorMode::Auto.should_use_colors(false));
    assert!(ColorMode::Always.should_use_colors(false));
    assert!(!ColorMode::Never.should_use_colors(true));
    assert_eq!(ColorMode::parse("never"), Some(ColorMode::Never));
    assert_eq!(DiagnosticFormat::parse("json"), Some(DiagnosticFormat::Json));
    assert_eq!(DiagnosticFormat::parse("xml"), None);
}
