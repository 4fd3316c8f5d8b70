use depyler_diagnostic::{DiagnosticKind, Severity};
use depyler_ir::ast::CommentLine;
use depyler_ir::Span;
use pretty_assertions::assert_eq;

use super::*;
use crate::{BoundsChecking, MemoryStrategy, OptimizationLevel, Ownership};

/// Comment lines laid out one per line starting at offset 0.
fn lines(texts: &[&str]) -> Vec<CommentLine> {
    let mut offset = 0u32;
    texts
        .iter()
        .map(|text| {
            let len = u32::try_from(text.len()).unwrap_or(0);
            let line = CommentLine {
                text: (*text).to_string(),
                span: Span::new(offset, offset + len),
            };
            offset += len + 1;
            line
        })
        .collect()
}

fn kinds(out: &Extracted) -> Vec<DiagnosticKind> {
    out.diagnostics.iter().map(|d| d.kind).collect()
}

#[test]
fn reads_known_pragmas() {
    let out = extract(&lines(&[
        "# @depyler: ownership = \"borrowed\"",
        "# @depyler: memory_strategy = \"arena\"",
        "#@depyler:optimization_level='aggressive'",
        "# @depyler: bounds_checking = \"explicit\"",
    ]));
    assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);
    assert_eq!(out.pragmas.ownership, Some(Ownership::Borrowed));
    assert_eq!(out.pragmas.memory_strategy(), MemoryStrategy::Arena);
    assert_eq!(
        out.pragmas.optimization_level(),
        OptimizationLevel::Aggressive
    );
    assert_eq!(out.pragmas.bounds_checking(), BoundsChecking::Explicit);
}

#[test]
fn ordinary_comments_are_ignored() {
    let out = extract(&lines(&[
        "# parse the input carefully",
        "# TODO: @depyler later",
        "# @depylerish: ownership = \"owned\"",
    ]));
    assert!(out.diagnostics.is_empty());
    assert!(out.pragmas.is_empty());
}

#[test]
fn unknown_key_warns_and_suggests() {
    let out = extract(&lines(&["# @depyler: ownrship = \"owned\""]));
    assert_eq!(kinds(&out), vec![DiagnosticKind::UnknownPragma]);
    let diag = &out.diagnostics[0];
    assert_eq!(diag.severity, Severity::Warning);
    assert_eq!(diag.suggestions, vec!["did you mean `ownership`?".to_string()]);
    assert!(out.pragmas.is_empty());
}

#[test]
fn unknown_key_span_covers_the_name() {
    let text = "# @depyler: colour = \"red\"";
    let out = extract(&lines(&[text]));
    let span = out.diagnostics[0].span;
    assert_eq!(&text[span.to_range()], "colour");
}

#[test]
fn invalid_value_is_a_parse_error_and_skipped() {
    let out = extract(&lines(&[
        "# @depyler: ownership = \"owned\"",
        "# @depyler: ownership = \"weak\"",
    ]));
    assert_eq!(kinds(&out), vec![DiagnosticKind::ParseError]);
    assert_eq!(out.pragmas.ownership, Some(Ownership::Owned));
    assert!(out.diagnostics[0].notes[0].contains("\"shared\""));
}

#[test]
fn malformed_lines_are_parse_errors() {
    for text in [
        "# @depyler ownership = \"owned\"",
        "# @depyler: = \"owned\"",
        "# @depyler: ownership \"owned\"",
        "# @depyler: ownership = owned",
        "# @depyler: ownership = \"owned",
        "# @depyler: ownership = \"owned\" extra",
    ] {
        let out = extract(&lines(&[text]));
        assert_eq!(kinds(&out), vec![DiagnosticKind::ParseError], "{text}");
        assert!(out.pragmas.is_empty(), "{text}");
    }
}

#[test]
fn repeated_key_last_wins_with_override_warning() {
    let out = extract(&lines(&[
        "# @depyler: ownership = \"owned\"",
        "# @depyler: ownership = \"shared\"",
    ]));
    assert_eq!(kinds(&out), vec![DiagnosticKind::PragmaOverride]);
    assert_eq!(out.pragmas.ownership, Some(Ownership::Shared));
    let labels = &out.diagnostics[0].labels;
    assert_eq!(labels.len(), 2);
    assert!(!labels[1].is_primary);
}

#[test]
fn malformed_line_does_not_stop_later_pragmas() {
    let out = extract(&lines(&[
        "# @depyler: ownership",
        "# @depyler: bounds_checking = \"explicit\"",
    ]));
    assert_eq!(kinds(&out), vec![DiagnosticKind::ParseError]);
    assert_eq!(out.pragmas.bounds_checking(), BoundsChecking::Explicit);
}

#[test]
fn extraction_is_pure() {
    let input = lines(&[
        "# @depyler: ownership = \"owned\"",
        "# @depyler: bogus = \"1\"",
    ]);
    let first = extract(&input);
    let second = extract(&input);
    assert_eq!(first.pragmas, second.pragmas);
    assert_eq!(first.diagnostics, second.diagnostics);
}

#[test]
fn edit_distance_basics() {
    assert_eq!(edit_distance("owned", "owned"), 0);
    assert_eq!(edit_distance("ownrship", "ownership"), 1);
    assert_eq!(edit_distance("", "abc"), 3);
}
