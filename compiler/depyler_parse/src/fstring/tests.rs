#![expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

use depyler_ir::ast::{ExprKind, FStringPart, Item, StmtKind};
use pretty_assertions::assert_eq;

use crate::parse;

fn fstring_parts(source: &str) -> Vec<FStringPart> {
    let out = parse(source);
    assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);
    let Item::Statement(stmt) = out.module.items.into_iter().next().unwrap() else {
        panic!("expected a statement");
    };
    let StmtKind::Expr(expr) = stmt.kind else {
        panic!("expected an expression statement");
    };
    match expr.kind {
        ExprKind::FString(parts) => parts,
        other => panic!("expected f-string, got {other:?}"),
    }
}

fn field_name(part: &FStringPart) -> &str {
    match part {
        FStringPart::Field { expr, .. } => expr.as_name().unwrap(),
        FStringPart::Literal(_) => panic!("expected a field"),
    }
}

#[test]
fn literal_and_fields() {
    let parts = fstring_parts("f\"total: {n} items\"\n");
    assert_eq!(parts.len(), 3);
    assert_eq!(parts[0], FStringPart::Literal("total: ".to_string()));
    assert_eq!(field_name(&parts[1]), "n");
    assert_eq!(parts[2], FStringPart::Literal(" items".to_string()));
}

#[test]
fn doubled_braces_are_literal() {
    let parts = fstring_parts("f\"{{x}} {y}\"\n");
    assert_eq!(parts[0], FStringPart::Literal("{x} ".to_string()));
    assert_eq!(field_name(&parts[1]), "y");
}

#[test]
fn conversion_and_format_spec() {
    let parts = fstring_parts("f\"{value!r:>8}\"\n");
    let FStringPart::Field {
        conversion, spec, ..
    } = &parts[0]
    else {
        panic!("expected a field");
    };
    assert_eq!(*conversion, Some('r'));
    assert_eq!(spec.as_deref(), Some(">8"));
}

#[test]
fn field_spans_point_into_the_file() {
    let source = "f\"ab{count}\"\n";
    let parts = fstring_parts(source);
    let FStringPart::Field { expr, .. } = &parts[1] else {
        panic!("expected a field");
    };
    assert_eq!(&source[expr.span.to_range()], "count");
}

#[test]
fn field_expressions_parse_fully() {
    let parts = fstring_parts("f\"{a + b * 2:.2f}\"\n");
    let FStringPart::Field { expr, spec, .. } = &parts[0] else {
        panic!("expected a field");
    };
    assert!(matches!(expr.kind, ExprKind::BinOp { .. }));
    assert_eq!(spec.as_deref(), Some(".2f"));
}

#[test]
fn concatenated_with_plain_string() {
    let parts = fstring_parts("f\"{x}\" \"!\"\n");
    assert_eq!(parts.len(), 2);
    assert_eq!(parts[1], FStringPart::Literal("!".to_string()));
}

#[test]
fn self_documenting_field_is_unsupported() {
    let parts = fstring_parts("f\"{x=}\"\n");
    let FStringPart::Field { expr, .. } = &parts[0] else {
        panic!("expected a field");
    };
    assert!(matches!(expr.kind, ExprKind::Unsupported { .. }));
}

#[test]
fn single_closing_brace_is_a_syntax_error() {
    let out = parse("f\"oops }\"\n");
    assert!(out.has_syntax_errors());
}

#[test]
fn empty_field_is_a_syntax_error() {
    let out = parse("f\"{}\"\n");
    assert!(out.has_syntax_errors());
    assert!(out.diagnostics[0].message.contains("empty expression"));
}
