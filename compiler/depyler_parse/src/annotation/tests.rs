#![expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

use depyler_ir::ast::{Item, StmtKind, TypeExprKind};
use pretty_assertions::assert_eq;

use crate::parse;

fn annotation_of(source: &str) -> depyler_ir::ast::TypeExpr {
    let out = parse(source);
    assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);
    match out.module.items.into_iter().next().unwrap() {
        Item::Statement(stmt) => match stmt.kind {
            StmtKind::AnnAssign { annotation, .. } => annotation,
            other => panic!("expected annotated assignment, got {other:?}"),
        },
        other => panic!("expected statement, got {other:?}"),
    }
}

#[test]
fn plain_and_generic_names() {
    assert_eq!(annotation_of("x: int\n").to_string(), "int");
    assert_eq!(
        annotation_of("x: dict[str, list[int]]\n").to_string(),
        "dict[str, list[int]]"
    );
    assert_eq!(annotation_of("x: List[str]\n").to_string(), "List[str]");
}

#[test]
fn typing_prefix_is_dropped() {
    assert_eq!(
        annotation_of("x: typing.Optional[int]\n").to_string(),
        "Optional[int]"
    );
}

#[test]
fn pipe_none_becomes_optional() {
    let ann = annotation_of("x: int | None\n");
    assert_eq!(ann.to_string(), "Optional[int]");
}

#[test]
fn pipe_without_none_becomes_union() {
    assert_eq!(
        annotation_of("x: int | str\n").to_string(),
        "Union[int, str]"
    );
    assert_eq!(
        annotation_of("x: int | str | None\n").to_string(),
        "Optional[Union[int, str]]"
    );
}

#[test]
fn none_and_string_forward_references() {
    assert_eq!(annotation_of("x: None\n").kind, TypeExprKind::NoneType);
    assert_eq!(
        annotation_of("x: \"Point\"\n").kind,
        TypeExprKind::Name("Point".to_string())
    );
}

#[test]
fn calls_are_invalid() {
    assert_eq!(
        annotation_of("x: make_type()\n").kind,
        TypeExprKind::Invalid("call expression".to_string())
    );
}
