#![expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

use depyler_diagnostic::DiagnosticKind;
use depyler_ir::ast::{Item, TypeExpr};
use pretty_assertions::assert_eq;

use super::*;

/// Annotation of the single parameter of `def f(x: <ann>): pass`.
fn annotation(ann: &str) -> TypeExpr {
    let source = format!("def f(x: {ann}):\n    pass\n");
    let output = depyler_parse::parse(&source);
    assert!(output.diagnostics.is_empty(), "{:?}", output.diagnostics);
    match output.module.items.into_iter().next().unwrap() {
        Item::Function(f) => f.params.into_iter().next().unwrap().annotation.unwrap(),
        other => panic!("expected a function, got {other:?}"),
    }
}

fn lower(ann: &str) -> Result<RustType, Box<Diagnostic>> {
    let is_class = |name: &str| name == "Point";
    let mut hole = || RustType::Unresolved;
    let mut scope = AnnotationScope {
        int_kind: IntKind::I64,
        is_class: &is_class,
        hole: &mut hole,
    };
    lower_annotation(&annotation(ann), &mut scope)
}

#[test]
fn scalars_and_containers() {
    assert_eq!(lower("int").unwrap(), RustType::Int(IntKind::I64));
    assert_eq!(
        lower("dict[str, list[float]]").unwrap(),
        RustType::hash_map(RustType::Str, RustType::vec(RustType::Float))
    );
    assert_eq!(
        lower("Tuple[int, str]").unwrap(),
        RustType::Tuple(vec![RustType::Int(IntKind::I64), RustType::Str])
    );
    assert_eq!(
        lower("Set[bool]").unwrap(),
        RustType::hash_set(RustType::Bool)
    );
}

#[test]
fn optional_spellings_agree() {
    let expected = RustType::option(RustType::Int(IntKind::I64));
    assert_eq!(lower("Optional[int]").unwrap(), expected);
    assert_eq!(lower("int | None").unwrap(), expected);
    assert_eq!(lower("typing.Optional[int]").unwrap(), expected);
}

#[test]
fn bare_containers_get_holes() {
    assert_eq!(
        lower("list").unwrap(),
        RustType::vec(RustType::Unresolved)
    );
}

#[test]
fn classes_become_structs() {
    assert_eq!(
        lower("Point").unwrap(),
        RustType::Struct("Point".to_string())
    );
    assert_eq!(
        lower("'Point'").unwrap(),
        RustType::Struct("Point".to_string())
    );
}

#[test]
fn unions_are_unsupported() {
    let err = lower("int | str").unwrap_err();
    assert_eq!(err.kind, DiagnosticKind::UnsupportedConstruct);
}

#[test]
fn unknown_names_are_type_errors() {
    let err = lower("Widget").unwrap_err();
    assert_eq!(err.kind, DiagnosticKind::TypeUnificationError);
    assert!(err.message.contains("Widget"));
}

#[test]
fn wrong_arity() {
    let err = lower("dict[str]").unwrap_err();
    assert!(err.message.contains("takes 2 type arguments"), "{}", err.message);
}
