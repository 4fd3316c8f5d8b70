#![expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

use depyler_codegen::{Imports, LoweredFunction, RuntimeHelpers};
use depyler_diagnostic::{Diagnostic, DiagnosticKind};
use depyler_ir::ast::FunctionDef;
use depyler_ir::Span;
use depyler_pragma::PragmaSet;
use depyler_types::{infer_function, FunctionInput, ModuleContext, RustType, TypedFunction};
use pretty_assertions::assert_eq;
use rustc_hash::FxHashMap;

use super::{check_after_codegen, check_after_inference, check_before_inference, validate};

fn only_function(source: &str) -> FunctionDef {
    let out = depyler_parse::parse(source);
    assert!(!out.has_syntax_errors(), "{:?}", out.diagnostics);
    let f = out.module.functions().next().unwrap().clone();
    f
}

fn typed(source: &str) -> (FunctionDef, TypedFunction) {
    let module = depyler_parse::parse(source).module;
    let function = module.functions().next().unwrap().clone();
    let pragmas = FxHashMap::default();
    let ctx = ModuleContext::build(&module, source, &pragmas);
    let empty = PragmaSet::default();
    let inference = infer_function(&FunctionInput {
        function: &function,
        class: None,
        pragmas: &empty,
        context: &ctx,
    });
    assert!(!inference.has_fatal(), "{:?}", inference.diagnostics);
    (function, inference.typed)
}

fn kinds(diagnostics: &[Diagnostic]) -> Vec<DiagnosticKind> {
    diagnostics.iter().map(|d| d.kind).collect()
}

#[test]
fn fatal_diagnostics_suppress_output() {
    let error = Diagnostic::new(DiagnosticKind::TypeUnificationError, Span::new(0, 1));
    let result = validate(vec![error], Some("pub fn f() {}".to_string()));
    assert!(!result.ok);
    assert_eq!(result.rust_source, None);
    assert_eq!(result.diagnostics.len(), 1);
}

#[test]
fn warnings_and_pragma_errors_keep_output() {
    let warning = Diagnostic::new(DiagnosticKind::PossibleOverflow, Span::new(0, 1));
    let pragma = Diagnostic::new(DiagnosticKind::ParseError, Span::new(2, 3));
    let result = validate(vec![warning, pragma], Some("pub fn f() {}".to_string()));
    assert!(result.ok);
    assert_eq!(result.rust_source.as_deref(), Some("pub fn f() {}"));
}

#[test]
fn dynamic_attribute_patterns_are_unsupported() {
    let function = only_function(
        "def poke(obj: int, name: str) -> int:
    setattr(obj, name, 1)
    return getattr(obj, name)
",
    );
    let found = check_before_inference(&function);
    assert_eq!(
        kinds(&found),
        vec![DiagnosticKind::UnsupportedConstruct, DiagnosticKind::UnsupportedConstruct]
    );
    assert!(found[0].message.contains("`setattr()`"), "{}", found[0].message);
    assert!(found[1].message.contains("`getattr()`"), "{}", found[1].message);
}

#[test]
fn eval_and_dunder_attributes_are_unsupported() {
    let function = only_function(
        "def run(code: str, p: int) -> int:
    d = p.__dict__
    return eval(code)
",
    );
    let messages: Vec<String> = check_before_inference(&function)
        .into_iter()
        .map(|d| d.message)
        .collect();
    assert_eq!(messages.len(), 2, "{messages:?}");
    assert!(messages[0].contains("`.__dict__`"));
    assert!(messages[1].contains("`eval()`"));
}

#[test]
fn unsupported_nodes_are_swept_before_inference() {
    let function = only_function(
        "def risky(x: int) -> int:
    try:
        x = x + 1
    except ValueError:
        pass
    f = lambda y: y
    return x
",
    );
    let found = check_before_inference(&function);
    assert_eq!(found.len(), 2, "{found:?}");
    assert!(found[0].message.contains("`try` statement"));
    assert!(found[1].message.contains("`lambda` expression"));
}

#[test]
fn supported_functions_pass_every_check() {
    let source = "def count_a(s: str) -> int:
    n = 0
    for i in range(len(s)):
        if s[i] == \"a\":
            n += 1
    return n
";
    assert_eq!(check_before_inference(&only_function(source)), vec![]);
    let (function, typed) = typed(source);
    assert_eq!(check_after_inference(&function, &typed), vec![]);
}

#[test]
fn unresolved_bindings_fail_the_function() {
    let (function, mut typed) = typed(
        "def twice(x: int) -> int:
    return x * 2
",
    );
    typed.params[0].1 = RustType::Unresolved;
    let found = check_after_inference(&function, &typed);
    assert_eq!(kinds(&found), vec![DiagnosticKind::TypeUnificationError]);
    assert_eq!(found[0].message, "the type of x was left unresolved");
}

#[test]
fn unclassified_string_subscripts_fail_the_function() {
    let (function, mut typed) = typed(
        "def first(s: str) -> str:
    return s[0]
",
    );
    typed.index_checks.clear();
    let found = check_after_inference(&function, &typed);
    assert_eq!(kinds(&found), vec![DiagnosticKind::IndexSemanticsError]);
}

#[test]
fn byte_indexing_in_generated_code_is_rejected() {
    let function = only_function("def f(s: str) -> int:\n    return 0\n");
    let lowered = LoweredFunction {
        key: "f".to_string(),
        class: None,
        name: "f".to_string(),
        code: "pub fn f(s: &str) -> i64 {\n    s.as_bytes()[0] as i64\n}".to_string(),
        mappings: vec![(0, 1)],
        helpers: RuntimeHelpers::empty(),
        imports: Imports::empty(),
        diagnostics: Vec::new(),
    };
    let found = check_after_codegen(&function, &lowered);
    assert_eq!(kinds(&found), vec![DiagnosticKind::IndexSemanticsError]);
}
