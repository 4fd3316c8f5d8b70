#![expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

use depyler_diagnostic::DiagnosticKind;
use depyler_ir::ast::{
    BinOp, CmpOp, ExprKind, FunctionDef, Item, Module, StmtKind, TypeExprKind, UnaryOp,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

use super::*;

fn parse_ok(source: &str) -> Module {
    let out = parse(source);
    assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);
    out.module
}

fn only_function(source: &str) -> FunctionDef {
    parse_ok(source).functions().next().unwrap().clone()
}

fn unsupported_constructs(function: &FunctionDef) -> Vec<String> {
    let mut found = Vec::new();
    depyler_ir::visitor::for_each_stmt(&function.body, |stmt| {
        if let StmtKind::Unsupported { construct } = &stmt.kind {
            found.push(construct.clone());
        }
    });
    depyler_ir::visitor::for_each_expr(&function.body, |expr| {
        if let ExprKind::Unsupported { construct } = &expr.kind {
            found.push(construct.clone());
        }
    });
    found
}

#[test]
fn function_signature_and_body() {
    let f = only_function("def add(a: int, b: int = 2) -> int:\n    return a + b\n");
    assert_eq!(f.name, "add");
    assert_eq!(f.params.len(), 2);
    assert_eq!(f.params[0].name, "a");
    assert_eq!(
        f.params[0].annotation.as_ref().unwrap().kind,
        TypeExprKind::Name("int".to_string())
    );
    assert!(matches!(
        f.params[1].default.as_ref().unwrap().kind,
        ExprKind::Int(2)
    ));
    assert_eq!(f.returns.as_ref().unwrap().to_string(), "int");
    let StmtKind::Return(Some(value)) = &f.body[0].kind else {
        panic!("expected return");
    };
    assert!(matches!(
        value.kind,
        ExprKind::BinOp {
            op: BinOp::Add,
            ..
        }
    ));
}

#[test]
fn docstring_is_split_from_body() {
    let f = only_function("def f():\n    \"\"\"Say hi.\"\"\"\n    pass\n");
    assert_eq!(f.docstring.as_deref(), Some("Say hi."));
    assert_eq!(f.body.len(), 1);
    assert!(matches!(f.body[0].kind, StmtKind::Pass));
}

#[test]
fn pragma_comments_attach_to_following_definition() {
    let source = "# unrelated\n\n# @depyler: ownership = \"borrowed\"\n# @depyler: optimization_level = \"aggressive\"\n@staticmethod\ndef f(s: str) -> int:\n    return len(s)\n";
    let f = only_function(source);
    let texts: Vec<_> = f.pragmas.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(
        texts,
        vec![
            "# @depyler: ownership = \"borrowed\"",
            "# @depyler: optimization_level = \"aggressive\"",
        ]
    );
    assert!(f.is_static());
}

#[test]
fn blank_line_detaches_comments() {
    let f = only_function("# @depyler: ownership = \"owned\"\n\ndef f():\n    pass\n");
    assert!(f.pragmas.is_empty());
}

#[test]
fn trailing_comments_are_not_pragmas() {
    let f = only_function("x = 1  # @depyler: ownership = \"owned\"\ndef f():\n    pass\n");
    assert!(f.pragmas.is_empty());
}

#[test]
fn elif_chains_nest_in_orelse() {
    let f = only_function(
        "def sign(n: int) -> int:\n    if n > 0:\n        return 1\n    elif n < 0:\n        return -1\n    else:\n        return 0\n",
    );
    let StmtKind::If { orelse, .. } = &f.body[0].kind else {
        panic!("expected if");
    };
    assert_eq!(orelse.len(), 1);
    let StmtKind::If { orelse: inner, .. } = &orelse[0].kind else {
        panic!("expected nested if");
    };
    assert!(matches!(inner[0].kind, StmtKind::Return(Some(_))));
}

#[test]
fn chained_comparison_and_not_in() {
    let f = only_function("def f(i: int, xs: list[int]) -> bool:\n    return 0 <= i < 10 and i not in xs\n");
    let StmtKind::Return(Some(value)) = &f.body[0].kind else {
        panic!("expected return");
    };
    let ExprKind::BoolOp { values, .. } = &value.kind else {
        panic!("expected and");
    };
    let ExprKind::Compare { ops, .. } = &values[0].kind else {
        panic!("expected compare");
    };
    assert_eq!(ops, &vec![CmpOp::LtE, CmpOp::Lt]);
    let ExprKind::Compare { ops, .. } = &values[1].kind else {
        panic!("expected compare");
    };
    assert_eq!(ops, &vec![CmpOp::NotIn]);
}

#[test]
fn power_binds_tighter_than_unary_minus() {
    let module = parse_ok("x = -2 ** 2\n");
    let Item::Statement(stmt) = &module.items[0] else {
        panic!("expected statement");
    };
    let StmtKind::Assign { value, .. } = &stmt.kind else {
        panic!("expected assignment");
    };
    let ExprKind::UnaryOp { op, operand } = &value.kind else {
        panic!("expected unary minus");
    };
    assert_eq!(*op, UnaryOp::Neg);
    assert!(matches!(
        operand.kind,
        ExprKind::BinOp {
            op: BinOp::Pow,
            ..
        }
    ));
}

#[test]
fn assignment_forms() {
    let f = only_function(
        "def f():\n    a = b = 1\n    c: int = 2\n    c += 3\n    x, y = 1, 2\n    d = {}\n",
    );
    assert!(matches!(&f.body[0].kind, StmtKind::Assign { targets, .. } if targets.len() == 2));
    assert!(matches!(f.body[1].kind, StmtKind::AnnAssign { .. }));
    assert!(matches!(
        f.body[2].kind,
        StmtKind::AugAssign {
            op: BinOp::Add,
            ..
        }
    ));
    let StmtKind::Assign { targets, value } = &f.body[3].kind else {
        panic!("expected tuple assignment");
    };
    assert!(matches!(targets[0].kind, ExprKind::Tuple(_)));
    assert!(matches!(value.kind, ExprKind::Tuple(_)));
    assert!(matches!(&f.body[4].kind, StmtKind::Assign { value, .. } if matches!(value.kind, ExprKind::Dict { .. })));
}

#[test]
fn comprehensions_and_slices() {
    let f = only_function(
        "def f(xs: list[int]) -> list[int]:\n    ys = [x * 2 for x in xs if x > 0]\n    return ys[1:-1]\n",
    );
    let StmtKind::Assign { value, .. } = &f.body[0].kind else {
        panic!("expected assignment");
    };
    let ExprKind::ListComp { generators, .. } = &value.kind else {
        panic!("expected list comprehension");
    };
    assert_eq!(generators.len(), 1);
    assert_eq!(generators[0].ifs.len(), 1);

    let StmtKind::Return(Some(ret)) = &f.body[1].kind else {
        panic!("expected return");
    };
    let ExprKind::Subscript { index, .. } = &ret.kind else {
        panic!("expected subscript");
    };
    assert!(matches!(
        index.kind,
        ExprKind::Slice {
            lower: Some(_),
            upper: Some(_),
            step: None
        }
    ));
}

#[test]
fn call_keywords_and_generator_argument() {
    let f = only_function("def f(xs: list[int]) -> int:\n    print(1, end=\"\")\n    return sum(x for x in xs)\n");
    let StmtKind::Expr(call) = &f.body[0].kind else {
        panic!("expected call");
    };
    let ExprKind::Call { keywords, .. } = &call.kind else {
        panic!("expected call");
    };
    assert_eq!(keywords[0].name, "end");

    let StmtKind::Return(Some(ret)) = &f.body[1].kind else {
        panic!("expected return");
    };
    let ExprKind::Call { args, .. } = &ret.kind else {
        panic!("expected call");
    };
    assert!(matches!(args[0].kind, ExprKind::GeneratorExp { .. }));
}

#[test]
fn class_fields_methods_and_docstring() {
    let module = parse_ok(
        "@dataclass\nclass Point:\n    \"\"\"A point.\"\"\"\n    x: int\n    y: int = 0\n\n    def norm(self) -> int:\n        return self.x + self.y\n",
    );
    let class = module.classes().next().unwrap();
    assert_eq!(class.name, "Point");
    assert!(class.is_dataclass());
    assert_eq!(class.docstring.as_deref(), Some("A point."));
    let fields: Vec<_> = class.fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(fields, vec!["x", "y"]);
    assert!(class.fields[1].default.is_some());
    assert_eq!(class.methods.len(), 1);
    assert!(class.method("norm").is_some());
    assert!(class.unsupported.is_empty());
}

#[test]
fn class_bases_are_recorded() {
    let module = parse_ok("class Stack(Base):\n    pass\n");
    assert_eq!(module.classes().next().unwrap().bases, vec!["Base".to_string()]);
}

#[test]
fn unsupported_statements_stay_local_to_their_function() {
    let module = parse_ok(
        "def bad():\n    try:\n        pass\n    except ValueError as e:\n        pass\n    f = lambda x: x\n\ndef good() -> int:\n    return 1\n",
    );
    let mut functions = module.functions();
    let bad = functions.next().unwrap();
    let good = functions.next().unwrap();
    assert_eq!(
        unsupported_constructs(bad),
        vec!["`try` statement".to_string(), "`lambda` expression".to_string()]
    );
    assert!(unsupported_constructs(good).is_empty());
}

#[test]
fn variadic_parameters_are_unsupported() {
    let f = only_function("def f(a, *args, **kwargs):\n    pass\n");
    assert_eq!(f.params.len(), 1);
    assert_eq!(
        unsupported_constructs(&f),
        vec!["variadic parameters".to_string(), "variadic parameters".to_string()]
    );
}

#[test]
fn nested_function_is_unsupported() {
    let f = only_function("def outer():\n    def inner():\n        pass\n    return 1\n");
    assert_eq!(
        unsupported_constructs(&f),
        vec!["nested function definition".to_string()]
    );
}

#[test]
fn imports_are_items() {
    let module = parse_ok("import math\nfrom typing import List, Optional as Opt\n");
    let Item::Import(first) = &module.items[0] else {
        panic!("expected import");
    };
    assert_eq!(first.module, "math");
    let Item::Import(second) = &module.items[1] else {
        panic!("expected import");
    };
    assert_eq!(second.module, "typing");
    assert_eq!(
        second.names,
        vec![
            ("List".to_string(), None),
            ("Optional".to_string(), Some("Opt".to_string()))
        ]
    );
}

#[test]
fn node_ids_are_unique() {
    let module = parse_ok("def f(a: int) -> int:\n    b = a + 1\n    return b * f\"{a}\".count(\"x\")\n");
    let f = module.functions().next().unwrap();
    let mut ids = Vec::new();
    depyler_ir::visitor::for_each_expr(&f.body, |e| ids.push(e.id));
    depyler_ir::visitor::for_each_stmt(&f.body, |s| ids.push(s.id));
    let count = ids.len();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), count);
    assert!(ids.iter().all(|id| id.0 < module.node_count));
}

#[test]
fn syntax_error_is_module_fatal() {
    let out = parse("def f(:):\n    pass\n");
    assert!(out.has_syntax_errors());
    assert_eq!(out.diagnostics[0].kind, DiagnosticKind::SyntaxError);
    assert!(
        out.diagnostics[0].message.starts_with("expected identifier"),
        "{}",
        out.diagnostics[0].message
    );
}

#[test]
fn unbalanced_brackets_are_reported_by_the_lexer() {
    let out = parse("def f(:\n    pass\n");
    assert!(out.has_syntax_errors());
    assert!(
        out.diagnostics[0].message.contains("inside brackets"),
        "{}",
        out.diagnostics[0].message
    );
}

#[test]
fn lexer_errors_short_circuit() {
    let out = parse("def f():\n    return \"unterminated\n");
    assert!(out.has_syntax_errors());
    assert!(out.module.items.is_empty());
}

#[test]
fn missing_indent_is_reported() {
    let out = parse("def f():\nreturn 1\n");
    assert!(out.has_syntax_errors());
}

#[test]
fn module_constants_and_calls() {
    let module = parse_ok("LIMIT: int = 10\nprint(LIMIT)\n");
    assert_eq!(module.items.len(), 2);
    assert!(module.functions().next().is_none());
}

proptest! {
    #[test]
    fn parse_never_panics(source in "[a-z0-9_ ()\\[\\]{}:=+\\-*,.\"'\n#@]{0,160}") {
        let _ = parse(&source);
    }

    #[test]
    fn integer_literals_round_trip(value in 0i64..i64::MAX) {
        let module = parse(&format!("x = {value}\n")).module;
        let Item::Statement(stmt) = &module.items[0] else {
            return Err(TestCaseError::fail("expected statement"));
        };
        let StmtKind::Assign { value: expr, .. } = &stmt.kind else {
            return Err(TestCaseError::fail("expected assignment"));
        };
        prop_assert_eq!(&expr.kind, &ExprKind::Int(i128::from(value)));
    }
}
