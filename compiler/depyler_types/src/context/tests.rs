#![expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

use pretty_assertions::assert_eq;

use super::*;
use crate::test_support::{module_pragmas, parse_module};

fn context(source: &str) -> ModuleContext {
    let module = parse_module(source);
    ModuleContext::build(&module, source, &module_pragmas(&module))
}

const INT: RustType = RustType::Int(IntKind::I64);

#[test]
fn signatures_keep_annotations_and_holes() {
    let ctx = context("def f(a: int, b, c: str = \"x\") -> float:\n    return 1.0\n");
    let f = ctx.function("f").unwrap();
    let params: Vec<_> = f
        .params
        .iter()
        .map(|p| (p.name.as_str(), p.ty.clone(), p.has_default))
        .collect();
    assert_eq!(
        params,
        vec![
            ("a", Some(INT), false),
            ("b", None, false),
            ("c", Some(RustType::Str), true),
        ]
    );
    assert_eq!(f.ret, Some(RustType::Float));
}

#[test]
fn unannotated_return_depends_on_body() {
    let ctx = context("def g():\n    return 1\n\ndef h():\n    print(1)\n");
    assert_eq!(ctx.function("g").unwrap().ret, None);
    assert_eq!(ctx.function("h").unwrap().ret, Some(RustType::Unit));
}

#[test]
fn call_params_skip_the_receiver() {
    let source = "\
class Counter:
    def __init__(self, start: int):
        self.n = start

    def add(self, k: int) -> None:
        self.n += k

    @staticmethod
    def zero() -> int:
        return 0
";
    let ctx = context(source);
    let class = ctx.class("Counter").unwrap();
    let add = class.method("add").unwrap();
    assert_eq!(add.params.len(), 2);
    assert_eq!(add.call_params().len(), 1);
    let zero = class.method("zero").unwrap();
    assert!(zero.is_static);
    assert!(zero.call_params().is_empty());

    let ctor: Vec<_> = class.constructor.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(ctor, vec!["start"]);
    assert!(class.has_init);
    assert!(class.method("__init__").is_none());
}

#[test]
fn dataclass_constructor_follows_fields() {
    let source = "\
from dataclasses import dataclass

@dataclass
class Pair:
    left: int
    right: str = \"\"
";
    let ctx = context(source);
    let pair = ctx.class("Pair").unwrap();
    assert!(pair.is_dataclass);
    let fields: Vec<_> = pair.fields.iter().map(|f| (f.name.as_str(), f.ty.clone())).collect();
    assert_eq!(fields, vec![("left", INT), ("right", RustType::Str)]);
    let ctor: Vec<_> = pair
        .constructor
        .iter()
        .map(|p| (p.name.as_str(), p.has_default))
        .collect();
    assert_eq!(ctor, vec![("left", false), ("right", true)]);
    assert!(pair.errors.is_empty());
    assert!(ctx.foreign_modules.is_empty());
}

#[test]
fn complete_fields_appends_init_assignments() {
    let source = "\
class Box:
    label: str = \"\"

    def __init__(self, w: int):
        self.w = w
";
    let mut ctx = context(source);
    ctx.classes
        .complete_fields("Box", &[("w".to_string(), INT, depyler_ir::Span::DUMMY)]);
    ctx.classes
        .complete_fields("Box", &[("label".to_string(), INT, depyler_ir::Span::DUMMY)]);
    let names: Vec<_> = ctx
        .class("Box")
        .unwrap()
        .fields
        .iter()
        .map(|f| (f.name.as_str(), f.ty.clone()))
        .collect();
    assert_eq!(names, vec![("label", RustType::Str), ("w", INT)]);
}

#[test]
fn constants_are_typed_from_literals() {
    let source = "\
LIMIT = 10
NEG = -3
RATE = 0.5
NAME = \"depyler\"
DEBUG = False
HUGE = 100000000000000000000
ITEMS = [1, 2]
";
    let ctx = context(source);
    let ty = |name: &str| ctx.constants.get(name).map(|c| c.ty.clone());
    assert_eq!(ty("LIMIT"), Some(INT));
    assert_eq!(ty("NEG"), Some(INT));
    assert_eq!(ty("RATE"), Some(RustType::Float));
    assert_eq!(ty("NAME"), Some(RustType::Str));
    assert_eq!(ty("DEBUG"), Some(RustType::Bool));
    assert_eq!(ty("HUGE"), Some(RustType::Int(IntKind::I128)));
    assert_eq!(ty("ITEMS"), None);
}

#[test]
fn imports_sort_into_math_and_foreign() {
    let source = "\
import math
import math as m
from math import sqrt as root, pi
from typing import List, Optional
import os.path
from collections import deque
";
    let ctx = context(source);
    assert!(ctx.is_math_module("math"));
    assert!(ctx.is_math_module("m"));
    assert_eq!(ctx.math_names.get("root"), Some(&MathMember::Sqrt));
    assert_eq!(ctx.math_names.get("pi"), Some(&MathMember::Pi));
    assert!(ctx.foreign_modules.contains("os"));
    assert!(ctx.foreign_modules.contains("deque"));
    assert!(!ctx.foreign_modules.contains("List"));
}
