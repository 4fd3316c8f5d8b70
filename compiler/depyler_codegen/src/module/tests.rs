use pretty_assertions::assert_eq;

use super::{Mapping, SourceMap};
use crate::test_support::{lower_source, rust_of};

#[test]
fn literal_constants_become_pub_consts() {
    let rust = rust_of(
        "LIMIT = 100
RATE = 0.5
NAME = \"depyler\"
DEBUG = False
OFFSET = -3

def limit() -> int:
    return LIMIT
",
    );
    assert!(rust.starts_with("pub const LIMIT: i64 = 100;\n"), "{rust}");
    assert!(rust.contains("pub const RATE: f64 = 0.5;"), "{rust}");
    assert!(rust.contains("pub const NAME: &str = \"depyler\";"), "{rust}");
    assert!(rust.contains("pub const DEBUG: bool = false;"), "{rust}");
    assert!(rust.contains("pub const OFFSET: i64 = -3;"), "{rust}");
    assert!(rust.contains("LIMIT\n}"), "{rust}");
}

#[test]
fn functions_keep_source_order() {
    let rust = rust_of(
        "def second() -> int:
    return first() + 1

def first() -> int:
    return 1
",
    );
    let second = rust.find("pub fn second(").unwrap_or(usize::MAX);
    let first = rust.find("pub fn first(").unwrap_or(0);
    assert!(second < first, "{rust}");
}

#[test]
fn only_used_helpers_are_emitted() {
    let rust = rust_of(
        "def half(n: int) -> int:
    return n // 2
",
    );
    assert!(rust.contains("fn py_floor_div_i64("), "{rust}");
    assert!(!rust.contains("fn py_mod_i64("), "{rust}");
    assert!(!rust.contains("fn py_str_index("), "{rust}");
    assert!(!rust.contains("use std::"), "{rust}");
}

#[test]
fn compiling_twice_is_byte_identical() {
    let source = "class Bag:
    def __init__(self):
        self.items: dict[str, int] = {}

    def add(self, name: str) -> None:
        self.items[name] = self.items.get(name, 0) + 1

def fill(names: list[str]) -> Bag:
    bag = Bag()
    for n in names:
        bag.add(n)
    return bag
";
    assert_eq!(rust_of(source), rust_of(source));
}

#[test]
fn renaming_and_comments_only_rename() {
    let plain = rust_of(
        "def f(text: str) -> int:
    n = len(text)
    return n
",
    );
    let renamed = rust_of(
        "def f(parse: str) -> int:
    # parse the input
    parse_len = len(parse)
    return parse_len
",
    );
    assert_eq!(
        renamed.replace("parse_len", "n").replace("parse", "text"),
        plain
    );
}

#[test]
fn list_of_int_stays_uniform() {
    let rust = rust_of(
        "def bigint_add(a: list[int], b: list[int]) -> list[int]:
    result = []
    carry = 0
    i = 0
    while i < len(a) or i < len(b) or carry:
        total = carry
        if i < len(a):
            total += a[i]
        if i < len(b):
            total += b[i]
        result.append(total % 10)
        carry = total // 10
        i += 1
    return result
",
    );
    assert!(rust.contains("pub fn bigint_add(a: &[i64], b: &[i64]) -> Vec<i64> {"), "{rust}");
    assert!(rust.contains("let mut result: Vec<i64> = Vec::new();"), "{rust}");
}

#[test]
fn mappings_point_at_python_lines() {
    let lowered = lower_source(
        "def add(a: int, b: int) -> int:
    c = a + b
    return c
",
    );
    let lines: Vec<&str> = lowered.module.code.lines().collect();
    let at = |python: u32| {
        lowered
            .module
            .mappings
            .iter()
            .find(|m| m.python_line == python)
            .map(|m| lines[m.rust_line as usize - 1].trim())
    };
    assert_eq!(at(1), Some("pub fn add(a: i64, b: i64) -> i64 {"));
    assert_eq!(at(2), Some("let c: i64 = a + b;"));
    assert_eq!(at(3), Some("c"));
}

#[test]
fn class_mappings_follow_the_struct() {
    let lowered = lower_source(
        "class P:
    \"\"\"A point.\"\"\"
    def __init__(self, x: int):
        self.x = x
",
    );
    let lines: Vec<&str> = lowered.module.code.lines().collect();
    let struct_line = lowered
        .module
        .mappings
        .iter()
        .find(|m| m.python_line == 1)
        .map(|m| lines[m.rust_line as usize - 1]);
    assert_eq!(struct_line, Some("pub struct P {"));
}

#[test]
fn source_maps_serialize_as_json() {
    let map = SourceMap {
        source: "m.py".to_string(),
        mappings: vec![Mapping {
            rust_line: 3,
            python_line: 1,
        }],
    };
    let json = serde_json::to_string(&map).unwrap_or_default();
    assert_eq!(
        json,
        r#"{"source":"m.py","mappings":[{"rust_line":3,"python_line":1}]}"#
    );
}

