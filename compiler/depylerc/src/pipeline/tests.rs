#![expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

use std::path::Path;

use depyler_diagnostic::DiagnosticKind;
use pretty_assertions::assert_eq;

use super::{compile_source, CancellationToken, ModuleOutput};
use crate::{CompilerConfig, DriverError};

fn compile(source: &str) -> ModuleOutput {
    compile_with(source, &CompilerConfig::default())
}

fn compile_with(source: &str, config: &CompilerConfig) -> ModuleOutput {
    compile_source(Path::new("m.py"), source, config, &CancellationToken::new()).unwrap()
}

fn codes(output: &ModuleOutput) -> Vec<&'static str> {
    output.diagnostics.iter().map(|d| d.code()).collect()
}

#[test]
fn clean_modules_succeed() {
    let output = compile(
        "def add(a: int, b: int) -> int:
    return a + b

def twice(x: int) -> int:
    return add(x, x)
",
    );
    assert!(output.succeeded(), "{:?}", output.diagnostics);
    let keys: Vec<&str> = output.functions.iter().map(|f| f.key.as_str()).collect();
    assert_eq!(keys, vec!["add", "twice"]);
    assert_eq!(output.function("twice").unwrap().line, 4);
    let rust = output.rust.unwrap();
    assert!(rust.contains("pub fn add(a: i64, b: i64) -> i64 {"), "{rust}");
    assert!(rust.contains("pub fn twice(x: i64) -> i64 {"), "{rust}");
}

#[test]
fn a_failing_function_does_not_block_its_siblings() {
    let output = compile(
        "def good(n: int) -> int:
    return n + 1

def bad(obj: int) -> int:
    return getattr(obj, \"x\")

def also_good(s: str) -> int:
    return len(s)
",
    );
    assert!(!output.succeeded());
    assert_eq!(codes(&output), vec!["E2001"]);

    let bad = output.function("bad").unwrap();
    assert!(!bad.result.ok);
    assert_eq!(bad.result.rust_source, None);
    assert!(output.function("good").unwrap().result.ok);
    assert!(output.function("also_good").unwrap().result.ok);

    let rust = output.rust.unwrap();
    assert!(rust.contains("pub fn good("), "{rust}");
    assert!(rust.contains("pub fn also_good("), "{rust}");
    assert!(!rust.contains("pub fn bad("), "{rust}");
}

#[test]
fn heterogeneous_literals_fail_with_a_unification_error() {
    let output = compile(
        "def mixed() -> int:
    xs = [1, \"two\"]
    return len(xs)
",
    );
    let mixed = output.function("mixed").unwrap();
    assert!(!mixed.result.ok);
    assert!(mixed
        .result
        .diagnostics
        .iter()
        .any(|d| d.kind == DiagnosticKind::TypeUnificationError));
}

#[test]
fn syntax_errors_stop_the_module() {
    let output = compile("def broken(:\n    return 1\n");
    assert_eq!(output.rust, None);
    assert!(output.functions.is_empty());
    assert!(output
        .diagnostics
        .iter()
        .any(|d| d.kind == DiagnosticKind::SyntaxError));
    assert!(!output.succeeded());
}

#[test]
fn pragma_problems_are_warnings_only() {
    let output = compile(
        "# @depyler: colour = \"blue\"
class Parcel:
    def __init__(self, size: int):
        self.size = size

# @depyler: ownership = \"owned\"
# @depyler: ownership = \"borrowed\"
def f(n: int) -> int:
    return n
",
    );
    assert!(output.succeeded(), "{:?}", output.diagnostics);
    assert_eq!(codes(&output), vec!["W1002", "W1003"]);
    assert_eq!(output.warning_count(), 2);
    assert_eq!(output.error_count(), 0);
}

#[test]
fn cancelled_modules_report_nothing() {
    let token = CancellationToken::new();
    token.cancel();
    let result = compile_source(
        Path::new("m.py"),
        "def f() -> int:\n    return 1\n",
        &CompilerConfig::default(),
        &token,
    );
    assert!(matches!(result, Err(DriverError::Cancelled { .. })));
}

#[test]
fn source_maps_are_built_on_request() {
    let source = "def one() -> int:\n    return 1\n";
    assert!(compile(source).source_map.is_none());

    let config = CompilerConfig {
        source_map: true,
        ..CompilerConfig::default()
    };
    let map = compile_with(source, &config).source_map.unwrap();
    assert_eq!(map.source, "m.py");
    assert!(map.mappings.iter().any(|m| m.python_line == 1));
}

#[test]
fn debug_comments_follow_the_config() {
    let config = CompilerConfig {
        debug: true,
        ..CompilerConfig::default()
    };
    let rust = compile_with("def one() -> int:\n    x = 1\n    return x\n", &config)
        .rust
        .unwrap();
    assert!(rust.contains("// line 2: x = 1"), "{rust}");
}

#[test]
fn boolean_conditions_mix_operand_types() {
    let output = compile(
        "def bigint_add(a: list[int], b: list[int]) -> list[int]:
    result = []
    carry = 0
    i = 0
    n = max(len(a), len(b))
    while i < n or carry:
        s = carry
        if i < len(a):
            s += a[i]
        if i < len(b):
            s += b[i]
        result.append(s % 10)
        carry = s // 10
        i += 1
    return result

def first_positive(items: list[int]) -> bool:
    if items and items[0] > 0:
        return True
    return False
",
    );
    assert!(output.succeeded(), "{:?}", output.diagnostics);
}

#[test]
fn unproven_list_indices_are_normalised_at_run_time() {
    let output = compile(
        "def at(xs: list[int], i: int) -> int:
    return xs[i]
",
    );
    assert!(output.succeeded(), "{:?}", output.diagnostics);
    let rust = output.rust.unwrap();
    assert!(rust.contains("xs[py_index(xs.len(), i)]"), "{rust}");
    assert!(!rust.contains("i as usize"), "{rust}");
}

#[test]
fn late_subscript_types_that_disagree_fail() {
    let output = compile(
        "def f(p, q: list[int]) -> str:
    x = p[0]
    y = x + \"a\"
    p = q
    return y
",
    );
    let f = output.function("f").unwrap();
    assert!(!f.result.ok);
    assert!(codes(&output).contains(&"E3001"), "{:?}", output.diagnostics);
}

#[test]
fn owned_element_reads_from_live_containers_conflict() {
    let output = compile(
        "# @depyler: ownership = \"owned\"
def head(rows: list[list[int]]) -> list[int]:
    first = rows[0]
    n = len(rows)
    first.append(n)
    return first
",
    );
    assert!(!output.function("head").unwrap().result.ok);
    assert_eq!(codes(&output), vec!["E4001"]);
}
