//! End-to-end tests of the `depyler` binary.

#![expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use pretty_assertions::assert_eq;
use tempfile::TempDir;

const COUNTER: &str = "# @depyler: ownership = \"owned\"
class Counter:
    \"\"\"Counts up and down.\"\"\"

    def __init__(self, start: int, step: int):
        self.value = start
        self.step = step
        self.ops = 0

    def increment(self) -> None:
        self.value += self.step
        self.ops += 1

    def decrement(self) -> None:
        self.value -= self.step
        self.ops += 1

    def reset(self) -> None:
        self.value = 0
        self.ops += 1

    def current(self) -> int:
        return self.value


def run() -> int:
    c = Counter(0, 10)
    c.increment()
    c.increment()
    c.decrement()
    return c.current()
";

const MIXED: &str = "def good(n: int) -> int:
    return n + 1


def bad(obj: int) -> int:
    return getattr(obj, \"x\")
";

fn depyler(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_depyler"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

fn write_source(dir: &TempDir, name: &str, source: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, source).unwrap();
    path
}

fn arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn counter_transpiles_to_a_struct_with_methods() {
    let dir = TempDir::new().unwrap();
    let input = write_source(&dir, "counter.py", COUNTER);

    let out = depyler(&["transpile", arg(&input)]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let rust = fs::read_to_string(dir.path().join("counter.rs")).unwrap();
    assert!(rust.contains("pub struct Counter {"), "{rust}");
    assert!(rust.contains("pub value: i64,"), "{rust}");
    assert!(rust.contains("pub ops: i64,"), "{rust}");
    for method in ["increment", "decrement", "reset"] {
        assert!(rust.contains(&format!("pub fn {method}(&mut self) {{")), "{rust}");
    }
    assert!(rust.contains("pub fn current(&self) -> i64 {"), "{rust}");
    assert!(rust.contains("Counter::new(0, 10)"), "{rust}");
}

#[test]
fn failing_functions_exit_non_zero_but_keep_their_siblings() {
    let dir = TempDir::new().unwrap();
    let input = write_source(&dir, "mixed.py", MIXED);
    let output = dir.path().join("lib.rs");

    let out = depyler(&["transpile", arg(&input), "-o", arg(&output), "--color=never"]);
    assert!(!out.status.success());

    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("error[E2001]"), "{stderr}");
    assert!(stderr.contains("mixed.py:6:12"), "{stderr}");
    assert!(stderr.contains("^"), "{stderr}");

    let rust = fs::read_to_string(&output).unwrap();
    assert!(rust.contains("pub fn good(n: i64) -> i64 {"), "{rust}");
    assert!(!rust.contains("fn bad"), "{rust}");
}

#[test]
fn json_diagnostics_go_to_stdout() {
    let dir = TempDir::new().unwrap();
    let input = write_source(&dir, "mixed.py", MIXED);

    let out = depyler(&["transpile", arg(&input), "--format=json"]);
    assert!(!out.status.success());

    let report: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    let entries = report.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["code"], "E2001");
    assert_eq!(entries[0]["line"], 6);
}

#[test]
fn source_maps_are_written_next_to_the_output() {
    let dir = TempDir::new().unwrap();
    let input = write_source(&dir, "add.py", "def add(a: int, b: int) -> int:\n    c = a + b\n    return c\n");

    let out = depyler(&["transpile", arg(&input), "--source-map"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let rust = fs::read_to_string(dir.path().join("add.rs")).unwrap();
    let map: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("add.sourcemap.json")).unwrap())
            .unwrap();
    assert_eq!(map["source"], arg(&input));

    let lines: Vec<&str> = rust.lines().collect();
    let mappings = map["mappings"].as_array().unwrap();
    let body = mappings
        .iter()
        .find(|m| m["python_line"] == 2)
        .and_then(|m| m["rust_line"].as_u64())
        .unwrap();
    let body = usize::try_from(body).unwrap();
    assert_eq!(lines[body - 1].trim(), "let c: i64 = a + b;");
}

#[test]
fn several_files_go_into_the_output_directory() {
    let dir = TempDir::new().unwrap();
    let a = write_source(&dir, "a.py", "def one() -> int:\n    return 1\n");
    let b = write_source(&dir, "b.py", "def two() -> int:\n    return 2\n");
    let out_dir = dir.path().join("out");

    let out = depyler(&["transpile", arg(&a), arg(&b), "-o", arg(&out_dir), "--jobs=2"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    assert!(fs::read_to_string(out_dir.join("a.rs")).unwrap().contains("pub fn one() -> i64 {"));
    assert!(fs::read_to_string(out_dir.join("b.rs")).unwrap().contains("pub fn two() -> i64 {"));
}

#[test]
fn debug_flag_comments_python_lines() {
    let dir = TempDir::new().unwrap();
    let input = write_source(&dir, "m.py", "def f(n: int) -> int:\n    m = n + 1\n    return m\n");

    let out = depyler(&["transpile", arg(&input), "--debug"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let rust = fs::read_to_string(dir.path().join("m.rs")).unwrap();
    assert!(rust.contains("// line 2: m = n + 1"), "{rust}");
}

#[test]
fn unreadable_inputs_are_reported() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("missing.py");

    let out = depyler(&["transpile", arg(&missing)]);
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("cannot find file"), "{stderr}");
}

#[test]
fn bad_flags_print_usage() {
    let out = depyler(&["transpile", "m.py", "--format=xml"]);
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("unknown format 'xml'"), "{stderr}");
}
