use pretty_assertions::assert_eq;

use super::doc_lines;
use crate::test_support::{lower_source, rust_of};

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
";

#[test]
fn counter_fields_become_a_struct() {
    let rust = rust_of(COUNTER);
    assert!(rust.contains("/// Counts up and down.\n#[derive(Debug, Clone, PartialEq)]\npub struct Counter {"), "{rust}");
    assert!(rust.contains("    pub value: i64,\n    pub step: i64,\n    pub ops: i64,\n"), "{rust}");
}

#[test]
fn storing_init_builds_one_literal() {
    let code = lower_source(COUNTER).code("Counter.__init__");
    assert!(code.contains("pub fn new(start: i64, step: i64) -> Self {"), "{code}");
    assert!(code.contains("Self {\nvalue: start,\nstep,\nops: 0,\n}"), "{code}");
}

#[test]
fn mutating_methods_take_mut_self() {
    let lowered = lower_source(COUNTER);
    for name in ["increment", "decrement", "reset"] {
        let code = lowered.code(&format!("Counter.{name}"));
        assert!(code.contains(&format!("pub fn {name}(&mut self) {{")), "{code}");
    }
    let current = lowered.code("Counter.current");
    assert!(current.contains("pub fn current(&self) -> i64 {"), "{current}");
    assert!(current.contains("self.value"), "{current}");
}

#[test]
fn methods_sit_in_one_impl_block() {
    let rust = rust_of(COUNTER);
    assert_eq!(rust.matches("impl Counter {").count(), 1);
    let new = rust.find("pub fn new(").unwrap_or(usize::MAX);
    let increment = rust.find("pub fn increment(").unwrap_or(0);
    assert!(new < increment, "{rust}");
}

#[test]
fn init_with_logic_builds_the_struct_at_the_end() {
    let code = lower_source(
        "class Account:
    def __init__(self, owner: str, deposit: int):
        self.owner = owner
        self.balance = 0
        if deposit > 0:
            self.balance = deposit
",
    )
    .code("Account.__init__");
    assert!(code.contains("let mut self_balance: i64 = 0;"), "{code}");
    assert!(code.contains("self_balance = deposit;"), "{code}");
    assert!(code.contains("Self { owner: self_owner, balance: self_balance }"), "{code}");
}

#[test]
fn dataclasses_get_a_generated_constructor() {
    let rust = rust_of(
        "from dataclasses import dataclass

@dataclass
class Point:
    x: float
    y: float
    label: str = \"origin\"
",
    );
    assert!(rust.contains("pub struct Point {"), "{rust}");
    assert!(rust.contains("pub fn new(x: f64, y: f64, label: String) -> Self {"), "{rust}");
    assert!(rust.contains("Self { x, y, label }"), "{rust}");
}

#[test]
fn constructing_fills_in_defaults() {
    let code = lower_source(
        "from dataclasses import dataclass

@dataclass
class Point:
    x: float
    y: float
    label: str = \"origin\"

def origin() -> Point:
    return Point(0.0, 0.0)
",
    )
    .code("origin");
    assert!(code.contains("Point::new(0.0, 0.0, \"origin\".to_string())"), "{code}");
}

#[test]
fn static_methods_have_no_receiver() {
    let lowered = lower_source(
        "class Temperature:
    def __init__(self, celsius: float):
        self.celsius = celsius

    @staticmethod
    def from_fahrenheit(f: float) -> float:
        return (f - 32.0) * 5.0 / 9.0
",
    );
    let code = lowered.code("Temperature.from_fahrenheit");
    assert!(code.contains("pub fn from_fahrenheit(f: f64) -> f64 {"), "{code}");
}

#[test]
fn empty_classes_are_unit_like_structs() {
    let rust = rust_of(
        "class Marker:
    pass
",
    );
    assert!(rust.contains("pub struct Marker {}"), "{rust}");
    assert!(rust.contains("Self {}"), "{rust}");
}

#[test]
fn docstrings_become_doc_lines() {
    assert_eq!(
        doc_lines("Summary.\n\n    Details here.\n"),
        vec!["/// Summary.", "///", "/// Details here."]
    );
}
