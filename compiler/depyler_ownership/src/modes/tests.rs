use pretty_assertions::assert_eq;

use crate::test_support::resolve_source;
use crate::{ParamMode, ReceiverMode};

fn mode(source: &str, function: &str, param: &str) -> Option<ParamMode> {
    resolve_source(source)
        .modes
        .signature(function)
        .and_then(|s| s.mode(param))
}

#[test]
fn read_only_list_stays_borrowed() {
    let source = "def total(xs: list[int]) -> int:\n    s = 0\n    for x in xs:\n        s += x\n    return s\n";
    assert_eq!(mode(source, "total", "xs"), Some(ParamMode::Borrowed));
}

#[test]
fn scalars_pass_by_value() {
    let source = "def double(n: int) -> int:\n    return n * 2\n";
    assert_eq!(mode(source, "double", "n"), Some(ParamMode::ByValue));
}

#[test]
fn appending_needs_a_mutable_borrow() {
    let source = "def push(xs: list[int], x: int) -> None:\n    xs.append(x)\n";
    assert_eq!(mode(source, "push", "xs"), Some(ParamMode::BorrowedMut));
}

#[test]
fn returning_a_parameter_takes_ownership() {
    let source = "def same(s: str) -> str:\n    return s\n";
    assert_eq!(mode(source, "same", "s"), Some(ParamMode::Owned));
}

#[test]
fn rebinding_a_parameter_takes_ownership() {
    let source = "def shout(s: str) -> int:\n    s = s + \"!\"\n    return len(s)\n";
    assert_eq!(mode(source, "shout", "s"), Some(ParamMode::Owned));
}

#[test]
fn callers_follow_callees_in_any_order() {
    let source = "def outer(s: str) -> str:\n    return keep(s)\n\ndef keep(t: str) -> str:\n    return t\n";
    let resolved = resolve_source(source);
    let outer = resolved.modes.signature("outer").unwrap_or_else(|| panic!("outer"));
    assert_eq!(outer.mode("s"), Some(ParamMode::Owned));

    let source = "def peek(s: str) -> int:\n    return len(s)\n\ndef outer(s: str) -> int:\n    return peek(s)\n";
    assert_eq!(mode(source, "outer", "s"), Some(ParamMode::Borrowed));
}

#[test]
fn mutable_borrow_flows_to_callers() {
    let source = "def fill(xs: list[int], n: int) -> None:\n    if n > 0:\n        xs.append(n)\n        fill(xs, n - 1)\n\ndef start(ys: list[int]) -> None:\n    fill(ys, 3)\n";
    let resolved = resolve_source(source);
    let fill = resolved.modes.signature("fill").unwrap_or_else(|| panic!("fill"));
    assert_eq!(fill.mode("xs"), Some(ParamMode::BorrowedMut));
    let start = resolved.modes.signature("start").unwrap_or_else(|| panic!("start"));
    assert_eq!(start.mode("ys"), Some(ParamMode::BorrowedMut));
}

#[test]
fn recursion_alone_does_not_take_ownership() {
    let source = "def count(xs: list[int], i: int) -> int:\n    if i >= len(xs):\n        return 0\n    return 1 + count(xs, i + 1)\n";
    assert_eq!(mode(source, "count", "xs"), Some(ParamMode::Borrowed));
}

#[test]
fn borrowed_pragma_keeps_parameters_borrowed() {
    let source = "# @depyler: ownership = \"borrowed\"\ndef same(s: str) -> str:\n    return s\n";
    assert_eq!(mode(source, "same", "s"), Some(ParamMode::Borrowed));
}

#[test]
fn owned_pragma_takes_every_heap_parameter() {
    let source = "# @depyler: ownership = \"owned\"\ndef size(xs: list[int], n: int) -> int:\n    return len(xs) + n\n";
    let resolved = resolve_source(source);
    let sig = resolved.modes.signature("size").unwrap_or_else(|| panic!("size"));
    assert_eq!(sig.mode("xs"), Some(ParamMode::Owned));
    assert_eq!(sig.mode("n"), Some(ParamMode::ByValue));
}

#[test]
fn receivers_follow_what_methods_do_to_self() {
    let source = "class Counter:\n    def __init__(self, start: int):\n        self.count = start\n\n    def increment(self) -> None:\n        self.count += 1\n\n    def bump_twice(self) -> None:\n        self.increment()\n        self.increment()\n\n    def get(self) -> int:\n        return self.count\n\n    @staticmethod\n    def zero() -> int:\n        return 0\n";
    let resolved = resolve_source(source);
    let modes = &resolved.modes;
    assert_eq!(modes.receiver("Counter.increment"), Some(ReceiverMode::RefMut));
    assert_eq!(modes.receiver("Counter.bump_twice"), Some(ReceiverMode::RefMut));
    assert_eq!(modes.receiver("Counter.get"), Some(ReceiverMode::Ref));
    assert_eq!(modes.receiver("Counter.zero"), None);
    assert_eq!(modes.receiver("Counter.__init__"), None);
}
