#![expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

use pretty_assertions::assert_eq;

use crate::test_support::resolve_source;
use crate::uses::{BindValue, Position, SinkTarget, Subject};

fn positions<'a>(uses: &'a crate::FunctionUses, name: &'a str) -> Vec<&'a Position> {
    uses.sites_of(name).map(|s| &s.position).collect()
}

#[test]
fn conditions_only_read() {
    let resolved = resolve_source(
        "def check(xs: list[int], ys: list[int]) -> bool:\n    if xs and not ys:\n        return True\n    return False\n",
    );
    let uses = resolved.uses("check");
    assert_eq!(positions(uses, "xs"), vec![&Position::Read]);
    assert_eq!(positions(uses, "ys"), vec![&Position::Read]);
}

#[test]
fn append_moves_into_the_receiver() {
    let resolved = resolve_source(
        "def wrap(word: str) -> list[str]:\n    out: list[str] = []\n    out.append(word)\n    return out\n",
    );
    let uses = resolved.uses("wrap");
    assert_eq!(
        positions(uses, "word"),
        vec![&Position::Consume(smallvec::smallvec![SinkTarget::Local("out".into())])]
    );
    assert_eq!(
        positions(uses, "out"),
        vec![
            &Position::Mutate,
            &Position::Consume(smallvec::smallvec![SinkTarget::Return])
        ]
    );
}

#[test]
fn conditional_expression_moves_both_branches() {
    let resolved = resolve_source(
        "def pick(a: str, b: str, flag: bool) -> str:\n    c = a if flag else b\n    return c\n",
    );
    let uses = resolved.uses("pick");
    let into_c = Position::Consume(smallvec::smallvec![SinkTarget::Local("c".into())]);
    assert_eq!(positions(uses, "a"), vec![&into_c]);
    assert_eq!(positions(uses, "b"), vec![&into_c]);
    assert_eq!(positions(uses, "flag"), vec![&Position::Read]);
}

#[test]
fn bindings_are_classified() {
    let resolved = resolve_source(
        "def f(n: int) -> int:\n    xs = [1, 2, 3]\n    ys = xs\n    names: dict[str, int] = {}\n    total = 0\n    for i in range(n):\n        total += i\n    sq = [k * k for k in xs]\n    return total + len(ys) + len(names) + len(sq)\n",
    );
    let uses = resolved.uses("f");
    let value_of = |name: &str| uses.binds_of(name).next().unwrap().value.clone();
    assert_eq!(value_of("xs"), BindValue::Allocation { scalar_len: Some(3) });
    assert_eq!(value_of("ys"), BindValue::Alias("xs".into()));
    assert_eq!(value_of("names"), BindValue::Allocation { scalar_len: None });
    assert_eq!(value_of("i"), BindValue::LoopTarget);
    assert_eq!(value_of("k"), BindValue::ComprehensionTarget);
    assert_eq!(value_of("sq"), BindValue::Allocation { scalar_len: None });
    assert_eq!(uses.binds_of("total").count(), 2);
}

#[test]
fn loop_bodies_record_their_loop() {
    let resolved = resolve_source(
        "def f(xs: list[str]) -> int:\n    count = 0\n    for x in xs:\n        count += len(x)\n    return count\n",
    );
    let uses = resolved.uses("f");
    let x_site = uses.sites_of("x").next().unwrap();
    assert_eq!(x_site.loops.len(), 1);
    let first = uses.binds_of("count").next().unwrap();
    assert!(first.loops.is_empty());
}

#[test]
fn init_fields_bind_and_methods_touch_self() {
    let resolved = resolve_source(
        "class Stack:\n    def __init__(self, items: list[int]):\n        self.items = items\n        self.size = len(items)\n    def push(self, x: int) -> None:\n        self.items.append(x)\n    def peek(self) -> int:\n        return self.items[-1]\n",
    );
    let init = resolved.uses("Stack.__init__");
    assert!(init.is_init);
    assert!(!init.has_receiver);
    assert_eq!(init.params.len(), 1);
    assert_eq!(init.binds_of("self.items").count(), 1);
    assert_eq!(init.binds_of("self.size").count(), 1);

    let push = resolved.uses("Stack.push");
    assert!(push.has_receiver);
    assert!(push
        .sites
        .iter()
        .any(|s| s.subject == Subject::SelfField("items".into()) && s.position == Position::Mutate));

    let peek = resolved.uses("Stack.peek");
    assert!(peek
        .sites
        .iter()
        .any(|s| matches!(s.subject, Subject::Element(_)) && s.position.returns()));
}

#[test]
fn user_calls_defer_to_the_callee() {
    let resolved = resolve_source(
        "def size(xs: list[int]) -> int:\n    return len(xs)\n\ndef outer(ys: list[int]) -> int:\n    return size(ys)\n",
    );
    let uses = resolved.uses("outer");
    assert_eq!(
        positions(uses, "ys"),
        vec![&Position::Arg {
            callee: "size".into(),
            slot: crate::ArgSlot::Index(0)
        }]
    );
}
