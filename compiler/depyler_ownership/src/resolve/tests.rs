#![expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

use pretty_assertions::assert_eq;

use depyler_ir::ast::NodeId;

use crate::test_support::{resolve_source, Resolved};
use crate::{BorrowScope, OwnershipTag, ParamMode, PoolId, ReceiverMode, SharedKind};

/// Node ids of every site of `name`, in program order.
fn sites(resolved: &Resolved, key: &str, name: &str) -> Vec<NodeId> {
    resolved.uses(key).sites_of(name).map(|s| s.node).collect()
}

// Clones

#[test]
fn second_use_of_a_moved_value_clones_the_first() {
    let resolved = resolve_source(
        "def twice(word: str) -> list[str]:\n    out: list[str] = []\n    out.append(word)\n    out.append(word)\n    return out\n",
    );
    let map = resolved.map("twice");
    let word = sites(&resolved, "twice", "word");
    assert_eq!(word.len(), 2);
    assert!(map.needs_clone(word[0]));
    assert!(!map.needs_clone(word[1]));
    assert_eq!(map.clones.len(), 1);
}

#[test]
fn moving_inside_a_loop_clones() {
    let resolved = resolve_source(
        "def repeat(word: str, n: int) -> list[str]:\n    out: list[str] = []\n    for _ in range(n):\n        out.append(word)\n    return out\n",
    );
    let map = resolved.map("repeat");
    let word = sites(&resolved, "repeat", "word");
    assert!(map.needs_clone(word[0]));
}

#[test]
fn a_single_move_does_not_clone() {
    let resolved = resolve_source("def keep(s: str) -> str:\n    t = s\n    return t\n");
    let map = resolved.map("keep");
    assert!(map.clones.is_empty());
    assert_eq!(map.param("s").unwrap().mode, ParamMode::Owned);
}

#[test]
fn taking_an_element_clones_it() {
    let resolved = resolve_source("def first(names: list[str]) -> str:\n    return names[0]\n");
    let map = resolved.map("first");
    assert_eq!(map.clones.len(), 1);
    assert_eq!(map.param("names").unwrap().mode, ParamMode::Borrowed);
    assert!(map.is_borrowed_param("names"));
}

#[test]
fn returning_a_borrowed_parameter_copies_it_out() {
    let resolved = resolve_source(
        "# @depyler: ownership = \"borrowed\"\ndef same(s: str) -> str:\n    return s\n",
    );
    let map = resolved.map("same");
    let s = sites(&resolved, "same", "s");
    assert!(map.needs_clone(s[0]));
    assert!(resolved.conflicts("same").is_empty());
}

#[test]
fn reassigned_borrowed_parameter_is_copied_on_entry() {
    let resolved = resolve_source(
        "# @depyler: ownership = \"borrowed\"\ndef shout(s: str) -> str:\n    s = s + \"!\"\n    return s\n",
    );
    let map = resolved.map("shout");
    assert_eq!(map.param("s").unwrap().mode, ParamMode::Borrowed);
    assert!(map.copied_params.contains("s"));
    assert!(map.is_mutable("s"));
    assert!(!map.is_borrowed_param("s"));
    assert!(map.clones.is_empty());
}

// Mutability

#[test]
fn only_reassigned_or_changed_bindings_are_mut() {
    let resolved = resolve_source(
        "def total(xs: list[int]) -> int:\n    t = 0\n    seen: list[int] = []\n    for x in xs:\n        t += x\n        seen.append(x)\n    label = \"done\"\n    return t + len(seen) + len(label)\n",
    );
    let map = resolved.map("total");
    assert!(map.is_mutable("t"));
    assert!(map.is_mutable("seen"));
    assert!(!map.is_mutable("x"));
    assert!(!map.is_mutable("label"));
    assert!(!map.is_mutable("xs"));
}

#[test]
fn mutable_borrow_parameters_are_not_mut_bindings() {
    let resolved = resolve_source("def push(xs: list[int]) -> None:\n    xs.append(1)\n");
    let map = resolved.map("push");
    assert_eq!(map.param("xs").unwrap().mode, ParamMode::BorrowedMut);
    assert!(!map.is_mutable("xs"));
}

// Owned

#[test]
fn owned_pragma_rejects_a_second_owner() {
    let resolved = resolve_source(
        "# @depyler: ownership = \"owned\"\ndef twice(word: str) -> list[str]:\n    out: list[str] = []\n    out.append(word)\n    out.append(word)\n    return out\n",
    );
    assert_eq!(
        resolved.conflicts("twice"),
        vec!["`word` is moved here but used again afterwards"]
    );
}

#[test]
fn owned_pragma_rejects_element_reads_from_live_containers() {
    let resolved = resolve_source(
        "# @depyler: ownership = \"owned\"\ndef head(rows: list[list[int]]) -> list[int]:\n    first = rows[0]\n    n = len(rows)\n    first.append(n)\n    return first\n",
    );
    assert_eq!(
        resolved.conflicts("head"),
        vec!["an element of `rows` is read out while `rows` is still in use"]
    );
}

#[test]
fn owned_pragma_allows_element_reads_from_dead_containers() {
    let resolved = resolve_source(
        "# @depyler: ownership = \"owned\"\ndef head(rows: list[list[int]]) -> list[int]:\n    first = rows[0]\n    return first\n",
    );
    assert!(resolved.conflicts("head").is_empty());
}

#[test]
fn owned_class_with_scalar_state_resolves_cleanly() {
    let resolved = resolve_source(
        "# @depyler: ownership = \"owned\"\nclass Counter:\n    def __init__(self, start: int):\n        self.count = start\n\n    def increment(self) -> None:\n        self.count += 1\n\n    def get(self) -> int:\n        return self.count\n",
    );
    for key in ["Counter.__init__", "Counter.increment", "Counter.get"] {
        assert!(resolved.conflicts(key).is_empty(), "{key}");
    }
    assert_eq!(resolved.map("Counter.increment").receiver, Some(ReceiverMode::RefMut));
    assert_eq!(resolved.map("Counter.get").receiver, Some(ReceiverMode::Ref));
    assert!(resolved.map("Counter.__init__").escapes.contains("self.count"));
}

#[test]
fn owned_class_cannot_hand_out_its_fields() {
    let resolved = resolve_source(
        "# @depyler: ownership = \"owned\"\nclass Bag:\n    def __init__(self, items: list[str]):\n        self.items = items\n\n    def contents(self) -> list[str]:\n        return self.items\n",
    );
    assert!(resolved.conflicts("Bag.__init__").is_empty());
    assert_eq!(
        resolved.conflicts("Bag.contents"),
        vec!["`self.items` would be owned by both `self` and this value"]
    );
}

// Shared

const SHARED_PAIR: &str = "def pair(word: str) -> list[str]:\n    w = word + \"!\"\n    out: list[str] = []\n    out.append(w)\n    out.append(w)\n    return out\n";

#[test]
fn shared_pragma_turns_repeated_moves_into_rc() {
    let source = format!("# @depyler: ownership = \"shared\"\n{SHARED_PAIR}");
    let resolved = resolve_source(&source);
    let map = resolved.map("pair");
    assert_eq!(map.shared_kind("w"), Some(SharedKind::Rc));
    assert_eq!(map.tag("w"), Some(OwnershipTag::Shared(SharedKind::Rc)));
    assert_eq!(map.shared_kind("out"), None);
    assert!(resolved.conflicts("pair").is_empty());
}

#[test]
fn thread_safety_selects_arc() {
    let source = format!(
        "# @depyler: ownership = \"shared\"\n# @depyler: thread_safety = \"required\"\n{SHARED_PAIR}"
    );
    let resolved = resolve_source(&source);
    assert_eq!(resolved.map("pair").shared_kind("w"), Some(SharedKind::Arc));
}

#[test]
fn mutating_a_shared_value_is_a_conflict() {
    let resolved = resolve_source(
        "# @depyler: ownership = \"shared\"\ndef grow() -> list[int]:\n    xs: list[int] = []\n    ys = xs\n    xs.append(1)\n    return ys\n",
    );
    let map = resolved.map("grow");
    assert_eq!(map.shared_kind("xs"), Some(SharedKind::Rc));
    assert_eq!(map.shared_kind("ys"), Some(SharedKind::Rc));
    assert_eq!(resolved.conflicts("grow"), vec!["shared value `xs` is mutated"]);
}

#[test]
fn shared_method_in_owned_class_is_a_conflict() {
    let resolved = resolve_source(
        "# @depyler: ownership = \"owned\"\nclass Box:\n    def __init__(self, v: int):\n        self.v = v\n\n    # @depyler: ownership = \"shared\"\n    def get(self) -> int:\n        return self.v\n",
    );
    assert!(resolved.conflicts("Box.__init__").is_empty());
    assert_eq!(
        resolved.conflicts("Box.get"),
        vec!["method asks for shared ownership inside an owned class"]
    );
}

// Memory strategies

#[test]
fn arena_allocations_and_their_aliases() {
    let resolved = resolve_source(
        "# @depyler: memory_strategy = \"arena\"\ndef build(n: int) -> int:\n    xs: list[int] = []\n    for i in range(n):\n        xs.append(i)\n    view = xs\n    return len(view)\n",
    );
    let map = resolved.map("build");
    assert_eq!(map.tag("xs"), Some(OwnershipTag::Arena { pool: PoolId(0) }));
    assert_eq!(
        map.tag("view"),
        Some(OwnershipTag::Borrowed {
            scope: BorrowScope::Arena(PoolId(0)),
            mutable: false
        })
    );
    assert!(map.clones.is_empty());
    assert!(resolved.conflicts("build").is_empty());
}

#[test]
fn returned_arena_allocation_is_owned() {
    let resolved = resolve_source(
        "# @depyler: memory_strategy = \"arena\"\ndef make() -> list[int]:\n    xs = [1, 2]\n    return xs\n",
    );
    assert_eq!(resolved.map("make").tag("xs"), Some(OwnershipTag::Owned));
    assert!(resolved.conflicts("make").is_empty());
}

#[test]
fn escaping_arena_alias_is_a_conflict() {
    let resolved = resolve_source(
        "# @depyler: memory_strategy = \"arena\"\ndef leak() -> list[int]:\n    xs = [1, 2]\n    ys = xs\n    return ys\n",
    );
    assert_eq!(
        resolved.conflicts("leak"),
        vec!["`ys` borrows arena memory and escapes"]
    );
}

#[test]
fn read_only_scalar_lists_go_on_the_stack() {
    let resolved = resolve_source(
        "# @depyler: memory_strategy = \"stack\"\ndef weights() -> int:\n    w = [1, 2, 3]\n    v = [4, 5]\n    v.append(6)\n    total = 0\n    for x in w:\n        total += x\n    return total + w[0] + len(v)\n",
    );
    let map = resolved.map("weights");
    assert_eq!(map.stack_arrays.get("w"), Some(&3));
    assert!(!map.stack_arrays.contains_key("v"));
    assert!(!map.is_mutable("w"));
}

#[test]
fn values_stored_on_self_escape() {
    let resolved = resolve_source(
        "class P:\n    def __init__(self, name: str):\n        label = name + \"!\"\n        self.name = label\n",
    );
    let map = resolved.map("P.__init__");
    assert!(map.escapes.contains("self.name"));
    assert!(map.escapes.contains("label"));
    assert_eq!(map.param("name").unwrap().mode, ParamMode::Borrowed);
}

#[test]
fn read_only_loop_targets_borrow() {
    let resolved = resolve_source(
        "def count(words: list[str]) -> int:\n    n = 0\n    for w in words:\n        n += len(w)\n    return n\n\ndef keep(words: list[str]) -> list[str]:\n    out = []\n    for w in words:\n        out.append(w)\n    return out\n",
    );
    assert!(resolved.map("count").is_loop_borrow("w"));
    assert!(!resolved.map("keep").is_loop_borrow("w"));
}
