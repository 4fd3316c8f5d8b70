use crate::test_support::lower_source;

#[test]
fn iterating_a_borrowed_list_copies_its_items() {
    let lowered = lower_source(
        "def total(xs: list[int]) -> int:
    result = 0
    for x in xs:
        result += x
    return result
",
    );
    let code = lowered.code("total");
    assert!(code.contains("pub fn total(xs: &[i64]) -> i64 {"), "{code}");
    assert!(code.contains("for x in xs.iter().copied() {"), "{code}");
    assert!(code.contains("result += x;"), "{code}");
}

#[test]
fn strings_iterate_by_char() {
    let code = lower_source(
        "def vowels(s: str) -> int:
    n = 0
    for c in s:
        if c == \"a\":
            n += 1
    return n
",
    )
    .code("vowels");
    assert!(code.contains(".chars() {"), "{code}");
    assert!(!code.contains("as_bytes"), "{code}");
}

#[test]
fn ranges_with_literal_steps_use_std_ranges() {
    let code = lower_source(
        "def sums(n: int) -> int:
    a = 0
    for i in range(n):
        a += i
    for j in range(0, n, 2):
        a += j
    for k in range(10, 0, -1):
        a += k
    return a
",
    )
    .code("sums");
    assert!(code.contains("for i in 0_i64..n {"), "{code}");
    assert!(code.contains("for j in (0_i64..n).step_by(2) {"), "{code}");
    assert!(code.contains("for k in (0_i64 + 1..=10_i64).rev() {"), "{code}");
}

#[test]
fn computed_steps_go_through_the_range_helper() {
    let lowered = lower_source(
        "def stepped(n: int, s: int) -> int:
    a = 0
    for i in range(0, n, s):
        a += i
    return a
",
    );
    let code = lowered.code("stepped");
    assert!(code.contains("py_range_i64(0_i64, n, s).into_iter()"), "{code}");
    assert!(lowered.module.code.contains("fn py_range_i64("));
}

#[test]
fn enumerate_zips_a_counter() {
    let code = lower_source(
        "def weighted(xs: list[int]) -> int:
    total = 0
    for i, x in enumerate(xs):
        total += i * x
    return total
",
    )
    .code("weighted");
    assert!(
        code.contains("for (i, x) in (0_i64..).zip(xs.iter().copied()) {"),
        "{code}"
    );
}

#[test]
fn zip_and_reversed_chain_iterators() {
    let code = lower_source(
        "def dot(xs: list[int], ys: list[int]) -> int:
    total = 0
    for x, y in zip(xs, ys):
        total += x * y
    for z in reversed(xs):
        total += z
    return total
",
    )
    .code("dot");
    assert!(
        code.contains("for (x, y) in xs.iter().copied().zip(ys.iter().copied()) {"),
        "{code}"
    );
    assert!(code.contains("for z in xs.iter().copied().rev() {"), "{code}");
}

#[test]
fn list_comprehensions_map_and_filter() {
    let lowered = lower_source(
        "def doubled(xs: list[int]) -> list[int]:
    return [x * 2 for x in xs]

def positive(xs: list[int]) -> list[int]:
    return [x for x in xs if x > 0]
",
    );
    let doubled = lowered.code("doubled");
    assert!(
        doubled.contains("xs.iter().copied().map(|x| x * 2).collect::<Vec<_>>()"),
        "{doubled}"
    );
    let positive = lowered.code("positive");
    assert!(
        positive.contains(".filter_map(|x| (x > 0).then(|| x)).collect::<Vec<_>>()"),
        "{positive}"
    );
}

#[test]
fn set_comprehensions_import_hash_set() {
    let lowered = lower_source(
        "def unique(xs: list[int]) -> set[int]:
    return {x for x in xs}
",
    );
    let code = lowered.code("unique");
    assert!(code.contains(".collect::<IndexSet<_>>()"), "{code}");
    assert!(lowered.module.code.contains("use indexmap::IndexSet;"));
}

#[test]
fn nested_generators_build_an_accumulator() {
    let code = lower_source(
        "def pairs(n: int) -> list[int]:
    return [i * j for i in range(n) for j in range(i)]
",
    )
    .code("pairs");
    assert!(code.contains("let mut _t0: Vec<i64> = Vec::new();"), "{code}");
    assert!(code.contains("for i in 0_i64..n {"), "{code}");
    assert!(code.contains("_t0.push(i * j);"), "{code}");
}

#[test]
fn a_loop_target_read_after_the_loop_is_a_declared_local() {
    let code = lower_source(
        "def last(xs: list[int]) -> int:
    x = 0
    for x in xs:
        pass
    return x
",
    )
    .code("last");
    assert!(code.contains("for _t0 in xs.iter().copied() {"), "{code}");
    assert!(code.contains("x = _t0;"), "{code}");
}

#[test]
fn dict_items_iterate_as_pairs() {
    let code = lower_source(
        "def total(d: dict[str, int]) -> int:
    t = 0
    for k, v in d.items():
        t += v
    return t
",
    )
    .code("total");
    assert!(code.contains("d.iter().map(|(k, v)| (k.clone(), *v))"), "{code}");
}

#[test]
fn read_only_targets_borrow_their_items() {
    let code = lower_source(
        "def count_long(words: list[str], rows: list[list[int]]) -> int:
    n = 0
    for w in words:
        if len(w) > 3:
            n += 1
    for row in rows:
        n += 1
    return n
",
    )
    .code("count_long");
    assert!(code.contains("for w in words.iter().map(String::as_str) {"), "{code}");
    assert!(code.contains("for row in rows.iter().map(Vec::as_slice) {"), "{code}");
    assert!(!code.contains("cloned()"), "{code}");
}

#[test]
fn moved_targets_still_clone_their_items() {
    let code = lower_source(
        "def keep(words: list[str]) -> list[str]:
    out = []
    for w in words:
        out.append(w)
    return out
",
    )
    .code("keep");
    assert!(code.contains("for w in words.iter().cloned() {"), "{code}");
}
