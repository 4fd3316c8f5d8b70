use crate::test_support::lower_source;

#[test]
fn elif_chains_stay_flat() {
    let code = lower_source(
        "def grade(n: int) -> str:
    if n >= 90:
        return \"A\"
    elif n >= 80:
        return \"B\"
    else:
        return \"C\"
",
    )
    .code("grade");
    assert!(code.contains("if n >= 90 {"), "{code}");
    assert!(code.contains("} else if n >= 80 {"), "{code}");
    assert!(code.contains("return \"A\".to_string();"), "{code}");
    assert!(!code.contains("unreachable!"), "{code}");
}

#[test]
fn while_true_becomes_loop() {
    let code = lower_source(
        "def first_square(limit: int) -> int:
    i = 1
    while True:
        if i * i > limit:
            break
        i += 1
    return i
",
    )
    .code("first_square");
    assert!(code.contains("loop {"), "{code}");
    assert!(code.contains("break;"), "{code}");
}

#[test]
fn asserts_carry_their_message() {
    let code = lower_source(
        "def check(n: int) -> None:
    assert n > 0
    assert n < 10, \"too big\"
",
    )
    .code("check");
    assert!(code.contains("assert!(n > 0);"), "{code}");
    assert!(code.contains("assert!(n < 10, \"too big\");"), "{code}");
}

#[test]
fn raise_panics_with_the_exception_name() {
    let code = lower_source(
        "def divide(a: int, b: int) -> int:
    if b == 0:
        raise ValueError(\"division by zero\")
    return a // b
",
    )
    .code("divide");
    assert!(
        code.contains("panic!(\"ValueError: division by zero\");"),
        "{code}"
    );
}

#[test]
fn augmented_string_concatenation_appends_in_place() {
    let code = lower_source(
        "def shout(s: str) -> str:
    out = \"\"
    for c in s:
        out += c
    out += \"!\"
    return out
",
    )
    .code("shout");
    assert!(code.contains("out.push(c);"), "{code}");
    assert!(code.contains("out.push_str(\"!\");"), "{code}");
}

#[test]
fn augmented_floor_division_uses_the_helper() {
    let lowered = lower_source(
        "def halve(n: int) -> int:
    n //= 2
    return n
",
    );
    let code = lowered.code("halve");
    assert!(code.contains("n = py_floor_div_i64(n, 2);"), "{code}");
    assert!(lowered.module.code.contains("fn py_floor_div_i64("));
}

#[test]
fn dict_item_assignment_inserts() {
    let code = lower_source(
        "def histogram(words: list[str]) -> dict[str, int]:
    counts: dict[str, int] = {}
    for w in words:
        counts[w] = counts.get(w, 0) + 1
    return counts
",
    )
    .code("histogram");
    assert!(code.contains("counts.insert("), "{code}");
    assert!(code.contains(".unwrap_or(0) + 1);"), "{code}");
}

#[test]
fn list_item_assignment_indexes() {
    let code = lower_source(
        "def zero_first(xs: list[int]) -> list[int]:
    xs[0] = 0
    return xs
",
    )
    .code("zero_first");
    assert!(code.contains("xs[0] = 0;"), "{code}");
}

#[test]
fn chained_assignment_evaluates_once() {
    let code = lower_source(
        "def twins() -> int:
    a = b = 3
    return a + b
",
    )
    .code("twins");
    assert!(code.contains("let _t0: i64 = 3;"), "{code}");
    assert!(code.contains("= _t0;"), "{code}");
}

#[test]
fn bare_calls_end_in_semicolons() {
    let code = lower_source(
        "def collect(xs: list[int]) -> list[int]:
    out: list[int] = []
    for x in xs:
        out.append(x)
    return out
",
    )
    .code("collect");
    assert!(code.contains("out.push(x);"), "{code}");
}

#[test]
fn debug_comments_name_the_python_line() {
    let lowered = crate::test_support::lower_source_with(
        "def inc(n: int) -> int:
    m = n + 1
    return m
",
        crate::CodegenOptions { debug: true },
    );
    let code = lowered.code("inc");
    assert!(code.contains("// line 2: m = n + 1"), "{code}");
    assert!(code.contains("// line 3: return m"), "{code}");
}
