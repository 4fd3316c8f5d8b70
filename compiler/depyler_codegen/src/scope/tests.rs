use crate::test_support::lower_source;

#[test]
fn top_level_assignments_declare_inline() {
    let code = lower_source(
        "def area(w: int, h: int) -> int:
    a = w * h
    return a
",
    )
    .code("area");
    assert!(code.contains("let a: i64 = w * h;"), "{code}");
}

#[test]
fn reassigned_locals_are_mutable() {
    let code = lower_source(
        "def count(n: int) -> int:
    c = 0
    while c < n:
        c = c + 1
    return c
",
    )
    .code("count");
    assert!(code.contains("let mut c: i64 = 0;"), "{code}");
    assert!(code.contains("c = c + 1;"), "{code}");
}

#[test]
fn branch_bindings_are_hoisted_with_a_default() {
    let code = lower_source(
        "def sign(n: int) -> int:
    if n < 0:
        s = -1
    else:
        s = 1
    return s
",
    )
    .code("sign");
    let lines: Vec<&str> = code.lines().collect();
    assert_eq!(lines[1], "let mut s: i64 = 0;", "{code}");
    assert!(code.contains("s = -1;"), "{code}");
    assert!(code.contains("s = 1;"), "{code}");
    assert!(!code.contains("let s"), "{code}");
}

#[test]
fn hoisting_follows_first_binding_order() {
    let code = lower_source(
        "def pick(flag: bool) -> str:
    if flag:
        b = 1
        a = \"x\"
    else:
        b = 2
        a = \"y\"
    return a
",
    )
    .code("pick");
    let b = code.find("let mut b: i64").unwrap_or(usize::MAX);
    let a = code.find("let mut a: String").unwrap_or(usize::MAX);
    assert!(b < a && a != usize::MAX, "{code}");
}

#[test]
fn loop_targets_are_not_declared() {
    let code = lower_source(
        "def squares(n: int) -> int:
    t = 0
    for i in range(n):
        t += i * i
    return t
",
    )
    .code("squares");
    assert!(!code.contains("let i"), "{code}");
    assert!(!code.contains("let mut i"), "{code}");
    assert!(code.contains("for i in 0_i64..n {"), "{code}");
}

#[test]
fn tuple_targets_declare_together() {
    let code = lower_source(
        "def swap(a: int, b: int) -> int:
    x, y = b, a
    return x - y
",
    )
    .code("swap");
    assert!(code.contains("let (x, y): (i64, i64) = (b, a);"), "{code}");
}
