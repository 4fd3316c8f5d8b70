use depyler_diagnostic::DiagnosticKind;
use pretty_assertions::assert_eq;

use super::*;
use crate::test_support::{first_function, pragmas_of};

fn kind_of(source: &str) -> (IntKind, Vec<Diagnostic>) {
    let function = first_function(source);
    select_int_kind(&function, &pragmas_of(&function))
}

#[test]
fn defaults_to_i64() {
    let (kind, diags) = kind_of("def f(x: int) -> int:\n    return x * 2\n");
    assert_eq!(kind, IntKind::I64);
    assert!(diags.is_empty());
}

#[test]
fn large_literal_selects_i128() {
    let (kind, _) = kind_of("def f() -> int:\n    return 170141183460469231731687303715884105727\n");
    assert_eq!(kind, IntKind::I128);
}

#[test]
fn literal_beyond_i128_is_unsupported() {
    let (_, diags) = kind_of("def f() -> int:\n    return 999999999999999999999999999999999999999999\n");
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].kind, DiagnosticKind::UnsupportedConstruct);
}

#[test]
fn aggressive_narrows_to_i32_when_literals_fit() {
    let source = "# @depyler: optimization_level = \"aggressive\"\ndef f(x: int) -> int:\n    return x * 3\n";
    assert_eq!(kind_of(source).0, IntKind::I32);

    let wide = "# @depyler: optimization_level = \"aggressive\"\ndef f(x: int) -> int:\n    return x * 3000000000\n";
    assert_eq!(kind_of(wide).0, IntKind::I64);
}

#[test]
fn default_values_count_as_literals() {
    let (kind, _) = kind_of("def f(x: int = 10000000000000000000) -> int:\n    return x\n");
    assert_eq!(kind, IntKind::I128);
}

proptest::proptest! {
    #[test]
    fn width_follows_the_widest_literal(
        small in 0_i128..=i128::from(i64::MAX),
        large in (i128::from(i64::MAX) + 1)..=i128::MAX,
        both in proptest::bool::ANY,
    ) {
        let source = if both {
            format!("def f(x: int) -> int:\n    if x > {small}:\n        return {large}\n    return x\n")
        } else {
            format!("def f(x: int) -> int:\n    return x + {small}\n")
        };
        let (kind, diags) = kind_of(&source);
        proptest::prop_assert!(diags.is_empty());
        proptest::prop_assert_eq!(kind, if both { IntKind::I128 } else { IntKind::I64 });
    }
}
