#![expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

use pretty_assertions::assert_eq;

use super::*;
use crate::IntKind;

const INT: RustType = RustType::Int(IntKind::I64);

#[test]
fn variables_bind_through_containers() {
    let mut u = Unifier::new();
    let elem = u.fresh();
    u.unify(&RustType::vec(elem.clone()), &RustType::vec(INT))
        .unwrap();
    assert_eq!(u.resolve(&elem), INT);
}

#[test]
fn occurs_check_rejects_infinite_types() {
    let mut u = Unifier::new();
    let var = u.fresh();
    assert!(u.unify(&var, &RustType::vec(var.clone())).is_err());
}

#[test]
fn unresolved_unifies_silently() {
    let mut u = Unifier::new();
    assert!(u.unify(&RustType::Unresolved, &RustType::Str).is_ok());
    assert_eq!(u.join(&RustType::Unresolved, &INT).unwrap(), INT);
    assert!(u.coerce(&RustType::Bool, &RustType::Unresolved).is_ok());
}

#[test]
fn join_allows_only_the_listed_widenings() {
    let mut u = Unifier::new();
    assert_eq!(u.join(&INT, &RustType::Float).unwrap(), RustType::Float);
    assert_eq!(u.join(&RustType::Char, &RustType::Str).unwrap(), RustType::Str);
    let none = RustType::option(u.fresh());
    assert_eq!(u.join(&none, &INT).unwrap(), RustType::option(INT));
    let err = u.join(&RustType::Str, &INT).unwrap_err();
    assert_eq!(err.expected, RustType::Str);
    assert_eq!(err.found, INT);
    assert!(u.join(&RustType::Bool, &INT).is_err());
}

#[test]
fn join_takes_the_wider_int() {
    let mut u = Unifier::new();
    assert_eq!(
        u.join(&RustType::Int(IntKind::I32), &RustType::Int(IntKind::I128))
            .unwrap(),
        RustType::Int(IntKind::I128)
    );
}

#[test]
fn join_reports_the_whole_container_on_element_conflict() {
    let mut u = Unifier::new();
    let a = RustType::hash_map(RustType::Str, RustType::Str);
    let b = RustType::hash_map(RustType::Str, INT);
    let err = u.join(&a, &b).unwrap_err();
    assert_eq!(err.expected, a);
    assert_eq!(err.found, b);
}

#[test]
fn coerce_widens_scalars_into_slots() {
    let mut u = Unifier::new();
    assert!(u.coerce(&INT, &RustType::Float).is_ok());
    assert!(u.coerce(&RustType::Char, &RustType::Str).is_ok());
    assert!(u.coerce(&INT, &RustType::option(INT)).is_ok());
    assert!(u.coerce(&RustType::Float, &INT).is_err());
    assert!(u.coerce(&RustType::Str, &RustType::Char).is_err());
}

#[test]
fn coerce_requires_exact_container_contents() {
    let mut u = Unifier::new();
    assert!(u
        .coerce(&RustType::vec(INT), &RustType::vec(RustType::Float))
        .is_err());
    assert!(u
        .coerce(&RustType::vec(INT), &RustType::vec(INT))
        .is_ok());
}

#[test]
fn finalize_replaces_unbound_variables() {
    let mut u = Unifier::new();
    let var = u.fresh();
    assert_eq!(
        u.finalize(&RustType::vec(var)),
        RustType::vec(RustType::Unresolved)
    );
}
