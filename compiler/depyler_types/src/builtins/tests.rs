use pretty_assertions::assert_eq;

use super::*;

#[test]
fn functions_resolve_by_exact_name() {
    let table = BuiltinTable::get();
    assert_eq!(table.function("len"), Some(Builtin::Len));
    assert_eq!(table.function("enumerate"), Some(Builtin::Enumerate));
    assert_eq!(table.function("parse"), None);
    assert_eq!(table.function("Len"), None);
}

#[test]
fn methods_depend_on_the_receiver() {
    let table = BuiltinTable::get();
    assert_eq!(table.method(Receiver::List, "pop"), Some(Method::Pop));
    assert_eq!(table.method(Receiver::Dict, "pop"), Some(Method::Pop));
    assert_eq!(table.method(Receiver::Str, "pop"), None);
    assert_eq!(table.method(Receiver::Str, "count"), Some(Method::Count));
    assert_eq!(table.method(Receiver::Set, "append"), None);
}

#[test]
fn math_members() {
    let table = BuiltinTable::get();
    assert_eq!(table.math("sqrt"), Some(MathMember::Sqrt));
    assert!(table.math("pi").is_some_and(MathMember::is_constant));
    assert_eq!(table.math("tau"), None);
}

#[test]
fn exceptions() {
    assert!(BuiltinTable::is_exception("ValueError"));
    assert!(!BuiltinTable::is_exception("Counter"));
}

#[test]
fn unique_receiver_only_for_unambiguous_methods() {
    let table = BuiltinTable::get();
    assert_eq!(table.unique_receiver("append"), Some(Receiver::List));
    assert_eq!(table.unique_receiver("items"), Some(Receiver::Dict));
    assert_eq!(table.unique_receiver("pop"), None);
    assert_eq!(table.unique_receiver("frobnicate"), None);
}

#[test]
fn mutating_methods() {
    assert!(Method::Append.mutates_receiver());
    assert!(Method::Discard.mutates_receiver());
    assert!(!Method::Get.mutates_receiver());
    assert!(!Method::Copy.mutates_receiver());
}
