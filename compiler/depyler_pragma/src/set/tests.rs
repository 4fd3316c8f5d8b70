use pretty_assertions::assert_eq;

use super::*;

#[test]
fn defaults_apply_when_unset() {
    let set = PragmaSet::default();
    assert!(set.is_empty());
    assert_eq!(set.ownership(), None);
    assert_eq!(set.memory_strategy(), MemoryStrategy::Heap);
    assert_eq!(set.optimization_level(), OptimizationLevel::Standard);
    assert_eq!(set.bounds_checking(), BoundsChecking::Implicit);
    assert_eq!(set.container_typing(), ContainerTyping::Static);
    assert_eq!(set.thread_safety(), ThreadSafety::NotRequired);
}

#[test]
fn method_entries_override_class_entries() {
    let class = PragmaSet {
        ownership: Some(Ownership::Owned),
        bounds_checking: Some(BoundsChecking::Explicit),
        ..PragmaSet::default()
    };
    let method = PragmaSet {
        ownership: Some(Ownership::Shared),
        ..PragmaSet::default()
    };
    let effective = method.inherit(&class);
    assert_eq!(effective.ownership, Some(Ownership::Shared));
    assert_eq!(effective.bounds_checking(), BoundsChecking::Explicit);
}

#[test]
fn set_rejects_invalid_values() {
    let mut set = PragmaSet::default();
    assert!(set.set("memory_strategy", "stack"));
    assert!(!set.set("memory_strategy", "gc"));
    assert!(!set.set("nonsense", "stack"));
    assert_eq!(set.memory_strategy(), MemoryStrategy::Stack);
}

#[test]
fn entries_list_only_explicit_options() {
    let mut set = PragmaSet::default();
    set.set("thread_safety", "required");
    set.set("ownership", "borrowed");
    assert_eq!(
        set.entries(),
        vec![("ownership", "borrowed"), ("thread_safety", "required")]
    );
}
