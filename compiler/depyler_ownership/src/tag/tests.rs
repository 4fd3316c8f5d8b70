use pretty_assertions::assert_eq;

use super::*;

#[test]
fn modes_are_ordered_by_strength() {
    assert!(ParamMode::ByValue < ParamMode::Borrowed);
    assert!(ParamMode::Borrowed < ParamMode::BorrowedMut);
    assert!(ParamMode::BorrowedMut < ParamMode::Owned);
    assert_eq!(ParamMode::Borrowed.max(ParamMode::Owned), ParamMode::Owned);
}

#[test]
fn param_modes_map_to_tags() {
    assert_eq!(ParamMode::ByValue.tag(), OwnershipTag::Owned);
    assert_eq!(
        ParamMode::BorrowedMut.tag(),
        OwnershipTag::Borrowed {
            scope: BorrowScope::Caller,
            mutable: true
        }
    );
    assert!(ParamMode::Borrowed.is_borrow());
    assert!(!ParamMode::Owned.is_borrow());
}

#[test]
fn tags_display_for_debug_comments() {
    assert_eq!(OwnershipTag::Shared(SharedKind::Arc).to_string(), "shared (Arc)");
    assert_eq!(OwnershipTag::Arena { pool: PoolId(3) }.to_string(), "arena 3");
    assert_eq!(
        OwnershipTag::Borrowed {
            scope: BorrowScope::Arena(PoolId(3)),
            mutable: false
        }
        .to_string(),
        "borrowed from arena 3"
    );
}
