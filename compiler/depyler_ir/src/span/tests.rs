use pretty_assertions::assert_eq;

use super::*;

#[test]
fn test_span_merge() {
    let a = Span::new(4, 9);
    let b = Span::new(1, 6);
    assert_eq!(a.merge(b), Span::new(1, 9));
}

#[test]
fn test_span_contains() {
    let span = Span::new(10, 20);
    assert!(span.contains(10));
    assert!(span.contains(19));
    assert!(!span.contains(20));
    assert!(span.contains_span(Span::new(12, 20)));
    assert!(!span.contains_span(Span::new(9, 12)));
}

#[test]
fn test_try_from_range_overflow() {
    let too_big = (u32::MAX as usize) + 1;
    assert_eq!(
        Span::try_from_range(0..too_big),
        Err(SpanError::EndTooLarge(too_big))
    );
    assert_eq!(Span::try_from_range(3..7), Ok(Span::new(3, 7)));
}

#[test]
fn test_saturating_and_shift() {
    let span = Span::from_range_saturating(5..usize::MAX);
    assert_eq!(span.end, u32::MAX);
    assert_eq!(Span::new(1, 3).shifted(10), Span::new(11, 13));
}

#[test]
fn test_span_debug_format() {
    assert_eq!(format!("{:?}", Span::new(2, 8)), "2..8");
    assert_eq!(Span::point(4).len(), 0);
    assert!(Span::DUMMY.is_empty());
}
