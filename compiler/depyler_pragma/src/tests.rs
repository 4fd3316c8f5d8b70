use depyler_ir::ast::CommentLine;
use depyler_ir::Span;
use proptest::prelude::*;

use super::*;

fn comment(text: String) -> CommentLine {
    let len = u32::try_from(text.len()).unwrap_or(0);
    CommentLine {
        text,
        span: Span::new(0, len),
    }
}

proptest! {
    #[test]
    fn extract_never_panics(text in "#[ -~]{0,80}") {
        let _ = extract(&[comment(text)]);
    }

    #[test]
    fn extract_never_panics_near_the_marker(
        rest in "[ :=a-z_\"'é]{0,40}",
    ) {
        let _ = extract(&[comment(format!("# @depyler{rest}"))]);
    }

    #[test]
    fn every_known_value_round_trips(key_index in 0usize..KNOWN_KEYS.len(), pick in 0usize..3) {
        let key = KNOWN_KEYS[key_index];
        let values = values_for(key).unwrap_or(&[]);
        let value = values[pick % values.len()];
        let out = extract(&[comment(format!("# @depyler: {key} = \"{value}\""))]);
        prop_assert!(out.diagnostics.is_empty());
        prop_assert_eq!(out.pragmas.entries(), vec![(key, value)]);
    }

    #[test]
    fn diagnostics_are_never_fatal(text in "# @depyler: [a-z_]{0,12} = \"[a-z]{0,8}\"") {
        let out = extract(&[comment(text)]);
        prop_assert!(out.diagnostics.iter().all(|d| !d.is_fatal()));
    }
}
