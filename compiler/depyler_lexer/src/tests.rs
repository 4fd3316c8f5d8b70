use proptest::prelude::*;

use super::*;

proptest! {
    #[test]
    fn tokenize_never_panics_and_ends_with_eof(source in "[ -~\n\t]{0,200}") {
        let out = tokenize(&source);
        let last = out.tokens.last().map(|t| t.kind.clone());
        prop_assert_eq!(last, Some(TokenKind::Eof));
    }

    #[test]
    fn token_spans_stay_in_bounds(source in "[a-z0-9_ ()\\[\\]:=+\\-*\n#\"']{0,120}") {
        let out = tokenize(&source);
        let len = u32::try_from(source.len()).unwrap_or(u32::MAX);
        for token in &out.tokens {
            prop_assert!(token.span.start <= token.span.end);
            prop_assert!(token.span.end <= len);
        }
    }

    #[test]
    fn indents_and_dedents_balance(source in "(( {0,8})[a-z]{1,3}( [a-z]{1,3})?\n){0,12}") {
        let out = tokenize(&source);
        let indents = out.tokens.iter().filter(|t| t.kind == TokenKind::Indent).count();
        let dedents = out.tokens.iter().filter(|t| t.kind == TokenKind::Dedent).count();
        prop_assert_eq!(indents, dedents);
    }
}
