use pretty_assertions::assert_eq;

use super::*;

fn kinds(source: &str) -> Vec<TokenKind> {
    tokenize(source).tokens.into_iter().map(|t| t.kind).collect()
}

fn name(text: &str) -> TokenKind {
    TokenKind::Name(text.to_string())
}

#[test]
fn test_indent_and_dedent() {
    let source = "def f(x):\n    if x:\n        return 1\n    return 2\n";
    assert_eq!(
        kinds(source),
        vec![
            TokenKind::Def,
            name("f"),
            TokenKind::LParen,
            name("x"),
            TokenKind::RParen,
            TokenKind::Colon,
            TokenKind::Newline,
            TokenKind::Indent,
            TokenKind::If,
            name("x"),
            TokenKind::Colon,
            TokenKind::Newline,
            TokenKind::Indent,
            TokenKind::Return,
            TokenKind::Int(1),
            TokenKind::Newline,
            TokenKind::Dedent,
            TokenKind::Return,
            TokenKind::Int(2),
            TokenKind::Newline,
            TokenKind::Dedent,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn test_brackets_suppress_newlines() {
    let source = "xs = [\n    1,\n    2,\n]\n";
    assert_eq!(
        kinds(source),
        vec![
            name("xs"),
            TokenKind::Eq,
            TokenKind::LBracket,
            TokenKind::Int(1),
            TokenKind::Comma,
            TokenKind::Int(2),
            TokenKind::Comma,
            TokenKind::RBracket,
            TokenKind::Newline,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn test_blank_and_comment_lines_are_layout_neutral() {
    let source = "def f():\n\n    # note\n    return 1\n";
    let out = tokenize(source);
    assert!(!out.has_errors());
    assert_eq!(out.comments.len(), 1);
    assert_eq!(out.comments[0].text, "# note");
    assert_eq!(out.comments[0].line, 3);
    assert!(out.comments[0].own_line);
    let indents = out
        .tokens
        .iter()
        .filter(|t| t.kind == TokenKind::Indent)
        .count();
    assert_eq!(indents, 1);
}

#[test]
fn test_trailing_comment_is_not_own_line() {
    let out = tokenize("x = 1  # @depyler: ownership = \"owned\"\n");
    assert_eq!(out.comments.len(), 1);
    assert!(!out.comments[0].own_line);
}

#[test]
fn test_inconsistent_dedent_is_syntax_error() {
    let source = "def f():\n        x = 1\n    y = 2\n";
    let out = tokenize(source);
    assert_eq!(out.errors.len(), 1);
    assert_eq!(out.errors[0].kind, DiagnosticKind::SyntaxError);
}

#[test]
fn test_number_literals() {
    assert_eq!(
        kinds("0xff 0b101 0o17 1_000 2.5 1e3 .5"),
        vec![
            TokenKind::Int(255),
            TokenKind::Int(5),
            TokenKind::Int(15),
            TokenKind::Int(1000),
            TokenKind::Float(2.5),
            TokenKind::Float(1000.0),
            TokenKind::Float(0.5),
            TokenKind::Newline,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn test_huge_integer_becomes_bigint() {
    let digits = "1".repeat(45);
    assert_eq!(kinds(&digits)[0], TokenKind::BigInt(digits.clone()));
}

#[test]
fn test_string_prefixes_and_triple_quotes() {
    let out = tokenize("a = f\"x{y}\"\nb = r'\\d'\nc = \"\"\"multi\nline\"\"\"\n");
    let strings: Vec<&StrLit> = out
        .tokens
        .iter()
        .filter_map(|t| match &t.kind {
            TokenKind::Str(lit) => Some(lit),
            _ => None,
        })
        .collect();
    assert_eq!(strings.len(), 3);
    assert_eq!(strings[0].kind, StrKind::Format);
    assert_eq!(strings[0].raw_content, "x{y}");
    assert_eq!(strings[0].content_offset, 6);
    assert!(strings[1].raw);
    assert_eq!(strings[1].value, "\\d");
    assert_eq!(strings[2].value, "multi\nline");
}

#[test]
fn test_unterminated_string() {
    let out = tokenize("s = \"abc\n");
    assert!(out.has_errors());
    assert!(out.errors[0].message.contains("unterminated string"));
}

#[test]
fn test_line_continuation() {
    assert_eq!(
        kinds("x = 1 + \\\n    2\n"),
        vec![
            name("x"),
            TokenKind::Eq,
            TokenKind::Int(1),
            TokenKind::Plus,
            TokenKind::Int(2),
            TokenKind::Newline,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn test_augmented_operators() {
    assert_eq!(
        kinds("x //= 2")[1],
        TokenKind::AugAssign(depyler_ir::ast::BinOp::FloorDiv)
    );
    assert_eq!(kinds("x ** 2")[1], TokenKind::DoubleStar);
}

#[test]
fn test_keyword_prefix_is_identifier() {
    assert_eq!(kinds("parse_data")[0], name("parse_data"));
    assert_eq!(kinds("format")[0], name("format"));
    assert_eq!(kinds("iffy")[0], name("iffy"));
}
