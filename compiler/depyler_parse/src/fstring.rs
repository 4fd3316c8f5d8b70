//! f-string field splitting.
//!
//! The tokenizer hands over the raw text between the quotes. Literal runs
//! are unescaped here; each `{expr[!conv][:spec]}` field is tokenized and
//! parsed with a sub-parser whose spans are shifted to file coordinates.

use depyler_diagnostic::{Diagnostic, DiagnosticKind};
use depyler_ir::ast::FStringPart;
use depyler_ir::Span;
use depyler_lexer::{tokenize, unescape, StrLit, TokenKind};

use crate::{ParseResult, Parser};

/// Byte ranges of one replacement field inside the literal body.
struct FieldBounds {
    expr: (usize, usize),
    conversion: Option<char>,
    spec: Option<(usize, usize)>,
    /// Index just past the closing `}`.
    end: usize,
}

impl Parser<'_> {
    pub(crate) fn parse_fstring(&mut self, lit: &StrLit) -> ParseResult<Vec<FStringPart>> {
        let text = lit.raw_content.as_str();
        let bytes = text.as_bytes();
        let mut parts = Vec::new();
        let mut literal = String::new();
        let mut i = 0;

        while i < bytes.len() {
            match bytes[i] {
                b'{' if bytes.get(i + 1) == Some(&b'{') => {
                    literal.push('{');
                    i += 2;
                }
                b'}' if bytes.get(i + 1) == Some(&b'}') => {
                    literal.push('}');
                    i += 2;
                }
                b'}' => {
                    return Err(self.fstring_error(lit, i, 1, "f-string: single `}` is not allowed"));
                }
                b'{' => {
                    if !literal.is_empty() {
                        parts.push(FStringPart::Literal(decode(lit, &literal)));
                        literal.clear();
                    }
                    let bounds = self.field_bounds(lit, i)?;
                    parts.push(self.parse_field(lit, &bounds)?);
                    i = bounds.end;
                }
                _ => {
                    let ch_len = text[i..].chars().next().map_or(1, char::len_utf8);
                    literal.push_str(&text[i..i + ch_len]);
                    i += ch_len;
                }
            }
        }
        if !literal.is_empty() {
            parts.push(FStringPart::Literal(decode(lit, &literal)));
        }
        Ok(parts)
    }

    /// Locate the pieces of the field opening at `open`.
    fn field_bounds(&self, lit: &StrLit, open: usize) -> ParseResult<FieldBounds> {
        let bytes = lit.raw_content.as_bytes();
        let expr_start = open + 1;
        let mut depth = 0usize;
        let mut quote: Option<u8> = None;
        let mut i = expr_start;

        let expr_end = loop {
            let Some(&b) = bytes.get(i) else {
                return Err(self.fstring_error(lit, open, 1, "f-string: expecting `}`"));
            };
            if let Some(q) = quote {
                if b == q {
                    quote = None;
                }
                i += 1;
                continue;
            }
            match b {
                b'\'' | b'"' => quote = Some(b),
                b'(' | b'[' | b'{' => depth += 1,
                b')' | b']' => depth = depth.saturating_sub(1),
                b'}' if depth > 0 => depth -= 1,
                b'}' => break i,
                b'!' if depth == 0 && bytes.get(i + 1) != Some(&b'=') => break i,
                b':' if depth == 0 => break i,
                _ => {}
            }
            i += 1;
        };

        let mut cursor = expr_end;
        let mut conversion = None;
        if bytes.get(cursor) == Some(&b'!') {
            match bytes.get(cursor + 1) {
                Some(&c @ (b'r' | b's' | b'a')) => conversion = Some(char::from(c)),
                _ => {
                    return Err(self.fstring_error(
                        lit,
                        cursor,
                        1,
                        "f-string: invalid conversion character, expected `r`, `s` or `a`",
                    ))
                }
            }
            cursor += 2;
        }

        let mut spec = None;
        if bytes.get(cursor) == Some(&b':') {
            let spec_start = cursor + 1;
            let mut nested = 0usize;
            let mut j = spec_start;
            loop {
                match bytes.get(j) {
                    None => return Err(self.fstring_error(lit, open, 1, "f-string: expecting `}`")),
                    Some(b'{') => nested += 1,
                    Some(b'}') if nested > 0 => nested -= 1,
                    Some(b'}') => break,
                    Some(_) => {}
                }
                j += 1;
            }
            spec = Some((spec_start, j));
            cursor = j;
        }

        if bytes.get(cursor) != Some(&b'}') {
            return Err(self.fstring_error(lit, cursor, 1, "f-string: expecting `}`"));
        }
        Ok(FieldBounds {
            expr: (expr_start, expr_end),
            conversion,
            spec,
            end: cursor + 1,
        })
    }

    fn parse_field(&mut self, lit: &StrLit, bounds: &FieldBounds) -> ParseResult<FStringPart> {
        let (start, end) = bounds.expr;
        let snippet = &lit.raw_content[start..end];
        let offset = lit.content_offset + offset_u32(start);
        let field_span = Span::new(
            lit.content_offset + offset_u32(start.saturating_sub(1)),
            lit.content_offset + offset_u32(bounds.end),
        );

        if snippet.trim().is_empty() {
            return Err(self.fstring_error(lit, start, end - start, "f-string: empty expression not allowed"));
        }
        let trimmed = snippet.trim_end();
        if trimmed.ends_with('=') && !is_comparison_suffix(trimmed) {
            let expr = self.unsupported_expr("self-documenting f-string field", field_span);
            return Ok(FStringPart::Field {
                expr: Box::new(expr),
                conversion: None,
                spec: None,
            });
        }

        if let Some((spec_start, spec_end)) = bounds.spec {
            if lit.raw_content[spec_start..spec_end].contains('{') {
                let expr = self.unsupported_expr("nested f-string format spec", field_span);
                return Ok(FStringPart::Field {
                    expr: Box::new(expr),
                    conversion: None,
                    spec: None,
                });
            }
        }

        let lexed = tokenize(snippet);
        if let Some(error) = lexed.errors.into_iter().next() {
            return Err(Box::new(
                Diagnostic::new(DiagnosticKind::SyntaxError, error.span.shifted(offset))
                    .with_message(format!("in f-string field: {}", error.message))
                    .with_label("here"),
            ));
        }
        let tokens = lexed
            .tokens
            .into_iter()
            .filter(|t| {
                !matches!(
                    t.kind,
                    TokenKind::Newline | TokenKind::Indent | TokenKind::Dedent
                )
            })
            .collect();

        let mut sub = Parser::new(snippet, tokens, &[], offset, self.next_id);
        let expr = sub.parse_testlist()?;
        if !sub.cursor.is_at_end() {
            return Err(sub.expected("`}` after f-string field"));
        }
        self.next_id = sub.next_id;

        Ok(FStringPart::Field {
            expr: Box::new(expr),
            conversion: bounds.conversion,
            spec: bounds
                .spec
                .map(|(s, e)| lit.raw_content[s..e].to_string()),
        })
    }

    fn fstring_error(&self, lit: &StrLit, at: usize, len: usize, message: &str) -> Box<Diagnostic> {
        let start = lit.content_offset + offset_u32(at);
        Box::new(
            Diagnostic::new(
                DiagnosticKind::SyntaxError,
                Span::new(start, start + offset_u32(len)),
            )
            .with_message(message)
            .with_label("in this f-string"),
        )
    }
}

fn decode(lit: &StrLit, text: &str) -> String {
    if lit.raw {
        text.to_string()
    } else {
        unescape(text)
    }
}

fn is_comparison_suffix(text: &str) -> bool {
    ["==", "!=", "<=", ">="].iter().any(|op| text.ends_with(op))
}

fn offset_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests;
