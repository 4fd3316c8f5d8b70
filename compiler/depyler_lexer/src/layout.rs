//! Layout pass: raw tokens to logical lines.
//!
//! Converts the flat logos stream into Python's token model:
//! - `NEWLINE` ends a logical line (never inside brackets)
//! - `INDENT`/`DEDENT` bracket blocks by leading whitespace
//! - blank and comment-only lines produce no layout tokens
//! - comments are collected separately for pragma extraction

use depyler_diagnostic::{Diagnostic, DiagnosticKind};
use depyler_ir::ast::BinOp;
use depyler_ir::{LineIndex, Span};
use logos::Logos;

use crate::escape::unescape;
use crate::raw::RawToken;
use crate::token::{Comment, StrKind, StrLit, Token, TokenKind};

/// Tokens, comments and any syntax errors of one source file.
#[derive(Clone, Debug, Default)]
pub struct LexOutput {
    pub tokens: Vec<Token>,
    pub comments: Vec<Comment>,
    pub errors: Vec<Diagnostic>,
}

impl LexOutput {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

const TAB_WIDTH: u32 = 8;

struct Layout<'src> {
    source: &'src str,
    lines: LineIndex,
    out: LexOutput,
    indents: Vec<u32>,
    depth: u32,
    line_has_tokens: bool,
}

/// Tokenize a Python source file.
#[tracing::instrument(level = "debug", skip_all, fields(len = source.len()))]
pub fn tokenize(source: &str) -> LexOutput {
    let mut layout = Layout {
        source,
        lines: LineIndex::new(source),
        out: LexOutput::default(),
        indents: vec![0],
        depth: 0,
        line_has_tokens: false,
    };

    let mut lexer = RawToken::lexer(source);
    while let Some(result) = lexer.next() {
        let span = Span::from_range_saturating(lexer.span());
        let slice = lexer.slice();
        match result {
            Ok(raw) => layout.raw_token(raw, slice, span),
            Err(()) => layout.lex_error(slice, span),
        }
    }

    layout.finish()
}

impl Layout<'_> {
    fn raw_token(&mut self, raw: RawToken, slice: &str, span: Span) {
        match raw {
            RawToken::Comment => {
                self.out.comments.push(Comment {
                    text: slice.trim_end().to_string(),
                    span,
                    line: self.lines.line_of(span.start),
                    own_line: !self.line_has_tokens,
                });
            }
            RawToken::Newline => {
                if self.depth == 0 && self.line_has_tokens {
                    self.push(TokenKind::Newline, span);
                    self.line_has_tokens = false;
                }
            }
            RawToken::LineContinuation => {}
            _ => {
                let Some(kind) = self.convert(raw, slice, span) else {
                    return;
                };
                self.begin_line(span);
                match kind {
                    TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace => self.depth += 1,
                    TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => {
                        if self.depth == 0 {
                            self.error(span, format!("unmatched `{}`", kind.spelling()));
                            return;
                        }
                        self.depth -= 1;
                    }
                    _ => {}
                }
                self.push(kind, span);
            }
        }
    }

    /// Emit `INDENT`/`DEDENT` before the first token of a logical line.
    fn begin_line(&mut self, span: Span) {
        if self.line_has_tokens || self.depth > 0 {
            return;
        }
        self.line_has_tokens = true;

        let width = self.indent_width(span.start);
        let top = self.indents.last().copied().unwrap_or(0);
        if width > top {
            self.indents.push(width);
            self.push(TokenKind::Indent, Span::point(span.start));
            return;
        }
        while width < self.indents.last().copied().unwrap_or(0) {
            self.indents.pop();
            self.push(TokenKind::Dedent, Span::point(span.start));
        }
        if width != self.indents.last().copied().unwrap_or(0) {
            self.error(
                span,
                "unindent does not match any outer indentation level".to_string(),
            );
        }
    }

    fn indent_width(&self, offset: u32) -> u32 {
        let line = self.lines.line_of(offset);
        let start = self.lines.line_start(line) as usize;
        let prefix = self.source.get(start..offset as usize).unwrap_or("");
        prefix.chars().fold(0, |width, c| match c {
            '\t' => (width / TAB_WIDTH + 1) * TAB_WIDTH,
            _ => width + 1,
        })
    }

    fn convert(&mut self, raw: RawToken, slice: &str, span: Span) -> Option<TokenKind> {
        let kind = match raw {
            RawToken::Ident => TokenKind::Name(slice.to_string()),
            RawToken::DecInt => decimal_int(slice),
            RawToken::RadixInt => match radix_int(slice) {
                Some(value) => TokenKind::Int(value),
                None => {
                    self.error(span, format!("invalid integer literal `{slice}`"));
                    return None;
                }
            },
            RawToken::Float => match slice.replace('_', "").parse::<f64>() {
                Ok(value) => TokenKind::Float(value),
                Err(_) => {
                    self.error(span, format!("invalid float literal `{slice}`"));
                    return None;
                }
            },
            RawToken::Str => TokenKind::Str(string_literal(slice, span)),
            RawToken::False => TokenKind::False,
            RawToken::None => TokenKind::None,
            RawToken::True => TokenKind::True,
            RawToken::And => TokenKind::And,
            RawToken::As => TokenKind::As,
            RawToken::Assert => TokenKind::Assert,
            RawToken::Async => TokenKind::Async,
            RawToken::Await => TokenKind::Await,
            RawToken::Break => TokenKind::Break,
            RawToken::Class => TokenKind::Class,
            RawToken::Continue => TokenKind::Continue,
            RawToken::Def => TokenKind::Def,
            RawToken::Del => TokenKind::Del,
            RawToken::Elif => TokenKind::Elif,
            RawToken::Else => TokenKind::Else,
            RawToken::Except => TokenKind::Except,
            RawToken::Finally => TokenKind::Finally,
            RawToken::For => TokenKind::For,
            RawToken::From => TokenKind::From,
            RawToken::Global => TokenKind::Global,
            RawToken::If => TokenKind::If,
            RawToken::Import => TokenKind::Import,
            RawToken::In => TokenKind::In,
            RawToken::Is => TokenKind::Is,
            RawToken::Lambda => TokenKind::Lambda,
            RawToken::Nonlocal => TokenKind::Nonlocal,
            RawToken::Not => TokenKind::Not,
            RawToken::Or => TokenKind::Or,
            RawToken::Pass => TokenKind::Pass,
            RawToken::Raise => TokenKind::Raise,
            RawToken::Return => TokenKind::Return,
            RawToken::Try => TokenKind::Try,
            RawToken::While => TokenKind::While,
            RawToken::With => TokenKind::With,
            RawToken::Yield => TokenKind::Yield,
            RawToken::LParen => TokenKind::LParen,
            RawToken::RParen => TokenKind::RParen,
            RawToken::LBracket => TokenKind::LBracket,
            RawToken::RBracket => TokenKind::RBracket,
            RawToken::LBrace => TokenKind::LBrace,
            RawToken::RBrace => TokenKind::RBrace,
            RawToken::Colon => TokenKind::Colon,
            RawToken::Comma => TokenKind::Comma,
            RawToken::Semi => TokenKind::Semi,
            RawToken::Dot => TokenKind::Dot,
            RawToken::Ellipsis => TokenKind::Ellipsis,
            RawToken::Arrow => TokenKind::Arrow,
            RawToken::At => TokenKind::At,
            RawToken::Eq => TokenKind::Eq,
            RawToken::Walrus => TokenKind::Walrus,
            RawToken::Plus => TokenKind::Plus,
            RawToken::Minus => TokenKind::Minus,
            RawToken::Star => TokenKind::Star,
            RawToken::DoubleStar => TokenKind::DoubleStar,
            RawToken::Slash => TokenKind::Slash,
            RawToken::DoubleSlash => TokenKind::DoubleSlash,
            RawToken::Percent => TokenKind::Percent,
            RawToken::LShift => TokenKind::LShift,
            RawToken::RShift => TokenKind::RShift,
            RawToken::Amp => TokenKind::Amp,
            RawToken::Pipe => TokenKind::Pipe,
            RawToken::Caret => TokenKind::Caret,
            RawToken::Tilde => TokenKind::Tilde,
            RawToken::Lt => TokenKind::Lt,
            RawToken::Gt => TokenKind::Gt,
            RawToken::LtE => TokenKind::LtE,
            RawToken::GtE => TokenKind::GtE,
            RawToken::EqEq => TokenKind::EqEq,
            RawToken::NotEq => TokenKind::NotEq,
            RawToken::PlusEq => TokenKind::AugAssign(BinOp::Add),
            RawToken::MinusEq => TokenKind::AugAssign(BinOp::Sub),
            RawToken::StarEq => TokenKind::AugAssign(BinOp::Mul),
            RawToken::SlashEq => TokenKind::AugAssign(BinOp::Div),
            RawToken::DoubleSlashEq => TokenKind::AugAssign(BinOp::FloorDiv),
            RawToken::PercentEq => TokenKind::AugAssign(BinOp::Mod),
            RawToken::DoubleStarEq => TokenKind::AugAssign(BinOp::Pow),
            RawToken::LShiftEq => TokenKind::AugAssign(BinOp::LShift),
            RawToken::RShiftEq => TokenKind::AugAssign(BinOp::RShift),
            RawToken::AmpEq => TokenKind::AugAssign(BinOp::BitAnd),
            RawToken::PipeEq => TokenKind::AugAssign(BinOp::BitOr),
            RawToken::CaretEq => TokenKind::AugAssign(BinOp::BitXor),
            RawToken::AtEq => TokenKind::AugAssign(BinOp::MatMul),
            RawToken::Comment | RawToken::Newline | RawToken::LineContinuation => return None,
        };
        Some(kind)
    }

    fn lex_error(&mut self, slice: &str, span: Span) {
        let message = if slice.contains(['"', '\'']) {
            "unterminated string literal".to_string()
        } else {
            format!("invalid character `{}`", slice.escape_debug())
        };
        self.error(span, message);
    }

    fn error(&mut self, span: Span, message: String) {
        self.out.errors.push(
            Diagnostic::new(DiagnosticKind::SyntaxError, span)
                .with_message(message)
                .with_label("here"),
        );
    }

    fn push(&mut self, kind: TokenKind, span: Span) {
        self.out.tokens.push(Token { kind, span });
    }

    fn finish(mut self) -> LexOutput {
        let end = u32::try_from(self.source.len()).unwrap_or(u32::MAX);
        if self.depth > 0 {
            self.error(Span::point(end), "unexpected end of file inside brackets".to_string());
        }
        if self.line_has_tokens {
            self.push(TokenKind::Newline, Span::point(end));
        }
        while self.indents.len() > 1 {
            self.indents.pop();
            self.push(TokenKind::Dedent, Span::point(end));
        }
        self.push(TokenKind::Eof, Span::point(end));
        tracing::trace!(tokens = self.out.tokens.len(), comments = self.out.comments.len(), "tokenized");
        self.out
    }
}

fn decimal_int(slice: &str) -> TokenKind {
    let digits = slice.replace('_', "");
    match digits.parse::<i128>() {
        Ok(value) => TokenKind::Int(value),
        Err(_) => TokenKind::BigInt(digits),
    }
}

fn radix_int(slice: &str) -> Option<i128> {
    let radix = match slice.as_bytes().get(1) {
        Some(b'x' | b'X') => 16,
        Some(b'o' | b'O') => 8,
        _ => 2,
    };
    let digits = slice.get(2..)?.replace('_', "");
    i128::from_str_radix(&digits, radix).ok()
}

fn string_literal(slice: &str, span: Span) -> StrLit {
    let prefix_len = slice.find(['"', '\'']).unwrap_or(0);
    let prefix = slice[..prefix_len].to_ascii_lowercase();
    let body = &slice[prefix_len..];
    let quote_len = if body.len() >= 6 && (body.starts_with("\"\"\"") || body.starts_with("'''")) {
        3
    } else {
        1
    };
    let content = body
        .get(quote_len..body.len().saturating_sub(quote_len))
        .unwrap_or("");
    let raw = prefix.contains('r');
    let kind = if prefix.contains('f') {
        StrKind::Format
    } else if prefix.contains('b') {
        StrKind::Bytes
    } else {
        StrKind::Plain
    };
    let content_offset = span.start + u32::try_from(prefix_len + quote_len).unwrap_or(0);
    StrLit {
        value: if raw {
            content.to_string()
        } else {
            unescape(content)
        },
        raw_content: content.to_string(),
        content_offset,
        kind,
        raw,
    }
}

#[cfg(test)]
mod tests;
