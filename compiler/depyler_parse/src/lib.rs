//! Recursive descent parser for the Python subset the transpiler lowers.
//!
//! # Output
//!
//! [`parse`] returns a [`ParseOutput`]: the module AST plus diagnostics.
//! Tokenizer and grammar errors are `SyntaxError` diagnostics and make the
//! whole module fail; parsing stops at the first one, like CPython.
//!
//! Constructs outside the subset (`try`, `with`, `lambda`, nested `def`,
//! star arguments, ...) are parsed fully and kept as `Unsupported` nodes, so
//! they only fail the function that contains them.
//!
//! # Pragma comments
//!
//! Own-line comments directly above a `def`/`class` (or its decorators),
//! with no blank line in between, are attached to the definition as
//! [`CommentLine`]s. Interpreting them is the pragma extractor's job.

mod annotation;
mod cursor;
mod fstring;
mod grammar;

use std::collections::BTreeMap;

use depyler_diagnostic::{Diagnostic, DiagnosticKind};
use depyler_ir::ast::{CommentLine, Expr, ExprKind, Module, Stmt, StmtKind};
use depyler_ir::{LineIndex, NodeId, Span};
use depyler_lexer::{tokenize, Comment, TokenKind};

use cursor::Cursor;

pub use annotation::type_expr_from_expr;

/// Result of parsing one module.
#[derive(Clone, Debug)]
pub struct ParseOutput {
    pub module: Module,
    pub diagnostics: Vec<Diagnostic>,
}

impl ParseOutput {
    pub fn has_syntax_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.kind == DiagnosticKind::SyntaxError)
    }
}

type ParseResult<T> = Result<T, Box<Diagnostic>>;

/// Parse a Python source file.
#[tracing::instrument(level = "debug", skip_all)]
pub fn parse(source: &str) -> ParseOutput {
    let lexed = tokenize(source);
    let mut diagnostics = lexed.errors;
    if !diagnostics.is_empty() {
        return ParseOutput {
            module: Module {
                items: Vec::new(),
                span: Span::DUMMY,
                node_count: 0,
            },
            diagnostics,
        };
    }

    let mut parser = Parser::new(source, lexed.tokens, &lexed.comments, 0, 0);
    let module = parser.parse_module();
    diagnostics.extend(parser.diagnostics);
    tracing::debug!(
        items = module.items.len(),
        nodes = module.node_count,
        "parsed module"
    );
    ParseOutput {
        module,
        diagnostics,
    }
}

/// Parser state for one token stream.
pub(crate) struct Parser<'src> {
    source: &'src str,
    /// Byte offset added to every span (non-zero for f-string fields).
    base_offset: u32,
    cursor: Cursor,
    lines: LineIndex,
    /// Own-line comments keyed by 1-based line.
    comments: BTreeMap<u32, Comment>,
    next_id: u32,
    diagnostics: Vec<Diagnostic>,
}

impl<'src> Parser<'src> {
    pub(crate) fn new(
        source: &'src str,
        tokens: Vec<depyler_lexer::Token>,
        comments: &[Comment],
        base_offset: u32,
        next_id: u32,
    ) -> Self {
        let comments = comments
            .iter()
            .filter(|c| c.own_line)
            .map(|c| (c.line, c.clone()))
            .collect();
        Parser {
            source,
            base_offset,
            cursor: Cursor::new(tokens),
            lines: LineIndex::new(source),
            comments,
            next_id,
            diagnostics: Vec::new(),
        }
    }

    fn parse_module(&mut self) -> Module {
        let mut items = Vec::new();
        while !self.cursor.is_at_end() {
            if self.cursor.eat(&TokenKind::Newline) {
                continue;
            }
            match self.parse_item() {
                Ok(mut parsed) => items.append(&mut parsed),
                Err(diag) => {
                    self.diagnostics.push(*diag);
                    break;
                }
            }
        }
        let end = u32::try_from(self.source.len()).unwrap_or(u32::MAX);
        Module {
            items,
            span: Span::new(0, end),
            node_count: self.next_id,
        }
    }

    pub(crate) fn fresh_id(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Span of the current token, in file coordinates.
    fn span(&self) -> Span {
        self.cursor.current_span().shifted(self.base_offset)
    }

    fn prev_span(&self) -> Span {
        self.cursor.previous_span().shifted(self.base_offset)
    }

    /// Span from `start` to the end of the last consumed token.
    fn span_from(&self, start: Span) -> Span {
        start.merge(self.prev_span())
    }

    fn error_here(&self, message: impl Into<String>) -> Box<Diagnostic> {
        Box::new(
            Diagnostic::new(DiagnosticKind::SyntaxError, self.span())
                .with_message(message)
                .with_label("here"),
        )
    }

    fn expected(&self, what: &str) -> Box<Diagnostic> {
        self.error_here(format!(
            "expected {what}, found {}",
            self.cursor.current_kind()
        ))
    }

    fn expect(&mut self, kind: &TokenKind, what: &str) -> ParseResult<Span> {
        if self.cursor.check(kind) {
            let span = self.span();
            self.cursor.advance();
            Ok(span)
        } else {
            Err(self.expected(what))
        }
    }

    fn expect_name(&mut self) -> ParseResult<(String, Span)> {
        if let TokenKind::Name(name) = self.cursor.current_kind() {
            let name = name.clone();
            let span = self.span();
            self.cursor.advance();
            Ok((name, span))
        } else {
            Err(self.expected("identifier"))
        }
    }

    /// Own-line comments directly above `line`, top to bottom.
    fn leading_comments(&self, line: u32) -> Vec<CommentLine> {
        let mut collected = Vec::new();
        let mut current = line;
        while current > 1 {
            current -= 1;
            match self.comments.get(&current) {
                Some(comment) => collected.push(CommentLine {
                    text: comment.text.clone(),
                    span: comment.span,
                }),
                None => break,
            }
        }
        collected.reverse();
        collected
    }

    fn line_of(&self, span: Span) -> u32 {
        self.lines.line_of(span.start)
    }

    fn unsupported_stmt(&mut self, construct: &str, span: Span) -> Stmt {
        Stmt {
            id: self.fresh_id(),
            kind: StmtKind::Unsupported {
                construct: construct.to_string(),
            },
            span,
        }
    }

    fn unsupported_expr(&mut self, construct: &str, span: Span) -> Expr {
        Expr {
            id: self.fresh_id(),
            kind: ExprKind::Unsupported {
                construct: construct.to_string(),
            },
            span,
        }
    }

    fn mk_expr(&mut self, kind: ExprKind, span: Span) -> Expr {
        Expr {
            id: self.fresh_id(),
            kind,
            span,
        }
    }

    fn source_text(&self, span: Span) -> &str {
        let start = span.start.saturating_sub(self.base_offset) as usize;
        let end = span.end.saturating_sub(self.base_offset) as usize;
        self.source.get(start..end).unwrap_or("")
    }
}

#[cfg(test)]
mod tests;
