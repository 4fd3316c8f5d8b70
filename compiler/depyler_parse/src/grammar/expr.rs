//! Expression parsing.
//!
//! Precedence, lowest to highest:
//!
//! | Level | Operators |
//! |-------|-----------|
//! | test | `lambda`, `x if c else y` |
//! | or / and / not | `or`, `and`, `not` |
//! | comparison | `< <= > >= == != in not in is is not` |
//! | bitor / bitxor / bitand | `\|`, `^`, `&` |
//! | shift | `<< >>` |
//! | arith | `+ -` |
//! | term | `* / // % @` |
//! | factor | unary `+ - ~` |
//! | power | `**` (right-assoc, binds tighter than unary on its left) |
//! | primary | calls, subscripts, attributes |

use depyler_ir::ast::{
    BinOp, BoolOp, CmpOp, Comprehension, Expr, ExprKind, FStringPart, Keyword, UnaryOp,
};
use depyler_ir::stack::ensure_sufficient_stack;
use depyler_ir::Span;
use depyler_lexer::{StrKind, TokenKind};

use crate::{ParseResult, Parser};

impl Parser<'_> {
    /// `test (',' test)* [',']`, a tuple when a comma appears.
    pub(crate) fn parse_testlist(&mut self) -> ParseResult<Expr> {
        self.parse_sequence(Self::parse_test)
    }

    /// Like [`Self::parse_testlist`] but also accepts `*x` items and
    /// `yield` (assignment right-hand sides).
    pub(crate) fn parse_testlist_star(&mut self) -> ParseResult<Expr> {
        if self.cursor.check(&TokenKind::Yield) {
            return self.parse_yield();
        }
        self.parse_sequence(Self::parse_star_or_test)
    }

    /// Targets of `for` loops and comprehensions.
    pub(crate) fn parse_target_list(&mut self) -> ParseResult<Expr> {
        self.parse_sequence(|p| {
            if p.cursor.check(&TokenKind::Star) {
                p.parse_starred()
            } else {
                p.parse_bitor()
            }
        })
    }

    fn parse_sequence(
        &mut self,
        mut element: impl FnMut(&mut Self) -> ParseResult<Expr>,
    ) -> ParseResult<Expr> {
        let start = self.span();
        let first = element(self)?;
        if !self.cursor.check(&TokenKind::Comma) {
            return Ok(first);
        }
        let mut elements = vec![first];
        while self.cursor.eat(&TokenKind::Comma) {
            if !self.starts_expression() {
                break;
            }
            elements.push(element(self)?);
        }
        let span = self.span_from(start);
        Ok(self.mk_expr(ExprKind::Tuple(elements), span))
    }

    fn starts_expression(&self) -> bool {
        !matches!(
            self.cursor.current_kind(),
            TokenKind::Newline
                | TokenKind::Eof
                | TokenKind::Semi
                | TokenKind::Eq
                | TokenKind::Colon
                | TokenKind::AugAssign(_)
                | TokenKind::RParen
                | TokenKind::RBracket
                | TokenKind::RBrace
                | TokenKind::In
                | TokenKind::Indent
                | TokenKind::Dedent
        )
    }

    fn parse_star_or_test(&mut self) -> ParseResult<Expr> {
        if self.cursor.check(&TokenKind::Star) {
            self.parse_starred()
        } else {
            self.parse_test()
        }
    }

    fn parse_starred(&mut self) -> ParseResult<Expr> {
        let start = self.expect(&TokenKind::Star, "`*`")?;
        self.parse_bitor()?;
        let span = self.span_from(start);
        Ok(self.unsupported_expr("starred expression", span))
    }

    fn parse_yield(&mut self) -> ParseResult<Expr> {
        let start = self.expect(&TokenKind::Yield, "`yield`")?;
        if self.cursor.eat(&TokenKind::From) {
            self.parse_test()?;
        } else if self.starts_expression() {
            self.parse_testlist_star()?;
        }
        let span = self.span_from(start);
        Ok(self.unsupported_expr("`yield` expression", span))
    }

    /// `test [':=' test]`
    pub(crate) fn parse_named_test(&mut self) -> ParseResult<Expr> {
        let start = self.span();
        let expr = self.parse_test()?;
        if self.cursor.eat(&TokenKind::Walrus) {
            self.parse_test()?;
            let span = self.span_from(start);
            return Ok(self.unsupported_expr("assignment expression `:=`", span));
        }
        Ok(expr)
    }

    /// `lambda` or a conditional expression.
    pub(crate) fn parse_test(&mut self) -> ParseResult<Expr> {
        ensure_sufficient_stack(|| self.parse_test_inner())
    }

    fn parse_test_inner(&mut self) -> ParseResult<Expr> {
        let start = self.span();
        match self.cursor.current_kind() {
            TokenKind::Lambda => return self.parse_lambda(),
            TokenKind::Yield => return self.parse_yield(),
            _ => {}
        }

        let body = self.parse_or_test()?;
        if !self.cursor.check(&TokenKind::If) {
            return Ok(body);
        }
        self.cursor.advance();
        let test = self.parse_or_test()?;
        self.expect(&TokenKind::Else, "`else` in conditional expression")?;
        let orelse = self.parse_test()?;
        let span = self.span_from(start);
        Ok(self.mk_expr(
            ExprKind::IfExp {
                test: Box::new(test),
                body: Box::new(body),
                orelse: Box::new(orelse),
            },
            span,
        ))
    }

    fn parse_lambda(&mut self) -> ParseResult<Expr> {
        let start = self.expect(&TokenKind::Lambda, "`lambda`")?;
        while !self.cursor.check(&TokenKind::Colon) {
            match self.cursor.current_kind() {
                TokenKind::Star | TokenKind::DoubleStar | TokenKind::Slash | TokenKind::Comma => {
                    self.cursor.advance();
                }
                TokenKind::Name(_) => {
                    self.cursor.advance();
                    if self.cursor.eat(&TokenKind::Eq) {
                        self.parse_test()?;
                    }
                }
                _ => return Err(self.expected("lambda parameter or `:`")),
            }
        }
        self.expect(&TokenKind::Colon, "`:`")?;
        self.parse_test()?;
        let span = self.span_from(start);
        Ok(self.unsupported_expr("`lambda` expression", span))
    }

    fn parse_or_test(&mut self) -> ParseResult<Expr> {
        self.parse_bool_chain(TokenKind::Or, BoolOp::Or, Self::parse_and_test)
    }

    fn parse_and_test(&mut self) -> ParseResult<Expr> {
        self.parse_bool_chain(TokenKind::And, BoolOp::And, Self::parse_not_test)
    }

    fn parse_bool_chain(
        &mut self,
        token: TokenKind,
        op: BoolOp,
        operand: fn(&mut Self) -> ParseResult<Expr>,
    ) -> ParseResult<Expr> {
        let start = self.span();
        let first = operand(self)?;
        if !self.cursor.check(&token) {
            return Ok(first);
        }
        let mut values = vec![first];
        while self.cursor.eat(&token) {
            values.push(operand(self)?);
        }
        let span = self.span_from(start);
        Ok(self.mk_expr(ExprKind::BoolOp { op, values }, span))
    }

    fn parse_not_test(&mut self) -> ParseResult<Expr> {
        if self.cursor.check(&TokenKind::Not) {
            let start = self.span();
            self.cursor.advance();
            let operand = ensure_sufficient_stack(|| self.parse_not_test())?;
            let span = self.span_from(start);
            return Ok(self.mk_expr(
                ExprKind::UnaryOp {
                    op: UnaryOp::Not,
                    operand: Box::new(operand),
                },
                span,
            ));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> ParseResult<Expr> {
        let start = self.span();
        let left = self.parse_bitor()?;
        let mut ops = Vec::new();
        let mut comparators = Vec::new();
        while let Some(op) = self.comparison_operator() {
            ops.push(op);
            comparators.push(self.parse_bitor()?);
        }
        if ops.is_empty() {
            return Ok(left);
        }
        let span = self.span_from(start);
        Ok(self.mk_expr(
            ExprKind::Compare {
                left: Box::new(left),
                ops,
                comparators,
            },
            span,
        ))
    }

    /// Consume a comparison operator, including `not in` and `is not`.
    fn comparison_operator(&mut self) -> Option<CmpOp> {
        let op = match self.cursor.current_kind() {
            TokenKind::EqEq => CmpOp::Eq,
            TokenKind::NotEq => CmpOp::NotEq,
            TokenKind::Lt => CmpOp::Lt,
            TokenKind::LtE => CmpOp::LtE,
            TokenKind::Gt => CmpOp::Gt,
            TokenKind::GtE => CmpOp::GtE,
            TokenKind::In => CmpOp::In,
            TokenKind::Not if matches!(self.cursor.peek_kind(1), TokenKind::In) => {
                self.cursor.advance();
                CmpOp::NotIn
            }
            TokenKind::Is => {
                if matches!(self.cursor.peek_kind(1), TokenKind::Not) {
                    self.cursor.advance();
                    CmpOp::IsNot
                } else {
                    CmpOp::Is
                }
            }
            _ => return None,
        };
        self.cursor.advance();
        Some(op)
    }

    pub(crate) fn parse_bitor(&mut self) -> ParseResult<Expr> {
        self.parse_binary_level(0)
    }

    /// Left-associative binary levels from `|` down to `* / // % @`.
    fn parse_binary_level(&mut self, level: usize) -> ParseResult<Expr> {
        const LEVELS: usize = 6;
        if level == LEVELS {
            return self.parse_factor();
        }
        let start = self.span();
        let mut left = self.parse_binary_level(level + 1)?;
        while let Some(op) = binary_operator(level, self.cursor.current_kind()) {
            self.cursor.advance();
            let right = self.parse_binary_level(level + 1)?;
            let span = self.span_from(start);
            left = self.mk_expr(
                ExprKind::BinOp {
                    left: Box::new(left),
                    op,
                    right: Box::new(right),
                },
                span,
            );
        }
        Ok(left)
    }

    fn parse_factor(&mut self) -> ParseResult<Expr> {
        let op = match self.cursor.current_kind() {
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Plus => UnaryOp::Pos,
            TokenKind::Tilde => UnaryOp::Invert,
            _ => return self.parse_power(),
        };
        let start = self.span();
        self.cursor.advance();
        let operand = ensure_sufficient_stack(|| self.parse_factor())?;
        let span = self.span_from(start);
        Ok(self.mk_expr(
            ExprKind::UnaryOp {
                op,
                operand: Box::new(operand),
            },
            span,
        ))
    }

    fn parse_power(&mut self) -> ParseResult<Expr> {
        let start = self.span();
        let is_await = self.cursor.eat(&TokenKind::Await);
        let base = self.parse_primary()?;
        let base = if is_await {
            let span = self.span_from(start);
            self.unsupported_expr("`await` expression", span)
        } else {
            base
        };
        if !self.cursor.eat(&TokenKind::DoubleStar) {
            return Ok(base);
        }
        let exponent = self.parse_factor()?;
        let span = self.span_from(start);
        Ok(self.mk_expr(
            ExprKind::BinOp {
                left: Box::new(base),
                op: BinOp::Pow,
                right: Box::new(exponent),
            },
            span,
        ))
    }

    /// Atom followed by call, subscript and attribute trailers.
    fn parse_primary(&mut self) -> ParseResult<Expr> {
        let start = self.span();
        let mut expr = self.parse_atom()?;
        loop {
            match self.cursor.current_kind() {
                TokenKind::LParen => {
                    self.cursor.advance();
                    let (args, keywords) = self.parse_call_arguments()?;
                    let span = self.span_from(start);
                    expr = self.mk_expr(
                        ExprKind::Call {
                            func: Box::new(expr),
                            args,
                            keywords,
                        },
                        span,
                    );
                }
                TokenKind::LBracket => {
                    self.cursor.advance();
                    let index = self.parse_subscript_list()?;
                    self.expect(&TokenKind::RBracket, "`]`")?;
                    let span = self.span_from(start);
                    expr = self.mk_expr(
                        ExprKind::Subscript {
                            value: Box::new(expr),
                            index: Box::new(index),
                        },
                        span,
                    );
                }
                TokenKind::Dot => {
                    self.cursor.advance();
                    let (attr, _) = self.expect_name()?;
                    let span = self.span_from(start);
                    expr = self.mk_expr(
                        ExprKind::Attribute {
                            value: Box::new(expr),
                            attr,
                        },
                        span,
                    );
                }
                _ => return Ok(expr),
            }
        }
    }

    /// Arguments after an opening `(`, consuming the closing `)`.
    pub(crate) fn parse_call_arguments(&mut self) -> ParseResult<(Vec<Expr>, Vec<Keyword>)> {
        let mut args = Vec::new();
        let mut keywords = Vec::new();

        while !self.cursor.check(&TokenKind::RParen) {
            let start = self.span();
            match self.cursor.current_kind() {
                TokenKind::Star | TokenKind::DoubleStar => {
                    self.cursor.advance();
                    self.parse_test()?;
                    let span = self.span_from(start);
                    args.push(self.unsupported_expr("argument unpacking", span));
                }
                TokenKind::Name(name) if matches!(self.cursor.peek_kind(1), TokenKind::Eq) => {
                    let name = name.clone();
                    self.cursor.advance();
                    self.cursor.advance();
                    let value = self.parse_test()?;
                    keywords.push(Keyword { name, value });
                }
                _ => {
                    let arg = self.parse_named_test()?;
                    if self.cursor.check(&TokenKind::For) {
                        let generators = self.parse_comprehension_clauses()?;
                        let span = self.span_from(start);
                        args.push(self.mk_expr(
                            ExprKind::GeneratorExp {
                                elt: Box::new(arg),
                                generators,
                            },
                            span,
                        ));
                    } else {
                        args.push(arg);
                    }
                }
            }
            if !self.cursor.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RParen, "`)`")?;
        Ok((args, keywords))
    }

    /// Subscript contents: a single index, a slice, or a tuple of them.
    fn parse_subscript_list(&mut self) -> ParseResult<Expr> {
        let start = self.span();
        let first = self.parse_subscript_item()?;
        if !self.cursor.check(&TokenKind::Comma) {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.cursor.eat(&TokenKind::Comma) {
            if self.cursor.check(&TokenKind::RBracket) {
                break;
            }
            items.push(self.parse_subscript_item()?);
        }
        let span = self.span_from(start);
        Ok(self.mk_expr(ExprKind::Tuple(items), span))
    }

    fn parse_subscript_item(&mut self) -> ParseResult<Expr> {
        let start = self.span();
        let lower = if self.cursor.check(&TokenKind::Colon) {
            None
        } else {
            let expr = self.parse_named_test()?;
            if !self.cursor.check(&TokenKind::Colon) {
                return Ok(expr);
            }
            Some(Box::new(expr))
        };

        self.expect(&TokenKind::Colon, "`:`")?;
        let upper = self.parse_slice_bound()?;
        let step = if self.cursor.eat(&TokenKind::Colon) {
            self.parse_slice_bound()?
        } else {
            None
        };
        let span = self.span_from(start);
        Ok(self.mk_expr(ExprKind::Slice { lower, upper, step }, span))
    }

    fn parse_slice_bound(&mut self) -> ParseResult<Option<Box<Expr>>> {
        if matches!(
            self.cursor.current_kind(),
            TokenKind::Colon | TokenKind::Comma | TokenKind::RBracket
        ) {
            Ok(None)
        } else {
            Ok(Some(Box::new(self.parse_test()?)))
        }
    }

    fn parse_atom(&mut self) -> ParseResult<Expr> {
        let start = self.span();
        let kind = match self.cursor.current_kind() {
            TokenKind::Name(name) => ExprKind::Name(name.clone()),
            TokenKind::Int(value) => ExprKind::Int(*value),
            TokenKind::BigInt(digits) => ExprKind::BigInt(digits.clone()),
            TokenKind::Float(value) => ExprKind::Float(*value),
            TokenKind::True => ExprKind::Bool(true),
            TokenKind::False => ExprKind::Bool(false),
            TokenKind::None => ExprKind::NoneLit,
            TokenKind::Str(_) => return self.parse_strings(),
            TokenKind::Ellipsis => {
                self.cursor.advance();
                return Ok(self.unsupported_expr("`...` literal", start));
            }
            TokenKind::LParen => return self.parse_paren(),
            TokenKind::LBracket => return self.parse_list_display(),
            TokenKind::LBrace => return self.parse_brace_display(),
            _ => return Err(self.expected("expression")),
        };
        self.cursor.advance();
        Ok(self.mk_expr(kind, start))
    }

    /// Adjacent string literals concatenate; any `f` part makes an f-string.
    fn parse_strings(&mut self) -> ParseResult<Expr> {
        let start = self.span();
        let mut parts: Vec<FStringPart> = Vec::new();
        let mut is_format = false;
        let mut has_bytes = false;

        while let TokenKind::Str(lit) = self.cursor.current_kind() {
            let lit = lit.clone();
            self.cursor.advance();
            match lit.kind {
                StrKind::Plain => push_literal(&mut parts, &lit.value),
                StrKind::Bytes => has_bytes = true,
                StrKind::Format => {
                    is_format = true;
                    for part in self.parse_fstring(&lit)? {
                        match part {
                            FStringPart::Literal(text) => push_literal(&mut parts, &text),
                            field @ FStringPart::Field { .. } => parts.push(field),
                        }
                    }
                }
            }
        }

        let span = self.span_from(start);
        if has_bytes {
            return Ok(self.unsupported_expr("bytes literal", span));
        }
        if is_format {
            return Ok(self.mk_expr(ExprKind::FString(parts), span));
        }
        let text = match parts.pop() {
            Some(FStringPart::Literal(text)) => text,
            _ => String::new(),
        };
        Ok(self.mk_expr(ExprKind::Str(text), span))
    }

    /// `( )`, `(expr)`, `(a, b)` or a generator expression.
    fn parse_paren(&mut self) -> ParseResult<Expr> {
        let start = self.expect(&TokenKind::LParen, "`(`")?;
        if self.cursor.eat(&TokenKind::RParen) {
            let span = self.span_from(start);
            return Ok(self.mk_expr(ExprKind::Tuple(Vec::new()), span));
        }
        if self.cursor.check(&TokenKind::Yield) {
            let expr = self.parse_yield()?;
            self.expect(&TokenKind::RParen, "`)`")?;
            return Ok(expr);
        }

        let first = self.parse_star_or_named()?;
        if self.cursor.check(&TokenKind::For) {
            let generators = self.parse_comprehension_clauses()?;
            self.expect(&TokenKind::RParen, "`)`")?;
            let span = self.span_from(start);
            return Ok(self.mk_expr(
                ExprKind::GeneratorExp {
                    elt: Box::new(first),
                    generators,
                },
                span,
            ));
        }
        if !self.cursor.check(&TokenKind::Comma) {
            self.expect(&TokenKind::RParen, "`)`")?;
            return Ok(first);
        }

        let mut elements = vec![first];
        while self.cursor.eat(&TokenKind::Comma) {
            if self.cursor.check(&TokenKind::RParen) {
                break;
            }
            elements.push(self.parse_star_or_named()?);
        }
        self.expect(&TokenKind::RParen, "`)`")?;
        let span = self.span_from(start);
        Ok(self.mk_expr(ExprKind::Tuple(elements), span))
    }

    fn parse_star_or_named(&mut self) -> ParseResult<Expr> {
        if self.cursor.check(&TokenKind::Star) {
            self.parse_starred()
        } else {
            self.parse_named_test()
        }
    }

    fn parse_list_display(&mut self) -> ParseResult<Expr> {
        let start = self.expect(&TokenKind::LBracket, "`[`")?;
        let mut elements = Vec::new();
        if !self.cursor.check(&TokenKind::RBracket) {
            let first = self.parse_star_or_named()?;
            if self.cursor.check(&TokenKind::For) {
                let generators = self.parse_comprehension_clauses()?;
                self.expect(&TokenKind::RBracket, "`]`")?;
                let span = self.span_from(start);
                return Ok(self.mk_expr(
                    ExprKind::ListComp {
                        elt: Box::new(first),
                        generators,
                    },
                    span,
                ));
            }
            elements.push(first);
            while self.cursor.eat(&TokenKind::Comma) {
                if self.cursor.check(&TokenKind::RBracket) {
                    break;
                }
                elements.push(self.parse_star_or_named()?);
            }
        }
        self.expect(&TokenKind::RBracket, "`]`")?;
        let span = self.span_from(start);
        Ok(self.mk_expr(ExprKind::List(elements), span))
    }

    /// `{}` dict, `{k: v}` dict, `{a, b}` set, and their comprehensions.
    fn parse_brace_display(&mut self) -> ParseResult<Expr> {
        let start = self.expect(&TokenKind::LBrace, "`{`")?;
        if self.cursor.eat(&TokenKind::RBrace) {
            let span = self.span_from(start);
            return Ok(self.mk_expr(
                ExprKind::Dict {
                    keys: Vec::new(),
                    values: Vec::new(),
                },
                span,
            ));
        }

        if self.cursor.check(&TokenKind::DoubleStar) {
            self.skip_to_closing_brace()?;
            let span = self.span_from(start);
            return Ok(self.unsupported_expr("dict unpacking", span));
        }

        let first = self.parse_star_or_test()?;
        if !self.cursor.eat(&TokenKind::Colon) {
            return self.parse_set_rest(start, first);
        }

        let first_value = self.parse_test()?;
        if self.cursor.check(&TokenKind::For) {
            let generators = self.parse_comprehension_clauses()?;
            self.expect(&TokenKind::RBrace, "`}`")?;
            let span = self.span_from(start);
            return Ok(self.mk_expr(
                ExprKind::DictComp {
                    key: Box::new(first),
                    value: Box::new(first_value),
                    generators,
                },
                span,
            ));
        }

        let mut keys = vec![first];
        let mut values = vec![first_value];
        while self.cursor.eat(&TokenKind::Comma) {
            if self.cursor.check(&TokenKind::RBrace) {
                break;
            }
            if self.cursor.check(&TokenKind::DoubleStar) {
                self.skip_to_closing_brace()?;
                let span = self.span_from(start);
                return Ok(self.unsupported_expr("dict unpacking", span));
            }
            keys.push(self.parse_test()?);
            self.expect(&TokenKind::Colon, "`:` in dict literal")?;
            values.push(self.parse_test()?);
        }
        self.expect(&TokenKind::RBrace, "`}`")?;
        let span = self.span_from(start);
        Ok(self.mk_expr(ExprKind::Dict { keys, values }, span))
    }

    fn parse_set_rest(&mut self, start: Span, first: Expr) -> ParseResult<Expr> {
        if self.cursor.check(&TokenKind::For) {
            let generators = self.parse_comprehension_clauses()?;
            self.expect(&TokenKind::RBrace, "`}`")?;
            let span = self.span_from(start);
            return Ok(self.mk_expr(
                ExprKind::SetComp {
                    elt: Box::new(first),
                    generators,
                },
                span,
            ));
        }
        let mut elements = vec![first];
        while self.cursor.eat(&TokenKind::Comma) {
            if self.cursor.check(&TokenKind::RBrace) {
                break;
            }
            elements.push(self.parse_star_or_test()?);
        }
        self.expect(&TokenKind::RBrace, "`}`")?;
        let span = self.span_from(start);
        Ok(self.mk_expr(ExprKind::Set(elements), span))
    }

    fn skip_to_closing_brace(&mut self) -> ParseResult<()> {
        let mut depth = 1usize;
        loop {
            match self.cursor.current_kind() {
                TokenKind::LBrace => depth += 1,
                TokenKind::RBrace => {
                    depth -= 1;
                    if depth == 0 {
                        self.cursor.advance();
                        return Ok(());
                    }
                }
                TokenKind::Eof => return Err(self.expected("`}`")),
                _ => {}
            }
            self.cursor.advance();
        }
    }

    /// `for target in iter [if cond]*`, repeated.
    fn parse_comprehension_clauses(&mut self) -> ParseResult<Vec<Comprehension>> {
        let mut generators = Vec::new();
        while self.cursor.check(&TokenKind::For) || self.cursor.check(&TokenKind::Async) {
            if self.cursor.eat(&TokenKind::Async) {
                return Err(self.error_here("asynchronous comprehensions are not supported"));
            }
            self.expect(&TokenKind::For, "`for`")?;
            let target = self.parse_target_list()?;
            self.expect(&TokenKind::In, "`in`")?;
            let iter = self.parse_or_test()?;
            let mut ifs = Vec::new();
            while self.cursor.eat(&TokenKind::If) {
                ifs.push(self.parse_or_test()?);
            }
            generators.push(Comprehension { target, iter, ifs });
        }
        Ok(generators)
    }
}

fn binary_operator(level: usize, kind: &TokenKind) -> Option<BinOp> {
    let op = match (level, kind) {
        (0, TokenKind::Pipe) => BinOp::BitOr,
        (1, TokenKind::Caret) => BinOp::BitXor,
        (2, TokenKind::Amp) => BinOp::BitAnd,
        (3, TokenKind::LShift) => BinOp::LShift,
        (3, TokenKind::RShift) => BinOp::RShift,
        (4, TokenKind::Plus) => BinOp::Add,
        (4, TokenKind::Minus) => BinOp::Sub,
        (5, TokenKind::Star) => BinOp::Mul,
        (5, TokenKind::Slash) => BinOp::Div,
        (5, TokenKind::DoubleSlash) => BinOp::FloorDiv,
        (5, TokenKind::Percent) => BinOp::Mod,
        (5, TokenKind::At) => BinOp::MatMul,
        _ => return None,
    };
    Some(op)
}

/// Append literal text, merging with a trailing literal part.
fn push_literal(parts: &mut Vec<FStringPart>, text: &str) {
    if let Some(FStringPart::Literal(last)) = parts.last_mut() {
        last.push_str(text);
    } else {
        parts.push(FStringPart::Literal(text.to_string()));
    }
}
