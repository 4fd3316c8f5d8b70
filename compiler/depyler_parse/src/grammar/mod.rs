//! Grammar productions: definitions and statements here, expressions in
//! [`expr`].

mod expr;

use depyler_ir::ast::{
    ClassDef, ClassField, Decorator, Expr, ExprKind, FunctionDef, Import, Item, Param, Stmt,
    StmtKind,
};
use depyler_ir::Span;
use depyler_lexer::TokenKind;

use crate::{ParseResult, Parser};

enum Definition {
    Function(FunctionDef),
    Class(ClassDef),
}

impl Parser<'_> {
    pub(crate) fn parse_item(&mut self) -> ParseResult<Vec<Item>> {
        match self.cursor.current_kind() {
            TokenKind::Def | TokenKind::Class | TokenKind::At | TokenKind::Async
                if self.starts_definition() =>
            {
                Ok(vec![match self.parse_definition()? {
                    Definition::Function(f) => Item::Function(f),
                    Definition::Class(c) => Item::Class(c),
                }])
            }
            TokenKind::Import | TokenKind::From => {
                let imports = self.parse_import()?;
                self.end_of_statement()?;
                Ok(imports.into_iter().map(Item::Import).collect())
            }
            _ => Ok(self
                .parse_statement()?
                .into_iter()
                .map(Item::Statement)
                .collect()),
        }
    }

    fn starts_definition(&self) -> bool {
        match self.cursor.current_kind() {
            TokenKind::Async => matches!(self.cursor.peek_kind(1), TokenKind::Def),
            _ => true,
        }
    }

    fn parse_definition(&mut self) -> ParseResult<Definition> {
        let start = self.span();
        let pragmas = self.leading_comments(self.line_of(start));

        let mut decorators = Vec::new();
        while self.cursor.check(&TokenKind::At) {
            decorators.push(self.parse_decorator()?);
        }

        let is_async = self.cursor.eat(&TokenKind::Async);
        match self.cursor.current_kind() {
            TokenKind::Def => {
                let mut function = self.parse_function(start, decorators, pragmas)?;
                if is_async {
                    let stmt = self.unsupported_stmt("async function", function.name_span);
                    function.body.insert(0, stmt);
                }
                Ok(Definition::Function(function))
            }
            TokenKind::Class => Ok(Definition::Class(
                self.parse_class(start, decorators, pragmas)?,
            )),
            _ => Err(self.expected("`def` or `class`")),
        }
    }

    fn parse_decorator(&mut self) -> ParseResult<Decorator> {
        let start = self.expect(&TokenKind::At, "`@`")?;
        let (mut name, _) = self.expect_name()?;
        while self.cursor.eat(&TokenKind::Dot) {
            let (part, _) = self.expect_name()?;
            name.push('.');
            name.push_str(&part);
        }
        let has_arguments = self.cursor.check(&TokenKind::LParen);
        if has_arguments {
            self.cursor.advance();
            self.parse_call_arguments()?;
        }
        let span = self.span_from(start);
        self.expect(&TokenKind::Newline, "end of line after decorator")?;
        Ok(Decorator {
            name,
            has_arguments,
            span,
        })
    }

    fn parse_function(
        &mut self,
        start: Span,
        decorators: Vec<Decorator>,
        pragmas: Vec<depyler_ir::ast::CommentLine>,
    ) -> ParseResult<FunctionDef> {
        let id = self.fresh_id();
        self.expect(&TokenKind::Def, "`def`")?;
        let (name, name_span) = self.expect_name()?;
        self.expect(&TokenKind::LParen, "`(`")?;
        let (params, mut unsupported) = self.parse_params()?;
        self.expect(&TokenKind::RParen, "`)`")?;
        let returns = if self.cursor.eat(&TokenKind::Arrow) {
            Some(self.parse_annotation()?)
        } else {
            None
        };
        let (body, docstring) = self.parse_suite_with_docstring()?;
        unsupported.extend(body);

        Ok(FunctionDef {
            id,
            name,
            name_span,
            params,
            returns,
            body: unsupported,
            decorators,
            pragmas,
            docstring,
            span: self.span_from(start),
        })
    }

    /// Parameters, plus `Unsupported` statements for star/positional markers.
    fn parse_params(&mut self) -> ParseResult<(Vec<Param>, Vec<Stmt>)> {
        let mut params = Vec::new();
        let mut unsupported = Vec::new();

        while !self.cursor.check(&TokenKind::RParen) {
            let start = self.span();
            match self.cursor.current_kind() {
                TokenKind::Star | TokenKind::DoubleStar => {
                    self.cursor.advance();
                    if let TokenKind::Name(_) = self.cursor.current_kind() {
                        self.cursor.advance();
                        if self.cursor.eat(&TokenKind::Colon) {
                            self.parse_annotation()?;
                        }
                    }
                    let span = self.span_from(start);
                    unsupported.push(self.unsupported_stmt("variadic parameters", span));
                }
                TokenKind::Slash => {
                    self.cursor.advance();
                    let span = self.span_from(start);
                    unsupported.push(self.unsupported_stmt("positional-only marker", span));
                }
                _ => {
                    let id = self.fresh_id();
                    let (name, _) = self.expect_name()?;
                    let annotation = if self.cursor.eat(&TokenKind::Colon) {
                        Some(self.parse_annotation()?)
                    } else {
                        None
                    };
                    let default = if self.cursor.eat(&TokenKind::Eq) {
                        Some(self.parse_test()?)
                    } else {
                        None
                    };
                    params.push(Param {
                        id,
                        name,
                        annotation,
                        default,
                        span: self.span_from(start),
                    });
                }
            }
            if !self.cursor.eat(&TokenKind::Comma) {
                break;
            }
        }
        Ok((params, unsupported))
    }

    fn parse_class(
        &mut self,
        start: Span,
        decorators: Vec<Decorator>,
        pragmas: Vec<depyler_ir::ast::CommentLine>,
    ) -> ParseResult<ClassDef> {
        let id = self.fresh_id();
        self.expect(&TokenKind::Class, "`class`")?;
        let (name, name_span) = self.expect_name()?;

        let mut bases = Vec::new();
        let mut unsupported = Vec::new();
        if self.cursor.eat(&TokenKind::LParen) {
            let (args, keywords) = self.parse_call_arguments()?;
            for arg in args {
                let text = self.source_text(arg.span).to_string();
                bases.push(text);
            }
            for keyword in keywords {
                let stmt = self.unsupported_stmt(
                    &format!("class keyword `{}`", keyword.name),
                    keyword.value.span,
                );
                unsupported.push(stmt);
            }
        }

        self.expect(&TokenKind::Colon, "`:`")?;
        let mut class = ClassDef {
            id,
            name,
            name_span,
            bases,
            fields: Vec::new(),
            methods: Vec::new(),
            unsupported,
            decorators,
            pragmas,
            docstring: None,
            span: Span::DUMMY,
        };

        if self.cursor.eat(&TokenKind::Newline) {
            self.expect(&TokenKind::Indent, "indented class body")?;
            let mut first = true;
            while !self.cursor.check(&TokenKind::Dedent) && !self.cursor.is_at_end() {
                if self.cursor.eat(&TokenKind::Newline) {
                    continue;
                }
                self.parse_class_member(&mut class, first)?;
                first = false;
            }
            self.expect(&TokenKind::Dedent, "end of class body")?;
        } else {
            for stmt in self.parse_simple_statements()? {
                self.classify_class_stmt(&mut class, stmt, false);
            }
        }

        class.span = self.span_from(start);
        Ok(class)
    }

    fn parse_class_member(&mut self, class: &mut ClassDef, first: bool) -> ParseResult<()> {
        if matches!(
            self.cursor.current_kind(),
            TokenKind::Def | TokenKind::At | TokenKind::Class
        ) || (self.cursor.check(&TokenKind::Async) && self.starts_definition())
        {
            let start = self.span();
            match self.parse_definition()? {
                Definition::Function(method) => class.methods.push(method),
                Definition::Class(_) => {
                    let span = self.span_from(start);
                    let stmt = self.unsupported_stmt("nested class", span);
                    class.unsupported.push(stmt);
                }
            }
            return Ok(());
        }
        for stmt in self.parse_statement()? {
            self.classify_class_stmt(class, stmt, first);
        }
        Ok(())
    }

    fn classify_class_stmt(&mut self, class: &mut ClassDef, stmt: Stmt, first: bool) {
        match stmt.kind {
            StmtKind::Expr(Expr {
                kind: ExprKind::Str(text),
                ..
            }) if first => class.docstring = Some(text),
            StmtKind::Pass => {}
            StmtKind::AnnAssign {
                target,
                annotation,
                value,
            } if target.as_name().is_some() => {
                class.fields.push(ClassField {
                    name: target.as_name().unwrap_or_default().to_string(),
                    annotation: Some(annotation),
                    default: value,
                    span: stmt.span,
                });
            }
            StmtKind::Assign { targets, value }
                if targets.len() == 1 && targets[0].as_name().is_some() =>
            {
                class.fields.push(ClassField {
                    name: targets[0].as_name().unwrap_or_default().to_string(),
                    annotation: None,
                    default: Some(value),
                    span: stmt.span,
                });
            }
            StmtKind::Unsupported { .. } => class.unsupported.push(stmt),
            _ => {
                let unsupported = self.unsupported_stmt("statement in class body", stmt.span);
                class.unsupported.push(unsupported);
            }
        }
    }

    fn parse_import(&mut self) -> ParseResult<Vec<Import>> {
        let start = self.span();
        if self.cursor.eat(&TokenKind::Import) {
            let mut imports = Vec::new();
            loop {
                let module = self.parse_dotted_name()?;
                let alias = if self.cursor.eat(&TokenKind::As) {
                    Some(self.expect_name()?.0)
                } else {
                    None
                };
                imports.push(Import {
                    module,
                    names: Vec::new(),
                    alias,
                    span: self.span_from(start),
                });
                if !self.cursor.eat(&TokenKind::Comma) {
                    return Ok(imports);
                }
            }
        }

        self.expect(&TokenKind::From, "`from`")?;
        let mut module = String::new();
        while self.cursor.check(&TokenKind::Dot) || self.cursor.check(&TokenKind::Ellipsis) {
            let dots = if self.cursor.check(&TokenKind::Dot) { "." } else { "..." };
            module.push_str(dots);
            self.cursor.advance();
        }
        if !self.cursor.check(&TokenKind::Import) {
            module.push_str(&self.parse_dotted_name()?);
        }
        self.expect(&TokenKind::Import, "`import`")?;

        let mut names = Vec::new();
        if self.cursor.eat(&TokenKind::Star) {
            names.push(("*".to_string(), None));
        } else {
            let parenthesized = self.cursor.eat(&TokenKind::LParen);
            loop {
                if parenthesized && self.cursor.check(&TokenKind::RParen) {
                    break;
                }
                let (name, _) = self.expect_name()?;
                let alias = if self.cursor.eat(&TokenKind::As) {
                    Some(self.expect_name()?.0)
                } else {
                    None
                };
                names.push((name, alias));
                if !self.cursor.eat(&TokenKind::Comma) {
                    break;
                }
            }
            if parenthesized {
                self.expect(&TokenKind::RParen, "`)`")?;
            }
        }
        Ok(vec![Import {
            module,
            names,
            alias: None,
            span: self.span_from(start),
        }])
    }

    fn parse_dotted_name(&mut self) -> ParseResult<String> {
        let (mut name, _) = self.expect_name()?;
        while self.cursor.eat(&TokenKind::Dot) {
            name.push('.');
            name.push_str(&self.expect_name()?.0);
        }
        Ok(name)
    }

    // Blocks

    /// `: NEWLINE INDENT stmt+ DEDENT` or `: simple_stmt`.
    pub(crate) fn parse_block(&mut self) -> ParseResult<Vec<Stmt>> {
        self.expect(&TokenKind::Colon, "`:`")?;
        if !self.cursor.eat(&TokenKind::Newline) {
            return self.parse_simple_statements();
        }
        self.expect(&TokenKind::Indent, "an indented block")?;
        let mut body = Vec::new();
        while !self.cursor.check(&TokenKind::Dedent) && !self.cursor.is_at_end() {
            if self.cursor.eat(&TokenKind::Newline) {
                continue;
            }
            body.extend(self.parse_statement()?);
        }
        self.expect(&TokenKind::Dedent, "end of block")?;
        Ok(body)
    }

    fn parse_suite_with_docstring(&mut self) -> ParseResult<(Vec<Stmt>, Option<String>)> {
        let mut body = self.parse_block()?;
        let docstring = match body.first().map(|s| &s.kind) {
            Some(StmtKind::Expr(Expr {
                kind: ExprKind::Str(text),
                ..
            })) => Some(text.clone()),
            _ => None,
        };
        if docstring.is_some() {
            body.remove(0);
        }
        Ok((body, docstring))
    }

    // Statements

    pub(crate) fn parse_statement(&mut self) -> ParseResult<Vec<Stmt>> {
        let start = self.span();
        match self.cursor.current_kind() {
            TokenKind::If => Ok(vec![self.parse_if()?]),
            TokenKind::While => Ok(vec![self.parse_while()?]),
            TokenKind::For => Ok(vec![self.parse_for()?]),
            TokenKind::Try => {
                self.skip_try()?;
                let span = self.span_from(start);
                Ok(vec![self.unsupported_stmt("`try` statement", span)])
            }
            TokenKind::With => {
                self.cursor.advance();
                loop {
                    self.parse_test()?;
                    if self.cursor.eat(&TokenKind::As) {
                        self.parse_target_list()?;
                    }
                    if !self.cursor.eat(&TokenKind::Comma) {
                        break;
                    }
                }
                self.parse_block()?;
                let span = self.span_from(start);
                Ok(vec![self.unsupported_stmt("`with` statement", span)])
            }
            TokenKind::Def | TokenKind::Class | TokenKind::At => {
                let construct = match self.parse_definition()? {
                    Definition::Function(_) => "nested function definition",
                    Definition::Class(_) => "nested class definition",
                };
                let span = self.span_from(start);
                Ok(vec![self.unsupported_stmt(construct, span)])
            }
            TokenKind::Async => {
                self.cursor.advance();
                self.parse_statement()?;
                let span = self.span_from(start);
                Ok(vec![self.unsupported_stmt("`async` statement", span)])
            }
            _ => self.parse_simple_statements(),
        }
    }

    fn parse_if(&mut self) -> ParseResult<Stmt> {
        let start = self.span();
        // `if` or `elif`
        self.cursor.advance();
        let test = self.parse_named_test()?;
        let body = self.parse_block()?;
        let orelse = match self.cursor.current_kind() {
            TokenKind::Elif => vec![self.parse_if()?],
            TokenKind::Else => {
                self.cursor.advance();
                self.parse_block()?
            }
            _ => Vec::new(),
        };
        Ok(Stmt {
            id: self.fresh_id(),
            kind: StmtKind::If { test, body, orelse },
            span: self.span_from(start),
        })
    }

    fn parse_while(&mut self) -> ParseResult<Stmt> {
        let start = self.expect(&TokenKind::While, "`while`")?;
        let test = self.parse_named_test()?;
        let body = self.parse_block()?;
        if self.cursor.eat(&TokenKind::Else) {
            self.parse_block()?;
            let span = self.span_from(start);
            return Ok(self.unsupported_stmt("`while ... else`", span));
        }
        Ok(Stmt {
            id: self.fresh_id(),
            kind: StmtKind::While { test, body },
            span: self.span_from(start),
        })
    }

    fn parse_for(&mut self) -> ParseResult<Stmt> {
        let start = self.expect(&TokenKind::For, "`for`")?;
        let target = self.parse_target_list()?;
        self.expect(&TokenKind::In, "`in`")?;
        let iter = self.parse_testlist()?;
        let body = self.parse_block()?;
        if self.cursor.eat(&TokenKind::Else) {
            self.parse_block()?;
            let span = self.span_from(start);
            return Ok(self.unsupported_stmt("`for ... else`", span));
        }
        Ok(Stmt {
            id: self.fresh_id(),
            kind: StmtKind::For { target, iter, body },
            span: self.span_from(start),
        })
    }

    fn skip_try(&mut self) -> ParseResult<()> {
        self.expect(&TokenKind::Try, "`try`")?;
        self.parse_block()?;
        loop {
            match self.cursor.current_kind() {
                TokenKind::Except => {
                    self.cursor.advance();
                    if !self.cursor.check(&TokenKind::Colon) {
                        self.cursor.eat(&TokenKind::Star);
                        self.parse_test()?;
                        if self.cursor.eat(&TokenKind::As) {
                            self.expect_name()?;
                        }
                    }
                    self.parse_block()?;
                }
                TokenKind::Else | TokenKind::Finally => {
                    self.cursor.advance();
                    self.parse_block()?;
                }
                _ => return Ok(()),
            }
        }
    }

    /// `small_stmt (';' small_stmt)* NEWLINE`
    fn parse_simple_statements(&mut self) -> ParseResult<Vec<Stmt>> {
        let mut stmts = vec![self.parse_small_statement()?];
        while self.cursor.eat(&TokenKind::Semi) {
            if matches!(
                self.cursor.current_kind(),
                TokenKind::Newline | TokenKind::Eof
            ) {
                break;
            }
            stmts.push(self.parse_small_statement()?);
        }
        self.end_of_statement()?;
        Ok(stmts)
    }

    fn end_of_statement(&mut self) -> ParseResult<()> {
        if self.cursor.eat(&TokenKind::Newline) || self.cursor.is_at_end() {
            Ok(())
        } else {
            Err(self.expected("end of line"))
        }
    }

    fn at_statement_end(&self) -> bool {
        matches!(
            self.cursor.current_kind(),
            TokenKind::Newline | TokenKind::Semi | TokenKind::Eof
        )
    }

    fn parse_small_statement(&mut self) -> ParseResult<Stmt> {
        let start = self.span();
        let kind = match self.cursor.current_kind() {
            TokenKind::Pass => {
                self.cursor.advance();
                StmtKind::Pass
            }
            TokenKind::Break => {
                self.cursor.advance();
                StmtKind::Break
            }
            TokenKind::Continue => {
                self.cursor.advance();
                StmtKind::Continue
            }
            TokenKind::Return => {
                self.cursor.advance();
                if self.at_statement_end() {
                    StmtKind::Return(None)
                } else {
                    StmtKind::Return(Some(self.parse_testlist()?))
                }
            }
            TokenKind::Raise => {
                self.cursor.advance();
                let exc = if self.at_statement_end() {
                    None
                } else {
                    Some(self.parse_test()?)
                };
                if self.cursor.eat(&TokenKind::From) {
                    self.parse_test()?;
                }
                StmtKind::Raise(exc)
            }
            TokenKind::Assert => {
                self.cursor.advance();
                let test = self.parse_test()?;
                let msg = if self.cursor.eat(&TokenKind::Comma) {
                    Some(self.parse_test()?)
                } else {
                    None
                };
                StmtKind::Assert { test, msg }
            }
            TokenKind::Global | TokenKind::Nonlocal => {
                let construct = if self.cursor.check(&TokenKind::Global) {
                    "`global` declaration"
                } else {
                    "`nonlocal` declaration"
                };
                self.cursor.advance();
                loop {
                    self.expect_name()?;
                    if !self.cursor.eat(&TokenKind::Comma) {
                        break;
                    }
                }
                StmtKind::Unsupported {
                    construct: construct.to_string(),
                }
            }
            TokenKind::Del => {
                self.cursor.advance();
                self.parse_testlist()?;
                StmtKind::Unsupported {
                    construct: "`del` statement".to_string(),
                }
            }
            TokenKind::Import | TokenKind::From => {
                self.parse_import()?;
                StmtKind::Unsupported {
                    construct: "import inside a function".to_string(),
                }
            }
            _ => return self.parse_expression_statement(start),
        };
        Ok(Stmt {
            id: self.fresh_id(),
            kind,
            span: self.span_from(start),
        })
    }

    fn parse_expression_statement(&mut self, start: Span) -> ParseResult<Stmt> {
        let first = self.parse_testlist_star()?;

        let kind = match self.cursor.current_kind().clone() {
            TokenKind::Colon => {
                self.cursor.advance();
                let annotation = self.parse_annotation()?;
                let value = if self.cursor.eat(&TokenKind::Eq) {
                    Some(self.parse_testlist_star()?)
                } else {
                    None
                };
                StmtKind::AnnAssign {
                    target: first,
                    annotation,
                    value,
                }
            }
            TokenKind::AugAssign(op) => {
                self.cursor.advance();
                let value = self.parse_testlist()?;
                StmtKind::AugAssign {
                    target: first,
                    op,
                    value,
                }
            }
            TokenKind::Eq => {
                let mut targets = vec![first];
                self.cursor.advance();
                let mut value = self.parse_testlist_star()?;
                while self.cursor.eat(&TokenKind::Eq) {
                    targets.push(value);
                    value = self.parse_testlist_star()?;
                }
                StmtKind::Assign { targets, value }
            }
            _ => StmtKind::Expr(first),
        };

        Ok(Stmt {
            id: self.fresh_id(),
            kind,
            span: self.span_from(start),
        })
    }
}
