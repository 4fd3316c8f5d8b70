//! Expressions.

use depyler_diagnostic::{unsupported_construct, Diagnostic, DiagnosticKind};
use depyler_ir::ast::{BinOp, BoolOp, CmpOp, Comprehension, Expr, ExprKind, FStringPart, UnaryOp};
use depyler_ir::stack::ensure_sufficient_stack;
use depyler_ir::Span;

use super::index::literal_index;
use super::{Deferred, IndexCheck, Inferencer, SubscriptSite};
use crate::builtins::BuiltinTable;
use crate::{IntKind, RustType};

/// Kind of container a literal or comprehension builds.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Collection {
    List,
    Set,
}

impl Collection {
    fn wrap(self, elem: RustType) -> RustType {
        match self {
            Collection::List => RustType::vec(elem),
            Collection::Set => RustType::hash_set(elem),
        }
    }

    fn name(self) -> &'static str {
        match self {
            Collection::List => "list",
            Collection::Set => "set",
        }
    }
}

impl Inferencer<'_> {
    /// Infer and record the type of `expr`.
    pub(super) fn expr(&mut self, expr: &Expr) -> RustType {
        let ty = ensure_sufficient_stack(|| self.expr_kind(expr));
        self.record(expr.id, ty, expr.span)
    }

    /// Infer `expr` where only its truthiness is used. `and`/`or`/`not`
    /// there are plain `bool` operators over independently typed operands.
    pub(super) fn condition(&mut self, expr: &Expr) -> RustType {
        match &expr.kind {
            ExprKind::BoolOp { values, .. } => {
                ensure_sufficient_stack(|| {
                    for value in values {
                        self.condition(value);
                    }
                });
                self.record(expr.id, RustType::Bool, expr.span)
            }
            ExprKind::UnaryOp {
                op: UnaryOp::Not,
                operand,
            } => {
                ensure_sufficient_stack(|| self.condition(operand));
                self.record(expr.id, RustType::Bool, expr.span)
            }
            _ => self.expr(expr),
        }
    }

    fn expr_kind(&mut self, expr: &Expr) -> RustType {
        match &expr.kind {
            ExprKind::Int(_) => RustType::Int(self.int_kind),
            // Reported by width selection.
            ExprKind::BigInt(_) => RustType::Unresolved,
            ExprKind::Float(_) => RustType::Float,
            ExprKind::Str(_) => RustType::Str,
            ExprKind::Bool(_) => RustType::Bool,
            ExprKind::NoneLit => RustType::option(self.unifier.fresh()),
            ExprKind::FString(parts) => {
                for part in parts {
                    if let FStringPart::Field { expr, .. } = part {
                        self.expr(expr);
                    }
                }
                RustType::Str
            }
            ExprKind::Name(name) => self.name(expr, name),
            ExprKind::Attribute { value, attr } => self.attribute(expr, value, attr),
            ExprKind::Subscript { value, index } => self.subscript(expr, value, index),
            ExprKind::Slice { lower, upper, step } => {
                for part in [lower, upper, step].into_iter().flatten() {
                    let ty = self.expr(part);
                    self.expect_int(&ty, part.span, "slice bound");
                }
                RustType::Unresolved
            }
            ExprKind::Call {
                func,
                args,
                keywords,
            } => self.call(expr, func, args, keywords),
            ExprKind::BinOp { left, op, right } => {
                let lhs = self.expr(left);
                let rhs = self.expr(right);
                self.binary(expr.span, *op, &lhs, &rhs)
            }
            ExprKind::UnaryOp { op, operand } => {
                let ty = if matches!(op, UnaryOp::Not) {
                    self.condition(operand)
                } else {
                    self.expr(operand)
                };
                self.unary(expr.span, *op, &ty)
            }
            ExprKind::BoolOp { op, values } => self.bool_op(expr.span, *op, values),
            ExprKind::Compare {
                left,
                ops,
                comparators,
            } => {
                self.compare(left, ops, comparators);
                RustType::Bool
            }
            ExprKind::IfExp { test, body, orelse } => {
                self.condition(test);
                let then_ty = self.expr(body);
                let else_ty = self.expr(orelse);
                match self.unifier.join(&then_ty, &else_ty) {
                    Ok(ty) => ty,
                    Err(mismatch) => {
                        let diag = self.mismatch_diag(orelse.span, "conditional expression", &mismatch);
                        self.error(diag.with_secondary_label(body.span, "the other branch"))
                    }
                }
            }
            ExprKind::List(items) => self.sequence_literal(expr, Collection::List, items),
            ExprKind::Set(items) => self.sequence_literal(expr, Collection::Set, items),
            ExprKind::Tuple(items) => RustType::Tuple(items.iter().map(|e| self.expr(e)).collect()),
            ExprKind::Dict { keys, values } => self.dict_literal(expr, keys, values),
            ExprKind::ListComp { elt, generators } | ExprKind::GeneratorExp { elt, generators } => {
                self.comprehension(generators, |this| RustType::vec(this.expr(elt)))
            }
            ExprKind::SetComp { elt, generators } => {
                self.comprehension(generators, |this| RustType::hash_set(this.expr(elt)))
            }
            ExprKind::DictComp {
                key,
                value,
                generators,
            } => self.comprehension(generators, |this| {
                let k = this.expr(key);
                let v = this.expr(value);
                RustType::hash_map(k, v)
            }),
            ExprKind::Unsupported { construct } => {
                self.error(unsupported_construct(expr.span, construct))
            }
        }
    }

    fn name(&mut self, expr: &Expr, name: &str) -> RustType {
        if let Some(ty) = self.lookup(name) {
            return ty;
        }
        if name == "self" && self.init_mode {
            return RustType::Struct(self.class.map(|c| c.name.clone()).unwrap_or_default());
        }
        if let Some(constant) = self.ctx.constants.get(name) {
            return constant.ty.clone();
        }
        if let Some(member) = self.ctx.math_names.get(name) {
            if member.is_constant() {
                return RustType::Float;
            }
        }
        let what = if self.ctx.function(name).is_some() || self.ctx.class(name).is_some() {
            Some("a function or class used as a value")
        } else if self.ctx.math_names.contains_key(name) || BuiltinTable::get().function(name).is_some() {
            Some("a builtin function used as a value")
        } else {
            None
        };
        if let Some(what) = what {
            return self.error(unsupported_construct(expr.span, what));
        }
        self.error(
            Diagnostic::new(DiagnosticKind::TypeUnificationError, expr.span)
                .with_message(format!("cannot infer a type for undefined name `{name}`"))
                .with_label("not a parameter, local, or module constant"),
        )
    }

    fn attribute(&mut self, expr: &Expr, value: &Expr, attr: &str) -> RustType {
        if let Some(module) = value.as_name().filter(|n| !self.is_bound(n)) {
            if self.ctx.is_math_module(module) {
                return match BuiltinTable::get().math(attr) {
                    Some(member) if member.is_constant() => RustType::Float,
                    Some(_) => self.error(unsupported_construct(
                        expr.span,
                        "a `math` function used as a value",
                    )),
                    None => self.error(unsupported_construct(
                        expr.span,
                        &format!("`math.{attr}`"),
                    )),
                };
            }
            if self.ctx.foreign_modules.contains(module) {
                return self.error(unsupported_construct(
                    expr.span,
                    &format!("module `{module}`"),
                ));
            }
        }

        if self.init_mode && value.as_name() == Some("self") {
            self.expr(value);
            if let Some(field) = self.fields.get(attr) {
                return field.ty.clone();
            }
            if let Some(field) = self.class.and_then(|c| c.field(attr)) {
                if field.default.is_some() {
                    return field.ty.clone();
                }
            }
            return self.error(
                Diagnostic::new(DiagnosticKind::TypeUnificationError, expr.span)
                    .with_message(format!("`self.{attr}` is read before it is assigned"))
                    .with_label("no earlier assignment in `__init__`"),
            );
        }

        let receiver = self.expr(value);
        match self.unifier.shallow(&receiver) {
            RustType::Struct(class) => {
                let field = self.ctx.class(&class).and_then(|c| c.field(attr));
                match field {
                    Some(field) => field.ty.clone(),
                    None => self.error(
                        Diagnostic::new(DiagnosticKind::TypeUnificationError, expr.span)
                            .with_message(format!("`{class}` has no field `{attr}`"))
                            .with_label("unknown field")
                            .with_note("classes lower to structs with a fixed set of fields"),
                    ),
                }
            }
            RustType::Unresolved => RustType::Unresolved,
            other => self.error(
                Diagnostic::new(DiagnosticKind::TypeUnificationError, expr.span)
                    .with_message(format!(
                        "no attribute `{attr}` on a value of type `{}`",
                        self.unifier.resolve(&other).python_name()
                    ))
                    .with_label("attribute access here"),
            ),
        }
    }

    // Indexing

    fn subscript(&mut self, expr: &Expr, value: &Expr, index: &Expr) -> RustType {
        let receiver = self.expr(value);
        let key = self.expr(index);
        let site = SubscriptSite {
            node: expr.id,
            span: expr.span,
            is_slice: matches!(index.kind, ExprKind::Slice { .. }),
            literal: literal_index(index),
            check: self.classify(value, index),
        };

        if matches!(self.unifier.shallow(&receiver), RustType::Var(_)) {
            let result = self.unifier.fresh();
            self.deferred.push(Deferred::Subscript {
                site,
                receiver,
                index: key,
                result: result.clone(),
            });
            return result;
        }
        self.subscript_type(&site, &receiver, &key)
    }

    fn classify(&self, value: &Expr, index: &Expr) -> IndexCheck {
        if self.pragmas.bounds_checking() == depyler_pragma::BoundsChecking::Explicit {
            IndexCheck::Explicit
        } else {
            self.facts.classify(value, index)
        }
    }

    /// Type of `receiver[index]` once the receiver type is known.
    pub(super) fn subscript_type(
        &mut self,
        site: &SubscriptSite,
        receiver: &RustType,
        index: &RustType,
    ) -> RustType {
        let span = site.span;
        let receiver = self.unifier.shallow(receiver);
        if site.is_slice {
            return match receiver {
                RustType::Str | RustType::Vec(_) | RustType::Unresolved | RustType::Dynamic => receiver,
                other => self.not_indexable(span, &other),
            };
        }
        match receiver {
            RustType::Vec(elem) => {
                self.expect_int(index, span, "list index");
                self.index_checks.insert(site.node, site.check);
                *elem
            }
            RustType::Str | RustType::Char => {
                self.expect_int(index, span, "string index");
                self.index_checks.insert(site.node, site.check);
                RustType::Char
            }
            RustType::HashMap(key, value) => {
                self.coerce_into(index, &key, span, "dict key");
                *value
            }
            RustType::Tuple(items) => self.tuple_index(site, &items),
            RustType::Dynamic | RustType::Unresolved => receiver,
            other => self.not_indexable(span, &other),
        }
    }

    fn tuple_index(&mut self, site: &SubscriptSite, items: &[RustType]) -> RustType {
        let len = i128::try_from(items.len()).unwrap_or(i128::MAX);
        match site.literal {
            Some(k) if (-len..len).contains(&k) => {
                let position = if k < 0 { k + len } else { k };
                usize::try_from(position)
                    .ok()
                    .and_then(|p| items.get(p).cloned())
                    .unwrap_or(RustType::Unresolved)
            }
            Some(_) => self.error(
                Diagnostic::new(DiagnosticKind::TypeUnificationError, site.span)
                    .with_message("tuple index out of range")
                    .with_label(format!("the tuple has {} elements", items.len())),
            ),
            None => self.error(
                unsupported_construct(site.span, "tuple indexed by a non-literal")
                    .with_note("tuple elements may have different types"),
            ),
        }
    }

    fn not_indexable(&mut self, span: Span, ty: &RustType) -> RustType {
        let shown = self.unifier.resolve(ty).python_name();
        self.error(
            Diagnostic::new(DiagnosticKind::TypeUnificationError, span)
                .with_message(format!("`{shown}` cannot be indexed"))
                .with_label("indexed here"),
        )
    }

    /// Slot type of `receiver[key] = ...`.
    pub(super) fn store_slot(&mut self, target: &Expr, receiver: &RustType, key: &RustType) -> RustType {
        match self.unifier.shallow(receiver) {
            RustType::Vec(elem) => {
                self.expect_int(key, target.span, "list index");
                if let ExprKind::Subscript { value, index } = &target.kind {
                    let check = self.classify(value, index);
                    self.index_checks.insert(target.id, check);
                }
                *elem
            }
            RustType::HashMap(k, v) => {
                self.coerce_into(key, &k, target.span, "dict key");
                *v
            }
            RustType::Dynamic | RustType::Unresolved => RustType::Unresolved,
            RustType::Var(_) => self.error(
                Diagnostic::new(DiagnosticKind::IndexSemanticsError, target.span)
                    .with_message("cannot decide the meaning of this item assignment")
                    .with_label("the type of the indexed value is unknown")
                    .with_suggestion("annotate the indexed value"),
            ),
            other => {
                let shown = self.unifier.resolve(&other).python_name();
                self.error(
                    Diagnostic::new(DiagnosticKind::TypeUnificationError, target.span)
                        .with_message(format!("`{shown}` does not support item assignment"))
                        .with_label("assigned here"),
                )
            }
        }
    }

    fn expect_int(&mut self, ty: &RustType, span: Span, what: &str) {
        match self.unifier.shallow(ty) {
            RustType::Int(_) | RustType::Unresolved | RustType::Dynamic => {}
            RustType::Var(_) => {
                let int = RustType::Int(self.int_kind);
                self.refine(ty, &int, span, what);
            }
            other => {
                let shown = self.unifier.resolve(&other).python_name();
                self.diagnostics.push(
                    Diagnostic::new(DiagnosticKind::TypeUnificationError, span)
                        .with_message(format!("{what} must be `int`, found `{shown}`"))
                        .with_label(format!("`{shown}` used as {what}")),
                );
            }
        }
    }

    // Iteration

    /// Element type of iterating `iterable`, deferring unknown receivers.
    pub(super) fn iterate(&mut self, iterable: &RustType, span: Span) -> RustType {
        if matches!(self.unifier.shallow(iterable), RustType::Var(_)) {
            let item = self.unifier.fresh();
            self.deferred.push(Deferred::Iterate {
                span,
                iterable: iterable.clone(),
                item: item.clone(),
            });
            return item;
        }
        self.item_type(iterable, span)
    }

    pub(super) fn item_type(&mut self, iterable: &RustType, span: Span) -> RustType {
        let resolved = self.unifier.shallow(iterable);
        match resolved.iter_item() {
            Some(item) => item,
            None if resolved == RustType::Unresolved => RustType::Unresolved,
            None => {
                let shown = self.unifier.resolve(&resolved).python_name();
                self.error(
                    Diagnostic::new(DiagnosticKind::TypeUnificationError, span)
                        .with_message(format!("`{shown}` is not iterable"))
                        .with_label("iterated here"),
                )
            }
        }
    }

    // Operators

    pub(super) fn binary(&mut self, span: Span, op: BinOp, lhs: &RustType, rhs: &RustType) -> RustType {
        if op == BinOp::MatMul {
            return self.error(unsupported_construct(span, "matrix multiplication `@`"));
        }
        let mut left = self.unifier.shallow(lhs);
        let mut right = self.unifier.shallow(rhs);

        // An unknown operand takes the type of a known one.
        match (&left, &right) {
            (RustType::Var(_), RustType::Var(_)) => {
                self.refine(&left, &right, span, "operands");
            }
            (RustType::Var(_), other) | (other, RustType::Var(_))
                if other.is_numeric() || other.is_stringlike() =>
            {
                let known = match other {
                    RustType::Char => RustType::Str,
                    RustType::Int(_) if op == BinOp::Div => RustType::Float,
                    _ => other.clone(),
                };
                let var = if matches!(left, RustType::Var(_)) { &left } else { &right };
                self.refine(var, &known, span, "operands");
            }
            _ => {}
        }
        left = self.unifier.shallow(&left);
        right = self.unifier.shallow(&right);

        let result = match (op, &left, &right) {
            (_, RustType::Unresolved, _) | (_, _, RustType::Unresolved) => Some(RustType::Unresolved),
            (_, RustType::Dynamic, _) | (_, _, RustType::Dynamic) => Some(RustType::Dynamic),
            (_, RustType::Var(_), RustType::Var(_)) => Some(left.clone()),
            (BinOp::Mod, RustType::Str, _) => {
                return self.error(
                    unsupported_construct(span, "`%`-formatting")
                        .with_suggestion("use an f-string"),
                )
            }
            (BinOp::Div, l, r) if l.is_numeric() && r.is_numeric() => Some(RustType::Float),
            (
                BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::FloorDiv | BinOp::Mod | BinOp::Pow,
                l,
                r,
            ) if l.is_numeric() && r.is_numeric() => self.unifier.join(l, r).ok(),
            (BinOp::Add, l, r) if l.is_stringlike() && r.is_stringlike() => Some(RustType::Str),
            (BinOp::Add, RustType::Vec(_), RustType::Vec(_)) => self.unifier.join(&left, &right).ok(),
            (BinOp::Mul, RustType::Str | RustType::Char, RustType::Int(_))
            | (BinOp::Mul, RustType::Int(_), RustType::Str | RustType::Char) => Some(RustType::Str),
            (BinOp::Mul, RustType::Vec(_), RustType::Int(_)) => Some(left.clone()),
            (BinOp::Mul, RustType::Int(_), RustType::Vec(_)) => Some(right.clone()),
            (
                BinOp::LShift | BinOp::RShift | BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor,
                RustType::Int(a),
                RustType::Int(b),
            ) => Some(RustType::Int((*a).max(*b))),
            (BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor, RustType::Bool, RustType::Bool) => {
                Some(RustType::Bool)
            }
            (
                BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor | BinOp::Sub,
                RustType::HashSet(_),
                RustType::HashSet(_),
            ) => self.unifier.join(&left, &right).ok(),
            _ => None,
        };

        let Some(result) = result else {
            let (l, r) = (
                self.unifier.resolve(&left).python_name(),
                self.unifier.resolve(&right).python_name(),
            );
            return self.error(
                Diagnostic::new(DiagnosticKind::TypeUnificationError, span)
                    .with_message(format!("unsupported operand types for `{op}`: `{l}` and `{r}`"))
                    .with_label(format!("`{l}` {op} `{r}`")),
            );
        };

        if result == RustType::Int(IntKind::I32)
            && matches!(op, BinOp::Mul | BinOp::Pow | BinOp::LShift)
        {
            self.diagnostics.push(
                Diagnostic::new(DiagnosticKind::PossibleOverflow, span)
                    .with_message(format!("`{op}` on `i32` may overflow"))
                    .with_label("narrowed to `i32`")
                    .with_note("optimization_level = \"aggressive\" lowers `int` to `i32`"),
            );
        }
        result
    }

    fn unary(&mut self, span: Span, op: UnaryOp, ty: &RustType) -> RustType {
        let resolved = self.unifier.shallow(ty);
        match op {
            UnaryOp::Not => RustType::Bool,
            UnaryOp::Neg | UnaryOp::Pos => match resolved {
                RustType::Int(_) | RustType::Float | RustType::Unresolved | RustType::Dynamic => resolved,
                RustType::Var(_) => {
                    let int = RustType::Int(self.int_kind);
                    self.refine(ty, &int, span, "unary operand");
                    int
                }
                other => self.bad_unary(span, op, &other),
            },
            UnaryOp::Invert => match resolved {
                RustType::Int(_) | RustType::Unresolved => resolved,
                RustType::Var(_) => {
                    let int = RustType::Int(self.int_kind);
                    self.refine(ty, &int, span, "unary operand");
                    int
                }
                other => self.bad_unary(span, op, &other),
            },
        }
    }

    fn bad_unary(&mut self, span: Span, op: UnaryOp, ty: &RustType) -> RustType {
        let symbol = match op {
            UnaryOp::Not => "not",
            UnaryOp::Neg => "-",
            UnaryOp::Pos => "+",
            UnaryOp::Invert => "~",
        };
        let shown = self.unifier.resolve(ty).python_name();
        self.error(
            Diagnostic::new(DiagnosticKind::TypeUnificationError, span)
                .with_message(format!("bad operand type for unary `{symbol}`: `{shown}`"))
                .with_label("applied here"),
        )
    }

    fn bool_op(&mut self, span: Span, op: BoolOp, values: &[Expr]) -> RustType {
        let types: Vec<_> = values.iter().map(|v| self.expr(v)).collect();
        let mut joined = types[0].clone();
        for (ty, value) in types.iter().zip(values).skip(1) {
            match self.unifier.join(&joined, ty) {
                Ok(next) => joined = next,
                Err(mismatch) => {
                    let keyword = match op {
                        BoolOp::And => "and",
                        BoolOp::Or => "or",
                    };
                    let diag = self
                        .mismatch_diag(value.span, &format!("`{keyword}` operands"), &mismatch)
                        .with_secondary_label(span, "`and`/`or` produce one of their operands");
                    return self.error(diag);
                }
            }
        }
        joined
    }

    fn compare(&mut self, left: &Expr, ops: &[CmpOp], comparators: &[Expr]) {
        let mut lhs = self.expr(left);
        let mut lhs_span = left.span;
        for (op, right) in ops.iter().zip(comparators) {
            let rhs = self.expr(right);
            let span = lhs_span.merge(right.span);
            match op {
                CmpOp::In | CmpOp::NotIn => self.membership(span, &lhs, &rhs),
                CmpOp::Is | CmpOp::IsNot => self.identity(span, &lhs, right),
                _ => self.comparable(span, *op, &lhs, &rhs),
            }
            lhs = rhs;
            lhs_span = right.span;
        }
    }

    fn membership(&mut self, span: Span, needle: &RustType, haystack: &RustType) {
        let container = self.unifier.shallow(haystack);
        let element = match container {
            RustType::Vec(elem) | RustType::HashSet(elem) => *elem,
            RustType::HashMap(key, _) => *key,
            RustType::Str => RustType::Str,
            RustType::Unresolved | RustType::Dynamic => return,
            RustType::Var(_) => {
                self.diagnostics.push(
                    Diagnostic::new(DiagnosticKind::TypeUnificationError, span)
                        .with_message("cannot infer the container of this membership test")
                        .with_label("right-hand side has no known type")
                        .with_suggestion("annotate the container"),
                );
                return;
            }
            other => {
                let shown = self.unifier.resolve(&other).python_name();
                self.diagnostics.push(
                    Diagnostic::new(DiagnosticKind::TypeUnificationError, span)
                        .with_message(format!("`in` on a value of type `{shown}`"))
                        .with_label("not a container"),
                );
                return;
            }
        };
        self.coerce_into(needle, &element, span, "membership test");
    }

    fn identity(&mut self, span: Span, lhs: &RustType, right: &Expr) {
        if matches!(right.kind, ExprKind::NoneLit) {
            match self.unifier.shallow(lhs) {
                RustType::Option(_) | RustType::Unresolved | RustType::Dynamic => {}
                RustType::Var(_) => {
                    let inner = self.unifier.fresh();
                    self.refine(lhs, &RustType::option(inner), span, "`is None` test");
                }
                other => {
                    let shown = self.unifier.resolve(&other).python_name();
                    self.diagnostics.push(
                        Diagnostic::new(DiagnosticKind::TypeUnificationError, span)
                            .with_message(format!("`{shown}` is never `None`"))
                            .with_label("compared with `None` here")
                            .with_suggestion("annotate the value as `Optional`"),
                    );
                }
            }
            return;
        }
        self.diagnostics.push(
            unsupported_construct(span, "identity comparison with a value other than `None`")
                .with_suggestion("use `==`"),
        );
    }

    fn comparable(&mut self, span: Span, op: CmpOp, lhs: &RustType, rhs: &RustType) {
        let (l, r) = (self.unifier.shallow(lhs), self.unifier.shallow(rhs));
        let ok = match (&l, &r) {
            (RustType::Unresolved | RustType::Dynamic, _) | (_, RustType::Unresolved | RustType::Dynamic) => true,
            (RustType::Var(_), _) | (_, RustType::Var(_)) => {
                let widened = |t: &RustType| match t {
                    RustType::Char => RustType::Str,
                    other => other.clone(),
                };
                self.unifier.unify(&widened(&l), &widened(&r)).is_ok()
            }
            (a, b) if a.is_numeric() && b.is_numeric() => true,
            (a, b) if a.is_stringlike() && b.is_stringlike() => true,
            (RustType::Option(_), other) | (other, RustType::Option(_))
                if matches!(op, CmpOp::Eq | CmpOp::NotEq) =>
            {
                self.unifier.join(&l, other).is_ok()
            }
            _ => self.unifier.unify(&l, &r).is_ok(),
        };
        if !ok {
            let (a, b) = (
                self.unifier.resolve(&l).python_name(),
                self.unifier.resolve(&r).python_name(),
            );
            self.diagnostics.push(
                Diagnostic::new(DiagnosticKind::TypeUnificationError, span)
                    .with_message(format!("cannot compare `{a}` with `{b}` using `{}`", op.as_python()))
                    .with_label("compared here"),
            );
        }
    }

    // Containers

    /// Join element types, reporting the first conflict once for the whole
    /// literal. `None` means the literal is heterogeneous.
    fn join_all(&mut self, literal: &Expr, what: &str, items: &[(RustType, Span)]) -> Option<RustType> {
        let mut joined = self.unifier.fresh();
        let mut first_span = None;
        for (ty, span) in items {
            match self.unifier.join(&joined, ty) {
                Ok(next) => {
                    joined = next;
                    first_span.get_or_insert(*span);
                }
                Err(mismatch) => {
                    if self.dynamic_containers() {
                        return None;
                    }
                    let mut diag = Diagnostic::new(DiagnosticKind::TypeUnificationError, literal.span)
                        .with_message(format!(
                            "{what} mixes `{}` and `{}`",
                            mismatch.expected.python_name(),
                            mismatch.found.python_name()
                        ))
                        .with_secondary_label(*span, format!("this is `{}`", mismatch.found.python_name()));
                    if let Some(first) = first_span {
                        diag = diag.with_secondary_label(
                            first,
                            format!("this is `{}`", mismatch.expected.python_name()),
                        );
                    }
                    diag = diag
                        .with_note("container elements must share one type")
                        .with_suggestion("use one element type, or opt into `# @depyler: container_typing = \"dynamic\"`");
                    self.diagnostics.push(diag);
                    return None;
                }
            }
        }
        Some(joined)
    }

    fn sequence_literal(&mut self, expr: &Expr, kind: Collection, items: &[Expr]) -> RustType {
        let typed: Vec<_> = items.iter().map(|e| (self.expr(e), e.span)).collect();
        match self.join_all(expr, &format!("{} literal", kind.name()), &typed) {
            Some(elem) => kind.wrap(elem),
            None if self.dynamic_containers() => {
                self.dynamic.insert(expr.id);
                kind.wrap(RustType::Dynamic)
            }
            None => RustType::Unresolved,
        }
    }

    fn dict_literal(&mut self, expr: &Expr, keys: &[Expr], values: &[Expr]) -> RustType {
        let key_types: Vec<_> = keys.iter().map(|e| (self.expr(e), e.span)).collect();
        let value_types: Vec<_> = values.iter().map(|e| (self.expr(e), e.span)).collect();
        let Some(key) = self.join_all(expr, "dict literal keys", &key_types) else {
            return if self.dynamic_containers() {
                self.error(
                    Diagnostic::new(DiagnosticKind::TypeUnificationError, expr.span)
                        .with_message("dict keys must share one type")
                        .with_label("mixed key types")
                        .with_note("dynamic containers cover values, not keys"),
                )
            } else {
                RustType::Unresolved
            };
        };
        match self.join_all(expr, "dict literal", &value_types) {
            Some(value) => RustType::hash_map(key, value),
            None if self.dynamic_containers() => {
                self.dynamic.insert(expr.id);
                RustType::hash_map(key, RustType::Dynamic)
            }
            None => RustType::Unresolved,
        }
    }

    /// Infer a comprehension in its own scope.
    fn comprehension(
        &mut self,
        generators: &[Comprehension],
        body: impl FnOnce(&mut Self) -> RustType,
    ) -> RustType {
        let snapshot = self.env.clone();
        self.comprehension_depth += 1;
        for generator in generators {
            let iterable = self.expr(&generator.iter);
            let item = self.iterate(&iterable, generator.iter.span);
            self.comprehension_target(&generator.target, &item);
            for cond in &generator.ifs {
                self.condition(cond);
            }
        }
        let ty = body(self);
        self.comprehension_depth -= 1;
        self.env = snapshot;
        ty
    }
}

