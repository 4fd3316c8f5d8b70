//! Statements and assignment targets.

use depyler_diagnostic::{unsupported_construct, Diagnostic, DiagnosticKind};
use depyler_ir::ast::{BinOp, Expr, ExprKind, Stmt, StmtKind};
use depyler_ir::Span;

use super::{Binding, Inferencer};
use crate::builtins::BuiltinTable;
use crate::RustType;

impl Inferencer<'_> {
    pub(super) fn stmt(&mut self, stmt: &Stmt) {
        let outer = std::mem::replace(&mut self.current_stmt, stmt.id);
        self.stmt_kind(stmt);
        self.current_stmt = outer;
    }

    fn stmt_kind(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Expr(expr) => {
                self.expr(expr);
            }
            StmtKind::Assign { targets, value } => {
                let ty = self.expr(value);
                for target in targets {
                    self.assign(target, &ty, value.span);
                }
            }
            StmtKind::AnnAssign {
                target,
                annotation,
                value,
            } => {
                let declared = self.annotation(annotation);
                if let Some(value) = value {
                    let found = self.expr(value);
                    self.coerce_into(&found, &declared, value.span, "annotated assignment");
                }
                self.annotated_target(target, declared);
            }
            StmtKind::AugAssign { target, op, value } => self.aug_assign(stmt, target, *op, value),
            StmtKind::Return(value) => self.return_stmt(stmt.span, value.as_ref()),
            StmtKind::If { test, body, orelse } => {
                self.condition(test);
                let mark = self.facts.mark();
                self.facts.enter_guard(test, body);
                let then_env = self.branch(|this| this.block(body));
                self.facts.restore(mark);
                let else_env = self.branch(|this| this.block(orelse));
                self.merge_branches(vec![then_env, else_env]);
            }
            StmtKind::While { test, body } => {
                self.condition(test);
                let mark = self.facts.mark();
                self.facts.enter_guard(test, body);
                self.block(body);
                self.facts.restore(mark);
            }
            StmtKind::For { target, iter, body } => {
                let iterable = self.expr(iter);
                let item = self.iterate(&iterable, iter.span);
                self.loop_target(target, &item);
                let mark = self.facts.mark();
                self.facts.enter_for(target, iter, body);
                self.block(body);
                self.facts.restore(mark);
            }
            StmtKind::Break | StmtKind::Continue | StmtKind::Pass => {}
            StmtKind::Assert { test, msg } => {
                self.condition(test);
                if let Some(msg) = msg {
                    self.expr(msg);
                }
            }
            StmtKind::Raise(value) => self.raise(stmt.span, value.as_ref()),
            StmtKind::Unsupported { construct } => {
                self.diagnostics.push(unsupported_construct(stmt.span, construct));
            }
        }
    }

    /// Store a value of type `ty` into `target`.
    pub(super) fn assign(&mut self, target: &Expr, ty: &RustType, value_span: Span) {
        match &target.kind {
            ExprKind::Name(name) => {
                let declared = self.bind_name(name, ty, target.span);
                self.record(target.id, declared, target.span);
            }
            ExprKind::Tuple(items) | ExprKind::List(items) => {
                let item_types = self.unpack(ty, items.len(), target.span);
                for (item, item_ty) in items.iter().zip(item_types) {
                    self.assign(item, &item_ty, value_span);
                }
                self.record(target.id, ty.clone(), target.span);
            }
            ExprKind::Attribute { value, attr } => {
                if self.init_mode && value.as_name() == Some("self") {
                    let declared = self.bind_field(attr, ty, target.span);
                    self.record(target.id, declared, target.span);
                    return;
                }
                let slot = self.expr(target);
                self.coerce_into(ty, &slot, value_span, &format!("assignment to `.{attr}`"));
            }
            ExprKind::Subscript { value, index } => {
                let receiver = self.expr(value);
                let key = self.expr(index);
                let slot = self.store_slot(target, &receiver, &key);
                self.record(target.id, slot.clone(), target.span);
                self.coerce_into(ty, &slot, value_span, "item assignment");
            }
            _ => {
                self.diagnostics.push(unsupported_construct(
                    target.span,
                    "assignment to this kind of target",
                ));
            }
        }
    }

    /// `self.name = value` inside `__init__`.
    fn bind_field(&mut self, name: &str, ty: &RustType, span: Span) -> RustType {
        if let Some(existing) = self.fields.get(name).map(|b| b.ty.clone()) {
            self.coerce_into(ty, &existing, span, &format!("assignment to `self.{name}`"));
            return existing;
        }
        let declared_field = self.class.and_then(|c| c.field(name)).map(|f| f.ty.clone());
        let declared = match declared_field {
            Some(field_ty) => {
                self.coerce_into(ty, &field_ty, span, &format!("assignment to `self.{name}`"));
                field_ty
            }
            None => match self.unifier.shallow(ty) {
                RustType::Char => RustType::Str,
                _ => ty.clone(),
            },
        };
        self.field_order.push(name.to_string());
        self.fields.insert(
            name.to_string(),
            Binding {
                ty: declared.clone(),
                first: self.current_stmt,
                span,
            },
        );
        declared
    }

    fn annotated_target(&mut self, target: &Expr, declared: RustType) {
        match &target.kind {
            ExprKind::Name(name) if !self.is_bound(name) => {
                self.declare(name, declared.clone(), target.span);
                self.record(target.id, declared, target.span);
            }
            ExprKind::Attribute { value, attr }
                if self.init_mode && value.as_name() == Some("self") && !self.fields.contains_key(attr.as_str()) =>
            {
                let ty = self.bind_field(attr, &declared, target.span);
                self.record(target.id, ty, target.span);
            }
            _ => self.assign(target, &declared, target.span),
        }
    }

    fn aug_assign(&mut self, stmt: &Stmt, target: &Expr, op: BinOp, value: &Expr) {
        let current = match &target.kind {
            ExprKind::Name(name) if !self.is_bound(name) => self.error(
                Diagnostic::new(DiagnosticKind::TypeUnificationError, target.span)
                    .with_message(format!("`{name}` is updated before it is assigned"))
                    .with_label("no earlier binding"),
            ),
            _ => self.expr(target),
        };
        let rhs = self.expr(value);
        let result = self.binary(stmt.span, op, &current, &rhs);
        self.coerce_into(&result, &current, stmt.span, &format!("`{op}=`"));
    }

    fn return_stmt(&mut self, span: Span, value: Option<&Expr>) {
        let Some(value) = value else {
            let ret = self.ret.clone();
            if !self.ret_annotated {
                return;
            }
            let resolved = self.unifier.shallow(&ret);
            if !matches!(resolved, RustType::Unit | RustType::Option(_) | RustType::Unresolved) {
                self.diagnostics.push(
                    Diagnostic::new(DiagnosticKind::TypeUnificationError, span)
                        .with_message(format!(
                            "`return` without a value in a function returning `{}`",
                            resolved.python_name()
                        ))
                        .with_label("returns `None`"),
                );
            }
            return;
        };

        self.returns_value = true;
        let found = self.expr(value);
        let ret = self.ret.clone();
        if matches!(value.kind, ExprKind::NoneLit)
            && matches!(self.unifier.shallow(&ret), RustType::Unit)
        {
            return;
        }
        if self.ret_annotated {
            self.coerce_into(&found, &ret, value.span, "return value");
        } else {
            match self.unifier.join(&ret, &found) {
                Ok(joined) => self.ret = joined,
                Err(mismatch) => {
                    let diag = self.mismatch_diag(value.span, "return value", &mismatch).with_note(
                        "every `return` of an unannotated function must produce one type",
                    );
                    self.diagnostics.push(diag);
                }
            }
        }
    }

    fn raise(&mut self, span: Span, value: Option<&Expr>) {
        let Some(value) = value else {
            self.diagnostics
                .push(unsupported_construct(span, "bare `raise` (re-raise)"));
            return;
        };
        let name = match &value.kind {
            ExprKind::Name(name) => Some(name.as_str()),
            ExprKind::Call { func, .. } => func.as_name(),
            _ => None,
        };
        match name {
            Some(name) if BuiltinTable::is_exception(name) && !self.is_bound(name) => {
                if let ExprKind::Call { args, keywords, .. } = &value.kind {
                    for arg in args {
                        self.expr(arg);
                    }
                    for keyword in keywords {
                        self.expr(&keyword.value);
                    }
                }
                self.calls.insert(value.id, super::CallTarget::Exception(name.to_string()));
                self.record(value.id, RustType::Unit, value.span);
            }
            _ => {
                self.diagnostics.push(
                    unsupported_construct(value.span, "raising a non-builtin exception")
                        .with_note("only builtin exception classes can be raised"),
                );
            }
        }
    }

    /// Bind the target of a `for` loop.
    fn loop_target(&mut self, target: &Expr, item: &RustType) {
        match &target.kind {
            ExprKind::Name(name) => {
                let ty = match self.lookup(name) {
                    Some(existing) => {
                        self.coerce_into(item, &existing, target.span, &format!("loop variable `{name}`"));
                        existing
                    }
                    None => {
                        self.declare(name, item.clone(), target.span);
                        item.clone()
                    }
                };
                self.record(target.id, ty, target.span);
            }
            ExprKind::Tuple(items) | ExprKind::List(items) => {
                let item_types = self.unpack(item, items.len(), target.span);
                for (part, part_ty) in items.iter().zip(item_types) {
                    self.loop_target(part, &part_ty);
                }
                self.record(target.id, item.clone(), target.span);
            }
            _ => {
                self.diagnostics
                    .push(unsupported_construct(target.span, "this kind of loop target"));
            }
        }
    }

    /// Bind a comprehension target in the current (comprehension) scope.
    pub(super) fn comprehension_target(&mut self, target: &Expr, item: &RustType) {
        match &target.kind {
            ExprKind::Name(name) => {
                self.declare(name, item.clone(), target.span);
                self.record(target.id, item.clone(), target.span);
            }
            ExprKind::Tuple(items) | ExprKind::List(items) => {
                let item_types = self.unpack(item, items.len(), target.span);
                for (part, part_ty) in items.iter().zip(item_types) {
                    self.comprehension_target(part, &part_ty);
                }
                self.record(target.id, item.clone(), target.span);
            }
            _ => {
                self.diagnostics.push(unsupported_construct(
                    target.span,
                    "this kind of comprehension target",
                ));
            }
        }
    }

    /// Element types of a tuple unpacked into `arity` targets.
    fn unpack(&mut self, ty: &RustType, arity: usize, span: Span) -> Vec<RustType> {
        match self.unifier.shallow(ty) {
            RustType::Tuple(items) if items.len() == arity => items,
            RustType::Var(_) => {
                let items: Vec<_> = (0..arity).map(|_| self.unifier.fresh()).collect();
                self.refine(ty, &RustType::Tuple(items.clone()), span, "tuple unpacking");
                items
            }
            RustType::Unresolved => vec![RustType::Unresolved; arity],
            RustType::Vec(_) => {
                self.diagnostics.push(
                    unsupported_construct(span, "unpacking a list")
                        .with_suggestion("unpack a tuple instead"),
                );
                vec![RustType::Unresolved; arity]
            }
            other => {
                self.diagnostics.push(
                    Diagnostic::new(DiagnosticKind::TypeUnificationError, span)
                        .with_message(format!(
                            "cannot unpack `{}` into {arity} targets",
                            self.unifier.resolve(&other).python_name()
                        ))
                        .with_label("unpacked here"),
                );
                vec![RustType::Unresolved; arity]
            }
        }
    }
}
