//! AST Visitor Pattern
//!
//! A single `Visitor` trait walks statements and expressions. The visitor
//! may mutate its own state; the AST stays immutable.
//!
//! Default implementations call the `walk_*` functions that traverse
//! children. Override `visit_*` methods to add behavior at specific nodes
//! and call the matching `walk_*` to keep descending.
//!
//! ```text
//! struct CountCalls { count: usize }
//!
//! impl<'ast> Visitor<'ast> for CountCalls {
//!     fn visit_expr(&mut self, expr: &'ast Expr) {
//!         if matches!(expr.kind, ExprKind::Call { .. }) {
//!             self.count += 1;
//!         }
//!         walk_expr(self, expr);
//!     }
//! }
//! ```

use crate::ast::{Comprehension, Expr, ExprKind, FStringPart, FunctionDef, Stmt, StmtKind};
use crate::stack::ensure_sufficient_stack;

pub trait Visitor<'ast> {
    fn visit_function(&mut self, function: &'ast FunctionDef) {
        walk_function(self, function);
    }

    fn visit_stmt(&mut self, stmt: &'ast Stmt) {
        walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, expr: &'ast Expr) {
        walk_expr(self, expr);
    }
}

pub fn walk_function<'ast, V: Visitor<'ast> + ?Sized>(visitor: &mut V, function: &'ast FunctionDef) {
    for param in &function.params {
        if let Some(default) = &param.default {
            visitor.visit_expr(default);
        }
    }
    walk_block(visitor, &function.body);
}

pub fn walk_block<'ast, V: Visitor<'ast> + ?Sized>(visitor: &mut V, block: &'ast [Stmt]) {
    for stmt in block {
        visitor.visit_stmt(stmt);
    }
}

pub fn walk_stmt<'ast, V: Visitor<'ast> + ?Sized>(visitor: &mut V, stmt: &'ast Stmt) {
    match &stmt.kind {
        StmtKind::Expr(expr) => visitor.visit_expr(expr),
        StmtKind::Assign { targets, value } => {
            visitor.visit_expr(value);
            for target in targets {
                visitor.visit_expr(target);
            }
        }
        StmtKind::AnnAssign { target, value, .. } => {
            if let Some(value) = value {
                visitor.visit_expr(value);
            }
            visitor.visit_expr(target);
        }
        StmtKind::AugAssign { target, value, .. } => {
            visitor.visit_expr(value);
            visitor.visit_expr(target);
        }
        StmtKind::Return(value) | StmtKind::Raise(value) => {
            if let Some(value) = value {
                visitor.visit_expr(value);
            }
        }
        StmtKind::If { test, body, orelse } => {
            visitor.visit_expr(test);
            walk_block(visitor, body);
            walk_block(visitor, orelse);
        }
        StmtKind::While { test, body } => {
            visitor.visit_expr(test);
            walk_block(visitor, body);
        }
        StmtKind::For { target, iter, body } => {
            visitor.visit_expr(iter);
            visitor.visit_expr(target);
            walk_block(visitor, body);
        }
        StmtKind::Assert { test, msg } => {
            visitor.visit_expr(test);
            if let Some(msg) = msg {
                visitor.visit_expr(msg);
            }
        }
        StmtKind::Break | StmtKind::Continue | StmtKind::Pass | StmtKind::Unsupported { .. } => {}
    }
}

pub fn walk_expr<'ast, V: Visitor<'ast> + ?Sized>(visitor: &mut V, expr: &'ast Expr) {
    ensure_sufficient_stack(|| walk_expr_inner(visitor, expr));
}

fn walk_expr_inner<'ast, V: Visitor<'ast> + ?Sized>(visitor: &mut V, expr: &'ast Expr) {
    match &expr.kind {
        ExprKind::Int(_)
        | ExprKind::BigInt(_)
        | ExprKind::Float(_)
        | ExprKind::Str(_)
        | ExprKind::Bool(_)
        | ExprKind::NoneLit
        | ExprKind::Name(_)
        | ExprKind::Unsupported { .. } => {}
        ExprKind::FString(parts) => {
            for part in parts {
                if let FStringPart::Field { expr, .. } = part {
                    visitor.visit_expr(expr);
                }
            }
        }
        ExprKind::Attribute { value, .. } => visitor.visit_expr(value),
        ExprKind::Subscript { value, index } => {
            visitor.visit_expr(value);
            visitor.visit_expr(index);
        }
        ExprKind::Slice { lower, upper, step } => {
            for part in [lower, upper, step].into_iter().flatten() {
                visitor.visit_expr(part);
            }
        }
        ExprKind::Call {
            func,
            args,
            keywords,
        } => {
            visitor.visit_expr(func);
            for arg in args {
                visitor.visit_expr(arg);
            }
            for keyword in keywords {
                visitor.visit_expr(&keyword.value);
            }
        }
        ExprKind::BinOp { left, right, .. } => {
            visitor.visit_expr(left);
            visitor.visit_expr(right);
        }
        ExprKind::UnaryOp { operand, .. } => visitor.visit_expr(operand),
        ExprKind::BoolOp { values, .. }
        | ExprKind::List(values)
        | ExprKind::Tuple(values)
        | ExprKind::Set(values) => {
            for value in values {
                visitor.visit_expr(value);
            }
        }
        ExprKind::Compare {
            left, comparators, ..
        } => {
            visitor.visit_expr(left);
            for comparator in comparators {
                visitor.visit_expr(comparator);
            }
        }
        ExprKind::IfExp { test, body, orelse } => {
            visitor.visit_expr(test);
            visitor.visit_expr(body);
            visitor.visit_expr(orelse);
        }
        ExprKind::Dict { keys, values } => {
            for (key, value) in keys.iter().zip(values) {
                visitor.visit_expr(key);
                visitor.visit_expr(value);
            }
        }
        ExprKind::ListComp { elt, generators }
        | ExprKind::SetComp { elt, generators }
        | ExprKind::GeneratorExp { elt, generators } => {
            walk_generators(visitor, generators);
            visitor.visit_expr(elt);
        }
        ExprKind::DictComp {
            key,
            value,
            generators,
        } => {
            walk_generators(visitor, generators);
            visitor.visit_expr(key);
            visitor.visit_expr(value);
        }
    }
}

fn walk_generators<'ast, V: Visitor<'ast> + ?Sized>(
    visitor: &mut V,
    generators: &'ast [Comprehension],
) {
    for generator in generators {
        visitor.visit_expr(&generator.iter);
        visitor.visit_expr(&generator.target);
        for cond in &generator.ifs {
            visitor.visit_expr(cond);
        }
    }
}

/// Call `f` on every expression reachable from `stmts`, pre-order.
pub fn for_each_expr<'ast>(stmts: &'ast [Stmt], f: impl FnMut(&'ast Expr)) {
    struct Each<F>(F);

    impl<'ast, F: FnMut(&'ast Expr)> Visitor<'ast> for Each<F> {
        fn visit_expr(&mut self, expr: &'ast Expr) {
            (self.0)(expr);
            walk_expr(self, expr);
        }
    }

    walk_block(&mut Each(f), stmts);
}

/// Call `f` on every statement in `stmts`, including nested blocks, pre-order.
pub fn for_each_stmt<'ast>(stmts: &'ast [Stmt], f: impl FnMut(&'ast Stmt)) {
    struct Each<F>(F);

    impl<'ast, F: FnMut(&'ast Stmt)> Visitor<'ast> for Each<F> {
        fn visit_stmt(&mut self, stmt: &'ast Stmt) {
            (self.0)(stmt);
            walk_stmt(self, stmt);
        }

        fn visit_expr(&mut self, _expr: &'ast Expr) {}
    }

    walk_block(&mut Each(f), stmts);
}

#[cfg(test)]
mod tests;
