//! Integer width selection.
//!
//! All `int` values of one function share a width picked from its literals:
//! `i128` once any literal leaves the `i64` range, `i32` under aggressive
//! optimization when every literal fits, `i64` otherwise. Literals beyond
//! `i128` cannot be lowered at all.

use depyler_diagnostic::{unsupported_construct, Diagnostic};
use depyler_ir::ast::{ExprKind, FunctionDef};
use depyler_ir::visitor::{walk_expr, walk_function, Visitor};
use depyler_pragma::{OptimizationLevel, PragmaSet};

use crate::IntKind;

struct Literals {
    widest: IntKind,
    diagnostics: Vec<Diagnostic>,
}

impl<'ast> Visitor<'ast> for Literals {
    fn visit_expr(&mut self, expr: &'ast depyler_ir::ast::Expr) {
        match &expr.kind {
            ExprKind::Int(value) => {
                let kind = if IntKind::I32.fits(*value) {
                    IntKind::I32
                } else if IntKind::I64.fits(*value) {
                    IntKind::I64
                } else {
                    IntKind::I128
                };
                self.widest = self.widest.max(kind);
            }
            ExprKind::BigInt(digits) => self.diagnostics.push(
                unsupported_construct(expr.span, "integer literal wider than 128 bits")
                    .with_note(format!("`{digits}` does not fit in `i128`")),
            ),
            _ => {}
        }
        walk_expr(self, expr);
    }
}

/// Pick the integer width for `function`.
#[tracing::instrument(level = "trace", skip_all, fields(function = %function.name))]
pub fn select_int_kind(function: &FunctionDef, pragmas: &PragmaSet) -> (IntKind, Vec<Diagnostic>) {
    let mut literals = Literals {
        widest: IntKind::I32,
        diagnostics: Vec::new(),
    };
    walk_function(&mut literals, function);

    let kind = match literals.widest {
        IntKind::I128 => IntKind::I128,
        IntKind::I32 if pragmas.optimization_level() == OptimizationLevel::Aggressive => {
            IntKind::I32
        }
        _ => IntKind::I64,
    };
    tracing::debug!(int_kind = kind.as_str(), "selected integer width");
    (kind, literals.diagnostics)
}

#[cfg(test)]
mod tests;
