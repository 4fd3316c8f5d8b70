//! Type annotations.
//!
//! Annotations are parsed as ordinary expressions and then converted, so
//! every spelling Python accepts (`List[int]`, `typing.Optional[str]`,
//! `int | None`, `"Point"`) goes through the same grammar.

use depyler_ir::ast::{BinOp, Expr, ExprKind, TypeExpr, TypeExprKind};

use crate::{ParseResult, Parser};

impl Parser<'_> {
    pub(crate) fn parse_annotation(&mut self) -> ParseResult<TypeExpr> {
        let expr = self.parse_test()?;
        Ok(type_expr_from_expr(&expr))
    }
}

/// Convert an annotation expression to a [`TypeExpr`].
///
/// Shapes with no type meaning become [`TypeExprKind::Invalid`] carrying the
/// offending construct; type inference reports them.
pub fn type_expr_from_expr(expr: &Expr) -> TypeExpr {
    let kind = match &expr.kind {
        ExprKind::Name(name) => TypeExprKind::Name(name.clone()),
        ExprKind::NoneLit => TypeExprKind::NoneType,
        ExprKind::Attribute { attr, .. } => match dotted_name(expr) {
            Some(_) => TypeExprKind::Name(attr.clone()),
            None => TypeExprKind::Invalid(format!("attribute `{attr}`")),
        },
        ExprKind::Str(text) if is_identifier(text.trim()) => {
            TypeExprKind::Name(text.trim().to_string())
        }
        ExprKind::Subscript { value, index } => match base_name(value) {
            Some(base) => {
                let args = match &index.kind {
                    ExprKind::Tuple(items) => items.iter().map(type_expr_from_expr).collect(),
                    _ => vec![type_expr_from_expr(index)],
                };
                TypeExprKind::Generic { base, args }
            }
            None => TypeExprKind::Invalid("subscripted non-type".to_string()),
        },
        ExprKind::BinOp { op: BinOp::BitOr, .. } => union(expr),
        ExprKind::List(items) => TypeExprKind::Generic {
            base: "list".to_string(),
            args: items.iter().map(type_expr_from_expr).collect(),
        },
        ExprKind::Str(_) => TypeExprKind::Invalid("string annotation".to_string()),
        other => TypeExprKind::Invalid(describe(other).to_string()),
    };
    TypeExpr {
        kind,
        span: expr.span,
    }
}

/// `X | None` is `Optional[X]`; any other `A | B` is `Union[A, B]`.
fn union(expr: &Expr) -> TypeExprKind {
    let mut members = Vec::new();
    flatten_union(expr, &mut members);

    let (nones, rest): (Vec<_>, Vec<_>) = members
        .into_iter()
        .partition(|m| matches!(m.kind, TypeExprKind::NoneType));

    match (nones.is_empty(), rest.len()) {
        (false, 1) => TypeExprKind::Generic {
            base: "Optional".to_string(),
            args: rest,
        },
        (false, _) => {
            let inner = TypeExpr {
                kind: TypeExprKind::Generic {
                    base: "Union".to_string(),
                    args: rest,
                },
                span: expr.span,
            };
            TypeExprKind::Generic {
                base: "Optional".to_string(),
                args: vec![inner],
            }
        }
        (true, _) => TypeExprKind::Generic {
            base: "Union".to_string(),
            args: rest,
        },
    }
}

fn flatten_union(expr: &Expr, out: &mut Vec<TypeExpr>) {
    match &expr.kind {
        ExprKind::BinOp {
            left,
            op: BinOp::BitOr,
            right,
        } => {
            flatten_union(left, out);
            flatten_union(right, out);
        }
        _ => out.push(type_expr_from_expr(expr)),
    }
}

fn base_name(expr: &Expr) -> Option<String> {
    match &expr.kind {
        ExprKind::Name(name) => Some(name.clone()),
        ExprKind::Attribute { attr, .. } => dotted_name(expr).map(|_| attr.clone()),
        _ => None,
    }
}

/// Full dotted path of a `a.b.c` chain.
fn dotted_name(expr: &Expr) -> Option<String> {
    match &expr.kind {
        ExprKind::Name(name) => Some(name.clone()),
        ExprKind::Attribute { value, attr } => {
            dotted_name(value).map(|prefix| format!("{prefix}.{attr}"))
        }
        _ => None,
    }
}

fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}

fn describe(kind: &ExprKind) -> &'static str {
    match kind {
        ExprKind::Call { .. } => "call expression",
        ExprKind::Int(_) | ExprKind::BigInt(_) | ExprKind::Float(_) | ExprKind::Bool(_) => {
            "literal value"
        }
        ExprKind::Tuple(_) => "tuple expression",
        ExprKind::Unsupported { .. } => "unsupported expression",
        _ => "expression",
    }
}

#[cfg(test)]
mod tests;
