use pretty_assertions::assert_eq;

use super::*;
use crate::ast::{BinOp, NodeId};
use crate::Span;

fn expr(id: u32, kind: ExprKind) -> Expr {
    Expr {
        id: NodeId(id),
        kind,
        span: Span::DUMMY,
    }
}

fn sample_body() -> Vec<Stmt> {
    // total = total + len(xs)
    let call = expr(
        4,
        ExprKind::Call {
            func: Box::new(expr(2, ExprKind::Name("len".into()))),
            args: vec![expr(3, ExprKind::Name("xs".into()))],
            keywords: Vec::new(),
        },
    );
    let sum = expr(
        5,
        ExprKind::BinOp {
            left: Box::new(expr(1, ExprKind::Name("total".into()))),
            op: BinOp::Add,
            right: Box::new(call),
        },
    );
    let assign = Stmt {
        id: NodeId(7),
        kind: StmtKind::Assign {
            targets: vec![expr(6, ExprKind::Name("total".into()))],
            value: sum,
        },
        span: Span::DUMMY,
    };
    vec![Stmt {
        id: NodeId(9),
        kind: StmtKind::While {
            test: expr(8, ExprKind::Bool(true)),
            body: vec![assign],
        },
        span: Span::DUMMY,
    }]
}

#[test]
fn test_for_each_expr_visits_nested() {
    let body = sample_body();
    let mut names = Vec::new();
    for_each_expr(&body, |e| {
        if let Some(name) = e.as_name() {
            names.push(name.to_string());
        }
    });
    // value before targets
    assert_eq!(names, vec!["total", "len", "xs", "total"]);
}

#[test]
fn test_for_each_stmt_descends_into_blocks() {
    let body = sample_body();
    let mut ids = Vec::new();
    for_each_stmt(&body, |s| ids.push(s.id.0));
    assert_eq!(ids, vec![9, 7]);
}

#[test]
fn test_custom_visitor_counts_calls() {
    struct CountCalls(usize);

    impl<'ast> Visitor<'ast> for CountCalls {
        fn visit_expr(&mut self, expr: &'ast Expr) {
            if matches!(expr.kind, ExprKind::Call { .. }) {
                self.0 += 1;
            }
            walk_expr(self, expr);
        }
    }

    let body = sample_body();
    let mut counter = CountCalls(0);
    walk_block(&mut counter, &body);
    assert_eq!(counter.0, 1);
}
