use pretty_assertions::assert_eq;

use super::*;

fn name(id: u32, text: &str) -> Expr {
    Expr {
        id: NodeId(id),
        kind: ExprKind::Name(text.to_string()),
        span: Span::DUMMY,
    }
}

#[test]
fn test_self_attribute_detection() {
    let attr = Expr {
        id: NodeId(2),
        kind: ExprKind::Attribute {
            value: Box::new(name(1, "self")),
            attr: "value".to_string(),
        },
        span: Span::DUMMY,
    };
    assert_eq!(attr.as_self_attribute(), Some("value"));
    assert_eq!(name(3, "self").as_self_attribute(), None);
    assert_eq!(name(3, "count").as_name(), Some("count"));
}

#[test]
fn test_type_expr_display() {
    let ty = TypeExpr {
        kind: TypeExprKind::Generic {
            base: "dict".to_string(),
            args: vec![
                TypeExpr {
                    kind: TypeExprKind::Name("str".to_string()),
                    span: Span::DUMMY,
                },
                TypeExpr {
                    kind: TypeExprKind::Generic {
                        base: "list".to_string(),
                        args: vec![TypeExpr {
                            kind: TypeExprKind::Name("int".to_string()),
                            span: Span::DUMMY,
                        }],
                    },
                    span: Span::DUMMY,
                },
            ],
        },
        span: Span::DUMMY,
    };
    assert_eq!(ty.to_string(), "dict[str, list[int]]");
}

#[test]
fn test_operator_spelling() {
    assert_eq!(BinOp::FloorDiv.to_string(), "//");
    assert_eq!(CmpOp::NotIn.as_python(), "not in");
}
