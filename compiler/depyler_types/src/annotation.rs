//! Python type annotations to [`RustType`].

use depyler_diagnostic::{unsupported_construct, Diagnostic, DiagnosticKind};
use depyler_ir::ast::{TypeExpr, TypeExprKind};

use crate::{IntKind, RustType};

/// What annotation lowering needs from its surroundings.
pub struct AnnotationScope<'a> {
    pub int_kind: IntKind,
    /// Whether `name` is a class declared in the module.
    pub is_class: &'a dyn Fn(&str) -> bool,
    /// Lowering of `Any` and element-less `list`/`dict`/`set`.
    pub hole: &'a mut dyn FnMut() -> RustType,
}

/// Lower an annotation. Errors point at the offending part of the annotation.
pub fn lower_annotation(
    ty: &TypeExpr,
    scope: &mut AnnotationScope<'_>,
) -> Result<RustType, Box<Diagnostic>> {
    match &ty.kind {
        TypeExprKind::NoneType => Ok(RustType::Unit),
        TypeExprKind::Invalid(text) => Err(Box::new(
            unsupported_construct(ty.span, "annotation")
                .with_note(format!("`{text}` is not a type")),
        )),
        TypeExprKind::Name(name) => lower_name(ty, name, scope),
        TypeExprKind::Generic { base, args } => lower_generic(ty, base, args, scope),
    }
}

fn lower_name(
    ty: &TypeExpr,
    name: &str,
    scope: &mut AnnotationScope<'_>,
) -> Result<RustType, Box<Diagnostic>> {
    Ok(match name {
        "int" => RustType::Int(scope.int_kind),
        "float" => RustType::Float,
        "bool" => RustType::Bool,
        "str" => RustType::Str,
        "list" | "List" => RustType::vec((scope.hole)()),
        "set" | "Set" | "frozenset" | "FrozenSet" => RustType::hash_set((scope.hole)()),
        "dict" | "Dict" => RustType::hash_map((scope.hole)(), (scope.hole)()),
        "Any" => (scope.hole)(),
        _ if (scope.is_class)(name) => RustType::Struct(name.to_string()),
        "bytes" | "bytearray" | "complex" | "object" | "Callable" | "Iterator" | "Generator" => {
            return Err(Box::new(unsupported_construct(
                ty.span,
                &format!("`{name}` annotation"),
            )))
        }
        _ => {
            return Err(Box::new(
                Diagnostic::new(DiagnosticKind::TypeUnificationError, ty.span)
                    .with_message(format!("unknown type `{name}`"))
                    .with_label("not a builtin type or a class of this module"),
            ))
        }
    })
}

fn lower_generic(
    ty: &TypeExpr,
    base: &str,
    args: &[TypeExpr],
    scope: &mut AnnotationScope<'_>,
) -> Result<RustType, Box<Diagnostic>> {
    let arity = |n: usize| -> Result<(), Box<Diagnostic>> {
        if args.len() == n {
            Ok(())
        } else {
            Err(Box::new(
                Diagnostic::new(DiagnosticKind::TypeUnificationError, ty.span)
                    .with_message(format!(
                        "`{base}` takes {n} type argument{}, found {}",
                        if n == 1 { "" } else { "s" },
                        args.len()
                    ))
                    .with_label("wrong number of type arguments"),
            ))
        }
    };

    match base {
        "list" | "List" => {
            arity(1)?;
            Ok(RustType::vec(lower_annotation(&args[0], scope)?))
        }
        "set" | "Set" | "frozenset" | "FrozenSet" => {
            arity(1)?;
            Ok(RustType::hash_set(lower_annotation(&args[0], scope)?))
        }
        "dict" | "Dict" => {
            arity(2)?;
            let key = lower_annotation(&args[0], scope)?;
            let value = lower_annotation(&args[1], scope)?;
            Ok(RustType::hash_map(key, value))
        }
        "Optional" => {
            arity(1)?;
            Ok(RustType::option(lower_annotation(&args[0], scope)?))
        }
        "tuple" | "Tuple" => {
            let items = args
                .iter()
                .map(|arg| lower_annotation(arg, scope))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(RustType::Tuple(items))
        }
        "Union" => Err(Box::new(
            unsupported_construct(ty.span, "`Union` annotation")
                .with_suggestion("use `Optional[T]` or a single type"),
        )),
        _ => Err(Box::new(unsupported_construct(
            ty.span,
            &format!("`{base}[...]` annotation"),
        ))),
    }
}

#[cfg(test)]
mod tests;
