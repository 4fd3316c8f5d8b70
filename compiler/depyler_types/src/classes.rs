//! Class registry: the fixed field set and method signatures of every class.
//!
//! Fields come from class-level annotations and, once `__init__` has been
//! inferred, from its `self.<name>` assignments
//! ([`ClassRegistry::complete_fields`]). Methods are typed against the
//! completed registry, so attribute access is checked against a closed set.

use depyler_diagnostic::{Diagnostic, DiagnosticKind};
use depyler_ir::ast::{ClassDef, Expr};
use depyler_ir::Span;
use rustc_hash::FxHashMap;

use crate::annotation::{lower_annotation, AnnotationScope};
use crate::context::{FunctionSig, ParamSig};
use crate::{IntKind, RustType};

#[derive(Clone, Debug, PartialEq)]
pub struct FieldInfo {
    pub name: String,
    pub ty: RustType,
    /// Class-level default (`x: int = 0`), used when `__init__` leaves the
    /// field unset and for dataclass constructors.
    pub default: Option<Expr>,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub struct ClassInfo {
    pub name: String,
    /// Declaration order, which is also the struct field order.
    pub fields: Vec<FieldInfo>,
    /// Every method except `__init__`, by name.
    pub methods: FxHashMap<String, FunctionSig>,
    /// Constructor parameters: `__init__` without `self`, or the fields of
    /// a dataclass.
    pub constructor: Vec<ParamSig>,
    pub has_init: bool,
    pub is_dataclass: bool,
    /// Problems with the class body itself.
    pub errors: Vec<Diagnostic>,
}

impl ClassInfo {
    pub fn field(&self, name: &str) -> Option<&FieldInfo> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn method(&self, name: &str) -> Option<&FunctionSig> {
        self.methods.get(name)
    }
}

#[derive(Clone, Debug, Default)]
pub struct ClassRegistry {
    classes: FxHashMap<String, ClassInfo>,
}

impl ClassRegistry {
    pub fn get(&self, name: &str) -> Option<&ClassInfo> {
        self.classes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    pub(crate) fn insert(&mut self, info: ClassInfo) {
        self.classes.insert(info.name.clone(), info);
    }

    /// Declare the class-level fields of `class`.
    pub(crate) fn declare(
        class: &ClassDef,
        methods: FxHashMap<String, FunctionSig>,
        init: Option<FunctionSig>,
        is_class: &dyn Fn(&str) -> bool,
    ) -> ClassInfo {
        let mut errors = Vec::new();
        let mut fields: Vec<FieldInfo> = Vec::new();

        for field in &class.fields {
            let Some(annotation) = &field.annotation else {
                // `x = 0` in the body: a field whose type comes from its value.
                if let Some(default) = &field.default {
                    if let Some(ty) = literal_type(default) {
                        fields.push(FieldInfo {
                            name: field.name.clone(),
                            ty,
                            default: Some(default.clone()),
                            span: field.span,
                        });
                        continue;
                    }
                }
                errors.push(
                    Diagnostic::new(DiagnosticKind::TypeUnificationError, field.span)
                        .with_message(format!(
                            "cannot infer a type for field `{}`",
                            field.name
                        ))
                        .with_label("class attribute without annotation")
                        .with_suggestion(format!("annotate it: `{}: <type>`", field.name)),
                );
                continue;
            };
            let mut hole = || RustType::Unresolved;
            let mut scope = AnnotationScope {
                int_kind: IntKind::I64,
                is_class,
                hole: &mut hole,
            };
            match lower_annotation(annotation, &mut scope) {
                Ok(ty) if ty.is_incomplete() => errors.push(
                    Diagnostic::new(DiagnosticKind::TypeUnificationError, annotation.span)
                        .with_message(format!(
                            "field `{}` needs a complete element type",
                            field.name
                        ))
                        .with_label(format!("`{annotation}` has no element type")),
                ),
                Ok(ty) => fields.push(FieldInfo {
                    name: field.name.clone(),
                    ty,
                    default: field.default.clone(),
                    span: field.span,
                }),
                Err(diag) => errors.push(*diag),
            }
        }

        let is_dataclass = class.is_dataclass();
        let constructor = match (&init, is_dataclass) {
            (Some(init), _) => init.params.iter().skip(1).cloned().collect(),
            (None, true) => fields
                .iter()
                .map(|f| ParamSig {
                    name: f.name.clone(),
                    ty: Some(f.ty.clone()),
                    has_default: f.default.is_some(),
                })
                .collect(),
            (None, false) => {
                for field in fields.iter().filter(|f| f.default.is_none()) {
                    errors.push(
                        Diagnostic::new(DiagnosticKind::UnsupportedConstruct, field.span)
                            .with_message(format!(
                                "field `{}` is never initialized",
                                field.name
                            ))
                            .with_label("no default and no `__init__`")
                            .with_suggestion("give it a default or add `@dataclass`"),
                    );
                }
                Vec::new()
            }
        };

        ClassInfo {
            name: class.name.clone(),
            fields,
            methods,
            constructor,
            has_init: init.is_some(),
            is_dataclass,
            errors,
        }
    }

    /// Add the fields `__init__` assigned, in first-assignment order after
    /// the class-level ones.
    pub fn complete_fields(&mut self, class: &str, assigned: &[(String, RustType, Span)]) {
        let Some(info) = self.classes.get_mut(class) else {
            return;
        };
        for (name, ty, span) in assigned {
            if info.field(name).is_none() {
                info.fields.push(FieldInfo {
                    name: name.clone(),
                    ty: ty.clone(),
                    default: None,
                    span: *span,
                });
            }
        }
    }
}

/// Type of a class-level literal default.
fn literal_type(expr: &Expr) -> Option<RustType> {
    use depyler_ir::ast::ExprKind;
    match &expr.kind {
        ExprKind::Int(v) if IntKind::I64.fits(*v) => Some(RustType::Int(IntKind::I64)),
        ExprKind::Float(_) => Some(RustType::Float),
        ExprKind::Str(_) => Some(RustType::Str),
        ExprKind::Bool(_) => Some(RustType::Bool),
        _ => None,
    }
}
