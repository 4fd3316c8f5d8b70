//! Checks at the stage boundaries and the per-function verdict.
//!
//! Each check returns diagnostics and never stops the pipeline by itself.
//! [`validate`] is what turns a function's accumulated diagnostics into a
//! [`CompileResult`]: any fatal kind means no output for that function.

use depyler_codegen::LoweredFunction;
use depyler_diagnostic::{unsupported_construct, Diagnostic, DiagnosticKind};
use depyler_ir::ast::{ExprKind, FunctionDef, StmtKind};
use depyler_ir::visitor::{for_each_expr, for_each_stmt};
use depyler_types::{RustType, TypedFunction};

/// Outcome of one compilation unit.
#[derive(Clone, Debug, PartialEq)]
pub struct CompileResult {
    pub ok: bool,
    /// Present only when `ok`.
    pub rust_source: Option<String>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Decide a unit's outcome from everything reported about it.
pub fn validate(diagnostics: Vec<Diagnostic>, rust: Option<String>) -> CompileResult {
    let ok = !diagnostics.iter().any(Diagnostic::is_fatal);
    CompileResult {
        ok,
        rust_source: if ok { rust } else { None },
        diagnostics,
    }
}

/// Builtins that read or write attributes by name, or run code from text.
const DYNAMIC_BUILTINS: &[&str] = &[
    "getattr",
    "setattr",
    "delattr",
    "hasattr",
    "eval",
    "exec",
    "compile",
    "globals",
    "locals",
    "vars",
    "__import__",
];

/// Attributes that expose an object's layout at run time.
const DYNAMIC_ATTRIBUTES: &[&str] = &["__dict__", "__class__", "__setattr__", "__getattr__"];

/// Sweep a function before inference: unsupported nodes and dynamic
/// attribute patterns.
pub fn check_before_inference(function: &FunctionDef) -> Vec<Diagnostic> {
    let mut found = Vec::new();
    for_each_stmt(&function.body, |stmt| {
        if let StmtKind::Unsupported { construct } = &stmt.kind {
            found.push(unsupported_construct(stmt.span, construct));
        }
    });
    for_each_expr(&function.body, |expr| match &expr.kind {
        ExprKind::Unsupported { construct } => {
            found.push(unsupported_construct(expr.span, construct));
        }
        ExprKind::Call { func, .. } => {
            if let Some(name) = func.as_name().filter(|n| DYNAMIC_BUILTINS.contains(n)) {
                found.push(dynamic_pattern(expr.span, &format!("`{name}()`")));
            }
        }
        ExprKind::Attribute { attr, .. } if DYNAMIC_ATTRIBUTES.contains(&attr.as_str()) => {
            found.push(dynamic_pattern(expr.span, &format!("`.{attr}`")));
        }
        _ => {}
    });
    found.sort_by_key(|d| (d.span.start, d.span.end));
    found
}

fn dynamic_pattern(span: depyler_ir::Span, what: &str) -> Diagnostic {
    Diagnostic::new(DiagnosticKind::UnsupportedConstruct, span)
        .with_message(format!("unsupported construct: dynamic attribute access {what}"))
        .with_label("attributes must be known when transpiling")
        .with_note("classes lower to structs with a fixed set of fields")
}

/// Check a function inference accepted: no binding is left unresolved and
/// every string subscript has a lowering.
pub fn check_after_inference(function: &FunctionDef, typed: &TypedFunction) -> Vec<Diagnostic> {
    let mut found = Vec::new();

    let unresolved = |name: &str, ty: &RustType| ty.is_incomplete().then(|| name.to_string());
    let mut names: Vec<String> = typed
        .params
        .iter()
        .filter_map(|(name, ty)| unresolved(name, ty))
        .collect();
    names.extend(typed.locals.iter().filter_map(|l| unresolved(&l.name, &l.ty)));
    names.extend(
        typed
            .fields
            .iter()
            .filter_map(|f| unresolved(&format!("self.{}", f.name), &f.ty)),
    );
    if typed.ret.is_incomplete() {
        names.push("the return value".to_string());
    }
    for name in names {
        found.push(
            Diagnostic::new(DiagnosticKind::TypeUnificationError, function.name_span)
                .with_message(format!("the type of {name} was left unresolved"))
                .with_label(format!("in `{}`", function.name))
                .with_suggestion("add a type annotation"),
        );
    }

    for_each_expr(&function.body, |expr| {
        let ExprKind::Subscript { value, index } = &expr.kind else {
            return;
        };
        if matches!(index.kind, ExprKind::Slice { .. }) {
            return;
        }
        let is_string = matches!(typed.ty(value.id), RustType::Str | RustType::Char);
        if is_string && typed.index_check(expr.id).is_none() {
            found.push(
                Diagnostic::new(DiagnosticKind::IndexSemanticsError, expr.span)
                    .with_message("string subscript without a chosen lowering")
                    .with_label("neither proven in bounds nor checked"),
            );
        }
    });
    found
}

/// Check generated code before it is accepted.
pub fn check_after_codegen(function: &FunctionDef, lowered: &LoweredFunction) -> Vec<Diagnostic> {
    let mut found = Vec::new();
    if lowered.code.contains(".as_bytes()[") {
        found.push(
            Diagnostic::new(DiagnosticKind::IndexSemanticsError, function.name_span)
                .with_message("generated code indexes string bytes")
                .with_label(format!("in `{}`", function.name))
                .with_note("Python indexes strings by character"),
        );
    }
    let lines = u32::try_from(lowered.code.lines().count()).unwrap_or(u32::MAX);
    if let Some(&(rust, python)) = lowered.mappings.iter().find(|(rust, _)| *rust >= lines) {
        tracing::warn!(
            function = %lowered.key,
            rust,
            python,
            lines,
            "source mapping points past the generated code"
        );
    }
    found
}

#[cfg(test)]
mod tests;
