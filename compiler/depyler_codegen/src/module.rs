//! Module assembly: `use` lines, constants, classes, functions, helpers.
//!
//! Functions arrive in any order (they may have been lowered in parallel)
//! and are placed by walking the module's items, so the output depends only
//! on the source.

use depyler_ir::ast::{ClassDef, ExprKind, Item, Stmt, StmtKind};
use depyler_ownership::function_key;
use depyler_types::RustType;
use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::class::{generated_constructor, struct_imports, struct_source};
use crate::runtime::{Imports, RuntimeHelpers};
use crate::types::{float_lit, str_lit};
use crate::{LoweredFunction, ModuleView};

/// One line of the source map. Both lines are 1-based.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Mapping {
    pub rust_line: u32,
    pub python_line: u32,
}

/// The assembled Rust module.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoweredModule {
    pub code: String,
    /// In output order.
    pub mappings: Vec<Mapping>,
}

/// JSON source map written next to the generated file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SourceMap {
    pub source: String,
    pub mappings: Vec<Mapping>,
}

impl SourceMap {
    pub fn new(source: impl Into<String>, module: &LoweredModule) -> Self {
        SourceMap {
            source: source.into(),
            mappings: module.mappings.clone(),
        }
    }
}

/// Output text with line accounting.
struct Writer {
    code: String,
    /// Lines written so far.
    line: u32,
    mappings: Vec<Mapping>,
}

impl Writer {
    fn push(&mut self, text: &str) {
        self.code.push_str(text);
        if !text.ends_with('\n') {
            self.code.push('\n');
        }
        let lines = text.trim_end_matches('\n').lines().count().max(1);
        self.line += u32::try_from(lines).unwrap_or(u32::MAX);
    }

    fn blank(&mut self) {
        if !self.code.is_empty() && !self.code.ends_with("\n\n") {
            self.code.push('\n');
            self.line += 1;
        }
    }

    /// The next line written comes from `python_line`.
    fn map_next(&mut self, python_line: u32) {
        self.mappings.push(Mapping {
            rust_line: self.line + 1,
            python_line,
        });
    }

    fn function(&mut self, function: &LoweredFunction) {
        let start = self.line;
        for (local, python_line) in &function.mappings {
            self.mappings.push(Mapping {
                rust_line: start + local + 1,
                python_line: *python_line,
            });
        }
        self.push(&function.code);
    }
}

/// Stitch the lowered functions of one module together. Functions with
/// fatal diagnostics are left out; so is a class whose constructor failed.
#[tracing::instrument(level = "debug", skip_all)]
pub fn assemble_module(view: &ModuleView<'_>, functions: &[LoweredFunction]) -> LoweredModule {
    let by_key: FxHashMap<&str, &LoweredFunction> = functions
        .iter()
        .filter(|f| !f.has_fatal())
        .map(|f| (f.key.as_str(), f))
        .collect();

    let mut imports = Imports::empty();
    let mut helpers = RuntimeHelpers::empty();
    for function in by_key.values() {
        imports |= function.imports;
        helpers |= function.helpers;
    }

    let classes: Vec<&ClassDef> = view
        .module
        .items
        .iter()
        .filter_map(|item| match item {
            Item::Class(class) if class_survives(view, class, &by_key) => Some(class),
            _ => None,
        })
        .collect();
    for class in &classes {
        if let Some(info) = view.context.class(&class.name) {
            imports |= struct_imports(info);
            if info.fields.iter().any(|f| matches!(f.ty, RustType::Dynamic)) {
                helpers |= RuntimeHelpers::PY_VALUE;
            }
        }
    }

    let mut out = Writer {
        code: String::new(),
        line: 0,
        mappings: Vec::new(),
    };
    let uses = imports.render();
    if !uses.is_empty() {
        out.push(&uses.join("\n"));
    }

    let mut constants = 0_usize;
    for item in &view.module.items {
        let Item::Statement(stmt) = item else {
            continue;
        };
        let Some(code) = constant_source(view, stmt) else {
            continue;
        };
        if constants == 0 {
            out.blank();
        }
        constants += 1;
        out.map_next(view.line_of(stmt.span.start));
        out.push(&code);
    }

    for item in &view.module.items {
        match item {
            Item::Class(class) if classes.iter().any(|c| c.id == class.id) => {
                class_source(&mut out, view, class, &by_key);
            }
            Item::Function(function) => {
                if let Some(lowered) = by_key.get(function.name.as_str()) {
                    out.blank();
                    out.function(lowered);
                }
            }
            _ => {}
        }
    }

    if !helpers.is_empty() {
        out.blank();
        out.push(&helpers.render());
    }
    tracing::debug!(
        functions = by_key.len(),
        classes = classes.len(),
        constants,
        helpers = helpers.bits(),
        "module assembled"
    );
    LoweredModule {
        code: out.code,
        mappings: out.mappings,
    }
}

fn class_survives(
    view: &ModuleView<'_>,
    class: &ClassDef,
    by_key: &FxHashMap<&str, &LoweredFunction>,
) -> bool {
    let Some(info) = view.context.class(&class.name) else {
        return false;
    };
    if info.errors.iter().any(depyler_diagnostic::Diagnostic::is_fatal) {
        return false;
    }
    !info.has_init || by_key.contains_key(function_key(Some(&class.name), "__init__").as_str())
}

fn class_source(
    out: &mut Writer,
    view: &ModuleView<'_>,
    class: &ClassDef,
    by_key: &FxHashMap<&str, &LoweredFunction>,
) {
    let Some(info) = view.context.class(&class.name) else {
        return;
    };
    out.blank();
    let declaration = struct_source(class, info);
    let doc_lines = u32::try_from(declaration.lines().take_while(|l| l.starts_with("///")).count())
        .unwrap_or(0);
    out.mappings.push(Mapping {
        rust_line: out.line + doc_lines + 2,
        python_line: view.line_of(class.name_span.start),
    });
    out.push(&declaration);
    out.blank();
    out.push(&format!("impl {} {{", class.name));
    let mut first = true;
    let mut separate = |out: &mut Writer| {
        if !first {
            out.blank();
        }
        first = false;
    };
    if info.has_init {
        if let Some(init) = by_key.get(function_key(Some(&class.name), "__init__").as_str()) {
            separate(out);
            out.function(init);
        }
    } else if let Some(constructor) = generated_constructor(info) {
        separate(out);
        out.map_next(view.line_of(class.name_span.start));
        out.push(&constructor);
    }
    for method in class.methods.iter().filter(|m| m.name != "__init__") {
        if let Some(lowered) = by_key.get(function_key(Some(&class.name), &method.name).as_str()) {
            separate(out);
            out.function(lowered);
        }
    }
    out.push("}");
}

/// `pub const NAME: T = value;` of a module-level literal binding.
fn constant_source(view: &ModuleView<'_>, stmt: &Stmt) -> Option<String> {
    let (target, value) = match &stmt.kind {
        StmtKind::Assign { targets, value } => match targets.as_slice() {
            [target] => (target, value),
            _ => return None,
        },
        StmtKind::AnnAssign {
            target,
            value: Some(value),
            ..
        } => (target, value),
        _ => return None,
    };
    let name = target.as_name()?;
    let constant = view.context.constants.get(name).filter(|c| c.stmt == stmt.id)?;
    let (ty, code) = match (&constant.ty, &value.kind) {
        (RustType::Str, ExprKind::Str(s)) => ("&str".to_string(), str_lit(s)),
        (RustType::Float, ExprKind::Int(v)) => ("f64".to_string(), format!("{v}.0")),
        (RustType::Float, ExprKind::Float(v)) => ("f64".to_string(), float_lit(*v)),
        (RustType::Bool, ExprKind::Bool(b)) => ("bool".to_string(), b.to_string()),
        (RustType::Int(kind), ExprKind::Int(v)) => (kind.as_str().to_string(), v.to_string()),
        (ty, ExprKind::UnaryOp { operand, .. }) => match &operand.kind {
            ExprKind::Int(v) => (ty.render(), format!("-{v}")),
            ExprKind::Float(v) => (ty.render(), format!("-{}", float_lit(*v))),
            _ => return None,
        },
        _ => return None,
    };
    Some(format!("pub const {name}: {ty} = {code};"))
}

#[cfg(test)]
mod tests;
