//! Rust source generation for Depyler.
//!
//! Lowering takes one typed, ownership-resolved function at a time and
//! produces its Rust text together with a `(rust_line, python_line)` map,
//! the runtime helpers it calls and the `use` lines it needs. Functions are
//! lowered independently so the driver may run them in parallel;
//! [`assemble_module`] then stitches the surviving ones into a module in
//! source order.
//!
//! # Dispatch
//!
//! Every construct is chosen from the AST node kind plus the types and
//! call targets recorded by inference. Nothing looks at identifier or
//! comment text to decide how to lower something.
//!
//! # Determinism
//!
//! Side tables are hash maps, but the output never iterates one: every
//! emitted list follows source order or a sorted order.

mod call;
mod class;
mod context;
mod expr;
mod format;
mod function;
mod iter;
mod module;
mod runtime;
mod scope;
mod stmt;
mod types;

#[cfg(test)]
mod test_support;

use depyler_diagnostic::Diagnostic;
use depyler_ir::ast::{ClassDef, FunctionDef, Item, Module};
use depyler_ownership::{ModuleModes, OwnershipMap};
use depyler_pragma::PragmaSet;
use depyler_types::{ModuleContext, TypedFunction};
use rustc_hash::FxHashMap;

pub use function::lower_function;
pub use module::{assemble_module, LoweredModule, Mapping, SourceMap};
pub use runtime::{Imports, RuntimeHelpers};

/// Output switches that do not change semantics.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct CodegenOptions {
    /// Emit `// line N: <python>` before every lowered statement.
    pub debug: bool,
}

/// Read-only view of the module every function is lowered against.
pub struct ModuleView<'a> {
    pub module: &'a Module,
    pub context: &'a ModuleContext,
    pub modes: &'a ModuleModes,
    pub source: &'a str,
    pub options: CodegenOptions,
    functions: FxHashMap<&'a str, &'a FunctionDef>,
    classes: FxHashMap<&'a str, &'a ClassDef>,
}

impl<'a> ModuleView<'a> {
    pub fn new(
        module: &'a Module,
        context: &'a ModuleContext,
        modes: &'a ModuleModes,
        source: &'a str,
        options: CodegenOptions,
    ) -> Self {
        let mut functions = FxHashMap::default();
        let mut classes = FxHashMap::default();
        for item in &module.items {
            match item {
                Item::Function(f) => {
                    functions.insert(f.name.as_str(), f);
                }
                Item::Class(c) => {
                    classes.insert(c.name.as_str(), c);
                }
                Item::Import(_) | Item::Statement(_) => {}
            }
        }
        ModuleView {
            module,
            context,
            modes,
            source,
            options,
            functions,
            classes,
        }
    }

    pub(crate) fn function_def(&self, name: &str) -> Option<&'a FunctionDef> {
        self.functions.get(name).copied()
    }

    pub(crate) fn class_def(&self, name: &str) -> Option<&'a ClassDef> {
        self.classes.get(name).copied()
    }

    /// 1-based Python line of a byte offset.
    pub(crate) fn line_of(&self, offset: u32) -> u32 {
        self.context.lines.line_of(offset)
    }

    pub(crate) fn line_text(&self, line: u32) -> &'a str {
        self.context.lines.line_text(self.source, line)
    }
}

/// One function ready for lowering.
pub struct FunctionUnit<'a> {
    pub function: &'a FunctionDef,
    /// Enclosing class of a method.
    pub class: Option<&'a ClassDef>,
    pub typed: &'a TypedFunction,
    pub ownership: &'a OwnershipMap,
    /// Effective pragmas, class entries already inherited.
    pub pragmas: &'a PragmaSet,
}

/// Lowering result of one function.
#[derive(Clone, Debug)]
pub struct LoweredFunction {
    /// `f` or `Class.method`.
    pub key: String,
    pub class: Option<String>,
    pub name: String,
    /// The complete `fn` item, indented for its position (methods one
    /// level deep).
    pub code: String,
    /// `(line within code, python line)`, both as counted by the lowering:
    /// 0-based Rust lines, 1-based Python lines.
    pub mappings: Vec<(u32, u32)>,
    pub helpers: RuntimeHelpers,
    pub imports: Imports,
    pub diagnostics: Vec<Diagnostic>,
}

impl LoweredFunction {
    /// Whether the code must not reach the output.
    pub fn has_fatal(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_fatal)
    }
}
