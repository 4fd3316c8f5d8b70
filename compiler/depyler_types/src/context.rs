//! Module-wide facts every function is inferred against.

use depyler_ir::ast::{ExprKind, FunctionDef, Item, Module, NodeId, StmtKind, UnaryOp};
use depyler_ir::visitor::for_each_stmt;
use depyler_ir::LineIndex;
use depyler_pragma::PragmaSet;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::annotation::{lower_annotation, AnnotationScope};
use crate::builtins::{BuiltinTable, MathMember};
use crate::classes::{ClassInfo, ClassRegistry};
use crate::width::select_int_kind;
use crate::{IntKind, RustType};

#[derive(Clone, Debug, PartialEq)]
pub struct ParamSig {
    pub name: String,
    /// `None` when unannotated; each call site then gets its own variable.
    pub ty: Option<RustType>,
    pub has_default: bool,
}

/// Signature of a function or method as callers see it.
#[derive(Clone, Debug, PartialEq)]
pub struct FunctionSig {
    pub name: String,
    /// Includes `self` for methods.
    pub params: Vec<ParamSig>,
    /// `None` when unannotated and the body returns a value.
    pub ret: Option<RustType>,
    pub is_static: bool,
}

impl FunctionSig {
    fn from_def(function: &FunctionDef, pragmas: &PragmaSet, is_class: &dyn Fn(&str) -> bool) -> Self {
        let (int_kind, _) = select_int_kind(function, pragmas);
        let lower = |ann: &depyler_ir::ast::TypeExpr| {
            let mut hole = || RustType::Unresolved;
            let mut scope = AnnotationScope {
                int_kind,
                is_class,
                hole: &mut hole,
            };
            lower_annotation(ann, &mut scope).ok()
        };

        let params = function
            .params
            .iter()
            .map(|p| ParamSig {
                name: p.name.clone(),
                ty: p.annotation.as_ref().and_then(&lower),
                has_default: p.default.is_some(),
            })
            .collect();
        let ret = match &function.returns {
            Some(ann) => lower(ann),
            None if returns_value(function) => None,
            None => Some(RustType::Unit),
        };
        FunctionSig {
            name: function.name.clone(),
            params,
            ret,
            is_static: function.is_static(),
        }
    }

    /// Parameters a caller passes explicitly.
    pub fn call_params(&self) -> &[ParamSig] {
        let has_receiver = matches!(self.params.first(), Some(p) if p.name == "self");
        if self.is_static || !has_receiver {
            &self.params
        } else {
            &self.params[1..]
        }
    }
}

fn returns_value(function: &FunctionDef) -> bool {
    let mut found = false;
    for_each_stmt(&function.body, |stmt| {
        if matches!(stmt.kind, StmtKind::Return(Some(_))) {
            found = true;
        }
    });
    found
}

/// Typed module-level constant (`NAME = literal`).
#[derive(Clone, Debug, PartialEq)]
pub struct Constant {
    pub name: String,
    pub ty: RustType,
    pub stmt: NodeId,
}

/// Everything a function body may refer to outside itself.
#[derive(Debug)]
pub struct ModuleContext {
    pub functions: FxHashMap<String, FunctionSig>,
    pub classes: ClassRegistry,
    pub constants: FxHashMap<String, Constant>,
    /// Local names bound to the `math` module (`import math as m`).
    pub math_modules: FxHashSet<String>,
    /// `from math import sqrt as root`.
    pub math_names: FxHashMap<String, MathMember>,
    /// Imported modules with no lowering, reported where used.
    pub foreign_modules: FxHashSet<String>,
    pub lines: LineIndex,
}

/// Modules whose imports need no lowering.
const TRANSPARENT_MODULES: &[&str] = &["typing", "dataclasses", "__future__"];

impl ModuleContext {
    /// Collect signatures, classes, constants and imports.
    ///
    /// `pragmas` holds the effective pragma set of every function and method,
    /// keyed by the definition's id.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn build(module: &Module, source: &str, pragmas: &FxHashMap<NodeId, PragmaSet>) -> Self {
        let class_names: FxHashSet<&str> = module.classes().map(|c| c.name.as_str()).collect();
        let is_class = |name: &str| class_names.contains(name);
        let empty = PragmaSet::default();
        let pragmas_of = |id: NodeId| pragmas.get(&id).unwrap_or(&empty);

        let mut ctx = ModuleContext {
            functions: FxHashMap::default(),
            classes: ClassRegistry::default(),
            constants: FxHashMap::default(),
            math_modules: FxHashSet::default(),
            math_names: FxHashMap::default(),
            foreign_modules: FxHashSet::default(),
            lines: LineIndex::new(source),
        };

        for item in &module.items {
            match item {
                Item::Function(f) => {
                    let sig = FunctionSig::from_def(f, pragmas_of(f.id), &is_class);
                    ctx.functions.insert(f.name.clone(), sig);
                }
                Item::Class(class) => {
                    let mut methods = FxHashMap::default();
                    let mut init = None;
                    for method in &class.methods {
                        let sig = FunctionSig::from_def(method, pragmas_of(method.id), &is_class);
                        if method.name == "__init__" {
                            init = Some(sig);
                        } else {
                            methods.insert(method.name.clone(), sig);
                        }
                    }
                    let info = ClassRegistry::declare(class, methods, init, &is_class);
                    ctx.classes.insert(info);
                }
                Item::Import(import) => ctx.add_import(import),
                Item::Statement(stmt) => {
                    if let Some(constant) = constant(stmt) {
                        ctx.constants.insert(constant.name.clone(), constant);
                    }
                }
            }
        }
        tracing::debug!(
            functions = ctx.functions.len(),
            constants = ctx.constants.len(),
            "module context built"
        );
        ctx
    }

    fn add_import(&mut self, import: &depyler_ir::ast::Import) {
        let table = BuiltinTable::get();
        let root = import.module.split('.').next().unwrap_or_default();
        if import.names.is_empty() {
            let bound = import.alias.clone().unwrap_or_else(|| root.to_string());
            if import.module == "math" {
                self.math_modules.insert(bound);
            } else if !TRANSPARENT_MODULES.contains(&root) {
                self.foreign_modules.insert(bound);
            }
            return;
        }
        for (name, alias) in &import.names {
            let bound = alias.as_ref().unwrap_or(name);
            if import.module == "math" {
                if let Some(member) = table.math(name) {
                    self.math_names.insert(bound.clone(), member);
                    continue;
                }
            }
            if !TRANSPARENT_MODULES.contains(&root) {
                self.foreign_modules.insert(bound.clone());
            }
        }
    }

    pub fn class(&self, name: &str) -> Option<&ClassInfo> {
        self.classes.get(name)
    }

    pub fn function(&self, name: &str) -> Option<&FunctionSig> {
        self.functions.get(name)
    }

    pub fn is_math_module(&self, name: &str) -> bool {
        self.math_modules.contains(name)
    }
}

/// `NAME = <literal>` or `NAME: T = <literal>` at module level.
fn constant(stmt: &depyler_ir::ast::Stmt) -> Option<Constant> {
    let (target, value) = match &stmt.kind {
        StmtKind::Assign { targets, value } if targets.len() == 1 => (&targets[0], value),
        StmtKind::AnnAssign {
            target,
            value: Some(value),
            ..
        } => (target, value),
        _ => return None,
    };
    let name = target.as_name()?;
    let ty = match &value.kind {
        ExprKind::Int(v) => RustType::Int(int_kind_for(*v)),
        ExprKind::UnaryOp {
            op: UnaryOp::Neg,
            operand,
        } => match operand.kind {
            ExprKind::Int(v) => RustType::Int(int_kind_for(-v)),
            ExprKind::Float(_) => RustType::Float,
            _ => return None,
        },
        ExprKind::Float(_) => RustType::Float,
        ExprKind::Str(_) => RustType::Str,
        ExprKind::Bool(_) => RustType::Bool,
        _ => return None,
    };
    Some(Constant {
        name: name.to_string(),
        ty,
        stmt: stmt.id,
    })
}

fn int_kind_for(value: i128) -> IntKind {
    if IntKind::I64.fits(value) {
        IntKind::I64
    } else {
        IntKind::I128
    }
}

#[cfg(test)]
mod tests;
