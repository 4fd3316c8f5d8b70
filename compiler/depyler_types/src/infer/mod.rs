//! Per-function type inference.
//!
//! One [`Inferencer`] walks a function body in program order with a single
//! [`Unifier`]. Expressions get their type recorded by `NodeId`; when the
//! walk ends every recorded type is resolved once into the function's
//! [`TypeTable`], which is never modified afterwards.
//!
//! # Flow rules
//!
//! - The first assignment of a name fixes its type; later stores must
//!   coerce into it.
//! - `if` branches start from a snapshot of the environment. Names first
//!   bound in a branch are joined across branches afterwards.
//! - Loop bodies share the environment with the code before the loop.
//!
//! # Errors
//!
//! Every conflict produces one diagnostic and gives the offending
//! expression the `Unresolved` type, which is compatible with everything,
//! so a single mistake does not cascade.

mod call;
mod expr;
mod index;
mod stmt;

use std::mem;

use depyler_diagnostic::{Diagnostic, DiagnosticKind};
use depyler_ir::ast::{ClassDef, FunctionDef, NodeId, Stmt, StmtKind};
use depyler_ir::Span;
use depyler_pragma::{ContainerTyping, PragmaSet};
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

use crate::annotation::{lower_annotation, AnnotationScope};
use crate::builtins::{Builtin, MathMember, Method, Receiver};
use crate::classes::ClassInfo;
use crate::context::ModuleContext;
use crate::unify::Mismatch;
use crate::width::select_int_kind;
use crate::{IntKind, RustType, Unifier};

pub use index::IndexCheck;
use index::IndexFacts;

/// Where a type came from, for `--debug` comments and diagnostics.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Provenance {
    /// 1-based Python line.
    pub line: u32,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TypedNode {
    pub ty: RustType,
    pub provenance: Provenance,
}

/// Resolved types of one function's expressions, keyed by node.
#[derive(Clone, Debug, Default)]
pub struct TypeTable {
    nodes: FxHashMap<NodeId, TypedNode>,
}

impl TypeTable {
    pub fn get(&self, id: NodeId) -> Option<&TypedNode> {
        self.nodes.get(&id)
    }

    /// Type of `id`; `Unresolved` for nodes inference never reached.
    pub fn ty(&self, id: NodeId) -> &RustType {
        static UNRESOLVED: RustType = RustType::Unresolved;
        self.nodes.get(&id).map_or(&UNRESOLVED, |n| &n.ty)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &TypedNode)> {
        self.nodes.iter().map(|(id, node)| (*id, node))
    }
}

/// What a call expression invokes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallTarget {
    Builtin(Builtin),
    Math(MathMember),
    /// Module-level function.
    Function(String),
    /// `ClassName(...)`.
    Constructor(String),
    /// `receiver.method(...)` on a user class instance.
    Method { class: String, name: String },
    /// `ClassName.method(...)` of a `@staticmethod`.
    StaticMethod { class: String, name: String },
    /// Method of a builtin container or `str`.
    BuiltinMethod { receiver: Receiver, method: Method },
    /// Exception constructor inside `raise`.
    Exception(String),
}

/// A name bound in the function body, in first-binding order.
#[derive(Clone, Debug, PartialEq)]
pub struct Local {
    pub name: String,
    pub ty: RustType,
    /// Statement holding the first binding.
    pub first: NodeId,
    pub span: Span,
}

/// Result of inferring one function.
#[derive(Clone, Debug)]
pub struct TypedFunction {
    pub id: NodeId,
    pub name: String,
    /// Enclosing class for methods.
    pub class: Option<String>,
    pub params: Vec<(String, RustType)>,
    pub ret: RustType,
    pub int_kind: IntKind,
    pub types: TypeTable,
    pub locals: Vec<Local>,
    pub calls: FxHashMap<NodeId, CallTarget>,
    pub index_checks: FxHashMap<NodeId, IndexCheck>,
    /// Container literals lowered to `PyValue` elements.
    pub dynamic: FxHashSet<NodeId>,
    /// Fields `__init__` assigns, in first-assignment order.
    pub fields: Vec<Local>,
}

impl TypedFunction {
    pub fn ty(&self, id: NodeId) -> &RustType {
        self.types.ty(id)
    }

    pub fn param(&self, name: &str) -> Option<&RustType> {
        self.params.iter().find(|(n, _)| n == name).map(|(_, ty)| ty)
    }

    pub fn local(&self, name: &str) -> Option<&Local> {
        self.locals.iter().find(|l| l.name == name)
    }

    /// Type of a parameter or local.
    pub fn binding(&self, name: &str) -> Option<&RustType> {
        self.param(name).or_else(|| self.local(name).map(|l| &l.ty))
    }

    pub fn call(&self, id: NodeId) -> Option<&CallTarget> {
        self.calls.get(&id)
    }

    pub fn index_check(&self, id: NodeId) -> Option<IndexCheck> {
        self.index_checks.get(&id).copied()
    }

    pub fn is_init(&self) -> bool {
        self.class.is_some() && self.name == "__init__"
    }
}

/// Inference output: the typed function plus everything reported on the way.
#[derive(Debug)]
pub struct Inference {
    pub typed: TypedFunction,
    pub diagnostics: Vec<Diagnostic>,
}

impl Inference {
    pub fn has_fatal(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_fatal)
    }
}

/// A function to infer and what surrounds it.
pub struct FunctionInput<'a> {
    pub function: &'a FunctionDef,
    /// Enclosing class of a method.
    pub class: Option<&'a ClassDef>,
    /// Effective pragmas, class entries already inherited.
    pub pragmas: &'a PragmaSet,
    pub context: &'a ModuleContext,
}

/// Infer the types of one function.
#[tracing::instrument(level = "debug", skip_all, fields(function = %input.function.name))]
pub fn infer_function(input: &FunctionInput<'_>) -> Inference {
    let mut inferencer = Inferencer::new(input);
    inferencer.declare_params();
    inferencer.block(&input.function.body);
    inferencer.finish()
}

#[derive(Clone, Debug)]
struct Binding {
    ty: RustType,
    first: NodeId,
    span: Span,
}

/// A subscript expression and what its syntax alone determines.
#[derive(Clone, Debug)]
struct SubscriptSite {
    node: NodeId,
    span: Span,
    is_slice: bool,
    /// Integer literal index, for tuple element access.
    literal: Option<i128>,
    check: IndexCheck,
}

/// An operation whose receiver type was unknown when it was reached.
#[derive(Clone, Debug)]
enum Deferred {
    Subscript {
        site: SubscriptSite,
        receiver: RustType,
        index: RustType,
        result: RustType,
    },
    Iterate {
        span: Span,
        iterable: RustType,
        item: RustType,
    },
}

pub(crate) struct Inferencer<'a> {
    input: &'a FunctionInput<'a>,
    ctx: &'a ModuleContext,
    pragmas: &'a PragmaSet,
    class: Option<&'a ClassInfo>,
    init_mode: bool,
    int_kind: IntKind,
    unifier: Unifier,
    params: Vec<(String, RustType, Span)>,
    env: FxHashMap<String, Binding>,
    /// Names in first-binding order; comprehension targets excluded.
    order: Vec<String>,
    fields: FxHashMap<String, Binding>,
    field_order: Vec<String>,
    ret: RustType,
    ret_annotated: bool,
    returns_value: bool,
    nodes: FxHashMap<NodeId, (RustType, Span)>,
    calls: FxHashMap<NodeId, CallTarget>,
    index_checks: FxHashMap<NodeId, IndexCheck>,
    dynamic: FxHashSet<NodeId>,
    deferred: Vec<Deferred>,
    facts: IndexFacts,
    /// Statement currently being inferred, for first-binding records.
    current_stmt: NodeId,
    /// Depth of comprehension scopes around the current expression.
    comprehension_depth: u32,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Inferencer<'a> {
    fn new(input: &'a FunctionInput<'a>) -> Self {
        let (int_kind, diagnostics) = select_int_kind(input.function, input.pragmas);
        let class = input
            .class
            .and_then(|c| input.context.class(&c.name));
        let init_mode = class.is_some() && input.function.name == "__init__";
        Inferencer {
            input,
            ctx: input.context,
            pragmas: input.pragmas,
            class,
            init_mode,
            int_kind,
            unifier: Unifier::new(),
            params: Vec::new(),
            env: FxHashMap::default(),
            order: Vec::new(),
            fields: FxHashMap::default(),
            field_order: Vec::new(),
            ret: RustType::Unit,
            ret_annotated: false,
            returns_value: false,
            nodes: FxHashMap::default(),
            calls: FxHashMap::default(),
            index_checks: FxHashMap::default(),
            dynamic: FxHashSet::default(),
            deferred: Vec::new(),
            facts: IndexFacts::new(input.function),
            current_stmt: input.function.id,
            comprehension_depth: 0,
            diagnostics,
        }
    }

    fn dynamic_containers(&self) -> bool {
        self.pragmas.container_typing() == ContainerTyping::Dynamic
    }

    /// Lower an annotation, reporting failures. Holes become variables.
    fn annotation(&mut self, ann: &depyler_ir::ast::TypeExpr) -> RustType {
        let ctx = self.ctx;
        let is_class = |name: &str| ctx.classes.contains(name);
        let dynamic = self.dynamic_containers();
        let unifier = &mut self.unifier;
        let mut hole = || {
            if dynamic {
                RustType::Dynamic
            } else {
                unifier.fresh()
            }
        };
        let mut scope = AnnotationScope {
            int_kind: self.int_kind,
            is_class: &is_class,
            hole: &mut hole,
        };
        match lower_annotation(ann, &mut scope) {
            Ok(ty) => ty,
            Err(diag) => {
                self.diagnostics.push(*diag);
                RustType::Unresolved
            }
        }
    }

    fn declare_params(&mut self) {
        let function = self.input.function;
        for (i, param) in function.params.iter().enumerate() {
            let ty = if i == 0 && param.name == "self" && self.class.is_some() && !function.is_static()
            {
                RustType::Struct(self.class.map(|c| c.name.clone()).unwrap_or_default())
            } else if let Some(ann) = &param.annotation {
                self.annotation(ann)
            } else {
                self.unifier.fresh()
            };
            if let Some(default) = &param.default {
                let found = self.expr(default);
                self.coerce_into(&found, &ty, default.span, "default value");
            }
            self.nodes.insert(param.id, (ty.clone(), param.span));
            self.params.push((param.name.clone(), ty, param.span));
        }

        match &function.returns {
            Some(ann) => {
                self.ret = self.annotation(ann);
                self.ret_annotated = true;
            }
            None => self.ret = self.unifier.fresh(),
        }
    }

    // Environment

    fn param_type(&self, name: &str) -> Option<&RustType> {
        self.params
            .iter()
            .find(|(n, _, _)| n == name)
            .map(|(_, ty, _)| ty)
    }

    /// Type of a local or parameter.
    fn lookup(&self, name: &str) -> Option<RustType> {
        self.env
            .get(name)
            .map(|b| b.ty.clone())
            .or_else(|| self.param_type(name).cloned())
    }

    fn is_bound(&self, name: &str) -> bool {
        self.env.contains_key(name) || self.param_type(name).is_some()
    }

    /// Store a value of type `ty` into `name`, declaring it on first use.
    fn bind_name(&mut self, name: &str, ty: &RustType, span: Span) -> RustType {
        if let Some(existing) = self.lookup(name) {
            self.coerce_into(ty, &existing, span, &format!("assignment to `{name}`"));
            return existing;
        }
        // Characters widen to strings once stored in a variable.
        let declared = match self.unifier.shallow(ty) {
            RustType::Char => RustType::Str,
            _ => ty.clone(),
        };
        self.declare(name, declared.clone(), span);
        declared
    }

    /// Bind `name` without checking an earlier binding (loop and
    /// comprehension targets).
    fn declare(&mut self, name: &str, ty: RustType, span: Span) {
        if self.comprehension_depth == 0 && !self.order.iter().any(|n| n == name) {
            self.order.push(name.to_string());
        }
        self.env.insert(
            name.to_string(),
            Binding {
                ty,
                first: self.current_stmt,
                span,
            },
        );
    }

    // Diagnostics

    fn error(&mut self, diag: Diagnostic) -> RustType {
        self.diagnostics.push(diag);
        RustType::Unresolved
    }

    fn mismatch_diag(&self, span: Span, what: &str, mismatch: &Mismatch) -> Diagnostic {
        Diagnostic::new(DiagnosticKind::TypeUnificationError, span)
            .with_message(format!(
                "mismatched types in {what}: expected `{}`, found `{}`",
                mismatch.expected.python_name(),
                mismatch.found.python_name()
            ))
            .with_label(format!("this is `{}`", mismatch.found.python_name()))
    }

    /// Coerce, reporting a mismatch. Returns whether it succeeded.
    fn coerce_into(&mut self, found: &RustType, expected: &RustType, span: Span, what: &str) -> bool {
        match self.unifier.coerce(found, expected) {
            Ok(()) => true,
            Err(mismatch) => {
                let diag = self.mismatch_diag(span, what, &mismatch);
                self.diagnostics.push(diag);
                false
            }
        }
    }

    /// Unify `ty` with the shape `known` it must have. Reported like any
    /// other mismatch.
    fn refine(&mut self, ty: &RustType, known: &RustType, span: Span, what: &str) {
        if let Err(mismatch) = self.unifier.unify(known, ty) {
            let diag = self.mismatch_diag(span, what, &mismatch);
            self.diagnostics.push(diag);
        }
    }

    fn record(&mut self, id: NodeId, ty: RustType, span: Span) -> RustType {
        self.nodes.insert(id, (ty.clone(), span));
        ty
    }

    fn block(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            self.stmt(stmt);
        }
    }

    /// Snapshot the environment, run `f`, and return the environment it
    /// produced while restoring the snapshot.
    fn branch(&mut self, f: impl FnOnce(&mut Self)) -> FxHashMap<String, Binding> {
        let snapshot = self.env.clone();
        f(self);
        mem::replace(&mut self.env, snapshot)
    }

    /// Bring names first bound inside branches into the enclosing scope,
    /// joining the ones bound in more than one branch.
    fn merge_branches(&mut self, branches: Vec<FxHashMap<String, Binding>>) {
        let mut new_names: Vec<String> = Vec::new();
        for branch in &branches {
            for name in branch.keys() {
                if !self.env.contains_key(name) && !new_names.contains(name) {
                    new_names.push(name.clone());
                }
            }
        }
        // Keep first-binding order deterministic.
        new_names.sort_by_key(|name| self.order.iter().position(|n| n == name));

        for name in new_names {
            let mut bindings = branches.iter().filter_map(|b| b.get(&name));
            let Some(first) = bindings.next().cloned() else {
                continue;
            };
            let mut merged = first.clone();
            for other in bindings {
                match self.unifier.join(&merged.ty, &other.ty) {
                    Ok(ty) => merged.ty = ty,
                    Err(mismatch) => {
                        let diag = Diagnostic::new(DiagnosticKind::TypeUnificationError, other.span)
                            .with_message(format!(
                                "`{name}` has incompatible types in different branches: `{}` and `{}`",
                                mismatch.expected.python_name(),
                                mismatch.found.python_name()
                            ))
                            .with_label(format!("`{name}` is `{}` here", mismatch.found.python_name()))
                            .with_secondary_label(
                                first.span,
                                format!("`{name}` is `{}` here", mismatch.expected.python_name()),
                            )
                            .with_note("only `int` to `float` and `T` to `Optional[T]` widen implicitly");
                        self.diagnostics.push(diag);
                        merged.ty = RustType::Unresolved;
                        break;
                    }
                }
            }
            self.env.insert(name, merged);
        }
    }

    // Completion

    fn finish(mut self) -> Inference {
        self.resolve_deferred();

        if !self.ret_annotated && !self.returns_value {
            let ret = self.ret.clone();
            self.refine(&ret, &RustType::Unit, self.input.function.name_span, "return type");
        }

        let mut reports: SmallVec<[Diagnostic; 4]> = SmallVec::new();
        for (name, ty, span) in &self.params {
            if self.unifier.resolve(ty).has_vars() {
                reports.push(
                    Diagnostic::new(DiagnosticKind::TypeUnificationError, *span)
                        .with_message(format!("cannot infer a type for parameter `{name}`"))
                        .with_label("no use of this parameter determines its type")
                        .with_suggestion(format!("add an annotation: `{name}: <type>`")),
                );
            }
        }
        if self.unifier.resolve(&self.ret).has_vars() {
            reports.push(
                Diagnostic::new(DiagnosticKind::TypeUnificationError, self.input.function.name_span)
                    .with_message(format!(
                        "cannot infer the return type of `{}`",
                        self.input.function.name
                    ))
                    .with_label("returned values have no determinable type")
                    .with_suggestion("add a return annotation: `-> <type>`"),
            );
        }
        for name in self.order.iter().chain(&self.field_order) {
            let binding = self.env.get(name).or_else(|| self.fields.get(name));
            let Some(binding) = binding else { continue };
            let resolved = self.unifier.resolve(&binding.ty);
            if resolved.has_vars() {
                let shown = if self.fields.contains_key(name) && !self.env.contains_key(name) {
                    format!("self.{name}")
                } else {
                    name.clone()
                };
                reports.push(
                    Diagnostic::new(DiagnosticKind::TypeUnificationError, binding.span)
                        .with_message(format!("cannot infer a type for `{shown}`"))
                        .with_label(format!("`{shown}` is first bound here"))
                        .with_suggestion(format!("annotate it: `{shown}: <type> = ...`")),
                );
            } else if !resolved.keys_hashable() {
                reports.push(
                    Diagnostic::new(DiagnosticKind::UnsupportedConstruct, binding.span)
                        .with_message(format!(
                            "`{}` cannot be lowered: `float` and container values are not hashable in Rust",
                            resolved.python_name()
                        ))
                        .with_label(format!("`{name}` is bound here")),
                );
            }
        }
        self.diagnostics.extend(reports);

        if self.init_mode {
            self.check_uninitialized_fields();
        }

        let unifier = &self.unifier;
        let lines = &self.ctx.lines;
        let nodes = self
            .nodes
            .iter()
            .map(|(&id, (ty, span))| {
                (
                    id,
                    TypedNode {
                        ty: unifier.finalize(ty),
                        provenance: Provenance {
                            line: lines.span_line(*span),
                            span: *span,
                        },
                    },
                )
            })
            .collect();

        let finalize_locals = |order: &[String], map: &FxHashMap<String, Binding>| {
            order
                .iter()
                .filter_map(|name| {
                    map.get(name).map(|b| Local {
                        name: name.clone(),
                        ty: unifier.finalize(&b.ty),
                        first: b.first,
                        span: b.span,
                    })
                })
                .collect::<Vec<_>>()
        };
        let locals = finalize_locals(&self.order, &self.env);
        let fields = finalize_locals(&self.field_order, &self.fields);

        let typed = TypedFunction {
            id: self.input.function.id,
            name: self.input.function.name.clone(),
            class: self.input.class.map(|c| c.name.clone()),
            params: self
                .params
                .iter()
                .map(|(name, ty, _)| (name.clone(), unifier.finalize(ty)))
                .collect(),
            ret: unifier.finalize(&self.ret),
            int_kind: self.int_kind,
            types: TypeTable { nodes },
            locals,
            calls: self.calls,
            index_checks: self.index_checks,
            dynamic: self.dynamic,
            fields,
        };
        tracing::debug!(
            function = %typed.name,
            ret = %typed.ret,
            locals = typed.locals.len(),
            diagnostics = self.diagnostics.len(),
            "inference finished"
        );
        Inference {
            typed,
            diagnostics: self.diagnostics,
        }
    }

    /// Class-level fields without a default that `__init__` never assigns.
    fn check_uninitialized_fields(&mut self) {
        let Some(class) = self.class else { return };
        for field in &class.fields {
            if field.default.is_none() && !self.fields.contains_key(&field.name) {
                self.diagnostics.push(
                    Diagnostic::new(DiagnosticKind::UnsupportedConstruct, field.span)
                        .with_message(format!("field `{}` is never initialized", field.name))
                        .with_label("declared without a default")
                        .with_secondary_label(
                            self.input.function.name_span,
                            "`__init__` does not assign it",
                        ),
                );
            }
        }
    }

    /// Apply deferred subscripts and iterations until no more receivers
    /// resolve, then report the rest.
    fn resolve_deferred(&mut self) {
        loop {
            let pending = mem::take(&mut self.deferred);
            let before = pending.len();
            for item in pending {
                if !self.try_apply(&item) {
                    self.deferred.push(item);
                }
            }
            if self.deferred.is_empty() || self.deferred.len() == before {
                break;
            }
        }

        for item in mem::take(&mut self.deferred) {
            let diag = match item {
                Deferred::Subscript { site, .. } => {
                    Diagnostic::new(DiagnosticKind::IndexSemanticsError, site.span)
                        .with_message("cannot decide the meaning of this subscript")
                        .with_label("the type of the indexed value is unknown")
                        .with_note("string indexing and element indexing lower differently")
                        .with_suggestion("annotate the indexed value")
                }
                Deferred::Iterate { span, .. } => {
                    Diagnostic::new(DiagnosticKind::TypeUnificationError, span)
                        .with_message("cannot infer the type of this iterable")
                        .with_label("iterated here")
                        .with_suggestion("annotate the iterated value")
                }
            };
            self.diagnostics.push(diag);
        }
    }

    fn try_apply(&mut self, item: &Deferred) -> bool {
        match item {
            Deferred::Subscript {
                site,
                receiver,
                index,
                result,
            } => {
                let receiver = self.unifier.shallow(receiver);
                if matches!(receiver, RustType::Var(_)) {
                    return false;
                }
                let ty = self.subscript_type(site, &receiver, index);
                if let Err(mismatch) = self.unifier.unify(result, &ty) {
                    let diag = self
                        .mismatch_diag(site.span, "subscript result", &mismatch)
                        .with_note("the subscript's type was only known after its result was used");
                    self.diagnostics.push(diag);
                }
                true
            }
            Deferred::Iterate {
                span,
                iterable,
                item,
            } => {
                let iterable = self.unifier.shallow(iterable);
                if matches!(iterable, RustType::Var(_)) {
                    return false;
                }
                let ty = self.item_type(&iterable, *span);
                if let Err(mismatch) = self.unifier.unify(item, &ty) {
                    let diag = self
                        .mismatch_diag(*span, "loop item", &mismatch)
                        .with_note("the iterable's type was only known after its items were used");
                    self.diagnostics.push(diag);
                }
                true
            }
        }
    }
}

/// Whether a statement list ends with `return`/`raise` on every path.
pub fn always_exits(stmts: &[Stmt]) -> bool {
    stmts.last().is_some_and(|stmt| match &stmt.kind {
        StmtKind::Return(_) | StmtKind::Raise(_) => true,
        StmtKind::If { body, orelse, .. } => always_exits(body) && always_exits(orelse),
        _ => false,
    })
}
