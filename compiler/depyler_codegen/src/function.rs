//! Lowering of one function: signature, declarations and body.
//!
//! The [`Lowerer`] carries everything one function needs and is split
//! across modules by construct: expressions in `expr`, calls and builtins
//! in `call`, loops and comprehensions in `iter`, formatting in `format`,
//! statements in `stmt` and constructors in `class`.

use depyler_diagnostic::{unsupported_construct, Diagnostic};
use depyler_ir::ast::{Expr, ExprKind, Stmt, StmtKind};
use depyler_ir::Span;
use depyler_ownership::{function_key, BorrowScope, OwnershipMap, OwnershipTag, ReceiverMode};
use depyler_pragma::BoundsChecking;
use depyler_types::{always_exits, IntKind, RustType, TypedFunction};

use crate::class::doc_lines;
use crate::context::CodegenContext;
use crate::runtime::Imports;
use crate::scope::Scope;
use crate::types::{clone_of, default_value, field_local, ident, param_type};
use crate::{FunctionUnit, LoweredFunction, ModuleView};

pub(crate) struct Lowerer<'a> {
    pub(crate) view: &'a ModuleView<'a>,
    pub(crate) unit: &'a FunctionUnit<'a>,
    pub(crate) typed: &'a TypedFunction,
    pub(crate) own: &'a OwnershipMap,
    pub(crate) ctx: CodegenContext,
    pub(crate) scope: Scope,
    pub(crate) int: IntKind,
    /// `bounds_checking = "explicit"`.
    pub(crate) explicit: bool,
    /// Inside a general `__init__`: `self.<field>` is the local
    /// `self_<field>`.
    pub(crate) fields_as_locals: bool,
    /// Takes `&self`/`&mut self`.
    pub(crate) has_receiver: bool,
    pub(crate) diagnostics: Vec<Diagnostic>,
}

/// Lower one function or method.
#[tracing::instrument(level = "debug", skip_all, fields(function = %unit.function.name))]
pub fn lower_function(view: &ModuleView<'_>, unit: &FunctionUnit<'_>) -> LoweredFunction {
    let typed = unit.typed;
    let mut lowerer = Lowerer::new(view, unit);
    if typed.is_init() {
        lowerer.init();
    } else {
        lowerer.function();
    }

    let Lowerer {
        ctx, diagnostics, ..
    } = lowerer;
    let (code, mappings, helpers, imports) = ctx.finish();
    tracing::debug!(
        lines = mappings.len(),
        helpers = helpers.bits(),
        failed = diagnostics.iter().any(Diagnostic::is_fatal),
        "function lowered"
    );
    LoweredFunction {
        key: function_key(typed.class.as_deref(), &typed.name),
        class: typed.class.clone(),
        name: typed.name.clone(),
        code,
        mappings,
        helpers,
        imports,
        diagnostics,
    }
}

impl<'a> Lowerer<'a> {
    fn new(view: &'a ModuleView<'a>, unit: &'a FunctionUnit<'a>) -> Self {
        let typed = unit.typed;
        let function = unit.function;
        let has_receiver = unit.class.is_some()
            && !function.is_static()
            && !typed.is_init()
            && function.params.first().is_some_and(|p| p.name == "self");
        Lowerer {
            view,
            unit,
            typed,
            own: unit.ownership,
            ctx: CodegenContext::new(usize::from(unit.class.is_some())),
            scope: Scope::default(),
            int: typed.int_kind,
            explicit: unit.pragmas.bounds_checking() == BoundsChecking::Explicit,
            fields_as_locals: false,
            has_receiver,
            diagnostics: Vec::new(),
        }
    }

    // Shared lookups

    pub(crate) fn ty(&self, expr: &Expr) -> &'a RustType {
        self.typed.ty(expr.id)
    }

    pub(crate) fn int_ty(&self) -> RustType {
        RustType::Int(self.int)
    }

    /// Type of a local, parameter or `self.<field>` local.
    pub(crate) fn local_type(&self, name: &str) -> RustType {
        let found = match name.strip_prefix("self.") {
            Some(field) => self
                .typed
                .fields
                .iter()
                .find(|f| f.name == field)
                .map(|f| &f.ty)
                .or_else(|| self.class_field_type(field)),
            None => self.typed.binding(name),
        };
        found.cloned().unwrap_or(RustType::Unresolved)
    }

    pub(crate) fn class_field_type(&self, field: &str) -> Option<&'a RustType> {
        let class = self.unit.class?;
        let info = self.view.context.class(&class.name)?;
        info.field(field).map(|f| &f.ty)
    }

    /// Rust name of a local; `self.<field>` locals become `self_<field>`.
    pub(crate) fn local_ident(name: &str) -> String {
        match name.strip_prefix("self.") {
            Some(field) => field_local(field),
            None => ident(name),
        }
    }

    pub(crate) fn is_arena_alias(&self, name: &str) -> bool {
        matches!(
            self.own.tag(name),
            Some(OwnershipTag::Borrowed {
                scope: BorrowScope::Arena(_),
                ..
            })
        )
    }

    /// Whether the code of `name` is a reference rather than a value.
    pub(crate) fn is_ref_name(&self, name: &str) -> bool {
        if self.scope.in_comprehension(name) {
            return false;
        }
        (name == "self" && self.has_receiver)
            || self.own.is_borrowed_param(name)
            || self.is_arena_alias(name)
            || self.scope.is_loop_ref(name)
    }

    pub(crate) fn is_ref(&self, expr: &Expr) -> bool {
        expr.as_name().is_some_and(|n| self.is_ref_name(n))
    }

    /// Whether `name` refers to a module-level `str` constant (a `&str`).
    pub(crate) fn is_str_const(&self, name: &str) -> bool {
        !self.is_bound(name)
            && self
                .view
                .context
                .constants
                .get(name)
                .is_some_and(|c| c.ty == RustType::Str)
    }

    /// Whether `name` is a parameter, local or comprehension target here.
    pub(crate) fn is_bound(&self, name: &str) -> bool {
        self.scope.in_comprehension(name) || self.typed.binding(name).is_some()
    }

    pub(crate) fn unsupported(&mut self, span: Span, construct: &str) -> String {
        self.diagnostics.push(unsupported_construct(span, construct));
        "()".to_string()
    }

    pub(crate) fn line(&self, span: Span) -> u32 {
        self.view.line_of(span.start)
    }

    /// Record where the next line comes from, after a `--debug` comment.
    pub(crate) fn mark(&mut self, span: Span) {
        let line = self.line(span);
        if self.view.options.debug {
            let text = self.view.line_text(line).trim();
            self.ctx.writeln(&format!("// line {line}: {text}"));
        }
        self.ctx.map_line(line);
    }

    pub(crate) fn doc(&mut self, docstring: Option<&str>) {
        for line in docstring.map(doc_lines).unwrap_or_default() {
            self.ctx.writeln(&line);
        }
    }

    // Functions

    fn function(&mut self) {
        let function = self.unit.function;
        self.scope = Scope::analyze(&function.body, self.typed, false);
        self.doc(function.docstring.as_deref());
        self.mark(function.name_span);
        let signature = self.signature();
        self.ctx.writeln(&format!("{signature} {{"));
        self.ctx.indent();
        self.copied_params();
        self.hoisted();
        let ret = self.typed.ret.clone();
        self.body(&function.body, &ret);
        self.ctx.dedent();
        self.ctx.writeln("}");
    }

    fn signature(&mut self) -> String {
        let function = self.unit.function;
        let mut params = Vec::new();
        if self.has_receiver {
            params.push(match self.own.receiver {
                Some(ReceiverMode::RefMut) => "&mut self".to_string(),
                _ => "&self".to_string(),
            });
        }
        params.extend(self.params());
        let ret = match &self.typed.ret {
            RustType::Unit => String::new(),
            ty => format!(" -> {}", self.ctx.render_type(ty)),
        };
        format!(
            "pub fn {}({}){ret}",
            ident(&function.name),
            params.join(", ")
        )
    }

    /// Parameter declarations other than the receiver.
    pub(crate) fn params(&mut self) -> Vec<String> {
        let own = self.own;
        let mut out = Vec::new();
        for param in &own.params {
            let ty = self
                .typed
                .param(&param.name)
                .cloned()
                .unwrap_or(RustType::Unresolved);
            self.ctx.note_type(&ty);
            let mutable = !param.mode.is_borrow()
                && own.is_mutable(&param.name)
                && !own.copied_params.contains(&param.name);
            out.push(format!(
                "{}{}: {}",
                if mutable { "mut " } else { "" },
                ident(&param.name),
                param_type(&ty, param.mode)
            ));
        }
        out
    }

    /// Borrowed parameters that are rebound become owned copies.
    pub(crate) fn copied_params(&mut self) {
        let own = self.own;
        for param in &own.params {
            if !own.copied_params.contains(&param.name) {
                continue;
            }
            let ty = self
                .typed
                .param(&param.name)
                .cloned()
                .unwrap_or(RustType::Unresolved);
            let name = ident(&param.name);
            let copy = clone_of(&name, &ty, true);
            self.ctx.writeln(&format!("let mut {name} = {copy};"));
        }
    }

    /// Declarations of locals first bound inside a block.
    pub(crate) fn hoisted(&mut self) {
        let names: Vec<String> = self.scope.hoisted().to_vec();
        for name in names {
            let ty = self.local_type(&name);
            let decl = self.binding_type(&name);
            let mutable = self.is_mutable_binding(&name);
            let keyword = if mutable { "let mut" } else { "let" };
            let plain = self.own.shared_kind(&name).is_none()
                && !self.is_arena_alias(&name)
                && !self.own.stack_arrays.contains_key(&name);
            let rust = Self::local_ident(&name);
            match default_value(&ty).filter(|_| plain) {
                // A default is only ever overwritten.
                Some(default) => {
                    self.ctx
                        .writeln(&format!("let mut {rust}: {decl} = {default};"));
                }
                None => self.ctx.writeln(&format!("{keyword} {rust}: {decl};")),
            }
        }
    }

    pub(crate) fn is_mutable_binding(&self, name: &str) -> bool {
        self.own.is_mutable(name) || self.scope.assign_count(name) > 1
    }

    /// Declared type of a local, after its ownership tag.
    pub(crate) fn binding_type(&mut self, name: &str) -> String {
        let ty = self.local_type(name);
        let rendered = self.ctx.render_type(&ty);
        if let Some(kind) = self.own.shared_kind(name) {
            self.ctx.use_import(Imports::shared(kind));
            return format!("{}<{rendered}>", kind.as_str());
        }
        if self.is_arena_alias(name) {
            return format!("&{rendered}");
        }
        if let (Some(len), RustType::Vec(elem)) = (self.own.stack_arrays.get(name), &ty) {
            return format!("[{}; {len}]", elem.render());
        }
        rendered
    }

    /// Lower a function body whose value has type `ret`.
    pub(crate) fn body(&mut self, body: &[Stmt], ret: &RustType) {
        let Some((last, rest)) = body.split_last() else {
            return;
        };
        for stmt in rest {
            self.stmt(stmt);
        }
        match &last.kind {
            StmtKind::Return(Some(value)) => {
                self.mark(last.span);
                let code = self.value_as(value, ret);
                if *ret != RustType::Unit {
                    self.ctx.writeln(&code);
                } else if !matches!(value.kind, ExprKind::NoneLit) {
                    self.ctx.writeln(&format!("{code};"));
                }
                return;
            }
            StmtKind::Return(None) => {
                if let RustType::Option(_) = ret {
                    self.mark(last.span);
                    self.ctx.writeln("None");
                }
                return;
            }
            _ => self.stmt(last),
        }
        if *ret == RustType::Unit || always_exits(body) || ends_in_endless_loop(last) {
            return;
        }
        if let RustType::Option(_) = ret {
            self.ctx.writeln("None");
        } else {
            self.ctx
                .writeln("unreachable!(\"function ends without returning a value\")");
        }
    }
}

/// `while True:` without a `break` of its own.
fn ends_in_endless_loop(stmt: &Stmt) -> bool {
    let StmtKind::While { test, body } = &stmt.kind else {
        return false;
    };
    matches!(test.kind, ExprKind::Bool(true)) && !breaks(body)
}

fn breaks(body: &[Stmt]) -> bool {
    body.iter().any(|stmt| match &stmt.kind {
        StmtKind::Break => true,
        StmtKind::If { body, orelse, .. } => breaks(body) || breaks(orelse),
        _ => false,
    })
}
