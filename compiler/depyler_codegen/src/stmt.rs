//! Statements: assignments, control flow, `assert` and `raise`.

use depyler_ir::ast::{BinOp, Expr, ExprKind, Stmt, StmtKind};
use depyler_ir::stack::ensure_sufficient_stack;
use depyler_types::{CallTarget, RustType};

use crate::expr::format_macro;
use crate::function::Lowerer;
use crate::iter::target_names;
use crate::runtime::{floor_div_fn, mod_fn, RuntimeHelpers};
use crate::types::{clone_of, escape_braces, ident, int_literal, tuple_code, wrap, ATOM, CAST, MUL};

/// Right-hand side of a store.
enum Rhs<'e> {
    Expr(&'e Expr),
    /// Already lowered code of the given type.
    Code(String, RustType),
}

impl Lowerer<'_> {
    pub(crate) fn block(&mut self, body: &[Stmt]) {
        for stmt in body {
            self.stmt(stmt);
        }
    }

    pub(crate) fn stmt(&mut self, stmt: &Stmt) {
        ensure_sufficient_stack(|| self.stmt_inner(stmt));
    }

    fn stmt_inner(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Pass | StmtKind::AnnAssign { value: None, .. } => return,
            StmtKind::Expr(expr) if matches!(expr.kind, ExprKind::Str(_)) => return,
            // Reported by inference; the function produces no code.
            StmtKind::Unsupported { .. } => return,
            _ => {}
        }
        self.mark(stmt.span);
        match &stmt.kind {
            StmtKind::Expr(expr) => self.expr_stmt(expr),
            StmtKind::Assign { targets, value } => self.assign(stmt, targets, value),
            StmtKind::AnnAssign {
                target,
                value: Some(value),
                ..
            } => self.store(stmt, target, Rhs::Expr(value)),
            StmtKind::AugAssign { target, op, value } => self.aug_assign(target, *op, value),
            StmtKind::Return(value) => self.return_stmt(value.as_ref()),
            StmtKind::If { test, body, orelse } => {
                let test = self.cond(test);
                self.ctx.writeln(&format!("if {test} {{"));
                self.nested(body);
                self.orelse(orelse);
                self.ctx.writeln("}");
            }
            StmtKind::While { test, body } => {
                if matches!(test.kind, ExprKind::Bool(true)) {
                    self.ctx.writeln("loop {");
                } else {
                    let test = self.cond(test);
                    self.ctx.writeln(&format!("while {test} {{"));
                }
                self.nested(body);
                self.ctx.writeln("}");
            }
            StmtKind::For { target, iter, body } => self.for_stmt(stmt, target, iter, body),
            StmtKind::Break => self.ctx.writeln("break;"),
            StmtKind::Continue => self.ctx.writeln("continue;"),
            StmtKind::Assert { test, msg } => {
                let test = self.cond(test);
                let line = match msg {
                    None => format!("assert!({test});"),
                    Some(msg) => {
                        let (fmt, args) = self.message(msg);
                        let shown: String = args.iter().map(|a| format!(", {a}")).collect();
                        format!("assert!({test}, {fmt:?}{shown});")
                    }
                };
                self.ctx.writeln(&line);
            }
            StmtKind::Raise(value) => self.raise(value.as_ref()),
            StmtKind::Pass
            | StmtKind::AnnAssign { value: None, .. }
            | StmtKind::Unsupported { .. } => {}
        }
    }

    fn nested(&mut self, body: &[Stmt]) {
        self.ctx.indent();
        self.block(body);
        self.ctx.dedent();
    }

    fn orelse(&mut self, orelse: &[Stmt]) {
        match orelse {
            [] => {}
            [elif @ Stmt {
                kind: StmtKind::If { test, body, orelse },
                ..
            }] => {
                self.mark(elif.span);
                let test = self.cond(test);
                self.ctx.writeln(&format!("}} else if {test} {{"));
                self.nested(body);
                self.orelse(orelse);
            }
            _ => {
                self.ctx.writeln("} else {");
                self.nested(orelse);
            }
        }
    }

    fn expr_stmt(&mut self, expr: &Expr) {
        if let ExprKind::Call { .. } = expr.kind {
            let code = self.expr(expr);
            if code.starts_with('{') || code.starts_with("if ") {
                self.ctx.writeln(&code);
            } else {
                self.ctx.writeln(&format!("{code};"));
            }
            return;
        }
        let code = self.expr(expr);
        self.ctx.writeln(&format!("let _ = {code};"));
    }

    /// Format string and arguments of a message shown on failure.
    fn message(&mut self, msg: &Expr) -> (String, Vec<String>) {
        if let ExprKind::Str(text) = &msg.kind {
            return (escape_braces(text), Vec::new());
        }
        let (placeholder, arg) = self.display_arg(msg);
        let args = if arg.is_empty() { Vec::new() } else { vec![arg] };
        (placeholder, args)
    }

    fn raise(&mut self, value: Option<&Expr>) {
        let Some(value) = value else {
            self.ctx.writeln("panic!(\"RuntimeError\");");
            return;
        };
        let name = match self.typed.call(value.id) {
            Some(CallTarget::Exception(name)) => name.clone(),
            _ => "Exception".to_string(),
        };
        let first = match &value.kind {
            ExprKind::Call { args, .. } => args.first(),
            _ => None,
        };
        let line = match first {
            None => format_macro("panic!", &name, &[]),
            Some(msg) => {
                let (fmt, args) = self.message(msg);
                format_macro("panic!", &format!("{name}: {fmt}"), &args)
            }
        };
        self.ctx.writeln(&format!("{line};"));
    }

    fn return_stmt(&mut self, value: Option<&Expr>) {
        if self.typed.is_init() {
            let built = self.struct_literal();
            self.ctx.writeln(&format!("return {built};"));
            return;
        }
        let ret = &self.typed.ret;
        match value {
            None | Some(Expr {
                kind: ExprKind::NoneLit,
                ..
            }) if *ret == RustType::Unit => self.ctx.writeln("return;"),
            None => self.ctx.writeln("return None;"),
            Some(value) => {
                let code = self.value_as(value, ret);
                self.ctx.writeln(&format!("return {code};"));
            }
        }
    }

    // Assignment

    fn assign(&mut self, stmt: &Stmt, targets: &[Expr], value: &Expr) {
        let [first, rest @ ..] = targets else {
            return;
        };
        if rest.is_empty() {
            self.store(stmt, first, Rhs::Expr(value));
            return;
        }
        // `a = b = v` evaluates `v` once.
        let ty = self.ty(value).clone();
        let code = self.value(value);
        let temp = self.ctx.fresh_temp();
        let rendered = self.ctx.render_type(&ty);
        self.ctx.writeln(&format!("let {temp}: {rendered} = {code};"));
        for (i, target) in targets.iter().enumerate() {
            let copy = if i + 1 == targets.len() {
                temp.clone()
            } else {
                clone_of(&temp, &ty, false)
            };
            self.store(stmt, target, Rhs::Code(copy, ty.clone()));
        }
    }

    fn rhs(&mut self, rhs: Rhs<'_>, ty: &RustType) -> String {
        match rhs {
            Rhs::Expr(value) => self.value_as(value, ty),
            Rhs::Code(code, from) => self.coerce(code, &from, ty),
        }
    }

    fn store(&mut self, stmt: &Stmt, target: &Expr, rhs: Rhs<'_>) {
        match &target.kind {
            ExprKind::Name(name) => self.store_name(stmt, name, rhs),
            ExprKind::Attribute { value, attr } if value.as_name() == Some("self") => {
                if self.fields_as_locals {
                    self.store_name(stmt, &format!("self.{attr}"), rhs);
                    return;
                }
                let ty = self
                    .class_field_type(attr)
                    .cloned()
                    .unwrap_or_else(|| self.ty(target).clone());
                let code = self.rhs(rhs, &ty);
                self.ctx.writeln(&format!("self.{} = {code};", ident(attr)));
            }
            ExprKind::Attribute { .. } => {
                let ty = self.ty(target);
                let code = self.rhs(rhs, ty);
                let place = self.place_lhs(target);
                self.ctx.writeln(&format!("{place} = {code};"));
            }
            ExprKind::Subscript { value, index } => match self.ty(value) {
                RustType::HashMap(key, val) => {
                    let code = self.rhs(rhs, val);
                    let key = self.value_as(index, key);
                    let map = self.place_mut(value);
                    self.ctx
                        .writeln(&format!("{}.insert({key}, {code});", wrap(&map, ATOM)));
                }
                RustType::Vec(elem) => {
                    let code = self.rhs(rhs, elem);
                    let place = self.place_lhs(target);
                    self.ctx.writeln(&format!("{place} = {code};"));
                }
                other => {
                    let message = format!("item assignment on {}", other.python_name());
                    self.unsupported(target.span, &message);
                }
            },
            ExprKind::Tuple(items) | ExprKind::List(items) => self.store_tuple(stmt, target, items, rhs),
            _ => {
                self.unsupported(target.span, "assignment target");
            }
        }
    }

    /// Store into a local (`self.<field>` locals included).
    fn store_name(&mut self, stmt: &Stmt, name: &str, rhs: Rhs<'_>) {
        let ty = self.local_type(name);
        let code = match (&rhs, self.own.shared_kind(name)) {
            (Rhs::Expr(value), Some(kind)) => match value.as_name() {
                Some(source) if self.own.shared_kind(source).is_some() => {
                    format!("{}::clone(&{})", kind.as_str(), ident(source))
                }
                _ => {
                    let inner = self.value_as(value, &ty);
                    format!("{}::new({inner})", kind.as_str())
                }
            },
            (Rhs::Code(..), Some(kind)) => {
                let inner = self.rhs(rhs, &ty);
                format!("{}::new({inner})", kind.as_str())
            }
            (Rhs::Expr(value), None) if self.is_arena_alias(name) => self.borrow_of(value),
            (Rhs::Expr(value), None) if self.own.stack_arrays.contains_key(name) => {
                match value.kind {
                    ExprKind::List(_) => self.array(value),
                    _ => self.value_as(value, &ty),
                }
            }
            _ => self.rhs(rhs, &ty),
        };
        let rust = Self::local_ident(name);
        if self.scope.declares(name, stmt.id) {
            let decl = self.binding_type(name);
            let keyword = if self.is_mutable_binding(name) { "let mut" } else { "let" };
            self.ctx.writeln(&format!("{keyword} {rust}: {decl} = {code};"));
        } else {
            self.ctx.writeln(&format!("{rust} = {code};"));
        }
    }

    fn store_tuple(&mut self, stmt: &Stmt, target: &Expr, items: &[Expr], rhs: Rhs<'_>) {
        let names: Vec<String> = items
            .iter()
            .filter_map(|i| match &i.kind {
                ExprKind::Name(n) => Some(n.clone()),
                _ => i.as_self_attribute().filter(|_| self.fields_as_locals).map(|f| format!("self.{f}")),
            })
            .collect();
        let declared = names.len() == items.len()
            && names.iter().all(|n| self.scope.declares(n, stmt.id))
            && names.iter().all(|n| self.own.shared_kind(n).is_none());

        let tys: Vec<RustType> = match self.ty(target) {
            RustType::Tuple(tys) if tys.len() == items.len() => tys.clone(),
            _ => names.iter().map(|n| self.local_type(n)).collect(),
        };
        let value = match rhs {
            Rhs::Expr(Expr {
                kind: ExprKind::Tuple(values),
                ..
            }) if values.len() == items.len() => {
                let parts: Vec<String> = values
                    .iter()
                    .zip(&tys)
                    .map(|(v, t)| self.value_as(v, t))
                    .collect();
                tuple_code(&parts)
            }
            Rhs::Expr(value) => self.value(value),
            Rhs::Code(code, _) => code,
        };

        if declared {
            let pattern: Vec<String> = names
                .iter()
                .map(|n| {
                    let mutable = if self.is_mutable_binding(n) { "mut " } else { "" };
                    format!("{mutable}{}", Self::local_ident(n))
                })
                .collect();
            let decls: Vec<String> = names.iter().map(|n| self.binding_type(n)).collect();
            self.ctx.writeln(&format!(
                "let {}: {} = {value};",
                tuple_code(&pattern),
                tuple_code(&decls)
            ));
            return;
        }
        let temp = self.ctx.fresh_temp();
        self.ctx.writeln(&format!("let {temp} = {value};"));
        for (i, (item, ty)) in items.iter().zip(tys).enumerate() {
            self.store(stmt, item, Rhs::Code(format!("{temp}.{i}"), ty));
        }
    }

    fn aug_assign(&mut self, target: &Expr, op: BinOp, value: &Expr) {
        let ty = self.ty(target);
        let line = match (ty, op) {
            (RustType::Str, BinOp::Add) => {
                let place = self.place_mut(target);
                match self.ty(value) {
                    RustType::Char => {
                        let c = self.expr(value);
                        format!("{}.push({c});", wrap(&place, ATOM))
                    }
                    _ => {
                        let s = self.str_ref(value);
                        format!("{}.push_str({s});", wrap(&place, ATOM))
                    }
                }
            }
            (RustType::Vec(_), BinOp::Add) => {
                let items = self.iter_of(value);
                let place = self.place_mut(target);
                format!("{}.extend({items});", wrap(&place, ATOM))
            }
            (RustType::HashSet(_), BinOp::BitOr) => {
                let items = self.iter_of(value);
                let place = self.place_mut(target);
                format!("{}.extend({items});", wrap(&place, ATOM))
            }
            (RustType::HashSet(_), BinOp::Sub | BinOp::BitAnd) => {
                let other = self.expr(value);
                let place = self.place_mut(target);
                let keep = if op == BinOp::Sub { "!" } else { "" };
                format!(
                    "{}.retain(|v| {keep}{}.contains(v));",
                    wrap(&place, ATOM),
                    wrap(&other, ATOM)
                )
            }
            (RustType::Int(kind), BinOp::FloorDiv | BinOp::Mod) => {
                let (helper, name) = if op == BinOp::FloorDiv {
                    (RuntimeHelpers::floor_div(*kind), floor_div_fn(*kind))
                } else {
                    (RuntimeHelpers::modulo(*kind), mod_fn(*kind))
                };
                self.ctx.use_helper(helper);
                let current = self.expr(target);
                let rhs = self.value_as(value, ty);
                let place = self.place_lhs(target);
                format!("{place} = {name}({current}, {rhs});")
            }
            (RustType::Int(kind), BinOp::Pow) => {
                let current = self.expr(target);
                let exp = self.expr(value);
                let place = self.place_lhs(target);
                format!("{place} = {}::pow({current}, {} as u32);", kind.as_str(), wrap(&exp, CAST))
            }
            (RustType::Float, BinOp::FloorDiv | BinOp::Mod | BinOp::Pow) => {
                let current = self.expr(target);
                let place = self.place_lhs(target);
                let updated = match op {
                    BinOp::FloorDiv => {
                        let rhs = self.value_as(value, ty);
                        format!("({current} / {}).floor()", wrap(&rhs, MUL + 1))
                    }
                    BinOp::Mod => {
                        self.ctx.use_helper(RuntimeHelpers::MOD_F64);
                        let rhs = self.value_as(value, ty);
                        format!("py_mod_f64({current}, {rhs})")
                    }
                    _ => match int_literal(value) {
                        Some(exp) if self.ty(value).is_int() => format!("f64::powi({current}, {exp})"),
                        _ => {
                            let rhs = self.value_as(value, ty);
                            format!("f64::powf({current}, {rhs})")
                        }
                    },
                };
                format!("{place} = {updated};")
            }
            (RustType::Int(_) | RustType::Float | RustType::Bool, _) => {
                let sym = match op {
                    BinOp::Add => "+=",
                    BinOp::Sub => "-=",
                    BinOp::Mul => "*=",
                    BinOp::Div => "/=",
                    BinOp::BitAnd => "&=",
                    BinOp::BitOr => "|=",
                    BinOp::BitXor => "^=",
                    BinOp::LShift => "<<=",
                    BinOp::RShift => ">>=",
                    _ => {
                        let message = format!("`{}=` on {}", op.as_python(), ty.python_name());
                        self.unsupported(target.span, &message);
                        return;
                    }
                };
                let rhs = if *ty == RustType::Bool {
                    self.cond(value)
                } else {
                    self.value_as(value, ty)
                };
                let place = self.place_lhs(target);
                format!("{place} {sym} {rhs};")
            }
            _ => {
                let message = format!("`{}=` on {}", op.as_python(), ty.python_name());
                self.unsupported(target.span, &message);
                return;
            }
        };
        self.ctx.writeln(&line);
    }

    // Loops

    fn for_stmt(&mut self, stmt: &Stmt, target: &Expr, iter: &Expr, body: &[Stmt]) {
        if let Some((name, source)) = self.borrowed_items(target, iter) {
            self.ctx.writeln(&format!("for {} in {source} {{", ident(name)));
            self.nested(body);
            self.ctx.writeln("}");
            return;
        }
        let source = self.iter_of(iter);
        let names = target_names(target);
        if names.iter().all(|n| self.scope.is_loop_only(n)) {
            let own = self.own;
            let pattern = self.target_pattern(target, &|n| own.is_mutable(n));
            self.ctx.writeln(&format!("for {pattern} in {source} {{"));
            self.nested(body);
            self.ctx.writeln("}");
            return;
        }
        // The target outlives the loop: bind each item to the declared local.
        let temp = self.ctx.fresh_temp();
        self.ctx.writeln(&format!("for {temp} in {source} {{"));
        self.ctx.indent();
        let item = self.ty(iter).iter_item().unwrap_or(RustType::Unresolved);
        self.bind_loop_target(stmt, target, temp, item);
        self.block(body);
        self.ctx.dedent();
        self.ctx.writeln("}");
    }

    /// Iterator over references to the items of `iter`, when the loop only
    /// reads its target. The target then reads like a borrowed parameter.
    fn borrowed_items<'t>(&mut self, target: &'t Expr, iter: &Expr) -> Option<(&'t str, String)> {
        let name = target.as_name()?;
        if !self.scope.is_loop_only(name) || !self.own.is_loop_borrow(name) || !self.is_place(iter) {
            return None;
        }
        let item = match self.ty(iter) {
            RustType::Vec(item) | RustType::HashSet(item) if item.is_heap() => item,
            _ => return None,
        };
        let map = match &**item {
            RustType::Str => ".map(String::as_str)",
            RustType::Vec(_) => ".map(Vec::as_slice)",
            _ => "",
        };
        self.scope.bind_loop_ref(name);
        let code = self.expr(iter);
        Some((name, format!("{}.iter(){map}", wrap(&code, ATOM))))
    }

    fn bind_loop_target(&mut self, stmt: &Stmt, target: &Expr, code: String, ty: RustType) {
        match &target.kind {
            ExprKind::Name(name) if self.scope.is_loop_only(name) => {
                let keyword = if self.own.is_mutable(name) { "let mut" } else { "let" };
                self.ctx.writeln(&format!("{keyword} {} = {code};", ident(name)));
            }
            ExprKind::Tuple(items) | ExprKind::List(items) => {
                let tys = match &ty {
                    RustType::Tuple(tys) => tys.clone(),
                    _ => vec![RustType::Unresolved; items.len()],
                };
                for (i, (item, ty)) in items.iter().zip(tys).enumerate() {
                    self.bind_loop_target(stmt, item, format!("{code}.{i}"), ty);
                }
            }
            _ => self.store(stmt, target, Rhs::Code(code, ty)),
        }
    }
}

#[cfg(test)]
mod tests;
