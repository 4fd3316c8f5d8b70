//! Iteration: `for` sources, `range`/`enumerate`/`zip`/`reversed`/`sorted`
//! and comprehensions.
//!
//! [`Lowerer::iter_of`] spells any iterable as a Rust iterator yielding
//! owned items, the way a Python loop sees them. Iterating a place
//! borrows it (`.iter().copied()`, `.chars()`); a temporary is consumed.

use depyler_ir::ast::{Comprehension, Expr, ExprKind};
use depyler_types::{Builtin, CallTarget, Method, RustType};

use crate::function::Lowerer;
use crate::runtime::{range_fn, Imports, RuntimeHelpers};
use crate::types::{
    copied_or_cloned, deref_copy, ident, int_literal, tuple_code, wrap, ADD, AND, ATOM, RANGE,
};

impl Lowerer<'_> {
    /// Iterator over the items of `expr`.
    pub(crate) fn iter_of(&mut self, expr: &Expr) -> String {
        if let ExprKind::Call { args, keywords, .. } = &expr.kind {
            match self.typed.call(expr.id) {
                Some(CallTarget::Builtin(Builtin::Range)) => return self.range(expr, args),
                Some(CallTarget::Builtin(Builtin::Enumerate)) => {
                    let Some(source) = args.first() else {
                        return self.unsupported(expr.span, "`enumerate` without arguments");
                    };
                    let start = match args.get(1) {
                        Some(start) => match int_literal(start) {
                            Some(v) => format!("{v}_{}", self.int.as_str()),
                            None => self.expr(start),
                        },
                        None => format!("0_{}", self.int.as_str()),
                    };
                    let inner = self.iter_of(source);
                    return format!("({}..).zip({inner})", wrap(&start, RANGE + 1));
                }
                Some(CallTarget::Builtin(Builtin::Zip)) => {
                    let mut parts = args.iter().map(|a| self.iter_of(a)).collect::<Vec<_>>().into_iter();
                    let Some(mut code) = parts.next() else {
                        return self.unsupported(expr.span, "`zip` without arguments");
                    };
                    for part in parts {
                        code = format!("{code}.zip({part})");
                    }
                    if args.len() > 2 {
                        let names: Vec<String> = (0..args.len()).map(|i| format!("z{i}")).collect();
                        let mut pattern = format!("({}, {})", names[0], names[1]);
                        for name in &names[2..] {
                            pattern = format!("({pattern}, {name})");
                        }
                        code = format!("{code}.map(|{pattern}| {})", tuple_code(&names));
                    }
                    return code;
                }
                Some(CallTarget::Builtin(Builtin::Reversed)) => {
                    let Some(source) = args.first() else {
                        return self.unsupported(expr.span, "`reversed` without arguments");
                    };
                    let inner = self.iter_of(source);
                    return format!("{inner}.rev()");
                }
                Some(CallTarget::Builtin(Builtin::Sorted)) => {
                    let code = self.expr(expr);
                    return format!("{}.into_iter()", wrap(&code, ATOM));
                }
                Some(CallTarget::BuiltinMethod {
                    method: method @ (Method::Keys | Method::Values | Method::Items),
                    ..
                }) if keywords.is_empty() => {
                    let method = *method;
                    if let ExprKind::Call { func, .. } = &expr.kind {
                        if let ExprKind::Attribute { value, .. } = &func.kind {
                            return self.dict_view(value, method);
                        }
                    }
                }
                _ => {}
            }
        }
        match &expr.kind {
            ExprKind::ListComp { .. }
            | ExprKind::SetComp { .. }
            | ExprKind::DictComp { .. }
            | ExprKind::GeneratorExp { .. } => return self.comprehension_iter(expr),
            _ => {}
        }

        let ty = self.ty(expr);
        let place = self.is_place(expr);
        match ty {
            RustType::Str => {
                let s = self.str_receiver(expr);
                format!("{s}.chars()")
            }
            RustType::Vec(item) | RustType::HashSet(item) => {
                let code = self.expr(expr);
                if place {
                    format!("{}.iter().{}", wrap(&code, ATOM), copied_or_cloned(item))
                } else {
                    format!("{}.into_iter()", wrap(&code, ATOM))
                }
            }
            RustType::HashMap(key, _) => {
                let code = self.expr(expr);
                if place {
                    format!("{}.keys().{}", wrap(&code, ATOM), copied_or_cloned(key))
                } else {
                    format!("{}.into_keys()", wrap(&code, ATOM))
                }
            }
            other => {
                let message = format!("iterating {}", other.python_name());
                self.unsupported(expr.span, &message)
            }
        }
    }

    /// `d.keys()`, `d.values()` or `d.items()` as an iterator.
    fn dict_view(&mut self, dict: &Expr, method: Method) -> String {
        let (key, value) = match self.ty(dict) {
            RustType::HashMap(k, v) => ((**k).clone(), (**v).clone()),
            _ => (RustType::Unresolved, RustType::Unresolved),
        };
        let code = self.expr(dict);
        let base = wrap(&code, ATOM);
        if !self.is_place(dict) {
            return match method {
                Method::Keys => format!("{base}.into_keys()"),
                Method::Values => format!("{base}.into_values()"),
                _ => format!("{base}.into_iter()"),
            };
        }
        match method {
            Method::Keys => format!("{base}.keys().{}", copied_or_cloned(&key)),
            Method::Values => format!("{base}.values().{}", copied_or_cloned(&value)),
            _ => {
                let k = deref_copy("k", &key);
                let v = deref_copy("v", &value);
                format!("{base}.iter().map(|(k, v)| ({k}, {v}))")
            }
        }
    }

    fn range(&mut self, expr: &Expr, args: &[Expr]) -> String {
        let kind = match self.ty(expr) {
            RustType::Vec(item) => match **item {
                RustType::Int(kind) => kind,
                _ => self.int,
            },
            _ => self.int,
        };
        let int = RustType::Int(kind);
        let bound = |this: &mut Self, e: &Expr| {
            let code = this.value_as(e, &int);
            match int_literal(e) {
                Some(v) if v >= 0 => format!("{v}_{}", kind.as_str()),
                _ => code,
            }
        };
        let (start, stop, step) = match args {
            [stop] => (format!("0_{}", kind.as_str()), bound(self, stop), None),
            [start, stop] => (bound(self, start), bound(self, stop), None),
            [start, stop, step] => (bound(self, start), bound(self, stop), Some(step)),
            _ => return self.unsupported(expr.span, "`range` arity"),
        };
        let Some(step) = step else {
            return format!("{}..{}", wrap(&start, RANGE + 1), wrap(&stop, RANGE + 1));
        };
        match int_literal(step) {
            Some(1) => format!("{}..{}", wrap(&start, RANGE + 1), wrap(&stop, RANGE + 1)),
            Some(k) if k > 1 => format!(
                "({}..{}).step_by({k})",
                wrap(&start, RANGE + 1),
                wrap(&stop, RANGE + 1)
            ),
            Some(-1) => format!("({} + 1..={}).rev()", wrap(&stop, ADD), wrap(&start, RANGE + 1)),
            Some(k) if k < 0 => format!(
                "({} + 1..={}).rev().step_by({})",
                wrap(&stop, ADD),
                wrap(&start, RANGE + 1),
                -k
            ),
            _ => {
                self.ctx.use_helper(RuntimeHelpers::range(kind));
                let step = self.value_as(step, &int);
                format!("{}({start}, {stop}, {step}).into_iter()", range_fn(kind))
            }
        }
    }

    /// Pattern binding a loop or comprehension target.
    pub(crate) fn target_pattern(&mut self, target: &Expr, mutable: &dyn Fn(&str) -> bool) -> String {
        match &target.kind {
            ExprKind::Name(name) => {
                let prefix = if mutable(name) { "mut " } else { "" };
                format!("{prefix}{}", ident(name))
            }
            ExprKind::Tuple(items) | ExprKind::List(items) => {
                let parts: Vec<String> = items.iter().map(|i| self.target_pattern(i, mutable)).collect();
                tuple_code(&parts)
            }
            _ => self.unsupported(target.span, "loop target other than names"),
        }
    }

    // Comprehensions

    /// A comprehension as a collected value.
    pub(crate) fn comprehension(&mut self, expr: &Expr) -> String {
        let ty = self.ty(expr);
        let collect = match ty {
            RustType::HashSet(_) => {
                self.ctx.use_import(Imports::INDEX_SET);
                "IndexSet<_>"
            }
            RustType::HashMap(..) => {
                self.ctx.use_import(Imports::INDEX_MAP);
                "IndexMap<_, _>"
            }
            _ => "Vec<_>",
        };
        if generators(expr).len() > 1 {
            return self.nested_comprehension(expr);
        }
        let iter = self.comprehension_iter(expr);
        format!("{iter}.collect::<{collect}>()")
    }

    /// A single-generator comprehension as an iterator; nested ones are
    /// built eagerly first.
    fn comprehension_iter(&mut self, expr: &Expr) -> String {
        let [generator] = generators(expr) else {
            let code = self.nested_comprehension(expr);
            return format!("{}.into_iter()", wrap(&code, ATOM));
        };
        let source = self.iter_of(&generator.iter);
        let names = target_names(&generator.target);
        let mark = self.scope.enter_comprehension(names);
        let pattern = self.target_pattern(&generator.target, &|_| false);
        let element = self.element(expr);
        let code = if generator.ifs.is_empty() {
            if element == pattern {
                source
            } else {
                format!("{source}.map(|{pattern}| {element})")
            }
        } else {
            let conds: Vec<String> = generator
                .ifs
                .iter()
                .map(|c| {
                    let code = self.cond(c);
                    wrap(&code, AND)
                })
                .collect();
            format!(
                "{source}.filter_map(|{pattern}| ({}).then(|| {element}))",
                conds.join(" && ")
            )
        };
        self.scope.leave_comprehension(mark);
        code
    }

    /// Item produced by one round of a comprehension.
    fn element(&mut self, expr: &Expr) -> String {
        let ty = self.ty(expr);
        match &expr.kind {
            ExprKind::DictComp { key, value, .. } => {
                let (kt, vt) = match ty {
                    RustType::HashMap(k, v) => ((**k).clone(), (**v).clone()),
                    _ => (RustType::Unresolved, RustType::Unresolved),
                };
                let k = self.value_as(key, &kt);
                let v = self.value_as(value, &vt);
                format!("({k}, {v})")
            }
            ExprKind::ListComp { elt, .. }
            | ExprKind::SetComp { elt, .. }
            | ExprKind::GeneratorExp { elt, .. } => {
                let item = ty.iter_item().unwrap_or(RustType::Unresolved);
                self.value_as(elt, &item)
            }
            _ => self.unsupported(expr.span, "comprehension"),
        }
    }

    /// `{ let mut acc = ..; for .. { for .. { if .. { push } } } acc }`.
    fn nested_comprehension(&mut self, expr: &Expr) -> String {
        let ty = self.ty(expr);
        let generators = generators(expr);
        let acc = self.ctx.fresh_temp();
        let rendered = self.ctx.render_type(ty);
        let (empty, add) = match ty {
            RustType::HashSet(_) => ("IndexSet::new()", "insert"),
            RustType::HashMap(..) => ("IndexMap::new()", "insert"),
            _ => ("Vec::new()", "push"),
        };
        let mut code = format!("{{ let mut {acc}: {rendered} = {empty}; ");
        let mut marks = Vec::new();
        for generator in generators {
            let source = self.iter_of(&generator.iter);
            marks.push(self.scope.enter_comprehension(target_names(&generator.target)));
            let pattern = self.target_pattern(&generator.target, &|_| false);
            code.push_str(&format!("for {pattern} in {source} {{ "));
            for cond in &generator.ifs {
                let test = self.cond(cond);
                code.push_str(&format!("if {test} {{ "));
            }
        }
        let element = self.element(expr);
        let element = match &expr.kind {
            ExprKind::DictComp { .. } => element
                .strip_prefix('(')
                .and_then(|e| e.strip_suffix(')'))
                .map_or(element.clone(), str::to_string),
            _ => element,
        };
        code.push_str(&format!("{acc}.{add}({element}); "));
        for generator in generators {
            for _ in &generator.ifs {
                code.push_str("} ");
            }
            code.push_str("} ");
        }
        for mark in marks.into_iter().rev() {
            self.scope.leave_comprehension(mark);
        }
        code.push_str(&format!("{acc} }}"));
        code
    }
}

fn generators(expr: &Expr) -> &[Comprehension] {
    match &expr.kind {
        ExprKind::ListComp { generators, .. }
        | ExprKind::SetComp { generators, .. }
        | ExprKind::DictComp { generators, .. }
        | ExprKind::GeneratorExp { generators, .. } => generators,
        _ => &[],
    }
}

/// Names bound by a loop or comprehension target.
pub(crate) fn target_names(target: &Expr) -> Vec<String> {
    match &target.kind {
        ExprKind::Name(name) => vec![name.clone()],
        ExprKind::Tuple(items) | ExprKind::List(items) => items.iter().flat_map(target_names).collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests;
