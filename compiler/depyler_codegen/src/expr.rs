//! Expressions: names, operators, comparisons, containers and subscripts.
//!
//! Every expression has two spellings. [`Lowerer::expr`] is the read form:
//! it may borrow (`s`, `xs[i]`, a `&str` parameter). [`Lowerer::value`] is
//! the owned form used wherever the value is stored, returned or passed by
//! value; it adds the clone ownership resolution asked for, and the copy a
//! reference needs to become a value.

use depyler_ir::ast::{BinOp, BoolOp, CmpOp, Expr, ExprKind, UnaryOp};
use depyler_ir::stack::ensure_sufficient_stack;
use depyler_types::{Builtin, CallTarget, IndexCheck, IntKind, MathMember, RustType};

use crate::function::Lowerer;
use crate::runtime::{floor_div_fn, mod_fn, Imports, RuntimeHelpers};
use crate::types::{
    char_lit, clone_of, escape_braces, field_local, float_lit, ident, int_literal, is_int_literal,
    precedence, str_lit, tuple_code, wrap, ADD, AND, ATOM, BIT_AND, BIT_OR, BIT_XOR, CAST, CMP, MUL, OR, SHIFT,
    UNARY,
};

const INDEX_ERROR: &str = "IndexError: string index out of range";

impl Lowerer<'_> {
    /// Read form of `expr`.
    pub(crate) fn expr(&mut self, expr: &Expr) -> String {
        ensure_sufficient_stack(|| self.expr_inner(expr))
    }

    fn expr_inner(&mut self, expr: &Expr) -> String {
        match &expr.kind {
            ExprKind::Int(v) => v.to_string(),
            ExprKind::BigInt(digits) => {
                self.unsupported(expr.span, &format!("integer literal {digits} beyond i128"))
            }
            ExprKind::Float(v) => float_lit(*v),
            ExprKind::Str(s) => str_lit(s),
            ExprKind::FString(parts) => self.fstring(parts),
            ExprKind::Bool(b) => b.to_string(),
            ExprKind::NoneLit => match self.ty(expr) {
                RustType::Dynamic => "PyValue::None".to_string(),
                _ => "None".to_string(),
            },
            ExprKind::Name(name) => self.name(expr, name),
            ExprKind::Attribute { value, attr } => self.attribute(expr, value, attr),
            ExprKind::Subscript { value, index } => self.subscript(expr, value, index),
            ExprKind::Slice { .. } => self.unsupported(expr.span, "slice outside a subscript"),
            ExprKind::Call {
                func,
                args,
                keywords,
            } => self.call(expr, func, args, keywords),
            ExprKind::BinOp { left, op, right } => self.binop(expr, left, *op, right),
            ExprKind::UnaryOp { op, operand } => self.unary(expr, *op, operand),
            ExprKind::BoolOp { op, values } => self.boolop(expr, *op, values),
            ExprKind::Compare {
                left,
                ops,
                comparators,
            } => self.compare(left, ops, comparators),
            ExprKind::IfExp { test, body, orelse } => {
                let ty = self.ty(expr);
                let test = self.cond(test);
                let body = self.value_as(body, ty);
                let orelse = self.value_as(orelse, ty);
                format!("if {test} {{ {body} }} else {{ {orelse} }}")
            }
            ExprKind::List(items) => self.list(expr, items),
            ExprKind::Tuple(items) => {
                let tys = match self.ty(expr) {
                    RustType::Tuple(tys) => tys.clone(),
                    _ => Vec::new(),
                };
                let parts: Vec<String> = items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| match tys.get(i) {
                        Some(ty) => self.value_as(item, ty),
                        None => self.value(item),
                    })
                    .collect();
                tuple_code(&parts)
            }
            ExprKind::Set(items) => {
                self.ctx.use_import(Imports::INDEX_SET);
                let elem = match self.ty(expr) {
                    RustType::HashSet(t) => (**t).clone(),
                    _ => RustType::Unresolved,
                };
                let parts: Vec<String> = items.iter().map(|i| self.value_as(i, &elem)).collect();
                format!("IndexSet::from([{}])", parts.join(", "))
            }
            ExprKind::Dict { keys, values } => self.dict(expr, keys, values),
            ExprKind::ListComp { .. }
            | ExprKind::SetComp { .. }
            | ExprKind::DictComp { .. }
            | ExprKind::GeneratorExp { .. } => self.comprehension(expr),
            ExprKind::Unsupported { construct } => self.unsupported(expr.span, construct),
        }
    }

    fn name(&mut self, expr: &Expr, name: &str) -> String {
        if name == "self" {
            if self.has_receiver {
                return "self".to_string();
            }
            return self.unsupported(expr.span, "`self` before the struct is built");
        }
        if self.is_bound(name) || self.view.context.constants.contains_key(name) {
            return ident(name);
        }
        match self.view.context.math_names.get(name) {
            Some(MathMember::Pi) => "std::f64::consts::PI".to_string(),
            Some(MathMember::E) => "std::f64::consts::E".to_string(),
            _ => ident(name),
        }
    }

    fn attribute(&mut self, expr: &Expr, value: &Expr, attr: &str) -> String {
        if let Some(module) = value.as_name() {
            if !self.is_bound(module) && self.view.context.is_math_module(module) {
                return match attr {
                    "pi" => "std::f64::consts::PI".to_string(),
                    "e" => "std::f64::consts::E".to_string(),
                    _ => self.unsupported(expr.span, &format!("math.{attr} as a value")),
                };
            }
        }
        if value.as_name() == Some("self") && self.fields_as_locals {
            return field_local(attr);
        }
        let base = self.expr(value);
        format!("{}.{}", wrap(&base, ATOM), ident(attr))
    }

    /// Owned form of `expr`.
    pub(crate) fn value(&mut self, expr: &Expr) -> String {
        let ty = self.ty(expr);
        match &expr.kind {
            ExprKind::Str(s) if *ty != RustType::Char => {
                return format!("{}.to_string()", str_lit(s));
            }
            ExprKind::Name(name) if self.is_str_const(name) => {
                return format!("{}.to_string()", ident(name));
            }
            ExprKind::Name(name) if !self.scope.in_comprehension(name) => {
                if self.own.shared_kind(name).is_some() {
                    return format!("(*{}).clone()", ident(name));
                }
            }
            _ => {}
        }
        let code = self.expr(expr);
        let by_ref = self.is_ref(expr);
        if ty.is_heap() && (by_ref || self.own.needs_clone(expr.id)) {
            clone_of(&code, ty, by_ref)
        } else {
            code
        }
    }

    /// Owned form of `expr` converted to `target`.
    pub(crate) fn value_as(&mut self, expr: &Expr, target: &RustType) -> String {
        let from = self.ty(expr);
        if let ExprKind::NoneLit = expr.kind {
            return match target {
                RustType::Dynamic => "PyValue::None".to_string(),
                _ => "None".to_string(),
            };
        }
        if let (ExprKind::Str(s), RustType::Char) = (&expr.kind, target) {
            if let Some(c) = s.chars().next().filter(|_| s.chars().count() == 1) {
                return char_lit(c);
            }
        }
        let code = self.value(expr);
        self.coerce(code, from, target)
    }

    /// An owned copy of `expr` even where ownership resolution saw only a
    /// read (builtin arguments).
    pub(crate) fn owned_copy(&mut self, expr: &Expr) -> String {
        let ty = self.ty(expr);
        if ty.is_heap() && self.is_place(expr) && !self.own.needs_clone(expr.id) {
            if let ExprKind::Name(name) = &expr.kind {
                if self.is_str_const(name) || self.own.shared_kind(name).is_some() {
                    return self.value(expr);
                }
            }
            let code = self.expr(expr);
            return clone_of(&code, ty, self.is_ref(expr));
        }
        self.value(expr)
    }

    /// Convert code of type `from` into `to`.
    pub(crate) fn coerce(&mut self, code: String, from: &RustType, to: &RustType) -> String {
        if from == to {
            return code;
        }
        match (from, to) {
            (RustType::Int(a), RustType::Int(b)) if a != b => {
                if is_int_literal(&code) {
                    code
                } else {
                    format!("{} as {}", wrap(&code, CAST), b.as_str())
                }
            }
            (RustType::Int(_), RustType::Float) => {
                if is_int_literal(&code)
                    || code.strip_prefix('-').is_some_and(is_int_literal)
                {
                    format!("{code}.0")
                } else {
                    format!("{} as f64", wrap(&code, CAST))
                }
            }
            (RustType::Bool, RustType::Int(k)) => format!("{}::from({code})", k.as_str()),
            (RustType::Bool, RustType::Float) => format!("f64::from(u8::from({code}))"),
            (RustType::Char, RustType::Str) => format!("{}.to_string()", wrap(&code, ATOM)),
            (RustType::Option(_), RustType::Option(_)) => code,
            (_, RustType::Option(inner)) => {
                let inner = self.coerce(code, from, inner);
                format!("Some({inner})")
            }
            (RustType::Int(_), RustType::Dynamic) if is_int_literal(&code) => {
                self.ctx.use_helper(RuntimeHelpers::PY_VALUE);
                format!("PyValue::from({code}_i64)")
            }
            (_, RustType::Dynamic) => {
                self.ctx.use_helper(RuntimeHelpers::PY_VALUE);
                format!("PyValue::from({code})")
            }
            _ => code,
        }
    }

    /// Whether `expr` names storage (so iterating it borrows).
    pub(crate) fn is_place(&self, expr: &Expr) -> bool {
        match &expr.kind {
            ExprKind::Name(_) => true,
            ExprKind::Attribute { value, .. } => {
                value.as_name().is_some_and(|n| !self.view.context.is_math_module(n))
                    || self.is_place(value)
            }
            ExprKind::Subscript { value, index } => {
                !matches!(index.kind, ExprKind::Slice { .. }) && self.is_place(value)
            }
            _ => false,
        }
    }

    // Strings as `&str`

    /// `expr` as a `&str`.
    pub(crate) fn str_ref(&mut self, expr: &Expr) -> String {
        match &expr.kind {
            ExprKind::Str(s) => return str_lit(s),
            ExprKind::Name(name) if self.is_ref_name(name) || self.is_str_const(name) => {
                return ident(name);
            }
            _ => {}
        }
        let code = self.expr(expr);
        match self.ty(expr) {
            RustType::Char => format!("{}.to_string().as_str()", wrap(&code, ATOM)),
            _ => format!("{}.as_str()", wrap(&code, ATOM)),
        }
    }

    /// Receiver for a `str` method: `&str`, `String` or a converted char.
    pub(crate) fn str_receiver(&mut self, expr: &Expr) -> String {
        if let ExprKind::Str(s) = &expr.kind {
            return str_lit(s);
        }
        let code = self.expr(expr);
        match self.ty(expr) {
            RustType::Char => format!("{}.to_string()", wrap(&code, ATOM)),
            _ => wrap(&code, ATOM),
        }
    }

    /// `&expr`, for arguments taken by reference.
    pub(crate) fn borrow_of(&mut self, expr: &Expr) -> String {
        match &expr.kind {
            ExprKind::Str(s) => return str_lit(s),
            ExprKind::Name(name) if self.is_ref_name(name) || self.is_str_const(name) => {
                return ident(name);
            }
            _ => {}
        }
        let code = self.expr(expr);
        match self.ty(expr) {
            RustType::Char => format!("&{}.to_string()", wrap(&code, ATOM)),
            _ => format!("&{}", wrap(&code, UNARY)),
        }
    }

    /// `&mut expr`, for arguments and receivers changed in place.
    pub(crate) fn borrow_mut_of(&mut self, expr: &Expr) -> String {
        if let Some(name) = expr.as_name() {
            if self.own.is_borrowed_param(name) {
                return ident(name);
            }
        }
        let place = self.place_mut(expr);
        format!("&mut {}", wrap(&place, UNARY))
    }

    /// Key argument of a map or set lookup.
    pub(crate) fn key_ref(&mut self, key: &Expr, key_ty: &RustType) -> String {
        if key_ty.is_copy() {
            let code = self.value_as(key, key_ty);
            return format!("&{}", wrap(&code, UNARY));
        }
        if *self.ty(key) != *key_ty && *key_ty != RustType::Str {
            let code = self.value_as(key, key_ty);
            return format!("&{}", wrap(&code, UNARY));
        }
        self.borrow_of(key)
    }

    /// An index or count as `usize`.
    pub(crate) fn usize_of(&mut self, expr: &Expr) -> String {
        if let ExprKind::Int(v) = expr.kind {
            if v >= 0 {
                return v.to_string();
            }
        }
        let code = self.expr(expr);
        format!("{} as usize", wrap(&code, CAST))
    }

    /// An integer as `i64`, for runtime helpers.
    pub(crate) fn i64_of(&mut self, expr: &Expr) -> String {
        let code = self.expr(expr);
        match self.ty(expr) {
            RustType::Int(IntKind::I64) => code,
            _ if is_int_literal(&code) => code,
            _ => format!("{} as i64", wrap(&code, CAST)),
        }
    }

    // Operators

    fn binop(&mut self, expr: &Expr, left: &Expr, op: BinOp, right: &Expr) -> String {
        let ty = self.ty(expr);
        let (lt, rt) = (self.ty(left), self.ty(right));
        match (ty, op) {
            (RustType::Str, BinOp::Add) => self.concat(expr),
            (RustType::Str, BinOp::Mul) => {
                let (s, n) = if lt.is_stringlike() { (left, right) } else { (right, left) };
                let receiver = self.str_receiver(s);
                let count = self.usize_of(n);
                format!("{receiver}.repeat({count})")
            }
            (RustType::Vec(_), BinOp::Add) => {
                let l = self.expr(left);
                let r = self.expr(right);
                format!("[&{}[..], &{}[..]].concat()", wrap(&l, ATOM), wrap(&r, ATOM))
            }
            (RustType::Vec(elem), BinOp::Mul) => {
                let (list, n) = if matches!(lt, RustType::Vec(_)) { (left, right) } else { (right, left) };
                self.repeat_list(list, elem, n)
            }
            (RustType::HashSet(_), BinOp::BitOr | BinOp::BitAnd | BinOp::Sub | BinOp::BitXor) => {
                let l = self.borrow_of(left);
                let r = self.borrow_of(right);
                let sym = match op {
                    BinOp::BitOr => "|",
                    BinOp::BitAnd => "&",
                    BinOp::Sub => "-",
                    _ => "^",
                };
                format!("{l} {sym} {r}")
            }
            (RustType::Int(_) | RustType::Float, _) => self.arith(expr, ty, left, op, right),
            (RustType::Bool, BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor) => {
                let (sym, prec) = match op {
                    BinOp::BitAnd => ("&", BIT_AND),
                    BinOp::BitOr => ("|", BIT_OR),
                    _ => ("^", BIT_XOR),
                };
                let l = self.cond(left);
                let r = self.cond(right);
                format!("{} {sym} {}", wrap(&l, prec), wrap(&r, prec + 1))
            }
            _ => {
                let message = format!(
                    "`{}` between {} and {}",
                    op.as_python(),
                    lt.python_name(),
                    rt.python_name()
                );
                self.unsupported(expr.span, &message)
            }
        }
    }

    fn arith(&mut self, expr: &Expr, ty: &RustType, left: &Expr, op: BinOp, right: &Expr) -> String {
        let kind = match ty {
            RustType::Int(kind) => Some(*kind),
            _ => None,
        };
        if op == BinOp::Pow {
            return self.pow(ty, left, right);
        }
        let l = self.value_as(left, ty);
        let r = self.value_as(right, ty);
        let infix = |sym: &str, prec: u8| format!("{} {sym} {}", wrap(&l, prec), wrap(&r, prec + 1));
        match (op, kind) {
            (BinOp::Add, _) => infix("+", ADD),
            (BinOp::Sub, _) => infix("-", ADD),
            (BinOp::Mul, _) => infix("*", MUL),
            (BinOp::Div, None) => infix("/", MUL),
            (BinOp::FloorDiv, Some(kind)) => {
                self.ctx.use_helper(RuntimeHelpers::floor_div(kind));
                format!("{}({l}, {r})", floor_div_fn(kind))
            }
            (BinOp::FloorDiv, None) => format!("({}).floor()", infix("/", MUL)),
            (BinOp::Mod, Some(kind)) => {
                if self.non_negative(left) && self.non_negative(right) {
                    infix("%", MUL)
                } else {
                    self.ctx.use_helper(RuntimeHelpers::modulo(kind));
                    format!("{}({l}, {r})", mod_fn(kind))
                }
            }
            (BinOp::Mod, None) => {
                self.ctx.use_helper(RuntimeHelpers::MOD_F64);
                format!("py_mod_f64({l}, {r})")
            }
            (BinOp::BitAnd, Some(_)) => infix("&", BIT_AND),
            (BinOp::BitOr, Some(_)) => infix("|", BIT_OR),
            (BinOp::BitXor, Some(_)) => infix("^", BIT_XOR),
            (BinOp::LShift, Some(_)) => infix("<<", SHIFT),
            (BinOp::RShift, Some(_)) => infix(">>", SHIFT),
            _ => {
                let message = format!("`{}` on {}", op.as_python(), ty.python_name());
                self.unsupported(expr.span, &message)
            }
        }
    }

    fn pow(&mut self, ty: &RustType, left: &Expr, right: &Expr) -> String {
        let base = self.value_as(left, ty);
        match ty {
            RustType::Int(kind) => {
                let exp = match right.kind {
                    ExprKind::Int(v) if v >= 0 => v.to_string(),
                    _ => {
                        let code = self.expr(right);
                        format!("{} as u32", wrap(&code, CAST))
                    }
                };
                format!("{}::pow({base}, {exp})", kind.as_str())
            }
            _ if self.ty(right).is_int() => {
                let exp = match int_literal(right) {
                    Some(v) => v.to_string(),
                    None => {
                        let code = self.expr(right);
                        format!("{} as i32", wrap(&code, CAST))
                    }
                };
                format!("f64::powi({base}, {exp})")
            }
            _ => {
                let exp = self.value_as(right, &RustType::Float);
                format!("f64::powf({base}, {exp})")
            }
        }
    }

    /// Whether `expr` is provably `>= 0`.
    fn non_negative(&self, expr: &Expr) -> bool {
        match &expr.kind {
            ExprKind::Int(v) => *v >= 0,
            ExprKind::Call { .. } => matches!(
                self.typed.call(expr.id),
                Some(CallTarget::Builtin(Builtin::Len | Builtin::Abs))
            ),
            ExprKind::BinOp {
                left,
                op: BinOp::Add | BinOp::Mul | BinOp::FloorDiv | BinOp::Mod,
                right,
            } => self.non_negative(left) && self.non_negative(right),
            _ => false,
        }
    }

    /// `a + b + ...` over strings as one `format!`.
    fn concat(&mut self, expr: &Expr) -> String {
        let mut leaves = Vec::new();
        self.concat_leaves(expr, &mut leaves);
        let mut fmt = String::new();
        let mut args = Vec::new();
        for leaf in leaves {
            if let ExprKind::Str(s) = &leaf.kind {
                fmt.push_str(&escape_braces(s));
            } else {
                fmt.push_str("{}");
                args.push(self.expr(leaf));
            }
        }
        format_macro("format!", &fmt, &args)
    }

    fn concat_leaves<'e>(&self, expr: &'e Expr, out: &mut Vec<&'e Expr>) {
        match &expr.kind {
            ExprKind::BinOp {
                left,
                op: BinOp::Add,
                right,
            } if *self.ty(expr) == RustType::Str => {
                self.concat_leaves(left, out);
                self.concat_leaves(right, out);
            }
            _ => out.push(expr),
        }
    }

    fn repeat_list(&mut self, list: &Expr, elem: &RustType, count: &Expr) -> String {
        let n = self.usize_of(count);
        if let ExprKind::List(items) = &list.kind {
            if let [item] = items.as_slice() {
                let item = self.value_as(item, elem);
                return format!("vec![{item}; {n}]");
            }
        }
        let code = self.expr(list);
        if elem.is_copy() {
            return format!("{}.repeat({n})", wrap(&code, ATOM));
        }
        if self.is_place(list) {
            return format!(
                "(0..{n}).flat_map(|_| {}.iter().cloned()).collect::<Vec<_>>()",
                wrap(&code, ATOM)
            );
        }
        let temp = self.ctx.fresh_temp();
        format!(
            "{{ let {temp} = {code}; (0..{n}).flat_map(|_| {temp}.iter().cloned()).collect::<Vec<_>>() }}"
        )
    }

    fn unary(&mut self, expr: &Expr, op: UnaryOp, operand: &Expr) -> String {
        match op {
            UnaryOp::Not => {
                let inner = self.cond(operand);
                negate(&inner)
            }
            UnaryOp::Neg => {
                let ty = self.ty(expr);
                let inner = match operand.kind {
                    ExprKind::Int(_) | ExprKind::Float(_) => self.expr(operand),
                    _ => self.value_as(operand, ty),
                };
                format!("-{}", wrap(&inner, UNARY))
            }
            UnaryOp::Pos => self.value(operand),
            UnaryOp::Invert => {
                let inner = self.expr(operand);
                format!("!{}", wrap(&inner, UNARY))
            }
        }
    }

    fn boolop(&mut self, expr: &Expr, op: BoolOp, values: &[Expr]) -> String {
        let ty = self.ty(expr);
        if *ty == RustType::Bool {
            let (sym, prec) = match op {
                BoolOp::And => (" && ", AND),
                BoolOp::Or => (" || ", OR),
            };
            let parts: Vec<String> = values
                .iter()
                .map(|v| {
                    let c = self.cond(v);
                    wrap(&c, prec)
                })
                .collect();
            return parts.join(sym);
        }
        // `a or b` yields `a` when it is truthy, `b` otherwise.
        let Some((last, rest)) = values.split_last() else {
            return self.unsupported(expr.span, "empty boolean operation");
        };
        let mut code = self.value_as(last, ty);
        for value in rest.iter().rev() {
            let temp = self.ctx.fresh_temp();
            let head = self.value_as(value, ty);
            let test = truthy(&temp, ty);
            code = match op {
                BoolOp::Or => format!("{{ let {temp} = {head}; if {test} {{ {temp} }} else {{ {code} }} }}"),
                BoolOp::And => format!("{{ let {temp} = {head}; if {test} {{ {code} }} else {{ {temp} }} }}"),
            };
        }
        code
    }

    /// `expr` as a `bool` condition, after Python truthiness.
    pub(crate) fn cond(&mut self, expr: &Expr) -> String {
        match &expr.kind {
            ExprKind::UnaryOp {
                op: UnaryOp::Not,
                operand,
            } => {
                let inner = self.cond(operand);
                negate(&inner)
            }
            ExprKind::BoolOp { op, values } => {
                let (sym, prec) = match op {
                    BoolOp::And => (" && ", AND),
                    BoolOp::Or => (" || ", OR),
                };
                let parts: Vec<String> = values
                    .iter()
                    .map(|v| {
                        let c = self.cond(v);
                        wrap(&c, prec)
                    })
                    .collect();
                parts.join(sym)
            }
            _ => {
                let code = self.expr(expr);
                truthy(&code, self.ty(expr))
            }
        }
    }

    // Comparisons

    fn compare(&mut self, left: &Expr, ops: &[CmpOp], comparators: &[Expr]) -> String {
        let mut parts = Vec::new();
        let mut lhs = left;
        for (op, rhs) in ops.iter().zip(comparators) {
            let part = self.compare_pair(lhs, *op, rhs);
            parts.push(wrap(&part, AND));
            lhs = rhs;
        }
        parts.join(" && ")
    }

    fn compare_pair(&mut self, left: &Expr, op: CmpOp, right: &Expr) -> String {
        match op {
            CmpOp::In => return self.membership(left, right),
            CmpOp::NotIn => {
                let code = self.membership(left, right);
                return negate(&code);
            }
            _ => {}
        }
        let none_side = match (&left.kind, &right.kind) {
            (_, ExprKind::NoneLit) => Some(left),
            (ExprKind::NoneLit, _) => Some(right),
            _ => None,
        };
        if let Some(side) = none_side {
            let code = self.expr(side);
            let method = match op {
                CmpOp::Is | CmpOp::Eq => "is_none",
                CmpOp::IsNot | CmpOp::NotEq => "is_some",
                _ => return self.unsupported(left.span, "ordering against None"),
            };
            return format!("{}.{method}()", wrap(&code, ATOM));
        }
        let sym = match op {
            CmpOp::Eq => "==",
            CmpOp::NotEq => "!=",
            CmpOp::Lt => "<",
            CmpOp::LtE => "<=",
            CmpOp::Gt => ">",
            CmpOp::GtE => ">=",
            _ => return self.unsupported(left.span, "`is` on values other than None"),
        };
        let (l, r) = self.compare_operands(left, op, right);
        format!("{} {sym} {}", wrap(&l, CMP + 1), wrap(&r, CMP + 1))
    }

    fn compare_operands(&mut self, left: &Expr, op: CmpOp, right: &Expr) -> (String, String) {
        let (lt, rt) = (self.ty(left), self.ty(right));
        let equality = matches!(op, CmpOp::Eq | CmpOp::NotEq);
        if lt.is_numeric() && rt.is_numeric() {
            let target = match (lt, rt) {
                (RustType::Int(a), RustType::Int(b)) => RustType::Int((*a).max(*b)),
                _ => RustType::Float,
            };
            let l = self.expr(left);
            let r = self.expr(right);
            return (self.coerce(l, lt, &target), self.coerce(r, rt, &target));
        }
        match (lt, rt) {
            (RustType::Char, RustType::Str) => {
                let l = self.expr(left);
                match single_char(right) {
                    Some(c) => (l, char_lit(c)),
                    None => (format!("{}.to_string().as_str()", wrap(&l, ATOM)), self.str_ref(right)),
                }
            }
            (RustType::Str, RustType::Char) => {
                let r = self.expr(right);
                match single_char(left) {
                    Some(c) => (char_lit(c), r),
                    None => (self.str_ref(left), format!("{}.to_string().as_str()", wrap(&r, ATOM))),
                }
            }
            (RustType::Str, RustType::Str) if !equality => (self.str_ref(left), self.str_ref(right)),
            (RustType::Option(inner), other) if !matches!(other, RustType::Option(_)) => {
                let l = self.expr(left);
                (self.option_side(&l, inner), self.some_side(right, inner))
            }
            (other, RustType::Option(inner)) if !matches!(other, RustType::Option(_)) => {
                let r = self.expr(right);
                (self.some_side(left, inner), self.option_side(&r, inner))
            }
            _ => {
                let mut l = self.expr(left);
                let mut r = self.expr(right);
                let sliced = matches!(lt, RustType::Str | RustType::Vec(_));
                if !sliced {
                    match (self.is_ref(left), self.is_ref(right)) {
                        (true, false) => l = format!("*{}", wrap(&l, UNARY)),
                        (false, true) => r = format!("*{}", wrap(&r, UNARY)),
                        _ => {}
                    }
                }
                (l, r)
            }
        }
    }

    fn option_side(&self, code: &str, inner: &RustType) -> String {
        match inner {
            _ if inner.is_copy() => code.to_string(),
            RustType::Str => format!("{}.as_deref()", wrap(code, ATOM)),
            _ => format!("{}.as_ref()", wrap(code, ATOM)),
        }
    }

    fn some_side(&mut self, expr: &Expr, inner: &RustType) -> String {
        if inner.is_copy() {
            let code = self.value_as(expr, inner);
            return format!("Some({code})");
        }
        let code = match inner {
            RustType::Str => self.str_ref(expr),
            _ => self.borrow_of(expr),
        };
        format!("Some({code})")
    }

    /// `needle in haystack`.
    fn membership(&mut self, needle: &Expr, haystack: &Expr) -> String {
        if let ExprKind::Tuple(items) | ExprKind::List(items) = &haystack.kind {
            if !items.is_empty() && items.iter().all(Expr::is_literal) {
                return self.literal_membership(needle, items);
            }
        }
        let hay_ty = self.ty(haystack);
        match hay_ty {
            RustType::Str => {
                let pattern = match self.ty(needle) {
                    RustType::Char => self.expr(needle),
                    _ => self.str_ref(needle),
                };
                let receiver = self.str_receiver(haystack);
                format!("{receiver}.contains({pattern})")
            }
            RustType::HashMap(key, _) => {
                let key = self.key_ref(needle, key);
                let receiver = self.expr(haystack);
                format!("{}.contains_key({key})", wrap(&receiver, ATOM))
            }
            RustType::HashSet(elem) => {
                let key = self.key_ref(needle, elem);
                let receiver = self.expr(haystack);
                format!("{}.contains({key})", wrap(&receiver, ATOM))
            }
            RustType::Vec(elem) if **elem == RustType::Str => {
                let value = match self.ty(needle) {
                    RustType::Char => {
                        let c = self.expr(needle);
                        format!("{}.to_string()", wrap(&c, ATOM))
                    }
                    _ => self.expr(needle),
                };
                let receiver = self.expr(haystack);
                format!("{}.iter().any(|v| *v == {value})", wrap(&receiver, ATOM))
            }
            RustType::Vec(elem) => {
                let key = self.key_ref(needle, elem);
                let receiver = self.expr(haystack);
                format!("{}.contains({key})", wrap(&receiver, ATOM))
            }
            other => {
                let message = format!("`in` on {}", other.python_name());
                self.unsupported(haystack.span, &message)
            }
        }
    }

    fn literal_membership(&mut self, needle: &Expr, items: &[Expr]) -> String {
        let needle_ty = self.ty(needle);
        let parts: Vec<String> = items
            .iter()
            .map(|item| match (&item.kind, needle_ty) {
                (ExprKind::Str(s), RustType::Char) if s.chars().count() == 1 => {
                    s.chars().next().map_or_else(|| str_lit(s), char_lit)
                }
                _ => self.coerce_literal(item, needle_ty),
            })
            .collect();
        let key = match needle_ty {
            RustType::Str => {
                let s = self.str_ref(needle);
                format!("&{}", wrap(&s, UNARY))
            }
            _ => {
                let code = self.expr(needle);
                format!("&{}", wrap(&code, UNARY))
            }
        };
        format!("[{}].contains({key})", parts.join(", "))
    }

    fn coerce_literal(&mut self, item: &Expr, ty: &RustType) -> String {
        let code = self.expr(item);
        let from = self.ty(item);
        if from.is_numeric() && ty.is_numeric() {
            return self.coerce(code, from, ty);
        }
        code
    }

    // Containers

    fn list(&mut self, expr: &Expr, items: &[Expr]) -> String {
        if items.is_empty() {
            return "Vec::new()".to_string();
        }
        let elem = match self.ty(expr) {
            RustType::Vec(t) => (**t).clone(),
            _ => RustType::Unresolved,
        };
        let parts: Vec<String> = items.iter().map(|i| self.value_as(i, &elem)).collect();
        format!("vec![{}]", parts.join(", "))
    }

    /// List literal bound to a fixed-size array.
    pub(crate) fn array(&mut self, expr: &Expr) -> String {
        let ExprKind::List(items) = &expr.kind else {
            return self.value(expr);
        };
        if items.is_empty() {
            return "[]".to_string();
        }
        let code = self.list(expr, items);
        code.strip_prefix("vec!").map(str::to_string).unwrap_or(code)
    }

    fn dict(&mut self, expr: &Expr, keys: &[Expr], values: &[Expr]) -> String {
        self.ctx.use_import(Imports::INDEX_MAP);
        if keys.is_empty() {
            return "IndexMap::new()".to_string();
        }
        let (kt, vt) = match self.ty(expr) {
            RustType::HashMap(k, v) => ((**k).clone(), (**v).clone()),
            _ => (RustType::Unresolved, RustType::Unresolved),
        };
        let parts: Vec<String> = keys
            .iter()
            .zip(values)
            .map(|(k, v)| {
                let k = self.value_as(k, &kt);
                let v = self.value_as(v, &vt);
                format!("({k}, {v})")
            })
            .collect();
        format!("IndexMap::from([{}])", parts.join(", "))
    }

    // Subscripts

    fn subscript(&mut self, expr: &Expr, value: &Expr, index: &Expr) -> String {
        if let ExprKind::Slice { lower, upper, step } = &index.kind {
            return self.slice(expr, value, [lower, upper, step]);
        }
        match self.ty(value) {
            RustType::Vec(_) => {
                let base = self.expr(value);
                let check = self.list_check(expr);
                if !self.is_place(value) && reads_len(check, index) {
                    let temp = self.ctx.fresh_temp();
                    let idx = self.list_index(&temp, check, index);
                    let element = format!("{temp}[{idx}]");
                    let element = if self.ty(expr).is_copy() {
                        element
                    } else {
                        format!("{element}.clone()")
                    };
                    return format!("{{ let {temp} = {base}; {element} }}");
                }
                let receiver = wrap(&base, ATOM);
                let idx = self.list_index(&receiver, check, index);
                format!("{receiver}[{idx}]")
            }
            RustType::Str | RustType::Char => self.str_index(expr, value, index),
            RustType::HashMap(key, _) => {
                let key = self.key_ref(index, key);
                let base = self.expr(value);
                format!("{}[{key}]", wrap(&base, ATOM))
            }
            RustType::Tuple(items) => {
                let Some(i) = int_literal(index) else {
                    return self.unsupported(index.span, "tuple index that is not a literal");
                };
                let len = i128::try_from(items.len()).unwrap_or(i128::MAX);
                let i = if i < 0 { len + i } else { i };
                let base = self.expr(value);
                format!("{}.{i}", wrap(&base, ATOM))
            }
            other => {
                let message = format!("indexing {}", other.python_name());
                self.unsupported(expr.span, &message)
            }
        }
    }

    /// How the list subscript `expr` is checked. Unclassified subscripts
    /// take the checked form.
    pub(crate) fn list_check(&self, expr: &Expr) -> IndexCheck {
        if self.explicit {
            return IndexCheck::Explicit;
        }
        self.typed.index_check(expr.id).unwrap_or(IndexCheck::Explicit)
    }

    /// `usize` index into a list spelled `receiver`. Only proven indices
    /// skip the normalising helper.
    pub(crate) fn list_index(&mut self, receiver: &str, check: IndexCheck, index: &Expr) -> String {
        match (int_literal(index), check) {
            (Some(v), _) if v >= 0 => v.to_string(),
            (Some(v), IndexCheck::Implicit) => format!("{receiver}.len() - {}", -v),
            (None, IndexCheck::Implicit) => self.usize_of(index),
            (_, IndexCheck::Explicit) => {
                self.ctx.use_helper(RuntimeHelpers::LIST_INDEX);
                let i = self.i64_of(index);
                format!("py_index({receiver}.len(), {i})")
            }
        }
    }

    fn str_index(&mut self, expr: &Expr, value: &Expr, index: &Expr) -> String {
        match self.typed.index_check(expr.id) {
            Some(IndexCheck::Implicit) => {
                let receiver = self.str_receiver(value);
                match int_literal(index) {
                    Some(v) if v < 0 => format!(
                        "{receiver}.chars().rev().nth({}).expect({INDEX_ERROR:?})",
                        -v - 1
                    ),
                    _ => {
                        let i = self.usize_of(index);
                        format!("{receiver}.chars().nth({i}).expect({INDEX_ERROR:?})")
                    }
                }
            }
            // Unclassified subscripts are rejected before lowering; the
            // checked form is the safe spelling either way.
            Some(IndexCheck::Explicit) | None => {
                self.ctx.use_helper(RuntimeHelpers::STR_INDEX);
                let s = self.borrow_of(value);
                let i = self.i64_of(index);
                format!("py_str_index({s}, {i})")
            }
        }
    }

    fn slice(&mut self, expr: &Expr, value: &Expr, bounds: [&Option<Box<Expr>>; 3]) -> String {
        let parts: Vec<String> = bounds
            .iter()
            .map(|bound| match bound {
                Some(b) => format!("Some({})", self.i64_of(b)),
                None => "None".to_string(),
            })
            .collect();
        let parts = parts.join(", ");
        match self.ty(value) {
            RustType::Str => {
                self.ctx.use_helper(RuntimeHelpers::STR_SLICE);
                let s = self.borrow_of(value);
                format!("py_str_slice({s}, {parts})")
            }
            RustType::Vec(_) => {
                self.ctx.use_helper(RuntimeHelpers::LIST_SLICE);
                let items = self.borrow_of(value);
                format!("py_list_slice({items}, {parts})")
            }
            other => {
                let message = format!("slicing {}", other.python_name());
                self.unsupported(expr.span, &message)
            }
        }
    }

    /// Mutable place of an assignment target or changed receiver.
    pub(crate) fn place_mut(&mut self, expr: &Expr) -> String {
        match &expr.kind {
            ExprKind::Subscript { value, index }
                if matches!(self.ty(value), RustType::HashMap(..)) =>
            {
                let RustType::HashMap(key, _) = self.ty(value) else {
                    return self.expr(expr);
                };
                let key = self.key_ref(index, key);
                let base = self.place_mut(value);
                format!(
                    "{}.get_mut({key}).expect(\"KeyError: key not found\")",
                    wrap(&base, ATOM)
                )
            }
            ExprKind::Subscript { value, index } if matches!(self.ty(value), RustType::Vec(_)) => {
                let check = self.list_check(expr);
                let base = self.place_mut(value);
                let receiver = wrap(&base, ATOM);
                let idx = self.list_index(&receiver, check, index);
                format!("{receiver}[{idx}]")
            }
            ExprKind::Attribute { value, attr } if value.as_name() != Some("self") => {
                let base = self.place_mut(value);
                format!("{}.{}", wrap(&base, ATOM), ident(attr))
            }
            _ => self.expr(expr),
        }
    }

    /// Assignable spelling of a place: `*` in front of a `get_mut`.
    pub(crate) fn place_lhs(&mut self, expr: &Expr) -> String {
        let place = self.place_mut(expr);
        if place.ends_with(".expect(\"KeyError: key not found\")") {
            format!("*{place}")
        } else {
            place
        }
    }
}

/// Whether indexing with `index` needs the receiver's length.
fn reads_len(check: IndexCheck, index: &Expr) -> bool {
    match int_literal(index) {
        Some(v) => v < 0,
        None => check == IndexCheck::Explicit,
    }
}

/// Python truthiness of `code` of type `ty`.
pub(crate) fn truthy(code: &str, ty: &RustType) -> String {
    match ty {
        RustType::Bool => code.to_string(),
        RustType::Int(_) => format!("{} != 0", wrap(code, CMP + 1)),
        RustType::Float => format!("{} != 0.0", wrap(code, CMP + 1)),
        RustType::Str | RustType::Vec(_) | RustType::HashMap(..) | RustType::HashSet(_) => {
            format!("!{}.is_empty()", wrap(code, ATOM))
        }
        RustType::Option(_) => format!("{}.is_some()", wrap(code, ATOM)),
        RustType::Dynamic => format!("{}.is_truthy()", wrap(code, ATOM)),
        RustType::Unit => "false".to_string(),
        _ => "true".to_string(),
    }
}

fn single_char(expr: &Expr) -> Option<char> {
    match &expr.kind {
        ExprKind::Str(s) if s.chars().count() == 1 => s.chars().next(),
        _ => None,
    }
}

/// `name!("fmt", args...)`.
/// `!code`, cancelling a leading `!`.
fn negate(code: &str) -> String {
    match code.strip_prefix('!') {
        Some(inner) if precedence(code) == UNARY => inner.to_string(),
        _ => format!("!{}", wrap(code, UNARY)),
    }
}

pub(crate) fn format_macro(name: &str, fmt: &str, args: &[String]) -> String {
    let mut out = format!("{name}({fmt:?}");
    for arg in args {
        out.push_str(", ");
        out.push_str(arg);
    }
    out.push(')');
    out
}
