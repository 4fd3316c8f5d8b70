//! Calls: module functions, constructors, methods, builtins and `math`.

use depyler_ir::ast::{Expr, ExprKind, FunctionDef, Keyword};
use depyler_ownership::{function_key, ParamMode, ReceiverMode};
use depyler_types::{
    Builtin, CallTarget, ClassInfo, IndexCheck, IntKind, MathMember, Method, ParamSig, Receiver,
    RustType,
};

use crate::function::Lowerer;
use crate::runtime::{gcd_fn, Imports, RuntimeHelpers};
use crate::types::{clone_of, copied_or_cloned, ident, literal, str_lit, wrap, ADD, ATOM, CAST, MUL, UNARY};

const EMPTY_SEQUENCE: &str = "ValueError: arg is an empty sequence";

/// Where the values of omitted arguments come from.
enum Defaults<'d> {
    /// Literal defaults of a `def`; the flag skips a leading `self`.
    Def(&'d FunctionDef, bool),
    /// Field defaults of a generated constructor.
    Fields(&'d ClassInfo),
    None,
}

impl<'a> Lowerer<'a> {
    pub(crate) fn call(
        &mut self,
        expr: &Expr,
        func: &Expr,
        args: &[Expr],
        keywords: &[Keyword],
    ) -> String {
        let Some(target) = self.typed.call(expr.id).cloned() else {
            return self.unsupported(expr.span, "call of an unknown callee");
        };
        match target {
            CallTarget::Function(name) => {
                let Some(sig) = self.view.context.function(&name) else {
                    return self.unsupported(expr.span, "call of an unknown function");
                };
                let defaults = match self.view.function_def(&name) {
                    Some(def) => Defaults::Def(def, false),
                    None => Defaults::None,
                };
                let params = sig.call_params().to_vec();
                let args = self.user_args(&name, &params, defaults, args, keywords);
                format!("{}({})", ident(&name), args.join(", "))
            }
            CallTarget::StaticMethod { class, name } => {
                let key = function_key(Some(&class), &name);
                let Some(sig) = self.view.context.class(&class).and_then(|c| c.method(&name)) else {
                    return self.unsupported(expr.span, "call of an unknown static method");
                };
                let params = sig.params.clone();
                let defaults = self.method_defaults(&class, &name, false);
                let args = self.user_args(&key, &params, defaults, args, keywords);
                format!("{class}::{}({})", ident(&name), args.join(", "))
            }
            CallTarget::Method { class, name } => {
                let key = function_key(Some(&class), &name);
                let Some(sig) = self.view.context.class(&class).and_then(|c| c.method(&name)) else {
                    return self.unsupported(expr.span, "call of an unknown method");
                };
                let params = sig.call_params().to_vec();
                let defaults = self.method_defaults(&class, &name, true);
                let ExprKind::Attribute { value, .. } = &func.kind else {
                    return self.unsupported(expr.span, "method call without a receiver");
                };
                let receiver = match self.view.modes.receiver(&key) {
                    Some(ReceiverMode::RefMut) => self.place_mut(value),
                    _ => self.expr(value),
                };
                let args = self.user_args(&key, &params, defaults, args, keywords);
                format!("{}.{}({})", wrap(&receiver, ATOM), ident(&name), args.join(", "))
            }
            CallTarget::Constructor(class) => self.construct(expr, &class, args, keywords),
            CallTarget::Builtin(builtin) => self.builtin(expr, builtin, args, keywords),
            CallTarget::Math(member) => self.math(member, args),
            CallTarget::BuiltinMethod { receiver, method } => {
                let ExprKind::Attribute { value, .. } = &func.kind else {
                    return self.unsupported(expr.span, "method call without a receiver");
                };
                self.builtin_method(expr, value, receiver, method, args, keywords)
            }
            CallTarget::Exception(name) => {
                self.unsupported(expr.span, &format!("`{name}` outside `raise`"))
            }
        }
    }

    fn method_defaults(&self, class: &str, name: &str, skip_self: bool) -> Defaults<'a> {
        match self.view.class_def(class).and_then(|c| c.method(name)) {
            Some(def) => Defaults::Def(def, skip_self),
            None => Defaults::None,
        }
    }

    fn construct(&mut self, expr: &Expr, class: &str, args: &[Expr], keywords: &[Keyword]) -> String {
        let Some(info) = self.view.context.class(class) else {
            return self.unsupported(expr.span, "construction of an unknown class");
        };
        let params = info.constructor.clone();
        let defaults = if info.has_init {
            self.method_defaults(class, "__init__", true)
        } else {
            Defaults::Fields(info)
        };
        let key = function_key(Some(class), "__init__");
        let args = self.user_args(&key, &params, defaults, args, keywords);
        format!("{class}::new({})", args.join(", "))
    }

    /// Arguments of a user call in parameter order, omitted ones filled in
    /// from literal defaults.
    fn user_args(
        &mut self,
        key: &str,
        params: &[ParamSig],
        defaults: Defaults<'_>,
        args: &[Expr],
        keywords: &[Keyword],
    ) -> Vec<String> {
        let modes = self.view.modes.signature(key).cloned();
        let mut out = Vec::with_capacity(params.len());
        for (i, param) in params.iter().enumerate() {
            // Constructors without `__init__` store every argument.
            let mode = match &modes {
                Some(sig) => sig.params.get(i).map_or(ParamMode::ByValue, |(_, m)| *m),
                None => ParamMode::Owned,
            };
            let given = args
                .get(i)
                .or_else(|| keywords.iter().find(|k| k.name == param.name).map(|k| &k.value));
            let code = match (given, &param.ty) {
                (Some(arg), Some(ty)) => self.arg(arg, ty, mode),
                (Some(arg), None) => {
                    let ty = self.ty(arg);
                    self.arg(arg, ty, mode)
                }
                (None, ty) => {
                    let ty = ty.clone().unwrap_or(RustType::Unresolved);
                    self.default_arg(&defaults, &param.name, &ty, mode)
                }
            };
            out.push(code);
        }
        out
    }

    fn arg(&mut self, arg: &Expr, ty: &RustType, mode: ParamMode) -> String {
        match mode {
            ParamMode::Borrowed => {
                if self.ty(arg) == ty {
                    self.borrow_of(arg)
                } else {
                    let value = self.value_as(arg, ty);
                    format!("&{}", wrap(&value, UNARY))
                }
            }
            ParamMode::BorrowedMut => self.borrow_mut_of(arg),
            ParamMode::ByValue | ParamMode::Owned => self.value_as(arg, ty),
        }
    }

    fn default_arg(&mut self, defaults: &Defaults<'_>, name: &str, ty: &RustType, mode: ParamMode) -> String {
        let default = match defaults {
            Defaults::Def(def, skip_self) => def
                .params
                .iter()
                .skip(usize::from(*skip_self))
                .find(|p| p.name == name)
                .and_then(|p| p.default.as_ref()),
            Defaults::Fields(info) => info.field(name).and_then(|f| f.default.as_ref()),
            Defaults::None => None,
        };
        let Some(default) = default else {
            return self.unsupported(
                self.unit.function.name_span,
                &format!("call omitting argument `{name}` without a default"),
            );
        };
        if let Some(imports) = default_imports(default) {
            self.ctx.use_import(imports);
        }
        if mode == ParamMode::Borrowed {
            if let ExprKind::Str(s) = &default.kind {
                return str_lit(s);
            }
        }
        let Some(code) = literal(default, ty) else {
            return self.unsupported(default.span, "default value that is not a literal");
        };
        match mode {
            ParamMode::Borrowed => format!("&{code}"),
            ParamMode::BorrowedMut => format!("&mut {code}"),
            ParamMode::ByValue | ParamMode::Owned => code,
        }
    }

    // Builtins

    fn builtin(&mut self, expr: &Expr, builtin: Builtin, args: &[Expr], keywords: &[Keyword]) -> String {
        let ty = self.ty(expr);
        match (builtin, args) {
            (Builtin::Print, _) => self.print(args, keywords),
            (Builtin::Len, [x]) => {
                let code = self.expr(x);
                let len = match self.ty(x) {
                    RustType::Str => format!("{}.chars().count()", wrap(&code, ATOM)),
                    _ => format!("{}.len()", wrap(&code, ATOM)),
                };
                self.from_usize(&len, ty)
            }
            (Builtin::Int, []) => "0".to_string(),
            (Builtin::Int, [x]) => self.to_int(x, ty),
            (Builtin::Float, []) => "0.0".to_string(),
            (Builtin::Float, [x]) => match self.ty(x) {
                RustType::Str | RustType::Char => {
                    let s = self.str_receiver(x);
                    format!(
                        "{s}.trim().parse::<f64>().expect(\"ValueError: could not convert string to float\")"
                    )
                }
                _ => self.value_as(x, &RustType::Float),
            },
            (Builtin::Str, []) => "String::new()".to_string(),
            (Builtin::Str, [x]) => self.to_str(x),
            (Builtin::Bool, []) => "false".to_string(),
            (Builtin::Bool, [x]) => self.cond(x),
            (Builtin::Abs, [x]) => {
                let code = self.value_as(x, ty);
                match ty {
                    RustType::Int(kind) => format!("{}::abs({code})", kind.as_str()),
                    _ => format!("f64::abs({code})"),
                }
            }
            (Builtin::Min | Builtin::Max, [x]) => {
                let iter = self.iter_of(x);
                let pick = if builtin == Builtin::Min { "min" } else { "max" };
                match ty {
                    RustType::Float => {
                        format!("{iter}.reduce(f64::{pick}).expect({EMPTY_SEQUENCE:?})")
                    }
                    _ => format!("{iter}.{pick}().expect({EMPTY_SEQUENCE:?})"),
                }
            }
            (Builtin::Min | Builtin::Max, [first, rest @ ..]) => {
                let pick = if builtin == Builtin::Min { "min" } else { "max" };
                let owner = match ty {
                    RustType::Int(kind) => kind.as_str().to_string(),
                    RustType::Float => "f64".to_string(),
                    _ => "std::cmp".to_string(),
                };
                let mut code = self.owned_arg(first, ty);
                for arg in rest {
                    let next = self.owned_arg(arg, ty);
                    code = format!("{owner}::{pick}({code}, {next})");
                }
                code
            }
            (Builtin::Sum, [x, rest @ ..]) => {
                let item = self.ty(x).iter_item().unwrap_or(RustType::Unresolved);
                let mut iter = self.iter_of(x);
                if item != *ty {
                    let conv = self.coerce("v".to_string(), &item, ty);
                    iter = format!("{iter}.map(|v| {conv})");
                }
                let sum = format!("{iter}.sum::<{}>()", self.ctx.render_type(ty));
                match rest {
                    [start] => {
                        let start = self.value_as(start, ty);
                        format!("{} + {sum}", wrap(&start, ADD))
                    }
                    _ => sum,
                }
            }
            (Builtin::List, []) => "Vec::new()".to_string(),
            (Builtin::List, [x]) => match self.ty(x) {
                RustType::Vec(_) => self.owned_copy(x),
                _ => {
                    let iter = self.iter_of(x);
                    format!("{iter}.collect::<Vec<_>>()")
                }
            },
            (Builtin::Set, []) => {
                self.ctx.use_import(Imports::INDEX_SET);
                "IndexSet::new()".to_string()
            }
            (Builtin::Set, [x]) => {
                self.ctx.use_import(Imports::INDEX_SET);
                let iter = self.iter_of(x);
                format!("{iter}.collect::<IndexSet<_>>()")
            }
            (Builtin::Dict, []) => {
                self.ctx.use_import(Imports::INDEX_MAP);
                "IndexMap::new()".to_string()
            }
            (Builtin::Dict, [x]) => self.owned_copy(x),
            (Builtin::Sorted, [x]) => self.sorted(x, ty, keywords),
            (Builtin::Reversed | Builtin::Enumerate | Builtin::Zip | Builtin::Range, _) => {
                let iter = self.iter_of(expr);
                format!("{iter}.collect::<Vec<_>>()")
            }
            (Builtin::Ord, [x]) => {
                let c = match (&x.kind, self.ty(x)) {
                    (ExprKind::Str(s), _) if s.chars().count() == 1 => {
                        s.chars().next().map_or_else(String::new, |c| format!("{c:?}"))
                    }
                    (_, RustType::Char) => self.expr(x),
                    _ => {
                        let s = self.str_receiver(x);
                        format!("{s}.chars().next().expect(\"TypeError: ord() expected a character\")")
                    }
                };
                self.from_u32(&format!("u32::from({c})"), ty)
            }
            (Builtin::Chr, [x]) => {
                let code = self.expr(x);
                format!(
                    "char::from_u32({} as u32).expect(\"ValueError: chr() arg not in range\")",
                    wrap(&code, CAST)
                )
            }
            (Builtin::Any | Builtin::All, [x]) => {
                let item = self.ty(x).iter_item().unwrap_or(RustType::Unresolved);
                let iter = self.iter_of(x);
                let method = if builtin == Builtin::Any { "any" } else { "all" };
                let test = crate::expr::truthy("v", &item);
                format!("{iter}.{method}(|v| {test})")
            }
            (Builtin::Round, [x]) => match self.ty(x) {
                RustType::Float => {
                    let code = self.expr(x);
                    let kind = ty.render();
                    format!("f64::round_ties_even({code}) as {kind}")
                }
                _ => self.value_as(x, ty),
            },
            (Builtin::Round, [x, digits]) => {
                let code = self.value_as(x, &RustType::Float);
                let digits = self.expr(digits);
                let temp = self.ctx.fresh_temp();
                format!(
                    "{{ let {temp} = 10f64.powi({} as i32); f64::round_ties_even({} * {temp}) / {temp} }}",
                    wrap(&digits, CAST),
                    wrap(&code, MUL)
                )
            }
            _ => self.unsupported(expr.span, &format!("this call of `{builtin:?}`")),
        }
    }

    /// An argument taken by value even though it was only read.
    fn owned_arg(&mut self, arg: &Expr, ty: &RustType) -> String {
        if ty.is_copy() {
            self.value_as(arg, ty)
        } else {
            let code = self.owned_copy(arg);
            let from = self.ty(arg);
            self.coerce(code, from, ty)
        }
    }

    fn from_usize(&self, code: &str, ty: &RustType) -> String {
        format!("{code} as {}", ty.render())
    }

    fn from_u32(&self, code: &str, ty: &RustType) -> String {
        match ty {
            RustType::Int(IntKind::I64 | IntKind::I128) => format!("{}::from({code})", ty.render()),
            _ => format!("{code} as {}", ty.render()),
        }
    }

    fn to_int(&mut self, x: &Expr, ty: &RustType) -> String {
        let kind = ty.render();
        match self.ty(x) {
            RustType::Float => {
                let code = self.expr(x);
                format!("{} as {kind}", wrap(&code, CAST))
            }
            RustType::Str | RustType::Char => {
                let s = self.str_receiver(x);
                format!(
                    "{s}.trim().parse::<{kind}>().expect(\"ValueError: invalid literal for int()\")"
                )
            }
            _ => self.value_as(x, ty),
        }
    }

    /// `str(x)`.
    pub(crate) fn to_str(&mut self, x: &Expr) -> String {
        match self.ty(x) {
            RustType::Str => self.value(x),
            RustType::Int(_) | RustType::Char => {
                let code = self.expr(x);
                format!("{}.to_string()", wrap(&code, ATOM))
            }
            _ => {
                let (placeholder, arg) = self.display_arg(x);
                let args: Vec<String> = Some(arg).into_iter().filter(|a| !a.is_empty()).collect();
                crate::expr::format_macro("format!", &placeholder, &args)
            }
        }
    }

    fn sorted(&mut self, x: &Expr, ty: &RustType, keywords: &[Keyword]) -> String {
        let item = match ty {
            RustType::Vec(t) => (**t).clone(),
            _ => RustType::Unresolved,
        };
        let iter = self.iter_of(x);
        let temp = self.ctx.fresh_temp();
        let reverse = keywords.iter().find(|k| k.name == "reverse").map(|k| &k.value);
        let sort = self.sort_call(&temp, &item, reverse);
        format!("{{ let mut {temp}: Vec<_> = {iter}.collect(); {sort}; {temp} }}")
    }

    /// In-place sort of the list spelled `list`.
    fn sort_call(&mut self, list: &str, item: &RustType, reverse: Option<&Expr>) -> String {
        let float = *item == RustType::Float;
        let forward = if float {
            format!("{list}.sort_by(|a, b| a.total_cmp(b))")
        } else {
            format!("{list}.sort()")
        };
        let backward = if float {
            format!("{list}.sort_by(|a, b| b.total_cmp(a))")
        } else {
            format!("{list}.sort_by(|a, b| b.cmp(a))")
        };
        match reverse.map(|r| &r.kind) {
            None | Some(ExprKind::Bool(false)) => forward,
            Some(ExprKind::Bool(true)) => backward,
            Some(_) => {
                let Some(reverse) = reverse else {
                    return forward;
                };
                let test = self.cond(reverse);
                format!("if {test} {{ {backward} }} else {{ {forward} }}")
            }
        }
    }

    fn math(&mut self, member: MathMember, args: &[Expr]) -> String {
        match (member, args) {
            (MathMember::Gcd, [a, b]) => {
                let int = self.int_ty();
                self.ctx.use_helper(RuntimeHelpers::gcd(self.int));
                let a = self.value_as(a, &int);
                let b = self.value_as(b, &int);
                format!("{}({a}, {b})", gcd_fn(self.int))
            }
            (MathMember::Floor | MathMember::Ceil, [x]) => {
                let x = self.value_as(x, &RustType::Float);
                let method = if member == MathMember::Floor { "floor" } else { "ceil" };
                format!("f64::{method}({x}) as {}", self.int.as_str())
            }
            (MathMember::Sqrt | MathMember::Fabs, [x]) => {
                let x = self.value_as(x, &RustType::Float);
                let method = if member == MathMember::Sqrt { "sqrt" } else { "abs" };
                format!("f64::{method}({x})")
            }
            (MathMember::Pi, _) => "std::f64::consts::PI".to_string(),
            (MathMember::E, _) => "std::f64::consts::E".to_string(),
            _ => "()".to_string(),
        }
    }

    // Methods of builtin types

    fn builtin_method(
        &mut self,
        expr: &Expr,
        value: &Expr,
        family: Receiver,
        method: Method,
        args: &[Expr],
        keywords: &[Keyword],
    ) -> String {
        let receiver = if method.mutates_receiver() {
            let place = self.place_mut(value);
            wrap(&place, ATOM)
        } else {
            let code = self.expr(value);
            wrap(&code, ATOM)
        };
        match family {
            Receiver::List => self.list_method(expr, value, &receiver, method, args, keywords),
            Receiver::Str => self.str_method(expr, value, method, args),
            Receiver::Dict => self.dict_method(expr, value, &receiver, method, args),
            Receiver::Set => self.set_method(expr, value, &receiver, method, args),
        }
    }

    fn list_method(
        &mut self,
        expr: &Expr,
        value: &Expr,
        receiver: &str,
        method: Method,
        args: &[Expr],
        keywords: &[Keyword],
    ) -> String {
        let receiver_ty = self.ty(value);
        let elem = match receiver_ty {
            RustType::Vec(t) => (**t).clone(),
            _ => RustType::Unresolved,
        };
        match (method, args) {
            (Method::Append, [x]) => {
                let x = self.value_as(x, &elem);
                format!("{receiver}.push({x})")
            }
            (Method::Extend, [xs]) => {
                let iter = self.iter_of(xs);
                format!("{receiver}.extend({iter})")
            }
            (Method::Insert, [i, x]) => {
                let i = self.usize_of(i);
                let x = self.value_as(x, &elem);
                format!("{receiver}.insert({i}, {x})")
            }
            (Method::Pop, []) => {
                format!("{receiver}.pop().expect(\"IndexError: pop from empty list\")")
            }
            (Method::Pop, [i]) => {
                let i = self.list_index(receiver, IndexCheck::Explicit, i);
                format!("{receiver}.remove({i})")
            }
            (Method::Remove, [x]) => {
                let needle = self.needle(x, &elem);
                let temp = self.ctx.fresh_temp();
                format!(
                    "{{ let {temp} = {receiver}.iter().position(|v| *v == {needle}).expect(\"ValueError: list.remove(x): x not in list\"); {receiver}.remove({temp}); }}"
                )
            }
            (Method::Index, [x]) => {
                let needle = self.needle(x, &elem);
                let ty = self.ty(expr).render();
                format!(
                    "{receiver}.iter().position(|v| *v == {needle}).expect(\"ValueError: value is not in list\") as {ty}"
                )
            }
            (Method::Count, [x]) => {
                let needle = self.needle(x, &elem);
                let ty = self.ty(expr).render();
                format!("{receiver}.iter().filter(|v| **v == {needle}).count() as {ty}")
            }
            (Method::Reverse, []) => format!("{receiver}.reverse()"),
            (Method::Sort, []) => {
                let reverse = keywords.iter().find(|k| k.name == "reverse").map(|k| &k.value);
                self.sort_call(receiver, &elem, reverse)
            }
            (Method::Clear, []) => format!("{receiver}.clear()"),
            (Method::Copy, []) => clone_of(receiver, receiver_ty, self.is_ref(value)),
            _ => self.unsupported(expr.span, "this list method call"),
        }
    }

    /// Right-hand side of `*v == needle` for an element of type `elem`.
    fn needle(&mut self, x: &Expr, elem: &RustType) -> String {
        if elem.is_copy() {
            return self.value_as(x, elem);
        }
        if let ExprKind::Str(s) = &x.kind {
            return str_lit(s);
        }
        let code = self.expr(x);
        if self.is_ref(x) && *elem != RustType::Str {
            format!("*{}", wrap(&code, UNARY))
        } else {
            code
        }
    }

    fn str_method(&mut self, expr: &Expr, value: &Expr, method: Method, args: &[Expr]) -> String {
        let is_char = *self.ty(value) == RustType::Char;
        match (method, args) {
            (Method::Upper | Method::Lower, []) => {
                let s = self.str_receiver(value);
                let case = if method == Method::Upper { "to_uppercase" } else { "to_lowercase" };
                format!("{s}.{case}()")
            }
            (Method::Strip | Method::Lstrip | Method::Rstrip, _) => {
                let s = self.str_receiver(value);
                let trim = match method {
                    Method::Strip => "trim",
                    Method::Lstrip => "trim_start",
                    _ => "trim_end",
                };
                match args {
                    [] => format!("{s}.{trim}().to_string()"),
                    [chars] => {
                        let chars = self.str_ref(chars);
                        format!("{s}.{trim}_matches(|c: char| {chars}.contains(c)).to_string()")
                    }
                    _ => self.unsupported(expr.span, "this `strip` call"),
                }
            }
            (Method::Split, []) => {
                let s = self.str_receiver(value);
                format!("{s}.split_whitespace().map(str::to_string).collect::<Vec<String>>()")
            }
            (Method::Split, [sep]) => {
                let s = self.str_receiver(value);
                let sep = self.pattern(sep);
                format!("{s}.split({sep}).map(str::to_string).collect::<Vec<String>>()")
            }
            (Method::Join, [items]) => {
                let sep = self.str_ref(value);
                let item = self.ty(items).iter_item();
                match (self.ty(items), item) {
                    (RustType::Vec(_), Some(RustType::Str)) if self.is_place(items) => {
                        let list = self.expr(items);
                        format!("{}.join({sep})", wrap(&list, ATOM))
                    }
                    (_, Some(RustType::Char)) => {
                        let iter = self.iter_of(items);
                        format!("{iter}.map(String::from).collect::<Vec<String>>().join({sep})")
                    }
                    _ => {
                        let iter = self.iter_of(items);
                        format!("{iter}.collect::<Vec<String>>().join({sep})")
                    }
                }
            }
            (Method::Replace, [from, to]) => {
                let s = self.str_receiver(value);
                let from = self.pattern(from);
                let to = self.str_ref(to);
                format!("{s}.replace({from}, {to})")
            }
            (Method::StartsWith | Method::EndsWith, [p]) => {
                let s = self.str_receiver(value);
                let p = self.pattern(p);
                let test = if method == Method::StartsWith { "starts_with" } else { "ends_with" };
                format!("{s}.{test}({p})")
            }
            (Method::Find, [needle]) => {
                self.ctx.use_helper(RuntimeHelpers::STR_FIND);
                let s = self.str_ref(value);
                let needle = self.str_ref(needle);
                self.find_result(&format!("py_str_find({s}, {needle})"), expr)
            }
            (Method::Index, [needle]) => {
                self.ctx.use_helper(RuntimeHelpers::STR_FIND);
                let s = self.str_ref(value);
                let needle = self.str_ref(needle);
                let temp = self.ctx.fresh_temp();
                let found = self.find_result(&temp, expr);
                format!(
                    "{{ let {temp} = py_str_find({s}, {needle}); assert!({temp} >= 0, \"ValueError: substring not found\"); {found} }}"
                )
            }
            (Method::Count, [needle]) => {
                let s = self.str_receiver(value);
                let needle = self.pattern(needle);
                let ty = self.ty(expr).render();
                format!("{s}.matches({needle}).count() as {ty}")
            }
            (Method::IsDigit | Method::IsAlpha | Method::IsSpace, []) => {
                let test = match method {
                    Method::IsDigit => "is_ascii_digit",
                    Method::IsAlpha => "is_alphabetic",
                    _ => "is_whitespace",
                };
                if is_char {
                    let c = self.expr(value);
                    return format!("{}.{test}()", wrap(&c, ATOM));
                }
                self.with_str(value, |s| format!("!{s}.is_empty() && {s}.chars().all(|c| c.{test}())"))
            }
            (Method::IsUpper | Method::IsLower, []) => {
                let (yes, no) = if method == Method::IsUpper {
                    ("is_uppercase", "is_lowercase")
                } else {
                    ("is_lowercase", "is_uppercase")
                };
                if is_char {
                    let c = self.expr(value);
                    return format!("{}.{yes}()", wrap(&c, ATOM));
                }
                self.with_str(value, |s| {
                    format!("{s}.chars().any(|c| c.{yes}()) && !{s}.chars().any(|c| c.{no}())")
                })
            }
            (Method::Copy, []) => self.owned_copy(value),
            _ => self.unsupported(expr.span, "this `str` method call"),
        }
    }

    /// `-1`-or-index `i64` from `py_str_find` as the call's int type.
    fn find_result(&self, code: &str, expr: &Expr) -> String {
        match self.ty(expr) {
            RustType::Int(IntKind::I64) => code.to_string(),
            ty => format!("{code} as {}", ty.render()),
        }
    }

    /// A string used twice: named directly when it is a place, bound to a
    /// temporary otherwise.
    fn with_str(&mut self, value: &Expr, body: impl FnOnce(&str) -> String) -> String {
        if self.is_place(value) {
            let code = self.expr(value);
            return body(&wrap(&code, ATOM));
        }
        let code = self.expr(value);
        let temp = self.ctx.fresh_temp();
        let inner = body(&temp);
        format!("{{ let {temp} = {code}; {inner} }}")
    }

    /// Pattern argument of a `str` method: a `char` or a `&str`.
    fn pattern(&mut self, expr: &Expr) -> String {
        match (&expr.kind, self.ty(expr)) {
            (ExprKind::Str(s), _) if s.chars().count() == 1 => {
                s.chars().next().map_or_else(|| str_lit(s), |c| format!("{c:?}"))
            }
            (_, RustType::Char) => self.expr(expr),
            _ => self.str_ref(expr),
        }
    }

    fn dict_method(
        &mut self,
        expr: &Expr,
        value: &Expr,
        receiver: &str,
        method: Method,
        args: &[Expr],
    ) -> String {
        let receiver_ty = self.ty(value);
        let (key, val) = match receiver_ty {
            RustType::HashMap(k, v) => ((**k).clone(), (**v).clone()),
            _ => (RustType::Unresolved, RustType::Unresolved),
        };
        let fetch = copied_or_cloned(&val);
        match (method, args) {
            (Method::Get, [k]) => {
                let k = self.key_ref(k, &key);
                format!("{receiver}.get({k}).{fetch}")
            }
            (Method::Get, [k, default]) => {
                let k = self.key_ref(k, &key);
                let default = self.value_as(default, &val);
                format!("{receiver}.get({k}).{fetch}.unwrap_or({default})")
            }
            (Method::Pop, [k]) => {
                let k = self.key_ref(k, &key);
                format!("{receiver}.shift_remove({k}).expect(\"KeyError: key not found\")")
            }
            (Method::Pop, [k, default]) => {
                let k = self.key_ref(k, &key);
                let default = self.value_as(default, &val);
                format!("{receiver}.shift_remove({k}).unwrap_or({default})")
            }
            (Method::Keys | Method::Values | Method::Items, []) => {
                let iter = self.iter_of(expr);
                format!("{iter}.collect::<Vec<_>>()")
            }
            (Method::Update, [other]) => {
                let other = self.owned_copy(other);
                format!("{receiver}.extend({other})")
            }
            (Method::Clear, []) => format!("{receiver}.clear()"),
            (Method::Copy, []) => clone_of(receiver, receiver_ty, self.is_ref(value)),
            _ => self.unsupported(expr.span, "this `dict` method call"),
        }
    }

    fn set_method(
        &mut self,
        expr: &Expr,
        value: &Expr,
        receiver: &str,
        method: Method,
        args: &[Expr],
    ) -> String {
        let receiver_ty = self.ty(value);
        let elem = match receiver_ty {
            RustType::HashSet(t) => (**t).clone(),
            _ => RustType::Unresolved,
        };
        match (method, args) {
            (Method::Add, [x]) => {
                let x = self.value_as(x, &elem);
                format!("{receiver}.insert({x})")
            }
            (Method::Discard, [x]) => {
                let x = self.key_ref(x, &elem);
                format!("{receiver}.shift_remove({x})")
            }
            (Method::Remove, [x]) => {
                let x = self.key_ref(x, &elem);
                format!("if !{receiver}.shift_remove({x}) {{ panic!(\"KeyError: element not in set\") }}")
            }
            (Method::Union | Method::Intersection | Method::Difference, [other]) => {
                self.ctx.use_import(Imports::INDEX_SET);
                let op = match method {
                    Method::Union => "union",
                    Method::Intersection => "intersection",
                    _ => "difference",
                };
                let other = self.borrow_of(other);
                format!("{receiver}.{op}({other}).cloned().collect::<IndexSet<_>>()")
            }
            (Method::Clear, []) => format!("{receiver}.clear()"),
            (Method::Copy, []) => clone_of(receiver, receiver_ty, self.is_ref(value)),
            _ => self.unsupported(expr.span, "this `set` method call"),
        }
    }
}

/// `use` lines a literal default needs.
fn default_imports(default: &Expr) -> Option<Imports> {
    match &default.kind {
        ExprKind::Dict { .. } => Some(Imports::INDEX_MAP),
        ExprKind::Call { func, .. } if func.as_name() == Some("set") => Some(Imports::INDEX_SET),
        _ => None,
    }
}
