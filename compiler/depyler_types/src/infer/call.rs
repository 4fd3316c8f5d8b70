//! Calls: module functions, constructors, methods, builtins and `math`.
//!
//! Dispatch looks only at the callee's syntax and the resolved receiver
//! type. A name is a local before it is a function, a function before a
//! class, and a class before a builtin.

use depyler_diagnostic::{unsupported_construct, Diagnostic, DiagnosticKind};
use depyler_ir::ast::{Expr, Keyword};
use depyler_ir::Span;

use super::{CallTarget, Inferencer};
use crate::builtins::{Builtin, BuiltinTable, MathMember, Method, Receiver};
use crate::context::{FunctionSig, ParamSig};
use crate::RustType;

impl Inferencer<'_> {
    pub(super) fn call(
        &mut self,
        expr: &Expr,
        func: &Expr,
        args: &[Expr],
        keywords: &[Keyword],
    ) -> RustType {
        if let Some(name) = func.as_name() {
            return self.call_name(expr, name, args, keywords);
        }
        if let depyler_ir::ast::ExprKind::Attribute { value, attr } = &func.kind {
            return self.call_attribute(expr, value, attr, args, keywords);
        }
        self.infer_args(args, keywords);
        self.error(unsupported_construct(func.span, "call of a computed callee"))
    }

    fn infer_args(&mut self, args: &[Expr], keywords: &[Keyword]) -> Vec<RustType> {
        let types = args.iter().map(|a| self.expr(a)).collect();
        for keyword in keywords {
            self.expr(&keyword.value);
        }
        types
    }

    fn call_name(&mut self, expr: &Expr, name: &str, args: &[Expr], keywords: &[Keyword]) -> RustType {
        if self.is_bound(name) {
            self.infer_args(args, keywords);
            return self.error(
                unsupported_construct(expr.span, "calling a variable")
                    .with_note(format!("`{name}` is a local value, not a function")),
            );
        }
        if let Some(sig) = self.ctx.function(name) {
            let sig = sig.clone();
            self.calls.insert(expr.id, CallTarget::Function(name.to_string()));
            return self.call_sig(expr, &sig, sig.call_params(), args, keywords);
        }
        if let Some(class) = self.ctx.class(name) {
            let params = class.constructor.clone();
            let sig = FunctionSig {
                name: name.to_string(),
                params: params.clone(),
                ret: Some(RustType::Struct(name.to_string())),
                is_static: true,
            };
            self.calls.insert(expr.id, CallTarget::Constructor(name.to_string()));
            return self.call_sig(expr, &sig, &params, args, keywords);
        }
        if let Some(member) = self.ctx.math_names.get(name).copied() {
            return self.call_math(expr, member, args, keywords);
        }
        if let Some(builtin) = BuiltinTable::get().function(name) {
            self.calls.insert(expr.id, CallTarget::Builtin(builtin));
            return self.call_builtin(expr, builtin, args, keywords);
        }

        self.infer_args(args, keywords);
        if BuiltinTable::is_dynamic(name) {
            // Rejected by the validator before inference.
            return RustType::Unresolved;
        }
        if BuiltinTable::is_exception(name) {
            return self.error(unsupported_construct(
                expr.span,
                "exception value outside `raise`",
            ));
        }
        if BuiltinTable::is_unsupported(name) {
            return self.error(unsupported_construct(expr.span, &format!("builtin `{name}`")));
        }
        if self.ctx.foreign_modules.contains(name) {
            return self.error(unsupported_construct(expr.span, &format!("imported `{name}`")));
        }
        self.error(
            Diagnostic::new(DiagnosticKind::TypeUnificationError, expr.span)
                .with_message(format!("call to undefined function `{name}`"))
                .with_label("not defined in this module"),
        )
    }

    /// Check arguments against `params` and produce the return type.
    fn call_sig(
        &mut self,
        expr: &Expr,
        sig: &FunctionSig,
        params: &[ParamSig],
        args: &[Expr],
        keywords: &[Keyword],
    ) -> RustType {
        let slots: Vec<RustType> = params
            .iter()
            .map(|p| p.ty.clone().unwrap_or_else(|| self.unifier.fresh()))
            .collect();
        let mut filled = vec![false; params.len()];

        if args.len() > params.len() {
            self.infer_args(args, keywords);
            return self.error(
                Diagnostic::new(DiagnosticKind::TypeUnificationError, expr.span)
                    .with_message(format!(
                        "`{}` takes {} argument{} but {} were given",
                        sig.name,
                        params.len(),
                        if params.len() == 1 { "" } else { "s" },
                        args.len()
                    ))
                    .with_label("too many arguments"),
            );
        }
        for (i, arg) in args.iter().enumerate() {
            let found = self.expr(arg);
            self.coerce_into(&found, &slots[i], arg.span, &format!("argument `{}`", params[i].name));
            filled[i] = true;
        }
        for keyword in keywords {
            let found = self.expr(&keyword.value);
            match params.iter().position(|p| p.name == keyword.name) {
                Some(i) if !filled[i] => {
                    self.coerce_into(&found, &slots[i], keyword.value.span, &format!("argument `{}`", keyword.name));
                    filled[i] = true;
                }
                Some(_) => self.diagnostics.push(
                    Diagnostic::new(DiagnosticKind::TypeUnificationError, keyword.value.span)
                        .with_message(format!("argument `{}` given twice", keyword.name))
                        .with_label("repeated here"),
                ),
                None => self.diagnostics.push(
                    Diagnostic::new(DiagnosticKind::TypeUnificationError, keyword.value.span)
                        .with_message(format!("`{}` has no parameter `{}`", sig.name, keyword.name))
                        .with_label("unknown keyword argument"),
                ),
            }
        }
        for (param, done) in params.iter().zip(&filled) {
            if !done && !param.has_default {
                self.diagnostics.push(
                    Diagnostic::new(DiagnosticKind::TypeUnificationError, expr.span)
                        .with_message(format!("missing argument `{}` in call to `{}`", param.name, sig.name))
                        .with_label("argument missing"),
                );
            }
        }
        sig.ret.clone().unwrap_or_else(|| self.unifier.fresh())
    }

    fn call_attribute(
        &mut self,
        expr: &Expr,
        value: &Expr,
        attr: &str,
        args: &[Expr],
        keywords: &[Keyword],
    ) -> RustType {
        if let Some(name) = value.as_name().filter(|n| !self.is_bound(n)) {
            if self.ctx.is_math_module(name) {
                return match BuiltinTable::get().math(attr) {
                    Some(member) => self.call_math(expr, member, args, keywords),
                    None => {
                        self.infer_args(args, keywords);
                        self.error(unsupported_construct(expr.span, &format!("`math.{attr}`")))
                    }
                };
            }
            if let Some(class) = self.ctx.class(name) {
                let sig = class.method(attr).cloned();
                return match sig {
                    Some(sig) if sig.is_static => {
                        self.calls.insert(
                            expr.id,
                            CallTarget::StaticMethod {
                                class: name.to_string(),
                                name: attr.to_string(),
                            },
                        );
                        self.call_sig(expr, &sig, &sig.params, args, keywords)
                    }
                    _ => {
                        self.infer_args(args, keywords);
                        self.error(
                            Diagnostic::new(DiagnosticKind::TypeUnificationError, expr.span)
                                .with_message(format!("`{name}` has no static method `{attr}`"))
                                .with_label("called on the class itself"),
                        )
                    }
                };
            }
            if self.ctx.foreign_modules.contains(name) {
                self.infer_args(args, keywords);
                return self.error(unsupported_construct(expr.span, &format!("module `{name}`")));
            }
        }

        if self.init_mode && value.as_name() == Some("self") {
            self.expr(value);
            self.infer_args(args, keywords);
            return self.error(unsupported_construct(
                expr.span,
                "method call on `self` inside `__init__`",
            ));
        }

        let receiver = self.expr(value);
        match self.unifier.shallow(&receiver) {
            RustType::Struct(class) => {
                let sig = self.ctx.class(&class).and_then(|c| c.method(attr)).cloned();
                match sig {
                    Some(sig) => {
                        self.calls.insert(
                            expr.id,
                            CallTarget::Method {
                                class,
                                name: attr.to_string(),
                            },
                        );
                        self.call_sig(expr, &sig, sig.call_params(), args, keywords)
                    }
                    None => {
                        self.infer_args(args, keywords);
                        self.error(
                            Diagnostic::new(DiagnosticKind::TypeUnificationError, expr.span)
                                .with_message(format!("`{class}` has no method `{attr}`"))
                                .with_label("unknown method"),
                        )
                    }
                }
            }
            RustType::Unresolved => {
                self.infer_args(args, keywords);
                RustType::Unresolved
            }
            RustType::Dynamic => {
                self.infer_args(args, keywords);
                self.error(unsupported_construct(expr.span, "method call on a dynamic value"))
            }
            RustType::Var(_) => {
                let table = BuiltinTable::get();
                let Some(family) = table.unique_receiver(attr) else {
                    self.infer_args(args, keywords);
                    return self.error(
                        Diagnostic::new(DiagnosticKind::TypeUnificationError, value.span)
                            .with_message(format!("cannot infer the receiver type of `.{attr}()`"))
                            .with_label("type unknown here")
                            .with_suggestion("annotate the receiver"),
                    );
                };
                let shape = match family {
                    Receiver::List => RustType::vec(self.unifier.fresh()),
                    Receiver::Str => RustType::Str,
                    Receiver::Dict => RustType::hash_map(self.unifier.fresh(), self.unifier.fresh()),
                    Receiver::Set => RustType::hash_set(self.unifier.fresh()),
                };
                self.refine(&receiver, &shape, expr.span, "method receiver");
                self.call_method(expr, &shape, family, attr, args, keywords)
            }
            other => {
                let family = match &other {
                    RustType::Vec(_) => Some(Receiver::List),
                    RustType::Str | RustType::Char => Some(Receiver::Str),
                    RustType::HashMap(..) => Some(Receiver::Dict),
                    RustType::HashSet(_) => Some(Receiver::Set),
                    _ => None,
                };
                match family {
                    Some(family) => self.call_method(expr, &other, family, attr, args, keywords),
                    None => {
                        self.infer_args(args, keywords);
                        let shown = self.unifier.resolve(&other).python_name();
                        self.error(
                            Diagnostic::new(DiagnosticKind::TypeUnificationError, expr.span)
                                .with_message(format!("`{shown}` has no method `{attr}`"))
                                .with_label("unknown method"),
                        )
                    }
                }
            }
        }
    }

    fn call_math(&mut self, expr: &Expr, member: MathMember, args: &[Expr], keywords: &[Keyword]) -> RustType {
        let types = self.infer_args(args, keywords);
        if member.is_constant() {
            return self.error(unsupported_construct(expr.span, "calling a `math` constant"));
        }
        self.calls.insert(expr.id, CallTarget::Math(member));
        let arity = if member == MathMember::Gcd { 2 } else { 1 };
        if types.len() != arity || !keywords.is_empty() {
            return self.arity_error(expr.span, &format!("math function takes {arity} argument(s)"));
        }
        let int = RustType::Int(self.int_kind);
        match member {
            MathMember::Gcd => {
                for (ty, arg) in types.iter().zip(args) {
                    self.coerce_into(ty, &int, arg.span, "argument of `gcd`");
                }
                int
            }
            MathMember::Floor | MathMember::Ceil => {
                self.coerce_into(&types[0], &RustType::Float, args[0].span, "math argument");
                int
            }
            _ => {
                self.coerce_into(&types[0], &RustType::Float, args[0].span, "math argument");
                RustType::Float
            }
        }
    }

    fn arity_error(&mut self, span: Span, message: &str) -> RustType {
        self.error(
            Diagnostic::new(DiagnosticKind::TypeUnificationError, span)
                .with_message(message.to_string())
                .with_label("wrong number of arguments"),
        )
    }

    fn reject_keywords(&mut self, name: &str, keywords: &[Keyword], allowed: &[&str]) {
        for keyword in keywords {
            if !allowed.contains(&keyword.name.as_str()) {
                self.diagnostics.push(unsupported_construct(
                    keyword.value.span,
                    &format!("`{}=` argument of `{name}`", keyword.name),
                ));
            }
        }
    }

    fn call_builtin(&mut self, expr: &Expr, builtin: Builtin, args: &[Expr], keywords: &[Keyword]) -> RustType {
        let types = self.infer_args(args, keywords);
        let span = expr.span;
        let int = RustType::Int(self.int_kind);
        let argc = types.len();
        let arity = |lo: usize, hi: usize| (lo..=hi).contains(&argc);

        match builtin {
            Builtin::Print => {
                self.reject_keywords("print", keywords, &["sep", "end"]);
                return RustType::Unit;
            }
            Builtin::Sorted => self.reject_keywords("sorted", keywords, &["reverse"]),
            _ => self.reject_keywords("builtin", keywords, &[]),
        }

        match builtin {
            Builtin::Len if argc == 1 => {
                if matches!(self.unifier.shallow(&types[0]), RustType::Var(_)) {
                    self.diagnostics.push(
                        Diagnostic::new(DiagnosticKind::TypeUnificationError, args[0].span)
                            .with_message("cannot infer the type passed to `len`")
                            .with_label("type unknown here")
                            .with_suggestion("annotate this value"),
                    );
                }
                int
            }
            Builtin::Int if argc <= 1 => int,
            Builtin::Float if argc <= 1 => RustType::Float,
            Builtin::Str if argc <= 1 => RustType::Str,
            Builtin::Bool if argc <= 1 => RustType::Bool,
            Builtin::Abs if argc == 1 => match self.unifier.shallow(&types[0]) {
                ty @ (RustType::Int(_) | RustType::Float | RustType::Unresolved) => ty,
                _ => self.arity_error(span, "`abs` needs a number"),
            },
            Builtin::Min | Builtin::Max if argc == 1 => self.iterate(&types[0], args[0].span),
            Builtin::Min | Builtin::Max if argc >= 2 => {
                let mut joined = types[0].clone();
                for (ty, arg) in types.iter().zip(args).skip(1) {
                    match self.unifier.join(&joined, ty) {
                        Ok(next) => joined = next,
                        Err(mismatch) => {
                            let diag = self.mismatch_diag(arg.span, "`min`/`max` arguments", &mismatch);
                            return self.error(diag);
                        }
                    }
                }
                joined
            }
            Builtin::Sum if arity(1, 2) => {
                let item = self.iterate(&types[0], args[0].span);
                if argc == 2 {
                    match self.unifier.join(&item, &types[1]) {
                        Ok(ty) => ty,
                        Err(mismatch) => {
                            let diag = self.mismatch_diag(args[1].span, "start value of `sum`", &mismatch);
                            self.error(diag)
                        }
                    }
                } else {
                    item
                }
            }
            Builtin::Range if arity(1, 3) => {
                for (ty, arg) in types.iter().zip(args) {
                    self.coerce_into(ty, &int, arg.span, "`range` bound");
                }
                RustType::vec(int)
            }
            Builtin::List | Builtin::Set if argc <= 1 => {
                let item = match types.first() {
                    Some(ty) => self.iterate(ty, args[0].span),
                    None => self.unifier.fresh(),
                };
                if builtin == Builtin::Set {
                    RustType::hash_set(item)
                } else {
                    RustType::vec(item)
                }
            }
            Builtin::Sorted | Builtin::Reversed if argc == 1 => RustType::vec(self.iterate(&types[0], args[0].span)),
            Builtin::Dict if argc == 0 => RustType::hash_map(self.unifier.fresh(), self.unifier.fresh()),
            Builtin::Dict if argc == 1 => match self.unifier.shallow(&types[0]) {
                ty @ RustType::HashMap(..) => ty,
                _ => self.error(unsupported_construct(span, "`dict` from a non-dict value")),
            },
            Builtin::Enumerate if arity(1, 2) => {
                let item = self.iterate(&types[0], args[0].span);
                if let Some(start) = types.get(1) {
                    self.coerce_into(start, &int, args[1].span, "`enumerate` start");
                }
                RustType::vec(RustType::Tuple(vec![int, item]))
            }
            Builtin::Zip if argc >= 2 => {
                let items = types
                    .iter()
                    .zip(args)
                    .map(|(ty, arg)| self.iterate(ty, arg.span))
                    .collect();
                RustType::vec(RustType::Tuple(items))
            }
            Builtin::Ord if argc == 1 => {
                self.coerce_into(&types[0], &RustType::Str, args[0].span, "argument of `ord`");
                int
            }
            Builtin::Chr if argc == 1 => {
                self.coerce_into(&types[0], &int, args[0].span, "argument of `chr`");
                RustType::Char
            }
            Builtin::Any | Builtin::All if argc == 1 => {
                self.iterate(&types[0], args[0].span);
                RustType::Bool
            }
            Builtin::Round if argc == 1 => int,
            Builtin::Round if argc == 2 => {
                self.coerce_into(&types[1], &int, args[1].span, "`round` digits");
                RustType::Float
            }
            _ => self.arity_error(span, &format!("wrong number of arguments to `{}`", builtin_name(builtin))),
        }
    }

    /// Method of a builtin receiver family.
    fn call_method(
        &mut self,
        expr: &Expr,
        receiver: &RustType,
        family: Receiver,
        attr: &str,
        args: &[Expr],
        keywords: &[Keyword],
    ) -> RustType {
        let Some(method) = BuiltinTable::get().method(family, attr) else {
            self.infer_args(args, keywords);
            let shown = self.unifier.resolve(receiver).python_name();
            return self.error(
                Diagnostic::new(DiagnosticKind::TypeUnificationError, expr.span)
                    .with_message(format!("`{shown}` has no method `{attr}`"))
                    .with_label("unknown method"),
            );
        };
        self.calls.insert(expr.id, CallTarget::BuiltinMethod { receiver: family, method });
        let types = self.infer_args(args, keywords);
        self.reject_keywords(attr, keywords, &["reverse"]);

        let receiver = self.unifier.shallow(receiver);
        let int = RustType::Int(self.int_kind);
        let (elem, key, value) = match &receiver {
            RustType::Vec(t) | RustType::HashSet(t) => ((**t).clone(), RustType::Unresolved, RustType::Unresolved),
            RustType::HashMap(k, v) => (RustType::Unresolved, (**k).clone(), (**v).clone()),
            _ => (RustType::Str, RustType::Unresolved, RustType::Unresolved),
        };
        let argc = types.len();
        let expect = |this: &mut Self, i: usize, slot: &RustType, what: &str| {
            if let (Some(ty), Some(arg)) = (types.get(i), args.get(i)) {
                this.coerce_into(ty, slot, arg.span, what);
            }
        };

        let (lo, hi, ret) = match (family, method) {
            (Receiver::List, Method::Append) => {
                expect(self, 0, &elem, "appended value");
                (1, 1, RustType::Unit)
            }
            (Receiver::List, Method::Extend) => {
                expect(self, 0, &RustType::vec(elem.clone()), "extended list");
                (1, 1, RustType::Unit)
            }
            (Receiver::List, Method::Insert) => {
                expect(self, 0, &int, "insert position");
                expect(self, 1, &elem, "inserted value");
                (2, 2, RustType::Unit)
            }
            (Receiver::List, Method::Pop) => {
                expect(self, 0, &int, "pop index");
                (0, 1, elem.clone())
            }
            (Receiver::List, Method::Remove | Method::Index | Method::Count) => {
                expect(self, 0, &elem, "searched value");
                let ret = if method == Method::Remove { RustType::Unit } else { int.clone() };
                (1, 1, ret)
            }
            (Receiver::List, Method::Reverse | Method::Sort | Method::Clear) => (0, 0, RustType::Unit),
            (_, Method::Copy) => (0, 0, receiver.clone()),
            (Receiver::Str, Method::Upper | Method::Lower) => (0, 0, RustType::Str),
            (Receiver::Str, Method::Strip | Method::Lstrip | Method::Rstrip) => {
                expect(self, 0, &RustType::Str, "characters to strip");
                (0, 1, RustType::Str)
            }
            (Receiver::Str, Method::Split) => {
                expect(self, 0, &RustType::Str, "separator");
                (0, 1, RustType::vec(RustType::Str))
            }
            (Receiver::Str, Method::Join) => {
                if let (Some(ty), Some(arg)) = (types.first(), args.first()) {
                    let item = self.iterate(ty, arg.span);
                    self.coerce_into(&item, &RustType::Str, arg.span, "joined item");
                }
                (1, 1, RustType::Str)
            }
            (Receiver::Str, Method::Replace) => {
                expect(self, 0, &RustType::Str, "replaced text");
                expect(self, 1, &RustType::Str, "replacement");
                (2, 2, RustType::Str)
            }
            (Receiver::Str, Method::StartsWith | Method::EndsWith) => {
                expect(self, 0, &RustType::Str, "prefix or suffix");
                (1, 1, RustType::Bool)
            }
            (Receiver::Str, Method::Find | Method::Count | Method::Index) => {
                expect(self, 0, &RustType::Str, "searched text");
                (1, 1, int.clone())
            }
            (
                Receiver::Str,
                Method::IsDigit | Method::IsAlpha | Method::IsSpace | Method::IsUpper | Method::IsLower,
            ) => (0, 0, RustType::Bool),
            (Receiver::Dict, Method::Get) => {
                expect(self, 0, &key, "dict key");
                expect(self, 1, &value, "default value");
                let ret = if argc == 2 { value.clone() } else { RustType::option(value.clone()) };
                (1, 2, ret)
            }
            (Receiver::Dict, Method::Keys) => (0, 0, RustType::vec(key.clone())),
            (Receiver::Dict, Method::Values) => (0, 0, RustType::vec(value.clone())),
            (Receiver::Dict, Method::Items) => (0, 0, RustType::vec(RustType::Tuple(vec![key.clone(), value.clone()]))),
            (Receiver::Dict, Method::Pop) => {
                expect(self, 0, &key, "dict key");
                expect(self, 1, &value, "default value");
                (1, 2, value.clone())
            }
            (Receiver::Dict, Method::Update) => {
                expect(self, 0, &receiver, "merged dict");
                (1, 1, RustType::Unit)
            }
            (Receiver::Dict | Receiver::Set, Method::Clear) => (0, 0, RustType::Unit),
            (Receiver::Set, Method::Add | Method::Discard | Method::Remove) => {
                expect(self, 0, &elem, "set element");
                (1, 1, RustType::Unit)
            }
            (Receiver::Set, Method::Union | Method::Intersection | Method::Difference) => {
                expect(self, 0, &receiver, "other set");
                (1, 1, receiver.clone())
            }
            _ => (0, usize::MAX, RustType::Unresolved),
        };

        if !(lo..=hi).contains(&argc) {
            return self.arity_error(expr.span, &format!("wrong number of arguments to `.{attr}()`"));
        }
        ret
    }
}

fn builtin_name(builtin: Builtin) -> String {
    format!("{builtin:?}").to_lowercase()
}
