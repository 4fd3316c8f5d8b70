//! Use sites of one function.
//!
//! A single walk in program order records every place a parameter, local,
//! `self` field or projection is read, changed in place, moved somewhere or
//! handed to a user function, together with every binding. Modes, escapes
//! and clone sites are all computed from this summary; nothing after the
//! walk looks at the AST again.
//!
//! Conditions (`if`/`while` tests, `not`, `and`/`or` in a test) only read
//! their operands: truthiness never moves a value.

use depyler_ir::ast::{
    Comprehension, Expr, ExprKind, FStringPart, FunctionDef, Keyword, NodeId, Stmt, StmtKind,
    UnaryOp,
};
use depyler_ir::stack::ensure_sufficient_stack;
use depyler_ir::Span;
use depyler_pragma::Ownership;
use depyler_types::{Builtin, CallTarget, Method, RustType, TypedFunction};
use smallvec::{smallvec, SmallVec};

/// `f` for module functions, `Class.method` for methods.
pub fn function_key(class: Option<&str>, name: &str) -> String {
    match class {
        Some(class) => format!("{class}.{name}"),
        None => name.to_string(),
    }
}

/// What a use site touches.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Subject {
    /// A parameter, local, or some other plain name.
    Name(String),
    SelfField(String),
    /// Bare `self`.
    SelfValue,
    /// `xs[i]`, `d[k]`, `t[0]`, with the name the container is reached
    /// from (`self` for fields of `self`).
    Element(Option<String>),
    /// `p.attr` on something other than `self`.
    Field(Option<String>),
}

/// Name at the bottom of a chain of subscripts and attributes.
fn root_name(expr: &Expr) -> Option<String> {
    match &expr.kind {
        ExprKind::Name(name) => Some(name.clone()),
        ExprKind::Subscript { value, .. } | ExprKind::Attribute { value, .. } => root_name(value),
        _ => None,
    }
}

/// Where a moved value ends up.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SinkTarget {
    Local(String),
    Return,
    /// A field of `self` (or a struct under construction in `__init__`).
    SelfField,
    /// A temporary nobody names: an argument list, a printed literal.
    Discard,
}

pub type Sink = SmallVec<[SinkTarget; 1]>;

/// Parameter a call argument lands in.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ArgSlot {
    Index(usize),
    Keyword(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Position {
    Read,
    /// Changed in place.
    Mutate,
    /// Moved into `Sink`.
    Consume(Sink),
    /// Argument of a user function or method; the callee's mode decides.
    Arg { callee: String, slot: ArgSlot },
    /// Receiver of a user method; the callee's receiver mode decides.
    Receiver { callee: String },
    /// Argument of a class constructor. Decided by `__init__` when the
    /// class has one; generated constructors store their arguments.
    Construct { class: String, slot: ArgSlot },
}

impl Position {
    pub fn returns(&self) -> bool {
        matches!(self, Position::Consume(sink) if sink.contains(&SinkTarget::Return))
    }
}

#[derive(Clone, Debug)]
pub struct UseSite {
    pub node: NodeId,
    pub span: Span,
    pub subject: Subject,
    pub position: Position,
    /// Program order, shared with [`BindSite::order`].
    pub order: u32,
    /// Loops (including comprehensions) around the site, outermost first.
    pub loops: SmallVec<[u32; 2]>,
    /// Whether the value at this site owns heap memory.
    pub heap: bool,
}

/// Right-hand side of a binding, as far as ownership cares.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BindValue {
    /// `y = x`
    Alias(String),
    /// A fresh list, dict or set. `scalar_len` is the length of a non-empty
    /// list literal whose elements are all `Copy`.
    Allocation { scalar_len: Option<usize> },
    /// Target of a `for` loop.
    LoopTarget,
    /// Target of a comprehension; scoped to it.
    ComprehensionTarget,
    Other,
}

#[derive(Clone, Debug)]
pub struct BindSite {
    /// Local name, or `self.<field>` inside `__init__`.
    pub name: String,
    pub order: u32,
    pub loops: SmallVec<[u32; 2]>,
    pub value: BindValue,
    pub span: Span,
}

/// Everything ownership resolution needs to know about one function.
#[derive(Clone, Debug)]
pub struct FunctionUses {
    pub key: String,
    pub name_span: Span,
    pub is_init: bool,
    /// Takes `&self`/`&mut self`: a method that is neither `__init__` nor
    /// static.
    pub has_receiver: bool,
    /// Parameters other than `self`.
    pub params: Vec<(String, RustType)>,
    /// Effective `ownership` pragma.
    pub ownership: Option<Ownership>,
    pub sites: Vec<UseSite>,
    pub binds: Vec<BindSite>,
}

impl FunctionUses {
    pub fn param_index(&self, name: &str) -> Option<usize> {
        self.params.iter().position(|(n, _)| n == name)
    }

    pub fn binds_of<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a BindSite> + 'a {
        self.binds.iter().filter(move |b| b.name == name)
    }

    pub fn sites_of<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a UseSite> + 'a {
        self.sites
            .iter()
            .filter(move |s| matches!(&s.subject, Subject::Name(n) if n == name))
    }
}

/// Walk `function` once and summarize its uses.
#[tracing::instrument(level = "trace", skip_all, fields(function = %function.name))]
pub fn collect_uses(
    function: &FunctionDef,
    typed: &TypedFunction,
    ownership: Option<Ownership>,
) -> FunctionUses {
    let has_self = typed.class.is_some()
        && !function.is_static()
        && function.params.first().is_some_and(|p| p.name == "self");
    let is_init = typed.is_init();

    let mut collector = Collector {
        typed,
        has_self,
        is_init,
        order: 0,
        loops: SmallVec::new(),
        next_loop: 0,
        sites: Vec::new(),
        binds: Vec::new(),
    };
    collector.block(&function.body);

    let skip = usize::from(has_self);
    FunctionUses {
        key: function_key(typed.class.as_deref(), &function.name),
        name_span: function.name_span,
        is_init,
        has_receiver: has_self && !is_init,
        params: typed.params.iter().skip(skip).cloned().collect(),
        ownership,
        sites: collector.sites,
        binds: collector.binds,
    }
}

struct Collector<'a> {
    typed: &'a TypedFunction,
    has_self: bool,
    is_init: bool,
    order: u32,
    loops: SmallVec<[u32; 2]>,
    next_loop: u32,
    sites: Vec<UseSite>,
    binds: Vec<BindSite>,
}

/// Position of a value that becomes part of a larger value.
fn element_position(pos: &Position) -> Position {
    match pos {
        Position::Consume(sink) => Position::Consume(sink.clone()),
        _ => Position::Consume(smallvec![SinkTarget::Discard]),
    }
}

impl Collector<'_> {
    fn tick(&mut self) -> u32 {
        self.order += 1;
        self.order
    }

    fn site(&mut self, expr: &Expr, subject: Subject, position: Position) {
        let order = self.tick();
        self.sites.push(UseSite {
            node: expr.id,
            span: expr.span,
            subject,
            position,
            order,
            loops: self.loops.clone(),
            heap: self.typed.ty(expr.id).is_heap(),
        });
    }

    fn bind(&mut self, name: String, value: BindValue, span: Span) {
        let order = self.tick();
        self.binds.push(BindSite {
            name,
            order,
            loops: self.loops.clone(),
            value,
            span,
        });
    }

    fn in_loop(&mut self, f: impl FnOnce(&mut Self)) {
        let id = self.next_loop;
        self.next_loop += 1;
        self.loops.push(id);
        f(self);
        self.loops.pop();
    }

    fn is_self(&self, expr: &Expr) -> bool {
        self.has_self && expr.as_name() == Some("self")
    }

    // Statements

    fn block(&mut self, body: &[Stmt]) {
        for stmt in body {
            self.stmt(stmt);
        }
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Expr(expr) => self.expr(expr, &Position::Read),
            StmtKind::Assign { targets, value } => {
                let mut sink = Sink::new();
                for target in targets {
                    self.sinks_of(target, &mut sink);
                }
                self.expr(value, &Position::Consume(sink));
                for target in targets {
                    self.store(target, Some(value));
                }
            }
            StmtKind::AnnAssign {
                target,
                value: Some(value),
                ..
            } => {
                let mut sink = Sink::new();
                self.sinks_of(target, &mut sink);
                self.expr(value, &Position::Consume(sink));
                self.store(target, Some(value));
            }
            StmtKind::AnnAssign { value: None, .. } => {}
            StmtKind::AugAssign { target, value, .. } => {
                self.expr(value, &Position::Read);
                self.aug_target(target);
            }
            StmtKind::Return(value) => {
                if let Some(value) = value {
                    self.expr(value, &Position::Consume(smallvec![SinkTarget::Return]));
                }
            }
            StmtKind::If { test, body, orelse } => {
                self.condition(test);
                self.block(body);
                self.block(orelse);
            }
            StmtKind::While { test, body } => self.in_loop(|this| {
                this.condition(test);
                this.block(body);
            }),
            StmtKind::For { target, iter, body } => {
                self.expr(iter, &Position::Read);
                self.in_loop(|this| {
                    this.loop_target(target, BindValue::LoopTarget);
                    this.block(body);
                });
            }
            StmtKind::Assert { test, msg } => {
                self.condition(test);
                if let Some(msg) = msg {
                    self.expr(msg, &Position::Read);
                }
            }
            StmtKind::Raise(Some(value)) => self.expr(value, &Position::Read),
            StmtKind::Raise(None)
            | StmtKind::Break
            | StmtKind::Continue
            | StmtKind::Pass
            | StmtKind::Unsupported { .. } => {}
        }
    }

    /// Where a value stored into `target` lives afterwards.
    fn sinks_of(&self, target: &Expr, out: &mut Sink) {
        match &target.kind {
            ExprKind::Tuple(items) | ExprKind::List(items) => {
                for item in items {
                    self.sinks_of(item, out);
                }
            }
            _ => out.push(self.root_sink(target)),
        }
    }

    fn root_sink(&self, expr: &Expr) -> SinkTarget {
        match &expr.kind {
            ExprKind::Name(_) if self.is_self(expr) => SinkTarget::SelfField,
            ExprKind::Name(name) => SinkTarget::Local(name.clone()),
            ExprKind::Attribute { value, .. } | ExprKind::Subscript { value, .. } => {
                self.root_sink(value)
            }
            _ => SinkTarget::Discard,
        }
    }

    fn classify(&self, value: Option<&Expr>) -> BindValue {
        let Some(value) = value else {
            return BindValue::Other;
        };
        match &value.kind {
            ExprKind::Name(name) if !self.is_self(value) => BindValue::Alias(name.clone()),
            ExprKind::List(items) => {
                let scalars =
                    !items.is_empty() && items.iter().all(|i| self.typed.ty(i.id).is_copy());
                BindValue::Allocation {
                    scalar_len: scalars.then_some(items.len()),
                }
            }
            ExprKind::Dict { .. }
            | ExprKind::Set(_)
            | ExprKind::ListComp { .. }
            | ExprKind::SetComp { .. }
            | ExprKind::DictComp { .. } => BindValue::Allocation { scalar_len: None },
            ExprKind::Call { .. } => match self.typed.call(value.id) {
                Some(CallTarget::Builtin(
                    Builtin::List | Builtin::Dict | Builtin::Set | Builtin::Sorted,
                )) => BindValue::Allocation { scalar_len: None },
                _ => BindValue::Other,
            },
            _ => BindValue::Other,
        }
    }

    fn store(&mut self, target: &Expr, value: Option<&Expr>) {
        match &target.kind {
            ExprKind::Name(name) => {
                let kind = self.classify(value);
                self.bind(name.clone(), kind, target.span);
            }
            ExprKind::Tuple(items) | ExprKind::List(items) => {
                for item in items {
                    self.store(item, None);
                }
            }
            ExprKind::Attribute { value: base, attr } if self.is_self(base) => {
                if self.is_init {
                    let kind = self.classify(value);
                    self.bind(format!("self.{attr}"), kind, target.span);
                } else {
                    self.site(target, Subject::SelfField(attr.clone()), Position::Mutate);
                }
            }
            ExprKind::Attribute { value: base, .. } => self.expr(base, &Position::Mutate),
            ExprKind::Subscript { value: base, index } => {
                let key = if matches!(self.typed.ty(base.id), RustType::HashMap(..)) {
                    Position::Consume(smallvec![self.root_sink(base)])
                } else {
                    Position::Read
                };
                self.expr(index, &key);
                self.expr(base, &Position::Mutate);
            }
            _ => {}
        }
    }

    fn aug_target(&mut self, target: &Expr) {
        match &target.kind {
            ExprKind::Name(name) => {
                let heap = self.typed.binding(name).is_some_and(RustType::is_heap);
                if heap {
                    self.site(target, Subject::Name(name.clone()), Position::Mutate);
                } else {
                    self.bind(name.clone(), BindValue::Other, target.span);
                }
            }
            ExprKind::Attribute { value: base, attr } if self.is_self(base) => {
                if self.is_init {
                    self.bind(format!("self.{attr}"), BindValue::Other, target.span);
                } else {
                    self.site(target, Subject::SelfField(attr.clone()), Position::Mutate);
                }
            }
            ExprKind::Attribute { value: base, .. } => self.expr(base, &Position::Mutate),
            ExprKind::Subscript { value: base, index } => {
                self.expr(index, &Position::Read);
                self.expr(base, &Position::Mutate);
            }
            _ => {}
        }
    }

    fn loop_target(&mut self, target: &Expr, kind: BindValue) {
        match &target.kind {
            ExprKind::Name(name) => self.bind(name.clone(), kind, target.span),
            ExprKind::Tuple(items) | ExprKind::List(items) => {
                for item in items {
                    self.loop_target(item, kind.clone());
                }
            }
            _ => {}
        }
    }

    // Expressions

    fn condition(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::BoolOp { values, .. } => {
                for value in values {
                    self.condition(value);
                }
            }
            ExprKind::UnaryOp {
                op: UnaryOp::Not,
                operand,
            } => self.condition(operand),
            _ => self.expr(expr, &Position::Read),
        }
    }

    fn expr(&mut self, expr: &Expr, pos: &Position) {
        ensure_sufficient_stack(|| self.expr_inner(expr, pos));
    }

    fn expr_inner(&mut self, expr: &Expr, pos: &Position) {
        match &expr.kind {
            ExprKind::Name(name) => {
                let subject = if self.is_self(expr) {
                    Subject::SelfValue
                } else {
                    Subject::Name(name.clone())
                };
                self.site(expr, subject, pos.clone());
            }
            ExprKind::Attribute { value, attr } => {
                if self.is_self(value) {
                    self.site(expr, Subject::SelfField(attr.clone()), pos.clone());
                    return;
                }
                match pos {
                    Position::Read | Position::Mutate => self.expr(value, pos),
                    _ => {
                        self.expr(value, &Position::Read);
                        self.site(expr, Subject::Field(root_name(value)), pos.clone());
                    }
                }
            }
            ExprKind::Subscript { value, index } => {
                self.expr(index, &Position::Read);
                let slice = matches!(index.kind, ExprKind::Slice { .. });
                match pos {
                    Position::Read | Position::Mutate => self.expr(value, pos),
                    _ if slice => self.expr(value, &Position::Read),
                    _ => {
                        self.expr(value, &Position::Read);
                        self.site(expr, Subject::Element(root_name(value)), pos.clone());
                    }
                }
            }
            ExprKind::Slice { lower, upper, step } => {
                for part in [lower, upper, step].into_iter().flatten() {
                    self.expr(part, &Position::Read);
                }
            }
            ExprKind::Call {
                func,
                args,
                keywords,
            } => self.call(expr, func, args, keywords, pos),
            ExprKind::List(items) | ExprKind::Tuple(items) | ExprKind::Set(items) => {
                let inner = element_position(pos);
                for item in items {
                    self.expr(item, &inner);
                }
            }
            ExprKind::Dict { keys, values } => {
                let inner = element_position(pos);
                for (key, value) in keys.iter().zip(values) {
                    self.expr(key, &inner);
                    self.expr(value, &inner);
                }
            }
            ExprKind::ListComp { elt, generators }
            | ExprKind::SetComp { elt, generators }
            | ExprKind::GeneratorExp { elt, generators } => {
                let inner = element_position(pos);
                self.comprehension(generators, |this| this.expr(elt, &inner));
            }
            ExprKind::DictComp {
                key,
                value,
                generators,
            } => {
                let inner = element_position(pos);
                self.comprehension(generators, |this| {
                    this.expr(key, &inner);
                    this.expr(value, &inner);
                });
            }
            ExprKind::IfExp { test, body, orelse } => {
                self.condition(test);
                let inner = element_position(pos);
                self.expr(body, &inner);
                self.expr(orelse, &inner);
            }
            ExprKind::BoolOp { values, .. } => {
                let inner = element_position(pos);
                for value in values {
                    self.expr(value, &inner);
                }
            }
            ExprKind::UnaryOp { operand, .. } => self.expr(operand, &Position::Read),
            ExprKind::BinOp { left, right, .. } => {
                self.expr(left, &Position::Read);
                self.expr(right, &Position::Read);
            }
            ExprKind::Compare {
                left, comparators, ..
            } => {
                self.expr(left, &Position::Read);
                for comparator in comparators {
                    self.expr(comparator, &Position::Read);
                }
            }
            ExprKind::FString(parts) => {
                for part in parts {
                    if let FStringPart::Field { expr, .. } = part {
                        self.expr(expr, &Position::Read);
                    }
                }
            }
            ExprKind::Int(_)
            | ExprKind::BigInt(_)
            | ExprKind::Float(_)
            | ExprKind::Str(_)
            | ExprKind::Bool(_)
            | ExprKind::NoneLit
            | ExprKind::Unsupported { .. } => {}
        }
    }

    fn comprehension(&mut self, generators: &[Comprehension], body: impl FnOnce(&mut Self)) {
        if let Some(first) = generators.first() {
            self.expr(&first.iter, &Position::Read);
        }
        self.in_loop(|this| {
            for (i, generator) in generators.iter().enumerate() {
                if i > 0 {
                    this.expr(&generator.iter, &Position::Read);
                }
                this.loop_target(&generator.target, BindValue::ComprehensionTarget);
                for cond in &generator.ifs {
                    this.condition(cond);
                }
            }
            body(this);
        });
    }

    fn call(
        &mut self,
        expr: &Expr,
        func: &Expr,
        args: &[Expr],
        keywords: &[Keyword],
        pos: &Position,
    ) {
        let typed = self.typed;
        match typed.call(expr.id) {
            Some(CallTarget::Function(name)) => self.user_args(name.clone(), args, keywords),
            Some(CallTarget::StaticMethod { class, name }) => {
                self.user_args(function_key(Some(class), name), args, keywords);
            }
            Some(CallTarget::Method { class, name }) => {
                let callee = function_key(Some(class), name);
                if let ExprKind::Attribute { value, .. } = &func.kind {
                    self.expr(
                        value,
                        &Position::Receiver {
                            callee: callee.clone(),
                        },
                    );
                }
                self.user_args(callee, args, keywords);
            }
            Some(CallTarget::Constructor(class)) => {
                for (i, arg) in args.iter().enumerate() {
                    let pos = Position::Construct {
                        class: class.clone(),
                        slot: ArgSlot::Index(i),
                    };
                    self.expr(arg, &pos);
                }
                for keyword in keywords {
                    let pos = Position::Construct {
                        class: class.clone(),
                        slot: ArgSlot::Keyword(keyword.name.clone()),
                    };
                    self.expr(&keyword.value, &pos);
                }
            }
            Some(CallTarget::BuiltinMethod { method, .. }) => {
                let method = *method;
                let ExprKind::Attribute { value: receiver, .. } = &func.kind else {
                    self.read_args(args, keywords);
                    return;
                };
                let receiver_pos = if method.mutates_receiver() {
                    Position::Mutate
                } else {
                    Position::Read
                };
                self.expr(receiver, &receiver_pos);
                let stored = Position::Consume(smallvec![self.root_sink(receiver)]);
                for (i, arg) in args.iter().enumerate() {
                    let arg_pos = match (method, i) {
                        (Method::Append | Method::Add, 0) | (Method::Insert, 1) => stored.clone(),
                        (Method::Get | Method::Pop, 1) => element_position(pos),
                        _ => Position::Read,
                    };
                    self.expr(arg, &arg_pos);
                }
                for keyword in keywords {
                    self.expr(&keyword.value, &Position::Read);
                }
            }
            _ => self.read_args(args, keywords),
        }
    }

    fn user_args(&mut self, callee: String, args: &[Expr], keywords: &[Keyword]) {
        for (i, arg) in args.iter().enumerate() {
            let pos = Position::Arg {
                callee: callee.clone(),
                slot: ArgSlot::Index(i),
            };
            self.expr(arg, &pos);
        }
        for keyword in keywords {
            let pos = Position::Arg {
                callee: callee.clone(),
                slot: ArgSlot::Keyword(keyword.name.clone()),
            };
            self.expr(&keyword.value, &pos);
        }
    }

    fn read_args(&mut self, args: &[Expr], keywords: &[Keyword]) {
        for arg in args {
            self.expr(arg, &Position::Read);
        }
        for keyword in keywords {
            self.expr(&keyword.value, &Position::Read);
        }
    }
}

#[cfg(test)]
mod tests;
