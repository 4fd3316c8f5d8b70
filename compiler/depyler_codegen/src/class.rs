//! Classes: the struct, its constructor and `__init__`.
//!
//! An `__init__` that only stores values computed from its parameters
//! becomes one `Self { .. }` literal. Any other `__init__` runs its body
//! against `self_<field>` locals and builds the struct at the end. A class
//! without `__init__` gets a generated `new` taking its dataclass fields.

use depyler_ir::ast::{ClassDef, Expr, ExprKind, Stmt, StmtKind};
use depyler_ir::visitor::{walk_expr, Visitor};
use depyler_types::{ClassInfo, RustType};
use rustc_hash::FxHashSet;

use crate::function::Lowerer;
use crate::runtime::Imports;
use crate::scope::Scope;
use crate::types::{default_value, field_local, ident, literal};

/// One `self.<field> = value` of a constructor that only stores fields.
struct Store<'a> {
    field: &'a str,
    value: &'a Expr,
    stmt: &'a Stmt,
}

impl<'a> Lowerer<'a> {
    fn class_info(&self) -> Option<&'a ClassInfo> {
        let class = self.unit.class?;
        self.view.context.class(&class.name)
    }

    /// `__init__` as `pub fn new(..) -> Self`.
    pub(crate) fn init(&mut self) {
        let function = self.unit.function;
        let Some(info) = self.class_info() else {
            return;
        };
        self.doc(function.docstring.as_deref());
        self.mark(function.name_span);
        let params = self.params().join(", ");
        self.ctx.writeln(&format!("pub fn new({params}) -> Self {{"));
        self.ctx.indent();
        match stores(&function.body) {
            Some(stores) => self.init_literal(info, &stores),
            None => self.init_body(info),
        }
        self.ctx.dedent();
        self.ctx.writeln("}");
    }

    fn init_literal(&mut self, info: &ClassInfo, stores: &[Store<'_>]) {
        self.scope = Scope::analyze(&self.unit.function.body, self.typed, false);
        self.copied_params();
        if info.fields.is_empty() {
            self.ctx.writeln("Self {}");
            return;
        }
        self.ctx.writeln("Self {");
        self.ctx.indent();
        // Rust evaluates the fields in the order written, so stores keep
        // their statement order.
        for store in stores {
            let ty = info
                .field(store.field)
                .map_or(RustType::Unresolved, |f| f.ty.clone());
            self.mark(store.stmt.span);
            let code = self.value_as(store.value, &ty);
            let name = ident(store.field);
            if code == name {
                self.ctx.writeln(&format!("{name},"));
            } else {
                self.ctx.writeln(&format!("{name}: {code},"));
            }
        }
        let stored: FxHashSet<&str> = stores.iter().map(|s| s.field).collect();
        for field in info.fields.iter().filter(|f| !stored.contains(f.name.as_str())) {
            if let Some(value) = self.field_default(info, &field.name) {
                self.ctx.writeln(&format!("{}: {value},", ident(&field.name)));
            }
        }
        self.ctx.dedent();
        self.ctx.writeln("}");
    }

    fn init_body(&mut self, info: &ClassInfo) {
        let function = self.unit.function;
        self.fields_as_locals = true;
        self.scope = Scope::analyze(&function.body, self.typed, true);
        self.copied_params();
        // Fields `__init__` never assigns start from their class default.
        for field in &info.fields {
            if self.typed.fields.iter().any(|f| f.name == field.name) {
                continue;
            }
            let Some(value) = self.field_default(info, &field.name) else {
                continue;
            };
            let local = format!("self.{}", field.name);
            let keyword = if self.is_mutable_binding(&local) { "let mut" } else { "let" };
            let rendered = self.ctx.render_type(&field.ty);
            self.ctx.writeln(&format!(
                "{keyword} {}: {rendered} = {value};",
                field_local(&field.name)
            ));
        }
        self.hoisted();
        self.block(&function.body);
        let built = self.struct_literal();
        self.ctx.writeln(&built);
    }

    /// Class-level default of a field `__init__` leaves unset.
    fn field_default(&mut self, info: &ClassInfo, name: &str) -> Option<String> {
        let field = info.field(name)?;
        let value = field
            .default
            .as_ref()
            .and_then(|d| literal(d, &field.ty))
            .or_else(|| default_value(&field.ty));
        if value.is_none() {
            let message = format!("field `{name}` that `__init__` may leave unset");
            self.unsupported(field.span, &message);
        }
        value
    }

    /// The struct built from the `self_<field>` locals.
    pub(crate) fn struct_literal(&self) -> String {
        let Some(info) = self.class_info() else {
            return "Self {}".to_string();
        };
        if info.fields.is_empty() {
            return "Self {}".to_string();
        }
        let fields: Vec<String> = info
            .fields
            .iter()
            .map(|f| format!("{}: {}", ident(&f.name), field_local(&f.name)))
            .collect();
        format!("Self {{ {} }}", fields.join(", "))
    }
}

/// The `self.<field> = value` statements of a constructor that does
/// nothing else and never reads `self`.
fn stores(body: &[Stmt]) -> Option<Vec<Store<'_>>> {
    let mut out: Vec<Store<'_>> = Vec::new();
    for stmt in body {
        let (target, value) = match &stmt.kind {
            StmtKind::Pass => continue,
            StmtKind::Expr(Expr {
                kind: ExprKind::Str(_),
                ..
            }) => continue,
            StmtKind::Assign { targets, value } => match targets.as_slice() {
                [target] => (target, value),
                _ => return None,
            },
            StmtKind::AnnAssign {
                target,
                value: Some(value),
                ..
            } => (target, value),
            _ => return None,
        };
        let field = target.as_self_attribute()?;
        if reads_self(value) || out.iter().any(|s| s.field == field) {
            return None;
        }
        out.push(Store { field, value, stmt });
    }
    Some(out)
}

fn reads_self(expr: &Expr) -> bool {
    struct ReadsSelf(bool);

    impl<'ast> Visitor<'ast> for ReadsSelf {
        fn visit_expr(&mut self, expr: &'ast Expr) {
            if expr.as_name() == Some("self") {
                self.0 = true;
            }
            walk_expr(self, expr);
        }
    }

    let mut visitor = ReadsSelf(false);
    visitor.visit_expr(expr);
    visitor.0
}

/// `///` lines of a docstring.
pub(crate) fn doc_lines(doc: &str) -> Vec<String> {
    doc.trim()
        .lines()
        .map(|line| match line.trim() {
            "" => "///".to_string(),
            line => format!("/// {line}"),
        })
        .collect()
}

/// Struct declaration of a class, at module level.
pub(crate) fn struct_source(class: &ClassDef, info: &ClassInfo) -> String {
    let mut out = String::new();
    if let Some(doc) = &class.docstring {
        for line in doc_lines(doc) {
            out.push_str(&line);
            out.push('\n');
        }
    }
    out.push_str("#[derive(Debug, Clone, PartialEq)]\n");
    if info.fields.is_empty() {
        out.push_str(&format!("pub struct {} {{}}\n", class.name));
        return out;
    }
    out.push_str(&format!("pub struct {} {{\n", class.name));
    for field in &info.fields {
        out.push_str(&format!("    pub {}: {},\n", ident(&field.name), field.ty.render()));
    }
    out.push_str("}\n");
    out
}

/// `new` of a class without `__init__`, one level deep. Fields without a
/// default are parameters, in declaration order.
pub(crate) fn generated_constructor(info: &ClassInfo) -> Option<String> {
    let mut params = Vec::new();
    let mut fields = Vec::new();
    for (field, param) in info.fields.iter().map(|f| (f, info.constructor.iter().find(|p| p.name == f.name))) {
        let name = ident(&field.name);
        if param.is_some() {
            params.push(format!("{name}: {}", field.ty.render()));
            fields.push(name);
            continue;
        }
        let value = field
            .default
            .as_ref()
            .and_then(|d| literal(d, &field.ty))
            .or_else(|| default_value(&field.ty))?;
        fields.push(format!("{name}: {value}"));
    }
    let built = if fields.is_empty() {
        "Self {}".to_string()
    } else {
        format!("Self {{ {} }}", fields.join(", "))
    };
    Some(format!(
        "    pub fn new({}) -> Self {{\n        {built}\n    }}\n",
        params.join(", ")
    ))
}

/// Imports the struct declaration needs.
pub(crate) fn struct_imports(info: &ClassInfo) -> Imports {
    info.fields
        .iter()
        .fold(Imports::empty(), |acc, f| acc | Imports::for_type(&f.ty))
}

#[cfg(test)]
mod tests;
