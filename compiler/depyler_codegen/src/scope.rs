//! Where each local is declared.
//!
//! Python binds a name wherever it is first assigned, possibly inside a
//! branch, and the name stays visible for the rest of the function. Rust
//! needs one `let` that dominates every use, so a local is declared:
//!
//! - inline (`let x: T = v;`) when its first binding is a plain assignment
//!   at the top level of the function body,
//! - not at all when it is only ever a `for` target,
//! - at function entry otherwise, with a type default when one exists.
//!
//! Inside `__init__`, `self.<field>` targets are locals too (keyed
//! `self.<field>`) until the struct is built at the end.

use depyler_ir::ast::{Expr, ExprKind, NodeId, Stmt, StmtKind};
use depyler_types::TypedFunction;
use rustc_hash::{FxHashMap, FxHashSet};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum BindKind {
    Assign,
    Loop,
}

#[derive(Clone, Debug)]
struct BindRecord {
    name: String,
    stmt: NodeId,
    kind: BindKind,
    /// Names bound together by this statement's only target, when the
    /// statement may declare them inline.
    group: Option<Vec<String>>,
}

#[derive(Default)]
pub(crate) struct Scope {
    inline: FxHashMap<String, NodeId>,
    hoisted: Vec<String>,
    loop_only: FxHashSet<String>,
    assign_counts: FxHashMap<String, u32>,
    /// Comprehension targets in scope, innermost last.
    comprehension: Vec<String>,
    /// `for` targets bound to references into the iterated collection.
    loop_refs: FxHashSet<String>,
}

impl Scope {
    /// Declaration plan of `typed`. With `fields`, `self.<field>` targets
    /// count as locals.
    pub(crate) fn analyze(body: &[Stmt], typed: &TypedFunction, fields: bool) -> Scope {
        let mut walker = Walker {
            fields,
            records: Vec::new(),
        };
        walker.block(body, true);
        let records = walker.records;

        let mut scope = Scope::default();
        let mut looped: FxHashSet<&str> = FxHashSet::default();
        for record in &records {
            match record.kind {
                BindKind::Assign => {
                    *scope.assign_counts.entry(record.name.clone()).or_default() += 1;
                }
                BindKind::Loop => {
                    looped.insert(record.name.as_str());
                }
            }
        }
        for name in looped {
            if !scope.assign_counts.contains_key(name) && typed.param(name).is_none() {
                scope.loop_only.insert(name.to_string());
            }
        }

        let first_of = |name: &str| -> Option<NodeId> {
            if let Some(field) = name.strip_prefix("self.") {
                typed.fields.iter().find(|f| f.name == field).map(|f| f.first)
            } else {
                typed.local(name).map(|l| l.first)
            }
        };

        let locals = typed.locals.iter().map(|l| l.name.clone());
        let field_locals = typed
            .fields
            .iter()
            .filter(|_| fields)
            .map(|f| format!("self.{}", f.name));
        for name in locals.chain(field_locals) {
            if typed.param(&name).is_some() || scope.loop_only.contains(&name) {
                continue;
            }
            let Some(first) = first_of(&name) else {
                continue;
            };
            let inline = records.iter().any(|r| {
                r.name == name
                    && r.stmt == first
                    && r.kind == BindKind::Assign
                    && r.group
                        .as_ref()
                        .is_some_and(|group| group.iter().all(|n| first_of(n) == Some(first)))
            });
            if inline {
                scope.inline.insert(name, first);
            } else if !scope.hoisted.contains(&name) {
                scope.hoisted.push(name);
            }
        }
        scope
    }

    /// Whether `stmt` declares `name` with `let`.
    pub(crate) fn declares(&self, name: &str, stmt: NodeId) -> bool {
        self.inline.get(name) == Some(&stmt)
    }

    /// Locals declared at function entry, in first-binding order.
    pub(crate) fn hoisted(&self) -> &[String] {
        &self.hoisted
    }

    pub(crate) fn is_loop_only(&self, name: &str) -> bool {
        self.loop_only.contains(name)
    }

    pub(crate) fn bind_loop_ref(&mut self, name: &str) {
        self.loop_refs.insert(name.to_string());
    }

    pub(crate) fn is_loop_ref(&self, name: &str) -> bool {
        self.loop_refs.contains(name)
    }

    pub(crate) fn assign_count(&self, name: &str) -> u32 {
        self.assign_counts.get(name).copied().unwrap_or(0)
    }

    pub(crate) fn enter_comprehension(&mut self, names: Vec<String>) -> usize {
        let mark = self.comprehension.len();
        self.comprehension.extend(names);
        mark
    }

    pub(crate) fn leave_comprehension(&mut self, mark: usize) {
        self.comprehension.truncate(mark);
    }

    pub(crate) fn in_comprehension(&self, name: &str) -> bool {
        self.comprehension.iter().any(|n| n == name)
    }
}

struct Walker {
    fields: bool,
    records: Vec<BindRecord>,
}

impl Walker {
    fn block(&mut self, body: &[Stmt], top: bool) {
        for stmt in body {
            self.stmt(stmt, top);
        }
    }

    fn stmt(&mut self, stmt: &Stmt, top: bool) {
        match &stmt.kind {
            StmtKind::Assign { targets, .. } => {
                let single = targets.len() == 1;
                for target in targets {
                    let mut names = Vec::new();
                    let flat = self.names(target, &mut names, true);
                    let group = (top && single && flat).then(|| names.clone());
                    self.record(stmt.id, names, BindKind::Assign, group.as_ref());
                }
            }
            StmtKind::AnnAssign {
                target,
                value: Some(_),
                ..
            } => {
                let mut names = Vec::new();
                let flat = self.names(target, &mut names, false);
                let group = (top && flat).then(|| names.clone());
                self.record(stmt.id, names, BindKind::Assign, group.as_ref());
            }
            StmtKind::AugAssign { target, .. } => {
                let mut names = Vec::new();
                self.names(target, &mut names, false);
                self.record(stmt.id, names, BindKind::Assign, None);
            }
            StmtKind::For { target, body, .. } => {
                let mut names = Vec::new();
                self.names(target, &mut names, true);
                self.record(stmt.id, names, BindKind::Loop, None);
                self.block(body, false);
            }
            StmtKind::While { body, .. } => self.block(body, false),
            StmtKind::If { body, orelse, .. } => {
                self.block(body, false);
                self.block(orelse, false);
            }
            _ => {}
        }
    }

    fn record(&mut self, stmt: NodeId, names: Vec<String>, kind: BindKind, group: Option<&Vec<String>>) {
        for name in names {
            self.records.push(BindRecord {
                name,
                stmt,
                kind,
                group: group.cloned(),
            });
        }
    }

    /// Collect the names `target` binds. Returns whether the target is a
    /// name, or (with `tuples`) a flat tuple of names.
    fn names(&self, target: &Expr, out: &mut Vec<String>, tuples: bool) -> bool {
        match &target.kind {
            ExprKind::Name(name) => {
                out.push(name.clone());
                true
            }
            ExprKind::Attribute { .. } if self.fields => match target.as_self_attribute() {
                Some(field) => {
                    out.push(format!("self.{field}"));
                    true
                }
                None => false,
            },
            ExprKind::Tuple(items) | ExprKind::List(items) => {
                let mut flat = tuples;
                for item in items {
                    let simple = matches!(item.kind, ExprKind::Name(_) | ExprKind::Attribute { .. });
                    flat &= self.names(item, out, false) && simple;
                }
                flat
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests;
