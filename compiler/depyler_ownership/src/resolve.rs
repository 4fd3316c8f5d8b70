//! Ownership of one function's bindings.
//!
//! Starting from the module-wide parameter modes, resolution decides:
//!
//! - which consumption sites clone (the value is still needed afterwards,
//!   or it is borrowed from elsewhere)
//! - which bindings are `mut`
//! - what each binding's [`OwnershipTag`] is under the function's
//!   `ownership` and `memory_strategy` pragmas
//!
//! Where a pragma forbids what the function does, resolution reports an
//! `OwnershipConflict` instead of quietly choosing something else.

use depyler_diagnostic::{Diagnostic, DiagnosticKind};
use depyler_ir::ast::NodeId;
use depyler_ir::Span;
use depyler_pragma::{MemoryStrategy, Ownership, PragmaSet, ThreadSafety};
use depyler_types::{RustType, TypedFunction};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::modes::{Demand, ModuleModes};
use crate::uses::{BindValue, FunctionUses, Position, SinkTarget, Subject, UseSite};
use crate::{BorrowScope, OwnershipTag, ParamMode, PoolId, ReceiverMode, SharedKind};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParamOwnership {
    pub name: String,
    pub mode: ParamMode,
    pub tag: OwnershipTag,
}

/// Resolved ownership of one function.
#[derive(Clone, Debug, Default)]
pub struct OwnershipMap {
    /// Parameters other than `self`, in order.
    pub params: Vec<ParamOwnership>,
    pub receiver: Option<ReceiverMode>,
    /// Tags of locals (and of `self.<field>` locals inside `__init__`).
    pub bindings: FxHashMap<String, OwnershipTag>,
    /// Expressions whose value is cloned where it is consumed.
    pub clones: FxHashSet<NodeId>,
    /// Bindings declared `mut`.
    pub mutable: FxHashSet<String>,
    /// Locals lowered to fixed-size arrays, with their length.
    pub stack_arrays: FxHashMap<String, usize>,
    /// Borrowed parameters copied into an owned local on entry.
    pub copied_params: FxHashSet<String>,
    /// Bindings whose value leaves the function.
    pub escapes: FxHashSet<String>,
    /// `for` targets that are only read; the loop borrows its items.
    pub loop_borrows: FxHashSet<String>,
}

impl OwnershipMap {
    pub fn param(&self, name: &str) -> Option<&ParamOwnership> {
        self.params.iter().find(|p| p.name == name)
    }

    pub fn tag(&self, name: &str) -> Option<OwnershipTag> {
        self.param(name)
            .map(|p| p.tag)
            .or_else(|| self.bindings.get(name).copied())
    }

    pub fn needs_clone(&self, id: NodeId) -> bool {
        self.clones.contains(&id)
    }

    pub fn is_mutable(&self, name: &str) -> bool {
        self.mutable.contains(name)
    }

    pub fn shared_kind(&self, name: &str) -> Option<SharedKind> {
        match self.bindings.get(name) {
            Some(OwnershipTag::Shared(kind)) => Some(*kind),
            _ => None,
        }
    }

    /// Whether `name` is a parameter passed by reference and not copied.
    pub fn is_borrowed_param(&self, name: &str) -> bool {
        self.param(name).is_some_and(|p| p.mode.is_borrow()) && !self.copied_params.contains(name)
    }

    pub fn is_loop_borrow(&self, name: &str) -> bool {
        self.loop_borrows.contains(name)
    }
}

/// One function and its surroundings.
pub struct ResolveInput<'a> {
    pub uses: &'a FunctionUses,
    pub typed: &'a TypedFunction,
    pub modes: &'a ModuleModes,
    /// Effective pragmas.
    pub pragmas: &'a PragmaSet,
    /// Pragmas of the enclosing class, for methods.
    pub class_pragmas: Option<&'a PragmaSet>,
    pub pool: PoolId,
}

#[derive(Debug)]
pub struct Resolution {
    pub map: OwnershipMap,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum CloneReason {
    /// The name is used again after the move.
    StaysLive,
    /// The name is a borrowed parameter.
    Borrowed,
    /// Moving would take the value out of `self`, a container or a struct.
    Projection,
}

#[derive(Copy, Clone, Debug)]
struct Event {
    order: u32,
    is_use: bool,
}

#[tracing::instrument(level = "debug", skip_all, fields(function = %input.uses.key))]
pub fn resolve(input: &ResolveInput<'_>) -> Resolution {
    let mut resolver = Resolver::new(input);
    resolver.params();
    resolver.locals();
    resolver.escapes();
    resolver.clone_sites();
    resolver.mutability();

    match input.pragmas.ownership() {
        Some(Ownership::Owned) => resolver.owned(),
        Some(Ownership::Shared) => resolver.shared(),
        Some(Ownership::Borrowed) | None => {}
    }
    match input.pragmas.memory_strategy() {
        MemoryStrategy::Arena => resolver.arena(),
        MemoryStrategy::Stack => resolver.stack(),
        MemoryStrategy::Heap => {}
    }
    if matches!(input.pragmas.ownership(), Some(Ownership::Borrowed) | None) {
        resolver.loop_borrows();
    }
    resolver.class_conflict();

    tracing::debug!(
        clones = resolver.map.clones.len(),
        mutable = resolver.map.mutable.len(),
        conflicts = resolver.diagnostics.len(),
        "ownership resolved"
    );
    Resolution {
        map: resolver.map,
        diagnostics: resolver.diagnostics,
    }
}

struct Resolver<'a> {
    input: &'a ResolveInput<'a>,
    uses: &'a FunctionUses,
    map: OwnershipMap,
    /// Uses and rebinds per name, in program order.
    events: FxHashMap<&'a str, Vec<Event>>,
    clone_sites: Vec<(&'a UseSite, CloneReason)>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Resolver<'a> {
    fn new(input: &'a ResolveInput<'a>) -> Self {
        let uses = input.uses;
        let mut events: FxHashMap<&str, Vec<Event>> = FxHashMap::default();
        for site in &uses.sites {
            if let Subject::Name(name) = &site.subject {
                events.entry(name.as_str()).or_default().push(Event {
                    order: site.order,
                    is_use: true,
                });
            }
        }
        for bind in &uses.binds {
            events.entry(bind.name.as_str()).or_default().push(Event {
                order: bind.order,
                is_use: false,
            });
        }
        for list in events.values_mut() {
            list.sort_by_key(|e| e.order);
        }

        Resolver {
            input,
            uses,
            map: OwnershipMap::default(),
            events,
            clone_sites: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    fn demand(&self, site: &UseSite) -> Demand {
        self.input.modes.demand(&site.position)
    }

    fn is_param(&self, name: &str) -> bool {
        self.uses.param_index(name).is_some()
    }

    fn is_binding(&self, name: &str) -> bool {
        self.is_param(name) || self.map.bindings.contains_key(name)
    }

    // Tags

    fn params(&mut self) {
        let uses = self.uses;
        let signature = self.input.modes.signature(&uses.key);
        for (i, (name, ty)) in uses.params.iter().enumerate() {
            let mode = signature
                .and_then(|s| s.params.get(i))
                .map_or(ParamMode::ByValue, |(_, m)| *m);
            self.map.params.push(ParamOwnership {
                name: name.clone(),
                mode,
                tag: mode.tag(),
            });
            let rebound = uses.binds_of(name).next().is_some();
            if mode.is_borrow() && rebound && ty.is_heap() {
                self.map.copied_params.insert(name.clone());
            }
        }
        self.map.receiver = signature.and_then(|s| s.receiver);
    }

    fn locals(&mut self) {
        let uses = self.uses;
        for bind in &uses.binds {
            if !self.is_param(&bind.name) {
                self.map
                    .bindings
                    .entry(bind.name.clone())
                    .or_insert(OwnershipTag::Owned);
            }
        }
    }

    /// Names whose value is returned or stored into `self`, directly or
    /// through other locals.
    fn escapes(&mut self) {
        let uses = self.uses;
        let mut flows: Vec<(&str, &SinkTarget)> = Vec::new();
        for site in &uses.sites {
            let (Subject::Name(name), Position::Consume(sink)) = (&site.subject, &site.position)
            else {
                continue;
            };
            for target in sink {
                flows.push((name.as_str(), target));
            }
        }
        for bind in &uses.binds {
            if bind.name.starts_with("self.") {
                self.map.escapes.insert(bind.name.clone());
            }
        }

        loop {
            let mut changed = false;
            for (name, target) in &flows {
                let escapes = match target {
                    SinkTarget::Return | SinkTarget::SelfField => true,
                    SinkTarget::Local(local) => self.map.escapes.contains(local.as_str()),
                    SinkTarget::Discard => false,
                };
                if escapes && self.is_binding(name) && self.map.escapes.insert((*name).to_string())
                {
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
    }

    // Clones

    fn clone_sites(&mut self) {
        let uses = self.uses;
        for site in &uses.sites {
            if !site.heap || self.demand(site) != Demand::Consume {
                continue;
            }
            let reason = match &site.subject {
                Subject::Name(name) => {
                    if !self.is_binding(name) {
                        continue;
                    }
                    if self.map.is_borrowed_param(name) {
                        Some(CloneReason::Borrowed)
                    } else if self.live_after(site, name) {
                        Some(CloneReason::StaysLive)
                    } else {
                        None
                    }
                }
                Subject::SelfField(_) | Subject::SelfValue | Subject::Element(_) | Subject::Field(_) => {
                    Some(CloneReason::Projection)
                }
            };
            if let Some(reason) = reason {
                self.map.clones.insert(site.node);
                self.clone_sites.push((site, reason));
            }
        }
    }

    /// Whether `name` is needed again after the move at `site`.
    fn live_after(&self, site: &UseSite, name: &str) -> bool {
        let next = self
            .events
            .get(name)
            .and_then(|events| events.iter().find(|e| e.order > site.order));
        if next.is_some_and(|e| e.is_use) {
            return true;
        }
        if site.position.returns() {
            return false;
        }
        // Moved inside a loop the binding was made outside of: the next
        // iteration needs it again.
        let declared: &[u32] = match self.uses.binds_of(name).next() {
            Some(bind) if !self.is_param(name) => bind.loops.as_slice(),
            _ => &[],
        };
        site.loops.iter().any(|l| !declared.contains(l))
    }

    // Mutability

    fn mutability(&mut self) {
        let uses = self.uses;
        let mut counts: FxHashMap<&str, usize> = FxHashMap::default();
        for bind in &uses.binds {
            if bind.value == BindValue::ComprehensionTarget {
                continue;
            }
            *counts.entry(bind.name.as_str()).or_default() += 1;
            // Assigned on every iteration of a loop it was not declared in.
            if !bind.loops.is_empty() && bind.value != BindValue::LoopTarget {
                self.map.mutable.insert(bind.name.clone());
            }
        }
        for (name, count) in counts {
            if count > 1 || self.is_param(name) {
                self.map.mutable.insert(name.to_string());
            }
        }

        for site in &uses.sites {
            if self.demand(site) != Demand::Mutate {
                continue;
            }
            let name = match &site.subject {
                Subject::Name(name) if self.is_binding(name) => name.clone(),
                Subject::SelfField(field) if uses.is_init => format!("self.{field}"),
                _ => continue,
            };
            self.map.mutable.insert(name);
        }

        // `&mut` parameters change through the reference.
        for param in &self.map.params {
            if param.mode.is_borrow() && !self.map.copied_params.contains(&param.name) {
                self.map.mutable.remove(&param.name);
            }
        }
    }

    /// Heap `for` targets bound by a single loop and never moved, changed
    /// or returned.
    fn loop_borrows(&mut self) {
        let uses = self.uses;
        for bind in &uses.binds {
            let name = bind.name.as_str();
            if bind.value != BindValue::LoopTarget
                || self.is_param(name)
                || uses.binds_of(name).count() != 1
                || self.map.mutable.contains(name)
                || self.map.escapes.contains(name)
                || !matches!(self.map.bindings.get(name), Some(OwnershipTag::Owned))
            {
                continue;
            }
            if !self.input.typed.local(name).is_some_and(|l| l.ty.is_heap()) {
                continue;
            }
            if uses.sites_of(name).all(|site| self.demand(site) == Demand::Read) {
                self.map.loop_borrows.insert(name.to_string());
            }
        }
    }

    // Pragmas

    /// `ownership = "owned"`: a value that would need a second owner is a
    /// conflict.
    fn owned(&mut self) {
        for (site, reason) in &self.clone_sites {
            let message = match (&site.subject, reason) {
                (Subject::Name(name), CloneReason::StaysLive) => {
                    format!("`{name}` is moved here but used again afterwards")
                }
                (Subject::SelfField(field), _) => {
                    format!("`self.{field}` would be owned by both `self` and this value")
                }
                (Subject::SelfValue, _) => {
                    "`self` would be owned by both the caller and this value".to_string()
                }
                (Subject::Element(Some(root)), _) if self.source_stays_live(site, root) => {
                    format!("an element of `{root}` is read out while `{root}` is still in use")
                }
                (Subject::Field(Some(root)), _) if self.source_stays_live(site, root) => {
                    format!("a field of `{root}` is read out while `{root}` is still in use")
                }
                _ => continue,
            };
            self.diagnostics.push(
                conflict(site.span, message)
                    .with_label("needs a second owner")
                    .with_note("ownership = \"owned\" forbids implicit clones")
                    .with_suggestion("copy the value explicitly or use ownership = \"shared\""),
            );
        }
    }

    /// Whether the container a projection reads from outlives `site`.
    fn source_stays_live(&self, site: &UseSite, root: &str) -> bool {
        root == "self" || (self.is_binding(root) && self.live_after(site, root))
    }

    /// `ownership = "shared"`: locals that would be cloned become reference
    /// counted instead.
    fn shared(&mut self) {
        let uses = self.uses;
        let kind = match self.input.pragmas.thread_safety() {
            ThreadSafety::Required => SharedKind::Arc,
            ThreadSafety::NotRequired => SharedKind::Rc,
        };

        let mut shared: FxHashSet<String> = FxHashSet::default();
        for (site, reason) in &self.clone_sites {
            if let (Subject::Name(name), CloneReason::StaysLive) = (&site.subject, reason) {
                if self.shareable(name) {
                    shared.insert(name.clone());
                }
            }
        }
        // Aliases of a shared value hold the same pointer.
        loop {
            let mut changed = false;
            for bind in &uses.binds {
                if let BindValue::Alias(source) = &bind.value {
                    let linked = shared.contains(source) || shared.contains(&bind.name);
                    if linked && self.shareable(&bind.name) && self.shareable(source) {
                        changed |= shared.insert(bind.name.clone());
                        changed |= shared.insert(source.clone());
                    }
                }
            }
            if !changed {
                break;
            }
        }

        for site in &uses.sites {
            let Subject::Name(name) = &site.subject else {
                continue;
            };
            if shared.contains(name) && self.demand(site) == Demand::Mutate {
                self.diagnostics.push(
                    conflict(site.span, format!("shared value `{name}` is mutated"))
                        .with_label("changes a value other bindings still point to")
                        .with_note(format!(
                            "`{name}` is an `{}` because it is used after being moved",
                            kind.as_str()
                        ))
                        .with_suggestion("build a new value instead of changing it in place"),
                );
            }
        }

        for name in shared {
            self.map.mutable.remove(&name);
            self.map.bindings.insert(name, OwnershipTag::Shared(kind));
        }
    }

    fn shareable(&self, name: &str) -> bool {
        !self.is_param(name)
            && !name.starts_with("self.")
            && self.map.bindings.contains_key(name)
            && self.uses.binds_of(name).all(|b| {
                !matches!(
                    b.value,
                    BindValue::LoopTarget | BindValue::ComprehensionTarget
                )
            })
    }

    /// `memory_strategy = "arena"`.
    fn arena(&mut self) {
        let uses = self.uses;
        let pool = self.input.pool;
        let typed = self.input.typed;

        let mut arena: FxHashSet<&str> = FxHashSet::default();
        for bind in &uses.binds {
            let pooled = matches!(
                typed.local(&bind.name).map(|l| &l.ty),
                Some(RustType::Vec(_) | RustType::HashMap(..))
            );
            if pooled && matches!(bind.value, BindValue::Allocation { .. }) {
                arena.insert(bind.name.as_str());
            }
        }

        for name in &arena {
            // Returned or stored allocations leave the pool.
            let tag = if self.map.escapes.contains(*name) {
                OwnershipTag::Owned
            } else {
                OwnershipTag::Arena { pool }
            };
            self.map.bindings.insert((*name).to_string(), tag);
        }

        for bind in &uses.binds {
            let BindValue::Alias(source) = &bind.value else {
                continue;
            };
            let alias = bind.name.as_str();
            if !arena.contains(source.as_str())
                || self.is_param(alias)
                || uses.binds_of(alias).count() != 1
            {
                continue;
            }
            self.map.bindings.insert(
                alias.to_string(),
                OwnershipTag::Borrowed {
                    scope: BorrowScope::Arena(pool),
                    mutable: false,
                },
            );
            self.map.mutable.remove(alias);
            // The alias borrows instead of copying.
            for site in uses.sites_of(source) {
                let into_alias = matches!(&site.position, Position::Consume(sink)
                    if sink.iter().any(|t| matches!(t, SinkTarget::Local(l) if l == alias)));
                if into_alias {
                    self.map.clones.remove(&site.node);
                }
            }

            if self.map.escapes.contains(alias) {
                self.diagnostics.push(
                    conflict(bind.span, format!("`{alias}` borrows arena memory and escapes"))
                        .with_label("borrowed from this function's arena")
                        .with_note(format!(
                            "`{source}` is released with the arena when the function returns"
                        ))
                        .with_suggestion(format!("return `{source}` itself")),
                );
            }
            for site in uses.sites_of(alias) {
                if self.demand(site) == Demand::Mutate {
                    self.diagnostics.push(
                        conflict(site.span, format!("`{alias}` is a shared borrow of arena memory"))
                            .with_label("cannot change the arena value through this alias")
                            .with_suggestion(format!("change `{source}` directly")),
                    );
                }
            }
        }
    }

    /// `memory_strategy = "stack"`: single-assignment scalar list literals
    /// that never grow, move or escape become arrays.
    fn stack(&mut self) {
        let uses = self.uses;
        for bind in &uses.binds {
            let BindValue::Allocation {
                scalar_len: Some(len),
            } = bind.value
            else {
                continue;
            };
            let name = bind.name.as_str();
            if self.is_param(name)
                || name.starts_with("self.")
                || uses.binds_of(name).count() != 1
                || self.map.escapes.contains(name)
            {
                continue;
            }
            if uses.sites_of(name).all(|s| self.demand(s) == Demand::Read) {
                self.map.mutable.remove(name);
                self.map.stack_arrays.insert(name.to_string(), len);
            }
        }
    }

    fn class_conflict(&mut self) {
        let class_owned =
            self.input.class_pragmas.and_then(PragmaSet::ownership) == Some(Ownership::Owned);
        if class_owned && self.input.pragmas.ownership() == Some(Ownership::Shared) {
            self.diagnostics.push(
                conflict(
                    self.uses.name_span,
                    "method asks for shared ownership inside an owned class",
                )
                .with_label("ownership = \"shared\" on this method")
                .with_note("the class pragma makes every instance uniquely owned")
                .with_suggestion("drop the method pragma or make the class shared"),
            );
        }
    }
}

fn conflict(span: Span, message: impl Into<String>) -> Diagnostic {
    Diagnostic::new(DiagnosticKind::OwnershipConflict, span).with_message(message)
}

#[cfg(test)]
mod tests;
