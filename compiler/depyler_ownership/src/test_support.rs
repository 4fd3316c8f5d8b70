//! Runs the front end and inference so tests can start from source text.

use depyler_ir::ast::{FunctionDef, Item, Module, NodeId};
use depyler_pragma::PragmaSet;
use depyler_types::{infer_function, FunctionInput, Inference, ModuleContext};
use rustc_hash::FxHashMap;

use crate::{
    collect_uses, resolve_module, FunctionUses, ModuleModes, OwnershipInput, OwnershipMap,
    Resolution,
};

pub(crate) struct Resolved {
    pub(crate) modes: ModuleModes,
    pub(crate) functions: Vec<(String, Resolution)>,
    pub(crate) uses: Vec<FunctionUses>,
}

impl Resolved {
    pub(crate) fn get(&self, key: &str) -> &Resolution {
        self.functions
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, r)| r)
            .unwrap_or_else(|| panic!("no function `{key}` in test source"))
    }

    pub(crate) fn map(&self, key: &str) -> &OwnershipMap {
        &self.get(key).map
    }

    pub(crate) fn uses(&self, key: &str) -> &FunctionUses {
        self.uses
            .iter()
            .find(|u| u.key == key)
            .unwrap_or_else(|| panic!("no function `{key}` in test source"))
    }

    pub(crate) fn conflicts(&self, key: &str) -> Vec<&str> {
        self.get(key)
            .diagnostics
            .iter()
            .map(|d| d.message.as_str())
            .collect()
    }
}

pub(crate) fn parse_module(source: &str) -> Module {
    let output = depyler_parse::parse(source);
    assert!(
        !output.has_syntax_errors(),
        "test source failed to parse: {:?}",
        output.diagnostics
    );
    output.module
}

struct Entry<'m> {
    key: String,
    function: &'m FunctionDef,
    class: Option<&'m depyler_ir::ast::ClassDef>,
    class_pragmas: Option<PragmaSet>,
}

/// Every function and method of `module`, `__init__` first per class.
fn entries(module: &Module) -> Vec<Entry<'_>> {
    let mut out = Vec::new();
    for item in &module.items {
        match item {
            Item::Function(f) => out.push(Entry {
                key: f.name.clone(),
                function: f,
                class: None,
                class_pragmas: None,
            }),
            Item::Class(class) => {
                let class_set = depyler_pragma::extract(&class.pragmas).pragmas;
                let init = class.methods.iter().filter(|m| m.name == "__init__");
                let rest = class.methods.iter().filter(|m| m.name != "__init__");
                for method in init.chain(rest) {
                    out.push(Entry {
                        key: format!("{}.{}", class.name, method.name),
                        function: method,
                        class: Some(class),
                        class_pragmas: Some(class_set.clone()),
                    });
                }
            }
            _ => {}
        }
    }
    out
}

/// Parse, infer and resolve `source`. Inference must succeed.
pub(crate) fn resolve_source(source: &str) -> Resolved {
    let module = parse_module(source);
    let entries = entries(&module);

    let mut pragmas: FxHashMap<NodeId, PragmaSet> = FxHashMap::default();
    for entry in &entries {
        let own = depyler_pragma::extract(&entry.function.pragmas).pragmas;
        let effective = match &entry.class_pragmas {
            Some(class_set) => own.inherit(class_set),
            None => own,
        };
        pragmas.insert(entry.function.id, effective);
    }

    let mut ctx = ModuleContext::build(&module, source, &pragmas);
    let empty = PragmaSet::default();
    let mut inferred: Vec<Option<Inference>> = entries.iter().map(|_| None).collect();
    // Field types come from `__init__`, so constructors go first.
    for init_pass in [true, false] {
        for (slot, entry) in inferred.iter_mut().zip(&entries) {
            if (entry.function.name == "__init__" && entry.class.is_some()) != init_pass {
                continue;
            }
            let input = FunctionInput {
                function: entry.function,
                class: entry.class,
                pragmas: pragmas.get(&entry.function.id).unwrap_or(&empty),
                context: &ctx,
            };
            let inference = infer_function(&input);
            assert!(
                !inference.has_fatal(),
                "inference of `{}` failed: {:?}",
                entry.key,
                inference.diagnostics
            );
            if let Some(class) = entry.class.filter(|_| init_pass) {
                let assigned: Vec<_> = inference
                    .typed
                    .fields
                    .iter()
                    .map(|f| (f.name.clone(), f.ty.clone(), f.span))
                    .collect();
                ctx.classes.complete_fields(&class.name, &assigned);
            }
            *slot = Some(inference);
        }
    }
    let inferred: Vec<Inference> = inferred.into_iter().flatten().collect();

    let inputs: Vec<OwnershipInput<'_>> = entries
        .iter()
        .zip(&inferred)
        .map(|(entry, inference)| OwnershipInput {
            function: entry.function,
            typed: &inference.typed,
            pragmas: pragmas.get(&entry.function.id).unwrap_or(&empty),
            class_pragmas: entry.class_pragmas.as_ref(),
        })
        .collect();
    let (modes, resolutions) = resolve_module(&inputs);
    let uses = inputs
        .iter()
        .map(|i| collect_uses(i.function, i.typed, i.pragmas.ownership()))
        .collect();

    Resolved {
        modes,
        functions: entries.into_iter().map(|e| e.key).zip(resolutions).collect(),
        uses,
    }
}
