//! Runs the whole pipeline so tests can start from Python source text.

use depyler_ir::ast::{ClassDef, FunctionDef, Item, Module, NodeId};
use depyler_ownership::{resolve_module, OwnershipInput};
use depyler_pragma::PragmaSet;
use depyler_types::{infer_function, FunctionInput, Inference, ModuleContext};
use rustc_hash::FxHashMap;

use crate::{
    assemble_module, lower_function, CodegenOptions, FunctionUnit, LoweredFunction,
    LoweredModule, ModuleView,
};

pub(crate) struct Lowered {
    pub(crate) functions: Vec<LoweredFunction>,
    pub(crate) module: LoweredModule,
}

impl Lowered {
    pub(crate) fn function(&self, key: &str) -> &LoweredFunction {
        self.functions
            .iter()
            .find(|f| f.key == key)
            .unwrap_or_else(|| panic!("no function `{key}` in test source"))
    }

    /// Code of one function, without indentation.
    pub(crate) fn code(&self, key: &str) -> String {
        let function = self.function(key);
        assert!(
            !function.has_fatal(),
            "lowering of `{key}` failed: {:?}",
            function.diagnostics
        );
        function
            .code
            .lines()
            .map(str::trim)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Messages of the diagnostics lowering `key` produced.
    #[allow(dead_code)]
    pub(crate) fn errors(&self, key: &str) -> Vec<&str> {
        self.function(key)
            .diagnostics
            .iter()
            .map(|d| d.message.as_str())
            .collect()
    }
}

fn parse_module(source: &str) -> Module {
    let output = depyler_parse::parse(source);
    assert!(
        !output.has_syntax_errors(),
        "test source failed to parse: {:?}",
        output.diagnostics
    );
    output.module
}

struct Entry<'m> {
    function: &'m FunctionDef,
    class: Option<&'m ClassDef>,
    class_pragmas: Option<PragmaSet>,
}

/// Every function and method of `module`, `__init__` first per class.
fn entries(module: &Module) -> Vec<Entry<'_>> {
    let mut out = Vec::new();
    for item in &module.items {
        match item {
            Item::Function(f) => out.push(Entry {
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

pub(crate) fn lower_source(source: &str) -> Lowered {
    lower_source_with(source, CodegenOptions::default())
}

/// Parse, infer, resolve and lower `source`. Inference and ownership must
/// succeed; lowering diagnostics are kept on the functions.
pub(crate) fn lower_source_with(source: &str, options: CodegenOptions) -> Lowered {
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
                entry.function.name,
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
    for resolution in &resolutions {
        assert!(
            resolution.diagnostics.is_empty(),
            "ownership conflict: {:?}",
            resolution.diagnostics
        );
    }

    let view = ModuleView::new(&module, &ctx, &modes, source, options);
    let functions: Vec<LoweredFunction> = entries
        .iter()
        .zip(&inferred)
        .zip(&resolutions)
        .map(|((entry, inference), resolution)| {
            let unit = FunctionUnit {
                function: entry.function,
                class: entry.class,
                typed: &inference.typed,
                ownership: &resolution.map,
                pragmas: pragmas.get(&entry.function.id).unwrap_or(&empty),
            };
            lower_function(&view, &unit)
        })
        .collect();
    let module = assemble_module(&view, &functions);
    Lowered { functions, module }
}

/// The assembled module of `source`.
pub(crate) fn rust_of(source: &str) -> String {
    lower_source(source).module.code
}
