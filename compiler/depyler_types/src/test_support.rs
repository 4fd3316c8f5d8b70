//! Parsing helpers shared by the unit tests.

use depyler_ir::ast::{FunctionDef, Item, Module, NodeId};
use depyler_pragma::PragmaSet;
use rustc_hash::FxHashMap;

use crate::{infer_function, FunctionInput, Inference, ModuleContext};

pub(crate) fn parse_module(source: &str) -> Module {
    let output = depyler_parse::parse(source);
    assert!(
        !output.has_syntax_errors(),
        "test source failed to parse: {:?}",
        output.diagnostics
    );
    output.module
}

pub(crate) fn first_function(source: &str) -> FunctionDef {
    parse_module(source)
        .functions()
        .next()
        .cloned()
        .unwrap_or_else(|| panic!("no function in test source"))
}

pub(crate) fn pragmas_of(function: &FunctionDef) -> PragmaSet {
    depyler_pragma::extract(&function.pragmas).pragmas
}

/// Effective pragmas of every function and method, keyed by definition.
pub(crate) fn module_pragmas(module: &Module) -> FxHashMap<NodeId, PragmaSet> {
    let mut map = FxHashMap::default();
    for item in &module.items {
        match item {
            Item::Function(f) => {
                map.insert(f.id, pragmas_of(f));
            }
            Item::Class(class) => {
                let class_set = depyler_pragma::extract(&class.pragmas).pragmas;
                for method in &class.methods {
                    map.insert(method.id, pragmas_of(method).inherit(&class_set));
                }
            }
            _ => {}
        }
    }
    map
}

/// Infer every function of `source` in driver order, keyed by name
/// (`Class.method` for methods).
pub(crate) fn infer_source(source: &str) -> Vec<(String, Inference)> {
    let module = parse_module(source);
    let pragmas = module_pragmas(&module);
    let mut ctx = ModuleContext::build(&module, source, &pragmas);
    let empty = PragmaSet::default();
    let mut out = Vec::new();

    for class in module.classes() {
        if let Some(init) = class.method("__init__") {
            let input = FunctionInput {
                function: init,
                class: Some(class),
                pragmas: pragmas.get(&init.id).unwrap_or(&empty),
                context: &ctx,
            };
            let inference = infer_function(&input);
            let assigned: Vec<_> = inference
                .typed
                .fields
                .iter()
                .map(|f| (f.name.clone(), f.ty.clone(), f.span))
                .collect();
            ctx.classes.complete_fields(&class.name, &assigned);
            out.push((format!("{}.__init__", class.name), inference));
        }
    }
    for item in &module.items {
        match item {
            Item::Function(f) => {
                let input = FunctionInput {
                    function: f,
                    class: None,
                    pragmas: pragmas.get(&f.id).unwrap_or(&empty),
                    context: &ctx,
                };
                out.push((f.name.clone(), infer_function(&input)));
            }
            Item::Class(class) => {
                for method in class.methods.iter().filter(|m| m.name != "__init__") {
                    let input = FunctionInput {
                        function: method,
                        class: Some(class),
                        pragmas: pragmas.get(&method.id).unwrap_or(&empty),
                        context: &ctx,
                    };
                    out.push((format!("{}.{}", class.name, method.name), infer_function(&input)));
                }
            }
            _ => {}
        }
    }
    out
}

/// Inference of the function called `name`.
pub(crate) fn inferred<'a>(results: &'a [(String, Inference)], name: &str) -> &'a Inference {
    results
        .iter()
        .find(|(n, _)| n == name)
        .map(|(_, inference)| inference)
        .unwrap_or_else(|| panic!("no function `{name}` in test source"))
}
