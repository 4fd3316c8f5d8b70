//! The per-module pipeline.
//!
//! ```text
//! source ──► parse ──► pragmas ──► sweep ──► ModuleContext
//!                                               │
//!            __init__ inference ──► class fields completed
//!                                               │
//!            method/function inference (parallel)
//!                                               │
//!            ownership (module-wide modes, per-function maps)
//!                                               │
//!            lowering (parallel) ──► assembly ──► Rust + source map
//! ```
//!
//! The compilation unit is the function. A unit that collects a fatal
//! diagnostic skips the remaining stages and is left out of the module;
//! its siblings carry on. Only a syntax error stops the whole module.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use depyler_codegen::{
    assemble_module, lower_function, FunctionUnit, LoweredFunction, ModuleView, SourceMap,
};
use depyler_diagnostic::{Diagnostic, DiagnosticBag, Severity, SourceFile};
use depyler_ir::ast::{ClassDef, FunctionDef, Item, Module, NodeId};
use depyler_ownership::{function_key, resolve_module, OwnershipInput, OwnershipMap};
use depyler_pragma::PragmaSet;
use depyler_types::{infer_function, FunctionInput, Inference, ModuleContext, TypedFunction};
use rayon::prelude::*;
use rustc_hash::FxHashMap;

use crate::validate::{self, CompileResult};
use crate::{CompilerConfig, DriverError};

/// Cooperative cancellation, checked between stages.
///
/// Clones share the flag, so one token can stop a whole batch.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    fn check(&self, path: &Path) -> Result<(), DriverError> {
        if self.is_cancelled() {
            tracing::debug!(path = %path.display(), "cancelled");
            return Err(DriverError::Cancelled {
                path: path.to_path_buf(),
            });
        }
        Ok(())
    }
}

/// Outcome of one function, method or constructor.
#[derive(Clone, Debug)]
pub struct FunctionOutput {
    /// `f` or `Class.method`.
    pub key: String,
    /// 1-based line of the `def`.
    pub line: u32,
    pub result: CompileResult,
}

/// Everything compiling one Python file produced.
#[derive(Clone, Debug)]
pub struct ModuleOutput {
    pub path: PathBuf,
    pub file: SourceFile,
    /// `None` when the file does not parse.
    pub rust: Option<String>,
    /// Present when requested and the module was assembled.
    pub source_map: Option<SourceMap>,
    /// In compilation order: per class, `__init__` before the other methods.
    pub functions: Vec<FunctionOutput>,
    /// Module-level diagnostics plus those of every function, sorted by
    /// position.
    pub diagnostics: Vec<Diagnostic>,
}

impl ModuleOutput {
    /// Whether every unit of the module compiled.
    pub fn succeeded(&self) -> bool {
        self.rust.is_some() && !self.diagnostics.iter().any(Diagnostic::is_fatal)
    }

    pub fn function(&self, key: &str) -> Option<&FunctionOutput> {
        self.functions.iter().find(|f| f.key == key)
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_error()).count()
    }

    pub fn warning_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .count()
    }
}

/// One compilation unit on its way through the stages.
struct Unit<'m> {
    function: &'m FunctionDef,
    class: Option<&'m ClassDef>,
    class_pragmas: Option<PragmaSet>,
    /// Effective pragmas, class entries inherited.
    pragmas: PragmaSet,
    diagnostics: Vec<Diagnostic>,
    typed: Option<TypedFunction>,
    ownership: Option<OwnershipMap>,
    lowered: Option<LoweredFunction>,
}

impl Unit<'_> {
    fn failed(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_fatal)
    }

    fn is_init(&self) -> bool {
        self.class.is_some() && self.function.name == "__init__"
    }

    fn key(&self) -> String {
        function_key(self.class.map(|c| c.name.as_str()), &self.function.name)
    }
}

/// Every function and method of `module`, `__init__` first per class.
///
/// Pragma problems of a function stay with its unit; those of a class go
/// to the module.
fn collect_units<'m>(module: &'m Module, module_diagnostics: &mut DiagnosticBag) -> Vec<Unit<'m>> {
    let unit = |function: &'m FunctionDef, class: Option<&'m ClassDef>, class_pragmas: Option<&PragmaSet>| {
        let own = depyler_pragma::extract(&function.pragmas);
        let pragmas = match class_pragmas {
            Some(parent) => own.pragmas.inherit(parent),
            None => own.pragmas,
        };
        Unit {
            function,
            class,
            class_pragmas: class_pragmas.cloned(),
            pragmas,
            diagnostics: own.diagnostics,
            typed: None,
            ownership: None,
            lowered: None,
        }
    };

    let mut units = Vec::new();
    for item in &module.items {
        match item {
            Item::Function(function) => units.push(unit(function, None, None)),
            Item::Class(class) => {
                let extracted = depyler_pragma::extract(&class.pragmas);
                module_diagnostics.extend(extracted.diagnostics);
                let init = class.methods.iter().filter(|m| m.name == "__init__");
                let rest = class.methods.iter().filter(|m| m.name != "__init__");
                for method in init.chain(rest) {
                    units.push(unit(method, Some(class), Some(&extracted.pragmas)));
                }
            }
            Item::Import(_) | Item::Statement(_) => {}
        }
    }
    units
}

/// Infer either the constructors or everything else.
fn infer_units(units: &mut [Unit<'_>], ctx: &ModuleContext, constructors: bool) {
    units
        .par_iter_mut()
        .filter(|unit| unit.is_init() == constructors && !unit.failed())
        .for_each(|unit| {
            let Inference { typed, diagnostics } = infer_function(&FunctionInput {
                function: unit.function,
                class: unit.class,
                pragmas: &unit.pragmas,
                context: ctx,
            });
            unit.diagnostics.extend(diagnostics);
            if !unit.failed() {
                let found = validate::check_after_inference(unit.function, &typed);
                unit.diagnostics.extend(found);
            }
            unit.typed = Some(typed);
        });
}

/// Compile one Python module.
#[tracing::instrument(level = "debug", skip_all, fields(path = %path.display()))]
pub fn compile_source(
    path: &Path,
    source: &str,
    config: &CompilerConfig,
    token: &CancellationToken,
) -> Result<ModuleOutput, DriverError> {
    token.check(path)?;
    let file = SourceFile::new(path.display().to_string(), source);
    let mut module_diagnostics = DiagnosticBag::new();

    let parsed = depyler_parse::parse(source);
    let syntax_error = parsed.has_syntax_errors();
    module_diagnostics.extend(parsed.diagnostics);
    if syntax_error {
        tracing::debug!("module does not parse");
        module_diagnostics.sort();
        return Ok(ModuleOutput {
            path: path.to_path_buf(),
            file,
            rust: None,
            source_map: None,
            functions: Vec::new(),
            diagnostics: module_diagnostics.into_vec(),
        });
    }
    let module = parsed.module;

    let mut units = collect_units(&module, &mut module_diagnostics);
    for unit in &mut units {
        let found = validate::check_before_inference(unit.function);
        unit.diagnostics.extend(found);
    }

    let pragmas: FxHashMap<NodeId, PragmaSet> = units
        .iter()
        .map(|unit| (unit.function.id, unit.pragmas.clone()))
        .collect();
    let mut ctx = ModuleContext::build(&module, source, &pragmas);
    for class in module.classes() {
        if let Some(info) = ctx.class(&class.name) {
            module_diagnostics.extend(info.errors.iter().cloned());
        }
    }

    // Constructors decide the fields every other method sees.
    token.check(path)?;
    infer_units(&mut units, &ctx, true);
    for unit in units.iter().filter(|unit| unit.is_init()) {
        if let (Some(class), Some(typed)) = (unit.class, &unit.typed) {
            let assigned: Vec<_> = typed
                .fields
                .iter()
                .map(|f| (f.name.clone(), f.ty.clone(), f.span))
                .collect();
            ctx.classes.complete_fields(&class.name, &assigned);
        }
    }
    infer_units(&mut units, &ctx, false);

    token.check(path)?;
    let (modes, resolutions) = {
        let inputs: Vec<OwnershipInput<'_>> = units
            .iter()
            .filter(|unit| !unit.failed())
            .filter_map(|unit| {
                Some(OwnershipInput {
                    function: unit.function,
                    typed: unit.typed.as_ref()?,
                    pragmas: &unit.pragmas,
                    class_pragmas: unit.class_pragmas.as_ref(),
                })
            })
            .collect();
        resolve_module(&inputs)
    };
    let resolved = units
        .iter_mut()
        .filter(|unit| !unit.failed() && unit.typed.is_some());
    for (unit, resolution) in resolved.zip(resolutions) {
        unit.diagnostics.extend(resolution.diagnostics);
        unit.ownership = Some(resolution.map);
    }

    token.check(path)?;
    let view = ModuleView::new(&module, &ctx, &modes, source, config.codegen_options());
    units
        .par_iter_mut()
        .filter(|unit| !unit.failed())
        .for_each(|unit| {
            let (Some(typed), Some(ownership)) = (&unit.typed, &unit.ownership) else {
                return;
            };
            let lowered = lower_function(
                &view,
                &FunctionUnit {
                    function: unit.function,
                    class: unit.class,
                    typed,
                    ownership,
                    pragmas: &unit.pragmas,
                },
            );
            unit.diagnostics.extend(lowered.diagnostics.iter().cloned());
            if !lowered.has_fatal() {
                let found = validate::check_after_codegen(unit.function, &lowered);
                unit.diagnostics.extend(found);
            }
            unit.lowered = Some(lowered);
        });

    token.check(path)?;
    let survivors: Vec<LoweredFunction> = units
        .iter()
        .filter(|unit| !unit.failed())
        .filter_map(|unit| unit.lowered.clone())
        .collect();
    let assembled = assemble_module(&view, &survivors);
    let source_map = config
        .source_map
        .then(|| SourceMap::new(path.display().to_string(), &assembled));

    let functions: Vec<FunctionOutput> = units
        .into_iter()
        .map(|unit| {
            let key = unit.key();
            let line = file.line_of(unit.function.name_span);
            let rust = unit.lowered.map(|lowered| lowered.code);
            let result = validate::validate(unit.diagnostics, rust);
            if !result.ok {
                tracing::debug!(function = %key, "function failed");
            }
            FunctionOutput { key, line, result }
        })
        .collect();

    let mut diagnostics = module_diagnostics;
    for function in &functions {
        diagnostics.extend(function.result.diagnostics.iter().cloned());
    }
    diagnostics.sort();
    tracing::debug!(
        functions = functions.len(),
        failed = functions.iter().filter(|f| !f.result.ok).count(),
        "module compiled"
    );
    Ok(ModuleOutput {
        path: path.to_path_buf(),
        file,
        rust: Some(assembled.code),
        source_map,
        functions,
        diagnostics: diagnostics.into_vec(),
    })
}

/// Read and compile one file.
pub fn compile_file(
    path: &Path,
    config: &CompilerConfig,
    token: &CancellationToken,
) -> Result<ModuleOutput, DriverError> {
    let source = fs::read_to_string(path).map_err(|source| DriverError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    compile_source(path, &source, config, token)
}

/// Compile several files in parallel on `config.jobs` threads.
///
/// Results are in input order. A file that cannot be read or is cancelled
/// does not affect the others.
pub fn compile_batch(
    paths: &[PathBuf],
    config: &CompilerConfig,
    token: &CancellationToken,
) -> Result<Vec<Result<ModuleOutput, DriverError>>, DriverError> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.jobs)
        .build()
        .map_err(|source| DriverError::ThreadPool {
            jobs: config.jobs,
            source,
        })?;
    Ok(pool.install(|| {
        paths
            .par_iter()
            .map(|path| compile_file(path, config, token))
            .collect()
    }))
}

#[cfg(test)]
mod tests;
