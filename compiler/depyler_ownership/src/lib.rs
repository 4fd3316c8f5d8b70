//! Ownership and memory-strategy resolution.
//!
//! Decides how every value in a typed function is held in the generated
//! Rust: parameter passing modes (`T`, `&T`, `&mut T`), receiver kinds
//! (`&self`, `&mut self`), where clones go, which bindings are `mut`, and
//! what the `ownership`/`memory_strategy` pragmas turn bindings into.
//!
//! # Pipeline
//!
//! 1. [`collect_uses`]: one walk per function into a [`FunctionUses`]
//!    summary (reads, in-place changes, moves, argument passing, bindings).
//! 2. [`infer_modes`]: a module-wide monotone fixed point over parameter and
//!    receiver modes, so a caller sees what its callees need.
//! 3. [`resolve`]: per function, clone sites, mutability, escapes and
//!    tags, plus an `OwnershipConflict` wherever a pragma rules out what
//!    the function does.
//!
//! [`resolve_module`] runs all three for a module.

mod modes;
mod resolve;
mod tag;
mod uses;

#[cfg(test)]
mod test_support;

use depyler_ir::ast::FunctionDef;
use depyler_pragma::PragmaSet;
use depyler_types::TypedFunction;

pub use modes::{infer_modes, Demand, ModuleModes, Signature};
pub use resolve::{resolve, OwnershipMap, ParamOwnership, Resolution, ResolveInput};
pub use tag::{BorrowScope, OwnershipTag, ParamMode, PoolId, ReceiverMode, SharedKind};
pub use uses::{
    collect_uses, function_key, ArgSlot, BindSite, BindValue, FunctionUses, Position, Sink,
    SinkTarget, Subject, UseSite,
};

/// One function of a module as ownership resolution sees it.
pub struct OwnershipInput<'a> {
    pub function: &'a FunctionDef,
    pub typed: &'a TypedFunction,
    /// Effective pragmas, class entries already inherited.
    pub pragmas: &'a PragmaSet,
    /// Pragmas of the enclosing class, for methods.
    pub class_pragmas: Option<&'a PragmaSet>,
}

/// Resolve every function of a module. Results are in input order; each
/// function gets its own arena pool.
#[tracing::instrument(level = "debug", skip_all, fields(functions = inputs.len()))]
pub fn resolve_module(inputs: &[OwnershipInput<'_>]) -> (ModuleModes, Vec<Resolution>) {
    let uses: Vec<FunctionUses> = inputs
        .iter()
        .map(|input| collect_uses(input.function, input.typed, input.pragmas.ownership()))
        .collect();
    let modes = infer_modes(&uses);

    let resolutions = inputs
        .iter()
        .zip(&uses)
        .enumerate()
        .map(|(i, (input, uses))| {
            resolve(&ResolveInput {
                uses,
                typed: input.typed,
                modes: &modes,
                pragmas: input.pragmas,
                class_pragmas: input.class_pragmas,
                pool: PoolId(u32::try_from(i).unwrap_or(u32::MAX)),
            })
        })
        .collect();
    (modes, resolutions)
}
