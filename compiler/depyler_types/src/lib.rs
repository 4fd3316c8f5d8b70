//! Type inference for Depyler.
//!
//! Every Python expression of a supported function gets exactly one concrete
//! [`RustType`]. Inference runs per function against a [`ModuleContext`]
//! holding the signatures, classes, constants and imports of the module:
//!
//! 1. [`ModuleContext::build`] collects what the module declares.
//! 2. `__init__` methods are inferred first; the fields they assign complete
//!    the class registry ([`ClassRegistry::complete_fields`]).
//! 3. Every other function and method is inferred independently with
//!    [`infer_function`], so callers may run them in parallel.
//!
//! Nothing is ever left as an inference variable: an expression whose type
//! cannot be determined is reported as a `TypeUnificationError` and typed
//! [`RustType::Unresolved`].

mod annotation;
mod builtins;
mod classes;
mod context;
mod infer;
mod ty;
mod unify;
mod width;

#[cfg(test)]
mod test_support;

pub use annotation::{lower_annotation, AnnotationScope};
pub use builtins::{Builtin, BuiltinTable, MathMember, Method, Receiver};
pub use classes::{ClassInfo, ClassRegistry, FieldInfo};
pub use context::{Constant, FunctionSig, ModuleContext, ParamSig};
pub use infer::{
    always_exits, infer_function, CallTarget, FunctionInput, IndexCheck, Inference, Local,
    Provenance, TypeTable, TypedFunction, TypedNode,
};
pub use ty::{IntKind, RustType, TypeVar};
pub use unify::{Mismatch, Unifier};
pub use width::select_int_kind;
