//! Diagnostic system for the Depyler transpiler.
//!
//! Every phase reports problems as [`Diagnostic`] values:
//! - a [`DiagnosticKind`] with a stable code for `depyler explain`
//! - a clear message (what went wrong)
//! - a primary span (where it went wrong)
//! - labels, notes and help lines (why, and how to fix it)
//!
//! Diagnostics are data. Phases return them next to their results and the
//! driver decides per function whether output survives (see
//! [`DiagnosticKind::is_fatal`]).

mod bag;
mod diagnostic;
pub mod emitter;
pub mod errors;
mod kind;
mod source;

pub use bag::DiagnosticBag;
pub use diagnostic::{unsupported_construct, Diagnostic, Label, Severity};
pub use errors::ErrorDocs;
pub use kind::DiagnosticKind;
pub use source::SourceFile;
