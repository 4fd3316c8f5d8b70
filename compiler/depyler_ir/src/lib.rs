//! Depyler IR: the Python AST shared by every phase of the transpiler.
//!
//! # Contents
//!
//! - [`Span`] and [`LineIndex`]: source locations and their line/column form
//! - [`ast`]: the parsed Python subset, one [`NodeId`] per node
//! - [`visitor`]: read-only traversal over statements and expressions
//! - [`stack`]: stack growth for the recursive passes
//!
//! The AST is immutable after parsing. Analysis results (types, ownership
//! tags, provenance) live in side tables keyed by [`NodeId`].

pub mod ast;
mod line_index;
mod span;
pub mod stack;
pub mod visitor;

pub use ast::NodeId;
pub use line_index::{LineCol, LineIndex};
pub use span::{Span, SpanError};
