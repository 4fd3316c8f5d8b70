//! Pragma extraction.
//!
//! A pragma is a comment directly above a `def` or `class` (or above its
//! decorators) of the form:
//!
//! ```text
//! # @depyler: ownership = "borrowed"
//! # @depyler: bounds_checking = "explicit"
//! ```
//!
//! [`extract`] turns those lines into a [`PragmaSet`]. It is a pure function
//! of the comment text: it never fails, and every problem is a non-fatal
//! diagnostic (`ParseError`, `UnknownPragma`, `PragmaOverride`).
//!
//! Methods see their class's pragmas through [`PragmaSet::inherit`].

mod extract;
mod options;
mod set;

pub use extract::{extract, Extracted};
pub use options::{
    values_for, BoundsChecking, ContainerTyping, MemoryStrategy, OptimizationLevel, Ownership,
    ThreadSafety, KNOWN_KEYS,
};
pub use set::PragmaSet;

#[cfg(test)]
mod tests;
