//! Stack safety for deep recursion.
//!
//! The parser, the inference walk and the lowering walk all recurse over
//! nested expressions. Wrap those recursive calls with
//! [`ensure_sufficient_stack`] so deeply nested input grows the stack
//! instead of overflowing it.
//!
//! - **Red zone**: 100KB. If less than this remains, the stack grows.
//! - **Growth size**: 1MB per growth.

const RED_ZONE: usize = 100 * 1024;

const STACK_PER_RECURSION: usize = 1024 * 1024;

/// Ensure sufficient stack space is available before executing `f`.
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

/// WASM version, calls `f` directly.
#[inline]
#[cfg(target_arch = "wasm32")]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}
