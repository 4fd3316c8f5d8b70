//! Python tokenizer for the Depyler transpiler.
//!
//! Two layers:
//! - a logos-generated raw scanner (`raw`) that classifies byte ranges
//! - a layout pass ([`tokenize`]) that produces `NEWLINE`/`INDENT`/`DEDENT`,
//!   decodes literals and collects comments
//!
//! Comments never reach the token stream. They are kept in
//! [`LexOutput::comments`] so the parser can attach the ones preceding a
//! definition as pragma candidates.

mod escape;
mod layout;
mod raw;
mod token;

pub use escape::unescape;
pub use layout::{tokenize, LexOutput};
pub use token::{Comment, StrKind, StrLit, Token, TokenKind};

#[cfg(test)]
mod tests;
