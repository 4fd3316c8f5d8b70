//! Diagnostic Emitters
//!
//! - Terminal: colored, human-readable output with source excerpts
//! - JSON: machine-readable output for tooling
//!
//! Each emitter implements [`DiagnosticEmitter`].

mod json;
mod terminal;

pub use json::JsonEmitter;
pub use terminal::{ColorMode, TerminalEmitter};

use crate::{Diagnostic, SourceFile};

/// Trait for emitting diagnostics in various formats.
pub trait DiagnosticEmitter {
    /// Emit a single diagnostic against the file it was reported in.
    fn emit(&mut self, diagnostic: &Diagnostic, file: &SourceFile);

    fn emit_all(&mut self, diagnostics: &[Diagnostic], file: &SourceFile) {
        for diag in diagnostics {
            self.emit(diag, file);
        }
    }

    /// Flush any buffered output.
    fn flush(&mut self);

    /// Emit a summary of errors/warnings.
    fn emit_summary(&mut self, error_count: usize, warning_count: usize);
}

/// Output format selected on the command line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DiagnosticFormat {
    #[default]
    Text,
    Json,
}

impl DiagnosticFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "text" | "human" => Some(DiagnosticFormat::Text),
            "json" => Some(DiagnosticFormat::Json),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests;
