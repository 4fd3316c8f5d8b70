//! JSON Emitter
//!
//! Machine-readable diagnostic output: one JSON array per flush, each
//! element carrying the code, kind, resolved line/column and messages.

use std::io::Write;

use serde::Serialize;

use crate::{Diagnostic, DiagnosticKind, Severity, SourceFile};

use super::DiagnosticEmitter;

#[derive(Serialize)]
struct JsonLabel {
    line: u32,
    column: u32,
    message: String,
    primary: bool,
}

#[derive(Serialize)]
struct JsonDiagnostic {
    code: &'static str,
    kind: DiagnosticKind,
    severity: Severity,
    message: String,
    file: String,
    line: u32,
    column: u32,
    end_line: u32,
    end_column: u32,
    labels: Vec<JsonLabel>,
    notes: Vec<String>,
    help: Vec<String>,
}

/// JSON emitter for machine-readable output.
pub struct JsonEmitter<W: Write> {
    writer: W,
    pending: Vec<JsonDiagnostic>,
}

impl<W: Write> JsonEmitter<W> {
    pub fn new(writer: W) -> Self {
        JsonEmitter {
            writer,
            pending: Vec::new(),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> DiagnosticEmitter for JsonEmitter<W> {
    fn emit(&mut self, diagnostic: &Diagnostic, file: &SourceFile) {
        let start = file.line_col(diagnostic.span.start);
        let end = file.line_col(diagnostic.span.end);
        let labels = diagnostic
            .labels
            .iter()
            .map(|label| {
                let pos = file.line_col(label.span.start);
                JsonLabel {
                    line: pos.line,
                    column: pos.col,
                    message: label.message.clone(),
                    primary: label.is_primary,
                }
            })
            .collect();

        self.pending.push(JsonDiagnostic {
            code: diagnostic.code(),
            kind: diagnostic.kind,
            severity: diagnostic.severity,
            message: diagnostic.message.clone(),
            file: file.path.clone(),
            line: start.line,
            column: start.col,
            end_line: end.line,
            end_column: end.col,
            labels,
            notes: diagnostic.notes.clone(),
            help: diagnostic.suggestions.clone(),
        });
    }

    fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let pending = std::mem::take(&mut self.pending);
        if serde_json::to_writer_pretty(&mut self.writer, &pending).is_ok() {
            let _ = writeln!(self.writer);
        }
        let _ = self.writer.flush();
    }

    fn emit_summary(&mut self, _error_count: usize, _warning_count: usize) {
        // Counts are derivable from the array.
    }
}
