//! Terminal Emitter
//!
//! Human-readable diagnostic output with optional ANSI color support:
//!
//! ```text
//! error[E3001]: dict literal mixes value types `str`, `int` and `bool`
//!   --> mixed.py:3:12
//!    |
//!  3 |     data = {"a": "x", "b": 1}
//!    |            ^^^^^^^^^^^^^^^^^^ values must share one type
//!    |
//!    = note: ...
//! ```

use std::io::{self, Write};

use crate::{Diagnostic, Severity, SourceFile};

use super::DiagnosticEmitter;

/// ANSI color codes for terminal output.
mod colors {
    pub const ERROR: &str = "\x1b[1;31m"; // Bold red
    pub const WARNING: &str = "\x1b[1;33m"; // Bold yellow
    pub const NOTE: &str = "\x1b[1;36m"; // Bold cyan
    pub const HELP: &str = "\x1b[1;32m"; // Bold green
    pub const BOLD: &str = "\x1b[1m";
    pub const SECONDARY: &str = "\x1b[1;34m"; // Bold blue
    pub const RESET: &str = "\x1b[0m";
}

#[inline]
fn plural_s(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}

/// Color output mode for terminal emitter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorMode {
    /// Automatically detect based on terminal capabilities.
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorMode {
    /// For `Auto` mode, `is_tty` decides; it is ignored otherwise.
    pub fn should_use_colors(self, is_tty: bool) -> bool {
        match self {
            ColorMode::Auto => is_tty,
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "auto" => Some(ColorMode::Auto),
            "always" => Some(ColorMode::Always),
            "never" => Some(ColorMode::Never),
            _ => None,
        }
    }
}

/// Terminal emitter with optional color support.
pub struct TerminalEmitter<W: Write> {
    writer: W,
    colors: bool,
}

impl<W: Write> TerminalEmitter<W> {
    /// `is_tty` is only consulted for `ColorMode::Auto`.
    pub fn with_color_mode(writer: W, mode: ColorMode, is_tty: bool) -> Self {
        TerminalEmitter {
            writer,
            colors: mode.should_use_colors(is_tty),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_colored(&mut self, text: &str, color: &str) {
        if self.colors {
            let _ = write!(self.writer, "{color}{text}{}", colors::RESET);
        } else {
            let _ = write!(self.writer, "{text}");
        }
    }

    fn severity_color(severity: Severity) -> &'static str {
        match severity {
            Severity::Error => colors::ERROR,
            Severity::Warning => colors::WARNING,
            Severity::Note => colors::NOTE,
            Severity::Help => colors::HELP,
        }
    }

    fn write_header(&mut self, diagnostic: &Diagnostic) {
        let color = Self::severity_color(diagnostic.severity);
        self.write_colored(&diagnostic.severity.to_string(), color);
        if self.colors {
            let _ = write!(self.writer, "{}[{}]{}", colors::BOLD, diagnostic.code(), colors::RESET);
        } else {
            let _ = write!(self.writer, "[{}]", diagnostic.code());
        }
        let _ = writeln!(self.writer, ": {}", diagnostic.message);
    }

    /// Source line with a caret underline under the primary span.
    fn write_snippet(&mut self, diagnostic: &Diagnostic, file: &SourceFile) {
        let start = file.line_col(diagnostic.span.start);
        let _ = writeln!(
            self.writer,
            "  --> {}:{}:{}",
            file.path, start.line, start.col
        );

        let line_text = file.line_text(start.line).to_string();
        if line_text.is_empty() {
            return;
        }
        let gutter = start.line.to_string();
        let pad = " ".repeat(gutter.len());
        let _ = writeln!(self.writer, " {pad} |");
        let _ = writeln!(self.writer, " {gutter} | {line_text}");

        let end = file.line_col(diagnostic.span.end);
        let line_chars = u32::try_from(line_text.chars().count()).unwrap_or(u32::MAX);
        let width = if end.line == start.line {
            end.col.saturating_sub(start.col).max(1)
        } else {
            (line_chars + 1).saturating_sub(start.col).max(1)
        };
        let mut underline = " ".repeat(start.col.saturating_sub(1) as usize);
        underline.push_str(&"^".repeat(width as usize));
        let label = diagnostic
            .labels
            .iter()
            .find(|l| l.is_primary)
            .map_or(String::new(), |l| format!(" {}", l.message));

        let _ = write!(self.writer, " {pad} | ");
        let color = Self::severity_color(diagnostic.severity);
        self.write_colored(&format!("{underline}{label}"), color);
        let _ = writeln!(self.writer);
        let _ = writeln!(self.writer, " {pad} |");
    }
}

impl<W: Write> DiagnosticEmitter for TerminalEmitter<W> {
    fn emit(&mut self, diagnostic: &Diagnostic, file: &SourceFile) {
        self.write_header(diagnostic);
        self.write_snippet(diagnostic, file);

        for label in diagnostic.labels.iter().filter(|l| !l.is_primary) {
            let pos = file.line_col(label.span.start);
            let _ = write!(self.writer, "  ::: {}:{}: ", pos.line, pos.col);
            self.write_colored(&label.message, colors::SECONDARY);
            let _ = writeln!(self.writer);
        }

        for note in &diagnostic.notes {
            let _ = write!(self.writer, "   = ");
            self.write_colored("note", colors::BOLD);
            let _ = writeln!(self.writer, ": {note}");
        }

        for suggestion in &diagnostic.suggestions {
            let _ = write!(self.writer, "   = ");
            self.write_colored("help", colors::HELP);
            let _ = writeln!(self.writer, ": {suggestion}");
        }

        let _ = writeln!(self.writer);
    }

    fn flush(&mut self) {
        let _ = self.writer.flush();
    }

    fn emit_summary(&mut self, error_count: usize, warning_count: usize) {
        if error_count == 0 && warning_count == 0 {
            return;
        }

        if error_count > 0 {
            self.write_colored("error", colors::ERROR);
            let error_part = if error_count == 1 {
                "1 error".to_string()
            } else {
                format!("{error_count} errors")
            };
            if warning_count > 0 {
                let _ = writeln!(
                    self.writer,
                    ": {error_part}; {warning_count} warning{} emitted",
                    plural_s(warning_count)
                );
            } else {
                let _ = writeln!(self.writer, ": {error_part} emitted");
            }
        } else {
            self.write_colored("warning", colors::WARNING);
            let _ = writeln!(
                self.writer,
                ": {warning_count} warning{} emitted",
                plural_s(warning_count)
            );
        }
    }
}

impl TerminalEmitter<io::Stderr> {
    pub fn stderr(mode: ColorMode, is_tty: bool) -> Self {
        TerminalEmitter::with_color_mode(io::stderr(), mode, is_tty)
    }
}
