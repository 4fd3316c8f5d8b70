//! Diagnostic kinds and their stable codes.
//!
//! Format: E#### for errors and W#### for warnings, first digit by phase:
//! - 0xxx: front end (tokenizer, parser)
//! - 1xxx: pragma extraction
//! - 2xxx: unsupported constructs
//! - 3xxx: type inference
//! - 4xxx: ownership resolution
//! - 5xxx: lowering

use std::fmt;

use crate::Severity;

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, PartialOrd, Ord, serde::Serialize)]
pub enum DiagnosticKind {
    /// Source is not valid Python (or not valid for the supported subset).
    SyntaxError,
    /// Malformed pragma line or invalid pragma value.
    ParseError,
    /// Pragma key the transpiler does not know.
    UnknownPragma,
    /// A pragma key repeated on the same definition.
    PragmaOverride,
    /// AST node with no lowering rule.
    UnsupportedConstruct,
    /// Conflicting inferred types.
    TypeUnificationError,
    /// Subscript whose string vs element semantics cannot be decided.
    IndexSemanticsError,
    /// Pragma and escape analysis contradict each other.
    OwnershipConflict,
    /// Narrowed integer arithmetic that may overflow.
    PossibleOverflow,
}

impl DiagnosticKind {
    pub const ALL: [DiagnosticKind; 9] = [
        DiagnosticKind::SyntaxError,
        DiagnosticKind::ParseError,
        DiagnosticKind::UnknownPragma,
        DiagnosticKind::PragmaOverride,
        DiagnosticKind::UnsupportedConstruct,
        DiagnosticKind::TypeUnificationError,
        DiagnosticKind::IndexSemanticsError,
        DiagnosticKind::OwnershipConflict,
        DiagnosticKind::PossibleOverflow,
    ];

    pub fn code(self) -> &'static str {
        match self {
            DiagnosticKind::SyntaxError => "E0001",
            DiagnosticKind::ParseError => "E1001",
            DiagnosticKind::UnknownPragma => "W1002",
            DiagnosticKind::PragmaOverride => "W1003",
            DiagnosticKind::UnsupportedConstruct => "E2001",
            DiagnosticKind::TypeUnificationError => "E3001",
            DiagnosticKind::IndexSemanticsError => "E3002",
            DiagnosticKind::OwnershipConflict => "E4001",
            DiagnosticKind::PossibleOverflow => "W5001",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DiagnosticKind::SyntaxError => "SyntaxError",
            DiagnosticKind::ParseError => "ParseError",
            DiagnosticKind::UnknownPragma => "UnknownPragma",
            DiagnosticKind::PragmaOverride => "PragmaOverride",
            DiagnosticKind::UnsupportedConstruct => "UnsupportedConstruct",
            DiagnosticKind::TypeUnificationError => "TypeUnificationError",
            DiagnosticKind::IndexSemanticsError => "IndexSemanticsError",
            DiagnosticKind::OwnershipConflict => "OwnershipConflict",
            DiagnosticKind::PossibleOverflow => "PossibleOverflow",
        }
    }

    /// Look up a kind by its code, case-insensitively (`e3001`, `E3001`).
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.code().eq_ignore_ascii_case(code.trim()))
    }

    pub fn default_severity(self) -> Severity {
        match self {
            DiagnosticKind::UnknownPragma
            | DiagnosticKind::PragmaOverride
            | DiagnosticKind::PossibleOverflow => Severity::Warning,
            DiagnosticKind::SyntaxError
            | DiagnosticKind::ParseError
            | DiagnosticKind::UnsupportedConstruct
            | DiagnosticKind::TypeUnificationError
            | DiagnosticKind::IndexSemanticsError
            | DiagnosticKind::OwnershipConflict => Severity::Error,
        }
    }

    /// Whether this kind suppresses output for its compilation unit.
    ///
    /// `ParseError` is reported as an error but only drops the pragma line.
    pub fn is_fatal(self) -> bool {
        matches!(
            self,
            DiagnosticKind::SyntaxError
                | DiagnosticKind::UnsupportedConstruct
                | DiagnosticKind::TypeUnificationError
                | DiagnosticKind::IndexSemanticsError
                | DiagnosticKind::OwnershipConflict
        )
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests;
