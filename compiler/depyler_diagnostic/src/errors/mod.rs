//! Embedded error documentation for `depyler explain`.
//!
//! Each diagnostic kind has a markdown file in this directory, embedded at
//! compile time.

use crate::DiagnosticKind;

/// Registry of embedded error documentation.
pub struct ErrorDocs;

impl ErrorDocs {
    pub fn get(kind: DiagnosticKind) -> Option<&'static str> {
        DOCS.iter().find(|(k, _)| *k == kind).map(|(_, doc)| *doc)
    }

    /// Look up documentation by code string (`E3001`).
    pub fn lookup(code: &str) -> Option<&'static str> {
        DiagnosticKind::from_code(code).and_then(Self::get)
    }

    pub fn all_kinds() -> impl Iterator<Item = DiagnosticKind> {
        DOCS.iter().map(|(kind, _)| *kind)
    }
}

static DOCS: &[(DiagnosticKind, &str)] = &[
    (DiagnosticKind::SyntaxError, include_str!("E0001.md")),
    (DiagnosticKind::ParseError, include_str!("E1001.md")),
    (DiagnosticKind::UnknownPragma, include_str!("W1002.md")),
    (DiagnosticKind::PragmaOverride, include_str!("W1003.md")),
    (DiagnosticKind::UnsupportedConstruct, include_str!("E2001.md")),
    (DiagnosticKind::TypeUnificationError, include_str!("E3001.md")),
    (DiagnosticKind::IndexSemanticsError, include_str!("E3002.md")),
    (DiagnosticKind::OwnershipConflict, include_str!("E4001.md")),
    (DiagnosticKind::PossibleOverflow, include_str!("W5001.md")),
];

#[cfg(test)]
mod tests;
