use rustc_hash::FxHashMap;

use depyler_diagnostic::{Diagnostic, DiagnosticKind};
use depyler_ir::ast::CommentLine;
use depyler_ir::Span;

use crate::options::{values_for, KNOWN_KEYS};
use crate::PragmaSet;

const MARKER: &str = "@depyler";

/// Pragmas of one definition plus the diagnostics found while reading them.
#[derive(Clone, Debug, Default)]
pub struct Extracted {
    pub pragmas: PragmaSet,
    pub diagnostics: Vec<Diagnostic>,
}

/// One syntactically valid `key = "value"` line.
struct Entry<'a> {
    key: &'a str,
    key_span: Span,
    value: &'a str,
    value_span: Span,
}

/// Read the pragmas out of the comment lines preceding a definition.
///
/// Comments that do not start with `@depyler` are ignored. Every problem is
/// reported as a non-fatal diagnostic and the offending line or entry is
/// skipped. Later entries for the same key override earlier ones.
pub fn extract(comments: &[CommentLine]) -> Extracted {
    let mut out = Extracted::default();
    let mut seen: FxHashMap<&str, Span> = FxHashMap::default();

    for comment in comments {
        let entry = match parse_line(comment) {
            Ok(Some(entry)) => entry,
            Ok(None) => continue,
            Err(diag) => {
                out.diagnostics.push(diag);
                continue;
            }
        };

        let Some(accepted) = values_for(entry.key) else {
            out.diagnostics.push(unknown_key(&entry));
            continue;
        };

        if !out.pragmas.set(entry.key, entry.value) {
            out.diagnostics.push(
                Diagnostic::new(DiagnosticKind::ParseError, entry.value_span)
                    .with_message(format!(
                        "invalid value \"{}\" for pragma `{}`",
                        entry.value, entry.key
                    ))
                    .with_label("not a recognized value")
                    .with_note(format!("expected one of: {}", quoted_list(accepted))),
            );
            continue;
        }

        if let Some(previous) = seen.insert(entry.key, entry.key_span) {
            out.diagnostics.push(
                Diagnostic::new(DiagnosticKind::PragmaOverride, entry.key_span)
                    .with_message(format!(
                        "pragma `{}` is set more than once; the last value \"{}\" wins",
                        entry.key, entry.value
                    ))
                    .with_label("overrides the earlier value")
                    .with_secondary_label(previous, "first set here"),
            );
        }
    }

    if !out.pragmas.is_empty() {
        tracing::trace!(entries = ?out.pragmas.entries(), "extracted pragmas");
    }
    out
}

/// `Ok(None)` for ordinary comments, `Err` for malformed pragma lines.
fn parse_line(comment: &CommentLine) -> Result<Option<Entry<'_>>, Diagnostic> {
    let text = comment.text.as_str();
    let base = comment.span.start;
    let at = |offset: usize, len: usize| {
        let start = base + to_u32(offset);
        Span::new(start, start + to_u32(len))
    };
    let malformed = |message: &str, offset: usize, len: usize| {
        Diagnostic::new(DiagnosticKind::ParseError, at(offset, len))
            .with_message(message.to_string())
            .with_label("malformed pragma")
            .with_suggestion("pragmas are written as `# @depyler: key = \"value\"`")
    };

    let body = text.strip_prefix('#').unwrap_or(text);
    let body_offset = text.len() - body.len();
    let trimmed = body.trim_start();
    let mut pos = body_offset + (body.len() - trimmed.len());

    let Some(after_marker) = trimmed.strip_prefix(MARKER) else {
        return Ok(None);
    };
    // `@depylerx` is not the marker.
    if after_marker
        .chars()
        .next()
        .is_some_and(|c| c.is_alphanumeric() || c == '_')
    {
        return Ok(None);
    }
    pos += MARKER.len();

    pos = skip_spaces(text, pos);
    if !text[pos..].starts_with(':') {
        return Err(malformed("expected `:` after `@depyler`", pos, 1));
    }
    pos = skip_spaces(text, pos + 1);

    let key_len = text[pos..]
        .find(|c: char| !(c.is_alphanumeric() || c == '_'))
        .unwrap_or(text.len() - pos);
    if key_len == 0 {
        return Err(malformed("expected a pragma name", pos, 1));
    }
    let key_start = pos;
    let key = &text[key_start..key_start + key_len];
    pos = skip_spaces(text, pos + key_len);

    if !text[pos..].starts_with('=') {
        return Err(malformed(
            &format!("expected `=` after pragma name `{key}`"),
            pos,
            1,
        ));
    }
    pos = skip_spaces(text, pos + 1);

    let Some(quote) = text[pos..].chars().next().filter(|c| *c == '"' || *c == '\'') else {
        return Err(malformed(
            "pragma value must be a quoted string",
            pos,
            text.len().saturating_sub(pos).max(1),
        ));
    };
    let value_start = pos + 1;
    let Some(value_len) = text[value_start..].find(quote) else {
        return Err(malformed("unterminated pragma value", pos, text.len() - pos));
    };
    let value = &text[value_start..value_start + value_len];
    pos = value_start + value_len + 1;

    let rest = text[pos..].trim();
    if !rest.is_empty() {
        let offset = pos + (text[pos..].len() - text[pos..].trim_start().len());
        return Err(malformed(
            "unexpected text after pragma value",
            offset,
            rest.len(),
        ));
    }

    Ok(Some(Entry {
        key,
        key_span: at(key_start, key_len),
        value: value.trim(),
        value_span: at(value_start - 1, value_len + 2),
    }))
}

fn unknown_key(entry: &Entry<'_>) -> Diagnostic {
    let diag = Diagnostic::new(DiagnosticKind::UnknownPragma, entry.key_span)
        .with_message(format!("unknown pragma `{}`", entry.key))
        .with_label("ignored")
        .with_note(format!("known pragmas: {}", KNOWN_KEYS.join(", ")));
    match closest_key(entry.key) {
        Some(similar) => diag.with_suggestion(format!("did you mean `{similar}`?")),
        None => diag,
    }
}

/// A known key within edit distance 2 of `key`.
fn closest_key(key: &str) -> Option<&'static str> {
    KNOWN_KEYS
        .iter()
        .map(|known| (edit_distance(key, known), *known))
        .filter(|(distance, _)| *distance <= 2)
        .min_by_key(|(distance, _)| *distance)
        .map(|(_, known)| known)
}

fn edit_distance(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut row: Vec<usize> = (0..=b.len()).collect();
    for (i, ca) in a.chars().enumerate() {
        let mut diagonal = row[0];
        row[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let above = row[j + 1];
            row[j + 1] = if ca == *cb {
                diagonal
            } else {
                1 + diagonal.min(above).min(row[j])
            };
            diagonal = above;
        }
    }
    row[b.len()]
}

fn skip_spaces(text: &str, pos: usize) -> usize {
    pos + (text[pos..].len() - text[pos..].trim_start().len())
}

fn quoted_list(values: &[&str]) -> String {
    values
        .iter()
        .map(|v| format!("\"{v}\""))
        .collect::<Vec<_>>()
        .join(", ")
}

fn to_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests;
