//! Spelling of identifiers, literals and types, and operator precedence of
//! generated expression text.

use depyler_ir::ast::{Expr, ExprKind, UnaryOp};
use depyler_ownership::ParamMode;
use depyler_types::RustType;

/// Words that need `r#` to be used as identifiers.
const RAW_KEYWORDS: &[&str] = &[
    "abstract", "as", "async", "await", "become", "box", "const", "do", "dyn", "enum", "extern",
    "final", "fn", "gen", "impl", "let", "loop", "macro", "match", "mod", "move", "mut",
    "override", "priv", "pub", "ref", "static", "struct", "trait", "true", "false", "type",
    "typeof", "unsafe", "unsized", "use", "virtual", "where", "yield", "try", "union",
];

/// Keywords that cannot be raw identifiers.
const RESERVED: &[&str] = &["crate", "super", "Self"];

/// `name` as a Rust identifier.
pub(crate) fn ident(name: &str) -> String {
    if RAW_KEYWORDS.contains(&name) {
        format!("r#{name}")
    } else if RESERVED.contains(&name) {
        format!("{name}_")
    } else {
        name.to_string()
    }
}

/// Local holding `self.<field>` while `__init__` builds the struct.
pub(crate) fn field_local(field: &str) -> String {
    format!("self_{field}")
}

pub(crate) fn str_lit(s: &str) -> String {
    format!("{s:?}")
}

pub(crate) fn char_lit(c: char) -> String {
    format!("{c:?}")
}

/// Float literal that reads back as the same `f64`.
pub(crate) fn float_lit(v: f64) -> String {
    let text = format!("{v:?}");
    if text.contains(['.', 'e', 'E', 'i', 'N']) {
        text
    } else {
        format!("{text}.0")
    }
}

/// Text of a string literal inside a format string.
pub(crate) fn escape_braces(s: &str) -> String {
    s.replace('{', "{{").replace('}', "}}")
}

/// Integer value of an int literal, negated literals included.
pub(crate) fn int_literal(expr: &Expr) -> Option<i128> {
    match &expr.kind {
        ExprKind::Int(v) => Some(*v),
        ExprKind::UnaryOp {
            op: UnaryOp::Neg,
            operand,
        } => match operand.kind {
            ExprKind::Int(v) => Some(-v),
            _ => None,
        },
        _ => None,
    }
}

/// Lowering of a literal default (parameter default, class field default)
/// into a value of type `ty`.
pub(crate) fn literal(expr: &Expr, ty: &RustType) -> Option<String> {
    if let RustType::Option(inner) = ty {
        return match expr.kind {
            ExprKind::NoneLit => Some("None".to_string()),
            _ => literal(expr, inner).map(|v| format!("Some({v})")),
        };
    }
    match (&expr.kind, ty) {
        (ExprKind::Int(v), RustType::Float) => Some(format!("{v}.0")),
        (ExprKind::Int(v), _) => Some(v.to_string()),
        (ExprKind::Float(v), _) => Some(float_lit(*v)),
        (ExprKind::Bool(b), _) => Some(b.to_string()),
        (ExprKind::Str(s), RustType::Char) => s.chars().next().map(char_lit),
        (ExprKind::Str(s), _) => Some(format!("{}.to_string()", str_lit(s))),
        (
            ExprKind::UnaryOp {
                op: UnaryOp::Neg,
                operand,
            },
            _,
        ) => literal(operand, ty).map(|v| format!("-{v}")),
        (ExprKind::List(items), RustType::Vec(elem)) => {
            if items.is_empty() {
                return Some("Vec::new()".to_string());
            }
            let parts: Option<Vec<_>> = items.iter().map(|i| literal(i, elem)).collect();
            parts.map(|p| format!("vec![{}]", p.join(", ")))
        }
        (ExprKind::Dict { keys, .. }, RustType::HashMap(..)) if keys.is_empty() => {
            Some("IndexMap::new()".to_string())
        }
        (ExprKind::Call { func, args, .. }, RustType::HashSet(_))
            if args.is_empty() && func.as_name() == Some("set") =>
        {
            Some("IndexSet::new()".to_string())
        }
        (ExprKind::Tuple(items), RustType::Tuple(tys)) if items.len() == tys.len() => {
            let parts: Option<Vec<_>> = items
                .iter()
                .zip(tys)
                .map(|(i, t)| literal(i, t))
                .collect();
            parts.map(|p| tuple_code(&p))
        }
        _ => None,
    }
}

/// `(a, b)`, with the trailing comma of a one-element tuple.
pub(crate) fn tuple_code(parts: &[String]) -> String {
    match parts {
        [one] => format!("({one},)"),
        _ => format!("({})", parts.join(", ")),
    }
}

/// Starting value of a hoisted local. Structs and results have none.
pub(crate) fn default_value(ty: &RustType) -> Option<String> {
    Some(match ty {
        RustType::Int(_) => "0".to_string(),
        RustType::Float => "0.0".to_string(),
        RustType::Bool => "false".to_string(),
        RustType::Char => "' '".to_string(),
        RustType::Str => "String::new()".to_string(),
        RustType::Vec(_) => "Vec::new()".to_string(),
        RustType::HashMap(..) => "IndexMap::new()".to_string(),
        RustType::HashSet(_) => "IndexSet::new()".to_string(),
        RustType::Option(_) => "None".to_string(),
        RustType::Unit => "()".to_string(),
        RustType::Dynamic => "PyValue::None".to_string(),
        RustType::Tuple(items) => {
            let parts: Option<Vec<_>> = items.iter().map(default_value).collect();
            return parts.map(|p| tuple_code(&p));
        }
        RustType::Struct(_)
        | RustType::Result(..)
        | RustType::Var(_)
        | RustType::Unresolved => return None,
    })
}

/// Type of a parameter passed in `mode`.
pub(crate) fn param_type(ty: &RustType, mode: ParamMode) -> String {
    match mode {
        ParamMode::Borrowed => match ty {
            RustType::Str => "&str".to_string(),
            RustType::Vec(elem) => format!("&[{}]", elem.render()),
            other => format!("&{}", other.render()),
        },
        ParamMode::BorrowedMut => format!("&mut {}", ty.render()),
        ParamMode::ByValue | ParamMode::Owned => ty.render(),
    }
}

/// Copy of a value reached through `code`. `by_ref` marks code that is a
/// reference (`&str`, `&[T]`, `&T`).
pub(crate) fn clone_of(code: &str, ty: &RustType, by_ref: bool) -> String {
    let receiver = wrap(code, ATOM);
    match ty {
        RustType::Str if by_ref => format!("{receiver}.to_string()"),
        RustType::Vec(_) if by_ref => format!("{receiver}.to_vec()"),
        _ => format!("{receiver}.clone()"),
    }
}

/// Copy of an element reached through a reference in a closure (`|v|`
/// over `.iter()`).
pub(crate) fn deref_copy(code: &str, ty: &RustType) -> String {
    if ty.is_copy() {
        format!("*{code}")
    } else {
        format!("{code}.clone()")
    }
}

/// `.copied()` for `Copy` items, `.cloned()` otherwise.
pub(crate) fn copied_or_cloned(ty: &RustType) -> &'static str {
    if ty.is_copy() {
        "copied()"
    } else {
        "cloned()"
    }
}

// Precedence of generated expression text, loosest first.

pub(crate) const BLOCK: u8 = 0;
pub(crate) const RANGE: u8 = 2;
pub(crate) const OR: u8 = 3;
pub(crate) const AND: u8 = 4;
pub(crate) const CMP: u8 = 5;
pub(crate) const BIT_OR: u8 = 6;
pub(crate) const BIT_XOR: u8 = 7;
pub(crate) const BIT_AND: u8 = 8;
pub(crate) const SHIFT: u8 = 9;
pub(crate) const ADD: u8 = 10;
pub(crate) const MUL: u8 = 11;
pub(crate) const CAST: u8 = 13;
pub(crate) const UNARY: u8 = 14;
pub(crate) const ATOM: u8 = u8::MAX;

const BINARY: &[(&str, u8)] = &[
    (" || ", OR),
    (" && ", AND),
    (" == ", CMP),
    (" != ", CMP),
    (" <= ", CMP),
    (" >= ", CMP),
    (" < ", CMP),
    (" > ", CMP),
    (" | ", BIT_OR),
    (" ^ ", BIT_XOR),
    (" & ", BIT_AND),
    (" << ", SHIFT),
    (" >> ", SHIFT),
    (" + ", ADD),
    (" - ", ADD),
    (" * ", MUL),
    (" / ", MUL),
    (" % ", MUL),
    (" as ", CAST),
];

/// Loosest operator at the top level of `code`. Binary operators are
/// always generated with a space on both sides, prefix operators never.
pub(crate) fn precedence(code: &str) -> u8 {
    let bytes = code.as_bytes();
    if code.starts_with("if ")
        || code.starts_with("loop ")
        || code.starts_with("match ")
        || code.starts_with('|')
        || code.starts_with('{')
    {
        return BLOCK;
    }

    let mut lowest = ATOM;
    let mut depth = 0i32;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'"' => i = skip_string(bytes, i),
            b'\'' => i = skip_char(bytes, i),
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth -= 1,
            b':' if bytes.get(i + 1) == Some(&b':') && bytes.get(i + 2) == Some(&b'<') => {
                i = skip_turbofish(bytes, i + 2);
                continue;
            }
            b'.' if depth == 0 && bytes.get(i + 1) == Some(&b'.') => lowest = lowest.min(RANGE),
            b' ' if depth == 0 => {
                let rest = &code[i..];
                if let Some((_, prec)) = BINARY.iter().find(|(op, _)| rest.starts_with(op)) {
                    lowest = lowest.min(*prec);
                }
            }
            _ => {}
        }
        i += 1;
    }
    if lowest == ATOM && matches!(bytes.first(), Some(b'-' | b'!' | b'&' | b'*')) {
        return UNARY;
    }
    lowest
}

fn skip_string(bytes: &[u8], start: usize) -> usize {
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 1,
            b'"' => return i,
            _ => {}
        }
        i += 1;
    }
    i
}

fn skip_char(bytes: &[u8], start: usize) -> usize {
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 1,
            b'\'' => return i,
            _ => {}
        }
        i += 1;
    }
    i
}

/// Index of the `>` closing the generic list opened at `open`.
fn skip_turbofish(bytes: &[u8], open: usize) -> usize {
    let mut depth = 0;
    let mut i = open;
    while i < bytes.len() {
        match bytes[i] {
            b'<' => depth += 1,
            b'>' => {
                depth -= 1;
                if depth == 0 {
                    return i + 1;
                }
            }
            _ => {}
        }
        i += 1;
    }
    i
}

/// `code`, parenthesized unless it binds at least as tightly as `min`.
pub(crate) fn wrap(code: &str, min: u8) -> String {
    if precedence(code) < min {
        format!("({code})")
    } else {
        code.to_string()
    }
}

/// Whether `code` is an integer literal without sign.
pub(crate) fn is_int_literal(code: &str) -> bool {
    !code.is_empty() && code.bytes().all(|b| b.is_ascii_digit() || b == b'_')
}
