//! f-strings, `print` and Python's `str()` of values.
//!
//! Python shows `True`/`False` for bools and always writes a fractional
//! part for floats (`1.0`), so those go through `if b { "True" } else
//! { "False" }` and `{:?}` respectively. Format specs are translated to
//! Rust's where both languages agree and rejected otherwise.

use depyler_ir::ast::{Expr, ExprKind, FStringPart, Keyword};
use depyler_types::RustType;

use crate::expr::format_macro;
use crate::function::Lowerer;
use crate::types::{escape_braces, wrap, ATOM, CAST};

/// A Python format spec in Rust's syntax.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Spec {
    /// Text after the `:` of the placeholder.
    pub(crate) rust: String,
    /// The value is an integer formatted with a float presentation.
    pub(crate) as_float: bool,
}

/// Translate a Python format spec for a value of type `ty`.
pub(crate) fn translate_spec(spec: &str, ty: &RustType) -> Result<Spec, String> {
    let chars: Vec<char> = spec.chars().collect();
    let mut i = 0;
    let mut out = String::new();

    let is_align = |c: char| matches!(c, '<' | '>' | '^' | '=');
    let (fill, align) = match chars.as_slice() {
        [f, a, ..] if is_align(*a) => (Some(*f), Some(*a)),
        [a, ..] if is_align(*a) => (None, Some(*a)),
        _ => (None, None),
    };
    if let Some(align) = align {
        if align == '=' {
            return Err("`=` alignment".to_string());
        }
        if let Some(fill) = fill {
            if matches!(fill, '{' | '}') {
                return Err("brace as fill character".to_string());
            }
            out.push(fill);
            i += 1;
        }
        out.push(align);
        i += 1;
    }

    match chars.get(i) {
        Some('+') => {
            out.push('+');
            i += 1;
        }
        Some('-') => i += 1,
        Some(' ') => return Err("space sign".to_string()),
        _ => {}
    }
    if chars.get(i) == Some(&'z') {
        return Err("`z` option".to_string());
    }
    if chars.get(i) == Some(&'#') {
        out.push('#');
        i += 1;
    }
    if chars.get(i) == Some(&'0') {
        out.push('0');
        i += 1;
    }
    while let Some(c) = chars.get(i).filter(|c| c.is_ascii_digit()) {
        out.push(*c);
        i += 1;
    }
    if matches!(chars.get(i), Some(',' | '_')) {
        return Err("digit grouping".to_string());
    }
    let mut precision = None;
    if chars.get(i) == Some(&'.') {
        i += 1;
        let start = i;
        while chars.get(i).is_some_and(char::is_ascii_digit) {
            i += 1;
        }
        if start == i {
            return Err("precision without digits".to_string());
        }
        precision = Some(chars[start..i].iter().collect::<String>());
    }
    let kind = chars.get(i).copied();
    if chars.len() > i + 1 {
        return Err(format!("format spec `{spec}`"));
    }

    let mut as_float = false;
    match (kind, ty) {
        (None, RustType::Float) if precision.is_some() => {
            return Err("float precision without a presentation type".to_string());
        }
        (None | Some('s'), _) => {
            if let Some(p) = precision {
                out.push('.');
                out.push_str(&p);
            }
        }
        (Some('d'), RustType::Int(_)) if precision.is_none() => {}
        (Some('x' | 'X' | 'o' | 'b'), RustType::Int(_)) if precision.is_none() => {
            out.extend(kind);
        }
        (Some('f' | 'F'), RustType::Float | RustType::Int(_)) => {
            as_float = ty.is_int();
            out.push('.');
            out.push_str(precision.as_deref().unwrap_or("6"));
        }
        (Some(other), _) => {
            return Err(format!("`{other}` presentation for {}", ty.python_name()));
        }
    }
    Ok(Spec {
        rust: out,
        as_float,
    })
}

impl Lowerer<'_> {
    /// Placeholder and argument that print `expr` the way Python's `str()`
    /// does.
    pub(crate) fn display_arg(&mut self, expr: &Expr) -> (String, String) {
        let code = self.expr(expr);
        display_code(code, self.ty(expr))
    }

    /// Append the display of `expr` to a format string under construction.
    fn push_display(&mut self, expr: &Expr, fmt: &mut String, args: &mut Vec<String>) {
        if let ExprKind::Str(s) = &expr.kind {
            fmt.push_str(&escape_braces(s));
            return;
        }
        let (placeholder, arg) = self.display_arg(expr);
        fmt.push_str(&placeholder);
        if !arg.is_empty() {
            args.push(arg);
        }
    }

    pub(crate) fn fstring(&mut self, parts: &[FStringPart]) -> String {
        let mut fmt = String::new();
        let mut args = Vec::new();
        for part in parts {
            match part {
                FStringPart::Literal(text) => fmt.push_str(&escape_braces(text)),
                FStringPart::Field {
                    expr,
                    conversion,
                    spec,
                } => self.fstring_field(expr, *conversion, spec.as_deref(), &mut fmt, &mut args),
            }
        }
        if args.is_empty() {
            return format!("{:?}.to_string()", unescape_braces(&fmt));
        }
        format_macro("format!", &fmt, &args)
    }

    fn fstring_field(
        &mut self,
        expr: &Expr,
        conversion: Option<char>,
        spec: Option<&str>,
        fmt: &mut String,
        args: &mut Vec<String>,
    ) {
        let ty = self.ty(expr);
        match conversion {
            Some('r') if *ty == RustType::Str && spec.is_none() => {
                fmt.push_str("'{}'");
                args.push(self.expr(expr));
                return;
            }
            Some('r' | 's') | None => {}
            Some(other) => {
                self.unsupported(expr.span, &format!("`!{other}` conversion"));
                return;
            }
        }
        let Some(spec) = spec.filter(|s| !s.is_empty()) else {
            self.push_display(expr, fmt, args);
            return;
        };
        match translate_spec(spec, ty) {
            Ok(translated) => {
                let code = self.expr(expr);
                let arg = if translated.as_float {
                    format!("{} as f64", wrap(&code, CAST))
                } else if *ty == RustType::Bool {
                    format!("if {code} {{ \"True\" }} else {{ \"False\" }}")
                } else {
                    code
                };
                fmt.push_str(&format!("{{:{}}}", translated.rust));
                args.push(arg);
            }
            Err(reason) => {
                self.unsupported(expr.span, &format!("format spec: {reason}"));
            }
        }
    }

    /// `print(*args, sep=, end=)`.
    pub(crate) fn print(&mut self, args: &[Expr], keywords: &[Keyword]) -> String {
        let mut sep = " ".to_string();
        let mut end = "\n".to_string();
        for keyword in keywords {
            let ExprKind::Str(text) = &keyword.value.kind else {
                return self.unsupported(keyword.value.span, "`print` separator that is not a literal");
            };
            match keyword.name.as_str() {
                "sep" => sep = text.clone(),
                "end" => end = text.clone(),
                _ => {}
            }
        }
        let mut fmt = String::new();
        let mut values = Vec::new();
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                fmt.push_str(&escape_braces(&sep));
            }
            self.push_display(arg, &mut fmt, &mut values);
        }
        match end.strip_suffix('\n') {
            Some(rest) => {
                fmt.push_str(&escape_braces(rest));
                if fmt.is_empty() {
                    "println!()".to_string()
                } else {
                    format_macro("println!", &fmt, &values)
                }
            }
            None => {
                fmt.push_str(&escape_braces(&end));
                format_macro("print!", &fmt, &values)
            }
        }
    }
}

/// Placeholder and argument showing `code` of type `ty`.
fn display_code(code: String, ty: &RustType) -> (String, String) {
    match ty {
        RustType::Bool => (
            "{}".to_string(),
            format!("if {code} {{ \"True\" }} else {{ \"False\" }}"),
        ),
        RustType::Float => ("{:?}".to_string(), code),
        RustType::Option(inner) => {
            let item = if **inner == RustType::Bool { "*v" } else { "v" };
            let (placeholder, shown) = display_code(item.to_string(), inner);
            let shown = format_macro("format!", &placeholder, &[shown]);
            (
                "{}".to_string(),
                format!(
                    "{}.as_ref().map_or_else(|| \"None\".to_string(), |v| {shown})",
                    wrap(&code, ATOM)
                ),
            )
        }
        RustType::Vec(_)
        | RustType::HashMap(..)
        | RustType::HashSet(_)
        | RustType::Tuple(_)
        | RustType::Struct(_) => ("{:?}".to_string(), code),
        RustType::Unit => ("None".to_string(), String::new()),
        _ => ("{}".to_string(), code),
    }
}

fn unescape_braces(s: &str) -> String {
    s.replace("{{", "{").replace("}}", "}")
}
