//! Output buffer and bookkeeping for lowering one function.
//!
//! The `CodegenContext` owns the text being generated together with what
//! the text needs around it: the runtime helpers and `use` lines it refers
//! to, and the Python line every statement came from.

use depyler_types::RustType;

use crate::runtime::{Imports, RuntimeHelpers};

pub(crate) struct CodegenContext {
    /// Current indentation level.
    indent: usize,
    output: String,
    /// Lines written so far.
    line: u32,
    /// `(line within output, python line)`, in output order.
    mappings: Vec<(u32, u32)>,
    helpers: RuntimeHelpers,
    imports: Imports,
    /// Counter for generating unique temporary names.
    temp_counter: u32,
}

impl CodegenContext {
    pub(crate) fn new(indent: usize) -> Self {
        CodegenContext {
            indent,
            output: String::with_capacity(4096),
            line: 0,
            mappings: Vec::new(),
            helpers: RuntimeHelpers::empty(),
            imports: Imports::empty(),
            temp_counter: 0,
        }
    }

    /// Generate a unique temporary variable name.
    pub(crate) fn fresh_temp(&mut self) -> String {
        let n = self.temp_counter;
        self.temp_counter += 1;
        format!("_t{n}")
    }

    pub(crate) fn indent(&mut self) {
        self.indent += 1;
    }

    pub(crate) fn dedent(&mut self) {
        debug_assert!(self.indent > 0, "dedent called with zero indent");
        self.indent = self.indent.saturating_sub(1);
    }

    fn write_indent(&mut self) {
        for _ in 0..self.indent {
            self.output.push_str("    ");
        }
    }

    /// Write one line with indentation.
    pub(crate) fn writeln(&mut self, s: &str) {
        if !s.is_empty() {
            self.write_indent();
        }
        self.output.push_str(s);
        self.output.push('\n');
        self.line += 1 + count_newlines(s);
    }

    /// The next line written comes from `python_line`.
    pub(crate) fn map_line(&mut self, python_line: u32) {
        if self.mappings.last().is_some_and(|(line, _)| *line == self.line) {
            self.mappings.pop();
        }
        self.mappings.push((self.line, python_line));
    }

    pub(crate) fn use_helper(&mut self, helper: RuntimeHelpers) {
        self.helpers |= helper.with_dependencies();
    }

    pub(crate) fn use_import(&mut self, import: Imports) {
        self.imports |= import;
    }

    /// Rust spelling of `ty`, noting the imports it needs.
    pub(crate) fn render_type(&mut self, ty: &RustType) -> String {
        self.note_type(ty);
        ty.render()
    }

    /// Record the imports and helpers a type refers to.
    pub(crate) fn note_type(&mut self, ty: &RustType) {
        self.imports |= Imports::for_type(ty);
        if contains_dynamic(ty) {
            self.helpers |= RuntimeHelpers::PY_VALUE;
        }
    }

    pub(crate) fn finish(self) -> (String, Vec<(u32, u32)>, RuntimeHelpers, Imports) {
        (self.output, self.mappings, self.helpers, self.imports)
    }
}

fn count_newlines(s: &str) -> u32 {
    u32::try_from(s.bytes().filter(|b| *b == b'\n').count()).unwrap_or(u32::MAX)
}

fn contains_dynamic(ty: &RustType) -> bool {
    match ty {
        RustType::Dynamic => true,
        RustType::Vec(t) | RustType::HashSet(t) | RustType::Option(t) => contains_dynamic(t),
        RustType::HashMap(k, v) | RustType::Result(k, v) => {
            contains_dynamic(k) || contains_dynamic(v)
        }
        RustType::Tuple(items) => items.iter().any(contains_dynamic),
        _ => false,
    }
}
