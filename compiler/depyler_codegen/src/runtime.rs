//! Runtime helpers and imports of generated modules.
//!
//! Python semantics without a direct Rust spelling (floor division, modulo
//! of negative numbers, slicing, checked string indexing) lower to calls of
//! small free functions. Lowering records the helpers it refers to in a
//! [`RuntimeHelpers`] set; module assembly emits exactly that set, in flag
//! order, after the user's code.

use bitflags::bitflags;
use depyler_ownership::SharedKind;
use depyler_types::{IntKind, RustType};

bitflags! {
    /// Helper functions a generated module calls.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    pub struct RuntimeHelpers: u32 {
        const FLOOR_DIV_I32 = 1 << 0;
        const FLOOR_DIV_I64 = 1 << 1;
        const FLOOR_DIV_I128 = 1 << 2;
        const MOD_I32 = 1 << 3;
        const MOD_I64 = 1 << 4;
        const MOD_I128 = 1 << 5;
        const MOD_F64 = 1 << 6;
        const GCD_I32 = 1 << 7;
        const GCD_I64 = 1 << 8;
        const GCD_I128 = 1 << 9;
        const RANGE_I32 = 1 << 10;
        const RANGE_I64 = 1 << 11;
        const RANGE_I128 = 1 << 12;
        /// Normalized, `IndexError`-raising list index.
        const LIST_INDEX = 1 << 13;
        /// `char_indices`-based checked string index.
        const STR_INDEX = 1 << 14;
        const SLICE_INDICES = 1 << 15;
        const STR_SLICE = 1 << 16;
        const LIST_SLICE = 1 << 17;
        const STR_FIND = 1 << 18;
        /// The `PyValue` enum of dynamic containers.
        const PY_VALUE = 1 << 19;
    }
}

bitflags! {
    /// `use` lines a generated module needs.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    pub struct Imports: u8 {
        const INDEX_MAP = 1 << 0;
        const INDEX_SET = 1 << 1;
        const RC = 1 << 2;
        const ARC = 1 << 3;
    }
}

impl RuntimeHelpers {
    pub fn floor_div(kind: IntKind) -> Self {
        match kind {
            IntKind::I32 => Self::FLOOR_DIV_I32,
            IntKind::I64 => Self::FLOOR_DIV_I64,
            IntKind::I128 => Self::FLOOR_DIV_I128,
        }
    }

    pub fn modulo(kind: IntKind) -> Self {
        match kind {
            IntKind::I32 => Self::MOD_I32,
            IntKind::I64 => Self::MOD_I64,
            IntKind::I128 => Self::MOD_I128,
        }
    }

    pub fn gcd(kind: IntKind) -> Self {
        match kind {
            IntKind::I32 => Self::GCD_I32,
            IntKind::I64 => Self::GCD_I64,
            IntKind::I128 => Self::GCD_I128,
        }
    }

    pub fn range(kind: IntKind) -> Self {
        match kind {
            IntKind::I32 => Self::RANGE_I32,
            IntKind::I64 => Self::RANGE_I64,
            IntKind::I128 => Self::RANGE_I128,
        }
    }

    /// The set plus every helper its members call.
    pub fn with_dependencies(self) -> Self {
        if self.intersects(Self::STR_SLICE | Self::LIST_SLICE) {
            self | Self::SLICE_INDICES
        } else {
            self
        }
    }

    /// Source text of every helper in the set, in flag order.
    pub fn render(self) -> String {
        let mut out = String::new();
        for (_, flag) in self.with_dependencies().iter_names() {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(&helper_source(flag));
        }
        out
    }
}

/// Name of the floor-division helper for `kind`.
pub(crate) fn floor_div_fn(kind: IntKind) -> String {
    format!("py_floor_div_{}", kind.as_str())
}

pub(crate) fn mod_fn(kind: IntKind) -> String {
    format!("py_mod_{}", kind.as_str())
}

pub(crate) fn gcd_fn(kind: IntKind) -> String {
    format!("py_gcd_{}", kind.as_str())
}

pub(crate) fn range_fn(kind: IntKind) -> String {
    format!("py_range_{}", kind.as_str())
}

fn helper_source(flag: RuntimeHelpers) -> String {
    let with_int = |template: &str, kind: IntKind| template.replace("$int", kind.as_str());
    match flag {
        RuntimeHelpers::FLOOR_DIV_I32 => with_int(FLOOR_DIV, IntKind::I32),
        RuntimeHelpers::FLOOR_DIV_I64 => with_int(FLOOR_DIV, IntKind::I64),
        RuntimeHelpers::FLOOR_DIV_I128 => with_int(FLOOR_DIV, IntKind::I128),
        RuntimeHelpers::MOD_I32 => with_int(MOD_INT, IntKind::I32),
        RuntimeHelpers::MOD_I64 => with_int(MOD_INT, IntKind::I64),
        RuntimeHelpers::MOD_I128 => with_int(MOD_INT, IntKind::I128),
        RuntimeHelpers::MOD_F64 => MOD_F64.to_string(),
        RuntimeHelpers::GCD_I32 => with_int(GCD, IntKind::I32),
        RuntimeHelpers::GCD_I64 => with_int(GCD, IntKind::I64),
        RuntimeHelpers::GCD_I128 => with_int(GCD, IntKind::I128),
        RuntimeHelpers::RANGE_I32 => with_int(RANGE, IntKind::I32),
        RuntimeHelpers::RANGE_I64 => with_int(RANGE, IntKind::I64),
        RuntimeHelpers::RANGE_I128 => with_int(RANGE, IntKind::I128),
        RuntimeHelpers::LIST_INDEX => LIST_INDEX.to_string(),
        RuntimeHelpers::STR_INDEX => STR_INDEX.to_string(),
        RuntimeHelpers::SLICE_INDICES => SLICE_INDICES.to_string(),
        RuntimeHelpers::STR_SLICE => STR_SLICE.to_string(),
        RuntimeHelpers::LIST_SLICE => LIST_SLICE.to_string(),
        RuntimeHelpers::STR_FIND => STR_FIND.to_string(),
        RuntimeHelpers::PY_VALUE => PY_VALUE.to_string(),
        _ => String::new(),
    }
}

impl Imports {
    /// Imports needed to spell `ty`.
    pub fn for_type(ty: &RustType) -> Self {
        match ty {
            RustType::HashMap(k, v) => Self::INDEX_MAP | Self::for_type(k) | Self::for_type(v),
            RustType::HashSet(t) => Self::INDEX_SET | Self::for_type(t),
            RustType::Vec(t) | RustType::Option(t) => Self::for_type(t),
            RustType::Result(t, e) => Self::for_type(t) | Self::for_type(e),
            RustType::Tuple(items) => items
                .iter()
                .fold(Self::empty(), |acc, t| acc | Self::for_type(t)),
            _ => Self::empty(),
        }
    }

    /// Import of a reference-counted pointer.
    pub(crate) fn shared(kind: SharedKind) -> Self {
        match kind {
            SharedKind::Rc => Self::RC,
            SharedKind::Arc => Self::ARC,
        }
    }

    /// The `use` lines, sorted.
    pub fn render(self) -> Vec<&'static str> {
        let mut lines = Vec::new();
        if self.contains(Self::INDEX_MAP) {
            lines.push("use indexmap::IndexMap;");
        }
        if self.contains(Self::INDEX_SET) {
            lines.push("use indexmap::IndexSet;");
        }
        if self.contains(Self::RC) {
            lines.push("use std::rc::Rc;");
        }
        if self.contains(Self::ARC) {
            lines.push("use std::sync::Arc;");
        }
        lines
    }
}

const FLOOR_DIV: &str = "\
fn py_floor_div_$int(a: $int, b: $int) -> $int {
    let q = a / b;
    if a % b != 0 && (a < 0) != (b < 0) {
        q - 1
    } else {
        q
    }
}
";

const MOD_INT: &str = "\
fn py_mod_$int(a: $int, b: $int) -> $int {
    ((a % b) + b) % b
}
";

const MOD_F64: &str = "\
fn py_mod_f64(a: f64, b: f64) -> f64 {
    ((a % b) + b) % b
}
";

const GCD: &str = "\
fn py_gcd_$int(a: $int, b: $int) -> $int {
    let (mut a, mut b) = (a.abs(), b.abs());
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}
";

const RANGE: &str = "\
fn py_range_$int(start: $int, stop: $int, step: $int) -> Vec<$int> {
    assert!(step != 0, \"ValueError: range() arg 3 must not be zero\");
    let mut out = Vec::new();
    let mut i = start;
    while (step > 0 && i < stop) || (step < 0 && i > stop) {
        out.push(i);
        i += step;
    }
    out
}
";

const LIST_INDEX: &str = "\
fn py_index(len: usize, index: i64) -> usize {
    let len = len as i64;
    let i = if index < 0 { index + len } else { index };
    if i < 0 || i >= len {
        panic!(\"IndexError: list index out of range\");
    }
    i as usize
}
";

const STR_INDEX: &str = "\
fn py_str_index(s: &str, index: i64) -> char {
    let len = s.chars().count() as i64;
    let i = if index < 0 { index + len } else { index };
    if i < 0 || i >= len {
        panic!(\"IndexError: string index out of range\");
    }
    match s.char_indices().nth(i as usize) {
        Some((_, c)) => c,
        None => panic!(\"IndexError: string index out of range\"),
    }
}
";

const SLICE_INDICES: &str = "\
fn py_slice_indices(len: usize, start: Option<i64>, stop: Option<i64>, step: Option<i64>) -> Vec<usize> {
    let len = len as i64;
    let step = step.unwrap_or(1);
    assert!(step != 0, \"ValueError: slice step cannot be zero\");
    let adjust = |bound: i64, lo: i64, hi: i64| {
        let b = if bound < 0 { bound + len } else { bound };
        b.clamp(lo, hi)
    };
    let mut out = Vec::new();
    if step > 0 {
        let mut i = start.map_or(0, |s| adjust(s, 0, len));
        let stop = stop.map_or(len, |s| adjust(s, 0, len));
        while i < stop {
            out.push(i as usize);
            i += step;
        }
    } else {
        let mut i = start.map_or(len - 1, |s| adjust(s, -1, len - 1));
        let stop = stop.map_or(-1, |s| adjust(s, -1, len - 1));
        while i > stop {
            out.push(i as usize);
            i += step;
        }
    }
    out
}
";

const STR_SLICE: &str = "\
fn py_str_slice(s: &str, start: Option<i64>, stop: Option<i64>, step: Option<i64>) -> String {
    let chars: Vec<char> = s.chars().collect();
    py_slice_indices(chars.len(), start, stop, step)
        .into_iter()
        .map(|i| chars[i])
        .collect()
}
";

const LIST_SLICE: &str = "\
fn py_list_slice<T: Clone>(items: &[T], start: Option<i64>, stop: Option<i64>, step: Option<i64>) -> Vec<T> {
    py_slice_indices(items.len(), start, stop, step)
        .into_iter()
        .map(|i| items[i].clone())
        .collect()
}
";

const STR_FIND: &str = "\
fn py_str_find(haystack: &str, needle: &str) -> i64 {
    match haystack.find(needle) {
        Some(byte) => haystack.char_indices().take_while(|(i, _)| *i < byte).count() as i64,
        None => -1,
    }
}
";

const PY_VALUE: &str = "\
#[derive(Debug, Clone, PartialEq)]
pub enum PyValue {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<PyValue>),
}

impl PyValue {
    pub fn is_truthy(&self) -> bool {
        match self {
            PyValue::None => false,
            PyValue::Bool(b) => *b,
            PyValue::Int(i) => *i != 0,
            PyValue::Float(f) => *f != 0.0,
            PyValue::Str(s) => !s.is_empty(),
            PyValue::List(items) => !items.is_empty(),
        }
    }

    fn repr(&self) -> String {
        match self {
            PyValue::Str(s) => format!(\"'{s}'\"),
            other => other.to_string(),
        }
    }
}

impl std::fmt::Display for PyValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PyValue::None => write!(f, \"None\"),
            PyValue::Bool(true) => write!(f, \"True\"),
            PyValue::Bool(false) => write!(f, \"False\"),
            PyValue::Int(i) => write!(f, \"{i}\"),
            PyValue::Float(x) => write!(f, \"{x:?}\"),
            PyValue::Str(s) => write!(f, \"{s}\"),
            PyValue::List(items) => {
                let parts: Vec<String> = items.iter().map(PyValue::repr).collect();
                write!(f, \"[{}]\", parts.join(\", \"))
            }
        }
    }
}

impl From<bool> for PyValue {
    fn from(b: bool) -> Self {
        PyValue::Bool(b)
    }
}

impl From<i32> for PyValue {
    fn from(i: i32) -> Self {
        PyValue::Int(i64::from(i))
    }
}

impl From<i64> for PyValue {
    fn from(i: i64) -> Self {
        PyValue::Int(i)
    }
}

impl From<f64> for PyValue {
    fn from(x: f64) -> Self {
        PyValue::Float(x)
    }
}

impl From<String> for PyValue {
    fn from(s: String) -> Self {
        PyValue::Str(s)
    }
}

impl From<&str> for PyValue {
    fn from(s: &str) -> Self {
        PyValue::Str(s.to_string())
    }
}

impl From<char> for PyValue {
    fn from(c: char) -> Self {
        PyValue::Str(c.to_string())
    }
}

impl<T: Into<PyValue>> From<Vec<T>> for PyValue {
    fn from(items: Vec<T>) -> Self {
        PyValue::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<PyValue>> From<Option<T>> for PyValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(PyValue::None, Into::into)
    }
}
";

#[cfg(test)]
mod tests;
