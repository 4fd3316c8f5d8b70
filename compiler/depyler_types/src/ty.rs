//! Rust types assigned to Python expressions.

use std::fmt;

/// Width every `int` of one function lowers to.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, PartialOrd, Ord, Default)]
pub enum IntKind {
    I32,
    #[default]
    I64,
    I128,
}

impl IntKind {
    pub fn as_str(self) -> &'static str {
        match self {
            IntKind::I32 => "i32",
            IntKind::I64 => "i64",
            IntKind::I128 => "i128",
        }
    }

    /// Whether `value` is representable.
    pub fn fits(self, value: i128) -> bool {
        match self {
            IntKind::I32 => i32::try_from(value).is_ok(),
            IntKind::I64 => i64::try_from(value).is_ok(),
            IntKind::I128 => true,
        }
    }
}

/// Inference variable, resolved through the [`Unifier`](crate::Unifier).
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, PartialOrd, Ord)]
pub struct TypeVar(pub u32);

#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum RustType {
    Int(IntKind),
    /// `f64`; the only float width.
    Float,
    Bool,
    /// A single character, from string indexing and iteration.
    Char,
    Str,
    Vec(Box<RustType>),
    HashMap(Box<RustType>, Box<RustType>),
    HashSet(Box<RustType>),
    Tuple(Vec<RustType>),
    Option(Box<RustType>),
    Result(Box<RustType>, Box<RustType>),
    /// A user class lowered to a struct.
    Struct(String),
    Unit,
    /// Tagged `PyValue` for heterogeneous containers under
    /// `container_typing = "dynamic"`.
    Dynamic,
    Var(TypeVar),
    /// Type of an erroneous expression. Unifies with anything without
    /// further diagnostics.
    Unresolved,
}

impl RustType {
    pub fn vec(elem: RustType) -> RustType {
        RustType::Vec(Box::new(elem))
    }

    pub fn hash_map(key: RustType, value: RustType) -> RustType {
        RustType::HashMap(Box::new(key), Box::new(value))
    }

    pub fn hash_set(elem: RustType) -> RustType {
        RustType::HashSet(Box::new(elem))
    }

    pub fn option(inner: RustType) -> RustType {
        RustType::Option(Box::new(inner))
    }

    pub fn is_int(&self) -> bool {
        matches!(self, RustType::Int(_))
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, RustType::Int(_) | RustType::Float)
    }

    pub fn is_stringlike(&self) -> bool {
        matches!(self, RustType::Str | RustType::Char)
    }

    /// Values that are `Copy` in the generated code.
    pub fn is_copy(&self) -> bool {
        match self {
            RustType::Int(_)
            | RustType::Float
            | RustType::Bool
            | RustType::Char
            | RustType::Unit => true,
            RustType::Tuple(items) => items.iter().all(RustType::is_copy),
            RustType::Option(inner) => inner.is_copy(),
            _ => false,
        }
    }

    /// Values owning heap memory, which ownership resolution tracks.
    pub fn is_heap(&self) -> bool {
        !self.is_copy() && !matches!(self, RustType::Var(_) | RustType::Unresolved)
    }

    /// Whether the type still contains a variable or `Unresolved`.
    pub fn is_incomplete(&self) -> bool {
        match self {
            RustType::Var(_) | RustType::Unresolved => true,
            RustType::Vec(t) | RustType::HashSet(t) | RustType::Option(t) => t.is_incomplete(),
            RustType::HashMap(k, v) | RustType::Result(k, v) => {
                k.is_incomplete() || v.is_incomplete()
            }
            RustType::Tuple(items) => items.iter().any(RustType::is_incomplete),
            _ => false,
        }
    }

    /// Whether the type still contains an inference variable.
    pub fn has_vars(&self) -> bool {
        match self {
            RustType::Var(_) => true,
            RustType::Vec(t) | RustType::HashSet(t) | RustType::Option(t) => t.has_vars(),
            RustType::HashMap(k, v) | RustType::Result(k, v) => k.has_vars() || v.has_vars(),
            RustType::Tuple(items) => items.iter().any(RustType::has_vars),
            _ => false,
        }
    }

    /// Whether a value of this type can key a `HashMap` or fill a `HashSet`.
    pub fn is_hashable(&self) -> bool {
        match self {
            RustType::Float | RustType::Dynamic => false,
            RustType::Vec(t) | RustType::HashSet(t) | RustType::Option(t) => t.is_hashable(),
            RustType::HashMap(..) => false,
            RustType::Tuple(items) => items.iter().all(RustType::is_hashable),
            _ => true,
        }
    }

    /// Whether every set element and map key inside the type is hashable.
    pub fn keys_hashable(&self) -> bool {
        match self {
            RustType::HashSet(t) => t.is_hashable() && t.keys_hashable(),
            RustType::HashMap(k, v) => k.is_hashable() && k.keys_hashable() && v.keys_hashable(),
            RustType::Vec(t) | RustType::Option(t) => t.keys_hashable(),
            RustType::Result(t, e) => t.keys_hashable() && e.keys_hashable(),
            RustType::Tuple(items) => items.iter().all(RustType::keys_hashable),
            _ => true,
        }
    }

    pub fn contains_var(&self, var: TypeVar) -> bool {
        match self {
            RustType::Var(v) => *v == var,
            RustType::Vec(t) | RustType::HashSet(t) | RustType::Option(t) => t.contains_var(var),
            RustType::HashMap(k, v) | RustType::Result(k, v) => {
                k.contains_var(var) || v.contains_var(var)
            }
            RustType::Tuple(items) => items.iter().any(|t| t.contains_var(var)),
            _ => false,
        }
    }

    /// Element type produced by iterating a value of this type.
    pub fn iter_item(&self) -> Option<RustType> {
        match self {
            RustType::Vec(t) | RustType::HashSet(t) => Some((**t).clone()),
            RustType::HashMap(k, _) => Some((**k).clone()),
            RustType::Str => Some(RustType::Char),
            RustType::Dynamic => Some(RustType::Dynamic),
            _ => None,
        }
    }

    /// Rust spelling, e.g. `IndexMap<String, Vec<i64>>`. Dicts and sets keep
    /// insertion order, so they are spelled with `indexmap`.
    pub fn render(&self) -> String {
        match self {
            RustType::Int(kind) => kind.as_str().to_string(),
            RustType::Float => "f64".to_string(),
            RustType::Bool => "bool".to_string(),
            RustType::Char => "char".to_string(),
            RustType::Str => "String".to_string(),
            RustType::Vec(t) => format!("Vec<{}>", t.render()),
            RustType::HashMap(k, v) => format!("IndexMap<{}, {}>", k.render(), v.render()),
            RustType::HashSet(t) => format!("IndexSet<{}>", t.render()),
            RustType::Tuple(items) if items.len() == 1 => format!("({},)", items[0].render()),
            RustType::Tuple(items) => {
                let parts: Vec<_> = items.iter().map(RustType::render).collect();
                format!("({})", parts.join(", "))
            }
            RustType::Option(t) => format!("Option<{}>", t.render()),
            RustType::Result(t, e) => format!("Result<{}, {}>", t.render(), e.render()),
            RustType::Struct(name) => name.clone(),
            RustType::Unit => "()".to_string(),
            RustType::Dynamic => "PyValue".to_string(),
            RustType::Var(_) | RustType::Unresolved => "_".to_string(),
        }
    }

    /// Python spelling used in diagnostics, e.g. `dict[str, list[int]]`.
    pub fn python_name(&self) -> String {
        match self {
            RustType::Int(_) => "int".to_string(),
            RustType::Float => "float".to_string(),
            RustType::Bool => "bool".to_string(),
            RustType::Char | RustType::Str => "str".to_string(),
            RustType::Vec(t) => format!("list[{}]", t.python_name()),
            RustType::HashMap(k, v) => format!("dict[{}, {}]", k.python_name(), v.python_name()),
            RustType::HashSet(t) => format!("set[{}]", t.python_name()),
            RustType::Tuple(items) => {
                let parts: Vec<_> = items.iter().map(RustType::python_name).collect();
                format!("tuple[{}]", parts.join(", "))
            }
            RustType::Option(t) => format!("Optional[{}]", t.python_name()),
            RustType::Result(t, _) => t.python_name(),
            RustType::Struct(name) => name.clone(),
            RustType::Unit => "None".to_string(),
            RustType::Dynamic => "Any".to_string(),
            RustType::Var(_) | RustType::Unresolved => "unknown".to_string(),
        }
    }
}

impl fmt::Display for RustType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}
