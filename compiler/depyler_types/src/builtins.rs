//! Builtin functions, methods and `math` members.
//!
//! Lookup goes from a name to a tag; inference and lowering both dispatch on
//! the tag. The table is built once on first use and is read-only after.

use std::sync::LazyLock;

use rustc_hash::FxHashMap;

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Builtin {
    Len,
    Int,
    Float,
    Str,
    Bool,
    Abs,
    Min,
    Max,
    Sum,
    Range,
    Print,
    List,
    Dict,
    Set,
    Sorted,
    Reversed,
    Enumerate,
    Zip,
    Ord,
    Chr,
    Any,
    All,
    Round,
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum MathMember {
    Sqrt,
    Floor,
    Ceil,
    Fabs,
    Gcd,
    Pi,
    E,
}

impl MathMember {
    pub fn is_constant(self) -> bool {
        matches!(self, MathMember::Pi | MathMember::E)
    }
}

/// Receiver family a method is looked up under.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Receiver {
    List,
    Str,
    Dict,
    Set,
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Method {
    // list
    Append,
    Extend,
    Insert,
    Pop,
    Remove,
    Index,
    Count,
    Reverse,
    Sort,
    Clear,
    Copy,
    // str
    Upper,
    Lower,
    Strip,
    Lstrip,
    Rstrip,
    Split,
    Join,
    Replace,
    StartsWith,
    EndsWith,
    Find,
    IsDigit,
    IsAlpha,
    IsSpace,
    IsUpper,
    IsLower,
    // dict
    Get,
    Keys,
    Values,
    Items,
    Update,
    // set
    Add,
    Discard,
    Union,
    Intersection,
    Difference,
}

impl Method {
    /// Whether the method changes its receiver in place.
    pub fn mutates_receiver(self) -> bool {
        matches!(
            self,
            Method::Append
                | Method::Extend
                | Method::Insert
                | Method::Pop
                | Method::Remove
                | Method::Reverse
                | Method::Sort
                | Method::Clear
                | Method::Update
                | Method::Add
                | Method::Discard
        )
    }
}

/// Exception classes accepted in `raise`.
pub const EXCEPTIONS: &[&str] = &[
    "Exception",
    "ValueError",
    "TypeError",
    "IndexError",
    "KeyError",
    "ZeroDivisionError",
    "RuntimeError",
    "AssertionError",
    "NotImplementedError",
    "ArithmeticError",
    "OverflowError",
];

/// Builtins that inspect or rebind names at runtime. The validator rejects
/// them before inference runs.
pub const DYNAMIC_BUILTINS: &[&str] = &[
    "getattr",
    "setattr",
    "hasattr",
    "delattr",
    "eval",
    "exec",
    "compile",
    "globals",
    "locals",
    "vars",
    "__import__",
];

/// Builtins with no lowering.
pub const UNSUPPORTED_BUILTINS: &[&str] = &[
    "isinstance",
    "issubclass",
    "type",
    "id",
    "hash",
    "map",
    "filter",
    "iter",
    "next",
    "open",
    "input",
    "callable",
    "super",
    "format",
    "repr",
    "divmod",
    "pow",
    "bytes",
    "bytearray",
    "frozenset",
    "object",
    "tuple",
];

pub struct BuiltinTable {
    functions: FxHashMap<&'static str, Builtin>,
    methods: FxHashMap<(Receiver, &'static str), Method>,
    math: FxHashMap<&'static str, MathMember>,
}

static TABLE: LazyLock<BuiltinTable> = LazyLock::new(BuiltinTable::build);

impl BuiltinTable {
    pub fn get() -> &'static BuiltinTable {
        &TABLE
    }

    fn build() -> BuiltinTable {
        use Builtin as B;
        use Method as M;

        let functions = [
            ("len", B::Len),
            ("int", B::Int),
            ("float", B::Float),
            ("str", B::Str),
            ("bool", B::Bool),
            ("abs", B::Abs),
            ("min", B::Min),
            ("max", B::Max),
            ("sum", B::Sum),
            ("range", B::Range),
            ("print", B::Print),
            ("list", B::List),
            ("dict", B::Dict),
            ("set", B::Set),
            ("sorted", B::Sorted),
            ("reversed", B::Reversed),
            ("enumerate", B::Enumerate),
            ("zip", B::Zip),
            ("ord", B::Ord),
            ("chr", B::Chr),
            ("any", B::Any),
            ("all", B::All),
            ("round", B::Round),
        ]
        .into_iter()
        .collect();

        let list = [
            ("append", M::Append),
            ("extend", M::Extend),
            ("insert", M::Insert),
            ("pop", M::Pop),
            ("remove", M::Remove),
            ("index", M::Index),
            ("count", M::Count),
            ("reverse", M::Reverse),
            ("sort", M::Sort),
            ("clear", M::Clear),
            ("copy", M::Copy),
        ];
        let string = [
            ("upper", M::Upper),
            ("lower", M::Lower),
            ("strip", M::Strip),
            ("lstrip", M::Lstrip),
            ("rstrip", M::Rstrip),
            ("split", M::Split),
            ("join", M::Join),
            ("replace", M::Replace),
            ("startswith", M::StartsWith),
            ("endswith", M::EndsWith),
            ("find", M::Find),
            ("count", M::Count),
            ("index", M::Index),
            ("isdigit", M::IsDigit),
            ("isalpha", M::IsAlpha),
            ("isspace", M::IsSpace),
            ("isupper", M::IsUpper),
            ("islower", M::IsLower),
        ];
        let dict = [
            ("get", M::Get),
            ("keys", M::Keys),
            ("values", M::Values),
            ("items", M::Items),
            ("pop", M::Pop),
            ("update", M::Update),
            ("clear", M::Clear),
            ("copy", M::Copy),
        ];
        let set = [
            ("add", M::Add),
            ("discard", M::Discard),
            ("remove", M::Remove),
            ("union", M::Union),
            ("intersection", M::Intersection),
            ("difference", M::Difference),
            ("clear", M::Clear),
            ("copy", M::Copy),
        ];

        let mut methods = FxHashMap::default();
        for (receiver, entries) in [
            (Receiver::List, &list[..]),
            (Receiver::Str, &string[..]),
            (Receiver::Dict, &dict[..]),
            (Receiver::Set, &set[..]),
        ] {
            for &(name, method) in entries {
                methods.insert((receiver, name), method);
            }
        }

        let math = [
            ("sqrt", MathMember::Sqrt),
            ("floor", MathMember::Floor),
            ("ceil", MathMember::Ceil),
            ("fabs", MathMember::Fabs),
            ("gcd", MathMember::Gcd),
            ("pi", MathMember::Pi),
            ("e", MathMember::E),
        ]
        .into_iter()
        .collect();

        BuiltinTable {
            functions,
            methods,
            math,
        }
    }

    pub fn function(&self, name: &str) -> Option<Builtin> {
        self.functions.get(name).copied()
    }

    pub fn method(&self, receiver: Receiver, name: &str) -> Option<Method> {
        self.methods.get(&(receiver, name)).copied()
    }

    pub fn math(&self, name: &str) -> Option<MathMember> {
        self.math.get(name).copied()
    }

    pub fn is_exception(name: &str) -> bool {
        EXCEPTIONS.contains(&name)
    }

    pub fn is_dynamic(name: &str) -> bool {
        DYNAMIC_BUILTINS.contains(&name)
    }

    pub fn is_unsupported(name: &str) -> bool {
        UNSUPPORTED_BUILTINS.contains(&name)
    }

    /// The only receiver family defining `name`, if exactly one does.
    pub fn unique_receiver(&self, name: &str) -> Option<Receiver> {
        let mut found = None;
        for receiver in [Receiver::List, Receiver::Str, Receiver::Dict, Receiver::Set] {
            if self.methods.contains_key(&(receiver, name)) {
                if found.is_some() {
                    return None;
                }
                found = Some(receiver);
            }
        }
        found
    }
}

#[cfg(test)]
mod tests;
