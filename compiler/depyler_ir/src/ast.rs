//! Python AST for the supported subset.
//!
//! Every statement and expression carries a [`NodeId`] unique within its
//! module. Later phases attach their results in side tables keyed by
//! `NodeId` instead of mutating the tree, so the tree itself is immutable
//! once the parser hands it over.
//!
//! Constructs the pipeline cannot lower still parse: they become
//! `StmtKind::Unsupported` / `ExprKind::Unsupported` nodes so the failure is
//! reported against the enclosing function instead of the whole module.

use std::fmt;

use crate::Span;

/// Identifier of a statement, expression or parameter within one module.
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord, Debug, Default)]
pub struct NodeId(pub u32);

impl NodeId {
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// A parsed module.
#[derive(Clone, Debug, PartialEq)]
pub struct Module {
    pub items: Vec<Item>,
    pub span: Span,
    /// One past the largest `NodeId` handed out by the parser.
    pub node_count: u32,
}

impl Module {
    pub fn functions(&self) -> impl Iterator<Item = &FunctionDef> {
        self.items.iter().filter_map(|item| match item {
            Item::Function(f) => Some(f),
            _ => None,
        })
    }

    pub fn classes(&self) -> impl Iterator<Item = &ClassDef> {
        self.items.iter().filter_map(|item| match item {
            Item::Class(c) => Some(c),
            _ => None,
        })
    }
}

/// Top-level module item.
#[derive(Clone, Debug, PartialEq)]
pub enum Item {
    Function(FunctionDef),
    Class(ClassDef),
    Import(Import),
    /// Module-level statement (constants, top-level calls).
    Statement(Stmt),
}

/// `import m` / `from m import a as b`.
#[derive(Clone, Debug, PartialEq)]
pub struct Import {
    pub module: String,
    /// Imported names with optional alias; empty for `import m`.
    pub names: Vec<(String, Option<String>)>,
    pub alias: Option<String>,
    pub span: Span,
}

/// A comment line preceding a definition (pragma candidates).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommentLine {
    /// Full comment text including the leading `#`.
    pub text: String,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Decorator {
    /// Dotted decorator name, e.g. `staticmethod` or `functools.cache`.
    pub name: String,
    pub has_arguments: bool,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Param {
    pub id: NodeId,
    pub name: String,
    pub annotation: Option<TypeExpr>,
    pub default: Option<Expr>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FunctionDef {
    pub id: NodeId,
    pub name: String,
    pub name_span: Span,
    pub params: Vec<Param>,
    pub returns: Option<TypeExpr>,
    pub body: Vec<Stmt>,
    pub decorators: Vec<Decorator>,
    pub pragmas: Vec<CommentLine>,
    pub docstring: Option<String>,
    pub span: Span,
}

impl FunctionDef {
    pub fn has_decorator(&self, name: &str) -> bool {
        self.decorators.iter().any(|d| d.name == name)
    }

    pub fn is_static(&self) -> bool {
        self.has_decorator("staticmethod")
    }
}

/// A class attribute declared in the class body (`x: int` or `x: int = 0`).
#[derive(Clone, Debug, PartialEq)]
pub struct ClassField {
    pub name: String,
    pub annotation: Option<TypeExpr>,
    pub default: Option<Expr>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ClassDef {
    pub id: NodeId,
    pub name: String,
    pub name_span: Span,
    pub bases: Vec<String>,
    pub fields: Vec<ClassField>,
    pub methods: Vec<FunctionDef>,
    /// Class-body statements with no struct/impl meaning.
    pub unsupported: Vec<Stmt>,
    pub decorators: Vec<Decorator>,
    pub pragmas: Vec<CommentLine>,
    pub docstring: Option<String>,
    pub span: Span,
}

impl ClassDef {
    pub fn is_dataclass(&self) -> bool {
        self.decorators.iter().any(|d| d.name == "dataclass")
    }

    pub fn method(&self, name: &str) -> Option<&FunctionDef> {
        self.methods.iter().find(|m| m.name == name)
    }
}

// Statements

#[derive(Clone, Debug, PartialEq)]
pub struct Stmt {
    pub id: NodeId,
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum StmtKind {
    Expr(Expr),
    /// `a = b = value`; `targets` holds every left-hand side.
    Assign {
        targets: Vec<Expr>,
        value: Expr,
    },
    AnnAssign {
        target: Expr,
        annotation: TypeExpr,
        value: Option<Expr>,
    },
    AugAssign {
        target: Expr,
        op: BinOp,
        value: Expr,
    },
    Return(Option<Expr>),
    /// `elif` chains nest as a single `If` in `orelse`.
    If {
        test: Expr,
        body: Vec<Stmt>,
        orelse: Vec<Stmt>,
    },
    While {
        test: Expr,
        body: Vec<Stmt>,
    },
    For {
        target: Expr,
        iter: Expr,
        body: Vec<Stmt>,
    },
    Break,
    Continue,
    Pass,
    Assert {
        test: Expr,
        msg: Option<Expr>,
    },
    Raise(Option<Expr>),
    /// Parsed but not lowerable (`try`, `with`, `global`, nested `def`, ...).
    Unsupported {
        construct: String,
    },
}

// Expressions

#[derive(Clone, Debug, PartialEq)]
pub struct Expr {
    pub id: NodeId,
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    /// Name of a plain `Name` expression.
    pub fn as_name(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Name(name) => Some(name),
            _ => None,
        }
    }

    /// `self.<attr>` target, returning the attribute name.
    pub fn as_self_attribute(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Attribute { value, attr } if value.as_name() == Some("self") => Some(attr),
            _ => None,
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(
            self.kind,
            ExprKind::Int(_)
                | ExprKind::BigInt(_)
                | ExprKind::Float(_)
                | ExprKind::Str(_)
                | ExprKind::Bool(_)
                | ExprKind::NoneLit
        )
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ExprKind {
    Int(i128),
    /// Integer literal outside the `i128` range, kept as its digits.
    BigInt(String),
    Float(f64),
    Str(String),
    FString(Vec<FStringPart>),
    Bool(bool),
    NoneLit,
    Name(String),
    Attribute {
        value: Box<Expr>,
        attr: String,
    },
    Subscript {
        value: Box<Expr>,
        index: Box<Expr>,
    },
    /// Only valid as the index of a `Subscript`.
    Slice {
        lower: Option<Box<Expr>>,
        upper: Option<Box<Expr>>,
        step: Option<Box<Expr>>,
    },
    Call {
        func: Box<Expr>,
        args: Vec<Expr>,
        keywords: Vec<Keyword>,
    },
    BinOp {
        left: Box<Expr>,
        op: BinOp,
        right: Box<Expr>,
    },
    UnaryOp {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    BoolOp {
        op: BoolOp,
        values: Vec<Expr>,
    },
    Compare {
        left: Box<Expr>,
        ops: Vec<CmpOp>,
        comparators: Vec<Expr>,
    },
    IfExp {
        test: Box<Expr>,
        body: Box<Expr>,
        orelse: Box<Expr>,
    },
    List(Vec<Expr>),
    Tuple(Vec<Expr>),
    Set(Vec<Expr>),
    Dict {
        keys: Vec<Expr>,
        values: Vec<Expr>,
    },
    ListComp {
        elt: Box<Expr>,
        generators: Vec<Comprehension>,
    },
    SetComp {
        elt: Box<Expr>,
        generators: Vec<Comprehension>,
    },
    DictComp {
        key: Box<Expr>,
        value: Box<Expr>,
        generators: Vec<Comprehension>,
    },
    GeneratorExp {
        elt: Box<Expr>,
        generators: Vec<Comprehension>,
    },
    /// Parsed but not lowerable (`lambda`, `yield`, walrus, starred, ...).
    Unsupported {
        construct: String,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Keyword {
    pub name: String,
    pub value: Expr,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Comprehension {
    pub target: Expr,
    pub iter: Expr,
    pub ifs: Vec<Expr>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum FStringPart {
    Literal(String),
    Field {
        expr: Box<Expr>,
        /// `!r` / `!s` / `!a` conversion character.
        conversion: Option<char>,
        /// Format spec after `:`, e.g. `.2f`.
        spec: Option<String>,
    },
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
    LShift,
    RShift,
    BitOr,
    BitXor,
    BitAnd,
    MatMul,
}

impl BinOp {
    pub fn as_python(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::FloorDiv => "//",
            BinOp::Mod => "%",
            BinOp::Pow => "**",
            BinOp::LShift => "<<",
            BinOp::RShift => ">>",
            BinOp::BitOr => "|",
            BinOp::BitXor => "^",
            BinOp::BitAnd => "&",
            BinOp::MatMul => "@",
        }
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_python())
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum UnaryOp {
    Not,
    Neg,
    Pos,
    Invert,
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum BoolOp {
    And,
    Or,
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum CmpOp {
    Eq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
    Is,
    IsNot,
    In,
    NotIn,
}

impl CmpOp {
    pub fn as_python(self) -> &'static str {
        match self {
            CmpOp::Eq => "==",
            CmpOp::NotEq => "!=",
            CmpOp::Lt => "<",
            CmpOp::LtE => "<=",
            CmpOp::Gt => ">",
            CmpOp::GtE => ">=",
            CmpOp::Is => "is",
            CmpOp::IsNot => "is not",
            CmpOp::In => "in",
            CmpOp::NotIn => "not in",
        }
    }
}

// Type annotations

/// A type annotation as written in the source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeExpr {
    pub kind: TypeExprKind,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeExprKind {
    /// `int`, `str`, `Point`, `List` ...
    Name(String),
    /// `list[int]`, `Dict[str, int]`, `Optional[int]`.
    Generic { base: String, args: Vec<TypeExpr> },
    /// `None`
    NoneType,
    /// Annotation shape with no type meaning (string annotations, calls, ...).
    Invalid(String),
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            TypeExprKind::Name(name) => f.write_str(name),
            TypeExprKind::Generic { base, args } => {
                write!(f, "{base}[")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str("]")
            }
            TypeExprKind::NoneType => f.write_str("None"),
            TypeExprKind::Invalid(text) => f.write_str(text),
        }
    }
}

#[cfg(test)]
mod tests;
