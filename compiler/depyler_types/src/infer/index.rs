//! Index classification.
//!
//! `s[i]` on a `str` or a list is `Implicit` when the index is statically
//! known to be in bounds and `Explicit` otherwise. Proof comes from guards dominating
//! the access:
//!
//! - `for i in range(len(s))` and `for i in range(0, len(s))`
//! - `if 0 <= i < len(s):` and the `and` spellings of both bounds
//! - `if s:`, `if len(s) > 0:` or `if len(s) >= 1:` for the indices `0`/`-1`
//! - a literal index into a name bound once to a string literal
//!
//! A guard stops proving anything inside a body that rebinds the index or
//! the string.

use depyler_ir::ast::{
    BoolOp, CmpOp, Expr, ExprKind, FunctionDef, Stmt, StmtKind, UnaryOp,
};
use depyler_ir::visitor::for_each_stmt;
use rustc_hash::FxHashMap;

/// How a string or list subscript is lowered.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum IndexCheck {
    /// Proven in bounds: direct character access.
    Implicit,
    /// Checked access that raises `IndexError`.
    Explicit,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Fact {
    /// `index` is within `0..len(string)`.
    InBounds { index: String, string: String },
    /// `string` is non-empty.
    NonEmpty { string: String },
}

/// Guard facts in scope at the current point of the walk.
pub(crate) struct IndexFacts {
    active: Vec<Fact>,
    /// Length of names bound exactly once, to a string literal.
    literal_lengths: FxHashMap<String, usize>,
}

impl IndexFacts {
    pub(crate) fn new(function: &FunctionDef) -> Self {
        let mut counts: FxHashMap<&str, usize> = FxHashMap::default();
        let mut literals: FxHashMap<String, usize> = FxHashMap::default();
        for_each_stmt(&function.body, |stmt| {
            for name in bound_names(stmt) {
                *counts.entry(name).or_default() += 1;
            }
            if let StmtKind::Assign { targets, value } = &stmt.kind {
                if let (Some(name), ExprKind::Str(text)) = (single_name(targets), &value.kind) {
                    literals.insert(name.to_string(), text.chars().count());
                }
            }
        });
        for param in &function.params {
            counts.entry(&param.name).or_insert(2);
        }
        literals.retain(|name, _| counts.get(name.as_str()) == Some(&1));
        IndexFacts {
            active: Vec::new(),
            literal_lengths: literals,
        }
    }

    /// Number of active facts, for restoring after a guarded body.
    pub(crate) fn mark(&self) -> usize {
        self.active.len()
    }

    pub(crate) fn restore(&mut self, mark: usize) {
        self.active.truncate(mark);
    }

    /// Facts `for target in iter:` establishes for `body`.
    pub(crate) fn enter_for(&mut self, target: &Expr, iter: &Expr, body: &[Stmt]) {
        let Some(index) = target.as_name() else { return };
        let Some(string) = range_over_len(iter) else { return };
        if !rebinds(body, index) && !rebinds(body, string) {
            self.active.push(Fact::InBounds {
                index: index.to_string(),
                string: string.to_string(),
            });
        }
    }

    /// Facts a true `test` establishes for `body`.
    pub(crate) fn enter_guard(&mut self, test: &Expr, body: &[Stmt]) {
        let mut conjuncts = Vec::new();
        flatten_and(test, &mut conjuncts);

        let mut lower: Vec<&str> = Vec::new();
        let mut upper: Vec<(&str, &str)> = Vec::new();
        for conjunct in conjuncts {
            if let Some(string) = non_empty(conjunct) {
                if !rebinds(body, string) {
                    self.active.push(Fact::NonEmpty {
                        string: string.to_string(),
                    });
                }
                continue;
            }
            if let ExprKind::Compare {
                left,
                ops,
                comparators,
            } = &conjunct.kind
            {
                let mut operands = Vec::with_capacity(comparators.len() + 1);
                operands.push(&**left);
                operands.extend(comparators);
                for (op, pair) in ops.iter().zip(operands.windows(2)) {
                    bound_facts(*op, pair[0], pair[1], &mut lower, &mut upper);
                }
            }
        }

        for (index, string) in upper {
            if lower.contains(&index) && !rebinds(body, index) && !rebinds(body, string) {
                self.active.push(Fact::InBounds {
                    index: index.to_string(),
                    string: string.to_string(),
                });
            }
        }
    }

    /// Classify `receiver[index]` on a string.
    pub(crate) fn classify(&self, receiver: &Expr, index: &Expr) -> IndexCheck {
        let literal = literal_index(index);
        let known_len = match &receiver.kind {
            ExprKind::Str(text) => Some(text.chars().count()),
            ExprKind::Name(name) => self.literal_lengths.get(name).copied(),
            _ => None,
        };

        if let (Some(k), Some(len)) = (literal, known_len) {
            let len = i128::try_from(len).unwrap_or(i128::MAX);
            return if (-len..len).contains(&k) {
                IndexCheck::Implicit
            } else {
                IndexCheck::Explicit
            };
        }

        let Some(string) = receiver.as_name() else {
            return IndexCheck::Explicit;
        };
        let proven = match (literal, index.as_name()) {
            (Some(0 | -1), _) => self.active.iter().any(|fact| {
                matches!(fact, Fact::NonEmpty { string: s } if s == string)
            }),
            (None, Some(name)) => self.active.iter().any(|fact| {
                matches!(fact, Fact::InBounds { index, string: s } if index == name && s == string)
            }),
            _ => false,
        };
        if proven {
            IndexCheck::Implicit
        } else {
            IndexCheck::Explicit
        }
    }
}

fn single_name(targets: &[Expr]) -> Option<&str> {
    match targets {
        [target] => target.as_name(),
        _ => None,
    }
}

/// Names a statement binds directly.
fn bound_names(stmt: &Stmt) -> Vec<&str> {
    let mut names = Vec::new();
    match &stmt.kind {
        StmtKind::Assign { targets, .. } => {
            for target in targets {
                collect_target_names(target, &mut names);
            }
        }
        StmtKind::AnnAssign { target, .. }
        | StmtKind::AugAssign { target, .. }
        | StmtKind::For { target, .. } => collect_target_names(target, &mut names),
        _ => {}
    }
    names
}

fn collect_target_names<'a>(target: &'a Expr, out: &mut Vec<&'a str>) {
    match &target.kind {
        ExprKind::Name(name) => out.push(name),
        ExprKind::Tuple(items) | ExprKind::List(items) => {
            for item in items {
                collect_target_names(item, out);
            }
        }
        _ => {}
    }
}

/// Whether any statement in `body`, at any depth, rebinds `name`.
fn rebinds(body: &[Stmt], name: &str) -> bool {
    let mut found = false;
    for_each_stmt(body, |stmt| {
        if bound_names(stmt).contains(&name) {
            found = true;
        }
    });
    found
}

/// `range(len(s))` or `range(0, len(s))`, returning `s`.
fn range_over_len(iter: &Expr) -> Option<&str> {
    let ExprKind::Call { func, args, keywords } = &iter.kind else {
        return None;
    };
    if func.as_name() != Some("range") || !keywords.is_empty() {
        return None;
    }
    match args.as_slice() {
        [stop] => len_of(stop),
        [start, stop] if literal_index(start) == Some(0) => len_of(stop),
        _ => None,
    }
}

/// `len(s)`, returning `s`.
fn len_of(expr: &Expr) -> Option<&str> {
    match &expr.kind {
        ExprKind::Call { func, args, keywords }
            if func.as_name() == Some("len") && keywords.is_empty() =>
        {
            match args.as_slice() {
                [arg] => arg.as_name(),
                _ => None,
            }
        }
        _ => None,
    }
}

/// Integer literal, including a negated one.
pub(super) fn literal_index(expr: &Expr) -> Option<i128> {
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

fn flatten_and<'a>(expr: &'a Expr, out: &mut Vec<&'a Expr>) {
    match &expr.kind {
        ExprKind::BoolOp {
            op: BoolOp::And,
            values,
        } => {
            for value in values {
                flatten_and(value, out);
            }
        }
        _ => out.push(expr),
    }
}

/// `s`, `len(s) > 0`, `len(s) >= 1`, `len(s) != 0` or `s != ""`.
fn non_empty(expr: &Expr) -> Option<&str> {
    if let Some(name) = expr.as_name() {
        return Some(name);
    }
    let ExprKind::Compare {
        left,
        ops,
        comparators,
    } = &expr.kind
    else {
        return None;
    };
    let ([op], [right]) = (ops.as_slice(), comparators.as_slice()) else {
        return None;
    };
    let literal = literal_index(right);
    match (len_of(left), op, literal) {
        (Some(s), CmpOp::Gt | CmpOp::NotEq, Some(0)) | (Some(s), CmpOp::GtE, Some(1)) => Some(s),
        _ => match (&left.kind, op, &right.kind) {
            (ExprKind::Name(s), CmpOp::NotEq, ExprKind::Str(text)) if text.is_empty() => {
                Some(s.as_str())
            }
            _ => None,
        },
    }
}

/// Lower (`0 <= i`) and upper (`i < len(s)`) bounds from one comparison.
fn bound_facts<'a>(
    op: CmpOp,
    left: &'a Expr,
    right: &'a Expr,
    lower: &mut Vec<&'a str>,
    upper: &mut Vec<(&'a str, &'a str)>,
) {
    let (small, large, strict) = match op {
        CmpOp::Lt => (left, right, true),
        CmpOp::LtE => (left, right, false),
        CmpOp::Gt => (right, left, true),
        CmpOp::GtE => (right, left, false),
        _ => return,
    };
    // 0 <= i
    if literal_index(small) == Some(0) || (strict && literal_index(small) == Some(-1)) {
        if let Some(index) = large.as_name() {
            lower.push(index);
        }
    }
    // i < len(s)
    if strict {
        if let (Some(index), Some(string)) = (small.as_name(), len_of(large)) {
            upper.push((index, string));
        }
    }
}
