//! Ownership annotations.

use std::fmt;

/// Allocation pool of one function invocation under
/// `memory_strategy = "arena"`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct PoolId(pub u32);

/// Reference-counting flavor of a shared binding.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SharedKind {
    Rc,
    /// `thread_safety = "required"`.
    Arc,
}

impl SharedKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SharedKind::Rc => "Rc",
            SharedKind::Arc => "Arc",
        }
    }
}

/// What a borrow is borrowed from.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BorrowScope {
    /// The caller's value, for parameters.
    Caller,
    /// An arena allocation of this function.
    Arena(PoolId),
}

/// How a binding holds its value.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum OwnershipTag {
    Owned,
    Borrowed { scope: BorrowScope, mutable: bool },
    Shared(SharedKind),
    Arena { pool: PoolId },
}

impl fmt::Display for OwnershipTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OwnershipTag::Owned => f.write_str("owned"),
            OwnershipTag::Borrowed { scope, mutable } => {
                let kind = if *mutable { "borrowed mut" } else { "borrowed" };
                match scope {
                    BorrowScope::Caller => f.write_str(kind),
                    BorrowScope::Arena(pool) => write!(f, "{kind} from arena {}", pool.0),
                }
            }
            OwnershipTag::Shared(kind) => write!(f, "shared ({})", kind.as_str()),
            OwnershipTag::Arena { pool } => write!(f, "arena {}", pool.0),
        }
    }
}

/// How a parameter is passed.
///
/// Ordered by strength: inference only ever moves a parameter up.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ParamMode {
    /// `Copy` value.
    ByValue,
    /// `&T` (`&str`, `&[T]` for strings and lists).
    Borrowed,
    /// `&mut T`.
    BorrowedMut,
    /// `T`.
    Owned,
}

impl ParamMode {
    pub fn tag(self) -> OwnershipTag {
        match self {
            ParamMode::ByValue | ParamMode::Owned => OwnershipTag::Owned,
            ParamMode::Borrowed => OwnershipTag::Borrowed {
                scope: BorrowScope::Caller,
                mutable: false,
            },
            ParamMode::BorrowedMut => OwnershipTag::Borrowed {
                scope: BorrowScope::Caller,
                mutable: true,
            },
        }
    }

    pub fn is_borrow(self) -> bool {
        matches!(self, ParamMode::Borrowed | ParamMode::BorrowedMut)
    }
}

/// Receiver of a method.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ReceiverMode {
    /// `&self`
    Ref,
    /// `&mut self`
    RefMut,
}

#[cfg(test)]
mod tests;
