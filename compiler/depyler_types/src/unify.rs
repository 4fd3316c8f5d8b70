//! Type variable substitution and the three compatibility relations.
//!
//! - [`Unifier::unify`]: exact structural equality.
//! - [`Unifier::join`]: least common type of two branches or two container
//!   elements. Allows `int -> float`, `str`-character -> `str` and
//!   `T -> Optional[T]`; nothing else.
//! - [`Unifier::coerce`]: a value of type `found` stored where `expected` is
//!   declared (argument, return, assignment). Scalars widen as in `join`,
//!   int widths convert, and a value may fill an `Optional` slot. Container
//!   contents must match exactly since converting them would copy.
//!
//! `Unresolved` is compatible with everything so one error does not cascade.

use crate::{RustType, TypeVar};

/// Two types that could not be reconciled, both fully resolved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mismatch {
    pub expected: RustType,
    pub found: RustType,
}

#[derive(Clone, Debug, Default)]
pub struct Unifier {
    bindings: Vec<Option<RustType>>,
}

impl Unifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fresh(&mut self) -> RustType {
        let var = TypeVar(u32::try_from(self.bindings.len()).unwrap_or(u32::MAX));
        self.bindings.push(None);
        RustType::Var(var)
    }

    fn binding(&self, var: TypeVar) -> Option<&RustType> {
        self.bindings.get(var.0 as usize).and_then(Option::as_ref)
    }

    /// Follow variable bindings at the top level only.
    pub fn shallow(&self, ty: &RustType) -> RustType {
        let mut current = ty.clone();
        while let RustType::Var(var) = current {
            match self.binding(var) {
                Some(bound) => current = bound.clone(),
                None => break,
            }
        }
        current
    }

    /// Substitute every bound variable. Unbound variables stay `Var`.
    pub fn resolve(&self, ty: &RustType) -> RustType {
        match self.shallow(ty) {
            RustType::Vec(t) => RustType::vec(self.resolve(&t)),
            RustType::HashSet(t) => RustType::hash_set(self.resolve(&t)),
            RustType::Option(t) => RustType::option(self.resolve(&t)),
            RustType::HashMap(k, v) => RustType::hash_map(self.resolve(&k), self.resolve(&v)),
            RustType::Result(t, e) => {
                RustType::Result(Box::new(self.resolve(&t)), Box::new(self.resolve(&e)))
            }
            RustType::Tuple(items) => {
                RustType::Tuple(items.iter().map(|t| self.resolve(t)).collect())
            }
            other => other,
        }
    }

    /// Like [`Self::resolve`] but unbound variables become `Unresolved`.
    pub fn finalize(&self, ty: &RustType) -> RustType {
        match self.resolve(ty) {
            RustType::Var(_) => RustType::Unresolved,
            RustType::Vec(t) => RustType::vec(self.finalize(&t)),
            RustType::HashSet(t) => RustType::hash_set(self.finalize(&t)),
            RustType::Option(t) => RustType::option(self.finalize(&t)),
            RustType::HashMap(k, v) => RustType::hash_map(self.finalize(&k), self.finalize(&v)),
            RustType::Result(t, e) => {
                RustType::Result(Box::new(self.finalize(&t)), Box::new(self.finalize(&e)))
            }
            RustType::Tuple(items) => {
                RustType::Tuple(items.iter().map(|t| self.finalize(t)).collect())
            }
            other => other,
        }
    }

    fn bind(&mut self, var: TypeVar, ty: RustType) -> Result<(), ()> {
        let resolved = self.resolve(&ty);
        if resolved == RustType::Var(var) {
            return Ok(());
        }
        if resolved.contains_var(var) {
            return Err(());
        }
        if let Some(slot) = self.bindings.get_mut(var.0 as usize) {
            *slot = Some(resolved);
        }
        Ok(())
    }

    fn mismatch(&self, expected: &RustType, found: &RustType) -> Mismatch {
        Mismatch {
            expected: self.resolve(expected),
            found: self.resolve(found),
        }
    }

    /// Exact structural unification.
    pub fn unify(&mut self, a: &RustType, b: &RustType) -> Result<(), Mismatch> {
        let (sa, sb) = (self.shallow(a), self.shallow(b));
        let ok = match (&sa, &sb) {
            (RustType::Unresolved, _) | (_, RustType::Unresolved) => true,
            (RustType::Var(x), RustType::Var(y)) if x == y => true,
            (RustType::Var(x), other) | (other, RustType::Var(x)) => {
                self.bind(*x, other.clone()).is_ok()
            }
            (RustType::Vec(x), RustType::Vec(y))
            | (RustType::HashSet(x), RustType::HashSet(y))
            | (RustType::Option(x), RustType::Option(y)) => {
                return self.unify(x, y).map_err(|_| self.mismatch(a, b));
            }
            (RustType::HashMap(k1, v1), RustType::HashMap(k2, v2))
            | (RustType::Result(k1, v1), RustType::Result(k2, v2)) => {
                return self
                    .unify(k1, k2)
                    .and_then(|()| self.unify(v1, v2))
                    .map_err(|_| self.mismatch(a, b));
            }
            (RustType::Tuple(xs), RustType::Tuple(ys)) if xs.len() == ys.len() => {
                for (x, y) in xs.iter().zip(ys) {
                    self.unify(x, y).map_err(|_| self.mismatch(a, b))?;
                }
                true
            }
            (x, y) => x == y,
        };
        if ok {
            Ok(())
        } else {
            Err(self.mismatch(a, b))
        }
    }

    /// Least common type of two values meeting at a merge point.
    pub fn join(&mut self, a: &RustType, b: &RustType) -> Result<RustType, Mismatch> {
        let (sa, sb) = (self.shallow(a), self.shallow(b));
        match (&sa, &sb) {
            (RustType::Unresolved, RustType::Var(x)) | (RustType::Var(x), RustType::Unresolved) => {
                let _ = self.bind(*x, RustType::Unresolved);
                Ok(RustType::Unresolved)
            }
            (RustType::Unresolved, other) | (other, RustType::Unresolved) => Ok(other.clone()),
            (RustType::Dynamic, _) | (_, RustType::Dynamic) => Ok(RustType::Dynamic),
            (RustType::Int(x), RustType::Int(y)) => Ok(RustType::Int((*x).max(*y))),
            (RustType::Int(_), RustType::Float) | (RustType::Float, RustType::Int(_)) => {
                Ok(RustType::Float)
            }
            (RustType::Char, RustType::Str) | (RustType::Str, RustType::Char) => Ok(RustType::Str),
            (RustType::Option(x), RustType::Option(y)) => {
                let inner = self.join(x, y).map_err(|_| self.mismatch(a, b))?;
                Ok(RustType::option(inner))
            }
            (RustType::Option(x), other) | (other, RustType::Option(x))
                if !matches!(other, RustType::Var(_)) =>
            {
                let inner = self.join(x, other).map_err(|_| self.mismatch(a, b))?;
                Ok(RustType::option(inner))
            }
            (RustType::Vec(x), RustType::Vec(y)) => {
                let elem = self.join(x, y).map_err(|_| self.mismatch(a, b))?;
                Ok(RustType::vec(elem))
            }
            (RustType::HashSet(x), RustType::HashSet(y)) => {
                let elem = self.join(x, y).map_err(|_| self.mismatch(a, b))?;
                Ok(RustType::hash_set(elem))
            }
            (RustType::HashMap(k1, v1), RustType::HashMap(k2, v2)) => {
                let key = self.join(k1, k2).map_err(|_| self.mismatch(a, b))?;
                let value = self.join(v1, v2).map_err(|_| self.mismatch(a, b))?;
                Ok(RustType::hash_map(key, value))
            }
            (RustType::Tuple(xs), RustType::Tuple(ys)) if xs.len() == ys.len() => {
                let mut items = Vec::with_capacity(xs.len());
                for (x, y) in xs.iter().zip(ys) {
                    items.push(self.join(x, y).map_err(|_| self.mismatch(a, b))?);
                }
                Ok(RustType::Tuple(items))
            }
            _ => {
                self.unify(&sa, &sb)?;
                Ok(self.resolve(&sa))
            }
        }
    }

    /// Check that a `found` value may be stored in an `expected` slot.
    pub fn coerce(&mut self, found: &RustType, expected: &RustType) -> Result<(), Mismatch> {
        let (sf, se) = (self.shallow(found), self.shallow(expected));
        match (&sf, &se) {
            (RustType::Unresolved, _)
            | (_, RustType::Unresolved)
            | (_, RustType::Dynamic)
            | (RustType::Int(_), RustType::Int(_) | RustType::Float)
            | (RustType::Char, RustType::Str) => Ok(()),
            (RustType::Var(_), _)
            | (_, RustType::Var(_))
            | (RustType::Option(_), RustType::Option(_)) => self.unify(&sf, &se),
            (other, RustType::Option(inner)) => self
                .coerce(other, inner)
                .map_err(|_| self.mismatch(expected, found)),
            _ => self.unify(&se, &sf),
        }
    }
}

#[cfg(test)]
mod tests;
