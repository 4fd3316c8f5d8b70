use crate::options::{
    BoundsChecking, ContainerTyping, MemoryStrategy, OptimizationLevel, Ownership, ThreadSafety,
};

/// Options parsed from the pragmas of one definition.
///
/// Fields are `None` when the source did not set them. The accessor methods
/// apply defaults; `ownership` has none because its absence selects the
/// inferred parameter modes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PragmaSet {
    pub ownership: Option<Ownership>,
    pub memory_strategy: Option<MemoryStrategy>,
    pub optimization_level: Option<OptimizationLevel>,
    pub bounds_checking: Option<BoundsChecking>,
    pub container_typing: Option<ContainerTyping>,
    pub thread_safety: Option<ThreadSafety>,
}

impl PragmaSet {
    pub fn is_empty(&self) -> bool {
        *self == PragmaSet::default()
    }

    /// Entries of `self` layered over `parent` (a method over its class).
    #[must_use]
    pub fn inherit(&self, parent: &PragmaSet) -> PragmaSet {
        PragmaSet {
            ownership: self.ownership.or(parent.ownership),
            memory_strategy: self.memory_strategy.or(parent.memory_strategy),
            optimization_level: self.optimization_level.or(parent.optimization_level),
            bounds_checking: self.bounds_checking.or(parent.bounds_checking),
            container_typing: self.container_typing.or(parent.container_typing),
            thread_safety: self.thread_safety.or(parent.thread_safety),
        }
    }

    pub fn ownership(&self) -> Option<Ownership> {
        self.ownership
    }

    pub fn memory_strategy(&self) -> MemoryStrategy {
        self.memory_strategy.unwrap_or(MemoryStrategy::Heap)
    }

    pub fn optimization_level(&self) -> OptimizationLevel {
        self.optimization_level
            .unwrap_or(OptimizationLevel::Standard)
    }

    pub fn bounds_checking(&self) -> BoundsChecking {
        self.bounds_checking.unwrap_or(BoundsChecking::Implicit)
    }

    pub fn container_typing(&self) -> ContainerTyping {
        self.container_typing.unwrap_or(ContainerTyping::Static)
    }

    pub fn thread_safety(&self) -> ThreadSafety {
        self.thread_safety.unwrap_or(ThreadSafety::NotRequired)
    }

    /// Explicitly set entries as `(key, value)` in key order.
    pub fn entries(&self) -> Vec<(&'static str, &'static str)> {
        let mut entries = Vec::new();
        if let Some(v) = self.ownership {
            entries.push((Ownership::KEY, v.as_str()));
        }
        if let Some(v) = self.memory_strategy {
            entries.push((MemoryStrategy::KEY, v.as_str()));
        }
        if let Some(v) = self.optimization_level {
            entries.push((OptimizationLevel::KEY, v.as_str()));
        }
        if let Some(v) = self.bounds_checking {
            entries.push((BoundsChecking::KEY, v.as_str()));
        }
        if let Some(v) = self.container_typing {
            entries.push((ContainerTyping::KEY, v.as_str()));
        }
        if let Some(v) = self.thread_safety {
            entries.push((ThreadSafety::KEY, v.as_str()));
        }
        entries
    }

    /// Store `value` under `key`. Returns `false` when the value is not valid
    /// for the key (or the key is unknown).
    pub(crate) fn set(&mut self, key: &str, value: &str) -> bool {
        match key {
            Ownership::KEY => assign(&mut self.ownership, Ownership::from_value(value)),
            MemoryStrategy::KEY => {
                assign(&mut self.memory_strategy, MemoryStrategy::from_value(value))
            }
            OptimizationLevel::KEY => assign(
                &mut self.optimization_level,
                OptimizationLevel::from_value(value),
            ),
            BoundsChecking::KEY => {
                assign(&mut self.bounds_checking, BoundsChecking::from_value(value))
            }
            ContainerTyping::KEY => assign(
                &mut self.container_typing,
                ContainerTyping::from_value(value),
            ),
            ThreadSafety::KEY => assign(&mut self.thread_safety, ThreadSafety::from_value(value)),
            _ => false,
        }
    }
}

fn assign<T>(slot: &mut Option<T>, value: Option<T>) -> bool {
    match value {
        Some(v) => {
            *slot = Some(v);
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests;
