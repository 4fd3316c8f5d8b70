//! Pragma option values.
//!
//! Each option is a closed enum spelled in source as a quoted snake_case
//! string, e.g. `# @depyler: memory_strategy = "arena"`.

use std::fmt;

/// Defines a pragma value enum.
///
/// Each generated type has:
/// - `KEY`: the pragma key it is written under
/// - `VALUES`: accepted spellings, in declaration order
/// - `from_value()` / `as_str()` converting to and from the spelling
/// - `Display` writing the spelling
macro_rules! define_pragma_value {
    ($(#[$meta:meta])* $name:ident, $key:literal { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const KEY: &'static str = $key;
            pub const VALUES: &'static [&'static str] = &[$($text),+];

            pub fn from_value(value: &str) -> Option<Self> {
                match value {
                    $($text => Some($name::$variant),)+
                    _ => None,
                }
            }

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

define_pragma_value!(
    /// How heap values cross function boundaries.
    Ownership, "ownership" {
        Owned => "owned",
        Borrowed => "borrowed",
        Shared => "shared",
    }
);

define_pragma_value!(
    /// Where the function's collections are allocated.
    MemoryStrategy, "memory_strategy" {
        Heap => "heap",
        Arena => "arena",
        Stack => "stack",
    }
);

define_pragma_value!(
    OptimizationLevel, "optimization_level" {
        None => "none",
        Standard => "standard",
        Aggressive => "aggressive",
    }
);

define_pragma_value!(
    /// Whether string indexing may use unchecked positional access.
    BoundsChecking, "bounds_checking" {
        Implicit => "implicit",
        Explicit => "explicit",
    }
);

define_pragma_value!(
    /// `dynamic` lowers heterogeneous containers to a tagged value enum
    /// instead of rejecting them.
    ContainerTyping, "container_typing" {
        Static => "static",
        Dynamic => "dynamic",
    }
);

define_pragma_value!(
    /// `required` makes shared values `Arc` instead of `Rc`.
    ThreadSafety, "thread_safety" {
        NotRequired => "not_required",
        Required => "required",
    }
);

/// Every key the extractor recognizes.
pub const KNOWN_KEYS: [&str; 6] = [
    Ownership::KEY,
    MemoryStrategy::KEY,
    OptimizationLevel::KEY,
    BoundsChecking::KEY,
    ContainerTyping::KEY,
    ThreadSafety::KEY,
];

/// Accepted values for a known key.
pub fn values_for(key: &str) -> Option<&'static [&'static str]> {
    match key {
        Ownership::KEY => Some(Ownership::VALUES),
        MemoryStrategy::KEY => Some(MemoryStrategy::VALUES),
        OptimizationLevel::KEY => Some(OptimizationLevel::VALUES),
        BoundsChecking::KEY => Some(BoundsChecking::VALUES),
        ContainerTyping::KEY => Some(ContainerTyping::VALUES),
        ThreadSafety::KEY => Some(ThreadSafety::VALUES),
        _ => None,
    }
}
