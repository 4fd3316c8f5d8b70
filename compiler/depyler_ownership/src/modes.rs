//! Parameter and receiver modes for a whole module.
//!
//! Every heap parameter starts `Borrowed` and every receiver `&self`. Each
//! pass over the use sites may only strengthen a mode, following what the
//! function does with the parameter:
//!
//! - read only: stays `Borrowed`
//! - changed in place, or passed where the callee wants `&mut`: `BorrowedMut`
//! - moved, rebound, or passed where the callee takes ownership: `Owned`
//!
//! Argument sites consult the callee's current modes, so recursive and
//! mutually recursive functions converge to the smallest consistent
//! assignment. Modes only grow and are bounded, so the loop terminates.

use depyler_pragma::Ownership;
use rustc_hash::FxHashMap;

use crate::uses::{function_key, ArgSlot, FunctionUses, Position, Subject};
use crate::{ParamMode, ReceiverMode};

/// Modes of one function's parameters (without `self`) and receiver.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    pub params: Vec<(String, ParamMode)>,
    pub receiver: Option<ReceiverMode>,
}

impl Signature {
    pub fn mode(&self, name: &str) -> Option<ParamMode> {
        self.params.iter().find(|(n, _)| n == name).map(|(_, m)| *m)
    }

    pub fn slot(&self, slot: &ArgSlot) -> Option<ParamMode> {
        match slot {
            ArgSlot::Index(i) => self.params.get(*i).map(|(_, m)| *m),
            ArgSlot::Keyword(name) => self.mode(name),
        }
    }
}

/// What a use site needs from the value it touches.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Demand {
    Read,
    Mutate,
    Consume,
}

/// Signatures of every function in a module, keyed by
/// [`function_key`](crate::function_key).
#[derive(Clone, Debug, Default)]
pub struct ModuleModes {
    signatures: FxHashMap<String, Signature>,
}

impl ModuleModes {
    pub fn signature(&self, key: &str) -> Option<&Signature> {
        self.signatures.get(key)
    }

    pub fn receiver(&self, key: &str) -> Option<ReceiverMode> {
        self.signatures.get(key).and_then(|s| s.receiver)
    }

    /// What `position` needs under the current modes. Calls to functions
    /// outside the module only read.
    pub fn demand(&self, position: &Position) -> Demand {
        match position {
            Position::Read => Demand::Read,
            Position::Mutate => Demand::Mutate,
            Position::Consume(_) => Demand::Consume,
            Position::Arg { callee, slot } => {
                slot_demand(self.signatures.get(callee).and_then(|s| s.slot(slot)))
            }
            Position::Construct { class, slot } => {
                match self.signatures.get(&function_key(Some(class), "__init__")) {
                    Some(init) => slot_demand(init.slot(slot)),
                    None => Demand::Consume,
                }
            }
            Position::Receiver { callee } => match self.receiver(callee) {
                Some(ReceiverMode::RefMut) => Demand::Mutate,
                _ => Demand::Read,
            },
        }
    }
}

fn slot_demand(mode: Option<ParamMode>) -> Demand {
    match mode {
        Some(ParamMode::Owned) => Demand::Consume,
        Some(ParamMode::BorrowedMut) => Demand::Mutate,
        _ => Demand::Read,
    }
}

fn initial_signature(function: &FunctionUses) -> Signature {
    let params = function
        .params
        .iter()
        .map(|(name, ty)| {
            let mode = if !ty.is_heap() {
                ParamMode::ByValue
            } else if function.ownership == Some(Ownership::Owned) {
                ParamMode::Owned
            } else {
                ParamMode::Borrowed
            };
            (name.clone(), mode)
        })
        .collect();
    Signature {
        params,
        receiver: function.has_receiver.then_some(ReceiverMode::Ref),
    }
}

/// Infer every signature of the module.
#[tracing::instrument(level = "debug", skip_all, fields(functions = functions.len()))]
pub fn infer_modes(functions: &[FunctionUses]) -> ModuleModes {
    let mut modes = ModuleModes {
        signatures: functions
            .iter()
            .map(|f| (f.key.clone(), initial_signature(f)))
            .collect(),
    };

    let mut rounds = 0u32;
    loop {
        rounds += 1;
        let mut changed = false;
        for function in functions {
            if let Some(next) = refine(function, &modes) {
                modes.signatures.insert(function.key.clone(), next);
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    tracing::debug!(rounds, "parameter modes converged");
    modes
}

/// One pass over `function`'s uses; the strengthened signature if any mode
/// moved.
fn refine(function: &FunctionUses, modes: &ModuleModes) -> Option<Signature> {
    let current = modes.signature(&function.key)?;
    let mut next = current.clone();
    // `borrowed` keeps parameters borrowed; escapes copy out instead.
    let borrowed_only = function.ownership == Some(Ownership::Borrowed);
    let cap = |wanted: ParamMode| {
        if borrowed_only && wanted == ParamMode::Owned {
            ParamMode::Borrowed
        } else {
            wanted
        }
    };

    for site in &function.sites {
        let demand = modes.demand(&site.position);
        match &site.subject {
            Subject::Name(name) => {
                let Some(i) = function.param_index(name) else {
                    continue;
                };
                let wanted = match demand {
                    Demand::Read => ParamMode::Borrowed,
                    Demand::Mutate => ParamMode::BorrowedMut,
                    Demand::Consume => ParamMode::Owned,
                };
                strengthen(&mut next.params[i].1, cap(wanted));
            }
            Subject::SelfField(_) | Subject::SelfValue => {
                if demand == Demand::Mutate {
                    if let Some(receiver) = &mut next.receiver {
                        *receiver = ReceiverMode::RefMut;
                    }
                }
            }
            Subject::Element(_) | Subject::Field(_) => {}
        }
    }

    for bind in &function.binds {
        if let Some(i) = function.param_index(&bind.name) {
            strengthen(&mut next.params[i].1, cap(ParamMode::Owned));
        }
    }

    (next != *current).then_some(next)
}

fn strengthen(mode: &mut ParamMode, wanted: ParamMode) {
    if *mode != ParamMode::ByValue {
        *mode = (*mode).max(wanted);
    }
}

#[cfg(test)]
mod tests;
