//! Polymorphic primitive over the capability set `{isAffected, applyInput,
//! propose, resolveProposal, accept, getDiffs}` (`spec.md` §4).
//!
//! Dispatch is a tagged variant plus inherent methods per variant — static
//! dispatch at every call site, no runtime code synthesis (`SPEC_FULL.md`
//! §9 / Design Notes).

mod function;
mod move_constraint;
mod scan;

pub use function::FunctionConstraint;
pub use move_constraint::MoveConstraint;
pub use scan::ScanConstraint;

use std::cell::RefCell;

use crate::change::Change;
use crate::functions::FunctionRegistry;
use crate::id::{Id, Register};
use crate::index::TripleIndex;
use crate::interner::Interner;
use crate::prefix::Prefix;

/// Shared context every constraint capability is evaluated against. The
/// interner is behind a `RefCell` because function constraints intern
/// their outputs while the surrounding Generic Join recursion holds
/// shared references to the rest of the context (`spec.md` §4.5).
pub struct EvalCtx<'a> {
    pub index: &'a TripleIndex,
    pub functions: &'a FunctionRegistry,
    pub interner: &'a RefCell<Interner>,
    pub transaction: u64,
    pub round: i64,
}

/// One relational primitive in a [`crate::join::JoinNode`].
#[derive(Debug, Clone)]
pub enum Constraint {
    Scan(ScanConstraint),
    Function(FunctionConstraint),
    Move(MoveConstraint),
}

impl Constraint {
    pub fn registers(&self) -> Vec<Register> {
        match self {
            Constraint::Scan(s) => s.registers(),
            Constraint::Function(f) => f.registers(),
            Constraint::Move(m) => m.registers(),
        }
    }

    /// Does `change` structurally match this constraint's static fields?
    /// Functions and moves never scan the store, so they are never
    /// affected by an input change (`spec.md` §4.5).
    pub fn is_affected(&self, change: &Change) -> bool {
        match self {
            Constraint::Scan(s) => s.is_affected(change),
            Constraint::Function(_) | Constraint::Move(_) => false,
        }
    }

    /// Writes `change`'s values into this constraint's register fields.
    /// Returns `false` on a register already bound to a conflicting value
    /// (a local "fail" per `spec.md` §7, not an engine-level error).
    pub fn apply_input(&self, change: &Change, prefix: &mut Prefix) -> bool {
        match self {
            Constraint::Scan(s) => s.apply_input(change, prefix),
            Constraint::Function(_) | Constraint::Move(_) => true,
        }
    }

    /// Offers to enumerate one unbound register, with an estimated
    /// cardinality. `None` means this constraint has nothing left to
    /// propose given the current bindings.
    pub fn propose(&self, prefix: &Prefix, ctx: &EvalCtx) -> Option<usize> {
        match self {
            Constraint::Scan(s) => s.propose(prefix, ctx),
            Constraint::Function(f) => f.propose(prefix, ctx),
            Constraint::Move(m) => m.propose(prefix),
        }
    }

    /// Enumerates candidate prefixes for whichever register this
    /// constraint currently proposes. A scan or move yields one candidate
    /// per value with a single register newly bound; a multi-valued
    /// function yields one candidate per output tuple with every output
    /// register bound at once (`spec.md` §4.5).
    pub fn resolve(&self, prefix: &Prefix, ctx: &EvalCtx) -> Vec<Prefix> {
        match self {
            Constraint::Scan(s) => s.resolve(prefix, ctx),
            Constraint::Function(f) => f.resolve(prefix, ctx),
            Constraint::Move(m) => m.resolve(prefix),
        }
    }

    /// A point check through the index (scans) or a recompute-and-compare
    /// (functions); short-circuits to `true` when none of `solving_for`
    /// intersects this constraint's registers.
    pub fn accept(&self, prefix: &Prefix, ctx: &EvalCtx, solving_for: &[Register]) -> bool {
        if !solving_for.is_empty() && !self.registers().iter().any(|r| solving_for.contains(r)) {
            return true;
        }
        match self {
            Constraint::Scan(s) => s.accept(prefix, ctx),
            Constraint::Function(f) => f.accept(prefix, ctx),
            Constraint::Move(m) => m.accept(prefix),
        }
    }

    /// The round array for the fully-resolved triple pattern; empty for
    /// functions and moves, which carry no round history of their own.
    pub fn get_diffs(&self, prefix: &Prefix, ctx: &EvalCtx) -> Vec<i64> {
        match self {
            Constraint::Scan(s) => s.get_diffs(prefix, ctx),
            Constraint::Function(_) | Constraint::Move(_) => Vec::new(),
        }
    }

    /// `true` for an all-move constraint whose source is static (no
    /// register dependency at all) — the building block of a *static*
    /// join (`spec.md` §4.7).
    pub fn is_static_move(&self) -> bool {
        matches!(self, Constraint::Move(m) if m.is_static())
    }
}

pub(crate) fn resolved(field: crate::id::Field, prefix: &Prefix) -> Option<Id> {
    match field {
        crate::id::Field::Static(id) => Some(id),
        crate::id::Field::Ignore => None,
        crate::id::Field::Register(r) => prefix.get(r),
    }
}
