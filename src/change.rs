//! The unit of flow: an interned triple delta.

use crate::id::{BlockId, Id, ProvenanceId};

/// A `(e, a, v, n)` tuple as it arrives from the outside world, before
/// interning. `n` names the rule-node (or external source) responsible for
/// the fact; raw values are interned on ingress.
#[derive(Debug, Clone)]
pub struct RawChange {
    pub e: crate::raw_value::RawValue,
    pub a: crate::raw_value::RawValue,
    pub v: crate::raw_value::RawValue,
    pub n: crate::raw_value::RawValue,
    pub transaction: u64,
    pub round: i64,
    pub count: i64,
}

/// An interned `(e, a, v, n)` tuple plus `(transaction, round, count)`.
///
/// `count` is a signed multiplicity and is never zero once constructed
/// (`spec.md` §3 invariant `count != 0`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Change {
    pub e: Id,
    pub a: Id,
    pub v: Id,
    pub n: ProvenanceId,
    pub transaction: u64,
    pub round: i64,
    pub count: i64,
}

impl Change {
    pub fn new(e: Id, a: Id, v: Id, n: ProvenanceId, transaction: u64, round: i64, count: i64) -> Self {
        debug_assert_ne!(count, 0, "a Change must carry a nonzero multiplicity");
        debug_assert!(round >= 0, "a Change's round must be non-negative");
        Change { e, a, v, n, transaction, round, count }
    }

    pub fn negate(self) -> Self {
        Change { count: -self.count, ..self }
    }

    pub fn eavn(self) -> (Id, Id, Id, Id) {
        (self.e, self.a, self.v, self.n)
    }
}

/// A change tagged with the block that produced it, ready for export
/// grouping (`spec.md` §6 — "exported changes are grouped per source block
/// id").
#[derive(Debug, Clone, Copy)]
pub struct BlockChange {
    pub block: BlockId,
    pub change: Change,
}
