//! The triple index: point checks, prefix enumeration, cheapest-field
//! proposal, and round-wise diffs. See `spec.md` §4.2.
//!
//! Multi-indexed over the three orderings the proposal machinery needs
//! (`EAV`, `AVE`, `AEV`); a fourth axis (`N`) always rides along as the
//! trailing component of whichever ordering is in play, since provenance
//! is rarely itself a join variable.
//!
//! `check`/`propose`/`getDiffs` all read against the *current* transaction
//! only: processing within a transaction is round-monotone (`spec.md`
//! §5), so a key's running total after every delta applied so far already
//! reflects "now" regardless of which round is asked about, as long as
//! the caller never asks about a round it hasn't reached yet.

use std::collections::BTreeSet;
use std::collections::HashMap;

use crate::id::Id;

/// One field of a proposal/accept query against the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProposeField {
    Bound(Id),
    Unbound,
    Ignore,
}

impl ProposeField {
    fn bound(self) -> Option<Id> {
        match self {
            ProposeField::Bound(id) => Some(id),
            _ => None,
        }
    }

    fn matches(self, id: Id) -> bool {
        match self {
            ProposeField::Bound(x) => x == id,
            ProposeField::Unbound | ProposeField::Ignore => true,
        }
    }

    fn is_unbound(self) -> bool {
        matches!(self, ProposeField::Unbound)
    }
}

/// A point/prefix query against the four triple fields.
#[derive(Debug, Clone, Copy)]
pub struct ProposeInput {
    pub e: ProposeField,
    pub a: ProposeField,
    pub v: ProposeField,
    pub n: ProposeField,
}

/// Which field a [`Proposal`] offers to enumerate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    E,
    A,
    V,
    N,
}

/// The index's offer: enumerate `slot` at an estimated `cardinality`, or
/// `skip` when every field is already bound or ignored (`spec.md` §4.2).
#[derive(Debug, Clone, Copy)]
pub struct Proposal {
    pub slot: Option<Slot>,
    pub cardinality: usize,
    pub skip: bool,
}

impl Proposal {
    pub fn skip() -> Self {
        Proposal { slot: None, cardinality: 0, skip: true }
    }
}

#[derive(Debug, Default, Clone)]
struct Entry {
    /// Transaction this entry's `diffs` are scoped to.
    txn: u64,
    /// Cumulative net count across every transaction ever applied to this
    /// key. Never resets — a transaction's deltas just add onto it, so
    /// this is always the correct answer to "is this key net-positive
    /// right now", independent of which transaction id is asked about.
    running: i64,
    /// Signed rounds at which `running` crossed the zero/nonzero boundary
    /// within the current transaction. Encoded as `round + 1`, negated for
    /// a 0-or-negative crossing, so round 0 is representable with a sign.
    diffs: Vec<i64>,
}

impl Entry {
    fn touch(&mut self, transaction: u64) {
        if transaction != self.txn {
            self.txn = transaction;
            self.diffs.clear();
        }
    }

    fn insert(&mut self, transaction: u64, round: i64, count: i64) {
        self.touch(transaction);
        let was_present = self.running != 0;
        self.running += count;
        let now_present = self.running != 0;
        if now_present != was_present {
            let code = round + 1;
            self.diffs.push(if now_present { code } else { -code });
        }
    }

    fn net(&self, _transaction: u64) -> i64 {
        self.running
    }

    fn diffs_for(&self, transaction: u64) -> &[i64] {
        if self.txn == transaction { &self.diffs } else { &[] }
    }
}

type Quad = (Id, Id, Id, Id);

/// Multi-indexed store of [`crate::change::Change`] deltas.
#[derive(Debug, Default)]
pub struct TripleIndex {
    entries: HashMap<Quad, Entry>,
    eav: BTreeSet<Quad>,
    ave: BTreeSet<(Id, Id, Id, Id)>, // (a, v, e, n)
    aev: BTreeSet<(Id, Id, Id, Id)>, // (a, e, v, n)
}

impl TripleIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a delta; the stored value is the cumulative count for
    /// `(e,a,v,n)` within `transaction`.
    pub fn insert(&mut self, e: Id, a: Id, v: Id, n: Id, transaction: u64, round: i64, count: i64) {
        self.entries.entry((e, a, v, n)).or_default().insert(transaction, round, count);
        self.eav.insert((e, a, v, n));
        self.ave.insert((a, v, e, n));
        self.aev.insert((a, e, v, n));
    }

    /// Does `(e,a,v,n)` hold net-positive as of `transaction`?
    pub fn check(&self, e: Id, a: Id, v: Id, n: Id, transaction: u64, _round: i64) -> bool {
        self.entries.get(&(e, a, v, n)).is_some_and(|entry| entry.net(transaction) != 0)
    }

    /// The signed rounds at which `(e,a,v,n)` crossed the zero/nonzero
    /// boundary within `transaction`.
    pub fn get_diffs(&self, e: Id, a: Id, v: Id, n: Id, transaction: u64) -> Vec<i64> {
        self.entries.get(&(e, a, v, n)).map(|entry| entry.diffs_for(transaction).to_vec()).unwrap_or_default()
    }

    /// Given partially-bound fields, returns the cheapest unbound field to
    /// enumerate and its cardinality, or `skip = true` if none can be
    /// enumerated.
    pub fn propose(&self, input: &ProposeInput, transaction: u64) -> Proposal {
        let candidates = self.candidates(input, transaction);
        let mut best: Option<(Slot, usize)> = None;
        for slot in [Slot::E, Slot::A, Slot::V, Slot::N] {
            if !slot_field(input, slot).is_unbound() {
                continue;
            }
            let cardinality = distinct_count(&candidates, slot);
            if best.map_or(true, |(_, c)| cardinality < c) {
                best = Some((slot, cardinality));
            }
        }
        match best {
            Some((slot, cardinality)) => Proposal { slot: Some(slot), cardinality, skip: false },
            None => Proposal::skip(),
        }
    }

    /// Enumerates the actual ids for `slot` under the bindings in `input`.
    pub fn resolve_proposal(&self, input: &ProposeInput, slot: Slot, transaction: u64) -> Vec<Id> {
        let candidates = self.candidates(input, transaction);
        distinct_values(&candidates, slot)
    }

    /// Whether any live tuple matches `input`'s bound/ignore fields —
    /// a point/pattern check that tolerates `Ignore` fields, unlike
    /// [`Self::check`] which requires an exact key.
    pub fn check_pattern(&self, input: &ProposeInput, transaction: u64) -> bool {
        !self.candidates(input, transaction).is_empty()
    }

    /// Public entry point for a full-pattern enumeration — used by
    /// `RemoveVs`/`RemoveAVs` output expansion at commit-collapse time
    /// (`spec.md` §4.13).
    pub fn enumerate_live(&self, input: &ProposeInput, transaction: u64) -> Vec<(Id, Id, Id, Id)> {
        self.candidates(input, transaction)
    }

    /// All live `(e,a,v,n)` tuples matching `input`'s bound/ignore fields,
    /// restricted where possible via the `EAV`/`AEV` prefix orderings.
    fn candidates(&self, input: &ProposeInput, transaction: u64) -> Vec<Quad> {
        let raw: Vec<Quad> = match (input.e.bound(), input.a.bound()) {
            (Some(e), Some(a)) => self
                .eav
                .range((e, a, Id::MIN, Id::MIN)..=(e, a, Id::MAX, Id::MAX))
                .copied()
                .collect(),
            (Some(e), None) => self.eav.range((e, Id::MIN, Id::MIN, Id::MIN)..=(e, Id::MAX, Id::MAX, Id::MAX)).copied().collect(),
            (None, Some(a)) => self
                .aev
                .range((a, Id::MIN, Id::MIN, Id::MIN)..=(a, Id::MAX, Id::MAX, Id::MAX))
                .map(|&(a, e, v, n)| (e, a, v, n))
                .collect(),
            (None, None) => self.eav.iter().copied().collect(),
        };
        raw.into_iter()
            .filter(|&(e, a, v, n)| {
                input.e.matches(e)
                    && input.a.matches(a)
                    && input.v.matches(v)
                    && input.n.matches(n)
                    && self.check(e, a, v, n, transaction, i64::MAX)
            })
            .collect()
    }
}

fn slot_field(input: &ProposeInput, slot: Slot) -> ProposeField {
    match slot {
        Slot::E => input.e,
        Slot::A => input.a,
        Slot::V => input.v,
        Slot::N => input.n,
    }
}

fn project(tuple: Quad, slot: Slot) -> Id {
    match slot {
        Slot::E => tuple.0,
        Slot::A => tuple.1,
        Slot::V => tuple.2,
        Slot::N => tuple.3,
    }
}

fn distinct_values(candidates: &[Quad], slot: Slot) -> Vec<Id> {
    let mut values: Vec<Id> = candidates.iter().map(|&t| project(t, slot)).collect();
    values.sort_unstable();
    values.dedup();
    values
}

fn distinct_count(candidates: &[Quad], slot: Slot) -> usize {
    distinct_values(candidates, slot).len()
}
