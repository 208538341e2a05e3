//! Output nodes: the four write shapes a block can terminate in, plus
//! the watch effect seam (`spec.md` §4.13–4.14).
//!
//! Insert and Remove within one block are batched into per-kind result
//! sets so the transaction can tell binds from commits apart and expand
//! `RemoveVs`/`RemoveAVs` against the index only once, at commit-collapse
//! time.

use crate::change::Change;
use crate::distinct::ExportCollapse;
use crate::error::{EngineError, EngineResult};
use crate::id::{BlockId, Field, Id};
use crate::index::{ProposeField, ProposeInput, TripleIndex};
use crate::prefix::Prefix;

/// Whether an output is transient (bind) or promoted at the next frame
/// (commit).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persistence {
    Bind,
    Commit,
}

/// The four write shapes of `spec.md` §4.13, collapsed into one node
/// since they differ only in polarity, persistence, and v/a granularity.
#[derive(Debug, Clone, Copy)]
pub struct OutputNode {
    pub e: Field,
    pub a: Field,
    pub v: Field,
    pub n: Field,
    pub polarity: i64,
    pub persistence: Persistence,
}

/// A resolved output awaiting emission. `RemoveVs`/`RemoveAVs` carry an
/// unresolved pattern rather than a single change — they expand against
/// the index at commit-collapse time (`spec.md` §4.13).
#[derive(Debug, Clone)]
pub enum PendingOutput {
    Single(Change),
    RemoveVs { e: Id, a: Id, n: Id, transaction: u64, round: i64 },
    RemoveAVs { e: Id, n: Id, transaction: u64, round: i64 },
}

fn resolve(field: Field, prefix: &Prefix) -> Option<Id> {
    match field {
        Field::Static(id) => Some(id),
        Field::Ignore => None,
        Field::Register(r) => prefix.get(r),
    }
}

impl OutputNode {
    pub fn insert(e: Field, a: Field, v: Field, n: Field) -> Self {
        OutputNode { e, a, v, n, polarity: 1, persistence: Persistence::Bind }
    }

    pub fn commit_insert(e: Field, a: Field, v: Field, n: Field) -> Self {
        OutputNode { e, a, v, n, polarity: 1, persistence: Persistence::Commit }
    }

    pub fn remove(e: Field, a: Field, v: Field, n: Field) -> Self {
        OutputNode { e, a, v, n, polarity: -1, persistence: Persistence::Bind }
    }

    pub fn commit_remove(e: Field, a: Field, v: Field, n: Field) -> Self {
        OutputNode { e, a, v, n, polarity: -1, persistence: Persistence::Commit }
    }

    /// Resolves one prefix into a [`PendingOutput`]. `UndefinedSlot`
    /// fires for any slot that isn't deliberately `IGNORE`d for a
    /// variable-granularity remove but still resolves to nothing.
    pub fn emit(&self, prefix: &Prefix, transaction: u64, round: i64, count: i64) -> EngineResult<PendingOutput> {
        let e = resolve(self.e, prefix).ok_or(EngineError::UndefinedSlot { slot: "e" })?;
        let n = resolve(self.n, prefix).ok_or(EngineError::UndefinedSlot { slot: "n" })?;

        if self.polarity < 0 && self.a.is_ignore() {
            return Ok(PendingOutput::RemoveAVs { e, n, transaction, round });
        }
        let a = resolve(self.a, prefix).ok_or(EngineError::UndefinedSlot { slot: "a" })?;
        if self.polarity < 0 && self.v.is_ignore() {
            return Ok(PendingOutput::RemoveVs { e, a, n, transaction, round });
        }
        let v = resolve(self.v, prefix).ok_or(EngineError::UndefinedSlot { slot: "v" })?;
        Ok(PendingOutput::Single(Change::new(e, a, v, n, transaction, round, self.polarity * count)))
    }
}

/// Expands a `RemoveVs`/`RemoveAVs` pattern against the index into
/// concrete retracting changes, at commit-collapse time.
pub fn expand_pending(pending: PendingOutput, index: &TripleIndex) -> Vec<Change> {
    match pending {
        PendingOutput::Single(change) => vec![change],
        PendingOutput::RemoveVs { e, a, n, transaction, round } => {
            let query = ProposeInput {
                e: ProposeField::Bound(e),
                a: ProposeField::Bound(a),
                v: ProposeField::Unbound,
                n: ProposeField::Ignore,
            };
            index
                .enumerate_live(&query, transaction)
                .into_iter()
                .map(|(e, a, v, _)| Change::new(e, a, v, n, transaction, round, -1))
                .collect()
        }
        PendingOutput::RemoveAVs { e, n, transaction, round } => {
            let query = ProposeInput {
                e: ProposeField::Bound(e),
                a: ProposeField::Unbound,
                v: ProposeField::Unbound,
                n: ProposeField::Ignore,
            };
            index
                .enumerate_live(&query, transaction)
                .into_iter()
                .map(|(e, a, v, _)| Change::new(e, a, v, n, transaction, round, -1))
                .collect()
        }
    }
}

/// A bind-like output that exports changes to an external handler, one
/// bucket per source block id (`spec.md` §4.14).
pub struct WatchNode {
    pub block: BlockId,
}

impl WatchNode {
    pub fn emit(&self, prefix: &Prefix, transaction: u64, round: i64, count: i64, e: Field, a: Field, v: Field, n: Field) -> EngineResult<Change> {
        let e = resolve(e, prefix).ok_or(EngineError::UndefinedSlot { slot: "e" })?;
        let a = resolve(a, prefix).ok_or(EngineError::UndefinedSlot { slot: "a" })?;
        let v = resolve(v, prefix).ok_or(EngineError::UndefinedSlot { slot: "v" })?;
        let n = resolve(n, prefix).ok_or(EngineError::UndefinedSlot { slot: "n" })?;
        Ok(Change::new(e, a, v, n, transaction, round, count))
    }
}

/// Export-multiplicity key for the watch path: a raw change is keyed by
/// block plus `(e, a, v)`, matching `spec.md` §6's collapsing rule —
/// `n` and count are not part of the key, only the running total is.
pub type ExportKey = (BlockId, Id, Id, Id);

/// Collapses raw per-prefix watch changes through `log` so a caller only
/// ever sees `+1` on a key's 0→positive crossing and `-1` on its
/// positive→0 crossing, staying silent once a key has gone negative
/// (`spec.md` §6).
pub fn collapse_watch_changes(log: &mut ExportCollapse<ExportKey>, changes: Vec<(BlockId, Change)>) -> Vec<(BlockId, Change)> {
    let mut out = Vec::with_capacity(changes.len());
    for (block, change) in changes {
        let key = (block, change.e, change.a, change.v);
        if let Some(collapsed) = log.apply(key, change.count) {
            out.push((block, Change::new(change.e, change.a, change.v, change.n, change.transaction, change.round, collapsed)));
        }
    }
    out
}
