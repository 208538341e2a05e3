//! Converts a bag-multiplicity delta stream into a set-semantics stream.
//!
//! `spec.md` §4.3: per key, track the running count and emit `+1` on the
//! round the running count transitions 0→nonzero and `-1` on nonzero→0
//! (in either sign direction, since counts may go negative under
//! retraction races). This is reused verbatim for: the transaction loop's
//! per-round application of derived changes, the `AntiJoin`'s
//! presolved-right "`ZeroingIterator`", and export-multiplicity
//! collapsing (`spec.md` §6).

use std::collections::HashMap;
use std::hash::Hash;

#[derive(Debug, Default, Clone, Copy)]
struct Running {
    total: i64,
    present: bool,
}

/// A generic per-key zero-crossing tracker.
#[derive(Debug)]
pub struct DistinctIndex<K> {
    entries: HashMap<K, Running>,
}

impl<K> Default for DistinctIndex<K> {
    fn default() -> Self {
        DistinctIndex { entries: HashMap::new() }
    }
}

impl<K: Eq + Hash> DistinctIndex<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies `count` to `key`'s running total. Returns `Some(+1)` if this
    /// toggled the key from absent to present, `Some(-1)` for the reverse,
    /// `None` if presence didn't change. "Once you go negative you don't
    /// come back" only applies to the export-collapse use of this
    /// structure (`spec.md` §6); internally this simply tracks `total !=
    /// 0`.
    pub fn apply(&mut self, key: K, count: i64) -> Option<i64> {
        let running = self.entries.entry(key).or_default();
        let was_present = running.present;
        running.total += count;
        let now_present = running.total != 0;
        running.present = now_present;
        match (was_present, now_present) {
            (false, true) => Some(1),
            (true, false) => Some(-1),
            _ => None,
        }
    }

    pub fn is_present(&self, key: &K) -> bool
    where
        K: Clone,
    {
        self.entries.get(key).is_some_and(|r| r.present)
    }

    /// The raw running total for `key`, independent of presence. Used by
    /// callers (e.g. aggregate) that must detect a negative projection
    /// count as a runtime-invariant violation (`spec.md` §7).
    pub fn total(&self, key: &K) -> i64 {
        self.entries.get(key).map_or(0, |r| r.total)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Export-multiplicity collapse variant of the same mechanism
/// (`spec.md` §6): once a key's running total goes negative it is
/// permanently suppressed from further emission, even if it later returns
/// to a positive value.
#[derive(Debug)]
pub struct ExportCollapse<K> {
    entries: HashMap<K, ExportState>,
}

#[derive(Debug, Default, Clone, Copy)]
struct ExportState {
    total: i64,
    present: bool,
    suppressed: bool,
}

impl<K> Default for ExportCollapse<K> {
    fn default() -> Self {
        ExportCollapse { entries: HashMap::new() }
    }
}

impl<K: Eq + Hash> ExportCollapse<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, key: K, count: i64) -> Option<i64> {
        let state = self.entries.entry(key).or_default();
        if state.suppressed {
            state.total += count;
            return None;
        }
        let was_present = state.present;
        state.total += count;
        if state.total < 0 {
            state.suppressed = true;
            state.present = false;
            return if was_present { Some(-1) } else { None };
        }
        let now_present = state.total > 0;
        state.present = now_present;
        match (was_present, now_present) {
            (false, true) => Some(1),
            (true, false) => Some(-1),
            _ => None,
        }
    }
}
