//! AntiJoin (`spec.md` §4.9): emits a left prefix only while no right
//! prefix shares its key. The right side is tracked purely as a
//! zero-crossing presence signal — a "`ZeroingIterator`" — via
//! [`DistinctIndex`], not as stored payload, since only presence/absence
//! at a key ever matters to the left side.

use std::collections::HashMap;

use crate::distinct::DistinctIndex;
use crate::id::{Id, Register};
use crate::prefix::Prefix;

type Key = Vec<Id>;

#[derive(Debug, Clone)]
struct LeftEntry {
    prefix: Prefix,
    round: i64,
    count: i64,
}

pub struct AntiJoin {
    key_registers: Vec<Register>,
    right_presence: DistinctIndex<Key>,
    left_entries: HashMap<Key, Vec<LeftEntry>>,
}

impl AntiJoin {
    pub fn new(key_registers: Vec<Register>) -> Self {
        AntiJoin { key_registers, right_presence: DistinctIndex::new(), left_entries: HashMap::new() }
    }

    fn key(&self, prefix: &Prefix) -> Option<Key> {
        super::project_key(prefix, &self.key_registers)
    }

    /// A left prefix arrives: pass it through unless the right side is
    /// currently present at its key.
    pub fn insert_left(&mut self, prefix: Prefix, round: i64, count: i64) -> Vec<(Prefix, i64, i64)> {
        let Some(key) = self.key(&prefix) else { return Vec::new() };
        let blocked = self.right_presence.is_present(&key);
        self.left_entries.entry(key.clone()).or_default().push(LeftEntry { prefix: prefix.clone(), round, count });
        if blocked {
            Vec::new()
        } else {
            vec![(prefix, round, count)]
        }
    }

    /// A right delta arrives at `key_prefix`'s key (a prefix already
    /// resolved over at least `key_registers`). Retroactively negates or
    /// re-emits every stored left entry at that key, same as
    /// [`Self::insert_presolved_right`] — the "presolved" variant used
    /// when a preceding operator already exposed the right stream in this
    /// node's local results, rather than a fresh index lookup.
    pub fn insert_right(&mut self, key_prefix: &Prefix, round: i64, count: i64) -> Vec<(Prefix, i64, i64)> {
        let Some(key) = self.key(key_prefix) else { return Vec::new() };
        self.insert_presolved_right(key, round, count)
    }

    pub fn insert_presolved_right(&mut self, key: Key, round: i64, count: i64) -> Vec<(Prefix, i64, i64)> {
        let Some(toggle) = self.right_presence.apply(key.clone(), count) else {
            return Vec::new();
        };
        let Some(entries) = self.left_entries.get(&key) else { return Vec::new() };
        entries
            .iter()
            .map(|entry| {
                let out_round = round.max(entry.round);
                let out_count = if toggle > 0 { -entry.count } else { entry.count };
                (entry.prefix.clone(), out_round, out_count)
            })
            .collect()
    }
}
