//! Right-indexed binary join (`spec.md` §4.8).
//!
//! Each side keeps its own keyed index of prefixes seen so far. A pair is
//! matched exactly once: at whichever side's arrival finds the other side
//! already present, since matching only ever runs against entries stored
//! *before* the current call inserts its own.

use std::collections::HashMap;

use crate::id::{Id, Register};
use crate::prefix::Prefix;

use super::merge_prefixes;

type Key = Vec<Id>;

#[derive(Debug, Clone)]
struct Entry {
    prefix: Prefix,
    round: i64,
    count: i64,
}

pub struct BinaryJoin {
    register_count: usize,
    key_registers: Vec<Register>,
    left: HashMap<Key, Vec<Entry>>,
    right: HashMap<Key, Vec<Entry>>,
}

impl BinaryJoin {
    pub fn new(register_count: usize, key_registers: Vec<Register>) -> Self {
        BinaryJoin { register_count, key_registers, left: HashMap::new(), right: HashMap::new() }
    }

    fn key(&self, prefix: &Prefix) -> Option<Key> {
        super::project_key(prefix, &self.key_registers)
    }

    pub fn insert_left(&mut self, prefix: Prefix, round: i64, count: i64) -> Vec<(Prefix, i64, i64)> {
        let Some(key) = self.key(&prefix) else { return Vec::new() };
        let results = self.match_against(&self.right, &key, &prefix, round, count);
        self.left.entry(key).or_default().push(Entry { prefix, round, count });
        results
    }

    pub fn insert_right(&mut self, prefix: Prefix, round: i64, count: i64) -> Vec<(Prefix, i64, i64)> {
        let Some(key) = self.key(&prefix) else { return Vec::new() };
        let results = self.match_against(&self.left, &key, &prefix, round, count);
        self.right.entry(key).or_default().push(Entry { prefix, round, count });
        results
    }

    fn match_against(
        &self,
        other: &HashMap<Key, Vec<Entry>>,
        key: &Key,
        prefix: &Prefix,
        round: i64,
        count: i64,
    ) -> Vec<(Prefix, i64, i64)> {
        let Some(candidates) = other.get(key) else { return Vec::new() };
        candidates
            .iter()
            .filter_map(|entry| {
                let merged = merge_prefixes(self.register_count, prefix, &entry.prefix)?;
                let out_round = round.max(entry.round);
                let out_count = count * entry.count;
                if out_count == 0 {
                    None
                } else {
                    Some((merged, out_round, out_count))
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::Id;

    fn id(n: u32) -> Id {
        Id::from_index(n)
    }

    #[test]
    fn right_arriving_after_left_matches_once() {
        let mut join = BinaryJoin::new(2, vec![Register(0)]);
        let mut left = Prefix::empty(2);
        left.bind(Register(0), id(1));
        assert!(join.insert_left(left, 0, 1).is_empty());

        let mut right = Prefix::empty(2);
        right.bind(Register(0), id(1));
        right.bind(Register(1), id(2));
        let results = join.insert_right(right, 0, 1);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0.get(Register(1)), Some(id(2)));
    }

    #[test]
    fn conflicting_merge_register_drops_the_pair() {
        let mut join = BinaryJoin::new(2, vec![Register(0)]);
        let mut left = Prefix::empty(2);
        left.bind(Register(0), id(1));
        left.bind(Register(1), id(9));
        join.insert_left(left, 0, 1);

        let mut right = Prefix::empty(2);
        right.bind(Register(0), id(1));
        right.bind(Register(1), id(2));
        assert!(join.insert_right(right, 0, 1).is_empty());
    }
}
