//! Sort (`spec.md` §4.12): a positional aggregate. Groups by a key,
//! projects the registers to rank by, and on every change re-derives the
//! sorted order for that group, emitting a retract+insert pair for every
//! element whose rank moved.

use std::collections::HashMap;

use crate::id::{Id, Register};
use crate::prefix::Prefix;
use crate::raw_value::RawValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// One sort-by register and its direction; a register with no explicit
/// direction inherits the previous one (`spec.md` §4.12).
#[derive(Debug, Clone)]
pub struct SortKey {
    pub register: Register,
    pub direction: Direction,
}

pub fn inherit_directions(registers: &[Register], directions: &[Option<Direction>]) -> Vec<SortKey> {
    let mut current = Direction::Up;
    registers
        .iter()
        .zip(directions.iter().chain(std::iter::repeat(&None)))
        .map(|(&register, direction)| {
            if let Some(d) = direction {
                current = *d;
            }
            SortKey { register, direction: current }
        })
        .collect()
}

type GroupKey = Vec<Id>;

/// Members are kept with a stable per-record id so a later re-sort can tell
/// "this record's rank didn't move" from "this record moved" even when two
/// records tie on sort value (and so are indistinguishable by content alone).
pub struct Sort {
    group_registers: Vec<Register>,
    sort_keys: Vec<SortKey>,
    rank_register: Register,
    groups: HashMap<GroupKey, Vec<(u64, Prefix)>>,
    next_id: u64,
}

impl Sort {
    pub fn new(group_registers: Vec<Register>, sort_keys: Vec<SortKey>, rank_register: Register) -> Self {
        Sort { group_registers, sort_keys, rank_register, groups: HashMap::new(), next_id: 0 }
    }

    fn sort_value(&self, prefix: &Prefix, interner: &crate::interner::Interner) -> Vec<(RawValue, Direction)> {
        self.sort_keys
            .iter()
            .map(|key| {
                let id = prefix.get(key.register).expect("sort registers must be bound");
                (interner.get(id).cloned().unwrap_or(RawValue::number(0.0)), key.direction)
            })
            .collect()
    }

    fn compare(a: &[(RawValue, Direction)], b: &[(RawValue, Direction)]) -> std::cmp::Ordering {
        for ((av, dir), (bv, _)) in a.iter().zip(b.iter()) {
            let ord = av.cmp(bv);
            let ord = if *dir == Direction::Down { ord.reverse() } else { ord };
            if ord != std::cmp::Ordering::Equal {
                return ord;
            }
        }
        std::cmp::Ordering::Equal
    }

    /// `round` is stamped on every retract/insert the change produces.
    pub fn insert(&mut self, prefix: Prefix, round: i64, interner: &crate::interner::Interner) -> Vec<(Prefix, i64, i64)> {
        let Some(group_key) = super::project_key(&prefix, &self.group_registers) else { return Vec::new() };
        let id = self.next_id;
        self.next_id += 1;
        let members = self.groups.entry(group_key).or_default();
        let before: Vec<(u64, Prefix)> = members.clone();
        members.push((id, prefix));
        members.sort_by(|(_, a), (_, b)| Self::compare(&self.sort_value(a, interner), &self.sort_value(b, interner)));
        self.emit_rank_changes(&before, members, round)
    }

    /// Only emits a retract/insert pair for a record whose rank actually
    /// moved, plus a bare insert for a newly arrived record — a record whose
    /// position didn't change produces nothing.
    fn emit_rank_changes(&self, before: &[(u64, Prefix)], after: &[(u64, Prefix)], round: i64) -> Vec<(Prefix, i64, i64)> {
        let old_ranks: HashMap<u64, usize> = before.iter().enumerate().map(|(rank, (id, _))| (*id, rank)).collect();
        let mut out = Vec::new();
        for (new_rank, (id, prefix)) in after.iter().enumerate() {
            match old_ranks.get(id) {
                Some(&old_rank) if old_rank == new_rank => {}
                Some(&old_rank) => {
                    let mut retracted = before[old_rank].1.clone();
                    retracted.bind(self.rank_register, Id::from_index(old_rank as u32));
                    out.push((retracted, round, -1));
                    let mut inserted = prefix.clone();
                    inserted.bind(self.rank_register, Id::from_index(new_rank as u32));
                    out.push((inserted, round, 1));
                }
                None => {
                    let mut inserted = prefix.clone();
                    inserted.bind(self.rank_register, Id::from_index(new_rank as u32));
                    out.push((inserted, round, 1));
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interner::Interner;

    #[test]
    fn descending_sort_shifts_ranks_on_a_new_maximum() {
        let mut interner = Interner::new();
        let v10 = interner.intern(RawValue::number(10.0));
        let v20 = interner.intern(RawValue::number(20.0));
        let v5 = interner.intern(RawValue::number(5.0));

        let mut sort = Sort::new(vec![], vec![SortKey { register: Register(0), direction: Direction::Down }], Register(1));

        let mut a = Prefix::empty(2);
        a.bind(Register(0), v10);
        sort.insert(a, 0, &interner);

        let mut b = Prefix::empty(2);
        b.bind(Register(0), v5);
        sort.insert(b, 0, &interner);

        let mut c = Prefix::empty(2);
        c.bind(Register(0), v20);
        let changes = sort.insert(c, 1, &interner);
        // 2 retracts (previous order) + 3 inserts (new order)
        assert_eq!(changes.iter().filter(|(_, _, count)| *count == -1).count(), 2);
        assert_eq!(changes.iter().filter(|(_, _, count)| *count == 1).count(), 3);
    }

    #[test]
    fn an_untouched_rank_produces_no_retract_or_insert() {
        let mut interner = Interner::new();
        let v30 = interner.intern(RawValue::number(30.0));
        let v20 = interner.intern(RawValue::number(20.0));
        let v10 = interner.intern(RawValue::number(10.0));
        let v25 = interner.intern(RawValue::number(25.0));

        let mut sort = Sort::new(vec![], vec![SortKey { register: Register(0), direction: Direction::Down }], Register(1));
        for value in [v30, v20, v10] {
            let mut p = Prefix::empty(2);
            p.bind(Register(0), value);
            sort.insert(p, 0, &interner);
        }

        let mut inserted = Prefix::empty(2);
        inserted.bind(Register(0), v25);
        // [30, 20, 10] + 25 -> [30, 25, 20, 10]: 30 keeps rank 0 untouched.
        let changes = sort.insert(inserted, 1, &interner);
        assert_eq!(changes.iter().filter(|(_, _, count)| *count == -1).count(), 2);
        assert_eq!(changes.iter().filter(|(_, _, count)| *count == 1).count(), 3);
        assert!(changes.iter().all(|(p, _, _)| p.get(Register(0)) != Some(v30)));
    }
}
