//! Choose (`spec.md` §4.10): a [`Union`]-shaped set of branches with
//! exclusivity — branch `i > 0` only contributes a key that no branch
//! `0..i` has already produced, so a record is attributed to the first
//! branch whose body matches.
//!
//! Branch 0 is exempt: nothing precedes it, so it always fires. Every
//! later branch `i` is wrapped in its own [`AntiJoin`] gate against the
//! union of branches `0..i` — not a one-shot presence check, so a claim
//! that arrives after branch `i` has already fired retroactively negates
//! it, and ordering within a round never matters.

use crate::id::{Id, Register};
use crate::prefix::Prefix;

use super::antijoin::AntiJoin;
use super::binary_join::BinaryJoin;

type Key = Vec<Id>;

pub struct Choose {
    branches: Vec<BinaryJoin>,
    /// The registers identifying "the same record" across branches —
    /// the antijoin key every later branch is excluded on.
    exclusivity_key: Vec<Register>,
    /// `gates[i]` guards branch `i + 1`, tracking the union of branches
    /// `0..=i`'s raw matches as its right side (`spec.md` §4.10).
    gates: Vec<AntiJoin>,
}

impl Choose {
    pub fn new(register_count: usize, exclusivity_key: Vec<Register>, branch_key_registers: Vec<Vec<Register>>) -> Self {
        let branch_count = branch_key_registers.len();
        let branches = branch_key_registers.into_iter().map(|keys| BinaryJoin::new(register_count, keys)).collect();
        let gates = (0..branch_count.saturating_sub(1)).map(|_| AntiJoin::new(exclusivity_key.clone())).collect();
        Choose { branches, exclusivity_key, gates }
    }

    pub fn process_outer(&mut self, prefix: Prefix, round: i64, count: i64) -> Vec<(usize, Prefix, i64, i64)> {
        let mut out = Vec::new();
        for index in 0..self.branches.len() {
            for (merged, r, c) in self.branches[index].insert_left(prefix.clone(), round, count) {
                out.extend(self.dispatch(index, merged, r, c));
            }
        }
        out
    }

    pub fn process_branch(&mut self, index: usize, prefix: Prefix, round: i64, count: i64) -> Vec<(usize, Prefix, i64, i64)> {
        let results = self.branches[index].insert_right(prefix, round, count);
        results.into_iter().flat_map(|(merged, r, c)| self.dispatch(index, merged, r, c)).collect()
    }

    /// Routes one raw match from branch `index` through its own gate (if
    /// any), then propagates it as a claim into every later branch's gate
    /// — independent of whether `index`'s own output survived its gate,
    /// since "branch 0..i already matched" excludes branch `i` regardless
    /// of which of those earlier branches ultimately keeps its output.
    fn dispatch(&mut self, index: usize, merged: Prefix, round: i64, count: i64) -> Vec<(usize, Prefix, i64, i64)> {
        let Some(key) = super::project_key(&merged, &self.exclusivity_key) else { return Vec::new() };
        let mut out = Vec::new();
        if index == 0 {
            out.push((0, merged, round, count));
        } else {
            let gate = &mut self.gates[index - 1];
            out.extend(gate.insert_left(merged, round, count).into_iter().map(|(p, r, c)| (index, p, r, c)));
        }
        for later in index..self.gates.len() {
            let branch = later + 1;
            out.extend(self.gates[later].insert_presolved_right(key.clone(), round, count).into_iter().map(|(p, r, c)| (branch, p, r, c)));
        }
        out
    }
}
