//! Union (`spec.md` §4.10): each branch is a binary join of the branch
//! against a shared outer (left) stream on the branch's key registers.
//!
//! A [`crate::ops::binary_join::BinaryJoin`] retains every left entry it
//! has ever seen, so a branch arriving after the outer already produced
//! prefixes re-matches against all of them for free.

use crate::id::Register;
use crate::prefix::Prefix;

use super::binary_join::BinaryJoin;

pub struct Union {
    branches: Vec<BinaryJoin>,
}

impl Union {
    pub fn new(register_count: usize, branch_key_registers: Vec<Vec<Register>>) -> Self {
        let branches = branch_key_registers.into_iter().map(|keys| BinaryJoin::new(register_count, keys)).collect();
        Union { branches }
    }

    pub fn branch_count(&self) -> usize {
        self.branches.len()
    }

    /// The outer stream produced `prefix`; run it against every branch.
    pub fn process_outer(&mut self, prefix: Prefix, round: i64, count: i64) -> Vec<(Prefix, i64, i64)> {
        self.branches.iter_mut().flat_map(|branch| branch.insert_left(prefix.clone(), round, count)).collect()
    }

    /// Branch `index`'s body produced `prefix`; match it against every
    /// outer prefix seen so far (including ones that arrived before this
    /// branch existed in the buffer).
    pub fn process_branch(&mut self, index: usize, prefix: Prefix, round: i64, count: i64) -> Vec<(Prefix, i64, i64)> {
        self.branches[index].insert_right(prefix, round, count)
    }
}
