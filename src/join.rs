//! Generic Join: the worst-case-optimal join at the heart of every block
//! (`spec.md` §4.7).
//!
//! Each input [`Change`] may match several of a join's constraints at once
//! (think: a single `edge` insert that matches both sides of a
//! self-join). The node enumerates every non-empty subset of the
//! constraints its change structurally affects, applies each subset's
//! register bindings independently, and runs the join to completion from
//! there — that is what makes one change able to produce more than one
//! derived tuple in a single pass.

use std::cell::Cell;

use crate::change::Change;
use crate::constraint::{Constraint, EvalCtx};
use crate::id::Register;
use crate::prefix::Prefix;

pub struct JoinNode {
    constraints: Vec<Constraint>,
    register_count: usize,
    /// Set once a static (all-move, all-static) join has fired; cleared
    /// by `BLOCK_REMOVE` (`SPEC_FULL.md` §9).
    dormant: Cell<bool>,
}

impl JoinNode {
    pub fn new(constraints: Vec<Constraint>, register_count: usize) -> Self {
        JoinNode { constraints, register_count, dormant: Cell::new(false) }
    }

    pub fn is_static(&self) -> bool {
        !self.constraints.is_empty() && self.constraints.iter().all(Constraint::is_static_move)
    }

    fn fully_bound(&self, prefix: &Prefix) -> bool {
        (0..self.register_count).all(|i| prefix.is_bound(Register(i as u32)))
    }

    /// A synthetic `BLOCK_ADD` (`count = 1`) or `BLOCK_REMOVE`
    /// (`count = -1`) signal: bypasses head-match enumeration and runs the
    /// whole join from an empty prefix (`spec.md` §4.7, §6).
    pub fn apply_block_signal(&self, count: i64, ctx: &EvalCtx) -> Vec<Prefix> {
        if count < 0 {
            self.dormant.set(false);
        }
        if self.is_static() && self.dormant.get() {
            return Vec::new();
        }
        let results = self
            .generic_join(Prefix::empty(self.register_count), ctx)
            .into_iter()
            .filter_map(|prefix| self.finalize(prefix, 0, count, ctx))
            .collect();
        if self.is_static() && count > 0 {
            self.dormant.set(true);
        }
        results
    }

    /// Runs the join against a real input change: power-set enumeration
    /// over the constraints `change` structurally affects.
    pub fn apply_change(&self, change: &Change, ctx: &EvalCtx) -> Vec<Prefix> {
        let affected: Vec<usize> =
            self.constraints.iter().enumerate().filter(|(_, c)| c.is_affected(change)).map(|(i, _)| i).collect();
        let mut out = Vec::new();
        for subset in power_set(&affected) {
            if subset.is_empty() {
                continue;
            }
            let mut prefix = Prefix::empty(self.register_count);
            let mut ok = true;
            for &i in &subset {
                if !self.constraints[i].apply_input(change, &mut prefix) {
                    ok = false;
                    break;
                }
            }
            if !ok {
                continue;
            }
            for resolved in self.generic_join(prefix, ctx) {
                if let Some(result) = self.finalize(resolved, change.round, change.count, ctx) {
                    out.push(result);
                }
            }
        }
        out
    }

    /// The recursive propose/resolve/accept core (`spec.md` §4.7 step 4).
    fn generic_join(&self, prefix: Prefix, ctx: &EvalCtx) -> Vec<Prefix> {
        if self.fully_bound(&prefix) {
            return vec![prefix];
        }
        let mut winner: Option<(usize, usize)> = None;
        for (i, constraint) in self.constraints.iter().enumerate() {
            if let Some(cardinality) = constraint.propose(&prefix, ctx) {
                if winner.map_or(true, |(_, best)| cardinality < best) {
                    winner = Some((i, cardinality));
                }
            }
        }
        let Some((winner, _)) = winner else {
            return Vec::new();
        };
        let mut results = Vec::new();
        for candidate in self.constraints[winner].resolve(&prefix, ctx) {
            let newly_bound = newly_bound_registers(&prefix, &candidate, self.register_count);
            let accepted = self
                .constraints
                .iter()
                .enumerate()
                .filter(|&(i, _)| i != winner)
                .all(|(_, c)| c.accept(&candidate, ctx, &newly_bound));
            if accepted {
                results.extend(self.generic_join(candidate, ctx));
            }
        }
        results
    }

    /// Composes the derived round/count for a fully-bound prefix from the
    /// input change's `(round, count)` and every scan's zero-crossing
    /// diffs, per `spec.md` §4.7.1. A net-zero sign sum means the premises
    /// cancelled out within this transaction and the derivation is
    /// dropped.
    fn finalize(&self, prefix: Prefix, input_round: i64, input_count: i64, ctx: &EvalCtx) -> Option<Prefix> {
        let mut round = input_round;
        let mut multiplier = 1i64;
        for constraint in &self.constraints {
            if !matches!(constraint, Constraint::Scan(_)) {
                continue;
            }
            let diffs = constraint.get_diffs(&prefix, ctx);
            if diffs.is_empty() {
                continue;
            }
            let mut sign_sum = 0i64;
            for code in diffs {
                round = round.max(code.abs() - 1);
                sign_sum += if code > 0 { 1 } else { -1 };
            }
            multiplier *= sign_sum;
        }
        let count = input_count * multiplier;
        if count == 0 {
            return None;
        }
        Some(prefix.with_round_count(round, count))
    }
}

fn newly_bound_registers(before: &Prefix, after: &Prefix, register_count: usize) -> Vec<Register> {
    (0..register_count)
        .map(|i| Register(i as u32))
        .filter(|&r| !before.is_bound(r) && after.is_bound(r))
        .collect()
}

fn power_set(items: &[usize]) -> Vec<Vec<usize>> {
    let mut subsets = vec![Vec::new()];
    for &item in items {
        let extended: Vec<Vec<usize>> = subsets.iter().map(|s| {
            let mut s = s.clone();
            s.push(item);
            s
        }).collect();
        subsets.extend(extended);
    }
    subsets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::FunctionRegistry;
    use crate::id::{Field, Id};
    use crate::index::TripleIndex;
    use crate::interner::Interner;
    use crate::constraint::ScanConstraint;
    use std::cell::RefCell;

    fn id(n: u32) -> Id {
        Id::from_index(n)
    }

    fn ctx<'a>(index: &'a TripleIndex, functions: &'a FunctionRegistry, interner: &'a RefCell<Interner>) -> EvalCtx<'a> {
        EvalCtx { index, functions, interner, transaction: 0, round: 0 }
    }

    #[test]
    fn power_set_excludes_the_empty_subset_by_convention_of_caller() {
        let sets = power_set(&[0, 1]);
        assert_eq!(sets.len(), 4);
        assert!(sets.contains(&vec![]));
        assert!(sets.contains(&vec![0, 1]));
    }

    #[test]
    fn single_scan_join_matches_on_insert() {
        let mut index = TripleIndex::new();
        index.insert(id(1), id(10), id(2), id(0), 0, 0, 1);
        let functions = FunctionRegistry::new();
        let interner = RefCell::new(Interner::new());
        let evaluation = ctx(&index, &functions, &interner);

        let scan = Constraint::Scan(ScanConstraint::new(
            Field::Register(Register(0)),
            Field::Static(id(10)),
            Field::Register(Register(1)),
            Field::Ignore,
        ));
        let join = JoinNode::new(vec![scan], 2);
        let change = Change::new(id(1), id(10), id(2), id(0), 0, 0, 1);
        let results = join.apply_change(&change, &evaluation);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].get(Register(0)), Some(id(1)));
        assert_eq!(results[0].get(Register(1)), Some(id(2)));
    }

    #[test]
    fn transitive_closure_join_finds_the_connecting_edge() {
        // edge(1,2) ^ edge(2,3) via a self-join on the shared register.
        let mut index = TripleIndex::new();
        index.insert(id(1), id(10), id(2), id(0), 0, 0, 1);
        index.insert(id(2), id(10), id(3), id(0), 0, 0, 1);
        let functions = FunctionRegistry::new();
        let interner = RefCell::new(Interner::new());
        let evaluation = ctx(&index, &functions, &interner);

        // registers: 0=x, 1=y, 2=z
        let left = Constraint::Scan(ScanConstraint::new(
            Field::Register(Register(0)),
            Field::Static(id(10)),
            Field::Register(Register(1)),
            Field::Ignore,
        ));
        let right = Constraint::Scan(ScanConstraint::new(
            Field::Register(Register(1)),
            Field::Static(id(10)),
            Field::Register(Register(2)),
            Field::Ignore,
        ));
        let join = JoinNode::new(vec![left, right], 3);
        let change = Change::new(id(1), id(10), id(2), id(0), 0, 0, 1);
        let results = join.apply_change(&change, &evaluation);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].get(Register(0)), Some(id(1)));
        assert_eq!(results[0].get(Register(1)), Some(id(2)));
        assert_eq!(results[0].get(Register(2)), Some(id(3)));
    }

    #[test]
    fn static_join_fires_once_per_block_add() {
        let index = TripleIndex::new();
        let functions = FunctionRegistry::new();
        let interner = RefCell::new(Interner::new());
        let evaluation = ctx(&index, &functions, &interner);
        let mv = Constraint::Move(crate::constraint::MoveConstraint::new(Field::Static(id(1)), Register(0)));
        let join = JoinNode::new(vec![mv], 1);
        assert!(join.is_static());
        let first = join.apply_block_signal(1, &evaluation);
        assert_eq!(first.len(), 1);
        let second = join.apply_block_signal(1, &evaluation);
        assert!(second.is_empty());
    }
}
