//! Aggregate (`spec.md` §4.11): groups prefixes by a group key, dedups
//! contributions via a projection key, and maintains a rolling
//! [`AggregateKind`] state per group.

use std::collections::HashMap;

use crate::distinct::DistinctIndex;
use crate::error::{EngineError, EngineResult};
use crate::id::{Id, Register};
use crate::interner::Interner;
use crate::prefix::Prefix;
use crate::raw_value::RawValue;

type Key = Vec<Id>;

/// A rolling aggregate state: `add`/`remove` a contributed value,
/// `result` reads the current total.
pub trait AggregateKind: Default + Clone {
    fn add(&mut self, value: f64);
    fn remove(&mut self, value: f64);
    fn result(&self) -> RawValue;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Count(i64);

impl AggregateKind for Count {
    fn add(&mut self, _value: f64) {
        self.0 += 1;
    }
    fn remove(&mut self, _value: f64) {
        self.0 -= 1;
    }
    fn result(&self) -> RawValue {
        RawValue::number(self.0 as f64)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Sum(f64);

impl AggregateKind for Sum {
    fn add(&mut self, value: f64) {
        self.0 += value;
    }
    fn remove(&mut self, value: f64) {
        self.0 -= value;
    }
    fn result(&self) -> RawValue {
        RawValue::number(self.0)
    }
}

/// Interposed in front of an aggregate nested inside a [`super::choose::Choose`]
/// branch so it only sees tuples that join with the enclosing outer scope
/// (`spec.md` §4.11, "`AggregateOuterLookup`") — without this, an
/// aggregate inside an alternative branch would count every matching
/// tuple globally rather than per-outer-row.
pub struct AggregateOuterLookup {
    outer_registers: Vec<Register>,
    in_scope: std::collections::HashSet<Key>,
}

impl AggregateOuterLookup {
    pub fn new(outer_registers: Vec<Register>) -> Self {
        AggregateOuterLookup { outer_registers, in_scope: std::collections::HashSet::new() }
    }

    pub fn admit_outer(&mut self, prefix: &Prefix) {
        if let Some(key) = super::project_key(prefix, &self.outer_registers) {
            self.in_scope.insert(key);
        }
    }

    pub fn is_in_scope(&self, prefix: &Prefix) -> bool {
        match super::project_key(prefix, &self.outer_registers) {
            Some(key) => self.in_scope.contains(&key),
            None => false,
        }
    }
}

pub struct Aggregate<S: AggregateKind> {
    group_registers: Vec<Register>,
    projection_registers: Vec<Register>,
    value_register: Register,
    output_register: Register,
    contributions: DistinctIndex<(Key, Key)>,
    states: HashMap<Key, S>,
    last_output: HashMap<Key, Id>,
    /// Count of currently-present contributors per group, so an empty
    /// group can be told apart from one whose aggregate happens to equal
    /// zero (`spec.md` §8, "an aggregate with zero contributing prefixes
    /// in its group emits no output").
    population: HashMap<Key, i64>,
}

impl<S: AggregateKind> Aggregate<S> {
    pub fn new(
        group_registers: Vec<Register>,
        projection_registers: Vec<Register>,
        value_register: Register,
        output_register: Register,
    ) -> Self {
        Aggregate {
            group_registers,
            projection_registers,
            value_register,
            output_register,
            contributions: DistinctIndex::new(),
            states: HashMap::new(),
            last_output: HashMap::new(),
            population: HashMap::new(),
        }
    }

    /// Folds one incoming prefix into its group's state. Returns the
    /// retract/insert pair for the new result, or nothing if this
    /// contribution didn't toggle the projection's presence.
    pub fn process(&mut self, prefix: &Prefix, round: i64, count: i64, interner: &mut Interner) -> EngineResult<Vec<Prefix>> {
        let Some(group_key) = super::project_key(prefix, &self.group_registers) else { return Ok(Vec::new()) };
        let Some(projection_key) = super::project_key(prefix, &self.projection_registers) else { return Ok(Vec::new()) };
        let Some(value_id) = prefix.get(self.value_register) else { return Ok(Vec::new()) };
        let contribution_key = (group_key.clone(), projection_key);

        let Some(toggle) = self.contributions.apply(contribution_key.clone(), count) else {
            return Ok(Vec::new());
        };
        if self.contributions.total(&contribution_key) < 0 {
            return Err(EngineError::NegativeAggregateTotal);
        }

        let value = interner.get(value_id).and_then(RawValue::as_number).unwrap_or(0.0);
        let state = self.states.entry(group_key.clone()).or_default();
        if toggle > 0 {
            state.add(value);
        } else {
            state.remove(value);
        }
        let population = self.population.entry(group_key.clone()).or_insert(0);
        *population += toggle;
        let population = *population;
        let result_value = state.result();
        let result_id = interner.intern(result_value);

        let mut out = Vec::new();
        if let Some(previous) = self.last_output.remove(&group_key) {
            out.push(self.output_prefix(&group_key, previous, round, -1));
        }
        if population > 0 {
            out.push(self.output_prefix(&group_key, result_id, round, 1));
            self.last_output.insert(group_key, result_id);
        }
        Ok(out)
    }

    fn output_prefix(&self, group_key: &[Id], result: Id, round: i64, count: i64) -> Prefix {
        let register_count = self.group_registers.iter().chain(std::iter::once(&self.output_register)).map(|r| r.offset()).max().unwrap_or(0) + 1;
        let mut prefix = Prefix::empty(register_count);
        for (register, id) in self.group_registers.iter().zip(group_key) {
            prefix.bind(*register, *id);
        }
        prefix.bind(self.output_register, result);
        prefix.with_round_count(round, count)
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
    fn counting_aggregate_tracks_group_membership() {
        let mut aggregate: Aggregate<Count> = Aggregate::new(vec![Register(0)], vec![Register(1)], Register(1), Register(2));
        let mut interner = Interner::new();

        let mut a = Prefix::empty(3);
        a.bind(Register(0), id(100)); // group "x"
        a.bind(Register(1), id(1)); // entity a
        let out_a = aggregate.process(&a, 0, 1, &mut interner).unwrap();
        assert_eq!(out_a.len(), 1);
        assert_eq!(interner.get(out_a[0].get(Register(2)).unwrap()).unwrap().as_number(), Some(1.0));

        let mut b = Prefix::empty(3);
        b.bind(Register(0), id(100));
        b.bind(Register(1), id(2));
        let out_b = aggregate.process(&b, 0, 1, &mut interner).unwrap();
        assert_eq!(out_b.len(), 2); // retract 1, insert 2
        assert_eq!(interner.get(out_b[1].get(Register(2)).unwrap()).unwrap().as_number(), Some(2.0));

        let out_retract = aggregate.process(&b, 1, -1, &mut interner).unwrap();
        assert_eq!(interner.get(out_retract[1].get(Register(2)).unwrap()).unwrap().as_number(), Some(1.0));
    }
}
