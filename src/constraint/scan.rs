//! The scan constraint: a triple pattern against the index (`spec.md`
//! §4.4).

use super::EvalCtx;
use crate::change::Change;
use crate::id::{Field, Id, Register};
use crate::index::{ProposeField, ProposeInput, Slot};
use crate::prefix::Prefix;

#[derive(Debug, Clone, Copy)]
pub struct ScanConstraint {
    pub e: Field,
    pub a: Field,
    pub v: Field,
    pub n: Field,
}

impl ScanConstraint {
    pub fn new(e: Field, a: Field, v: Field, n: Field) -> Self {
        ScanConstraint { e, a, v, n }
    }

    pub fn registers(&self) -> Vec<Register> {
        [self.e, self.a, self.v, self.n].into_iter().filter_map(Field::as_register).collect()
    }

    pub fn is_affected(&self, change: &Change) -> bool {
        Self::static_matches(self.e, change.e)
            && Self::static_matches(self.a, change.a)
            && Self::static_matches(self.v, change.v)
            && Self::static_matches(self.n, change.n)
    }

    fn static_matches(field: Field, id: Id) -> bool {
        match field {
            Field::Static(x) => x == id,
            Field::Register(_) | Field::Ignore => true,
        }
    }

    pub fn apply_input(&self, change: &Change, prefix: &mut Prefix) -> bool {
        for (field, id) in [
            (self.e, change.e),
            (self.a, change.a),
            (self.v, change.v),
            (self.n, change.n),
        ] {
            if let Field::Register(r) = field {
                if !prefix.bind(r, id) {
                    return false;
                }
            }
        }
        true
    }

    fn query(&self, prefix: &Prefix) -> ProposeInput {
        ProposeInput {
            e: Self::field_query(self.e, prefix),
            a: Self::field_query(self.a, prefix),
            v: Self::field_query(self.v, prefix),
            n: Self::field_query(self.n, prefix),
        }
    }

    fn field_query(field: Field, prefix: &Prefix) -> ProposeField {
        match field {
            Field::Static(id) => ProposeField::Bound(id),
            Field::Ignore => ProposeField::Ignore,
            Field::Register(r) => match prefix.get(r) {
                Some(id) => ProposeField::Bound(id),
                None => ProposeField::Unbound,
            },
        }
    }

    pub fn propose(&self, prefix: &Prefix, ctx: &EvalCtx) -> Option<usize> {
        let proposal = ctx.index.propose(&self.query(prefix), ctx.transaction);
        if proposal.skip {
            None
        } else {
            Some(proposal.cardinality)
        }
    }

    pub fn resolve(&self, prefix: &Prefix, ctx: &EvalCtx) -> Vec<Prefix> {
        let query = self.query(prefix);
        let proposal = ctx.index.propose(&query, ctx.transaction);
        let Some(slot) = proposal.slot else {
            return Vec::new();
        };
        let register = match slot {
            Slot::E => self.e.as_register(),
            Slot::A => self.a.as_register(),
            Slot::V => self.v.as_register(),
            Slot::N => self.n.as_register(),
        };
        let Some(register) = register else {
            return Vec::new();
        };
        ctx.index
            .resolve_proposal(&query, slot, ctx.transaction)
            .into_iter()
            .filter_map(|id| {
                let mut candidate = prefix.clone();
                if candidate.bind(register, id) {
                    Some(candidate)
                } else {
                    None
                }
            })
            .collect()
    }

    pub fn accept(&self, prefix: &Prefix, ctx: &EvalCtx) -> bool {
        ctx.index.check_pattern(&self.query(prefix), ctx.transaction)
    }

    pub fn get_diffs(&self, prefix: &Prefix, ctx: &EvalCtx) -> Vec<i64> {
        let resolve = |f: Field| super::resolved(f, prefix);
        match (resolve(self.e), resolve(self.a), resolve(self.v), resolve(self.n)) {
            (Some(e), Some(a), Some(v), Some(n)) => ctx.index.get_diffs(e, a, v, n, ctx.transaction),
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::FunctionRegistry;
    use crate::index::TripleIndex;
    use crate::interner::Interner;
    use std::cell::RefCell;

    fn id(n: u32) -> Id {
        Id::from_index(n)
    }

    #[test]
    fn propose_skips_when_fully_static() {
        let mut index = TripleIndex::new();
        index.insert(id(1), id(2), id(3), id(4), 0, 0, 1);
        let functions = FunctionRegistry::new();
        let interner = RefCell::new(Interner::new());
        let ctx = EvalCtx { index: &index, functions: &functions, interner: &interner, transaction: 0, round: 0 };
        let scan = ScanConstraint::new(Field::Static(id(1)), Field::Static(id(2)), Field::Static(id(3)), Field::Static(id(4)));
        let prefix = Prefix::empty(0);
        assert_eq!(scan.propose(&prefix, &ctx), None);
        assert!(scan.accept(&prefix, &ctx));
    }

    #[test]
    fn resolve_binds_candidates_into_fresh_prefixes() {
        let mut index = TripleIndex::new();
        index.insert(id(1), id(2), id(3), id(4), 0, 0, 1);
        index.insert(id(1), id(2), id(5), id(4), 0, 0, 1);
        let functions = FunctionRegistry::new();
        let interner = RefCell::new(Interner::new());
        let ctx = EvalCtx { index: &index, functions: &functions, interner: &interner, transaction: 0, round: 0 };
        let scan = ScanConstraint::new(Field::Static(id(1)), Field::Static(id(2)), Field::Register(Register(0)), Field::Static(id(4)));
        let prefix = Prefix::empty(1);
        let candidates = scan.resolve(&prefix, &ctx);
        assert_eq!(candidates.len(), 2);
        assert!(candidates.iter().any(|c| c.get(Register(0)) == Some(id(3))));
        assert!(candidates.iter().any(|c| c.get(Register(0)) == Some(id(5))));
    }
}
