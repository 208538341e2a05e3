//! The move constraint: copies a static id or a register's value into
//! another register (`spec.md` §4.6).

use crate::id::{Field, Id, Register};
use crate::prefix::Prefix;

#[derive(Debug, Clone, Copy)]
pub struct MoveConstraint {
    pub source: Field,
    pub destination: Register,
}

impl MoveConstraint {
    pub fn new(source: Field, destination: Register) -> Self {
        MoveConstraint { source, destination }
    }

    pub fn registers(&self) -> Vec<Register> {
        let mut regs = Vec::new();
        if let Some(r) = self.source.as_register() {
            regs.push(r);
        }
        regs.push(self.destination);
        regs
    }

    /// A move with a static source depends on no register at all — the
    /// building block of a *static* join (`spec.md` §4.7, §9).
    pub fn is_static(&self) -> bool {
        matches!(self.source, Field::Static(_))
    }

    fn source_id(&self, prefix: &Prefix) -> Option<Id> {
        super::resolved(self.source, prefix)
    }

    /// Proposes exactly when the source is known and the destination is
    /// not; otherwise it degenerates into an equality check.
    pub fn propose(&self, prefix: &Prefix) -> Option<usize> {
        if prefix.is_bound(self.destination) {
            return None;
        }
        self.source_id(prefix).map(|_| 1)
    }

    pub fn resolve(&self, prefix: &Prefix) -> Vec<Prefix> {
        let Some(id) = self.source_id(prefix) else {
            return Vec::new();
        };
        let mut candidate = prefix.clone();
        if candidate.bind(self.destination, id) {
            vec![candidate]
        } else {
            Vec::new()
        }
    }

    pub fn accept(&self, prefix: &Prefix) -> bool {
        match (self.source_id(prefix), prefix.get(self.destination)) {
            (Some(source), Some(dest)) => source == dest,
            _ => true,
        }
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
    fn static_move_is_dormant_after_binding() {
        let mv = MoveConstraint::new(Field::Static(id(5)), Register(0));
        assert!(mv.is_static());
        let mut prefix = Prefix::empty(1);
        assert_eq!(mv.propose(&prefix), Some(1));
        let resolved = mv.resolve(&prefix);
        assert_eq!(resolved.len(), 1);
        prefix.bind(Register(0), id(5));
        assert_eq!(mv.propose(&prefix), None);
        assert!(mv.accept(&prefix));
    }

    #[test]
    fn register_move_rejects_conflicting_destination() {
        let mv = MoveConstraint::new(Field::Register(Register(0)), Register(1));
        let mut prefix = Prefix::empty(2);
        prefix.bind(Register(0), id(1));
        prefix.bind(Register(1), id(2));
        assert!(!mv.accept(&prefix));
    }
}
