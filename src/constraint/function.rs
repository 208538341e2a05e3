//! The function constraint: a registered pure/multi-valued/filter
//! function over resolved inputs (`spec.md` §4.5).

use super::EvalCtx;
use crate::functions::FunctionEval;
use crate::id::{Field, Register};
use crate::prefix::Prefix;
use crate::raw_value::RawValue;

const FUNCTION_OUTPUT_ARENA: &str = "function_output";

#[derive(Debug, Clone)]
pub struct FunctionConstraint {
    pub name: String,
    pub args: Vec<Field>,
    pub outputs: Vec<Register>,
}

impl FunctionConstraint {
    pub fn new(name: impl Into<String>, args: Vec<Field>, outputs: Vec<Register>) -> Self {
        FunctionConstraint { name: name.into(), args, outputs }
    }

    pub fn registers(&self) -> Vec<Register> {
        self.args.iter().filter_map(|f| f.as_register()).chain(self.outputs.iter().copied()).collect()
    }

    fn inputs_bound(&self, prefix: &Prefix) -> Option<Vec<crate::id::Id>> {
        self.args
            .iter()
            .map(|f| super::resolved(*f, prefix))
            .collect::<Option<Vec<_>>>()
    }

    fn unbound_outputs(&self, prefix: &Prefix) -> Vec<Register> {
        self.outputs.iter().copied().filter(|r| !prefix.is_bound(*r)).collect()
    }

    fn resolve_args(&self, ids: &[crate::id::Id], ctx: &EvalCtx) -> Vec<RawValue> {
        let interner = ctx.interner.borrow();
        ids.iter().map(|id| interner.get(*id).cloned().expect("bound register ids are always interned")).collect()
    }

    /// Only fires when every input is bound and at least one output is
    /// unbound (`spec.md` §4.5).
    pub fn propose(&self, prefix: &Prefix, ctx: &EvalCtx) -> Option<usize> {
        let input_ids = self.inputs_bound(prefix)?;
        if self.unbound_outputs(prefix).is_empty() {
            return None;
        }
        let spec = ctx.functions.get(&self.name)?;
        let args = self.resolve_args(&input_ids, ctx);
        Some(spec.estimate.map_or(1, |f| f(&args)))
    }

    pub fn resolve(&self, prefix: &Prefix, ctx: &EvalCtx) -> Vec<Prefix> {
        let Some(input_ids) = self.inputs_bound(prefix) else {
            return Vec::new();
        };
        let Some(spec) = ctx.functions.get(&self.name) else {
            return Vec::new();
        };
        let args = self.resolve_args(&input_ids, ctx);
        let result_tuples: Vec<Vec<RawValue>> = match spec.eval {
            FunctionEval::Pure(f) => f(&args).into_iter().collect(),
            FunctionEval::Multi(f) => f(&args),
            FunctionEval::Filter(_) => Vec::new(),
        };
        result_tuples
            .into_iter()
            .filter_map(|tuple| {
                if tuple.len() != self.outputs.len() {
                    return None;
                }
                let mut candidate = prefix.clone();
                let mut interner = ctx.interner.borrow_mut();
                for (register, value) in self.outputs.iter().zip(tuple) {
                    let id = interner.intern_into_arena(FUNCTION_OUTPUT_ARENA, value);
                    if !candidate.bind(*register, id) {
                        return None;
                    }
                }
                Some(candidate)
            })
            .collect()
    }

    pub fn accept(&self, prefix: &Prefix, ctx: &EvalCtx) -> bool {
        let Some(input_ids) = self.inputs_bound(prefix) else {
            return true;
        };
        let Some(spec) = ctx.functions.get(&self.name) else {
            return false;
        };
        let args = self.resolve_args(&input_ids, ctx);
        match spec.eval {
            FunctionEval::Filter(f) => f(&args),
            FunctionEval::Pure(f) => match (f(&args), self.output_ids(prefix)) {
                (Some(computed), Some(bound)) => computed.len() == bound.len() && {
                    let interner = ctx.interner.borrow();
                    computed.iter().zip(bound).all(|(value, id)| interner.get(id).is_some_and(|raw| raw == value))
                },
                _ => false,
            },
            FunctionEval::Multi(f) => {
                let Some(bound) = self.output_ids(prefix) else { return false };
                let interner = ctx.interner.borrow();
                f(&args).into_iter().any(|tuple| {
                    tuple.len() == bound.len() && tuple.iter().zip(&bound).all(|(value, id)| interner.get(*id).is_some_and(|raw| raw == value))
                })
            }
        }
    }

    fn output_ids(&self, prefix: &Prefix) -> Option<Vec<crate::id::Id>> {
        self.outputs.iter().map(|r| prefix.get(*r)).collect()
    }
}
