//! A compiled rule: a join root, an ordered pipeline of dataflow
//! operators, and the output/watch terminals that consume them
//! (`spec.md` §4.7–§4.14, §6).
//!
//! Stages only ever reference the join or an *earlier* stage as an
//! input — the "DAG" is a topologically-sorted `Vec` by construction
//! (no cycle detection at this layer; a recursive rule closes its cycle
//! through a whole extra transaction round, not through a stage
//! referencing itself).

use crate::change::Change;
use crate::constraint::EvalCtx;
use crate::error::EngineResult;
use crate::id::Field;
use crate::interner::Interner;
use crate::join::JoinNode;
use crate::ops::aggregate::{Aggregate, Count, Sum};
use crate::ops::antijoin::AntiJoin;
use crate::ops::binary_join::BinaryJoin;
use crate::ops::choose::Choose;
use crate::ops::sort::Sort;
use crate::ops::union::Union;
use crate::output::{expand_pending, OutputNode, Persistence, WatchNode};
use crate::prefix::Prefix;

/// One delta flowing between stages: the prefix plus its round/count,
/// tracked out-of-band the same way every `ops::*` module already does.
pub type Delta = (Prefix, i64, i64);

/// Where a stage (or a terminal) reads its input from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageInput {
    Join,
    Stage(usize),
}

/// An aggregate stage, over whichever [`crate::ops::aggregate::AggregateKind`]
/// the rule asked for. Boxed enum instead of a generic `Stage` variant
/// since a block's stage list is heterogeneous at runtime.
pub enum AggregateStage {
    Count(Aggregate<Count>),
    Sum(Aggregate<Sum>),
}

impl AggregateStage {
    fn process(&mut self, prefix: &Prefix, round: i64, count: i64, interner: &mut Interner) -> EngineResult<Vec<Delta>> {
        let out = match self {
            AggregateStage::Count(a) => a.process(prefix, round, count, interner)?,
            AggregateStage::Sum(a) => a.process(prefix, round, count, interner)?,
        };
        Ok(out.into_iter().map(|p| { let round = p.round(); let count = p.count(); (p, round, count) }).collect())
    }
}

/// One operator downstream of the join (`spec.md` §4.8–§4.12).
pub enum Stage {
    Binary { node: BinaryJoin, left: StageInput, right: StageInput },
    Anti { node: AntiJoin, left: StageInput, right: StageInput },
    Union { node: Union, outer: StageInput, branches: Vec<StageInput> },
    Choose { node: Choose, outer: StageInput, branches: Vec<StageInput> },
    Aggregate { node: AggregateStage, input: StageInput },
    Sort { node: Sort, input: StageInput },
}

/// A fully compiled rule.
pub struct Block {
    pub name: String,
    pub register_count: usize,
    pub join: JoinNode,
    pub stages: Vec<Stage>,
    pub outputs: Vec<(StageInput, OutputNode)>,
    pub watches: Vec<(StageInput, WatchNode, Field, Field, Field, Field)>,
}

impl Block {
    pub fn new(name: impl Into<String>, register_count: usize, join: JoinNode) -> Self {
        Block { name: name.into(), register_count, join, stages: Vec::new(), outputs: Vec::new(), watches: Vec::new() }
    }

    pub fn push_stage(&mut self, stage: Stage) -> usize {
        self.stages.push(stage);
        self.stages.len() - 1
    }

    fn join_deltas(prefixes: Vec<Prefix>) -> Vec<Delta> {
        prefixes.into_iter().map(|p| {
            let round = p.round();
            let count = p.count();
            (p, round, count)
        }).collect()
    }

    fn stream<'a>(input: StageInput, join_stream: &'a [Delta], stage_outputs: &'a [Vec<Delta>]) -> &'a [Delta] {
        match input {
            StageInput::Join => join_stream,
            StageInput::Stage(i) => &stage_outputs[i],
        }
    }

    /// Runs one change (or synthetic `BLOCK_ADD`/`BLOCK_REMOVE` signal,
    /// already expressed as the join's empty-prefix run in `join_result`)
    /// through the whole pipeline, returning every concrete [`Change`]
    /// this block emits — outputs fully resolved, watch changes included.
    pub fn drive(
        &mut self,
        join_result: Vec<Prefix>,
        ctx: &EvalCtx,
        transaction: u64,
    ) -> EngineResult<(Vec<(Change, Persistence)>, Vec<(crate::id::BlockId, Change)>)> {
        let join_stream = Self::join_deltas(join_result);
        let mut stage_outputs: Vec<Vec<Delta>> = Vec::with_capacity(self.stages.len());

        for stage in &mut self.stages {
            let produced = Self::run_stage(stage, &join_stream, &stage_outputs, &mut ctx.interner.borrow_mut())?;
            stage_outputs.push(produced);
        }

        let mut outputs = Vec::new();
        for (input, node) in &self.outputs {
            for (prefix, round, count) in Self::stream(*input, &join_stream, &stage_outputs) {
                let pending = node.emit(prefix, transaction, *round, *count)?;
                outputs.extend(expand_pending(pending, ctx.index).into_iter().map(|change| (change, node.persistence)));
            }
        }

        let mut watch_changes = Vec::new();
        for (input, node, e, a, v, n) in &self.watches {
            for (prefix, round, count) in Self::stream(*input, &join_stream, &stage_outputs) {
                let change = node.emit(prefix, transaction, *round, *count, *e, *a, *v, *n)?;
                watch_changes.push((node.block, change));
            }
        }

        Ok((outputs, watch_changes))
    }

    fn run_stage(stage: &mut Stage, join_stream: &[Delta], stage_outputs: &[Vec<Delta>], interner: &mut Interner) -> EngineResult<Vec<Delta>> {
        let mut out = Vec::new();
        match stage {
            Stage::Binary { node, left, right } => {
                for (p, r, c) in Self::stream(*left, join_stream, stage_outputs).to_vec() {
                    out.extend(node.insert_left(p, r, c));
                }
                for (p, r, c) in Self::stream(*right, join_stream, stage_outputs).to_vec() {
                    out.extend(node.insert_right(p, r, c));
                }
            }
            Stage::Anti { node, left, right } => {
                for (p, r, c) in Self::stream(*left, join_stream, stage_outputs).to_vec() {
                    out.extend(node.insert_left(p, r, c));
                }
                for (p, r, c) in Self::stream(*right, join_stream, stage_outputs).to_vec() {
                    out.extend(node.insert_right(&p, r, c));
                }
            }
            Stage::Union { node, outer, branches } => {
                for (p, r, c) in Self::stream(*outer, join_stream, stage_outputs).to_vec() {
                    out.extend(node.process_outer(p, r, c));
                }
                for (index, branch) in branches.iter().enumerate() {
                    for (p, r, c) in Self::stream(*branch, join_stream, stage_outputs).to_vec() {
                        out.extend(node.process_branch(index, p, r, c));
                    }
                }
            }
            Stage::Choose { node, outer, branches } => {
                for (p, r, c) in Self::stream(*outer, join_stream, stage_outputs).to_vec() {
                    for (_, prefix, r, c) in node.process_outer(p, r, c) {
                        out.push((prefix, r, c));
                    }
                }
                for (index, branch) in branches.iter().enumerate() {
                    for (p, r, c) in Self::stream(*branch, join_stream, stage_outputs).to_vec() {
                        for (_, prefix, r, c) in node.process_branch(index, p, r, c) {
                            out.push((prefix, r, c));
                        }
                    }
                }
            }
            Stage::Aggregate { node, input } => {
                for (p, r, c) in Self::stream(*input, join_stream, stage_outputs).to_vec() {
                    out.extend(node.process(&p, r, c, interner)?);
                }
            }
            Stage::Sort { node, input } => {
                for (p, r, _c) in Self::stream(*input, join_stream, stage_outputs).to_vec() {
                    let round = p.round();
                    out.extend(node.insert(p, round, interner));
                }
            }
        }
        Ok(out)
    }
}
