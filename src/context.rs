//! The evaluation context: interner, primary triple index, function
//! registry, and the compiled block set a transaction runs against
//! (`spec.md` §5–§6).
//!
//! Deliberately `!Sync` by construction — it holds a `RefCell`, so the
//! compiler itself enforces "two transactions never run against the
//! same context concurrently" rather than a lock, matching the explicit
//! non-goal against internal parallelism (`SPEC_FULL.md` §5).

use std::cell::RefCell;
use std::collections::HashMap;

use crate::config::Config;
use crate::distinct::ExportCollapse;
use crate::functions::FunctionRegistry;
use crate::id::BlockId;
use crate::index::TripleIndex;
use crate::interner::Interner;
use crate::output::ExportKey;

use crate::block::Block;

/// Owns every block in a compiled program, keyed by [`BlockId`].
pub struct EvaluationContext {
    pub(crate) interner: RefCell<Interner>,
    pub(crate) index: TripleIndex,
    pub(crate) functions: FunctionRegistry,
    pub(crate) blocks: HashMap<BlockId, Block>,
    /// Collapses raw watch emissions to the `spec.md` §6 multiplicity rule;
    /// lives here (not per-transaction) since a key's running total spans
    /// every transaction the block has ever seen.
    pub(crate) export_log: ExportCollapse<ExportKey>,
    pub config: Config,
}

impl EvaluationContext {
    pub fn new(config: Config) -> Self {
        EvaluationContext {
            interner: RefCell::new(Interner::new().with_arena_release(config.engine.interner.enable_arena_release)),
            index: TripleIndex::new(),
            functions: FunctionRegistry::new(),
            blocks: HashMap::new(),
            export_log: ExportCollapse::new(),
            config,
        }
    }

    pub fn with_default_config() -> Self {
        Self::new(Config::default())
    }

    /// Installs (or replaces) a compiled block — the program-mutation
    /// half of `spec.md` §6's `BLOCK_ADD`/`BLOCK_REMOVE` protocol; the
    /// data-side half runs through the transaction loop.
    pub fn add_block(&mut self, id: BlockId, block: Block) {
        self.blocks.insert(id, block);
    }

    pub fn remove_block(&mut self, id: BlockId) -> Option<Block> {
        self.blocks.remove(&id)
    }

    pub fn block_ids(&self) -> impl Iterator<Item = &BlockId> {
        self.blocks.keys()
    }

    pub fn functions_mut(&mut self) -> &mut FunctionRegistry {
        &mut self.functions
    }

    pub fn interner(&self) -> &RefCell<Interner> {
        &self.interner
    }

    pub fn index(&self) -> &TripleIndex {
        &self.index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::{Constraint, ScanConstraint};
    use crate::id::{Field, Id, Register};
    use crate::join::JoinNode;

    fn id(n: u32) -> Id {
        Id::from_index(n)
    }

    #[test]
    fn a_context_starts_with_builtin_functions_and_no_blocks() {
        let ctx = EvaluationContext::with_default_config();
        assert!(ctx.functions.contains("+"));
        assert_eq!(ctx.block_ids().count(), 0);
    }

    #[test]
    fn add_and_remove_block_round_trips() {
        let mut ctx = EvaluationContext::with_default_config();
        let scan = Constraint::Scan(ScanConstraint::new(
            Field::Register(Register(0)),
            Field::Static(id(10)),
            Field::Register(Register(1)),
            Field::Ignore,
        ));
        let block = Block::new("edges", 2, JoinNode::new(vec![scan], 2));
        ctx.add_block(BlockId(0), block);
        assert_eq!(ctx.block_ids().count(), 1);
        assert!(ctx.remove_block(BlockId(0)).is_some());
        assert_eq!(ctx.block_ids().count(), 0);
    }
}
