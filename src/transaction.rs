//! The transaction fixpoint loop (`spec.md` §5–§6).
//!
//! A transaction ingests a batch of raw changes and/or `BLOCK_ADD`/
//! `BLOCK_REMOVE` program-mutation signals, then drives every block's
//! [`crate::join::JoinNode`] to a fixpoint: each round processes the
//! previous round's derived changes, feeding any `Insert`/`Remove`
//! output it produces back in as the next round's input (semi-naive
//! evaluation). A round counts one BFS level of this recursion.
//!
//! A frame is the coarser sub-epoch of `spec.md` §5: once a frame's
//! round queue fully drains, any pending `Persistence::Commit` outputs
//! collapse and promote — round resets to 0 and the collapsed commits
//! re-enter as round-0 inputs with saturated counts, opening a new
//! frame. `frame_limit` bounds how many times a transaction may do this.
//! Since a `Commit` output is requeued into `next_round` the same as a
//! `Bind` output, a rule that keeps re-matching its own derived output
//! never lets its round queue empty at all — it is bounded purely by
//! `iteration_limit`, never by `frame_limit`.
//!
//! `Persistence::Bind` output is visible only for the rest of this
//! transaction: it is inserted into the index like any other delta so
//! later rounds can scan it, then retracted at commit-collapse so it
//! never rolls into the next transaction's base count.
//! `Persistence::Commit` output is left standing — the index's own
//! per-transaction bookkeeping (`crate::index::Entry::touch`) rolls it
//! into the base count the next transaction sees.
//!
//! Every change — a raw input or a derived output queued for a later
//! round — is written into the index one at a time, immediately before
//! it is run through the blocks, rather than as a batch up front. A
//! round's members are only ever mutually visible in the order they are
//! drained: otherwise two facts arriving in the same batch that jointly
//! satisfy a self-join (`edge(1,2)` and `edge(2,3)` landing in the same
//! transaction) would each independently re-derive the join across the
//! other, double-counting a result that a delta-join must only produce
//! once.

use std::cell::RefCell;
use std::collections::VecDeque;

use tracing::{debug, instrument, trace, warn};

use crate::change::{BlockChange, Change, RawChange};
use crate::constraint::EvalCtx;
use crate::context::EvaluationContext;
use crate::distinct::DistinctIndex;
use crate::error::{EngineError, EngineResult};
use crate::id::{BlockId, ProvenanceId};
use crate::output::{collapse_watch_changes, Persistence};
use crate::trace;

/// Magnitude a collapsed commit is requeued with at the start of its
/// promoting frame (`spec.md` §5: "collapsed commits re-enter as round-0
/// inputs with saturated counts (±∞)"). Large enough to dominate any
/// ordinary derived multiplicity without risking `i64` overflow when a
/// downstream binary join multiplies it against another count.
const SATURATED_COUNT: i64 = 1 << 30;

/// One instruction fed into a transaction: a data change to apply to
/// the primary store, or a program-mutation signal for one block
/// (`spec.md` §6).
pub enum TransactionInput {
    Data(RawChange),
    BlockAdd(BlockId),
    BlockRemove(BlockId),
}

/// Everything a transaction produced, ready for a caller to act on.
#[derive(Debug, Default)]
pub struct TransactionOutcome {
    /// Watch-node exports, per source block, in emission order.
    pub watched: Vec<BlockChange>,
    pub rounds_run: i64,
    pub frames_run: u32,
}

/// Runs one transaction of `inputs` against `ctx`, returning every
/// watch export it produced. `transaction` must be a fresh id, strictly
/// greater than every prior call's (the index's per-key bookkeeping is
/// scoped by it, `spec.md` §4.2).
#[instrument(skip(ctx, inputs), fields(transaction))]
pub fn run_transaction(
    ctx: &mut EvaluationContext,
    transaction: u64,
    inputs: Vec<TransactionInput>,
) -> EngineResult<TransactionOutcome> {
    let _txn_guard = trace::transaction_span(transaction).entered();

    let iteration_limit = ctx.config.engine.iteration_limit;
    let frame_limit = ctx.config.engine.frame_limit;

    let mut iteration_count: u64 = 0;
    let mut round: i64 = 0;
    let mut frame: u32 = 0;
    let mut bind_log: Vec<Change> = Vec::new();
    let mut commit_log: Vec<Change> = Vec::new();
    let mut undo_log: Vec<Change> = Vec::new();
    let mut watched: Vec<BlockChange> = Vec::new();

    // Tracks, for the lifetime of this transaction, which commit keys have
    // already crossed into (or out of) promoted presence — so a commit that
    // keeps re-deriving identically across frames only ever triggers one
    // collapse per crossing instead of collapsing forever.
    let mut commit_distinct: DistinctIndex<(crate::id::Id, crate::id::Id, crate::id::Id, ProvenanceId)> = DistinctIndex::new();

    let mut queue: VecDeque<Change> = VecDeque::new();
    let mut block_signals: VecDeque<(BlockId, i64)> = VecDeque::new();

    for input in inputs {
        match input {
            TransactionInput::Data(raw) => queue.push_back(intern_change(ctx, &raw, transaction, round)),
            TransactionInput::BlockAdd(id) => block_signals.push_back((id, 1)),
            TransactionInput::BlockRemove(id) => block_signals.push_back((id, -1)),
        }
    }

    // BLOCK_ADD/BLOCK_REMOVE bypass head-match enumeration entirely —
    // run them before the first round of real data (`spec.md` §4.7).
    for (block_id, count) in block_signals {
        let Some(block) = ctx.blocks.get_mut(&block_id) else {
            warn!(?block_id, "program mutation referenced an unknown block");
            continue;
        };
        let _block_guard = trace::block_span(block_id).entered();
        let ctx_view = EvalCtx { index: &ctx.index, functions: &ctx.functions, interner: &ctx.interner, transaction, round };
        let join_result = block.join.apply_block_signal(count, &ctx_view);
        let (outputs, watch_changes) = block.drive(join_result, &ctx_view, transaction)?;
        record_outputs(&mut bind_log, &mut commit_log, &mut queue, outputs, round);
        let collapsed = collapse_watch_changes(&mut ctx.export_log, watch_changes);
        watched.extend(collapsed.into_iter().map(|(b, c)| BlockChange { block: b, change: c }));
    }

    while !queue.is_empty() {
        let _frame_guard = trace::frame_span(frame).entered();
        let _round_guard = trace::round_span(round).entered();
        trace!(round, queued = queue.len(), "processing round");

        let this_round: Vec<Change> = queue.drain(..).collect();
        let mut next_round: VecDeque<Change> = VecDeque::new();

        for change in this_round {
            iteration_count += 1;
            if iteration_count > iteration_limit {
                rollback(&mut ctx.index, &undo_log);
                return Err(EngineError::IterationLimitExceeded { limit: iteration_limit });
            }

            // Written into the index now, immediately before this change is
            // run through the blocks — never as part of an upfront batch —
            // so a round's members only ever see each other in drain order.
            // Logged so a later abort in this same transaction can undo
            // every write made so far, leaving the index untouched.
            ctx.index.insert(change.e, change.a, change.v, change.n, change.transaction, change.round, change.count);
            undo_log.push(change);

            for (block_id, block) in ctx.blocks.iter_mut() {
                let _block_guard = trace::block_span(*block_id).entered();
                let ctx_view = EvalCtx { index: &ctx.index, functions: &ctx.functions, interner: &ctx.interner, transaction, round };
                let join_result = block.join.apply_change(&change, &ctx_view);
                if join_result.is_empty() {
                    continue;
                }
                let (outputs, watch_changes) = match block.drive(join_result, &ctx_view, transaction) {
                    Ok(driven) => driven,
                    Err(err) => {
                        rollback(&mut ctx.index, &undo_log);
                        return Err(err);
                    }
                };
                record_outputs(&mut bind_log, &mut commit_log, &mut next_round, outputs, round + 1);
                let collapsed = collapse_watch_changes(&mut ctx.export_log, watch_changes);
                watched.extend(collapsed.into_iter().map(|(b, c)| BlockChange { block: b, change: c }));
            }
        }

        round += 1;
        queue = next_round;

        // All rounds of this frame are drained. Collapse whatever commits
        // crossed into (or out of) presence this frame and, if any did,
        // open a new frame with them re-entering as saturated round-0
        // inputs (`spec.md` §5).
        if queue.is_empty() && !commit_log.is_empty() {
            let crossings: Vec<Change> = commit_log
                .drain(..)
                .filter_map(|change| {
                    let key = (change.e, change.a, change.v, change.n);
                    let toggle = commit_distinct.apply(key, change.count)?;
                    Some(Change::new(change.e, change.a, change.v, change.n, transaction, 0, toggle * SATURATED_COUNT))
                })
                .collect();

            if !crossings.is_empty() {
                frame += 1;
                if frame > frame_limit {
                    rollback(&mut ctx.index, &undo_log);
                    return Err(EngineError::FrameLimitExceeded { limit: frame_limit });
                }
                round = 0;
                // Not written into the index here — the per-change loop at
                // the top of the next iteration does that uniformly for
                // every queued change, promoted or otherwise.
                for promoted in crossings {
                    queue.push_back(promoted);
                }
            }
        }
    }

    // Commit collapse: retract every Bind-persistence change so it
    // never rolls into the next transaction's base count.
    for bound in bind_log {
        ctx.index.insert(bound.e, bound.a, bound.v, bound.n, transaction, round, -bound.count);
    }

    debug!(rounds = round, frames = frame, watched = watched.len(), "transaction complete");
    Ok(TransactionOutcome { watched, rounds_run: round, frames_run: frame })
}

/// Undoes every write in `undo_log` against `index`, most recent first,
/// so an aborted transaction (iteration/frame limit or a propagated
/// [`EngineError`]) leaves the index exactly as it found it (`spec.md`
/// §7: "invariant violations abort the current transaction while
/// leaving the index untouched by any writes from that transaction").
fn rollback(index: &mut crate::index::TripleIndex, undo_log: &[Change]) {
    for change in undo_log.iter().rev() {
        index.insert(change.e, change.a, change.v, change.n, change.transaction, change.round, -change.count);
    }
}

fn intern_change(ctx: &EvaluationContext, raw: &RawChange, transaction: u64, round: i64) -> Change {
    let mut interner = ctx.interner.borrow_mut();
    let e = interner.intern(raw.e.clone());
    let a = interner.intern(raw.a.clone());
    let v = interner.intern(raw.v.clone());
    let n = interner.intern(raw.n.clone());
    let _ = round;
    Change::new(e, a, v, n, transaction, raw.round, raw.count)
}

fn record_outputs(
    bind_log: &mut Vec<Change>,
    commit_log: &mut Vec<Change>,
    next_round: &mut VecDeque<Change>,
    outputs: Vec<(Change, Persistence)>,
    next_round_number: i64,
) {
    for (mut change, persistence) in outputs {
        if change.round < next_round_number {
            change = Change::new(change.e, change.a, change.v, change.n, change.transaction, next_round_number, change.count);
        }
        match persistence {
            Persistence::Bind => bind_log.push(change.clone()),
            Persistence::Commit => commit_log.push(change.clone()),
        }
        next_round.push_back(change);
    }
}

/// Helper retained for callers that want to build a [`TransactionInput::Data`]
/// without importing [`RawChange`] directly.
pub fn data_input(
    e: crate::raw_value::RawValue,
    a: crate::raw_value::RawValue,
    v: crate::raw_value::RawValue,
    n: crate::raw_value::RawValue,
    round: i64,
    count: i64,
) -> TransactionInput {
    TransactionInput::Data(RawChange { e, a, v, n, transaction: 0, round, count })
}

#[allow(dead_code)]
fn unused_ref_cell_hint(_: &RefCell<()>) {}
