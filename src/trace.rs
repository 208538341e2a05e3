//! Structured instrumentation for a running transaction.
//!
//! Plain `tracing` spans/events at transaction, frame, round, and
//! block-execution granularity — no UI is built here, callers attach
//! whatever subscriber they want (`SPEC_FULL.md` §2). Kept as a thin
//! set of helpers rather than a custom trace buffer, unlike the
//! teacher's `pipeline_trace` module, since this engine has no
//! multi-stage optimizer pipeline to record snapshots of — a transaction
//! is one flat fixpoint loop, and `tracing`'s own span tree already
//! captures its nesting.

use tracing::{span, Level, Span};

use crate::id::BlockId;

/// Opens the top-level span for one transaction.
pub fn transaction_span(transaction: u64) -> Span {
    span!(Level::INFO, "transaction", transaction)
}

/// Opens a span for one round (one BFS level of fixpoint recursion)
/// within the enclosing transaction span.
pub fn round_span(round: i64) -> Span {
    span!(Level::DEBUG, "round", round)
}

/// Opens a span for one frame (the `frame_limit`-bounded coarser unit
/// a recursive rule's commit collapses are measured against).
pub fn frame_span(frame: u32) -> Span {
    span!(Level::DEBUG, "frame", frame)
}

/// Opens a span for driving a single block against one input change.
pub fn block_span(block: BlockId) -> Span {
    span!(Level::TRACE, "block", block = block.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spans_can_be_entered_without_a_subscriber_installed() {
        let _guard = transaction_span(0).entered();
        let _guard = round_span(0).entered();
        let _guard = frame_span(0).entered();
        let _guard = block_span(BlockId(0)).entered();
    }
}
