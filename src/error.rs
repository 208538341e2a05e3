//! Runtime-invariant violations and the export error boundary
//! (`spec.md` §7).
//!
//! Mismatched register bindings during `applyInput` are deliberately NOT
//! part of this taxonomy: they are a local `fail` that prunes one
//! candidate combination and never escapes a join (`spec.md` §7,
//! "Recoverable").

use thiserror::Error;

/// Fatal to the current transaction, never to the process.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("output change has an undefined {slot} slot")]
    UndefinedSlot { slot: &'static str },

    #[error("aggregate saw a negative total projection count for its group")]
    NegativeAggregateTotal,

    #[error("no function registered under the name '{0}'")]
    UnknownFunction(String),

    #[error("fixpoint exceeded the iteration limit of {limit} derivation steps")]
    IterationLimitExceeded { limit: u64 },

    #[error("fixpoint exceeded the frame limit of {limit} commit frames")]
    FrameLimitExceeded { limit: u32 },

    #[error("export handler failed: {0}")]
    Export(String),
}

/// A local register-binding conflict during `Constraint::apply_input` or
/// `Prefix::bind`. Pruned silently by the caller; never surfaced as an
/// [`EngineError`] (`spec.md` §7).
#[derive(Debug, Clone, Copy)]
pub struct BindFailure;

pub type EngineResult<T> = Result<T, EngineError>;
