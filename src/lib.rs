//! # flowlog-core
//!
//! An incremental dataflow evaluation core for a relational rule language:
//! value interning, a multi-indexed triple store, a worst-case-optimal
//! Generic Join engine, a small set of downstream dataflow operators
//! (binary join, antijoin, union, choose, aggregate, sort), and the
//! transaction fixpoint loop that drives a compiled program to a fixpoint
//! on every batch of input changes.
//!
//! ## Scope
//!
//! This crate is the evaluation core only. A surface parser/compiler that
//! turns rule text into [`block::Block`]s, a persistence layer, and a
//! network-facing server are all external collaborators — this crate
//! receives already-compiled block programs and already-decoded input
//! changes.
//!
//! ## Pipeline
//!
//! ```text
//! TransactionInput (data change | BLOCK_ADD | BLOCK_REMOVE)
//!     ↓
//! [EvaluationContext::blocks: Block] — one JoinNode + an operator pipeline each
//!     ↓
//! [transaction::run_transaction] — round-by-round fixpoint, frame/iteration limits
//!     ↓
//! TransactionOutcome — watch-node exports, grouped per source block
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use flowlog_core::{EvaluationContext, Config};
//! use flowlog_core::transaction::{run_transaction, data_input};
//!
//! let mut ctx = EvaluationContext::new(Config::default());
//! // ... compile and ctx.add_block(id, block) ...
//! let outcome = run_transaction(&mut ctx, 0, vec![/* TransactionInput::Data(..) */])?;
//! for exported in outcome.watched {
//!     // hand off to an external subscriber
//! }
//! # Ok::<(), flowlog_core::error::EngineError>(())
//! ```

pub mod block;
pub mod change;
pub mod config;
pub mod constraint;
pub mod context;
pub mod distinct;
pub mod error;
pub mod functions;
pub mod id;
pub mod index;
pub mod interner;
pub mod join;
pub mod node;
pub mod ops;
pub mod output;
pub mod prefix;
pub mod raw_value;
pub mod trace;
pub mod transaction;

pub use block::{AggregateStage, Block, Delta, Stage, StageInput};
pub use change::{BlockChange, Change, RawChange};
pub use config::{Config, EngineConfig, InternerConfig, LoggingConfig};
pub use constraint::{Constraint, EvalCtx, FunctionConstraint, MoveConstraint, ScanConstraint};
pub use context::EvaluationContext;
pub use distinct::{DistinctIndex, ExportCollapse};
pub use error::{BindFailure, EngineError, EngineResult};
pub use functions::{FunctionEval, FunctionRegistry, FunctionSpec};
pub use id::{BlockId, Field, Id, ProvenanceId, Register};
pub use index::{Proposal, ProposeField, ProposeInput, Slot, TripleIndex};
pub use interner::Interner;
pub use join::JoinNode;
pub use node::ResultIterator;
pub use output::{OutputNode, PendingOutput, Persistence, WatchNode};
pub use prefix::Prefix;
pub use raw_value::RawValue;
pub use transaction::{data_input, run_transaction, TransactionInput, TransactionOutcome};
