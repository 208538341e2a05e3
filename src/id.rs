//! Dense integer handles used throughout the engine.
//!
//! [`Id`] is an interned value handle (see [`crate::interner`]). [`Register`]
//! is a block-local prefix slot offset. [`Field`] is the tri-state every
//! scan/move constraint field is expressed in: a static id, a register to
//! read/write, or the `IGNORE` sentinel meaning "do not constrain this
//! field".

use std::num::NonZeroU32;

/// A dense, positive, interned value handle.
///
/// IDs are 1-based (`NonZeroU32`) so that `Option<Id>` is free and so that
/// `0` is always available as a non-id sentinel in raw wire tuples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Id(NonZeroU32);

impl Id {
    pub(crate) fn from_index(index: u32) -> Self {
        Id(NonZeroU32::new(index + 1).expect("index + 1 is never zero"))
    }

    pub(crate) fn index(self) -> usize {
        (self.0.get() - 1) as usize
    }

    pub fn raw(self) -> u32 {
        self.0.get()
    }

    /// The smallest representable id, used as a range-query bound.
    pub const MIN: Id = Id(match NonZeroU32::new(1) {
        Some(v) => v,
        None => panic!("1 is never zero"),
    });

    /// The largest representable id, used as a range-query bound.
    pub const MAX: Id = Id(match NonZeroU32::new(u32::MAX) {
        Some(v) => v,
        None => panic!("u32::MAX is never zero"),
    });
}

/// A block-local offset into a [`crate::prefix::Prefix`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Register(pub u32);

impl Register {
    pub fn offset(self) -> usize {
        self.0 as usize
    }
}

/// One field of a scan, function argument, or move source/destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Static(Id),
    Register(Register),
    Ignore,
}

impl Field {
    pub fn is_ignore(self) -> bool {
        matches!(self, Field::Ignore)
    }

    pub fn as_register(self) -> Option<Register> {
        match self {
            Field::Register(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_static(self) -> Option<Id> {
        match self {
            Field::Static(id) => Some(id),
            _ => None,
        }
    }
}

/// Identifies a block within a compiled program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockId(pub u32);

/// Identifies the rule-node ("provenance") that produced a fact.
pub type ProvenanceId = Id;
