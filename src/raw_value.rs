//! Raw (un-interned) values.
//!
//! The engine's closed value universe: strings and finite-precision numbers.
//! Arbitrary user-defined value types are an explicit non-goal — everything
//! that reaches the [`crate::interner::Interner`] is one of these two shapes.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// An un-interned value, as it arrives at the boundary of the engine.
///
/// `String` and `Number` are physically disjoint: a string and a number
/// never compare equal, never hash equal, and are interned into separate
/// dictionaries (see [`crate::interner::Interner`]).
#[derive(Debug, Clone)]
pub enum RawValue {
    String(Arc<str>),
    Number(f64),
}

impl RawValue {
    pub fn string(s: impl Into<Arc<str>>) -> Self {
        RawValue::String(s.into())
    }

    pub fn number(n: f64) -> Self {
        RawValue::Number(n)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            RawValue::String(s) => Some(s),
            RawValue::Number(_) => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            RawValue::Number(n) => Some(*n),
            RawValue::String(_) => None,
        }
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::String(s) => write!(f, "{s}"),
            RawValue::Number(n) => write!(f, "{n}"),
        }
    }
}

impl PartialEq for RawValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (RawValue::String(a), RawValue::String(b)) => a == b,
            (RawValue::Number(a), RawValue::Number(b)) => a.to_bits() == b.to_bits(),
            _ => false,
        }
    }
}

impl Eq for RawValue {}

impl Hash for RawValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            RawValue::String(s) => {
                0u8.hash(state);
                s.hash(state);
            }
            RawValue::Number(n) => {
                1u8.hash(state);
                n.to_bits().hash(state);
            }
        }
    }
}

impl PartialOrd for RawValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RawValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (RawValue::String(a), RawValue::String(b)) => a.cmp(b),
            (RawValue::Number(a), RawValue::Number(b)) => {
                a.partial_cmp(b).unwrap_or(Ordering::Equal)
            }
            // Numbers sort before strings; the only requirement is a total
            // order stable enough for BTree indexing, not a meaningful one.
            (RawValue::Number(_), RawValue::String(_)) => Ordering::Less,
            (RawValue::String(_), RawValue::Number(_)) => Ordering::Greater,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_and_number_never_collide() {
        let s = RawValue::string("1");
        let n = RawValue::number(1.0);
        assert_ne!(s, n);
    }

    #[test]
    fn nan_is_equal_to_itself_by_bit_pattern() {
        let a = RawValue::number(f64::NAN);
        let b = RawValue::number(f64::NAN);
        assert_eq!(a, b);
    }
}
