//! The value dictionary.
//!
//! Maps raw values (string | finite number) to dense positive [`Id`]s and
//! back, reference-counted, with deferred batch release through named
//! arenas. See `spec.md` §4.1 and the Open Question in §9 on arena
//! release, resolved in `SPEC_FULL.md` §9: arenas are tracked but release
//! is disabled by default.

use std::collections::HashMap;
use std::sync::Arc;

use crate::id::Id;
use crate::raw_value::RawValue;

/// A deferred-release batch of ids.
///
/// `function_output` is always present; callers may register additional
/// arenas to name other transient scopes.
#[derive(Debug, Default)]
struct Arena {
    members: Vec<Id>,
}

/// The interner: string/number dictionaries plus reverse lookup and
/// refcounts.
///
/// Per `spec.md` §9 ("Open question — arena release"), this is a
/// per-evaluation-context structure, not process-global state; sharing ids
/// across contexts is a caller contract (re-intern before crossing).
#[derive(Debug)]
pub struct Interner {
    strings: HashMap<Arc<str>, Id>,
    numbers: HashMap<u64, Id>,
    reverse: Vec<RawValue>,
    refcounts: Vec<u32>,
    free_list: Vec<u32>,
    arenas: HashMap<String, Arena>,
    /// See `SPEC_FULL.md` §9 — kept false by default.
    enable_arena_release: bool,
}

impl Default for Interner {
    fn default() -> Self {
        Self::new()
    }
}

impl Interner {
    pub fn new() -> Self {
        let mut arenas = HashMap::new();
        arenas.insert("function_output".to_string(), Arena::default());
        Interner {
            strings: HashMap::new(),
            numbers: HashMap::new(),
            reverse: Vec::new(),
            refcounts: Vec::new(),
            free_list: Vec::new(),
            arenas,
            enable_arena_release: false,
        }
    }

    pub fn with_arena_release(mut self, enabled: bool) -> Self {
        self.enable_arena_release = enabled;
        self
    }

    /// Registers a new named arena. Idempotent.
    pub fn register_arena(&mut self, name: impl Into<String>) {
        self.arenas.entry(name.into()).or_default();
    }

    /// Interns `value`, returning its existing id (bumping its refcount) or
    /// allocating a fresh one.
    pub fn intern(&mut self, value: RawValue) -> Id {
        match &value {
            RawValue::String(s) => {
                if let Some(&id) = self.strings.get(s) {
                    self.refcounts[id.index()] += 1;
                    return id;
                }
                let id = self.allocate(RawValue::String(Arc::clone(s)));
                self.strings.insert(Arc::clone(s), id);
                id
            }
            RawValue::Number(n) => {
                let bits = n.to_bits();
                if let Some(&id) = self.numbers.get(&bits) {
                    self.refcounts[id.index()] += 1;
                    return id;
                }
                let id = self.allocate(RawValue::Number(*n));
                self.numbers.insert(bits, id);
                id
            }
        }
    }

    /// Interns `value` into a named arena, tracking it for a later (maybe
    /// no-op) batch release.
    pub fn intern_into_arena(&mut self, arena: &str, value: RawValue) -> Id {
        let id = self.intern(value);
        self.arenas.entry(arena.to_string()).or_default().members.push(id);
        id
    }

    fn allocate(&mut self, value: RawValue) -> Id {
        if let Some(index) = self.free_list.pop() {
            self.reverse[index as usize] = value;
            self.refcounts[index as usize] = 1;
            Id::from_index(index)
        } else {
            let index = self.reverse.len() as u32;
            self.reverse.push(value);
            self.refcounts.push(1);
            Id::from_index(index)
        }
    }

    /// Lookup-only; does not affect the refcount.
    pub fn get(&self, id: Id) -> Option<&RawValue> {
        self.reverse.get(id.index())
    }

    /// Decrements `id`'s refcount; at zero, reclaims the slot and clears the
    /// reverse-lookup entries.
    pub fn release(&mut self, id: Id) {
        let idx = id.index();
        let Some(count) = self.refcounts.get_mut(idx) else {
            return;
        };
        if *count == 0 {
            return;
        }
        *count -= 1;
        if *count == 0 {
            match &self.reverse[idx] {
                RawValue::String(s) => {
                    self.strings.remove(s);
                }
                RawValue::Number(n) => {
                    self.numbers.remove(&n.to_bits());
                }
            }
            self.free_list.push(idx as u32);
        }
    }

    /// Releases every id in `arena` (if `enable_arena_release`) and clears
    /// its membership list regardless. Disabled by default because
    /// intermediate indexes may retain ids that never reach the primary
    /// index; see `SPEC_FULL.md` §9.
    pub fn release_arena(&mut self, arena: &str) {
        let Some(a) = self.arenas.get_mut(arena) else {
            return;
        };
        let members = std::mem::take(&mut a.members);
        if self.enable_arena_release {
            for id in members {
                self.release(id);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.reverse.len() - self.free_list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reverse_intern_is_identity() {
        let mut interner = Interner::new();
        let id = interner.intern(RawValue::string("hello"));
        assert_eq!(interner.get(id).unwrap().as_str(), Some("hello"));
    }

    #[test]
    fn equal_values_share_an_id() {
        let mut interner = Interner::new();
        let a = interner.intern(RawValue::string("x"));
        let b = interner.intern(RawValue::string("x"));
        assert_eq!(a, b);
    }

    #[test]
    fn strings_and_numbers_never_collide() {
        let mut interner = Interner::new();
        let s = interner.intern(RawValue::string("1"));
        let n = interner.intern(RawValue::number(1.0));
        assert_ne!(s, n);
    }

    #[test]
    fn release_at_zero_reclaims_the_slot() {
        let mut interner = Interner::new();
        let id = interner.intern(RawValue::string("transient"));
        interner.release(id);
        assert!(interner.get(id).is_none());
        // slot reused on next allocation
        let reused = interner.intern(RawValue::string("other"));
        assert_eq!(reused.index(), id.index());
    }

    #[test]
    fn arena_release_is_noop_by_default() {
        let mut interner = Interner::new();
        let id = interner.intern_into_arena("function_output", RawValue::number(42.0));
        interner.release_arena("function_output");
        // still resolvable: default config never actually releases.
        assert_eq!(interner.get(id).unwrap().as_number(), Some(42.0));
    }

    #[test]
    fn arena_release_can_be_enabled() {
        let mut interner = Interner::new().with_arena_release(true);
        let id = interner.intern_into_arena("function_output", RawValue::number(7.0));
        interner.release_arena("function_output");
        assert!(interner.get(id).is_none());
    }
}
