//! Instruction graph: a value-typed, tagged node with a mutable `next`
//! successor link (plus `alt` for `Split`).
//!
//! Nodes are allocated out of a [`typed_arena::Arena`], which owns
//! long-lived, cross-referenced data that outlives any one pass: every
//! node compiled for a pattern shares the arena's lifetime, so a `Split`
//! compiled early can be back-patched once its body is compiled later,
//! producing the cycles repetition requires.
//!
//! Identity, not structure, is what the executor cares about here: two
//! `Instruction`s are "the same" to `add_thread`'s duplicate suppression
//! iff they are the same arena slot. We expose that identity as a small
//! `u32` id assigned at allocation time rather than comparing raw
//! pointers, so the `seen` set in `vm.rs` can be a plain `FnvHashSet<u32>`.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use typed_arena::Arena;

/// One input-value predicate, opaque to the engine.
///
/// Cloning a `Predicate` is cheap (an `Rc` bump); two predicates are
/// structurally equal only if they are the same underlying closure
/// (`Rc::ptr_eq`), since function values have no other sensible notion
/// of equality.
#[derive(Clone)]
pub struct Predicate<V>(Rc<dyn Fn(&V) -> bool>);

impl<V> Predicate<V> {
    pub fn new(f: impl Fn(&V) -> bool + 'static) -> Self {
        Predicate(Rc::new(f))
    }

    #[inline]
    pub fn test(&self, value: &V) -> bool {
        (self.0)(value)
    }
}

impl<V> PartialEq for Predicate<V> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}
impl<V> Eq for Predicate<V> {}

impl<V> std::hash::Hash for Predicate<V> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        (Rc::as_ptr(&self.0) as *const () as usize).hash(state)
    }
}

impl<V> fmt::Debug for Predicate<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<predicate@{:p}>", Rc::as_ptr(&self.0))
    }
}

/// Which end of a capture a `Save` instruction records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SavePosition {
    Start,
    End,
}

/// Which end of a marker region a `Mark` instruction manipulates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkPosition {
    Start,
    End,
}

/// A user callback invoked at a `Call` site.
///
/// Must not retain the `PartialMatch` reference beyond the call: the
/// state it views may be cloned (COW) or dropped immediately after.
pub type Callback<'a, V, K> = Rc<
    dyn Fn(&mut crate::vm::ExecHandle<'a, V>, &mut crate::match_::PartialMatch<'_, 'a, V, K>) + 'a,
>;

/// A back-link to a successor instruction. Starts unset (`None`) so a
/// `Split` can be allocated before its children are compiled, then
/// patched in place once the cycle its repetition produces is known.
pub struct Link<'a, V, K>(Cell<Option<&'a Instruction<'a, V, K>>>);

impl<'a, V, K> Link<'a, V, K> {
    fn unset() -> Self {
        Link(Cell::new(None))
    }

    fn of(target: &'a Instruction<'a, V, K>) -> Self {
        Link(Cell::new(Some(target)))
    }

    #[inline]
    pub fn get(&self) -> &'a Instruction<'a, V, K> {
        self.0
            .get()
            .expect("Link read before back-patching: compiler bug")
    }

    pub fn set(&self, target: &'a Instruction<'a, V, K>) {
        self.0.set(Some(target));
    }
}

/// Tagged payload of an [`Instruction`]; see each variant's doc comment
/// for the semantics of that kind.
pub enum Kind<'a, V, K> {
    /// Consumes one value iff `pred` holds, then continues via `next`.
    Atom {
        pred: Predicate<V>,
        next: Link<'a, V, K>,
    },
    /// Epsilon-forks, preferring `next` over `alt`.
    Split {
        next: Link<'a, V, K>,
        alt: Link<'a, V, K>,
    },
    /// Records the current index into the thread's capture map at `key`.
    Save {
        key: Option<K>,
        position: SavePosition,
        next: Link<'a, V, K>,
    },
    /// Pushes/pops a unique marker on the thread's marker stack.
    Mark {
        position: MarkPosition,
        next: Link<'a, V, K>,
    },
    /// Invokes a user callback, then continues via `next`.
    Call {
        callback: Callback<'a, V, K>,
        next: Link<'a, V, K>,
    },
    /// Terminal: the thread has matched the whole input consumed so far.
    Accept,
}

/// A node of the compiled VM program. See module docs for identity and
/// allocation semantics.
pub struct Instruction<'a, V, K> {
    pub id: u32,
    pub kind: Kind<'a, V, K>,
}

impl<'a, V, K> fmt::Debug for Instruction<'a, V, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match &self.kind {
            Kind::Atom { .. } => "Atom",
            Kind::Split { .. } => "Split",
            Kind::Save { position, .. } => match position {
                SavePosition::Start => "Save(START)",
                SavePosition::End => "Save(END)",
            },
            Kind::Mark { position, .. } => match position {
                MarkPosition::Start => "Mark(START)",
                MarkPosition::End => "Mark(END)",
            },
            Kind::Call { .. } => "Call",
            Kind::Accept => "Accept",
        };
        write!(f, "Instruction#{}[{}]", self.id, tag)
    }
}

/// Owns every [`Instruction`] compiled for one program. Kept alive for
/// as long as the compiled pattern is in use; reusable across many
/// [`crate::vm::run`] calls.
pub struct InstrArena<'a, V, K> {
    arena: Arena<Instruction<'a, V, K>>,
    next_id: Cell<u32>,
}

impl<'a, V, K> InstrArena<'a, V, K> {
    pub fn new() -> Self {
        InstrArena {
            arena: Arena::new(),
            next_id: Cell::new(0),
        }
    }

    fn fresh_id(&self) -> u32 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }

    /// Allocates the single canonical `Accept` node.
    pub fn accept(&'a self) -> &'a Instruction<'a, V, K> {
        self.arena.alloc(Instruction {
            id: self.fresh_id(),
            kind: Kind::Accept,
        })
    }

    pub fn atom(
        &'a self,
        pred: Predicate<V>,
        next: &'a Instruction<'a, V, K>,
    ) -> &'a Instruction<'a, V, K> {
        self.arena.alloc(Instruction {
            id: self.fresh_id(),
            kind: Kind::Atom {
                pred,
                next: Link::of(next),
            },
        })
    }

    /// Allocates a `Split` with both links already known.
    pub fn split(
        &'a self,
        next: &'a Instruction<'a, V, K>,
        alt: &'a Instruction<'a, V, K>,
    ) -> &'a Instruction<'a, V, K> {
        self.arena.alloc(Instruction {
            id: self.fresh_id(),
            kind: Kind::Split {
                next: Link::of(next),
                alt: Link::of(alt),
            },
        })
    }

    /// Allocates a `Split` with both links unset, for back-patching
    /// after the body subgraph is compiled (the `*`/`+` cycle case).
    pub fn split_unpatched(&'a self) -> &'a Instruction<'a, V, K> {
        self.arena.alloc(Instruction {
            id: self.fresh_id(),
            kind: Kind::Split {
                next: Link::unset(),
                alt: Link::unset(),
            },
        })
    }

    /// Back-patches both links of a previously allocated `Split`.
    pub fn patch_split(
        instr: &'a Instruction<'a, V, K>,
        next: &'a Instruction<'a, V, K>,
        alt: &'a Instruction<'a, V, K>,
    ) {
        match &instr.kind {
            Kind::Split { next: n, alt: a } => {
                n.set(next);
                a.set(alt);
            }
            _ => unreachable!("patch_split called on a non-Split instruction"),
        }
    }

    pub fn save(
        &'a self,
        key: Option<K>,
        position: SavePosition,
        next: &'a Instruction<'a, V, K>,
    ) -> &'a Instruction<'a, V, K> {
        self.arena.alloc(Instruction {
            id: self.fresh_id(),
            kind: Kind::Save {
                key,
                position,
                next: Link::of(next),
            },
        })
    }

    pub fn mark(
        &'a self,
        position: MarkPosition,
        next: &'a Instruction<'a, V, K>,
    ) -> &'a Instruction<'a, V, K> {
        self.arena.alloc(Instruction {
            id: self.fresh_id(),
            kind: Kind::Mark {
                position,
                next: Link::of(next),
            },
        })
    }

    pub fn call(
        &'a self,
        callback: Callback<'a, V, K>,
        next: &'a Instruction<'a, V, K>,
    ) -> &'a Instruction<'a, V, K> {
        self.arena.alloc(Instruction {
            id: self.fresh_id(),
            kind: Kind::Call {
                callback,
                next: Link::of(next),
            },
        })
    }
}

impl<'a, V, K> Default for InstrArena<'a, V, K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_assigned_in_allocation_order() {
        let arena: InstrArena<i32, ()> = InstrArena::new();
        let a = arena.accept();
        let b = arena.atom(Predicate::new(|_| true), a);
        assert_eq!(a.id, 0);
        assert_eq!(b.id, 1);
    }

    #[test]
    fn split_back_patching_produces_a_cycle() {
        let arena: InstrArena<i32, ()> = InstrArena::new();
        let accept = arena.accept();
        let split = arena.split_unpatched();
        let body = arena.atom(Predicate::new(|_| true), split);
        InstrArena::patch_split(split, body, accept);
        match &split.kind {
            Kind::Split { next, alt } => {
                assert_eq!(next.get().id, body.id);
                assert_eq!(alt.get().id, accept.id);
            }
            _ => panic!("expected Split"),
        }
    }

    #[test]
    fn predicate_equality_is_by_identity() {
        let p1 = Predicate::new(|x: &i32| *x > 0);
        let p2 = p1.clone();
        let p3 = Predicate::new(|x: &i32| *x > 0);
        assert_eq!(p1, p2);
        assert_ne!(p1, p3);
    }
}
