//! ThreadState and Marker.
//!
//! A `ThreadState` is always held behind an `Rc`, and its copy-on-write
//! discipline is realized here with `Rc::make_mut`: cloning an `Rc` *is*
//! incrementing a refcount, dropping one *is* decrementing it, and
//! `Rc::make_mut` clones-on-write exactly when the count is greater
//! than one. Hand-rolling a parallel refcount field alongside `Rc`'s own
//! would just be two counters tracking the same thing — see DESIGN.md's
//! note on this under "Open Questions".

use std::any::Any;
use std::hash::Hash;

use fnv::FnvHashMap;
use tinyvec::TinyVec;

/// An opaque identity token pushed by a `Mark(START)` instruction.
///
/// Two markers compare equal only if they are the same token. Generated
/// from a counter scoped to one [`crate::vm`] run, a convenient stand-in
/// for heap identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Marker(u64);

impl Marker {
    pub(crate) fn new(id: u64) -> Self {
        Marker(id)
    }
}

/// Per-thread capture map, marker stack, and result slot.
///
/// Shared across logical threads via `Rc` until one of them writes, at
/// which point `Rc::make_mut` clones it for the writer. See module docs.
#[derive(Clone)]
pub struct ThreadState<K> {
    pub(crate) starts: FnvHashMap<Option<K>, usize>,
    pub(crate) ends: FnvHashMap<Option<K>, usize>,
    pub(crate) markers: TinyVec<[Marker; 4]>,
    pub(crate) result: Option<std::rc::Rc<dyn Any>>,
}

impl<K: Clone + Eq + Hash> ThreadState<K> {
    pub fn new() -> Self {
        ThreadState {
            starts: FnvHashMap::default(),
            ends: FnvHashMap::default(),
            markers: TinyVec::new(),
            result: None,
        }
    }

    pub(crate) fn save_start(&mut self, key: Option<K>, index: usize) {
        self.starts.insert(key, index);
    }

    pub(crate) fn save_end(&mut self, key: Option<K>, index: usize) {
        self.ends.insert(key, index);
    }

    pub(crate) fn push_marker(&mut self, marker: Marker) {
        self.markers.push(marker);
    }

    pub(crate) fn pop_marker(&mut self) {
        self.markers.pop();
    }

    pub(crate) fn current_marker(&self) -> Option<Marker> {
        self.markers.last().copied()
    }

    pub(crate) fn span(&self, key: &Option<K>) -> Option<(usize, usize)> {
        let start = *self.starts.get(key)?;
        let end = *self.ends.get(key)?;
        Some((start, end))
    }
}

impl<K: Clone + Eq + Hash> Default for ThreadState<K> {
    fn default() -> Self {
        Self::new()
    }
}
