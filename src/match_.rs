//! Match / PartialMatch surface: the user-visible view onto captured
//! groups, current marker, and result, tying a fully materialized input
//! sequence to a `ThreadState` snapshot.
//!
//! Named `match_` (not `match`) because the latter is a keyword.

use std::hash::Hash;
use std::rc::Rc;

use crate::state::{Marker, ThreadState};

/// A completed, successful match: a read-only view over the winning
/// thread's final state.
pub struct Match<'a, V, K> {
    pub(crate) input: &'a [V],
    pub(crate) state: Rc<ThreadState<K>>,
}

impl<'a, V, K: Clone + Eq + Hash> Match<'a, V, K> {
    pub(crate) fn new(input: &'a [V], state: Rc<ThreadState<K>>) -> Self {
        Match { input, state }
    }

    /// The subsequence `input[starts[key]..ends[key]]`, or `None` if the
    /// capture's `Save` instructions never both fired on the winning
    /// thread.
    pub fn group(&self, key: &Option<K>) -> Option<&'a [V]> {
        let (start, end) = self.state.span(key)?;
        Some(&self.input[start..end])
    }

    /// The whole-match span: equivalent to `group(&None)` in the common
    /// case where the top-level pattern was wrapped in a null-keyed
    /// `Captured`.
    pub fn whole(&self) -> Option<&'a [V]> {
        self.group(&None)
    }

    /// The thread's result payload, downcast to `T`. `None` if no
    /// `Call` callback ever set a result, or if one set a different
    /// type.
    pub fn result<T: 'static>(&self) -> Option<&T> {
        self.state.result.as_deref()?.downcast_ref::<T>()
    }
}

/// A read-write view over a live thread's state, passed to `Call`
/// callbacks during execution. Must not be retained past the callback
/// invocation: the underlying state may be cloned (COW) or dropped
/// immediately afterward.
pub struct PartialMatch<'s, 'i, V, K> {
    input: &'i [V],
    state: &'s mut ThreadState<K>,
}

impl<'s, 'i, V, K: Clone + Eq + Hash> PartialMatch<'s, 'i, V, K> {
    pub(crate) fn new(input: &'i [V], state: &'s mut ThreadState<K>) -> Self {
        PartialMatch { input, state }
    }

    /// The subsequence captured so far under `key`, as recorded on this
    /// still-running thread. `None` if the capture's START/END `Save`
    /// instructions haven't both fired yet.
    pub fn group(&self, key: &Option<K>) -> Option<&'i [V]> {
        let (start, end) = self.state.span(key)?;
        Some(&self.input[start..end])
    }

    /// The marker on top of this thread's marker stack, or `None` if no
    /// `Marked` region currently encloses the call site.
    pub fn current_marker(&self) -> Option<Marker> {
        self.state.current_marker()
    }

    /// Sets the thread's result payload, overwriting any previous value.
    pub fn set_result<T: 'static>(&mut self, value: T) {
        self.state.result = Some(Rc::new(value));
    }

    /// The result payload as it currently stands, downcast to `T`.
    pub fn result<T: 'static>(&self) -> Option<&T> {
        self.state.result.as_deref()?.downcast_ref::<T>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_and_group_slice_the_input() {
        let values = [10, 20, 30, 40];
        let mut state: ThreadState<&str> = ThreadState::new();
        state.save_start(None, 0);
        state.save_end(None, 4);
        state.save_start(Some("mid"), 1);
        state.save_end(Some("mid"), 3);
        let m = Match::new(&values, Rc::new(state));
        assert_eq!(m.whole(), Some(&values[..]));
        assert_eq!(m.group(&Some("mid")), Some(&values[1..3]));
        assert_eq!(m.group(&Some("missing")), None);
    }

    #[test]
    fn partial_match_exposes_current_marker_and_result() {
        let values = [1, 2, 3];
        let mut state: ThreadState<&str> = ThreadState::new();
        let marker = Marker::new(7);
        state.push_marker(marker);
        let mut partial = PartialMatch::new(&values, &mut state);
        assert_eq!(partial.current_marker(), Some(marker));
        assert_eq!(partial.result::<u32>(), None);
        partial.set_result(42u32);
        assert_eq!(partial.result::<u32>(), Some(&42));
    }
}
