//! Virtual-machine executor: the lock-step scheduler over the input,
//! epsilon-closure expansion (`add_thread`), duplicate suppression, and
//! match selection.
//!
//! One [`Vm`] per call to [`run`]; it owns nothing the compiled program
//! doesn't already own, and is not meant to be reused across calls —
//! build a fresh one (implicitly, via `run`) for every match.

use std::hash::Hash;
use std::rc::Rc;

use fnv::FnvHashSet;

use crate::instr::{Instruction, Kind};
use crate::log_ext::{trace_instruction, trace_outcome, trace_step, trace_thread};
use crate::match_::{Match, PartialMatch};
use crate::state::{Marker, ThreadState};

/// Passed to `Call` callbacks alongside a [`PartialMatch`]. Exposes just
/// enough of the executor's position in the input for a callback to
/// make sense of where it's being invoked; it carries no mutable access
/// to VM internals.
pub struct ExecHandle<'a, V> {
    input: &'a [V],
    position: usize,
}

impl<'a, V> ExecHandle<'a, V> {
    /// The input index the VM is currently stepping at (0-based; may
    /// equal `input().len()` at the end-of-input step).
    pub fn position(&self) -> usize {
        self.position
    }

    /// The full input sequence being matched.
    pub fn input(&self) -> &'a [V] {
        self.input
    }
}

/// A logical thread: an instruction pointer paired with a (possibly
/// shared) `ThreadState`.
struct Thread<'a, V, K> {
    instr: &'a Instruction<'a, V, K>,
    state: Rc<ThreadState<K>>,
}

impl<'a, V, K> Clone for Thread<'a, V, K> {
    fn clone(&self) -> Self {
        Thread {
            instr: self.instr,
            state: Rc::clone(&self.state),
        }
    }
}

/// Runs the compiled program `code` against `values`, returning the
/// highest-priority [`Match`] if any thread reached `Accept`, or `None`
/// if the executor ran to completion with no match (absence, not an
/// error).
pub fn run<'a, V, K>(code: &'a Instruction<'a, V, K>, values: &'a [V]) -> Option<Match<'a, V, K>>
where
    K: Clone + Eq + Hash,
{
    let mut vm = Vm {
        values,
        seen: FnvHashSet::default(),
        next_marker: 0,
    };

    let mut current = Vec::new();
    vm.add_thread(code, Rc::new(ThreadState::new()), 0, &mut current);

    let n = values.len();
    let mut matched: Option<Rc<ThreadState<K>>> = None;
    let mut i = 0usize;

    loop {
        if current.is_empty() {
            break;
        }
        vm.seen.clear();
        trace_step(i, current.len());
        let v = values.get(i);

        let mut pending = Vec::new();
        for j in 0..current.len() {
            match &current[j].instr.kind {
                Kind::Atom { pred, next } => {
                    if let Some(value) = v {
                        if pred.test(value) {
                            // The closure past this point belongs to step
                            // i + 1: any Save it runs must stamp i + 1, not
                            // the index just consumed.
                            vm.add_thread(
                                next.get(),
                                Rc::clone(&current[j].state),
                                i + 1,
                                &mut pending,
                            );
                        }
                    }
                }
                Kind::Accept => {
                    trace_thread(i, "accept, discarding lower-priority threads");
                    matched = Some(Rc::clone(&current[j].state));
                    break;
                }
                _ => unreachable!(
                    "closure invariant: only Atom/Accept reach the consumer list"
                ),
            }
        }

        current = pending;
        if i >= n {
            break;
        }
        i += 1;
    }

    trace_outcome(matched.is_some());
    matched.map(|state| Match::new(values, state))
}

struct Vm<'a, V, K> {
    values: &'a [V],
    seen: FnvHashSet<u32>,
    next_marker: u64,
}

impl<'a, V, K> Vm<'a, V, K>
where
    K: Clone + Eq + Hash,
{
    fn fresh_marker(&mut self) -> Marker {
        let id = self.next_marker;
        self.next_marker += 1;
        Marker::new(id)
    }

    /// Epsilon-closure: expands `instr` (and whatever it chains to
    /// without consuming input) into `dst`, which only ever accumulates
    /// `Atom`/`Accept` consumers (the stepping invariant). `index` is the
    /// input position any `Save`/`Call` reached during this expansion
    /// should observe — the position the *resulting* consumers will wait
    /// on, not necessarily the position the caller is currently stepping
    /// at (it's one ahead, right after an `Atom` consumes a value).
    ///
    /// Priority duplicate suppression: the first instruction identity to
    /// reach `add_thread` in a given step wins; later arrivals at the same
    /// node are dropped, along with the `Rc` they were holding (which is
    /// exactly "decrement its refcount and return").
    fn add_thread(
        &mut self,
        instr: &'a Instruction<'a, V, K>,
        state: Rc<ThreadState<K>>,
        index: usize,
        dst: &mut Vec<Thread<'a, V, K>>,
    ) {
        if !self.seen.insert(instr.id) {
            return;
        }

        match &instr.kind {
            Kind::Split { next, alt } => {
                trace_instruction(instr.id, "Split");
                // Higher-priority branch first: if both reach the same
                // downstream node, the `seen` insert above makes this one
                // the surviving copy.
                self.add_thread(next.get(), Rc::clone(&state), index, dst);
                self.add_thread(alt.get(), state, index, dst);
            }
            Kind::Save {
                key,
                position,
                next,
            } => {
                trace_instruction(instr.id, "Save");
                let mut state = state;
                let writable = Rc::make_mut(&mut state);
                match position {
                    crate::instr::SavePosition::Start => {
                        writable.save_start(key.clone(), index)
                    }
                    crate::instr::SavePosition::End => writable.save_end(key.clone(), index),
                }
                self.add_thread(next.get(), state, index, dst);
            }
            Kind::Mark { position, next } => {
                trace_instruction(instr.id, "Mark");
                let mut state = state;
                match position {
                    crate::instr::MarkPosition::Start => {
                        let marker = self.fresh_marker();
                        Rc::make_mut(&mut state).push_marker(marker);
                    }
                    crate::instr::MarkPosition::End => {
                        Rc::make_mut(&mut state).pop_marker();
                    }
                }
                self.add_thread(next.get(), state, index, dst);
            }
            Kind::Call { callback, next } => {
                trace_instruction(instr.id, "Call");
                let mut state = state;
                {
                    let writable = Rc::make_mut(&mut state);
                    let mut handle = ExecHandle {
                        input: self.values,
                        position: index,
                    };
                    let mut partial = PartialMatch::new(self.values, writable);
                    (callback)(&mut handle, &mut partial);
                }
                self.add_thread(next.get(), state, index, dst);
            }
            Kind::Atom { .. } => {
                trace_instruction(instr.id, "Atom");
                dst.push(Thread { instr, state });
            }
            Kind::Accept => {
                trace_instruction(instr.id, "Accept");
                dst.push(Thread { instr, state });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instr::{InstrArena, Predicate, SavePosition};

    #[test]
    fn literal_concatenation_matches_exact_sequence() {
        let arena: InstrArena<i32, ()> = InstrArena::new();
        let accept = arena.accept();
        let c = arena.atom(Predicate::new(|x: &i32| *x == 3), accept);
        let b = arena.atom(Predicate::new(|x: &i32| *x == 2), c);
        let a = arena.atom(Predicate::new(|x: &i32| *x == 1), b);

        assert!(run::<i32, ()>(a, &[1, 2, 3]).is_some());
        assert!(run::<i32, ()>(a, &[1, 2, 4]).is_none());
        assert!(run::<i32, ()>(a, &[1, 2]).is_none());
    }

    #[test]
    fn split_prefers_first_priority_branch() {
        // Both arms can match "a"; only the higher-priority ("next")
        // branch's capture should end up set on the winning thread.
        let arena: InstrArena<char, &str> = InstrArena::new();
        let accept = arena.accept();

        let next_end = arena.save(Some("via_next"), SavePosition::End, accept);
        let next_body = arena.atom(Predicate::new(|c: &char| *c == 'a'), next_end);
        let via_next = arena.save(Some("via_next"), SavePosition::Start, next_body);

        let alt_end = arena.save(Some("via_alt"), SavePosition::End, accept);
        let alt_body = arena.atom(Predicate::new(|_: &char| true), alt_end);
        let via_alt = arena.save(Some("via_alt"), SavePosition::Start, alt_body);

        let entry = arena.split(via_next, via_alt);

        let m = run::<char, &str>(entry, &['a']).expect("both arms match 'a'");
        assert!(m.group(&Some("via_next")).is_some());
        assert!(m.group(&Some("via_alt")).is_none());

        let m = run::<char, &str>(entry, &['b']).expect("only the alt arm matches 'b'");
        assert!(m.group(&Some("via_next")).is_none());
        assert!(m.group(&Some("via_alt")).is_some());
    }

    #[test]
    fn captured_group_records_span() {
        let arena: InstrArena<i32, &str> = InstrArena::new();
        let accept = arena.accept();
        let save_end = arena.save(Some("g"), SavePosition::End, accept);
        let body = arena.atom(Predicate::new(|x: &i32| *x == 9), save_end);
        let entry = arena.save(Some("g"), SavePosition::Start, body);

        let values = [9];
        let m = run::<i32, &str>(entry, &values).expect("matches");
        assert_eq!(m.group(&Some("g")), Some(&values[..]));
    }

    #[test]
    fn capture_end_position_is_one_past_the_last_consumed_value() {
        // Regression test: the END save that immediately follows a
        // matched Atom must see the index *after* that value, not the
        // index the Atom itself consumed.
        let arena: InstrArena<i32, &str> = InstrArena::new();
        let accept = arena.accept();
        let save_end = arena.save(Some("g"), SavePosition::End, accept);
        let body = arena.atom(Predicate::new(|x: &i32| *x == 1), save_end);
        let entry = arena.save(Some("g"), SavePosition::Start, body);

        let values = [1, 2, 3];
        let m = run::<i32, &str>(entry, &values).expect("matches a prefix");
        assert_eq!(m.group(&Some("g")), Some(&values[..1]));
    }

    #[test]
    fn multi_element_capture_spans_the_whole_consumed_run() {
        let arena: InstrArena<i32, &str> = InstrArena::new();
        let accept = arena.accept();
        let save_end = arena.save(Some("g"), SavePosition::End, accept);
        let c = arena.atom(Predicate::new(|x: &i32| *x == 3), save_end);
        let b = arena.atom(Predicate::new(|x: &i32| *x == 2), c);
        let body = arena.atom(Predicate::new(|x: &i32| *x == 1), b);
        let entry = arena.save(Some("g"), SavePosition::Start, body);

        let values = [1, 2, 3];
        let m = run::<i32, &str>(entry, &values).expect("matches");
        assert_eq!(m.group(&Some("g")), Some(&values[..]));
    }
}
