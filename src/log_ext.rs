//! Thin logging helpers over the `log` crate.
//!
//! Kept as free functions, not a struct, because the VM has no
//! persistent handle worth attaching a logger to (one executor instance
//! lives for exactly one match and is dropped at the end of `run`).
//! Step boundaries log at `debug!`; per-node epsilon-closure detail,
//! only useful when hand-debugging a single compiled program, logs at
//! `trace!`.

/// Logged once per input-index step, at the point the executor has a
/// non-empty consumer list to advance.
pub(crate) fn trace_step(index: usize, thread_count: usize) {
    log::debug!("step at index {index}: {thread_count} live thread(s)");
}

/// Logged for every instruction the epsilon-closure visits while
/// expanding a thread toward its next consumer.
pub(crate) fn trace_instruction(instr_id: u32, kind: &str) {
    log::trace!("epsilon-closure: visiting instruction #{instr_id} ({kind})");
}

/// Logged when a thread reaches `Accept` and the remaining,
/// lower-priority threads in this step are about to be discarded.
pub(crate) fn trace_thread(index: usize, note: &str) {
    log::debug!("index {index}: {note}");
}

/// Logged once, after the executor has run to completion, reporting
/// whether any thread reached `Accept`.
pub(crate) fn trace_outcome(matched: bool) {
    if matched {
        log::debug!("run finished: match found");
    } else {
        log::debug!("run finished: no match");
    }
}
