//! A generic Pike/Cox virtual-machine matcher for sequences of
//! arbitrary typed values.
//!
//! Build a [`pattern::Pattern`] from the combinators in [`pattern`],
//! [`pattern::Pattern::compile`] it once into an [`instr::InstrArena`],
//! then [`vm::run`] it against as many input slices as you like. See
//! each module's docs for the piece of the model it covers:
//!
//! - [`instr`] — the compiled instruction graph.
//! - [`state`] — per-thread capture/marker state.
//! - [`pattern`] — the pattern algebra and its compilation.
//! - [`vm`] — the lock-step executor.
//! - [`match_`] — the `Match`/`PartialMatch` result surface.
//! - [`dot`] (`dot` feature) — Graphviz dump of a compiled program.

pub mod error;
pub mod instr;
pub mod match_;
pub mod pattern;
pub mod state;
pub mod vm;

#[cfg(feature = "dot")]
pub mod dot;

mod log_ext;

pub use error::{BuildError, Result};
pub use instr::InstrArena;
pub use match_::{Match, PartialMatch};
pub use pattern::{CallMoment, CompileOptions, Greediness, Pattern, PatternCallback};
pub use state::Marker;
pub use vm::{run, ExecHandle};
