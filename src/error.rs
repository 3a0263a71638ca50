//! Construction-time errors for the pattern algebra.
//!
//! Execution-time errors are not expected once a pattern has compiled
//! successfully, so this module only covers the "invalid argument"
//! class. Anything that would indicate a closed enum was extended
//! without updating the executor's match arms is a programmer error and
//! panics instead of returning a `BuildError` — see the `unreachable!`
//! calls in `vm.rs`.

use thiserror::Error;

/// Failure building a [`crate::pattern::Pattern`] or compiling one into
/// an instruction graph.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum BuildError {
    /// A pattern constructor was handed an empty list where at least one
    /// element is required (e.g. `Alternation` or `Concatenation` with
    /// zero arms, `OneOfLiterals` with zero values).
    #[error("{what} requires at least one element")]
    EmptyArgument {
        /// Name of the constructor that rejected the empty list.
        what: &'static str,
    },

    /// A repetition's bounds are inconsistent: `min > max` with `max`
    /// finite. Rejected outright rather than silently reinterpreted as
    /// `min = max`.
    #[error("repetition bounds invalid: min ({min}) > max ({max})")]
    InvalidRepetitionBounds {
        /// The requested minimum repetition count.
        min: usize,
        /// The requested maximum repetition count.
        max: usize,
    },
}

pub type Result<T> = std::result::Result<T, BuildError>;
