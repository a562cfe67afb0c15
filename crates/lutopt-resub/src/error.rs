//! Engine error types.
//!
//! Every variant is local to a single per-pivot attempt: the scheduler logs
//! it, bumps a counter and moves on. Nothing here aborts a run, and no
//! network mutation can have happened by the time one of these is raised.

use thiserror::Error;

/// Errors raised while attempting to resynthesize one pivot.
#[derive(Debug, Error)]
pub enum ResubError {
    /// The SAT backend reported a failure of its own.
    #[error("sat backend: {0}")]
    Backend(String),

    /// A solve hit the per-call budget without a verdict.
    #[error("sat solve undecided under the conflict budget")]
    Undecided,

    /// A call the algorithm proved must be UNSAT came back satisfiable.
    #[error("unexpected satisfiable result during {0}")]
    UnexpectedSat(&'static str),

    /// A call expected to be satisfiable came back UNSAT.
    #[error("unexpected unsatisfiable result during {0}")]
    UnexpectedUnsat(&'static str),

    /// Rejected parameter record.
    #[error("invalid parameters: {0}")]
    InvalidParams(String),
}

impl From<satgalaxy::errors::SolverError> for ResubError {
    fn from(e: satgalaxy::errors::SolverError) -> Self {
        ResubError::Backend(e.to_string())
    }
}
