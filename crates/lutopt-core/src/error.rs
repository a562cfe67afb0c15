//! Core error types for the network store.
//!
//! Uses `thiserror` for structured, matchable error variants. Most store
//! operations are infallible by construction (ids are dense indices); errors
//! cover builder misuse and consistency-check failures.

use crate::id::ObjId;
use thiserror::Error;

/// Errors produced by the lutopt-core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// An object id is out of range for this network.
    #[error("object not found: ObjId({id})", id = id.0)]
    ObjNotFound { id: ObjId },

    /// An operation was applied to an object of the wrong kind.
    #[error("object {id} has unexpected kind: {reason}")]
    KindMismatch { id: ObjId, reason: String },

    /// A node was given more fan-ins than the store supports.
    #[error("fan-in count {given} exceeds the supported LUT size {max}")]
    ArityOverflow { given: usize, max: usize },

    /// The fan-in/fan-out back-index went out of sync.
    #[error("fan-out inconsistency: {reason}")]
    FanoutInconsistency { reason: String },
}
