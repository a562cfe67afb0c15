//! Don't-care-based local resynthesis of K-LUT networks.
//!
//! Visits nodes of a [`lutopt_core::Network`] and rewrites each one under
//! window-local don't-care equivalence: constant replacement, fan-in
//! reduction, one-node reimplementation over an alternative ≤K support, or a
//! two-node decomposition — all certified by an incremental SAT formulation
//! over a bounded window. Entry point: [`optimize`] with [`ResubParams`].

pub mod engine;
pub mod error;
pub mod extract;
pub mod miter;
pub mod params;
pub mod solver;
pub mod supp;
pub mod window;

pub use engine::{optimize, Change, ResubStats};
pub use error::ResubError;
pub use params::ResubParams;
