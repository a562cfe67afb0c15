pub mod cnf;
pub mod error;
pub mod id;
pub mod isop;
pub mod network;
pub mod queue;
pub mod truth;
pub mod types;

// Re-export commonly used types
pub use cnf::{cnf_lit, cnf_lit_compl, cnf_lit_var, clauses, derive_cnf, CNF_END};
pub use error::CoreError;
pub use id::ObjId;
pub use isop::{eval_cover, isop};
pub use network::{Network, MAX_LUT_SIZE, NO_FUNC};
pub use queue::PathQueue;
pub use types::ObjKind;
