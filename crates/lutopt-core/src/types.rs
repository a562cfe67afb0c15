//! Object kind tags.
//!
//! Every arena slot carries one of these tags. Dead slots become
//! [`ObjKind::Free`] and must be skipped by all iterators; constants are LUT
//! slots whose function degenerated to 0 or 1 and whose fan-in list is empty.

use serde::{Deserialize, Serialize};

/// Kind tag of a network object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjKind {
    /// Dead slot; the id is retired and the object is skipped everywhere.
    Free,
    /// Combinational input.
    Ci,
    /// Combinational output; has exactly one fan-in (its driver).
    Co,
    /// Internal LUT node with a truth table over its fan-ins.
    Lut,
    /// Constant node: a LUT whose function is 0 or 1 and that has no fan-ins.
    Const,
}

impl ObjKind {
    /// True for CIs and COs.
    pub fn is_terminal(self) -> bool {
        matches!(self, ObjKind::Ci | ObjKind::Co)
    }

    /// True for interior objects that carry logic (LUT nodes and constants).
    pub fn is_node(self) -> bool {
        matches!(self, ObjKind::Lut | ObjKind::Const)
    }
}
