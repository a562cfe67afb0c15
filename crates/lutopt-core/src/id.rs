//! Stable object identifier for the network store.
//!
//! Objects live in a flat arena indexed by [`ObjId`]. Ids are never reused
//! within a run: a deleted object keeps its slot with its kind cleared, so an
//! `ObjId` held across edits stays valid (it may just point at a dead slot).

use std::fmt;

use serde::{Deserialize, Serialize};

/// Index of an object (CI, CO, LUT node, or constant) in the network arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjId(pub u32);

impl ObjId {
    /// Arena slot of this object.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ObjId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<usize> for ObjId {
    fn from(i: usize) -> Self {
        ObjId(i as u32)
    }
}
