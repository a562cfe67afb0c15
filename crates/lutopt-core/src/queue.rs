//! Float-keyed max-priority queue over object ids.
//!
//! Backs the delay-mode scheduler: nodes are keyed by their path product and
//! must support membership queries and in-place priority updates, so this is
//! a binary heap with an external position index rather than
//! `std::collections::BinaryHeap`. Pop order is deterministic for a fixed
//! sequence of pushes and updates.

use crate::id::ObjId;

/// Max-heap of object ids with mutable float priorities.
#[derive(Debug, Default, Clone)]
pub struct PathQueue {
    heap: Vec<ObjId>,
    /// Position of each object in `heap`, or `NONE` if absent.
    pos: Vec<u32>,
    prio: Vec<f64>,
}

const NONE: u32 = u32::MAX;

impl PathQueue {
    pub fn new() -> Self {
        PathQueue::default()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    fn ensure(&mut self, obj: ObjId) {
        if obj.index() >= self.pos.len() {
            self.pos.resize(obj.index() + 1, NONE);
            self.prio.resize(obj.index() + 1, 0.0);
        }
    }

    pub fn contains(&self, obj: ObjId) -> bool {
        self.pos.get(obj.index()).is_some_and(|&p| p != NONE)
    }

    /// Current priority of an object (0.0 if never seen).
    pub fn priority(&self, obj: ObjId) -> f64 {
        self.prio.get(obj.index()).copied().unwrap_or(0.0)
    }

    /// Inserts an object with the given priority. Must not already be a member.
    pub fn push(&mut self, obj: ObjId, priority: f64) {
        debug_assert!(!self.contains(obj));
        self.ensure(obj);
        self.prio[obj.index()] = priority;
        self.pos[obj.index()] = self.heap.len() as u32;
        self.heap.push(obj);
        self.sift_up(self.heap.len() - 1);
    }

    /// Changes the priority of a member and restores heap order.
    pub fn update(&mut self, obj: ObjId, priority: f64) {
        debug_assert!(self.contains(obj));
        self.prio[obj.index()] = priority;
        let at = self.pos[obj.index()] as usize;
        self.sift_up(at);
        let at = self.pos[obj.index()] as usize;
        self.sift_down(at);
    }

    /// Highest priority currently queued.
    pub fn top_priority(&self) -> Option<f64> {
        self.heap.first().map(|&o| self.prio[o.index()])
    }

    /// Removes and returns the highest-priority object.
    pub fn pop(&mut self) -> Option<ObjId> {
        if self.heap.is_empty() {
            return None;
        }
        let top = self.heap[0];
        let last = self.heap.pop().unwrap();
        self.pos[top.index()] = NONE;
        if !self.heap.is_empty() {
            self.heap[0] = last;
            self.pos[last.index()] = 0;
            self.sift_down(0);
        }
        Some(top)
    }

    pub fn clear(&mut self) {
        for &o in &self.heap {
            self.pos[o.index()] = NONE;
        }
        self.heap.clear();
    }

    fn less(&self, a: usize, b: usize) -> bool {
        self.prio[self.heap[a].index()] < self.prio[self.heap[b].index()]
    }

    fn swap(&mut self, a: usize, b: usize) {
        self.heap.swap(a, b);
        self.pos[self.heap[a].index()] = a as u32;
        self.pos[self.heap[b].index()] = b as u32;
    }

    fn sift_up(&mut self, mut i: usize) {
        while i > 0 {
            let parent = (i - 1) / 2;
            if !self.less(parent, i) {
                break;
            }
            self.swap(parent, i);
            i = parent;
        }
    }

    fn sift_down(&mut self, mut i: usize) {
        loop {
            let mut best = i;
            for child in [2 * i + 1, 2 * i + 2] {
                if child < self.heap.len() && self.less(best, child) {
                    best = child;
                }
            }
            if best == i {
                break;
            }
            self.swap(i, best);
            i = best;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pops_in_priority_order() {
        let mut q = PathQueue::new();
        q.push(ObjId(1), 3.0);
        q.push(ObjId(2), 10.0);
        q.push(ObjId(3), 1.0);
        q.push(ObjId(4), 7.0);
        assert_eq!(q.top_priority(), Some(10.0));
        assert_eq!(q.pop(), Some(ObjId(2)));
        assert_eq!(q.pop(), Some(ObjId(4)));
        assert_eq!(q.pop(), Some(ObjId(1)));
        assert_eq!(q.pop(), Some(ObjId(3)));
        assert_eq!(q.pop(), None);
    }

    #[test]
    fn membership_tracks_push_and_pop() {
        let mut q = PathQueue::new();
        q.push(ObjId(5), 2.0);
        assert!(q.contains(ObjId(5)));
        assert!(!q.contains(ObjId(6)));
        q.pop();
        assert!(!q.contains(ObjId(5)));
    }

    #[test]
    fn update_reorders() {
        let mut q = PathQueue::new();
        q.push(ObjId(1), 1.0);
        q.push(ObjId(2), 2.0);
        q.push(ObjId(3), 3.0);
        q.update(ObjId(1), 9.0);
        assert_eq!(q.pop(), Some(ObjId(1)));
        q.update(ObjId(3), 0.5);
        assert_eq!(q.pop(), Some(ObjId(2)));
        assert_eq!(q.pop(), Some(ObjId(3)));
    }

    #[test]
    fn clear_empties_queue() {
        let mut q = PathQueue::new();
        q.push(ObjId(1), 1.0);
        q.push(ObjId(2), 2.0);
        q.clear();
        assert!(q.is_empty());
        assert!(!q.contains(ObjId(1)));
        // Reusable after clear.
        q.push(ObjId(1), 4.0);
        assert_eq!(q.pop(), Some(ObjId(1)));
    }
}
