//! The LUT-network store.
//!
//! A combinational network is a flat arena of objects indexed by [`ObjId`]:
//! combinational inputs and outputs, LUT nodes with a ≤6-input truth table,
//! and constants. Storage is columnar — kind, ordered fan-in list, fan-out
//! back-index, truth table, levels, path counts, plus scratch columns used by
//! the resynthesis engine (SAT-variable marks, traversal ids, cached CNF).
//!
//! Invariants maintained by every mutation:
//! - fan-out lists are the exact multiset inverse of fan-in lists;
//! - dead objects have kind [`ObjKind::Free`], no fan-ins and no fan-outs;
//! - truth tables are canonical for their arity (bits above `2^a` are zero).
//!
//! All edits go through the store methods; the engine never touches the
//! columns directly. Scratch columns are not serialized.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::cnf::derive_cnf;
use crate::error::CoreError;
use crate::id::ObjId;
use crate::queue::PathQueue;
use crate::truth::arity_mask;
use crate::types::ObjKind;

/// Maximum fan-in count of a node.
pub const MAX_LUT_SIZE: usize = 6;

/// Sentinel for an unassigned SAT-variable mark.
pub const NO_FUNC: i32 = -1;

type Fanins = SmallVec<[ObjId; MAX_LUT_SIZE]>;

/// Columnar arena holding one combinational network.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Network {
    kind: Vec<ObjKind>,
    fanins: Vec<Fanins>,
    fanouts: Vec<Vec<ObjId>>,
    truth: Vec<u64>,
    name: Vec<Option<String>>,
    level_d: Vec<u32>,
    level_r: Vec<u32>,
    path_d: Vec<u64>,
    path_r: Vec<u64>,
    level_max: u32,
    n_paths: u64,
    cis: Vec<ObjId>,
    cos: Vec<ObjId>,
    // Scratch columns; rebuilt as needed, never persisted.
    #[serde(skip)]
    func: Vec<i32>,
    #[serde(skip)]
    trav: Vec<u32>,
    #[serde(skip)]
    trav_id: u32,
    #[serde(skip)]
    cnf: Vec<Vec<i8>>,
    #[serde(skip)]
    que: Option<PathQueue>,
    #[serde(skip)]
    cover_scratch: Vec<u32>,
}

impl Network {
    pub fn new() -> Self {
        Network::default()
    }

    // -----------------------------------------------------------------------
    // Object allocation and construction
    // -----------------------------------------------------------------------

    fn alloc(&mut self, kind: ObjKind) -> ObjId {
        let id = ObjId::from(self.kind.len());
        self.kind.push(kind);
        self.fanins.push(Fanins::new());
        self.fanouts.push(Vec::new());
        self.truth.push(0);
        self.name.push(None);
        self.level_d.push(0);
        self.level_r.push(0);
        self.path_d.push(0);
        self.path_r.push(0);
        self.func.push(NO_FUNC);
        self.trav.push(0);
        self.cnf.push(Vec::new());
        id
    }

    /// Adds a combinational input.
    pub fn add_ci(&mut self) -> ObjId {
        let id = self.alloc(ObjKind::Ci);
        self.cis.push(id);
        id
    }

    /// Adds a combinational output driven by `driver`.
    pub fn add_co(&mut self, driver: ObjId) -> ObjId {
        let id = self.alloc(ObjKind::Co);
        self.add_fanin(id, driver);
        self.cos.push(id);
        id
    }

    /// Adds a LUT node with the given fan-ins and truth table.
    pub fn add_lut(&mut self, fanins: &[ObjId], truth: u64) -> Result<ObjId, CoreError> {
        if fanins.len() > MAX_LUT_SIZE {
            return Err(CoreError::ArityOverflow {
                given: fanins.len(),
                max: MAX_LUT_SIZE,
            });
        }
        let id = self.alloc(ObjKind::Lut);
        self.truth[id.index()] = truth & arity_mask(fanins.len());
        for &f in fanins {
            self.add_fanin(id, f);
        }
        Ok(id)
    }

    /// Adds a constant node (arity 0, truth 0 or 1).
    pub fn add_const(&mut self, value: bool) -> ObjId {
        let id = self.alloc(ObjKind::Const);
        self.truth[id.index()] = u64::from(value);
        id
    }

    /// Assigns a reporting name to an object.
    pub fn set_name(&mut self, obj: ObjId, name: impl Into<String>) {
        self.name[obj.index()] = Some(name.into());
    }

    pub fn name(&self, obj: ObjId) -> Option<&str> {
        self.name[obj.index()].as_deref()
    }

    // -----------------------------------------------------------------------
    // Read accessors
    // -----------------------------------------------------------------------

    pub fn obj_count(&self) -> usize {
        self.kind.len()
    }

    pub fn kind(&self, obj: ObjId) -> ObjKind {
        self.kind[obj.index()]
    }

    pub fn is_ci(&self, obj: ObjId) -> bool {
        self.kind(obj) == ObjKind::Ci
    }

    pub fn is_co(&self, obj: ObjId) -> bool {
        self.kind(obj) == ObjKind::Co
    }

    pub fn is_terminal(&self, obj: ObjId) -> bool {
        self.kind(obj).is_terminal()
    }

    /// True for interior objects: LUT nodes and constants.
    pub fn is_node(&self, obj: ObjId) -> bool {
        self.kind(obj).is_node()
    }

    pub fn fanins(&self, obj: ObjId) -> &[ObjId] {
        &self.fanins[obj.index()]
    }

    pub fn fanin_num(&self, obj: ObjId) -> usize {
        self.fanins[obj.index()].len()
    }

    pub fn fanin(&self, obj: ObjId, k: usize) -> ObjId {
        self.fanins[obj.index()][k]
    }

    pub fn fanouts(&self, obj: ObjId) -> &[ObjId] {
        &self.fanouts[obj.index()]
    }

    pub fn fanout_num(&self, obj: ObjId) -> usize {
        self.fanouts[obj.index()].len()
    }

    pub fn truth(&self, obj: ObjId) -> u64 {
        self.truth[obj.index()]
    }

    pub fn set_truth(&mut self, obj: ObjId, truth: u64) {
        self.truth[obj.index()] = truth & arity_mask(self.fanin_num(obj));
    }

    pub fn cis(&self) -> &[ObjId] {
        &self.cis
    }

    pub fn cos(&self) -> &[ObjId] {
        &self.cos
    }

    /// Iterates live interior nodes in id order.
    pub fn nodes(&self) -> impl Iterator<Item = ObjId> + '_ {
        (0..self.obj_count())
            .map(ObjId::from)
            .filter(|&o| self.is_node(o))
    }

    pub fn node_count(&self) -> usize {
        self.nodes().count()
    }

    // -----------------------------------------------------------------------
    // Levels, paths and timing
    // -----------------------------------------------------------------------

    pub fn level_d(&self, obj: ObjId) -> u32 {
        self.level_d[obj.index()]
    }

    pub fn level_r(&self, obj: ObjId) -> u32 {
        self.level_r[obj.index()]
    }

    pub fn path_d(&self, obj: ObjId) -> u64 {
        self.path_d[obj.index()]
    }

    pub fn path_r(&self, obj: ObjId) -> u64 {
        self.path_r[obj.index()]
    }

    pub fn level_max(&self) -> u32 {
        self.level_max
    }

    /// Timing slack: zero exactly on critical paths.
    pub fn slack(&self, obj: ObjId) -> u32 {
        let interior = u32::from(!self.is_terminal(obj));
        let sum = self.level_d(obj) + self.level_r(obj);
        (interior + self.level_max).saturating_sub(sum)
    }

    /// Recomputes the forward level of one object from its fan-ins.
    pub fn compute_level_d_one(&mut self, obj: ObjId) -> u32 {
        let mut level = 0;
        for k in 0..self.fanin_num(obj) {
            level = level.max(self.level_d(self.fanin(obj, k)));
        }
        let level = level + u32::from(!self.is_terminal(obj));
        self.level_d[obj.index()] = level;
        level
    }

    fn compute_level_r_one(&mut self, obj: ObjId) -> u32 {
        let mut level = 0;
        for k in 0..self.fanout_num(obj) {
            level = level.max(self.level_r(self.fanouts[obj.index()][k]));
        }
        let level = level + u32::from(!self.is_terminal(obj));
        self.level_r[obj.index()] = level;
        level
    }

    /// Recomputes forward levels over a TFO slice in postorder (deepest
    /// first), then refreshes `level_max` from the COs.
    pub fn compute_levels_d(&mut self, tfo_postorder: &[ObjId]) -> u32 {
        for &obj in tfo_postorder.iter().rev() {
            self.compute_level_d_one(obj);
        }
        let mut level = 0;
        for k in 0..self.cos.len() {
            level = level.max(self.level_d(self.cos[k]));
        }
        self.level_max = level;
        level
    }

    fn compute_levels_r(&mut self, tfi_postorder: &[ObjId]) -> u32 {
        for &obj in tfi_postorder.iter().rev() {
            self.compute_level_r_one(obj);
        }
        let mut level = 0;
        for k in 0..self.cis.len() {
            level = level.max(self.level_r(self.cis[k]));
        }
        self.level_max = level;
        level
    }

    /// Refreshes forward levels in the TFO of one object after an edit.
    pub fn update_level_d(&mut self, pivot: ObjId) {
        let tfo = self.collect_tfo_from(&[pivot], true);
        self.compute_levels_d(&tfo);
    }

    /// Recomputes forward levels of the whole network.
    pub fn recompute_levels(&mut self) {
        let tfo = self.collect_tfo_all(true);
        self.compute_levels_d(&tfo);
    }

    fn compute_path_d_one(&mut self, obj: ObjId) -> u64 {
        debug_assert!(!self.is_ci(obj));
        let mut path = 0;
        for k in 0..self.fanin_num(obj) {
            let f = self.fanin(obj, k);
            if self.slack(f) == 0 {
                path += self.path_d(f);
            }
        }
        self.path_d[obj.index()] = path;
        path
    }

    fn compute_path_r_one(&mut self, obj: ObjId) -> u64 {
        debug_assert!(!self.is_co(obj));
        let mut path = 0;
        for k in 0..self.fanout_num(obj) {
            let f = self.fanouts[obj.index()][k];
            if self.slack(f) == 0 {
                path += self.path_r(f);
            }
        }
        self.path_r[obj.index()] = path;
        path
    }

    /// Recomputes forward critical-path counts over an order that contains
    /// the CIs; `reverse` walks the slice from the back (postorder input).
    pub fn compute_paths_d(&mut self, order: &[ObjId], reverse: bool) -> u64 {
        let objs: Vec<ObjId> = if reverse {
            order.iter().rev().copied().collect()
        } else {
            order.to_vec()
        };
        for obj in objs {
            if self.is_ci(obj) {
                self.path_d[obj.index()] = u64::from(self.slack(obj) == 0);
            } else if self.slack(obj) != 0 {
                self.path_d[obj.index()] = 0;
            } else {
                self.compute_path_d_one(obj);
            }
        }
        let mut total = 0;
        for k in 0..self.cos.len() {
            total += self.path_d(self.cos[k]);
        }
        self.n_paths = total;
        total
    }

    /// Reverse counterpart of [`compute_paths_d`](Self::compute_paths_d).
    pub fn compute_paths_r(&mut self, order: &[ObjId], reverse: bool) -> u64 {
        let objs: Vec<ObjId> = if reverse {
            order.iter().rev().copied().collect()
        } else {
            order.to_vec()
        };
        for obj in objs {
            if self.is_co(obj) {
                self.path_r[obj.index()] = u64::from(self.slack(obj) == 0);
            } else if self.slack(obj) != 0 {
                self.path_r[obj.index()] = 0;
            } else {
                self.compute_path_r_one(obj);
            }
        }
        let mut total = 0;
        for k in 0..self.cis.len() {
            total += self.path_r(self.cis[k]);
        }
        self.n_paths = total;
        total
    }

    /// Queues an interior node keyed by its path product, or refreshes its
    /// priority if already queued. Terminals and level-1 nodes (whose depth
    /// cannot improve) stay out.
    pub fn update_priority(&mut self, obj: ObjId) {
        if self.is_terminal(obj) || self.level_d(obj) == 1 {
            return;
        }
        let paths = (self.path_d(obj) as f64) * (self.path_r(obj) as f64);
        let que = self.que.get_or_insert_with(PathQueue::new);
        if que.contains(obj) {
            que.update(obj, paths);
        } else if paths > 0.0 {
            que.push(obj, paths);
        }
    }

    /// Full timing refresh: levels, path counts and queue priorities over the
    /// entire network. Creates the priority queue on first use.
    pub fn refresh_timing(&mut self) {
        let tfi = self.collect_tfi_all(true);
        let tfo = self.collect_tfo_all(true);
        self.compute_levels_d(&tfo);
        // Reverse levels may briefly disagree through CIs that lost their
        // last fan-out; forward levels are the authoritative ones.
        let level_max = self.level_max;
        self.compute_levels_r(&tfi);
        self.level_max = level_max;
        self.compute_paths_d(&tfo, true);
        self.compute_paths_r(&tfi, true);
        for k in 0..tfi.len() {
            self.update_priority(tfi[k]);
        }
    }

    pub fn has_queue(&self) -> bool {
        self.que.is_some()
    }

    /// Pops the queue head if its priority is positive.
    pub fn pop_critical(&mut self) -> Option<ObjId> {
        let que = self.que.as_mut()?;
        if que.top_priority()? > 0.0 {
            que.pop()
        } else {
            None
        }
    }

    // -----------------------------------------------------------------------
    // Fan-in / fan-out edits
    // -----------------------------------------------------------------------

    /// Appends a fan-in and registers the back edge.
    pub fn add_fanin(&mut self, obj: ObjId, fanin: ObjId) {
        debug_assert!(self.fanin_num(obj) < MAX_LUT_SIZE || self.is_co(obj));
        self.fanins[obj.index()].push(fanin);
        self.fanouts[fanin.index()].push(obj);
    }

    /// Removes every fan-in of `obj`, dropping the back edges.
    pub fn remove_fanins(&mut self, obj: ObjId) {
        let fanins = std::mem::take(&mut self.fanins[obj.index()]);
        for f in fanins {
            let outs = &mut self.fanouts[f.index()];
            let at = outs
                .iter()
                .position(|&o| o == obj)
                .expect("fan-out back edge missing");
            outs.swap_remove(at);
        }
    }

    /// Removes the fan-in at position `idx`, dropping its back edge. The
    /// relative order of the remaining fan-ins is preserved (truth-table
    /// variable positions shift down by one above `idx`).
    pub fn remove_fanin_index(&mut self, obj: ObjId, idx: usize) {
        let fanin = self.fanins[obj.index()].remove(idx);
        let outs = &mut self.fanouts[fanin.index()];
        let at = outs
            .iter()
            .position(|&o| o == obj)
            .expect("fan-out back edge missing");
        outs.swap_remove(at);
    }

    /// Replaces one fan-in occurrence of `from` with `to`, fixing back edges.
    pub fn patch_fanin(&mut self, obj: ObjId, from: ObjId, to: ObjId) {
        let at = self.fanins[obj.index()]
            .iter()
            .position(|&f| f == from)
            .expect("fan-in to patch not present");
        self.fanins[obj.index()][at] = to;
        let outs = &mut self.fanouts[from.index()];
        let k = outs
            .iter()
            .position(|&o| o == obj)
            .expect("fan-out back edge missing");
        outs.swap_remove(k);
        self.fanouts[to.index()].push(obj);
    }

    // -----------------------------------------------------------------------
    // Node replacement (the mutator)
    // -----------------------------------------------------------------------

    /// Creates a fresh LUT node over `support` and computes its level.
    pub fn create_node(&mut self, truth: u64, support: &[ObjId]) -> ObjId {
        debug_assert!(support.len() <= MAX_LUT_SIZE);
        let id = self.alloc(ObjKind::Lut);
        self.truth[id.index()] = truth & arity_mask(support.len());
        for &f in support {
            self.add_fanin(id, f);
        }
        self.compute_level_d_one(id);
        id
    }

    /// Rewrites `pivot` in place: new truth table, new support (or none for a
    /// constant/dead replacement), cascaded deletion of fan-ins left dangling,
    /// and level or timing refresh.
    ///
    /// With `support == None` the node becomes a constant of `truth` if it
    /// still has fan-outs, or a dead slot otherwise. The cascade deletes every
    /// old fan-in whose fan-out count dropped to zero (never terminals).
    pub fn update_node(&mut self, pivot: ObjId, truth: u64, support: Option<&[ObjId]>) {
        self.reset_node(pivot, truth, support);
        self.compute_level_d_one(pivot);
        if self.que.is_none() {
            self.update_level_d(pivot);
        } else {
            self.refresh_timing();
        }
    }

    fn reset_node(&mut self, pivot: ObjId, truth: u64, support: Option<&[ObjId]>) {
        debug_assert!(self.is_node(pivot));
        // Worklist of (object, its released fan-ins) for the dangling cascade.
        let mut pending: Vec<(ObjId, u64, Option<Vec<ObjId>>)> =
            vec![(pivot, truth, support.map(<[ObjId]>::to_vec))];
        while let Some((obj, truth, support)) = pending.pop() {
            if self.kind(obj) == ObjKind::Free {
                continue; // already reclaimed through another cascade path
            }
            let old: Vec<ObjId> = self.fanins(obj).to_vec();
            self.truth[obj.index()] = truth & arity_mask(support.as_deref().unwrap_or(&[]).len());
            self.cnf[obj.index()].clear();
            self.remove_fanins(obj);
            match support {
                Some(supp) if !supp.is_empty() => {
                    debug_assert!(self.fanout_num(obj) > 0);
                    self.kind[obj.index()] = ObjKind::Lut;
                    for &f in &supp {
                        self.add_fanin(obj, f);
                    }
                }
                _ => {
                    if self.fanout_num(obj) == 0 {
                        self.kind[obj.index()] = ObjKind::Free;
                    } else {
                        self.kind[obj.index()] = ObjKind::Const;
                    }
                }
            }
            for f in old {
                if !self.is_terminal(f) && self.fanout_num(f) == 0 && self.kind(f) != ObjKind::Free
                {
                    pending.push((f, 0, None));
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Traversal ids
    // -----------------------------------------------------------------------

    /// Opens a fresh traversal generation.
    pub fn inc_trav_id(&mut self) {
        self.trav_id += 1;
    }

    /// Marks an object in the current generation; returns whether it already
    /// was marked.
    pub fn set_trav_cur(&mut self, obj: ObjId) -> bool {
        let seen = self.trav[obj.index()] == self.trav_id;
        self.trav[obj.index()] = self.trav_id;
        seen
    }

    pub fn is_trav_cur(&self, obj: ObjId) -> bool {
        self.trav[obj.index()] == self.trav_id
    }

    pub fn is_trav_prev(&self, obj: ObjId) -> bool {
        self.trav[obj.index()] == self.trav_id.wrapping_sub(1)
    }

    /// Distance of the object's mark behind the current generation. Small
    /// distances (≤ 3) encode multi-valued labels during TFO classification.
    pub fn trav_diff(&self, obj: ObjId) -> u32 {
        self.trav_id.wrapping_sub(self.trav[obj.index()])
    }

    pub fn set_trav_diff(&mut self, obj: ObjId, diff: u32) {
        self.trav[obj.index()] = self.trav_id.wrapping_sub(diff);
    }

    // -----------------------------------------------------------------------
    // SAT-variable marks and CNF cache
    // -----------------------------------------------------------------------

    /// Transient SAT-variable id of an object, or [`NO_FUNC`].
    pub fn func(&self, obj: ObjId) -> i32 {
        self.func[obj.index()]
    }

    pub fn set_func(&mut self, obj: ObjId, var: i32) {
        self.func[obj.index()] = var;
    }

    pub fn clear_func(&mut self, obj: ObjId) {
        self.func[obj.index()] = NO_FUNC;
    }

    /// Clears every SAT-variable mark.
    pub fn clear_all_funcs(&mut self) {
        self.func.iter_mut().for_each(|f| *f = NO_FUNC);
    }

    /// Drops every cached CNF byte string.
    pub fn clear_all_cnf(&mut self) {
        self.cnf.iter_mut().for_each(Vec::clear);
    }

    /// Lazily derives and caches the CNF byte string of a node.
    pub fn ensure_cnf(&mut self, obj: ObjId) {
        debug_assert!(self.is_node(obj));
        if !self.cnf[obj.index()].is_empty() {
            return;
        }
        let truth = self.truth(obj);
        let n_vars = self.fanin_num(obj);
        let mut cover = std::mem::take(&mut self.cover_scratch);
        let mut bytes = std::mem::take(&mut self.cnf[obj.index()]);
        derive_cnf(truth, n_vars, &mut cover, &mut bytes);
        self.cover_scratch = cover;
        self.cnf[obj.index()] = bytes;
    }

    pub fn cnf(&self, obj: ObjId) -> &[i8] {
        &self.cnf[obj.index()]
    }

    // -----------------------------------------------------------------------
    // TFI / TFO collection
    // -----------------------------------------------------------------------

    /// Collects the transitive fan-in of the seeds in DFS postorder.
    /// `terminals` decides whether CIs are kept in the result.
    pub fn collect_tfi_from(&mut self, seeds: &[ObjId], terminals: bool) -> Vec<ObjId> {
        self.inc_trav_id();
        let mut out = Vec::new();
        let mut stack: Vec<(ObjId, bool)> = Vec::new();
        for &s in seeds {
            stack.push((s, false));
            while let Some((obj, expanded)) = stack.pop() {
                if expanded {
                    out.push(obj);
                    continue;
                }
                if self.set_trav_cur(obj) {
                    continue;
                }
                if !terminals && self.is_ci(obj) {
                    continue;
                }
                stack.push((obj, true));
                for k in (0..self.fanin_num(obj)).rev() {
                    stack.push((self.fanin(obj, k), false));
                }
            }
        }
        out
    }

    pub fn collect_tfi_all(&mut self, terminals: bool) -> Vec<ObjId> {
        let seeds = self.cos.clone();
        self.collect_tfi_from(&seeds, terminals)
    }

    /// Collects the transitive fan-out of the seeds in DFS postorder.
    pub fn collect_tfo_from(&mut self, seeds: &[ObjId], terminals: bool) -> Vec<ObjId> {
        self.inc_trav_id();
        let mut out = Vec::new();
        let mut stack: Vec<(ObjId, bool)> = Vec::new();
        for &s in seeds {
            stack.push((s, false));
            while let Some((obj, expanded)) = stack.pop() {
                if expanded {
                    out.push(obj);
                    continue;
                }
                if self.set_trav_cur(obj) {
                    continue;
                }
                if !terminals && self.is_co(obj) {
                    continue;
                }
                stack.push((obj, true));
                for k in (0..self.fanout_num(obj)).rev() {
                    stack.push((self.fanouts[obj.index()][k], false));
                }
            }
        }
        out
    }

    pub fn collect_tfo_all(&mut self, terminals: bool) -> Vec<ObjId> {
        let seeds = self.cis.clone();
        self.collect_tfo_from(&seeds, terminals)
    }

    // -----------------------------------------------------------------------
    // Simulation and consistency (verification helpers)
    // -----------------------------------------------------------------------

    /// Word-parallel simulation: each CI gets 64 input patterns packed into a
    /// word; returns one word per CO. Dead slots are ignored.
    pub fn simulate(&self, ci_words: &[u64]) -> Vec<u64> {
        assert_eq!(ci_words.len(), self.cis.len());
        let mut value = vec![0u64; self.obj_count()];
        let mut done = vec![false; self.obj_count()];
        for (k, &ci) in self.cis.iter().enumerate() {
            value[ci.index()] = ci_words[k];
            done[ci.index()] = true;
        }
        let mut order = Vec::new();
        let mut stack: Vec<(ObjId, bool)> = self.cos.iter().map(|&c| (c, false)).collect();
        let mut seen = vec![false; self.obj_count()];
        while let Some((obj, expanded)) = stack.pop() {
            if expanded {
                order.push(obj);
                continue;
            }
            if seen[obj.index()] {
                continue;
            }
            seen[obj.index()] = true;
            stack.push((obj, true));
            for k in (0..self.fanin_num(obj)).rev() {
                stack.push((self.fanin(obj, k), false));
            }
        }
        for obj in order {
            if done[obj.index()] {
                continue;
            }
            let word = match self.kind(obj) {
                ObjKind::Co => value[self.fanin(obj, 0).index()],
                ObjKind::Lut | ObjKind::Const => {
                    let truth = self.truth(obj);
                    let mut word = 0u64;
                    for p in 0..64 {
                        let mut idx = 0usize;
                        for (k, &f) in self.fanins(obj).iter().enumerate() {
                            idx |= (((value[f.index()] >> p) & 1) as usize) << k;
                        }
                        word |= ((truth >> idx) & 1) << p;
                    }
                    word
                }
                ObjKind::Ci | ObjKind::Free => 0,
            };
            value[obj.index()] = word;
            done[obj.index()] = true;
        }
        self.cos.iter().map(|&c| value[c.index()]).collect()
    }

    /// Verifies the fan-in/fan-out inverse invariant and dead-slot hygiene.
    pub fn check_consistency(&self) -> Result<(), CoreError> {
        for i in 0..self.obj_count() {
            let obj = ObjId::from(i);
            if self.kind(obj) == ObjKind::Free {
                if !self.fanins(obj).is_empty() || !self.fanouts(obj).is_empty() {
                    return Err(CoreError::FanoutInconsistency {
                        reason: format!("dead object {obj} still has edges"),
                    });
                }
                continue;
            }
            for &f in self.fanins(obj) {
                let forward = self.fanins(obj).iter().filter(|&&x| x == f).count();
                let backward = self.fanouts(f).iter().filter(|&&x| x == obj).count();
                if forward != backward {
                    return Err(CoreError::FanoutInconsistency {
                        reason: format!("edge {f} -> {obj}: {forward} fan-ins vs {backward} fan-outs"),
                    });
                }
                if self.kind(f) == ObjKind::Free {
                    return Err(CoreError::FanoutInconsistency {
                        reason: format!("live object {obj} feeds from dead {f}"),
                    });
                }
            }
        }
        Ok(())
    }
}
