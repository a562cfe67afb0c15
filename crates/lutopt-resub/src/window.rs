//! Window construction around a pivot node.
//!
//! A window is a DFS-ordered slice of the network: bounded TFI (divisors plus
//! the side inputs demanded by the TFO), the pivot, then the bounded TFO with
//! its boundary roots. TFI entries whose fan-ins fall outside the window are
//! leaves; TFO entries on the boundary are roots whose behavior the solver
//! must preserve. The divisor prefix of the TFI doubles as the candidate
//! support pool for reimplementation.
//!
//! All traversals are iterative; bounded recursion state lives on explicit
//! stacks. Multi-valued TFO labels (inner / root / none) are encoded as
//! distances behind the current traversal generation, which takes three
//! fresh generations per classification.

use lutopt_core::{Network, ObjId};

use crate::engine::is_delay_critical_fanin;
use crate::params::ResubParams;

/// One window slot: an object plus its boundary flag (TFI leaf or TFO root).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WinItem {
    pub obj: ObjId,
    pub boundary: bool,
}

/// DFS-ordered window with the pivot position and divisor count.
#[derive(Debug, Clone)]
pub struct Window {
    pub items: Vec<WinItem>,
    /// Index of the pivot; TFI before, TFO after.
    pub pivot_pos: usize,
    /// The first `n_divs` TFI entries are candidate divisors.
    pub n_divs: usize,
}

impl Window {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn tfo_len(&self) -> usize {
        self.items.len() - self.pivot_pos - 1
    }

    pub fn root_count(&self) -> usize {
        self.items[self.pivot_pos + 1..]
            .iter()
            .filter(|it| it.boundary)
            .count()
    }

    pub fn obj(&self, pos: usize) -> ObjId {
        self.items[pos].obj
    }
}

// TFO label values, stored as trav-id distances.
const LABEL_INNER: u32 = 0;
const LABEL_ROOT: u32 = 1;
const LABEL_NONE: u32 = 2;

/// Builds the window for `pivot`. `delay` selects the delay-oriented hooks;
/// the currently active collection strategy is the area one in either mode.
pub fn build_window(net: &mut Network, pivot: ObjId, pars: &ResubParams, delay: bool) -> Window {
    let tfo_lev_max = net.level_d(pivot) + pars.tfo_lev_max;
    let divs = collect_divisors(net, pivot, pars.tfi_lev_max as i64, delay);
    let marked = mark_divisor_tfo(net, &divs, pivot, tfo_lev_max, pars.fanout_max);
    let (tfo, roots) = derive_tfo(net, pivot, tfo_lev_max, pars.fanout_max, false);
    let side = collect_tfo_side_inputs(net, pivot, &tfo);
    // Re-mark the divisor TFO so the extended-TFI pass can recognize it as
    // the previous generation.
    net.inc_trav_id();
    for &obj in &marked {
        net.set_trav_cur(obj);
    }
    let (tfi, n_divs) = collect_extended_tfi(net, pivot, &divs, &side);
    assemble(net, pivot, &tfi, &tfo, &roots, n_divs)
}

/// DFS-collects candidate divisors within `budget` levels behind the pivot,
/// in postorder, excluding the pivot itself. The delay-oriented variant
/// (seeding from timing-critical fan-ins) is a hook that stays disabled.
fn collect_divisors(net: &mut Network, pivot: ObjId, budget: i64, _delay: bool) -> Vec<ObjId> {
    let mut divs = Vec::new();
    net.inc_trav_id();
    let mut stack: Vec<(ObjId, i64, bool)> = vec![(pivot, budget, false)];
    while let Some((obj, left, expanded)) = stack.pop() {
        if expanded {
            divs.push(obj);
            continue;
        }
        if !net.is_ci(obj) && left < 0 {
            continue;
        }
        if net.set_trav_cur(obj) {
            continue;
        }
        stack.push((obj, left, true));
        for k in (0..net.fanin_num(obj)).rev() {
            stack.push((net.fanin(obj, k), left - 1, false));
        }
    }
    debug_assert_eq!(divs.last(), Some(&pivot));
    divs.pop();
    // Fan-ins cut off by the level budget still qualify.
    for k in 0..net.fanin_num(pivot) {
        let f = net.fanin(pivot, k);
        if !net.set_trav_cur(f) {
            divs.push(f);
        }
    }
    divs
}

/// Marks the TFO frontier reachable from the divisors, bounded by absolute
/// level and fan-out count. Returns the marked set (pivot first).
fn mark_divisor_tfo(
    net: &mut Network,
    divs: &[ObjId],
    pivot: ObjId,
    tfo_lev_max: u32,
    fanout_max: usize,
) -> Vec<ObjId> {
    let mut marked = Vec::new();
    net.inc_trav_id();
    net.set_trav_cur(pivot);
    marked.push(pivot);
    let mut stack: Vec<ObjId> = Vec::new();
    for &d in divs {
        stack.push(d);
        while let Some(obj) = stack.pop() {
            if net.set_trav_cur(obj) {
                continue;
            }
            marked.push(obj);
            if net.level_d(obj) > tfo_lev_max || net.fanout_num(obj) > fanout_max {
                continue;
            }
            for k in (0..net.fanout_num(obj)).rev() {
                stack.push(net.fanouts(obj)[k]);
            }
        }
    }
    marked
}

/// Labels the TFO of `pivot` with {inner, root, none}, assuming the divisor
/// TFO is marked in the current generation. Returns the pivot's own label.
fn label_tfo(
    net: &mut Network,
    pivot: ObjId,
    tfo_lev_max: u32,
    fanout_max: usize,
    delay: bool,
) -> u32 {
    // Three generations so that: marked = 3, unmarked ≥ 4, labels 0..=2.
    net.inc_trav_id();
    net.inc_trav_id();
    net.inc_trav_id();
    debug_assert!(net.trav_diff(pivot) > 2);
    label_rec(net, pivot, tfo_lev_max, fanout_max, delay)
}

/// Iterative post-order labeling. Each frame observes its original distance
/// (3 = in the divisor TFO) before the provisional `none` overwrite.
fn label_rec(
    net: &mut Network,
    root: ObjId,
    tfo_lev_max: u32,
    fanout_max: usize,
    delay: bool,
) -> u32 {
    struct Frame {
        obj: ObjId,
        orig: u32,
        first: bool,
        next_child: usize,
        has_none: bool,
    }
    let mut stack: Vec<Frame> = Vec::new();
    let mut last = LABEL_NONE;

    // Opens a frame, or returns the node's settled label immediately.
    let enter = |net: &mut Network,
                 obj: ObjId,
                 first: bool,
                 stack: &mut Vec<Frame>,
                 last: &mut u32|
     -> bool {
        let diff = net.trav_diff(obj);
        if diff <= 2 {
            *last = diff;
            return false;
        }
        net.set_trav_diff(obj, LABEL_NONE);
        if net.is_co(obj) || net.level_d(obj) > tfo_lev_max {
            *last = LABEL_NONE;
            return false;
        }
        if net.level_d(obj) == tfo_lev_max || net.fanout_num(obj) > fanout_max {
            if diff == 3 {
                net.set_trav_diff(obj, LABEL_ROOT);
            }
            *last = net.trav_diff(obj);
            return false;
        }
        stack.push(Frame {
            obj,
            orig: diff,
            first,
            next_child: 0,
            has_none: false,
        });
        true
    };

    if !enter(net, root, delay, &mut stack, &mut last) {
        return last;
    }
    while let Some(frame) = stack.last_mut() {
        let obj = frame.obj;
        if frame.next_child > 0 {
            frame.has_none |= last == LABEL_NONE;
        }
        // Find the next fan-out to classify (delay hook filters the first
        // level to timing-critical edges only).
        let mut child = None;
        while frame.next_child < net.fanout_num(obj) {
            let f = net.fanouts(obj)[frame.next_child];
            frame.next_child += 1;
            if !frame.first || is_delay_critical_fanin(net, f, obj) {
                child = Some(f);
                break;
            }
        }
        match child {
            Some(f) => {
                // `last` must not leak into the child's first observation.
                last = LABEL_ROOT; // overwritten by enter() on every exit path
                if enter(net, f, false, &mut stack, &mut last) {
                    continue;
                }
                // Child settled without recursion; loop feeds it into
                // `has_none` on the next iteration.
            }
            None => {
                let frame = stack.pop().unwrap();
                if frame.has_none && frame.orig == 3 {
                    net.set_trav_diff(obj, LABEL_ROOT);
                } else if !frame.has_none {
                    net.set_trav_diff(obj, LABEL_INNER);
                }
                last = net.trav_diff(obj);
            }
        }
    }
    last
}

/// Extracts the labeled TFO: interior nodes and their roots, both in
/// leaves-first processing order. Empty when the pivot itself is not inner.
fn derive_tfo(
    net: &mut Network,
    pivot: ObjId,
    tfo_lev_max: u32,
    fanout_max: usize,
    delay: bool,
) -> (Vec<ObjId>, Vec<ObjId>) {
    let label = label_tfo(net, pivot, tfo_lev_max, fanout_max, delay);
    let mut tfo = Vec::new();
    let mut roots = Vec::new();
    if label != LABEL_INNER {
        return (tfo, roots);
    }
    // After one more generation: root = 2, inner = 1, visited = 0.
    net.inc_trav_id();
    let mut stack: Vec<(ObjId, bool, bool)> = vec![(pivot, delay, false)];
    while let Some((obj, first, expanded)) = stack.pop() {
        if expanded {
            tfo.push(obj);
            continue;
        }
        let diff = net.trav_diff(obj);
        if net.set_trav_cur(obj) {
            continue;
        }
        if diff == 2 {
            roots.push(obj);
            tfo.push(obj);
            continue;
        }
        debug_assert_eq!(diff, 1);
        stack.push((obj, first, true));
        for k in (0..net.fanout_num(obj)).rev() {
            let f = net.fanouts(obj)[k];
            if !first || is_delay_critical_fanin(net, f, obj) {
                stack.push((f, false, false));
            }
        }
    }
    debug_assert_eq!(tfo.last(), Some(&pivot));
    tfo.pop();
    debug_assert_ne!(roots.last(), Some(&pivot));
    tfo.reverse();
    roots.reverse();
    (tfo, roots)
}

/// Fan-ins of TFO nodes that are neither in the TFO nor the pivot.
fn collect_tfo_side_inputs(net: &mut Network, pivot: ObjId, tfo: &[ObjId]) -> Vec<ObjId> {
    let mut side = Vec::new();
    net.inc_trav_id();
    net.set_trav_cur(pivot);
    for &obj in tfo {
        net.set_trav_cur(obj);
    }
    for &obj in tfo {
        for k in 0..net.fanin_num(obj) {
            let f = net.fanin(obj, k);
            if !net.set_trav_cur(f) && f != pivot {
                side.push(f);
            }
        }
    }
    side
}

/// Collects the extended TFI: divisors first (their count is the divisor
/// prefix), then the cones of the side inputs, then the pivot last. Assumes
/// the divisor-TFO marking sits in the previous traversal generation.
fn collect_extended_tfi(
    net: &mut Network,
    pivot: ObjId,
    divs: &[ObjId],
    side: &[ObjId],
) -> (Vec<ObjId>, usize) {
    let mut tfi = Vec::new();
    net.inc_trav_id();
    // Phase 1: divisor cones, restricted to the previously marked region.
    let mut stack: Vec<(ObjId, bool)> = Vec::new();
    for &seed in divs.iter().chain(std::iter::once(&pivot)) {
        stack.push((seed, false));
        while let Some((obj, expanded)) = stack.pop() {
            if expanded {
                tfi.push(obj);
                continue;
            }
            if !net.is_trav_prev(obj) {
                continue;
            }
            if net.set_trav_cur(obj) {
                continue;
            }
            stack.push((obj, true));
            for k in (0..net.fanin_num(obj)).rev() {
                stack.push((net.fanin(obj, k), false));
            }
        }
    }
    debug_assert_eq!(tfi.last(), Some(&pivot));
    tfi.pop();
    let n_divs = tfi.len();
    // Phase 2: side-input cones; unmarked nodes become leaves.
    for &seed in side {
        stack.push((seed, false));
        while let Some((obj, expanded)) = stack.pop() {
            if expanded {
                tfi.push(obj);
                continue;
            }
            let in_marked = net.is_trav_prev(obj);
            if net.set_trav_cur(obj) {
                continue;
            }
            stack.push((obj, true));
            if in_marked && !net.is_ci(obj) {
                for k in (0..net.fanin_num(obj)).rev() {
                    stack.push((net.fanin(obj, k), false));
                }
            }
        }
    }
    tfi.push(pivot);
    (tfi, n_divs)
}

/// Flags leaves and roots and concatenates TFI, pivot and TFO.
fn assemble(
    net: &mut Network,
    pivot: ObjId,
    tfi: &[ObjId],
    tfo: &[ObjId],
    roots: &[ObjId],
    n_divs: usize,
) -> Window {
    debug_assert_eq!(tfi.last(), Some(&pivot));
    let mut items = Vec::with_capacity(tfi.len() + tfo.len());
    net.inc_trav_id();
    for &obj in tfi {
        net.set_trav_cur(obj);
    }
    for &obj in tfi {
        let outside = (0..net.fanin_num(obj)).any(|k| !net.is_trav_cur(net.fanin(obj, k)));
        items.push(WinItem {
            obj,
            boundary: net.is_ci(obj) || outside,
        });
    }
    let pivot_pos = items.len() - 1;
    debug_assert!(!items[pivot_pos].boundary);
    net.inc_trav_id();
    for &obj in roots {
        net.set_trav_cur(obj);
    }
    for &obj in tfo {
        debug_assert!(!net.is_co(obj));
        items.push(WinItem {
            obj,
            boundary: net.is_trav_cur(obj),
        });
    }
    Window {
        items,
        pivot_pos,
        n_divs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lutopt_core::Network;

    fn pars() -> ResubParams {
        ResubParams::default()
    }

    /// a,b -> z = a&b -> r = z|c -> CO, with c a third CI.
    fn chain() -> (Network, ObjId, ObjId, ObjId, ObjId, ObjId) {
        let mut net = Network::new();
        let a = net.add_ci();
        let b = net.add_ci();
        let c = net.add_ci();
        let z = net.add_lut(&[a, b], 0x8).unwrap();
        let r = net.add_lut(&[z, c], 0xE).unwrap();
        net.add_co(r);
        net.recompute_levels();
        (net, a, b, c, z, r)
    }

    #[test]
    fn window_contains_tfi_pivot_tfo() {
        let (mut net, a, b, c, z, r) = chain();
        let win = build_window(&mut net, z, &pars(), false);
        let objs: Vec<ObjId> = win.items.iter().map(|it| it.obj).collect();
        assert_eq!(win.obj(win.pivot_pos), z);
        assert!(objs.contains(&a));
        assert!(objs.contains(&b));
        assert!(objs.contains(&c));
        assert!(objs.contains(&r));
        // TFI leaves are the CIs; r is in the TFO.
        for it in &win.items[..win.pivot_pos] {
            let is_ci = it.obj == a || it.obj == b || it.obj == c;
            assert_eq!(it.boundary, is_ci, "leaf flag of {}", it.obj);
        }
        assert!(win.items[win.pivot_pos + 1..]
            .iter()
            .any(|it| it.obj == r));
    }

    #[test]
    fn divisor_prefix_covers_pivot_fanins() {
        let (mut net, a, b, _, z, _) = chain();
        let win = build_window(&mut net, z, &pars(), false);
        let divs: Vec<ObjId> = win.items[..win.n_divs].iter().map(|it| it.obj).collect();
        assert!(divs.contains(&a));
        assert!(divs.contains(&b));
        // The pivot is not a divisor of itself.
        assert!(!divs.contains(&z));
    }

    #[test]
    fn pivot_feeding_only_cos_has_empty_tfo() {
        let (mut net, .., r) = chain();
        let win = build_window(&mut net, r, &pars(), false);
        assert_eq!(win.tfo_len(), 0);
        assert_eq!(win.root_count(), 0);
        assert_eq!(win.pivot_pos, win.len() - 1);
    }

    #[test]
    fn interior_pivot_gets_roots() {
        let (mut net, _, _, _, z, r) = chain();
        let win = build_window(&mut net, z, &pars(), false);
        assert_eq!(win.tfo_len(), 1);
        assert_eq!(win.root_count(), 1);
        let root = &win.items[win.pivot_pos + 1];
        assert_eq!(root.obj, r);
        assert!(root.boundary);
    }

    #[test]
    fn window_is_topologically_ordered() {
        let (mut net, .., z, _) = chain();
        let win = build_window(&mut net, z, &pars(), false);
        let pos: std::collections::HashMap<ObjId, usize> = win
            .items
            .iter()
            .enumerate()
            .map(|(i, it)| (it.obj, i))
            .collect();
        for (i, it) in win.items.iter().enumerate() {
            if it.boundary && i < win.pivot_pos {
                continue; // leaves may have fan-ins outside the window
            }
            for k in 0..net.fanin_num(it.obj) {
                let f = net.fanin(it.obj, k);
                assert!(pos[&f] < i, "fan-in {f} of {} out of order", it.obj);
            }
        }
    }

    #[test]
    fn deep_tfo_is_bounded_by_level() {
        // Chain of 5 single-input nodes above the pivot; tfo_lev_max = 2
        // keeps only the first two and turns the boundary into a root.
        let mut net = Network::new();
        let a = net.add_ci();
        let b = net.add_ci();
        let z = net.add_lut(&[a, b], 0x8).unwrap();
        let mut up = z;
        let mut chain = Vec::new();
        for _ in 0..5 {
            up = net.add_lut(&[up, b], 0xE).unwrap();
            chain.push(up);
        }
        net.add_co(up);
        net.recompute_levels();
        let win = build_window(&mut net, z, &pars(), false);
        let tfo_objs: Vec<ObjId> = win.items[win.pivot_pos + 1..]
            .iter()
            .map(|it| it.obj)
            .collect();
        assert!(tfo_objs.contains(&chain[0]));
        assert!(!tfo_objs.contains(&chain[4]));
        assert!(win.root_count() >= 1);
    }
}
