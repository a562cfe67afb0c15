//! The resynthesis engine: per-pivot attempts and the two schedulers.
//!
//! A pivot attempt walks a fixed ladder and stops at the first accepted
//! rewrite: build the window, check the two constants on a one-copy solver,
//! try shrinking the pivot's own support, try a one-node reimplementation,
//! and (area mode, opt-in) a two-node decomposition on the six-copy miter.
//! Every exit path — accepted, rejected or internally inconsistent — leaves
//! the network consistent and the window's scratch marks cleared; an error
//! only ever cancels the attempt it happened in.
//!
//! Area mode sweeps the node ids three times with a descending MFFC-estimate
//! threshold, retrying a node while edits keep landing. Delay mode pops a
//! priority queue keyed by the path product and gives each popped node one
//! attempt.

use lutopt_core::truth::arity_mask;
use lutopt_core::{Network, ObjId};
use tracing::{debug, info, warn};

use crate::error::ResubError;
use crate::extract::compute_function;
use crate::miter::{clear_window_marks, inject_node_cnf, load_copies, window_cnf, WindowCnf};
use crate::params::ResubParams;
use crate::solver::{Lit, SatBox, SolveStatus};
use crate::supp::{find_supp1, find_supp2, find_supp3, DivIdx};
use crate::window::{build_window, Window};

/// A fan-in is area-critical when collapsing it frees it: not a CI and
/// referenced exactly once.
pub(crate) fn is_area_critical(net: &Network, f: ObjId) -> bool {
    !net.is_ci(f) && net.fanout_num(f) == 1
}

/// A fan-in edge lies on a critical path through `obj`.
pub(crate) fn is_delay_critical_fanin(net: &Network, obj: ObjId, f: ObjId) -> bool {
    !net.is_ci(f) && net.level_r(obj) + net.level_d(f) == net.level_max()
}

/// Cheap MFFC size estimate: area-critical direct fan-ins, plus — when there
/// is exactly one — the area-critical fan-ins of that one.
pub(crate) fn mffc_estimate(net: &Network, obj: ObjId) -> usize {
    let mut count = 0;
    let mut critical = None;
    for &f in net.fanins(obj) {
        if is_area_critical(net, f) {
            critical = Some(f);
            count += 1;
        }
    }
    if count != 1 {
        return count;
    }
    let inner = critical.unwrap();
    count
        + net
            .fanins(inner)
            .iter()
            .filter(|&&f| is_area_critical(net, f))
            .count()
}

/// What one pivot attempt did to the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    /// No edit; the network is untouched.
    None,
    /// The pivot became a constant.
    Const,
    /// The pivot kept a strict subset of its fan-ins.
    Reduce,
    /// The pivot was rebuilt over a new ≤K support.
    OneNode,
    /// A new inner node was created and the pivot rebuilt over it.
    TwoNode,
}

/// End-of-run counters.
#[derive(Debug, Default, Clone)]
pub struct ResubStats {
    /// Pivots visited by the scheduler.
    pub nodes: usize,
    /// Windows built (attempts).
    pub wins: usize,
    /// Cumulative window sizes, for averaging.
    pub win_objs_total: usize,
    /// Cumulative divisor counts.
    pub divs_total: usize,
    /// Constant replacements.
    pub n_const: usize,
    /// Fan-in reductions (Supp1).
    pub n_reduce: usize,
    /// One-node reimplementations (Supp2).
    pub n_one_node: usize,
    /// Two-node reimplementations (Supp3).
    pub n_two_node: usize,
    /// Windows skipped for exceeding the size cap.
    pub overflows: usize,
    /// Six-copy attempts started.
    pub two_node_tries: usize,
    /// Solver turned inconsistent inside the two-node commit.
    pub wrong_unsat: usize,
    /// Attempts cancelled by a per-attempt error.
    pub aborted: usize,
}

impl ResubStats {
    pub fn changes(&self) -> usize {
        self.n_const + self.n_reduce + self.n_one_node + self.n_two_node
    }
}

/// Runs the engine over the network in place and returns the counters.
pub fn optimize(net: &mut Network, pars: &ResubParams) -> Result<ResubStats, ResubError> {
    pars.validate()?;
    let mut engine = Engine {
        pars,
        stats: ResubStats::default(),
        supp: Vec::new(),
    };
    if pars.verbose {
        info!(
            mode = if pars.area { "area" } else { "delay" },
            tfi = pars.tfi_lev_max,
            tfo = pars.tfo_lev_max,
            win_max = pars.win_node_max,
            lut_size = pars.lut_size,
            "resynthesis parameters"
        );
    }
    net.clear_all_funcs();
    net.clear_all_cnf();
    if pars.area {
        engine.run_area(net);
    } else {
        engine.run_delay(net);
    }
    let stats = engine.stats;
    if pars.verbose {
        let wins = stats.wins.max(1);
        info!(
            nodes = stats.nodes,
            wins = stats.wins,
            win_avg = stats.win_objs_total / wins,
            div_avg = stats.divs_total / wins,
            changed = stats.changes(),
            consts = stats.n_const,
            reduced = stats.n_reduce,
            one_node = stats.n_one_node,
            two_node = stats.n_two_node,
            overflows = stats.overflows,
            wrong_unsat = stats.wrong_unsat,
            two_node_tries = stats.two_node_tries,
            "resynthesis finished"
        );
    }
    Ok(stats)
}

struct Engine<'a> {
    pars: &'a ResubParams,
    stats: ResubStats,
    supp: Vec<DivIdx>,
}

impl Engine<'_> {
    fn run_area(&mut self, net: &mut Network) {
        let n_objs = net.obj_count();
        let mut visited = vec![false; n_objs];
        net.recompute_levels();
        for threshold in (0..3usize).rev() {
            for id in 0..n_objs {
                let obj = ObjId::from(id);
                if !net.is_node(obj) || visited[id] {
                    continue;
                }
                if mffc_estimate(net, obj) < threshold {
                    continue;
                }
                if self.pars.nodes_max > 0 && self.stats.nodes >= self.pars.nodes_max {
                    return;
                }
                self.stats.nodes += 1;
                // Keep squeezing the same node while edits land.
                loop {
                    match self.opt_node(net, obj) {
                        Ok(Change::None) => break,
                        Ok(_) => {
                            if !net.is_node(obj) || net.fanin_num(obj) == 0 {
                                break;
                            }
                        }
                        Err(e) => {
                            self.stats.aborted += 1;
                            debug!(node = %obj, error = %e, "attempt cancelled");
                            break;
                        }
                    }
                }
                visited[id] = true;
            }
        }
    }

    fn run_delay(&mut self, net: &mut Network) {
        net.refresh_timing();
        while let Some(obj) = net.pop_critical() {
            if !net.is_node(obj) {
                continue; // deleted while queued
            }
            if self.pars.nodes_max > 0 && self.stats.nodes >= self.pars.nodes_max {
                return;
            }
            self.stats.nodes += 1;
            if let Err(e) = self.opt_node(net, obj) {
                self.stats.aborted += 1;
                debug!(node = %obj, error = %e, "attempt cancelled");
            }
        }
    }

    /// One pivot attempt. Never leaves a partial mutation behind.
    pub(crate) fn opt_node(&mut self, net: &mut Network, pivot: ObjId) -> Result<Change, ResubError> {
        if net.fanout_num(pivot) == 0 {
            return Ok(Change::None); // dangling pivots are skipped silently
        }
        self.stats.wins += 1;
        let win = build_window(net, pivot, self.pars, !self.pars.area);
        self.stats.win_objs_total += win.len();
        self.stats.divs_total += win.n_divs;
        if self.pars.very_verbose {
            debug!(
                node = %pivot,
                window = win.len(),
                divisors = win.n_divs,
                "window built"
            );
        }
        if win.len() > self.pars.win_node_max {
            self.stats.overflows += 1;
            return Ok(Change::None);
        }
        let cnf = window_cnf(net, &win);
        let result = self.try_strategies(net, pivot, &win, &cnf);
        clear_window_marks(net, &win);
        result
    }

    fn try_strategies(
        &mut self,
        net: &mut Network,
        pivot: ObjId,
        win: &Window,
        cnf: &WindowCnf,
    ) -> Result<Change, ResubError> {
        let pivot_var = win.pivot_pos;
        let n_divs = win.n_divs;
        let v = cnf.n_vars;

        let mut sat0 = SatBox::new(self.pars.bt_limit)?;
        load_copies(&mut sat0, cnf, pivot_var, n_divs, 1)?;

        // Constants first: is the pivot ever observed at value c?
        for c in [false, true] {
            match sat0.solve(&[Lit::new(pivot_var, c)])? {
                SolveStatus::Unsat => {
                    self.stats.n_const += 1;
                    debug!(node = %pivot, value = c, "constant found");
                    net.update_node(pivot, u64::from(c), None);
                    return Ok(Change::Const);
                }
                SolveStatus::Sat => {}
                SolveStatus::Undecided => return Err(ResubError::Undecided),
            }
        }

        let mut sat1 = SatBox::new(self.pars.bt_limit)?;
        load_copies(&mut sat1, cnf, pivot_var, n_divs, 2)?;

        if self.pars.area {
            let mut supp = std::mem::take(&mut self.supp);
            let found = find_supp1(net, pivot, &mut sat1, v, n_divs, &mut supp);
            self.supp = supp;
            if found? {
                if self.supp.is_empty() {
                    self.stats.n_const += 1;
                } else {
                    self.stats.n_reduce += 1;
                }
                debug_assert!(self.supp.len() < self.pars.lut_size);
                self.commit_single(net, pivot, win, &mut sat0)?;
                return Ok(Change::Reduce);
            }
        }

        if mffc_estimate(net, pivot) >= 1 {
            let mut supp = std::mem::take(&mut self.supp);
            let found = find_supp2(
                net,
                pivot,
                &mut sat1,
                v,
                n_divs,
                &mut supp,
                self.pars.lut_size,
                !self.pars.area,
            );
            self.supp = supp;
            if found? {
                debug_assert!(self.supp.len() <= self.pars.lut_size);
                self.stats.n_one_node += 1;
                self.commit_single(net, pivot, win, &mut sat0)?;
                return Ok(Change::OneNode);
            }
        }

        if self.pars.area && self.pars.use_ashen && mffc_estimate(net, pivot) >= 2 {
            self.stats.two_node_tries += 1;
            let mut sat2 = SatBox::new(self.pars.bt_limit)?;
            load_copies(&mut sat2, cnf, pivot_var, n_divs, 6)?;
            let mut supp = std::mem::take(&mut self.supp);
            let found = find_supp3(
                net,
                pivot,
                &mut sat2,
                v,
                n_divs,
                &mut supp,
                self.pars.lut_size,
                !self.pars.area,
            );
            self.supp = supp;
            let n_keep = found?;
            if n_keep > 0 {
                return self.commit_two_node(net, pivot, win, v, n_keep, &mut sat0, &mut sat1);
            }
        }

        Ok(Change::None)
    }

    /// Extracts the function over the minimized support on the one-copy
    /// solver and rewrites the pivot.
    fn commit_single(
        &mut self,
        net: &mut Network,
        pivot: ObjId,
        win: &Window,
        sat0: &mut SatBox,
    ) -> Result<(), ResubError> {
        // Divisor indices are first-copy variables as-is.
        let free = sat0.var_count() - 1;
        let truth = compute_function(sat0, win.pivot_pos, free, &self.supp, false)?;
        let support: Vec<ObjId> = self.supp.iter().map(|&d| win.obj(d)).collect();
        debug!(node = %pivot, support = support.len(), truth, "rewriting node");
        if support.is_empty() {
            net.update_node(pivot, truth, None);
        } else {
            net.update_node(pivot, truth, Some(&support));
        }
        Ok(())
    }

    /// Two-node commit: recover the inner node's function from the two-copy
    /// solver, materialize it, then rebuild the pivot over kept fan-ins plus
    /// the new node using the one-copy solver's spare variable.
    #[allow(clippy::too_many_arguments)]
    fn commit_two_node(
        &mut self,
        net: &mut Network,
        pivot: ObjId,
        win: &Window,
        v: usize,
        n_keep: usize,
        sat0: &mut SatBox,
        sat1: &mut SatBox,
    ) -> Result<Change, ResubError> {
        let n_inner = self.supp.len() - n_keep;
        debug_assert!(n_keep < self.pars.lut_size);
        debug_assert!(n_inner <= self.pars.lut_size);
        debug!(node = %pivot, kept = n_keep, inner = n_inner, "two-node candidate");

        // Freeze divisor agreement for the kept fan-ins in the 2-copy miter.
        let mut inconsistent = false;
        for &d in &self.supp[n_inner..] {
            debug_assert!(d < win.n_divs);
            if !sat1.add_clause(&[Lit::pos(2 * v + d)])? {
                inconsistent = true;
            }
        }
        if !inconsistent {
            match sat1.solve(&[])? {
                SolveStatus::Sat => {}
                _ => inconsistent = true,
            }
        }
        if inconsistent {
            self.stats.wrong_unsat += 1;
            warn!(node = %pivot, "two-copy instance closed during the two-node commit");
            return Ok(Change::None);
        }
        let compl = !sat1.value(win.pivot_pos)?;
        // Pin the second copy of every inner candidate to the model, except
        // divisors that also appear among the kept fan-ins.
        for i in 0..n_inner {
            let d = self.supp[i];
            if self.supp[n_inner..].contains(&d) {
                debug!(node = %pivot, divisor = d, "divisor shared between blocks");
                continue;
            }
            let lit = sat1.model_literal(v + d)?;
            if !sat1.add_clause(&[lit])? {
                inconsistent = true;
            }
        }
        if inconsistent {
            self.stats.wrong_unsat += 1;
            warn!(node = %pivot, "two-copy instance closed during the two-node commit");
            return Ok(Change::None);
        }

        let free1 = sat1.var_count() - 1;
        let inner_divs: Vec<DivIdx> = self.supp[..n_inner].to_vec();
        let alpha = compute_function(sat1, win.pivot_pos, free1, &inner_divs, compl)?;
        if alpha == 0 || alpha == arity_mask(n_inner) {
            debug!(node = %pivot, "inner function degenerated to a constant");
            return Ok(Change::None);
        }

        let inner_support: Vec<ObjId> = inner_divs.iter().map(|&d| win.obj(d)).collect();
        let inner_node = net.create_node(alpha, &inner_support);
        let spare = sat0.var_count() - 2;
        let mut beta_vars: Vec<usize> = self.supp[n_inner..].to_vec();
        beta_vars.push(spare);
        let free0 = sat0.var_count() - 1;
        let beta = match inject_node_cnf(net, inner_node, sat0, spare)
            .and_then(|()| compute_function(sat0, win.pivot_pos, free0, &beta_vars, false))
        {
            Ok(t) => t,
            Err(e) => {
                // Sweep the orphan so no partial mutation survives the abort.
                net.update_node(inner_node, 0, None);
                return Err(e);
            }
        };

        let mut support: Vec<ObjId> = self.supp[n_inner..].iter().map(|&d| win.obj(d)).collect();
        support.push(inner_node);
        debug!(
            node = %pivot,
            inner = %inner_node,
            alpha,
            beta,
            "two-node rewrite"
        );
        net.update_node(pivot, beta, Some(&support));
        self.stats.n_two_node += 1;
        Ok(Change::TwoNode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mffc_estimate_counts_critical_fanins() {
        let mut net = Network::new();
        let a = net.add_ci();
        let b = net.add_ci();
        let c = net.add_ci();
        // g is referenced once (critical); its fan-in h also once.
        let h = net.add_lut(&[a, b], 0x8).unwrap();
        let g = net.add_lut(&[h, c], 0xE).unwrap();
        let z = net.add_lut(&[g, a], 0x6).unwrap();
        net.add_co(z);
        assert!(is_area_critical(&net, g));
        assert!(is_area_critical(&net, h));
        assert!(!is_area_critical(&net, a));
        // z: one critical fan-in (g), which has one critical fan-in (h).
        assert_eq!(mffc_estimate(&net, z), 2);
        // g: one critical fan-in (h) whose fan-ins are CIs.
        assert_eq!(mffc_estimate(&net, g), 1);
    }

    #[test]
    fn delay_criticality_uses_levels() {
        let mut net = Network::new();
        let a = net.add_ci();
        let b = net.add_ci();
        let g = net.add_lut(&[a, b], 0x8).unwrap();
        let z = net.add_lut(&[g, b], 0x6).unwrap();
        net.add_co(z);
        net.refresh_timing();
        assert!(is_delay_critical_fanin(&net, z, g));
        assert!(!is_delay_critical_fanin(&net, z, b)); // b is a CI
    }
}
