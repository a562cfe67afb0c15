//! Support-finding strategies.
//!
//! All three strategies drive the same machinery: turn on a candidate subset
//! of the divisor-equality controls as assumptions, require UNSAT (the pivot
//! is then a function of the selected divisors wherever the window can
//! observe it), and minimize the assumption set. Results are divisor indices
//! — positions in the window's divisor prefix, which are also the first-copy
//! SAT variables of those divisors.
//!
//! - `find_supp1` keeps only the pivot's own fan-ins and asks whether fewer
//!   suffice (possibly none: a constant).
//! - `find_supp2` rebuilds the pivot over one collapsed area-critical fan-in
//!   (area) or over the fan-ins of its timing-critical fan-ins (delay),
//!   accepting supports of size ≤ K.
//! - `find_supp3` works on the six-copy miter: for a pair of collapsed
//!   fan-ins it splits candidates into two control groups, yielding a
//!   two-node decomposition (new inner node + rebuilt pivot).

use lutopt_core::{Network, ObjId};
use tracing::warn;

use crate::engine::{is_area_critical, is_delay_critical_fanin};
use crate::error::ResubError;
use crate::solver::{Lit, SatBox, SolveStatus, Var};

/// Divisor index inside the window prefix.
pub type DivIdx = usize;

fn div_index(net: &Network, obj: ObjId, n_divs: usize) -> DivIdx {
    let f = net.func(obj);
    debug_assert!(
        f >= 0 && (f as usize) < n_divs,
        "fan-in outside divisor prefix"
    );
    let _ = n_divs;
    f as DivIdx
}

/// Candidates must sit in the divisor prefix; a tight TFI budget can leave a
/// grand-fan-in outside it, in which case the candidate set is unusable.
fn in_divisors(net: &Network, objs: &[ObjId], n_divs: usize) -> bool {
    objs.iter()
        .all(|&o| net.func(o) >= 0 && (net.func(o) as usize) < n_divs)
}

/// Descending fan-out count; high-fanout (shared) divisors survive
/// minimization first.
fn order_by_fanout(net: &Network, objs: &mut [ObjId]) {
    objs.sort_by_key(|&o| std::cmp::Reverse(net.fanout_num(o)));
}

/// Tries to re-express the pivot over a strict subset of its own fan-ins.
/// On success `supp` holds the minimized divisor indices.
pub fn find_supp1(
    net: &Network,
    pivot: ObjId,
    sat: &mut SatBox,
    n_vars: usize,
    n_divs: usize,
    supp: &mut Vec<DivIdx>,
) -> Result<bool, ResubError> {
    let mut objs: Vec<ObjId> = net.fanins(pivot).to_vec();
    order_by_fanout(net, &mut objs);
    let mut lits: Vec<Lit> = objs
        .iter()
        .map(|&o| Lit::pos(2 * n_vars + div_index(net, o, n_divs)))
        .collect();
    let status = sat.solve(&lits)?;
    if status == SolveStatus::Undecided {
        return Err(ResubError::Undecided);
    }
    if status != SolveStatus::Unsat {
        warn!(node = %pivot, "own-fanin support check was not UNSAT");
        return Err(ResubError::UnexpectedSat("own-fanin support check"));
    }
    sat.minimize_assumptions(&mut lits)?;
    supp.clear();
    supp.extend(lits.iter().map(|l| l.var() - 2 * n_vars));
    Ok(supp.len() < net.fanin_num(pivot))
}

/// Tries a one-node reimplementation of size ≤ `lut_size`.
pub fn find_supp2(
    net: &Network,
    pivot: ObjId,
    sat: &mut SatBox,
    n_vars: usize,
    n_divs: usize,
    supp: &mut Vec<DivIdx>,
    lut_size: usize,
    delay: bool,
) -> Result<bool, ResubError> {
    if delay {
        return find_supp2_delay(net, pivot, sat, n_vars, n_divs, supp, lut_size);
    }
    // One area-critical fan-in at a time: replace it by its own fan-ins.
    for k in 0..net.fanin_num(pivot) {
        let crit = net.fanin(pivot, k);
        if !is_area_critical(net, crit) {
            continue;
        }
        let mut objs: Vec<ObjId> = net
            .fanins(pivot)
            .iter()
            .copied()
            .filter(|&f| f != crit)
            .collect();
        for &f2 in net.fanins(crit) {
            if !objs.contains(&f2) {
                objs.push(f2);
            }
        }
        objs.sort_by_key(|&o| net.level_d(o));
        if !in_divisors(net, &objs, n_divs) {
            continue;
        }
        let mut lits: Vec<Lit> = objs
            .iter()
            .map(|&o| Lit::pos(2 * n_vars + div_index(net, o, n_divs)))
            .collect();
        let status = sat.solve(&lits)?;
        if status == SolveStatus::Undecided {
            return Err(ResubError::Undecided);
        }
        if status != SolveStatus::Unsat {
            warn!(node = %pivot, "collapsed-fanin support check was not UNSAT");
            return Err(ResubError::UnexpectedSat("collapsed-fanin support check"));
        }
        sat.minimize_assumptions(&mut lits)?;
        if lits.len() <= lut_size {
            supp.clear();
            supp.extend(lits.iter().map(|l| l.var() - 2 * n_vars));
            return Ok(true);
        }
    }
    Ok(false)
}

/// Delay flavor: drop every timing-critical fan-in, pull in their fan-ins,
/// and minimize.
fn find_supp2_delay(
    net: &Network,
    pivot: ObjId,
    sat: &mut SatBox,
    n_vars: usize,
    n_divs: usize,
    supp: &mut Vec<DivIdx>,
    lut_size: usize,
) -> Result<bool, ResubError> {
    debug_assert!(net.level_d(pivot) > 1);
    let mut objs: Vec<ObjId> = net
        .fanins(pivot)
        .iter()
        .copied()
        .filter(|&f| !is_delay_critical_fanin(net, pivot, f))
        .collect();
    let n_non_crit = objs.len();
    for k in 0..net.fanin_num(pivot) {
        let f = net.fanin(pivot, k);
        if !is_delay_critical_fanin(net, pivot, f) {
            continue;
        }
        for &f2 in net.fanins(f) {
            if !objs.contains(&f2) {
                objs.push(f2);
            }
        }
    }
    // A stale queue entry may have lost its critical fan-ins; the candidate
    // then degenerates to the node's own support, which still solves.
    objs[n_non_crit..].sort_by_key(|&o| net.level_d(o));
    if !in_divisors(net, &objs, n_divs) {
        return Ok(false);
    }
    let mut lits: Vec<Lit> = objs
        .iter()
        .map(|&o| Lit::pos(2 * n_vars + div_index(net, o, n_divs)))
        .collect();
    let status = sat.solve(&lits)?;
    if status == SolveStatus::Undecided {
        return Err(ResubError::Undecided);
    }
    if status != SolveStatus::Unsat {
        warn!(node = %pivot, "depth-reducing support check was not UNSAT");
        return Err(ResubError::UnexpectedSat("depth-reducing support check"));
    }
    sat.minimize_assumptions(&mut lits)?;
    supp.clear();
    supp.extend(lits.iter().map(|l| l.var() - 2 * n_vars));
    Ok(supp.len() <= lut_size)
}

/// Tries a two-node reimplementation on the six-copy miter.
///
/// On success returns `n_keep ≥ 1` and fills `supp` with
/// `[inner-node inputs ..., kept fan-ins ...]` (divisor indices): the last
/// `n_keep` entries are the fan-ins the rebuilt pivot keeps, the first
/// `len - n_keep ≤ lut_size` entries feed the new inner node. Returns 0 when
/// no pair decomposes.
pub fn find_supp3(
    net: &Network,
    pivot: ObjId,
    sat: &mut SatBox,
    n_vars: usize,
    n_divs: usize,
    supp: &mut Vec<DivIdx>,
    lut_size: usize,
    delay: bool,
) -> Result<usize, ResubError> {
    if delay {
        return Ok(0);
    }
    // Ordered pairs of area-critical fan-ins.
    for k in 0..net.fanin_num(pivot) {
        let f1 = net.fanin(pivot, k);
        if !is_area_critical(net, f1) {
            continue;
        }
        for k2 in 0..net.fanin_num(pivot) {
            let f2 = net.fanin(pivot, k2);
            if k2 == k || !is_area_critical(net, f2) {
                continue;
            }
            debug_assert_ne!(f1, f2);
            let kept: Vec<ObjId> = net
                .fanins(pivot)
                .iter()
                .copied()
                .filter(|&f| f != f1 && f != f2)
                .collect();
            let mut inner: Vec<ObjId> = net.fanins(f1).to_vec();
            for &f in net.fanins(f2) {
                if !inner.contains(&f) {
                    inner.push(f);
                }
            }
            // A non-decomposable pair is simply skipped.
            if let Some(n_keep) = try_pair(
                net, sat, n_vars, n_divs, &kept, &inner, supp, lut_size, false,
            )? {
                return Ok(n_keep);
            }
        }
    }
    // Pairs of an area-critical fan-in with one of its own area-critical
    // fan-ins; collapsing the chain is always expressible, so a satisfiable
    // check here is an internal inconsistency.
    for k in 0..net.fanin_num(pivot) {
        let f1 = net.fanin(pivot, k);
        if !is_area_critical(net, f1) {
            continue;
        }
        for k2 in 0..net.fanin_num(f1) {
            let f2 = net.fanin(f1, k2);
            if !is_area_critical(net, f2) {
                continue;
            }
            debug_assert_ne!(f1, f2);
            let kept: Vec<ObjId> = net
                .fanins(pivot)
                .iter()
                .copied()
                .filter(|&f| f != f1 && f != f2)
                .collect();
            let mut inner: Vec<ObjId> = net
                .fanins(f1)
                .iter()
                .copied()
                .filter(|&f| f != f2)
                .collect();
            for &f in net.fanins(f2) {
                if !inner.contains(&f) {
                    inner.push(f);
                }
            }
            if let Some(n_keep) = try_pair(
                net, sat, n_vars, n_divs, &kept, &inner, supp, lut_size, true,
            )? {
                return Ok(n_keep);
            }
        }
    }
    Ok(0)
}

/// Solves one Supp3 candidate. `kept` rides the first control group (tying
/// even copy pairs), `inner` the second (tying odd pairs). Returns the kept
/// count on acceptance, `None` to move on to the next pair.
#[allow(clippy::too_many_arguments)]
fn try_pair(
    net: &Network,
    sat: &mut SatBox,
    n_vars: usize,
    n_divs: usize,
    kept: &[ObjId],
    inner: &[ObjId],
    supp: &mut Vec<DivIdx>,
    lut_size: usize,
    expect_unsat: bool,
) -> Result<Option<usize>, ResubError> {
    if !in_divisors(net, kept, n_divs) || !in_divisors(net, inner, n_divs) {
        return Ok(None);
    }
    let mut lits: Vec<Lit> = kept
        .iter()
        .map(|&o| Lit::pos(6 * n_vars + div_index(net, o, n_divs)))
        .collect();
    for &o in inner {
        let lit = Lit::pos(6 * n_vars + n_divs + div_index(net, o, n_divs));
        if !lits.contains(&lit) {
            lits.push(lit);
        }
    }
    let status = sat.solve(&lits)?;
    if status == SolveStatus::Undecided {
        return Err(ResubError::Undecided);
    }
    if status != SolveStatus::Unsat {
        if expect_unsat {
            warn!("chain-collapse decomposition check was not UNSAT");
            return Err(ResubError::UnexpectedSat("chain-collapse decomposition"));
        }
        return Ok(None);
    }
    sat.minimize_assumptions(&mut lits)?;
    // Inner-group controls carry larger variable ids; descending order puts
    // the inner block first, the kept block last.
    let mut vars: Vec<Var> = lits.iter().map(|l| l.var() - 6 * n_vars).collect();
    vars.sort_unstable_by(|a, b| b.cmp(a));
    let mut n_keep = 0;
    supp.clear();
    for v in vars {
        if v >= n_divs {
            supp.push(v - n_divs);
        } else {
            supp.push(v);
            n_keep += 1;
        }
    }
    if n_keep == 0 {
        // The pivot collapsed into a single new node; the one-node
        // strategies own that case.
        return Ok(None);
    }
    if supp.len() - n_keep <= lut_size {
        return Ok(Some(n_keep));
    }
    Ok(None)
}
