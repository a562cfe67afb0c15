//! Window CNF and multi-copy miter construction.
//!
//! The window array doubles as the SAT variable numbering of the first copy:
//! entry `i` is variable `i`. Above the window sit the duplicated-TFO
//! variables (one per TFO entry) and one XOR output per root, so one copy
//! occupies `V = |window| + |TFO| + |roots|` variables. The duplicated TFO
//! reads the pivot complemented, every root is XORed against its duplicate,
//! and one clause asks that some root differ — a satisfying assignment of a
//! copy is therefore an input pattern on which the pivot's value is
//! observable at a root.
//!
//! Copies are stacked by lifting variables in steps of `V`; odd copies read
//! the pivot variable of the preceding even copy, complemented, which chains
//! pairs of copies into "original vs. modified" miters. Controlled equality
//! buffers between the divisor variables of adjacent copies let the support
//! strategies switch divisor agreement on and off through assumptions.

use lutopt_core::{cnf_lit_compl, cnf_lit_var, clauses, Network, ObjId, CNF_END};
use tracing::warn;

use crate::error::ResubError;
use crate::solver::{Lit, SatBox, Var};
use crate::window::Window;

/// Clauses of one window copy over variables `0..n_vars`.
#[derive(Debug, Clone)]
pub struct WindowCnf {
    /// Variables per copy: window + duplicated TFO + root XORs.
    pub n_vars: usize,
    pub clauses: Vec<Vec<Lit>>,
}

/// Derives the window CNF and marks every window object with its variable id.
/// The marks stay assigned until [`clear_window_marks`] runs.
pub fn window_cnf(net: &mut Network, win: &Window) -> WindowCnf {
    let w = win.len();
    let n_tfo = win.tfo_len();
    let n_roots = win.root_count();
    let pivot_var = win.pivot_pos;

    for (i, item) in win.items.iter().enumerate() {
        net.set_func(item.obj, i as i32);
    }
    let mut out = WindowCnf {
        n_vars: w + n_tfo + n_roots,
        clauses: Vec::new(),
    };
    // Window logic; TFI leaves stay unconstrained.
    for (i, item) in win.items.iter().enumerate() {
        if item.boundary && i < win.pivot_pos {
            continue;
        }
        debug_assert!(!net.is_terminal(item.obj));
        net.ensure_cnf(item.obj);
        let vars = node_vars(net, item.obj, i);
        translate(net, item.obj, &vars, None, &mut out.clauses);
    }
    // Duplicated TFO: same logic shifted above the window, reading the pivot
    // complemented.
    for (i, item) in win.items.iter().enumerate().skip(win.pivot_pos + 1) {
        let mut vars = node_vars(net, item.obj, i);
        for v in &mut vars {
            if *v > pivot_var {
                *v += n_tfo;
            }
        }
        *vars.last_mut().unwrap() = i + n_tfo;
        translate(net, item.obj, &vars, Some(pivot_var), &mut out.clauses);
    }
    // Root XORs plus the "some root differs" clause.
    if n_roots > 0 {
        let mut xor_var = w + n_tfo;
        let mut any = Vec::with_capacity(n_roots);
        for (i, item) in win.items.iter().enumerate().skip(win.pivot_pos + 1) {
            if !item.boundary {
                continue;
            }
            let a = i;
            let b = i + n_tfo;
            let x = xor_var;
            xor_var += 1;
            out.clauses.push(vec![Lit::neg(a), Lit::pos(b), Lit::pos(x)]);
            out.clauses.push(vec![Lit::pos(a), Lit::neg(b), Lit::pos(x)]);
            out.clauses.push(vec![Lit::pos(a), Lit::pos(b), Lit::neg(x)]);
            out.clauses.push(vec![Lit::neg(a), Lit::neg(b), Lit::neg(x)]);
            any.push(Lit::pos(x));
        }
        debug_assert_eq!(xor_var, out.n_vars);
        out.clauses.push(any);
    }
    out
}

/// Variable list of a node's CNF: fan-in variables then the output variable.
fn node_vars(net: &Network, obj: ObjId, out_var: Var) -> Vec<Var> {
    let mut vars: Vec<Var> = net
        .fanins(obj)
        .iter()
        .map(|&f| {
            debug_assert!(net.func(f) >= 0);
            net.func(f) as Var
        })
        .collect();
    vars.push(out_var);
    vars
}

/// Expands a node's cached CNF byte string through a variable list,
/// complementing references to `flip_var` when given.
fn translate(
    net: &Network,
    obj: ObjId,
    vars: &[Var],
    flip_var: Option<Var>,
    out: &mut Vec<Vec<Lit>>,
) {
    for clause in clauses(net.cnf(obj)) {
        let lits = clause
            .iter()
            .map(|&b| {
                debug_assert_ne!(b, CNF_END);
                let var = vars[cnf_lit_var(b)];
                let compl = cnf_lit_compl(b) ^ (flip_var == Some(var));
                Lit::new(var, compl)
            })
            .collect();
        out.push(lits);
    }
}

/// Adds the CNF of a single (freshly created) node to a live solver, with
/// fan-in variables taken from the window marks and the given output var.
pub fn inject_node_cnf(
    net: &mut Network,
    obj: ObjId,
    sat: &mut SatBox,
    out_var: Var,
) -> Result<(), ResubError> {
    net.ensure_cnf(obj);
    let vars = node_vars(net, obj, out_var);
    let mut buf = Vec::new();
    translate(net, obj, &vars, None, &mut buf);
    for clause in &buf {
        if !sat.add_clause(clause)? {
            warn!(node = %obj, "solver became inconsistent while adding a node's clauses");
        }
    }
    Ok(())
}

/// Loads `n_times` copies of the window CNF (1, 2 or 6) plus the controlled
/// divisor-equality buffers into an empty solver, then simplifies.
pub fn load_copies(
    sat: &mut SatBox,
    cnf: &WindowCnf,
    pivot_var: Var,
    n_divs: usize,
    n_times: usize,
) -> Result<(), ResubError> {
    assert!(matches!(n_times, 1 | 2 | 6));
    let v = cnf.n_vars;
    let n_groups = if n_times <= 2 { n_times - 1 } else { 2 };
    let n_rounds = if n_times <= 2 { n_times - 1 } else { n_times };
    sat.set_var_count(n_times * v + n_groups * n_divs + 2)?;

    let mut buf: Vec<Lit> = Vec::new();
    for n in 0..n_times {
        let flip = n & 1 == 1;
        for clause in &cnf.clauses {
            buf.clear();
            for &lit in clause {
                let mapped = if flip && lit.var() == pivot_var {
                    // Odd copies read the preceding copy's pivot, inverted.
                    Lit::new((n - 1) * v + pivot_var, !lit.is_compl())
                } else {
                    Lit::new(n * v + lit.var(), lit.is_compl())
                };
                buf.push(mapped);
            }
            if !sat.add_clause(&buf)? {
                warn!("solver became inconsistent while loading window copies");
            }
        }
    }
    for n in 0..n_rounds {
        let base_a = n * v;
        let base_b = ((n + 1) % n_times) * v;
        let base_c = n_times * v + (n & 1) * n_divs;
        for i in 0..n_divs {
            if !sat.add_buffer_enable(base_a + i, base_b + i, base_c + i, false)? {
                warn!("solver became inconsistent while adding equality buffers");
            }
        }
    }
    sat.simplify()?;
    Ok(())
}

/// Restores the SAT-variable marks of the window objects.
pub fn clear_window_marks(net: &mut Network, win: &Window) {
    for item in &win.items {
        debug_assert!(net.func(item.obj) >= 0);
        net.clear_func(item.obj);
    }
}
