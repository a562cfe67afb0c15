//! Truth-table recovery from the solver.
//!
//! Enumerates onset minterms of the pivot over a fixed set of divisor
//! variables: each satisfiable solve under `{pivot = 1, free = 1}` yields one
//! minterm, which is folded into the accumulating table and excluded by a
//! blocking clause guarded on the free variable. UNSAT (or a blocking clause
//! that closes the instance) ends the enumeration. At most `2^|divs| ≤ 64`
//! models exist, so the loop is strictly bounded.

use lutopt_core::truth::{arity_mask, VAR_MASKS};

use crate::error::ResubError;
use crate::solver::{Lit, SatBox, SolveStatus, Var};

/// Computes the pivot's onset over `div_vars` (≤ 6 variables), complemented
/// when `compl` is set. `free_var` must be otherwise unconstrained; it keys
/// the blocking clauses so the instance stays reusable.
pub fn compute_function(
    sat: &mut SatBox,
    pivot_var: Var,
    free_var: Var,
    div_vars: &[Var],
    compl: bool,
) -> Result<u64, ResubError> {
    debug_assert!(div_vars.len() <= 6);
    debug_assert!(free_var < sat.var_count());
    let mask = arity_mask(div_vars.len());
    let assumptions = [Lit::new(pivot_var, compl), Lit::pos(free_var)];
    let mut truth = 0u64;
    // One iteration per distinct minterm, plus the closing UNSAT.
    for _ in 0..=64 {
        match sat.solve(&assumptions)? {
            SolveStatus::Unsat => return Ok(truth & mask),
            SolveStatus::Undecided => return Err(ResubError::Undecided),
            SolveStatus::Sat => {}
        }
        let mut blocking = Vec::with_capacity(div_vars.len() + 1);
        blocking.push(Lit::neg(free_var));
        let mut cube = !0u64;
        for (i, &var) in div_vars.iter().enumerate() {
            let value = sat.value(var)?;
            // Negation of the model literal.
            blocking.push(Lit::new(var, value));
            cube &= if value { VAR_MASKS[i] } else { !VAR_MASKS[i] };
        }
        truth |= cube;
        if !sat.add_clause(&blocking)? {
            return Ok(truth & mask);
        }
    }
    Err(ResubError::UnexpectedSat("function extraction"))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Encodes `out = f(inputs)` directly as clauses over vars
    /// [inputs..., out] and leaves `free` unconstrained.
    fn gate(truth: u64, n: usize) -> (SatBox, Vec<Var>, Var, Var) {
        let mut sat = SatBox::new(0).unwrap();
        let out = n;
        let free = n + 1;
        sat.set_var_count(n + 2).unwrap();
        for m in 0..(1usize << n) {
            let bit = (truth >> m) & 1 != 0;
            let mut clause: Vec<Lit> = (0..n)
                .map(|k| Lit::new(k, (m >> k) & 1 != 0))
                .collect();
            clause.push(Lit::new(out, !bit));
            sat.add_clause(&clause).unwrap();
        }
        (sat, (0..n).collect(), out, free)
    }

    #[test]
    fn recovers_and_gate() {
        let (mut sat, divs, out, free) = gate(0x8, 2);
        let t = compute_function(&mut sat, out, free, &divs, false).unwrap();
        assert_eq!(t, 0x8);
    }

    #[test]
    fn recovers_complement() {
        let (mut sat, divs, out, free) = gate(0x8, 2);
        let t = compute_function(&mut sat, out, free, &divs, true).unwrap();
        assert_eq!(t, 0x7);
    }

    #[test]
    fn recovers_xor_of_three() {
        let (mut sat, divs, out, free) = gate(0x96, 3);
        let t = compute_function(&mut sat, out, free, &divs, false).unwrap();
        assert_eq!(t, 0x96);
    }

    #[test]
    fn constant_zero_function() {
        let (mut sat, divs, out, free) = gate(0, 2);
        let t = compute_function(&mut sat, out, free, &divs, false).unwrap();
        assert_eq!(t, 0);
    }

    #[test]
    fn projection_onto_subset_of_vars() {
        // out = x0 & x1; enumerate over [x0] only: onset projects to x0 = 1.
        let (mut sat, _, out, free) = gate(0x8, 2);
        let t = compute_function(&mut sat, out, free, &[0], false).unwrap();
        assert_eq!(t, 0b10);
    }
}
