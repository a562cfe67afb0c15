//! Incremental SAT adapter.
//!
//! Wraps `satgalaxy`'s PicoSAT binding behind the small surface the engine
//! consumes: pre-sized variable ranges, clause addition with inconsistency
//! detection, budgeted solving under assumptions, assumption minimization,
//! model queries, and the controlled equality buffer. Variables are 0-based
//! `usize`; literals pack `(var << 1) | polarity` and convert to 1-based
//! DIMACS at the boundary.
//!
//! The backend clears its assumption set after every solve, so each call
//! re-assumes from scratch; a "restart" between pivot attempts is simply a
//! fresh instance (the binding resets the underlying solver on drop).

use satgalaxy::solver::{PicoSATSolver, RawStatus, SatSolver};

use crate::error::ResubError;

/// 0-based SAT variable index.
pub type Var = usize;

/// Packed literal: `(var << 1) | polarity`, polarity 1 = complemented.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Lit(u32);

impl Lit {
    pub fn new(var: Var, compl: bool) -> Self {
        Lit(((var as u32) << 1) | u32::from(compl))
    }

    pub fn pos(var: Var) -> Self {
        Lit::new(var, false)
    }

    pub fn neg(var: Var) -> Self {
        Lit::new(var, true)
    }

    pub fn var(self) -> Var {
        (self.0 >> 1) as Var
    }

    pub fn is_compl(self) -> bool {
        self.0 & 1 != 0
    }

    pub fn compl(self) -> Lit {
        Lit(self.0 ^ 1)
    }

    fn to_dimacs(self) -> i32 {
        let v = self.var() as i32 + 1;
        if self.is_compl() {
            -v
        } else {
            v
        }
    }
}

impl std::fmt::Debug for Lit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", if self.is_compl() { "!" } else { "" }, self.var())
    }
}

/// Verdict of a budgeted solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    Sat,
    Unsat,
    Undecided,
}

/// One SAT instance with a fixed variable range.
pub struct SatBox {
    inner: PicoSATSolver,
    n_vars: usize,
    /// Decision limit per solve call; -1 = unlimited.
    limit: i32,
}

impl SatBox {
    /// Creates an empty instance. `bt_limit` of 0 means no per-call budget.
    pub fn new(bt_limit: u64) -> Result<Self, ResubError> {
        let limit = if bt_limit == 0 {
            -1
        } else {
            bt_limit.min(i32::MAX as u64) as i32
        };
        Ok(SatBox {
            inner: PicoSATSolver::new(),
            n_vars: 0,
            limit,
        })
    }

    /// Pre-sizes the variable table.
    pub fn set_var_count(&mut self, n: usize) -> Result<(), ResubError> {
        self.inner.adjust(n as i32)?;
        self.n_vars = n;
        Ok(())
    }

    pub fn var_count(&self) -> usize {
        self.n_vars
    }

    /// Adds a clause; returns false if the instance became inconsistent.
    pub fn add_clause(&mut self, lits: &[Lit]) -> Result<bool, ResubError> {
        debug_assert!(!lits.is_empty());
        debug_assert!(lits.iter().all(|l| l.var() < self.n_vars));
        let clause: Vec<i32> = lits.iter().map(|l| l.to_dimacs()).collect();
        self.inner.push_clause(&clause)?;
        Ok(!self.inner.is_inconsistent()?)
    }

    /// Asserts `(en = 1) -> (a = b ^ compl)` with two ternary clauses.
    pub fn add_buffer_enable(
        &mut self,
        a: Var,
        b: Var,
        en: Var,
        compl: bool,
    ) -> Result<bool, ResubError> {
        let first = self.add_clause(&[Lit::pos(a), Lit::new(b, !compl), Lit::neg(en)])?;
        let second = self.add_clause(&[Lit::neg(a), Lit::new(b, compl), Lit::neg(en)])?;
        Ok(first && second)
    }

    /// Solves under the given assumptions with the per-call budget.
    pub fn solve(&mut self, assumptions: &[Lit]) -> Result<SolveStatus, ResubError> {
        for l in assumptions {
            self.inner.assume(l.to_dimacs())?;
        }
        self.inner.enter()?;
        let status = self.inner.sat(self.limit)?;
        Ok(match status {
            RawStatus::Satisfiable => SolveStatus::Sat,
            RawStatus::Unsatisfiable => SolveStatus::Unsat,
            RawStatus::Unknown => SolveStatus::Undecided,
        })
    }

    /// Model value of a variable after a satisfiable solve. Variables the
    /// model leaves unconstrained read as false.
    pub fn value(&mut self, var: Var) -> Result<bool, ResubError> {
        let v = self.inner.deref(var as i32 + 1)?;
        Ok(v.unwrap_or(false))
    }

    /// Literal of `var` that is true in the current model.
    pub fn model_literal(&mut self, var: Var) -> Result<Lit, ResubError> {
        Ok(Lit::new(var, !self.value(var)?))
    }

    pub fn simplify(&mut self) -> Result<(), ResubError> {
        self.inner.simplify()?;
        Ok(())
    }

    /// Prunes an assumption set that yields UNSAT down to a sufficient
    /// subset, by failed-literal filtering followed by recursive bisection.
    /// An undecided probe conservatively keeps its literals.
    pub fn minimize_assumptions(&mut self, lits: &mut Vec<Lit>) -> Result<(), ResubError> {
        if self.solve(lits)? != SolveStatus::Unsat {
            return Err(ResubError::UnexpectedSat("assumption minimization"));
        }
        // The failed-assumption core is valid right after the UNSAT solve.
        let mut core = Vec::with_capacity(lits.len());
        for &l in lits.iter() {
            if self.inner.failed_assumption(l.to_dimacs())? {
                core.push(l);
            }
        }
        let cand = core;
        lits.clear();
        let mut base = Vec::new();
        self.shrink(&mut base, &cand, lits)
    }

    /// Invariant: `base ∪ cand` is UNSAT. Extends both `base` and `out` with
    /// the subset of `cand` that is kept.
    fn shrink(
        &mut self,
        base: &mut Vec<Lit>,
        cand: &[Lit],
        out: &mut Vec<Lit>,
    ) -> Result<(), ResubError> {
        match cand {
            [] => return Ok(()),
            [single] => {
                if self.solve(base)? != SolveStatus::Unsat {
                    base.push(*single);
                    out.push(*single);
                }
                return Ok(());
            }
            _ => {}
        }
        let (left, right) = cand.split_at(cand.len() / 2);
        let mark = base.len();

        base.extend_from_slice(left);
        let with_left = self.solve(base)?;
        base.truncate(mark);
        if with_left == SolveStatus::Unsat {
            return self.shrink(base, left, out);
        }

        base.extend_from_slice(right);
        let with_right = self.solve(base)?;
        base.truncate(mark);
        if with_right == SolveStatus::Unsat {
            return self.shrink(base, right, out);
        }

        // Both halves contribute: minimize the right under the full left,
        // then the left under the kept right.
        base.extend_from_slice(left);
        self.shrink(base, right, out)?;
        base.drain(mark..mark + left.len());
        self.shrink(base, left, out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sat() -> SatBox {
        let mut s = SatBox::new(0).unwrap();
        s.set_var_count(8).unwrap();
        s
    }

    #[test]
    fn lit_packing() {
        let l = Lit::new(5, true);
        assert_eq!(l.var(), 5);
        assert!(l.is_compl());
        assert_eq!(l.compl(), Lit::pos(5));
        assert_eq!(l.to_dimacs(), -6);
    }

    #[test]
    fn trivially_sat_and_unsat() {
        let mut s = sat();
        assert!(s.add_clause(&[Lit::pos(0), Lit::pos(1)]).unwrap());
        assert_eq!(s.solve(&[]).unwrap(), SolveStatus::Sat);
        assert!(s.add_clause(&[Lit::neg(0)]).unwrap());
        assert!(s.add_clause(&[Lit::neg(1)]).unwrap());
        assert_eq!(s.solve(&[]).unwrap(), SolveStatus::Unsat);
    }

    #[test]
    fn assumptions_flip_outcomes() {
        let mut s = sat();
        s.add_clause(&[Lit::neg(0), Lit::pos(1)]).unwrap(); // 0 -> 1
        assert_eq!(s.solve(&[Lit::pos(0), Lit::neg(1)]).unwrap(), SolveStatus::Unsat);
        assert_eq!(s.solve(&[Lit::pos(0), Lit::pos(1)]).unwrap(), SolveStatus::Sat);
        assert!(s.value(0).unwrap());
        assert!(s.value(1).unwrap());
        assert_eq!(s.model_literal(1).unwrap(), Lit::pos(1));
    }

    #[test]
    fn buffer_enable_ties_variables() {
        let mut s = sat();
        s.add_buffer_enable(0, 1, 2, false).unwrap();
        // Enabled: 0 != 1 is impossible.
        assert_eq!(
            s.solve(&[Lit::pos(2), Lit::pos(0), Lit::neg(1)]).unwrap(),
            SolveStatus::Unsat
        );
        // Disabled: free.
        assert_eq!(
            s.solve(&[Lit::neg(2), Lit::pos(0), Lit::neg(1)]).unwrap(),
            SolveStatus::Sat
        );
    }

    #[test]
    fn buffer_enable_complemented() {
        let mut s = sat();
        s.add_buffer_enable(0, 1, 2, true).unwrap();
        assert_eq!(
            s.solve(&[Lit::pos(2), Lit::pos(0), Lit::pos(1)]).unwrap(),
            SolveStatus::Unsat
        );
        assert_eq!(
            s.solve(&[Lit::pos(2), Lit::pos(0), Lit::neg(1)]).unwrap(),
            SolveStatus::Sat
        );
    }

    #[test]
    fn minimize_drops_redundant_assumptions() {
        let mut s = sat();
        // 0 and 1 together are contradictory; 2 and 3 are noise.
        s.add_clause(&[Lit::neg(0), Lit::neg(1)]).unwrap();
        let mut lits = vec![Lit::pos(2), Lit::pos(0), Lit::pos(3), Lit::pos(1)];
        s.minimize_assumptions(&mut lits).unwrap();
        assert_eq!(lits.len(), 2);
        assert!(lits.contains(&Lit::pos(0)));
        assert!(lits.contains(&Lit::pos(1)));
    }

    #[test]
    fn minimize_to_single_literal() {
        let mut s = sat();
        s.add_clause(&[Lit::neg(4)]).unwrap();
        let mut lits = vec![Lit::pos(0), Lit::pos(4), Lit::pos(1)];
        s.minimize_assumptions(&mut lits).unwrap();
        assert_eq!(lits, vec![Lit::pos(4)]);
    }

    #[test]
    fn minimize_rejects_satisfiable_set() {
        let mut s = sat();
        s.add_clause(&[Lit::pos(0), Lit::pos(1)]).unwrap();
        let mut lits = vec![Lit::pos(0)];
        assert!(matches!(
            s.minimize_assumptions(&mut lits),
            Err(ResubError::UnexpectedSat(_))
        ));
    }

    #[test]
    fn contradictory_units_are_unsat() {
        let mut s = sat();
        s.add_clause(&[Lit::pos(0)]).unwrap();
        // Whether the backend flags this at add time or at the next solve,
        // the instance must end up UNSAT.
        let _ = s.add_clause(&[Lit::neg(0)]).unwrap();
        assert_eq!(s.solve(&[]).unwrap(), SolveStatus::Unsat);
    }
}
