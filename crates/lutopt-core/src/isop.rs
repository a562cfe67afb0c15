//! Irredundant sum-of-products covers of ≤6-variable functions.
//!
//! Implements the Minato-Morreale recursion over the interval `[onset,
//! onset ∪ dc]`. Cubes are packed integers with a 2-bit digit per variable:
//! digit 1 means the variable appears complemented in the cube, digit 2 means
//! it appears positive, digit 0 means it is absent. This is the encoding the
//! CNF deriver consumes.

use crate::truth::{arity_mask, cofactor0, cofactor1, var_mask, VAR_MASKS};

/// Digit value for a complemented cube literal.
pub const CUBE_NEG: u32 = 1;
/// Digit value for a positive cube literal.
pub const CUBE_POS: u32 = 2;

/// Digit of variable `v` in a packed cube.
pub fn cube_digit(cube: u32, v: usize) -> u32 {
    (cube >> (2 * v)) & 3
}

/// Computes an irredundant SOP cover of `truth` over `n_vars` variables.
///
/// Pushes cubes onto `cover` (which is cleared first) and returns the
/// function realized by the cover, which equals `truth` for a fully specified
/// function.
pub fn isop(truth: u64, n_vars: usize, cover: &mut Vec<u32>) -> u64 {
    let mask = arity_mask(n_vars);
    debug_assert_eq!(truth & !mask, 0, "truth table not canonical");
    cover.clear();
    let realized = isop_rec(truth, truth, n_vars, cover);
    debug_assert_eq!(realized, truth);
    realized
}

/// Recursive interval cover: onset `on` must be covered, anything inside
/// `ondc` (onset plus don't-cares) may be.
fn isop_rec(on: u64, ondc: u64, n_vars: usize, cover: &mut Vec<u32>) -> u64 {
    debug_assert_eq!(on & !ondc, 0);
    let mask = arity_mask(n_vars);
    if on == 0 {
        return 0;
    }
    if ondc == mask {
        cover.push(0); // tautology cube
        return mask;
    }
    // Topmost variable either side of the interval depends on.
    let mut var = n_vars;
    for v in (0..n_vars).rev() {
        if (cofactor0(on, v) ^ cofactor1(on, v)) & mask != 0
            || (cofactor0(ondc, v) ^ cofactor1(ondc, v)) & mask != 0
        {
            var = v;
            break;
        }
    }
    debug_assert!(var < n_vars);

    let (on0, on1) = (cofactor0(on, var) & mask, cofactor1(on, var) & mask);
    let (dc0, dc1) = (cofactor0(ondc, var) & mask, cofactor1(ondc, var) & mask);

    // Minterms coverable only on the negative (positive) side.
    let start0 = cover.len();
    let f0 = isop_rec(on0 & !dc1, dc0, n_vars, cover);
    for cube in &mut cover[start0..] {
        *cube |= CUBE_NEG << (2 * var);
    }
    let start1 = cover.len();
    let f1 = isop_rec(on1 & !dc0, dc1, n_vars, cover);
    for cube in &mut cover[start1..] {
        *cube |= CUBE_POS << (2 * var);
    }
    // Whatever remains is covered without mentioning the variable.
    let rest = (on0 & !f0) | (on1 & !f1);
    let f2 = isop_rec(rest, dc0 & dc1, n_vars, cover);

    (f0 & !VAR_MASKS[var] & mask) | (f1 & var_mask(var, n_vars)) | f2
}

/// Evaluates a cover back into a truth table (test helper for callers).
pub fn eval_cover(cover: &[u32], n_vars: usize) -> u64 {
    let mask = arity_mask(n_vars);
    let mut out = 0u64;
    for &cube in cover {
        let mut c = mask;
        for v in 0..n_vars {
            match cube_digit(cube, v) {
                CUBE_NEG => c &= !VAR_MASKS[v],
                CUBE_POS => c &= VAR_MASKS[v],
                _ => {}
            }
        }
        out |= c & mask;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn check(truth: u64, n_vars: usize) {
        let mut cover = Vec::new();
        let realized = isop(truth, n_vars, &mut cover);
        assert_eq!(realized, truth);
        assert_eq!(eval_cover(&cover, n_vars), truth);
    }

    #[test]
    fn covers_small_functions() {
        check(0x8, 2); // and
        check(0x6, 2); // xor
        check(0xE, 2); // or
        check(0x1, 2); // nor
        check(0b10, 1); // buffer
        check(0b01, 1); // inverter
        check(0xEA, 3); // x0 | (x1 & x2)
        check(0x9669_9669_9669_9669 & arity_mask(6), 6);
    }

    #[test]
    fn and_cover_is_single_cube() {
        let mut cover = Vec::new();
        isop(0x8, 2, &mut cover);
        assert_eq!(cover.len(), 1);
        assert_eq!(cube_digit(cover[0], 0), CUBE_POS);
        assert_eq!(cube_digit(cover[0], 1), CUBE_POS);
    }

    #[test]
    fn tautology_is_empty_cube() {
        let mut cover = Vec::new();
        isop(arity_mask(3), 3, &mut cover);
        assert_eq!(cover, vec![0]);
    }

    #[test]
    fn empty_function_has_no_cubes() {
        let mut cover = Vec::new();
        isop(0, 4, &mut cover);
        assert!(cover.is_empty());
    }

    proptest! {
        #[test]
        fn cover_realizes_function(raw: u64, n_vars in 0usize..=6) {
            let truth = raw & arity_mask(n_vars);
            let mut cover = Vec::new();
            isop(truth, n_vars, &mut cover);
            prop_assert_eq!(eval_cover(&cover, n_vars), truth);
        }

        #[test]
        fn complement_cover_realizes_complement(raw: u64, n_vars in 0usize..=6) {
            let mask = arity_mask(n_vars);
            let truth = !raw & mask;
            let mut cover = Vec::new();
            isop(truth, n_vars, &mut cover);
            prop_assert_eq!(eval_cover(&cover, n_vars), truth);
        }
    }
}
