// SPDX-License-Identifier: AGPL-3.0-only

//! Two-level error refinement.
//!
//! A raw rule error describes one region in isolation. After a bisection the
//! engine also knows how the pair of children compares against their parent's
//! estimate from the previous iteration, and that discrepancy is a direct
//! correctness signal: if the children disagree with the parent, the raw
//! errors are too optimistic.
//!
//! The splitter lays children out in two halves (child 0 of parent `j` at
//! index `j`, child 1 at `j + m`, for `m` parents), so with `2m` current
//! regions the parent of region `i` is `i % m` and its sibling is
//! `(i + m) % 2m`. Parent estimates are retained once per pair, not
//! duplicated per child.
//!
//! Refined errors never drop below the raw error: refinement only ever
//! withdraws confidence, it cannot add accuracy the rule did not deliver.

use rayon::prelude::*;

use crate::classify::permissible_error;
use crate::storage::{RegionCharacteristics, RegionEstimates};
use crate::tolerances::DISCREPANCY_FRACTION;

/// Replace the current errors with two-level refined errors, in place.
///
/// `parents` holds the surviving estimates from the previous iteration,
/// one per sibling pair. With no history (first iteration) the raw errors
/// are kept unchanged.
///
/// When `relerr_classification` is enabled, regions whose refined error
/// already meets `max(epsabs, epsrel·|I|)` are pre-marked inactive in
/// `chars`; the heuristic classifier can only confirm or add to these marks.
/// When disabled, every region stays active after refinement and the
/// conservative inflation path is used throughout.
pub fn refine_errors(
    current: &mut RegionEstimates,
    parents: &RegionEstimates,
    chars: &mut RegionCharacteristics,
    epsrel: f64,
    epsabs: f64,
    relerr_classification: bool,
) {
    if parents.is_empty() {
        return;
    }

    let n = current.len();
    let m = parents.len();
    debug_assert_eq!(n, 2 * m, "children must be exactly two per parent");

    let integral = &current.integral;
    let error = &current.error;
    let refined: Vec<f64> = (0..n)
        .into_par_iter()
        .map(|i| {
            let sibling = (i + m) % n;
            let parent = i % m;

            let self_err = error[i];
            let pair_sum = integral[i] + integral[sibling];
            let pair_err = self_err + error[sibling];

            // Each child is charged a quarter of the pair/parent discrepancy.
            let diff = DISCREPANCY_FRACTION * (pair_sum - parents.integral[parent]).abs();

            if relerr_classification && parents.error[parent] <= pair_err {
                // Parent history is consistent with the current level:
                // keep the raw error, floored by the discrepancy share.
                self_err.max(diff)
            } else {
                // Inconsistent or tightening forbidden: inflate by the
                // relative disagreement and add the discrepancy on top.
                let scale = if pair_err > 0.0 {
                    1.0 + 2.0 * diff / pair_err
                } else {
                    1.0
                };
                self_err * scale + diff
            }
        })
        .collect();

    if relerr_classification {
        chars
            .active
            .par_iter_mut()
            .zip(refined.par_iter())
            .zip(integral.par_iter())
            .for_each(|((active, &err), &val)| {
                *active = err > permissible_error(val, epsrel, epsabs);
            });
    }

    current.error = refined;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tolerances::EXACT_F64;

    fn ests(integral: &[f64], error: &[f64]) -> RegionEstimates {
        RegionEstimates {
            integral: integral.to_vec(),
            error: error.to_vec(),
        }
    }

    #[test]
    fn no_history_keeps_raw_errors() {
        let mut current = ests(&[1.0, 2.0], &[0.1, 0.2]);
        let mut chars = RegionCharacteristics::all_active(2);
        refine_errors(
            &mut current,
            &RegionEstimates::empty(),
            &mut chars,
            1e-3,
            1e-12,
            true,
        );
        assert_eq!(current.error, vec![0.1, 0.2]);
        assert!(chars.active.iter().all(|&a| a));
    }

    #[test]
    fn refinement_never_tightens_below_raw() {
        // Two parents, four children. Pair sums disagree with both parents.
        let mut current = ests(&[0.4, 0.3, 0.7, 0.2], &[0.01, 0.02, 0.03, 0.04]);
        let raw = current.error.clone();
        let parents = ests(&[1.0, 0.6], &[0.05, 0.01]);
        let mut chars = RegionCharacteristics::all_active(4);
        refine_errors(&mut current, &parents, &mut chars, 1e-3, 1e-12, true);
        for (refined, raw) in current.error.iter().zip(&raw) {
            assert!(refined >= raw, "refined {refined} < raw {raw}");
        }
    }

    #[test]
    fn consistent_parent_keeps_raw_error_with_discrepancy_floor() {
        // One parent at 1.0; children sum to 1.0 exactly, parent error is
        // tighter than the pair error, so the raw errors survive untouched.
        let mut current = ests(&[0.5, 0.5], &[0.01, 0.01]);
        let parents = ests(&[1.0], &[0.005]);
        let mut chars = RegionCharacteristics::all_active(2);
        refine_errors(&mut current, &parents, &mut chars, 1e-6, 1e-12, true);
        assert!((current.error[0] - 0.01).abs() < EXACT_F64);
        assert!((current.error[1] - 0.01).abs() < EXACT_F64);
    }

    #[test]
    fn inconsistent_parent_inflates_error() {
        // Children sum to 1.0 but the parent estimate said 2.0, with a loose
        // parent error, so both children get the conservative inflation.
        let mut current = ests(&[0.5, 0.5], &[0.01, 0.01]);
        let parents = ests(&[2.0], &[0.5]);
        let mut chars = RegionCharacteristics::all_active(2);
        refine_errors(&mut current, &parents, &mut chars, 1e-3, 1e-12, true);

        // diff = 0.25, pair_err = 0.02, scale = 1 + 2*0.25/0.02 = 26.
        let expected = 0.01 * 26.0 + 0.25;
        assert!((current.error[0] - expected).abs() < EXACT_F64);
        assert!(chars.active[0], "inflated error must stay active");
    }

    #[test]
    fn relerr_classification_premarks_tight_regions() {
        // Children agree with the parent exactly and carry zero raw error.
        let mut current = ests(&[0.5, 0.5], &[0.0, 0.0]);
        let parents = ests(&[1.0], &[0.0]);
        let mut chars = RegionCharacteristics::all_active(2);
        refine_errors(&mut current, &parents, &mut chars, 1e-3, 1e-12, true);
        assert!(!chars.active[0]);
        assert!(!chars.active[1]);
    }

    #[test]
    fn disabled_relerr_classification_is_conservative() {
        let mut current = ests(&[0.5, 0.5], &[0.0, 0.0]);
        let parents = ests(&[1.0], &[0.0]);
        let mut chars = RegionCharacteristics::all_active(2);
        refine_errors(&mut current, &parents, &mut chars, 1e-3, 1e-12, false);
        // No pre-marking, and the conservative path was taken.
        assert!(chars.active[0]);
        assert!(chars.active[1]);
    }

    #[test]
    fn sibling_layout_pairs_across_halves() {
        // Parent 1's children sit at indices 1 and 3 of four regions; give
        // them a discrepancy and check parent 0's children are unaffected.
        let mut current = ests(&[0.5, 1.0, 0.5, 1.0], &[0.0, 0.0, 0.0, 0.0]);
        let parents = ests(&[1.0, 3.0], &[0.0, 0.0]);
        let mut chars = RegionCharacteristics::all_active(4);
        refine_errors(&mut current, &parents, &mut chars, 1e-3, 1e-12, true);
        assert!((current.error[0] - 0.0).abs() < EXACT_F64);
        assert!((current.error[2] - 0.0).abs() < EXACT_F64);
        // |1.0 + 1.0 - 3.0| / 4 = 0.25 charged to each of parent 1's children.
        assert!((current.error[1] - 0.25).abs() < EXACT_F64);
        assert!((current.error[3] - 0.25).abs() < EXACT_F64);
    }
}
