// SPDX-License-Identifier: AGPL-3.0-only

//! Region classification: which regions are done, which must split, and
//! along which dimension.
//!
//! The convergence decision is a heuristic policy, not a fixed law, so it
//! sits behind the [`Classifier`] trait: the filter and splitter consume
//! whatever characteristics a policy produces. The shipped
//! [`BudgetClassifier`] allocates the remaining global error budget across
//! active regions in proportion to their share of the integral mass.
//!
//! Classification is a pure function of the current estimates, geometry, and
//! global state handed in; no hidden history.

use rayon::prelude::*;

use crate::pipeline::Target;
use crate::scan::abs_sum;
use crate::storage::{RegionCharacteristics, RegionEstimates, RegionStore};
use crate::tolerances::WEIGHT_FLOOR;

/// Permissible error for an estimate of magnitude `value` under the target.
#[must_use]
pub fn permissible_error(value: f64, epsrel: f64, epsabs: f64) -> f64 {
    epsabs.max(epsrel * value.abs())
}

/// Global quantities the classifier needs alongside the per-region data.
///
/// Scalar fields are refreshed by the driver every iteration; the domain
/// extents are fixed for a run.
#[derive(Debug, Clone)]
pub struct GlobalState {
    /// Integral accumulated from already-finished regions.
    pub finished_integral: f64,
    /// Error accumulated from already-finished regions.
    pub finished_error: f64,
    /// Sum of the current active regions' integral estimates.
    pub active_integral: f64,
    /// Sum of the current active regions' refined error estimates.
    pub active_error: f64,
    /// Extent of the original domain along each dimension.
    pub domain_extent: Vec<f64>,
}

/// Outcome of one classification pass.
#[derive(Debug)]
pub enum ClassifyResult {
    /// Per-region activity flags and split dimensions.
    Classified(RegionCharacteristics),
    /// No finite subdivision plan can meet the target: the error already
    /// spent on finished regions exceeds the whole allowance.
    CannotConverge,
}

/// Strategy seam for the convergence heuristic.
///
/// `pre` carries any activity marks made by the error refiner; a policy may
/// confirm or add to them but should not resurrect a pre-converged region.
pub trait Classifier {
    fn classify(
        &self,
        store: &RegionStore,
        estimates: &RegionEstimates,
        pre: &RegionCharacteristics,
        target: &Target,
        global: &GlobalState,
    ) -> ClassifyResult;
}

/// Error-budget allocation policy.
///
/// The global allowance is `tau = max(epsabs, epsrel·|G|)` with `G` the best
/// known global integral (finished + active). What finished regions already
/// consumed is subtracted; the remainder is split across active regions in
/// proportion to their absolute integral mass, floored so that flat regions
/// still receive a share. A region is converged when its refined error fits
/// inside its share.
#[derive(Debug, Clone)]
pub struct BudgetClassifier {
    /// Floor on a region's budget weight as a fraction of the mean mass.
    pub weight_floor: f64,
}

impl Default for BudgetClassifier {
    fn default() -> Self {
        Self {
            weight_floor: WEIGHT_FLOOR,
        }
    }
}

impl Classifier for BudgetClassifier {
    fn classify(
        &self,
        store: &RegionStore,
        estimates: &RegionEstimates,
        pre: &RegionCharacteristics,
        target: &Target,
        global: &GlobalState,
    ) -> ClassifyResult {
        let n = estimates.len();
        debug_assert_eq!(n, store.len());
        debug_assert_eq!(n, pre.len());

        let global_integral = global.finished_integral + global.active_integral;
        let tau = permissible_error(global_integral, target.epsrel, target.epsabs);
        let budget = tau - global.finished_error;

        if budget <= 0.0 {
            // The allowance is spent. Zero-error regions can still be
            // retired with a zero share; anything else is hopeless.
            if estimates.error.par_iter().any(|&e| e > 0.0) {
                return ClassifyResult::CannotConverge;
            }
        }
        let budget = budget.max(0.0);

        let mass = abs_sum(&estimates.integral);
        let floor = self.weight_floor * mass / n.max(1) as f64;

        let weight = |i: usize| estimates.integral[i].abs().max(floor);
        let total_weight: f64 = (0..n).into_par_iter().map(weight).sum();

        let active: Vec<bool> = (0..n)
            .into_par_iter()
            .map(|i| {
                let share = if total_weight > 0.0 {
                    budget * weight(i) / total_weight
                } else {
                    // All-zero integrand mass: split the budget evenly.
                    budget / n as f64
                };
                pre.active[i] && estimates.error[i] > share
            })
            .collect();

        let split_dim: Vec<usize> = (0..n)
            .into_par_iter()
            .map(|i| widest_spread_dim(store, &global.domain_extent, i))
            .collect();

        ClassifyResult::Classified(RegionCharacteristics { active, split_dim })
    }
}

/// Dimension with the largest extent relative to the domain extent,
/// tie-break lowest index.
fn widest_spread_dim(store: &RegionStore, domain_extent: &[f64], i: usize) -> usize {
    let mut best = 0usize;
    let mut best_spread = f64::NEG_INFINITY;
    for d in 0..store.ndim() {
        let spread = store.length(i, d) / domain_extent[d];
        if spread > best_spread {
            best_spread = spread;
            best = d;
        }
    }
    best
}
