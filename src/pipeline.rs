// SPDX-License-Identifier: AGPL-3.0-only

//! The iteration driver.
//!
//! One iteration is a fixed sequence of barrier-separated phases over the
//! active population:
//!
//! ```text
//!   rule ──▶ refine ──▶ classify ──▶ filter/accumulate ──▶ split
//!   [raw ests]  [two-level]  [active + dim]  [compact + total]   [double]
//! ```
//!
//! The loop leaves `RUNNING` in one of three ways: `Converged` (no active
//! regions left, or the global error fits the target), `Exhausted`
//! (iteration or region budget hit), or `Unconvergeable` (the classifier
//! proved the budget is already spent). All three report best-effort totals;
//! none of them is an `Err`.

use serde::{Deserialize, Serialize};

use crate::classify::{
    permissible_error, BudgetClassifier, Classifier, ClassifyResult, GlobalState,
};
use crate::error::CubatureError;
use crate::filter::{compact, RunningTotal};
use crate::refine::refine_errors;
use crate::rule::{CubatureRule, Integrand};
use crate::scan::sum;
use crate::split::split;
use crate::storage::{RegionCharacteristics, RegionEstimates, RegionStore};
use crate::tolerances::{
    default_splits_per_dim, DEFAULT_EPSABS, DEFAULT_EPSREL, DEFAULT_MAX_ITERATIONS,
    DEFAULT_MAX_REGIONS,
};

/// Global convergence target and resource budgets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Target {
    /// Relative-error target, strictly positive.
    pub epsrel: f64,
    /// Absolute-error target, non-negative.
    pub epsabs: f64,
    /// Iteration ceiling.
    pub max_iterations: usize,
    /// Ceiling on the active region population.
    pub max_regions: usize,
}

impl Target {
    /// # Errors
    ///
    /// Rejects a non-positive or non-finite `epsrel` and a negative or
    /// non-finite `epsabs`.
    pub fn new(epsrel: f64, epsabs: f64) -> Result<Self, CubatureError> {
        if !epsrel.is_finite() || epsrel <= 0.0 {
            return Err(CubatureError::InvalidTolerance {
                name: "epsrel",
                value: epsrel,
            });
        }
        if !epsabs.is_finite() || epsabs < 0.0 {
            return Err(CubatureError::InvalidTolerance {
                name: "epsabs",
                value: epsabs,
            });
        }
        Ok(Self {
            epsrel,
            epsabs,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            max_regions: DEFAULT_MAX_REGIONS,
        })
    }

    #[must_use]
    pub fn with_budgets(mut self, max_iterations: usize, max_regions: usize) -> Self {
        self.max_iterations = max_iterations;
        self.max_regions = max_regions;
        self
    }
}

impl Default for Target {
    fn default() -> Self {
        Self {
            epsrel: DEFAULT_EPSREL,
            epsabs: DEFAULT_EPSABS,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            max_regions: DEFAULT_MAX_REGIONS,
        }
    }
}

/// Terminal state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    /// Global error within target (or no active regions remain).
    Converged,
    /// Iteration or region budget hit before the target was met.
    Exhausted,
    /// The classifier proved no finite subdivision plan meets the target.
    Unconvergeable,
}

/// Result surfaced to the caller: finished totals plus whatever the still
/// active regions contributed at termination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrationResult {
    pub estimate: f64,
    pub errorest: f64,
    /// Total regions ever created, initial partition included.
    pub regions_created: usize,
    pub iterations: usize,
    pub status: Status,
}

/// The adaptive region-management engine.
///
/// Generic over the classification policy; [`CubatureEngine::new`] wires in
/// the default [`BudgetClassifier`].
#[derive(Debug, Clone)]
pub struct CubatureEngine<C = BudgetClassifier> {
    target: Target,
    classifier: C,
    relerr_classification: bool,
    splits_per_dim: Option<usize>,
}

impl CubatureEngine<BudgetClassifier> {
    #[must_use]
    pub fn new(target: Target) -> Self {
        Self::with_classifier(target, BudgetClassifier::default())
    }
}

impl<C: Classifier> CubatureEngine<C> {
    #[must_use]
    pub fn with_classifier(target: Target, classifier: C) -> Self {
        Self {
            target,
            classifier,
            relerr_classification: true,
            splits_per_dim: None,
        }
    }

    /// Disable (or re-enable) relative-error pre-classification during
    /// refinement; disabled means the conservative fallback everywhere.
    #[must_use]
    pub fn relerr_classification(mut self, enabled: bool) -> Self {
        self.relerr_classification = enabled;
        self
    }

    /// Override the dimension-based initial partition schedule.
    #[must_use]
    pub fn splits_per_dim(mut self, splits: usize) -> Self {
        self.splits_per_dim = Some(splits);
        self
    }

    /// Integrate `f` over the hyper-rectangle `bounds`.
    ///
    /// # Errors
    ///
    /// Only for invalid input (bad bounds, oversized initial partition);
    /// non-convergence is reported through [`IntegrationResult::status`].
    pub fn run<R: CubatureRule>(
        &self,
        bounds: &[(f64, f64)],
        rule: &R,
        f: &dyn Integrand,
    ) -> Result<IntegrationResult, CubatureError> {
        let ndim = bounds.len();
        let splits = self
            .splits_per_dim
            .unwrap_or_else(|| default_splits_per_dim(ndim));
        let mut store = RegionStore::uniform(bounds, splits, self.target.max_regions)?;

        let mut global = GlobalState {
            finished_integral: 0.0,
            finished_error: 0.0,
            active_integral: 0.0,
            active_error: 0.0,
            domain_extent: bounds.iter().map(|&(lo, hi)| hi - lo).collect(),
        };
        let mut parents = RegionEstimates::empty();
        let mut total = RunningTotal::default();
        let mut regions_created = store.len();
        let mut iterations = 0usize;

        loop {
            iterations += 1;

            // Phase 1: raw per-region estimates from the injected rule.
            let mut estimates = rule.estimate(&store, f);

            // Phase 2: two-level refinement against the retained parents
            // (skipped on the first iteration, when there is no history).
            let mut pre = RegionCharacteristics::all_active(store.len());
            refine_errors(
                &mut estimates,
                &parents,
                &mut pre,
                self.target.epsrel,
                self.target.epsabs,
                self.relerr_classification,
            );

            // Phase 3: classification under the current global picture.
            global.finished_integral = total.integral;
            global.finished_error = total.error;
            global.active_integral = sum(&estimates.integral);
            global.active_error = sum(&estimates.error);

            let mut chars =
                match self
                    .classifier
                    .classify(&store, &estimates, &pre, &self.target, &global)
                {
                    ClassifyResult::Classified(chars) => chars,
                    ClassifyResult::CannotConverge => {
                        return Ok(IntegrationResult {
                            estimate: total.integral + global.active_integral,
                            errorest: total.error + global.active_error,
                            regions_created,
                            iterations,
                            status: Status::Unconvergeable,
                        });
                    }
                };

            // Phase 4: compact survivors, accumulate the finished.
            let n_active = compact(&mut store, &mut chars, &estimates, &mut parents, &mut total);

            let estimate = total.integral + sum(&parents.integral);
            let errorest = total.error + sum(&parents.error);

            if n_active == 0
                || errorest <= permissible_error(estimate, self.target.epsrel, self.target.epsabs)
            {
                return Ok(IntegrationResult {
                    estimate,
                    errorest,
                    regions_created,
                    iterations,
                    status: Status::Converged,
                });
            }
            if iterations >= self.target.max_iterations
                || 2 * store.len() > self.target.max_regions
            {
                return Ok(IntegrationResult {
                    estimate,
                    errorest,
                    regions_created,
                    iterations,
                    status: Status::Exhausted,
                });
            }

            // Phase 5: bisect every survivor; the population doubles.
            split(&mut store, &chars);
            regions_created += store.len();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::MidpointPairRule;
    use crate::tolerances::EXACT_F64;

    #[test]
    fn constant_integrand_converges_in_one_iteration_any_dimension() {
        for ndim in 1..=5 {
            let bounds: Vec<(f64, f64)> = vec![(0.0, 1.0); ndim];
            let target = Target::new(1e-3, 1e-12).unwrap();
            let result = CubatureEngine::new(target)
                .run(&bounds, &MidpointPairRule, &|_: &[f64]| 2.0)
                .unwrap();

            assert_eq!(result.status, Status::Converged, "ndim = {ndim}");
            assert_eq!(result.iterations, 1, "ndim = {ndim}");
            assert!((result.estimate - 2.0).abs() < EXACT_F64);
            assert!(result.errorest < EXACT_F64);
        }
    }

    #[test]
    fn quadratic_converges_to_exact_value() {
        let target = Target::new(1e-3, 1e-12).unwrap();
        let result = CubatureEngine::new(target)
            .run(&[(0.0, 1.0)], &MidpointPairRule, &|x: &[f64]| x[0] * x[0])
            .unwrap();

        assert_eq!(result.status, Status::Converged);
        assert!(
            (result.estimate - 1.0 / 3.0).abs() < 5e-3,
            "estimate = {}",
            result.estimate
        );
        assert!(result.regions_created >= 4);
    }

    #[test]
    fn iteration_budget_reports_exhausted_with_best_effort_estimate() {
        let target = Target::new(1e-12, 0.0).unwrap().with_budgets(2, 1 << 20);
        let result = CubatureEngine::new(target)
            .run(&[(0.0, 1.0), (0.0, 1.0)], &MidpointPairRule, &|x: &[f64]| {
                (10.0 * x[0]).sin() * (7.0 * x[1]).cos()
            })
            .unwrap();

        assert_eq!(result.status, Status::Exhausted);
        assert_eq!(result.iterations, 2);
        assert!(result.estimate.is_finite());
        assert!(result.errorest > 0.0);
    }

    #[test]
    fn region_budget_reports_exhausted() {
        // 16 initial regions, ceiling 20: the first split would need 32.
        let target = Target::new(1e-12, 0.0).unwrap().with_budgets(50, 20);
        let result = CubatureEngine::new(target)
            .splits_per_dim(4)
            .run(&[(0.0, 1.0), (0.0, 1.0)], &MidpointPairRule, &|x: &[f64]| {
                (10.0 * x[0]).sin() + x[1]
            })
            .unwrap();

        assert_eq!(result.status, Status::Exhausted);
        assert_eq!(result.iterations, 1);
    }

    #[test]
    fn rejects_invalid_tolerances() {
        assert!(matches!(
            Target::new(0.0, 1e-6),
            Err(CubatureError::InvalidTolerance { name: "epsrel", .. })
        ));
        assert!(matches!(
            Target::new(1e-3, -1.0),
            Err(CubatureError::InvalidTolerance { name: "epsabs", .. })
        ));
    }

    #[test]
    fn rejects_invalid_domain() {
        let target = Target::new(1e-3, 1e-12).unwrap();
        let engine = CubatureEngine::new(target);
        assert!(matches!(
            engine.run(&[], &MidpointPairRule, &|_: &[f64]| 1.0),
            Err(CubatureError::EmptyDomain)
        ));
        assert!(matches!(
            engine.run(&[(1.0, 0.0)], &MidpointPairRule, &|_: &[f64]| 1.0),
            Err(CubatureError::InvalidBounds { dim: 0, .. })
        ));
    }

    #[test]
    fn separable_polynomial_in_three_dimensions() {
        // ∫∫∫ x·y·z over [0,1]³ = 1/8. Linear per axis, so the midpoint
        // levels agree and the grid estimate is already exact.
        let target = Target::new(1e-3, 1e-12).unwrap();
        let result = CubatureEngine::new(target)
            .run(
                &[(0.0, 1.0), (0.0, 1.0), (0.0, 1.0)],
                &MidpointPairRule,
                &|x: &[f64]| x[0] * x[1] * x[2],
            )
            .unwrap();

        assert_eq!(result.status, Status::Converged);
        assert!(
            (result.estimate - 0.125).abs() < EXACT_F64,
            "estimate = {}",
            result.estimate
        );
    }

    #[test]
    fn non_unit_domain_is_handled() {
        // ∫ x over [2, 4] = 6.
        let target = Target::new(1e-3, 1e-12).unwrap();
        let result = CubatureEngine::new(target)
            .run(&[(2.0, 4.0)], &MidpointPairRule, &|x: &[f64]| x[0])
            .unwrap();
        assert_eq!(result.status, Status::Converged);
        assert!((result.estimate - 6.0).abs() < 1e-6);
    }

    #[test]
    fn disabled_relerr_classification_still_converges() {
        let target = Target::new(1e-3, 1e-12).unwrap();
        let result = CubatureEngine::new(target)
            .relerr_classification(false)
            .run(&[(0.0, 1.0)], &MidpointPairRule, &|x: &[f64]| x[0] * x[0])
            .unwrap();
        assert_eq!(result.status, Status::Converged);
        assert!((result.estimate - 1.0 / 3.0).abs() < 5e-3);
    }
}
