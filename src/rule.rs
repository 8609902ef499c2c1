// SPDX-License-Identifier: AGPL-3.0-only

//! The injected local cubature rule.
//!
//! The engine does not care how a region's `(integral, error)` pair is
//! produced; it only requires the [`CubatureRule`] contract: index-aligned
//! estimates, deterministic for a given geometry and integrand, non-negative
//! errors, no geometry mutation. Production deployments inject their own
//! rule; [`MidpointPairRule`] is the shipped reference implementation used
//! by the tests and examples.

use rayon::prelude::*;

use crate::storage::{RegionEstimates, RegionStore};

/// A scalar integrand, evaluable from any worker thread.
pub trait Integrand: Sync {
    fn eval(&self, x: &[f64]) -> f64;
}

impl<F> Integrand for F
where
    F: Fn(&[f64]) -> f64 + Sync,
{
    fn eval(&self, x: &[f64]) -> f64 {
        self(x)
    }
}

/// Local per-region estimator: one raw `(integral, error)` pair per region.
pub trait CubatureRule {
    fn estimate(&self, store: &RegionStore, f: &dyn Integrand) -> RegionEstimates;
}

/// Embedded midpoint pair rule.
///
/// Coarse level: the one-point midpoint estimate `f(c)·V`. Fine level: for
/// each dimension, the two-point midpoint estimate of the region split in
/// half along that dimension, averaged over dimensions. The error is the
/// absolute difference of the two levels — exactly zero for integrands
/// constant (or linear) over the region, which is what makes a constant
/// integrand converge on the first iteration.
///
/// Costs `2·ndim + 1` evaluations per region.
#[derive(Debug, Clone, Copy, Default)]
pub struct MidpointPairRule;

impl CubatureRule for MidpointPairRule {
    fn estimate(&self, store: &RegionStore, f: &dyn Integrand) -> RegionEstimates {
        let ndim = store.ndim();
        let pairs: Vec<(f64, f64)> = (0..store.len())
            .into_par_iter()
            .map(|i| {
                let volume = store.volume(i);
                let mut x: Vec<f64> = (0..ndim)
                    .map(|d| store.left(i, d) + store.length(i, d) / 2.0)
                    .collect();

                let coarse = f.eval(&x) * volume;

                let mut fine = 0.0;
                for d in 0..ndim {
                    let center = x[d];
                    let quarter = store.length(i, d) / 4.0;
                    x[d] = center - quarter;
                    let lo = f.eval(&x);
                    x[d] = center + quarter;
                    let hi = f.eval(&x);
                    x[d] = center;
                    fine += (lo + hi) / 2.0 * volume;
                }
                let fine = fine / ndim as f64;

                (fine, (fine - coarse).abs())
            })
            .collect();

        RegionEstimates {
            integral: pairs.iter().map(|p| p.0).collect(),
            error: pairs.iter().map(|p| p.1).collect(),
        }
    }
}
