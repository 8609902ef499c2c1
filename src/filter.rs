// SPDX-License-Identifier: AGPL-3.0-only

//! Stream compaction of converged regions.
//!
//! After classification every region is in exactly one of two fates: kept
//! (compacted into the next iteration's working set, its current estimate
//! retained as the parent estimate) or finished (its contribution folded into
//! the running global total, its storage dropped). Never both, never neither.
//!
//! The compacted index of each survivor comes from an exclusive prefix sum
//! over the activity flags; the subsequent move of geometry, split dimension,
//! and estimates is an ordered gather into freshly allocated arrays sized to
//! the survivor count. Old backing storage is released only after the new
//! arrays are fully populated.

use rayon::prelude::*;

use crate::scan::exclusive_scan;
use crate::storage::{RegionCharacteristics, RegionEstimates, RegionStore};

/// Running global totals from all regions confirmed converged so far.
///
/// Accumulation only ever adds: both totals are monotone non-decreasing
/// across iterations.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunningTotal {
    pub integral: f64,
    pub error: f64,
    pub finished_regions: usize,
}

impl RunningTotal {
    pub fn accumulate(&mut self, integral: f64, error: f64, regions: usize) {
        debug_assert!(error >= 0.0);
        self.integral += integral;
        self.error += error;
        self.finished_regions += regions;
    }
}

/// Remove converged regions from the working set.
///
/// Survivors are compacted in order into `store` and `chars`; their current
/// estimates become `parents`. Finished regions are folded into `total`.
/// Returns the surviving active count. With zero survivors the containers
/// are left holding empty populations.
pub fn compact(
    store: &mut RegionStore,
    chars: &mut RegionCharacteristics,
    estimates: &RegionEstimates,
    parents: &mut RegionEstimates,
    total: &mut RunningTotal,
) -> usize {
    let n = store.len();
    debug_assert_eq!(n, chars.len());
    debug_assert_eq!(n, estimates.len());

    let (offsets, n_active) = exclusive_scan(&chars.active);

    // Fold the finished regions into the running total before their
    // estimates go away.
    let (finished_integral, finished_error) = (0..n)
        .into_par_iter()
        .filter(|&i| !chars.active[i])
        .map(|i| (estimates.integral[i], estimates.error[i]))
        .reduce(|| (0.0, 0.0), |a, b| (a.0 + b.0, a.1 + b.1));
    total.accumulate(finished_integral, finished_error, n - n_active);

    // New index -> old index, in survivor order. `offsets[survivors[j]] == j`.
    let survivors: Vec<usize> = (0..n).into_par_iter().filter(|&i| chars.active[i]).collect();
    debug_assert!(survivors.iter().all(|&i| offsets[i] < n_active));

    let ndim = store.ndim();
    let new_left: Vec<f64> = (0..ndim * n_active)
        .into_par_iter()
        .map(|k| store.left_raw()[(k / n_active) * n + survivors[k % n_active]])
        .collect();
    let new_length: Vec<f64> = (0..ndim * n_active)
        .into_par_iter()
        .map(|k| store.length_raw()[(k / n_active) * n + survivors[k % n_active]])
        .collect();
    let new_split_dim: Vec<usize> = survivors.par_iter().map(|&i| chars.split_dim[i]).collect();
    let parent_integral: Vec<f64> = survivors.par_iter().map(|&i| estimates.integral[i]).collect();
    let parent_error: Vec<f64> = survivors.par_iter().map(|&i| estimates.error[i]).collect();

    store.replace(new_left, new_length, n_active);
    chars.active = vec![true; n_active];
    chars.split_dim = new_split_dim;
    parents.integral = parent_integral;
    parents.error = parent_error;

    n_active
}
