// SPDX-License-Identifier: AGPL-3.0-only

//! Property tests for the engine's algebraic invariants.

use proptest::prelude::*;

use hyperquad::filter::{compact, RunningTotal};
use hyperquad::refine::refine_errors;
use hyperquad::scan::{exclusive_scan, exclusive_scan_seq};
use hyperquad::split::split;
use hyperquad::storage::{RegionCharacteristics, RegionEstimates, RegionStore};

fn store_with(left: Vec<f64>, length: Vec<f64>, ndim: usize, n: usize) -> RegionStore {
    // Seed a valid store of the right dimensionality, then swap the
    // population in wholesale.
    let bounds: Vec<(f64, f64)> = vec![(0.0, 1.0); ndim];
    let mut store = RegionStore::uniform(&bounds, 1, 1 << 20).unwrap();
    store.replace(left, length, n);
    store
}

proptest! {
    /// The parallel scan must agree with the sequential oracle on every
    /// input, including lengths that straddle chunk boundaries.
    #[test]
    fn prop_parallel_scan_matches_sequential(flags in prop::collection::vec(any::<bool>(), 0..10_000)) {
        let (seq, seq_total) = exclusive_scan_seq(&flags);
        let (par, par_total) = exclusive_scan(&flags);
        prop_assert_eq!(seq_total, par_total);
        prop_assert_eq!(seq, par);
    }

    /// Two-level refinement never claims better accuracy than the raw rule:
    /// every refined error is >= its raw input.
    #[test]
    fn prop_refinement_is_monotone(
        m in 1usize..64,
        seed in any::<u64>(),
        relerr in any::<bool>(),
    ) {
        // Deterministic pseudo-random estimates from the seed.
        let mut state = seed | 1;
        let mut next = move || {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (state >> 11) as f64 / (1u64 << 53) as f64
        };

        let n = 2 * m;
        let mut current = RegionEstimates {
            integral: (0..n).map(|_| next() * 4.0 - 2.0).collect(),
            error: (0..n).map(|_| next() * 0.5).collect(),
        };
        let parents = RegionEstimates {
            integral: (0..m).map(|_| next() * 4.0 - 2.0).collect(),
            error: (0..m).map(|_| next() * 0.5).collect(),
        };
        let raw = current.error.clone();
        let mut chars = RegionCharacteristics::all_active(n);

        refine_errors(&mut current, &parents, &mut chars, 1e-3, 1e-12, relerr);

        for (i, (refined, raw)) in current.error.iter().zip(&raw).enumerate() {
            prop_assert!(refined >= raw, "region {}: refined {} < raw {}", i, refined, raw);
        }
    }

    /// Filtering partitions the population exactly: kept + finished equals
    /// the previous count, and the accumulated integral equals the sum of
    /// the dropped regions' estimates.
    #[test]
    fn prop_filter_partitions_population(flags in prop::collection::vec(any::<bool>(), 1..200)) {
        let n = flags.len();
        let left: Vec<f64> = (0..n).map(|i| i as f64).collect();
        let length = vec![1.0; n];
        let mut store = store_with(left, length, 1, n);

        let mut chars = RegionCharacteristics {
            active: flags.clone(),
            split_dim: vec![0; n],
        };
        let estimates = RegionEstimates {
            integral: (0..n).map(|i| (i + 1) as f64).collect(),
            error: (0..n).map(|i| 0.01 * i as f64).collect(),
        };
        let dropped_integral: f64 = (0..n).filter(|&i| !flags[i]).map(|i| (i + 1) as f64).sum();

        let mut parents = RegionEstimates::empty();
        let mut total = RunningTotal::default();
        let n_active = compact(&mut store, &mut chars, &estimates, &mut parents, &mut total);

        prop_assert_eq!(n_active + total.finished_regions, n);
        prop_assert_eq!(store.len(), n_active);
        prop_assert_eq!(parents.len(), n_active);
        prop_assert!((total.integral - dropped_integral).abs() < 1e-9);

        // Survivors keep their relative order.
        let survivor_corners: Vec<f64> = (0..store.len()).map(|j| store.left(j, 0)).collect();
        let mut sorted = survivor_corners.clone();
        sorted.sort_by(f64::total_cmp);
        prop_assert_eq!(survivor_corners, sorted);
    }

    /// Splitting doubles the population and conserves total volume, and
    /// each child's extent along the split dimension is exactly half the
    /// parent's.
    #[test]
    fn prop_split_doubles_and_conserves_volume(
        n in 1usize..64,
        ndim in 1usize..5,
        seed in any::<u64>(),
    ) {
        let mut state = seed | 1;
        let mut next = move || {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (state >> 11) as f64 / (1u64 << 53) as f64
        };

        let left: Vec<f64> = (0..ndim * n).map(|_| next() * 10.0 - 5.0).collect();
        let length: Vec<f64> = (0..ndim * n).map(|_| next() * 2.0 + 1e-3).collect();
        let mut store = store_with(left, length.clone(), ndim, n);
        let volume_before = store.total_volume();

        let chars = RegionCharacteristics {
            active: vec![true; n],
            split_dim: (0..n).map(|i| i % ndim).collect(),
        };
        let parent_split_len: Vec<f64> =
            (0..n).map(|j| length[chars.split_dim[j] * n + j]).collect();

        split(&mut store, &chars);

        prop_assert_eq!(store.len(), 2 * n);
        let volume_after = store.total_volume();
        prop_assert!(
            (volume_after - volume_before).abs() <= 1e-9 * volume_before.abs().max(1.0),
            "volume {} changed to {}", volume_before, volume_after
        );

        for j in 0..n {
            let d = chars.split_dim[j];
            prop_assert!((store.length(j, d) - parent_split_len[j] / 2.0).abs() < 1e-12);
            prop_assert!((store.length(j + n, d) - parent_split_len[j] / 2.0).abs() < 1e-12);
        }
    }

    /// The running total never decreases its error across accumulations.
    #[test]
    fn prop_running_total_error_is_monotone(errors in prop::collection::vec(0.0f64..10.0, 0..100)) {
        let mut total = RunningTotal::default();
        let mut prev = 0.0;
        for e in errors {
            total.accumulate(1.0, e, 1);
            prop_assert!(total.error >= prev);
            prev = total.error;
        }
    }
}
