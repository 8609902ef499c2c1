// SPDX-License-Identifier: AGPL-3.0-only

//! Bisection of the surviving active regions.
//!
//! Every region is halved strictly along its assigned split dimension. The
//! children land in a two-half layout: child 0 of parent `j` at index `j`,
//! child 1 at index `j + n`, so the error refiner can find a region's
//! sibling and shared parent by index arithmetic alone. Child volumes sum
//! exactly to the parent volume; the population exactly doubles.

use rayon::prelude::*;

use crate::storage::{RegionCharacteristics, RegionStore};

/// Replace `n` regions with their `2n` bisection children.
///
/// `chars` must be the compacted characteristics for the same population;
/// only the split dimensions are read. No-op on an empty store.
pub fn split(store: &mut RegionStore, chars: &RegionCharacteristics) {
    let n = store.len();
    debug_assert_eq!(n, chars.len());
    if n == 0 {
        return;
    }

    let ndim = store.ndim();
    let new_n = 2 * n;
    let old_left = store.left_raw();
    let old_length = store.length_raw();

    let child = |k: usize| -> (f64, f64) {
        let d = k / new_n;
        let idx = k % new_n;
        let j = idx % n;
        let right = idx >= n;
        let left = old_left[d * n + j];
        let length = old_length[d * n + j];
        if d == chars.split_dim[j] {
            let half = length / 2.0;
            (if right { left + half } else { left }, half)
        } else {
            (left, length)
        }
    };

    let new_left: Vec<f64> = (0..ndim * new_n).into_par_iter().map(|k| child(k).0).collect();
    let new_length: Vec<f64> = (0..ndim * new_n).into_par_iter().map(|k| child(k).1).collect();

    store.replace(new_left, new_length, new_n);
}
