// SPDX-License-Identifier: AGPL-3.0-only

//! Exclusive prefix sum and reduction primitives.
//!
//! The filter's compaction is the one phase where a region's output index
//! depends on every other region's flag, so it needs a global scan rather
//! than independent per-index writes. The parallel scan here is the standard
//! chunked form: per-chunk counts in parallel, a sequential scan of the small
//! per-chunk vector, then parallel offset application within chunks. The
//! sequential version is kept as the correctness oracle the parallel one is
//! tested against.

use rayon::prelude::*;

/// Chunk width for the parallel scan. Large enough that the sequential
/// per-chunk pass dominates the fork/join overhead.
const SCAN_CHUNK: usize = 4096;

/// Sequential exclusive prefix sum over activity flags.
///
/// Returns the per-index offsets and the total count of set flags.
#[must_use]
pub fn exclusive_scan_seq(flags: &[bool]) -> (Vec<usize>, usize) {
    let mut out = Vec::with_capacity(flags.len());
    let mut acc = 0usize;
    for &f in flags {
        out.push(acc);
        acc += usize::from(f);
    }
    (out, acc)
}

/// Parallel exclusive prefix sum over activity flags.
///
/// Identical output to [`exclusive_scan_seq`] for every input.
#[must_use]
pub fn exclusive_scan(flags: &[bool]) -> (Vec<usize>, usize) {
    if flags.len() <= SCAN_CHUNK {
        return exclusive_scan_seq(flags);
    }

    let chunk_counts: Vec<usize> = flags
        .par_chunks(SCAN_CHUNK)
        .map(|c| c.iter().filter(|&&f| f).count())
        .collect();

    // The per-chunk vector is tiny; scan it sequentially.
    let mut chunk_starts = Vec::with_capacity(chunk_counts.len());
    let mut acc = 0usize;
    for &c in &chunk_counts {
        chunk_starts.push(acc);
        acc += c;
    }
    let total = acc;

    let mut out = vec![0usize; flags.len()];
    out.par_chunks_mut(SCAN_CHUNK)
        .zip(flags.par_chunks(SCAN_CHUNK))
        .zip(chunk_starts.par_iter())
        .for_each(|((offsets, chunk), &start)| {
            let mut acc = start;
            for (o, &f) in offsets.iter_mut().zip(chunk) {
                *o = acc;
                acc += usize::from(f);
            }
        });

    (out, total)
}

/// Parallel sum reduction.
#[must_use]
pub fn sum(xs: &[f64]) -> f64 {
    xs.par_iter().sum()
}

/// Parallel sum of absolute values.
#[must_use]
pub fn abs_sum(xs: &[f64]) -> f64 {
    xs.par_iter().map(|x| x.abs()).sum()
}
