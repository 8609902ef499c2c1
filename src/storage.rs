// SPDX-License-Identifier: AGPL-3.0-only

//! Structure-of-arrays storage for the tracked region population.
//!
//! A region has no persistent identity: it is whatever sits at index `i` of
//! the three parallel containers during one iteration. The filter and
//! splitter replace the backing arrays wholesale (arena style) rather than
//! mutating in place, so stale storage is dropped only after the replacement
//! is fully populated.
//!
//! Geometry is stored dimension-major: dimension `d` of region `i` lives at
//! `d * len + i`. Per-phase kernels that walk one dimension across all
//! regions therefore touch contiguous memory.

use rayon::prelude::*;

use crate::error::CubatureError;

// ═══════════════════════════════════════════════════════════════════
// Region geometry
// ═══════════════════════════════════════════════════════════════════

/// Left corners and extents of all tracked regions, dimension-major.
#[derive(Debug, Clone)]
pub struct RegionStore {
    ndim: usize,
    len: usize,
    left: Vec<f64>,
    length: Vec<f64>,
}

impl RegionStore {
    /// Carve `bounds` into a uniform grid of `splits_per_dim` cells per axis.
    ///
    /// # Errors
    ///
    /// Rejects empty domains, degenerate or non-finite bounds, a zero split
    /// count, and initial partitions beyond `ceiling` regions.
    pub fn uniform(
        bounds: &[(f64, f64)],
        splits_per_dim: usize,
        ceiling: usize,
    ) -> Result<Self, CubatureError> {
        if bounds.is_empty() {
            return Err(CubatureError::EmptyDomain);
        }
        for (dim, &(lo, hi)) in bounds.iter().enumerate() {
            if !lo.is_finite() || !hi.is_finite() || lo >= hi {
                return Err(CubatureError::InvalidBounds { dim, lo, hi });
            }
        }
        if splits_per_dim == 0 {
            return Err(CubatureError::InvalidTolerance {
                name: "splits_per_dim",
                value: 0.0,
            });
        }

        let ndim = bounds.len();
        let len = u32::try_from(ndim)
            .ok()
            .and_then(|exp| splits_per_dim.checked_pow(exp))
            .unwrap_or(usize::MAX);
        if len > ceiling {
            return Err(CubatureError::RegionBudget {
                requested: len,
                ceiling,
            });
        }

        // Cell i has grid coordinate (i / splits^d) % splits along axis d.
        let left: Vec<f64> = (0..ndim * len)
            .into_par_iter()
            .map(|idx| {
                let d = idx / len;
                let i = idx % len;
                let (lo, hi) = bounds[d];
                let step = (hi - lo) / splits_per_dim as f64;
                let coord = (i / splits_per_dim.pow(u32::try_from(d).unwrap_or(0))) % splits_per_dim;
                lo + coord as f64 * step
            })
            .collect();
        let length: Vec<f64> = (0..ndim * len)
            .into_par_iter()
            .map(|idx| {
                let d = idx / len;
                let (lo, hi) = bounds[d];
                (hi - lo) / splits_per_dim as f64
            })
            .collect();

        Ok(Self {
            ndim,
            len,
            left,
            length,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[must_use]
    pub fn ndim(&self) -> usize {
        self.ndim
    }

    /// Left corner of region `i` along dimension `d`.
    #[must_use]
    pub fn left(&self, i: usize, d: usize) -> f64 {
        self.left[d * self.len + i]
    }

    /// Extent of region `i` along dimension `d`.
    #[must_use]
    pub fn length(&self, i: usize, d: usize) -> f64 {
        self.length[d * self.len + i]
    }

    /// Geometric volume of region `i`.
    #[must_use]
    pub fn volume(&self, i: usize) -> f64 {
        (0..self.ndim).map(|d| self.length(i, d)).product()
    }

    /// Sum of all region volumes.
    #[must_use]
    pub fn total_volume(&self) -> f64 {
        (0..self.len).into_par_iter().map(|i| self.volume(i)).sum()
    }

    /// Dimension-major backing slice of left corners.
    #[must_use]
    pub fn left_raw(&self) -> &[f64] {
        &self.left
    }

    /// Dimension-major backing slice of extents.
    #[must_use]
    pub fn length_raw(&self) -> &[f64] {
        &self.length
    }

    /// Replace the backing arrays wholesale with a new population.
    ///
    /// Both slices must be dimension-major with `ndim * len` entries;
    /// callers (filter, splitter) guarantee consistent indexing against the
    /// characteristics and estimates they rebuild alongside.
    pub fn replace(&mut self, left: Vec<f64>, length: Vec<f64>, len: usize) {
        debug_assert_eq!(left.len(), self.ndim * len);
        debug_assert_eq!(length.len(), self.ndim * len);
        self.left = left;
        self.length = length;
        self.len = len;
    }
}

// ═══════════════════════════════════════════════════════════════════
// Per-region metadata and estimates
// ═══════════════════════════════════════════════════════════════════

/// Per-region classification output: activity flag and assigned split axis.
///
/// Recomputed every iteration; meaningless for a region once filtered out.
#[derive(Debug, Clone)]
pub struct RegionCharacteristics {
    pub active: Vec<bool>,
    pub split_dim: Vec<usize>,
}

impl RegionCharacteristics {
    /// All regions active, split dimension 0 (the pre-classification state).
    #[must_use]
    pub fn all_active(len: usize) -> Self {
        Self {
            active: vec![true; len],
            split_dim: vec![0; len],
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.active.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

/// Per-region `(integral, error)` pairs.
///
/// One instance holds the current iteration's raw estimates; a second holds
/// the surviving parents' estimates from the previous iteration, consumed by
/// the error refiner.
#[derive(Debug, Clone, Default)]
pub struct RegionEstimates {
    pub integral: Vec<f64>,
    pub error: Vec<f64>,
}

impl RegionEstimates {
    #[must_use]
    pub fn zeros(len: usize) -> Self {
        Self {
            integral: vec![0.0; len],
            error: vec![0.0; len],
        }
    }

    /// No retained history (the state before the first iteration).
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.integral.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.integral.is_empty()
    }
}
