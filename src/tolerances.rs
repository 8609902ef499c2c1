// SPDX-License-Identifier: AGPL-3.0-only

//! Centralized engine constants with numerical justification.
//!
//! Every threshold used by the refinement, classification, and driver layers
//! is defined here with documentation of its origin. No ad-hoc magic numbers
//! in the algorithm modules.

// ═══════════════════════════════════════════════════════════════════
// Two-level error refinement
// ═══════════════════════════════════════════════════════════════════

/// Fraction of the parent/children integral discrepancy charged as error.
///
/// After a bisection, `left + right − parent` measures the disagreement
/// between the two refinement levels. One quarter of it is attributed to
/// each child as an error floor: half to the pair, split evenly.
pub const DISCREPANCY_FRACTION: f64 = 0.25;

// ═══════════════════════════════════════════════════════════════════
// Budget classifier policy
// ═══════════════════════════════════════════════════════════════════

/// Floor on a region's budget weight, as a fraction of the mean active mass.
///
/// Regions whose integral is near zero (flat patches of the integrand) would
/// otherwise receive a vanishing share of the error budget and never
/// converge. The floor hands them at least 1/1000 of an average region's
/// allotment, which is negligible for peaked integrands but unsticks flat
/// ones.
pub const WEIGHT_FLOOR: f64 = 1e-3;

// ═══════════════════════════════════════════════════════════════════
// Driver defaults
// ═══════════════════════════════════════════════════════════════════

/// Default relative-error target.
pub const DEFAULT_EPSREL: f64 = 1e-3;

/// Default absolute-error target.
///
/// Small enough that the relative target governs for any integrand whose
/// magnitude is not itself near zero.
pub const DEFAULT_EPSABS: f64 = 1e-12;

/// Default iteration ceiling.
///
/// The active population can double each iteration, so the region ceiling is
/// normally reached first; this bound catches oscillating classifications.
pub const DEFAULT_MAX_ITERATIONS: usize = 100;

/// Default ceiling on the active region population (~4M regions).
///
/// Geometry plus estimates cost `(2·ndim + 4) · 8` bytes per region; at 8
/// dimensions the ceiling corresponds to roughly 640 MB of working state.
pub const DEFAULT_MAX_REGIONS: usize = 1 << 22;

/// Initial uniform splits per axis as a function of dimension.
///
/// A fine starting grid in low dimension buys better first-pass error
/// estimates, but the box count is `splits^ndim` so high dimensions must
/// start coarse.
#[must_use]
pub fn default_splits_per_dim(ndim: usize) -> usize {
    match ndim {
        0..=4 => 4,
        5..=10 => 2,
        _ => 1,
    }
}

// ═══════════════════════════════════════════════════════════════════
// Test tolerances
// ═══════════════════════════════════════════════════════════════════

/// Tolerance for operations that should be exact in f64 arithmetic,
/// allowing a few digits of accumulated rounding.
pub const EXACT_F64: f64 = 1e-10;
