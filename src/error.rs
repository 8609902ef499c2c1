// SPDX-License-Identifier: AGPL-3.0-only

//! Typed errors for cubature engine construction and input validation.
//!
//! Only caller-side misuse surfaces as an error. Numeric non-convergence and
//! budget exhaustion are ordinary outcomes, reported through
//! [`crate::pipeline::Status`] with a best-effort estimate attached, so
//! callers can pattern-match on failure modes rather than parsing strings.

use std::fmt;

/// Errors arising from invalid integration domains or tolerances.
#[derive(Debug, Clone, PartialEq)]
pub enum CubatureError {
    /// The integration domain has zero dimensions.
    EmptyDomain,

    /// A domain bound is degenerate or non-finite (lower must be strictly
    /// below upper, both finite).
    InvalidBounds { dim: usize, lo: f64, hi: f64 },

    /// A tolerance or budget parameter is out of range.
    InvalidTolerance { name: &'static str, value: f64 },

    /// The requested initial partition alone would exceed the region ceiling.
    RegionBudget { requested: usize, ceiling: usize },
}

impl fmt::Display for CubatureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyDomain => write!(f, "integration domain has zero dimensions"),
            Self::InvalidBounds { dim, lo, hi } => {
                write!(f, "invalid bounds on dimension {dim}: [{lo}, {hi}]")
            }
            Self::InvalidTolerance { name, value } => {
                write!(f, "invalid tolerance {name} = {value}")
            }
            Self::RegionBudget { requested, ceiling } => {
                write!(
                    f,
                    "initial partition of {requested} regions exceeds ceiling of {ceiling}"
                )
            }
        }
    }
}

impl std::error::Error for CubatureError {}
