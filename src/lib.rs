// SPDX-License-Identifier: AGPL-3.0-only

//! hyperquad — adaptive region-based multidimensional cubature
//!
//! Computes definite integrals of a user-supplied function over an
//! axis-aligned hyper-rectangle to a requested `(epsrel, epsabs)` tolerance
//! by tracking a dynamic population of sub-regions: estimate each region with
//! a local cubature rule, tighten the per-region error against the previous
//! iteration's parent estimates, classify regions converged or active,
//! compact converged regions into a running global total, and bisect the
//! survivors. Every phase is a barrier-separated data-parallel pass over
//! region indices (rayon); the compaction step is the single scan-then-gather
//! exception.
//!
//! ## Active modules
//!   - `storage` — structure-of-arrays region geometry, characteristics, estimates
//!   - `scan` — exclusive prefix sum (parallel + sequential oracle) and reductions
//!   - `refine` — two-level error refinement against parent estimates
//!   - `classify` — pluggable convergence heuristic and split-dimension choice
//!   - `filter` — stream compaction of converged regions, running global total
//!   - `split` — bisection of surviving regions along their assigned dimension
//!   - `rule` — injected local cubature rule seam + embedded midpoint reference
//!   - `pipeline` — the iteration driver and its termination state machine
//!   - `genz` — Genz integrand families for validation
//!
//! ## Example
//!
//! ```
//! use hyperquad::pipeline::{CubatureEngine, Status, Target};
//! use hyperquad::rule::MidpointPairRule;
//!
//! let target = Target::new(1e-3, 1e-9).unwrap();
//! let engine = CubatureEngine::new(target);
//! let bounds = [(0.0, 1.0), (0.0, 1.0)];
//! // f(x, y) = x + y over the unit square integrates to 1.
//! let result = engine
//!     .run(&bounds, &MidpointPairRule, &|x: &[f64]| x[0] + x[1])
//!     .unwrap();
//! assert_eq!(result.status, Status::Converged);
//! assert!((result.estimate - 1.0).abs() < 1e-3);
//! ```

pub mod classify;
pub mod error;
pub mod filter;
pub mod genz;
pub mod pipeline;
pub mod refine;
pub mod rule;
pub mod scan;
pub mod split;
pub mod storage;
pub mod tolerances;

pub use classify::{BudgetClassifier, Classifier, ClassifyResult, GlobalState};
pub use error::CubatureError;
pub use filter::RunningTotal;
pub use pipeline::{CubatureEngine, IntegrationResult, Status, Target};
pub use rule::{CubatureRule, Integrand, MidpointPairRule};
pub use storage::{RegionCharacteristics, RegionEstimates, RegionStore};
