#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![deny(unreachable_pub)]
#![deny(clippy::correctness)]
#![deny(clippy::suspicious)]
#![deny(clippy::style)]
#![deny(clippy::complexity)]
#![deny(clippy::perf)]
#![deny(clippy::pedantic)]
#![deny(clippy::std_instead_of_core)]

//! Sample-efficient black-box minimizer for expensive objective functions,
//! driven through an ask/tell protocol. A deterministic low-discrepancy probe
//! covers the space first; a one-shot landscape classification then routes
//! the remaining budget to either a batched Nelder-Mead simplex (structured
//! landscapes) or a density-ratio model search (chaotic ones). Every run is
//! bit-reproducible from its seed, and the probe phase can be sharded across
//! workers without coordination.
//!
//! # Getting Started
//!
//! Minimize a function with a budget of 20 evaluations:
//!
//! ```
//! use arqon::prelude::*;
//!
//! let config = SolverConfig::new(42, 20)
//!     .with_bound("x", ParamSpec::linear(-5.0, 5.0))
//!     .with_bound("y", ParamSpec::linear(-5.0, 5.0));
//! let mut solver = Solver::new(config)?;
//!
//! let mut next_id = 0;
//! while let Some(batch) = solver.ask() {
//!     let results: Vec<EvalTrace> = batch
//!         .into_iter()
//!         .map(|params| {
//!             let value = params.values().map(|v| (v - 1.0) * (v - 1.0)).sum();
//!             let trace = EvalTrace {
//!                 eval_id: next_id,
//!                 params,
//!                 value,
//!                 cost: 0.0,
//!                 outcome: Outcome::Counted,
//!             };
//!             next_id += 1;
//!             trace
//!         })
//!         .collect();
//!     solver.tell(results)?;
//! }
//!
//! let best = solver.best().unwrap();
//! println!("f = {:.4} at {:?}", best.value, best.params);
//! # Ok::<(), arqon::Error>(())
//! ```
//!
//! # Core Concepts
//!
//! | Type | Role |
//! |------|------|
//! | [`Solver`] | Drive one run: hand out batches via `ask`, take results via `tell`, track the best. |
//! | [`SolverConfig`] | Seed, evaluation budget, named bounds, and the probe fraction; also loadable from JSON. |
//! | [`ParamSpec`] | One parameter's bounds and its [`Scale`] (clamped linear or wrapping periodic). |
//! | [`EvalTrace`] | One evaluated point reported back through `tell`, counted or pruned. |
//! | [`ShardableProbe`] | Standalone access to the deterministic probe sequence for distributed sampling. |
//! | [`Classification`] | The one-shot landscape verdict ([`Landscape::Structured`] or [`Landscape::Chaotic`]) and its score. |
//! | [`Refiner`](refine::Refiner) | Strategy spending the post-probe budget: [`NelderMeadRefiner`](refine::NelderMeadRefiner) or [`DensityGuidedRefiner`](refine::DensityGuidedRefiner). |
//!
//! # Feature Flags
//!
//! | Flag | What it enables | Default |
//! |------|----------------|---------|
//! | `tracing` | Structured log events via [`tracing`](https://docs.rs/tracing) at phase transitions and anomalies | off |

/// Emit a `tracing::info!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_info {
    ($($arg:tt)*) => { tracing::info!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_info {
    ($($arg:tt)*) => {};
}

/// Emit a `tracing::debug!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_debug {
    ($($arg:tt)*) => { tracing::debug!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_debug {
    ($($arg:tt)*) => {};
}

mod classify;
mod config;
mod error;
mod kde;
mod probe;
pub mod refine;
mod solver;
mod space;
mod trial;

pub use classify::{Classification, Landscape, ResidualDecayClassifier};
pub use config::{ParamSpec, Scale, SolverConfig};
pub use error::{ConfigError, Error, ProtocolError, Result};
pub use probe::{ProbeGenerator, ShardableProbe};
pub use solver::{Phase, Solver};
pub use space::SearchSpace;
pub use trial::{EvalTrace, Outcome, ParamPoint, SeedPoint};

/// Convenient wildcard import for the most common types.
///
/// ```
/// use arqon::prelude::*;
/// ```
pub mod prelude {
    pub use crate::classify::{Classification, Landscape};
    pub use crate::config::{ParamSpec, Scale, SolverConfig};
    pub use crate::error::{ConfigError, Error, ProtocolError, Result};
    pub use crate::probe::{ProbeGenerator, ShardableProbe};
    pub use crate::refine::{DensityGuidedRefiner, NelderMeadRefiner, Refiner};
    pub use crate::solver::{Phase, Solver};
    pub use crate::space::SearchSpace;
    pub use crate::trial::{EvalTrace, Outcome, ParamPoint, SeedPoint};
}
