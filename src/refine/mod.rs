//! Refinement strategies selected by the landscape classification.
//!
//! Both strategies work purely in unit-cube coordinates; the solver maps
//! proposals to parameter points at the ask boundary and maps reported
//! results back before absorbing them.

mod density;
mod nelder_mead;

pub use density::DensityGuidedRefiner;
pub use nelder_mead::NelderMeadRefiner;

use crate::space::SearchSpace;

/// A refinement strategy driven by the ask/tell loop.
///
/// The solver alternates `propose` and `absorb`: every counted result for a
/// proposed batch is absorbed before the next proposal is requested.
pub trait Refiner: Send {
    /// Next unit-cube candidates to evaluate, at most `remaining` of them.
    ///
    /// Returning an empty batch when `remaining > 0` signals that the
    /// strategy has nothing further to try; the solver then finishes the run.
    fn propose(&mut self, space: &SearchSpace, remaining: u64) -> Vec<Vec<f64>>;

    /// Feeds back the counted results of the last proposed batch, as
    /// `(unit_point, value)` pairs. Values are never NaN: anomalies are
    /// mapped to `f64::INFINITY` before reaching the refiner.
    fn absorb(&mut self, space: &SearchSpace, results: &[(Vec<f64>, f64)]);
}
