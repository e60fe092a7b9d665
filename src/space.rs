//! Mapping between the unit hypercube and the configured parameter domains.
//!
//! All search logic operates on unit-cube coordinates; only the edges of the
//! engine (ask output, tell input) cross through this mapping.

use indexmap::IndexMap;

use crate::config::{ParamSpec, Scale};
use crate::error::ProtocolError;
use crate::trial::ParamPoint;

/// The ordered set of parameter domains for one run.
#[derive(Clone, Debug)]
pub struct SearchSpace {
    names: Vec<String>,
    specs: Vec<ParamSpec>,
}

impl SearchSpace {
    /// Builds a space from validated bounds, preserving insertion order.
    #[must_use]
    pub fn new(bounds: &IndexMap<String, ParamSpec>) -> Self {
        Self {
            names: bounds.keys().cloned().collect(),
            specs: bounds.values().copied().collect(),
        }
    }

    /// Number of dimensions.
    #[must_use]
    pub fn dims(&self) -> usize {
        self.specs.len()
    }

    /// Parameter names in canonical dimension order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Boundary semantics of dimension `dim`.
    ///
    /// # Panics
    ///
    /// Panics if `dim` is out of range.
    #[must_use]
    pub fn scale(&self, dim: usize) -> Scale {
        self.specs[dim].scale
    }

    /// Folds a raw unit coordinate into `[0, 1]` according to the
    /// dimension's scale: clamped for Linear, wrapped for Periodic.
    fn fold(scale: Scale, u: f64) -> f64 {
        match scale {
            Scale::Linear => u.clamp(0.0, 1.0),
            Scale::Periodic => u.rem_euclid(1.0),
        }
    }

    /// Folds every coordinate of a candidate in place.
    pub fn fold_unit(&self, unit: &mut [f64]) {
        debug_assert_eq!(unit.len(), self.dims());
        for (u, spec) in unit.iter_mut().zip(&self.specs) {
            *u = Self::fold(spec.scale, *u);
        }
    }

    /// Maps a unit-cube point to a named parameter point.
    ///
    /// Out-of-range coordinates are folded first, so Linear dimensions clamp
    /// at their bounds and Periodic dimensions wrap through them.
    #[must_use]
    pub fn to_params(&self, unit: &[f64]) -> ParamPoint {
        debug_assert_eq!(unit.len(), self.dims());
        let mut point = ParamPoint::with_capacity(self.dims());
        for ((name, spec), &u) in self.names.iter().zip(&self.specs).zip(unit) {
            let folded = Self::fold(spec.scale, u);
            let value = spec.min + folded * spec.span();
            let value = match spec.scale {
                Scale::Linear => value.clamp(spec.min, spec.max),
                Scale::Periodic => value,
            };
            point.insert(name.clone(), value);
        }
        point
    }

    /// Maps a named parameter point back to unit-cube coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::UnknownParameter`] when the point omits a
    /// configured parameter or carries one that was never configured.
    pub fn to_unit(&self, point: &ParamPoint) -> Result<Vec<f64>, ProtocolError> {
        let mut unit = Vec::with_capacity(self.dims());
        for (name, spec) in self.names.iter().zip(&self.specs) {
            let value = point
                .get(name)
                .copied()
                .ok_or_else(|| ProtocolError::UnknownParameter(name.clone()))?;
            unit.push(Self::fold(spec.scale, (value - spec.min) / spec.span()));
        }
        if point.len() != self.names.len() {
            for name in point.keys() {
                if !self.names.contains(name) {
                    return Err(ProtocolError::UnknownParameter(name.clone()));
                }
            }
        }
        Ok(unit)
    }

    /// Euclidean distance between two unit points, using wrap-around
    /// distance `min(|a - b|, 1 - |a - b|)` on Periodic dimensions.
    #[must_use]
    pub fn unit_distance(&self, a: &[f64], b: &[f64]) -> f64 {
        debug_assert_eq!(a.len(), self.dims());
        debug_assert_eq!(b.len(), self.dims());
        self.specs
            .iter()
            .zip(a.iter().zip(b))
            .map(|(spec, (&ai, &bi))| {
                let d = (ai - bi).abs();
                let d = match spec.scale {
                    Scale::Linear => d,
                    Scale::Periodic => d.min(1.0 - d),
                };
                d * d
            })
            .sum::<f64>()
            .sqrt()
    }
}
