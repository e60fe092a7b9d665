//! Solver configuration and its wire format.
//!
//! A configuration is usually deserialized from a JSON document produced by
//! external tooling; the field names and defaults here are a compatibility
//! surface and must stay stable. `bounds` is an ordered map: insertion order
//! is the canonical dimension order and determinism depends on it.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// How a parameter's domain treats its boundaries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scale {
    /// Values are clamped into `[min, max]`.
    #[default]
    Linear,
    /// The domain is a circle: `min` and `max` are identified as adjacent,
    /// and out-of-range values wrap around instead of clamping.
    Periodic,
}

/// The declared domain of a single parameter.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    /// Lower bound, inclusive.
    pub min: f64,
    /// Upper bound. Inclusive for [`Scale::Linear`], exclusive for
    /// [`Scale::Periodic`] (the wrap point maps back to `min`).
    pub max: f64,
    /// Boundary semantics. Defaults to [`Scale::Linear`] when omitted from a
    /// serialized document.
    #[serde(default)]
    pub scale: Scale,
}

impl ParamSpec {
    /// A clamped linear domain over `[min, max]`.
    #[must_use]
    pub fn linear(min: f64, max: f64) -> Self {
        Self {
            min,
            max,
            scale: Scale::Linear,
        }
    }

    /// A wrap-around domain over `[min, max)`.
    #[must_use]
    pub fn periodic(min: f64, max: f64) -> Self {
        Self {
            min,
            max,
            scale: Scale::Periodic,
        }
    }

    /// Width of the domain.
    #[must_use]
    pub fn span(&self) -> f64 {
        self.max - self.min
    }
}

fn default_probe_ratio() -> f64 {
    0.2
}

/// Immutable configuration for a [`Solver`](crate::Solver) run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Seed for the deterministic probe sequence and refinement randomness.
    pub seed: u64,
    /// Maximum number of counted (non-pruned) evaluations.
    pub budget: u64,
    /// Parameter domains, in canonical dimension order.
    pub bounds: IndexMap<String, ParamSpec>,
    /// Fraction of the budget spent on the probe phase, in `(0.0, 1.0]`.
    /// Defaults to `0.2` when omitted from a serialized document.
    #[serde(default = "default_probe_ratio")]
    pub probe_ratio: f64,
}

impl SolverConfig {
    /// Creates a configuration with no bounds and the default probe ratio.
    /// Add parameters with [`with_bound`](Self::with_bound).
    #[must_use]
    pub fn new(seed: u64, budget: u64) -> Self {
        Self {
            seed,
            budget,
            bounds: IndexMap::new(),
            probe_ratio: default_probe_ratio(),
        }
    }

    /// Appends a parameter domain. Insertion order fixes the dimension order.
    #[must_use]
    pub fn with_bound(mut self, name: impl Into<String>, spec: ParamSpec) -> Self {
        self.bounds.insert(name.into(), spec);
        self
    }

    /// Overrides the probe-phase fraction of the budget.
    #[must_use]
    pub fn with_probe_ratio(mut self, probe_ratio: f64) -> Self {
        self.probe_ratio = probe_ratio;
        self
    }

    /// Parses and validates a configuration from a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed documents (including an
    /// unrecognized `scale` value) and the relevant [`ConfigError`] variant
    /// for inconsistent field values.
    pub fn from_json(doc: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(doc)?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes the configuration to its canonical JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if serialization fails.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Checks every configured invariant.
    ///
    /// # Errors
    ///
    /// Returns the first violated [`ConfigError`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.budget == 0 {
            return Err(ConfigError::InvalidBudget);
        }
        if !self.probe_ratio.is_finite() || self.probe_ratio <= 0.0 || self.probe_ratio > 1.0 {
            return Err(ConfigError::InvalidProbeRatio(self.probe_ratio));
        }
        if self.bounds.is_empty() {
            return Err(ConfigError::EmptyBounds);
        }
        for (name, spec) in &self.bounds {
            if !spec.min.is_finite() || !spec.max.is_finite() || spec.min >= spec.max {
                return Err(ConfigError::InvalidBounds {
                    name: name.clone(),
                    min: spec.min,
                    max: spec.max,
                });
            }
        }
        Ok(())
    }

    /// Number of parameter dimensions.
    #[must_use]
    pub fn dims(&self) -> usize {
        self.bounds.len()
    }

    /// Size of the probe phase: `ceil(probe_ratio * budget)`, never above the
    /// budget itself.
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    #[must_use]
    pub fn probe_n(&self) -> u64 {
        let raw = (self.probe_ratio * self.budget as f64).ceil() as u64;
        raw.min(self.budget)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json_with_defaults() {
        let doc = r#"{
            "seed": 42,
            "budget": 100,
            "bounds": {
                "x": {"min": -5.0, "max": 5.0},
                "theta": {"min": 0.0, "max": 6.2831853, "scale": "Periodic"}
            }
        }"#;
        let config = SolverConfig::from_json(doc).unwrap();

        assert_eq!(config.seed, 42);
        assert_eq!(config.budget, 100);
        assert!((config.probe_ratio - 0.2).abs() < f64::EPSILON);
        assert_eq!(config.bounds["x"].scale, Scale::Linear);
        assert_eq!(config.bounds["theta"].scale, Scale::Periodic);
    }

    #[test]
    fn test_from_json_preserves_bound_order() {
        let doc = r#"{
            "seed": 0,
            "budget": 10,
            "bounds": {
                "z": {"min": 0.0, "max": 1.0},
                "a": {"min": 0.0, "max": 1.0},
                "m": {"min": 0.0, "max": 1.0}
            }
        }"#;
        let config = SolverConfig::from_json(doc).unwrap();
        let names: Vec<&str> = config.bounds.keys().map(String::as_str).collect();
        assert_eq!(names, ["z", "a", "m"]);
    }

    #[test]
    fn test_from_json_rejects_unknown_scale() {
        let doc = r#"{
            "seed": 0,
            "budget": 10,
            "bounds": {"x": {"min": 0.0, "max": 1.0, "scale": "Log"}}
        }"#;
        assert!(matches!(
            SolverConfig::from_json(doc),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_validate_rejects_zero_budget() {
        let config = SolverConfig::new(0, 0).with_bound("x", ParamSpec::linear(0.0, 1.0));
        assert!(matches!(config.validate(), Err(ConfigError::InvalidBudget)));
    }

    #[test]
    fn test_validate_rejects_bad_probe_ratio() {
        for ratio in [0.0, -0.1, 1.5, f64::NAN] {
            let config = SolverConfig::new(0, 10)
                .with_bound("x", ParamSpec::linear(0.0, 1.0))
                .with_probe_ratio(ratio);
            assert!(
                matches!(config.validate(), Err(ConfigError::InvalidProbeRatio(_))),
                "ratio {ratio} should be rejected"
            );
        }
    }

    #[test]
    fn test_validate_rejects_inverted_bounds() {
        let config = SolverConfig::new(0, 10).with_bound("x", ParamSpec::linear(2.0, 1.0));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidBounds { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_empty_bounds() {
        let config = SolverConfig::new(0, 10);
        assert!(matches!(config.validate(), Err(ConfigError::EmptyBounds)));
    }

    #[test]
    fn test_probe_n_rounds_up_and_clamps() {
        let base = SolverConfig::new(0, 10).with_bound("x", ParamSpec::linear(0.0, 1.0));

        assert_eq!(base.clone().with_probe_ratio(0.2).probe_n(), 2);
        assert_eq!(base.clone().with_probe_ratio(0.25).probe_n(), 3);
        assert_eq!(base.clone().with_probe_ratio(0.01).probe_n(), 1);
        assert_eq!(base.with_probe_ratio(1.0).probe_n(), 10);
    }

    #[test]
    fn test_json_round_trip() {
        let config = SolverConfig::new(7, 50)
            .with_bound("x", ParamSpec::linear(-1.0, 1.0))
            .with_bound("phase", ParamSpec::periodic(0.0, 1.0))
            .with_probe_ratio(0.3);
        let doc = config.to_json().unwrap();
        let back = SolverConfig::from_json(&doc).unwrap();

        assert_eq!(back.seed, config.seed);
        assert_eq!(back.budget, config.budget);
        assert_eq!(back.bounds, config.bounds);
        assert!((back.probe_ratio - config.probe_ratio).abs() < f64::EPSILON);
    }
}
