//! One-shot landscape classification from the evaluated probe batch.

use crate::space::SearchSpace;

/// Discrete landscape label derived from the structure score.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Landscape {
    /// Smooth or unimodal: local descent is expected to pay off.
    Structured,
    /// Noisy or multimodal: global density-guided search is safer.
    Chaotic,
}

/// The structure score and its derived label.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Classification {
    /// Residual decay coefficient in `[-1, 1]`. Values above the threshold
    /// indicate that residuals shrink consistently toward the best point.
    pub alpha: f64,
    /// Label derived from `alpha`.
    pub landscape: Landscape,
}

/// Classifies a probe batch by how strongly residuals decay toward the
/// incumbent best point.
///
/// Every probe point is ranked by wrap-aware distance from the best point;
/// `alpha` is the rank correlation between that proximity order and the
/// residual `value - best_value`. On a smooth bowl the two orders agree
/// almost perfectly, while on a rugged landscape the residual order is close
/// to independent of proximity. The rank form keeps the score scale-free
/// across objectives with wildly different value ranges.
///
/// Runs exactly once per solve, deterministically, on probe results only.
#[derive(Clone, Copy, Debug)]
pub struct ResidualDecayClassifier {
    threshold: f64,
    min_samples: usize,
}

impl Default for ResidualDecayClassifier {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            min_samples: 5,
        }
    }
}

impl ResidualDecayClassifier {
    fn chaotic(alpha: f64) -> Classification {
        Classification {
            alpha,
            landscape: Landscape::Chaotic,
        }
    }

    /// Scores the batch and derives the label.
    ///
    /// Non-finite values are ignored. Batches with fewer than `min_samples`
    /// usable entries, or without enough distinct residuals, default to
    /// [`Landscape::Chaotic`] with `alpha = 0`.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn classify(
        &self,
        space: &SearchSpace,
        points: &[Vec<f64>],
        values: &[f64],
    ) -> Classification {
        debug_assert_eq!(points.len(), values.len());
        let usable: Vec<usize> = (0..values.len())
            .filter(|&i| values[i].is_finite())
            .collect();
        if usable.len() < self.min_samples {
            return Self::chaotic(0.0);
        }

        let best = usable
            .iter()
            .copied()
            .min_by(|&a, &b| {
                values[a]
                    .partial_cmp(&values[b])
                    .unwrap_or(core::cmp::Ordering::Equal)
            })
            .unwrap_or(0);
        let best_value = values[best];
        let best_point = &points[best];

        let mut by_proximity: Vec<(f64, f64)> = usable
            .iter()
            .copied()
            .filter(|&i| i != best)
            .map(|i| {
                (
                    space.unit_distance(&points[i], best_point),
                    values[i] - best_value,
                )
            })
            .collect();
        by_proximity.sort_by(|a, b| a.partial_cmp(b).unwrap_or(core::cmp::Ordering::Equal));

        let residuals: Vec<f64> = by_proximity
            .iter()
            .filter(|&&(_, r)| r > 0.0)
            .map(|&(_, r)| r)
            .collect();
        let m = residuals.len();
        if m < 3 {
            return Self::chaotic(0.0);
        }

        // Spearman rank correlation between proximity order and residual
        // order, with ties broken by proximity.
        let mut order: Vec<usize> = (0..m).collect();
        order.sort_by(|&a, &b| {
            residuals[a]
                .partial_cmp(&residuals[b])
                .unwrap_or(core::cmp::Ordering::Equal)
        });
        let mut residual_rank = vec![0usize; m];
        for (pos, &i) in order.iter().enumerate() {
            residual_rank[i] = pos + 1;
        }

        let mf = m as f64;
        let d2: f64 = residual_rank
            .iter()
            .enumerate()
            .map(|(i, &rank)| {
                let d = rank as f64 - (i as f64 + 1.0);
                d * d
            })
            .sum();
        let alpha = 1.0 - 6.0 * d2 / (mf * (mf * mf - 1.0));

        Classification {
            alpha,
            landscape: if alpha > self.threshold {
                Landscape::Structured
            } else {
                Landscape::Chaotic
            },
        }
    }
}
