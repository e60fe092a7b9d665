//! Density-ratio refinement for chaotic landscapes.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::Scale;
use crate::kde::WrappedKde;
use crate::refine::Refiner;
use crate::space::SearchSpace;

/// Quantile of history treated as the "good" observation set.
const GAMMA: f64 = 0.25;
/// Candidates drawn from the good model per proposal.
const N_CANDIDATES: usize = 24;

/// Splitmix-style multipliers for decorrelating the per-proposal RNG stream.
const OBSERVATION_MIX: u64 = 0x9E37_79B9_7F4A_7C15;
const PROPOSAL_MIX: u64 = 0xC2B2_AE3D_27D4_EB4F;

/// Tree-structured density-ratio search over the unit cube.
///
/// Keeps every counted observation and, per proposal, splits them at the
/// `GAMMA` quantile into a "good" and a "bad" kernel density model. A batch
/// of candidates is drawn from the good model and the one maximizing
/// `log l(x) - log g(x)` (the expected-improvement surrogate) is proposed.
/// Periodic dimensions are modeled on the circle throughout, so candidates
/// near a wrap point are scored correctly.
///
/// All randomness is reseeded per proposal from the run seed, the
/// observation count, and a proposal counter, so identical tell sequences
/// reproduce identical proposals.
#[derive(Debug)]
pub struct DensityGuidedRefiner {
    observations: Vec<(Vec<f64>, f64)>,
    seed: u64,
    proposals: u64,
}

impl DensityGuidedRefiner {
    /// Builds the refiner from the run seed and all counted history so far.
    #[must_use]
    pub fn new(seed: u64, observations: Vec<(Vec<f64>, f64)>) -> Self {
        Self {
            observations,
            seed,
            proposals: 0,
        }
    }

    fn rng(&self) -> StdRng {
        let state = self
            .seed
            .wrapping_add((self.observations.len() as u64).wrapping_mul(OBSERVATION_MIX))
            .wrapping_add(self.proposals.wrapping_mul(PROPOSAL_MIX));
        StdRng::seed_from_u64(state)
    }

    fn uniform_point(space: &SearchSpace, rng: &mut StdRng) -> Vec<f64> {
        (0..space.dims()).map(|_| rng.random::<f64>()).collect()
    }

    /// Number of observations assigned to the good model.
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn split_point(n: usize) -> usize {
        ((GAMMA * n as f64).ceil() as usize).clamp(1, n - 1)
    }
}

impl Refiner for DensityGuidedRefiner {
    fn propose(&mut self, space: &SearchSpace, remaining: u64) -> Vec<Vec<f64>> {
        if remaining == 0 {
            return Vec::new();
        }
        let mut rng = self.rng();
        self.proposals += 1;

        let n = self.observations.len();
        if n < 2 {
            return vec![Self::uniform_point(space, &mut rng)];
        }

        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| {
            self.observations[a]
                .1
                .partial_cmp(&self.observations[b].1)
                .unwrap_or(core::cmp::Ordering::Equal)
        });
        let split = Self::split_point(n);
        let good: Vec<Vec<f64>> = order[..split]
            .iter()
            .map(|&i| self.observations[i].0.clone())
            .collect();
        let bad: Vec<Vec<f64>> = order[split..]
            .iter()
            .map(|&i| self.observations[i].0.clone())
            .collect();

        let scales: Vec<Scale> = (0..space.dims()).map(|d| space.scale(d)).collect();
        let (Some(good_kde), Some(bad_kde)) = (
            WrappedKde::new(good, scales.clone()),
            WrappedKde::new(bad, scales),
        ) else {
            return vec![Self::uniform_point(space, &mut rng)];
        };

        let mut best: Option<(Vec<f64>, f64)> = None;
        for _ in 0..N_CANDIDATES {
            let mut candidate = good_kde.sample(&mut rng);
            space.fold_unit(&mut candidate);
            let score = good_kde.log_pdf(&candidate) - bad_kde.log_pdf(&candidate);
            let better = best.as_ref().map_or(true, |(_, s)| score > *s);
            if better {
                best = Some((candidate, score));
            }
        }
        match best {
            Some((candidate, _)) => vec![candidate],
            None => vec![Self::uniform_point(space, &mut rng)],
        }
    }

    fn absorb(&mut self, _space: &SearchSpace, results: &[(Vec<f64>, f64)]) {
        self.observations.extend(results.iter().cloned());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParamSpec;
    use indexmap::IndexMap;

    fn space(specs: &[(&str, ParamSpec)]) -> SearchSpace {
        let mut bounds = IndexMap::new();
        for (name, spec) in specs {
            bounds.insert((*name).to_string(), *spec);
        }
        SearchSpace::new(&bounds)
    }

    fn space_1d() -> SearchSpace {
        space(&[("x", ParamSpec::linear(0.0, 1.0))])
    }

    #[test]
    fn test_split_point_bounds() {
        assert_eq!(DensityGuidedRefiner::split_point(2), 1);
        assert_eq!(DensityGuidedRefiner::split_point(4), 1);
        assert_eq!(DensityGuidedRefiner::split_point(8), 2);
        assert_eq!(DensityGuidedRefiner::split_point(100), 25);
    }

    #[test]
    fn test_proposals_stay_in_cube() {
        let space = space(&[
            ("a", ParamSpec::linear(0.0, 1.0)),
            ("b", ParamSpec::periodic(0.0, 1.0)),
        ]);
        let observations: Vec<(Vec<f64>, f64)> = (0..12)
            .map(|i| {
                let u = f64::from(i) / 12.0;
                (vec![u, (u * 0.7).fract()], (u - 0.4).abs())
            })
            .collect();
        let mut refiner = DensityGuidedRefiner::new(3, observations);

        for _ in 0..20 {
            let batch = refiner.propose(&space, 10);
            assert_eq!(batch.len(), 1);
            for &u in &batch[0] {
                assert!((0.0..=1.0).contains(&u), "coordinate {u} escaped the cube");
            }
            refiner.absorb(&space, &[(batch[0].clone(), 1.0)]);
        }
    }

    #[test]
    fn test_identical_state_gives_identical_proposals() {
        let space = space_1d();
        let observations: Vec<(Vec<f64>, f64)> = (0..10)
            .map(|i| (vec![f64::from(i) / 10.0], f64::from((i * 3) % 7)))
            .collect();

        let mut a = DensityGuidedRefiner::new(42, observations.clone());
        let mut b = DensityGuidedRefiner::new(42, observations);
        assert_eq!(a.propose(&space, 5), b.propose(&space, 5));
    }

    #[test]
    fn test_consecutive_proposals_differ_without_new_results() {
        let space = space_1d();
        let observations: Vec<(Vec<f64>, f64)> = (0..10)
            .map(|i| (vec![f64::from(i) / 10.0], f64::from((i * 3) % 7)))
            .collect();
        let mut refiner = DensityGuidedRefiner::new(42, observations);

        // A fully pruned batch must not pin the search to one candidate.
        let first = refiner.propose(&space, 5);
        let second = refiner.propose(&space, 5);
        assert_ne!(first, second);
    }

    #[test]
    fn test_few_observations_fall_back_to_uniform() {
        let space = space_1d();
        let mut refiner = DensityGuidedRefiner::new(1, vec![(vec![0.5], 1.0)]);
        let batch = refiner.propose(&space, 5);
        assert_eq!(batch.len(), 1);
        assert!((0.0..1.0).contains(&batch[0][0]));
    }

    #[test]
    fn test_proposals_concentrate_near_good_observations() {
        let space = space_1d();
        // Low values cluster tightly near 0.2; high values near 0.8.
        let mut observations = Vec::new();
        for i in 0..4 {
            observations.push((vec![0.195 + f64::from(i) * 0.004], 0.1 + f64::from(i) * 0.01));
        }
        for i in 0..12 {
            observations.push((vec![0.76 + f64::from(i) * 0.005], 5.0 + f64::from(i)));
        }
        let mut refiner = DensityGuidedRefiner::new(7, observations);

        let batch = refiner.propose(&space, 10);
        assert!(
            (batch[0][0] - 0.2).abs() < 0.2,
            "proposal {} should land near the good cluster",
            batch[0][0]
        );
    }
}
