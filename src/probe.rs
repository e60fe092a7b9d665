//! Deterministic low-discrepancy probe sequence.
//!
//! The generator is a pure function of `(seed, dims, index)`: any process
//! holding the same configuration can recompute any index's point without
//! coordination, which is what makes probe sampling shardable across workers.

use crate::config::SolverConfig;
use crate::error::ConfigError;
use crate::space::SearchSpace;
use crate::trial::ParamPoint;

/// The seed selects one of this many starting offsets into the prime
/// sequence.
const OFFSET_CYCLE: u64 = 256;

fn sieve_primes(limit: usize) -> Vec<u64> {
    let mut is_prime = vec![true; limit + 1];
    is_prime[0] = false;
    if limit >= 1 {
        is_prime[1] = false;
    }
    let mut i = 2;
    while i * i <= limit {
        if is_prime[i] {
            let mut j = i * i;
            while j <= limit {
                is_prime[j] = false;
                j += i;
            }
        }
        i += 1;
    }
    is_prime
        .iter()
        .enumerate()
        .filter_map(|(n, &p)| p.then_some(n as u64))
        .collect()
}

/// First `n` primes, in order.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(crate) fn first_n_primes(n: usize) -> Vec<u64> {
    if n == 0 {
        return Vec::new();
    }
    // Rosser's bound on the nth prime, valid from n = 6.
    let mut limit = if n < 6 {
        16
    } else {
        let nf = n as f64;
        (nf * (nf.ln() + nf.ln().ln())).ceil() as usize
    };
    loop {
        let mut primes = sieve_primes(limit);
        if primes.len() >= n {
            primes.truncate(n);
            return primes;
        }
        limit *= 2;
    }
}

/// Stateless generator of low-discrepancy points in the unit hypercube.
///
/// Each dimension advances along an irrational slope (the square root of a
/// prime) from an irrational rotation offset, so the sequence is aperiodic
/// and well spread over any practical index range. Point `index` is computed
/// directly; no earlier index is ever needed.
#[derive(Clone, Debug)]
pub struct ProbeGenerator {
    slopes: Vec<f64>,
    rotations: Vec<f64>,
}

impl ProbeGenerator {
    /// Derives the per-dimension slope and rotation tables.
    ///
    /// The seed picks the starting offset into the prime sequence; the slope
    /// and rotation slices are disjoint.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyBounds`] when `dims` is zero.
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    pub fn new(seed: u64, dims: usize) -> Result<Self, ConfigError> {
        if dims == 0 {
            return Err(ConfigError::EmptyBounds);
        }
        let offset = (seed % OFFSET_CYCLE) as usize;
        let primes = first_n_primes(offset + 2 * dims);
        let slopes = primes[offset..offset + dims]
            .iter()
            .map(|&p| (p as f64).sqrt())
            .collect();
        let rotations = primes[offset + dims..offset + 2 * dims]
            .iter()
            .map(|&p| (p as f64 * (core::f64::consts::SQRT_2 - 1.0)).fract())
            .collect();
        Ok(Self { slopes, rotations })
    }

    /// Number of dimensions per point.
    #[must_use]
    pub fn dims(&self) -> usize {
        self.slopes.len()
    }

    /// The unit-cube point at `index`.
    ///
    /// Uses the 1-based position `index + 1` so index 0 does not collapse to
    /// the rotation offsets alone.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn point_at(&self, index: u64) -> Vec<f64> {
        let k = index as f64 + 1.0;
        self.slopes
            .iter()
            .zip(&self.rotations)
            .map(|(&slope, &rotation)| (k * slope + rotation).fract())
            .collect()
    }
}

/// Coordination-free parallel sampling over a configured space.
///
/// Any number of instances built from the same configuration and seed, in any
/// process, produce identical points for the same index. A worker `w` with
/// shard size `s` simply evaluates `sample_range(w * s, s)`.
#[derive(Clone, Debug)]
pub struct ShardableProbe {
    generator: ProbeGenerator,
    space: SearchSpace,
}

impl ShardableProbe {
    /// Builds a probe using the configuration's own seed.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when the configuration is invalid.
    pub fn new(config: &SolverConfig) -> Result<Self, ConfigError> {
        Self::with_seed(config, config.seed)
    }

    /// Builds a probe with an explicit seed, overriding the configuration's.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when the configuration is invalid.
    pub fn with_seed(config: &SolverConfig, seed: u64) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            generator: ProbeGenerator::new(seed, config.dims())?,
            space: SearchSpace::new(&config.bounds),
        })
    }

    /// The parameter point at `index`.
    #[must_use]
    pub fn sample_at(&self, index: u64) -> ParamPoint {
        self.space.to_params(&self.generator.point_at(index))
    }

    /// The contiguous run of points starting at `start`.
    ///
    /// `sample_range(s, n)[i]` equals `sample_at(s + i)` for every valid `i`.
    #[must_use]
    pub fn sample_range(&self, start: u64, count: usize) -> Vec<ParamPoint> {
        (0..count as u64)
            .map(|offset| self.sample_at(start + offset))
            .collect()
    }
}
