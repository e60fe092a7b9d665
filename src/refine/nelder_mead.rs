//! Simplex refinement for structured landscapes.

use crate::refine::Refiner;
use crate::space::SearchSpace;

const REFLECT: f64 = 1.0;
const EXPAND: f64 = 2.0;
const CONTRACT: f64 = 0.5;
const SHRINK: f64 = 0.5;

/// Simplex diameter below which further steps cannot move the incumbent.
const CONVERGENCE_TOL: f64 = 1e-8;

/// Which simplex operation is awaiting its evaluation.
#[derive(Clone, Debug)]
enum Step {
    /// No operation in flight; the next proposal starts a fresh iteration.
    Idle,
    Reflecting {
        centroid: Vec<f64>,
        candidate: Vec<f64>,
    },
    Expanding {
        reflected: (Vec<f64>, f64),
        candidate: Vec<f64>,
    },
    Contracting {
        candidate: Vec<f64>,
        accept_below: f64,
    },
    /// All non-best vertices were moved toward the best; the first `count`
    /// of them await re-evaluation.
    Shrinking { count: usize },
    /// Not enough budget or seeds for a simplex: keep returning the
    /// incumbent best point.
    Fallback,
}

/// Classical Nelder-Mead over the unit cube, driven one evaluation at a time
/// through the ask/tell loop.
///
/// Seeded with the best `dims + 1` probe points, whose values are already
/// known, so no evaluations are spent building the initial simplex. Every
/// candidate is folded into the cube before being proposed: clamped on
/// Linear dimensions, wrapped on Periodic ones, which lets the simplex
/// escape through a periodic boundary instead of piling up against it.
///
/// When the simplex collapses onto a single point, further proposals are
/// withheld and the run finishes early rather than burning budget in place.
#[derive(Debug)]
pub struct NelderMeadRefiner {
    /// Simplex vertices with their values, sorted ascending at the start of
    /// each iteration.
    vertices: Vec<(Vec<f64>, f64)>,
    step: Step,
}

impl NelderMeadRefiner {
    /// Builds the refiner from pre-evaluated seed points.
    ///
    /// Falls back to re-proposing the incumbent best when there are fewer
    /// seeds than `dims + 1` or the remaining budget cannot cover one
    /// simplex pass.
    #[must_use]
    pub fn new(dims: usize, mut seeds: Vec<(Vec<f64>, f64)>, remaining: u64) -> Self {
        seeds.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(core::cmp::Ordering::Equal));
        let simplex_size = dims + 1;
        let step = if seeds.len() < simplex_size || remaining < simplex_size as u64 {
            Step::Fallback
        } else {
            seeds.truncate(simplex_size);
            Step::Idle
        };
        Self {
            vertices: seeds,
            step,
        }
    }

    fn sort_vertices(&mut self) {
        self.vertices
            .sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(core::cmp::Ordering::Equal));
    }

    /// Centroid of every vertex except the worst.
    #[allow(clippy::cast_precision_loss)]
    fn centroid(&self) -> Vec<f64> {
        let n = self.vertices.len() - 1;
        let dims = self.vertices[0].0.len();
        let mut c = vec![0.0; dims];
        for (point, _) in &self.vertices[..n] {
            for (acc, &x) in c.iter_mut().zip(point) {
                *acc += x;
            }
        }
        for acc in &mut c {
            *acc /= n as f64;
        }
        c
    }

    fn affine(space: &SearchSpace, from: &[f64], toward: &[f64], coefficient: f64) -> Vec<f64> {
        let mut out: Vec<f64> = from
            .iter()
            .zip(toward)
            .map(|(&f, &t)| f + coefficient * (t - f))
            .collect();
        space.fold_unit(&mut out);
        out
    }

    fn replace_worst(&mut self, point: Vec<f64>, value: f64) {
        let worst = self.vertices.len() - 1;
        self.vertices[worst] = (point, value);
    }

    /// Whether every vertex has collapsed onto the best one.
    fn converged(&self, space: &SearchSpace) -> bool {
        let best = &self.vertices[0].0;
        self.vertices[1..]
            .iter()
            .all(|(point, _)| space.unit_distance(best, point) < CONVERGENCE_TOL)
    }

    /// Moves every non-best vertex toward the best and marks them stale.
    fn start_shrink(&mut self, space: &SearchSpace) {
        let best = self.vertices[0].0.clone();
        let count = self.vertices.len() - 1;
        for (point, _) in &mut self.vertices[1..] {
            let mut moved: Vec<f64> = best
                .iter()
                .zip(point.iter())
                .map(|(&b, &x)| b + SHRINK * (x - b))
                .collect();
            space.fold_unit(&mut moved);
            *point = moved;
        }
        self.step = Step::Shrinking { count };
    }
}

impl Refiner for NelderMeadRefiner {
    fn propose(&mut self, space: &SearchSpace, remaining: u64) -> Vec<Vec<f64>> {
        if remaining == 0 || self.vertices.is_empty() {
            return Vec::new();
        }
        match &self.step {
            Step::Fallback => vec![self.vertices[0].0.clone()],
            Step::Idle => {
                self.sort_vertices();
                if self.converged(space) {
                    return Vec::new();
                }
                let centroid = self.centroid();
                let worst = &self.vertices[self.vertices.len() - 1].0;
                let candidate = Self::affine(space, &centroid, worst, -REFLECT);
                self.step = Step::Reflecting {
                    centroid,
                    candidate: candidate.clone(),
                };
                vec![candidate]
            }
            // An in-flight candidate whose batch produced no counted result
            // is proposed again.
            Step::Reflecting { candidate, .. }
            | Step::Expanding { candidate, .. }
            | Step::Contracting { candidate, .. } => vec![candidate.clone()],
            Step::Shrinking { count } => {
                let take = (*count).min(usize::try_from(remaining).unwrap_or(usize::MAX));
                self.vertices[1..=take]
                    .iter()
                    .map(|(point, _)| point.clone())
                    .collect()
            }
        }
    }

    fn absorb(&mut self, space: &SearchSpace, results: &[(Vec<f64>, f64)]) {
        match core::mem::replace(&mut self.step, Step::Idle) {
            Step::Fallback => {
                self.step = Step::Fallback;
                if let Some((point, value)) = results.first() {
                    if *value < self.vertices[0].1 {
                        self.vertices[0] = (point.clone(), *value);
                    }
                }
            }
            Step::Idle => {
                // Out-of-band results (warm-start injections): adopt any
                // that beat the current worst vertex.
                for (point, value) in results {
                    let worst = self.vertices.len() - 1;
                    if *value < self.vertices[worst].1 {
                        self.replace_worst(point.clone(), *value);
                        self.sort_vertices();
                    }
                }
            }
            Step::Reflecting {
                centroid,
                candidate,
            } => {
                // A fully pruned batch counts as a worst-possible outcome.
                let reflected_value = results.first().map_or(f64::INFINITY, |r| r.1);
                let n = self.vertices.len();
                let best = self.vertices[0].1;
                let second_worst = self.vertices[n - 2].1;
                let worst = self.vertices[n - 1].1;

                if reflected_value < best {
                    let expanded = Self::affine(space, &centroid, &candidate, EXPAND);
                    self.step = Step::Expanding {
                        reflected: (candidate, reflected_value),
                        candidate: expanded,
                    };
                } else if reflected_value < second_worst {
                    self.replace_worst(candidate, reflected_value);
                } else if reflected_value < worst {
                    let contracted = Self::affine(space, &centroid, &candidate, CONTRACT);
                    self.step = Step::Contracting {
                        candidate: contracted,
                        accept_below: reflected_value,
                    };
                } else {
                    let worst_point = self.vertices[n - 1].0.clone();
                    let contracted = Self::affine(space, &centroid, &worst_point, CONTRACT);
                    self.step = Step::Contracting {
                        candidate: contracted,
                        accept_below: worst,
                    };
                }
            }
            Step::Expanding {
                reflected,
                candidate,
            } => {
                let expanded_value = results.first().map_or(f64::INFINITY, |r| r.1);
                if expanded_value < reflected.1 {
                    self.replace_worst(candidate, expanded_value);
                } else {
                    self.replace_worst(reflected.0, reflected.1);
                }
            }
            Step::Contracting {
                candidate,
                accept_below,
            } => {
                let contracted_value = results.first().map_or(f64::INFINITY, |r| r.1);
                if contracted_value < accept_below {
                    self.replace_worst(candidate, contracted_value);
                } else {
                    self.start_shrink(space);
                }
            }
            Step::Shrinking { .. } => {
                for (offset, (_, value)) in results.iter().enumerate() {
                    if let Some(vertex) = self.vertices.get_mut(1 + offset) {
                        vertex.1 = *value;
                    }
                }
            }
        }
    }
}
