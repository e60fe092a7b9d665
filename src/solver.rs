//! The ask/tell state machine orchestrating probe, classification, and
//! refinement.

use std::collections::HashSet;

use crate::classify::{Classification, Landscape, ResidualDecayClassifier};
use crate::config::SolverConfig;
use crate::error::{ConfigError, ProtocolError};
use crate::probe::ProbeGenerator;
use crate::refine::{DensityGuidedRefiner, NelderMeadRefiner, Refiner};
use crate::space::SearchSpace;
use crate::trial::{EvalTrace, History, Outcome, ParamPoint, SeedPoint};

/// Synthetic eval ids for seeded records live above this base so they cannot
/// collide with caller-assigned ids.
const SEED_ID_BASE: u64 = 1 << 62;

/// Lifecycle of one solve. Transitions are one-directional.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Emitting deterministic probe points.
    Probing,
    /// Probe budget reached; the next `ask` runs the classifier and
    /// instantiates the refiner without consuming a round-trip.
    Classifying,
    /// Delegating to the selected refinement strategy.
    Refining,
    /// Budget exhausted; `ask` returns nothing and `tell` is an error.
    Done,
}

/// Sample-efficient black-box minimizer driven through ask/tell.
///
/// The caller repeatedly asks for a batch, evaluates it externally, and
/// tells the results back. A fixed fraction of the budget goes to a
/// deterministic low-discrepancy probe of the space; the evaluated probe
/// batch is then classified once, and the remaining budget is spent by the
/// refinement strategy the classification selects.
///
/// For a fixed configuration, two instances fed identical `tell` sequences
/// produce identical `ask` outputs at every step.
pub struct Solver {
    config: SolverConfig,
    space: SearchSpace,
    probe: ProbeGenerator,
    probe_cursor: u64,
    probe_n: u64,
    classifier: ResidualDecayClassifier,
    classification: Option<Classification>,
    refiner: Option<Box<dyn Refiner>>,
    history: History,
    /// Points asked and not yet answered by `tell`.
    outstanding: usize,
    /// Counted results buffered until the in-flight batch completes, then
    /// absorbed by the refiner in one call.
    pending: Vec<(Vec<f64>, f64)>,
    phase: Phase,
    next_seed_id: u64,
}

impl Solver {
    /// Builds a solver from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns the relevant [`ConfigError`] when the configuration is
    /// inconsistent; no partial engine is created.
    pub fn new(config: SolverConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let space = SearchSpace::new(&config.bounds);
        let probe = ProbeGenerator::new(config.seed, config.dims())?;
        let probe_n = config.probe_n();
        Ok(Self {
            config,
            space,
            probe,
            probe_cursor: 0,
            probe_n,
            classifier: ResidualDecayClassifier::default(),
            classification: None,
            refiner: None,
            history: History::default(),
            outstanding: 0,
            pending: Vec::new(),
            phase: Phase::Probing,
            next_seed_id: SEED_ID_BASE,
        })
    }

    /// Builds a solver from a JSON configuration document.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for malformed or inconsistent documents.
    pub fn from_json(doc: &str) -> Result<Self, ConfigError> {
        Self::new(SolverConfig::from_json(doc)?)
    }

    /// Next batch of points to evaluate.
    ///
    /// Returns `None` once the run is done, and also while a previously
    /// asked batch has unanswered points; finish telling the batch first.
    pub fn ask(&mut self) -> Option<Vec<ParamPoint>> {
        if self.outstanding > 0 {
            return None;
        }
        loop {
            match self.phase {
                Phase::Probing => {
                    let counted = self.history.counted_len();
                    if counted >= self.probe_n {
                        self.phase = Phase::Classifying;
                        continue;
                    }
                    let count = self.probe_n - counted;
                    let batch: Vec<ParamPoint> = (0..count)
                        .map(|offset| {
                            self.space
                                .to_params(&self.probe.point_at(self.probe_cursor + offset))
                        })
                        .collect();
                    self.probe_cursor += count;
                    self.outstanding = batch.len();
                    trace_debug!(count = batch.len(), "probe batch issued");
                    return Some(batch);
                }
                Phase::Classifying => {
                    self.run_classification();
                    self.phase = Phase::Refining;
                }
                Phase::Refining => {
                    let remaining = self.config.budget - self.history.counted_len();
                    if remaining == 0 {
                        self.phase = Phase::Done;
                        continue;
                    }
                    let refiner = self.refiner.as_mut()?;
                    let mut batch = refiner.propose(&self.space, remaining);
                    batch.truncate(usize::try_from(remaining).unwrap_or(usize::MAX));
                    if batch.is_empty() {
                        self.phase = Phase::Done;
                        continue;
                    }
                    self.outstanding = batch.len();
                    return Some(
                        batch
                            .iter()
                            .map(|unit| self.space.to_params(unit))
                            .collect(),
                    );
                }
                Phase::Done => return None,
            }
        }
    }

    /// Runs the one-shot landscape classification and instantiates the
    /// matching refinement strategy from counted history.
    fn run_classification(&mut self) {
        let mut points = Vec::new();
        let mut values = Vec::new();
        for trace in self.history.iter_counted() {
            if let Ok(unit) = self.space.to_unit(&trace.params) {
                points.push(unit);
                values.push(trace.value);
            }
        }
        let classification = self.classifier.classify(&self.space, &points, &values);
        trace_info!(
            alpha = classification.alpha,
            structured = matches!(classification.landscape, Landscape::Structured),
            "landscape classified"
        );

        let remaining = self.config.budget - self.history.counted_len();
        let observations: Vec<(Vec<f64>, f64)> = points.into_iter().zip(values).collect();
        let refiner: Box<dyn Refiner> = match classification.landscape {
            Landscape::Structured => Box::new(NelderMeadRefiner::new(
                self.space.dims(),
                observations,
                remaining,
            )),
            Landscape::Chaotic => {
                Box::new(DensityGuidedRefiner::new(self.config.seed, observations))
            }
        };
        self.classification = Some(classification);
        self.refiner = Some(refiner);
    }

    /// Reports evaluated outcomes.
    ///
    /// Pruned records are kept for bookkeeping but consume no budget and
    /// never feed the classifier or refiner. Non-finite values are absorbed
    /// as worst-possible. On error the engine state is unchanged.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::TellAfterDone`] in the Done state,
    /// [`ProtocolError::DuplicateEvalId`] when a counted result reuses an
    /// id, [`ProtocolError::UnknownParameter`] for points that do not match
    /// the configured bounds, and [`ProtocolError::BudgetExceeded`] when the
    /// batch would overrun the budget.
    pub fn tell(&mut self, results: Vec<EvalTrace>) -> Result<(), ProtocolError> {
        if self.phase == Phase::Done {
            return Err(ProtocolError::TellAfterDone);
        }

        // Validate the whole batch before touching any state.
        let mut batch_ids = HashSet::new();
        let mut units = Vec::with_capacity(results.len());
        let mut batch_counted: u64 = 0;
        for result in &results {
            let unit = self.space.to_unit(&result.params)?;
            if result.outcome == Outcome::Counted {
                if self.history.contains_counted_id(result.eval_id)
                    || !batch_ids.insert(result.eval_id)
                {
                    return Err(ProtocolError::DuplicateEvalId(result.eval_id));
                }
                batch_counted += 1;
            }
            units.push(unit);
        }
        if self.history.counted_len() + batch_counted > self.config.budget {
            return Err(ProtocolError::BudgetExceeded {
                budget: self.config.budget,
            });
        }

        for (mut trace, unit) in results.into_iter().zip(units) {
            if !trace.value.is_finite() {
                trace_debug!(eval_id = trace.eval_id, "non-finite value absorbed as worst-possible");
                trace.value = f64::INFINITY;
            }
            if trace.outcome == Outcome::Counted && self.phase == Phase::Refining {
                self.pending.push((unit, trace.value));
            }
            self.outstanding = self.outstanding.saturating_sub(1);
            self.history.push(trace);
        }

        self.advance_phase();
        if self.outstanding == 0 {
            if let Some(refiner) = self.refiner.as_mut() {
                refiner.absorb(&self.space, &self.pending);
            }
            self.pending.clear();
        }
        Ok(())
    }

    /// Bulk-injects externally evaluated points, counted against the
    /// budget, without an ask/tell round trip. Seeded records get synthetic
    /// eval ids from a reserved range.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::SeedDuringAsk`] while an asked batch is
    /// outstanding, [`ProtocolError::UnknownParameter`] for points that do
    /// not match the bounds, and [`ProtocolError::BudgetExceeded`] when the
    /// injection would overrun the budget. State is unchanged on error.
    pub fn seed(&mut self, points: Vec<SeedPoint>) -> Result<(), ProtocolError> {
        if self.outstanding > 0 {
            return Err(ProtocolError::SeedDuringAsk);
        }
        let mut units = Vec::with_capacity(points.len());
        for point in &points {
            units.push(self.space.to_unit(&point.params)?);
        }
        if self.history.counted_len() + points.len() as u64 > self.config.budget {
            return Err(ProtocolError::BudgetExceeded {
                budget: self.config.budget,
            });
        }

        let mut absorbed = Vec::with_capacity(points.len());
        for (point, unit) in points.into_iter().zip(units) {
            let value = if point.value.is_finite() {
                point.value
            } else {
                f64::INFINITY
            };
            self.history.push(EvalTrace {
                eval_id: self.next_seed_id,
                params: point.params,
                value,
                cost: point.cost,
                outcome: Outcome::Counted,
            });
            self.next_seed_id += 1;
            absorbed.push((unit, value));
        }
        trace_info!(count = absorbed.len(), "history seeded");

        self.advance_phase();
        if let Some(refiner) = self.refiner.as_mut() {
            refiner.absorb(&self.space, &absorbed);
        }
        Ok(())
    }

    /// One-directional phase transitions driven by counted progress.
    fn advance_phase(&mut self) {
        let counted = self.history.counted_len();
        if self.phase == Phase::Probing && counted >= self.probe_n {
            self.phase = Phase::Classifying;
            trace_info!(counted, "probe phase complete");
        }
        if counted >= self.config.budget && self.phase != Phase::Done {
            self.phase = Phase::Done;
            trace_info!(counted, "budget exhausted");
        }
    }

    /// Number of counted (non-pruned) evaluations recorded so far.
    #[must_use]
    pub fn history_len(&self) -> u64 {
        self.history.counted_len()
    }

    /// Every recorded trace, pruned entries included, in arrival order.
    #[must_use]
    pub fn history(&self) -> &[EvalTrace] {
        self.history.entries()
    }

    /// Best counted evaluation so far.
    #[must_use]
    pub fn best(&self) -> Option<&EvalTrace> {
        self.history.best_counted()
    }

    /// Current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The one-shot classification result, once the probe phase has been
    /// classified.
    #[must_use]
    pub fn classification(&self) -> Option<Classification> {
        self.classification
    }

    /// The immutable run configuration.
    #[must_use]
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }
}
