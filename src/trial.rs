//! Evaluation records and the append-only history.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A concrete point in parameter space, keyed by parameter name.
///
/// Built in canonical bound order so serialized output is deterministic.
pub type ParamPoint = IndexMap<String, f64>;

/// Whether an evaluation counts against the budget.
///
/// A [`Pruned`](Outcome::Pruned) record is kept for deduplication bookkeeping
/// only: it does not consume budget and does not feed the classifier or the
/// active refiner.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Outcome {
    /// A real evaluation, counted against the budget.
    #[default]
    Counted,
    /// A skipped or duplicate candidate, recorded but not counted.
    Pruned,
}

/// Serialize [`Outcome`] as the wire boolean `pruned` (default `false`).
mod outcome_flag {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::Outcome;

    pub(crate) fn serialize<S: Serializer>(
        outcome: &Outcome,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_bool(matches!(outcome, Outcome::Pruned))
    }

    pub(crate) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Outcome, D::Error> {
        Ok(if bool::deserialize(deserializer)? {
            Outcome::Pruned
        } else {
            Outcome::Counted
        })
    }
}

/// One reported evaluation of the objective.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EvalTrace {
    /// Caller-assigned identifier, unique across counted records.
    pub eval_id: u64,
    /// The evaluated point.
    pub params: ParamPoint,
    /// Objective value. NaN and infinities are absorbed as worst-possible
    /// when the record is accepted.
    pub value: f64,
    /// Advisory evaluation cost. Not load-bearing on control flow.
    #[serde(default)]
    pub cost: f64,
    /// Whether the record consumes budget. Wire field `pruned`, default
    /// `false`.
    #[serde(rename = "pruned", default, with = "outcome_flag")]
    pub outcome: Outcome,
}

/// An externally pre-evaluated point for warm-starting via
/// [`Solver::seed`](crate::Solver::seed).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SeedPoint {
    /// The evaluated point.
    pub params: ParamPoint,
    /// Objective value at `params`.
    pub value: f64,
    /// Advisory evaluation cost.
    #[serde(default)]
    pub cost: f64,
}

/// Append-only record of every reported evaluation.
///
/// Owned exclusively by the solver; the counted length is the authoritative
/// progress counter against the budget.
#[derive(Debug, Default)]
pub(crate) struct History {
    entries: Vec<EvalTrace>,
    counted_ids: HashSet<u64>,
    counted: u64,
}

impl History {
    pub(crate) fn push(&mut self, trace: EvalTrace) {
        if trace.outcome == Outcome::Counted {
            self.counted_ids.insert(trace.eval_id);
            self.counted += 1;
        }
        self.entries.push(trace);
    }

    /// Whether a counted record with this id already exists.
    pub(crate) fn contains_counted_id(&self, eval_id: u64) -> bool {
        self.counted_ids.contains(&eval_id)
    }

    /// Number of counted records.
    pub(crate) fn counted_len(&self) -> u64 {
        self.counted
    }

    pub(crate) fn entries(&self) -> &[EvalTrace] {
        &self.entries
    }

    pub(crate) fn iter_counted(&self) -> impl Iterator<Item = &EvalTrace> {
        self.entries
            .iter()
            .filter(|t| t.outcome == Outcome::Counted)
    }

    /// Counted record with the lowest value. Values are sanitized to be
    /// non-NaN before insertion, so the comparison is total in practice.
    pub(crate) fn best_counted(&self) -> Option<&EvalTrace> {
        self.iter_counted().min_by(|a, b| {
            a.value
                .partial_cmp(&b.value)
                .unwrap_or(core::cmp::Ordering::Equal)
        })
    }
}
