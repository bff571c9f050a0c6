//! Objective function.
//!
//! The score of a run is the sum of every observation's negative
//! log-likelihood plus every penalty flagged while executing.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::base::Arena;
use crate::observation::Observation;
use crate::penalty::Penalties;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreComponent {
    pub label: String,
    pub score: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ObjectiveScore {
    pub observations: Vec<ScoreComponent>,
    /// Flagged penalties summed per penalty label.
    pub penalties: Vec<ScoreComponent>,
    pub total: f64,
}

impl ObjectiveScore {
    pub fn evaluate(arena: &Arena<Observation>, penalties: &Penalties) -> Self {
        let observations: Vec<ScoreComponent> = arena
            .iter()
            .map(|(id, observation)| ScoreComponent {
                label: arena.label(id).to_string(),
                score: observation.score(),
            })
            .collect();

        let mut by_label: BTreeMap<&str, f64> = BTreeMap::new();
        for flagged in penalties.flagged() {
            *by_label.entry(flagged.label.as_str()).or_default() += flagged.value;
        }
        let penalties: Vec<ScoreComponent> = by_label
            .into_iter()
            .map(|(label, score)| ScoreComponent {
                label: label.to_string(),
                score,
            })
            .collect();

        let total: f64 = observations.iter().chain(&penalties).map(|c| c.score).sum();
        Self {
            observations,
            penalties,
            total,
        }
    }
}
