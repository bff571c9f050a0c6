//! Soft-constraint penalties.
//!
//! Processes trigger a penalty when they have to clamp a biologically
//! infeasible request. The flagged values are summed into the objective
//! function; triggering never aborts the run.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::base::{Arena, Id};
use crate::errors::ConfigErrors;

fn default_multiplier() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PenaltyConfig {
    pub label: String,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
    #[serde(default)]
    pub log_scale: bool,
}

/// A configured penalty definition.
#[derive(Debug, Clone, PartialEq)]
pub struct Penalty {
    multiplier: f64,
    log_scale: bool,
}

impl Penalty {
    pub fn new(multiplier: f64, log_scale: bool) -> Self {
        Self {
            multiplier,
            log_scale,
        }
    }

    /// Score for the difference between `value_1` and `value_2`.
    pub fn score(&self, value_1: f64, value_2: f64) -> f64 {
        if self.log_scale {
            (value_1.ln() - value_2.ln()).powi(2) * self.multiplier
        } else {
            (value_1 - value_2).powi(2) * self.multiplier
        }
    }
}

/// A penalty event recorded during the current run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlaggedPenalty {
    pub label: String,
    pub name: String,
    pub value: f64,
}

/// Penalty definitions plus the events flagged since the last reset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Penalties {
    definitions: Arena<Penalty>,
    flagged: Vec<FlaggedPenalty>,
}

impl Penalties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build(configs: &[PenaltyConfig], errors: &mut ConfigErrors) -> Self {
        let mut penalties = Self::new();
        for config in configs {
            let location = format!("penalties[{}]", config.label);
            if config.multiplier < 0.0 {
                errors.push(format!("{location}.multiplier"), "cannot be negative");
            }
            let penalty = Penalty::new(config.multiplier, config.log_scale);
            if penalties.definitions.insert(&config.label, penalty).is_none() {
                errors.push(location, "penalty label is defined more than once");
            }
        }
        penalties
    }

    pub fn find(&self, label: &str) -> Option<Id<Penalty>> {
        self.definitions.find(label)
    }

    /// Flag `penalty` for the pair of values.
    ///
    /// `source` names the object that triggered it, usually a process label.
    pub fn trigger(&mut self, penalty: Id<Penalty>, source: &str, value_1: f64, value_2: f64) {
        let value = self.definitions.get(penalty).score(value_1, value_2);
        let label = self.definitions.label(penalty).to_string();
        debug!(penalty = %label, source, value, "penalty triggered");
        self.flagged.push(FlaggedPenalty {
            label,
            name: format!("{source}({value_1}, {value_2})"),
            value,
        });
    }

    pub fn flagged(&self) -> &[FlaggedPenalty] {
        &self.flagged
    }

    /// Sum of every flagged value.
    pub fn total(&self) -> f64 {
        self.flagged.iter().map(|p| p.value).sum()
    }

    /// Forget flagged events. Definitions are kept.
    pub fn clear(&mut self) {
        self.flagged.clear();
    }
}
