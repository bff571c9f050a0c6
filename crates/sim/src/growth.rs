//! Age-length and length-weight relationships.
//!
//! Categories use these to cache mean length and mean weight at age for each
//! time step. Biomass derived quantities and observations read the cached
//! weights.

use serde::{Deserialize, Serialize};

use crate::addressable::Target;
use crate::base::{Arena, Id};
use crate::errors::ConfigErrors;

/// Growth curve shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgeLengthKind {
    /// `linf * (1 - exp(-k * (age - t0)))`.
    VonBertalanffy { linf: f64, k: f64, t0: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgeLengthConfig {
    pub label: String,
    #[serde(flatten)]
    pub kind: AgeLengthKind,
    /// Fraction of the year elapsed at each time step. Defaults to 0 for
    /// every time step.
    #[serde(default)]
    pub time_step_proportions: Vec<f64>,
    #[serde(default)]
    pub length_weight: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AgeLength {
    kind: AgeLengthKind,
    time_step_proportions: Vec<f64>,
    length_weight: Option<Id<LengthWeight>>,
}

impl AgeLength {
    pub fn new(kind: AgeLengthKind) -> Self {
        Self {
            kind,
            time_step_proportions: Vec::new(),
            length_weight: None,
        }
    }

    pub fn with_length_weight(mut self, length_weight: Id<LengthWeight>) -> Self {
        self.length_weight = Some(length_weight);
        self
    }

    pub fn build(
        config: &AgeLengthConfig,
        time_steps: usize,
        length_weights: &Arena<LengthWeight>,
        errors: &mut ConfigErrors,
    ) -> Self {
        let location = format!("age_lengths[{}]", config.label);
        let mut proportions = config.time_step_proportions.clone();
        if proportions.is_empty() {
            proportions = vec![0.0; time_steps];
        } else if proportions.len() != time_steps {
            errors.push(
                format!("{location}.time_step_proportions"),
                format!(
                    "expected one value per time step ({time_steps}) but got {}",
                    proportions.len()
                ),
            );
        }
        if proportions.iter().any(|p| !(0.0..=1.0).contains(p)) {
            errors.push(
                format!("{location}.time_step_proportions"),
                "values must be between 0 and 1",
            );
        }

        let AgeLengthKind::VonBertalanffy { linf, k, .. } = config.kind;
        if linf <= 0.0 {
            errors.push(format!("{location}.linf"), "must be greater than 0");
        }
        if k <= 0.0 {
            errors.push(format!("{location}.k"), "must be greater than 0");
        }

        let length_weight = config.length_weight.as_deref().and_then(|label| {
            let found = length_weights.find(label);
            if found.is_none() {
                errors.push(
                    format!("{location}.length_weight"),
                    format!("length-weight relationship '{label}' has not been defined"),
                );
            }
            found
        });

        Self {
            kind: config.kind.clone(),
            time_step_proportions: proportions,
            length_weight,
        }
    }

    /// Mean length at `age` in `time_step`, never negative.
    pub fn mean_length(&self, age: u32, time_step: usize) -> f64 {
        let proportion = self
            .time_step_proportions
            .get(time_step)
            .copied()
            .unwrap_or(0.0);
        let age = age as f64 + proportion;
        match self.kind {
            AgeLengthKind::VonBertalanffy { linf, k, t0 } => {
                (linf * (1.0 - (-k * (age - t0)).exp())).max(0.0)
            }
        }
    }

    /// Mean weight at `age` in `time_step`; 1.0 without a length-weight.
    pub fn mean_weight(
        &self,
        age: u32,
        time_step: usize,
        length_weights: &Arena<LengthWeight>,
    ) -> f64 {
        match self.length_weight {
            Some(id) => length_weights
                .get(id)
                .weight(self.mean_length(age, time_step)),
            None => 1.0,
        }
    }

    pub fn parameter_mut(&mut self, name: &str) -> Option<Target<'_>> {
        let AgeLengthKind::VonBertalanffy { linf, k, t0 } = &mut self.kind;
        match name {
            "linf" => Some(Target::Scalar(linf)),
            "k" => Some(Target::Scalar(k)),
            "t0" => Some(Target::Scalar(t0)),
            _ => None,
        }
    }
}

/// Length to weight conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LengthWeight {
    /// `a * length^b`.
    Basic { a: f64, b: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LengthWeightConfig {
    pub label: String,
    #[serde(flatten)]
    pub kind: LengthWeight,
}

impl LengthWeight {
    pub fn build(config: &LengthWeightConfig, errors: &mut ConfigErrors) -> Self {
        let LengthWeight::Basic { a, b } = config.kind;
        if a <= 0.0 {
            errors.push(format!("length_weights[{}].a", config.label), "must be greater than 0");
        }
        if b <= 0.0 {
            errors.push(format!("length_weights[{}].b", config.label), "must be greater than 0");
        }
        config.kind.clone()
    }

    pub fn weight(&self, length: f64) -> f64 {
        match self {
            Self::Basic { a, b } => a * length.powf(*b),
        }
    }

    pub fn parameter_mut(&mut self, name: &str) -> Option<Target<'_>> {
        match (self, name) {
            (Self::Basic { a, .. }, "a") => Some(Target::Scalar(a)),
            (Self::Basic { b, .. }, "b") => Some(Target::Scalar(b)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_von_bertalanffy_length() {
        let growth = AgeLength::new(AgeLengthKind::VonBertalanffy {
            linf: 100.0,
            k: 0.2,
            t0: 0.0,
        });
        assert_eq!(growth.mean_length(0, 0), 0.0);
        let expected = 100.0 * (1.0 - (-0.2_f64 * 5.0).exp());
        assert!((growth.mean_length(5, 0) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_weight_through_length() {
        let mut length_weights = Arena::new();
        let lw = length_weights
            .insert("lw", LengthWeight::Basic { a: 2.0, b: 3.0 })
            .unwrap();
        let growth = AgeLength::new(AgeLengthKind::VonBertalanffy {
            linf: 10.0,
            k: 1e6,
            t0: 0.0,
        })
        .with_length_weight(lw);

        // k is large enough that every age has reached linf
        assert!((growth.mean_weight(3, 0, &length_weights) - 2000.0).abs() < 1e-9);
    }

    #[test]
    fn test_time_step_proportions_validated() {
        let config = AgeLengthConfig {
            label: "vb".to_string(),
            kind: AgeLengthKind::VonBertalanffy {
                linf: 50.0,
                k: 0.3,
                t0: -0.5,
            },
            time_step_proportions: vec![0.0, 0.5],
            length_weight: Some("missing".to_string()),
        };
        let mut errors = ConfigErrors::new();
        AgeLength::build(&config, 3, &Arena::new(), &mut errors);
        assert_eq!(errors.len(), 2);
    }
}
