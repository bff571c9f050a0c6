//! Selectivity curves.
//!
//! A selectivity maps an age to a dimensionless multiplier. Values are cached
//! per model age by [`Selectivity::reset`], which must run before any
//! [`Selectivity::value_at`] call and again after any parameter changes.

use serde::{Deserialize, Serialize};

use crate::addressable::Target;
use crate::errors::ConfigErrors;

fn default_alpha() -> f64 {
    1.0
}

/// The closed set of selectivity shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SelectivityKind {
    /// `c` at every age.
    Constant { c: f64 },
    /// `alpha` from age `e` upwards, zero below.
    KnifeEdge {
        e: f64,
        #[serde(default = "default_alpha")]
        alpha: f64,
    },
    /// `alpha / (1 + 19^((a50 - x) / ato95))`.
    Logistic {
        a50: f64,
        ato95: f64,
        #[serde(default = "default_alpha")]
        alpha: f64,
    },
    /// Two half-normal curves joined at `mu`.
    DoubleNormal {
        mu: f64,
        sigma_l: f64,
        sigma_r: f64,
        #[serde(default = "default_alpha")]
        alpha: f64,
    },
    /// One explicit value per model age.
    AllValues { v: Vec<f64> },
    /// Cumulative steps towards `alpha` between ages `l` and `h`.
    Increasing {
        l: u32,
        h: u32,
        v: Vec<f64>,
        #[serde(default = "default_alpha")]
        alpha: f64,
    },
}

impl SelectivityKind {
    /// Result at `age`, computed from the parameters.
    pub fn evaluate(&self, age: u32, min_age: u32) -> f64 {
        let x = age as f64;
        match self {
            Self::Constant { c } => *c,
            Self::KnifeEdge { e, alpha } => {
                if x >= *e {
                    *alpha
                } else {
                    0.0
                }
            }
            Self::Logistic { a50, ato95, alpha } => {
                let threshold = (a50 - x) / ato95;
                if threshold > 5.0 {
                    0.0
                } else if threshold < -5.0 {
                    *alpha
                } else {
                    alpha / (1.0 + 19.0_f64.powf(threshold))
                }
            }
            Self::DoubleNormal {
                mu,
                sigma_l,
                sigma_r,
                alpha,
            } => {
                let sigma = if x < *mu { sigma_l } else { sigma_r };
                alpha * 2.0_f64.powf(-((x - mu) / sigma).powi(2))
            }
            Self::AllValues { v } => v
                .get(age.saturating_sub(min_age) as usize)
                .copied()
                .unwrap_or(0.0),
            Self::Increasing { l, h, v, alpha } => {
                let (Some(&first), Some(&last)) = (v.first(), v.last()) else {
                    return 0.0;
                };
                if age < *l {
                    0.0
                } else if age > *h {
                    last
                } else {
                    let mut value = first;
                    for i in (l + 1)..age {
                        if i > *h || value >= *alpha {
                            break;
                        }
                        let Some(step) = v.get((i - l) as usize) else {
                            break;
                        };
                        value += (alpha - value) * step;
                    }
                    value
                }
            }
        }
    }

    fn validate(&self, min_age: u32, max_age: u32, location: &str, errors: &mut ConfigErrors) {
        match self {
            Self::Constant { .. } => {}
            Self::KnifeEdge { alpha, .. } => {
                if *alpha <= 0.0 {
                    errors.push(format!("{location}.alpha"), "must be greater than 0");
                }
            }
            Self::Logistic { ato95, alpha, .. } => {
                if *ato95 <= 0.0 {
                    errors.push(format!("{location}.ato95"), "must be greater than 0");
                }
                if *alpha <= 0.0 {
                    errors.push(format!("{location}.alpha"), "must be greater than 0");
                }
            }
            Self::DoubleNormal {
                sigma_l,
                sigma_r,
                alpha,
                ..
            } => {
                if *sigma_l <= 0.0 {
                    errors.push(format!("{location}.sigma_l"), "must be greater than 0");
                }
                if *sigma_r <= 0.0 {
                    errors.push(format!("{location}.sigma_r"), "must be greater than 0");
                }
                if *alpha <= 0.0 {
                    errors.push(format!("{location}.alpha"), "must be greater than 0");
                }
            }
            Self::AllValues { v } => {
                let Some(spread) = max_age.checked_sub(min_age) else {
                    return;
                };
                let expected = spread as usize + 1;
                if v.len() != expected {
                    errors.push(
                        format!("{location}.v"),
                        format!("expected {expected} values (one per age) but got {}", v.len()),
                    );
                }
            }
            Self::Increasing { l, h, v, alpha } => {
                if *alpha <= 0.0 {
                    errors.push(format!("{location}.alpha"), "must be greater than 0");
                }
                if h <= l {
                    errors.push(format!("{location}.h"), format!("({h}) must be greater than l ({l})"));
                    return;
                }
                if *l < min_age || *l > max_age {
                    errors.push(
                        format!("{location}.l"),
                        format!("({l}) must be between the model min_age ({min_age}) and max_age ({max_age})"),
                    );
                }
                if v.len() != (h - l + 1) as usize {
                    errors.push(
                        format!("{location}.v"),
                        format!("expected {} values but got {}", h - l + 1, v.len()),
                    );
                }
                for (i, value) in v.iter().enumerate() {
                    if !(0.0..=1.0).contains(value) {
                        errors.push(
                            format!("{location}.v"),
                            format!("element {} ({value}) is not between 0 and 1", i + 1),
                        );
                    }
                }
            }
        }
    }
}

/// Serialized form of a selectivity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectivityConfig {
    pub label: String,
    #[serde(flatten)]
    pub kind: SelectivityKind,
}

/// A selectivity with its per-age cache.
#[derive(Debug, Clone, PartialEq)]
pub struct Selectivity {
    kind: SelectivityKind,
    min_age: u32,
    max_age: u32,
    values: Vec<f64>,
}

impl Selectivity {
    pub fn new(kind: SelectivityKind, min_age: u32, max_age: u32) -> Self {
        let mut selectivity = Self {
            kind,
            min_age,
            max_age,
            values: Vec::new(),
        };
        selectivity.reset();
        selectivity
    }

    /// Validate `config` and build the selectivity. The cache is left empty
    /// when the parameters are invalid.
    pub fn build(
        config: &SelectivityConfig,
        min_age: u32,
        max_age: u32,
        errors: &mut ConfigErrors,
    ) -> Self {
        let location = format!("selectivities[{}]", config.label);
        let before = errors.len();
        config.kind.validate(min_age, max_age, &location, errors);
        if errors.len() > before {
            return Self {
                kind: config.kind.clone(),
                min_age,
                max_age,
                values: Vec::new(),
            };
        }
        Self::new(config.kind.clone(), min_age, max_age)
    }

    pub fn kind(&self) -> &SelectivityKind {
        &self.kind
    }

    /// Rebuild the per-age cache from the current parameters.
    pub fn reset(&mut self) {
        let kind = &self.kind;
        let min_age = self.min_age;
        self.values = (self.min_age..=self.max_age)
            .map(|age| kind.evaluate(age, min_age))
            .collect();
    }

    /// Cached value at `age`; zero outside the model ages.
    #[inline]
    pub fn value_at(&self, age: u32) -> f64 {
        age.checked_sub(self.min_age)
            .and_then(|index| self.values.get(index as usize))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Estimable parameter named `name`.
    pub fn parameter_mut(&mut self, name: &str) -> Option<Target<'_>> {
        let target = match (&mut self.kind, name) {
            (SelectivityKind::Constant { c }, "c") => Target::Scalar(c),
            (SelectivityKind::KnifeEdge { e, .. }, "e") => Target::Scalar(e),
            (SelectivityKind::Logistic { a50, .. }, "a50") => Target::Scalar(a50),
            (SelectivityKind::Logistic { ato95, .. }, "ato95") => Target::Scalar(ato95),
            (SelectivityKind::DoubleNormal { mu, .. }, "mu") => Target::Scalar(mu),
            (SelectivityKind::DoubleNormal { sigma_l, .. }, "sigma_l") => Target::Scalar(sigma_l),
            (SelectivityKind::DoubleNormal { sigma_r, .. }, "sigma_r") => Target::Scalar(sigma_r),
            (SelectivityKind::AllValues { v }, "v") | (SelectivityKind::Increasing { v, .. }, "v") => {
                Target::Vector(v.as_mut_slice())
            }
            (SelectivityKind::KnifeEdge { alpha, .. }, "alpha")
            | (SelectivityKind::Logistic { alpha, .. }, "alpha")
            | (SelectivityKind::DoubleNormal { alpha, .. }, "alpha")
            | (SelectivityKind::Increasing { alpha, .. }, "alpha") => Target::Scalar(alpha),
            _ => return None,
        };
        Some(target)
    }
}
