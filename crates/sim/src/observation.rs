//! Observations compare the partition against data.
//!
//! An observation caches its categories when its block (or process) starts
//! and, once it ends, interpolates between the cached and current numbers at
//! the configured proportion of the step. Each observed value then gets a
//! negative log-likelihood score.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::base::math::zero_fun;
use crate::base::{Arena, Id};
use crate::errors::ConfigErrors;
use crate::model::config::{
    LikelihoodKind, ObservationConfig, ObservationKind, ProportionMethod, YearValues,
};
use crate::model::{BuildContext, RunState};
use crate::partition::{CachedCombinedCategories, CombinedCategories, Partition};
use crate::selectivity::Selectivity;

/// One observed value against its expectation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    pub year: u32,
    pub category: String,
    pub observed: f64,
    pub expected: f64,
    pub error_value: f64,
    pub score: f64,
}

impl LikelihoodKind {
    /// Negative log-likelihood of `observed` given `expected` and a
    /// coefficient of variation.
    pub fn score(self, observed: f64, expected: f64, cv: f64) -> f64 {
        let expected = zero_fun(expected);
        match self {
            Self::Normal => {
                let sigma = cv * expected;
                sigma.ln() + 0.5 * ((observed - expected) / sigma).powi(2)
            }
            Self::Lognormal => {
                let sigma = (1.0 + cv * cv).ln().sqrt();
                let residual = (zero_fun(observed) / expected).ln() / sigma + 0.5 * sigma;
                sigma.ln() + 0.5 * residual * residual
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    kind: ObservationKind,
    labels: Vec<String>,
    categories: CachedCombinedCategories,
    selectivities: Vec<Id<Selectivity>>,
    time_step: usize,
    time_step_proportion: f64,
    method: ProportionMethod,
    catchability: f64,
    observed: BTreeMap<u32, Vec<f64>>,
    error_values: BTreeMap<u32, Vec<f64>>,
    likelihood: LikelihoodKind,
    comparisons: Vec<Comparison>,
}

impl Observation {
    pub(crate) fn build(config: &ObservationConfig, ctx: &BuildContext<'_>, errors: &mut ConfigErrors) -> Self {
        let location = format!("observations[{}]", config.label);
        let years: Vec<u32> = config.observed.iter().map(|row| row.year).collect();
        let combined = CombinedCategories::init(
            ctx.partition,
            &config.categories,
            years.iter().copied(),
            &format!("{location}.categories"),
            errors,
        );
        // `*` expands to one column per category
        let labels: Vec<String> = if config.categories.len() == combined.len() {
            config.categories.clone()
        } else {
            combined
                .all_groups()
                .iter()
                .map(|group| {
                    group
                        .iter()
                        .map(|&id| ctx.partition.category(id).name())
                        .collect::<Vec<_>>()
                        .join("+")
                })
                .collect()
        };
        let selectivities = ctx.selectivities(
            &config.selectivities,
            combined.len(),
            &format!("{location}.selectivities"),
            errors,
        );
        let time_step = ctx
            .time_step(&config.time_step, &format!("{location}.time_step"), errors)
            .unwrap_or(0);

        if !(0.0..=1.0).contains(&config.time_step_proportion) {
            errors.push(
                format!("{location}.time_step_proportion"),
                "must be between 0.0 and 1.0",
            );
        }
        if config.catchability <= 0.0 {
            errors.push(format!("{location}.catchability"), "must be greater than 0");
        }

        let columns = combined.len();
        let observed = load_rows(&config.observed, columns, false, &format!("{location}.observed"), errors);
        let error_values = load_rows(
            &config.error_values,
            columns,
            true,
            &format!("{location}.error_values"),
            errors,
        );
        for year in &years {
            if !ctx.settings.years().contains(year) {
                errors.push(
                    format!("{location}.observed"),
                    format!("year {year} is outside the model years"),
                );
            }
            if !error_values.contains_key(year) {
                errors.push(
                    format!("{location}.error_values"),
                    format!("no error values were given for year {year}"),
                );
            }
        }
        if error_values.values().flatten().any(|cv| *cv <= 0.0) {
            errors.push(
                format!("{location}.error_values"),
                "error values must be greater than 0",
            );
        }

        Self {
            kind: config.kind,
            labels,
            categories: CachedCombinedCategories::new(combined),
            selectivities,
            time_step,
            time_step_proportion: config.time_step_proportion,
            method: config.time_step_proportion_method,
            catchability: config.catchability,
            observed,
            error_values,
            likelihood: config.likelihood,
            comparisons: Vec::new(),
        }
    }

    pub fn time_step(&self) -> usize {
        self.time_step
    }

    /// Years with observed values.
    pub fn years(&self) -> impl Iterator<Item = u32> + '_ {
        self.observed.keys().copied()
    }

    pub fn comparisons(&self) -> &[Comparison] {
        &self.comparisons
    }

    /// Sum of the comparison scores.
    pub fn score(&self) -> f64 {
        self.comparisons.iter().map(|c| c.score).sum()
    }

    pub fn reset(&mut self) {
        self.comparisons.clear();
    }

    pub fn pre_execute(&mut self, partition: &Partition, state: &RunState) {
        self.categories.build_cache(partition, state.current_year);
    }

    pub fn execute(&mut self, partition: &Partition, selectivities: &Arena<Selectivity>, state: &RunState) {
        let year = state.current_year;
        let (Some(observed), Some(error_values)) = (self.observed.get(&year), self.error_values.get(&year)) else {
            return;
        };

        for (g, group) in self.categories.groups(year).iter().enumerate() {
            let selectivity = selectivities.get(self.selectivities[g]);
            let mut expected = 0.0;
            for (m, &id) in group.iter().enumerate() {
                let category = partition.category(id);
                let cached = self.categories.cached(g, m).unwrap_or(category.data());
                let min_age = category.min_age();
                for (index, (&start, &end)) in cached.iter().zip(category.data()).enumerate() {
                    let n = self.method.interpolate(start, end, self.time_step_proportion);
                    let selected = n * selectivity.value_at(min_age + index as u32);
                    expected += match self.kind {
                        ObservationKind::Abundance => selected,
                        ObservationKind::Biomass => selected * category.mean_weight(self.time_step, index),
                    };
                }
            }
            expected *= self.catchability;

            let observed = observed[g];
            let error_value = error_values[g];
            self.comparisons.push(Comparison {
                year,
                category: self.labels[g].clone(),
                observed,
                expected,
                error_value,
                score: self.likelihood.score(observed, expected, error_value),
            });
        }
    }
}

/// Rows keyed by year. With `broadcast` a single value fills every column.
fn load_rows(
    rows: &[YearValues],
    columns: usize,
    broadcast: bool,
    location: &str,
    errors: &mut ConfigErrors,
) -> BTreeMap<u32, Vec<f64>> {
    let mut table = BTreeMap::new();
    for row in rows {
        let values = match row.values.as_slice() {
            [single] if broadcast => vec![*single; columns],
            values if values.len() == columns => values.to_vec(),
            values => {
                errors.push(
                    location,
                    format!(
                        "year {} has {} values but {columns} categories were given",
                        row.year,
                        values.len()
                    ),
                );
                continue;
            }
        };
        if table.insert(row.year, values).is_some() {
            errors.push(location, format!("year {} is given more than once", row.year));
        }
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lognormal_is_minimised_near_observed() {
        let at = LikelihoodKind::Lognormal.score(100.0, 100.0, 0.2);
        let off = LikelihoodKind::Lognormal.score(100.0, 150.0, 0.2);
        assert!(at < off);
    }

    #[test]
    fn test_normal_score() {
        // sigma = 10, residual = 1
        let score = LikelihoodKind::Normal.score(110.0, 100.0, 0.1);
        assert!((score - (10.0_f64.ln() + 0.5)).abs() < 1e-12);
    }

    #[test]
    fn test_load_rows_broadcast() {
        let rows = vec![
            YearValues { year: 2000, values: vec![0.2] },
            YearValues { year: 2001, values: vec![0.1, 0.3] },
        ];
        let mut errors = ConfigErrors::new();
        let table = load_rows(&rows, 2, true, "observations[o].error_values", &mut errors);
        assert!(errors.is_empty());
        assert_eq!(table[&2000], vec![0.2, 0.2]);

        let mut errors = ConfigErrors::new();
        load_rows(&rows, 2, false, "observations[o].observed", &mut errors);
        assert_eq!(errors.len(), 1);
    }
}
