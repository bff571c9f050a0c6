//! Derived quantities.
//!
//! A derived quantity summarises part of the partition once per year at a
//! point in its time step, typically spawning biomass. Values computed while
//! initialising are kept per phase so recruitment can look back past the
//! first model year.

use std::collections::BTreeMap;

use tracing::warn;

use crate::base::{Arena, Id};
use crate::errors::{ConfigErrors, ModelError, Result};
use crate::model::config::{DerivedQuantityConfig, DerivedQuantityKind, ProportionMethod};
use crate::model::{BuildContext, RunState};
use crate::partition::{Category, Partition};
use crate::selectivity::Selectivity;

#[derive(Debug, Clone, PartialEq)]
pub struct DerivedQuantity {
    kind: DerivedQuantityKind,
    categories: Vec<Id<Category>>,
    selectivities: Vec<Id<Selectivity>>,
    time_step: usize,
    time_step_proportion: f64,
    method: ProportionMethod,
    start_year: u32,
    b0_initialised: bool,
    cache: f64,
    initialisation_values: Vec<Vec<f64>>,
    values: BTreeMap<u32, f64>,
}

impl DerivedQuantity {
    pub(crate) fn build(config: &DerivedQuantityConfig, ctx: &BuildContext<'_>, errors: &mut ConfigErrors) -> Self {
        let location = format!("derived_quantities[{}]", config.label);
        let categories = ctx.categories(&config.categories, &format!("{location}.categories"), errors);
        let selectivities = ctx.selectivities(
            &config.selectivities,
            categories.len(),
            &format!("{location}.selectivities"),
            errors,
        );
        let time_step = ctx.time_step(&config.time_step, &format!("{location}.time_step"), errors);
        if !(0.0..=1.0).contains(&config.time_step_proportion) {
            errors.push(
                format!("{location}.time_step_proportion"),
                format!("({}) must be between 0.0 and 1.0", config.time_step_proportion),
            );
        }

        Self {
            kind: config.kind,
            categories,
            selectivities,
            time_step: time_step.unwrap_or(0),
            time_step_proportion: config.time_step_proportion,
            method: config.time_step_proportion_method,
            start_year: ctx.settings.start_year,
            b0_initialised: false,
            cache: 0.0,
            initialisation_values: Vec::new(),
            values: BTreeMap::new(),
        }
    }

    pub fn kind(&self) -> DerivedQuantityKind {
        self.kind
    }

    /// Index of the time step the quantity is calculated in.
    pub fn time_step(&self) -> usize {
        self.time_step
    }

    pub(crate) fn set_b0_initialised(&mut self) {
        self.b0_initialised = true;
    }

    pub fn reset(&mut self) {
        self.cache = 0.0;
        self.initialisation_values.clear();
        self.values.clear();
    }

    fn amount(&self, partition: &Partition, selectivities: &Arena<Selectivity>, time_step: usize) -> f64 {
        let mut total = 0.0;
        for (&id, &selectivity) in self.categories.iter().zip(&self.selectivities) {
            let category = partition.category(id);
            let selectivity = selectivities.get(selectivity);
            let min_age = category.min_age();
            for (index, n) in category.data().iter().enumerate() {
                let selected = n * selectivity.value_at(min_age + index as u32);
                total += match self.kind {
                    DerivedQuantityKind::Biomass => selected * category.mean_weight(time_step, index),
                    DerivedQuantityKind::Abundance => selected,
                };
            }
        }
        total
    }

    /// Remember the value at the start of the mortality block.
    pub fn pre_execute(&mut self, partition: &Partition, selectivities: &Arena<Selectivity>) {
        self.cache = self.amount(partition, selectivities, self.time_step);
    }

    /// Interpolate between the cached and current values and store the
    /// result for the current year, or phase while initialising.
    pub fn execute(&mut self, partition: &Partition, selectivities: &Arena<Selectivity>, state: &RunState) {
        let current = self.amount(partition, selectivities, self.time_step);
        let value = self
            .method
            .interpolate(self.cache, current, self.time_step_proportion);

        if state.is_initialising() {
            if self.initialisation_values.len() <= state.phase {
                self.initialisation_values.resize(state.phase + 1, Vec::new());
            }
            self.initialisation_values[state.phase].push(value);
        } else {
            self.values.insert(state.current_year, value);
        }
    }

    /// Value for `year`, reaching back into the initialisation phases for
    /// years before the model starts.
    pub fn value(&self, year: u32) -> f64 {
        if let Some(&value) = self.values.get(&year) {
            return value;
        }
        let Some(last_phase) = self.initialisation_values.last() else {
            return 0.0;
        };
        let last_value = last_phase.last().copied().unwrap_or(0.0);
        if self.b0_initialised {
            return last_value;
        }

        let years_back = self.start_year.saturating_sub(year) as usize;
        if years_back == 0 {
            warn!(year, "derived quantity has no value for this year; using the last initialisation value");
            last_value
        } else if last_phase.len() > years_back {
            last_phase[last_phase.len() - years_back]
        } else if self.initialisation_values.len() == 1 {
            last_phase.first().copied().unwrap_or(0.0)
        } else {
            self.initialisation_values[self.initialisation_values.len() - 2]
                .first()
                .copied()
                .unwrap_or(0.0)
        }
    }

    /// The last value recorded in initialisation phase `phase`.
    pub fn last_value_from_initialisation(&self, phase: usize) -> Result<f64> {
        self.initialisation_values
            .get(phase)
            .and_then(|values| values.last().copied())
            .ok_or_else(|| {
                ModelError::internal(format!(
                    "no values have been calculated in initialisation phase {phase}"
                ))
            })
    }

    /// The last value recorded in the last initialisation phase that ran.
    pub fn last_initialisation_value(&self) -> Result<f64> {
        self.initialisation_values
            .last()
            .and_then(|values| values.last().copied())
            .ok_or_else(|| ModelError::internal("no values have been calculated during initialisation"))
    }

    /// Value `index` of phase `phase`, falling back to the last value
    /// available when either is out of range.
    pub fn initialisation_value(&self, phase: usize, index: usize) -> f64 {
        let Some(last_phase) = self.initialisation_values.last() else {
            return 0.0;
        };
        let Some(values) = self.initialisation_values.get(phase) else {
            return last_phase.last().copied().unwrap_or(0.0);
        };
        values
            .get(index)
            .or_else(|| values.last())
            .copied()
            .unwrap_or(0.0)
    }

    /// Repeat the last value of `phase` `times` times.
    pub(crate) fn pad_phase(&mut self, phase: usize, times: usize) -> Result<()> {
        let last = self.last_value_from_initialisation(phase)?;
        self.initialisation_values[phase].extend(std::iter::repeat(last).take(times));
        Ok(())
    }

    pub fn initialisation_values(&self) -> &[Vec<f64>] {
        &self.initialisation_values
    }

    pub fn values(&self) -> &BTreeMap<u32, f64> {
        &self.values
    }
}
