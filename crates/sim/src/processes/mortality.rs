use std::collections::BTreeMap;

use crate::addressable::Target;
use crate::base::Id;
use crate::errors::{ConfigErrors, Result};
use crate::model::config::MortalityConstantRateConfig;
use crate::model::{broadcast, BuildContext};
use crate::partition::Category;
use crate::selectivity::Selectivity;

use super::ProcessContext;

/// Constant instantaneous natural mortality.
///
/// Each slot loses `n * (1 - exp(-s(age) * m * ratio))` where `ratio` is the
/// share of the annual rate applied in the current time step.
#[derive(Debug, Clone, PartialEq)]
pub struct MortalityConstantRate {
    categories: Vec<Id<Category>>,
    m: Vec<f64>,
    selectivities: Vec<Id<Selectivity>>,
    /// Indices of the time steps the process runs in.
    time_steps: Vec<usize>,
    /// One ratio per entry of `time_steps`, or empty for the whole rate in
    /// every step.
    time_step_ratios: Vec<f64>,
    removals: BTreeMap<u32, f64>,
}

impl MortalityConstantRate {
    pub(crate) fn build(
        config: &MortalityConstantRateConfig,
        ctx: &BuildContext<'_>,
        location: &str,
        errors: &mut ConfigErrors,
    ) -> Self {
        let categories = ctx.categories(&config.categories, &format!("{location}.categories"), errors);
        let count = categories.len();
        let m = broadcast(&config.m, count, &format!("{location}.m"), errors);
        for value in &m {
            if !(0.0..=1.0).contains(value) {
                errors.push(
                    format!("{location}.m"),
                    format!("value ({value}) must be between 0 and 1"),
                );
            }
        }
        let selectivities = ctx.selectivities(
            &config.selectivities,
            count,
            &format!("{location}.selectivities"),
            errors,
        );

        Self {
            categories,
            m,
            selectivities,
            time_steps: Vec::new(),
            time_step_ratios: config.time_step_ratio.clone(),
            removals: BTreeMap::new(),
        }
    }

    /// Record the time steps the process runs in and check the ratios
    /// against them.
    pub(crate) fn bind_time_steps(&mut self, steps: &[usize], location: &str, errors: &mut ConfigErrors) {
        self.time_steps = steps.to_vec();
        if self.time_step_ratios.is_empty() {
            return;
        }
        if self.time_step_ratios.len() != steps.len() {
            errors.push(
                format!("{location}.time_step_ratio"),
                format!(
                    "expected one ratio for each of the {} time steps the process is in but got {}",
                    steps.len(),
                    self.time_step_ratios.len()
                ),
            );
        }
        for ratio in &self.time_step_ratios {
            if !(0.0..=1.0).contains(ratio) {
                errors.push(
                    format!("{location}.time_step_ratio"),
                    format!("value ({ratio}) must be between 0 and 1"),
                );
            }
        }
    }

    /// Share of the annual rate applied in time step `step`.
    fn ratio(&self, step: usize) -> f64 {
        self.time_steps
            .iter()
            .position(|&s| s == step)
            .and_then(|index| self.time_step_ratios.get(index))
            .copied()
            .unwrap_or(1.0)
    }

    pub(crate) fn reset(&mut self) {
        self.removals.clear();
    }

    pub(crate) fn execute(&mut self, ctx: &mut ProcessContext<'_>) -> Result<()> {
        let ratio = self.ratio(ctx.state.current_time_step);

        let mut removed = 0.0;
        for ((&id, &m), &selectivity) in self.categories.iter().zip(&self.m).zip(&self.selectivities) {
            let selectivity = ctx.selectivities.get(selectivity);
            let category = ctx.partition.category_mut(id);
            let min_age = category.min_age();
            for (offset, value) in category.data_mut().iter_mut().enumerate() {
                let rate = selectivity.value_at(min_age + offset as u32) * (m * ratio);
                let amount = *value * (1.0 - (-rate).exp());
                *value -= amount;
                removed += amount;
            }
        }

        if !ctx.state.is_initialising() {
            *self.removals.entry(ctx.state.current_year).or_insert(0.0) += removed;
        }
        Ok(())
    }

    pub fn m(&self) -> &[f64] {
        &self.m
    }

    /// Total numbers removed per model year.
    pub fn removals(&self) -> &BTreeMap<u32, f64> {
        &self.removals
    }

    pub(crate) fn parameter_mut(&mut self, name: &str) -> Option<Target<'_>> {
        match name {
            "m" => Some(Target::Vector(&mut self.m)),
            "time_step_ratio" => Some(Target::Vector(&mut self.time_step_ratios)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::Arena;
    use crate::model::RunState;
    use crate::partition::Partition;
    use crate::penalty::Penalties;
    use crate::selectivity::SelectivityKind;

    #[test]
    fn test_survival_matches_closed_form() {
        let mut partition = Partition::new(1, 3, false);
        let id = partition.add_category("stock").unwrap();
        partition
            .category_mut(id)
            .set_data(&[1000.0, 500.0, 250.0])
            .unwrap();

        let mut selectivities = Arena::new();
        let sel = selectivities
            .insert("half", Selectivity::new(SelectivityKind::Constant { c: 0.5 }, 1, 3))
            .unwrap();

        let mut process = MortalityConstantRate {
            categories: vec![id],
            m: vec![0.2],
            selectivities: vec![sel],
            time_steps: vec![0],
            time_step_ratios: vec![0.5],
            removals: BTreeMap::new(),
        };

        let derived_quantities = Arena::new();
        let mut penalties = Penalties::new();
        let mut state = RunState::new(2000, 2000);
        state.state = crate::model::ModelState::Execute;
        let mut ctx = ProcessContext {
            partition: &mut partition,
            selectivities: &selectivities,
            derived_quantities: &derived_quantities,
            penalties: &mut penalties,
            state: &state,
        };
        process.execute(&mut ctx).unwrap();

        let survival = (-0.5_f64 * 0.2 * 0.5).exp();
        for (value, start) in partition.category(id).data().iter().zip([1000.0, 500.0, 250.0]) {
            assert!((value - start * survival).abs() < 1e-9);
            assert!(*value >= 0.0);
        }
        let removed = 1750.0 * (1.0 - survival);
        assert!((process.removals()[&2000] - removed).abs() < 1e-9);
    }

    #[test]
    fn test_ratios_follow_the_process_time_steps() {
        let mut process = MortalityConstantRate {
            categories: Vec::new(),
            m: Vec::new(),
            selectivities: Vec::new(),
            time_steps: Vec::new(),
            time_step_ratios: vec![0.25, 0.75],
            removals: BTreeMap::new(),
        };
        let mut errors = ConfigErrors::new();
        process.bind_time_steps(&[1, 3], "processes[m]", &mut errors);
        assert!(errors.is_empty());

        assert_eq!(process.ratio(0), 1.0);
        assert_eq!(process.ratio(1), 0.25);
        assert_eq!(process.ratio(3), 0.75);

        // the first configured ratio, which belongs to step 1
        let Some(Target::Vector(ratios)) = process.parameter_mut("time_step_ratio") else {
            panic!("expected a vector target");
        };
        ratios[0] = 0.5;
        assert_eq!(process.ratio(1), 0.5);
        assert_eq!(process.ratio(3), 0.75);

        process.bind_time_steps(&[1], "processes[m]", &mut errors);
        assert!(errors.contains_location("processes[m].time_step_ratio"));
    }
}
