use crate::addressable::Target;
use crate::base::{Arena, Id};
use crate::errors::{ConfigErrors, ModelError, Result};
use crate::model::config::TransitionCategoryConfig;
use crate::model::{broadcast, BuildContext};
use crate::partition::Category;
use crate::selectivity::Selectivity;

use super::ProcessContext;

/// Moves a proportion of each `from` category into the matching `to`
/// category, e.g. maturation.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionCategory {
    from: Vec<Id<Category>>,
    to: Vec<Id<Category>>,
    proportions: Vec<f64>,
    selectivities: Vec<Id<Selectivity>>,
    /// `proportion * selectivity(age)` per pair, rebuilt on reset.
    rates: Vec<Vec<f64>>,
}

impl TransitionCategory {
    pub(crate) fn build(
        config: &TransitionCategoryConfig,
        ctx: &BuildContext<'_>,
        location: &str,
        errors: &mut ConfigErrors,
    ) -> Self {
        let from = ctx.categories(&config.from, &format!("{location}.from"), errors);
        let to = ctx.categories(&config.to, &format!("{location}.to"), errors);
        if from.len() != to.len() {
            errors.push(
                format!("{location}.to"),
                format!(
                    "{} 'to' categories were supplied but {} are required",
                    to.len(),
                    from.len()
                ),
            );
        }
        for id in &from {
            if to.contains(id) {
                errors.push(
                    format!("{location}.to"),
                    format!(
                        "category '{}' cannot be both a 'from' and a 'to' category",
                        ctx.partition.category(*id).name()
                    ),
                );
            }
        }

        let proportions = broadcast(
            &config.proportions,
            to.len(),
            &format!("{location}.proportions"),
            errors,
        );
        for proportion in proportions.iter().filter(|p| !(0.0..=1.0).contains(*p)) {
            errors.push(
                format!("{location}.proportions"),
                format!("proportion {proportion} must be between 0.0 and 1.0 (inclusive)"),
            );
        }
        let selectivities = ctx.selectivities(
            &config.selectivities,
            to.len(),
            &format!("{location}.selectivities"),
            errors,
        );

        Self {
            from,
            to,
            proportions,
            selectivities,
            rates: Vec::new(),
        }
    }

    pub fn rates(&self) -> &[Vec<f64>] {
        &self.rates
    }

    pub(crate) fn reset(&mut self, selectivities: &Arena<Selectivity>) {
        self.rates = self
            .proportions
            .iter()
            .zip(&self.selectivities)
            .map(|(&proportion, &selectivity)| {
                selectivities
                    .get(selectivity)
                    .values()
                    .iter()
                    .map(|s| proportion * s)
                    .collect()
            })
            .collect();
    }

    pub(crate) fn execute(&mut self, ctx: &mut ProcessContext<'_>) -> Result<()> {
        for ((&from, &to), rates) in self.from.iter().zip(&self.to).zip(&self.rates) {
            let (source, target) = ctx.partition.pair_mut(from, to)?;
            let mut negative = None;
            for (offset, (value, &rate)) in source.data_mut().iter_mut().zip(rates).enumerate() {
                let amount = rate * *value;
                *value -= amount;
                target.data_mut()[offset] += amount;
                if *value < 0.0 {
                    negative = Some(offset);
                    break;
                }
            }
            if let Some(offset) = negative {
                return Err(ModelError::internal(format!(
                    "transition made category '{}' negative at age {}",
                    source.name(),
                    source.min_age() + offset as u32
                )));
            }
        }
        Ok(())
    }

    pub(crate) fn parameter_mut(&mut self, name: &str) -> Option<Target<'_>> {
        match name {
            "proportions" => Some(Target::Vector(&mut self.proportions)),
            _ => None,
        }
    }
}
