use tracing::{debug, warn};

use crate::errors::{ConfigErrors, Result};
use crate::model::config::DerivedConfig;
use crate::model::RunContext;
use crate::partition::{CachedCategories, Partition};

/// Largest relative change in the plus group still treated as equilibrium.
const PLUS_GROUP_TOLERANCE: f64 = 0.005;

/// Upper bound on the annual plus group growth used by the shortcut.
const MAX_PLUS_GROUP_CHANGE: f64 = 0.99;

/// Runs one cohort's lifetime, approximates the plus group equilibrium and
/// then runs single years until the plus group settles.
#[derive(Debug, Clone, PartialEq)]
pub struct Derived {
    recruitment_first: bool,
    max_iterations: usize,
}

impl Derived {
    pub(crate) fn build(
        config: &DerivedConfig,
        recruitment_first: bool,
        location: &str,
        errors: &mut ConfigErrors,
    ) -> Self {
        if config.max_iterations == 0 {
            errors.push(format!("{location}.max_iterations"), "must be greater than 0");
        }
        Self {
            recruitment_first,
            max_iterations: config.max_iterations,
        }
    }

    /// Returns the years run and whether the plus group settled.
    pub(crate) fn execute(&self, label: &str, ctx: &mut RunContext<'_>) -> Result<(u32, bool)> {
        let spread = ctx.partition.age_spread() as u32;
        let mut years = if self.recruitment_first {
            spread.saturating_sub(1)
        } else {
            spread
        };
        ctx.execute_initialisation_years(years)?;

        if ctx.partition.plus_group() {
            let mut cache = CachedCategories::all(ctx.partition);
            cache.build_cache(ctx.partition);
            ctx.execute_initialisation_years(1)?;
            years += 1;
            approximate_plus_group(&cache, ctx.partition)?;
        }

        let mut previous = plus_groups(ctx.partition);
        let mut iterations = 0;
        loop {
            if iterations >= self.max_iterations {
                warn!(
                    phase = label,
                    iterations,
                    "plus group did not settle; continuing with the last state"
                );
                return Ok((years, false));
            }
            ctx.execute_initialisation_years(1)?;
            years += 1;
            iterations += 1;

            let current = plus_groups(ctx.partition);
            let change = max_relative_change(&previous, &current);
            previous = current;
            if change <= PLUS_GROUP_TOLERANCE {
                debug!(phase = label, years, change, "plus group settled");
                return Ok((years, true));
            }
        }
    }
}

/// Restore the cached partition, inflating each plus group by its annual
/// growth `c` as `1 / (1 - c)`.
fn approximate_plus_group(cache: &CachedCategories, partition: &mut Partition) -> Result<()> {
    for (id, cached) in cache.iter() {
        let category = partition.category_mut(id);
        let Some(plus) = cached.len().checked_sub(1) else {
            continue;
        };
        let change = if cached[plus] > 0.0 {
            (category.data()[plus] / cached[plus] - 1.0).clamp(0.0, MAX_PLUS_GROUP_CHANGE)
        } else {
            0.0
        };
        category.set_data(cached)?;
        category.data_mut()[plus] *= 1.0 / (1.0 - change);
    }
    Ok(())
}

fn plus_groups(partition: &Partition) -> Vec<f64> {
    partition
        .iter()
        .map(|(_, category)| category.data().last().copied().unwrap_or(0.0))
        .collect()
}

fn max_relative_change(previous: &[f64], current: &[f64]) -> f64 {
    previous
        .iter()
        .zip(current)
        .filter(|(before, _)| **before != 0.0)
        .map(|(before, after)| ((after - before) / before).abs())
        .fold(0.0, f64::max)
}
