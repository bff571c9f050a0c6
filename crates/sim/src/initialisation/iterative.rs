use tracing::{debug, warn};

use crate::errors::{ConfigErrors, Result};
use crate::model::config::IterativeConfig;
use crate::model::RunContext;
use crate::partition::{CachedCategories, Partition};

/// Runs the annual cycle a fixed number of years, optionally stopping early
/// once the partition stops changing.
#[derive(Debug, Clone, PartialEq)]
pub struct Iterative {
    years: u32,
    convergence_years: Vec<u32>,
    lambda: f64,
}

impl Iterative {
    pub(crate) fn build(config: &IterativeConfig, location: &str, errors: &mut ConfigErrors) -> Self {
        if config.years == 0 {
            errors.push(format!("{location}.years"), "must be greater than 0");
        }
        if config.lambda <= 0.0 {
            errors.push(format!("{location}.lambda"), "must be greater than 0");
        }
        for &year in &config.convergence_years {
            if year == 0 || year > config.years {
                errors.push(
                    format!("{location}.convergence_years"),
                    format!("({year}) must be between 1 and years ({})", config.years),
                );
            }
        }

        let mut convergence_years = config.convergence_years.clone();
        if !convergence_years.is_empty() {
            convergence_years.sort_unstable();
            if convergence_years.last() != Some(&config.years) {
                convergence_years.push(config.years);
            }
        }

        Self {
            years: config.years,
            convergence_years,
            lambda: config.lambda,
        }
    }

    pub fn years(&self) -> u32 {
        self.years
    }

    pub fn convergence_years(&self) -> &[u32] {
        &self.convergence_years
    }

    /// Returns the years run and, when convergence is checked, whether it
    /// was reached.
    pub(crate) fn execute(&self, label: &str, ctx: &mut RunContext<'_>) -> Result<(u32, Option<bool>)> {
        if self.convergence_years.is_empty() {
            ctx.execute_initialisation_years(self.years)?;
            return Ok((self.years, None));
        }

        let mut cache = CachedCategories::all(ctx.partition);
        let mut total = 0;
        for &years in &self.convergence_years {
            let run = years.saturating_sub(total + 1);
            ctx.execute_initialisation_years(run)?;
            total += run;
            if total + 1 >= self.years {
                ctx.execute_initialisation_years(1)?;
                total += 1;
                break;
            }

            cache.build_cache(ctx.partition);
            ctx.execute_initialisation_years(1)?;
            total += 1;

            let variance = convergence_variance(&cache, ctx.partition);
            if variance.is_some_and(|v| v < self.lambda) {
                debug!(phase = label, years = total, "convergence reached");
                return Ok((total, Some(true)));
            }
            debug!(phase = label, years = total, ?variance, "not converged");
        }

        warn!(
            phase = label,
            years = total,
            lambda = self.lambda,
            "initialisation did not converge; continuing with the last state"
        );
        Ok((total, Some(false)))
    }
}

/// Sum over categories of `|cached - current| / total`, or `None` when a
/// category is empty and convergence cannot be judged.
pub fn convergence_variance(cache: &CachedCategories, partition: &Partition) -> Option<f64> {
    let mut variance = 0.0;
    for (id, cached) in cache.iter() {
        let current = partition.category(id).data();
        let total: f64 = current.iter().sum();
        if total == 0.0 {
            return None;
        }
        variance += cached
            .iter()
            .zip(current)
            .map(|(before, after)| (before - after).abs() / total)
            .sum::<f64>();
    }
    Some(variance)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(years: u32, convergence_years: Vec<u32>) -> IterativeConfig {
        IterativeConfig {
            years,
            convergence_years,
            lambda: 1e-10,
            insert_processes: Vec::new(),
            exclude_processes: Vec::new(),
        }
    }

    #[test]
    fn test_convergence_years_sorted_and_closed() {
        let mut errors = ConfigErrors::new();
        let phase = Iterative::build(&config(200, vec![100, 50]), "initialisation_phases[i]", &mut errors);
        assert!(errors.is_empty());
        assert_eq!(phase.convergence_years(), &[50, 100, 200]);

        let phase = Iterative::build(&config(200, vec![]), "initialisation_phases[i]", &mut errors);
        assert!(phase.convergence_years().is_empty());

        Iterative::build(&config(20, vec![50]), "initialisation_phases[i]", &mut errors);
        assert!(errors.contains_location("convergence_years"));
    }

    #[test]
    fn test_convergence_variance() {
        let mut partition = Partition::new(1, 2, false);
        let a = partition.add_category("a").unwrap();
        let b = partition.add_category("b").unwrap();
        partition.category_mut(a).set_data(&[10.0, 10.0]).unwrap();
        partition.category_mut(b).set_data(&[5.0, 5.0]).unwrap();

        let mut cache = CachedCategories::all(&partition);
        cache.build_cache(&partition);
        assert_eq!(convergence_variance(&cache, &partition), Some(0.0));

        partition.category_mut(a).set_data(&[12.0, 8.0]).unwrap();
        // (2 + 2) / 20
        assert_eq!(convergence_variance(&cache, &partition), Some(0.2));

        partition.category_mut(b).set_data(&[0.0, 0.0]).unwrap();
        assert_eq!(convergence_variance(&cache, &partition), None);
    }
}
