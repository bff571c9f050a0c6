//! Partition snapshots.
//!
//! A report runs at the end of its time step in the years it was asked for
//! and copies the numbers at age of its categories.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::base::Id;
use crate::errors::ConfigErrors;
use crate::model::config::ReportConfig;
use crate::model::{BuildContext, RunState};
use crate::partition::{Category, Partition};

/// Numbers at age of one category at one point in the run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySnapshot {
    pub category: String,
    pub min_age: u32,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    time_step: usize,
    categories: Vec<Id<Category>>,
    years: Vec<u32>,
    snapshots: BTreeMap<u32, Vec<CategorySnapshot>>,
}

impl Report {
    pub(crate) fn build(config: &ReportConfig, ctx: &BuildContext<'_>, errors: &mut ConfigErrors) -> Self {
        let location = format!("reports[{}]", config.label);
        let categories = if config.categories.is_empty() {
            ctx.partition.ids().collect()
        } else {
            ctx.categories(&config.categories, &format!("{location}.categories"), errors)
        };
        let time_step = ctx
            .time_step(&config.time_step, &format!("{location}.time_step"), errors)
            .unwrap_or(0);

        let years: Vec<u32> = if config.years.is_empty() {
            ctx.settings.years().collect()
        } else {
            config.years.clone()
        };
        for year in &years {
            if !ctx.settings.years().contains(year) {
                errors.push(
                    format!("{location}.years"),
                    format!("year {year} is outside the model years"),
                );
            }
        }

        Self {
            time_step,
            categories,
            years,
            snapshots: BTreeMap::new(),
        }
    }

    pub fn time_step(&self) -> usize {
        self.time_step
    }

    pub fn years(&self) -> &[u32] {
        &self.years
    }

    pub fn snapshots(&self) -> &BTreeMap<u32, Vec<CategorySnapshot>> {
        &self.snapshots
    }

    pub fn reset(&mut self) {
        self.snapshots.clear();
    }

    pub fn execute(&mut self, partition: &Partition, state: &RunState) {
        let snapshot = self
            .categories
            .iter()
            .map(|&id| {
                let category = partition.category(id);
                CategorySnapshot {
                    category: category.name().to_string(),
                    min_age: category.min_age(),
                    values: category.data().to_vec(),
                }
            })
            .collect();
        self.snapshots.insert(state.current_year, snapshot);
    }
}
