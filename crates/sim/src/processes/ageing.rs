use crate::base::Id;
use crate::errors::{ConfigErrors, Result};
use crate::model::config::AgeingConfig;
use crate::model::BuildContext;
use crate::partition::Category;

use super::ProcessContext;

/// Moves every individual up one age class.
#[derive(Debug, Clone, PartialEq)]
pub struct Ageing {
    categories: Vec<Id<Category>>,
}

impl Ageing {
    pub fn new(categories: Vec<Id<Category>>) -> Self {
        Self { categories }
    }

    pub(crate) fn build(
        config: &AgeingConfig,
        ctx: &BuildContext<'_>,
        location: &str,
        errors: &mut ConfigErrors,
    ) -> Self {
        let categories = ctx.categories(&config.categories, &format!("{location}.categories"), errors);
        Self::new(categories)
    }

    pub fn categories(&self) -> &[Id<Category>] {
        &self.categories
    }

    pub(crate) fn execute(&self, ctx: &mut ProcessContext<'_>) -> Result<()> {
        let plus_group = ctx.partition.plus_group();
        for &id in &self.categories {
            age_in_place(ctx.partition.category_mut(id).data_mut(), plus_group);
        }
        Ok(())
    }
}

/// Shift `data` up one slot in a single pass.
///
/// The oldest slot's outflow is lost unless `plus_group` is set, in which
/// case it stays in the oldest slot.
#[inline]
pub fn age_in_place(data: &mut [f64], plus_group: bool) {
    let mut moved = 0.0;
    for slot in data.iter_mut() {
        let leaving = *slot;
        *slot -= leaving;
        *slot += moved;
        moved = leaving;
    }
    if plus_group {
        if let Some(last) = data.last_mut() {
            *last += moved;
        }
    }
}
