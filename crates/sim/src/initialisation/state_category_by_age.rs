use crate::base::Id;
use crate::errors::ConfigErrors;
use crate::model::config::StateCategoryByAgeConfig;
use crate::model::BuildContext;
use crate::partition::{Category, Partition};

use super::cinitial::table_rows;

/// Overwrites the numbers at the given ages of each category with a table.
/// Ages outside the range are left alone.
#[derive(Debug, Clone, PartialEq)]
pub struct StateCategoryByAge {
    categories: Vec<Id<Category>>,
    min_age: u32,
    n: Vec<Vec<f64>>,
}

impl StateCategoryByAge {
    pub(crate) fn build(
        config: &StateCategoryByAgeConfig,
        ctx: &BuildContext<'_>,
        location: &str,
        errors: &mut ConfigErrors,
    ) -> Self {
        let settings = ctx.settings;
        if config.min_age < settings.min_age {
            errors.push(
                format!("{location}.min_age"),
                format!("({}) cannot be less than the model min age ({})", config.min_age, settings.min_age),
            );
        }
        if config.max_age > settings.max_age {
            errors.push(
                format!("{location}.max_age"),
                format!("({}) cannot be greater than the model max age ({})", config.max_age, settings.max_age),
            );
        }
        if config.min_age > config.max_age {
            errors.push(
                format!("{location}.max_age"),
                format!("({}) cannot be less than min_age ({})", config.max_age, config.min_age),
            );
        }

        let mut categories = Vec::with_capacity(config.categories.len());
        for label in &config.categories {
            match ctx.partition.find(label) {
                Some(id) => categories.push(id),
                None => errors.push(
                    format!("{location}.categories"),
                    format!("category '{label}' has not been declared"),
                ),
            }
        }
        let width = (config.max_age.saturating_sub(config.min_age) + 1) as usize;
        let n = table_rows(&config.categories, &config.n, width, &format!("{location}.n"), errors);

        Self {
            categories,
            min_age: config.min_age,
            n,
        }
    }

    pub fn execute(&self, partition: &mut Partition) {
        for (&id, row) in self.categories.iter().zip(&self.n) {
            let category = partition.category_mut(id);
            for (age, &value) in (self.min_age..).zip(row) {
                if let Some(index) = category.index_of_age(age) {
                    category.data_mut()[index] = value;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_listed_ages_are_set() {
        let mut partition = Partition::new(1, 5, true);
        let id = partition.add_category("r1").unwrap();
        partition.category_mut(id).set_data(&[1.0; 5]).unwrap();

        let state = StateCategoryByAge {
            categories: vec![id],
            min_age: 2,
            n: vec![vec![20.0, 30.0, 40.0]],
        };
        state.execute(&mut partition);

        assert_eq!(partition.category(id).data(), &[1.0, 20.0, 30.0, 40.0, 1.0]);
    }
}
