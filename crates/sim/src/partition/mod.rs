//! The population partition.
//!
//! A [`Partition`] owns every [`Category`] in the model. Processes address
//! categories through [`Id`] handles resolved while building, so a lookup at
//! execute time never fails unless the engine itself is broken.
//!
//! Labels used in configuration can name a single category, combine several
//! with `+` (`male+female`) or select every category with `*`.

mod accessors;
mod category;

pub use accessors::{
    CachedCategories, CachedCombinedCategories, Categories, CombinedCategories,
};
pub use category::Category;

use crate::base::{Arena, Id};
use crate::errors::{ConfigErrors, ModelError, Result};
use crate::growth::{AgeLength, LengthWeight};

/// Separator joining category names into a combined label.
pub const COMBINE_SEPARATOR: char = '+';

/// Label selecting every category.
pub const ALL_CATEGORIES: &str = "*";

/// Complete set of categories for one model run.
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    categories: Arena<Category>,
    min_age: u32,
    max_age: u32,
    plus_group: bool,
}

impl Partition {
    pub fn new(min_age: u32, max_age: u32, plus_group: bool) -> Self {
        Self {
            categories: Arena::new(),
            min_age,
            max_age,
            plus_group,
        }
    }

    /// Declare a category covering the model's age range.
    ///
    /// Returns `None` if the name is already declared.
    pub fn add_category(&mut self, name: &str) -> Option<Id<Category>> {
        let category = Category::new(name, self.min_age, self.max_age);
        self.categories.insert(name, category)
    }

    /// Declare a category that only exists in `years`.
    pub fn add_category_in_years(
        &mut self,
        name: &str,
        years: impl IntoIterator<Item = u32>,
    ) -> Option<Id<Category>> {
        let category = Category::new(name, self.min_age, self.max_age).with_years(years);
        self.categories.insert(name, category)
    }

    pub fn find(&self, name: &str) -> Option<Id<Category>> {
        self.categories.find(name)
    }

    /// Resolve a category by name at execute time.
    ///
    /// Every name is checked while building, so a miss here is an engine bug
    /// and is reported as [`ModelError::Internal`].
    pub fn get(&self, name: &str) -> Result<Id<Category>> {
        self.find(name).ok_or_else(|| {
            ModelError::internal(format!("category '{name}' is not in the partition"))
        })
    }

    #[inline]
    pub fn category(&self, id: Id<Category>) -> &Category {
        self.categories.get(id)
    }

    #[inline]
    pub fn category_mut(&mut self, id: Id<Category>) -> &mut Category {
        self.categories.get_mut(id)
    }

    /// Borrow two different categories mutably.
    pub fn pair_mut(
        &mut self,
        first: Id<Category>,
        second: Id<Category>,
    ) -> Result<(&mut Category, &mut Category)> {
        self.categories.pair_mut(first, second).ok_or_else(|| {
            ModelError::internal("cannot move individuals from a category into itself")
        })
    }

    pub fn ids(&self) -> impl Iterator<Item = Id<Category>> + '_ {
        self.categories.ids()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Id<Category>, &Category)> {
        self.categories.iter()
    }

    pub fn names(&self) -> &[String] {
        self.categories.labels()
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn min_age(&self) -> u32 {
        self.min_age
    }

    pub fn max_age(&self) -> u32 {
        self.max_age
    }

    /// Number of age slots per category.
    pub fn age_spread(&self) -> usize {
        (self.max_age - self.min_age + 1) as usize
    }

    pub fn plus_group(&self) -> bool {
        self.plus_group
    }

    /// Total numbers over every category.
    pub fn total(&self) -> f64 {
        self.categories.values().map(Category::total).sum()
    }

    /// Zero every category.
    pub fn reset(&mut self) {
        for category in self.categories.values_mut() {
            category.reset();
        }
    }

    pub(crate) fn set_age_length(&mut self, id: Id<Category>, age_length: Option<Id<AgeLength>>) {
        self.categories.get_mut(id).set_age_length(age_length);
    }

    pub(crate) fn rebuild_growth(
        &mut self,
        time_steps: usize,
        age_lengths: &Arena<AgeLength>,
        length_weights: &Arena<LengthWeight>,
    ) {
        for category in self.categories.values_mut() {
            category.rebuild_growth(time_steps, age_lengths, length_weights);
        }
    }

    /// Expand one label into the categories it names.
    pub fn expand_label(&self, label: &str) -> std::result::Result<Vec<Id<Category>>, String> {
        let label = label.trim();
        if label == ALL_CATEGORIES {
            return Ok(self.ids().collect());
        }
        label
            .split(COMBINE_SEPARATOR)
            .map(|name| {
                let name = name.trim();
                self.find(name)
                    .ok_or_else(|| format!("category '{name}' has not been declared"))
            })
            .collect()
    }

    /// Expand a list of labels into a flat list of categories, recording an
    /// error for every unknown name.
    pub fn resolve_labels(
        &self,
        labels: &[String],
        location: &str,
        errors: &mut ConfigErrors,
    ) -> Vec<Id<Category>> {
        self.resolve_groups(labels, location, errors)
            .into_iter()
            .flatten()
            .collect()
    }

    /// Expand labels keeping each combined label as one group.
    ///
    /// `*` expands to one group per category.
    pub fn resolve_groups(
        &self,
        labels: &[String],
        location: &str,
        errors: &mut ConfigErrors,
    ) -> Vec<Vec<Id<Category>>> {
        let mut groups = Vec::with_capacity(labels.len());
        for label in labels {
            if label.trim() == ALL_CATEGORIES {
                groups.extend(self.ids().map(|id| vec![id]));
                continue;
            }
            match self.expand_label(label) {
                Ok(ids) => groups.push(ids),
                Err(message) => errors.push(location, message),
            }
        }
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_partition() -> Partition {
        let mut partition = Partition::new(1, 5, true);
        partition.add_category("immature.male").unwrap();
        partition.add_category("immature.female").unwrap();
        partition.add_category("mature.male").unwrap();
        partition
    }

    #[test]
    fn test_duplicate_category_rejected() {
        let mut partition = create_test_partition();
        assert!(partition.add_category("mature.male").is_none());
        assert_eq!(partition.len(), 3);
    }

    #[test]
    fn test_get_unknown_is_internal_error() {
        let partition = create_test_partition();
        assert!(partition.get("immature.male").is_ok());
        assert!(matches!(
            partition.get("juvenile"),
            Err(ModelError::Internal(_))
        ));
    }

    #[test]
    fn test_expand_labels() {
        let partition = create_test_partition();
        assert_eq!(partition.expand_label("*").unwrap().len(), 3);
        assert_eq!(
            partition
                .expand_label("immature.male + immature.female")
                .unwrap()
                .len(),
            2
        );
        assert!(partition.expand_label("immature.male+nope").is_err());
    }

    #[test]
    fn test_resolve_groups_records_errors() {
        let partition = create_test_partition();
        let mut errors = ConfigErrors::new();
        let labels = vec![
            "immature.male+immature.female".to_string(),
            "nope".to_string(),
            "*".to_string(),
        ];
        let groups = partition.resolve_groups(&labels, "observations[x].categories", &mut errors);

        assert_eq!(groups.len(), 4);
        assert_eq!(groups[0].len(), 2);
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_reset_zeroes_everything() {
        let mut partition = create_test_partition();
        let id = partition.find("mature.male").unwrap();
        partition.category_mut(id).data_mut()[2] = 7.0;
        assert_eq!(partition.total(), 7.0);

        partition.reset();
        assert_eq!(partition.total(), 0.0);
    }
}
