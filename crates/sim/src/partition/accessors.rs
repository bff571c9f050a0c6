//! Views over subsets of the partition.
//!
//! Accessors are bound to a fixed set of categories when the owning process
//! or observation is built. The cached variants additionally hold a deep copy
//! of the referenced data taken at [`CachedCategories::build_cache`] time so
//! later code can compare against, interpolate from, or restore that point.

use std::collections::BTreeMap;

use super::{Category, Partition};
use crate::base::Id;
use crate::errors::{ConfigErrors, Result};

/// Handles to a fixed list of categories.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Categories {
    ids: Vec<Id<Category>>,
}

impl Categories {
    /// Resolve `labels` against the partition, recording unknown names.
    pub fn init(
        partition: &Partition,
        labels: &[String],
        location: &str,
        errors: &mut ConfigErrors,
    ) -> Self {
        Self {
            ids: partition.resolve_labels(labels, location, errors),
        }
    }

    /// Every category in declaration order.
    pub fn all(partition: &Partition) -> Self {
        Self {
            ids: partition.ids().collect(),
        }
    }

    pub fn from_ids(ids: Vec<Id<Category>>) -> Self {
        Self { ids }
    }

    pub fn ids(&self) -> &[Id<Category>] {
        &self.ids
    }

    pub fn iter<'a>(&'a self, partition: &'a Partition) -> impl Iterator<Item = &'a Category> + 'a {
        self.ids.iter().map(move |&id| partition.category(id))
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Categories grouped by combined label, filtered per year by validity.
///
/// A category that does not exist in a year is left out of its group for that
/// year. The group itself stays, possibly empty, so group positions always
/// line up with the configured labels.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CombinedCategories {
    groups: Vec<Vec<Id<Category>>>,
    by_year: BTreeMap<u32, Vec<Vec<Id<Category>>>>,
}

impl CombinedCategories {
    pub fn init(
        partition: &Partition,
        labels: &[String],
        years: impl IntoIterator<Item = u32>,
        location: &str,
        errors: &mut ConfigErrors,
    ) -> Self {
        let groups = partition.resolve_groups(labels, location, errors);
        let by_year = years
            .into_iter()
            .map(|year| {
                let valid = groups
                    .iter()
                    .map(|group| {
                        group
                            .iter()
                            .copied()
                            .filter(|&id| partition.category(id).is_valid_in(year))
                            .collect()
                    })
                    .collect();
                (year, valid)
            })
            .collect();
        Self { groups, by_year }
    }

    /// Groups valid in `year`.
    ///
    /// Years outside the model range (initialisation) see every category.
    pub fn groups(&self, year: u32) -> &[Vec<Id<Category>>] {
        self.by_year.get(&year).unwrap_or(&self.groups)
    }

    /// Groups with every member, ignoring validity years.
    pub fn all_groups(&self) -> &[Vec<Id<Category>>] {
        &self.groups
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// A [`Categories`] view plus a frozen copy of its data.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CachedCategories {
    categories: Categories,
    cache: Vec<Vec<f64>>,
}

impl CachedCategories {
    pub fn new(categories: Categories) -> Self {
        Self {
            categories,
            cache: Vec::new(),
        }
    }

    pub fn all(partition: &Partition) -> Self {
        Self::new(Categories::all(partition))
    }

    /// Copy the current data of every category. Overwrites any earlier copy.
    pub fn build_cache(&mut self, partition: &Partition) {
        self.cache.clear();
        self.cache.extend(
            self.categories
                .iter(partition)
                .map(|category| category.data().to_vec()),
        );
    }

    pub fn ids(&self) -> &[Id<Category>] {
        self.categories.ids()
    }

    /// The cached data of the category at position `index`.
    pub fn cached(&self, index: usize) -> &[f64] {
        &self.cache[index]
    }

    /// Pairs of (category, cached data) in view order.
    pub fn iter(&self) -> impl Iterator<Item = (Id<Category>, &[f64])> {
        self.categories
            .ids()
            .iter()
            .copied()
            .zip(self.cache.iter().map(Vec::as_slice))
    }

    /// Write the cached data back into the partition.
    pub fn restore(&self, partition: &mut Partition) -> Result<()> {
        for (id, values) in self.iter() {
            partition.category_mut(id).set_data(values)?;
        }
        Ok(())
    }
}

/// A [`CombinedCategories`] view plus a frozen copy of the data valid in
/// the year the cache was built for.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CachedCombinedCategories {
    combined: CombinedCategories,
    cache: Vec<Vec<Vec<f64>>>,
}

impl CachedCombinedCategories {
    pub fn new(combined: CombinedCategories) -> Self {
        Self {
            combined,
            cache: Vec::new(),
        }
    }

    pub fn build_cache(&mut self, partition: &Partition, year: u32) {
        self.cache = self
            .combined
            .groups(year)
            .iter()
            .map(|group| {
                group
                    .iter()
                    .map(|&id| partition.category(id).data().to_vec())
                    .collect()
            })
            .collect();
    }

    pub fn groups(&self, year: u32) -> &[Vec<Id<Category>>] {
        self.combined.groups(year)
    }

    /// Cached data for member `member` of group `group`.
    pub fn cached(&self, group: usize, member: usize) -> Option<&[f64]> {
        self.cache
            .get(group)
            .and_then(|members| members.get(member))
            .map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.combined.len()
    }

    pub fn is_empty(&self) -> bool {
        self.combined.is_empty()
    }
}
