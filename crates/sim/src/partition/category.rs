use std::collections::BTreeSet;

use crate::base::{Arena, Id};
use crate::errors::{ModelError, Result};
use crate::growth::{AgeLength, LengthWeight};

/// One named, age-indexed compartment of the population.
///
/// `data[i]` holds the numbers at age `min_age + i`. The vector is sized at
/// construction and can only be replaced through [`Category::set_data`],
/// which checks the length.
#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    name: String,
    min_age: u32,
    max_age: u32,
    years: Option<BTreeSet<u32>>,
    age_length: Option<Id<AgeLength>>,
    data: Vec<f64>,
    mean_length: Vec<Vec<f64>>,
    mean_weight: Vec<Vec<f64>>,
}

impl Category {
    pub fn new(name: impl Into<String>, min_age: u32, max_age: u32) -> Self {
        let len = (max_age.saturating_sub(min_age) + 1) as usize;
        Self {
            name: name.into(),
            min_age,
            max_age,
            years: None,
            age_length: None,
            data: vec![0.0; len],
            mean_length: Vec::new(),
            mean_weight: Vec::new(),
        }
    }

    /// Restrict the years in which the category exists.
    pub fn with_years(mut self, years: impl IntoIterator<Item = u32>) -> Self {
        self.years = Some(years.into_iter().collect());
        self
    }

    pub(crate) fn set_age_length(&mut self, age_length: Option<Id<AgeLength>>) {
        self.age_length = age_length;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn min_age(&self) -> u32 {
        self.min_age
    }

    pub fn max_age(&self) -> u32 {
        self.max_age
    }

    pub fn age_length(&self) -> Option<Id<AgeLength>> {
        self.age_length
    }

    /// Number of age slots.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Mutable view of the numbers at age. The slice cannot change length.
    #[inline]
    pub fn data_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Replace the numbers at age, failing if the length differs.
    pub fn set_data(&mut self, values: &[f64]) -> Result<()> {
        if values.len() != self.data.len() {
            return Err(ModelError::internal(format!(
                "category '{}' holds {} ages but {} values were supplied",
                self.name,
                self.data.len(),
                values.len()
            )));
        }
        self.data.copy_from_slice(values);
        Ok(())
    }

    /// Slot index of `age`, if the category covers it.
    #[inline]
    pub fn index_of_age(&self, age: u32) -> Option<usize> {
        if age < self.min_age || age > self.max_age {
            None
        } else {
            Some((age - self.min_age) as usize)
        }
    }

    /// Whether the category exists in `year`.
    pub fn is_valid_in(&self, year: u32) -> bool {
        self.years
            .as_ref()
            .map_or(true, |years| years.contains(&year))
    }

    pub fn total(&self) -> f64 {
        self.data.iter().sum()
    }

    pub fn reset(&mut self) {
        self.data.fill(0.0);
    }

    /// Mean weight at the age slot `index` in `time_step`.
    ///
    /// Only valid after [`Category::rebuild_growth`]; categories without an
    /// age-length relationship weigh 1.0 per individual.
    #[inline]
    pub fn mean_weight(&self, time_step: usize, index: usize) -> f64 {
        self.mean_weight
            .get(time_step)
            .and_then(|row| row.get(index))
            .copied()
            .unwrap_or(1.0)
    }

    #[inline]
    pub fn mean_length(&self, time_step: usize, index: usize) -> f64 {
        self.mean_length
            .get(time_step)
            .and_then(|row| row.get(index))
            .copied()
            .unwrap_or(0.0)
    }

    /// Recompute the mean length and weight caches.
    pub(crate) fn rebuild_growth(
        &mut self,
        time_steps: usize,
        age_lengths: &Arena<AgeLength>,
        length_weights: &Arena<LengthWeight>,
    ) {
        let ages = self.min_age..=self.max_age;
        match self.age_length {
            Some(id) => {
                let age_length = age_lengths.get(id);
                self.mean_length = (0..time_steps)
                    .map(|step| {
                        ages.clone()
                            .map(|age| age_length.mean_length(age, step))
                            .collect()
                    })
                    .collect();
                self.mean_weight = (0..time_steps)
                    .map(|step| {
                        ages.clone()
                            .map(|age| age_length.mean_weight(age, step, length_weights))
                            .collect()
                    })
                    .collect();
            }
            None => {
                self.mean_length = vec![vec![0.0; self.data.len()]; time_steps];
                self.mean_weight = vec![vec![1.0; self.data.len()]; time_steps];
            }
        }
    }
}
