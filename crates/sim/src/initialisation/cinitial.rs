use crate::base::Id;
use crate::derived_quantity::DerivedQuantity;
use crate::errors::{ConfigErrors, Result};
use crate::model::config::{CategoryValues, CinitialConfig};
use crate::model::{BuildContext, RunContext};
use crate::partition::{CachedCategories, Categories, Category, Partition};

/// Sets the numbers at age of (combined) categories to a user table.
///
/// Members of a combined category keep their relative share at each age.
/// One annual cycle is then run so derived quantities have a value for the
/// phase, after which the partition is put back to the table state.
#[derive(Debug, Clone, PartialEq)]
pub struct Cinitial {
    groups: Vec<Vec<Id<Category>>>,
    n: Vec<Vec<f64>>,
    derived_quantities: Vec<Id<DerivedQuantity>>,
    ssb_offset: u32,
}

impl Cinitial {
    pub(crate) fn build(
        config: &CinitialConfig,
        ctx: &BuildContext<'_>,
        location: &str,
        errors: &mut ConfigErrors,
    ) -> Self {
        let groups = ctx
            .partition
            .resolve_groups(&config.categories, &format!("{location}.categories"), errors);
        let n = table_rows(
            &config.categories,
            &config.n,
            ctx.settings.age_spread(),
            &format!("{location}.n"),
            errors,
        );
        let derived_quantities = config
            .derived_quantities
            .iter()
            .filter_map(|label| ctx.derived_quantity(label, &format!("{location}.derived_quantities"), errors))
            .collect();

        Self {
            groups,
            n,
            derived_quantities,
            ssb_offset: config.ssb_offset,
        }
    }

    /// Scale each group's members so the group totals equal the table.
    pub fn apply(&self, partition: &mut Partition) {
        for (group, n) in self.groups.iter().zip(&self.n) {
            let mut totals = vec![0.0; n.len()];
            for &id in group {
                for (total, value) in totals.iter_mut().zip(partition.category(id).data()) {
                    *total += value;
                }
            }
            let factors: Vec<f64> = totals
                .iter()
                .zip(n)
                .map(|(&total, &target)| if total == 0.0 { 1.0 } else { target / total })
                .collect();
            for &id in group {
                for (value, factor) in partition.category_mut(id).data_mut().iter_mut().zip(&factors) {
                    *value *= factor;
                }
            }
        }
    }

    /// Returns the years run.
    pub(crate) fn execute(&self, ctx: &mut RunContext<'_>) -> Result<u32> {
        self.apply(ctx.partition);

        let ids = self.groups.iter().flatten().copied().collect();
        let mut cache = CachedCategories::new(Categories::from_ids(ids));
        cache.build_cache(ctx.partition);
        ctx.execute_initialisation_years(1)?;

        let phase = ctx.state.phase;
        for &id in &self.derived_quantities {
            ctx.derived_quantities
                .get_mut(id)
                .pad_phase(phase, self.ssb_offset as usize)?;
        }
        cache.restore(ctx.partition)?;
        Ok(1)
    }
}

/// Order the rows of a by-category table to match `labels`.
pub(super) fn table_rows(
    labels: &[String],
    rows: &[CategoryValues],
    width: usize,
    location: &str,
    errors: &mut ConfigErrors,
) -> Vec<Vec<f64>> {
    for row in rows {
        if !labels.contains(&row.category) {
            errors.push(location, format!("row '{}' is not one of the categories", row.category));
        }
    }
    labels
        .iter()
        .map(|label| {
            let Some(row) = rows.iter().find(|row| &row.category == label) else {
                errors.push(location, format!("no row was given for '{label}'"));
                return vec![0.0; width];
            };
            if row.values.len() != width {
                errors.push(
                    location,
                    format!("row '{label}' has {} values but {width} are required", row.values.len()),
                );
                return vec![0.0; width];
            }
            if row.values.iter().any(|v| *v < 0.0) {
                errors.push(location, format!("row '{label}' has negative values"));
            }
            row.values.clone()
        })
        .collect()
}
