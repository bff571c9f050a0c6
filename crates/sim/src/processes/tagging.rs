use std::collections::BTreeMap;

use tracing::{trace, warn};

use crate::addressable::Target;
use crate::base::math::zero_fun;
use crate::base::Id;
use crate::errors::{ConfigErrors, ModelError, Result};
use crate::model::config::{TagByAgeConfig, YearValues};
use crate::model::BuildContext;
use crate::partition::{Category, COMBINE_SEPARATOR};
use crate::penalty::Penalty;
use crate::selectivity::Selectivity;

use super::ProcessContext;

/// Releases tagged individuals by age.
///
/// Each member of `from` is paired with the `to` category at the same
/// position. The number tagged at an age is turned into an exploitation rate
/// against the available numbers; rates above `u_max` are clamped and flag the
/// penalty so the infeasible request still reaches the objective function.
#[derive(Debug, Clone, PartialEq)]
pub struct TagByAge {
    from: Vec<Id<Category>>,
    to: Vec<Id<Category>>,
    min_age: u32,
    max_age: u32,
    selectivities: Vec<Id<Selectivity>>,
    /// Numbers to tag by year, one value per age in `min_age..=max_age`.
    numbers: BTreeMap<u32, Vec<f64>>,
    u_max: f64,
    penalty: Option<Id<Penalty>>,
    initial_mortality: f64,
    initial_mortality_selectivity: Option<Id<Selectivity>>,
    /// Individuals released by year, per pair and age, before initial
    /// mortality.
    releases: BTreeMap<u32, Vec<Vec<f64>>>,
    /// Individuals moved by year, per pair and age.
    tagged: BTreeMap<u32, Vec<Vec<f64>>>,
}

impl TagByAge {
    pub(crate) fn build(
        config: &TagByAgeConfig,
        ctx: &BuildContext<'_>,
        location: &str,
        errors: &mut ConfigErrors,
    ) -> Self {
        let settings = ctx.settings;

        let from = match ctx.partition.expand_label(&config.from) {
            Ok(ids) => ids,
            Err(message) => {
                errors.push(format!("{location}.from"), message);
                Vec::new()
            }
        };
        for label in config.to.iter().filter(|l| l.contains(COMBINE_SEPARATOR)) {
            errors.push(
                format!("{location}.to"),
                format!("combined category '{label}' is not allowed; list each category separately"),
            );
        }
        let to = ctx.categories(&config.to, &format!("{location}.to"), errors);
        if to.len() != from.len() {
            errors.push(
                format!("{location}.to"),
                format!(
                    "{} 'to' categories were supplied for {} 'from' categories",
                    to.len(),
                    from.len()
                ),
            );
        }
        let selectivities = ctx.selectivities(
            &config.selectivities,
            to.len(),
            &format!("{location}.selectivities"),
            errors,
        );

        if config.min_age > config.max_age {
            errors.push(
                format!("{location}.min_age"),
                format!("({}) cannot be greater than max_age ({})", config.min_age, config.max_age),
            );
        }
        if config.min_age < settings.min_age || config.max_age > settings.max_age {
            errors.push(
                format!("{location}.min_age"),
                "tagged ages must be within the model ages",
            );
        }
        for year in config.years.iter().filter(|y| !settings.years().contains(*y)) {
            errors.push(
                format!("{location}.years"),
                format!("year {year} is outside the model years"),
            );
        }
        if config.tolerance > 0.01 {
            warn!(
                location,
                tolerance = config.tolerance,
                "proportions tolerance is large; fewer individuals may be tagged than expected"
            );
        }
        if !(0.0..=1.0).contains(&config.u_max) {
            errors.push(format!("{location}.u_max"), "must be between 0 and 1");
        }
        if !(0.0..=1.0).contains(&config.initial_mortality) {
            errors.push(
                format!("{location}.initial_mortality"),
                "must be between 0 and 1",
            );
        }

        let age_spread = (config.max_age.saturating_sub(config.min_age) + 1) as usize;
        let numbers = load_tables(config, age_spread, location, errors);

        let penalty = match &config.penalty {
            Some(label) => ctx.penalty(label, &format!("{location}.penalty"), errors),
            None => {
                warn!(
                    location,
                    "no penalty specified; tagging above u_max will not affect the objective function"
                );
                None
            }
        };
        let initial_mortality_selectivity = config.initial_mortality_selectivity.as_deref().and_then(|label| {
            ctx.selectivity(label, &format!("{location}.initial_mortality_selectivity"), errors)
        });

        Self {
            from,
            to,
            min_age: config.min_age,
            max_age: config.max_age,
            selectivities,
            numbers,
            u_max: config.u_max,
            penalty,
            initial_mortality: config.initial_mortality,
            initial_mortality_selectivity,
            releases: BTreeMap::new(),
            tagged: BTreeMap::new(),
        }
    }

    pub fn numbers(&self) -> &BTreeMap<u32, Vec<f64>> {
        &self.numbers
    }

    pub fn releases(&self) -> &BTreeMap<u32, Vec<Vec<f64>>> {
        &self.releases
    }

    pub fn tagged(&self) -> &BTreeMap<u32, Vec<Vec<f64>>> {
        &self.tagged
    }

    pub(crate) fn reset(&mut self) {
        self.releases.clear();
        self.tagged.clear();
    }

    pub(crate) fn execute(&mut self, label: &str, ctx: &mut ProcessContext<'_>) -> Result<()> {
        if ctx.state.is_initialising() {
            return Ok(());
        }
        let year = ctx.state.current_year;
        let Some(numbers) = self.numbers.get(&year) else {
            return Ok(());
        };

        let age_spread = numbers.len();
        let mut releases = vec![vec![0.0; age_spread]; self.from.len()];
        let mut tagged = vec![vec![0.0; age_spread]; self.from.len()];

        for (pair, ((&from, &to), &selectivity)) in self
            .from
            .iter()
            .zip(&self.to)
            .zip(&self.selectivities)
            .enumerate()
        {
            let selectivity = ctx.selectivities.get(selectivity);
            let (source, target) = ctx.partition.pair_mut(from, to)?;

            for (k, &requested_numbers) in numbers.iter().enumerate() {
                let age = self.min_age + k as u32;
                let slot = source.index_of_age(age).ok_or_else(|| {
                    ModelError::internal(format!("tagged age {age} is outside category '{}'", source.name()))
                })?;
                let available = source.data()[slot];

                let requested = requested_numbers * selectivity.value_at(age) / zero_fun(available);
                let mut exploitation = requested;
                if exploitation > self.u_max {
                    exploitation = self.u_max;
                    if let Some(penalty) = self.penalty {
                        ctx.penalties
                            .trigger(penalty, label, available * requested, available * self.u_max);
                    }
                }

                let mut amount = available * exploitation;
                releases[pair][k] = amount;
                if self.initial_mortality > 0.0 {
                    let survival = match self.initial_mortality_selectivity {
                        Some(id) => 1.0 - self.initial_mortality * ctx.selectivities.get(id).value_at(age),
                        None => 1.0 - self.initial_mortality,
                    };
                    amount *= survival;
                }
                tagged[pair][k] = amount;
                trace!(process = label, year, age, exploitation, amount, "tagging");

                source.data_mut()[slot] -= amount;
                target.data_mut()[slot] += amount;
                if source.data()[slot] < 0.0 {
                    return Err(ModelError::internal(format!(
                        "tagging made category '{}' negative at age {age}",
                        source.name()
                    )));
                }
            }
        }

        self.releases.insert(year, releases);
        self.tagged.insert(year, tagged);
        Ok(())
    }

    pub(crate) fn parameter_mut(&mut self, name: &str) -> Option<Target<'_>> {
        match name {
            "u_max" => Some(Target::Scalar(&mut self.u_max)),
            "initial_mortality" => Some(Target::Scalar(&mut self.initial_mortality)),
            _ => None,
        }
    }

    pub fn ages(&self) -> std::ops::RangeInclusive<u32> {
        self.min_age..=self.max_age
    }
}

/// Turn the `numbers` or `proportions` table into numbers by year.
fn load_tables(
    config: &TagByAgeConfig,
    age_spread: usize,
    location: &str,
    errors: &mut ConfigErrors,
) -> BTreeMap<u32, Vec<f64>> {
    let check_rows = |rows: &[YearValues], table: &str, errors: &mut ConfigErrors| {
        if rows.len() != config.years.len() {
            errors.push(
                format!("{location}.{table}"),
                format!(
                    "{} rows were supplied for {} years",
                    rows.len(),
                    config.years.len()
                ),
            );
        }
        for row in rows {
            if !config.years.contains(&row.year) {
                errors.push(
                    format!("{location}.{table}"),
                    format!("year {} is not one of the process years", row.year),
                );
            }
            if row.values.len() != age_spread {
                errors.push(
                    format!("{location}.{table}"),
                    format!(
                        "year {} has {} values; one per age ({age_spread}) is required",
                        row.year,
                        row.values.len()
                    ),
                );
            }
        }
    };

    match (config.numbers.is_empty(), config.proportions.is_empty()) {
        (false, false) => {
            errors.push(location, "cannot have both a numbers and a proportions table");
            BTreeMap::new()
        }
        (true, true) => {
            errors.push(location, "either a numbers or a proportions table is required");
            BTreeMap::new()
        }
        (false, true) => {
            if !config.n.is_empty() {
                errors.push(
                    format!("{location}.n"),
                    "n must be omitted when a numbers table is given",
                );
            }
            check_rows(&config.numbers, "numbers", errors);
            config
                .numbers
                .iter()
                .map(|row| (row.year, row.values.clone()))
                .collect()
        }
        (true, false) => {
            check_rows(&config.proportions, "proportions", errors);
            let n = match config.n.as_slice() {
                [single] => vec![*single; config.years.len()],
                values if values.len() == config.years.len() => values.to_vec(),
                values => {
                    errors.push(
                        format!("{location}.n"),
                        format!(
                            "{} values were supplied for {} years",
                            values.len(),
                            config.years.len()
                        ),
                    );
                    return BTreeMap::new();
                }
            };

            let mut numbers = BTreeMap::new();
            for row in &config.proportions {
                let Some(position) = config.years.iter().position(|&y| y == row.year) else {
                    continue;
                };
                if row.values.iter().any(|p| *p < 0.0) {
                    errors.push(
                        format!("{location}.proportions"),
                        format!("year {} has a negative proportion", row.year),
                    );
                }
                let total: f64 = row.values.iter().sum();
                if (1.0 - total).abs() > config.tolerance {
                    errors.push(
                        format!("{location}.proportions"),
                        format!("total ({total}) does not sum to 1.0 for year {}", row.year),
                    );
                }
                numbers.insert(
                    row.year,
                    row.values.iter().map(|p| n[position] * p).collect(),
                );
            }
            numbers
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::Arena;
    use crate::model::{ModelState, RunState};
    use crate::partition::Partition;
    use crate::penalty::{PenaltyConfig, Penalties};
    use crate::selectivity::SelectivityKind;

    fn create_test_config() -> TagByAgeConfig {
        serde_json::from_str(
            r#"{"from": "male", "to": ["tagged.male"], "years": [2001, 2002],
                "min_age": 3, "max_age": 4, "selectivities": ["one"],
                "proportions": [{"year": 2001, "values": [0.25, 0.75]},
                                {"year": 2002, "values": [0.5, 0.5]}],
                "n": [100]}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_proportions_table_is_scaled_by_n() {
        let config = create_test_config();
        let mut errors = ConfigErrors::new();
        let numbers = load_tables(&config, 2, "processes[tag]", &mut errors);

        assert!(errors.is_empty(), "{errors}");
        assert_eq!(numbers[&2001], vec![25.0, 75.0]);
        assert_eq!(numbers[&2002], vec![50.0, 50.0]);
    }

    #[test]
    fn test_proportions_must_sum_to_one() {
        let mut config = create_test_config();
        config.proportions[0].values = vec![0.25, 0.5];
        let mut errors = ConfigErrors::new();
        load_tables(&config, 2, "processes[tag]", &mut errors);
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_both_tables_rejected() {
        let mut config = create_test_config();
        config.numbers = config.proportions.clone();
        let mut errors = ConfigErrors::new();
        load_tables(&config, 2, "processes[tag]", &mut errors);
        assert!(errors.contains_location("processes[tag]"));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_row_width_checked() {
        let mut config = create_test_config();
        config.proportions[1].values = vec![1.0];
        let mut errors = ConfigErrors::new();
        load_tables(&config, 2, "processes[tag]", &mut errors);
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_tagging_is_clamped_at_u_max() {
        let mut partition = Partition::new(1, 5, false);
        let male = partition.add_category("male").unwrap();
        let tagged = partition.add_category("tagged.male").unwrap();
        partition.category_mut(male).set_data(&[100.0; 5]).unwrap();

        let mut selectivities = Arena::new();
        let one = selectivities
            .insert("one", Selectivity::new(SelectivityKind::Constant { c: 1.0 }, 1, 5))
            .unwrap();
        let mut errors = ConfigErrors::new();
        let mut penalties = Penalties::build(
            &[PenaltyConfig {
                label: "tag_penalty".to_string(),
                multiplier: 1.0,
                log_scale: false,
            }],
            &mut errors,
        );

        let mut process = TagByAge {
            from: vec![male],
            to: vec![tagged],
            min_age: 3,
            max_age: 4,
            selectivities: vec![one],
            numbers: BTreeMap::from([(2001, vec![25.0, 90.0])]),
            u_max: 0.5,
            penalty: penalties.find("tag_penalty"),
            initial_mortality: 0.0,
            initial_mortality_selectivity: None,
            releases: BTreeMap::new(),
            tagged: BTreeMap::new(),
        };

        let derived_quantities = Arena::new();
        let mut state = RunState::new(2000, 2002);
        state.state = ModelState::Execute;
        state.current_year = 2001;
        let mut ctx = ProcessContext {
            partition: &mut partition,
            selectivities: &selectivities,
            derived_quantities: &derived_quantities,
            penalties: &mut penalties,
            state: &state,
        };
        process.execute("tagging", &mut ctx).unwrap();

        // age 4 asks for 90% of the fish but only u_max can move
        assert_eq!(partition.category(male).data(), &[100.0, 100.0, 75.0, 50.0, 100.0]);
        assert_eq!(partition.category(tagged).data(), &[0.0, 0.0, 25.0, 50.0, 0.0]);
        assert_eq!(process.tagged()[&2001], vec![vec![25.0, 50.0]]);

        let flagged = penalties.flagged();
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].label, "tag_penalty");
        // (90 - 50)^2
        assert_eq!(flagged[0].value, 1600.0);
    }
}
