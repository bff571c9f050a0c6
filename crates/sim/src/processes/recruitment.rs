use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::addressable::Target;
use crate::base::math::{is_close, PROPORTION_TOLERANCE};
use crate::base::{Arena, Id};
use crate::derived_quantity::DerivedQuantity;
use crate::errors::{ConfigErrors, ModelError, Result};
use crate::model::config::{ModelSettings, RecruitmentBevertonHoltConfig, RecruitmentConstantConfig};
use crate::model::{broadcast, BuildContext, RunState};
use crate::partition::{Category, Partition};

use super::{ProcessContext, ProcessType};

/// Beverton-Holt stock-recruitment relationship.
///
/// `ratio` is spawning biomass relative to B0 and the result is the
/// proportion of R0 recruited.
#[inline]
pub fn beverton_holt(ratio: f64, steepness: f64) -> f64 {
    ratio / (1.0 - ((5.0 * steepness - 1.0) / (4.0 * steepness)) * (1.0 - ratio))
}

/// One process in the annual cycle, as seen when deriving the SSB offset.
#[derive(Debug, Clone)]
pub(crate) struct CycleEntry {
    pub label: String,
    pub process_type: ProcessType,
}

/// Whether the SSB derived quantity, calculated at the end of the mortality
/// block of time step `dq_time_step`, is already known for the current year
/// when the recruitment process `label` runs.
fn ssb_precedes_recruitment(label: &str, cycle: &[Vec<CycleEntry>], dq_time_step: usize) -> bool {
    let Some((step, position)) = cycle.iter().enumerate().find_map(|(step, entries)| {
        entries
            .iter()
            .position(|entry| entry.label == label)
            .map(|position| (step, position))
    }) else {
        return true;
    };
    if step != dq_time_step {
        return step > dq_time_step;
    }
    // Without a mortality block the quantity is calculated after every process
    cycle[step]
        .iter()
        .rposition(|entry| entry.process_type.counts_as_mortality())
        .is_some_and(|block_end| block_end < position)
}

fn recruitment_age(age: Option<u32>, settings: &ModelSettings, location: &str, errors: &mut ConfigErrors) -> u32 {
    let Some(age) = age else {
        return settings.min_age;
    };
    if age != settings.min_age {
        warn!(
            location,
            age,
            min_age = settings.min_age,
            "recruitment age is not the model min age"
        );
    }
    if age < settings.min_age || age > settings.max_age {
        errors.push(
            format!("{location}.age"),
            format!(
                "({age}) must be between the model min age ({}) and max age ({})",
                settings.min_age, settings.max_age
            ),
        );
    }
    age
}

fn check_proportions(proportions: &[f64], categories: usize, location: &str, errors: &mut ConfigErrors) {
    if proportions.len() != categories {
        errors.push(
            format!("{location}.proportions"),
            format!(
                "one proportion is required per category; got {} for {categories} categories",
                proportions.len()
            ),
        );
    }
    let total: f64 = proportions.iter().sum();
    if !is_close(total, 1.0, PROPORTION_TOLERANCE) {
        errors.push(
            format!("{location}.proportions"),
            format!("the sum total is {total} which should be 1.0"),
        );
    }
}

fn add_recruits(
    partition: &mut Partition,
    categories: &[Id<Category>],
    proportions: &[f64],
    age: u32,
    amount: f64,
) -> Result<()> {
    for (&id, &proportion) in categories.iter().zip(proportions) {
        let category = partition.category_mut(id);
        let index = category.index_of_age(age).ok_or_else(|| {
            ModelError::internal(format!(
                "recruitment age {age} is outside category '{}'",
                category.name()
            ))
        })?;
        category.data_mut()[index] += amount * proportion;
    }
    Ok(())
}

/// Recruitment of a fixed number of individuals every year.
#[derive(Debug, Clone, PartialEq)]
pub struct RecruitmentConstant {
    categories: Vec<Id<Category>>,
    proportions: Vec<f64>,
    r0: f64,
    age: u32,
}

impl RecruitmentConstant {
    pub(crate) fn build(
        config: &RecruitmentConstantConfig,
        ctx: &BuildContext<'_>,
        location: &str,
        errors: &mut ConfigErrors,
    ) -> Self {
        let categories = ctx.categories(&config.categories, &format!("{location}.categories"), errors);
        check_proportions(&config.proportions, categories.len(), location, errors);
        if config.r0 < 0.0 {
            errors.push(format!("{location}.r0"), "cannot be negative");
        }
        Self {
            categories,
            proportions: config.proportions.clone(),
            r0: config.r0,
            age: recruitment_age(config.age, ctx.settings, location, errors),
        }
    }

    pub fn r0(&self) -> f64 {
        self.r0
    }

    pub(crate) fn execute(&mut self, ctx: &mut ProcessContext<'_>) -> Result<()> {
        add_recruits(ctx.partition, &self.categories, &self.proportions, self.age, self.r0)
    }

    pub(crate) fn parameter_mut(&mut self, name: &str) -> Option<Target<'_>> {
        match name {
            "r0" => Some(Target::Scalar(&mut self.r0)),
            "proportions" => Some(Target::Vector(&mut self.proportions)),
            _ => None,
        }
    }
}

/// Beverton-Holt recruitment with year class strengths.
///
/// Recruitment is initialised either from R0, in which case B0 is read from
/// the spawning biomass at the end of the B0 phase, or from B0, in which case
/// the process recruits one individual per year until the B0 phase is done and
/// then scales the partition so the spawning biomass equals B0.
#[derive(Debug, Clone, PartialEq)]
pub struct RecruitmentBevertonHolt {
    location: String,
    categories: Vec<Id<Category>>,
    proportions: Vec<f64>,
    r0: f64,
    b0: f64,
    b0_initialised: bool,
    steepness: f64,
    age: u32,
    ssb: Option<Id<DerivedQuantity>>,
    ssb_offset: u32,
    user_ssb_offset: Option<u32>,
    b0_phase: usize,
    b0_phase_label: Option<String>,
    start_year: u32,
    recruitment_multipliers: Vec<f64>,
    standardised_multipliers: Vec<f64>,
    standardise_indices: Vec<usize>,
    have_scaled: bool,
    ssb_values: BTreeMap<u32, f64>,
    true_ycs: BTreeMap<u32, f64>,
    recruits: BTreeMap<u32, f64>,
}

impl RecruitmentBevertonHolt {
    pub(crate) fn build(
        config: &RecruitmentBevertonHoltConfig,
        ctx: &BuildContext<'_>,
        location: &str,
        errors: &mut ConfigErrors,
    ) -> Self {
        let settings = ctx.settings;
        let categories = ctx.categories(&config.categories, &format!("{location}.categories"), errors);
        check_proportions(&config.proportions, categories.len(), location, errors);

        let (r0, b0) = match (config.r0, config.b0) {
            (Some(_), Some(_)) => {
                errors.push(format!("{location}.r0"), "cannot specify both r0 and b0");
                (0.0, 0.0)
            }
            (None, None) => {
                errors.push(location, "specify either r0 or b0 to initialise the model");
                (0.0, 0.0)
            }
            (Some(r0), None) => (r0, 0.0),
            (None, Some(b0)) => (1.0, b0),
        };
        if r0 < 0.0 || b0 < 0.0 {
            errors.push(location, "r0 and b0 cannot be negative");
        }
        if !(0.2..=1.0).contains(&config.steepness) {
            errors.push(
                format!("{location}.steepness"),
                format!("({}) must be between 0.2 and 1.0", config.steepness),
            );
        }

        let multipliers = broadcast(
            &config.recruitment_multipliers,
            settings.year_count(),
            &format!("{location}.recruitment_multipliers"),
            errors,
        );
        for value in multipliers.iter().filter(|v| **v < 0.0) {
            errors.push(
                format!("{location}.recruitment_multipliers"),
                format!("value {value} cannot be less than 0.0"),
            );
        }

        let years = settings.years();
        for pair in config.standardise_years.windows(2) {
            if pair[0] >= pair[1] {
                errors.push(
                    format!("{location}.standardise_years"),
                    format!("values must be strictly increasing; {} is not less than {}", pair[0], pair[1]),
                );
            }
        }
        let mut standardise_indices = Vec::with_capacity(config.standardise_years.len());
        for &year in &config.standardise_years {
            if years.contains(&year) {
                standardise_indices.push((year - settings.start_year) as usize);
            } else {
                errors.push(
                    format!("{location}.standardise_years"),
                    format!("year {year} is outside the model years"),
                );
            }
        }

        let ssb = ctx.derived_quantity(&config.ssb, &format!("{location}.ssb"), errors);

        let mut process = Self {
            location: location.to_string(),
            categories,
            proportions: config.proportions.clone(),
            r0,
            b0,
            b0_initialised: config.b0.is_some(),
            steepness: config.steepness,
            age: recruitment_age(config.age, settings, location, errors),
            ssb,
            ssb_offset: config.ssb_offset.unwrap_or(0),
            user_ssb_offset: config.ssb_offset,
            b0_phase: 0,
            b0_phase_label: config.b0_phase.clone(),
            start_year: settings.start_year,
            standardised_multipliers: multipliers.clone(),
            recruitment_multipliers: multipliers,
            standardise_indices,
            have_scaled: false,
            ssb_values: BTreeMap::new(),
            true_ycs: BTreeMap::new(),
            recruits: BTreeMap::new(),
        };
        process.reset();
        process
    }

    /// Resolve the B0 phase and the SSB offset once the annual cycle and
    /// the initialisation phases are known.
    pub(crate) fn bind_cycle(
        &mut self,
        label: &str,
        cycle: &[Vec<CycleEntry>],
        derived_quantities: &Arena<DerivedQuantity>,
        phases: &[String],
        location: &str,
        errors: &mut ConfigErrors,
    ) {
        if phases.is_empty() {
            errors.push(
                location,
                "Beverton-Holt recruitment requires at least one initialisation phase",
            );
        }
        if let Some(phase) = &self.b0_phase_label {
            match phases.iter().position(|p| p == phase) {
                Some(index) => self.b0_phase = index,
                None => errors.push(
                    format!("{location}.b0_phase"),
                    format!("initialisation phase '{phase}' has not been defined"),
                ),
            }
        }

        let Some(ssb) = self.ssb else {
            return;
        };
        let dq_time_step = derived_quantities.get(ssb).time_step();

        match (self.user_ssb_offset, self.derive_ssb_offset(label, cycle, dq_time_step, location, errors)) {
            (Some(given), Some(derived)) if given != derived => {
                warn!(
                    process = label,
                    given,
                    derived,
                    "specified ssb_offset differs from the one derived from the annual cycle"
                );
            }
            (None, Some(derived)) => self.ssb_offset = derived,
            _ => {}
        }

        if self.ssb_offset == 0 && !ssb_precedes_recruitment(label, cycle, dq_time_step) {
            errors.push(
                format!("{location}.ssb_offset"),
                "(0) reads the spawning biomass of the current year, which is calculated after \
                 this recruitment in the annual cycle; the offset must be at least 1",
            );
        }
    }

    /// SSB offset implied by the order of ageing, recruitment and the SSB
    /// calculation in the annual cycle.
    fn derive_ssb_offset(
        &self,
        label: &str,
        cycle: &[Vec<CycleEntry>],
        dq_time_step: usize,
        location: &str,
        errors: &mut ConfigErrors,
    ) -> Option<u32> {
        let mut index = 0usize;
        let mut ageing_processes = 0usize;
        let mut ageing_index = None;
        let mut dq_index = None;
        for (step, entries) in cycle.iter().enumerate() {
            let mut block_seen = false;
            for entry in entries {
                match entry.process_type {
                    ProcessType::Ageing => {
                        ageing_index = Some(index);
                        ageing_processes += 1;
                    }
                    t if step == dq_time_step && t.counts_as_mortality() => {
                        block_seen = true;
                        dq_index = Some(index);
                    }
                    _ => {}
                }
                index += 1;
            }
            if step == dq_time_step && !block_seen {
                index += 1;
                dq_index = Some(index);
                index += 1;
            }
        }
        let recruitment_index = cycle
            .iter()
            .flatten()
            .position(|entry| entry.label == label)
            .map(|position| position + 1);

        if ageing_processes > 1 && self.user_ssb_offset.is_none() {
            errors.push(
                format!("{location}.ssb_offset"),
                format!(
                    "can only be derived with a single ageing process in the annual cycle; \
                     found {ageing_processes}. Set it manually"
                ),
            );
            return None;
        }
        if ageing_processes != 1 {
            return None;
        }

        let (ageing, recruitment, dq) = (ageing_index?, recruitment_index?, dq_index?);
        let derived = if recruitment < ageing && ageing < dq {
            self.age + 1
        } else if dq < ageing && ageing < recruitment {
            self.age.saturating_sub(1)
        } else {
            self.age
        };
        debug!(
            process = label,
            ssb_offset = derived,
            recruitment,
            ageing,
            derived_quantity = dq,
            "derived ssb offset"
        );
        Some(derived)
    }

    /// Whether the process is initialised from B0.
    pub fn b0_initialised(&self) -> bool {
        self.b0_initialised
    }

    pub fn have_scaled(&self) -> bool {
        self.have_scaled
    }

    pub fn ssb(&self) -> Option<Id<DerivedQuantity>> {
        self.ssb
    }

    pub fn ssb_offset(&self) -> u32 {
        self.ssb_offset
    }

    pub fn r0(&self) -> f64 {
        self.r0
    }

    pub fn b0(&self) -> f64 {
        self.b0
    }

    pub fn standardised_multipliers(&self) -> &[f64] {
        &self.standardised_multipliers
    }

    /// Spawning biomass used each model year.
    pub fn ssb_values(&self) -> &BTreeMap<u32, f64> {
        &self.ssb_values
    }

    pub fn true_ycs(&self) -> &BTreeMap<u32, f64> {
        &self.true_ycs
    }

    pub fn recruits(&self) -> &BTreeMap<u32, f64> {
        &self.recruits
    }

    pub(crate) fn reset(&mut self) {
        if self.b0_initialised {
            self.have_scaled = false;
        }

        self.standardised_multipliers.clone_from(&self.recruitment_multipliers);
        if !self.standardise_indices.is_empty() {
            let mean = self
                .standardise_indices
                .iter()
                .map(|&i| self.recruitment_multipliers[i])
                .sum::<f64>()
                / self.standardise_indices.len() as f64;
            for &i in &self.standardise_indices {
                self.standardised_multipliers[i] = self.recruitment_multipliers[i] / mean;
            }
        }

        self.ssb_values.clear();
        self.true_ycs.clear();
        self.recruits.clear();
    }

    fn ssb_id(&self) -> Result<Id<DerivedQuantity>> {
        self.ssb
            .ok_or_else(|| ModelError::internal("recruitment has no spawning biomass"))
    }

    pub(crate) fn execute(&mut self, ctx: &mut ProcessContext<'_>) -> Result<()> {
        let derived_quantities = ctx.derived_quantities;
        let ssb = derived_quantities.get(self.ssb_id()?);
        let amount = if ctx.state.is_initialising() {
            self.initialisation_recruits(ssb, ctx.state.phase)?
        } else {
            self.annual_recruits(ssb, ctx.state)?
        };
        add_recruits(ctx.partition, &self.categories, &self.proportions, self.age, amount)
    }

    fn initialisation_recruits(&mut self, ssb: &DerivedQuantity, phase: usize) -> Result<f64> {
        if phase <= self.b0_phase {
            if self.b0_initialised && !self.have_scaled {
                return Ok(1.0);
            }
            return Ok(self.r0);
        }

        if !self.b0_initialised {
            self.b0 = ssb.last_value_from_initialisation(self.b0_phase)?;
        }
        // Phases that do not run the annual cycle record nothing
        let current = (0..=phase)
            .rev()
            .find_map(|p| ssb.initialisation_values().get(p).and_then(|v| v.last().copied()))
            .ok_or_else(|| {
                ModelError::internal("no spawning biomass has been recorded during initialisation")
            })?;
        Ok(self.r0 * beverton_holt(current / self.b0, self.steepness))
    }

    fn annual_recruits(&mut self, ssb: &DerivedQuantity, state: &RunState) -> Result<f64> {
        let year = state.current_year;
        let ycs = state
            .year_index(year)
            .and_then(|index| self.standardised_multipliers.get(index).copied())
            .ok_or_else(|| ModelError::internal(format!("no year class strength for {year}")))?;

        if !self.b0_initialised {
            self.b0 = ssb.last_value_from_initialisation(self.b0_phase)?;
        }

        let spawning_biomass = match year.checked_sub(self.ssb_offset) {
            Some(ssb_year) if ssb_year >= state.start_year => {
                ssb.values().get(&ssb_year).copied().ok_or_else(|| {
                    ModelError::config(
                        format!("{}.ssb_offset", self.location),
                        format!("spawning biomass for {ssb_year} is not available when recruiting in {year}"),
                    )
                })?
            }
            _ => ssb.last_initialisation_value()?,
        };

        let true_ycs = ycs * beverton_holt(spawning_biomass / self.b0, self.steepness);
        let amount = self.r0 * true_ycs;
        debug!(year, ssb = spawning_biomass, true_ycs, amount, "Beverton-Holt recruitment");

        self.ssb_values.insert(year, spawning_biomass);
        self.true_ycs.insert(year, true_ycs);
        self.recruits.insert(year, amount);
        Ok(amount)
    }

    /// Scale the recruited categories so spawning biomass at the end of the
    /// B0 phase equals B0. Does nothing once scaled.
    pub(crate) fn scale_partition(
        &mut self,
        partition: &mut Partition,
        derived_quantities: &Arena<DerivedQuantity>,
    ) -> Result<()> {
        if !self.b0_initialised || self.have_scaled {
            return Ok(());
        }
        self.have_scaled = true;

        let ssb = derived_quantities
            .get(self.ssb_id()?)
            .last_value_from_initialisation(self.b0_phase)?;
        if ssb <= 0.0 {
            return Err(ModelError::internal(format!(
                "spawning biomass from initialisation was {ssb}, which cannot be scaled to B0"
            )));
        }
        let scalar = self.b0 / ssb;
        debug!(b0 = self.b0, ssb, scalar, "scaling partition to B0");
        self.r0 = scalar;
        for &id in &self.categories {
            for value in partition.category_mut(id).data_mut() {
                *value *= scalar;
            }
        }
        Ok(())
    }

    pub(crate) fn parameter_mut(&mut self, name: &str) -> Option<Target<'_>> {
        match name {
            "r0" => Some(Target::Scalar(&mut self.r0)),
            "b0" => Some(Target::Scalar(&mut self.b0)),
            "steepness" => Some(Target::Scalar(&mut self.steepness)),
            "proportions" => Some(Target::Vector(&mut self.proportions)),
            "recruitment_multipliers" => Some(Target::ByYear {
                first_year: self.start_year,
                values: &mut self.recruitment_multipliers,
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_beverton_holt_at_b0() {
        assert!((beverton_holt(1.0, 0.75) - 1.0).abs() < 1e-12);
        assert!((beverton_holt(1.0, 0.3) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_beverton_holt_steepness() {
        // by definition recruitment at 20% of B0 is `steepness` of R0
        for h in [0.5, 0.75, 0.9] {
            assert!((beverton_holt(0.2, h) - h).abs() < 1e-12);
        }
        // steepness of one gives constant recruitment
        assert!((beverton_holt(0.3, 1.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_add_recruits() {
        let mut partition = Partition::new(1, 5, false);
        let male = partition.add_category("male").unwrap();
        let female = partition.add_category("female").unwrap();

        add_recruits(&mut partition, &[male, female], &[0.6, 0.4], 1, 1000.0).unwrap();

        assert_eq!(partition.category(male).data()[0], 600.0);
        assert_eq!(partition.category(female).data()[0], 400.0);
        assert!(add_recruits(&mut partition, &[male], &[1.0], 6, 1.0).is_err());
    }

    #[test]
    fn test_proportion_checks() {
        let mut errors = ConfigErrors::new();
        check_proportions(&[0.5, 0.4], 2, "processes[r]", &mut errors);
        assert_eq!(errors.len(), 1);

        let mut errors = ConfigErrors::new();
        check_proportions(&[1.0], 2, "processes[r]", &mut errors);
        assert_eq!(errors.len(), 1);

        let mut errors = ConfigErrors::new();
        check_proportions(&[0.25, 0.75], 2, "processes[r]", &mut errors);
        assert!(errors.is_empty());
    }

    fn entry(label: &str, process_type: ProcessType) -> CycleEntry {
        CycleEntry {
            label: label.to_string(),
            process_type,
        }
    }

    #[test]
    fn test_ssb_precedes_recruitment() {
        let annual = vec![
            entry("ageing", ProcessType::Ageing),
            entry("recruitment", ProcessType::Recruitment),
            entry("mortality", ProcessType::Mortality),
        ];
        // recruitment runs before the block ends
        assert!(!ssb_precedes_recruitment("recruitment", &[annual.clone()], 0));

        let spawning = vec![entry("mortality", ProcessType::Mortality)];
        let cycle = vec![spawning, annual[..2].to_vec()];
        assert!(ssb_precedes_recruitment("recruitment", &cycle, 0));
        // no block in the step, so the quantity comes after everything
        assert!(!ssb_precedes_recruitment("recruitment", &cycle, 1));

        let after_block = vec![
            entry("mortality", ProcessType::Mortality),
            entry("recruitment", ProcessType::Recruitment),
        ];
        assert!(ssb_precedes_recruitment("recruitment", &[after_block], 0));
    }

    #[test]
    fn test_partition_is_scaled_once() {
        use crate::model::config::{
            AgeingConfig, DerivedConfig, DerivedQuantityConfig, DerivedQuantityKind,
            InitialisationPhaseKindConfig, MortalityConstantRateConfig, ProcessKindConfig, ProportionMethod,
        };
        use crate::processes::ProcessKind;
        use crate::selectivity::SelectivityKind;
        use crate::ModelBuilder;

        let stock = vec!["stock".to_string()];
        let mut model = ModelBuilder::new(2000, 2002, 1, 10)
            .plus_group(true)
            .categories(&["stock"])
            .selectivity("one", SelectivityKind::Constant { c: 1.0 })
            .derived_quantity(DerivedQuantityConfig {
                label: "ssb".to_string(),
                kind: DerivedQuantityKind::Abundance,
                categories: stock.clone(),
                selectivities: vec!["one".to_string()],
                time_step: "annual".to_string(),
                time_step_proportion: 0.5,
                time_step_proportion_method: ProportionMethod::WeightedSum,
            })
            .process("ageing", ProcessKindConfig::Ageing(AgeingConfig { categories: stock.clone() }))
            .process(
                "recruitment",
                ProcessKindConfig::RecruitmentBevertonHolt(RecruitmentBevertonHoltConfig {
                    categories: stock.clone(),
                    proportions: vec![1.0],
                    r0: None,
                    b0: Some(5000.0),
                    steepness: 0.75,
                    age: None,
                    ssb: "ssb".to_string(),
                    ssb_offset: None,
                    recruitment_multipliers: vec![1.0],
                    standardise_years: Vec::new(),
                    b0_phase: None,
                }),
            )
            .process(
                "mortality",
                ProcessKindConfig::MortalityConstantRate(MortalityConstantRateConfig {
                    categories: stock,
                    m: vec![0.2],
                    selectivities: vec!["one".to_string()],
                    time_step_ratio: Vec::new(),
                }),
            )
            .time_step("annual", &["ageing", "recruitment", "mortality"])
            .initialisation_phase(
                "equilibrium",
                InitialisationPhaseKindConfig::Derived(DerivedConfig {
                    insert_processes: Vec::new(),
                    exclude_processes: Vec::new(),
                    max_iterations: 100,
                }),
            )
            .build()
            .unwrap();
        model.run().unwrap();

        let Some(ProcessKind::RecruitmentBevertonHolt(recruitment)) =
            model.processes.by_label_mut("recruitment").map(|p| p.kind_mut())
        else {
            panic!("expected Beverton-Holt recruitment");
        };
        assert!(recruitment.have_scaled());

        // a scaled process leaves the partition alone
        let before = model.partition.clone();
        let r0 = recruitment.r0();
        recruitment
            .scale_partition(&mut model.partition, &model.derived_quantities)
            .unwrap();
        assert_eq!(model.partition, before);
        assert_eq!(recruitment.r0(), r0);

        // scaling again from scratch happens exactly once
        recruitment.have_scaled = false;
        let ssb = model
            .derived_quantities
            .by_label("ssb")
            .unwrap()
            .last_value_from_initialisation(0)
            .unwrap();
        let scalar = 5000.0 / ssb;
        recruitment
            .scale_partition(&mut model.partition, &model.derived_quantities)
            .unwrap();
        assert!(recruitment.have_scaled());
        assert_eq!(recruitment.r0(), scalar);
        let scaled = model.partition.clone();
        let id = scaled.find("stock").unwrap();
        for (value, start) in scaled.category(id).data().iter().zip(before.category(id).data()) {
            assert_eq!(*value, start * scalar);
        }

        recruitment
            .scale_partition(&mut model.partition, &model.derived_quantities)
            .unwrap();
        assert_eq!(model.partition, scaled);
        assert_eq!(recruitment.r0(), scalar);
    }
}
