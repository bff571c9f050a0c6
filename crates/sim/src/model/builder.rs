//! Model construction.
//!
//! [`ModelBuilder`] collects a [`ModelConfig`] either field by field or all
//! at once and turns it into a runnable [`Model`]. Building validates every
//! object, resolves labels into handles and wires executors into the time
//! steps. Every configuration error found along the way is collected, so a
//! failed build reports the whole list rather than the first problem.

use std::collections::HashMap;

use tracing::{debug, info};

use super::config::{
    CategoriesConfig, DerivedQuantityConfig, EstimateConfig,
    InitialisationPhaseConfig, InitialisationPhaseKindConfig, ModelConfig,
    ModelSettings, ObservationConfig, ProcessConfig, ProcessKindConfig, ReportConfig,
    TimeStepConfig,
};
use super::{Model, RunState};
use crate::base::{Arena, Id};
use crate::derived_quantity::DerivedQuantity;
use crate::errors::{ConfigErrors, ModelError, Result};
use crate::estimate::Estimate;
use crate::growth::{AgeLength, AgeLengthConfig, LengthWeight, LengthWeightConfig};
use crate::initialisation::InitialisationPhase;
use crate::observation::Observation;
use crate::partition::{Category, Partition};
use crate::penalty::{Penalties, Penalty, PenaltyConfig};
use crate::processes::{CycleEntry, Process, ProcessKind, ProcessType};
use crate::report::Report;
use crate::selectivity::{Selectivity, SelectivityConfig, SelectivityKind};
use crate::time_step::{phase_process_lists, ExecutorRef, TimeStep};

/// Read-only view of what has been built so far, used to resolve labels.
pub(crate) struct BuildContext<'a> {
    pub settings: &'a ModelSettings,
    pub partition: &'a Partition,
    pub selectivities: &'a Arena<Selectivity>,
    pub derived_quantities: &'a Arena<DerivedQuantity>,
    pub penalties: &'a Penalties,
}

impl BuildContext<'_> {
    /// Expand category labels, requiring at least one.
    pub fn categories(&self, labels: &[String], location: &str, errors: &mut ConfigErrors) -> Vec<Id<Category>> {
        if labels.is_empty() {
            errors.push(location, "at least one category must be given");
            return Vec::new();
        }
        self.partition.resolve_labels(labels, location, errors)
    }

    pub fn selectivity(&self, label: &str, location: &str, errors: &mut ConfigErrors) -> Option<Id<Selectivity>> {
        let found = self.selectivities.find(label);
        if found.is_none() {
            errors.push(location, format!("selectivity '{label}' has not been defined"));
        }
        found
    }

    /// Resolve `expected` selectivities. A single label is used for all.
    pub fn selectivities(
        &self,
        labels: &[String],
        expected: usize,
        location: &str,
        errors: &mut ConfigErrors,
    ) -> Vec<Id<Selectivity>> {
        if labels.len() != 1 && labels.len() != expected {
            errors.push(
                location,
                format!("expected {expected} selectivities (or a single one for all) but got {}", labels.len()),
            );
            return Vec::new();
        }
        let resolved: Option<Vec<_>> = labels
            .iter()
            .map(|label| self.selectivity(label, location, errors))
            .collect::<Vec<_>>()
            .into_iter()
            .collect();
        match resolved {
            Some(ids) if ids.len() == 1 => vec![ids[0]; expected],
            Some(ids) => ids,
            None => Vec::new(),
        }
    }

    pub fn penalty(&self, label: &str, location: &str, errors: &mut ConfigErrors) -> Option<Id<Penalty>> {
        let found = self.penalties.find(label);
        if found.is_none() {
            errors.push(location, format!("penalty '{label}' has not been defined"));
        }
        found
    }

    pub fn derived_quantity(
        &self,
        label: &str,
        location: &str,
        errors: &mut ConfigErrors,
    ) -> Option<Id<DerivedQuantity>> {
        let found = self.derived_quantities.find(label);
        if found.is_none() {
            errors.push(location, format!("derived quantity '{label}' has not been defined"));
        }
        found
    }

    /// Index of the time step labelled `label`.
    pub fn time_step(&self, label: &str, location: &str, errors: &mut ConfigErrors) -> Option<usize> {
        let found = self.settings.time_step_index(label);
        if found.is_none() {
            errors.push(location, format!("time step '{label}' has not been defined"));
        }
        found
    }
}

/// Stretch a single value to `expected` copies, or check the length.
pub(crate) fn broadcast(values: &[f64], expected: usize, location: &str, errors: &mut ConfigErrors) -> Vec<f64> {
    match values {
        [single] => vec![*single; expected],
        values if values.len() == expected => values.to_vec(),
        values => {
            errors.push(
                location,
                format!("expected {expected} values (or a single one for all) but got {}", values.len()),
            );
            vec![0.0; expected]
        }
    }
}

/// Fluent construction of a [`Model`].
///
/// # Examples
///
/// ```
/// use shoal_sim::model::config::{AgeingConfig, ProcessKindConfig};
/// use shoal_sim::model::ModelBuilder;
///
/// let model = ModelBuilder::new(2000, 2010, 1, 10)
///     .plus_group(true)
///     .categories(&["stock"])
///     .process("ageing", ProcessKindConfig::Ageing(AgeingConfig { categories: vec!["stock".into()] }))
///     .time_step("annual", &["ageing"])
///     .build()
///     .unwrap();
/// assert_eq!(model.partition().len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct ModelBuilder {
    config: ModelConfig,
}

impl ModelBuilder {
    pub fn new(start_year: u32, final_year: u32, min_age: u32, max_age: u32) -> Self {
        Self {
            config: ModelConfig {
                model: ModelSettings {
                    start_year,
                    final_year,
                    min_age,
                    max_age,
                    plus_group: false,
                    time_steps: Vec::new(),
                },
                categories: CategoriesConfig {
                    format: String::new(),
                    names: Vec::new(),
                    years: Vec::new(),
                    age_lengths: Vec::new(),
                },
                selectivities: Vec::new(),
                age_lengths: Vec::new(),
                length_weights: Vec::new(),
                processes: Vec::new(),
                derived_quantities: Vec::new(),
                initialisation_phases: Vec::new(),
                observations: Vec::new(),
                penalties: Vec::new(),
                estimates: Vec::new(),
                reports: Vec::new(),
            },
        }
    }

    pub fn from_config(config: ModelConfig) -> Self {
        Self { config }
    }

    pub fn plus_group(mut self, plus_group: bool) -> Self {
        self.config.model.plus_group = plus_group;
        self
    }

    /// Append a time step to the annual cycle.
    pub fn time_step(mut self, label: &str, processes: &[&str]) -> Self {
        self.config.model.time_steps.push(TimeStepConfig {
            label: label.to_string(),
            processes: processes.iter().map(|p| p.to_string()).collect(),
        });
        self
    }

    pub fn categories(mut self, names: &[&str]) -> Self {
        self.config.categories.names = names.iter().map(|n| n.to_string()).collect();
        self
    }

    pub fn category_format(mut self, format: &str) -> Self {
        self.config.categories.format = format.to_string();
        self
    }

    pub fn selectivity(mut self, label: &str, kind: SelectivityKind) -> Self {
        self.config.selectivities.push(SelectivityConfig {
            label: label.to_string(),
            kind,
        });
        self
    }

    pub fn age_length(mut self, config: AgeLengthConfig) -> Self {
        self.config.age_lengths.push(config);
        self
    }

    pub fn length_weight(mut self, config: LengthWeightConfig) -> Self {
        self.config.length_weights.push(config);
        self
    }

    pub fn process(mut self, label: &str, kind: ProcessKindConfig) -> Self {
        self.config.processes.push(ProcessConfig::new(label, kind));
        self
    }

    pub fn derived_quantity(mut self, config: DerivedQuantityConfig) -> Self {
        self.config.derived_quantities.push(config);
        self
    }

    /// Append an initialisation phase. Phases run in the order added.
    pub fn initialisation_phase(mut self, label: &str, kind: InitialisationPhaseKindConfig) -> Self {
        self.config.initialisation_phases.push(InitialisationPhaseConfig {
            label: label.to_string(),
            kind,
        });
        self
    }

    pub fn observation(mut self, config: ObservationConfig) -> Self {
        self.config.observations.push(config);
        self
    }

    pub fn penalty(mut self, config: PenaltyConfig) -> Self {
        self.config.penalties.push(config);
        self
    }

    pub fn estimate(mut self, parameter: &str, lower_bound: f64, upper_bound: f64) -> Self {
        self.config.estimates.push(EstimateConfig {
            parameter: parameter.to_string(),
            lower_bound,
            upper_bound,
        });
        self
    }

    pub fn report(mut self, config: ReportConfig) -> Self {
        self.config.reports.push(config);
        self
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Validate and build the model, then reset it ready to run.
    pub fn build(self) -> Result<Model> {
        let mut errors = ConfigErrors::new();
        let settings = &self.config.model;
        check_settings(settings, &mut errors);
        // Nothing age-structured can be laid out over an inverted age range
        if settings.min_age > settings.max_age {
            return Err(ModelError::Configuration(errors));
        }
        let mut model = build_model(self.config, &mut errors);
        errors.into_result()?;
        model.reset();
        info!(
            categories = model.partition.len(),
            processes = model.processes.len(),
            time_steps = model.time_steps.len(),
            phases = model.phases.len(),
            "model built"
        );
        Ok(model)
    }
}

fn check_settings(settings: &ModelSettings, errors: &mut ConfigErrors) {
    if settings.start_year > settings.final_year {
        errors.push(
            "model.final_year",
            format!(
                "({}) cannot be before the start year ({})",
                settings.final_year, settings.start_year
            ),
        );
    }
    if settings.min_age > settings.max_age {
        errors.push(
            "model.max_age",
            format!("({}) cannot be less than the min age ({})", settings.max_age, settings.min_age),
        );
    }
    if settings.time_steps.is_empty() {
        errors.push("model.time_steps", "at least one time step must be defined");
    }
    for (index, step) in settings.time_steps.iter().enumerate() {
        if settings.time_step_index(&step.label) != Some(index) {
            errors.push(
                "model.time_steps",
                format!("time step '{}' is defined more than once", step.label),
            );
        }
    }
}

fn build_partition(settings: &ModelSettings, config: &CategoriesConfig, errors: &mut ConfigErrors) -> Partition {
    let mut partition = Partition::new(settings.min_age, settings.max_age, settings.plus_group);
    if config.names.is_empty() {
        errors.push("categories.names", "at least one category must be declared");
    }

    let segments = config.format.split('.').filter(|s| !s.is_empty()).count();
    let years: HashMap<&str, &[u32]> = config
        .years
        .iter()
        .map(|entry| (entry.category.as_str(), entry.years.as_slice()))
        .collect();

    for name in &config.names {
        if segments > 0 && name.split('.').count() != segments {
            errors.push(
                "categories.names",
                format!("'{name}' does not match the format '{}'", config.format),
            );
        }
        if name.contains(['+', '*']) || name.trim().is_empty() {
            errors.push("categories.names", format!("'{name}' is not a valid category name"));
            continue;
        }
        let added = match years.get(name.as_str()) {
            Some(years) => partition.add_category_in_years(name, years.iter().copied()),
            None => partition.add_category(name),
        };
        if added.is_none() {
            errors.push("categories.names", format!("category '{name}' is declared more than once"));
        }
    }

    for entry in &config.years {
        if partition.find(&entry.category).is_none() {
            errors.push(
                "categories.years",
                format!("category '{}' has not been declared", entry.category),
            );
        }
        for year in &entry.years {
            if !settings.years().contains(year) {
                errors.push(
                    "categories.years",
                    format!("year {year} of category '{}' is outside the model years", entry.category),
                );
            }
        }
    }
    partition
}

fn bind_age_lengths(
    partition: &mut Partition,
    config: &CategoriesConfig,
    age_lengths: &Arena<AgeLength>,
    errors: &mut ConfigErrors,
) {
    let labels: Vec<&String> = match config.age_lengths.len() {
        0 => return,
        1 => vec![&config.age_lengths[0]; partition.len()],
        n if n == partition.len() => config.age_lengths.iter().collect(),
        n => {
            errors.push(
                "categories.age_lengths",
                format!("expected one label per category ({}) but got {n}", partition.len()),
            );
            return;
        }
    };
    let ids: Vec<Id<Category>> = partition.ids().collect();
    for (id, label) in ids.into_iter().zip(labels) {
        match age_lengths.find(label) {
            Some(age_length) => partition.set_age_length(id, Some(age_length)),
            None => errors.push(
                "categories.age_lengths",
                format!("age-length relationship '{label}' has not been defined"),
            ),
        }
    }
}

fn insert_unique<T>(arena: &mut Arena<T>, label: &str, item: T, location: &str, errors: &mut ConfigErrors) {
    if arena.insert(label, item).is_none() {
        errors.push(location, format!("label '{label}' is defined more than once"));
    }
}

/// Whether recruitment comes before ageing in the annual cycle, which
/// shortens the derived initialisation by a year.
fn recruitment_before_ageing(time_steps: &[TimeStep], processes: &Arena<Process>) -> bool {
    let types: Vec<ProcessType> = time_steps
        .iter()
        .flat_map(|step| step.processes())
        .map(|&id| processes.get(id).process_type())
        .collect();
    let ageing = types.iter().rposition(|t| *t == ProcessType::Ageing);
    let recruitment = types.iter().rposition(|t| *t == ProcessType::Recruitment);
    matches!((recruitment, ageing), (Some(r), Some(a)) if r < a)
}

fn build_model(config: ModelConfig, errors: &mut ConfigErrors) -> Model {
    let settings = config.model.clone();
    let time_step_count = settings.time_steps.len();

    let mut partition = build_partition(&settings, &config.categories, errors);

    let mut length_weights = Arena::new();
    for lw in &config.length_weights {
        let location = format!("length_weights[{}]", lw.label);
        insert_unique(&mut length_weights, &lw.label, LengthWeight::build(lw, errors), &location, errors);
    }
    let mut age_lengths = Arena::new();
    for al in &config.age_lengths {
        let location = format!("age_lengths[{}]", al.label);
        let age_length = AgeLength::build(al, time_step_count, &length_weights, errors);
        insert_unique(&mut age_lengths, &al.label, age_length, &location, errors);
    }
    bind_age_lengths(&mut partition, &config.categories, &age_lengths, errors);

    let mut selectivities = Arena::new();
    for s in &config.selectivities {
        let location = format!("selectivities[{}]", s.label);
        let selectivity = Selectivity::build(s, settings.min_age, settings.max_age, errors);
        insert_unique(&mut selectivities, &s.label, selectivity, &location, errors);
    }
    let penalties = Penalties::build(&config.penalties, errors);

    // Derived quantities only need categories and selectivities.
    let mut derived_quantities = Arena::new();
    {
        let empty = Arena::new();
        let ctx = BuildContext {
            settings: &settings,
            partition: &partition,
            selectivities: &selectivities,
            derived_quantities: &empty,
            penalties: &penalties,
        };
        for dq in &config.derived_quantities {
            let location = format!("derived_quantities[{}]", dq.label);
            let built = DerivedQuantity::build(dq, &ctx, errors);
            insert_unique(&mut derived_quantities, &dq.label, built, &location, errors);
        }
    }

    let mut processes = Arena::new();
    {
        let ctx = BuildContext {
            settings: &settings,
            partition: &partition,
            selectivities: &selectivities,
            derived_quantities: &derived_quantities,
            penalties: &penalties,
        };
        for p in &config.processes {
            let location = format!("processes[{}]", p.label);
            insert_unique(&mut processes, &p.label, Process::build(p, &ctx, errors), &location, errors);
        }
    }

    let mut time_steps: Vec<TimeStep> = settings
        .time_steps
        .iter()
        .map(|step| {
            let ids = step
                .processes
                .iter()
                .filter_map(|label| {
                    let found = processes.find(label);
                    if found.is_none() {
                        errors.push(
                            format!("time_steps[{}].processes", step.label),
                            format!("process '{label}' has not been defined"),
                        );
                    }
                    found
                })
                .collect();
            let mut time_step = TimeStep::new(&step.label, ids);
            time_step.build_mortality_block(&processes, errors);
            time_step
        })
        .collect();

    let phase_labels: Vec<String> = config
        .initialisation_phases
        .iter()
        .map(|phase| phase.label.clone())
        .collect();
    let none: &[String] = &[];
    for (index, phase) in config.initialisation_phases.iter().enumerate() {
        let location = format!("initialisation_phases[{}]", phase.label);
        if phase_labels[..index].contains(&phase.label) {
            errors.push(&location, "initialisation phase label is defined more than once");
        }
        let (inserts, excludes) = phase.kind.process_changes().unwrap_or((none, none));
        let lists = phase_process_lists(&time_steps, &processes, inserts, excludes, &location, errors);
        for (time_step, list) in time_steps.iter_mut().zip(lists) {
            time_step.push_phase(list, &processes, &location, errors);
        }
    }

    let cycle: Vec<Vec<CycleEntry>> = time_steps
        .iter()
        .map(|step| {
            step.processes()
                .iter()
                .map(|&id| CycleEntry {
                    label: processes.label(id).to_string(),
                    process_type: processes.get(id).process_type(),
                })
                .collect()
        })
        .collect();
    let process_ids: Vec<Id<Process>> = processes.ids().collect();
    for id in process_ids {
        let label = processes.label(id).to_string();
        let location = format!("processes[{label}]");
        let steps: Vec<usize> = time_steps
            .iter()
            .enumerate()
            .filter(|(_, step)| step.processes().contains(&id))
            .map(|(index, _)| index)
            .collect();
        match processes.get_mut(id).kind_mut() {
            ProcessKind::RecruitmentBevertonHolt(bh) => {
                bh.bind_cycle(&label, &cycle, &derived_quantities, &phase_labels, &location, errors);
                if let (true, Some(ssb)) = (bh.b0_initialised(), bh.ssb()) {
                    derived_quantities.get_mut(ssb).set_b0_initialised();
                }
            }
            ProcessKind::MortalityConstantRate(mortality) => {
                mortality.bind_time_steps(&steps, &location, errors);
            }
            _ => {}
        }
    }

    let recruitment_first = recruitment_before_ageing(&time_steps, &processes);
    let mut observations = Arena::new();
    let mut reports = Arena::new();
    let mut phases = Vec::with_capacity(config.initialisation_phases.len());
    {
        let ctx = BuildContext {
            settings: &settings,
            partition: &partition,
            selectivities: &selectivities,
            derived_quantities: &derived_quantities,
            penalties: &penalties,
        };
        for phase in &config.initialisation_phases {
            phases.push(InitialisationPhase::build(phase, &ctx, recruitment_first, errors));
        }
        for o in &config.observations {
            let location = format!("observations[{}]", o.label);
            insert_unique(&mut observations, &o.label, Observation::build(o, &ctx, errors), &location, errors);
        }
        for r in &config.reports {
            let location = format!("reports[{}]", r.label);
            insert_unique(&mut reports, &r.label, Report::build(r, &ctx, errors), &location, errors);
        }
    }

    subscribe_executors(
        &mut time_steps,
        &settings,
        &processes,
        &derived_quantities,
        &observations,
        &config.observations,
        &reports,
        errors,
    );

    let estimates: Vec<Estimate> = config
        .estimates
        .iter()
        .enumerate()
        .filter_map(|(index, estimate)| Estimate::build(estimate, &format!("estimates[{index}]"), errors))
        .collect();

    let state = RunState::new(settings.start_year, settings.final_year);
    let mut model = Model {
        settings,
        partition,
        selectivities,
        age_lengths,
        length_weights,
        processes,
        derived_quantities,
        time_steps,
        phases,
        observations,
        reports,
        penalties,
        estimates: Vec::new(),
        state,
    };
    for (index, estimate) in estimates.iter().enumerate() {
        let location = format!("estimates[{index}].parameter");
        match model.parameter(estimate.parameter()) {
            Ok(value) if !estimate.contains(value) => errors.push(
                location,
                format!(
                    "the current value {value} is outside the bounds [{}, {}]",
                    estimate.lower_bound(),
                    estimate.upper_bound()
                ),
            ),
            Ok(_) => {}
            Err(error) => errors.push(location, error.to_string()),
        }
    }
    model.estimates = estimates;
    debug!(errors = errors.len(), "model assembled");
    model
}

#[allow(clippy::too_many_arguments)]
fn subscribe_executors(
    time_steps: &mut [TimeStep],
    settings: &ModelSettings,
    processes: &Arena<Process>,
    derived_quantities: &Arena<DerivedQuantity>,
    observations: &Arena<Observation>,
    observation_configs: &[ObservationConfig],
    reports: &Arena<Report>,
    errors: &mut ConfigErrors,
) {
    if time_steps.is_empty() {
        return;
    }
    for (id, dq) in derived_quantities.iter() {
        let Some(step) = time_steps.get_mut(dq.time_step()) else {
            continue;
        };
        step.subscribe_to_block(settings.years(), ExecutorRef::DerivedQuantity(id));
        step.subscribe_to_initialisation_block(ExecutorRef::DerivedQuantity(id));
    }

    for config in observation_configs {
        let Some(id) = observations.find(&config.label) else {
            continue;
        };
        let observation = observations.get(id);
        let Some(step) = time_steps.get_mut(observation.time_step()) else {
            continue;
        };
        let executor = ExecutorRef::Observation(id);
        match &config.process {
            None => step.subscribe_to_block(observation.years(), executor),
            Some(label) => {
                let process = processes
                    .find(label)
                    .filter(|process| step.processes().contains(process));
                match process {
                    Some(process) => {
                        for year in observation.years() {
                            step.subscribe_to_process(year, process, executor);
                        }
                    }
                    None => errors.push(
                        format!("observations[{}].process", config.label),
                        format!("process '{label}' is not in time step '{}'", step.label()),
                    ),
                }
            }
        }
    }

    for (id, report) in reports.iter() {
        let Some(step) = time_steps.get_mut(report.time_step()) else {
            continue;
        };
        for &year in report.years() {
            step.subscribe_to_year(year, ExecutorRef::Report(id));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::config::{AgeingConfig, RecruitmentConstantConfig};

    fn create_test_builder() -> ModelBuilder {
        ModelBuilder::new(2000, 2004, 1, 5)
            .plus_group(true)
            .categories(&["immature", "mature"])
            .process(
                "ageing",
                ProcessKindConfig::Ageing(AgeingConfig {
                    categories: vec!["*".into()],
                }),
            )
            .process(
                "recruitment",
                ProcessKindConfig::RecruitmentConstant(RecruitmentConstantConfig {
                    categories: vec!["immature".into()],
                    proportions: vec![1.0],
                    r0: 1000.0,
                    age: None,
                }),
            )
            .time_step("annual", &["ageing", "recruitment"])
    }

    #[test]
    fn test_broadcast() {
        let mut errors = ConfigErrors::new();
        assert_eq!(broadcast(&[0.2], 3, "m", &mut errors), vec![0.2; 3]);
        assert_eq!(broadcast(&[0.1, 0.2], 2, "m", &mut errors), vec![0.1, 0.2]);
        assert!(errors.is_empty());
        broadcast(&[0.1, 0.2], 3, "m", &mut errors);
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_build_simple_model() {
        let model = create_test_builder().build().unwrap();
        assert_eq!(model.partition().len(), 2);
        assert_eq!(model.time_steps().len(), 1);
        assert_eq!(model.time_steps()[0].mortality_block(), (2, 2));
    }

    #[test]
    fn test_errors_are_accumulated() {
        let error = create_test_builder()
            .time_step("annual", &["missing"])
            .process(
                "ageing",
                ProcessKindConfig::Ageing(AgeingConfig {
                    categories: vec!["juvenile".into()],
                }),
            )
            .build()
            .unwrap_err();
        let errors = error.config_errors().unwrap();
        assert!(errors.len() >= 3, "{errors}");
        assert!(errors.contains_location("model.time_steps"));
        assert!(errors.contains_location("time_steps[annual].processes"));
        assert!(errors.contains_location("processes[ageing]"));
    }

    #[test]
    fn test_invalid_selectivities_are_reported() {
        let error = create_test_builder()
            .selectivity(
                "inc",
                SelectivityKind::Increasing {
                    l: 1,
                    h: 5,
                    v: vec![0.5],
                    alpha: 1.0,
                },
            )
            .build()
            .unwrap_err();
        assert!(matches!(error, ModelError::Configuration(_)));
        assert!(error.config_errors().unwrap().contains_location("selectivities[inc].v"));
    }

    #[test]
    fn test_inverted_ages_stop_the_build() {
        let error = ModelBuilder::new(2000, 2001, 10, 5)
            .categories(&["stock"])
            .selectivity("all", SelectivityKind::AllValues { v: vec![1.0] })
            .time_step("annual", &[])
            .build()
            .unwrap_err();
        let errors = error.config_errors().unwrap();
        assert_eq!(errors.len(), 1);
        assert!(errors.contains_location("model.max_age"));
    }

    #[test]
    fn test_category_format_is_checked() {
        let error = create_test_builder()
            .category_format("sex.stage")
            .build()
            .unwrap_err();
        assert!(error.config_errors().unwrap().contains_location("categories.names"));
    }

    #[test]
    fn test_recruitment_before_ageing() {
        let mut processes = Arena::new();
        let ageing = processes
            .insert("ageing", Process::new("ageing", ProcessKind::Ageing(crate::processes::Ageing::new(vec![]))))
            .unwrap();
        let null = processes.insert("null", Process::new("null", ProcessKind::Null)).unwrap();
        let steps = vec![TimeStep::new("a", vec![null, ageing])];
        assert!(!recruitment_before_ageing(&steps, &processes));
    }
}
