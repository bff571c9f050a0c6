//! Serializable model configuration.
//!
//! A [`ModelConfig`] fully describes one model. It can be loaded from JSON
//! and is the single input to [`crate::model::ModelBuilder`].

use serde::{Deserialize, Serialize};

use crate::base::math::{weighted_product, weighted_sum};
use crate::growth::{AgeLengthConfig, LengthWeightConfig};
use crate::penalty::PenaltyConfig;
use crate::selectivity::SelectivityConfig;

/// The master configuration struct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub model: ModelSettings,
    pub categories: CategoriesConfig,
    #[serde(default)]
    pub selectivities: Vec<SelectivityConfig>,
    #[serde(default)]
    pub age_lengths: Vec<AgeLengthConfig>,
    #[serde(default)]
    pub length_weights: Vec<LengthWeightConfig>,
    #[serde(default)]
    pub processes: Vec<ProcessConfig>,
    #[serde(default)]
    pub derived_quantities: Vec<DerivedQuantityConfig>,
    /// Executed in the order given.
    #[serde(default)]
    pub initialisation_phases: Vec<InitialisationPhaseConfig>,
    #[serde(default)]
    pub observations: Vec<ObservationConfig>,
    #[serde(default)]
    pub penalties: Vec<PenaltyConfig>,
    #[serde(default)]
    pub estimates: Vec<EstimateConfig>,
    #[serde(default)]
    pub reports: Vec<ReportConfig>,
}

impl ModelConfig {
    pub fn from_json_str(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// Years, ages and the annual cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSettings {
    pub start_year: u32,
    pub final_year: u32,
    pub min_age: u32,
    pub max_age: u32,
    #[serde(default)]
    pub plus_group: bool,
    /// The annual cycle, in execution order.
    pub time_steps: Vec<TimeStepConfig>,
}

impl ModelSettings {
    pub fn years(&self) -> std::ops::RangeInclusive<u32> {
        self.start_year..=self.final_year
    }

    pub fn year_count(&self) -> usize {
        (self.final_year.saturating_sub(self.start_year) + 1) as usize
    }

    pub fn age_spread(&self) -> usize {
        (self.max_age.saturating_sub(self.min_age) + 1) as usize
    }

    pub fn time_step_index(&self, label: &str) -> Option<usize> {
        self.time_steps.iter().position(|step| step.label == label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeStepConfig {
    pub label: String,
    pub processes: Vec<String>,
}

/// Category declarations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoriesConfig {
    /// Dot separated structure of the names, e.g. `sex.stage`.
    #[serde(default)]
    pub format: String,
    pub names: Vec<String>,
    /// Validity years for categories that only exist in some years.
    #[serde(default)]
    pub years: Vec<CategoryYears>,
    /// One age-length label per category, or a single label for all.
    #[serde(default)]
    pub age_lengths: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryYears {
    pub category: String,
    pub years: Vec<u32>,
}

/// A row of a by-category table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryValues {
    pub category: String,
    pub values: Vec<f64>,
}

/// A row of a by-year table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearValues {
    pub year: u32,
    pub values: Vec<f64>,
}

// Processes

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessConfig {
    pub label: String,
    #[serde(flatten)]
    pub kind: ProcessKindConfig,
}

impl ProcessConfig {
    pub fn new(label: impl Into<String>, kind: ProcessKindConfig) -> Self {
        Self {
            label: label.into(),
            kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProcessKindConfig {
    Ageing(AgeingConfig),
    MortalityConstantRate(MortalityConstantRateConfig),
    RecruitmentBevertonHolt(RecruitmentBevertonHoltConfig),
    RecruitmentConstant(RecruitmentConstantConfig),
    TransitionCategory(TransitionCategoryConfig),
    TagByAge(TagByAgeConfig),
    Null,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgeingConfig {
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MortalityConstantRateConfig {
    pub categories: Vec<String>,
    /// One rate per category, or a single rate for all.
    pub m: Vec<f64>,
    pub selectivities: Vec<String>,
    /// One ratio per time step the process runs in. Defaults to 1.0.
    #[serde(default)]
    pub time_step_ratio: Vec<f64>,
}

fn default_steepness() -> f64 {
    1.0
}

fn default_multipliers() -> Vec<f64> {
    vec![1.0]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecruitmentBevertonHoltConfig {
    pub categories: Vec<String>,
    pub proportions: Vec<f64>,
    #[serde(default)]
    pub r0: Option<f64>,
    #[serde(default)]
    pub b0: Option<f64>,
    #[serde(default = "default_steepness")]
    pub steepness: f64,
    /// Age recruits enter at. Defaults to the model min age.
    #[serde(default)]
    pub age: Option<u32>,
    /// Label of the spawning biomass derived quantity.
    pub ssb: String,
    /// Years between spawning and recruitment. Derived when absent.
    #[serde(default)]
    pub ssb_offset: Option<u32>,
    /// One multiplier per model year, or a single value for all.
    #[serde(default = "default_multipliers")]
    pub recruitment_multipliers: Vec<f64>,
    #[serde(default)]
    pub standardise_years: Vec<u32>,
    /// Phase whose final spawning biomass defines B0. Defaults to the first.
    #[serde(default)]
    pub b0_phase: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecruitmentConstantConfig {
    pub categories: Vec<String>,
    pub proportions: Vec<f64>,
    pub r0: f64,
    #[serde(default)]
    pub age: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionCategoryConfig {
    pub from: Vec<String>,
    pub to: Vec<String>,
    pub proportions: Vec<f64>,
    pub selectivities: Vec<String>,
}

fn default_u_max() -> f64 {
    0.99
}

fn default_tolerance() -> f64 {
    1e-5
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagByAgeConfig {
    /// A category, or several joined with `+`.
    pub from: String,
    pub to: Vec<String>,
    pub years: Vec<u32>,
    pub min_age: u32,
    pub max_age: u32,
    pub selectivities: Vec<String>,
    /// Numbers to tag by year and age.
    #[serde(default)]
    pub numbers: Vec<YearValues>,
    /// Proportions at age by year, scaled by `n`.
    #[serde(default)]
    pub proportions: Vec<YearValues>,
    #[serde(default)]
    pub n: Vec<f64>,
    #[serde(default = "default_u_max")]
    pub u_max: f64,
    #[serde(default)]
    pub penalty: Option<String>,
    #[serde(default)]
    pub initial_mortality: f64,
    #[serde(default)]
    pub initial_mortality_selectivity: Option<String>,
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
}

// Derived quantities

fn default_proportion() -> f64 {
    0.5
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DerivedQuantityKind {
    Biomass,
    Abundance,
}

/// How a value part way through a mortality block is interpolated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProportionMethod {
    #[default]
    WeightedSum,
    WeightedProduct,
}

impl ProportionMethod {
    /// Value `proportion` of the way from `start` to `end`.
    #[inline]
    pub fn interpolate(self, start: f64, end: f64, proportion: f64) -> f64 {
        match self {
            Self::WeightedSum => weighted_sum(start, end, proportion),
            Self::WeightedProduct => weighted_product(start, end, proportion),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedQuantityConfig {
    pub label: String,
    #[serde(rename = "type")]
    pub kind: DerivedQuantityKind,
    pub categories: Vec<String>,
    pub selectivities: Vec<String>,
    pub time_step: String,
    #[serde(default = "default_proportion")]
    pub time_step_proportion: f64,
    #[serde(default)]
    pub time_step_proportion_method: ProportionMethod,
}

// Initialisation phases

fn default_lambda() -> f64 {
    1e-10
}

fn default_max_iterations() -> usize {
    1000
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitialisationPhaseConfig {
    pub label: String,
    #[serde(flatten)]
    pub kind: InitialisationPhaseKindConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InitialisationPhaseKindConfig {
    Iterative(IterativeConfig),
    Derived(DerivedConfig),
    Cinitial(CinitialConfig),
    StateCategoryByAge(StateCategoryByAgeConfig),
}

impl InitialisationPhaseKindConfig {
    /// `(insert_processes, exclude_processes)` for phases that run the
    /// annual cycle.
    pub fn process_changes(&self) -> Option<(&[String], &[String])> {
        match self {
            Self::Iterative(c) => Some((&c.insert_processes, &c.exclude_processes)),
            Self::Derived(c) => Some((&c.insert_processes, &c.exclude_processes)),
            Self::Cinitial(c) => Some((&c.insert_processes, &c.exclude_processes)),
            Self::StateCategoryByAge(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterativeConfig {
    pub years: u32,
    #[serde(default)]
    pub convergence_years: Vec<u32>,
    #[serde(default = "default_lambda")]
    pub lambda: f64,
    /// Entries of the form `time_step(process)=new_process`, or
    /// `time_step()=new_process` to put it first.
    #[serde(default)]
    pub insert_processes: Vec<String>,
    #[serde(default)]
    pub exclude_processes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedConfig {
    #[serde(default)]
    pub insert_processes: Vec<String>,
    #[serde(default)]
    pub exclude_processes: Vec<String>,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CinitialConfig {
    pub categories: Vec<String>,
    pub n: Vec<CategoryValues>,
    /// Derived quantities padded with their last value `ssb_offset` times.
    #[serde(default)]
    pub derived_quantities: Vec<String>,
    #[serde(default)]
    pub ssb_offset: u32,
    #[serde(default)]
    pub insert_processes: Vec<String>,
    #[serde(default)]
    pub exclude_processes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateCategoryByAgeConfig {
    pub categories: Vec<String>,
    pub min_age: u32,
    pub max_age: u32,
    pub n: Vec<CategoryValues>,
}

// Observations

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservationKind {
    Abundance,
    Biomass,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LikelihoodKind {
    Normal,
    #[default]
    Lognormal,
}

fn default_catchability() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationConfig {
    pub label: String,
    #[serde(rename = "type")]
    pub kind: ObservationKind,
    /// One label per column; combined labels sum their members.
    pub categories: Vec<String>,
    pub selectivities: Vec<String>,
    pub time_step: String,
    /// Attach to a process instead of the mortality block.
    #[serde(default)]
    pub process: Option<String>,
    #[serde(default = "default_proportion")]
    pub time_step_proportion: f64,
    #[serde(default)]
    pub time_step_proportion_method: ProportionMethod,
    #[serde(default = "default_catchability")]
    pub catchability: f64,
    /// One row per year with one value per category label.
    pub observed: Vec<YearValues>,
    /// Coefficients of variation, shaped like `observed` (a single value per
    /// row is broadcast).
    pub error_values: Vec<YearValues>,
    #[serde(default)]
    pub likelihood: LikelihoodKind,
}

// Estimation and reporting

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimateConfig {
    /// Addressable path, e.g. `process[recruitment].r0`.
    pub parameter: String,
    pub lower_bound: f64,
    pub upper_bound: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportConfig {
    pub label: String,
    pub time_step: String,
    /// Categories to capture. Empty means all.
    #[serde(default)]
    pub categories: Vec<String>,
    /// Years to capture. Empty means every model year.
    #[serde(default)]
    pub years: Vec<u32>,
}
