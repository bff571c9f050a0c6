//! The model and its run lifecycle.
//!
//! A [`Model`] owns the partition and every object built from the
//! configuration. A run resets all per-run state, executes the
//! initialisation phases in order and then every model year, so repeated
//! runs with the same parameters give bit-identical results.

mod builder;
pub mod config;
mod context;
mod state;

pub use builder::ModelBuilder;
pub use state::{ModelState, RunState};

pub(crate) use builder::{broadcast, BuildContext};
pub(crate) use context::RunContext;

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::addressable::{Addressable, AddressableKind, Target};
use crate::base::Arena;
use crate::derived_quantity::DerivedQuantity;
use crate::errors::{ModelError, Result};
use crate::estimate::Estimate;
use crate::growth::{AgeLength, LengthWeight};
use crate::initialisation::{InitialisationPhase, PhaseSummary};
use crate::objective::ObjectiveScore;
use crate::observation::{Comparison, Observation};
use crate::partition::Partition;
use crate::penalty::{FlaggedPenalty, Penalties};
use crate::processes::Process;
use crate::report::{CategorySnapshot, Report};
use crate::selectivity::Selectivity;
use crate::time_step::TimeStep;

use self::config::{ModelConfig, ModelSettings};

/// Derived quantity values from one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedQuantityValues {
    pub label: String,
    pub initialisation_values: Vec<Vec<f64>>,
    pub values: BTreeMap<u32, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObservationResults {
    pub label: String,
    pub comparisons: Vec<Comparison>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSnapshots {
    pub label: String,
    pub snapshots: BTreeMap<u32, Vec<CategorySnapshot>>,
}

/// Everything a basic run produces.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub initialisation: Vec<PhaseSummary>,
    pub derived_quantities: Vec<DerivedQuantityValues>,
    pub observations: Vec<ObservationResults>,
    pub penalties: Vec<FlaggedPenalty>,
    pub objective: ObjectiveScore,
    pub reports: Vec<ReportSnapshots>,
    /// The partition after the final year.
    pub partition: Vec<CategorySnapshot>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    pub(crate) settings: ModelSettings,
    pub(crate) partition: Partition,
    pub(crate) selectivities: Arena<Selectivity>,
    pub(crate) age_lengths: Arena<AgeLength>,
    pub(crate) length_weights: Arena<LengthWeight>,
    pub(crate) processes: Arena<Process>,
    pub(crate) derived_quantities: Arena<DerivedQuantity>,
    pub(crate) time_steps: Vec<TimeStep>,
    pub(crate) phases: Vec<InitialisationPhase>,
    pub(crate) observations: Arena<Observation>,
    pub(crate) reports: Arena<Report>,
    pub(crate) penalties: Penalties,
    pub(crate) estimates: Vec<Estimate>,
    pub(crate) state: RunState,
}

impl Model {
    pub fn from_config(config: ModelConfig) -> Result<Self> {
        ModelBuilder::from_config(config).build()
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Self::from_config(ModelConfig::from_json_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn settings(&self) -> &ModelSettings {
        &self.settings
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn partition(&self) -> &Partition {
        &self.partition
    }

    pub fn time_steps(&self) -> &[TimeStep] {
        &self.time_steps
    }

    pub fn estimates(&self) -> &[Estimate] {
        &self.estimates
    }

    pub fn process(&self, label: &str) -> Option<&Process> {
        self.processes.by_label(label)
    }

    pub fn derived_quantity(&self, label: &str) -> Option<&DerivedQuantity> {
        self.derived_quantities.by_label(label)
    }

    pub fn observation(&self, label: &str) -> Option<&Observation> {
        self.observations.by_label(label)
    }

    pub fn report(&self, label: &str) -> Option<&Report> {
        self.reports.by_label(label)
    }

    pub fn initialisation_phases(&self) -> &[InitialisationPhase] {
        &self.phases
    }

    pub fn penalties(&self) -> &Penalties {
        &self.penalties
    }

    /// Clear all per-run state and rebuild caches from the current
    /// parameter values.
    pub fn reset(&mut self) {
        self.partition.reset();
        for selectivity in self.selectivities.values_mut() {
            selectivity.reset();
        }
        self.partition
            .rebuild_growth(self.time_steps.len(), &self.age_lengths, &self.length_weights);
        for process in self.processes.values_mut() {
            process.reset(&self.selectivities);
        }
        for dq in self.derived_quantities.values_mut() {
            dq.reset();
        }
        for observation in self.observations.values_mut() {
            observation.reset();
        }
        for report in self.reports.values_mut() {
            report.reset();
        }
        self.penalties.clear();
        self.state = RunState::new(self.settings.start_year, self.settings.final_year);
        self.state.state = ModelState::Verify;
    }

    fn context(&mut self) -> RunContext<'_> {
        RunContext {
            partition: &mut self.partition,
            processes: &mut self.processes,
            time_steps: &self.time_steps,
            selectivities: &self.selectivities,
            derived_quantities: &mut self.derived_quantities,
            observations: &mut self.observations,
            reports: &mut self.reports,
            penalties: &mut self.penalties,
            state: &mut self.state,
        }
    }

    fn initialise(&mut self) -> Result<()> {
        self.state.state = ModelState::Initialise;
        let mut phases = std::mem::take(&mut self.phases);
        let result = phases.iter_mut().enumerate().try_for_each(|(index, phase)| {
            self.state.phase = index;
            phase.execute(&mut self.context())
        });
        self.phases = phases;
        result
    }

    fn execute(&mut self) -> Result<()> {
        self.reset();
        self.initialise()?;

        self.state.state = ModelState::Execute;
        for year in self.settings.years() {
            self.state.current_year = year;
            self.context().execute_year()?;
        }
        self.state.state = ModelState::Finalise;
        Ok(())
    }

    /// Reset, initialise and run every model year.
    pub fn run(&mut self) -> Result<RunReport> {
        info!(
            start_year = self.settings.start_year,
            final_year = self.settings.final_year,
            "running model"
        );
        self.execute()?;
        let report = self.run_report();
        info!(objective = report.objective.total, "run finished");
        Ok(report)
    }

    /// One complete run for the current parameter values, returning the
    /// objective score.
    pub fn full_iteration(&mut self) -> Result<f64> {
        self.execute()?;
        Ok(self.objective_score().total)
    }

    pub fn objective_score(&self) -> ObjectiveScore {
        ObjectiveScore::evaluate(&self.observations, &self.penalties)
    }

    /// Write one value per estimate, in estimate order.
    pub fn set_estimate_values(&mut self, values: &[f64]) -> Result<()> {
        if values.len() != self.estimates.len() {
            return Err(ModelError::config(
                "estimates",
                format!("expected {} values but got {}", self.estimates.len(), values.len()),
            ));
        }
        let parameters: Vec<Addressable> = self.estimates.iter().map(|e| e.parameter().clone()).collect();
        for (parameter, &value) in parameters.iter().zip(values) {
            self.set_parameter(parameter, value)?;
        }
        Ok(())
    }

    fn target(&mut self, parameter: &Addressable) -> Result<Target<'_>> {
        let label = parameter.label.as_str();
        let name = parameter.parameter.as_str();
        let target = match parameter.kind {
            AddressableKind::Selectivity => self.selectivities.by_label_mut(label).and_then(|s| s.parameter_mut(name)),
            AddressableKind::Process => self.processes.by_label_mut(label).and_then(|p| p.parameter_mut(name)),
            AddressableKind::AgeLength => self.age_lengths.by_label_mut(label).and_then(|a| a.parameter_mut(name)),
            AddressableKind::LengthWeight => {
                self.length_weights.by_label_mut(label).and_then(|l| l.parameter_mut(name))
            }
        };
        target.ok_or_else(|| {
            ModelError::config(
                "estimates",
                format!("'{parameter}' does not refer to an addressable parameter"),
            )
        })
    }

    /// Current value of an addressable parameter.
    pub fn parameter(&mut self, parameter: &Addressable) -> Result<f64> {
        let shape = parameter.shape;
        self.target(parameter)?
            .get(shape)
            .map_err(|message| ModelError::config(parameter.to_string(), message))
    }

    /// Overwrite an addressable parameter. Takes effect at the next reset.
    pub fn set_parameter(&mut self, parameter: &Addressable, value: f64) -> Result<()> {
        let shape = parameter.shape;
        self.target(parameter)?
            .set(shape, value)
            .map_err(|message| ModelError::config(parameter.to_string(), message))
    }

    fn run_report(&self) -> RunReport {
        RunReport {
            initialisation: self.phases.iter().map(|p| p.summary().clone()).collect(),
            derived_quantities: self
                .derived_quantities
                .iter()
                .map(|(id, dq)| DerivedQuantityValues {
                    label: self.derived_quantities.label(id).to_string(),
                    initialisation_values: dq.initialisation_values().to_vec(),
                    values: dq.values().clone(),
                })
                .collect(),
            observations: self
                .observations
                .iter()
                .map(|(id, observation)| ObservationResults {
                    label: self.observations.label(id).to_string(),
                    comparisons: observation.comparisons().to_vec(),
                })
                .collect(),
            penalties: self.penalties.flagged().to_vec(),
            objective: self.objective_score(),
            reports: self
                .reports
                .iter()
                .map(|(id, report)| ReportSnapshots {
                    label: self.reports.label(id).to_string(),
                    snapshots: report.snapshots().clone(),
                })
                .collect(),
            partition: self
                .partition
                .iter()
                .map(|(_, category)| CategorySnapshot {
                    category: category.name().to_string(),
                    min_age: category.min_age(),
                    values: category.data().to_vec(),
                })
                .collect(),
        }
    }
}
