//! Population processes.
//!
//! A process is one step of the annual cycle that moves, adds or removes
//! individuals in the partition. Processes are built once from their
//! configuration, reset before every run and executed in the order given by
//! the time steps (or an initialisation phase's version of that order).

mod ageing;
mod mortality;
mod recruitment;
mod tagging;
mod transition;

pub use ageing::{age_in_place, Ageing};
pub use mortality::MortalityConstantRate;
pub use recruitment::{beverton_holt, RecruitmentBevertonHolt, RecruitmentConstant};
pub use tagging::TagByAge;
pub use transition::TransitionCategory;

pub(crate) use recruitment::CycleEntry;

use serde::Serialize;

use crate::addressable::Target;
use crate::base::Arena;
use crate::derived_quantity::DerivedQuantity;
use crate::errors::{ConfigErrors, Result};
use crate::model::config::{ProcessConfig, ProcessKindConfig};
use crate::model::{BuildContext, RunState};
use crate::partition::Partition;
use crate::penalty::Penalties;
use crate::selectivity::Selectivity;

/// Broad classification used to lay out the annual cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessType {
    Ageing,
    Mortality,
    Recruitment,
    Transition,
    Tag,
    Null,
}

impl ProcessType {
    /// Whether the process belongs in a time step's mortality block.
    #[inline]
    pub fn counts_as_mortality(self) -> bool {
        matches!(self, Self::Mortality | Self::Tag)
    }
}

/// Everything a process may touch while executing.
pub struct ProcessContext<'a> {
    pub partition: &'a mut Partition,
    pub selectivities: &'a Arena<Selectivity>,
    pub derived_quantities: &'a Arena<DerivedQuantity>,
    pub penalties: &'a mut Penalties,
    pub state: &'a RunState,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProcessKind {
    Ageing(Ageing),
    MortalityConstantRate(MortalityConstantRate),
    RecruitmentBevertonHolt(RecruitmentBevertonHolt),
    RecruitmentConstant(RecruitmentConstant),
    TransitionCategory(TransitionCategory),
    TagByAge(TagByAge),
    /// Does nothing. Useful as an insertion anchor.
    Null,
}

/// A labelled process.
#[derive(Debug, Clone, PartialEq)]
pub struct Process {
    label: String,
    kind: ProcessKind,
}

impl Process {
    pub fn new(label: impl Into<String>, kind: ProcessKind) -> Self {
        Self {
            label: label.into(),
            kind,
        }
    }

    pub(crate) fn build(
        config: &ProcessConfig,
        ctx: &BuildContext<'_>,
        errors: &mut ConfigErrors,
    ) -> Self {
        let location = format!("processes[{}]", config.label);
        let kind = match &config.kind {
            ProcessKindConfig::Ageing(c) => ProcessKind::Ageing(Ageing::build(c, ctx, &location, errors)),
            ProcessKindConfig::MortalityConstantRate(c) => ProcessKind::MortalityConstantRate(
                MortalityConstantRate::build(c, ctx, &location, errors),
            ),
            ProcessKindConfig::RecruitmentBevertonHolt(c) => ProcessKind::RecruitmentBevertonHolt(
                RecruitmentBevertonHolt::build(c, ctx, &location, errors),
            ),
            ProcessKindConfig::RecruitmentConstant(c) => ProcessKind::RecruitmentConstant(
                RecruitmentConstant::build(c, ctx, &location, errors),
            ),
            ProcessKindConfig::TransitionCategory(c) => ProcessKind::TransitionCategory(
                TransitionCategory::build(c, ctx, &location, errors),
            ),
            ProcessKindConfig::TagByAge(c) => {
                ProcessKind::TagByAge(TagByAge::build(c, ctx, &location, errors))
            }
            ProcessKindConfig::Null => ProcessKind::Null,
        };
        Self::new(&config.label, kind)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn kind(&self) -> &ProcessKind {
        &self.kind
    }

    pub fn kind_mut(&mut self) -> &mut ProcessKind {
        &mut self.kind
    }

    pub fn process_type(&self) -> ProcessType {
        match self.kind {
            ProcessKind::Ageing(_) => ProcessType::Ageing,
            ProcessKind::MortalityConstantRate(_) => ProcessType::Mortality,
            ProcessKind::RecruitmentBevertonHolt(_) | ProcessKind::RecruitmentConstant(_) => {
                ProcessType::Recruitment
            }
            ProcessKind::TransitionCategory(_) => ProcessType::Transition,
            ProcessKind::TagByAge(_) => ProcessType::Tag,
            ProcessKind::Null => ProcessType::Null,
        }
    }

    /// Clear per-run records and rebuild anything derived from parameters.
    pub(crate) fn reset(&mut self, selectivities: &Arena<Selectivity>) {
        match &mut self.kind {
            ProcessKind::MortalityConstantRate(p) => p.reset(),
            ProcessKind::RecruitmentBevertonHolt(p) => p.reset(),
            ProcessKind::TransitionCategory(p) => p.reset(selectivities),
            ProcessKind::TagByAge(p) => p.reset(),
            ProcessKind::Ageing(_) | ProcessKind::RecruitmentConstant(_) | ProcessKind::Null => {}
        }
    }

    pub(crate) fn execute(&mut self, ctx: &mut ProcessContext<'_>) -> Result<()> {
        match &mut self.kind {
            ProcessKind::Ageing(p) => p.execute(ctx),
            ProcessKind::MortalityConstantRate(p) => p.execute(ctx),
            ProcessKind::RecruitmentBevertonHolt(p) => p.execute(ctx),
            ProcessKind::RecruitmentConstant(p) => p.execute(ctx),
            ProcessKind::TransitionCategory(p) => p.execute(ctx),
            ProcessKind::TagByAge(p) => p.execute(&self.label, ctx),
            ProcessKind::Null => Ok(()),
        }
    }

    /// Estimable parameter named `name`.
    pub fn parameter_mut(&mut self, name: &str) -> Option<Target<'_>> {
        match &mut self.kind {
            ProcessKind::MortalityConstantRate(p) => p.parameter_mut(name),
            ProcessKind::RecruitmentBevertonHolt(p) => p.parameter_mut(name),
            ProcessKind::RecruitmentConstant(p) => p.parameter_mut(name),
            ProcessKind::TransitionCategory(p) => p.parameter_mut(name),
            ProcessKind::TagByAge(p) => p.parameter_mut(name),
            ProcessKind::Ageing(_) | ProcessKind::Null => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mortality_block_membership() {
        assert!(ProcessType::Mortality.counts_as_mortality());
        assert!(ProcessType::Tag.counts_as_mortality());
        assert!(!ProcessType::Ageing.counts_as_mortality());
        assert!(!ProcessType::Recruitment.counts_as_mortality());
    }

    #[test]
    fn test_null_process() {
        let process = Process::new("anchor", ProcessKind::Null);
        assert_eq!(process.process_type(), ProcessType::Null);
        assert_eq!(process.label(), "anchor");
    }
}
