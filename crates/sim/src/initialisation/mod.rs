//! Initialisation phases.
//!
//! Phases seed the partition before the first model year. They run in the
//! order configured, each starting from the partition the previous one left
//! behind. Phases that run the annual cycle use their own process lists (see
//! [`crate::time_step::TimeStep::phase_processes`]).

mod cinitial;
mod derived;
mod iterative;
mod state_category_by_age;

pub use cinitial::Cinitial;
pub use derived::Derived;
pub use iterative::{convergence_variance, Iterative};
pub use state_category_by_age::StateCategoryByAge;

use serde::Serialize;
use tracing::{debug, info};

use crate::errors::{ConfigErrors, Result};
use crate::model::config::{InitialisationPhaseConfig, InitialisationPhaseKindConfig};
use crate::model::{BuildContext, RunContext};

/// What a phase did during the last run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PhaseSummary {
    pub label: String,
    /// Annual cycles executed.
    pub years: u32,
    /// Set by phases that test for convergence.
    pub converged: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InitialisationKind {
    Iterative(Iterative),
    Derived(Derived),
    Cinitial(Cinitial),
    StateCategoryByAge(StateCategoryByAge),
}

#[derive(Debug, Clone, PartialEq)]
pub struct InitialisationPhase {
    label: String,
    kind: InitialisationKind,
    summary: PhaseSummary,
}

impl InitialisationPhase {
    /// `recruitment_first` is whether recruitment precedes ageing in the
    /// annual cycle.
    pub(crate) fn build(
        config: &InitialisationPhaseConfig,
        ctx: &BuildContext<'_>,
        recruitment_first: bool,
        errors: &mut ConfigErrors,
    ) -> Self {
        let location = format!("initialisation_phases[{}]", config.label);
        let kind = match &config.kind {
            InitialisationPhaseKindConfig::Iterative(c) => {
                InitialisationKind::Iterative(Iterative::build(c, &location, errors))
            }
            InitialisationPhaseKindConfig::Derived(c) => {
                InitialisationKind::Derived(Derived::build(c, recruitment_first, &location, errors))
            }
            InitialisationPhaseKindConfig::Cinitial(c) => {
                InitialisationKind::Cinitial(Cinitial::build(c, ctx, &location, errors))
            }
            InitialisationPhaseKindConfig::StateCategoryByAge(c) => {
                InitialisationKind::StateCategoryByAge(StateCategoryByAge::build(c, ctx, &location, errors))
            }
        };
        Self {
            label: config.label.clone(),
            kind,
            summary: PhaseSummary {
                label: config.label.clone(),
                ..PhaseSummary::default()
            },
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn kind(&self) -> &InitialisationKind {
        &self.kind
    }

    pub fn summary(&self) -> &PhaseSummary {
        &self.summary
    }

    pub(crate) fn execute(&mut self, ctx: &mut RunContext<'_>) -> Result<()> {
        info!(phase = %self.label, "executing initialisation phase");
        let (years, converged) = match &self.kind {
            InitialisationKind::Iterative(phase) => {
                let (years, converged) = phase.execute(&self.label, ctx)?;
                (years + scale_b0(ctx)?, converged)
            }
            InitialisationKind::Derived(phase) => {
                let (years, converged) = phase.execute(&self.label, ctx)?;
                (years + scale_b0(ctx)?, Some(converged))
            }
            InitialisationKind::Cinitial(phase) => (phase.execute(ctx)?, None),
            InitialisationKind::StateCategoryByAge(phase) => {
                phase.execute(ctx.partition);
                (0, None)
            }
        };
        self.summary.years = years;
        self.summary.converged = converged;
        debug!(phase = %self.label, years, "initialisation phase finished");
        Ok(())
    }
}

/// Scale B0 initialised recruitment and run one more year so derived
/// quantities are calculated on the scaled partition. Returns the number of
/// extra years run.
fn scale_b0(ctx: &mut RunContext<'_>) -> Result<u32> {
    if ctx.scale_b0_recruitment()? {
        info!("partition scaled to B0");
        ctx.execute_initialisation_years(1)?;
        Ok(1)
    } else {
        Ok(0)
    }
}
