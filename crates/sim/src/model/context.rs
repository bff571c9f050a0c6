//! Execution of the annual cycle.
//!
//! [`RunContext`] borrows the mutable parts of a model for the duration of a
//! run and dispatches processes and executors in order. Each time step runs
//! its processes left to right. Executors subscribed to the mortality block
//! cache state before its first process and calculate after its last, those
//! attached to a process do the same around that process, and year
//! executors wrap the whole step.

use tracing::trace;

use crate::base::{Arena, Id};
use crate::derived_quantity::DerivedQuantity;
use crate::errors::Result;
use crate::observation::Observation;
use crate::partition::Partition;
use crate::penalty::Penalties;
use crate::processes::{Process, ProcessContext, ProcessKind};
use crate::report::Report;
use crate::selectivity::Selectivity;
use crate::time_step::{ExecutorRef, TimeStep};

use super::RunState;

pub(crate) struct RunContext<'a> {
    pub partition: &'a mut Partition,
    pub processes: &'a mut Arena<Process>,
    pub time_steps: &'a [TimeStep],
    pub selectivities: &'a Arena<Selectivity>,
    pub derived_quantities: &'a mut Arena<DerivedQuantity>,
    pub observations: &'a mut Arena<Observation>,
    pub reports: &'a mut Arena<Report>,
    pub penalties: &'a mut Penalties,
    pub state: &'a mut RunState,
}

impl<'a> RunContext<'a> {
    fn pre_execute(&mut self, executor: ExecutorRef) {
        match executor {
            ExecutorRef::DerivedQuantity(id) => self
                .derived_quantities
                .get_mut(id)
                .pre_execute(self.partition, self.selectivities),
            ExecutorRef::Observation(id) => self.observations.get_mut(id).pre_execute(self.partition, self.state),
            ExecutorRef::Report(_) => {}
        }
    }

    fn execute(&mut self, executor: ExecutorRef) {
        match executor {
            ExecutorRef::DerivedQuantity(id) => self.derived_quantities.get_mut(id).execute(
                self.partition,
                self.selectivities,
                self.state,
            ),
            ExecutorRef::Observation(id) => {
                self.observations
                    .get_mut(id)
                    .execute(self.partition, self.selectivities, self.state)
            }
            ExecutorRef::Report(id) => self.reports.get_mut(id).execute(self.partition, self.state),
        }
    }

    fn execute_process(&mut self, id: Id<Process>) -> Result<()> {
        let mut ctx = ProcessContext {
            partition: &mut *self.partition,
            selectivities: self.selectivities,
            derived_quantities: &*self.derived_quantities,
            penalties: &mut *self.penalties,
            state: &*self.state,
        };
        self.processes.get_mut(id).execute(&mut ctx)
    }

    /// Run every time step once for the current year, or for the current
    /// initialisation phase while initialising.
    pub fn execute_year(&mut self) -> Result<()> {
        let time_steps: &'a [TimeStep] = self.time_steps;
        let year = self.state.current_year;
        let initialising = self.state.is_initialising();
        let phase = self.state.phase;

        for (index, step) in time_steps.iter().enumerate() {
            self.state.current_time_step = index;
            let (processes, block, block_executors, year_executors) = if initialising {
                (
                    step.phase_processes(phase),
                    step.phase_block(phase),
                    step.initialisation_block_executors(),
                    &[][..],
                )
            } else {
                (
                    step.processes(),
                    step.mortality_block(),
                    step.block_executors(year),
                    step.year_executors(year),
                )
            };
            trace!(year, time_step = step.label(), processes = processes.len(), "executing time step");

            for &executor in year_executors {
                self.pre_execute(executor);
            }
            for (position, &process) in processes.iter().enumerate() {
                if position == block.0 {
                    for &executor in block_executors {
                        self.pre_execute(executor);
                    }
                }
                let attached = if initialising {
                    &[][..]
                } else {
                    step.process_executors(year, process)
                };
                for &executor in attached {
                    self.pre_execute(executor);
                }

                self.execute_process(process)?;

                for &executor in attached {
                    self.execute(executor);
                }
                if position == block.1 {
                    for &executor in block_executors {
                        self.execute(executor);
                    }
                }
            }
            if block.0 >= processes.len() {
                for &executor in block_executors {
                    self.pre_execute(executor);
                }
                for &executor in block_executors {
                    self.execute(executor);
                }
            }
            for &executor in year_executors {
                self.execute(executor);
            }
        }
        self.state.current_time_step = 0;
        Ok(())
    }

    /// Run the annual cycle `years` times for the current phase.
    pub fn execute_initialisation_years(&mut self, years: u32) -> Result<()> {
        for _ in 0..years {
            self.execute_year()?;
        }
        Ok(())
    }

    /// Scale the partition for every B0 initialised Beverton-Holt recruitment
    /// that has not done so yet. Returns whether anything was scaled.
    pub fn scale_b0_recruitment(&mut self) -> Result<bool> {
        let mut scaled = false;
        for process in self.processes.values_mut() {
            if let ProcessKind::RecruitmentBevertonHolt(recruitment) = process.kind_mut() {
                if recruitment.b0_initialised() && !recruitment.have_scaled() {
                    recruitment.scale_partition(&mut *self.partition, &*self.derived_quantities)?;
                    scaled = true;
                }
            }
        }
        Ok(scaled)
    }
}
