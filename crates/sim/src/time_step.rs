//! Time steps of the annual cycle.
//!
//! A time step holds an ordered list of processes plus the executors that
//! subscribed to points within it. Executors can subscribe to the step's
//! mortality block, to a single process or to the whole step, always keyed by
//! year so they only fire in the years they asked for.

use std::collections::{BTreeMap, HashMap};

use crate::base::{Arena, Id};
use crate::derived_quantity::DerivedQuantity;
use crate::errors::ConfigErrors;
use crate::observation::Observation;
use crate::processes::{Process, ProcessType};
use crate::report::Report;

/// Something that runs alongside the processes of a time step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorRef {
    DerivedQuantity(Id<DerivedQuantity>),
    Observation(Id<Observation>),
    Report(Id<Report>),
}

/// Position of the mortality block as `(first, last)` process indices.
///
/// Without mortality processes both ends equal `types.len()`, which places the
/// block after the last process.
pub fn mortality_block(types: &[ProcessType]) -> Result<(usize, usize), String> {
    let len = types.len();
    let Some(first) = types.iter().position(|t| t.counts_as_mortality()) else {
        return Ok((len, len));
    };
    let last = types
        .iter()
        .rposition(|t| t.counts_as_mortality())
        .unwrap_or(first);
    if types[first..=last].iter().any(|t| !t.counts_as_mortality()) {
        return Err(
            "mortality processes within a time step need to be consecutive".to_string(),
        );
    }
    Ok((first, last))
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeStep {
    label: String,
    processes: Vec<Id<Process>>,
    mortality_block: (usize, usize),
    phase_processes: Vec<Vec<Id<Process>>>,
    phase_blocks: Vec<(usize, usize)>,
    block_executors: BTreeMap<u32, Vec<ExecutorRef>>,
    initialisation_block_executors: Vec<ExecutorRef>,
    process_executors: HashMap<(u32, Id<Process>), Vec<ExecutorRef>>,
    year_executors: BTreeMap<u32, Vec<ExecutorRef>>,
}

impl TimeStep {
    pub fn new(label: impl Into<String>, processes: Vec<Id<Process>>) -> Self {
        let len = processes.len();
        Self {
            label: label.into(),
            processes,
            mortality_block: (len, len),
            ..Self::default()
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn processes(&self) -> &[Id<Process>] {
        &self.processes
    }

    pub fn mortality_block(&self) -> (usize, usize) {
        self.mortality_block
    }

    /// Work out the mortality block from the process types.
    pub(crate) fn build_mortality_block(
        &mut self,
        processes: &Arena<Process>,
        errors: &mut ConfigErrors,
    ) {
        let types: Vec<_> = self
            .processes
            .iter()
            .map(|&id| processes.get(id).process_type())
            .collect();
        match mortality_block(&types) {
            Ok(block) => self.mortality_block = block,
            Err(message) => errors.push(format!("time_steps[{}]", self.label), message),
        }
    }

    /// Register the process list of the next initialisation phase.
    pub(crate) fn push_phase(
        &mut self,
        processes: Vec<Id<Process>>,
        arena: &Arena<Process>,
        location: &str,
        errors: &mut ConfigErrors,
    ) {
        let types: Vec<_> = processes.iter().map(|&id| arena.get(id).process_type()).collect();
        let block = mortality_block(&types).unwrap_or_else(|message| {
            errors.push(location, format!("time step '{}': {message}", self.label));
            (types.len(), types.len())
        });
        self.phase_processes.push(processes);
        self.phase_blocks.push(block);
    }

    /// Processes run in initialisation phase `phase`.
    pub fn phase_processes(&self, phase: usize) -> &[Id<Process>] {
        self.phase_processes
            .get(phase)
            .map_or(self.processes.as_slice(), Vec::as_slice)
    }

    pub fn phase_block(&self, phase: usize) -> (usize, usize) {
        self.phase_blocks
            .get(phase)
            .copied()
            .unwrap_or(self.mortality_block)
    }

    pub fn subscribe_to_block(&mut self, years: impl IntoIterator<Item = u32>, executor: ExecutorRef) {
        for year in years {
            self.block_executors.entry(year).or_default().push(executor);
        }
    }

    pub fn subscribe_to_initialisation_block(&mut self, executor: ExecutorRef) {
        self.initialisation_block_executors.push(executor);
    }

    pub fn subscribe_to_process(&mut self, year: u32, process: Id<Process>, executor: ExecutorRef) {
        self.process_executors
            .entry((year, process))
            .or_default()
            .push(executor);
    }

    pub fn subscribe_to_year(&mut self, year: u32, executor: ExecutorRef) {
        self.year_executors.entry(year).or_default().push(executor);
    }

    pub fn block_executors(&self, year: u32) -> &[ExecutorRef] {
        self.block_executors.get(&year).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn initialisation_block_executors(&self) -> &[ExecutorRef] {
        &self.initialisation_block_executors
    }

    pub fn process_executors(&self, year: u32, process: Id<Process>) -> &[ExecutorRef] {
        self.process_executors
            .get(&(year, process))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn year_executors(&self, year: u32) -> &[ExecutorRef] {
        self.year_executors.get(&year).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Build each time step's process list for one initialisation phase.
///
/// Inserts take the form `time_step(process)=new_process`, placing
/// `new_process` before `process`, or `time_step()=new_process`, placing it
/// first. Excludes remove a process from every time step.
pub(crate) fn phase_process_lists(
    time_steps: &[TimeStep],
    processes: &Arena<Process>,
    inserts: &[String],
    excludes: &[String],
    location: &str,
    errors: &mut ConfigErrors,
) -> Vec<Vec<Id<Process>>> {
    let mut lists: Vec<Vec<Id<Process>>> = time_steps.iter().map(|t| t.processes.clone()).collect();

    for insert in inserts {
        let pieces: Vec<&str> = insert
            .split(['(', ')', '='])
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        let (step, target, new) = match pieces.as_slice() {
            [step, new] => (*step, None, *new),
            [step, target, new] => (*step, Some(*target), *new),
            _ => {
                errors.push(
                    format!("{location}.insert_processes"),
                    format!("'{insert}' does not match the format time_step(process)=new_process"),
                );
                continue;
            }
        };
        let Some(index) = time_steps.iter().position(|t| t.label == step) else {
            errors.push(
                format!("{location}.insert_processes"),
                format!("time step '{step}' has not been defined"),
            );
            continue;
        };
        let Some(new) = processes.find(new) else {
            errors.push(
                format!("{location}.insert_processes"),
                format!("process '{new}' has not been defined"),
            );
            continue;
        };

        let list = &mut lists[index];
        match target {
            None => list.insert(0, new),
            Some(target) => {
                let position = processes
                    .find(target)
                    .and_then(|id| list.iter().position(|&p| p == id));
                match position {
                    Some(position) => list.insert(position, new),
                    None => errors.push(
                        format!("{location}.insert_processes"),
                        format!("process '{target}' does not exist in time step '{step}'"),
                    ),
                }
            }
        }
    }

    for exclude in excludes {
        let mut removed = 0;
        if let Some(id) = processes.find(exclude) {
            for list in &mut lists {
                let before = list.len();
                list.retain(|&p| p != id);
                removed += before - list.len();
            }
        }
        if removed == 0 {
            errors.push(
                format!("{location}.exclude_processes"),
                format!("process '{exclude}' does not exist in any time step"),
            );
        }
    }

    lists
}
