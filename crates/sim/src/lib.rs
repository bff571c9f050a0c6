//! # Shoal Simulation Crate
//!
//! The `shoal_sim` crate is an age-structured population dynamics engine for
//! fisheries stock assessment. It holds the partition of numbers at age by
//! category, the population processes that move fish through it, the
//! initialisation phases that bring the population to equilibrium and the
//! derived quantities, observations and reports evaluated while a model runs.

pub mod addressable;
pub mod base;
pub mod derived_quantity;
pub mod errors;
pub mod estimate;
pub mod growth;
pub mod initialisation;
pub mod model;
pub mod objective;
pub mod observation;
pub mod partition;
pub mod penalty;
pub mod prelude;
pub mod processes;
pub mod report;
pub mod selectivity;
pub mod time_step;

pub use errors::{ModelError, Result};
pub use model::{Model, ModelBuilder, RunReport};
