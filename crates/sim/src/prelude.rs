//! Commonly used imports for convenience.
//!
//! # Example
//!
//! ```
//! use shoal_sim::prelude::*;
//!
//! let model = ModelBuilder::new(2000, 2004, 1, 5)
//!     .categories(&["stock"])
//!     .time_step("annual", &[])
//!     .build()
//!     .unwrap();
//! assert_eq!(model.partition().len(), 1);
//! ```

pub use crate::addressable::Addressable;
pub use crate::base::{Arena, Id};
pub use crate::errors::{ConfigErrors, ModelError, Result};
pub use crate::estimate::{evaluate_in_parallel, sample_uniform, Estimate};
pub use crate::model::config::ModelConfig;
pub use crate::model::{Model, ModelBuilder, ModelState, RunReport};
pub use crate::objective::ObjectiveScore;
pub use crate::partition::{Category, Partition};
pub use crate::selectivity::{Selectivity, SelectivityKind};
