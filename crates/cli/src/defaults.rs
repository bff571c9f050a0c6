//! Shared default values for the command-line arguments.

pub const CONFIG_FILE: &str = "model.json";
pub const LOG_LEVEL: &str = "info";

pub const SAMPLE_COUNT: usize = 100;
pub const SEED: u64 = 42;

/// Parameter vectors scored between progress updates.
pub const SAMPLE_BATCH: usize = 32;
