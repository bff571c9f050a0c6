use clap::Args;
use std::path::PathBuf;

use crate::defaults;

#[derive(Args, Debug)]
pub struct SampleArgs {
    /// Model configuration (JSON)
    #[arg(default_value = defaults::CONFIG_FILE)]
    pub config: PathBuf,

    /// Number of parameter vectors to draw
    #[arg(short = 'n', long, default_value_t = defaults::SAMPLE_COUNT)]
    pub count: usize,

    /// Random seed
    #[arg(long, default_value_t = defaults::SEED)]
    pub seed: u64,

    /// Output CSV path (stdout if not specified)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Show progress bar
    #[arg(long)]
    pub progress: bool,
}
