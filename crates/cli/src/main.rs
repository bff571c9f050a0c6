mod args;
mod commands;
pub mod defaults;
mod printing;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use args::SampleArgs;
use commands::{init, run, sample, validate};

/// Shoal: an age-structured fish population model
///
/// Builds a stock-assessment model from a JSON configuration, initialises
/// the population and projects it through the model years.
#[derive(Parser, Debug)]
#[command(name = "shoal")]
#[command(author, version, about = "Runs age-structured fish population models", long_about = None)]
struct Cli {
    /// Number of threads to use for parallel processing
    ///
    /// If not specified, defaults to the number of logical CPUs.
    #[arg(short = 't', long, global = true)]
    threads: Option<usize>,

    /// Log level used when RUST_LOG is not set (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = defaults::LOG_LEVEL)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write an example model configuration.
    ///
    /// The example has two sexes, Beverton-Holt recruitment, a derived
    /// initialisation, an abundance index and one estimate.
    Init {
        /// Output configuration path
        #[arg(short, long, default_value = defaults::CONFIG_FILE)]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Run a model once and print a summary.
    Run {
        /// Model configuration (JSON)
        #[arg(default_value = defaults::CONFIG_FILE)]
        config: PathBuf,

        /// Write the full run report as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check a model configuration and list every error found.
    Validate {
        /// Model configuration (JSON)
        #[arg(default_value = defaults::CONFIG_FILE)]
        config: PathBuf,
    },

    /// Score parameter vectors drawn uniformly within the estimate bounds.
    Sample(SampleArgs),
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()?;
    }

    match cli.command {
        Commands::Init { output, force } => {
            init::write_example(&output, force)?;
        }
        Commands::Run { config, output } => {
            run::run_model(&config, output.as_ref())?;
        }
        Commands::Validate { config } => {
            validate::validate_config(&config)?;
        }
        Commands::Sample(args) => {
            sample::sample_objective(&args)?;
        }
    }

    Ok(())
}
