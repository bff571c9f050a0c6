use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use shoal_sim::estimate::{evaluate_in_parallel, sample_uniform};
use shoal_sim::Model;
use std::fmt::Write as _;
use tracing::warn;

use super::run::load_config;
use crate::args::SampleArgs;
use crate::defaults::SAMPLE_BATCH;

pub fn sample_objective(args: &SampleArgs) -> Result<()> {
    let config = load_config(&args.config)?;
    let model = Model::from_config(config).context("Failed to build model")?;
    if model.estimates().is_empty() {
        anyhow::bail!("the model has no estimates to sample");
    }

    let samples = sample_uniform(model.estimates(), args.count, args.seed);

    let pb = if args.progress {
        let pb = ProgressBar::new(samples.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
                .context("Invalid progress bar template")?
                .progress_chars("#>-"),
        );
        Some(pb)
    } else {
        None
    };

    let mut scores = Vec::with_capacity(samples.len());
    for batch in samples.chunks(SAMPLE_BATCH) {
        scores.extend(evaluate_in_parallel(&model, batch));
        if let Some(pb) = &pb {
            pb.inc(batch.len() as u64);
        }
    }
    if let Some(pb) = pb {
        pb.finish_with_message("Done");
    }

    let mut csv = String::new();
    let header: Vec<String> = model.estimates().iter().map(|e| e.parameter().to_string()).collect();
    writeln!(csv, "{},objective", header.join(","))?;
    for (index, (values, score)) in samples.iter().zip(scores).enumerate() {
        let values: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        let score = match score {
            Ok(score) => score.to_string(),
            Err(error) => {
                warn!(sample = index, %error, "sample failed");
                "NA".to_string()
            }
        };
        writeln!(csv, "{},{score}", values.join(","))?;
    }

    match &args.output {
        Some(output) => {
            std::fs::write(output, csv).with_context(|| format!("Failed to write {}", output.display()))?;
            println!("✓ {} samples written to {}", samples.len(), output.display());
        }
        None => print!("{csv}"),
    }
    Ok(())
}
