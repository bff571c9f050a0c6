use anyhow::{Context, Result};
use shoal_sim::model::config::ModelConfig;
use shoal_sim::Model;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

use crate::printing::{print_run_summary, print_settings};

pub fn load_config(path: &Path) -> Result<ModelConfig> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    ModelConfig::from_json_str(&json).with_context(|| format!("Failed to parse {}", path.display()))
}

pub fn run_model(config_path: &Path, output: Option<&PathBuf>) -> Result<()> {
    println!("🐟 Shoal - Running Model");
    println!("============================================");

    let config = load_config(config_path)?;
    print_settings(&config);

    let mut model = Model::from_config(config).context("Failed to build model")?;
    let started = Instant::now();
    let report = model.run().context("Model run failed")?;
    info!(elapsed_ms = started.elapsed().as_millis() as u64, "model run complete");

    print_run_summary(&report);

    if let Some(output) = output {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialize run report")?;
        std::fs::write(output, json).with_context(|| format!("Failed to write {}", output.display()))?;
        println!("✓ Run report written to {}", output.display());
    }

    println!("✓ Run complete!");
    Ok(())
}
