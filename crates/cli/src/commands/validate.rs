use anyhow::Result;
use shoal_sim::{Model, ModelError};
use std::path::Path;

use super::run::load_config;

pub fn validate_config(config_path: &Path) -> Result<()> {
    println!("🔍 Validating configuration: {}", config_path.display());

    let config = load_config(config_path)?;
    match Model::from_config(config) {
        Ok(model) => {
            let settings = model.settings();
            println!(
                "✓ Configuration is valid: {} categories, {} time steps, {} years",
                model.partition().len(),
                model.time_steps().len(),
                settings.year_count()
            );
            Ok(())
        }
        Err(ModelError::Configuration(errors)) => {
            println!("✗ Found {} error(s):", errors.len());
            for error in errors.iter() {
                println!("  • {}: {}", error.location, error.message);
            }
            anyhow::bail!("configuration has {} error(s)", errors.len())
        }
        Err(error) => Err(error.into()),
    }
}
