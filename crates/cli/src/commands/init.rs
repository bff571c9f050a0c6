use anyhow::{Context, Result};
use shoal_sim::model::config::{
    AgeingConfig, DerivedConfig, DerivedQuantityConfig, DerivedQuantityKind, InitialisationPhaseKindConfig,
    LikelihoodKind, ModelConfig, MortalityConstantRateConfig, ObservationConfig, ObservationKind, ProcessKindConfig,
    ProportionMethod, RecruitmentBevertonHoltConfig, ReportConfig, YearValues,
};
use shoal_sim::selectivity::SelectivityKind;
use shoal_sim::ModelBuilder;
use std::path::Path;

use crate::printing::print_settings;

const SEXES: [&str; 2] = ["male", "female"];

const SURVEY_INDEX: [(u32, f64); 10] = [
    (2000, 4.12),
    (2001, 3.95),
    (2002, 4.31),
    (2003, 4.05),
    (2004, 3.88),
    (2005, 4.22),
    (2006, 4.17),
    (2007, 3.79),
    (2008, 4.02),
    (2009, 4.26),
];

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

/// A small two-sex model with a survey index.
pub fn example_config() -> ModelConfig {
    let observed = SURVEY_INDEX
        .iter()
        .map(|&(year, value)| YearValues {
            year,
            values: vec![value],
        })
        .collect();
    let error_values = SURVEY_INDEX
        .iter()
        .map(|&(year, _)| YearValues {
            year,
            values: vec![0.2],
        })
        .collect();

    ModelBuilder::new(1990, 2010, 1, 30)
        .plus_group(true)
        .category_format("sex")
        .categories(&SEXES)
        .selectivity("one", SelectivityKind::Constant { c: 1.0 })
        .selectivity(
            "maturity",
            SelectivityKind::Logistic {
                a50: 6.0,
                ato95: 3.0,
                alpha: 1.0,
            },
        )
        .selectivity(
            "survey",
            SelectivityKind::Logistic {
                a50: 4.0,
                ato95: 2.0,
                alpha: 1.0,
            },
        )
        .derived_quantity(DerivedQuantityConfig {
            label: "ssb".to_string(),
            kind: DerivedQuantityKind::Abundance,
            categories: strings(&["female"]),
            selectivities: strings(&["maturity"]),
            time_step: "annual".to_string(),
            time_step_proportion: 0.5,
            time_step_proportion_method: ProportionMethod::WeightedSum,
        })
        .process("ageing", ProcessKindConfig::Ageing(AgeingConfig { categories: strings(&SEXES) }))
        .process(
            "recruitment",
            ProcessKindConfig::RecruitmentBevertonHolt(RecruitmentBevertonHoltConfig {
                categories: strings(&SEXES),
                proportions: vec![0.5, 0.5],
                r0: Some(1_000_000.0),
                b0: None,
                steepness: 0.75,
                age: None,
                ssb: "ssb".to_string(),
                ssb_offset: None,
                recruitment_multipliers: vec![1.0],
                standardise_years: Vec::new(),
                b0_phase: None,
            }),
        )
        .process(
            "mortality",
            ProcessKindConfig::MortalityConstantRate(MortalityConstantRateConfig {
                categories: strings(&SEXES),
                m: vec![0.15],
                selectivities: strings(&["one"]),
                time_step_ratio: Vec::new(),
            }),
        )
        .time_step("annual", &["ageing", "recruitment", "mortality"])
        .initialisation_phase(
            "equilibrium",
            InitialisationPhaseKindConfig::Derived(DerivedConfig {
                insert_processes: Vec::new(),
                exclude_processes: Vec::new(),
                max_iterations: 1000,
            }),
        )
        .observation(ObservationConfig {
            label: "survey".to_string(),
            kind: ObservationKind::Abundance,
            categories: strings(&["male+female"]),
            selectivities: strings(&["survey"]),
            time_step: "annual".to_string(),
            process: None,
            time_step_proportion: 0.5,
            time_step_proportion_method: ProportionMethod::WeightedSum,
            catchability: 1e-6,
            observed,
            error_values,
            likelihood: LikelihoodKind::Lognormal,
        })
        .estimate("process[recruitment].r0", 1e5, 1e7)
        .report(ReportConfig {
            label: "final_partition".to_string(),
            time_step: "annual".to_string(),
            categories: Vec::new(),
            years: vec![2010],
        })
        .config()
        .clone()
}

pub fn write_example(output: &Path, force: bool) -> Result<()> {
    if output.exists() && !force {
        anyhow::bail!(
            "{} already exists; use --force to overwrite it",
            output.display()
        );
    }

    let config = example_config();
    let json = serde_json::to_string_pretty(&config).context("Failed to serialize configuration")?;
    std::fs::write(output, json).with_context(|| format!("Failed to write {}", output.display()))?;

    print_settings(&config);
    println!("✓ Example configuration written to {}", output.display());
    println!("\n💡 Use 'shoal run {}' to run it", output.display());
    Ok(())
}
