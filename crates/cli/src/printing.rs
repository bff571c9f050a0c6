use shoal_sim::model::config::ModelConfig;
use shoal_sim::RunReport;

pub fn print_settings(config: &ModelConfig) {
    let model = &config.model;
    println!("\n📋 Model Configuration");
    println!("  • Years: {}-{}", model.start_year, model.final_year);
    println!(
        "  • Ages: {}-{}{}",
        model.min_age,
        model.max_age,
        if model.plus_group { " (plus group)" } else { "" }
    );
    println!("  • Categories: {}", config.categories.names.join(", "));
    for step in &model.time_steps {
        println!("  • Time step '{}': {}", step.label, step.processes.join(" → "));
    }
    if !config.initialisation_phases.is_empty() {
        let phases: Vec<&str> = config.initialisation_phases.iter().map(|p| p.label.as_str()).collect();
        println!("  • Initialisation: {}", phases.join(" → "));
    }
    println!(
        "  • Observations: {}, Estimates: {}",
        config.observations.len(),
        config.estimates.len()
    );
    println!();
}

pub fn print_run_summary(report: &RunReport) {
    if !report.initialisation.is_empty() {
        println!("\n🌱 Initialisation");
        for phase in &report.initialisation {
            let status = match phase.converged {
                Some(true) => "converged",
                Some(false) => "did not converge",
                None => "complete",
            };
            println!("  • {}: {} years, {status}", phase.label, phase.years);
        }
    }

    if !report.derived_quantities.is_empty() {
        println!("\n📈 Derived Quantities");
        for dq in &report.derived_quantities {
            let initial = dq.initialisation_values.last().and_then(|v| v.last());
            let last = dq.values.iter().next_back();
            match (initial, last) {
                (Some(initial), Some((year, value))) => {
                    println!("  • {}: {initial:.4e} at initialisation, {value:.4e} in {year}", dq.label)
                }
                (None, Some((year, value))) => println!("  • {}: {value:.4e} in {year}", dq.label),
                _ => println!("  • {}: no values", dq.label),
            }
        }
    }

    println!("\n🎯 Objective Function");
    for component in &report.objective.observations {
        println!("  • {}: {:.6}", component.label, component.score);
    }
    for component in &report.objective.penalties {
        println!("  • penalty {}: {:.6}", component.label, component.score);
    }
    println!("  • Total: {:.6}", report.objective.total);
    println!();
}
